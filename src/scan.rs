use crate::expand::decode_alias;
use crate::record::{Record, RecordSink};
use crate::reflect::RecordShape;
use crate::parse::RecordBinding;
use crate::value::{TypeCategory, ValueMap};
use crate::{Error, Result};
use sqlx::sqlite::{SqliteColumn, SqliteRow};
use sqlx::{Column, Decode, Row, Sqlite, Type, TypeInfo};
use std::sync::Arc;

/// A single value destination, scanned by column position.
pub trait Scalar: Send {
    fn decode(&mut self, row: &SqliteRow, index: usize) -> std::result::Result<(), sqlx::Error>;
}

impl<T> Scalar for T
where
    T: for<'r> Decode<'r, Sqlite> + Type<Sqlite> + Send,
{
    fn decode(&mut self, row: &SqliteRow, index: usize) -> std::result::Result<(), sqlx::Error> {
        *self = row.try_get(index)?;
        Ok(())
    }
}

/// Destinations of a query, grouped by kind.
pub(crate) enum Target<'a> {
    Scalars(Vec<&'a mut dyn Scalar>),
    Map(&'a mut ValueMap),
    /// One destination per bound entity, same order.
    Records(Vec<&'a mut dyn Record>),
    Many(&'a mut dyn RecordSink),
}

/// Column `column` decodes into field `ident` of entity `entity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldTarget {
    pub column: usize,
    pub entity: usize,
    pub ident: &'static str,
}

/// A target with its columns resolved, ready to scan rows.
pub(crate) enum Materializer<'t, 'a> {
    Scalars(&'t mut [&'a mut dyn Scalar]),
    Map(&'t mut ValueMap, Vec<(String, TypeCategory)>),
    Records(&'t mut [&'a mut dyn Record], Vec<FieldTarget>),
    Many(&'t mut (dyn RecordSink + 'a), Vec<FieldTarget>),
}

impl<'a> Target<'a> {
    /// Matches the result columns to destinations.
    ///
    /// # Panics
    ///
    /// Panics for a map destination when a column's declared type is outside
    /// the known type catalog.
    pub(crate) fn materializer<'t>(
        &'t mut self,
        columns: &[SqliteColumn],
        entities: &[Arc<RecordShape>],
        bindings: &[RecordBinding],
        slots: &[usize],
    ) -> Result<Materializer<'t, 'a>> {
        let materializer = match self {
            Target::Scalars(scalars) => {
                if columns.len() != scalars.len() {
                    return Err(Error::KindMismatch(format!(
                        "expected {} columns for {} scalar destinations, got {}",
                        scalars.len(),
                        scalars.len(),
                        columns.len()
                    )));
                }
                Materializer::Scalars(scalars.as_mut_slice())
            }
            Target::Map(map) => {
                let placeholders = columns
                    .iter()
                    .map(|column| {
                        let type_name = column.type_info().name();
                        let category = TypeCategory::of(type_name).unwrap_or_else(|| {
                            panic!(
                                "unrecognized type {type_name:?} of column {:?}",
                                column.name()
                            )
                        });
                        (column.name().to_owned(), category)
                    })
                    .collect();
                Materializer::Map(&mut **map, placeholders)
            }
            Target::Records(records) => Materializer::Records(
                records.as_mut_slice(),
                resolve_fields(columns, entities, bindings, slots)?,
            ),
            Target::Many(sink) => {
                Materializer::Many(&mut **sink, resolve_fields(columns, entities, bindings, slots)?)
            }
        };
        Ok(materializer)
    }
}

impl Materializer<'_, '_> {
    /// Scans one row into the destinations. Record destinations take the
    /// values of the last row scanned.
    pub(crate) fn scan(&mut self, row: &SqliteRow, statement: &str) -> Result<()> {
        match self {
            Materializer::Scalars(scalars) => {
                for (index, scalar) in scalars.iter_mut().enumerate() {
                    scalar
                        .decode(row, index)
                        .map_err(Error::database(statement))?;
                }
            }
            Materializer::Map(map, placeholders) => {
                for (index, (name, category)) in placeholders.iter().enumerate() {
                    let value = category
                        .decode(row, index)
                        .map_err(Error::database(statement))?;
                    map.insert(name.clone(), value);
                }
            }
            Materializer::Records(records, fields) => {
                for field in fields.iter() {
                    decode_into(&mut *records[field.entity], field, row, statement)?;
                }
            }
            Materializer::Many(sink, fields) => {
                sink.push_record(&mut |record| {
                    fields
                        .iter()
                        .try_for_each(|field| decode_into(record, field, row, statement))
                })?;
            }
        }
        Ok(())
    }
}

fn decode_into(
    record: &mut dyn Record,
    field: &FieldTarget,
    row: &SqliteRow,
    statement: &str,
) -> Result<()> {
    let decoded = record
        .decode_field(field.ident, row, field.column)
        .map_err(Error::database(statement))?;
    if !decoded {
        return Err(Error::Lookup(format!(
            "record has no field {:?} for column {}",
            field.ident, field.column
        )));
    }
    Ok(())
}

/// Resolves each column to the entity field it is read into.
///
/// An alias made by [`encode_alias`](crate::expand::encode_alias) only matches
/// the entity of a record macro carrying its prefix; `slots` holds the entity
/// index of each macro in `bindings`. A plain column name matches the first
/// entity, in binding order, that has the field.
pub(crate) fn resolve_fields(
    columns: &[SqliteColumn],
    entities: &[Arc<RecordShape>],
    bindings: &[RecordBinding],
    slots: &[usize],
) -> Result<Vec<FieldTarget>> {
    columns
        .iter()
        .enumerate()
        .map(|(column, meta)| {
            let name = meta.name();
            let found = match decode_alias(name) {
                Some((prefix, field)) => bindings
                    .iter()
                    .zip(slots)
                    .filter(|(binding, _)| binding.prefix.as_deref() == Some(prefix))
                    .find_map(|(_, &index)| {
                        entities[index].field(field).map(|field| (index, field.ident))
                    }),
                None => entities.iter().enumerate().find_map(|(index, entity)| {
                    entity.field(name).map(|field| (index, field.ident))
                }),
            };
            let (entity, ident) = found.ok_or_else(|| {
                Error::Lookup(format!("missing destination for column {name:?}"))
            })?;
            Ok(FieldTarget {
                column,
                entity,
                ident,
            })
        })
        .collect()
}
