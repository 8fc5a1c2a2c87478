use crate::Value;
use sqlx::sqlite::SqliteRow;
use std::any::TypeId;

/// Declaration of one field of a record type, as written in its definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDecl {
    /// The Rust field identifier.
    pub ident: &'static str,
    /// The raw `#[db = "..."]` tag, if any.
    pub tag: Option<&'static str>,
}

/// A struct whose fields map onto SQL columns.
///
/// Implementations are generated by the [`record!`](crate::record!) macro.
/// The trait is the field-name to accessor table the engine works through:
/// [`field_value`](Record::field_value) reads a field for named arguments and
/// [`decode_field`](Record::decode_field) writes a result column into one.
pub trait Record: Send + Sync {
    /// Name referenced by record macros, e.g. `Person` in `{p INTO Person}`.
    fn record_name() -> &'static str
    where
        Self: Sized;

    fn field_decls() -> &'static [FieldDecl]
    where
        Self: Sized;

    /// Returns the value of the field with identifier `ident`.
    fn field_value(&self, ident: &str) -> Option<Value>;

    /// Decodes column `index` of `row` into the field with identifier `ident`.
    ///
    /// Returns `Ok(false)` if the record has no such field.
    fn decode_field(
        &mut self,
        ident: &str,
        row: &SqliteRow,
        index: usize,
    ) -> Result<bool, sqlx::Error>;
}

/// Type identity and static shape of a [`Record`] implementation, usable
/// where only a `dyn Record` is at hand.
#[derive(Debug, Clone, Copy)]
pub struct RecordType {
    pub(crate) id: TypeId,
    pub(crate) name: &'static str,
    pub(crate) fields: &'static [FieldDecl],
}

impl RecordType {
    pub fn of<T: Record + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: T::record_name(),
            fields: T::field_decls(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Collection destination filled by [`Querier::for_many`](crate::Querier::for_many).
pub trait RecordSink: Send {
    /// Materializes a fresh element, lets `fill` populate it and appends it.
    fn push_record(
        &mut self,
        fill: &mut dyn FnMut(&mut dyn Record) -> crate::Result<()>,
    ) -> crate::Result<()>;
}

impl<T: Record + Default> RecordSink for Vec<T> {
    fn push_record(
        &mut self,
        fill: &mut dyn FnMut(&mut dyn Record) -> crate::Result<()>,
    ) -> crate::Result<()> {
        let mut scratch = T::default();
        fill(&mut scratch)?;
        self.push(scratch);
        Ok(())
    }
}

/// Defines a struct and implements [`Record`] for it.
///
/// Fields map to the column named by their `#[db = "..."]` tag, or to their
/// lower-cased identifier when untagged. A tag may add the `omitempty` option.
/// Every field type must convert into [`Value`] and decode from SQLite.
///
/// # Examples
///
/// ```
/// use sqlx_record_bind::{record, Record};
///
/// record! {
///     #[derive(Debug, Default)]
///     pub struct Person {
///         #[db = "name"]
///         pub name: String,
///         #[db = "age,omitempty"]
///         pub age: i64,
///     }
/// }
///
/// assert_eq!(Person::record_name(), "Person");
/// assert_eq!(Person::field_decls().len(), 2);
/// ```
#[macro_export]
macro_rules! record {
    (@tag) => { ::std::option::Option::None };
    (@tag $tag:literal) => { ::std::option::Option::Some($tag) };
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[db = $tag:literal])?
                $field_vis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $( $field_vis $field: $ty, )*
        }

        impl $crate::Record for $name {
            fn record_name() -> &'static str {
                ::std::stringify!($name)
            }

            fn field_decls() -> &'static [$crate::FieldDecl] {
                const FIELDS: &[$crate::FieldDecl] = &[
                    $(
                        $crate::FieldDecl {
                            ident: ::std::stringify!($field),
                            tag: $crate::record!(@tag $($tag)?),
                        },
                    )*
                ];
                FIELDS
            }

            fn field_value(&self, ident: &str) -> ::std::option::Option<$crate::Value> {
                $(
                    if ident == ::std::stringify!($field) {
                        return ::std::option::Option::Some($crate::Value::from(
                            ::std::clone::Clone::clone(&self.$field),
                        ));
                    }
                )*
                ::std::option::Option::None
            }

            fn decode_field(
                &mut self,
                ident: &str,
                row: &$crate::__private::SqliteRow,
                index: usize,
            ) -> ::std::result::Result<bool, $crate::__private::sqlx::Error> {
                $(
                    if ident == ::std::stringify!($field) {
                        self.$field = $crate::__private::Row::try_get(row, index)?;
                        return ::std::result::Result::Ok(true);
                    }
                )*
                let _ = (row, index);
                ::std::result::Result::Ok(false)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::record! {
        #[derive(Debug, Default, Clone, PartialEq)]
        struct Band {
            #[db = "band_name"]
            name: String,
            formed: i64,
            #[db = ",omitempty"]
            label: Option<String>,
        }
    }

    #[test]
    fn test_record_decls() {
        assert_eq!(Band::record_name(), "Band");
        assert_eq!(
            Band::field_decls(),
            &[
                FieldDecl {
                    ident: "name",
                    tag: Some("band_name")
                },
                FieldDecl {
                    ident: "formed",
                    tag: None
                },
                FieldDecl {
                    ident: "label",
                    tag: Some(",omitempty")
                },
            ]
        );
    }

    #[test]
    fn test_record_field_value() {
        let band = Band {
            name: "meshuggah".into(),
            formed: 1987,
            label: None,
        };
        assert_eq!(band.field_value("name"), Some(Value::Text("meshuggah".into())));
        assert_eq!(band.field_value("formed"), Some(Value::Integer(1987)));
        assert_eq!(band.field_value("label"), Some(Value::Null));
        assert_eq!(band.field_value("band_name"), None);
    }

    #[test]
    fn test_record_sink_appends_fresh_elements() {
        let mut bands: Vec<Band> = Vec::new();
        for formed in [1987, 1990] {
            bands
                .push_record(&mut |_record: &mut dyn Record| Ok(()))
                .unwrap();
            bands.last_mut().unwrap().formed = formed;
        }
        assert_eq!(bands.len(), 2);
        assert_eq!(bands[0].formed, 1987);
        assert_eq!(bands[1].formed, 1990);
    }

    #[test]
    fn test_record_type_of() {
        let ty = RecordType::of::<Band>();
        assert_eq!(ty.name(), "Band");
        assert_eq!(ty.fields.len(), 3);
        assert_eq!(ty.id, TypeId::of::<Band>());
    }
}
