use crate::builder::Q;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, TypeInfo, ValueRef};
use std::collections::HashMap;

/// Generic string-keyed value container, used both as a named argument source
/// and as a map destination.
pub type ValueMap = HashMap<String, Value>;

/// A dynamically typed SQLite value.
///
/// `Value` is what named and positional arguments are bound as, and what map
/// destinations are filled with.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    /// Binds this value as the next positional argument of `query`.
    pub fn bind<'q>(self, query: Q<'q>) -> Q<'q> {
        match self {
            Value::Null => query.bind(Option::<i64>::None),
            Value::Boolean(v) => query.bind(v),
            Value::Integer(v) => query.bind(v),
            Value::Real(v) => query.bind(v),
            Value::Text(v) => query.bind(v),
            Value::Blob(v) => query.bind(v),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

macro_rules! impl_from {
    ($variant:ident, $target:ty => $($source:ty),+) => {
        $(
            impl From<$source> for Value {
                fn from(value: $source) -> Self {
                    Value::$variant(<$target>::from(value))
                }
            }
        )+
    };
}

impl_from!(Boolean, bool => bool);
impl_from!(Integer, i64 => i8, i16, i32, i64, u8, u16, u32);
impl_from!(Real, f64 => f32, f64);
impl_from!(Text, String => String, &str);
impl_from!(Blob, Vec<u8> => Vec<u8>, &[u8]);

impl<T> From<Option<T>> for Value
where
    Value: From<T>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Value::from)
    }
}

/// Category of a column's declared database type, selecting the placeholder a
/// map destination scans into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Text,
    Integer,
    Boolean,
    Real,
    Blob,
    Null,
}

impl TypeCategory {
    /// Maps a type name reported by the SQLite driver to its category, `None`
    /// when unrecognized. Declared types such as `VARCHAR(100)` reach this
    /// already reduced to their affinity name.
    pub fn of(type_name: &str) -> Option<Self> {
        let category = match type_name.to_ascii_uppercase().as_str() {
            "TEXT" | "DATE" | "TIME" | "DATETIME" => Self::Text,
            "INTEGER" => Self::Integer,
            "BOOLEAN" => Self::Boolean,
            "REAL" | "NUMERIC" => Self::Real,
            "BLOB" => Self::Blob,
            "NULL" => Self::Null,
            _ => return None,
        };
        Some(category)
    }

    /// Decodes the column at `index` of `row` into a [`Value`] of this category.
    ///
    /// A `Null` category (no declared type, as for computed expressions) falls
    /// back to the storage class of the value actually returned.
    ///
    /// # Panics
    ///
    /// Panics when the storage class of the returned value is not a known type
    /// name. The SQLite type catalog is closed, so this is a driver contract
    /// violation rather than a recoverable error.
    pub fn decode(self, row: &SqliteRow, index: usize) -> Result<Value, sqlx::Error> {
        let value = match self {
            Self::Text => row.try_get::<Option<String>, _>(index)?.into(),
            Self::Integer => row.try_get::<Option<i64>, _>(index)?.into(),
            Self::Boolean => row.try_get::<Option<bool>, _>(index)?.into(),
            Self::Real => row.try_get::<Option<f64>, _>(index)?.into(),
            Self::Blob => row.try_get::<Option<Vec<u8>>, _>(index)?.into(),
            Self::Null => {
                let raw = row.try_get_raw(index)?;
                if raw.is_null() {
                    return Ok(Value::Null);
                }
                let type_info = raw.type_info();
                let storage = Self::of(type_info.name()).unwrap_or_else(|| {
                    panic!("unrecognized storage class {:?}", type_info.name())
                });
                match storage {
                    Self::Null => Value::Null,
                    category => category.decode(row, index)?,
                }
            }
        };
        Ok(value)
    }
}
