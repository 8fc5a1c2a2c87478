use crate::bind::BindToken;
use crate::record::{Record, RecordType};
use crate::reflect::ReflectCache;
use crate::value::{Value, ValueMap};
use crate::{Error, Result};

/// An extra argument of [`Query::query`](crate::Query::query) or
/// [`Querier::exec`](crate::Querier::exec).
///
/// When a statement has named bind parameters, the first argument is the
/// source their values are resolved from; every other argument is bound to the
/// bare `?` placeholders, in order.
pub enum Arg<'a> {
    /// A single positional value.
    Value(Value),
    /// A map source: names are looked up as keys.
    Map(&'a ValueMap),
    /// A record source: names are looked up as columns of the record type.
    Record(RecordType, &'a dyn Record),
    /// A list of values, not supported as a named argument source.
    List(Vec<Value>),
}

impl<'a> Arg<'a> {
    pub fn map(map: &'a ValueMap) -> Self {
        Arg::Map(map)
    }

    pub fn record<T: Record + 'static>(record: &'a T) -> Self {
        Arg::Record(RecordType::of::<T>(), record)
    }

    pub fn list(values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        Arg::List(values.into_iter().map(Into::into).collect())
    }

    fn kind(&self) -> &'static str {
        match self {
            Arg::Value(_) => "value",
            Arg::Map(_) => "map",
            Arg::Record(..) => "record",
            Arg::List(_) => "list",
        }
    }

    /// Unwraps a positional value.
    pub(crate) fn into_value(self) -> Result<Value> {
        match self {
            Arg::Value(value) => Ok(value),
            other => Err(Error::KindMismatch(format!(
                "{} not supported as a positional argument",
                other.kind()
            ))),
        }
    }
}

impl<'a> From<&'a ValueMap> for Arg<'a> {
    fn from(map: &'a ValueMap) -> Self {
        Arg::Map(map)
    }
}

macro_rules! impl_from_value {
    ($($source:ty),+ $(,)?) => {
        $(
            impl From<$source> for Arg<'_> {
                fn from(value: $source) -> Self {
                    Arg::Value(Value::from(value))
                }
            }
        )+
    };
}

impl_from_value!(bool, i8, i16, i32, i64, u8, u16, u32, f32, f64, String, &str, Vec<u8>);

impl From<Value> for Arg<'_> {
    fn from(value: Value) -> Self {
        Arg::Value(value)
    }
}

impl<T> From<Option<T>> for Arg<'_>
where
    Value: From<T>,
{
    fn from(value: Option<T>) -> Self {
        Arg::Value(value.map_or(Value::Null, Value::from))
    }
}

/// Builds a `Vec<Arg>` from expressions convertible with `Arg::from`.
///
/// ```
/// use sqlx_record_bind::{args, Arg, ValueMap};
///
/// let mut filter = ValueMap::new();
/// filter.insert("name".into(), "fred".into());
/// let args: Vec<Arg> = args![&filter, 42, "positional"];
/// assert_eq!(args.len(), 3);
/// ```
#[macro_export]
macro_rules! args {
    ($($arg:expr),* $(,)?) => {
        ::std::vec![$($crate::Arg::from($arg)),*]
    };
}

/// A resolved named bind parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedArg {
    pub name: String,
    pub value: Value,
}

impl NamedArg {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Resolves every token against `source`, keeping the order of `tokens`.
pub fn build_named_args(
    source: &Arg<'_>,
    tokens: &[BindToken],
    reflect: &ReflectCache,
) -> Result<Vec<NamedArg>> {
    match source {
        Arg::Map(map) => tokens
            .iter()
            .map(|token| {
                map.get(&token.name)
                    .map(|value| NamedArg::new(token.name.as_str(), value.clone()))
                    .ok_or_else(|| {
                        Error::Lookup(format!("key {:?} missing from map", token.name))
                    })
            })
            .collect(),
        Arg::Record(ty, record) => {
            let shape = reflect.reflect(*ty)?;
            tokens
                .iter()
                .map(|token| {
                    shape
                        .field(&token.name)
                        .and_then(|field| record.field_value(field.ident))
                        .map(|value| NamedArg::new(token.name.as_str(), value))
                        .ok_or_else(|| {
                            Error::Lookup(format!(
                                "field {:?} missing from type {}",
                                token.name, shape.name
                            ))
                        })
                })
                .collect()
        }
        Arg::List(_) | Arg::Value(_) => Err(Error::KindMismatch(format!(
            "{} not supported as a named argument source",
            source.kind()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::record! {
        #[derive(Debug, Default)]
        struct Band {
            #[db = "name"]
            name: String,
            #[db = "age"]
            age: i64,
        }
    }

    fn tokens() -> Vec<BindToken> {
        vec![BindToken::new(':', "name"), BindToken::new('@', "age")]
    }

    #[test]
    fn test_build_named_args_with_map() {
        let mut map = ValueMap::new();
        map.insert("name".into(), "meshuggah".into());
        map.insert("age".into(), 42.into());

        let named = build_named_args(&Arg::map(&map), &tokens(), &ReflectCache::new()).unwrap();
        assert_eq!(
            named,
            vec![NamedArg::new("name", "meshuggah"), NamedArg::new("age", 42)]
        );
    }

    #[test]
    fn test_build_named_args_with_record() {
        let band = Band {
            name: "meshuggah".into(),
            age: 42,
        };
        let cache = ReflectCache::new();

        let named = build_named_args(&Arg::record(&band), &tokens(), &cache).unwrap();
        assert_eq!(
            named,
            vec![NamedArg::new("name", "meshuggah"), NamedArg::new("age", 42)]
        );
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_build_named_args_missing_key() {
        let map = ValueMap::new();
        let err = build_named_args(&Arg::map(&map), &tokens(), &ReflectCache::new()).unwrap_err();
        assert!(matches!(err, Error::Lookup(_)));
        assert!(err.to_string().contains("missing from map"));
    }

    #[test]
    fn test_build_named_args_missing_field() {
        let band = Band::default();
        let tokens = vec![BindToken::new(':', "label")];
        let err =
            build_named_args(&Arg::record(&band), &tokens, &ReflectCache::new()).unwrap_err();
        assert!(matches!(err, Error::Lookup(_)));
        assert!(err.to_string().contains("missing from type Band"));
    }

    #[test]
    fn test_build_named_args_rejects_lists() {
        let source = Arg::list([1, 2, 3]);
        let err = build_named_args(&source, &tokens(), &ReflectCache::new()).unwrap_err();
        assert!(matches!(err, Error::KindMismatch(_)));
    }

    #[test]
    fn test_args_from_options() {
        let args: Vec<Arg> = crate::args![Some(1i64), Option::<String>::None];
        let values = args
            .into_iter()
            .map(Arg::into_value)
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(values, vec![Value::Integer(1), Value::Null]);
    }

    #[test]
    fn test_into_value_rejects_sources() {
        let map = ValueMap::new();
        assert!(Arg::from(&map).into_value().is_err());
        assert_eq!(Arg::from(7).into_value().unwrap(), Value::Integer(7));
    }
}
