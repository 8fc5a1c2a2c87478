use crate::record::{FieldDecl, RecordType};
use crate::{Error, Result};
use parking_lot::Mutex;
use std::any::TypeId;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Parsed form of a `#[db = "..."]` field tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReflectTag {
    pub name: String,
    pub omit_empty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflectField {
    /// The Rust field identifier the column is read into and written from.
    pub ident: &'static str,
    pub tag: ReflectTag,
}

/// Column layout of a record type: column name to field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordShape {
    pub name: &'static str,
    pub fields: BTreeMap<String, ReflectField>,
}

impl RecordShape {
    /// Returns the column names, sorted.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }

    pub fn field(&self, column: &str) -> Option<&ReflectField> {
        self.fields.get(column)
    }
}

/// Shape of a query destination or argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entity {
    Record(Arc<RecordShape>),
    Map,
    Scalar,
}

impl Entity {
    pub fn kind(&self) -> &'static str {
        match self {
            Entity::Record(_) => "record",
            Entity::Map => "map",
            Entity::Scalar => "scalar",
        }
    }
}

/// Builds the shape of a record type from its field declarations.
pub fn reflect(name: &'static str, decls: &[FieldDecl]) -> Result<RecordShape> {
    let mut fields = BTreeMap::new();
    for decl in decls {
        let tag = match decl.tag {
            Some(raw) => parse_tag(raw)
                .map_err(|err| Error::Parse(format!("field {}.{}: {err}", name, decl.ident)))?,
            None => ReflectTag::default(),
        };
        let column = if tag.name.is_empty() {
            decl.ident.to_lowercase()
        } else {
            tag.name.clone()
        };
        fields.insert(
            column,
            ReflectField {
                ident: decl.ident,
                tag,
            },
        );
    }
    Ok(RecordShape { name, fields })
}

fn parse_tag(tag: &str) -> std::result::Result<ReflectTag, String> {
    if tag.is_empty() {
        return Err("unexpected empty tag".to_owned());
    }

    let options: Vec<&str> = tag.split(',').collect();
    let mut reflect_tag = ReflectTag {
        name: options[0].trim().to_owned(),
        omit_empty: false,
    };
    match options.as_slice() {
        [_] => {}
        [_, option] if option.trim().eq_ignore_ascii_case("omitempty") => {
            reflect_tag.omit_empty = true;
        }
        [_, option] => return Err(format!("unexpected tag value {option:?}")),
        _ => return Err(format!("unexpected tag {tag:?}")),
    }
    Ok(reflect_tag)
}

/// ReflectCache caches record shapes by type for faster look up times.
///
/// Entries are never evicted: the cache grows with the number of distinct
/// record types seen.
#[derive(Debug, Default)]
pub struct ReflectCache {
    cache: Mutex<HashMap<TypeId, Arc<RecordShape>>>,
}

impl ReflectCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the shape of `ty`, reflecting it on first use.
    pub fn reflect(&self, ty: RecordType) -> Result<Arc<RecordShape>> {
        let mut cache = self.cache.lock();
        if let Some(shape) = cache.get(&ty.id) {
            return Ok(Arc::clone(shape));
        }

        let shape = Arc::new(reflect(ty.name, ty.fields)?);
        log::debug!("reflected record type {} ({} fields)", ty.name, shape.fields.len());
        cache.insert(ty.id, Arc::clone(&shape));
        Ok(shape)
    }

    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Record;

    crate::record! {
        #[derive(Debug, Default)]
        struct Account {
            #[db = "id"]
            id: i64,
            #[db = "name,omitempty"]
            name: String,
        }
    }

    crate::record! {
        #[derive(Debug, Default)]
        #[allow(non_snake_case)]
        struct Untagged {
            Nickname: String,
            #[db = ",omitempty"]
            Score: i64,
        }
    }

    crate::record! {
        #[derive(Debug, Default)]
        struct BadTag {
            #[db = "id,primary"]
            id: i64,
        }
    }

    #[test]
    fn test_reflect() {
        let shape = reflect(Account::record_name(), Account::field_decls()).unwrap();
        assert_eq!(shape.name, "Account");
        assert_eq!(shape.field_names(), vec!["id", "name"]);
        assert!(!shape.field("id").unwrap().tag.omit_empty);
        assert!(shape.field("name").unwrap().tag.omit_empty);
    }

    #[test]
    fn test_reflect_lowercases_untagged_fields() {
        let shape = reflect(Untagged::record_name(), Untagged::field_decls()).unwrap();
        assert_eq!(shape.field_names(), vec!["nickname", "score"]);
        assert_eq!(shape.field("score").unwrap().ident, "Score");
        assert!(shape.field("score").unwrap().tag.omit_empty);
    }

    #[test]
    fn test_reflect_rejects_unknown_option() {
        let err = reflect(BadTag::record_name(), BadTag::field_decls()).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
        assert!(err.to_string().contains("primary"));
    }

    #[test]
    fn test_parse_tag() {
        assert_eq!(
            parse_tag("name").unwrap(),
            ReflectTag {
                name: "name".into(),
                omit_empty: false
            }
        );
        assert!(parse_tag("name,OmitEmpty").unwrap().omit_empty);
        assert!(parse_tag("").is_err());
        assert!(parse_tag("a,omitempty,b").is_err());
    }

    #[test]
    fn test_reflect_cache_memoizes_by_type() {
        let cache = ReflectCache::new();
        let first = cache.reflect(RecordType::of::<Account>()).unwrap();
        let second = cache.reflect(RecordType::of::<Account>()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);

        cache.reflect(RecordType::of::<Untagged>()).unwrap();
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_reflect_cache_does_not_store_failures() {
        let cache = ReflectCache::new();
        assert!(cache.reflect(RecordType::of::<BadTag>()).is_err());
        assert!(cache.is_empty());
    }
}
