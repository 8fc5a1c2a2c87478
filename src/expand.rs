//! Expansion of record macros into literal column lists.

use crate::parse::RecordBinding;
use crate::reflect::RecordShape;
use crate::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

const ALIAS_PREFIX: &str = "_pfx_";
const ALIAS_SEPARATOR: &str = "_sfx_";

/// Encodes a qualified field as a column alias: `_pfx_<prefix>_sfx_<field>`.
pub fn encode_alias(prefix: &str, field: &str) -> String {
    format!("{ALIAS_PREFIX}{prefix}{ALIAS_SEPARATOR}{field}")
}

/// Recovers `(prefix, field)` from an alias made by [`encode_alias`].
///
/// The prefix must not itself contain `_sfx_`. Prefixes are plain
/// identifiers, quoted qualifiers included.
pub fn decode_alias(alias: &str) -> Option<(&str, &str)> {
    alias.strip_prefix(ALIAS_PREFIX)?.split_once(ALIAS_SEPARATOR)
}

/// Rewrites every record macro of `stmt` into the column list of the entity it
/// names.
///
/// A field present in more than one of `entities` is aliased with
/// [`encode_alias`] when its macro carries a prefix. Explicit field lists of
/// dotted qualifiers do not narrow the output: the full field set of the
/// entity is always emitted.
pub fn expand(
    stmt: &str,
    bindings: &[RecordBinding],
    entities: &[Arc<RecordShape>],
) -> Result<String> {
    if bindings.is_empty() {
        return Ok(stmt.to_owned());
    }

    let slots = assign_entities(stmt, bindings, entities)?;
    let collisions = intersect_fields(entities);
    let mut expanded = String::with_capacity(stmt.len() * 2);
    let mut last = 0;

    for (binding, &index) in bindings.iter().zip(&slots) {
        let entity = &entities[index];
        let columns: Vec<String> = entity
            .field_names()
            .into_iter()
            .map(|field| match binding.prefix.as_deref() {
                Some(prefix) if collisions[index].contains(field) => {
                    format!("{prefix}.{field} AS {}", encode_alias(prefix, field))
                }
                Some(prefix) => format!("{prefix}.{field}"),
                None => field.to_owned(),
            })
            .collect();

        expanded.push_str(&stmt[last..binding.span.start]);
        expanded.push_str(&columns.join(", "));
        last = binding.span.end;
    }
    expanded.push_str(&stmt[last..]);

    Ok(expanded)
}

/// Assigns each record macro the index of the entity it reads into.
///
/// The n-th macro naming a record type goes to the n-th entity of that type,
/// so a type bound twice can be joined with itself. Extra macros of a type
/// share its last entity.
pub fn assign_entities(
    stmt: &str,
    bindings: &[RecordBinding],
    entities: &[Arc<RecordShape>],
) -> Result<Vec<usize>> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    bindings
        .iter()
        .map(|binding| {
            let candidates: Vec<usize> = entities
                .iter()
                .enumerate()
                .filter(|(_, entity)| entity.name == binding.name)
                .map(|(index, _)| index)
                .collect();
            let nth = seen.entry(binding.name.as_str()).or_default();
            let index = candidates
                .get(*nth)
                .or_else(|| candidates.last())
                .copied()
                .ok_or_else(|| {
                    Error::Lookup(format!(
                        "no entity found with the name {:?} in statement {stmt:?}",
                        binding.name
                    ))
                })?;
            *nth += 1;
            Ok(index)
        })
        .collect()
}

/// For each entity, the names of its fields that another entity also has.
fn intersect_fields(entities: &[Arc<RecordShape>]) -> Vec<HashSet<&str>> {
    let mut owners: HashMap<&str, usize> = HashMap::new();
    for entity in entities {
        for field in entity.fields.keys() {
            *owners.entry(field.as_str()).or_default() += 1;
        }
    }

    entities
        .iter()
        .map(|entity| {
            entity
                .fields
                .keys()
                .map(String::as_str)
                .filter(|field| owners[field] > 1)
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_record_bindings;
    use crate::reflect::reflect;
    use crate::Record;

    crate::record! {
        #[derive(Debug, Default)]
        struct Person {
            #[db = "name"]
            name: String,
            #[db = "age"]
            age: i64,
        }
    }

    crate::record! {
        #[derive(Debug, Default)]
        struct Master {
            #[db = "name"]
            name: String,
            #[db = "type"]
            kind: String,
        }
    }

    fn shape<T: Record>() -> Arc<RecordShape> {
        Arc::new(reflect(T::record_name(), T::field_decls()).unwrap())
    }

    fn run(stmt: &str, entities: &[Arc<RecordShape>]) -> Result<String> {
        let bindings = parse_record_bindings(stmt, 0)?;
        expand(stmt, &bindings, entities)
    }

    #[test]
    fn test_alias_round_trip() {
        let alias = encode_alias("sqlite_master", "name");
        assert_eq!(alias, "_pfx_sqlite_master_sfx_name");
        assert_eq!(decode_alias(&alias), Some(("sqlite_master", "name")));
        assert_eq!(decode_alias("name"), None);
        assert_eq!(decode_alias("_pfx_name"), None);
    }

    #[test]
    fn test_expand_with_prefix() {
        let expanded = run(
            "SELECT {test INTO Person} FROM test WHERE test.name=:name;",
            &[shape::<Person>()],
        )
        .unwrap();
        assert_eq!(
            expanded,
            "SELECT test.age, test.name FROM test WHERE test.name=:name;"
        );
    }

    #[test]
    fn test_expand_bare_name() {
        let expanded = run("SELECT {Person} FROM test", &[shape::<Person>()]).unwrap();
        assert_eq!(expanded, "SELECT age, name FROM test");
    }

    #[test]
    fn test_expand_aliases_collisions() {
        let expanded = run(
            "SELECT {test INTO Person}, {sqlite_master INTO Master} FROM test, sqlite_master",
            &[shape::<Person>(), shape::<Master>()],
        )
        .unwrap();
        assert_eq!(
            expanded,
            "SELECT test.age, test.name AS _pfx_test_sfx_name, \
             sqlite_master.name AS _pfx_sqlite_master_sfx_name, sqlite_master.type \
             FROM test, sqlite_master"
        );
    }

    #[test]
    fn test_expand_does_not_alias_unbound_collisions() {
        // Master shares `name` with Person but is not bound.
        let expanded = run("SELECT {t INTO Person} FROM t", &[shape::<Person>()]).unwrap();
        assert_eq!(expanded, "SELECT t.age, t.name FROM t");
    }

    #[test]
    fn test_expand_explicit_fields_emit_full_set() {
        let expanded = run("SELECT {t.name INTO Person} FROM t", &[shape::<Person>()]).unwrap();
        assert_eq!(expanded, "SELECT t.age, t.name FROM t");
    }

    #[test]
    fn test_expand_self_join() {
        let person = shape::<Person>();
        let expanded = run(
            "SELECT {x INTO Person}, {y INTO Person} FROM t AS x, t AS y",
            &[Arc::clone(&person), person],
        )
        .unwrap();
        assert_eq!(
            expanded,
            "SELECT x.age AS _pfx_x_sfx_age, x.name AS _pfx_x_sfx_name, \
             y.age AS _pfx_y_sfx_age, y.name AS _pfx_y_sfx_name FROM t AS x, t AS y"
        );
    }

    #[test]
    fn test_assign_entities_in_order() {
        let stmt = "SELECT {x INTO Person}, {m INTO Master}, {y INTO Person}, {z INTO Person} FROM t";
        let bindings = parse_record_bindings(stmt, 0).unwrap();
        let entities = [shape::<Person>(), shape::<Master>(), shape::<Person>()];
        assert_eq!(
            assign_entities(stmt, &bindings, &entities).unwrap(),
            vec![0, 1, 2, 2]
        );

        let err = assign_entities(stmt, &bindings, &entities[..1]).unwrap_err();
        assert!(err.to_string().contains("no entity found with the name \"Master\""));
    }

    #[test]
    fn test_expand_no_entity_found() {
        let err = run("SELECT {t INTO Person} FROM t", &[shape::<Master>()]).unwrap_err();
        assert!(matches!(err, Error::Lookup(_)));
        assert!(err
            .to_string()
            .contains("no entity found with the name \"Person\""));
    }

    #[test]
    fn test_expand_without_bindings() {
        let stmt = "SELECT name FROM t";
        assert_eq!(expand(stmt, &[], &[]).unwrap(), stmt);
    }
}
