//! Parser for record macros: `{Name}` and `{qualifier INTO Name}`.

use crate::{Error, Result};
use std::collections::BTreeSet;
use std::ops::Range;

/// Marker recorded in [`RecordBinding::fields`] for `prefix.*`.
pub const WILDCARD: &str = "*";

/// A record macro found in a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordBinding {
    /// Record type name the macro expands.
    pub name: String,
    /// Table or alias qualifier, unquoted.
    pub prefix: Option<String>,
    /// Columns listed explicitly in a dotted qualifier, `*` included.
    pub fields: BTreeSet<String>,
    pub wildcard: bool,
    /// Byte span of the whole `{...}` in the statement.
    pub span: Range<usize>,
}

/// Returns the offset of the next `{` in `stmt`, if any.
pub fn locate_record_region(stmt: &str) -> Option<usize> {
    stmt.find('{')
}

/// Parses every record macro of `stmt` from `offset`, left to right.
pub fn parse_record_bindings(stmt: &str, offset: usize) -> Result<Vec<RecordBinding>> {
    let mut bindings = Vec::new();
    let mut cursor = offset;

    while let Some(found) = stmt.get(cursor..).and_then(locate_record_region) {
        let mut start = cursor + found;
        let end = match stmt[start..].find('}') {
            Some(close) => start + close,
            None => {
                return Err(Error::Parse(format!(
                    "missing record terminator '}}' in statement {stmt:?}"
                )))
            }
        };
        // The closing brace belongs to the innermost opening one.
        if let Some(inner) = stmt[start + 1..end].rfind('{') {
            start += inner + 1;
        }

        bindings.push(parse_record_expression(stmt, start..end + 1)?);
        cursor = end + 1;
    }

    Ok(bindings)
}

fn parse_record_expression(stmt: &str, span: Range<usize>) -> Result<RecordBinding> {
    let inner = stmt[span.start + 1..span.end - 1].trim();
    let unexpected = || Error::Parse(format!("unexpected record expression {inner:?}"));

    let tokens: Vec<&str> = inner.split_whitespace().collect();
    let mut binding = RecordBinding {
        name: String::new(),
        prefix: None,
        fields: BTreeSet::new(),
        wildcard: false,
        span,
    };

    match tokens.as_slice() {
        [name] => binding.name = (*name).to_owned(),
        [.., keyword, name] if tokens.len() >= 3 && keyword.eq_ignore_ascii_case("INTO") => {
            binding.name = (*name).to_owned();
            let qualifier = qualifier_of(inner, keyword).ok_or_else(unexpected)?;
            parse_qualifier(qualifier, &mut binding).map_err(|err| match err {
                QualifierError::Quote(quote) => {
                    Error::Parse(format!("missing quote terminator {quote} in {inner:?}"))
                }
                QualifierError::Malformed => unexpected(),
            })?;
        }
        _ => return Err(unexpected()),
    }

    if !is_identifier(&binding.name) {
        return Err(unexpected());
    }
    Ok(binding)
}

/// Returns the text in front of the final `INTO` keyword of `inner`.
fn qualifier_of<'a>(inner: &'a str, keyword: &str) -> Option<&'a str> {
    let before_name = inner[..inner.trim_end().rfind(char::is_whitespace)?].trim_end();
    let qualifier = before_name.strip_suffix(keyword)?;
    Some(qualifier.trim())
}

enum QualifierError {
    Quote(char),
    Malformed,
}

fn parse_qualifier(
    qualifier: &str,
    binding: &mut RecordBinding,
) -> std::result::Result<(), QualifierError> {
    for quote in ['\'', '"'] {
        if qualifier.matches(quote).count() % 2 != 0 {
            return Err(QualifierError::Quote(quote));
        }
    }

    // Prefixes are emitted unquoted and inside column aliases.
    if let Some(quoted) = unquote(qualifier) {
        if !is_identifier(quoted) {
            return Err(QualifierError::Malformed);
        }
        binding.prefix = Some(quoted.to_owned());
        return Ok(());
    }

    if !qualifier.contains(&['.', ','][..]) {
        if !is_identifier(qualifier) {
            return Err(QualifierError::Malformed);
        }
        binding.prefix = Some(qualifier.to_owned());
        return Ok(());
    }

    for (index, reference) in qualifier.split(',').map(str::trim).enumerate() {
        let (prefix, column) = reference
            .rsplit_once('.')
            .ok_or(QualifierError::Malformed)?;
        let prefix = unquote(prefix).unwrap_or(prefix);
        if !is_identifier(prefix) || column.is_empty() {
            return Err(QualifierError::Malformed);
        }
        if index == 0 {
            binding.prefix = Some(prefix.to_owned());
        }
        if column == WILDCARD {
            binding.wildcard = true;
        }
        binding.fields.insert(column.to_owned());
    }
    Ok(())
}

fn unquote(text: &str) -> Option<&str> {
    ['\'', '"'].into_iter().find_map(|quote| {
        text.strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
            .filter(|inner| !inner.contains(quote))
    })
}

fn is_identifier(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(stmt: &str) -> Result<Vec<RecordBinding>> {
        parse_record_bindings(stmt, 0)
    }

    #[test]
    fn test_locate_record_region() {
        assert_eq!(locate_record_region("SELECT 1"), None);
        assert_eq!(locate_record_region("SELECT {Person} FROM t"), Some(7));
    }

    #[test]
    fn test_parse_bare_name() {
        let stmt = "SELECT {Person} FROM person";
        let bindings = parse(stmt).unwrap();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].name, "Person");
        assert_eq!(bindings[0].prefix, None);
        assert!(bindings[0].fields.is_empty());
        assert_eq!(&stmt[bindings[0].span.clone()], "{Person}");
    }

    #[test]
    fn test_parse_into_with_identifier() {
        let bindings = parse("SELECT { test into Person } FROM test").unwrap();
        assert_eq!(bindings[0].name, "Person");
        assert_eq!(bindings[0].prefix.as_deref(), Some("test"));
        assert!(!bindings[0].wildcard);
    }

    #[test]
    fn test_parse_into_with_quoted_qualifier() {
        let bindings = parse(r#"SELECT {"p" INTO Person}, {'a' INTO Address} FROM p, a"#).unwrap();
        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[0].prefix.as_deref(), Some("p"));
        assert_eq!(bindings[1].name, "Address");
        assert_eq!(bindings[1].prefix.as_deref(), Some("a"));
    }

    #[test]
    fn test_parse_into_with_dotted_references() {
        let bindings = parse("SELECT {p.*, p.name INTO Person} FROM person AS p").unwrap();
        let binding = &bindings[0];
        assert_eq!(binding.prefix.as_deref(), Some("p"));
        assert!(binding.wildcard);
        assert_eq!(
            binding.fields.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["*", "name"]
        );

        let bindings = parse("SELECT {p.name,p.age INTO Person} FROM person AS p").unwrap();
        assert!(!bindings[0].wildcard);
        assert_eq!(bindings[0].fields.len(), 2);
    }

    #[test]
    fn test_parse_spans_are_left_to_right() {
        let stmt = "SELECT {a INTO A}, {b INTO B} FROM a, b";
        let bindings = parse(stmt).unwrap();
        assert_eq!(&stmt[bindings[0].span.clone()], "{a INTO A}");
        assert_eq!(&stmt[bindings[1].span.clone()], "{b INTO B}");
    }

    #[test]
    fn test_parse_innermost_brace() {
        let stmt = "SELECT { {Person} FROM p";
        let bindings = parse(stmt).unwrap();
        assert_eq!(bindings.len(), 1);
        assert_eq!(&stmt[bindings[0].span.clone()], "{Person}");
    }

    #[test]
    fn test_parse_unexpected_expressions() {
        for stmt in [
            "SELECT {} FROM t",
            "SELECT {a Person} FROM t",
            "SELECT {a FROM Person} FROM t",
            "SELECT {a INTO} FROM t",
            "SELECT {a b INTO Person} FROM t",
            "SELECT {'my t' INTO Person} FROM t",
            r#"SELECT {"s.t" INTO Person} FROM t"#,
            "SELECT {s.t.name INTO Person} FROM t",
        ] {
            let err = parse(stmt).unwrap_err();
            assert!(
                err.to_string().contains("unexpected record expression"),
                "{stmt}: {err}"
            );
        }
    }

    #[test]
    fn test_parse_missing_quote_terminator() {
        let err = parse(r#"SELECT {"test INTO Person} FROM t"#).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
        assert!(err.to_string().contains("missing quote terminator \""));
    }

    #[test]
    fn test_parse_missing_record_terminator() {
        let err = parse("SELECT {Person FROM t").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }
}
