//! Lexical scanner for bind parameters.
//!
//! Recognizes the SQLite parameter templates:
//!  - `?` (positional, passed through to the driver)
//!  - `?NNN` where `NNN` is an integer literal
//!  - `:VVV`, `@VVV`, `$VVV` where `VVV` is an alphanumeric identifier

use crate::{Error, Result};

/// Characters that may open a bind parameter.
pub const SIGILS: [char; 4] = [':', '@', '$', '?'];

/// A named bind parameter found in a statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindToken {
    pub sigil: char,
    pub name: String,
}

impl BindToken {
    pub fn new(sigil: char, name: impl Into<String>) -> Self {
        Self {
            sigil,
            name: name.into(),
        }
    }
}

/// Returns the offset of the earliest sigil in `stmt`, if any.
///
/// This can return false positives (a `?` that is only a positional
/// placeholder, a `:` inside a literal).
pub fn locate_bind_region(stmt: &str) -> Option<usize> {
    stmt.find(&SIGILS[..])
}

/// Extracts the named bind parameters of `stmt`, starting at `offset`.
///
/// Bare `?` placeholders are skipped. The result is sorted by name, which has
/// nothing to do with where the tokens appear in the statement.
pub fn parse_bind_tokens(stmt: &str, offset: usize) -> Result<Vec<BindToken>> {
    let mut tokens = Vec::new();
    let mut cursor = offset;

    while let Some(found) = stmt.get(cursor..).and_then(locate_bind_region) {
        let start = cursor + found;
        // Every sigil is a single ASCII byte.
        let sigil = char::from(stmt.as_bytes()[start]);
        let rest = &stmt[start + 1..];

        if sigil == '?' && !rest.starts_with(|c: char| c.is_ascii_digit()) {
            cursor = start + 1;
            continue;
        }

        let mut end = rest.len();
        for (index, c) in rest.char_indices() {
            if is_terminator(c) {
                end = index;
                break;
            }
            let accepted = match sigil {
                '?' => c.is_ascii_digit(),
                _ => c.is_alphanumeric() || c == '_',
            };
            if !accepted {
                return Err(Error::Parse(format!(
                    "unexpected named argument found in statement {stmt:?}"
                )));
            }
        }

        let name = &rest[..end];
        if name.is_empty() {
            return Err(Error::Parse(format!(
                "empty named argument at offset {start} in statement {stmt:?}"
            )));
        }
        tokens.push(BindToken::new(sigil, name));
        cursor = start + 1 + end;
    }

    tokens.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(tokens)
}

fn is_terminator(c: char) -> bool {
    c.is_whitespace() || matches!(c, ',' | ';' | '=' | ')')
}
