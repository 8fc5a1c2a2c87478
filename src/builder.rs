use regex::Regex;
use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;
use sqlx::Sqlite;

/// Type alias for SQLx Query with SQLite arguments
pub type Q<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

/// One placeholder of a driver statement, in statement order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    /// A bare `?`, filled from the positional arguments.
    Positional,
    /// A named token (`:name`, `@name`, `$name`, `?NNN`), filled by name.
    Named(String),
}

/// Converts every placeholder to a bare positional `?` for SQLite.
///
/// Returns the rewritten statement and the slot each `?` stands for, in the
/// order the placeholders appear. The statement is expected to have been
/// validated by [`parse_bind_tokens`](crate::bind::parse_bind_tokens) first.
///
/// # Examples
///
/// ```
/// use sqlx_record_bind::builder::{build_query, Slot};
///
/// let (sql, slots) = build_query("SELECT * FROM users WHERE id = :id AND age > ?")?;
/// assert_eq!(sql, "SELECT * FROM users WHERE id = ? AND age > ?");
/// assert_eq!(slots, vec![Slot::Named("id".into()), Slot::Positional]);
/// # Ok::<(), sqlx_record_bind::Error>(())
/// ```
pub fn build_query(template: &str) -> crate::Result<(String, Vec<Slot>)> {
    let regex = Regex::new(r"[:@$]([\w]+)|\?([0-9]*)")?;
    let slots = regex
        .captures_iter(template)
        .map(|captures| match captures.get(1).or_else(|| captures.get(2)) {
            Some(name) if !name.as_str().is_empty() => Slot::Named(name.as_str().to_owned()),
            _ => Slot::Positional,
        })
        .collect();
    let replaced = regex.replace_all(template, "?").into_owned();
    Ok((replaced, slots))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str) -> Slot {
        Slot::Named(name.to_owned())
    }

    #[test]
    fn test_build_query_single_param() {
        let (sql, slots) = build_query("SELECT * FROM users WHERE id = :id").unwrap();
        assert_eq!(sql, "SELECT * FROM users WHERE id = ?");
        assert_eq!(slots, vec![named("id")]);
    }

    #[test]
    fn test_build_query_every_sigil() {
        let (sql, slots) =
            build_query("SELECT :name FROM t WHERE a=@a AND b=$b AND c=?42 AND d=?;").unwrap();
        assert_eq!(sql, "SELECT ? FROM t WHERE a=? AND b=? AND c=? AND d=?;");
        assert_eq!(
            slots,
            vec![
                named("name"),
                named("a"),
                named("b"),
                named("42"),
                Slot::Positional
            ]
        );
    }

    #[test]
    fn test_build_query_repeated_params() {
        let (sql, slots) =
            build_query("SELECT * FROM users WHERE id = :id OR user_id = :id").unwrap();
        assert_eq!(sql, "SELECT * FROM users WHERE id = ? OR user_id = ?");
        assert_eq!(slots, vec![named("id"), named("id")]);
    }

    #[test]
    fn test_build_query_no_params() {
        let (sql, slots) = build_query("SELECT * FROM users").unwrap();
        assert_eq!(sql, "SELECT * FROM users");
        assert!(slots.is_empty());
    }

    #[test]
    fn test_build_query_with_underscores() {
        let (sql, slots) = build_query("INSERT INTO users VALUES (:user_id, ?)").unwrap();
        assert_eq!(sql, "INSERT INTO users VALUES (?, ?)");
        assert_eq!(slots, vec![named("user_id"), Slot::Positional]);
    }
}
