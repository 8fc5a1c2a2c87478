//! # sqlx-record-bind
//!
//! A SQLx extension for SQLite that expands record macros into column lists,
//! binds named parameters from maps or records, and scans result rows back into
//! scalars, maps, records or growing collections of records.
//!
//! ## Features
//!
//! - **Named Placeholders**: Use `:name`, `@name`, `$name` or `?NNN` next to plain `?`
//! - **Record Macros**: `{Person}` or `{p INTO Person}` expand to the record's columns
//! - **Join Disambiguation**: Columns shared by joined records are aliased and routed back
//! - **Reflective Mapping**: The `record!` macro maps struct fields to columns through tags
//! - **Caching**: Record shapes and macro expansions are computed once per `Querier`
//!
//! ## Quick Start
//!
//! Add to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! sqlx = { version = "0.8", features = ["sqlite", "runtime-tokio"] }
//! sqlx-record-bind = "0.1"
//! ```
//!
//! ## Examples
//!
//! ### Reading One Record
//!
//! ```rust,no_run
//! use sqlx::{Connection, SqliteConnection};
//! use sqlx_record_bind::{args, record, Destination, Querier, ValueMap};
//!
//! record! {
//!     #[derive(Debug, Default)]
//!     pub struct Person {
//!         #[db = "name"]
//!         pub name: String,
//!         #[db = "age"]
//!         pub age: i64,
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut conn = SqliteConnection::connect("sqlite::memory:").await?;
//! let querier = Querier::new();
//!
//! let mut filter = ValueMap::new();
//! filter.insert("name".into(), "fred".into());
//!
//! let mut person = Person::default();
//! querier
//!     .for_one([Destination::record(&mut person)])?
//!     .query(
//!         &mut conn,
//!         "SELECT {test INTO Person} FROM test WHERE test.name=:name",
//!         args![&filter],
//!     )
//!     .await?;
//! println!("{} is {}", person.name, person.age);
//! # Ok(())
//! # }
//! ```
//!
//! ### Reading Many Records
//!
//! ```rust,no_run
//! use sqlx::{Connection, SqliteConnection};
//! use sqlx_record_bind::{args, record, Querier};
//!
//! record! {
//!     #[derive(Debug, Default)]
//!     pub struct Person {
//!         #[db = "name"]
//!         pub name: String,
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! # let mut conn = SqliteConnection::connect("sqlite::memory:").await?;
//! let querier = Querier::new();
//! let mut people: Vec<Person> = Vec::new();
//!
//! querier
//!     .for_many(&mut people)?
//!     .query(&mut conn, "SELECT {person INTO Person} FROM person WHERE age > ?", args![18])
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Writing
//!
//! ```rust,no_run
//! use sqlx::{Connection, SqliteConnection};
//! use sqlx_record_bind::{record, Arg, Querier};
//!
//! record! {
//!     #[derive(Debug, Default)]
//!     pub struct Person {
//!         #[db = "name"]
//!         pub name: String,
//!         #[db = "age"]
//!         pub age: i64,
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! # let mut conn = SqliteConnection::connect("sqlite::memory:").await?;
//! let person = Person { name: "fred".into(), age: 21 };
//! Querier::new()
//!     .exec(
//!         &mut conn,
//!         "INSERT INTO person(name, age) VALUES (:name, :age)",
//!         vec![Arg::record(&person)],
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## How It Works
//!
//! Every call runs the same pipeline:
//!
//! 1. **Scan**: Find named bind parameters; the first extra argument supplies their values
//! 2. **Expand**: Rewrite record macros into column lists, aliasing columns shared by records
//! 3. **Bind**: Turn every placeholder into a positional `?` and lay the values out in order
//! 4. **Scan Rows**: Match result columns to destinations and decode each row into them
//!
//! Expansions are cached per raw statement text, record shapes per type.
//!
//! ## Limitations
//!
//! - Only SQLite is supported
//! - Substitution is lexical: a `:`, `@`, `$`, `{` inside a string literal is taken as syntax
//! - An explicit column list (`{p.name INTO Person}`) still expands to every field
//! - Neither cache is ever evicted
//!
//! ## License
//!
//! Licensed under either of Apache License, Version 2.0 or MIT license at your option.

pub mod args;
pub mod bind;
pub mod builder;
pub mod error;
pub mod expand;
pub mod parse;
pub mod query;
pub mod record;
pub mod reflect;
pub mod scan;
pub mod statement;
pub mod value;

pub use args::{build_named_args, Arg, NamedArg};
pub use bind::{parse_bind_tokens, BindToken};
pub use error::{Error, Result};
pub use expand::{decode_alias, encode_alias, expand};
pub use parse::{parse_record_bindings, RecordBinding};
pub use query::{Destination, Hook, Querier, Query};
pub use record::{FieldDecl, Record, RecordSink, RecordType};
pub use reflect::{Entity, RecordShape, ReflectCache};
pub use scan::Scalar;
pub use statement::{CompiledStatement, StatementCache};
pub use value::{TypeCategory, Value, ValueMap};

/// Convenience re-exports for common use cases
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::{args, record};
    pub use crate::{Arg, Destination, Querier, Query, Record, Value, ValueMap};
}

#[doc(hidden)]
pub mod __private {
    pub use sqlx;
    pub use sqlx::sqlite::SqliteRow;
    pub use sqlx::Row;
}
