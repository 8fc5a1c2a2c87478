use crate::args::{build_named_args, Arg, NamedArg};
use crate::bind::{locate_bind_region, parse_bind_tokens};
use crate::builder::{build_query, Slot};
use crate::expand::{assign_entities, expand};
use crate::parse::{locate_record_region, parse_record_bindings};
use crate::record::{Record, RecordType};
use crate::reflect::{Entity, RecordShape, ReflectCache};
use crate::scan::{Scalar, Target};
use crate::statement::{CompiledStatement, StatementCache};
use crate::value::{Value, ValueMap};
use crate::{Error, Result};
use futures::TryStreamExt;
use sqlx::sqlite::{SqliteConnection, SqliteQueryResult};
use sqlx::{Executor, Sqlite, Statement};
use std::fmt;
use std::sync::Arc;

/// Observation hook, called with each statement right before it executes.
pub type Hook = Arc<dyn Fn(&str) + Send + Sync>;

/// A place query results are written to.
pub enum Destination<'a> {
    Record(RecordType, &'a mut dyn Record),
    Map(&'a mut ValueMap),
    Scalar(&'a mut dyn Scalar),
}

impl<'a> Destination<'a> {
    pub fn record<T: Record + 'static>(record: &'a mut T) -> Self {
        Destination::Record(RecordType::of::<T>(), record)
    }

    pub fn map(map: &'a mut ValueMap) -> Self {
        Destination::Map(map)
    }

    pub fn scalar<T: Scalar>(scalar: &'a mut T) -> Self {
        Destination::Scalar(scalar)
    }
}

/// Entry point of the engine: builds [`Query`] values and owns the caches
/// they share.
///
/// A `Querier` is meant to be long lived and shared; both of its caches are
/// append-only and grow with the distinct record types and statements seen.
///
/// # Examples
///
/// ```rust,no_run
/// use sqlx::{Connection, SqliteConnection};
/// use sqlx_record_bind::{args, record, Destination, Querier, ValueMap};
///
/// record! {
///     #[derive(Debug, Default)]
///     pub struct Person {
///         #[db = "name"]
///         pub name: String,
///         #[db = "age"]
///         pub age: i64,
///     }
/// }
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut conn = SqliteConnection::connect("sqlite::memory:").await?;
/// let querier = Querier::new().with_hook(|stmt| println!("{stmt}"));
///
/// let mut filter = ValueMap::new();
/// filter.insert("name".into(), "fred".into());
///
/// let mut person = Person::default();
/// let mut query = querier.for_one([Destination::record(&mut person)])?;
/// query
///     .query(
///         &mut conn,
///         "SELECT {test INTO Person} FROM test WHERE test.name=:name;",
///         args![&filter],
///     )
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct Querier {
    reflect: ReflectCache,
    statements: StatementCache,
    hook: Option<Hook>,
}

impl fmt::Debug for Querier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Querier")
            .field("reflect", &self.reflect)
            .field("statements", &self.statements)
            .field("hook", &self.hook.is_some())
            .finish()
    }
}

/// A statement ready for the driver.
struct Prepared {
    compiled: Arc<CompiledStatement>,
    /// Entity index of each record macro.
    assigned: Vec<usize>,
    cached: bool,
    sql: String,
    values: Vec<Value>,
}

impl Querier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the observation hook.
    ///
    /// The hook runs synchronously on the calling task. Calls made from
    /// several threads through one `Querier` are not serialized.
    pub fn with_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.set_hook(hook);
        self
    }

    pub fn set_hook<F>(&mut self, hook: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.hook = Some(Arc::new(hook));
    }

    /// Builds a query writing a single row into `destinations`.
    ///
    /// The destinations must all be records, all scalars, or a single map.
    /// Several records make a join: each column goes to the first record that
    /// has the field, unless it carries a prefixed alias.
    pub fn for_one<'a, I>(&'a self, destinations: I) -> Result<Query<'a>>
    where
        I: IntoIterator<Item = Destination<'a>>,
    {
        let destinations: Vec<Destination<'a>> = destinations.into_iter().collect();
        let kinds = destinations
            .iter()
            .map(|destination| self.entity(destination))
            .collect::<Result<Vec<_>>>()?;

        let first = kinds
            .first()
            .ok_or_else(|| Error::KindMismatch("expected at least one destination".to_owned()))?;
        if let Some(other) = kinds.iter().find(|kind| kind.kind() != first.kind()) {
            return Err(Error::KindMismatch(format!(
                "expected every destination to be a {}, found a {}",
                first.kind(),
                other.kind()
            )));
        }

        let entities: Vec<Arc<RecordShape>> = kinds
            .into_iter()
            .filter_map(|entity| match entity {
                Entity::Record(shape) => Some(shape),
                Entity::Map | Entity::Scalar => None,
            })
            .collect();

        let mut destinations = destinations.into_iter();
        let target = match destinations.next() {
            Some(Destination::Map(map)) => {
                if destinations.next().is_some() {
                    return Err(Error::KindMismatch(
                        "expected exactly one map destination".to_owned(),
                    ));
                }
                Target::Map(map)
            }
            Some(Destination::Record(_, record)) => Target::Records(
                std::iter::once(record)
                    .chain(destinations.filter_map(|destination| match destination {
                        Destination::Record(_, record) => Some(record),
                        _ => None,
                    }))
                    .collect(),
            ),
            Some(Destination::Scalar(scalar)) => Target::Scalars(
                std::iter::once(scalar)
                    .chain(destinations.filter_map(|destination| match destination {
                        Destination::Scalar(scalar) => Some(scalar),
                        _ => None,
                    }))
                    .collect(),
            ),
            None => {
                return Err(Error::KindMismatch(
                    "expected at least one destination".to_owned(),
                ))
            }
        };

        Ok(Query {
            querier: self,
            entities,
            target,
        })
    }

    /// Builds a query appending one element to `records` per row.
    pub fn for_many<'a, T>(&'a self, records: &'a mut Vec<T>) -> Result<Query<'a>>
    where
        T: Record + Default + 'static,
    {
        let shape = self.reflect.reflect(RecordType::of::<T>())?;
        Ok(Query {
            querier: self,
            entities: vec![shape],
            target: Target::Many(records),
        })
    }

    /// Executes a statement without destinations (INSERT, UPDATE, DDL).
    ///
    /// Bind parameters resolve as for [`Query::query`]. Record macros cannot be
    /// expanded since no record type is bound.
    pub async fn exec(
        &self,
        conn: &mut SqliteConnection,
        statement: &str,
        args: Vec<Arg<'_>>,
    ) -> Result<SqliteQueryResult> {
        let Prepared {
            compiled,
            cached,
            sql,
            values,
            ..
        } = self.prepare(statement, &[], args)?;
        self.observe(&compiled.expanded);

        log::trace!("executing {sql:?} with {} arguments", values.len());
        let query = values
            .into_iter()
            .fold(sqlx::query::<Sqlite>(&sql), |query, value| value.bind(query));
        let result = query
            .execute(&mut *conn)
            .await
            .map_err(Error::database(statement))?;

        self.remember(statement, compiled, cached);
        Ok(result)
    }

    pub fn reflect_cache(&self) -> &ReflectCache {
        &self.reflect
    }

    pub fn statement_cache(&self) -> &StatementCache {
        &self.statements
    }

    fn entity(&self, destination: &Destination<'_>) -> Result<Entity> {
        Ok(match destination {
            Destination::Record(ty, _) => Entity::Record(self.reflect.reflect(*ty)?),
            Destination::Map(_) => Entity::Map,
            Destination::Scalar(_) => Entity::Scalar,
        })
    }

    /// Resolves bind parameters, expands record macros and lays the argument
    /// values out in placeholder order.
    fn prepare(
        &self,
        statement: &str,
        entities: &[Arc<RecordShape>],
        args: Vec<Arg<'_>>,
    ) -> Result<Prepared> {
        // 1. If the statement has named arguments, extract all the names.
        let tokens = match locate_bind_region(statement) {
            Some(offset) => parse_bind_tokens(statement, offset)?,
            None => Vec::new(),
        };

        // 2. Names are resolved from the first argument, which is then no
        //    longer a positional argument.
        let mut args = args.into_iter();
        let named = if tokens.is_empty() {
            Vec::new()
        } else {
            let source = args.next().ok_or_else(|| {
                Error::Lookup(format!(
                    "expected arguments for named parameters in statement {statement:?}"
                ))
            })?;
            build_named_args(&source, &tokens, &self.reflect)?
        };
        let positional = args.map(Arg::into_value).collect::<Result<Vec<_>>>()?;

        // 3. Expand record macros, unless already done for this text.
        let (compiled, cached) = match self.statements.get(statement) {
            Some(compiled) => {
                log::debug!("statement cache hit for {statement:?}");
                (compiled, true)
            }
            None => (Arc::new(compile(statement, entities)?), false),
        };
        // A cached expansion may have been made for other destinations.
        let assigned = assign_entities(statement, &compiled.bindings, entities)?;

        let (sql, slots) = build_query(&compiled.expanded)?;
        let values = arrange(statement, &slots, &named, positional)?;

        Ok(Prepared {
            compiled,
            assigned,
            cached,
            sql,
            values,
        })
    }

    fn observe(&self, statement: &str) {
        if let Some(hook) = &self.hook {
            hook(statement);
        }
    }

    fn remember(&self, raw: &str, compiled: Arc<CompiledStatement>, cached: bool) {
        if !cached && compiled.expanded != raw {
            self.statements.insert(raw, compiled);
        }
    }
}

fn compile(statement: &str, entities: &[Arc<RecordShape>]) -> Result<CompiledStatement> {
    let bindings = match locate_record_region(statement) {
        Some(offset) => parse_record_bindings(statement, offset)?,
        None => Vec::new(),
    };
    let expanded = expand(statement, &bindings, entities)?;
    Ok(CompiledStatement { expanded, bindings })
}

/// Orders argument values by the placeholders they fill.
fn arrange(
    statement: &str,
    slots: &[Slot],
    named: &[NamedArg],
    positional: Vec<Value>,
) -> Result<Vec<Value>> {
    let mut positional = positional.into_iter();
    let mut values = Vec::with_capacity(slots.len());
    let mut bare = 0;

    for slot in slots {
        let value = match slot {
            Slot::Positional => {
                bare += 1;
                positional
                    .next()
                    .ok_or_else(|| Error::UnboundPlaceholder(format!("?#{bare}")))?
            }
            Slot::Named(name) => named
                .iter()
                .find(|arg| &arg.name == name)
                .map(|arg| arg.value.clone())
                .ok_or_else(|| Error::UnboundPlaceholder(name.clone()))?,
        };
        values.push(value);
    }

    let unused = positional.count();
    if unused > 0 {
        return Err(Error::Lookup(format!(
            "{unused} positional arguments left without a placeholder in statement {statement:?}"
        )));
    }
    Ok(values)
}

/// A query bound to its destinations, executable any number of times.
pub struct Query<'a> {
    querier: &'a Querier,
    entities: Vec<Arc<RecordShape>>,
    target: Target<'a>,
}

impl<'a> Query<'a> {
    /// Executes `statement` on `conn` and writes the result rows into the
    /// destinations.
    ///
    /// The first extra argument supplies the values of named bind parameters
    /// when the statement has any; the remaining ones fill the bare `?`
    /// placeholders in order.
    pub async fn query(
        &mut self,
        conn: &mut SqliteConnection,
        statement: &str,
        args: Vec<Arg<'_>>,
    ) -> Result<()> {
        let Prepared {
            compiled,
            assigned,
            cached,
            sql,
            values,
        } = self.querier.prepare(statement, &self.entities, args)?;
        self.querier.observe(&compiled.expanded);

        log::trace!("executing {sql:?} with {} arguments", values.len());
        let described = Executor::prepare(&mut *conn, sql.as_str())
            .await
            .map_err(Error::database(statement))?;
        let mut materializer = self.target.materializer(
            described.columns(),
            &self.entities,
            &compiled.bindings,
            &assigned,
        )?;

        let query = values
            .into_iter()
            .fold(described.query(), |query, value| value.bind(query));
        let mut rows = query.fetch(&mut *conn);
        while let Some(row) = rows.try_next().await.map_err(Error::database(statement))? {
            materializer.scan(&row, statement)?;
        }
        drop(rows);

        self.querier.remember(statement, compiled, cached);
        Ok(())
    }
}
