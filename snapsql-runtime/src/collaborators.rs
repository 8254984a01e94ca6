use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use snapsql_core::ParamType;

/// Carries a deadline to a collaborator call (§5). The VM never blocks
/// itself; only the collaborator's database call does, and it is
/// responsible for honoring this deadline and surfacing cancellation.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExecutionContext {
    deadline: Option<Instant>,
}

impl ExecutionContext {
    /// A context with no deadline.
    pub fn unbounded() -> Self {
        Self { deadline: None }
    }

    /// Derives a context with a deadline `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { deadline: Some(Instant::now() + timeout) }
    }

    /// True once `timeout`'s deadline has elapsed.
    pub fn is_expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// The outcome of a write statement dispatched via [`Queryer::exec`]:
/// surfaced as a one-row result by the facade.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ExecOutcome {
    /// Rows affected by the statement.
    pub rows_affected: u64,
    /// The auto-generated primary key of an inserted row, if any.
    pub last_insert_id: Option<i64>,
}

/// The database collaborator the VM dispatches materialized SQL to.
///
/// This crate defines the trait only; no default implementation against a
/// real driver is provided (§1's explicit non-goal — no `sqlx`/
/// `tokio-postgres` dependency is introduced here).
pub trait Queryer {
    /// A single result row, in whatever shape the implementing driver
    /// returns it.
    type Row;
    /// The collaborator's own error type.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Runs a read statement and returns its rows.
    fn query(&self, ctx: &ExecutionContext, sql: &str, args: &[snapsql_core::Value]) -> Result<Vec<Self::Row>, Self::Error>;

    /// Runs a write statement without a `RETURNING` clause.
    fn exec(&self, ctx: &ExecutionContext, sql: &str, args: &[snapsql_core::Value]) -> Result<ExecOutcome, Self::Error>;
}

/// One column of a [`Table`], as reported by a [`Catalog`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Column {
    /// The column's name.
    pub name: String,
    /// Its declared type.
    pub ty: ParamType,
    /// True if the column accepts `NULL`.
    pub nullable: bool,
    /// True if the column is (part of) the primary key.
    pub pk: bool,
}

/// A table's column shape, as reported by a [`Catalog`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Table {
    /// The table's columns, in declaration order.
    pub columns: Vec<Column>,
}

/// The schema collaborator consumed at compile time by the reference
/// resolver and type-checker (§6).
pub trait Catalog {
    /// Every table visible to the compiler, keyed by qualified name.
    fn tables(&self) -> BTreeMap<String, Table>;
}

/// The clock collaborator, consumed only to stamp `metadata.generated_at`
/// at compile time (§6).
pub trait Clock {
    /// The current time.
    fn now(&self) -> chrono::DateTime<chrono::Utc>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn unbounded_context_never_expires() {
        assert!(!ExecutionContext::unbounded().is_expired());
    }

    #[test]
    fn timeout_context_expires_after_its_deadline() {
        let ctx = ExecutionContext::with_timeout(Duration::from_millis(1));
        sleep(Duration::from_millis(5));
        assert!(ctx.is_expired());
    }
}
