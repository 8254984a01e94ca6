use snapsql_core::Position;

use crate::statement::Statement;

/// Where a [`TableReference`] came from.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TableOrigin {
    /// The statement's primary `FROM`/`UPDATE`/`DELETE FROM` target.
    Main,
    /// A `JOIN ... ON` target.
    JoinTarget,
    /// A reference to a CTE defined in an enclosing `WITH`.
    Cte,
    /// A parenthesized `SELECT` bound to an alias.
    DerivedSubquery,
}

/// A single table (or table-like) reference appearing in a `FROM`/`JOIN`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TableReference {
    /// The `AS alias` name, if given.
    pub alias_name: Option<String>,
    /// The table (or CTE) name as written.
    pub real_name: String,
    /// An optional schema qualifier.
    pub schema: Option<String>,
    /// The join keyword text (`INNER`, `LEFT`, ...) for non-main references.
    pub join_type: Option<String>,
    /// Where this reference came from.
    pub origin: TableOrigin,
    /// For `DerivedSubquery`, the re-parsed inner statement.
    pub derived: Option<Box<Statement>>,
    /// Where the reference starts.
    pub pos: Position,
}

impl TableReference {
    /// The name outer scopes see: the alias if present, else the real name.
    pub fn visible_name(&self) -> &str {
        self.alias_name.as_deref().unwrap_or(&self.real_name)
    }
}

/// Which syntactic form a [`DerivedTableInfo`] was extracted from.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DerivedSourceType {
    /// A `WITH name AS (...)` definition.
    Cte,
    /// A `(SELECT ...) AS alias` in a `FROM`/`JOIN`.
    Subquery,
}

/// The shape of a CTE/derived subquery visible to outer scopes, without
/// requiring those scopes to re-parse its body.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DerivedTableInfo {
    /// The CTE or alias name.
    pub name: String,
    /// Which form this was extracted from.
    pub source_type: DerivedSourceType,
    /// The column names projected by the inner `SELECT`.
    pub select_fields: Vec<String>,
    /// Tables (or CTEs) the inner statement itself references.
    pub referenced_tables: Vec<String>,
}
