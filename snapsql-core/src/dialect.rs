use core::fmt;
use core::str::FromStr;

/// The target SQL dialect for a runtime evaluation.
///
/// Dialect differences in this crate family are confined to placeholder
/// style and `EXPLAIN` prefix; they never change parsing.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Dialect {
    /// PostgreSQL family (accepts the aliases `postgres`, `pgx`).
    PostgreSql,
    /// MySQL / MariaDB.
    MySql,
    /// SQLite.
    Sqlite,
}

impl Dialect {
    /// Whether this dialect rewrites `?` placeholders to `$1..$n`.
    pub fn uses_numbered_placeholders(self) -> bool {
        matches!(self, Self::PostgreSql)
    }

    /// The `EXPLAIN` prefix keyword(s) for this dialect.
    pub fn explain_prefix(self, analyze: bool) -> &'static str {
        match (self, analyze) {
            (Self::PostgreSql, false) => "EXPLAIN",
            (Self::PostgreSql, true) => "EXPLAIN ANALYZE",
            (Self::MySql, false) => "EXPLAIN",
            (Self::MySql, true) => "EXPLAIN ANALYZE",
            (Self::Sqlite, _) => "EXPLAIN QUERY PLAN",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::PostgreSql => "postgresql",
            Self::MySql => "mysql",
            Self::Sqlite => "sqlite",
        })
    }
}

impl FromStr for Dialect {
    type Err = DialectParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgresql" | "postgres" | "pgx" => Ok(Self::PostgreSql),
            "mysql" => Ok(Self::MySql),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(DialectParseError(other.to_string())),
        }
    }
}

/// Returned when a dialect tag does not match any known dialect or alias.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DialectParseError(String);

impl fmt::Display for DialectParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown dialect tag: {:?}", self.0)
    }
}

impl std::error::Error for DialectParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aliases() {
        assert_eq!("postgres".parse(), Ok(Dialect::PostgreSql));
        assert_eq!("pgx".parse(), Ok(Dialect::PostgreSql));
        assert_eq!("POSTGRESQL".parse(), Ok(Dialect::PostgreSql));
        assert_eq!("mysql".parse(), Ok(Dialect::MySql));
        assert_eq!("sqlite".parse(), Ok(Dialect::Sqlite));
        assert!("oracle".parse::<Dialect>().is_err());
    }

    #[test]
    fn explain_prefixes() {
        assert_eq!(Dialect::PostgreSql.explain_prefix(true), "EXPLAIN ANALYZE");
        assert_eq!(Dialect::Sqlite.explain_prefix(true), "EXPLAIN QUERY PLAN");
    }
}
