use core::fmt;

use snapsql_core::Position;
use snapsql_lexer::Token;

/// Which clause a [`Clause`] node represents.
///
/// Variants are ordered by their rank in the canonical clause order for a
/// SELECT statement; other statement kinds use a subset of this order.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub enum ClauseKind {
    With,
    InsertInto,
    Update,
    DeleteFrom,
    Select,
    Values,
    From,
    Set,
    Where,
    GroupBy,
    Having,
    OrderBy,
    Limit,
    Offset,
    Returning,
    OnConflict,
    For,
}

impl fmt::Display for ClauseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::With => "WITH",
            Self::InsertInto => "INSERT INTO",
            Self::Update => "UPDATE",
            Self::DeleteFrom => "DELETE FROM",
            Self::Select => "SELECT",
            Self::Values => "VALUES",
            Self::From => "FROM",
            Self::Set => "SET",
            Self::Where => "WHERE",
            Self::GroupBy => "GROUP BY",
            Self::Having => "HAVING",
            Self::OrderBy => "ORDER BY",
            Self::Limit => "LIMIT",
            Self::Offset => "OFFSET",
            Self::Returning => "RETURNING",
            Self::OnConflict => "ON CONFLICT",
            Self::For => "FOR",
        };
        f.write_str(s)
    }
}

/// A clause's contiguous token slice, tagged with its kind.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Clause {
    /// Which clause this is.
    pub kind: ClauseKind,
    /// The clause body, including the leading keyword token(s).
    pub tokens: Vec<Token>,
    /// Where the clause's first token starts.
    pub start: Position,
}

impl Clause {
    /// Builds a clause from its token slice, recording the first token's
    /// position as its start.
    pub fn new(kind: ClauseKind, tokens: Vec<Token>) -> Self {
        let start = tokens.first().map(|t| t.pos).unwrap_or(Position::START);
        Self { kind, tokens, start }
    }
}
