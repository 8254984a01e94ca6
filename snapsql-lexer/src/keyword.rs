use core::fmt;

/// A recognized SQL keyword.
///
/// Only the keywords the clause splitter, validator, and reference resolver
/// (C2–C4) need to recognize are modeled; anything else lexes as a plain
/// [`Ident`](crate::Ident). The set is intentionally closed and small: this
/// crate never grows a full per-dialect grammar.
///
/// **NOTE**: kept sorted so [`Keyword::lookup`] can binary-search.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[allow(missing_docs)]
pub enum Keyword {
    All,
    And,
    As,
    Asc,
    Between,
    By,
    Conflict,
    Cross,
    Delete,
    Desc,
    Distinct,
    Exists,
    Explain,
    False,
    For,
    From,
    Full,
    Group,
    Having,
    In,
    Inner,
    Insert,
    Into,
    Is,
    Join,
    Left,
    Like,
    Limit,
    Not,
    Null,
    Offset,
    On,
    Or,
    Order,
    Outer,
    Returning,
    Right,
    Select,
    Set,
    True,
    Union,
    Update,
    Values,
    Where,
    With,
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sorted `(UPPERCASE text, Keyword)` table used by [`Keyword::lookup`].
/// Must stay sorted by the first field for `binary_search_by` to work.
const TABLE: &[(&str, Keyword)] = &[
    ("ALL", Keyword::All),
    ("AND", Keyword::And),
    ("AS", Keyword::As),
    ("ASC", Keyword::Asc),
    ("BETWEEN", Keyword::Between),
    ("BY", Keyword::By),
    ("CONFLICT", Keyword::Conflict),
    ("CROSS", Keyword::Cross),
    ("DELETE", Keyword::Delete),
    ("DESC", Keyword::Desc),
    ("DISTINCT", Keyword::Distinct),
    ("EXISTS", Keyword::Exists),
    ("EXPLAIN", Keyword::Explain),
    ("FALSE", Keyword::False),
    ("FOR", Keyword::For),
    ("FROM", Keyword::From),
    ("FULL", Keyword::Full),
    ("GROUP", Keyword::Group),
    ("HAVING", Keyword::Having),
    ("IN", Keyword::In),
    ("INNER", Keyword::Inner),
    ("INSERT", Keyword::Insert),
    ("INTO", Keyword::Into),
    ("IS", Keyword::Is),
    ("JOIN", Keyword::Join),
    ("LEFT", Keyword::Left),
    ("LIKE", Keyword::Like),
    ("LIMIT", Keyword::Limit),
    ("NOT", Keyword::Not),
    ("NULL", Keyword::Null),
    ("OFFSET", Keyword::Offset),
    ("ON", Keyword::On),
    ("OR", Keyword::Or),
    ("ORDER", Keyword::Order),
    ("OUTER", Keyword::Outer),
    ("RETURNING", Keyword::Returning),
    ("RIGHT", Keyword::Right),
    ("SELECT", Keyword::Select),
    ("SET", Keyword::Set),
    ("TRUE", Keyword::True),
    ("UNION", Keyword::Union),
    ("UPDATE", Keyword::Update),
    ("VALUES", Keyword::Values),
    ("WHERE", Keyword::Where),
    ("WITH", Keyword::With),
];

impl Keyword {
    /// Looks up a keyword by case-insensitive text, returning `None` for a
    /// plain identifier.
    pub fn lookup(text: &str) -> Option<Self> {
        let upper = text.to_ascii_uppercase();
        TABLE
            .binary_search_by(|(candidate, _)| (*candidate).cmp(upper.as_str()))
            .map(|i| TABLE[i].1)
            .ok()
    }

    /// The canonical uppercase spelling of this keyword.
    pub fn as_str(&self) -> &'static str {
        TABLE
            .iter()
            .find(|(_, kw)| kw == self)
            .map(|(s, _)| *s)
            .unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_sorted() {
        for window in TABLE.windows(2) {
            assert!(window[0].0 < window[1].0, "{:?} not sorted", window);
        }
    }

    #[test]
    fn lookup_case_insensitive() {
        assert_eq!(Keyword::lookup("select"), Some(Keyword::Select));
        assert_eq!(Keyword::lookup("SeLeCt"), Some(Keyword::Select));
        assert_eq!(Keyword::lookup("selectx"), None);
    }
}
