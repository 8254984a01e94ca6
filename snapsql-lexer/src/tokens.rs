use core::fmt;

use snapsql_core::Position;

use crate::keyword::Keyword;

/// A single lexed token together with its originating position.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Token {
    /// The token payload.
    pub kind: TokenKind,
    /// Where this token starts in the source.
    pub pos: Position,
}

impl Token {
    /// Creates a token at the given position.
    pub fn new(kind: TokenKind, pos: Position) -> Self {
        Self { kind, pos }
    }

    /// True for whitespace tokens, preserved verbatim for faithful output.
    pub fn is_whitespace(&self) -> bool {
        matches!(self.kind, TokenKind::Whitespace(_))
    }

    /// True for ordinary (non-annotation) SQL comments.
    pub fn is_comment(&self) -> bool {
        matches!(self.kind, TokenKind::Comment(_))
    }

    /// True if this token is the given keyword.
    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        matches!(self.kind, TokenKind::Keyword(k) if k == keyword)
    }
}

/// The payload of a [`Token`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TokenKind {
    /// Space, tab, or newline.
    Whitespace(Whitespace),
    /// An ordinary `--` or `/* */` comment (not a SnapSQL annotation).
    Comment(Comment),

    /// `/*= expr */` — the raw expression text between the delimiters. The
    /// SQL fallback literal that follows it in the source (e.g. the `0` in
    /// `/*= user_id */0`) is an ordinary token in its own right, dropped by
    /// [`snapsql_parser::parse_directives`] rather than classified here.
    Variable(String),
    /// `/*# ... */` — the raw directive text between the delimiters, e.g.
    /// `"if x > 0"`, `"for f : fields"`, `"end"`, `"const LIMIT"`.
    Directive(String),
    /// `/*@ ... */` — the raw system-directive text, e.g. `"limit"`.
    SystemDirective(String),

    /// An unsigned numeric literal.
    Number(String),
    /// A `'...'` character string literal.
    String(String),
    /// An optionally quoted SQL identifier.
    Ident(Ident),
    /// A recognized keyword.
    Keyword(Keyword),

    /// Comma `,`
    Comma,
    /// Semicolon `;`
    SemiColon,
    /// Period `.`
    Period,
    /// Left parenthesis `(`
    LeftParen,
    /// Right parenthesis `)`
    RightParen,

    /// Equal `=`
    Equal,
    /// Not equal `<>` or `!=`
    NotEqual,
    /// Less than `<`
    LessThan,
    /// Less than or equal `<=`
    LessThanOrEqual,
    /// Greater than `>`
    GreaterThan,
    /// Greater than or equal `>=`
    GreaterThanOrEqual,

    /// Plus `+`
    Plus,
    /// Minus `-`
    Minus,
    /// Asterisk `*`
    Asterisk,
    /// Slash `/`
    Slash,
    /// Percent `%`
    Percent,

    /// Question mark `?` — an ANSI bind placeholder already present in the
    /// source (e.g. authored for a driver other than SnapSQL's own).
    Question,

    /// A character that could not be classified as anything else.
    Other(char),
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Whitespace(w) => write!(f, "{}", w),
            Self::Comment(c) => write!(f, "{}", c),
            Self::Variable(expr) => write!(f, "/*= {} */", expr),
            Self::Directive(text) => write!(f, "/*# {} */", text),
            Self::SystemDirective(text) => write!(f, "/*@ {} */", text),
            Self::Number(n) => f.write_str(n),
            Self::String(s) => write!(f, "'{}'", s),
            Self::Ident(ident) => write!(f, "{}", ident),
            Self::Keyword(k) => write!(f, "{}", k),
            Self::Comma => f.write_str(","),
            Self::SemiColon => f.write_str(";"),
            Self::Period => f.write_str("."),
            Self::LeftParen => f.write_str("("),
            Self::RightParen => f.write_str(")"),
            Self::Equal => f.write_str("="),
            Self::NotEqual => f.write_str("<>"),
            Self::LessThan => f.write_str("<"),
            Self::LessThanOrEqual => f.write_str("<="),
            Self::GreaterThan => f.write_str(">"),
            Self::GreaterThanOrEqual => f.write_str(">="),
            Self::Plus => f.write_str("+"),
            Self::Minus => f.write_str("-"),
            Self::Asterisk => f.write_str("*"),
            Self::Slash => f.write_str("/"),
            Self::Percent => f.write_str("%"),
            Self::Question => f.write_str("?"),
            Self::Other(c) => write!(f, "{}", c),
        }
    }
}

/// Whitespace token payload.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Whitespace {
    /// A run of spaces/tabs.
    Space,
    /// A single newline (`\n`, or `\r`/`\r\n` collapsed to one token).
    Newline,
}

impl fmt::Display for Whitespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Space => f.write_str(" "),
            Self::Newline => f.write_str("\n"),
        }
    }
}

/// An ordinary (non-annotation) SQL comment.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Comment {
    /// A `-- ...` line comment, including its trailing newline if present.
    SingleLine(String),
    /// A `/* ... */` block comment, excluding the delimiters.
    MultiLine(String),
}

impl fmt::Display for Comment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SingleLine(s) => write!(f, "--{}", s),
            Self::MultiLine(s) => write!(f, "/*{}*/", s),
        }
    }
}

/// An optionally quoted SQL identifier.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ident {
    /// The identifier text, unquoted and unescaped.
    pub value: String,
    /// The quote character used to delimit it, if any (`"` or `` ` ``).
    pub quote: Option<char>,
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.quote {
            None => f.write_str(&self.value),
            Some(q) => write!(f, "{q}{}{q}", self.value),
        }
    }
}
