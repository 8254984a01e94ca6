use core::fmt;

/// A source position, carried by every token and downstream artifact.
///
/// `line`/`column` are 1-based; `offset` is the 0-based byte offset into the
/// source. Newlines inside string literals advance `line`/`offset` but never
/// produce a token.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number.
    pub column: u32,
    /// 0-based byte offset.
    pub offset: usize,
}

impl Position {
    /// The position of the first byte of a source file.
    pub const START: Self = Self {
        line: 1,
        column: 1,
        offset: 0,
    };

    /// Advances this position past `ch`, wrapping the line/column on `\n`.
    pub fn advance(&mut self, ch: char) {
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.offset += ch.len_utf8();
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_across_newline() {
        let mut pos = Position::START;
        for ch in "ab\ncd".chars() {
            pos.advance(ch);
        }
        assert_eq!(
            pos,
            Position {
                line: 2,
                column: 3,
                offset: 5
            }
        );
    }
}
