//! # snapsql-lexer
//!
//! Tokenizes SnapSQL template source into a position-tagged token stream:
//! ordinary SQL lexemes plus the three SnapSQL annotation-comment forms
//! (`/*= expr */dummy`, `/*# directive */`, `/*@ system-directive */`).

#![deny(missing_docs)]
#![deny(unused_imports)]

mod error;
mod keyword;
mod lexer;
mod tokens;

pub use self::{
    error::TokenizeError,
    keyword::Keyword,
    lexer::Lexer,
    tokens::{Comment, Ident, Token, TokenKind, Whitespace},
};
