use crate::ast::{BinOp, Expr, Literal, UnOp};
use crate::error::ExpressionCompileError;
use crate::token::{tokenize, Tok};

/// Parses an expression's source text into an [`Expr`] tree.
///
/// Grammar, loosest to tightest:
/// `ternary := or ('?' expr ':' expr)?`
/// `or := and ('||' and)*`
/// `and := equality ('&&' equality)*`
/// `equality := comparison (('==' | '!=') comparison)*`
/// `comparison := additive (('<' | '<=' | '>' | '>=') additive)*`
/// `additive := multiplicative (('+' | '-') multiplicative)*`
/// `multiplicative := unary (('*' | '/' | '%') unary)*`
/// `unary := ('!' | '-')? postfix`
/// `postfix := primary ('.' ident | '[' expr ']')*`
/// `primary := ident | literal | '(' expr ')' | ident '(' args ')'`
pub fn parse(input: &str) -> Result<Expr, ExpressionCompileError> {
    let toks = tokenize(input).map_err(|reason| ExpressionCompileError::Lex {
        expr: input.to_string(),
        reason,
    })?;
    let mut p = Parser { toks: &toks, pos: 0, src: input };
    let expr = p.ternary()?;
    if p.pos != p.toks.len() {
        return Err(p.err(format!("unexpected trailing token {:?}", p.toks[p.pos])));
    }
    Ok(expr)
}

struct Parser<'a> {
    toks: &'a [Tok],
    pos: usize,
    src: &'a str,
}

impl<'a> Parser<'a> {
    fn err(&self, reason: String) -> ExpressionCompileError {
        ExpressionCompileError::Syntax {
            expr: self.src.to_string(),
            reason,
        }
    }

    fn peek(&self) -> Option<&Tok> {
        self.toks.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Tok> {
        let tok = self.toks.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, want: &Tok) -> Result<(), ExpressionCompileError> {
        match self.advance().cloned() {
            Some(tok) if tok == *want => Ok(()),
            Some(tok) => Err(self.err(format!("expected {want:?}, found {tok:?}"))),
            None => Err(self.err(format!("expected {want:?}, found end of expression"))),
        }
    }

    fn ternary(&mut self) -> Result<Expr, ExpressionCompileError> {
        let cond = self.or()?;
        if matches!(self.peek(), Some(Tok::Question)) {
            self.advance();
            let then = self.ternary()?;
            self.expect(&Tok::Colon)?;
            let else_ = self.ternary()?;
            Ok(Expr::Ternary(Box::new(cond), Box::new(then), Box::new(else_)))
        } else {
            Ok(cond)
        }
    }

    fn or(&mut self) -> Result<Expr, ExpressionCompileError> {
        let mut lhs = self.and()?;
        while matches!(self.peek(), Some(Tok::Or)) {
            self.advance();
            let rhs = self.and()?;
            lhs = Expr::Binary(BinOp::Or, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and(&mut self) -> Result<Expr, ExpressionCompileError> {
        let mut lhs = self.equality()?;
        while matches!(self.peek(), Some(Tok::And)) {
            self.advance();
            let rhs = self.equality()?;
            lhs = Expr::Binary(BinOp::And, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn equality(&mut self) -> Result<Expr, ExpressionCompileError> {
        let mut lhs = self.comparison()?;
        loop {
            let op = match self.peek() {
                Some(Tok::Eq) => BinOp::Eq,
                Some(Tok::Ne) => BinOp::Ne,
                _ => break,
            };
            self.advance();
            let rhs = self.comparison()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn comparison(&mut self) -> Result<Expr, ExpressionCompileError> {
        let mut lhs = self.additive()?;
        loop {
            let op = match self.peek() {
                Some(Tok::Lt) => BinOp::Lt,
                Some(Tok::Le) => BinOp::Le,
                Some(Tok::Gt) => BinOp::Gt,
                Some(Tok::Ge) => BinOp::Ge,
                _ => break,
            };
            self.advance();
            let rhs = self.additive()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn additive(&mut self) -> Result<Expr, ExpressionCompileError> {
        let mut lhs = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Tok::Plus) => BinOp::Add,
                Some(Tok::Minus) => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.multiplicative()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn multiplicative(&mut self) -> Result<Expr, ExpressionCompileError> {
        let mut lhs = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Tok::Star) => BinOp::Mul,
                Some(Tok::Slash) => BinOp::Div,
                Some(Tok::Percent) => BinOp::Rem,
                _ => break,
            };
            self.advance();
            let rhs = self.unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<Expr, ExpressionCompileError> {
        match self.peek() {
            Some(Tok::Not) => {
                self.advance();
                Ok(Expr::Unary(UnOp::Not, Box::new(self.unary()?)))
            }
            Some(Tok::Minus) => {
                self.advance();
                Ok(Expr::Unary(UnOp::Neg, Box::new(self.unary()?)))
            }
            _ => self.postfix(),
        }
    }

    fn postfix(&mut self) -> Result<Expr, ExpressionCompileError> {
        let mut expr = self.primary()?;
        loop {
            match self.peek() {
                Some(Tok::Dot) => {
                    self.advance();
                    let name = match self.advance().cloned() {
                        Some(Tok::Ident(name)) => name.clone(),
                        other => return Err(self.err(format!("expected field name, found {other:?}"))),
                    };
                    expr = Expr::Field(Box::new(expr), name);
                }
                Some(Tok::LBracket) => {
                    self.advance();
                    let index = self.ternary()?;
                    self.expect(&Tok::RBracket)?;
                    expr = Expr::Index(Box::new(expr), Box::new(index));
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr, ExpressionCompileError> {
        match self.advance().cloned() {
            Some(Tok::Number(n)) => Ok(Expr::Literal(Literal::Number(n))),
            Some(Tok::Str(s)) => Ok(Expr::Literal(Literal::Str(s))),
            Some(Tok::True) => Ok(Expr::Literal(Literal::Bool(true))),
            Some(Tok::False) => Ok(Expr::Literal(Literal::Bool(false))),
            Some(Tok::Null) => Ok(Expr::Literal(Literal::Null)),
            Some(Tok::LParen) => {
                let inner = self.ternary()?;
                self.expect(&Tok::RParen)?;
                Ok(inner)
            }
            Some(Tok::Ident(name)) => {
                if matches!(self.peek(), Some(Tok::LParen)) {
                    self.advance();
                    let mut args = vec![];
                    if !matches!(self.peek(), Some(Tok::RParen)) {
                        loop {
                            args.push(self.ternary()?);
                            if matches!(self.peek(), Some(Tok::Comma)) {
                                self.advance();
                            } else {
                                break;
                            }
                        }
                    }
                    self.expect(&Tok::RParen)?;
                    Ok(Expr::Call(name, args))
                } else {
                    Ok(Expr::Ident(name))
                }
            }
            other => Err(self.err(format!("unexpected token {other:?}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_precedence() {
        let expr = parse("1 + 2 * 3").unwrap();
        assert_eq!(
            expr,
            Expr::Binary(
                BinOp::Add,
                Box::new(Expr::Literal(Literal::Number(1.0))),
                Box::new(Expr::Binary(
                    BinOp::Mul,
                    Box::new(Expr::Literal(Literal::Number(2.0))),
                    Box::new(Expr::Literal(Literal::Number(3.0))),
                )),
            )
        );
    }

    #[test]
    fn parses_field_and_index_chain() {
        let expr = parse("user.tags[0]").unwrap();
        assert_eq!(
            expr,
            Expr::Index(
                Box::new(Expr::Field(Box::new(Expr::Ident("user".into())), "tags".into())),
                Box::new(Expr::Literal(Literal::Number(0.0))),
            )
        );
    }

    #[test]
    fn parses_ternary_and_logical() {
        let expr = parse("active && !deleted ? \"on\" : \"off\"").unwrap();
        match expr {
            Expr::Ternary(cond, then, else_) => {
                assert!(matches!(*cond, Expr::Binary(BinOp::And, _, _)));
                assert_eq!(*then, Expr::Literal(Literal::Str("on".into())));
                assert_eq!(*else_, Expr::Literal(Literal::Str("off".into())));
            }
            other => panic!("expected ternary, got {other:?}"),
        }
    }

    #[test]
    fn parses_call_with_args() {
        let expr = parse("default(limit, 10)").unwrap();
        assert_eq!(
            expr,
            Expr::Call(
                "default".into(),
                vec![Expr::Ident("limit".into()), Expr::Literal(Literal::Number(10.0))]
            )
        );
    }

    #[test]
    fn trailing_garbage_is_a_syntax_error() {
        assert!(parse("1 + 2 3").is_err());
    }

    #[test]
    fn unterminated_paren_is_a_syntax_error() {
        assert!(parse("(1 + 2").is_err());
    }
}
