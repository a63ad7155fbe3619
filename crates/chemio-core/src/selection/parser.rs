use super::error::{SelectionError, SyntaxErrorKind};
use super::expr::{CmpOp, MATH_FUNCTIONS, MathExpr, Selector, StringProperty, StringSelector};
use super::lexer::{Property, Token, TokenKind};
use super::MAX_ARITY;

/// Parses a token sequence into a selector tree.
///
/// `source_len` is the byte length of the original selection string, used
/// as the offset of errors at the end of the input.
///
/// # Errors
///
/// Fails on any input not produced by the selection grammar: unbalanced
/// parentheses, unknown properties or functions, string/numeric type
/// mismatches, argument bindings outside `1..4`, and trailing input.
pub(crate) fn parse(tokens: Vec<Token>, source_len: usize) -> Result<Selector, SelectionError> {
    let mut parser = Parser {
        tokens,
        current: 0,
        end_offset: source_len,
    };
    let selector = parser.parse_expression()?;
    match parser.peek() {
        Some(token) => Err(parser.syntax(
            token.offset,
            SyntaxErrorKind::Unexpected {
                expected: "the end of the selection".to_string(),
                found: token.kind.describe(),
            },
        )),
        None => Ok(selector),
    }
}

struct Parser {
    tokens: Vec<Token>,
    current: usize,
    end_offset: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.current)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|token| &token.kind)
    }

    fn next_offset(&self) -> usize {
        self.peek().map(|token| token.offset).unwrap_or(self.end_offset)
    }

    fn advance(&mut self) {
        self.current += 1;
    }

    fn syntax(&self, offset: usize, kind: SyntaxErrorKind) -> SelectionError {
        SelectionError::Syntax { offset, kind }
    }

    fn unexpected(&self, expected: &str) -> SelectionError {
        match self.peek() {
            Some(token) => self.syntax(
                token.offset,
                SyntaxErrorKind::Unexpected {
                    expected: expected.to_string(),
                    found: token.kind.describe(),
                },
            ),
            None => self.syntax(
                self.end_offset,
                SyntaxErrorKind::UnexpectedEnd {
                    expected: expected.to_string(),
                },
            ),
        }
    }

    fn expect_rparen(&mut self) -> Result<(), SelectionError> {
        if self.peek_kind() == Some(&TokenKind::RParen) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected("')'"))
        }
    }

    fn expect_lparen(&mut self, context: &str) -> Result<(), SelectionError> {
        if self.peek_kind() == Some(&TokenKind::LParen) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(context))
        }
    }

    // expr := or_expr
    fn parse_expression(&mut self) -> Result<Selector, SelectionError> {
        self.parse_or()
    }

    // or_expr := and_expr ("or" and_expr)*
    fn parse_or(&mut self) -> Result<Selector, SelectionError> {
        let mut lhs = self.parse_and()?;
        while self.peek_kind() == Some(&TokenKind::Or) {
            self.advance();
            let rhs = self.parse_and()?;
            lhs = Selector::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    // and_expr := unary ("and" unary)*
    fn parse_and(&mut self) -> Result<Selector, SelectionError> {
        let mut lhs = self.parse_unary()?;
        while self.peek_kind() == Some(&TokenKind::And) {
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = Selector::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    // unary := "not" unary | atom
    fn parse_unary(&mut self) -> Result<Selector, SelectionError> {
        if self.peek_kind() == Some(&TokenKind::Not) {
            self.advance();
            let inner = self.parse_unary()?;
            // a negated string predicate flips its equality flag instead of
            // growing a Not node
            if let Selector::Str(mut string) = inner {
                string.equals = !string.equals;
                return Ok(Selector::Str(string));
            }
            return Ok(Selector::Not(Box::new(inner)));
        }
        self.parse_atom()
    }

    // atom := "all" | "none" | "(" expr ")" | string_pred | math_cmp
    fn parse_atom(&mut self) -> Result<Selector, SelectionError> {
        match self.peek_kind() {
            Some(TokenKind::All) => {
                self.advance();
                Ok(Selector::All)
            }
            Some(TokenKind::None) => {
                self.advance();
                Ok(Selector::None)
            }
            Some(TokenKind::Property(Property::String(property))) => {
                let property = *property;
                self.parse_string_predicate(property)
            }
            Some(TokenKind::LParen) => {
                // "(" may open a parenthesized boolean expression or the
                // parenthesized head of a math comparison; try the boolean
                // reading first and fall back on failure
                let checkpoint = self.current;
                match self.parse_boolean_group() {
                    Ok(selector) => Ok(selector),
                    Err(boolean_error) => {
                        self.current = checkpoint;
                        match self.parse_math_comparison() {
                            Ok(selector) => Ok(selector),
                            Err(math_error) => {
                                // report whichever reading progressed further
                                if boolean_error.offset() >= math_error.offset() {
                                    Err(boolean_error)
                                } else {
                                    Err(math_error)
                                }
                            }
                        }
                    }
                }
            }
            Some(_) => self.parse_math_comparison(),
            None => Err(self.unexpected("a selector")),
        }
    }

    fn parse_boolean_group(&mut self) -> Result<Selector, SelectionError> {
        self.advance(); // consume '('
        let inner = self.parse_expression()?;
        self.expect_rparen()?;
        // a group followed by an arithmetic or comparison operator was a
        // math primary, not a boolean group
        if matches!(
            self.peek_kind(),
            Some(
                TokenKind::Plus
                    | TokenKind::Minus
                    | TokenKind::Star
                    | TokenKind::Slash
                    | TokenKind::Hat
                    | TokenKind::Equal
                    | TokenKind::NotEqual
                    | TokenKind::Less
                    | TokenKind::LessEqual
                    | TokenKind::Greater
                    | TokenKind::GreaterEqual
            )
        ) {
            return Err(self.unexpected("a boolean operator"));
        }
        Ok(inner)
    }

    // string_pred := prop_str ["(" digit ")"] ("=="|"!=")? literal_str
    fn parse_string_predicate(
        &mut self,
        property: StringProperty,
    ) -> Result<Selector, SelectionError> {
        self.advance(); // consume the property
        let argument = self.parse_optional_argument()?;

        let equals = match self.peek_kind() {
            Some(TokenKind::Equal) => {
                self.advance();
                true
            }
            Some(TokenKind::NotEqual) => {
                self.advance();
                false
            }
            Some(
                kind @ (TokenKind::Less
                | TokenKind::LessEqual
                | TokenKind::Greater
                | TokenKind::GreaterEqual),
            ) => {
                let operator = match kind {
                    TokenKind::Less => "<",
                    TokenKind::LessEqual => "<=",
                    TokenKind::Greater => ">",
                    _ => ">=",
                };
                let offset = self.next_offset();
                return Err(self.syntax(
                    offset,
                    SyntaxErrorKind::StringComparison {
                        property: property.as_str().to_string(),
                        operator: operator.to_string(),
                    },
                ));
            }
            // a bare literal is sugar for equality
            _ => true,
        };

        let value = match self.peek_kind() {
            Some(TokenKind::Ident(value)) => {
                let value = value.clone();
                self.advance();
                value
            }
            Some(TokenKind::QuotedString(value)) => {
                let value = value.clone();
                self.advance();
                value
            }
            Some(kind) => {
                let found = kind.describe();
                let offset = self.next_offset();
                return Err(self.syntax(
                    offset,
                    SyntaxErrorKind::ExpectedStringValue {
                        property: property.as_str().to_string(),
                        found,
                    },
                ));
            }
            None => {
                return Err(self.unexpected(&format!(
                    "a string value for property '{}'",
                    property.as_str()
                )));
            }
        };

        Ok(Selector::Str(StringSelector {
            property,
            value,
            equals,
            argument,
        }))
    }

    /// Consumes an optional argument binding, returning the 0-based slot.
    fn parse_optional_argument(&mut self) -> Result<usize, SelectionError> {
        if let Some(TokenKind::ArgBinding(value)) = self.peek_kind() {
            let value = *value;
            let offset = self.next_offset();
            if !(1..=MAX_ARITY as u64).contains(&value) {
                return Err(self.syntax(offset, SyntaxErrorKind::ArgumentOutOfRange(value)));
            }
            self.advance();
            return Ok((value - 1) as usize);
        }
        Ok(0)
    }

    // math_cmp := math_expr cmp_op math_expr
    fn parse_math_comparison(&mut self) -> Result<Selector, SelectionError> {
        let lhs = self.parse_math_expression()?;
        let op = match self.peek_kind() {
            Some(TokenKind::Equal) => CmpOp::Equal,
            Some(TokenKind::NotEqual) => CmpOp::NotEqual,
            Some(TokenKind::Less) => CmpOp::Less,
            Some(TokenKind::LessEqual) => CmpOp::LessEqual,
            Some(TokenKind::Greater) => CmpOp::Greater,
            Some(TokenKind::GreaterEqual) => CmpOp::GreaterEqual,
            _ => return Err(self.unexpected("a comparison operator")),
        };
        self.advance();
        let rhs = self.parse_math_expression()?;
        Ok(Selector::Math { op, lhs, rhs })
    }

    // math_expr := term (("+"|"-") term)*
    fn parse_math_expression(&mut self) -> Result<MathExpr, SelectionError> {
        let mut lhs = self.parse_math_term()?;
        loop {
            match self.peek_kind() {
                Some(TokenKind::Plus) => {
                    self.advance();
                    let rhs = self.parse_math_term()?;
                    lhs = MathExpr::Add(Box::new(lhs), Box::new(rhs));
                }
                Some(TokenKind::Minus) => {
                    self.advance();
                    let rhs = self.parse_math_term()?;
                    lhs = MathExpr::Sub(Box::new(lhs), Box::new(rhs));
                }
                _ => return Ok(lhs),
            }
        }
    }

    // term := power (("*"|"/") power)*
    fn parse_math_term(&mut self) -> Result<MathExpr, SelectionError> {
        let mut lhs = self.parse_math_power()?;
        loop {
            match self.peek_kind() {
                Some(TokenKind::Star) => {
                    self.advance();
                    let rhs = self.parse_math_power()?;
                    lhs = MathExpr::Mul(Box::new(lhs), Box::new(rhs));
                }
                Some(TokenKind::Slash) => {
                    self.advance();
                    let rhs = self.parse_math_power()?;
                    lhs = MathExpr::Div(Box::new(lhs), Box::new(rhs));
                }
                _ => return Ok(lhs),
            }
        }
    }

    // power := unary_math ("^" power)?  (right-associative)
    fn parse_math_power(&mut self) -> Result<MathExpr, SelectionError> {
        let lhs = self.parse_math_unary()?;
        if self.peek_kind() == Some(&TokenKind::Hat) {
            self.advance();
            let rhs = self.parse_math_power()?;
            return Ok(MathExpr::Pow(Box::new(lhs), Box::new(rhs)));
        }
        Ok(lhs)
    }

    // unary_math := "-" unary_math | primary
    fn parse_math_unary(&mut self) -> Result<MathExpr, SelectionError> {
        if self.peek_kind() == Some(&TokenKind::Minus) {
            self.advance();
            let inner = self.parse_math_unary()?;
            return Ok(MathExpr::Neg(Box::new(inner)));
        }
        self.parse_math_primary()
    }

    // primary := number | prop_num ["(" digit ")"] | func "(" math_expr ")"
    //          | "(" math_expr ")"
    fn parse_math_primary(&mut self) -> Result<MathExpr, SelectionError> {
        match self.peek_kind() {
            Some(TokenKind::Number(value)) => {
                let value = *value;
                self.advance();
                Ok(MathExpr::Number(value))
            }
            Some(TokenKind::Property(Property::Numeric(property))) => {
                let property = *property;
                self.advance();
                let argument = self.parse_optional_argument()?;
                Ok(MathExpr::Property { property, argument })
            }
            Some(TokenKind::Property(Property::String(property))) => {
                let offset = self.next_offset();
                Err(self.syntax(
                    offset,
                    SyntaxErrorKind::StringPropertyInMath(property.as_str().to_string()),
                ))
            }
            Some(TokenKind::Ident(name)) => {
                let name = name.clone();
                let offset = self.next_offset();
                match MATH_FUNCTIONS.get(name.as_str()) {
                    Some(&function) => {
                        self.advance();
                        self.expect_lparen("'(' after a function name")?;
                        let inner = self.parse_math_expression()?;
                        self.expect_rparen()?;
                        Ok(MathExpr::Function(function, Box::new(inner)))
                    }
                    None => {
                        // a call-shaped unknown name is a bad function,
                        // anything else is a bad property
                        let called = self.tokens.get(self.current + 1).map(|token| &token.kind)
                            == Some(&TokenKind::LParen);
                        if called {
                            Err(self.syntax(offset, SyntaxErrorKind::UnknownFunction(name)))
                        } else {
                            Err(self.syntax(offset, SyntaxErrorKind::UnknownProperty(name)))
                        }
                    }
                }
            }
            Some(TokenKind::LParen) => {
                self.advance();
                let inner = self.parse_math_expression()?;
                self.expect_rparen()?;
                Ok(inner)
            }
            _ => Err(self.unexpected("a numeric value")),
        }
    }
}
