use super::error::{LexErrorKind, SelectionError};
use super::expr::{Coordinate, NumericProperty, StringProperty};

/// An atom property name, string- or numeric-valued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Property {
    String(StringProperty),
    Numeric(NumericProperty),
}

impl Property {
    fn from_ident(ident: &str) -> Option<Property> {
        match ident {
            "name" => Some(Property::String(StringProperty::Name)),
            "type" => Some(Property::String(StringProperty::Type)),
            "resname" => Some(Property::String(StringProperty::Resname)),
            "index" => Some(Property::Numeric(NumericProperty::Index)),
            "resid" => Some(Property::Numeric(NumericProperty::Resid)),
            "mass" => Some(Property::Numeric(NumericProperty::Mass)),
            "x" => Some(Property::Numeric(NumericProperty::Position(Coordinate::X))),
            "y" => Some(Property::Numeric(NumericProperty::Position(Coordinate::Y))),
            "z" => Some(Property::Numeric(NumericProperty::Position(Coordinate::Z))),
            "vx" => Some(Property::Numeric(NumericProperty::Velocity(Coordinate::X))),
            "vy" => Some(Property::Numeric(NumericProperty::Velocity(Coordinate::Y))),
            "vz" => Some(Property::Numeric(NumericProperty::Velocity(Coordinate::Z))),
            _ => None,
        }
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Property::String(property) => property.as_str(),
            Property::Numeric(property) => property.as_str(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    And,
    Or,
    Not,
    All,
    None,
    Property(Property),
    /// A bare identifier: a string value or a function name.
    Ident(String),
    Number(f64),
    QuotedString(String),
    /// The `(n)` argument-binding marker, lexed only when directly attached
    /// to a property identifier. The value is not range-checked here.
    ArgBinding(u64),
    LParen,
    RParen,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Plus,
    Minus,
    Star,
    Slash,
    Hat,
}

impl TokenKind {
    /// A human-readable description used in syntax error messages.
    pub(crate) fn describe(&self) -> String {
        match self {
            TokenKind::And => "keyword 'and'".to_string(),
            TokenKind::Or => "keyword 'or'".to_string(),
            TokenKind::Not => "keyword 'not'".to_string(),
            TokenKind::All => "keyword 'all'".to_string(),
            TokenKind::None => "keyword 'none'".to_string(),
            TokenKind::Property(property) => format!("property '{}'", property.as_str()),
            TokenKind::Ident(ident) => format!("'{ident}'"),
            TokenKind::Number(value) => format!("number {value}"),
            TokenKind::QuotedString(value) => format!("string \"{value}\""),
            TokenKind::ArgBinding(value) => format!("argument binding ({value})"),
            TokenKind::LParen => "'('".to_string(),
            TokenKind::RParen => "')'".to_string(),
            TokenKind::Equal => "'=='".to_string(),
            TokenKind::NotEqual => "'!='".to_string(),
            TokenKind::Less => "'<'".to_string(),
            TokenKind::LessEqual => "'<='".to_string(),
            TokenKind::Greater => "'>'".to_string(),
            TokenKind::GreaterEqual => "'>='".to_string(),
            TokenKind::Plus => "'+'".to_string(),
            TokenKind::Minus => "'-'".to_string(),
            TokenKind::Star => "'*'".to_string(),
            TokenKind::Slash => "'/'".to_string(),
            TokenKind::Hat => "'^'".to_string(),
        }
    }
}

/// A lexical token with the byte offset where it starts.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub offset: usize,
}

struct Lexer<'a> {
    input: &'a str,
    chars: Vec<(usize, char)>,
    position: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Lexer {
            input,
            chars: input.char_indices().collect(),
            position: 0,
        }
    }

    fn offset(&self) -> usize {
        self.chars
            .get(self.position)
            .map(|&(offset, _)| offset)
            .unwrap_or(self.input.len())
    }

    fn current(&self) -> Option<char> {
        self.chars.get(self.position).map(|&(_, c)| c)
    }

    fn peek(&self, lookahead: usize) -> Option<char> {
        self.chars.get(self.position + lookahead).map(|&(_, c)| c)
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn skip_whitespace(&mut self) {
        while self.current().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn error(&self, offset: usize, kind: LexErrorKind) -> SelectionError {
        SelectionError::Lex { offset, kind }
    }

    fn read_identifier(&mut self) -> &'a str {
        let start = self.offset();
        while self
            .current()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            self.advance();
        }
        &self.input[start..self.offset()]
    }

    fn read_number(&mut self) -> Result<f64, SelectionError> {
        let start = self.offset();
        while self.current().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        if self.current() == Some('.') {
            self.advance();
            while self.current().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }
        if matches!(self.current(), Some('e') | Some('E')) {
            self.advance();
            if matches!(self.current(), Some('+') | Some('-')) {
                self.advance();
            }
            while self.current().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }
        let text = &self.input[start..self.offset()];
        text.parse::<f64>()
            .map_err(|_| self.error(start, LexErrorKind::InvalidNumber(text.to_string())))
    }

    fn read_quoted(&mut self, quote: char) -> Result<String, SelectionError> {
        let start = self.offset();
        self.advance();
        let mut value = String::new();
        loop {
            match self.current() {
                Some(c) if c == quote => {
                    self.advance();
                    return Ok(value);
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
                Option::None => {
                    return Err(self.error(start, LexErrorKind::UnterminatedString));
                }
            }
        }
    }

    /// Reads a `(n)` marker directly following a property identifier.
    /// Leaves the cursor untouched and returns `None` when the
    /// parenthesized text is not a plain integer.
    fn read_argument_binding(&mut self) -> Option<u64> {
        let checkpoint = self.position;
        self.advance(); // consume '('
        let start = self.offset();
        while self.current().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        let digits = &self.input[start..self.offset()];
        if digits.is_empty() || self.current() != Some(')') {
            self.position = checkpoint;
            return Option::None;
        }
        match digits.parse() {
            Ok(value) => {
                self.advance(); // consume ')'
                Some(value)
            }
            Err(_) => {
                self.position = checkpoint;
                Option::None
            }
        }
    }
}

/// Splits a selection string into tokens.
///
/// # Errors
///
/// Fails on an invalid character, a malformed numeric literal, or an
/// unterminated quoted string, with the byte offset of the problem.
pub(crate) fn tokenize(input: &str) -> Result<Vec<Token>, SelectionError> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();

    loop {
        lexer.skip_whitespace();
        let offset = lexer.offset();
        let Some(c) = lexer.current() else {
            break;
        };

        let kind = match c {
            '(' => {
                lexer.advance();
                TokenKind::LParen
            }
            ')' => {
                lexer.advance();
                TokenKind::RParen
            }
            '+' => {
                lexer.advance();
                TokenKind::Plus
            }
            '-' => {
                lexer.advance();
                TokenKind::Minus
            }
            '*' => {
                lexer.advance();
                TokenKind::Star
            }
            '/' => {
                lexer.advance();
                TokenKind::Slash
            }
            '^' => {
                lexer.advance();
                TokenKind::Hat
            }
            '<' => {
                lexer.advance();
                if lexer.current() == Some('=') {
                    lexer.advance();
                    TokenKind::LessEqual
                } else {
                    TokenKind::Less
                }
            }
            '>' => {
                lexer.advance();
                if lexer.current() == Some('=') {
                    lexer.advance();
                    TokenKind::GreaterEqual
                } else {
                    TokenKind::Greater
                }
            }
            '=' => {
                lexer.advance();
                if lexer.current() == Some('=') {
                    lexer.advance();
                    TokenKind::Equal
                } else {
                    return Err(lexer.error(offset, LexErrorKind::InvalidCharacter('=')));
                }
            }
            '!' => {
                lexer.advance();
                if lexer.current() == Some('=') {
                    lexer.advance();
                    TokenKind::NotEqual
                } else {
                    return Err(lexer.error(offset, LexErrorKind::InvalidCharacter('!')));
                }
            }
            '"' | '\'' => TokenKind::QuotedString(lexer.read_quoted(c)?),
            c if c.is_ascii_digit() => TokenKind::Number(lexer.read_number()?),
            '.' if lexer.peek(1).is_some_and(|c| c.is_ascii_digit()) => {
                TokenKind::Number(lexer.read_number()?)
            }
            c if c.is_alphabetic() || c == '_' => {
                let ident = lexer.read_identifier();
                match ident {
                    "and" => TokenKind::And,
                    "or" => TokenKind::Or,
                    "not" => TokenKind::Not,
                    "all" => TokenKind::All,
                    "none" => TokenKind::None,
                    _ => match Property::from_ident(ident) {
                        Some(property) => {
                            tokens.push(Token {
                                kind: TokenKind::Property(property),
                                offset,
                            });
                            // an attached `(n)` is an argument binding
                            if lexer.current() == Some('(') {
                                let binding_offset = lexer.offset();
                                if let Some(value) = lexer.read_argument_binding() {
                                    tokens.push(Token {
                                        kind: TokenKind::ArgBinding(value),
                                        offset: binding_offset,
                                    });
                                }
                            }
                            continue;
                        }
                        Option::None => TokenKind::Ident(ident.to_string()),
                    },
                }
            }
            c => return Err(lexer.error(offset, LexErrorKind::InvalidCharacter(c))),
        };

        tokens.push(Token { kind, offset });
    }

    Ok(tokens)
}
