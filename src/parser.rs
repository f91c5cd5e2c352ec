//! Textual predicate grammar.
//!
//! ```text
//! Rule  := Expr '=>' Expr
//! Expr  := Or
//! Or    := And (OR And)*
//! And   := Term (AND Term)*
//! Term  := TRUE | FALSE | '(' Expr ')' | NOT Term | AtomicRef
//! ```
//!
//! Keywords are whole words delimited by whitespace or parentheses. Atomic names
//! are free-form (spaces, digits, punctuation, even keyword-like words), so they
//! are not tokens: an `AtomicRef` is found by extending a span token by token from
//! the current position and asking the resolver about each candidate, see
//! [`Lookahead`].
//!
//! Parsed operands go through the same normalizing constructors as programmatic
//! combinators, so `parse(p.to_string()) == p` for any predicate `p` whose atomics
//! the resolver knows. Outer parentheses around a whole `AND`/`OR` are kept:
//! `(a OR b)` parses to the grouped predicate, not to `a OR b`.
//!
//! ```
//! use predicate_rules::parser::{names_resolver, Parser};
//! use predicate_rules::predicate::Predicate;
//!
//! let atomics = vec![
//!     Predicate::atomic("even", |x: &u32| x % 2 == 0),
//!     Predicate::atomic("small", |x: &u32| *x < 10),
//! ];
//! let parser = Parser::new(names_resolver(atomics));
//! let p = parser.parse("small AND NOT even").unwrap();
//! assert_eq!(p.to_string(), "NOT even AND small");
//! ```

use std::collections::HashMap;
use std::fmt::{Debug, Display, Formatter};

use log::debug;
use thiserror::Error;

use crate::predicate::Predicate;

/// Fixed lexemes of the grammar.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Keyword {
    And,
    Or,
    Not,
    True,
    False,
    LeftParen,
    RightParen,
    Implies,
}

impl Keyword {
    pub const ALL: [Keyword; 8] = [
        Keyword::And,
        Keyword::Or,
        Keyword::Not,
        Keyword::True,
        Keyword::False,
        Keyword::LeftParen,
        Keyword::RightParen,
        Keyword::Implies,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Keyword::And => "AND",
            Keyword::Or => "OR",
            Keyword::Not => "NOT",
            Keyword::True => "TRUE",
            Keyword::False => "FALSE",
            Keyword::LeftParen => "(",
            Keyword::RightParen => ")",
            Keyword::Implies => "=>",
        }
    }

    fn from_word(word: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == word)
    }
}

impl Display for Keyword {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum ParseError {
    #[error("empty predicate")]
    Empty,

    #[error("unexpected end of input")]
    UnexpectedEnd,

    #[error("unexpected '{found}' at {position}")]
    Unexpected { position: usize, found: String },

    #[error("unmatched parenthesis at {position}")]
    UnmatchedParenthesis { position: usize },

    #[error("cannot resolve predicate at {position}: '{text}'")]
    Unresolved { position: usize, text: String },

    #[error("expected '{}' in rule", Keyword::Implies)]
    MissingImplication,
}

/// Span extension policy for atomic names.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub enum Lookahead {
    /// Take the first (shortest) span the resolver accepts.
    #[default]
    Shortest,
    /// Try every span up to the end of input and take the longest accepted one.
    Longest,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum TokenKind {
    Keyword(Keyword),
    Word,
}

#[derive(Debug, Copy, Clone)]
struct Token {
    kind: TokenKind,
    start: usize,
    end: usize,
}

fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '(' | ')' => {
                let keyword = if c == '(' { Keyword::LeftParen } else { Keyword::RightParen };
                tokens.push(Token {
                    kind: TokenKind::Keyword(keyword),
                    start,
                    end: start + 1,
                });
            }
            _ => {
                let mut end = start + c.len_utf8();
                while let Some(&(i, c)) = chars.peek() {
                    if c.is_whitespace() || c == '(' || c == ')' {
                        break;
                    }
                    end = i + c.len_utf8();
                    chars.next();
                }
                let kind = match Keyword::from_word(&text[start..end]) {
                    Some(keyword) => TokenKind::Keyword(keyword),
                    None => TokenKind::Word,
                };
                tokens.push(Token { kind, start, end });
            }
        }
    }
    tokens
}

/// A condition and its conclusion, written `condition => conclusion`.
pub struct Rule<T> {
    pub condition: Predicate<T>,
    pub conclusion: Predicate<T>,
}

impl<T> Display for Rule<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.condition, Keyword::Implies, self.conclusion)
    }
}

impl<T> Debug for Rule<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule")
            .field("condition", &self.condition)
            .field("conclusion", &self.conclusion)
            .finish()
    }
}

/// Predicate parser over a name resolver `&str -> Option<Predicate<T>>`.
pub struct Parser<F> {
    resolver: F,
    lookahead: Lookahead,
}

impl<F> Parser<F> {
    pub fn new(resolver: F) -> Self {
        Self {
            resolver,
            lookahead: Lookahead::default(),
        }
    }

    pub fn with_lookahead(mut self, lookahead: Lookahead) -> Self {
        self.lookahead = lookahead;
        self
    }

    pub fn parse<T>(&self, text: &str) -> Result<Predicate<T>, ParseError>
    where
        F: Fn(&str) -> Option<Predicate<T>>,
    {
        debug!("parse({:?})", text);
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return Err(ParseError::Empty);
        }
        self.parse_tokens(text, &tokens)
    }

    /// Parses `condition => conclusion`.
    pub fn parse_rule<T>(&self, text: &str) -> Result<Rule<T>, ParseError>
    where
        F: Fn(&str) -> Option<Predicate<T>>,
    {
        debug!("parse_rule({:?})", text);
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return Err(ParseError::Empty);
        }
        let split = tokens
            .iter()
            .position(|t| t.kind == TokenKind::Keyword(Keyword::Implies))
            .ok_or(ParseError::MissingImplication)?;
        let (condition, conclusion) = (&tokens[..split], &tokens[split + 1..]);
        if condition.is_empty() {
            return Err(ParseError::Unexpected {
                position: tokens[split].start,
                found: Keyword::Implies.to_string(),
            });
        }
        if conclusion.is_empty() {
            return Err(ParseError::UnexpectedEnd);
        }
        Ok(Rule {
            condition: self.parse_tokens(text, condition)?,
            conclusion: self.parse_tokens(text, conclusion)?,
        })
    }

    fn parse_tokens<T>(&self, text: &str, tokens: &[Token]) -> Result<Predicate<T>, ParseError>
    where
        F: Fn(&str) -> Option<Predicate<T>>,
    {
        let mut state = State {
            text,
            tokens,
            pos: 0,
            resolver: &self.resolver,
            lookahead: self.lookahead,
        };
        let predicate = state.parse_or()?;
        match state.peek() {
            None => Ok(predicate),
            Some(token) if token.kind == TokenKind::Keyword(Keyword::RightParen) => {
                Err(ParseError::UnmatchedParenthesis { position: token.start })
            }
            Some(token) => Err(state.unexpected(token)),
        }
    }
}

/// Parses `text` with the default [`Lookahead`].
pub fn parse<T, F>(text: &str, resolver: F) -> Result<Predicate<T>, ParseError>
where
    F: Fn(&str) -> Option<Predicate<T>>,
{
    Parser::new(resolver).parse(text)
}

/// Resolver looking predicates up by their printed name.
pub fn names_resolver<T>(predicates: impl IntoIterator<Item = Predicate<T>>) -> impl Fn(&str) -> Option<Predicate<T>> {
    let by_name: HashMap<String, Predicate<T>> = predicates.into_iter().map(|p| (p.name().to_string(), p)).collect();
    move |name: &str| by_name.get(name).cloned()
}

struct State<'a, F> {
    text: &'a str,
    tokens: &'a [Token],
    pos: usize,
    resolver: &'a F,
    lookahead: Lookahead,
}

impl<F> State<'_, F> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn peek_keyword(&self) -> Option<Keyword> {
        match self.peek()?.kind {
            TokenKind::Keyword(keyword) => Some(keyword),
            TokenKind::Word => None,
        }
    }

    fn unexpected(&self, token: Token) -> ParseError {
        ParseError::Unexpected {
            position: token.start,
            found: self.text[token.start..token.end].to_string(),
        }
    }

    fn parse_or<T>(&mut self) -> Result<Predicate<T>, ParseError>
    where
        F: Fn(&str) -> Option<Predicate<T>>,
    {
        let first = self.parse_and()?;
        if self.peek_keyword() != Some(Keyword::Or) {
            // A lone operand is already normalized; keep its grouping.
            return Ok(first);
        }
        let mut operands = vec![first];
        while self.peek_keyword() == Some(Keyword::Or) {
            self.pos += 1;
            operands.push(self.parse_and()?);
        }
        Ok(Predicate::or_all(operands))
    }

    fn parse_and<T>(&mut self) -> Result<Predicate<T>, ParseError>
    where
        F: Fn(&str) -> Option<Predicate<T>>,
    {
        let first = self.parse_term()?;
        if self.peek_keyword() != Some(Keyword::And) {
            return Ok(first);
        }
        let mut operands = vec![first];
        while self.peek_keyword() == Some(Keyword::And) {
            self.pos += 1;
            operands.push(self.parse_term()?);
        }
        Ok(Predicate::and_all(operands))
    }

    fn parse_term<T>(&mut self) -> Result<Predicate<T>, ParseError>
    where
        F: Fn(&str) -> Option<Predicate<T>>,
    {
        let token = self.peek().ok_or(ParseError::UnexpectedEnd)?;
        match token.kind {
            TokenKind::Keyword(Keyword::True) => {
                self.pos += 1;
                Ok(Predicate::True)
            }
            TokenKind::Keyword(Keyword::False) => {
                self.pos += 1;
                Ok(Predicate::False)
            }
            TokenKind::Keyword(Keyword::LeftParen) => {
                self.pos += 1;
                let inner = self.parse_or()?;
                if self.peek_keyword() != Some(Keyword::RightParen) {
                    return Err(ParseError::UnmatchedParenthesis { position: token.start });
                }
                self.pos += 1;
                Ok(inner.parens())
            }
            TokenKind::Keyword(Keyword::Not) => {
                self.pos += 1;
                Ok(self.parse_term()?.negate())
            }
            TokenKind::Keyword(_) => Err(self.unexpected(token)),
            TokenKind::Word => self.parse_atomic(),
        }
    }

    fn parse_atomic<T>(&mut self) -> Result<Predicate<T>, ParseError>
    where
        F: Fn(&str) -> Option<Predicate<T>>,
    {
        let start = self.tokens[self.pos].start;
        let mut resolved = None;
        for last in self.pos..self.tokens.len() {
            let candidate = &self.text[start..self.tokens[last].end];
            if let Some(predicate) = (self.resolver)(candidate) {
                resolved = Some((last, predicate));
                if self.lookahead == Lookahead::Shortest {
                    break;
                }
            }
        }
        match resolved {
            Some((last, predicate)) => {
                debug!("resolved {:?} as {}", &self.text[start..self.tokens[last].end], predicate);
                self.pos = last + 1;
                Ok(predicate)
            }
            None => {
                let end = self.tokens.last().map_or(start, |t| t.end);
                Err(ParseError::Unresolved {
                    position: start,
                    text: self.text[start..end].to_string(),
                })
            }
        }
    }
}
