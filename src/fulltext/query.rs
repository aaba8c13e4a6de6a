//! Parser for the full-text query language accepted by `search`.
//!
//! The syntax is a subset of the Lucene classic query parser:
//!
//! * `term`, `field:term` (an unqualified term matches any field)
//! * `field:pre*` prefix and `field:c?t*` wildcard terms
//! * `"a phrase"` and `field:"a phrase"`
//! * `*:*` to match every document
//! * `AND` / `&&`, `OR` / `||`, `NOT` / `!`, `+required`, `-prohibited`
//! * `( ... )` grouping and `field:( ... )` field grouping
//! * `\` escapes the following character
//!
//! Adjacent clauses without an operator are combined with the configured
//! [`DefaultOperator`]. Terms are kept raw here; the index analyzes them when
//! the query is evaluated.

use std::{iter::Peekable, str::Chars};

use crate::{config::DefaultOperator, errors::ProcError};

/// Deepest parenthesis nesting accepted. Parsing and evaluation both recurse
/// once per level, so this also bounds the evaluator's stack use.
pub const MAX_QUERY_DEPTH: usize = 64;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FullTextQuery {
    Term { field: Option<String>, text: String },
    Phrase { field: Option<String>, text: String },
    Prefix { field: Option<String>, prefix: String },
    Wildcard { field: Option<String>, pattern: Vec<WildcardPart> },
    MatchAll,
    Boolean(Vec<Clause>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Clause {
    pub occur: Occur,
    pub query: FullTextQuery,
}

impl Clause {
    pub fn new(occur: Occur, query: FullTextQuery) -> Self {
        Self { occur, query }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Occur {
    Must,
    Should,
    MustNot,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WildcardPart {
    Literal(char),
    /// `?`
    AnyChar,
    /// `*`
    AnyRun,
}

/// Matches `text` against a wildcard pattern.
pub fn wildcard_matches(pattern: &[WildcardPart], text: &str) -> bool {
    let chars: Vec<char> = text.chars().collect();
    let (mut p, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;
    while t < chars.len() {
        match pattern.get(p) {
            Some(WildcardPart::AnyRun) => {
                backtrack = Some((p, t));
                p += 1;
            }
            Some(WildcardPart::AnyChar) => {
                p += 1;
                t += 1;
            }
            Some(WildcardPart::Literal(c)) if *c == chars[t] => {
                p += 1;
                t += 1;
            }
            _ => match backtrack {
                Some((star, consumed)) => {
                    p = star + 1;
                    t = consumed + 1;
                    backtrack = Some((star, consumed + 1));
                }
                None => return false,
            },
        }
    }
    pattern[p..]
        .iter()
        .all(|part| matches!(part, WildcardPart::AnyRun))
}

pub fn parse_query(text: &str, default_operator: DefaultOperator) -> Result<FullTextQuery, ProcError> {
    let tokens = lex(text)?;
    if tokens.is_empty() {
        return Err(ProcError::invalid_query("query must not be empty"));
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        default_operator,
    };
    let query = parser.parse_sequence(None)?;
    if let Some(token) = parser.peek() {
        return Err(ProcError::invalid_query(format!(
            "unexpected {} in query",
            token.describe()
        )));
    }
    Ok(query)
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Tok {
    LParen,
    RParen,
    Plus,
    Minus,
    Not,
    And,
    Or,
    Field(String),
    Word(Vec<WordChar>),
    Quoted(String),
}

impl Tok {
    fn describe(&self) -> String {
        match self {
            Tok::LParen => "`(`".into(),
            Tok::RParen => "`)`".into(),
            Tok::Plus => "`+`".into(),
            Tok::Minus => "`-`".into(),
            Tok::Not => "NOT".into(),
            Tok::And => "AND".into(),
            Tok::Or => "OR".into(),
            Tok::Field(name) => format!("field `{name}:`"),
            Tok::Word(chars) => format!("`{}`", word_text(chars)),
            Tok::Quoted(text) => format!("\"{text}\""),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct WordChar {
    ch: char,
    escaped: bool,
}

fn word_text(chars: &[WordChar]) -> String {
    chars.iter().map(|c| c.ch).collect()
}

fn is_wildcard(c: &WordChar) -> bool {
    !c.escaped && (c.ch == '*' || c.ch == '?')
}

fn lex(text: &str) -> Result<Vec<Tok>, ProcError> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Tok::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Tok::RParen);
            }
            '+' => {
                chars.next();
                tokens.push(Tok::Plus);
            }
            '-' => {
                chars.next();
                tokens.push(Tok::Minus);
            }
            '!' => {
                chars.next();
                tokens.push(Tok::Not);
            }
            '"' => {
                chars.next();
                tokens.push(Tok::Quoted(lex_quoted(&mut chars)?));
            }
            _ => tokens.push(lex_word(&mut chars)?),
        }
    }
    Ok(tokens)
}

fn lex_quoted(chars: &mut Peekable<Chars<'_>>) -> Result<String, ProcError> {
    let mut text = String::new();
    while let Some(c) = chars.next() {
        match c {
            '"' => return Ok(text),
            '\\' => match chars.next() {
                Some(escaped) => text.push(escaped),
                None => return Err(ProcError::invalid_query("dangling escape character")),
            },
            other => text.push(other),
        }
    }
    Err(ProcError::invalid_query("unterminated quoted phrase"))
}

fn lex_word(chars: &mut Peekable<Chars<'_>>) -> Result<Tok, ProcError> {
    let mut word = Vec::new();
    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => break,
            '(' | ')' | '"' => break,
            ':' => {
                chars.next();
                if word.is_empty() {
                    return Err(ProcError::invalid_query("missing field name before `:`"));
                }
                return Ok(Tok::Field(word_text(&word)));
            }
            '\\' => {
                chars.next();
                match chars.next() {
                    Some(escaped) => word.push(WordChar {
                        ch: escaped,
                        escaped: true,
                    }),
                    None => return Err(ProcError::invalid_query("dangling escape character")),
                }
            }
            other => {
                chars.next();
                word.push(WordChar {
                    ch: other,
                    escaped: false,
                });
            }
        }
    }
    let unescaped_operator = |op: &str| word.iter().all(|c| !c.escaped) && word_text(&word) == op;
    if unescaped_operator("AND") || unescaped_operator("&&") {
        Ok(Tok::And)
    } else if unescaped_operator("OR") || unescaped_operator("||") {
        Ok(Tok::Or)
    } else if unescaped_operator("NOT") {
        Ok(Tok::Not)
    } else {
        Ok(Tok::Word(word))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Modifier {
    None,
    Required,
    Prohibited,
}

struct Parser {
    tokens: Vec<Tok>,
    pos: usize,
    depth: usize,
    default_operator: DefaultOperator,
}

impl Parser {
    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Tok> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn parse_sequence(&mut self, field: Option<&str>) -> Result<FullTextQuery, ProcError> {
        let mut elements = Vec::new();
        while !matches!(self.peek(), None | Some(Tok::RParen)) {
            elements.push(self.parse_or(field)?);
        }
        if elements.is_empty() {
            return Err(ProcError::invalid_query("empty group"));
        }
        if elements.len() == 1 && elements[0].0 == Modifier::None {
            let (_, query) = elements.remove(0);
            return Ok(query);
        }
        let default = match self.default_operator {
            DefaultOperator::Or => Occur::Should,
            DefaultOperator::And => Occur::Must,
        };
        let clauses = elements
            .into_iter()
            .map(|(modifier, query)| {
                let occur = match modifier {
                    Modifier::None => default,
                    Modifier::Required => Occur::Must,
                    Modifier::Prohibited => Occur::MustNot,
                };
                Clause::new(occur, query)
            })
            .collect();
        Ok(FullTextQuery::Boolean(clauses))
    }

    fn parse_or(&mut self, field: Option<&str>) -> Result<(Modifier, FullTextQuery), ProcError> {
        let mut operands = vec![self.parse_and(field)?];
        while matches!(self.peek(), Some(Tok::Or)) {
            self.advance();
            operands.push(self.parse_and(field).map_err(|e| after_operator(e, "OR"))?);
        }
        if operands.len() == 1 {
            return Ok(operands.remove(0));
        }
        let clauses = operands
            .into_iter()
            .map(|(modifier, query)| match modifier {
                Modifier::Prohibited => Clause::new(Occur::MustNot, query),
                _ => Clause::new(Occur::Should, query),
            })
            .collect();
        Ok((Modifier::None, FullTextQuery::Boolean(clauses)))
    }

    fn parse_and(&mut self, field: Option<&str>) -> Result<(Modifier, FullTextQuery), ProcError> {
        let mut operands = vec![self.parse_unary(field)?];
        while matches!(self.peek(), Some(Tok::And)) {
            self.advance();
            operands.push(self.parse_unary(field).map_err(|e| after_operator(e, "AND"))?);
        }
        if operands.len() == 1 {
            return Ok(operands.remove(0));
        }
        let clauses = operands
            .into_iter()
            .map(|(modifier, query)| match modifier {
                Modifier::Prohibited => Clause::new(Occur::MustNot, query),
                _ => Clause::new(Occur::Must, query),
            })
            .collect();
        Ok((Modifier::None, FullTextQuery::Boolean(clauses)))
    }

    fn parse_unary(&mut self, field: Option<&str>) -> Result<(Modifier, FullTextQuery), ProcError> {
        // The outermost prefix wins; `--a` is the same as `-a`.
        let mut modifier = Modifier::None;
        loop {
            let next = match self.peek() {
                Some(Tok::Not) | Some(Tok::Minus) => Modifier::Prohibited,
                Some(Tok::Plus) => Modifier::Required,
                _ => break,
            };
            self.advance();
            if modifier == Modifier::None {
                modifier = next;
            }
        }
        Ok((modifier, self.parse_primary(field)?))
    }

    fn parse_primary(&mut self, field: Option<&str>) -> Result<FullTextQuery, ProcError> {
        match self.advance() {
            Some(Tok::LParen) => self.parse_group(field),
            Some(Tok::Field(name)) => {
                let scoped = if name == "*" { None } else { Some(name.as_str()) };
                match self.advance() {
                    Some(Tok::LParen) => self.parse_group(scoped),
                    Some(Tok::Word(word)) if name == "*" && word_text(&word) == "*" => {
                        Ok(FullTextQuery::MatchAll)
                    }
                    Some(Tok::Word(word)) => Ok(word_query(scoped, &word)),
                    Some(Tok::Quoted(text)) => Ok(FullTextQuery::Phrase {
                        field: scoped.map(str::to_string),
                        text,
                    }),
                    _ => Err(ProcError::invalid_query(format!(
                        "missing value for field `{name}`"
                    ))),
                }
            }
            Some(Tok::Word(word)) => Ok(word_query(field, &word)),
            Some(Tok::Quoted(text)) => Ok(FullTextQuery::Phrase {
                field: field.map(str::to_string),
                text,
            }),
            Some(other) => Err(ProcError::invalid_query(format!(
                "unexpected {} in query",
                other.describe()
            ))),
            None => Err(ProcError::invalid_query("unexpected end of query")),
        }
    }

    fn parse_group(&mut self, field: Option<&str>) -> Result<FullTextQuery, ProcError> {
        if self.depth >= MAX_QUERY_DEPTH {
            return Err(ProcError::invalid_query("query nested too deeply"));
        }
        self.depth += 1;
        let query = self.parse_sequence(field);
        self.depth -= 1;
        let query = query?;
        match self.advance() {
            Some(Tok::RParen) => Ok(query),
            _ => Err(ProcError::invalid_query("missing closing parenthesis")),
        }
    }
}

fn after_operator(err: ProcError, operator: &str) -> ProcError {
    match err {
        ProcError::InvalidQuery(msg) => {
            ProcError::invalid_query(format!("expected a term after {operator}: {msg}"))
        }
        other => other,
    }
}

fn word_query(field: Option<&str>, word: &[WordChar]) -> FullTextQuery {
    let field = field.map(str::to_string);
    let wildcards = word.iter().filter(|c| is_wildcard(c)).count();
    if wildcards == 0 {
        return FullTextQuery::Term {
            field,
            text: word_text(word),
        };
    }
    if let Some((last, rest)) = word.split_last() {
        if wildcards == 1 && !last.escaped && last.ch == '*' && !rest.is_empty() {
            return FullTextQuery::Prefix {
                field,
                prefix: word_text(rest),
            };
        }
    }
    let pattern = word
        .iter()
        .map(|c| match (c.escaped, c.ch) {
            (false, '*') => WildcardPart::AnyRun,
            (false, '?') => WildcardPart::AnyChar,
            (_, ch) => WildcardPart::Literal(ch),
        })
        .collect();
    FullTextQuery::Wildcard { field, pattern }
}
