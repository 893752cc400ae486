//! Recursive-descent parser for configuration text.
//!
//! A document is a sequence of `key = value` entries forming the top-level
//! dictionary. Values are dictionaries (`{ ... }`), lists (`[ ... ]`),
//! double-quoted strings, numbers, booleans, invocations
//! (`name(key = value, ...)`) or bare symbols, which read as strings so
//! specs can say `type = int`. Entries and list elements may be separated by
//! commas, semicolons or plain whitespace. `#` starts a line comment.
//!
//! Integers that fit in 32 bits parse as [`Value::Int`]; larger integers or
//! those written with an `L` suffix parse as [`Value::Long`].

mod cursor;

use crate::error::ParseError;
use crate::value::{Dict, Invocation, Value};

use self::cursor::Cursor;

/// Maximum container nesting accepted by the parser.
pub const MAX_NESTING: usize = 128;

/// Parses configuration text into its top-level dictionary.
///
/// # Errors
///
/// Returns a [`ParseError`] locating the first syntax error. No partial
/// result is returned.
///
/// ```
/// use configfile::{Value, parse};
///
/// let dict = parse("name = \"demo\"\nretries = 3\n").expect("valid text");
/// assert_eq!(dict.get("retries"), Some(&Value::Int(3)));
/// ```
pub fn parse(text: &str) -> Result<Dict, ParseError> {
    Parser::new(text).document()
}

/// Parses a single value, such as `[1, 2]` or `launch(path = "x")`.
///
/// # Errors
///
/// Returns a [`ParseError`] if the text is not exactly one value.
pub fn parse_value(text: &str) -> Result<Value, ParseError> {
    let mut parser = Parser::new(text);
    parser.cursor.skip_trivia();
    let value = parser.value(0)?;
    parser.cursor.skip_trivia();
    match parser.cursor.peek() {
        None => Ok(value),
        Some(found) => Err(parser
            .cursor
            .error(format!("unexpected '{found}' after value"))),
    }
}

struct Parser {
    cursor: Cursor,
}

impl Parser {
    fn new(text: &str) -> Self {
        Self {
            cursor: Cursor::new(text),
        }
    }

    fn document(&mut self) -> Result<Dict, ParseError> {
        let mut dict = Dict::new();
        loop {
            self.cursor.skip_trivia();
            if self.cursor.peek().is_none() {
                return Ok(dict);
            }
            self.entry(&mut dict, 0)?;
            self.separator();
        }
    }

    /// Parses `key = value` and inserts it, rejecting duplicate keys.
    fn entry(&mut self, dict: &mut Dict, depth: usize) -> Result<(), ParseError> {
        let mark = self.cursor.mark();
        let key = self.key()?;
        self.cursor.skip_trivia();
        if !self.cursor.eat('=') {
            return Err(self.cursor.error(format!("expected '=' after key '{key}'")));
        }
        self.cursor.skip_trivia();
        let value = self.value(depth)?;
        if dict.contains_key(&key) {
            return Err(Cursor::error_at(mark, format!("duplicate key '{key}'")));
        }
        dict.insert(key, value);
        Ok(())
    }

    fn separator(&mut self) {
        self.cursor.skip_trivia();
        if self.cursor.eat(',') || self.cursor.eat(';') {
            self.cursor.skip_trivia();
        }
    }

    fn key(&mut self) -> Result<String, ParseError> {
        match self.cursor.peek() {
            Some('"') => self.string(),
            Some(next) if is_identifier_start(next) => Ok(self.identifier()),
            Some(found) => Err(self.cursor.error(format!("expected key, found '{found}'"))),
            None => Err(self.cursor.error("expected key, found end of input")),
        }
    }

    fn value(&mut self, depth: usize) -> Result<Value, ParseError> {
        if depth >= MAX_NESTING {
            return Err(self
                .cursor
                .error(format!("nesting exceeds {MAX_NESTING} levels")));
        }
        match self.cursor.peek() {
            Some('{') => self.dict(depth + 1).map(Value::Dict),
            Some('[') => self.list(depth + 1).map(Value::List),
            Some('"') => self.string().map(Value::String),
            Some(next) if next.is_ascii_digit() || next == '-' || next == '+' => self.number(),
            Some(next) if is_identifier_start(next) => self.word(depth),
            Some(found) => Err(self
                .cursor
                .error(format!("expected value, found '{found}'"))),
            None => Err(self.cursor.error("expected value, found end of input")),
        }
    }

    fn dict(&mut self, depth: usize) -> Result<Dict, ParseError> {
        let open = self.cursor.mark();
        self.cursor.bump();
        let mut dict = Dict::new();
        loop {
            self.cursor.skip_trivia();
            match self.cursor.peek() {
                Some('}') => {
                    self.cursor.bump();
                    return Ok(dict);
                }
                None => return Err(Cursor::error_at(open, "unterminated dictionary")),
                Some(_) => {
                    self.entry(&mut dict, depth)?;
                    self.separator();
                }
            }
        }
    }

    fn list(&mut self, depth: usize) -> Result<Vec<Value>, ParseError> {
        let open = self.cursor.mark();
        self.cursor.bump();
        let mut items = Vec::new();
        loop {
            self.cursor.skip_trivia();
            match self.cursor.peek() {
                Some(']') => {
                    self.cursor.bump();
                    return Ok(items);
                }
                None => return Err(Cursor::error_at(open, "unterminated list")),
                Some(_) => {
                    items.push(self.value(depth)?);
                    self.separator();
                }
            }
        }
    }

    fn string(&mut self) -> Result<String, ParseError> {
        let open = self.cursor.mark();
        self.cursor.bump();
        let mut text = String::new();
        loop {
            match self.cursor.bump() {
                Some('"') => return Ok(text),
                Some('\\') => text.push(self.escape()?),
                Some(next) => text.push(next),
                None => return Err(Cursor::error_at(open, "unterminated string")),
            }
        }
    }

    fn escape(&mut self) -> Result<char, ParseError> {
        match self.cursor.bump() {
            Some('n') => Ok('\n'),
            Some('t') => Ok('\t'),
            Some('r') => Ok('\r'),
            Some('0') => Ok('\0'),
            Some('"') => Ok('"'),
            Some('\\') => Ok('\\'),
            Some(other) => Err(self.cursor.error(format!("unknown escape '\\{other}'"))),
            None => Err(self.cursor.error("unterminated escape")),
        }
    }

    fn identifier(&mut self) -> String {
        self.cursor.take_while(is_identifier_continue)
    }

    /// Parses a word in value position: a boolean, a special float, an
    /// invocation or a bare symbol.
    fn word(&mut self, depth: usize) -> Result<Value, ParseError> {
        let word = self.identifier();
        match word.as_str() {
            "true" => return Ok(Value::Boolean(true)),
            "false" => return Ok(Value::Boolean(false)),
            "inf" => return Ok(Value::Double(f64::INFINITY)),
            "nan" => return Ok(Value::Double(f64::NAN)),
            _ => {}
        }
        self.cursor.skip_trivia();
        if self.cursor.peek() == Some('(') {
            let args = self.arguments(depth + 1)?;
            return Ok(Value::Invocation(Invocation::new(word, args)));
        }
        Ok(Value::String(word))
    }

    fn arguments(&mut self, depth: usize) -> Result<Dict, ParseError> {
        let open = self.cursor.mark();
        self.cursor.bump();
        let mut args = Dict::new();
        loop {
            self.cursor.skip_trivia();
            match self.cursor.peek() {
                Some(')') => {
                    self.cursor.bump();
                    return Ok(args);
                }
                None => return Err(Cursor::error_at(open, "unterminated invocation")),
                Some(_) => {
                    self.entry(&mut args, depth)?;
                    self.separator();
                }
            }
        }
    }

    fn number(&mut self) -> Result<Value, ParseError> {
        let start = self.cursor.mark();
        let mut literal = String::new();
        if let Some(sign) = self.cursor.peek().filter(|c| *c == '-' || *c == '+') {
            literal.push(sign);
            self.cursor.bump();
        }

        if self.cursor.peek().is_some_and(char::is_alphabetic) {
            let word = self.identifier();
            return match (literal.as_str(), word.as_str()) {
                ("-", "inf") => Ok(Value::Double(f64::NEG_INFINITY)),
                (_, "inf") => Ok(Value::Double(f64::INFINITY)),
                (_, "nan") => Ok(Value::Double(f64::NAN)),
                _ => Err(Cursor::error_at(
                    start,
                    format!("invalid number '{literal}{word}'"),
                )),
            };
        }

        literal.push_str(&self.cursor.take_while(|c| c.is_ascii_digit()));
        let mut is_float = false;
        let fraction_follows = self.cursor.peek_nth(1).is_some_and(|c| c.is_ascii_digit());
        if self.cursor.peek() == Some('.') && fraction_follows {
            is_float = true;
            literal.push('.');
            self.cursor.bump();
            literal.push_str(&self.cursor.take_while(|c| c.is_ascii_digit()));
        }
        if matches!(self.cursor.peek(), Some('e' | 'E')) {
            is_float = true;
            literal.push('e');
            self.cursor.bump();
            if let Some(sign) = self.cursor.peek().filter(|c| *c == '-' || *c == '+') {
                literal.push(sign);
                self.cursor.bump();
            }
            literal.push_str(&self.cursor.take_while(|c| c.is_ascii_digit()));
        }
        let long_suffix = !is_float && (self.cursor.eat('L') || self.cursor.eat('l'));

        if self.cursor.peek().is_some_and(is_identifier_continue) {
            return Err(self
                .cursor
                .error(format!("unexpected character after number '{literal}'")));
        }

        number_value(&literal, is_float, long_suffix)
            .ok_or_else(|| Cursor::error_at(start, format!("invalid number '{literal}'")))
    }
}

fn number_value(literal: &str, is_float: bool, long_suffix: bool) -> Option<Value> {
    if is_float {
        return literal.parse::<f64>().ok().map(Value::Double);
    }
    let number = literal.parse::<i64>().ok()?;
    if long_suffix {
        return Some(Value::Long(number));
    }
    Some(i32::try_from(number).map_or(Value::Long(number), Value::Int))
}

fn is_identifier_start(next: char) -> bool {
    next.is_alphabetic() || next == '_'
}

pub(crate) fn is_identifier_continue(next: char) -> bool {
    next.is_alphanumeric() || next == '_' || next == '-'
}

#[cfg(test)]
mod tests;
