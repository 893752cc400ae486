//! Character cursor with line and column tracking.

use crate::error::ParseError;

/// Position-aware view over the source characters.
pub(super) struct Cursor {
    chars: Vec<char>,
    index: usize,
    line: usize,
    column: usize,
}

/// A saved source position used to anchor error messages.
#[derive(Debug, Clone, Copy)]
pub(super) struct Mark {
    pub(super) line: usize,
    pub(super) column: usize,
}

impl Cursor {
    pub(super) fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            index: 0,
            line: 1,
            column: 1,
        }
    }

    pub(super) fn peek(&self) -> Option<char> {
        self.chars.get(self.index).copied()
    }

    pub(super) fn peek_nth(&self, offset: usize) -> Option<char> {
        self.chars.get(self.index + offset).copied()
    }

    pub(super) fn bump(&mut self) -> Option<char> {
        let next = self.peek()?;
        self.index += 1;
        if next == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(next)
    }

    /// Consumes `expected` if it is the next character.
    pub(super) fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    pub(super) const fn mark(&self) -> Mark {
        Mark {
            line: self.line,
            column: self.column,
        }
    }

    pub(super) fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(self.line, self.column, message)
    }

    pub(super) fn error_at(mark: Mark, message: impl Into<String>) -> ParseError {
        ParseError::new(mark.line, mark.column, message)
    }

    /// Skips whitespace (including newlines) and `#` comments.
    pub(super) fn skip_trivia(&mut self) {
        while let Some(next) = self.peek() {
            if next == '#' {
                while let Some(skipped) = self.bump() {
                    if skipped == '\n' {
                        break;
                    }
                }
            } else if next.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    /// Consumes characters while `predicate` holds and returns them.
    pub(super) fn take_while(&mut self, predicate: impl Fn(char) -> bool) -> String {
        let mut taken = String::new();
        while let Some(next) = self.peek() {
            if !predicate(next) {
                break;
            }
            taken.push(next);
            self.bump();
        }
        taken
    }
}
