// Mini-Parser Combinators
//
// A rewindable character cursor plus the step primitives the
// administrative grammars are built from. Each step either succeeds
// (optionally producing a value) or fails with `UnexpectedSyntax`;
// grammars compose steps sequentially and abort on the first error.

use std::collections::HashMap;

use crate::error::{ParseError, ParseResult};

/// A value read by `read_value`: either a quoted literal or a bare token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueToken {
    Quoted(String),
    Bare(String),
}

impl ValueToken {
    pub fn into_string(self) -> String {
        match self {
            ValueToken::Quoted(s) | ValueToken::Bare(s) => s,
        }
    }
}

/// Peekable cursor over statement text. Rewinding is a saved/restored
/// index, so `optional` and `maybe` never consume input on failure.
pub struct Cursor {
    chars: Vec<char>,
    pos: usize,
}

impl Cursor {
    pub fn new(input: &str) -> Cursor {
        Cursor {
            chars: input.chars().collect(),
            pos: 0,
        }
    }

    pub fn eof(&self) -> bool {
        self.pos >= self.chars.len()
    }

    pub fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn rewind(&mut self, position: usize) {
        self.pos = position;
    }

    fn found_here(&self) -> String {
        match self.peek() {
            Some(c) => c.to_string(),
            None => "EOF".to_string(),
        }
    }

    /// Consume one expected character.
    pub fn expect_char(&mut self, expected: char) -> ParseResult<()> {
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(ParseError::unexpected(expected.to_string(), c.to_string())),
            None => Err(ParseError::unexpected(expected.to_string(), "EOF")),
        }
    }

    /// Consume an identifier and require it to equal `expected`
    /// (identifiers are case-folded to lowercase).
    pub fn expect(&mut self, expected: &str) -> ParseResult<()> {
        let ident = self.read_ident();
        if ident == expected {
            Ok(())
        } else {
            Err(ParseError::unexpected(expected, ident))
        }
    }

    /// Consume an identifier matching one of the options, returning the
    /// match.
    pub fn one_of(&mut self, options: &[&str]) -> ParseResult<String> {
        let ident = self.read_ident();
        for option in options {
            if option.to_lowercase() == ident {
                return Ok(ident);
            }
        }
        Err(ParseError::unexpected(
            format!("one of: {}", options.join(", ")),
            ident,
        ))
    }

    pub fn skip_spaces(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    /// Require end of input.
    pub fn check_eof(&self) -> ParseResult<()> {
        if self.eof() {
            Ok(())
        } else {
            Err(ParseError::unexpected("EOF", self.found_here()))
        }
    }

    /// Run `step`; absence ("expected but absent") counts as success with
    /// no consumption.
    pub fn optional<T>(
        &mut self,
        step: impl FnOnce(&mut Cursor) -> ParseResult<T>,
    ) -> ParseResult<Option<T>> {
        let start = self.position();
        match step(self) {
            Ok(value) => Ok(Some(value)),
            Err(ParseError::UnexpectedSyntax { .. }) => {
                self.rewind(start);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    /// Maximal letter-then-letter/digit/underscore run, lowercased. An
    /// empty string is returned when the next character cannot start an
    /// identifier; `expect` turns that into a syntax error.
    pub fn read_ident(&mut self) -> String {
        let mut ident = String::new();
        match self.peek() {
            Some(c) if c.is_alphabetic() => {
                ident.push(c);
                self.pos += 1;
            }
            _ => return ident,
        }
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                ident.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        ident.to_lowercase()
    }

    /// A contiguous digit run.
    pub fn read_digits(&mut self) -> ParseResult<String> {
        let mut digits = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                digits.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        if digits.is_empty() {
            Err(ParseError::unexpected("a number", self.found_here()))
        } else {
            Ok(digits)
        }
    }

    /// Backtick-quoted identifier body with doubled-backtick escaping.
    /// Assumes the opening backtick was already consumed.
    fn read_quoted_ident(&mut self) -> ParseResult<String> {
        let mut ident = String::new();
        loop {
            match self.bump() {
                Some('`') => {
                    if self.peek() == Some('`') {
                        self.pos += 1;
                        ident.push('`');
                    } else {
                        return Ok(ident.to_lowercase());
                    }
                }
                Some(c) => ident.push(c),
                None => return Err(ParseError::unexpected("`", "EOF")),
            }
        }
    }

    /// An identifier that may be backtick-quoted.
    pub fn read_quotable_ident(&mut self) -> ParseResult<String> {
        if self.peek() == Some('`') {
            self.pos += 1;
            self.read_quoted_ident()
        } else {
            let ident = self.read_ident();
            if ident.is_empty() {
                Err(ParseError::unexpected("an identifier", self.found_here()))
            } else {
                Ok(ident)
            }
        }
    }

    /// A possibly qualified identifier: `[qualifier.]name`, either part
    /// quotable.
    pub fn read_qualified_ident(&mut self) -> ParseResult<(Option<String>, String)> {
        let first = self.read_quotable_ident()?;
        if self.peek() == Some('.') {
            self.pos += 1;
            let second = self.read_quotable_ident()?;
            Ok((Some(first), second))
        } else {
            Ok((None, first))
        }
    }

    /// A quoted ('...'/"...") or bare value token. Quoted values honor
    /// backslash escapes and doubled quotes; bare tokens run until
    /// whitespace, comma, parenthesis, semicolon or end of input, and are
    /// not case-folded.
    pub fn read_value(&mut self) -> ParseResult<ValueToken> {
        match self.peek() {
            Some(quote @ ('\'' | '"')) => {
                self.pos += 1;
                let mut value = String::new();
                loop {
                    match self.bump() {
                        Some('\\') => match self.bump() {
                            Some(escaped) => value.push(unescape(escaped)),
                            None => {
                                return Err(ParseError::unexpected(quote.to_string(), "EOF"));
                            }
                        },
                        Some(c) if c == quote => {
                            if self.peek() == Some(quote) {
                                self.pos += 1;
                                value.push(quote);
                            } else {
                                return Ok(ValueToken::Quoted(value));
                            }
                        }
                        Some(c) => value.push(c),
                        None => return Err(ParseError::unexpected(quote.to_string(), "EOF")),
                    }
                }
            }
            Some(_) => {
                let mut value = String::new();
                while let Some(c) = self.peek() {
                    if c.is_whitespace() || matches!(c, ',' | '(' | ')' | ';') {
                        break;
                    }
                    value.push(c);
                    self.pos += 1;
                }
                if value.is_empty() {
                    Err(ParseError::unexpected("a value", self.found_here()))
                } else {
                    Ok(ValueToken::Bare(value))
                }
            }
            None => Err(ParseError::unexpected("a value", "EOF")),
        }
    }

    /// Try to consume `expected` (case-insensitive); true on success, no
    /// consumption otherwise.
    pub fn maybe(&mut self, expected: &str) -> bool {
        let count = expected.chars().count();
        if self.pos + count > self.chars.len() {
            return false;
        }
        let window: String = self.chars[self.pos..self.pos + count].iter().collect();
        if window.to_lowercase() == expected.to_lowercase() {
            self.pos += count;
            true
        } else {
            false
        }
    }

    /// Try to consume several words separated by arbitrary whitespace;
    /// consumes if and only if all of them are found.
    pub fn multi_maybe(&mut self, words: &[&str]) -> bool {
        let start = self.position();
        for (i, word) in words.iter().enumerate() {
            if i > 0 {
                self.skip_spaces();
            }
            if !self.maybe(word) {
                self.rewind(start);
                return false;
            }
        }
        true
    }

    /// Parse `open ident (sep ident)* close` if `open` is next; returns
    /// None with no consumption otherwise.
    pub fn maybe_list(
        &mut self,
        open: char,
        separator: char,
        close: char,
    ) -> ParseResult<Option<Vec<String>>> {
        if self.peek() != Some(open) {
            return Ok(None);
        }
        self.pos += 1;
        let mut items = Vec::new();
        loop {
            self.skip_spaces();
            let item = self.read_quotable_ident()?;
            self.skip_spaces();
            match self.bump() {
                Some(c) if c == close => {
                    items.push(item);
                    return Ok(Some(items));
                }
                Some(c) if c == separator => {
                    items.push(item);
                }
                Some(c) => {
                    return Err(ParseError::unexpected(
                        format!("{} or {}", separator, close),
                        c.to_string(),
                    ));
                }
                None => {
                    return Err(ParseError::unexpected(
                        format!("{} or {}", separator, close),
                        "EOF",
                    ));
                }
            }
        }
    }

    /// Comma-separated list of `[qualifier.]name` pairs, spaces allowed
    /// anywhere between items.
    pub fn read_qualified_list(&mut self) -> ParseResult<Vec<(Option<String>, String)>> {
        let mut list = Vec::new();
        loop {
            self.skip_spaces();
            list.push(self.read_qualified_ident()?);
            self.skip_spaces();
            if self.peek() == Some(',') {
                self.pos += 1;
            } else {
                return Ok(list);
            }
        }
    }

    /// Parenthesized, comma-separated expression sources, quote- and
    /// paren-aware. Items are returned as trimmed source substrings.
    pub fn read_exprs(&mut self) -> ParseResult<Vec<String>> {
        self.skip_spaces();
        self.expect_char('(')?;
        let mut items = Vec::new();
        let mut item = String::new();
        let mut depth = 0usize;
        let mut quote: Option<char> = None;
        loop {
            let c = match self.bump() {
                Some(c) => c,
                None => return Err(ParseError::unexpected(")", "EOF")),
            };
            if let Some(q) = quote {
                item.push(c);
                if c == '\\' {
                    if let Some(escaped) = self.bump() {
                        item.push(escaped);
                    }
                } else if c == q {
                    quote = None;
                }
                continue;
            }
            match c {
                '\'' | '"' | '`' => {
                    quote = Some(c);
                    item.push(c);
                }
                '(' => {
                    depth += 1;
                    item.push(c);
                }
                ')' if depth > 0 => {
                    depth -= 1;
                    item.push(c);
                }
                ')' => {
                    items.push(item.trim().to_string());
                    return Ok(items);
                }
                ',' if depth == 0 => {
                    items.push(item.trim().to_string());
                    item = String::new();
                }
                _ => item.push(c),
            }
        }
    }

    /// A parenthesized source fragment, returned verbatim without the
    /// outer parentheses. Nested parentheses and quotes are honored.
    pub fn read_parenthesized(&mut self) -> ParseResult<String> {
        self.skip_spaces();
        self.expect_char('(')?;
        let mut text = String::new();
        let mut depth = 0usize;
        let mut quote: Option<char> = None;
        loop {
            let c = match self.bump() {
                Some(c) => c,
                None => return Err(ParseError::unexpected(")", "EOF")),
            };
            if let Some(q) = quote {
                text.push(c);
                if c == '\\' && q != '`' {
                    if let Some(escaped) = self.bump() {
                        text.push(escaped);
                    }
                } else if c == q {
                    quote = None;
                }
                continue;
            }
            match c {
                '\'' | '"' | '`' => {
                    quote = Some(c);
                    text.push(c);
                }
                '(' => {
                    depth += 1;
                    text.push(c);
                }
                ')' if depth > 0 => {
                    depth -= 1;
                    text.push(c);
                }
                ')' => return Ok(text.trim().to_string()),
                _ => text.push(c),
            }
        }
    }

    /// Parenthesized `key = value` list into a string map; entry order is
    /// not significant.
    pub fn read_key_value(&mut self) -> ParseResult<HashMap<String, String>> {
        self.skip_spaces();
        self.expect_char('(')?;
        let mut map = HashMap::new();
        loop {
            self.skip_spaces();
            let key = self.read_quotable_ident()?;
            self.skip_spaces();
            self.expect_char('=')?;
            self.skip_spaces();
            let value = self.read_value()?.into_string();
            map.insert(key, value);
            self.skip_spaces();
            match self.bump() {
                Some(')') => return Ok(map),
                Some(',') => {}
                Some(c) => {
                    return Err(ParseError::unexpected(", or )", c.to_string()));
                }
                None => return Err(ParseError::unexpected(", or )", "EOF")),
            }
        }
    }

    /// Everything left on the cursor, verbatim.
    pub fn read_remaining(&mut self) -> String {
        let rest: String = self.chars[self.pos..].iter().collect();
        self.pos = self.chars.len();
        rest
    }
}

fn unescape(c: char) -> char {
    match c {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        '0' => '\0',
        other => other,
    }
}
