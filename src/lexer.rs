use std::fmt;

use crate::token::{Position, Span, Token, TokenKind};

/// Classifies a lexer error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexErrorKind {
    /// String literal not closed before a line break or end of input.
    UnterminatedString,
    /// Template literal never closed with a backtick.
    UnterminatedTemplate,
    /// Regular expression literal not closed before a line break.
    UnterminatedRegExp,
    /// Block comment (`/* ...`) never closed.
    UnterminatedComment,
    /// Malformed numeric literal (`0x`, `1e`, `3in`).
    InvalidNumber,
    /// Malformed `\u` escape in an identifier.
    InvalidEscape,
    /// Character that cannot start any token.
    UnexpectedCharacter(char),
}

impl fmt::Display for LexErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnterminatedString => write!(f, "unterminated string constant"),
            Self::UnterminatedTemplate => write!(f, "unterminated template"),
            Self::UnterminatedRegExp => {
                write!(f, "unterminated regular expression")
            }
            Self::UnterminatedComment => write!(f, "unterminated comment"),
            Self::InvalidNumber => write!(f, "invalid number"),
            Self::InvalidEscape => {
                write!(f, "invalid Unicode escape sequence")
            }
            Self::UnexpectedCharacter(ch) => {
                write!(f, "unexpected character: {ch}")
            }
        }
    }
}

/// Error produced during lexing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at line {}, column {}", position.line, position.column)]
pub struct LexError {
    pub kind: LexErrorKind,
    pub position: Position,
}

/// Tokenize a source string into a sequence of tokens.
///
/// A `/` is read as a regular expression when the previous token
/// cannot end an operand. This is the usual approximation for
/// standalone tokenizing; the parser re-scans with full grammar
/// context instead. The trailing end-of-input token is not included.
///
/// # Errors
///
/// Returns `LexError` on unterminated literals or comments, malformed
/// numbers, or characters that cannot start a token.
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    let mut lexer = Lexer::new(input);
    let mut tokens: Vec<Token> = Vec::new();
    // open-brace depth inside each active `${ ... }` substitution
    let mut substitutions: Vec<usize> = Vec::new();

    loop {
        let mut token = lexer.next_token()?;
        match token.kind {
            TokenKind::Eof => break,
            TokenKind::Punctuator => match token.text(input) {
                "/" | "/=" if regex_allowed_after(tokens.last(), input) => {
                    token = lexer.relex_regexp(token)?;
                }
                "{" => {
                    if let Some(depth) = substitutions.last_mut() {
                        *depth += 1;
                    }
                }
                "}" => match substitutions.last_mut() {
                    Some(0) => {
                        substitutions.pop();
                        token = lexer.relex_template(token)?;
                        if token.kind == (TokenKind::Template { tail: false }) {
                            substitutions.push(0);
                        }
                    }
                    Some(depth) => *depth -= 1,
                    None => {}
                },
                _ => {}
            },
            TokenKind::Template { tail: false } => substitutions.push(0),
            _ => {}
        }
        tokens.push(token);
    }

    Ok(tokens)
}

fn regex_allowed_after(prev: Option<&Token>, input: &str) -> bool {
    let Some(prev) = prev else {
        return true;
    };
    match prev.kind {
        TokenKind::Name => matches!(
            prev.text(input),
            "return"
                | "typeof"
                | "instanceof"
                | "in"
                | "of"
                | "new"
                | "delete"
                | "void"
                | "throw"
                | "case"
                | "do"
                | "else"
                | "yield"
                | "await"
        ),
        TokenKind::Punctuator => !matches!(prev.text(input), ")" | "]" | "}" | "++" | "--"),
        TokenKind::Template { tail } => !tail,
        _ => false,
    }
}

const PUNCTUATORS: &[&str] = &[
    ">>>=", "...", "===", "!==", "**=", "<<=", ">>=", ">>>", "&&=", "||=", "??=", "=>", "==",
    "!=", "<=", ">=", "&&", "||", "??", "?.", "++", "--", "+=", "-=", "*=", "/=", "%=", "&=",
    "|=", "^=", "**", "<<", ">>", "{", "}", "(", ")", "[", "]", ";", ",", "<", ">", "+", "-",
    "*", "/", "%", "&", "|", "^", "!", "~", "?", ":", "=", ".", "@",
];

pub(crate) const fn is_line_terminator(ch: char) -> bool {
    matches!(ch, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

/// ECMAScript `WhiteSpace`: tab, vertical tab, form feed, space, NBSP,
/// the byte order mark and the `Zs` category.
const fn is_whitespace(ch: char) -> bool {
    matches!(
        ch,
        '\t' | '\u{000B}'
            | '\u{000C}'
            | ' '
            | '\u{00A0}'
            | '\u{FEFF}'
            | '\u{1680}'
            | '\u{2000}'..='\u{200A}'
            | '\u{202F}'
            | '\u{205F}'
            | '\u{3000}'
    )
}

fn is_id_start(ch: char) -> bool {
    ch == '$' || ch == '_' || ch.is_ascii_alphabetic() || (!ch.is_ascii() && ch.is_alphabetic())
}

fn is_id_part(ch: char) -> bool {
    is_id_start(ch)
        || ch.is_ascii_digit()
        || matches!(ch, '\u{200C}' | '\u{200D}')
        || (!ch.is_ascii() && ch.is_alphanumeric())
}

/// On-demand tokenizer. The parser pulls one token at a time and may
/// rewind to re-scan the current token as a regular expression or a
/// template continuation.
#[derive(Debug, Clone)]
pub(crate) struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub(crate) fn new(input: &'a str) -> Self {
        let mut lexer = Self {
            input,
            pos: 0,
            line: 1,
            column: 0,
        };
        if input.starts_with("#!") {
            while lexer.peek().is_some_and(|ch| !is_line_terminator(ch)) {
                lexer.bump();
            }
        }
        lexer
    }

    const fn position(&self) -> Position {
        Position {
            offset: self.pos,
            line: self.line,
            column: self.column,
        }
    }

    fn rewind(&mut self, to: Position) {
        self.pos = to.offset;
        self.line = to.line;
        self.column = to.column;
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        match ch {
            '\n' | '\u{2028}' | '\u{2029}' => {
                self.line += 1;
                self.column = 0;
            }
            // CRLF counts once, on the LF
            '\r' if self.peek() != Some('\n') => {
                self.line += 1;
                self.column = 0;
            }
            _ => self.column += 1,
        }
        Some(ch)
    }

    const fn error(kind: LexErrorKind, position: Position) -> LexError {
        LexError { kind, position }
    }

    const fn finish(&self, kind: TokenKind, start: Position, newline_before: bool) -> Token {
        Token {
            kind,
            span: Span {
                start,
                end: self.position(),
            },
            newline_before,
        }
    }

    /// Skip whitespace and comments. Returns whether a line
    /// terminator was crossed.
    fn skip_trivia(&mut self) -> Result<bool, LexError> {
        let mut newline = false;
        while let Some(ch) = self.peek() {
            if is_line_terminator(ch) {
                newline = true;
                self.bump();
            } else if is_whitespace(ch) {
                self.bump();
            } else if ch == '/' && self.peek_nth(1) == Some('/') {
                while self.peek().is_some_and(|c| !is_line_terminator(c)) {
                    self.bump();
                }
            } else if ch == '/' && self.peek_nth(1) == Some('*') {
                let start = self.position();
                self.bump();
                self.bump();
                loop {
                    match self.bump() {
                        None => {
                            return Err(Self::error(LexErrorKind::UnterminatedComment, start));
                        }
                        Some('*') if self.peek() == Some('/') => {
                            self.bump();
                            break;
                        }
                        Some(c) if is_line_terminator(c) => newline = true,
                        Some(_) => {}
                    }
                }
            } else {
                break;
            }
        }
        Ok(newline)
    }

    pub(crate) fn next_token(&mut self) -> Result<Token, LexError> {
        let newline_before = self.skip_trivia()?;
        let start = self.position();

        let Some(ch) = self.peek() else {
            return Ok(self.finish(TokenKind::Eof, start, newline_before));
        };

        let kind = match ch {
            '"' | '\'' => self.read_string(ch, start)?,
            '`' => {
                self.bump();
                self.read_template_chunk(start)?
            }
            '#' => {
                self.bump();
                match self.peek() {
                    Some(c) if is_id_start(c) || c == '\\' => {
                        self.read_name_chars(start)?;
                        TokenKind::PrivateName
                    }
                    _ => {
                        return Err(Self::error(LexErrorKind::UnexpectedCharacter('#'), start));
                    }
                }
            }
            '0'..='9' => self.read_number(start)?,
            '.' if self.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) => {
                self.read_number(start)?
            }
            c if is_id_start(c) || c == '\\' => {
                self.read_name_chars(start)?;
                TokenKind::Name
            }
            _ => self.read_punctuator(start)?,
        };

        Ok(self.finish(kind, start, newline_before))
    }

    /// Re-scan a `/` or `/=` punctuator as a regular expression literal.
    pub(crate) fn relex_regexp(&mut self, token: Token) -> Result<Token, LexError> {
        let start = token.span.start;
        self.rewind(start);
        self.bump(); // opening slash

        let mut in_class = false;
        loop {
            match self.peek() {
                None => return Err(Self::error(LexErrorKind::UnterminatedRegExp, start)),
                Some(c) if is_line_terminator(c) => {
                    return Err(Self::error(LexErrorKind::UnterminatedRegExp, start));
                }
                Some('\\') => {
                    self.bump();
                    match self.peek() {
                        Some(c) if !is_line_terminator(c) => {
                            self.bump();
                        }
                        _ => {
                            return Err(Self::error(LexErrorKind::UnterminatedRegExp, start));
                        }
                    }
                }
                Some('[') => {
                    in_class = true;
                    self.bump();
                }
                Some(']') => {
                    in_class = false;
                    self.bump();
                }
                Some('/') if !in_class => {
                    self.bump();
                    break;
                }
                Some(_) => {
                    self.bump();
                }
            }
        }

        // flags
        while self.peek().is_some_and(is_id_part) {
            self.bump();
        }

        Ok(self.finish(TokenKind::RegExp, start, token.newline_before))
    }

    /// Re-scan a `}` punctuator as the continuation of a template
    /// literal after a `${ ... }` substitution.
    pub(crate) fn relex_template(&mut self, token: Token) -> Result<Token, LexError> {
        let start = token.span.start;
        self.rewind(start);
        self.bump(); // closing brace of the substitution
        let kind = self.read_template_chunk(start)?;
        Ok(self.finish(kind, start, token.newline_before))
    }

    fn read_template_chunk(&mut self, start: Position) -> Result<TokenKind, LexError> {
        loop {
            match self.bump() {
                None => return Err(Self::error(LexErrorKind::UnterminatedTemplate, start)),
                Some('`') => return Ok(TokenKind::Template { tail: true }),
                Some('$') if self.peek() == Some('{') => {
                    self.bump();
                    return Ok(TokenKind::Template { tail: false });
                }
                Some('\\') => {
                    self.bump();
                }
                Some(_) => {}
            }
        }
    }

    fn read_string(&mut self, quote: char, start: Position) -> Result<TokenKind, LexError> {
        self.bump(); // opening quote
        loop {
            match self.peek() {
                None | Some('\n' | '\r') => {
                    return Err(Self::error(LexErrorKind::UnterminatedString, start));
                }
                Some('\\') => {
                    self.bump();
                    // escaped char, or a line continuation
                    if self.bump() == Some('\r') && self.peek() == Some('\n') {
                        self.bump();
                    }
                }
                Some(c) if c == quote => {
                    self.bump();
                    return Ok(TokenKind::String);
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
    }

    fn read_name_chars(&mut self, start: Position) -> Result<(), LexError> {
        loop {
            match self.peek() {
                Some('\\') => {
                    self.bump();
                    if self.bump() != Some('u') {
                        return Err(Self::error(LexErrorKind::InvalidEscape, start));
                    }
                    self.read_unicode_escape(start)?;
                }
                Some(c) if is_id_part(c) => {
                    self.bump();
                }
                _ => return Ok(()),
            }
        }
    }

    fn read_unicode_escape(&mut self, start: Position) -> Result<(), LexError> {
        if self.peek() == Some('{') {
            self.bump();
            let mut digits = 0;
            while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.bump();
                digits += 1;
            }
            if digits == 0 || self.bump() != Some('}') {
                return Err(Self::error(LexErrorKind::InvalidEscape, start));
            }
        } else {
            for _ in 0..4 {
                if !self.bump().is_some_and(|c| c.is_ascii_hexdigit()) {
                    return Err(Self::error(LexErrorKind::InvalidEscape, start));
                }
            }
        }
        Ok(())
    }

    fn read_digits(&mut self, radix: u32) -> usize {
        let mut count = 0;
        while let Some(c) = self.peek() {
            if c.is_digit(radix) {
                count += 1;
            } else if c != '_' {
                break;
            }
            self.bump();
        }
        count
    }

    fn read_number(&mut self, start: Position) -> Result<TokenKind, LexError> {
        let radix = match (self.peek(), self.peek_nth(1)) {
            (Some('0'), Some('x' | 'X')) => 16,
            (Some('0'), Some('o' | 'O')) => 8,
            (Some('0'), Some('b' | 'B')) => 2,
            _ => 10,
        };

        if radix == 10 {
            self.read_digits(10);
            if self.peek() == Some('.') {
                self.bump();
                self.read_digits(10);
            }
            if matches!(self.peek(), Some('e' | 'E')) {
                self.bump();
                if matches!(self.peek(), Some('+' | '-')) {
                    self.bump();
                }
                if self.read_digits(10) == 0 {
                    return Err(Self::error(LexErrorKind::InvalidNumber, start));
                }
            }
        } else {
            self.bump();
            self.bump();
            if self.read_digits(radix) == 0 {
                return Err(Self::error(LexErrorKind::InvalidNumber, start));
            }
        }

        if self.peek() == Some('n') {
            self.bump();
        }

        if self
            .peek()
            .is_some_and(|c| is_id_start(c) || c.is_ascii_digit() || c == '\\')
        {
            return Err(Self::error(LexErrorKind::InvalidNumber, start));
        }

        Ok(TokenKind::Number)
    }

    fn read_punctuator(&mut self, start: Position) -> Result<TokenKind, LexError> {
        let rest = &self.input[self.pos..];
        let matched = PUNCTUATORS.iter().find(|p| {
            rest.starts_with(**p)
                // `a?.5:b` is a conditional, not optional chaining
                && !(**p == "?." && rest[2..].starts_with(|c: char| c.is_ascii_digit()))
        });

        let Some(punct) = matched else {
            let ch = rest.chars().next().unwrap_or('\0');
            return Err(Self::error(LexErrorKind::UnexpectedCharacter(ch), start));
        };

        for _ in 0..punct.len() {
            self.bump();
        }
        Ok(TokenKind::Punctuator)
    }
}
