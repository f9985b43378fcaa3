/// A point in the source text.
///
/// `offset` is a byte offset into the source, `line` is 1-based and
/// `column` is 0-based, counted in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Position {
    /// The very beginning of a source text.
    pub const START: Self = Self {
        offset: 0,
        line: 1,
        column: 0,
    };
}

/// Source range covered by a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    /// Byte offset of the first character.
    #[must_use]
    pub const fn start_offset(&self) -> usize {
        self.start.offset
    }

    /// Byte offset one past the last character.
    #[must_use]
    pub const fn end_offset(&self) -> usize {
        self.end.offset
    }
}

/// Token kinds produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifier or reserved word (`foo`, `if`, `async`).
    Name,
    /// Private class member name (`#field`).
    PrivateName,
    /// Numeric literal, including BigInt (`1`, `0x1f`, `10n`).
    Number,
    /// String literal (`'a'`, `"b"`).
    String,
    /// Template chunk. `tail` is set on the chunk that closes the
    /// template with a backtick, unset on chunks that end with `${`.
    Template { tail: bool },
    /// Regular expression literal (`/ab+c/gi`).
    RegExp,
    /// Operator or punctuation (`{`, `=>`, `>>>=`).
    Punctuator,
    /// End of input.
    Eof,
}

/// A single token with its kind, location and line-break flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// A line terminator appeared between the previous token and
    /// this one.
    pub newline_before: bool,
}

impl Token {
    /// Source text of this token.
    #[must_use]
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.span.start.offset..self.span.end.offset]
    }

    #[must_use]
    pub const fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }
}
