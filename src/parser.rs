use std::fmt;
use std::ops::ControlFlow;

use crate::lexer::{LexError, LexErrorKind, Lexer};
use crate::token::{Position, Token, TokenKind};
use crate::unit::UnitKind;

/// Classifies a parser error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// The lexer rejected the input.
    Lex(LexErrorKind),
    /// A token that the grammar does not allow here.
    UnexpectedToken(String),
    /// Input ended while a construct was still open.
    UnexpectedEof,
    /// Line break between `throw` and its operand.
    IllegalNewlineAfterThrow,
    /// `return` at the top level.
    ReturnOutsideFunction,
    /// `import` or `export` declaration in a script.
    ModuleSyntaxInScript,
    /// A hook asked the parser to stop.
    Aborted,
    /// Statements or expressions nested past the parser's depth limit.
    NestingTooDeep,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lex(kind) => write!(f, "{kind}"),
            Self::UnexpectedToken(text) => write!(f, "unexpected token '{text}'"),
            Self::UnexpectedEof => write!(f, "unexpected end of input"),
            Self::IllegalNewlineAfterThrow => write!(f, "illegal newline after throw"),
            Self::ReturnOutsideFunction => {
                write!(f, "'return' outside of function")
            }
            Self::ModuleSyntaxInScript => write!(
                f,
                "'import' and 'export' may appear only in modules"
            ),
            Self::Aborted => write!(f, "parse aborted"),
            Self::NestingTooDeep => write!(f, "nesting too deep"),
        }
    }
}

/// Error produced during parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at line {}, column {}", position.line, position.column)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub position: Position,
}

impl From<LexError> for ParseError {
    fn from(err: LexError) -> Self {
        Self {
            kind: ParseErrorKind::Lex(err.kind),
            position: err.position,
        }
    }
}

/// Callbacks invoked while parsing.
pub trait ParseHooks {
    /// Called for every token the parser consumes, in source order.
    fn on_token(&mut self, token: &Token) {
        let _ = token;
    }

    /// Called when input ends while the construct being parsed still
    /// needs a token: the source would only be accepted if a
    /// terminator were inserted at `at`. Returning `Break` aborts the
    /// parse immediately with [`ParseErrorKind::Aborted`].
    ///
    /// Ordinary automatic semicolon insertion that completes a
    /// statement does not reach this hook.
    fn on_terminator_insertion(&mut self, at: Position) -> ControlFlow<()> {
        let _ = at;
        ControlFlow::Continue(())
    }
}

impl ParseHooks for () {}

/// A parser that can drive [`ParseHooks`].
pub trait SyntaxParser {
    /// Parse `source` with the goal symbol for `kind`.
    fn parse(
        &self,
        source: &str,
        kind: UnitKind,
        hooks: &mut dyn ParseHooks,
    ) -> Result<(), ParseError>;
}

/// The built-in strict ECMAScript recognizer.
#[derive(Debug, Clone, Copy, Default)]
pub struct EcmaParser;

impl SyntaxParser for EcmaParser {
    fn parse(
        &self,
        source: &str,
        kind: UnitKind,
        hooks: &mut dyn ParseHooks,
    ) -> Result<(), ParseError> {
        parse_with_hooks(source, kind, hooks)
    }
}

/// Check that `source` is a syntactically valid script or module.
///
/// # Errors
///
/// Returns `ParseError` on the first lexical or syntax error.
pub fn parse(source: &str, kind: UnitKind) -> Result<(), ParseError> {
    parse_with_hooks(source, kind, &mut ())
}

/// Like [`parse`], reporting tokens and end-of-input insertions to
/// `hooks`.
///
/// # Errors
///
/// Returns `ParseError` on the first lexical or syntax error, or
/// [`ParseErrorKind::Aborted`] when a hook breaks.
pub fn parse_with_hooks(
    source: &str,
    kind: UnitKind,
    hooks: &mut dyn ParseHooks,
) -> Result<(), ParseError> {
    Parser::new(source, kind, hooks)?.parse_program()
}

type PResult<T> = Result<T, ParseError>;

/// Nesting levels of statements, assignments and unary operands. Keeps
/// recursion well inside a 2 MiB thread stack in debug builds.
pub const MAX_NESTING_DEPTH: usize = 256;

const RESERVED: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete",
    "do", "else", "enum", "export", "extends", "false", "finally", "for", "function", "if",
    "import", "in", "instanceof", "new", "null", "return", "super", "switch", "this", "throw",
    "true", "try", "typeof", "var", "void", "while", "with",
];

const ASSIGN_OPS: &[&str] = &[
    "=", "+=", "-=", "*=", "/=", "%=", "**=", "<<=", ">>=", ">>>=", "&=", "|=", "^=", "&&=",
    "||=", "??=",
];

/// What an expression looked like, as far as arrow functions care.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Name,
    /// The bare identifier `async`.
    Async,
    Parens,
    /// `async(...)` with no line break before the parenthesis.
    AsyncCall,
    Other,
}

impl Shape {
    const fn is_arrow_head(self) -> bool {
        matches!(self, Self::Name | Self::Async | Self::Parens | Self::AsyncCall)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Context {
    in_function: bool,
    in_async: bool,
    in_generator: bool,
}

enum MemberKind {
    Method,
    Key,
}

struct Parser<'a, 'h> {
    source: &'a str,
    lexer: Lexer<'a>,
    cur: Token,
    hooks: &'h mut dyn ParseHooks,
    module: bool,
    ctx: Context,
    depth: usize,
}

impl<'a, 'h> Parser<'a, 'h> {
    fn new(source: &'a str, kind: UnitKind, hooks: &'h mut dyn ParseHooks) -> PResult<Self> {
        let mut lexer = Lexer::new(source);
        let cur = lexer.next_token()?;
        let module = kind == UnitKind::Module;
        Ok(Self {
            source,
            lexer,
            cur,
            hooks,
            module,
            ctx: Context {
                // top-level await
                in_async: module,
                ..Context::default()
            },
            depth: 0,
        })
    }

    fn parse_program(mut self) -> PResult<()> {
        while !self.cur.is_eof() {
            self.parse_statement_list_item(true)?;
        }
        Ok(())
    }

    // -- token helpers --

    fn text(&self) -> &'a str {
        self.cur.text(self.source)
    }

    fn is(&self, punct: &str) -> bool {
        self.cur.kind == TokenKind::Punctuator && self.text() == punct
    }

    fn is_name(&self, name: &str) -> bool {
        self.cur.kind == TokenKind::Name && self.text() == name
    }

    fn is_identifier(&self) -> bool {
        self.cur.kind == TokenKind::Name && !RESERVED.contains(&self.text())
    }

    fn advance(&mut self) -> PResult<()> {
        self.hooks.on_token(&self.cur);
        self.cur = self.lexer.next_token()?;
        Ok(())
    }

    fn peek(&self) -> PResult<Token> {
        Ok(self.lexer.clone().next_token()?)
    }

    fn peek_is(&self, punct: &str) -> PResult<bool> {
        let next = self.peek()?;
        Ok(next.kind == TokenKind::Punctuator && next.text(self.source) == punct)
    }

    fn eat(&mut self, punct: &str) -> PResult<bool> {
        if self.is(punct) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn eat_name(&mut self, name: &str) -> PResult<bool> {
        if self.is_name(name) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, punct: &str) -> PResult<()> {
        if self.eat(punct)? {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn expect_name(&mut self, name: &str) -> PResult<()> {
        if self.eat_name(name)? {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn expect_kind(&mut self, kind: TokenKind) -> PResult<()> {
        if self.cur.kind == kind {
            self.advance()
        } else {
            Err(self.unexpected())
        }
    }

    fn unexpected(&mut self) -> ParseError {
        if self.cur.is_eof() {
            return self.truncated();
        }
        ParseError {
            kind: ParseErrorKind::UnexpectedToken(self.text().to_string()),
            position: self.cur.span.start,
        }
    }

    /// Input ended inside an open construct.
    fn truncated(&mut self) -> ParseError {
        let at = self.cur.span.start;
        let kind = match self.hooks.on_terminator_insertion(at) {
            ControlFlow::Break(()) => ParseErrorKind::Aborted,
            ControlFlow::Continue(()) => ParseErrorKind::UnexpectedEof,
        };
        ParseError { kind, position: at }
    }

    /// Consume a `;` or apply automatic semicolon insertion.
    fn semicolon(&mut self) -> PResult<()> {
        if self.eat(";")? || self.is("}") || self.cur.newline_before || self.cur.is_eof() {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn enter(&mut self) -> PResult<()> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(ParseError {
                kind: ParseErrorKind::NestingTooDeep,
                position: self.cur.span.start,
            });
        }
        self.depth += 1;
        Ok(())
    }

    /// Run `f` one nesting level deeper.
    fn nested<T>(&mut self, f: fn(&mut Self) -> PResult<T>) -> PResult<T> {
        self.enter()?;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn with_context<T>(
        &mut self,
        ctx: Context,
        f: impl FnOnce(&mut Self) -> PResult<T>,
    ) -> PResult<T> {
        let saved = std::mem::replace(&mut self.ctx, ctx);
        let result = f(self);
        self.ctx = saved;
        result
    }

    fn let_starts_declaration(&self) -> PResult<bool> {
        if !self.is_name("let") {
            return Ok(false);
        }
        let next = self.peek()?;
        let text = next.text(self.source);
        Ok(match next.kind {
            TokenKind::Name => !matches!(text, "in" | "instanceof"),
            TokenKind::Punctuator => matches!(text, "[" | "{"),
            _ => false,
        })
    }

    fn async_function_ahead(&self) -> PResult<bool> {
        if !self.is_name("async") {
            return Ok(false);
        }
        let next = self.peek()?;
        Ok(next.kind == TokenKind::Name
            && next.text(self.source) == "function"
            && !next.newline_before)
    }

    // -- statements --

    fn parse_statement_list_item(&mut self, top_level: bool) -> PResult<()> {
        if self.cur.kind == TokenKind::Name {
            match self.text() {
                "import" if !self.peek_is("(")? && !self.peek_is(".")? => {
                    return self.parse_import(top_level);
                }
                "export" => return self.parse_export(top_level),
                "function" => return self.parse_function(false, true).map(|_| ()),
                "class" => return self.parse_class(true).map(|_| ()),
                "const" => {
                    self.parse_var_decl(false)?;
                    return self.semicolon();
                }
                "let" if self.let_starts_declaration()? => {
                    self.parse_var_decl(false)?;
                    return self.semicolon();
                }
                "async" if self.async_function_ahead()? => {
                    self.advance()?;
                    return self.parse_function(true, true).map(|_| ());
                }
                _ => {}
            }
        }
        self.parse_statement()
    }

    fn parse_statement(&mut self) -> PResult<()> {
        self.nested(Self::parse_statement_inner)
    }

    fn parse_statement_inner(&mut self) -> PResult<()> {
        match self.cur.kind {
            TokenKind::Punctuator if self.is("{") => return self.parse_block_body(),
            TokenKind::Punctuator if self.is(";") => return self.advance(),
            TokenKind::Name => {}
            _ => return self.parse_expression_statement(),
        }

        match self.text() {
            "var" => {
                self.parse_var_decl(false)?;
                self.semicolon()
            }
            "if" => {
                self.advance()?;
                self.parse_paren_expression()?;
                self.parse_statement()?;
                if self.eat_name("else")? {
                    self.parse_statement()?;
                }
                Ok(())
            }
            "for" => self.parse_for(),
            "while" => {
                self.advance()?;
                self.parse_paren_expression()?;
                self.parse_statement()
            }
            "do" => {
                self.advance()?;
                self.parse_statement()?;
                self.expect_name("while")?;
                self.parse_paren_expression()?;
                // a semicolon is always inserted after do-while
                self.eat(";")?;
                Ok(())
            }
            "continue" | "break" => {
                self.advance()?;
                if self.is_identifier() && !self.cur.newline_before {
                    self.advance()?;
                }
                self.semicolon()
            }
            "return" => {
                if !self.ctx.in_function {
                    return Err(ParseError {
                        kind: ParseErrorKind::ReturnOutsideFunction,
                        position: self.cur.span.start,
                    });
                }
                self.advance()?;
                if !self.is(";")
                    && !self.is("}")
                    && !self.cur.newline_before
                    && !self.cur.is_eof()
                {
                    self.parse_expression(false)?;
                }
                self.semicolon()
            }
            "throw" => {
                self.advance()?;
                if self.cur.is_eof() {
                    return Err(self.truncated());
                }
                if self.cur.newline_before {
                    return Err(ParseError {
                        kind: ParseErrorKind::IllegalNewlineAfterThrow,
                        position: self.cur.span.start,
                    });
                }
                self.parse_expression(false)?;
                self.semicolon()
            }
            "try" => self.parse_try(),
            "switch" => self.parse_switch(),
            "with" if !self.module => {
                self.advance()?;
                self.parse_paren_expression()?;
                self.parse_statement()
            }
            "debugger" => {
                self.advance()?;
                self.semicolon()
            }
            "function" => self.parse_function(false, true).map(|_| ()),
            _ if self.is_identifier() && self.peek_is(":")? => {
                self.advance()?;
                self.advance()?;
                self.parse_statement()
            }
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_expression_statement(&mut self) -> PResult<()> {
        self.parse_expression(false)?;
        self.semicolon()
    }

    fn parse_paren_expression(&mut self) -> PResult<()> {
        self.expect("(")?;
        self.parse_expression(false)?;
        self.expect(")")
    }

    /// `{ StatementList }`, also used for function bodies.
    fn parse_block_body(&mut self) -> PResult<()> {
        self.expect("{")?;
        while !self.is("}") {
            if self.cur.is_eof() {
                return Err(self.truncated());
            }
            self.parse_statement_list_item(false)?;
        }
        self.advance()
    }

    fn parse_var_decl(&mut self, no_in: bool) -> PResult<()> {
        self.advance()?; // var, let or const
        loop {
            self.parse_binding_target()?;
            if self.eat("=")? {
                self.parse_assignment(no_in)?;
            }
            if !self.eat(",")? {
                return Ok(());
            }
        }
    }

    fn parse_binding_target(&mut self) -> PResult<()> {
        if self.is("[") {
            self.parse_array_literal()
        } else if self.is("{") {
            self.parse_object_literal()
        } else if self.is_identifier() {
            self.advance()
        } else {
            Err(self.unexpected())
        }
    }

    fn parse_for(&mut self) -> PResult<()> {
        self.advance()?; // for
        self.eat_name("await")?;
        self.expect("(")?;

        if !self.eat(";")? {
            if self.is_name("var") || self.is_name("const") || self.let_starts_declaration()? {
                self.parse_var_decl(true)?;
            } else {
                self.parse_expression(true)?;
            }

            if self.eat_name("of")? {
                self.parse_assignment(false)?;
                self.expect(")")?;
                return self.parse_statement();
            }
            if self.eat_name("in")? {
                self.parse_expression(false)?;
                self.expect(")")?;
                return self.parse_statement();
            }
            self.expect(";")?;
        }

        if !self.is(";") {
            self.parse_expression(false)?;
        }
        self.expect(";")?;
        if !self.is(")") {
            self.parse_expression(false)?;
        }
        self.expect(")")?;
        self.parse_statement()
    }

    fn parse_try(&mut self) -> PResult<()> {
        self.advance()?; // try
        self.parse_block_body()?;
        let mut handled = false;
        if self.eat_name("catch")? {
            if self.eat("(")? {
                self.parse_binding_target()?;
                self.expect(")")?;
            }
            self.parse_block_body()?;
            handled = true;
        }
        if self.eat_name("finally")? {
            self.parse_block_body()?;
            handled = true;
        }
        if handled {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn parse_switch(&mut self) -> PResult<()> {
        self.advance()?; // switch
        self.parse_paren_expression()?;
        self.expect("{")?;
        loop {
            if self.eat("}")? {
                return Ok(());
            }
            if self.cur.is_eof() {
                return Err(self.truncated());
            }
            if self.eat_name("case")? {
                self.parse_expression(false)?;
                self.expect(":")?;
            } else if self.eat_name("default")? {
                self.expect(":")?;
            } else {
                self.parse_statement_list_item(false)?;
            }
        }
    }

    // -- modules --

    fn module_item_allowed(&self, top_level: bool) -> PResult<()> {
        if !self.module {
            return Err(ParseError {
                kind: ParseErrorKind::ModuleSyntaxInScript,
                position: self.cur.span.start,
            });
        }
        if !top_level {
            return Err(ParseError {
                kind: ParseErrorKind::UnexpectedToken(self.text().to_string()),
                position: self.cur.span.start,
            });
        }
        Ok(())
    }

    fn parse_import(&mut self, top_level: bool) -> PResult<()> {
        self.module_item_allowed(top_level)?;
        self.advance()?; // import

        if self.cur.kind != TokenKind::String {
            let mut needs_clause = true;
            if self.is_identifier() {
                self.advance()?; // default binding
                needs_clause = self.eat(",")?;
            }
            if needs_clause {
                if self.eat("*")? {
                    self.expect_name("as")?;
                    self.parse_binding_target()?;
                } else if self.is("{") {
                    self.parse_module_specifiers()?;
                } else {
                    return Err(self.unexpected());
                }
            }
            self.expect_name("from")?;
        }
        self.expect_kind(TokenKind::String)?;
        self.parse_import_attributes()?;
        self.semicolon()
    }

    fn parse_export(&mut self, top_level: bool) -> PResult<()> {
        self.module_item_allowed(top_level)?;
        self.advance()?; // export

        if self.eat("*")? {
            if self.eat_name("as")? {
                self.parse_module_export_name()?;
            }
            self.expect_name("from")?;
            self.expect_kind(TokenKind::String)?;
            self.parse_import_attributes()?;
            return self.semicolon();
        }

        if self.is("{") {
            self.parse_module_specifiers()?;
            if self.eat_name("from")? {
                self.expect_kind(TokenKind::String)?;
                self.parse_import_attributes()?;
            }
            return self.semicolon();
        }

        if self.eat_name("default")? {
            if self.is_name("function") {
                return self.parse_function(false, false).map(|_| ());
            }
            if self.is_name("class") {
                return self.parse_class(false).map(|_| ());
            }
            if self.async_function_ahead()? {
                self.advance()?;
                return self.parse_function(true, false).map(|_| ());
            }
            self.parse_assignment(false)?;
            return self.semicolon();
        }

        if self.is_name("var") || self.is_name("let") || self.is_name("const") {
            self.parse_var_decl(false)?;
            return self.semicolon();
        }
        if self.is_name("function") {
            return self.parse_function(false, true).map(|_| ());
        }
        if self.is_name("class") {
            return self.parse_class(true).map(|_| ());
        }
        if self.async_function_ahead()? {
            self.advance()?;
            return self.parse_function(true, true).map(|_| ());
        }
        Err(self.unexpected())
    }

    /// `{ a, b as c, "d" as e }`
    fn parse_module_specifiers(&mut self) -> PResult<()> {
        self.expect("{")?;
        loop {
            if self.eat("}")? {
                return Ok(());
            }
            self.parse_module_export_name()?;
            if self.eat_name("as")? {
                self.parse_module_export_name()?;
            }
            if !self.eat(",")? {
                return self.expect("}");
            }
        }
    }

    fn parse_module_export_name(&mut self) -> PResult<()> {
        match self.cur.kind {
            TokenKind::Name | TokenKind::String => self.advance(),
            _ => Err(self.unexpected()),
        }
    }

    fn parse_import_attributes(&mut self) -> PResult<()> {
        if self.is_name("with") || (self.is_name("assert") && !self.cur.newline_before) {
            self.advance()?;
            self.parse_object_literal()?;
        }
        Ok(())
    }

    // -- functions and classes --

    /// `function` keyword onwards. The caller consumed `async`.
    fn parse_function(&mut self, is_async: bool, name_required: bool) -> PResult<Shape> {
        self.advance()?; // function
        let generator = self.eat("*")?;
        if self.cur.kind == TokenKind::Name {
            self.advance()?;
        } else if name_required {
            return Err(self.unexpected());
        }
        self.parse_function_rest(is_async, generator)?;
        Ok(Shape::Other)
    }

    fn parse_function_rest(&mut self, is_async: bool, generator: bool) -> PResult<()> {
        let ctx = Context {
            in_function: true,
            in_async: is_async,
            in_generator: generator,
        };
        self.with_context(ctx, |p| {
            p.parse_params()?;
            p.parse_block_body()
        })
    }

    fn parse_params(&mut self) -> PResult<()> {
        self.expect("(")?;
        loop {
            if self.eat(")")? {
                return Ok(());
            }
            if self.eat("...")? {
                self.parse_binding_target()?;
                return self.expect(")");
            }
            self.parse_binding_target()?;
            if self.eat("=")? {
                self.parse_assignment(false)?;
            }
            if !self.eat(",")? {
                return self.expect(")");
            }
        }
    }

    fn parse_class(&mut self, name_required: bool) -> PResult<Shape> {
        self.advance()?; // class
        if self.is_identifier() {
            self.advance()?;
        } else if name_required {
            return Err(self.unexpected());
        }
        if self.eat_name("extends")? {
            self.parse_lhs()?;
        }

        self.expect("{")?;
        loop {
            if self.eat("}")? {
                return Ok(Shape::Other);
            }
            if self.cur.is_eof() {
                return Err(self.truncated());
            }
            if self.eat(";")? {
                continue;
            }
            self.parse_class_member()?;
        }
    }

    fn parse_class_member(&mut self) -> PResult<()> {
        if self.is_name("static") {
            let next = self.peek()?;
            if next.kind == TokenKind::Punctuator && next.text(self.source) == "{" {
                self.advance()?;
                return self.with_context(Context::default(), Self::parse_block_body);
            }
            if !self.is_member_terminator(&next) {
                self.advance()?;
            }
        }

        if let MemberKind::Method = self.parse_method_like()? {
            return Ok(());
        }

        // field
        if self.eat("=")? {
            self.parse_assignment(false)?;
        }
        if self.eat(";")? || self.is("}") || self.cur.newline_before || self.cur.is_eof() {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn is_member_terminator(&self, token: &Token) -> bool {
        match token.kind {
            TokenKind::Eof => true,
            TokenKind::Punctuator => {
                matches!(token.text(self.source), "(" | "=" | ";" | "}" | "," | ":")
            }
            _ => false,
        }
    }

    /// Modifiers and key of a method, accessor, field or property.
    fn parse_method_like(&mut self) -> PResult<MemberKind> {
        let mut is_async = false;
        let mut prefixed = false;

        if self.is_name("async") {
            let next = self.peek()?;
            if !next.newline_before && !self.is_member_terminator(&next) {
                self.advance()?;
                is_async = true;
                prefixed = true;
            }
        }
        let generator = self.eat("*")?;
        prefixed |= generator;
        if !prefixed && (self.is_name("get") || self.is_name("set")) {
            let next = self.peek()?;
            if !self.is_member_terminator(&next) {
                self.advance()?;
                prefixed = true;
            }
        }

        self.parse_property_key()?;

        if self.is("(") {
            self.parse_function_rest(is_async, generator)?;
            return Ok(MemberKind::Method);
        }
        if prefixed {
            return Err(self.unexpected());
        }
        Ok(MemberKind::Key)
    }

    fn parse_property_key(&mut self) -> PResult<()> {
        match self.cur.kind {
            TokenKind::Name | TokenKind::String | TokenKind::Number | TokenKind::PrivateName => {
                self.advance()
            }
            TokenKind::Punctuator if self.is("[") => {
                self.advance()?;
                self.parse_assignment(false)?;
                self.expect("]")
            }
            _ => Err(self.unexpected()),
        }
    }

    // -- expressions --

    fn parse_expression(&mut self, no_in: bool) -> PResult<Shape> {
        let mut shape = self.parse_assignment(no_in)?;
        while self.eat(",")? {
            self.parse_assignment(no_in)?;
            shape = Shape::Other;
        }
        Ok(shape)
    }

    fn parse_assignment(&mut self, no_in: bool) -> PResult<Shape> {
        self.enter()?;
        let result = self.parse_assignment_inner(no_in);
        self.depth -= 1;
        result
    }

    fn parse_assignment_inner(&mut self, no_in: bool) -> PResult<Shape> {
        if self.ctx.in_generator && self.is_name("yield") {
            return self.parse_yield(no_in);
        }

        // async x => ...
        if self.is_name("async") {
            let next = self.peek()?;
            let next_text = next.text(self.source);
            if next.kind == TokenKind::Name
                && !next.newline_before
                && next_text != "function"
                && !RESERVED.contains(&next_text)
            {
                self.advance()?;
                self.advance()?;
                if self.cur.newline_before || !self.is("=>") {
                    return Err(self.unexpected());
                }
                self.advance()?;
                return self.parse_arrow_body(true, no_in);
            }
        }

        let shape = self.parse_conditional(no_in)?;

        if self.is("=>") {
            if shape.is_arrow_head() && !self.cur.newline_before {
                self.advance()?;
                return self.parse_arrow_body(shape == Shape::AsyncCall, no_in);
            }
            return Err(self.unexpected());
        }

        if self.cur.kind == TokenKind::Punctuator && ASSIGN_OPS.contains(&self.text()) {
            self.advance()?;
            self.parse_assignment(no_in)?;
            return Ok(Shape::Other);
        }

        Ok(shape)
    }

    fn parse_arrow_body(&mut self, is_async: bool, no_in: bool) -> PResult<Shape> {
        let ctx = Context {
            in_function: true,
            in_async: is_async,
            in_generator: false,
        };
        self.with_context(ctx, |p| {
            if p.is("{") {
                p.parse_block_body()
            } else {
                p.parse_assignment(no_in).map(|_| ())
            }
        })?;
        Ok(Shape::Other)
    }

    fn parse_yield(&mut self, no_in: bool) -> PResult<Shape> {
        self.advance()?; // yield
        let bare = self.cur.newline_before
            || self.cur.is_eof()
            || [")", "]", "}", ",", ";", ":"].iter().any(|p| self.is(p));
        if !bare {
            self.eat("*")?;
            self.parse_assignment(no_in)?;
        }
        Ok(Shape::Other)
    }

    fn parse_conditional(&mut self, no_in: bool) -> PResult<Shape> {
        let shape = self.parse_binary(0, no_in)?;
        if self.eat("?")? {
            self.parse_assignment(false)?;
            self.expect(":")?;
            self.parse_assignment(no_in)?;
            return Ok(Shape::Other);
        }
        Ok(shape)
    }

    fn binary_precedence(&self, no_in: bool) -> Option<u8> {
        let text = self.text();
        match self.cur.kind {
            TokenKind::Punctuator => match text {
                "??" => Some(1),
                "||" => Some(2),
                "&&" => Some(3),
                "|" => Some(4),
                "^" => Some(5),
                "&" => Some(6),
                "==" | "!=" | "===" | "!==" => Some(7),
                "<" | ">" | "<=" | ">=" => Some(8),
                "<<" | ">>" | ">>>" => Some(9),
                "+" | "-" => Some(10),
                "*" | "/" | "%" => Some(11),
                "**" => Some(12),
                _ => None,
            },
            TokenKind::Name => match text {
                "instanceof" => Some(8),
                "in" if !no_in => Some(8),
                _ => None,
            },
            _ => None,
        }
    }

    fn parse_binary(&mut self, min_prec: u8, no_in: bool) -> PResult<Shape> {
        let mut shape = self.parse_unary()?;
        while let Some(prec) = self.binary_precedence(no_in) {
            if prec < min_prec {
                break;
            }
            let right_assoc = self.is("**");
            self.advance()?;
            self.parse_binary(if right_assoc { prec } else { prec + 1 }, no_in)?;
            shape = Shape::Other;
        }
        Ok(shape)
    }

    fn parse_unary(&mut self) -> PResult<Shape> {
        self.nested(Self::parse_unary_inner)
    }

    fn parse_unary_inner(&mut self) -> PResult<Shape> {
        let prefix = match self.cur.kind {
            TokenKind::Punctuator => {
                matches!(self.text(), "!" | "~" | "+" | "-" | "++" | "--")
            }
            TokenKind::Name => {
                matches!(self.text(), "typeof" | "void" | "delete")
                    || (self.ctx.in_async && self.is_name("await"))
            }
            _ => false,
        };
        if prefix {
            self.advance()?;
            self.parse_unary()?;
            return Ok(Shape::Other);
        }

        let shape = self.parse_lhs()?;
        if (self.is("++") || self.is("--")) && !self.cur.newline_before {
            self.advance()?;
            return Ok(Shape::Other);
        }
        Ok(shape)
    }

    /// Member accesses, calls, optional chains and tagged templates.
    fn parse_lhs(&mut self) -> PResult<Shape> {
        let mut shape = if self.is_name("new") {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };

        loop {
            if self.eat(".")? {
                self.parse_member_name()?;
            } else if self.eat("?.")? {
                if self.is("(") {
                    self.parse_arguments()?;
                } else if self.eat("[")? {
                    self.parse_expression(false)?;
                    self.expect("]")?;
                } else {
                    self.parse_member_name()?;
                }
            } else if self.eat("[")? {
                self.parse_expression(false)?;
                self.expect("]")?;
            } else if self.is("(") {
                let async_call = shape == Shape::Async && !self.cur.newline_before;
                self.parse_arguments()?;
                shape = if async_call {
                    Shape::AsyncCall
                } else {
                    Shape::Other
                };
                continue;
            } else if matches!(self.cur.kind, TokenKind::Template { .. }) {
                self.parse_template()?;
            } else {
                return Ok(shape);
            }
            shape = Shape::Other;
        }
    }

    fn parse_new(&mut self) -> PResult<Shape> {
        self.nested(Self::parse_new_inner)
    }

    fn parse_new_inner(&mut self) -> PResult<Shape> {
        self.advance()?; // new
        if self.eat(".")? {
            // new.target
            return self.parse_member_name().map(|()| Shape::Other);
        }

        if self.is_name("new") {
            self.parse_new()?;
        } else {
            self.parse_primary()?;
        }
        loop {
            if self.eat(".")? {
                self.parse_member_name()?;
            } else if self.eat("[")? {
                self.parse_expression(false)?;
                self.expect("]")?;
            } else if matches!(self.cur.kind, TokenKind::Template { .. }) {
                self.parse_template()?;
            } else {
                break;
            }
        }
        if self.is("(") {
            self.parse_arguments()?;
        }
        Ok(Shape::Other)
    }

    fn parse_member_name(&mut self) -> PResult<()> {
        match self.cur.kind {
            TokenKind::Name | TokenKind::PrivateName => self.advance(),
            _ => Err(self.unexpected()),
        }
    }

    fn parse_arguments(&mut self) -> PResult<()> {
        self.expect("(")?;
        loop {
            if self.eat(")")? {
                return Ok(());
            }
            self.eat("...")?;
            self.parse_assignment(false)?;
            if !self.eat(",")? {
                return self.expect(")");
            }
        }
    }

    fn parse_primary(&mut self) -> PResult<Shape> {
        match self.cur.kind {
            TokenKind::Name => self.parse_primary_name(),
            TokenKind::Number | TokenKind::String | TokenKind::RegExp => {
                self.advance()?;
                Ok(Shape::Other)
            }
            TokenKind::Template { .. } => {
                self.parse_template()?;
                Ok(Shape::Other)
            }
            // `#field in object`
            TokenKind::PrivateName => {
                self.advance()?;
                if self.is_name("in") {
                    Ok(Shape::Other)
                } else {
                    Err(self.unexpected())
                }
            }
            TokenKind::Punctuator => match self.text() {
                "(" => self.parse_parens(),
                "[" => self.parse_array_literal().map(|()| Shape::Other),
                "{" => self.parse_object_literal().map(|()| Shape::Other),
                "/" | "/=" => {
                    self.cur = self.lexer.relex_regexp(self.cur)?;
                    self.advance()?;
                    Ok(Shape::Other)
                }
                _ => Err(self.unexpected()),
            },
            TokenKind::Eof => Err(self.truncated()),
        }
    }

    fn parse_primary_name(&mut self) -> PResult<Shape> {
        match self.text() {
            "function" => self.parse_function(false, false),
            "class" => self.parse_class(false),
            "async" => {
                if self.async_function_ahead()? {
                    self.advance()?;
                    return self.parse_function(true, false);
                }
                self.advance()?;
                Ok(Shape::Async)
            }
            "this" | "null" | "true" | "false" | "super" => {
                self.advance()?;
                Ok(Shape::Other)
            }
            "import" => {
                self.advance()?;
                if self.eat(".")? {
                    self.expect_name("meta")?;
                } else if self.is("(") {
                    self.parse_arguments()?;
                } else {
                    return Err(self.unexpected());
                }
                Ok(Shape::Other)
            }
            text if RESERVED.contains(&text) => Err(self.unexpected()),
            _ => {
                self.advance()?;
                Ok(Shape::Name)
            }
        }
    }

    /// Parenthesized expression or arrow parameter list.
    fn parse_parens(&mut self) -> PResult<Shape> {
        self.advance()?; // (
        if self.eat(")")? {
            return self.arrow_params_end();
        }
        loop {
            if self.eat("...")? {
                self.parse_binding_target()?;
                self.expect(")")?;
                return self.arrow_params_end();
            }
            self.parse_assignment(false)?;
            if !self.eat(",")? {
                self.expect(")")?;
                return Ok(Shape::Parens);
            }
            if self.eat(")")? {
                // trailing comma
                return self.arrow_params_end();
            }
        }
    }

    /// `()`, `(...rest)` and `(a,)` only make sense as arrow parameters.
    fn arrow_params_end(&mut self) -> PResult<Shape> {
        if self.is("=>") {
            Ok(Shape::Parens)
        } else {
            Err(self.unexpected())
        }
    }

    fn parse_array_literal(&mut self) -> PResult<()> {
        self.expect("[")?;
        loop {
            if self.eat("]")? {
                return Ok(());
            }
            // hole
            if self.eat(",")? {
                continue;
            }
            self.eat("...")?;
            self.parse_assignment(false)?;
            if !self.eat(",")? {
                return self.expect("]");
            }
        }
    }

    fn parse_object_literal(&mut self) -> PResult<()> {
        self.expect("{")?;
        loop {
            if self.eat("}")? {
                return Ok(());
            }
            if self.eat("...")? {
                self.parse_assignment(false)?;
            } else {
                let shorthand = self.is_identifier();
                if let MemberKind::Key = self.parse_method_like()? {
                    if self.eat(":")? {
                        self.parse_assignment(false)?;
                    } else if !shorthand {
                        return Err(self.unexpected());
                    } else if self.eat("=")? {
                        // `{ a = 1 }` in a destructuring pattern
                        self.parse_assignment(false)?;
                    }
                }
            }
            if !self.eat(",")? {
                return self.expect("}");
            }
        }
    }

    fn parse_template(&mut self) -> PResult<()> {
        let mut tail = self.cur.kind == (TokenKind::Template { tail: true });
        self.advance()?;
        while !tail {
            self.parse_expression(false)?;
            if !self.is("}") {
                return Err(self.unexpected());
            }
            self.cur = self.lexer.relex_template(self.cur)?;
            tail = self.cur.kind == (TokenKind::Template { tail: true });
            self.advance()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(input: &str) -> Result<(), ParseError> {
        parse(input, UnitKind::Script)
    }

    fn module(input: &str) -> Result<(), ParseError> {
        parse(input, UnitKind::Module)
    }

    #[derive(Default)]
    struct Recorder {
        tokens: Vec<Token>,
        insertions: Vec<Position>,
        abort: bool,
    }

    impl ParseHooks for Recorder {
        fn on_token(&mut self, token: &Token) {
            self.tokens.push(*token);
        }

        fn on_terminator_insertion(&mut self, at: Position) -> ControlFlow<()> {
            self.insertions.push(at);
            if self.abort {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        }
    }

    #[test]
    fn statements() {
        script(
            "var a = 1, b;\n\
             if (a) { b = 2 } else b = 3\n\
             for (let i = 0; i < 3; i++) continue\n\
             for (const k in obj) {}\n\
             for (const [k, v] of pairs) {}\n\
             while (false) {}\n\
             do x++; while (x < 3)\n\
             outer: for (;;) { break outer }\n\
             switch (a) { case 1: b(); break; default: }\n\
             try { f() } catch { g() } finally { h() }\n\
             try { f() } catch ({ message }) {}\n\
             debugger\n",
        )
        .expect("should parse");
    }

    #[test]
    fn expressions() {
        script(
            "a = b ? c : d ?? e;\n\
             x = y ** 2 ** 3;\n\
             o = { a, b: 1, [k]: 2, get g() { return 1 }, set s(v) {}, async *m() {}, ...rest };\n\
             [p, , q = 1, ...others] = list;\n\
             f = async (a, { b }, ...c) => await a;\n\
             g = async x => x;\n\
             h = () => ({});\n\
             i = a?.b?.[c]?.(d);\n\
             j = new Foo.Bar(1)?.baz;\n\
             k = tag`x${ `y${z}` }w`;\n\
             l = /[/]+/g.test(s) / 2;\n\
             m = typeof void delete a.b;\n\
             n = function* gen() { yield; yield* other(); };\n",
        )
        .expect("should parse");
    }

    #[test]
    fn classes() {
        script(
            "class A extends B {\n\
               static count = 0\n\
               #secret = 1;\n\
               static { init() }\n\
               constructor() { super(); }\n\
               get value() { return this.#secret }\n\
               static async *items() {}\n\
               has(o) { return #secret in o }\n\
             }\n",
        )
        .expect("should parse");
    }

    #[test]
    fn asi_at_line_breaks() {
        script("let a = 1\nlet b = a\n++b\nconst c = () => {}\n(c)").expect("should parse");
    }

    #[test]
    fn asi_at_end_of_input() {
        script("const x = 1").expect("should parse");
    }

    #[test]
    fn module_syntax() {
        module(
            "import a, { b as c } from './x.js';\n\
             import * as ns from 'y';\n\
             import 'side-effect';\n\
             export const x = 1;\n\
             export default class {}\n\
             export { x as y };\n\
             export * from 'z';\n\
             await ready;\n",
        )
        .expect("should parse");
    }

    #[test]
    fn import_in_script() {
        let err = script("import x from 'y';").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::ModuleSyntaxInScript);
    }

    #[test]
    fn dynamic_import_in_script() {
        script("import('./x.js').then(run);").expect("should parse");
    }

    #[test]
    fn return_outside_function() {
        let err = script("return 1").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::ReturnOutsideFunction);
    }

    #[test]
    fn newline_after_throw() {
        let err = script("function f() { throw\nnew Error() }").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::IllegalNewlineAfterThrow);
    }

    #[test]
    fn unexpected_token_location() {
        let err = script("let x = );").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnexpectedToken(")".to_string()));
        assert_eq!(err.position.line, 1);
        assert_eq!(err.position.column, 8);
    }

    #[test]
    fn missing_operand_at_end() {
        let mut hooks = Recorder::default();
        let err = parse_with_hooks("1 +\n", UnitKind::Script, &mut hooks).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnexpectedEof);
        assert_eq!(hooks.insertions.len(), 1);
        assert_eq!(hooks.tokens.len(), 2);
    }

    #[test]
    fn hook_break_aborts() {
        let mut hooks = Recorder {
            abort: true,
            ..Recorder::default()
        };
        let err =
            parse_with_hooks("function f() { return", UnitKind::Script, &mut hooks).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Aborted);
        let last = hooks.tokens.last().expect("token");
        assert_eq!(last.text("function f() { return"), "return");
    }

    #[test]
    fn deep_nesting_is_an_error() {
        let deep = [
            format!("x = {}1{}", "[".repeat(10_000), "]".repeat(10_000)),
            format!("x = {}1{}", "(".repeat(10_000), ")".repeat(10_000)),
            format!("x = {}y", "!".repeat(10_000)),
            format!("{}{}", "{".repeat(10_000), "}".repeat(10_000)),
            format!("x = {}C", "new ".repeat(10_000)),
        ];
        for source in &deep {
            let mut hooks = Recorder::default();
            let err = parse_with_hooks(source, UnitKind::Script, &mut hooks).unwrap_err();
            assert_eq!(err.kind, ParseErrorKind::NestingTooDeep);
            assert!(hooks.insertions.is_empty());
        }
    }

    #[test]
    fn moderate_nesting_parses() {
        let source = format!("x = {}1{}", "[".repeat(64), "]".repeat(64));
        script(&source).expect("should parse");
        script(&format!("x = {}y", "!".repeat(100))).expect("should parse");
    }

    #[test]
    fn depth_is_restored_between_statements() {
        let line = format!("x = {}1{}\n", "(".repeat(100), ")".repeat(100));
        script(&line.repeat(20)).expect("should parse");
    }

    #[test]
    fn unrelated_error_skips_hook() {
        let mut hooks = Recorder::default();
        let result = parse_with_hooks("foo(]", UnitKind::Script, &mut hooks);
        assert!(result.is_err());
        assert!(hooks.insertions.is_empty());
    }

    #[test]
    fn lex_error_is_reported() {
        let err = script("x = 'open").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::Lex(LexErrorKind::UnterminatedString));
    }

    #[test]
    fn tokens_reported_in_order() {
        let mut hooks = Recorder::default();
        let source = "a.b(`t${c}`)";
        parse_with_hooks(source, UnitKind::Script, &mut hooks).expect("should parse");
        let texts: Vec<_> = hooks.tokens.iter().map(|t| t.text(source)).collect();
        assert_eq!(texts, ["a", ".", "b", "(", "`t${", "c", "}`", ")"]);
    }
}
