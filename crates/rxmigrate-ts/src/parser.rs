//! Recursive-descent parser for the TypeScript subset the rewrite rules read.
//!
//! The parser builds a [`SyntaxTree`] with accurate byte spans for every
//! expression and statement. It understands the full expression grammar
//! (arrows, optional chaining, generic calls, `as` casts, non-null
//! assertions), module syntax, classes with decorators and the common
//! statement forms. Type-level syntax is recognized only well enough to be
//! skipped: annotations, type parameters and arguments, interfaces, type
//! aliases, enums and ambient declarations never produce nodes.
//!
//! Ambiguities between arrow functions and parenthesized expressions, and
//! between generic calls and comparisons, are settled by speculative parsing
//! with rewind.

use rxmigrate_core::patch::Span;

use crate::error::{ParseError, ParseResult};
use crate::lexer::{lex, Token, TokenKind};
use crate::syntax::{Node, NodeId, NodeKind, SyntaxTree};

/// Parse a complete source file.
pub fn parse(source: &str) -> ParseResult<SyntaxTree> {
    let lexed = lex(source)?;
    let token_count = lexed.tokens.len();
    let mut parser = Parser::new(source, lexed.tokens);
    let root = parser.source_file()?;
    tracing::debug!(
        tokens = token_count,
        nodes = parser.nodes.len(),
        comments = lexed.comments.len(),
        "parsed source file"
    );
    Ok(SyntaxTree::new(
        source.to_string(),
        parser.nodes,
        root,
        lexed.comments,
    ))
}

const CLASS_MODIFIERS: &[&str] = &[
    "public",
    "private",
    "protected",
    "static",
    "readonly",
    "abstract",
    "override",
    "declare",
    "async",
    "accessor",
    "get",
    "set",
];

const PARAMETER_MODIFIERS: &[&str] = &["public", "private", "protected", "readonly", "override"];

const ASSIGNMENT_OPERATORS: &[&str] = &[
    "=", "+=", "-=", "*=", "/=", "%=", "**=", "<<=", ">>=", ">>>=", "&=", "|=", "^=", "&&=",
    "||=", "??=",
];

const RELATIONAL_PRECEDENCE: u8 = 8;

#[derive(Clone, Copy)]
struct Checkpoint {
    pos: usize,
    nodes: usize,
    no_in: bool,
}

struct Parser<'src> {
    source: &'src str,
    tokens: Vec<Token>,
    pos: usize,
    nodes: Vec<Node>,
    /// Inside a `for (...)` head, where `in` ends the initializer.
    no_in: bool,
}

impl<'src> Parser<'src> {
    fn new(source: &'src str, tokens: Vec<Token>) -> Self {
        Parser {
            source,
            tokens,
            pos: 0,
            nodes: Vec::new(),
            no_in: false,
        }
    }

    // ========================================================================
    // Token cursor
    // ========================================================================

    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn peek_nth(&self, n: usize) -> Option<Token> {
        self.tokens.get(self.pos + n).copied()
    }

    fn nth_kind(&self, n: usize) -> Option<TokenKind> {
        self.peek_nth(n).map(|t| t.kind)
    }

    fn token_text(&self, token: Token) -> &'src str {
        &self.source[token.span.start..token.span.end]
    }

    fn nth_text(&self, n: usize) -> &'src str {
        self.peek_nth(n).map(|t| self.token_text(t)).unwrap_or("")
    }

    fn text(&self) -> &'src str {
        self.nth_text(0)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.nth_kind(0) == Some(kind)
    }

    fn at_op(&self, op: &str) -> bool {
        self.at(TokenKind::Op) && self.text() == op
    }

    fn at_word(&self, word: &str) -> bool {
        self.at(TokenKind::Ident) && self.text() == word
    }

    fn nth_is_word(&self, n: usize, word: &str) -> bool {
        self.nth_kind(n) == Some(TokenKind::Ident) && self.nth_text(n) == word
    }

    /// The token at `n` is on the same line as the one before it.
    fn nth_same_line(&self, n: usize) -> bool {
        self.peek_nth(n).is_some_and(|t| !t.newline_before)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.peek()?;
        self.pos += 1;
        Some(token)
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_op(&mut self, op: &str) -> bool {
        if self.at_op(op) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_word(&mut self, word: &str) -> bool {
        if self.at_word(word) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &'static str) -> ParseResult<Token> {
        match self.peek() {
            Some(token) if token.kind == kind => {
                self.pos += 1;
                Ok(token)
            }
            _ => Err(self.error(expected)),
        }
    }

    fn expect_word(&mut self, word: &str, expected: &'static str) -> ParseResult<()> {
        if self.eat_word(word) {
            Ok(())
        } else {
            Err(self.error(expected))
        }
    }

    fn error(&self, expected: &'static str) -> ParseError {
        match self.peek() {
            Some(token) => ParseError::Unexpected {
                offset: token.span.start,
                found: self.token_text(token).to_string(),
                expected,
            },
            None => ParseError::UnexpectedEof {
                offset: self.source.len(),
                expected,
            },
        }
    }

    /// Start offset of the current token.
    fn start(&self) -> usize {
        self.peek()
            .map(|t| t.span.start)
            .unwrap_or(self.source.len())
    }

    /// End offset of the last consumed token.
    fn prev_end(&self) -> usize {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(|t| t.span.end)
            .unwrap_or(0)
    }

    fn prev(&self) -> Option<Token> {
        self.pos.checked_sub(1).and_then(|i| self.tokens.get(i)).copied()
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            pos: self.pos,
            nodes: self.nodes.len(),
            no_in: self.no_in,
        }
    }

    fn rewind(&mut self, checkpoint: Checkpoint) {
        self.pos = checkpoint.pos;
        self.nodes.truncate(checkpoint.nodes);
        self.no_in = checkpoint.no_in;
    }

    /// Accept an explicit `;`, or an inserted one before `}`, a line break or
    /// the end of input.
    fn consume_semicolon(&mut self) -> ParseResult<()> {
        if self.eat(TokenKind::Semi) {
            return Ok(());
        }
        match self.peek() {
            None => Ok(()),
            Some(t) if t.kind == TokenKind::RBrace || t.newline_before => Ok(()),
            Some(_) => Err(self.error("`;`")),
        }
    }

    // ========================================================================
    // Node construction
    // ========================================================================

    fn push(&mut self, kind: NodeKind, span: Span, children: Vec<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            span,
            children,
        });
        id
    }

    fn finish(&mut self, kind: NodeKind, start: usize, children: Vec<NodeId>) -> NodeId {
        let end = self.prev_end().max(start);
        self.push(kind, Span::new(start, end), children)
    }

    /// Consume the current token as a childless node.
    fn leaf(&mut self, kind: NodeKind, expected: &'static str) -> ParseResult<NodeId> {
        let token = self.advance().ok_or_else(|| self.error(expected))?;
        Ok(self.push(kind, token.span, Vec::new()))
    }

    fn identifier(&mut self) -> ParseResult<NodeId> {
        let token = self.expect(TokenKind::Ident, "identifier")?;
        Ok(self.push(NodeKind::Identifier, token.span, Vec::new()))
    }

    /// Identifier or private name after `.` or `?.`.
    fn member_name(&mut self) -> ParseResult<NodeId> {
        match self.nth_kind(0) {
            Some(TokenKind::Ident) | Some(TokenKind::PrivateName) => {
                self.leaf(NodeKind::Identifier, "property name")
            }
            _ => Err(self.error("property name")),
        }
    }

    // ========================================================================
    // Skipping type-level syntax
    // ========================================================================

    /// Skip from an opening bracket through its matching closer.
    fn skip_balanced(&mut self) -> ParseResult<()> {
        let mut depth = 0usize;
        loop {
            let token = self.advance().ok_or_else(|| self.error("closing bracket"))?;
            match token.kind {
                TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => depth += 1,
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return Ok(());
                    }
                }
                _ => {}
            }
        }
    }

    /// Index of the closer matching the opener at token index `open`.
    fn matching_close(&self, open: usize) -> Option<usize> {
        let mut depth = 0usize;
        for (index, token) in self.tokens.iter().enumerate().skip(open) {
            match token.kind {
                TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => depth += 1,
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                    depth = depth.checked_sub(1)?;
                    if depth == 0 {
                        return Some(index);
                    }
                }
                _ => {}
            }
        }
        None
    }

    /// Skip a `<...>` list counting angle brackets.
    ///
    /// With `restricted`, fail on any token that cannot appear inside type
    /// arguments, so comparisons are not mistaken for generic calls.
    fn skip_angle_brackets(&mut self, restricted: bool) -> ParseResult<()> {
        let mut depth = 0i32;
        loop {
            let token = self.peek().ok_or_else(|| self.error("`>`"))?;
            let text = self.token_text(token);
            match token.kind {
                TokenKind::Op => match text {
                    "<" => depth += 1,
                    ">" => depth -= 1,
                    ">>" => depth -= 2,
                    ">>>" => depth -= 3,
                    "|" | "&" | "-" => {}
                    "=" if !restricted => {}
                    _ => return Err(self.error("type argument")),
                },
                TokenKind::Semi | TokenKind::LBrace | TokenKind::RBrace if restricted => {
                    return Err(self.error("type argument"));
                }
                TokenKind::Template
                | TokenKind::Regex
                | TokenKind::At
                | TokenKind::Ellipsis
                    if restricted =>
                {
                    return Err(self.error("type argument"));
                }
                _ => {}
            }
            self.pos += 1;
            if depth == 0 {
                return Ok(());
            }
            if depth < 0 {
                return Err(self.error("type argument"));
            }
        }
    }

    fn skip_type_parameters(&mut self) -> ParseResult<()> {
        if self.at_op("<") {
            self.skip_angle_brackets(false)?;
        }
        Ok(())
    }

    /// Speculatively skip type arguments of a generic call.
    fn try_type_arguments(&mut self) -> bool {
        let checkpoint = self.checkpoint();
        if self.skip_angle_brackets(true).is_ok()
            && matches!(
                self.nth_kind(0),
                Some(TokenKind::LParen) | Some(TokenKind::Template)
            )
        {
            return true;
        }
        self.rewind(checkpoint);
        false
    }

    fn prev_ends_type(&self) -> bool {
        match self.prev() {
            Some(token) => match token.kind {
                TokenKind::Ident
                | TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::RBrace
                | TokenKind::String
                | TokenKind::Number
                | TokenKind::Template => true,
                TokenKind::Op => matches!(self.token_text(token), ">" | ">>" | ">>>"),
                _ => false,
            },
            None => false,
        }
    }

    fn continues_type(&self, token: Token) -> bool {
        match token.kind {
            TokenKind::Dot | TokenKind::Arrow => true,
            TokenKind::Op => matches!(self.token_text(token), "|" | "&"),
            _ => false,
        }
    }

    /// Skip one type expression. Stops before the first token at bracket
    /// depth zero that cannot continue the type.
    fn skip_type(&mut self, stop_at_arrow: bool) -> ParseResult<()> {
        let mut depth = 0usize;
        let mut consumed = false;
        while let Some(token) = self.peek() {
            let text = self.token_text(token);
            if depth == 0 {
                let ends = match token.kind {
                    TokenKind::Comma
                    | TokenKind::RParen
                    | TokenKind::RBracket
                    | TokenKind::RBrace
                    | TokenKind::Semi
                    | TokenKind::Colon
                    | TokenKind::Question => true,
                    TokenKind::Arrow => stop_at_arrow,
                    TokenKind::LBrace => consumed && self.prev_ends_type(),
                    TokenKind::Op => match text {
                        "|" | "&" | "<" => false,
                        "-" => consumed,
                        _ => true,
                    },
                    TokenKind::Ident => consumed && matches!(text, "as" | "satisfies"),
                    _ => false,
                };
                let line_break = consumed
                    && token.newline_before
                    && self.prev_ends_type()
                    && !self.continues_type(token);
                if ends || line_break {
                    break;
                }
            }
            match token.kind {
                TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => depth += 1,
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => depth -= 1,
                TokenKind::Op => match text {
                    "<" => depth += 1,
                    ">" => depth = depth.saturating_sub(1),
                    ">>" => depth = depth.saturating_sub(2),
                    ">>>" => depth = depth.saturating_sub(3),
                    _ => {}
                },
                _ => {}
            }
            self.pos += 1;
            consumed = true;
        }
        if consumed {
            Ok(())
        } else {
            Err(self.error("type"))
        }
    }

    /// Skip an interface, type alias, enum, ambient declaration or namespace.
    fn type_declaration(&mut self) -> ParseResult<NodeId> {
        let start = self.start();
        let first = self.pos;
        let mut depth = 0usize;
        while let Some(token) = self.peek() {
            if depth == 0 && self.pos > first {
                match token.kind {
                    TokenKind::Semi => {
                        self.pos += 1;
                        break;
                    }
                    TokenKind::RBrace | TokenKind::RParen | TokenKind::RBracket => break,
                    _ if token.newline_before
                        && self.prev_ends_type()
                        && !self.continues_type(token) =>
                    {
                        break
                    }
                    _ => {}
                }
            }
            match token.kind {
                TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => depth += 1,
                TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace => {
                    depth = depth.saturating_sub(1)
                }
                _ => {}
            }
            self.pos += 1;
        }
        Ok(self.finish(NodeKind::TypeDeclaration, start, Vec::new()))
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn source_file(&mut self) -> ParseResult<NodeId> {
        let mut statements = Vec::new();
        while self.peek().is_some() {
            statements.push(self.statement()?);
        }
        Ok(self.push(
            NodeKind::SourceFile,
            Span::new(0, self.source.len()),
            statements,
        ))
    }

    fn statement(&mut self) -> ParseResult<NodeId> {
        match self.nth_kind(0) {
            None => Err(self.error("statement")),
            Some(TokenKind::LBrace) => self.block(),
            Some(TokenKind::Semi) => {
                let start = self.start();
                self.pos += 1;
                Ok(self.finish(NodeKind::EmptyStatement, start, Vec::new()))
            }
            Some(TokenKind::At) => self.decorated_class(),
            Some(TokenKind::Ident) => self.keyword_statement(),
            Some(_) => self.expression_statement(),
        }
    }

    fn keyword_statement(&mut self) -> ParseResult<NodeId> {
        let word = self.text();
        let next = self.nth_kind(1);
        let same_line = self.nth_same_line(1);
        match word {
            "import" if !matches!(next, Some(TokenKind::LParen) | Some(TokenKind::Dot)) => {
                self.import_declaration()
            }
            "export" => self.export_declaration(),
            "const" if self.nth_is_word(1, "enum") => self.type_declaration(),
            "var" | "const" => self.variable_statement(true),
            "let" if matches!(
                next,
                Some(TokenKind::Ident) | Some(TokenKind::LBracket) | Some(TokenKind::LBrace)
            ) =>
            {
                self.variable_statement(true)
            }
            "function" => self.function(NodeKind::FunctionDeclaration),
            "async" if self.nth_is_word(1, "function") && same_line => {
                self.function(NodeKind::FunctionDeclaration)
            }
            "class" => {
                let start = self.start();
                self.class(NodeKind::ClassDeclaration, Vec::new(), start)
            }
            "abstract" if self.nth_is_word(1, "class") => {
                let start = self.start();
                self.class(NodeKind::ClassDeclaration, Vec::new(), start)
            }
            "interface" | "type" | "enum" | "declare"
                if next == Some(TokenKind::Ident) && same_line =>
            {
                self.type_declaration()
            }
            "namespace" | "module"
                if matches!(next, Some(TokenKind::Ident) | Some(TokenKind::String)) && same_line =>
            {
                self.type_declaration()
            }
            "if" => self.if_statement(),
            "for" => self.for_statement(),
            "while" => self.while_statement(),
            "do" => self.do_statement(),
            "return" => self.return_statement(),
            "throw" => self.throw_statement(),
            "try" => self.try_statement(),
            "switch" => self.switch_statement(),
            "break" => self.jump_statement(NodeKind::BreakStatement),
            "continue" => self.jump_statement(NodeKind::ContinueStatement),
            _ if next == Some(TokenKind::Colon) => {
                let start = self.start();
                let label = self.identifier()?;
                self.expect(TokenKind::Colon, "`:`")?;
                let body = self.statement()?;
                Ok(self.finish(NodeKind::LabeledStatement, start, vec![label, body]))
            }
            _ => self.expression_statement(),
        }
    }

    fn block(&mut self) -> ParseResult<NodeId> {
        let start = self.start();
        self.expect(TokenKind::LBrace, "`{`")?;
        let saved = std::mem::replace(&mut self.no_in, false);
        let mut statements = Vec::new();
        while !self.eat(TokenKind::RBrace) {
            if self.peek().is_none() {
                return Err(self.error("`}`"));
            }
            statements.push(self.statement()?);
        }
        self.no_in = saved;
        Ok(self.finish(NodeKind::Block, start, statements))
    }

    fn expression_statement(&mut self) -> ParseResult<NodeId> {
        let start = self.start();
        let expr = self.expression()?;
        self.consume_semicolon()?;
        Ok(self.finish(NodeKind::ExpressionStatement, start, vec![expr]))
    }

    fn variable_statement(&mut self, terminated: bool) -> ParseResult<NodeId> {
        let start = self.start();
        self.pos += 1;
        let mut declarations = vec![self.variable_declaration()?];
        while self.eat(TokenKind::Comma) {
            declarations.push(self.variable_declaration()?);
        }
        if terminated {
            self.consume_semicolon()?;
        }
        Ok(self.finish(NodeKind::VariableStatement, start, declarations))
    }

    fn variable_declaration(&mut self) -> ParseResult<NodeId> {
        let start = self.start();
        let mut children = vec![self.binding()?];
        self.eat_op("!");
        if self.eat(TokenKind::Colon) {
            self.skip_type(false)?;
        }
        if self.eat_op("=") {
            children.push(self.assignment()?);
        }
        Ok(self.finish(NodeKind::VariableDeclaration, start, children))
    }

    fn binding(&mut self) -> ParseResult<NodeId> {
        if self.at(TokenKind::LBrace) || self.at(TokenKind::LBracket) {
            let start = self.start();
            self.skip_balanced()?;
            Ok(self.finish(NodeKind::BindingPattern, start, Vec::new()))
        } else {
            self.identifier()
        }
    }

    fn if_statement(&mut self) -> ParseResult<NodeId> {
        let start = self.start();
        self.pos += 1;
        self.expect(TokenKind::LParen, "`(`")?;
        let mut children = vec![self.expression()?];
        self.expect(TokenKind::RParen, "`)`")?;
        children.push(self.statement()?);
        if self.eat_word("else") {
            children.push(self.statement()?);
        }
        Ok(self.finish(NodeKind::IfStatement, start, children))
    }

    fn for_statement(&mut self) -> ParseResult<NodeId> {
        let start = self.start();
        self.pos += 1;
        self.eat_word("await");
        self.expect(TokenKind::LParen, "`(`")?;
        let mut children = Vec::new();
        if !self.at(TokenKind::Semi) {
            self.no_in = true;
            let declares = self.at_word("var")
                || self.at_word("const")
                || (self.at_word("let")
                    && matches!(
                        self.nth_kind(1),
                        Some(TokenKind::Ident) | Some(TokenKind::LBracket) | Some(TokenKind::LBrace)
                    ));
            let init = if declares {
                self.variable_statement(false)
            } else {
                self.expression()
            };
            self.no_in = false;
            children.push(init?);
        }
        if self.eat_word("of") || self.eat_word("in") {
            children.push(self.assignment()?);
        } else {
            self.expect(TokenKind::Semi, "`;`")?;
            if !self.at(TokenKind::Semi) {
                children.push(self.expression()?);
            }
            self.expect(TokenKind::Semi, "`;`")?;
            if !self.at(TokenKind::RParen) {
                children.push(self.expression()?);
            }
        }
        self.expect(TokenKind::RParen, "`)`")?;
        children.push(self.statement()?);
        Ok(self.finish(NodeKind::ForStatement, start, children))
    }

    fn while_statement(&mut self) -> ParseResult<NodeId> {
        let start = self.start();
        self.pos += 1;
        self.expect(TokenKind::LParen, "`(`")?;
        let condition = self.expression()?;
        self.expect(TokenKind::RParen, "`)`")?;
        let body = self.statement()?;
        Ok(self.finish(NodeKind::WhileStatement, start, vec![condition, body]))
    }

    fn do_statement(&mut self) -> ParseResult<NodeId> {
        let start = self.start();
        self.pos += 1;
        let body = self.statement()?;
        self.expect_word("while", "`while`")?;
        self.expect(TokenKind::LParen, "`(`")?;
        let condition = self.expression()?;
        self.expect(TokenKind::RParen, "`)`")?;
        self.eat(TokenKind::Semi);
        Ok(self.finish(NodeKind::DoStatement, start, vec![body, condition]))
    }

    fn return_statement(&mut self) -> ParseResult<NodeId> {
        let start = self.start();
        self.pos += 1;
        let mut children = Vec::new();
        let ends = match self.peek() {
            None => true,
            Some(t) => {
                t.newline_before || matches!(t.kind, TokenKind::Semi | TokenKind::RBrace)
            }
        };
        if !ends {
            children.push(self.expression()?);
        }
        self.consume_semicolon()?;
        Ok(self.finish(NodeKind::ReturnStatement, start, children))
    }

    fn throw_statement(&mut self) -> ParseResult<NodeId> {
        let start = self.start();
        self.pos += 1;
        let expr = self.expression()?;
        self.consume_semicolon()?;
        Ok(self.finish(NodeKind::ThrowStatement, start, vec![expr]))
    }

    fn try_statement(&mut self) -> ParseResult<NodeId> {
        let start = self.start();
        self.pos += 1;
        let mut children = vec![self.block()?];
        if self.at_word("catch") {
            let catch_start = self.start();
            self.pos += 1;
            let mut parts = Vec::new();
            if self.eat(TokenKind::LParen) {
                parts.push(self.binding()?);
                if self.eat(TokenKind::Colon) {
                    self.skip_type(false)?;
                }
                self.expect(TokenKind::RParen, "`)`")?;
            }
            parts.push(self.block()?);
            children.push(self.finish(NodeKind::CatchClause, catch_start, parts));
        }
        if self.eat_word("finally") {
            children.push(self.block()?);
        }
        Ok(self.finish(NodeKind::TryStatement, start, children))
    }

    fn switch_statement(&mut self) -> ParseResult<NodeId> {
        let start = self.start();
        self.pos += 1;
        self.expect(TokenKind::LParen, "`(`")?;
        let mut children = vec![self.expression()?];
        self.expect(TokenKind::RParen, "`)`")?;
        self.expect(TokenKind::LBrace, "`{`")?;
        while !self.eat(TokenKind::RBrace) {
            let clause_start = self.start();
            let mut parts = Vec::new();
            if self.eat_word("case") {
                parts.push(self.expression()?);
            } else {
                self.expect_word("default", "`case` or `default`")?;
            }
            self.expect(TokenKind::Colon, "`:`")?;
            while !(self.at_word("case") || self.at_word("default") || self.at(TokenKind::RBrace)) {
                if self.peek().is_none() {
                    return Err(self.error("`}`"));
                }
                parts.push(self.statement()?);
            }
            children.push(self.finish(NodeKind::CaseClause, clause_start, parts));
        }
        Ok(self.finish(NodeKind::SwitchStatement, start, children))
    }

    fn jump_statement(&mut self, kind: NodeKind) -> ParseResult<NodeId> {
        let start = self.start();
        self.pos += 1;
        let mut children = Vec::new();
        if self.at(TokenKind::Ident) && self.nth_same_line(0) {
            children.push(self.identifier()?);
        }
        self.consume_semicolon()?;
        Ok(self.finish(kind, start, children))
    }

    // ========================================================================
    // Modules
    // ========================================================================

    fn import_declaration(&mut self) -> ParseResult<NodeId> {
        // `import x = require('y')` and `import x = A.B`
        if self.nth_kind(1) == Some(TokenKind::Ident)
            && self.nth_kind(2) == Some(TokenKind::Op)
            && self.nth_text(2) == "="
        {
            return self.type_declaration();
        }

        let start = self.start();
        self.pos += 1;

        if self.at_word("type")
            && matches!(
                self.nth_kind(1),
                Some(TokenKind::Ident) | Some(TokenKind::LBrace) | Some(TokenKind::Op)
            )
            && !self.nth_is_word(1, "from")
        {
            self.pos += 1;
        }

        if self.at(TokenKind::String) {
            let specifier = self.leaf(NodeKind::StringLiteral, "module specifier")?;
            self.skip_import_attributes()?;
            self.consume_semicolon()?;
            return Ok(self.finish(NodeKind::ImportDeclaration, start, vec![specifier]));
        }

        let clause_start = self.start();
        let mut clause = Vec::new();
        if self.at(TokenKind::Ident) {
            clause.push(self.identifier()?);
            if !self.eat(TokenKind::Comma) {
                return self.finish_import(start, clause_start, clause);
            }
        }
        if self.at_op("*") {
            let ns_start = self.start();
            self.pos += 1;
            self.expect_word("as", "`as`")?;
            let name = self.identifier()?;
            clause.push(self.finish(NodeKind::NamespaceImport, ns_start, vec![name]));
        } else if self.at(TokenKind::LBrace) {
            clause.push(self.named_imports()?);
        } else {
            return Err(self.error("import bindings"));
        }
        self.finish_import(start, clause_start, clause)
    }

    fn finish_import(
        &mut self,
        start: usize,
        clause_start: usize,
        clause: Vec<NodeId>,
    ) -> ParseResult<NodeId> {
        let clause = self.finish(NodeKind::ImportClause, clause_start, clause);
        self.expect_word("from", "`from`")?;
        if !self.at(TokenKind::String) {
            return Err(self.error("module specifier"));
        }
        let specifier = self.leaf(NodeKind::StringLiteral, "module specifier")?;
        self.skip_import_attributes()?;
        self.consume_semicolon()?;
        Ok(self.finish(NodeKind::ImportDeclaration, start, vec![clause, specifier]))
    }

    fn skip_import_attributes(&mut self) -> ParseResult<()> {
        if (self.at_word("with") || self.at_word("assert"))
            && self.nth_same_line(0)
            && self.nth_kind(1) == Some(TokenKind::LBrace)
        {
            self.pos += 1;
            self.skip_balanced()?;
        }
        Ok(())
    }

    fn named_imports(&mut self) -> ParseResult<NodeId> {
        let start = self.start();
        self.expect(TokenKind::LBrace, "`{`")?;
        let mut specifiers = Vec::new();
        loop {
            if self.eat(TokenKind::RBrace) {
                break;
            }
            let spec_start = self.start();
            if self.at_word("type")
                && matches!(
                    self.nth_kind(1),
                    Some(TokenKind::Ident) | Some(TokenKind::String)
                )
                && !self.nth_is_word(1, "as")
            {
                self.pos += 1;
            }
            let first = self.module_export_name()?;
            let mut parts = vec![first];
            if self.eat_word("as") {
                parts.push(self.identifier()?);
            }
            specifiers.push(self.finish(NodeKind::ImportSpecifier, spec_start, parts));
            if !self.eat(TokenKind::Comma) {
                self.expect(TokenKind::RBrace, "`}`")?;
                break;
            }
        }
        Ok(self.finish(NodeKind::NamedImports, start, specifiers))
    }

    fn module_export_name(&mut self) -> ParseResult<NodeId> {
        match self.nth_kind(0) {
            Some(TokenKind::Ident) => self.leaf(NodeKind::Identifier, "imported name"),
            Some(TokenKind::String) => self.leaf(NodeKind::StringLiteral, "imported name"),
            _ => Err(self.error("imported name")),
        }
    }

    fn export_declaration(&mut self) -> ParseResult<NodeId> {
        let start = self.start();
        self.pos += 1;

        if self.eat_op("=") {
            let expr = self.assignment()?;
            self.consume_semicolon()?;
            return Ok(self.finish(NodeKind::ExportDeclaration, start, vec![expr]));
        }

        if self.eat_word("default") {
            let inner = if self.at_word("function")
                || (self.at_word("async") && self.nth_is_word(1, "function"))
            {
                self.function(NodeKind::FunctionDeclaration)?
            } else if self.at_word("class")
                || (self.at_word("abstract") && self.nth_is_word(1, "class"))
            {
                let class_start = self.start();
                self.class(NodeKind::ClassDeclaration, Vec::new(), class_start)?
            } else if self.at_word("interface") {
                self.type_declaration()?
            } else {
                let expr = self.assignment()?;
                self.consume_semicolon()?;
                expr
            };
            return Ok(self.finish(NodeKind::ExportDeclaration, start, vec![inner]));
        }

        if self.at_word("type") && self.nth_kind(1) == Some(TokenKind::LBrace) {
            self.pos += 1;
        }

        if self.at(TokenKind::LBrace) || self.at_op("*") {
            let mut children = Vec::new();
            if self.at(TokenKind::LBrace) {
                self.skip_balanced()?;
            } else {
                self.pos += 1;
                if self.eat_word("as") {
                    self.module_export_name()?;
                }
            }
            if self.eat_word("from") {
                if !self.at(TokenKind::String) {
                    return Err(self.error("module specifier"));
                }
                children.push(self.leaf(NodeKind::StringLiteral, "module specifier")?);
                self.skip_import_attributes()?;
            }
            self.consume_semicolon()?;
            return Ok(self.finish(NodeKind::ExportDeclaration, start, children));
        }

        if self.at_word("as") && self.nth_is_word(1, "namespace") {
            self.type_declaration()?;
            return Ok(self.finish(NodeKind::ExportDeclaration, start, Vec::new()));
        }

        if self.at_word("import") {
            // `export import A = B.C;`
            let inner = self.type_declaration()?;
            return Ok(self.finish(NodeKind::ExportDeclaration, start, vec![inner]));
        }

        let inner = self.statement()?;
        Ok(self.finish(NodeKind::ExportDeclaration, start, vec![inner]))
    }

    // ========================================================================
    // Functions and classes
    // ========================================================================

    fn function(&mut self, kind: NodeKind) -> ParseResult<NodeId> {
        let start = self.start();
        self.eat_word("async");
        self.expect_word("function", "`function`")?;
        self.eat_op("*");
        let mut children = Vec::new();
        if self.at(TokenKind::Ident) {
            children.push(self.identifier()?);
        }
        self.skip_type_parameters()?;
        children.extend(self.parameters()?);
        if self.eat(TokenKind::Colon) {
            self.skip_type(false)?;
        }
        if self.at(TokenKind::LBrace) {
            children.push(self.block()?);
        } else {
            self.consume_semicolon()?;
        }
        Ok(self.finish(kind, start, children))
    }

    fn parameters(&mut self) -> ParseResult<Vec<NodeId>> {
        self.expect(TokenKind::LParen, "`(`")?;
        let saved = std::mem::replace(&mut self.no_in, false);
        let mut params = Vec::new();
        loop {
            if self.eat(TokenKind::RParen) {
                break;
            }
            params.push(self.parameter()?);
            if !self.eat(TokenKind::Comma) {
                self.expect(TokenKind::RParen, "`)`")?;
                break;
            }
        }
        self.no_in = saved;
        Ok(params)
    }

    fn parameter(&mut self) -> ParseResult<NodeId> {
        let start = self.start();
        let mut children = Vec::new();
        while self.at(TokenKind::At) {
            children.push(self.decorator()?);
        }
        while self.at(TokenKind::Ident)
            && PARAMETER_MODIFIERS.contains(&self.text())
            && matches!(
                self.nth_kind(1),
                Some(TokenKind::Ident) | Some(TokenKind::LBrace) | Some(TokenKind::LBracket)
            )
        {
            self.pos += 1;
        }
        self.eat(TokenKind::Ellipsis);
        children.push(self.binding()?);
        self.eat(TokenKind::Question);
        if self.eat(TokenKind::Colon) {
            self.skip_type(false)?;
        }
        if self.eat_op("=") {
            children.push(self.assignment()?);
        }
        Ok(self.finish(NodeKind::Parameter, start, children))
    }

    fn decorator(&mut self) -> ParseResult<NodeId> {
        let start = self.start();
        self.expect(TokenKind::At, "`@`")?;
        let expr = self.call_member()?;
        Ok(self.finish(NodeKind::Decorator, start, vec![expr]))
    }

    fn decorated_class(&mut self) -> ParseResult<NodeId> {
        let start = self.start();
        let mut decorators = Vec::new();
        while self.at(TokenKind::At) {
            decorators.push(self.decorator()?);
        }
        if self.eat_word("export") {
            self.eat_word("default");
        }
        self.class(NodeKind::ClassDeclaration, decorators, start)
    }

    fn class(
        &mut self,
        kind: NodeKind,
        decorators: Vec<NodeId>,
        start: usize,
    ) -> ParseResult<NodeId> {
        self.eat_word("abstract");
        self.expect_word("class", "`class`")?;
        let mut children = decorators;
        if self.at(TokenKind::Ident) && !self.at_word("extends") && !self.at_word("implements") {
            children.push(self.identifier()?);
        }
        self.skip_type_parameters()?;
        if self.eat_word("extends") {
            children.push(self.call_member()?);
            self.skip_type_parameters()?;
        }
        if self.eat_word("implements") {
            loop {
                self.skip_type(false)?;
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::LBrace, "`{`")?;
        while !self.eat(TokenKind::RBrace) {
            if self.peek().is_none() {
                return Err(self.error("`}`"));
            }
            if self.eat(TokenKind::Semi) {
                continue;
            }
            children.push(self.class_member()?);
        }
        Ok(self.finish(kind, start, children))
    }

    /// The token at `n` can begin a property or method name.
    fn nth_starts_member_name(&self, n: usize) -> bool {
        match self.nth_kind(n) {
            Some(TokenKind::Ident)
            | Some(TokenKind::String)
            | Some(TokenKind::Number)
            | Some(TokenKind::PrivateName)
            | Some(TokenKind::LBracket) => true,
            Some(TokenKind::Op) => self.nth_text(n) == "*",
            _ => false,
        }
    }

    fn class_member(&mut self) -> ParseResult<NodeId> {
        let start = self.start();
        let mut children = Vec::new();
        while self.at(TokenKind::At) {
            children.push(self.decorator()?);
        }

        if self.at_word("static") && self.nth_kind(1) == Some(TokenKind::LBrace) {
            self.pos += 1;
            children.push(self.block()?);
            return Ok(self.finish(NodeKind::ClassMember, start, children));
        }

        while self.at(TokenKind::Ident)
            && CLASS_MODIFIERS.contains(&self.text())
            && self.nth_starts_member_name(1)
        {
            self.pos += 1;
        }
        self.eat_op("*");

        // index signature
        if self.at(TokenKind::LBracket)
            && self.nth_kind(1) == Some(TokenKind::Ident)
            && self.nth_kind(2) == Some(TokenKind::Colon)
        {
            self.skip_balanced()?;
            if self.eat(TokenKind::Colon) {
                self.skip_type(false)?;
            }
            self.consume_semicolon()?;
            return Ok(self.finish(NodeKind::ClassMember, start, children));
        }

        children.push(self.property_name()?);
        self.eat(TokenKind::Question);
        self.eat_op("!");

        if self.at(TokenKind::LParen) || self.at_op("<") {
            self.skip_type_parameters()?;
            children.extend(self.parameters()?);
            if self.eat(TokenKind::Colon) {
                self.skip_type(false)?;
            }
            if self.at(TokenKind::LBrace) {
                children.push(self.block()?);
            } else {
                self.consume_semicolon()?;
            }
        } else {
            if self.eat(TokenKind::Colon) {
                self.skip_type(false)?;
            }
            if self.eat_op("=") {
                children.push(self.assignment()?);
            }
            self.consume_semicolon()?;
        }
        Ok(self.finish(NodeKind::ClassMember, start, children))
    }

    /// Property key in a class body or object literal.
    fn property_name(&mut self) -> ParseResult<NodeId> {
        match self.nth_kind(0) {
            Some(TokenKind::Ident) | Some(TokenKind::PrivateName) => {
                self.leaf(NodeKind::Identifier, "property name")
            }
            Some(TokenKind::String) => self.leaf(NodeKind::StringLiteral, "property name"),
            Some(TokenKind::Number) => self.leaf(NodeKind::NumericLiteral, "property name"),
            Some(TokenKind::LBracket) => {
                self.pos += 1;
                let key = self.assignment()?;
                self.expect(TokenKind::RBracket, "`]`")?;
                Ok(key)
            }
            _ => Err(self.error("property name")),
        }
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn expression(&mut self) -> ParseResult<NodeId> {
        let start = self.start();
        let first = self.assignment()?;
        if !self.at(TokenKind::Comma) {
            return Ok(first);
        }
        let mut children = vec![first];
        while self.eat(TokenKind::Comma) {
            children.push(self.assignment()?);
        }
        Ok(self.finish(NodeKind::Binary, start, children))
    }

    fn assignment(&mut self) -> ParseResult<NodeId> {
        if let Some(arrow) = self.try_arrow()? {
            return Ok(arrow);
        }
        let start = self.start();

        if self.at_word("yield") {
            let operand_follows = self.nth_same_line(1)
                && !matches!(
                    self.nth_kind(1),
                    None | Some(TokenKind::RParen)
                        | Some(TokenKind::RBracket)
                        | Some(TokenKind::RBrace)
                        | Some(TokenKind::Comma)
                        | Some(TokenKind::Semi)
                        | Some(TokenKind::Colon)
                );
            self.pos += 1;
            self.eat_op("*");
            if !operand_follows {
                return Ok(self.finish(NodeKind::Identifier, start, Vec::new()));
            }
            let operand = self.assignment()?;
            return Ok(self.finish(NodeKind::Unary, start, vec![operand]));
        }

        let lhs = self.conditional()?;
        if self.at(TokenKind::Op) && ASSIGNMENT_OPERATORS.contains(&self.text()) {
            self.pos += 1;
            let rhs = self.assignment()?;
            return Ok(self.finish(NodeKind::Binary, start, vec![lhs, rhs]));
        }
        Ok(lhs)
    }

    /// Parse an arrow function if one starts here, otherwise consume nothing.
    fn try_arrow(&mut self) -> ParseResult<Option<NodeId>> {
        let is_async = self.at_word("async")
            && self.nth_same_line(1)
            && (matches!(
                self.nth_kind(1),
                Some(TokenKind::Ident) | Some(TokenKind::LParen)
            ) || (self.nth_kind(1) == Some(TokenKind::Op) && self.nth_text(1) == "<"));
        let offset = usize::from(is_async);

        match self.nth_kind(offset) {
            Some(TokenKind::Ident) if self.nth_kind(offset + 1) == Some(TokenKind::Arrow) => {
                let start = self.start();
                self.pos += offset;
                let param_start = self.start();
                let name = self.identifier()?;
                let param = self.finish(NodeKind::Parameter, param_start, vec![name]);
                self.expect(TokenKind::Arrow, "`=>`")?;
                let body = self.arrow_body()?;
                Ok(Some(self.finish(
                    NodeKind::ArrowFunction,
                    start,
                    vec![param, body],
                )))
            }
            Some(TokenKind::LParen) => {
                let follows_arrow = self
                    .matching_close(self.pos + offset)
                    .and_then(|close| self.tokens.get(close + 1))
                    .is_some_and(|t| matches!(t.kind, TokenKind::Arrow | TokenKind::Colon));
                if !follows_arrow {
                    return Ok(None);
                }
                self.speculative_arrow(is_async)
            }
            Some(TokenKind::Op) if self.nth_text(offset) == "<" => self.speculative_arrow(is_async),
            _ => Ok(None),
        }
    }

    fn speculative_arrow(&mut self, is_async: bool) -> ParseResult<Option<NodeId>> {
        let checkpoint = self.checkpoint();
        let start = self.start();
        match self.arrow_head(is_async) {
            Ok(params) => {
                let body = self.arrow_body()?;
                let mut children = params;
                children.push(body);
                Ok(Some(self.finish(NodeKind::ArrowFunction, start, children)))
            }
            Err(_) => {
                self.rewind(checkpoint);
                Ok(None)
            }
        }
    }

    /// Everything of an arrow function up to and including `=>`.
    fn arrow_head(&mut self, is_async: bool) -> ParseResult<Vec<NodeId>> {
        if is_async {
            self.pos += 1;
        }
        self.skip_type_parameters()?;
        let params = self.parameters()?;
        if self.eat(TokenKind::Colon) {
            self.skip_type(true)?;
        }
        self.expect(TokenKind::Arrow, "`=>`")?;
        Ok(params)
    }

    fn arrow_body(&mut self) -> ParseResult<NodeId> {
        if self.at(TokenKind::LBrace) {
            self.block()
        } else {
            let saved = std::mem::replace(&mut self.no_in, false);
            let body = self.assignment()?;
            self.no_in = saved;
            Ok(body)
        }
    }

    fn conditional(&mut self) -> ParseResult<NodeId> {
        let start = self.start();
        let condition = self.binary(0)?;
        if !self.eat(TokenKind::Question) {
            return Ok(condition);
        }
        let saved = std::mem::replace(&mut self.no_in, false);
        let then = self.assignment()?;
        self.no_in = saved;
        self.expect(TokenKind::Colon, "`:`")?;
        let otherwise = self.assignment()?;
        Ok(self.finish(NodeKind::Conditional, start, vec![condition, then, otherwise]))
    }

    fn binary_precedence(&self, token: Token) -> Option<u8> {
        let text = self.token_text(token);
        match token.kind {
            TokenKind::Op => match text {
                "??" => Some(1),
                "||" => Some(2),
                "&&" => Some(3),
                "|" => Some(4),
                "^" => Some(5),
                "&" => Some(6),
                "==" | "!=" | "===" | "!==" => Some(7),
                "<" | ">" | "<=" | ">=" => Some(RELATIONAL_PRECEDENCE),
                "<<" | ">>" | ">>>" => Some(9),
                "+" | "-" => Some(10),
                "*" | "/" | "%" => Some(11),
                "**" => Some(12),
                _ => None,
            },
            TokenKind::Ident => match text {
                "instanceof" => Some(RELATIONAL_PRECEDENCE),
                "in" if !self.no_in => Some(RELATIONAL_PRECEDENCE),
                _ => None,
            },
            _ => None,
        }
    }

    fn binary(&mut self, min_precedence: u8) -> ParseResult<NodeId> {
        let start = self.start();
        let mut lhs = self.unary()?;
        while let Some(token) = self.peek() {
            let text = self.token_text(token);
            if token.kind == TokenKind::Ident
                && matches!(text, "as" | "satisfies")
                && !token.newline_before
            {
                if RELATIONAL_PRECEDENCE < min_precedence {
                    break;
                }
                self.pos += 1;
                if !self.eat_word("const") {
                    self.skip_type(false)?;
                }
                lhs = self.finish(NodeKind::AsExpression, start, vec![lhs]);
                continue;
            }
            let Some(precedence) = self.binary_precedence(token) else {
                break;
            };
            if precedence < min_precedence {
                break;
            }
            self.pos += 1;
            let next_min = if text == "**" {
                precedence
            } else {
                precedence + 1
            };
            let rhs = self.binary(next_min)?;
            lhs = self.finish(NodeKind::Binary, start, vec![lhs, rhs]);
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> ParseResult<NodeId> {
        let start = self.start();
        let is_prefix_op = self.at(TokenKind::Op)
            && matches!(self.text(), "!" | "~" | "+" | "-" | "++" | "--");
        let is_prefix_word = self.at(TokenKind::Ident)
            && matches!(self.text(), "typeof" | "void" | "delete" | "await")
            && !matches!(
                self.nth_kind(1),
                None | Some(TokenKind::RParen)
                    | Some(TokenKind::RBracket)
                    | Some(TokenKind::RBrace)
                    | Some(TokenKind::Comma)
                    | Some(TokenKind::Semi)
                    | Some(TokenKind::Colon)
                    | Some(TokenKind::Dot)
                    | Some(TokenKind::Arrow)
            )
            && !(self.nth_kind(1) == Some(TokenKind::Op)
                && ASSIGNMENT_OPERATORS.contains(&self.nth_text(1)));
        if is_prefix_op || is_prefix_word {
            self.pos += 1;
            let operand = self.unary()?;
            return Ok(self.finish(NodeKind::Unary, start, vec![operand]));
        }
        if self.at_op("<") {
            // `<T>expr` assertion
            self.skip_angle_brackets(false)?;
            let operand = self.unary()?;
            return Ok(self.finish(NodeKind::AsExpression, start, vec![operand]));
        }

        let expr = self.call_member()?;
        if (self.at_op("++") || self.at_op("--")) && self.nth_same_line(0) {
            self.pos += 1;
            return Ok(self.finish(NodeKind::Postfix, start, vec![expr]));
        }
        Ok(expr)
    }

    fn call_member(&mut self) -> ParseResult<NodeId> {
        let start = self.start();
        let mut expr = if self.at_word("new") && self.nth_kind(1) != Some(TokenKind::Dot) {
            self.new_expression()?
        } else {
            self.primary()?
        };

        while let Some(token) = self.peek() {
            match token.kind {
                TokenKind::Dot => {
                    self.pos += 1;
                    let name = self.member_name()?;
                    expr = self.finish(NodeKind::PropertyAccess, start, vec![expr, name]);
                }
                TokenKind::QuestionDot => {
                    self.pos += 1;
                    match self.nth_kind(0) {
                        Some(TokenKind::LParen) => {
                            let mut children = vec![expr];
                            children.extend(self.arguments()?);
                            expr = self.finish(NodeKind::CallExpression, start, children);
                        }
                        Some(TokenKind::LBracket) => {
                            self.pos += 1;
                            let index = self.expression()?;
                            self.expect(TokenKind::RBracket, "`]`")?;
                            expr = self.finish(NodeKind::ElementAccess, start, vec![expr, index]);
                        }
                        _ => {
                            let name = self.member_name()?;
                            expr = self.finish(
                                NodeKind::OptionalPropertyAccess,
                                start,
                                vec![expr, name],
                            );
                        }
                    }
                }
                TokenKind::LBracket => {
                    self.pos += 1;
                    let saved = std::mem::replace(&mut self.no_in, false);
                    let index = self.expression()?;
                    self.no_in = saved;
                    self.expect(TokenKind::RBracket, "`]`")?;
                    expr = self.finish(NodeKind::ElementAccess, start, vec![expr, index]);
                }
                TokenKind::LParen => {
                    let mut children = vec![expr];
                    children.extend(self.arguments()?);
                    expr = self.finish(NodeKind::CallExpression, start, children);
                }
                TokenKind::Template => {
                    let template = self.leaf(NodeKind::TemplateLiteral, "template")?;
                    expr = self.finish(NodeKind::TaggedTemplate, start, vec![expr, template]);
                }
                TokenKind::Op if self.token_text(token) == "!" && !token.newline_before => {
                    self.pos += 1;
                    expr = self.finish(NodeKind::NonNull, start, vec![expr]);
                }
                TokenKind::Op if self.token_text(token) == "<" => {
                    if !self.try_type_arguments() {
                        break;
                    }
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn new_expression(&mut self) -> ParseResult<NodeId> {
        let start = self.start();
        self.pos += 1;
        let mut callee = if self.at_word("new") {
            self.new_expression()?
        } else {
            self.primary()?
        };
        let callee_start = self.node_start(callee);
        loop {
            if self.eat(TokenKind::Dot) {
                let name = self.member_name()?;
                callee = self.finish(NodeKind::PropertyAccess, callee_start, vec![callee, name]);
            } else if self.at(TokenKind::LBracket) {
                self.pos += 1;
                let index = self.expression()?;
                self.expect(TokenKind::RBracket, "`]`")?;
                callee = self.finish(NodeKind::ElementAccess, callee_start, vec![callee, index]);
            } else if self.at_op("<") && self.try_type_arguments() {
                continue;
            } else {
                break;
            }
        }
        let mut children = vec![callee];
        if self.at(TokenKind::LParen) {
            children.extend(self.arguments()?);
        }
        Ok(self.finish(NodeKind::NewExpression, start, children))
    }

    fn node_start(&self, node: NodeId) -> usize {
        self.nodes[node.0 as usize].span.start
    }

    fn arguments(&mut self) -> ParseResult<Vec<NodeId>> {
        self.expect(TokenKind::LParen, "`(`")?;
        let saved = std::mem::replace(&mut self.no_in, false);
        let mut args = Vec::new();
        loop {
            if self.eat(TokenKind::RParen) {
                break;
            }
            let arg = if self.at(TokenKind::Ellipsis) {
                self.spread()?
            } else {
                self.assignment()?
            };
            args.push(arg);
            if !self.eat(TokenKind::Comma) {
                self.expect(TokenKind::RParen, "`)`")?;
                break;
            }
        }
        self.no_in = saved;
        Ok(args)
    }

    fn spread(&mut self) -> ParseResult<NodeId> {
        let start = self.start();
        self.expect(TokenKind::Ellipsis, "`...`")?;
        let expr = self.assignment()?;
        Ok(self.finish(NodeKind::SpreadElement, start, vec![expr]))
    }

    fn primary(&mut self) -> ParseResult<NodeId> {
        let Some(token) = self.peek() else {
            return Err(self.error("expression"));
        };
        match token.kind {
            TokenKind::Ident => match self.token_text(token) {
                "function" => self.function(NodeKind::FunctionExpression),
                "async" if self.nth_is_word(1, "function") && self.nth_same_line(1) => {
                    self.function(NodeKind::FunctionExpression)
                }
                "class" => {
                    let start = self.start();
                    self.class(NodeKind::ClassExpression, Vec::new(), start)
                }
                _ => self.leaf(NodeKind::Identifier, "expression"),
            },
            TokenKind::PrivateName => self.leaf(NodeKind::Identifier, "expression"),
            TokenKind::Number => self.leaf(NodeKind::NumericLiteral, "expression"),
            TokenKind::String => self.leaf(NodeKind::StringLiteral, "expression"),
            TokenKind::Template => self.leaf(NodeKind::TemplateLiteral, "expression"),
            TokenKind::Regex => self.leaf(NodeKind::RegexLiteral, "expression"),
            TokenKind::LParen => {
                let start = self.start();
                self.pos += 1;
                let saved = std::mem::replace(&mut self.no_in, false);
                let inner = self.expression()?;
                self.no_in = saved;
                self.expect(TokenKind::RParen, "`)`")?;
                Ok(self.finish(NodeKind::Parenthesized, start, vec![inner]))
            }
            TokenKind::LBracket => self.array_literal(),
            TokenKind::LBrace => self.object_literal(),
            _ => Err(self.error("expression")),
        }
    }

    fn array_literal(&mut self) -> ParseResult<NodeId> {
        let start = self.start();
        self.expect(TokenKind::LBracket, "`[`")?;
        let saved = std::mem::replace(&mut self.no_in, false);
        let mut elements = Vec::new();
        loop {
            if self.eat(TokenKind::RBracket) {
                break;
            }
            if self.eat(TokenKind::Comma) {
                continue;
            }
            let element = if self.at(TokenKind::Ellipsis) {
                self.spread()?
            } else {
                self.assignment()?
            };
            elements.push(element);
            if !self.eat(TokenKind::Comma) {
                self.expect(TokenKind::RBracket, "`]`")?;
                break;
            }
        }
        self.no_in = saved;
        Ok(self.finish(NodeKind::ArrayLiteral, start, elements))
    }

    fn object_literal(&mut self) -> ParseResult<NodeId> {
        let start = self.start();
        self.expect(TokenKind::LBrace, "`{`")?;
        let saved = std::mem::replace(&mut self.no_in, false);
        let mut members = Vec::new();
        loop {
            if self.eat(TokenKind::RBrace) {
                break;
            }
            members.push(self.object_member()?);
            if !self.eat(TokenKind::Comma) {
                self.expect(TokenKind::RBrace, "`}`")?;
                break;
            }
        }
        self.no_in = saved;
        Ok(self.finish(NodeKind::ObjectLiteral, start, members))
    }

    fn object_member(&mut self) -> ParseResult<NodeId> {
        let start = self.start();
        if self.at(TokenKind::Ellipsis) {
            return self.spread();
        }
        if self.at(TokenKind::Ident)
            && matches!(self.text(), "get" | "set" | "async")
            && self.nth_starts_member_name(1)
        {
            self.pos += 1;
        }
        self.eat_op("*");
        let key = self.property_name()?;

        if self.at(TokenKind::LParen) || self.at_op("<") {
            self.skip_type_parameters()?;
            let mut children = vec![key];
            children.extend(self.parameters()?);
            if self.eat(TokenKind::Colon) {
                self.skip_type(false)?;
            }
            children.push(self.block()?);
            return Ok(self.finish(NodeKind::MethodDefinition, start, children));
        }
        if self.eat(TokenKind::Colon) {
            let value = self.assignment()?;
            return Ok(self.finish(NodeKind::PropertyAssignment, start, vec![key, value]));
        }
        let mut children = vec![key];
        if self.eat_op("=") {
            children.push(self.assignment()?);
        }
        Ok(self.finish(NodeKind::ShorthandProperty, start, children))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds_of(tree: &SyntaxTree, kind: NodeKind) -> Vec<String> {
        tree.descendants(tree.root())
            .filter(|&id| tree.kind(id) == kind)
            .map(|id| tree.text(id).to_string())
            .collect()
    }

    fn first_of(tree: &SyntaxTree, kind: NodeKind) -> NodeId {
        tree.descendants(tree.root())
            .find(|&id| tree.kind(id) == kind)
            .unwrap()
    }

    mod expression_tests {
        use super::*;

        #[test]
        fn member_call_chain_spans() {
            let tree = parse("source.map(x => x * 2).filter(Boolean);").unwrap();
            let calls = kinds_of(&tree, NodeKind::CallExpression);
            assert_eq!(
                calls,
                vec![
                    "source.map(x => x * 2).filter(Boolean)",
                    "source.map(x => x * 2)",
                ]
            );
            let outer = first_of(&tree, NodeKind::CallExpression);
            let (callee, args) = tree.call_parts(outer).unwrap();
            let (object, name) = tree.property_access_parts(callee).unwrap();
            assert_eq!(tree.text(name), "filter");
            assert_eq!(tree.text(object), "source.map(x => x * 2)");
            assert_eq!(args.len(), 1);
        }

        #[test]
        fn keyword_property_names() {
            let tree = parse("a.do(f).catch(g).finally(h);").unwrap();
            let names = kinds_of(&tree, NodeKind::PropertyAccess);
            assert_eq!(names.len(), 3);
            assert!(names.contains(&"a.do".to_string()));
        }

        #[test]
        fn arrow_and_parenthesized_are_distinguished() {
            let tree = parse("const f = (a: number, b = 2): T => a + b;\nconst g = (a + b);").unwrap();
            assert_eq!(kinds_of(&tree, NodeKind::ArrowFunction).len(), 1);
            assert_eq!(kinds_of(&tree, NodeKind::Parenthesized), vec!["(a + b)"]);
            assert_eq!(kinds_of(&tree, NodeKind::Parameter).len(), 2);
        }

        #[test]
        fn conditional_with_parenthesized_branch_is_not_arrow() {
            let tree = parse("const v = c ? (a) : b;").unwrap();
            assert!(kinds_of(&tree, NodeKind::ArrowFunction).is_empty());
            assert_eq!(kinds_of(&tree, NodeKind::Conditional), vec!["c ? (a) : b"]);
        }

        #[test]
        fn generic_call_and_comparison() {
            let tree = parse("of<number>(1);\nconst lt = a < b && c > d;").unwrap();
            assert_eq!(
                kinds_of(&tree, NodeKind::CallExpression),
                vec!["of<number>(1)"]
            );
            assert!(kinds_of(&tree, NodeKind::Binary)
                .iter()
                .any(|t| t == "a < b && c > d"));
        }

        #[test]
        fn casts_and_non_null() {
            let tree = parse("const o = (x as Observable<number>).pipe(y!);").unwrap();
            assert_eq!(
                kinds_of(&tree, NodeKind::AsExpression),
                vec!["x as Observable<number>"]
            );
            assert_eq!(kinds_of(&tree, NodeKind::NonNull), vec!["y!"]);
        }

        #[test]
        fn new_with_type_arguments() {
            let tree = parse("const s = new Subject<string>();").unwrap();
            let new_expr = first_of(&tree, NodeKind::NewExpression);
            assert_eq!(tree.text(new_expr), "new Subject<string>()");
            let (callee, args) = tree.call_parts(new_expr).unwrap();
            assert_eq!(tree.text(callee), "Subject");
            assert!(args.is_empty());
        }

        #[test]
        fn optional_chain_is_distinct() {
            let tree = parse("a?.map(f);").unwrap();
            assert_eq!(kinds_of(&tree, NodeKind::OptionalPropertyAccess), vec!["a?.map"]);
            assert!(kinds_of(&tree, NodeKind::PropertyAccess).is_empty());
        }

        #[test]
        fn object_literal_members() {
            let tree = parse("x = { a: 1, b, [k]: 2, m() { return 1; }, ...rest };").unwrap();
            assert_eq!(kinds_of(&tree, NodeKind::PropertyAssignment).len(), 2);
            assert_eq!(kinds_of(&tree, NodeKind::ShorthandProperty), vec!["b"]);
            assert_eq!(kinds_of(&tree, NodeKind::MethodDefinition).len(), 1);
            assert_eq!(kinds_of(&tree, NodeKind::SpreadElement), vec!["...rest"]);
        }

        #[test]
        fn regex_literal_in_argument() {
            let tree = parse("s.filter(v => /^a/.test(v));").unwrap();
            assert_eq!(kinds_of(&tree, NodeKind::RegexLiteral), vec!["/^a/"]);
        }
    }

    mod statement_tests {
        use super::*;

        #[test]
        fn imports_of_every_shape() {
            let source = "import 'a';\nimport b from 'b';\nimport * as c from 'c';\nimport { d, e as f } from 'd';\nimport g, { h } from 'g';\nimport type { T } from 't';";
            let tree = parse(source).unwrap();
            let imports = tree.imports();
            let modules: Vec<&str> = imports.iter().map(|i| i.module.as_str()).collect();
            assert_eq!(modules, vec!["a", "b", "c", "d", "g", "t"]);
            assert!(imports[2].namespace.is_some());
            assert_eq!(imports[3].specifiers.len(), 2);
            assert!(imports[4].default_binding.is_some());
        }

        #[test]
        fn class_with_decorators_and_members() {
            let source = r#"
@Component({ selector: 'x' })
export class Foo<T> extends Base implements OnInit {
  @Input() name: string;
  private items$: Observable<T[]> = of([]);
  static create(): Foo<any> { return new Foo(); }
  constructor(private readonly http: HttpClient) { super(); }
  get value(): number { return 1 }
  [key: string]: any;
}
"#;
            let tree = parse(source).unwrap();
            assert_eq!(kinds_of(&tree, NodeKind::ClassDeclaration).len(), 1);
            assert_eq!(kinds_of(&tree, NodeKind::Decorator).len(), 2);
            assert_eq!(kinds_of(&tree, NodeKind::ClassMember).len(), 6);
            assert!(kinds_of(&tree, NodeKind::CallExpression)
                .iter()
                .any(|t| t == "of([])"));
        }

        #[test]
        fn type_declarations_are_skipped() {
            let source = "interface A { x: number }\ntype B = A | null;\nenum C { X, Y }\ndeclare const d: number;\nfoo();";
            let tree = parse(source).unwrap();
            assert_eq!(kinds_of(&tree, NodeKind::TypeDeclaration).len(), 4);
            assert_eq!(kinds_of(&tree, NodeKind::CallExpression), vec!["foo()"]);
        }

        #[test]
        fn automatic_semicolons() {
            let tree = parse("const a = 1\nconst b = a\nb.toString()").unwrap();
            assert_eq!(tree.statements().len(), 3);
        }

        #[test]
        fn control_flow_statements() {
            let source = "for (const x of xs) { if (x) continue; }\nfor (let i = 0; i < n; i++) {}\nfor (k in o) {}\nwhile (a) b();\ndo { c() } while (d)\ntry { e() } catch (err) { f() } finally { g() }\nswitch (h) { case 1: i(); break; default: j() }";
            let tree = parse(source).unwrap();
            assert_eq!(kinds_of(&tree, NodeKind::ForStatement).len(), 3);
            assert_eq!(kinds_of(&tree, NodeKind::CaseClause).len(), 2);
            assert_eq!(kinds_of(&tree, NodeKind::CatchClause).len(), 1);
        }

        #[test]
        fn function_declarations_with_types() {
            let source = "export function f<T>(a: T, ...rest: any[]): Observable<T> { return of(a); }\nexport default async function () {}";
            let tree = parse(source).unwrap();
            assert_eq!(kinds_of(&tree, NodeKind::FunctionDeclaration).len(), 2);
            assert_eq!(kinds_of(&tree, NodeKind::ReturnStatement), vec!["return of(a);"]);
        }
    }

    mod error_tests {
        use super::*;

        #[test]
        fn unbalanced_call_reports_offset() {
            let err = parse("foo(1, 2;").unwrap_err();
            assert_eq!(
                err,
                ParseError::Unexpected {
                    offset: 8,
                    found: ";".to_string(),
                    expected: "`)`",
                }
            );
        }

        #[test]
        fn truncated_input_reports_end() {
            let err = parse("const x = ").unwrap_err();
            assert!(matches!(err, ParseError::UnexpectedEof { offset: 10, .. }));
        }
    }
}
