//! Lexical analysis for TypeScript source.
//!
//! Tokenization is driven by logos. Keywords are not separate token kinds:
//! they lex as [`TokenKind::Ident`] and the parser recognizes them by text,
//! which keeps property names such as `.do` or `.catch` and import
//! specifiers such as `{ throw }` ordinary identifiers.
//!
//! Comments are collected on the side rather than emitted as tokens. Each
//! token records whether a line break separated it from the previous token,
//! which the parser needs for automatic semicolon insertion.
//!
//! Regular expression literals cannot be recognized by a context-free lexer,
//! so a `/` token in expression-start position is rescanned by hand.

use logos::Logos;
use rxmigrate_core::patch::Span;

use crate::error::{ParseError, ParseResult};

/// Token kinds produced by the lexer.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[logos(skip r"[ \t\r\n\f\x{0B}\x{A0}\x{FEFF}]+")]
pub enum TokenKind {
    // === Trivia ===
    /// `// ...` or a leading `#!` line.
    #[regex(r"//[^\n]*")]
    #[regex(r"#![^\n]*")]
    LineComment,
    /// `/* ... */`
    #[token("/*", block_comment)]
    BlockComment,

    // === Names and literals ===
    /// Identifiers and keywords.
    #[regex(r"[\p{L}_$][\p{L}\p{N}_$]*")]
    Ident,
    /// `#name` class-private member.
    #[regex(r"#[\p{L}_$][\p{L}\p{N}_$]*")]
    PrivateName,
    #[regex(r"[0-9][0-9_]*(\.[0-9_]*)?([eE][+-]?[0-9]+)?n?")]
    #[regex(r"0[xXoObB][0-9a-fA-F_]+n?")]
    #[regex(r"\.[0-9][0-9_]*([eE][+-]?[0-9]+)?")]
    Number,
    #[regex(r#""([^"\\\n]|\\(.|\n))*""#)]
    #[regex(r"'([^'\\\n]|\\(.|\n))*'")]
    String,
    /// A whole template literal, substitutions included.
    #[token("`", template)]
    Template,
    /// Produced by the rescan in [`lex`], never by logos directly.
    Regex,

    // === Delimiters ===
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(";")]
    Semi,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("...")]
    Ellipsis,
    #[token("?.")]
    QuestionDot,
    #[token("?")]
    Question,
    #[token(":")]
    Colon,
    #[token("=>")]
    Arrow,
    #[token("@")]
    At,

    /// Every other operator; the parser dispatches on its text.
    #[token("=")]
    #[token("==")]
    #[token("===")]
    #[token("!=")]
    #[token("!==")]
    #[token("<")]
    #[token(">")]
    #[token("<=")]
    #[token(">=")]
    #[token("+")]
    #[token("-")]
    #[token("*")]
    #[token("/")]
    #[token("%")]
    #[token("**")]
    #[token("++")]
    #[token("--")]
    #[token("<<")]
    #[token(">>")]
    #[token(">>>")]
    #[token("&")]
    #[token("|")]
    #[token("^")]
    #[token("!")]
    #[token("~")]
    #[token("&&")]
    #[token("||")]
    #[token("??")]
    #[token("+=")]
    #[token("-=")]
    #[token("*=")]
    #[token("/=")]
    #[token("%=")]
    #[token("**=")]
    #[token("<<=")]
    #[token(">>=")]
    #[token(">>>=")]
    #[token("&=")]
    #[token("|=")]
    #[token("^=")]
    #[token("&&=")]
    #[token("||=")]
    #[token("??=")]
    Op,
}

/// A significant token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// A line break occurs between the previous token and this one.
    pub newline_before: bool,
}

/// Extend a `/*` token through the next `*/`.
fn block_comment(lex: &mut logos::Lexer<TokenKind>) -> bool {
    match lex.remainder().find("*/") {
        Some(end) => {
            lex.bump(end + 2);
            true
        }
        None => false,
    }
}

/// Extend a backtick token through the matching closing backtick.
fn template(lex: &mut logos::Lexer<TokenKind>) -> bool {
    match scan_template(lex.remainder().as_bytes(), 0) {
        Some(end) => {
            lex.bump(end);
            true
        }
        None => false,
    }
}

/// Offset just past the backtick closing a template body that starts at `i`.
fn scan_template(bytes: &[u8], mut i: usize) -> Option<usize> {
    loop {
        match *bytes.get(i)? {
            b'\\' => i += 2,
            b'`' => return Some(i + 1),
            b'$' if bytes.get(i + 1) == Some(&b'{') => i = scan_substitution(bytes, i + 2)?,
            _ => i += 1,
        }
    }
}

/// Offset just past the `}` closing a `${` substitution body that starts at `i`.
fn scan_substitution(bytes: &[u8], mut i: usize) -> Option<usize> {
    let mut depth = 0usize;
    loop {
        match *bytes.get(i)? {
            b'{' => {
                depth += 1;
                i += 1;
            }
            b'}' if depth == 0 => return Some(i + 1),
            b'}' => {
                depth -= 1;
                i += 1;
            }
            b'`' => i = scan_template(bytes, i + 1)?,
            quote @ (b'"' | b'\'') => i = scan_quoted(bytes, i + 1, quote)?,
            _ => i += 1,
        }
    }
}

fn scan_quoted(bytes: &[u8], mut i: usize, quote: u8) -> Option<usize> {
    loop {
        match *bytes.get(i)? {
            b'\\' => i += 2,
            b'\n' => return None,
            c if c == quote => return Some(i + 1),
            _ => i += 1,
        }
    }
}

/// Comment flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentKind {
    Line,
    Block,
}

/// A comment with its full span, delimiters included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Comment {
    pub kind: CommentKind,
    pub span: Span,
}

/// Output of [`lex`].
#[derive(Debug, Clone, Default)]
pub struct Lexed {
    pub tokens: Vec<Token>,
    pub comments: Vec<Comment>,
}

/// Keywords after which a `/` starts a regular expression.
const REGEX_PRECEDING_KEYWORDS: &[&str] = &[
    "return",
    "typeof",
    "instanceof",
    "in",
    "of",
    "new",
    "delete",
    "void",
    "throw",
    "case",
    "do",
    "else",
    "yield",
    "await",
];

/// Tokenize `source`.
pub fn lex(source: &str) -> ParseResult<Lexed> {
    let mut out = Lexed::default();
    let mut lexer = TokenKind::lexer(source);
    let mut prev_end = 0usize;
    let mut pending_newline = false;

    while let Some(result) = lexer.next() {
        let range = lexer.span();
        let Ok(mut kind) = result else {
            return Err(lex_error(source, range.start));
        };
        let mut span = Span::new(range.start, range.end);

        if source[prev_end..span.start].contains('\n') {
            pending_newline = true;
        }

        match kind {
            TokenKind::LineComment | TokenKind::BlockComment => {
                let comment_kind = if kind == TokenKind::LineComment {
                    CommentKind::Line
                } else {
                    CommentKind::Block
                };
                if source[span.start..span.end].contains('\n') {
                    pending_newline = true;
                }
                out.comments.push(Comment {
                    kind: comment_kind,
                    span,
                });
                prev_end = span.end;
                continue;
            }
            TokenKind::Op if regex_allowed(source, out.tokens.last()) => {
                let text = &source[span.start..span.end];
                if text == "/" || text == "/=" {
                    let end = scan_regex(source, span.start)?;
                    lexer.bump(end - span.end);
                    span = Span::new(span.start, end);
                    kind = TokenKind::Regex;
                }
            }
            _ => {}
        }

        out.tokens.push(Token {
            kind,
            span,
            newline_before: pending_newline,
        });
        pending_newline = false;
        prev_end = span.end;
    }

    Ok(out)
}

fn lex_error(source: &str, offset: usize) -> ParseError {
    match source[offset..].chars().next() {
        Some('"') | Some('\'') => ParseError::Unterminated {
            what: "string literal",
            offset,
        },
        Some('`') => ParseError::Unterminated {
            what: "template literal",
            offset,
        },
        Some('/') if source[offset..].starts_with("/*") => ParseError::Unterminated {
            what: "block comment",
            offset,
        },
        _ => ParseError::InvalidToken { offset },
    }
}

fn regex_allowed(source: &str, prev: Option<&Token>) -> bool {
    let Some(prev) = prev else {
        return true;
    };
    match prev.kind {
        TokenKind::Ident => {
            REGEX_PRECEDING_KEYWORDS.contains(&&source[prev.span.start..prev.span.end])
        }
        TokenKind::Op => {
            let text = &source[prev.span.start..prev.span.end];
            text != "++" && text != "--"
        }
        TokenKind::LParen
        | TokenKind::LBracket
        | TokenKind::LBrace
        | TokenKind::Comma
        | TokenKind::Semi
        | TokenKind::Colon
        | TokenKind::Question
        | TokenKind::Arrow => true,
        _ => false,
    }
}

/// Find the end of the regular expression literal starting at `start`.
fn scan_regex(source: &str, start: usize) -> ParseResult<usize> {
    let bytes = source.as_bytes();
    let mut i = start + 1;
    let mut in_class = false;
    loop {
        match bytes.get(i) {
            None | Some(b'\n') => {
                return Err(ParseError::Unterminated {
                    what: "regular expression",
                    offset: start,
                })
            }
            Some(b'\\') => i += 2,
            Some(b'[') => {
                in_class = true;
                i += 1;
            }
            Some(b']') => {
                in_class = false;
                i += 1;
            }
            Some(b'/') if !in_class => {
                i += 1;
                break;
            }
            Some(_) => i += 1,
        }
    }
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
        i += 1;
    }
    Ok(i)
}
