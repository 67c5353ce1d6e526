//! Tokenizer for midl schema files
//!
//! Produces a flat token vector with source line positions. Lexeme text
//! is copied into the parser's scratch arena, so tokens stay cheap and
//! everything lexed is released in one go when the parse ends.
//!
//! Literal *decoding* happens in the parser's semantic actions
//! ([`crate::parser`]), where failures can be reported against the
//! declaration being built; the lexer captures raw text, including the
//! quotes of string literals.

use crate::diag::Diagnostics;
use crate::symbol::Fundamental;
use bumpalo::Bump;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    /// Raw integer literal text, base prefix and separators included.
    Int,
    /// Raw string literal text, quotes included.
    Str,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Colon,
    Semicolon,
    Assign,
    Comma,
    KwStruct,
    KwInterface,
    KwRef,
    KwArray,
    KwSeq,
    KwOptional,
    /// A fundamental type keyword.
    Fundamental(Fundamental),
}

impl TokenKind {
    /// Whether this token can begin a top-level declaration.
    pub fn starts_decl(self) -> bool {
        matches!(
            self,
            TokenKind::KwStruct | TokenKind::KwInterface | TokenKind::KwRef
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Token<'b> {
    pub kind: TokenKind,
    pub text: &'b str,
    /// 1-indexed source line.
    pub line: usize,
}

fn keyword(word: &str) -> Option<TokenKind> {
    if let Some(f) = Fundamental::from_keyword(word) {
        return Some(TokenKind::Fundamental(f));
    }
    Some(match word {
        "struct" => TokenKind::KwStruct,
        "interface" => TokenKind::KwInterface,
        "ref" => TokenKind::KwRef,
        "array" => TokenKind::KwArray,
        "seq" => TokenKind::KwSeq,
        "optional" => TokenKind::KwOptional,
        _ => return None,
    })
}

/// Tokenizes `source`, logging lexical errors and skipping past them.
pub fn tokenize<'b>(
    source: &str,
    arena: &'b Bump,
    diags: &mut Diagnostics<'_>,
) -> Vec<Token<'b>> {
    let mut tokens = Vec::new();
    let bytes = source.as_bytes();
    let mut pos = 0usize;
    let mut line = 1usize;

    while pos < bytes.len() {
        let c = bytes[pos];

        // Whitespace
        if c == b'\n' {
            line += 1;
            pos += 1;
            continue;
        }
        if c.is_ascii_whitespace() {
            pos += 1;
            continue;
        }

        // Comments
        if c == b'/' && pos + 1 < bytes.len() {
            if bytes[pos + 1] == b'/' {
                while pos < bytes.len() && bytes[pos] != b'\n' {
                    pos += 1;
                }
                continue;
            }
            if bytes[pos + 1] == b'*' {
                let open_line = line;
                pos += 2;
                loop {
                    if pos + 1 >= bytes.len() {
                        diags.error(&format!("line {open_line}: unterminated block comment"));
                        pos = bytes.len();
                        break;
                    }
                    if bytes[pos] == b'\n' {
                        line += 1;
                    }
                    if bytes[pos] == b'*' && bytes[pos + 1] == b'/' {
                        pos += 2;
                        break;
                    }
                    pos += 1;
                }
                continue;
            }
        }

        // Identifiers and keywords
        if c.is_ascii_alphabetic() || c == b'_' {
            let start = pos;
            while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_') {
                pos += 1;
            }
            let word = &source[start..pos];
            let kind = keyword(word).unwrap_or(TokenKind::Ident);
            tokens.push(Token {
                kind,
                text: arena.alloc_str(word),
                line,
            });
            continue;
        }

        // Integer literals: capture the raw digit run, separators and
        // base prefix included; decoding validates per base later.
        if c.is_ascii_digit() {
            let start = pos;
            while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_') {
                pos += 1;
            }
            tokens.push(Token {
                kind: TokenKind::Int,
                text: arena.alloc_str(&source[start..pos]),
                line,
            });
            continue;
        }

        // String literals: raw capture including the quotes. A backslash
        // always carries the next character, so an escaped quote does not
        // terminate the literal.
        if c == b'"' {
            let start = pos;
            let open_line = line;
            pos += 1;
            let mut closed = false;
            while pos < bytes.len() {
                match bytes[pos] {
                    b'\\' => {
                        if pos + 1 < bytes.len() && bytes[pos + 1] == b'\n' {
                            line += 1;
                        }
                        pos += 2;
                    }
                    b'"' => {
                        pos += 1;
                        closed = true;
                        break;
                    }
                    b'\n' => {
                        line += 1;
                        pos += 1;
                    }
                    _ => pos += 1,
                }
            }
            if !closed {
                diags.error(&format!("line {open_line}: unterminated string literal"));
                continue;
            }
            tokens.push(Token {
                kind: TokenKind::Str,
                text: arena.alloc_str(&source[start..pos.min(bytes.len())]),
                line: open_line,
            });
            continue;
        }

        // Punctuation
        let kind = match c {
            b'(' => Some(TokenKind::LParen),
            b')' => Some(TokenKind::RParen),
            b'{' => Some(TokenKind::LBrace),
            b'}' => Some(TokenKind::RBrace),
            b':' => Some(TokenKind::Colon),
            b';' => Some(TokenKind::Semicolon),
            b'=' => Some(TokenKind::Assign),
            b',' => Some(TokenKind::Comma),
            _ => None,
        };
        match kind {
            Some(kind) => {
                tokens.push(Token {
                    kind,
                    text: arena.alloc_str(&source[pos..pos + 1]),
                    line,
                });
                pos += 1;
            }
            None => {
                diags.error(&format!(
                    "line {line}: stray character {:?}",
                    source[pos..].chars().next().unwrap_or('\u{fffd}')
                ));
                // Skip the whole (possibly multi-byte) character.
                pos += source[pos..].chars().next().map_or(1, char::len_utf8);
            }
        }
    }

    tokens
}
