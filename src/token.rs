//! Normalized token model shared by all language tokenizers.
//!
//! Tokenizers lex source text into [`NormalizedToken`]s, each carrying two
//! 32-bit hashes:
//!
//! - **original hash**: xxh32 of the exact lexeme bytes. Two tokens with the
//!   same original hash are byte-identical (collision probability of the
//!   hash is treated as negligible).
//! - **normalized hash**: a fixed per-category placeholder for identifiers,
//!   string literals, number literals and type names; equal to the original
//!   hash for keywords, operators and punctuation.
//!
//! Indexing windows of normalized hashes makes renamed code (Type-2 clones)
//! collide onto identical window hashes, while the original hashes remain
//! available to distinguish exact copies (Type-1) from renames.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh32::xxh32;

// =============================================================================
// TOKEN TYPES
// =============================================================================

/// Classification of a normalized token.
///
/// `Newline`, `Indent` and `Dedent` are structural: they describe layout
/// rather than content and are excluded from window hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Variable/function names, normalized to a shared placeholder.
    Identifier,
    /// String values (including template literals, regexes, chars).
    StringLiteral,
    /// Numeric values of any base.
    NumberLiteral,
    /// Language keywords (if, for, while, def, ...); keep their hash.
    Keyword,
    /// Operators (+, -, ==, &&, ...); keep their hash.
    Operator,
    /// Punctuation ({, }, (, ), comma, ...); keep their hash.
    Punctuation,
    /// Built-in type names, normalized to a shared placeholder.
    TypeName,
    /// Logical line separator (indentation-significant languages).
    Newline,
    /// Indentation increase (indentation-significant languages).
    Indent,
    /// Indentation decrease (indentation-significant languages).
    Dedent,
    /// Unrecognized input.
    Unknown,
}

impl TokenType {
    /// Structural tokens describe layout, not content, and are stripped
    /// before window hashing.
    #[must_use]
    pub fn is_structural(self) -> bool {
        matches!(self, Self::Newline | Self::Indent | Self::Dedent)
    }

    /// Human-readable name for debugging output.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Identifier => "identifier",
            Self::StringLiteral => "string_literal",
            Self::NumberLiteral => "number_literal",
            Self::Keyword => "keyword",
            Self::Operator => "operator",
            Self::Punctuation => "punctuation",
            Self::TypeName => "type_name",
            Self::Newline => "newline",
            Self::Indent => "indent",
            Self::Dedent => "dedent",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// HASHING
// =============================================================================

/// Hash the exact bytes of a lexeme.
#[inline]
#[must_use]
pub fn hash_lexeme(bytes: &[u8]) -> u32 {
    xxh32(bytes, 0)
}

/// Placeholder hash for a normalizable token category.
///
/// Every identifier shares one hash, every string literal another, and so
/// on. Categories that are not normalized map to 0 (callers never use the
/// placeholder for those).
#[inline]
#[must_use]
pub fn placeholder_hash(ty: TokenType) -> u32 {
    match ty {
        TokenType::Identifier => hash_lexeme(b"$ID"),
        TokenType::StringLiteral => hash_lexeme(b"$STR"),
        TokenType::NumberLiteral => hash_lexeme(b"$NUM"),
        TokenType::TypeName => hash_lexeme(b"$TYPE"),
        _ => 0,
    }
}

// =============================================================================
// NORMALIZED TOKENS
// =============================================================================

/// A single token produced by a language tokenizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizedToken {
    /// Token classification.
    pub ty: TokenType,
    /// xxh32 of the exact lexeme bytes (Type-1 comparison).
    pub original_hash: u32,
    /// Per-category placeholder, or the original hash for structural
    /// lexemes (Type-2 comparison).
    pub normalized_hash: u32,
    /// 1-based source line.
    pub line: u32,
    /// 1-based source column (in bytes).
    pub column: u32,
    /// Lexeme length in bytes.
    pub length: u32,
}

impl NormalizedToken {
    /// Build a token whose normalized hash is the category placeholder.
    #[must_use]
    pub fn normalized(ty: TokenType, lexeme: &[u8], line: u32, column: u32, length: u32) -> Self {
        Self {
            ty,
            original_hash: hash_lexeme(lexeme),
            normalized_hash: placeholder_hash(ty),
            line,
            column,
            length,
        }
    }

    /// Build a token that keeps its original hash as the normalized hash
    /// (keywords, operators, punctuation, structural tokens).
    #[must_use]
    pub fn verbatim(ty: TokenType, lexeme: &[u8], line: u32, column: u32, length: u32) -> Self {
        let hash = hash_lexeme(lexeme);
        Self {
            ty,
            original_hash: hash,
            normalized_hash: hash,
            line,
            column,
            length,
        }
    }
}

/// Result of tokenizing one source file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenizedFile {
    /// Path the source came from (set by the caller; tokenizers only see
    /// bytes).
    pub path: PathBuf,
    /// Tokens in source order, structural tokens included.
    pub tokens: Vec<NormalizedToken>,
    /// Total lines in the file.
    pub total_lines: u32,
    /// Lines containing at least one non-comment token.
    pub code_lines: u32,
    /// Empty or whitespace-only lines.
    pub blank_lines: u32,
    /// Lines containing only comment content.
    pub comment_lines: u32,
}

impl TokenizedFile {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// The significant token sequence: all tokens with structural ones
    /// (newline/indent/dedent) removed.
    ///
    /// All clone coordinates (`token_start`, `token_count`) index this
    /// sequence; its elements are real source tokens, so line/column
    /// information stays exact.
    #[must_use]
    pub fn significant(&self) -> Vec<NormalizedToken> {
        self.tokens
            .iter()
            .filter(|t| !t.ty.is_structural())
            .copied()
            .collect()
    }
}

// =============================================================================
// SHARED LEXER STATE
// =============================================================================

/// Byte cursor over source text with line/column tracking.
///
/// All tokenizers scan bytes; non-ASCII bytes only ever appear inside
/// strings and comments (where they are consumed blindly) or are skipped
/// as unknown input. Columns count bytes, which keeps the cursor total on
/// arbitrary input.
pub(crate) struct Cursor<'a> {
    src: &'a [u8],
    pub pos: usize,
    pub line: u32,
    pub column: u32,
    /// True until a non-whitespace byte has been consumed on the current
    /// line. Used for indentation handling and preprocessor detection.
    pub at_line_start: bool,
}

impl<'a> Cursor<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            src: source.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
            at_line_start: true,
        }
    }

    #[inline]
    pub fn eof(&self) -> bool {
        self.pos >= self.src.len()
    }

    #[inline]
    pub fn peek(&self) -> u8 {
        self.src.get(self.pos).copied().unwrap_or(0)
    }

    #[inline]
    pub fn peek_next(&self) -> u8 {
        self.src.get(self.pos + 1).copied().unwrap_or(0)
    }

    #[inline]
    pub fn peek_at(&self, offset: usize) -> u8 {
        self.src.get(self.pos + offset).copied().unwrap_or(0)
    }

    /// Consume one byte, maintaining line/column and the line-start flag.
    pub fn advance(&mut self) -> u8 {
        let c = self.peek();
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
            self.column = 1;
            self.at_line_start = true;
        } else {
            self.column += 1;
            if c != b' ' && c != b'\t' {
                self.at_line_start = false;
            }
        }
        c
    }

    /// Slice of the remaining input.
    #[inline]
    pub fn rest(&self) -> &'a [u8] {
        &self.src[self.pos.min(self.src.len())..]
    }
}

/// Per-line code/comment/blank accounting shared by all tokenizers.
///
/// Exactly one of the three counters is incremented per source line: code
/// wins over comment, comment over blank.
#[derive(Default)]
pub(crate) struct LineTally {
    pub code_lines: u32,
    pub blank_lines: u32,
    pub comment_lines: u32,
    current_line: u32,
    pub line_has_code: bool,
    pub line_has_comment: bool,
}

impl LineTally {
    /// Flush the previous line's flags when the cursor reaches a new line.
    pub fn observe(&mut self, line: u32) {
        if line != self.current_line {
            if self.current_line > 0 {
                self.bump();
            }
            self.current_line = line;
            self.line_has_code = false;
            self.line_has_comment = false;
        }
    }

    /// Flush the final line and write the totals into `file`.
    pub fn finish(mut self, cursor: &Cursor<'_>, source: &str, file: &mut TokenizedFile) {
        if self.current_line > 0 {
            self.bump();
        }

        // If the source ends with a newline the cursor has already advanced
        // past the last real line; an empty source has no lines at all.
        file.total_lines = if source.is_empty() {
            0
        } else if cursor.column == 1 && cursor.line > 1 {
            cursor.line - 1
        } else {
            cursor.line
        };
        file.code_lines = self.code_lines;
        file.blank_lines = self.blank_lines;
        file.comment_lines = self.comment_lines;
    }

    fn bump(&mut self) {
        if self.line_has_code {
            self.code_lines += 1;
        } else if self.line_has_comment {
            self.comment_lines += 1;
        } else {
            self.blank_lines += 1;
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
