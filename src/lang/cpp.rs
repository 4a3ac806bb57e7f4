//! C/C++ tokenizer and normalizer.
//!
//! Handles the combined C and C++ keyword sets (including C++11..20
//! additions), raw strings `R"delim(...)delim"`, wide/u8/u16/u32 string and
//! char prefixes, digit separators (`1'000'000`), numeric suffixes, and
//! preprocessor lines.
//!
//! Preprocessor directives are dropped entirely after marking the line as
//! code: `#include` and `#define` blocks repeat across files and would
//! otherwise dominate the clone index with noise.

use fxhash::FxHashSet;
use once_cell::sync::Lazy;

use crate::token::{
    hash_lexeme, placeholder_hash, Cursor, LineTally, NormalizedToken, TokenType, TokenizedFile,
};

static KEYWORDS: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    [
        // Control flow
        "break", "case", "continue", "default", "do", "else", "for", "goto", "if", "return",
        "switch", "while",
        // Types and declarations
        "auto", "char", "const", "double", "enum", "extern", "float", "inline", "int", "long",
        "register", "short", "signed", "sizeof", "static", "struct", "typedef", "union",
        "unsigned", "void", "volatile",
        // C++
        "alignas", "alignof", "and", "and_eq", "asm", "bitand", "bitor", "bool", "catch", "class",
        "compl", "const_cast", "delete", "dynamic_cast", "explicit", "export", "false", "friend",
        "mutable", "namespace", "new", "not", "not_eq", "operator", "or", "or_eq", "private",
        "protected", "public", "reinterpret_cast", "static_cast", "template", "this", "throw",
        "true", "try", "typeid", "typename", "using", "virtual", "wchar_t", "xor", "xor_eq",
    ]
    .into_iter()
    .collect()
});

static MODERN_KEYWORDS: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    [
        "char8_t", "char16_t", "char32_t", "concept", "consteval", "constexpr", "constinit",
        "co_await", "co_return", "co_yield", "decltype", "final", "noexcept", "nullptr",
        "override", "requires", "static_assert", "thread_local",
    ]
    .into_iter()
    .collect()
});

static BUILTIN_TYPES: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    [
        "int8_t",
        "int16_t",
        "int32_t",
        "int64_t",
        "uint8_t",
        "uint16_t",
        "uint32_t",
        "uint64_t",
        "size_t",
        "ptrdiff_t",
        "intptr_t",
        "uintptr_t",
        "string",
        "wstring",
        "string_view",
        "vector",
        "array",
        "list",
        "deque",
        "forward_list",
        "set",
        "map",
        "multiset",
        "multimap",
        "unordered_set",
        "unordered_map",
        "unordered_multiset",
        "unordered_multimap",
        "stack",
        "queue",
        "priority_queue",
        "pair",
        "tuple",
        "optional",
        "variant",
        "any",
        "unique_ptr",
        "shared_ptr",
        "weak_ptr",
        "function",
        "bind",
        "reference_wrapper",
        "thread",
        "mutex",
        "condition_variable",
        "future",
        "promise",
        "atomic",
        "atomic_flag",
    ]
    .into_iter()
    .collect()
});

const THREE_CHAR_OPS: &[&[u8]] = &[b"<<=", b">>=", b"<=>", b"->*", b"..."];

const TWO_CHAR_OPS: &[&[u8]] = &[
    b"==", b"!=", b"<=", b">=", b"+=", b"-=", b"*=", b"/=", b"%=", b"&=", b"|=", b"^=", b"++",
    b"--", b"&&", b"||", b"<<", b">>", b"->", b"::", b".*", b"##",
];

/// Tokenize C or C++ source.
#[must_use]
pub fn tokenize(source: &str) -> TokenizedFile {
    let mut file = TokenizedFile::default();
    let mut cur = Cursor::new(source);
    let mut tally = LineTally::default();

    while !cur.eof() {
        tally.observe(cur.line);
        let c = cur.peek();

        if c == b' ' || c == b'\t' || c == b'\r' || c == b'\n' {
            cur.advance();
            continue;
        }

        // Preprocessor line: dropped, but counted as code.
        if c == b'#' && cur.at_line_start {
            tally.line_has_code = true;
            skip_preprocessor(&mut cur);
            continue;
        }

        if c == b'/' && cur.peek_next() == b'/' {
            tally.line_has_comment = true;
            while !cur.eof() && cur.peek() != b'\n' {
                cur.advance();
            }
            continue;
        }

        if c == b'/' && cur.peek_next() == b'*' {
            tally.line_has_comment = true;
            skip_block_comment(&mut cur);
            continue;
        }

        // Raw string literal.
        if c == b'R' && cur.peek_next() == b'"' {
            tally.line_has_code = true;
            file.tokens.push(parse_raw_string(&mut cur));
            continue;
        }

        // String literals, including L/u/U/u8 prefixes.
        if c == b'"'
            || (matches!(c, b'L' | b'u' | b'U') && cur.peek_next() == b'"')
            || (c == b'u' && cur.peek_next() == b'8' && cur.peek_at(2) == b'"')
        {
            tally.line_has_code = true;
            file.tokens.push(parse_string(&mut cur));
            continue;
        }

        // Character literals, same prefixes.
        if c == b'\''
            || (matches!(c, b'L' | b'u' | b'U') && cur.peek_next() == b'\'')
            || (c == b'u' && cur.peek_next() == b'8' && cur.peek_at(2) == b'\'')
        {
            tally.line_has_code = true;
            file.tokens.push(parse_char(&mut cur));
            continue;
        }

        if c.is_ascii_digit() || (c == b'.' && cur.peek_next().is_ascii_digit()) {
            tally.line_has_code = true;
            file.tokens.push(parse_number(&mut cur));
            continue;
        }

        if c.is_ascii_alphabetic() || c == b'_' {
            tally.line_has_code = true;
            file.tokens.push(parse_identifier_or_keyword(&mut cur));
            continue;
        }

        if is_operator_byte(c) {
            tally.line_has_code = true;
            file.tokens.push(parse_operator(&mut cur));
            continue;
        }

        // Unknown byte - skip.
        cur.advance();
    }

    tally.finish(&cur, source, &mut file);
    file
}

/// Skip to end of line, honoring backslash line continuations.
fn skip_preprocessor(cur: &mut Cursor<'_>) {
    cur.advance(); // #
    while !cur.eof() {
        let c = cur.peek();
        if c == b'\n' {
            // The main loop consumes the newline.
            return;
        }
        if c == b'\\' {
            cur.advance();
            if !cur.eof() && cur.peek() == b'\n' {
                cur.advance();
            }
            continue;
        }
        cur.advance();
    }
}

fn skip_block_comment(cur: &mut Cursor<'_>) {
    cur.advance(); // /
    cur.advance(); // *
    while !cur.eof() {
        if cur.peek() == b'*' && cur.peek_next() == b'/' {
            cur.advance();
            cur.advance();
            break;
        }
        cur.advance();
    }
}

fn parse_string(cur: &mut Cursor<'_>) -> NormalizedToken {
    let line = cur.line;
    let column = cur.column;
    let start_pos = cur.pos;

    skip_literal_prefix(cur);
    cur.advance(); // opening "

    let mut value: Vec<u8> = Vec::new();
    while !cur.eof() {
        let c = cur.peek();

        if c == b'"' {
            cur.advance();
            break;
        }
        if c == b'\n' {
            // Unterminated string ends at the line break.
            break;
        }
        if c == b'\\' {
            cur.advance();
            if !cur.eof() {
                cur.advance();
            }
            continue;
        }

        value.push(c);
        cur.advance();
    }

    NormalizedToken {
        ty: TokenType::StringLiteral,
        original_hash: hash_lexeme(&value),
        normalized_hash: placeholder_hash(TokenType::StringLiteral),
        line,
        column,
        length: (cur.pos - start_pos) as u32,
    }
}

/// Raw string `R"delim( ... )delim"`: no escape processing at all.
fn parse_raw_string(cur: &mut Cursor<'_>) -> NormalizedToken {
    let line = cur.line;
    let column = cur.column;
    let start_pos = cur.pos;

    cur.advance(); // R
    cur.advance(); // "

    let mut delimiter: Vec<u8> = Vec::new();
    while !cur.eof() && cur.peek() != b'(' {
        delimiter.push(cur.advance());
    }
    if !cur.eof() {
        cur.advance(); // (
    }

    let mut end_marker: Vec<u8> = Vec::with_capacity(delimiter.len() + 2);
    end_marker.push(b')');
    end_marker.extend_from_slice(&delimiter);
    end_marker.push(b'"');

    let mut value: Vec<u8> = Vec::new();
    while !cur.eof() {
        if cur.rest().starts_with(&end_marker) {
            for _ in 0..end_marker.len() {
                cur.advance();
            }
            break;
        }
        value.push(cur.advance());
    }

    NormalizedToken {
        ty: TokenType::StringLiteral,
        original_hash: hash_lexeme(&value),
        normalized_hash: placeholder_hash(TokenType::StringLiteral),
        line,
        column,
        length: (cur.pos - start_pos) as u32,
    }
}

/// Character literals normalize like strings.
fn parse_char(cur: &mut Cursor<'_>) -> NormalizedToken {
    let line = cur.line;
    let column = cur.column;
    let start_pos = cur.pos;

    skip_literal_prefix(cur);
    cur.advance(); // opening '

    let mut value: Vec<u8> = Vec::new();
    while !cur.eof() && cur.peek() != b'\'' {
        let c = cur.peek();
        if c == b'\n' {
            break;
        }
        if c == b'\\' {
            cur.advance();
            if !cur.eof() {
                value.push(cur.advance());
            }
            continue;
        }
        value.push(cur.advance());
    }
    if !cur.eof() {
        cur.advance(); // closing '
    }

    NormalizedToken {
        ty: TokenType::StringLiteral,
        original_hash: hash_lexeme(&value),
        normalized_hash: placeholder_hash(TokenType::StringLiteral),
        line,
        column,
        length: (cur.pos - start_pos) as u32,
    }
}

/// Consume an L / u / U / u8 literal prefix if present.
fn skip_literal_prefix(cur: &mut Cursor<'_>) {
    match cur.peek() {
        b'L' | b'U' => {
            cur.advance();
        }
        b'u' => {
            cur.advance();
            if cur.peek() == b'8' {
                cur.advance();
            }
        }
        _ => {}
    }
}

fn parse_number(cur: &mut Cursor<'_>) -> NormalizedToken {
    let line = cur.line;
    let column = cur.column;
    let start_pos = cur.pos;
    let mut value: Vec<u8> = Vec::new();

    // Radix prefixes; C++14 digit separator is a single quote.
    if cur.peek() == b'0' {
        match cur.peek_next() {
            b'x' | b'X' => {
                value.push(cur.advance());
                value.push(cur.advance());
                while !cur.eof() && (cur.peek().is_ascii_hexdigit() || cur.peek() == b'\'') {
                    if cur.peek() != b'\'' {
                        value.push(cur.peek());
                    }
                    cur.advance();
                }
            }
            b'b' | b'B' => {
                value.push(cur.advance());
                value.push(cur.advance());
                while !cur.eof() && matches!(cur.peek(), b'0' | b'1' | b'\'') {
                    if cur.peek() != b'\'' {
                        value.push(cur.peek());
                    }
                    cur.advance();
                }
            }
            b'0'..=b'7' => {
                value.push(cur.advance());
                while !cur.eof() && ((b'0'..=b'7').contains(&cur.peek()) || cur.peek() == b'\'') {
                    if cur.peek() != b'\'' {
                        value.push(cur.peek());
                    }
                    cur.advance();
                }
            }
            _ => {
                value.push(cur.advance());
            }
        }
    }

    // Integer part.
    if value.is_empty() {
        while !cur.eof() && (cur.peek().is_ascii_digit() || cur.peek() == b'\'') {
            if cur.peek() != b'\'' {
                value.push(cur.peek());
            }
            cur.advance();
        }
    }

    // Decimal part.
    if cur.peek() == b'.'
        && (cur.peek_next().is_ascii_digit() || matches!(cur.peek_next(), b'e' | b'E'))
    {
        value.push(cur.advance());
        while !cur.eof() && (cur.peek().is_ascii_digit() || cur.peek() == b'\'') {
            if cur.peek() != b'\'' {
                value.push(cur.peek());
            }
            cur.advance();
        }
    }

    // Exponent part.
    if matches!(cur.peek(), b'e' | b'E') {
        value.push(cur.advance());
        if matches!(cur.peek(), b'+' | b'-') {
            value.push(cur.advance());
        }
        while !cur.eof() && (cur.peek().is_ascii_digit() || cur.peek() == b'\'') {
            if cur.peek() != b'\'' {
                value.push(cur.peek());
            }
            cur.advance();
        }
    }

    // Suffixes (u, l, ll, ul, ull, f); not hashed, like separators.
    while !cur.eof() && matches!(cur.peek(), b'u' | b'U' | b'l' | b'L' | b'f' | b'F') {
        cur.advance();
    }

    NormalizedToken {
        ty: TokenType::NumberLiteral,
        original_hash: hash_lexeme(&value),
        normalized_hash: placeholder_hash(TokenType::NumberLiteral),
        line,
        column,
        length: (cur.pos - start_pos) as u32,
    }
}

fn parse_identifier_or_keyword(cur: &mut Cursor<'_>) -> NormalizedToken {
    let line = cur.line;
    let column = cur.column;
    let start_pos = cur.pos;
    let rest = cur.rest();

    while !cur.eof() && (cur.peek().is_ascii_alphanumeric() || cur.peek() == b'_') {
        cur.advance();
    }

    let lexeme = &rest[..cur.pos - start_pos];
    let length = lexeme.len() as u32;
    let text = std::str::from_utf8(lexeme).unwrap_or("");

    if KEYWORDS.contains(text) || MODERN_KEYWORDS.contains(text) {
        NormalizedToken::verbatim(TokenType::Keyword, lexeme, line, column, length)
    } else if BUILTIN_TYPES.contains(text) {
        NormalizedToken::normalized(TokenType::TypeName, lexeme, line, column, length)
    } else {
        NormalizedToken::normalized(TokenType::Identifier, lexeme, line, column, length)
    }
}

fn parse_operator(cur: &mut Cursor<'_>) -> NormalizedToken {
    let line = cur.line;
    let column = cur.column;
    let rest = cur.rest();

    let len = if THREE_CHAR_OPS.iter().any(|op| rest.starts_with(op)) {
        3
    } else if TWO_CHAR_OPS.iter().any(|op| rest.starts_with(op)) {
        2
    } else {
        1
    };

    let lexeme = &rest[..len];
    for _ in 0..len {
        cur.advance();
    }

    let ty = if is_punctuation(lexeme) {
        TokenType::Punctuation
    } else {
        TokenType::Operator
    };
    NormalizedToken::verbatim(ty, lexeme, line, column, len as u32)
}

fn is_operator_byte(c: u8) -> bool {
    matches!(
        c,
        b'+' | b'-'
            | b'*'
            | b'/'
            | b'%'
            | b'='
            | b'<'
            | b'>'
            | b'!'
            | b'&'
            | b'|'
            | b'^'
            | b'~'
            | b'?'
            | b':'
            | b'('
            | b')'
            | b'['
            | b']'
            | b'{'
            | b'}'
            | b','
            | b';'
            | b'.'
            | b'#'
    )
}

fn is_punctuation(op: &[u8]) -> bool {
    matches!(
        op,
        b"(" | b")" | b"[" | b"]" | b"{" | b"}" | b"," | b":" | b";" | b"."
    )
}
