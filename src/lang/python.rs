//! Python tokenizer and normalizer.
//!
//! Handles Python 3 keywords, operators, string literals (single, double,
//! triple-quoted, f/r/b prefixes), numbers (int, float, hex, binary, octal,
//! complex), `#` comments, and significant indentation.
//!
//! Indentation is tracked with a stack: an increase emits one `Indent`
//! token, a decrease emits one `Dedent` per closed level. Tabs advance to
//! the next multiple of 8 columns. Indent/dedent/newline tokens are
//! structural and excluded from window hashing downstream.

use fxhash::FxHashSet;
use once_cell::sync::Lazy;

use crate::token::{
    hash_lexeme, placeholder_hash, Cursor, LineTally, NormalizedToken, TokenType, TokenizedFile,
};

static KEYWORDS: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    [
        "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
        "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
        "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return",
        "try", "while", "with", "yield",
    ]
    .into_iter()
    .collect()
});

/// Built-in types get their own placeholder so `int x` and `float x` stay
/// distinguishable from renamed identifiers.
static BUILTIN_TYPES: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    [
        "int",
        "float",
        "str",
        "bool",
        "list",
        "dict",
        "set",
        "tuple",
        "bytes",
        "bytearray",
        "complex",
        "frozenset",
        "object",
        "type",
        "range",
        "slice",
        "memoryview",
        "property",
        "classmethod",
        "staticmethod",
        "super",
    ]
    .into_iter()
    .collect()
});

const THREE_CHAR_OPS: &[&[u8]] = &[b"...", b"<<=", b">>=", b"**=", b"//="];

const TWO_CHAR_OPS: &[&[u8]] = &[
    b"==", b"!=", b"<=", b">=", b"+=", b"-=", b"*=", b"/=", b"%=", b"&=", b"|=", b"^=", b"**",
    b"//", b"<<", b">>", b"->", b"@=",
];

/// Tokenize Python source into a normalized token stream.
#[must_use]
pub fn tokenize(source: &str) -> TokenizedFile {
    let mut file = TokenizedFile::default();
    let mut cur = Cursor::new(source);
    let mut tally = LineTally::default();
    let mut indent_stack: Vec<usize> = vec![0];

    while !cur.eof() {
        tally.observe(cur.line);

        let mut c = cur.peek();

        // Indentation handling at line start. Blank and comment-only lines
        // do not affect the indent stack.
        if cur.at_line_start && c != b'\n' && c != b'#' {
            let mut indent = 0usize;
            while !cur.eof() && (cur.peek() == b' ' || cur.peek() == b'\t') {
                if cur.peek() == b'\t' {
                    indent += 8 - (indent % 8);
                } else {
                    indent += 1;
                }
                cur.advance();
            }

            if !cur.eof() && cur.peek() != b'\n' && cur.peek() != b'#' {
                emit_indentation(&mut indent_stack, &mut file.tokens, cur.line, indent);
            }
            cur.at_line_start = false;

            if cur.eof() {
                break;
            }
            c = cur.peek();
        }

        // Whitespace within a line.
        if c == b' ' || c == b'\t' || c == b'\r' {
            cur.advance();
            continue;
        }

        // Newline: emit one structural token per run of line breaks.
        if c == b'\n' {
            if file.tokens.last().is_some_and(|t| t.ty != TokenType::Newline) {
                file.tokens.push(NormalizedToken::verbatim(
                    TokenType::Newline,
                    b"\n",
                    cur.line,
                    cur.column,
                    1,
                ));
            }
            cur.advance();
            continue;
        }

        // Comments run to end of line.
        if c == b'#' {
            tally.line_has_comment = true;
            while !cur.eof() && cur.peek() != b'\n' {
                cur.advance();
            }
            continue;
        }

        // String literals.
        if c == b'"' || c == b'\'' {
            tally.line_has_code = true;
            let tok = parse_string(&mut cur);
            file.tokens.push(tok);
            continue;
        }

        // f"", r"", b"" prefixed strings.
        if matches!(c, b'f' | b'F' | b'r' | b'R' | b'b' | b'B')
            && matches!(cur.peek_next(), b'"' | b'\'')
        {
            tally.line_has_code = true;
            cur.advance();
            let tok = parse_string(&mut cur);
            file.tokens.push(tok);
            continue;
        }

        // fr"" / rf"" double-prefixed strings.
        if matches!(c, b'f' | b'F' | b'r' | b'R')
            && matches!(cur.peek_next(), b'r' | b'R' | b'f' | b'F')
            && matches!(cur.peek_at(2), b'"' | b'\'')
        {
            tally.line_has_code = true;
            cur.advance();
            cur.advance();
            let tok = parse_string(&mut cur);
            file.tokens.push(tok);
            continue;
        }

        // Numbers.
        if c.is_ascii_digit() || (c == b'.' && cur.peek_next().is_ascii_digit()) {
            tally.line_has_code = true;
            let tok = parse_number(&mut cur);
            file.tokens.push(tok);
            continue;
        }

        // Identifiers and keywords.
        if c.is_ascii_alphabetic() || c == b'_' {
            tally.line_has_code = true;
            let tok = parse_identifier_or_keyword(&mut cur);
            file.tokens.push(tok);
            continue;
        }

        // Operators and punctuation.
        if is_operator_byte(c) {
            tally.line_has_code = true;
            let tok = parse_operator(&mut cur);
            file.tokens.push(tok);
            continue;
        }

        // Unknown byte - skip.
        cur.advance();
    }

    // Close any open indentation levels at end of file.
    while indent_stack.len() > 1 {
        indent_stack.pop();
        file.tokens.push(NormalizedToken::verbatim(
            TokenType::Dedent,
            b"DEDENT",
            cur.line,
            1,
            0,
        ));
    }

    tally.finish(&cur, source, &mut file);
    file
}

fn emit_indentation(
    stack: &mut Vec<usize>,
    tokens: &mut Vec<NormalizedToken>,
    line: u32,
    current_indent: usize,
) {
    let prev = *stack.last().unwrap_or(&0);

    if current_indent > prev {
        stack.push(current_indent);
        tokens.push(NormalizedToken::verbatim(
            TokenType::Indent,
            b"INDENT",
            line,
            1,
            current_indent as u32,
        ));
    } else if current_indent < prev {
        while stack.last().is_some_and(|&top| top > current_indent) {
            stack.pop();
            tokens.push(NormalizedToken::verbatim(
                TokenType::Dedent,
                b"DEDENT",
                line,
                1,
                0,
            ));
        }
    }
}

fn parse_string(cur: &mut Cursor<'_>) -> NormalizedToken {
    let line = cur.line;
    let column = cur.column;

    let quote = cur.advance();
    let mut triple = false;

    if cur.peek() == quote && cur.peek_next() == quote {
        cur.advance();
        cur.advance();
        triple = true;
    }

    let start_pos = cur.pos;
    let mut value: Vec<u8> = Vec::new();

    while !cur.eof() {
        let c = cur.peek();

        if triple {
            if c == quote && cur.peek_next() == quote && cur.peek_at(2) == quote {
                cur.advance();
                cur.advance();
                cur.advance();
                break;
            }
        } else {
            if c == quote {
                cur.advance();
                break;
            }
            if c == b'\n' {
                // Unterminated string ends at the line break.
                break;
            }
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

    let length = (cur.pos - start_pos + if triple { 3 } else { 1 }) as u32;
    NormalizedToken {
        ty: TokenType::StringLiteral,
        original_hash: hash_lexeme(&value),
        normalized_hash: placeholder_hash(TokenType::StringLiteral),
        line,
        column,
        length,
    }
}

fn parse_number(cur: &mut Cursor<'_>) -> NormalizedToken {
    let line = cur.line;
    let column = cur.column;
    let start_pos = cur.pos;
    let mut value: Vec<u8> = Vec::new();

    // Radix prefixes: 0x, 0b, 0o.
    if cur.peek() == b'0' {
        match cur.peek_next() {
            b'x' | b'X' => {
                value.push(cur.advance());
                value.push(cur.advance());
                while !cur.eof() && (cur.peek().is_ascii_hexdigit() || cur.peek() == b'_') {
                    if cur.peek() != b'_' {
                        value.push(cur.peek());
                    }
                    cur.advance();
                }
            }
            b'b' | b'B' => {
                value.push(cur.advance());
                value.push(cur.advance());
                while !cur.eof() && matches!(cur.peek(), b'0' | b'1' | b'_') {
                    if cur.peek() != b'_' {
                        value.push(cur.peek());
                    }
                    cur.advance();
                }
            }
            b'o' | b'O' => {
                value.push(cur.advance());
                value.push(cur.advance());
                while !cur.eof() && ((b'0'..=b'7').contains(&cur.peek()) || cur.peek() == b'_') {
                    if cur.peek() != b'_' {
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
        while !cur.eof() && (cur.peek().is_ascii_digit() || cur.peek() == b'_') {
            if cur.peek() != b'_' {
                value.push(cur.peek());
            }
            cur.advance();
        }
    }

    // Decimal part.
    if cur.peek() == b'.' && cur.peek_next().is_ascii_digit() {
        value.push(cur.advance());
        while !cur.eof() && (cur.peek().is_ascii_digit() || cur.peek() == b'_') {
            if cur.peek() != b'_' {
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
        while !cur.eof() && (cur.peek().is_ascii_digit() || cur.peek() == b'_') {
            if cur.peek() != b'_' {
                value.push(cur.peek());
            }
            cur.advance();
        }
    }

    // Complex suffix.
    if matches!(cur.peek(), b'j' | b'J') {
        value.push(cur.advance());
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
    // Identifier bytes are ASCII by construction.
    let text = std::str::from_utf8(lexeme).unwrap_or("");

    if KEYWORDS.contains(text) {
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
            | b'@'
            | b'('
            | b')'
            | b'['
            | b']'
            | b'{'
            | b'}'
            | b','
            | b':'
            | b';'
            | b'.'
            | b'\\'
    )
}

fn is_punctuation(op: &[u8]) -> bool {
    matches!(
        op,
        b"(" | b")" | b"[" | b"]" | b"{" | b"}" | b"," | b":" | b";" | b"."
    )
}
