//! JavaScript/TypeScript tokenizer and normalizer.
//!
//! One tokenizer serves both languages: the TypeScript keyword set is a
//! superset of JavaScript's. Handles template literals with `${}`
//! interpolation, regex literals (with a may-be-regex heuristic to separate
//! them from division), `//` and `/* */` comments, and ES numeric literals
//! including the BigInt `n` suffix.

use fxhash::FxHashSet;
use once_cell::sync::Lazy;

use crate::token::{
    hash_lexeme, placeholder_hash, Cursor, LineTally, NormalizedToken, TokenType, TokenizedFile,
};

static KEYWORDS: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    [
        // Control flow
        "break", "case", "catch", "continue", "debugger", "default", "do", "else", "finally",
        "for", "if", "return", "switch", "throw", "try", "while", "with",
        // Declarations
        "class", "const", "function", "let", "var",
        // Expressions
        "delete", "in", "instanceof", "new", "of", "this", "typeof", "void",
        // Values
        "false", "null", "true", "undefined",
        // Async
        "async", "await", "yield",
        // Modules
        "export", "import", "from", "as",
        // Classes
        "extends", "static", "super", "get", "set",
        // Reserved
        "enum", "implements", "interface", "package", "private", "protected", "public",
    ]
    .into_iter()
    .collect()
});

static TS_KEYWORDS: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    [
        "abstract", "any", "asserts", "bigint", "boolean", "declare", "infer", "is", "keyof",
        "module", "namespace", "never", "number", "object", "readonly", "require", "string",
        "symbol", "type", "unique", "unknown",
    ]
    .into_iter()
    .collect()
});

static BUILTIN_TYPES: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    [
        "Array",
        "Boolean",
        "Date",
        "Error",
        "Function",
        "JSON",
        "Map",
        "Math",
        "Number",
        "Object",
        "Promise",
        "RegExp",
        "Set",
        "String",
        "Symbol",
        "WeakMap",
        "WeakSet",
        "BigInt",
        "ArrayBuffer",
        "DataView",
        "Float32Array",
        "Float64Array",
        "Int8Array",
        "Int16Array",
        "Int32Array",
        "Uint8Array",
        "Uint16Array",
        "Uint32Array",
        "Uint8ClampedArray",
    ]
    .into_iter()
    .collect()
});

const FOUR_CHAR_OPS: &[&[u8]] = &[b">>>="];

const THREE_CHAR_OPS: &[&[u8]] = &[
    b"===", b"!==", b">>>", b"...", b"<<=", b">>=", b"**=", b"&&=", b"||=", b"??=",
];

const TWO_CHAR_OPS: &[&[u8]] = &[
    b"==", b"!=", b"<=", b">=", b"+=", b"-=", b"*=", b"/=", b"%=", b"&=", b"|=", b"^=", b"**",
    b"++", b"--", b"&&", b"||", b"??", b"?.", b"=>", b"<<", b">>",
];

/// Tokenize JavaScript or TypeScript source.
#[must_use]
pub fn tokenize(source: &str) -> TokenizedFile {
    let mut file = TokenizedFile::default();
    let mut cur = Cursor::new(source);
    let mut tally = LineTally::default();
    // A leading `/` can only start a regex in expression position: at the
    // start of input, after an operator/punctuation, or after a keyword.
    let mut may_be_regex = true;

    while !cur.eof() {
        tally.observe(cur.line);
        let c = cur.peek();

        if c == b' ' || c == b'\t' || c == b'\r' {
            cur.advance();
            continue;
        }

        if c == b'\n' {
            cur.advance();
            may_be_regex = true;
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

        if c == b'/' && may_be_regex {
            tally.line_has_code = true;
            file.tokens.push(parse_regex(&mut cur));
            may_be_regex = false;
            continue;
        }

        if c == b'"' || c == b'\'' {
            tally.line_has_code = true;
            file.tokens.push(parse_string(&mut cur));
            may_be_regex = false;
            continue;
        }

        if c == b'`' {
            tally.line_has_code = true;
            file.tokens.push(parse_template_literal(&mut cur));
            may_be_regex = false;
            continue;
        }

        if c.is_ascii_digit() || (c == b'.' && cur.peek_next().is_ascii_digit()) {
            tally.line_has_code = true;
            file.tokens.push(parse_number(&mut cur));
            may_be_regex = false;
            continue;
        }

        if is_identifier_start(c) {
            tally.line_has_code = true;
            let tok = parse_identifier_or_keyword(&mut cur);
            // `return /re/` and friends: regex may follow a keyword.
            may_be_regex = tok.ty == TokenType::Keyword;
            file.tokens.push(tok);
            continue;
        }

        if is_operator_byte(c) {
            tally.line_has_code = true;
            let tok = parse_operator(&mut cur);
            may_be_regex =
                tok.ty == TokenType::Punctuation || tok.ty == TokenType::Operator;
            file.tokens.push(tok);
            continue;
        }

        // Unknown byte - skip.
        cur.advance();
    }

    tally.finish(&cur, source, &mut file);
    file
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

    let quote = cur.advance();
    let start_pos = cur.pos;
    let mut value: Vec<u8> = Vec::new();

    while !cur.eof() {
        let c = cur.peek();

        if c == quote {
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
        length: (cur.pos - start_pos + 1) as u32,
    }
}

/// Template literal. Interpolation bodies `${...}` are consumed with brace
/// depth tracking and excluded from the literal's hash value.
fn parse_template_literal(cur: &mut Cursor<'_>) -> NormalizedToken {
    let line = cur.line;
    let column = cur.column;

    cur.advance(); // `
    let start_pos = cur.pos;
    let mut value: Vec<u8> = Vec::new();
    let mut brace_depth = 0u32;

    while !cur.eof() {
        let c = cur.peek();

        if c == b'`' && brace_depth == 0 {
            cur.advance();
            break;
        }

        if c == b'$' && cur.peek_next() == b'{' {
            cur.advance();
            cur.advance();
            brace_depth += 1;
            continue;
        }
        if c == b'{' && brace_depth > 0 {
            brace_depth += 1;
            cur.advance();
            continue;
        }
        if c == b'}' && brace_depth > 0 {
            brace_depth -= 1;
            cur.advance();
            continue;
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
        length: (cur.pos - start_pos + 1) as u32,
    }
}

/// Regex literal. If a newline is hit before the closing `/`, the slash was
/// a division operator after all and is returned as one.
fn parse_regex(cur: &mut Cursor<'_>) -> NormalizedToken {
    let line = cur.line;
    let column = cur.column;

    cur.advance(); // /
    let start_pos = cur.pos;
    let mut value: Vec<u8> = Vec::new();
    let mut in_char_class = false;

    while !cur.eof() {
        let c = cur.peek();

        if c == b'\n' {
            return NormalizedToken::verbatim(TokenType::Operator, b"/", line, column, 1);
        }

        if c == b'\\' {
            value.push(cur.advance());
            if !cur.eof() {
                value.push(cur.advance());
            }
            continue;
        }

        if c == b'[' {
            in_char_class = true;
        } else if c == b']' {
            in_char_class = false;
        }

        if c == b'/' && !in_char_class {
            cur.advance();
            break;
        }

        value.push(c);
        cur.advance();
    }

    // Flags (g, i, m, ...).
    while !cur.eof() && is_identifier_char(cur.peek()) {
        cur.advance();
    }

    NormalizedToken {
        ty: TokenType::StringLiteral,
        original_hash: hash_lexeme(&value),
        normalized_hash: placeholder_hash(TokenType::StringLiteral),
        line,
        column,
        length: (cur.pos - start_pos + 1) as u32,
    }
}

fn parse_number(cur: &mut Cursor<'_>) -> NormalizedToken {
    let line = cur.line;
    let column = cur.column;
    let start_pos = cur.pos;
    let mut value: Vec<u8> = Vec::new();

    let is_special = parse_radix_prefix(cur, &mut value);

    if !is_special {
        // Integer part; a bare leading zero is consumed alone.
        if cur.peek() == b'0' {
            value.push(cur.advance());
        } else {
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
    }

    // BigInt suffix.
    if cur.peek() == b'n' {
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

/// Consume a 0x/0b/0o radix literal if present. Returns true on a match.
fn parse_radix_prefix(cur: &mut Cursor<'_>, value: &mut Vec<u8>) -> bool {
    if cur.peek() != b'0' {
        return false;
    }
    let digits: fn(u8) -> bool = match cur.peek_next() {
        b'x' | b'X' => |c: u8| c.is_ascii_hexdigit(),
        b'b' | b'B' => |c: u8| c == b'0' || c == b'1',
        b'o' | b'O' => |c: u8| (b'0'..=b'7').contains(&c),
        _ => return false,
    };

    value.push(cur.advance()); // 0
    value.push(cur.advance()); // x/b/o
    while !cur.eof() && (digits(cur.peek()) || cur.peek() == b'_') {
        if cur.peek() != b'_' {
            value.push(cur.peek());
        }
        cur.advance();
    }
    true
}

fn parse_identifier_or_keyword(cur: &mut Cursor<'_>) -> NormalizedToken {
    let line = cur.line;
    let column = cur.column;
    let start_pos = cur.pos;
    let rest = cur.rest();

    while !cur.eof() && is_identifier_char(cur.peek()) {
        cur.advance();
    }

    let lexeme = &rest[..cur.pos - start_pos];
    let length = lexeme.len() as u32;
    let text = std::str::from_utf8(lexeme).unwrap_or("");

    if KEYWORDS.contains(text) || TS_KEYWORDS.contains(text) {
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

    let len = if FOUR_CHAR_OPS.iter().any(|op| rest.starts_with(op)) {
        4
    } else if THREE_CHAR_OPS.iter().any(|op| rest.starts_with(op)) {
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

fn is_identifier_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_' || c == b'$'
}

fn is_identifier_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_' || c == b'$'
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
            | b'@'
    )
}

fn is_punctuation(op: &[u8]) -> bool {
    matches!(
        op,
        b"(" | b")" | b"[" | b"]" | b"{" | b"}" | b"," | b":" | b";" | b"."
    )
}
