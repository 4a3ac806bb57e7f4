//! Cross-language tokenizer behavior tests.

use simscan::{Language, TokenType};

// =============================================================================
// Normalization equivalences
// =============================================================================

/// Renaming every identifier must leave the normalized hash stream intact.
#[test]
fn test_rename_invariance_python() {
    let a = Language::Python.tokenize("def calc(width, height):\n    return width * height\n");
    let b = Language::Python.tokenize("def area(w, h):\n    return w * h\n");

    let norm = |f: &simscan::TokenizedFile| -> Vec<u32> {
        f.significant().iter().map(|t| t.normalized_hash).collect()
    };
    assert_eq!(norm(&a), norm(&b));

    let orig = |f: &simscan::TokenizedFile| -> Vec<u32> {
        f.significant().iter().map(|t| t.original_hash).collect()
    };
    assert_ne!(orig(&a), orig(&b));
}

#[test]
fn test_rename_invariance_typescript() {
    let a = Language::TypeScript.tokenize("const total = price * count;\n");
    let b = Language::TypeScript.tokenize("const sum = cost * items;\n");

    let norm: Vec<u32> = a.significant().iter().map(|t| t.normalized_hash).collect();
    let norm_b: Vec<u32> = b.significant().iter().map(|t| t.normalized_hash).collect();
    assert_eq!(norm, norm_b);
}

#[test]
fn test_rename_invariance_cpp() {
    let a = Language::Cpp.tokenize("int sum(int a, int b) { return a + b; }\n");
    let b = Language::Cpp.tokenize("int add(int x, int y) { return x + y; }\n");

    let norm: Vec<u32> = a.significant().iter().map(|t| t.normalized_hash).collect();
    let norm_b: Vec<u32> = b.significant().iter().map(|t| t.normalized_hash).collect();
    assert_eq!(norm, norm_b);
}

/// Changing a keyword or operator must change the normalized stream.
#[test]
fn test_structure_changes_visible() {
    let a = Language::Python.tokenize("x = a + b\n");
    let b = Language::Python.tokenize("x = a - b\n");

    let norm = |f: &simscan::TokenizedFile| -> Vec<u32> {
        f.significant().iter().map(|t| t.normalized_hash).collect()
    };
    assert_ne!(norm(&a), norm(&b));
}

// =============================================================================
// Line accounting
// =============================================================================

#[test]
fn test_line_accounting_python() {
    let source = "# header comment\n\nx = 1\ny = 2  # trailing\n\n# footer\n";
    let file = Language::Python.tokenize(source);
    assert_eq!(file.total_lines, 6);
    assert_eq!(file.code_lines, 2);
    assert_eq!(file.comment_lines, 2);
    assert_eq!(file.blank_lines, 2);
}

#[test]
fn test_line_accounting_typescript() {
    let source = "// header\nconst x = 1;\n\nconst y = 2; // trailing\n";
    let file = Language::TypeScript.tokenize(source);
    assert_eq!(file.total_lines, 4);
    assert_eq!(file.code_lines, 2);
    assert_eq!(file.comment_lines, 1);
    assert_eq!(file.blank_lines, 1);
}

#[test]
fn test_line_accounting_cpp() {
    let source = "// header\nint x = 1;\n\n#include <vector>\n";
    let file = Language::Cpp.tokenize(source);
    assert_eq!(file.total_lines, 4);
    // The preprocessor line counts as code even though it emits no tokens.
    assert_eq!(file.code_lines, 2);
    assert_eq!(file.comment_lines, 1);
    assert_eq!(file.blank_lines, 1);
}

#[test]
fn test_no_trailing_newline() {
    let file = Language::Python.tokenize("x = 1");
    assert_eq!(file.total_lines, 1);
    assert_eq!(file.code_lines, 1);
}

// =============================================================================
// Totality on malformed input
// =============================================================================

#[test]
fn test_malformed_input_never_panics() {
    let nasty = [
        "'unterminated\nx = 1\n",
        "\"\"\"open triple\nstill open",
        "def broken(:\n",
        "€€€ non-ascii €€€\nx = 1\n",
        "\\\\\\",
        "/* unclosed comment\nint x;\n",
        "`unclosed template ${\nconst y = 1;\n",
        "R\"(unclosed raw\n",
        "\0\0\0",
    ];
    for source in nasty {
        let _ = Language::Python.tokenize(source);
        let _ = Language::TypeScript.tokenize(source);
        let _ = Language::Cpp.tokenize(source);
    }
}

#[test]
fn test_empty_inputs() {
    for lang in [Language::Python, Language::TypeScript, Language::Cpp] {
        let file = lang.tokenize("");
        assert!(file.tokens.is_empty());
        assert_eq!(file.total_lines, 0);
        assert_eq!(file.code_lines, 0);
    }
}

// =============================================================================
// Structural tokens
// =============================================================================

#[test]
fn test_only_python_emits_structural_tokens() {
    let py = Language::Python.tokenize("if x:\n    y = 1\n");
    assert!(py.tokens.iter().any(|t| t.ty == TokenType::Indent));
    assert!(py.tokens.iter().any(|t| t.ty == TokenType::Newline));

    let ts = Language::TypeScript.tokenize("if (x) {\n  y = 1;\n}\n");
    assert!(ts.tokens.iter().all(|t| !t.ty.is_structural()));

    let cpp = Language::Cpp.tokenize("if (x) {\n  y = 1;\n}\n");
    assert!(cpp.tokens.iter().all(|t| !t.ty.is_structural()));
}

#[test]
fn test_significant_sequence_excludes_structural() {
    let py = Language::Python.tokenize("def f():\n    return 1\n");
    assert!(py.significant().iter().all(|t| !t.ty.is_structural()));
    assert!(py.significant().len() < py.tokens.len());
}
