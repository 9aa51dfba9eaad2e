//! Centralized identifier and literal handling for MySQL text.
//!
//! Every place that writes an identifier or a string literal back into DDL
//! goes through these helpers, so quoting stays consistent between the
//! canonical serializer, the migration generator and the reconciler.
//!
//! # Examples
//!
//! ```ignore
//! use crate::parser::identifier_utils::*;
//!
//! assert_eq!(quote_identifier("order"), "`order`");
//! assert_eq!(quote_identifier("we`ird"), "`we``ird`");
//! assert_eq!(quote_literal("it's"), "'it''s'");
//! assert_eq!(escape_string("it's"), "it\\'s");
//! ```

use sqlparser::tokenizer::{Token, Word};

/// Wrap an identifier in backticks, doubling embedded backticks.
pub fn quote_identifier(ident: &str) -> String {
    format!("`{}`", ident.replace('`', "``"))
}

/// Quote a list of identifiers and join them with `sep`.
pub fn quote_identifier_list(idents: &[String], sep: &str) -> String {
    idents
        .iter()
        .map(|i| quote_identifier(i))
        .collect::<Vec<_>>()
        .join(sep)
}

/// Render a string literal in SHOW CREATE style: single quotes, with
/// embedded quotes doubled.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Escape a string for embedding between single quotes using backslash
/// escapes, the way mysqldump does.
pub fn escape_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            _ => out.push(c),
        }
    }
    out
}

/// Strip one layer of backticks from an identifier, if present.
pub fn normalize_identifier(ident: &str) -> String {
    let trimmed = ident.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('`') && trimmed.ends_with('`') {
        trimmed[1..trimmed.len() - 1].replace("``", "`")
    } else {
        trimmed.to_string()
    }
}

/// Whether `ident` is a bare identifier (no expression syntax).
pub fn is_plain_identifier(ident: &str) -> bool {
    !ident.is_empty()
        && ident
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// Compare two object names, honoring the configured case sensitivity.
pub fn names_equal(a: &str, b: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        a == b
    } else {
        a.eq_ignore_ascii_case(b)
    }
}

/// Converts a Word token back to text, preserving backtick quoting.
pub fn format_word(word: &Word) -> String {
    match word.quote_style {
        Some('`') => quote_identifier(&word.value),
        Some('"') => format!("\"{}\"", word.value),
        _ => word.value.clone(),
    }
}

/// Converts a sqlparser-rs Token to a string representation.
///
/// Used when reconstructing normalized text from a token stream, e.g. to
/// compare two expressions while ignoring whitespace differences.
pub fn format_token(token: &Token) -> String {
    match token {
        Token::Word(w) => format_word(w),
        Token::Number(n, _) => n.clone(),
        Token::SingleQuotedString(s) => quote_literal(s),
        Token::LParen => "(".to_string(),
        Token::RParen => ")".to_string(),
        Token::Comma => ",".to_string(),
        Token::Period => ".".to_string(),
        Token::SemiColon => ";".to_string(),
        Token::Whitespace(ws) => ws.to_string(),
        _ => token.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("users"), "`users`");
        assert_eq!(quote_identifier("a`b"), "`a``b`");
    }

    #[test]
    fn test_quote_identifier_list() {
        let cols = vec!["a".to_string(), "b".to_string()];
        assert_eq!(quote_identifier_list(&cols, ", "), "`a`, `b`");
        assert_eq!(quote_identifier_list(&cols, ","), "`a`,`b`");
    }

    #[test]
    fn test_quote_literal_doubles_quotes() {
        assert_eq!(quote_literal("it's"), "'it''s'");
        assert_eq!(quote_literal(""), "''");
    }

    #[test]
    fn test_escape_string_uses_backslashes() {
        assert_eq!(escape_string("it's"), "it\\'s");
        assert_eq!(escape_string("C:\\tmp"), "C:\\\\tmp");
    }

    #[test]
    fn test_normalize_identifier() {
        assert_eq!(normalize_identifier("`a``b`"), "a`b");
        assert_eq!(normalize_identifier(" plain "), "plain");
    }

    #[test]
    fn test_is_plain_identifier() {
        assert!(is_plain_identifier("created_at"));
        assert!(!is_plain_identifier("YEAR(created_at)"));
        assert!(!is_plain_identifier(""));
    }

    #[test]
    fn test_names_equal() {
        assert!(names_equal("Users", "users", false));
        assert!(!names_equal("Users", "users", true));
    }
}
