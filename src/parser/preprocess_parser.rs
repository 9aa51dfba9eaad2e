//! Offset-preserving preprocessing for MySQL dump text
//!
//! The tokenizer treats every `/* ... */` block as a comment, but MySQL dumps
//! hide real DDL inside executable comments:
//!
//! ```sql
//! /*!50100 PARTITION BY RANGE (`id`) (PARTITION p0 VALUES LESS THAN (10)) */
//! `id` bigint /*T![auto_rand] AUTO_RANDOM(5) */
//! ```
//!
//! Routine dumps also switch the statement terminator with `DELIMITER`.
//!
//! ## Preprocessing Operations
//!
//! 1. **Executable comments**: the `/*!NNNNN` / `/*T![feature]` opener and the
//!    matching `*/` are overwritten with spaces so the content is tokenized.
//! 2. **DELIMITER directives**: the directive line is blanked, and each later
//!    occurrence of the custom terminator becomes `;` padded with spaces.
//!
//! Every replacement has the same byte length as the text it replaces, so byte
//! offsets into the preprocessed text are valid offsets into the original.
//! Quoted strings, identifiers and ordinary comments are never touched.

use once_cell::sync::Lazy;
use regex::Regex;

static DELIMITER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[ \t]*DELIMITER[ \t]+(\S+)[ \t\r]*$").expect("valid delimiter regex")
});

/// Preprocess MySQL text for tokenization. The result has the same length.
pub fn preprocess_mysql(sql: &str) -> String {
    let bytes = sql.as_bytes();
    let mut out = bytes.to_vec();
    let mut delimiter: Option<Vec<u8>> = None;
    let mut in_executable_comment = false;
    let mut at_line_start = true;
    let mut i = 0;

    while i < bytes.len() {
        if at_line_start {
            let line_end = sql[i..].find('\n').map(|n| i + n).unwrap_or(sql.len());
            if let Some(caps) = DELIMITER_RE.captures(&sql[i..line_end]) {
                let custom = caps[1].as_bytes().to_vec();
                delimiter = (custom != b";").then_some(custom);
                blank(&mut out, i, line_end);
                i = line_end;
                continue;
            }
        }

        let c = bytes[i];
        at_line_start = c == b'\n';

        match c {
            b'\'' | b'"' | b'`' => {
                i = skip_quoted(bytes, i);
                continue;
            }
            b'#' => {
                i = skip_to_line_end(bytes, i);
                continue;
            }
            b'-' if bytes.get(i + 1) == Some(&b'-')
                && bytes.get(i + 2).map_or(true, |b| b.is_ascii_whitespace()) =>
            {
                i = skip_to_line_end(bytes, i);
                continue;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                if let Some(marker_end) = executable_comment_marker(bytes, i) {
                    blank(&mut out, i, marker_end);
                    in_executable_comment = true;
                    i = marker_end;
                } else {
                    i = skip_block_comment(bytes, i);
                }
                continue;
            }
            b'*' if in_executable_comment && bytes.get(i + 1) == Some(&b'/') => {
                blank(&mut out, i, i + 2);
                in_executable_comment = false;
                i += 2;
                continue;
            }
            _ => {}
        }

        if let Some(delim) = &delimiter {
            if bytes[i..].starts_with(delim) {
                out[i] = b';';
                blank(&mut out, i + 1, i + delim.len());
                i += delim.len();
                continue;
            }
        }

        i += 1;
    }

    String::from_utf8(out).unwrap_or_else(|_| sql.to_string())
}

/// End offset of a `/*!NNNNN` or `/*T![feature]` opener starting at `start`.
fn executable_comment_marker(bytes: &[u8], start: usize) -> Option<usize> {
    let rest = &bytes[start..];
    if rest.starts_with(b"/*!") {
        let digits = rest[3..].iter().take_while(|b| b.is_ascii_digit()).count();
        return Some(start + 3 + digits);
    }
    if rest.starts_with(b"/*T![") {
        let close = rest.iter().position(|&b| b == b']')?;
        return Some(start + close + 1);
    }
    None
}

fn blank(out: &mut [u8], start: usize, end: usize) {
    for b in &mut out[start..end] {
        if *b != b'\n' {
            *b = b' ';
        }
    }
}

fn skip_quoted(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'\\' && quote != b'`' {
            i += 2;
            continue;
        }
        if b == quote {
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

fn skip_to_line_end(bytes: &[u8], start: usize) -> usize {
    bytes[start..]
        .iter()
        .position(|&b| b == b'\n')
        .map(|n| start + n)
        .unwrap_or(bytes.len())
}

fn skip_block_comment(bytes: &[u8], start: usize) -> usize {
    bytes[start + 2..]
        .windows(2)
        .position(|w| w == b"*/")
        .map(|n| start + 2 + n + 2)
        .unwrap_or(bytes.len())
}
