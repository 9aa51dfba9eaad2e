//! Base token parser providing common helper methods for MySQL DDL parsing.
//!
//! Every specialized parser (`ColumnTokenParser`, `TableTokenParser`,
//! `AlterTokenParser`, ...) borrows a `TokenParser` and delegates token
//! navigation to it:
//!
//! ```ignore
//! pub struct ColumnTokenParser<'a> {
//!     base: &'a mut TokenParser,
//! }
//!
//! impl<'a> ColumnTokenParser<'a> {
//!     pub fn parse(&mut self) -> Option<ColumnDefinition> {
//!         self.base.skip_whitespace();
//!         let name = self.base.parse_identifier()?;
//!         // ...
//!     }
//! }
//! ```
//!
//! Unlike a plain token stream, the parser also remembers the byte range every
//! token occupies in its source text, so callers can slice verbatim text
//! (view bodies, default expressions) and anchor edits to exact spans.

use std::ops::Range;

use sqlparser::dialect::MySqlDialect;
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::{Location, Token, TokenWithSpan, Tokenizer, TokenizerError};

use super::identifier_utils::format_token;

/// Maps tokenizer locations (1-based line, 1-based character column) back to
/// byte offsets in the text that was tokenized.
#[derive(Debug, Clone)]
pub struct SourceMap {
    line_starts: Vec<usize>,
}

impl SourceMap {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { line_starts }
    }

    /// Byte offset of `location` within `text`, clamped to the text length.
    pub fn byte_offset(&self, text: &str, location: Location) -> usize {
        let line = (location.line as usize).max(1);
        let Some(&start) = self.line_starts.get(line - 1) else {
            return text.len();
        };
        let column = (location.column as usize).saturating_sub(1);
        text[start..]
            .char_indices()
            .nth(column)
            .map(|(i, _)| start + i)
            .unwrap_or(text.len())
    }
}

/// Tokenize MySQL text, returning the tokens with their byte ranges.
pub fn tokenize(sql: &str) -> Result<(Vec<TokenWithSpan>, Vec<Range<usize>>), TokenizerError> {
    let dialect = MySqlDialect {};
    let tokens = Tokenizer::new(&dialect, sql).tokenize_with_location()?;
    let map = SourceMap::new(sql);
    let offsets = tokens
        .iter()
        .map(|t| map.byte_offset(sql, t.span.start)..map.byte_offset(sql, t.span.end))
        .collect();
    Ok((tokens, offsets))
}

/// Base token parser with common helper methods for MySQL parsing.
pub struct TokenParser {
    source: String,
    tokens: Vec<TokenWithSpan>,
    offsets: Vec<Range<usize>>,
    pos: usize,
}

impl TokenParser {
    /// Tokenize `sql` with the MySQL dialect; `None` if tokenizing fails.
    ///
    /// Uses MySqlDialect for tokenization. Returns `None` if tokenization fails.
    pub fn new(sql: &str) -> Option<Self> {
        let (tokens, offsets) = tokenize(sql).ok()?;
        Some(Self {
            source: sql.to_string(),
            tokens,
            offsets,
            pos: 0,
        })
    }

    // ========================================================================
    // Position and state
    // ========================================================================

    /// True once every token has been consumed.
    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos;
    }

    #[inline]
    pub fn tokens(&self) -> &[TokenWithSpan] {
        &self.tokens
    }

    /// The text this parser was built from.
    #[inline]
    pub fn source(&self) -> &str {
        &self.source
    }

    // ========================================================================
    // Token access
    // ========================================================================

    /// Token under the cursor, if any.
    #[inline]
    pub fn current_token(&self) -> Option<&TokenWithSpan> {
        self.tokens.get(self.pos)
    }

    /// Peek at the n-th non-whitespace token after the current one.
    pub fn peek_significant(&self, n: usize) -> Option<&Token> {
        self.tokens[self.pos.min(self.tokens.len())..]
            .iter()
            .map(|t| &t.token)
            .filter(|t| !matches!(t, Token::Whitespace(_)))
            .nth(n)
    }

    /// Move the cursor forward by one token.
    #[inline]
    pub fn advance(&mut self) {
        if !self.is_at_end() {
            self.pos += 1;
        }
    }

    // ========================================================================
    // Byte offsets
    // ========================================================================

    /// Byte offset where the token at `pos` starts (source length at end).
    pub fn offset_at(&self, pos: usize) -> usize {
        self.offsets
            .get(pos)
            .map(|r| r.start)
            .unwrap_or(self.source.len())
    }

    /// Byte offset just past the last non-whitespace token before `pos`.
    pub fn end_offset_before(&self, pos: usize) -> usize {
        let mut i = pos.min(self.tokens.len());
        while i > 0 {
            i -= 1;
            if !matches!(self.tokens[i].token, Token::Whitespace(_)) {
                return self.offsets[i].end;
            }
        }
        0
    }

    /// Verbatim source text between the token at `start_pos` and the last
    /// significant token before `end_pos`.
    pub fn source_between(&self, start_pos: usize, end_pos: usize) -> &str {
        let start = self.offset_at(start_pos);
        let end = self.end_offset_before(end_pos).max(start);
        &self.source[start..end]
    }

    /// 1-based line of the current token.
    pub fn current_line(&self) -> usize {
        self.current_token()
            .map(|t| t.span.start.line as usize)
            .unwrap_or(0)
    }

    // ========================================================================
    // Whitespace handling
    // ========================================================================

    /// Skip whitespace and comment tokens.
    pub fn skip_whitespace(&mut self) {
        while matches!(
            self.current_token().map(|t| &t.token),
            Some(Token::Whitespace(_))
        ) {
            self.advance();
        }
    }

    // ========================================================================
    // Token type checks
    // ========================================================================

    /// Check if current token is a specific unquoted keyword.
    #[inline]
    pub fn check_keyword(&self, keyword: Keyword) -> bool {
        matches!(
            self.current_token().map(|t| &t.token),
            Some(Token::Word(w)) if w.keyword == keyword && w.quote_style.is_none()
        )
    }

    /// Check if current token is an unquoted word matching (case-insensitive).
    ///
    /// Backtick-quoted identifiers never match, so a column named `` `key` ``
    /// is not mistaken for the KEY keyword.
    #[inline]
    pub fn check_word_ci(&self, word: &str) -> bool {
        matches!(
            self.current_token().map(|t| &t.token),
            Some(Token::Word(w)) if w.quote_style.is_none() && w.value.eq_ignore_ascii_case(word)
        )
    }

    /// Same token variant as `expected`, ignoring its payload.
    #[inline]
    pub fn check_token(&self, expected: &Token) -> bool {
        if let Some(token) = self.current_token() {
            std::mem::discriminant(&token.token) == std::mem::discriminant(expected)
        } else {
            false
        }
    }

    // ========================================================================
    // Expect methods (check and advance)
    // ========================================================================

    /// Consume `keyword` or return `None`.
    pub fn expect_keyword(&mut self, keyword: Keyword) -> Option<()> {
        if self.check_keyword(keyword) {
            self.advance();
            Some(())
        } else {
            None
        }
    }

    /// Consume `word` (any case) or return `None`.
    pub fn expect_word_ci(&mut self, word: &str) -> Option<()> {
        if self.check_word_ci(word) {
            self.advance();
            Some(())
        } else {
            None
        }
    }

    /// Consume a token of `expected`'s variant or return `None`.
    pub fn expect_token(&mut self, expected: &Token) -> Option<()> {
        if self.check_token(expected) {
            self.advance();
            Some(())
        } else {
            None
        }
    }

    /// Consume a sequence of words separated by whitespace, e.g. `IF NOT EXISTS`.
    ///
    /// Position is restored when any word is missing.
    pub fn expect_words_ci(&mut self, words: &[&str]) -> Option<()> {
        let start = self.pos;
        for (i, word) in words.iter().enumerate() {
            if i > 0 {
                self.skip_whitespace();
            }
            if self.expect_word_ci(word).is_none() {
                self.pos = start;
                return None;
            }
        }
        Some(())
    }

    /// Consume `IF EXISTS` if present.
    pub fn parse_if_exists(&mut self) -> bool {
        self.skip_whitespace();
        let found = self.expect_words_ci(&["IF", "EXISTS"]).is_some();
        self.skip_whitespace();
        found
    }

    /// Consume `IF NOT EXISTS` if present.
    pub fn parse_if_not_exists(&mut self) -> bool {
        self.skip_whitespace();
        let found = self.expect_words_ci(&["IF", "NOT", "EXISTS"]).is_some();
        self.skip_whitespace();
        found
    }

    /// Consume an optional `=` (as in `ENGINE = InnoDB`).
    pub fn skip_optional_eq(&mut self) {
        self.skip_whitespace();
        if self.expect_token(&Token::Eq).is_some() {
            self.skip_whitespace();
        }
    }

    // ========================================================================
    // Identifier parsing
    // ========================================================================

    /// Parse an identifier (backtick-quoted or bare).
    ///
    /// Returns the identifier value without quotes.
    pub fn parse_identifier(&mut self) -> Option<String> {
        let token = self.current_token()?;
        match &token.token {
            Token::Word(w) => {
                let name = w.value.clone();
                self.advance();
                Some(name)
            }
            _ => None,
        }
    }

    /// Parse an identifier that may also be written as a string literal,
    /// as MySQL allows for aliases and subpartition names.
    pub fn parse_text_or_identifier(&mut self) -> Option<String> {
        let token = self.current_token()?;
        match &token.token {
            Token::SingleQuotedString(s) | Token::DoubleQuotedString(s) => {
                let value = s.clone();
                self.advance();
                Some(value)
            }
            _ => self.parse_identifier(),
        }
    }

    /// Parse `db.name` or `name`.
    ///
    /// Returns `(database, name)`; the database part is `None` when unqualified.
    pub fn parse_qualified_name(&mut self) -> Option<(Option<String>, String)> {
        let first = self.parse_identifier()?;
        let save = self.pos;
        self.skip_whitespace();

        if self.check_token(&Token::Period) {
            self.advance();
            self.skip_whitespace();
            let second = self.parse_identifier()?;
            Some((Some(first), second))
        } else {
            self.pos = save;
            Some((None, first))
        }
    }

    /// Parse a parenthesized, comma separated identifier list: `(a, b, c)`.
    pub fn parse_identifier_list(&mut self) -> Option<Vec<String>> {
        self.skip_whitespace();
        self.expect_token(&Token::LParen)?;
        let mut names = Vec::new();
        loop {
            self.skip_whitespace();
            names.push(self.parse_identifier()?);
            self.skip_whitespace();
            if self.expect_token(&Token::Comma).is_some() {
                continue;
            }
            self.expect_token(&Token::RParen)?;
            return Some(names);
        }
    }

    // ========================================================================
    // Literal parsing
    // ========================================================================

    /// A bare unsigned number.
    pub fn parse_positive_integer(&mut self) -> Option<u64> {
        let token = self.current_token()?;
        match &token.token {
            Token::Number(n, _) => {
                let value = n.parse::<u64>().ok()?;
                self.advance();
                Some(value)
            }
            _ => None,
        }
    }

    /// Parse a string literal, returning its unescaped value.
    pub fn parse_string_literal(&mut self) -> Option<String> {
        let token = self.current_token()?;
        match &token.token {
            Token::SingleQuotedString(s)
            | Token::DoubleQuotedString(s)
            | Token::NationalStringLiteral(s) => {
                let value = s.clone();
                self.advance();
                Some(value)
            }
            _ => None,
        }
    }

    /// Parse a bare word (keyword or identifier) or string, as used for
    /// option values like `ENGINE=InnoDB` or `CHARSET utf8mb4`.
    pub fn parse_option_value(&mut self) -> Option<String> {
        self.parse_string_literal()
            .or_else(|| self.parse_identifier())
            .or_else(|| self.parse_positive_integer().map(|n| n.to_string()))
    }

    // ========================================================================
    // Token string conversion
    // ========================================================================

    /// Render `tokens[start_pos..end_pos]` back to SQL text.
    pub fn tokens_to_string(&self, start_pos: usize, end_pos: usize) -> String {
        self.tokens[start_pos..end_pos]
            .iter()
            .map(|t| format_token(&t.token))
            .collect()
    }

    // ========================================================================
    // Utility methods
    // ========================================================================

    /// Skip tokens until one of several token types is found at parenthesis
    /// depth zero.
    ///
    /// Yields the index of the target that matched, `None` at end of input.
    pub fn skip_to_any_token(&mut self, targets: &[Token]) -> Option<usize> {
        while !self.is_at_end() {
            if self.check_token(&Token::LParen) {
                self.skip_parenthesized();
                continue;
            }
            for (i, target) in targets.iter().enumerate() {
                if self.check_token(target) {
                    return Some(i);
                }
            }
            self.advance();
        }
        None
    }

    /// Step over a balanced `( ... )` group.
    ///
    /// The cursor must sit on `(`; it ends just past the matching `)`.
    pub fn skip_parenthesized(&mut self) {
        if !self.check_token(&Token::LParen) {
            return;
        }

        let mut depth = 0;
        while !self.is_at_end() {
            if self.check_token(&Token::LParen) {
                depth += 1;
            } else if self.check_token(&Token::RParen) {
                depth -= 1;
                if depth == 0 {
                    self.advance();
                    return;
                }
            }
            self.advance();
        }
    }

    /// Consume a parenthesized expression and return its verbatim inner text.
    ///
    /// Position should be at the opening parenthesis. Returns `None` if not at
    /// a left parenthesis or the parenthesis is never closed.
    pub fn consume_parenthesized(&mut self) -> Option<String> {
        if !self.check_token(&Token::LParen) {
            return None;
        }

        let open = self.pos;
        let mut depth = 0;
        while !self.is_at_end() {
            if self.check_token(&Token::LParen) {
                depth += 1;
            } else if self.check_token(&Token::RParen) {
                depth -= 1;
                if depth == 0 {
                    let close = self.pos;
                    self.advance();
                    let start = self.offsets[open].end;
                    let end = self.offsets[close].start;
                    return Some(self.source[start..end].trim().to_string());
                }
            }
            self.advance();
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_creates_parser() {
        let parser = TokenParser::new("CREATE TABLE t (id INT)");
        assert!(parser.is_some());
    }

    #[test]
    fn test_skip_whitespace_skips_comments() {
        let mut parser = TokenParser::new("  -- note\n # hash note\n /* block */ CREATE").unwrap();
        parser.skip_whitespace();
        assert!(parser.check_keyword(Keyword::CREATE));
    }

    #[test]
    fn test_check_word_ci_ignores_quoted_identifiers() {
        let mut parser = TokenParser::new("`key` KEY").unwrap();
        assert!(!parser.check_word_ci("KEY"));
        parser.advance();
        parser.skip_whitespace();
        assert!(parser.check_word_ci("key"));
    }

    #[test]
    fn test_parse_qualified_name() {
        let mut parser = TokenParser::new("`shop`.`orders`").unwrap();
        assert_eq!(
            parser.parse_qualified_name(),
            Some((Some("shop".to_string()), "orders".to_string()))
        );

        let mut parser = TokenParser::new("orders (").unwrap();
        assert_eq!(parser.parse_qualified_name(), Some((None, "orders".to_string())));
        // Unqualified names leave the following whitespace untouched
        assert!(parser.check_token(&Token::Whitespace(sqlparser::tokenizer::Whitespace::Space)));
    }

    #[test]
    fn test_parse_identifier_list() {
        let mut parser = TokenParser::new("(`a`, b ,c)").unwrap();
        assert_eq!(
            parser.parse_identifier_list(),
            Some(vec!["a".to_string(), "b".to_string(), "c".to_string()])
        );
        assert!(parser.is_at_end());
    }

    #[test]
    fn test_consume_parenthesized_returns_verbatim_text() {
        let mut parser = TokenParser::new("( `a` +  (b * 2) ) rest").unwrap();
        assert_eq!(parser.consume_parenthesized().as_deref(), Some("`a` +  (b * 2)"));
        parser.skip_whitespace();
        assert!(parser.check_word_ci("rest"));
    }

    #[test]
    fn test_source_between_spans_multibyte_text() {
        let mut parser = TokenParser::new("COMMENT 'héllo' x").unwrap();
        parser.advance();
        parser.skip_whitespace();
        let start = parser.pos();
        parser.advance();
        assert_eq!(parser.source_between(start, parser.pos()), "'héllo'");
    }

    #[test]
    fn test_mysql_string_escapes_are_unescaped() {
        let mut parser = TokenParser::new(r"'it\'s'").unwrap();
        assert_eq!(parser.parse_string_literal().as_deref(), Some("it's"));
    }

    #[test]
    fn test_expect_words_restores_position() {
        let mut parser = TokenParser::new("IF NOT FOUND").unwrap();
        assert!(parser.expect_words_ci(&["IF", "NOT", "EXISTS"]).is_none());
        assert_eq!(parser.pos(), 0);
        assert!(!parser.parse_if_not_exists());
    }

    #[test]
    fn test_skip_to_any_token_respects_parentheses() {
        let mut parser = TokenParser::new("DECIMAL(10,2) NOT NULL, next").unwrap();
        assert_eq!(parser.skip_to_any_token(&[Token::Comma]), Some(0));
        parser.advance();
        parser.skip_whitespace();
        assert!(parser.check_word_ci("next"));
    }

    #[test]
    fn test_source_map_offsets() {
        let text = "ab\ncé d";
        let map = SourceMap::new(text);
        assert_eq!(map.byte_offset(text, Location { line: 2, column: 1 }), 3);
        assert_eq!(map.byte_offset(text, Location { line: 2, column: 3 }), 6);
        assert_eq!(map.byte_offset(text, Location { line: 9, column: 1 }), text.len());
    }
}
