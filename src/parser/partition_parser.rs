//! Token-based parsing of `PARTITION BY` clauses
//!
//! ```sql
//! PARTITION BY { [LINEAR] HASH (expr) | [LINEAR] KEY [ALGORITHM = n] (cols)
//!              | RANGE (expr) | RANGE COLUMNS (cols) | LIST (expr) | LIST COLUMNS (cols) }
//!     [PARTITIONS n]
//!     [SUBPARTITION BY { [LINEAR] HASH (expr) | [LINEAR] KEY [ALGORITHM = n] (cols) }
//!         [SUBPARTITIONS n]]
//!     [(PARTITION name [VALUES {LESS THAN {(values) | MAXVALUE} | IN (values)}] [options]
//!         [(SUBPARTITION name [options], ...)], ...)]
//! ```

use sqlparser::tokenizer::Token;

use super::identifier_utils::normalize_identifier;
use super::token_parser_base::TokenParser;
use crate::model::{PartitionDefinition, PartitionKind, PartitionSpec, PartitionState};

/// Token-based partition clause parser
pub struct PartitionTokenParser<'a> {
    base: &'a mut TokenParser,
}

impl<'a> PartitionTokenParser<'a> {
    pub fn new(base: &'a mut TokenParser) -> Self {
        Self { base }
    }

    /// Parse a partition clause. Position must be at `PARTITION`.
    pub fn parse(&mut self) -> Option<PartitionState> {
        self.base.skip_whitespace();
        self.base.expect_words_ci(&["PARTITION", "BY"])?;
        let mut spec = self.parse_spec()?;
        self.base.skip_whitespace();
        if self.base.expect_word_ci("PARTITIONS").is_some() {
            self.base.skip_whitespace();
            spec.count = self.base.parse_positive_integer()? as u32;
            self.base.skip_whitespace();
        }

        let mut subpartition = None;
        if self.base.expect_words_ci(&["SUBPARTITION", "BY"]).is_some() {
            let mut sub = self.parse_spec()?;
            self.base.skip_whitespace();
            if self.base.expect_word_ci("SUBPARTITIONS").is_some() {
                self.base.skip_whitespace();
                sub.count = self.base.parse_positive_integer()? as u32;
                self.base.skip_whitespace();
            }
            subpartition = Some(sub);
        }

        let partitions = if self.base.check_token(&Token::LParen) {
            self.parse_definitions(spec.kind, true)?
        } else {
            Vec::new()
        };

        Some(PartitionState {
            spec,
            subpartition,
            partitions,
        })
    }

    fn parse_spec(&mut self) -> Option<PartitionSpec> {
        self.base.skip_whitespace();
        let linear = self.base.expect_word_ci("LINEAR").is_some();
        self.base.skip_whitespace();

        let kind = if self.base.expect_word_ci("HASH").is_some() {
            if linear {
                PartitionKind::LinearHash
            } else {
                PartitionKind::Hash
            }
        } else if self.base.expect_word_ci("KEY").is_some() {
            self.base.skip_whitespace();
            if self.base.expect_word_ci("ALGORITHM").is_some() {
                self.base.skip_optional_eq();
                self.base.parse_positive_integer()?;
            }
            if linear {
                PartitionKind::LinearKey
            } else {
                PartitionKind::Key
            }
        } else if self.base.expect_word_ci("RANGE").is_some() {
            self.base.skip_whitespace();
            if self.base.expect_word_ci("COLUMNS").is_some() {
                PartitionKind::RangeColumns
            } else {
                PartitionKind::Range
            }
        } else if self.base.expect_word_ci("LIST").is_some() {
            self.base.skip_whitespace();
            if self.base.expect_word_ci("COLUMNS").is_some() {
                PartitionKind::ListColumns
            } else {
                PartitionKind::List
            }
        } else {
            return None;
        };

        self.base.skip_whitespace();
        let inner = self.base.consume_parenthesized()?;
        Some(PartitionSpec {
            kind,
            fields: split_fields(&inner),
            count: 0,
        })
    }

    fn parse_definitions(&mut self, kind: PartitionKind, top_level: bool) -> Option<Vec<PartitionDefinition>> {
        self.base.expect_token(&Token::LParen)?;
        let mut definitions = Vec::new();
        loop {
            self.base.skip_whitespace();
            let keyword = if top_level { "PARTITION" } else { "SUBPARTITION" };
            self.base.expect_word_ci(keyword)?;
            self.base.skip_whitespace();
            let name = self.base.parse_text_or_identifier()?;
            self.base.skip_whitespace();

            let mut value = String::new();
            if top_level {
                if let Some(preposition) = kind.preposition() {
                    self.base.expect_word_ci("VALUES")?;
                    self.base.skip_whitespace();
                    if preposition == "IN" {
                        self.base.expect_word_ci("IN")?;
                        self.base.skip_whitespace();
                        value = join_values(&self.base.consume_parenthesized()?);
                    } else {
                        self.base.expect_words_ci(&["LESS", "THAN"])?;
                        self.base.skip_whitespace();
                        if self.base.expect_word_ci("MAXVALUE").is_some() {
                            value = "MAXVALUE".to_string();
                        } else {
                            value = join_values(&self.base.consume_parenthesized()?);
                        }
                    }
                }
            }

            // Storage options (ENGINE, COMMENT, ...) are not tracked
            while !self.base.is_at_end()
                && !self.base.check_token(&Token::Comma)
                && !self.base.check_token(&Token::RParen)
                && !self.base.check_token(&Token::LParen)
            {
                self.base.advance();
            }

            let subpartitions = if top_level && self.base.check_token(&Token::LParen) {
                let subs = self.parse_definitions(kind, false)?;
                self.base.skip_whitespace();
                subs
            } else {
                Vec::new()
            };

            definitions.push(PartitionDefinition {
                id: definitions.len() + 1,
                name,
                value,
                subpartitions,
            });

            self.base.skip_whitespace();
            if self.base.expect_token(&Token::Comma).is_some() {
                continue;
            }
            self.base.expect_token(&Token::RParen)?;
            return Some(definitions);
        }
    }
}

/// Split a comma separated field list at depth zero, stripping backticks.
fn split_fields(text: &str) -> Vec<String> {
    split_top_level(text)
        .into_iter()
        .map(|f| {
            let f = f.trim();
            if f.starts_with('`') && f.ends_with('`') && !f[1..f.len() - 1].contains('`') {
                normalize_identifier(f)
            } else {
                f.to_string()
            }
        })
        .filter(|f| !f.is_empty())
        .collect()
}

fn join_values(text: &str) -> String {
    split_fields(text).join(",")
}

/// Split on commas that are not nested inside parentheses or quotes.
pub fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"' | '`') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth -= 1,
            (None, ',') if depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(sql: &str) -> PartitionState {
        let mut base = TokenParser::new(sql).unwrap();
        PartitionTokenParser::new(&mut base).parse().unwrap()
    }

    #[test]
    fn test_range_partitions() {
        let state = parse(
            "PARTITION BY RANGE (`id`) (PARTITION p0 VALUES LESS THAN (100) ENGINE = InnoDB, PARTITION p1 VALUES LESS THAN MAXVALUE)",
        );
        assert_eq!(state.spec.kind, PartitionKind::Range);
        assert_eq!(state.spec.fields, vec!["id".to_string()]);
        assert_eq!(state.partitions.len(), 2);
        assert_eq!(state.partitions[0].value, "100");
        assert_eq!(state.partitions[1].value, "MAXVALUE");
        assert_eq!(state.partitions[1].id, 2);
    }

    #[test]
    fn test_list_columns() {
        let state = parse("PARTITION BY LIST COLUMNS(`region`, kind) (PARTITION pa VALUES IN ('a', 'b'))");
        assert_eq!(state.spec.kind, PartitionKind::ListColumns);
        assert_eq!(state.spec.fields, vec!["region".to_string(), "kind".to_string()]);
        assert_eq!(state.partitions[0].value, "'a','b'");
    }

    #[test]
    fn test_hash_with_count() {
        let state = parse("PARTITION BY LINEAR HASH (YEAR(created)) PARTITIONS 4");
        assert_eq!(state.spec.kind, PartitionKind::LinearHash);
        assert_eq!(state.spec.fields, vec!["YEAR(created)".to_string()]);
        assert_eq!(state.spec.count, 4);
        assert!(state.partitions.is_empty());
    }

    #[test]
    fn test_key_with_algorithm() {
        let state = parse("PARTITION BY KEY ALGORITHM = 2 (a, b) PARTITIONS 2");
        assert_eq!(state.spec.kind, PartitionKind::Key);
        assert_eq!(state.spec.fields, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_subpartitions() {
        let state = parse(
            "PARTITION BY RANGE (YEAR(d)) SUBPARTITION BY HASH (TO_DAYS(d)) \
             (PARTITION p0 VALUES LESS THAN (1990) (SUBPARTITION s0, SUBPARTITION s1), \
              PARTITION p1 VALUES LESS THAN MAXVALUE (SUBPARTITION s2, SUBPARTITION s3))",
        );
        let sub = state.subpartition.as_ref().unwrap();
        assert_eq!(sub.kind, PartitionKind::Hash);
        assert_eq!(state.partitions[0].subpartitions.len(), 2);
        assert_eq!(state.partitions[1].subpartitions[1].name, "s3");
        assert_eq!(state.partitions[1].subpartitions[1].id, 2);
    }

    #[test]
    fn test_split_top_level() {
        assert_eq!(split_top_level("a, f(b, c), 'x,y'"), vec!["a", " f(b, c)", " 'x,y'"]);
    }
}
