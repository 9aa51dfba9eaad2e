//! Token-based parsing of table-level constraints and index definitions
//!
//! ## Supported Syntax
//!
//! ```sql
//! [CONSTRAINT [sym]] PRIMARY KEY [USING type] (key_part, ...) [index_option ...]
//! [CONSTRAINT [sym]] UNIQUE [INDEX|KEY] [name] [USING type] (key_part, ...) [index_option ...]
//! {INDEX|KEY} [name] [USING type] (key_part, ...) [index_option ...]
//! {FULLTEXT|SPATIAL} [INDEX|KEY] [name] (key_part, ...) [index_option ...]
//! [CONSTRAINT [sym]] FOREIGN KEY [name] (col, ...) REFERENCES tbl (col, ...)
//!     [ON DELETE action] [ON UPDATE action]
//! [CONSTRAINT [sym]] CHECK (expr) [[NOT] ENFORCED]
//! ```
//!
//! `key_part` is `col [(length)] [ASC|DESC]` or `(expr) [ASC|DESC]`.

use sqlparser::tokenizer::Token;

use super::statement_parser::ObjectName;
use super::token_parser_base::TokenParser;
use crate::model::{IndexKey, IndexType};

/// Which flavour of index a definition declares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Primary,
    Unique,
    Plain,
    Fulltext,
    Spatial,
}

/// An index definition (table element, ALTER TABLE ADD, or CREATE INDEX)
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDefinition {
    pub name: Option<String>,
    pub kind: IndexKind,
    pub keys: Vec<IndexKey>,
    pub using: Option<IndexType>,
    pub comment: Option<String>,
    pub visible: bool,
}

impl IndexDefinition {
    /// The stored index type: FULLTEXT/SPATIAL come from the kind, otherwise
    /// from `USING`, defaulting to BTREE.
    pub fn index_type(&self) -> IndexType {
        match self.kind {
            IndexKind::Fulltext => IndexType::Fulltext,
            IndexKind::Spatial => IndexType::Spatial,
            _ => self.using.unwrap_or_default(),
        }
    }
}

/// `REFERENCES tbl (cols) [ON DELETE ..] [ON UPDATE ..]`
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceDefinition {
    pub table: ObjectName,
    pub columns: Vec<String>,
    pub on_delete: Option<String>,
    pub on_update: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKeyDefinition {
    /// `CONSTRAINT sym`
    pub name: Option<String>,
    /// The optional index name after `FOREIGN KEY`
    pub index_name: Option<String>,
    pub columns: Vec<String>,
    pub reference: ReferenceDefinition,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckDefinition {
    pub name: Option<String>,
    pub expression: String,
    pub enforced: bool,
}

/// A table-level constraint or index element
#[derive(Debug, Clone, PartialEq)]
pub enum TableConstraint {
    Index(IndexDefinition),
    ForeignKey(ForeignKeyDefinition),
    Check(CheckDefinition),
}

/// Whether the current token starts a constraint rather than a column.
pub fn starts_constraint(base: &TokenParser) -> bool {
    [
        "CONSTRAINT",
        "PRIMARY",
        "UNIQUE",
        "INDEX",
        "KEY",
        "FULLTEXT",
        "SPATIAL",
        "FOREIGN",
        "CHECK",
    ]
    .iter()
    .any(|w| base.check_word_ci(w))
}

/// Token-based constraint parser
pub struct ConstraintTokenParser<'a> {
    base: &'a mut TokenParser,
}

impl<'a> ConstraintTokenParser<'a> {
    pub fn new(base: &'a mut TokenParser) -> Self {
        Self { base }
    }

    pub fn parse(&mut self) -> Option<TableConstraint> {
        self.base.skip_whitespace();

        let mut symbol = None;
        if self.base.expect_word_ci("CONSTRAINT").is_some() {
            self.base.skip_whitespace();
            if !["PRIMARY", "UNIQUE", "FOREIGN", "CHECK"]
                .iter()
                .any(|w| self.base.check_word_ci(w))
            {
                symbol = Some(self.base.parse_identifier()?);
                self.base.skip_whitespace();
            }
        }

        if self.base.expect_words_ci(&["PRIMARY", "KEY"]).is_some() {
            return self.parse_index_tail(IndexKind::Primary, None).map(TableConstraint::Index);
        }
        if self.base.expect_word_ci("UNIQUE").is_some() {
            self.skip_index_or_key();
            return self
                .parse_index_tail(IndexKind::Unique, symbol)
                .map(TableConstraint::Index);
        }
        if self.base.expect_word_ci("FULLTEXT").is_some() {
            self.skip_index_or_key();
            return self.parse_index_tail(IndexKind::Fulltext, None).map(TableConstraint::Index);
        }
        if self.base.expect_word_ci("SPATIAL").is_some() {
            self.skip_index_or_key();
            return self.parse_index_tail(IndexKind::Spatial, None).map(TableConstraint::Index);
        }
        if self.base.expect_word_ci("INDEX").is_some() || self.base.expect_word_ci("KEY").is_some() {
            return self.parse_index_tail(IndexKind::Plain, None).map(TableConstraint::Index);
        }
        if self.base.expect_words_ci(&["FOREIGN", "KEY"]).is_some() {
            return self.parse_foreign_key_tail(symbol).map(TableConstraint::ForeignKey);
        }
        if self.base.expect_word_ci("CHECK").is_some() {
            return parse_check_tail(self.base, symbol).map(TableConstraint::Check);
        }
        None
    }

    fn skip_index_or_key(&mut self) {
        self.base.skip_whitespace();
        if self.base.expect_word_ci("INDEX").is_none() {
            let _ = self.base.expect_word_ci("KEY");
        }
    }

    /// Parse `[name] [USING type] (key_part, ...) [index_option ...]`.
    pub fn parse_index_tail(
        &mut self,
        kind: IndexKind,
        fallback_name: Option<String>,
    ) -> Option<IndexDefinition> {
        self.base.skip_whitespace();
        let mut name = None;
        if !self.base.check_token(&Token::LParen) && !self.base.check_word_ci("USING") {
            name = Some(self.base.parse_identifier()?);
            self.base.skip_whitespace();
        }

        let mut definition = IndexDefinition {
            name: name.or(fallback_name),
            kind,
            keys: Vec::new(),
            using: None,
            comment: None,
            visible: true,
        };

        self.parse_index_options(&mut definition)?;
        definition.keys = parse_key_parts(self.base)?;
        self.parse_index_options(&mut definition)?;
        Some(definition)
    }

    pub fn parse_index_options(&mut self, definition: &mut IndexDefinition) -> Option<()> {
        loop {
            self.base.skip_whitespace();
            if self.base.expect_word_ci("USING").is_some() {
                self.base.skip_whitespace();
                definition.using = IndexType::from_keyword(&self.base.parse_identifier()?);
            } else if self.base.expect_word_ci("COMMENT").is_some() {
                self.base.skip_optional_eq();
                definition.comment = Some(self.base.parse_string_literal()?);
            } else if self.base.expect_word_ci("VISIBLE").is_some() {
                definition.visible = true;
            } else if self.base.expect_word_ci("INVISIBLE").is_some() {
                definition.visible = false;
            } else if self.base.expect_word_ci("KEY_BLOCK_SIZE").is_some() {
                self.base.skip_optional_eq();
                self.base.parse_option_value()?;
            } else if self.base.expect_words_ci(&["WITH", "PARSER"]).is_some() {
                self.base.skip_whitespace();
                self.base.parse_identifier()?;
            } else if self.base.expect_word_ci("CLUSTERED").is_some()
                || self.base.expect_word_ci("NONCLUSTERED").is_some()
            {
            } else {
                return Some(());
            }
        }
    }

    fn parse_foreign_key_tail(&mut self, symbol: Option<String>) -> Option<ForeignKeyDefinition> {
        self.base.skip_whitespace();
        let index_name = if self.base.check_token(&Token::LParen) {
            None
        } else {
            let name = self.base.parse_identifier()?;
            self.base.skip_whitespace();
            Some(name)
        };
        let columns = self.base.parse_identifier_list()?;
        self.base.skip_whitespace();
        let reference = parse_reference(self.base)?;
        Some(ForeignKeyDefinition {
            name: symbol,
            index_name,
            columns,
            reference,
        })
    }
}

/// Parse `(key_part, ...)`.
pub fn parse_key_parts(base: &mut TokenParser) -> Option<Vec<IndexKey>> {
    base.skip_whitespace();
    base.expect_token(&Token::LParen)?;
    let mut keys = Vec::new();
    loop {
        base.skip_whitespace();
        let mut key = if base.check_token(&Token::LParen) {
            let expr = base.consume_parenthesized()?;
            IndexKey::expression(format!("({})", expr))
        } else {
            let column = base.parse_identifier()?;
            base.skip_whitespace();
            let length = if base.check_token(&Token::LParen) {
                base.advance();
                base.skip_whitespace();
                let n = base.parse_positive_integer()?;
                base.skip_whitespace();
                base.expect_token(&Token::RParen)?;
                Some(n as u32)
            } else {
                None
            };
            IndexKey {
                column,
                length,
                descending: false,
            }
        };
        base.skip_whitespace();
        if base.expect_word_ci("DESC").is_some() {
            key.descending = true;
        } else {
            let _ = base.expect_word_ci("ASC");
        }
        keys.push(key);
        base.skip_whitespace();
        if base.expect_token(&Token::Comma).is_some() {
            continue;
        }
        base.expect_token(&Token::RParen)?;
        return Some(keys);
    }
}

/// Parse `REFERENCES tbl (cols) [MATCH ..] [ON DELETE action] [ON UPDATE action]`.
pub fn parse_reference(base: &mut TokenParser) -> Option<ReferenceDefinition> {
    base.skip_whitespace();
    base.expect_word_ci("REFERENCES")?;
    base.skip_whitespace();
    let (database, name) = base.parse_qualified_name()?;
    let columns = base.parse_identifier_list()?;

    let mut reference = ReferenceDefinition {
        table: ObjectName { database, name },
        columns,
        on_delete: None,
        on_update: None,
    };

    loop {
        let save = base.pos();
        base.skip_whitespace();
        if base.expect_word_ci("MATCH").is_some() {
            base.skip_whitespace();
            base.parse_identifier()?;
        } else if base.expect_words_ci(&["ON", "DELETE"]).is_some() {
            reference.on_delete = Some(parse_reference_action(base)?);
        } else if base.expect_words_ci(&["ON", "UPDATE"]).is_some() {
            reference.on_update = Some(parse_reference_action(base)?);
        } else {
            base.set_pos(save);
            return Some(reference);
        }
    }
}

fn parse_reference_action(base: &mut TokenParser) -> Option<String> {
    base.skip_whitespace();
    let actions: [&[&str]; 5] = [
        &["RESTRICT"],
        &["CASCADE"],
        &["SET", "NULL"],
        &["SET", "DEFAULT"],
        &["NO", "ACTION"],
    ];
    for action in actions {
        if base.expect_words_ci(action).is_some() {
            return Some(action.join(" "));
        }
    }
    None
}

/// Parse `(expr) [[NOT] ENFORCED]`, positioned after the CHECK keyword.
pub fn parse_check_tail(base: &mut TokenParser, name: Option<String>) -> Option<CheckDefinition> {
    base.skip_whitespace();
    let expression = base.consume_parenthesized()?;
    let save = base.pos();
    base.skip_whitespace();
    let enforced = if base.expect_words_ci(&["NOT", "ENFORCED"]).is_some() {
        false
    } else {
        if base.expect_word_ci("ENFORCED").is_none() {
            base.set_pos(save);
        }
        true
    };
    Some(CheckDefinition {
        name,
        expression,
        enforced,
    })
}
