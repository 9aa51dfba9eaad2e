//! Token-based ALTER TABLE parsing
//!
//! ```sql
//! ALTER [ONLINE] [IGNORE] TABLE tbl alter_item [, alter_item] ... [partition_options]
//! ```
//!
//! Each comma separated item becomes one [`AlterItem`]. Items outside the
//! supported surface are kept as [`AlterItem::Unsupported`] with their text.

use sqlparser::tokenizer::Token;

use super::column_parser::{parse_default_value, ColumnDefinition, ColumnTokenParser, DefaultClause};
use super::constraint_parser::{starts_constraint, ConstraintTokenParser, TableConstraint};
use super::partition_parser::PartitionTokenParser;
use super::statement_parser::ObjectName;
use super::table_parser::{parse_table_options, TableOption};
use super::token_parser_base::TokenParser;
use crate::model::PartitionState;

/// Where a new or modified column goes
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ColumnPosition {
    /// End of the table for ADD, unchanged for MODIFY/CHANGE
    #[default]
    Default,
    First,
    After(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AlterItem {
    AddColumns {
        columns: Vec<ColumnDefinition>,
        position: ColumnPosition,
    },
    AddConstraint(TableConstraint),
    DropColumn { name: String },
    DropPrimaryKey,
    DropIndex { name: String },
    DropForeignKey { name: String },
    DropCheck { name: String },
    /// `DROP CONSTRAINT x`: a foreign key, check or unique index
    DropConstraint { name: String },
    ModifyColumn {
        column: ColumnDefinition,
        position: ColumnPosition,
    },
    ChangeColumn {
        old_name: String,
        column: ColumnDefinition,
        position: ColumnPosition,
    },
    RenameColumn { old_name: String, new_name: String },
    /// `ALTER COLUMN c SET DEFAULT v` (Some) or `DROP DEFAULT` (None)
    AlterColumnDefault {
        column: String,
        default: Option<DefaultClause>,
    },
    AlterIndexVisibility { name: String, visible: bool },
    RenameIndex { old_name: String, new_name: String },
    RenameTable { new_name: ObjectName },
    SetOptions(Vec<TableOption>),
    Partition(PartitionState),
    RemovePartitioning,
    Unsupported(String),
}

/// Token-based ALTER TABLE item parser
pub struct AlterTokenParser<'a> {
    base: &'a mut TokenParser,
}

impl<'a> AlterTokenParser<'a> {
    pub fn new(base: &'a mut TokenParser) -> Self {
        Self { base }
    }

    /// Parse all items. Position must be just after the table name.
    pub fn parse_items(&mut self) -> Option<Vec<AlterItem>> {
        let mut items = Vec::new();
        loop {
            self.base.skip_whitespace();
            if self.base.is_at_end() || self.base.check_token(&Token::SemiColon) {
                return Some(items);
            }
            let item = self.parse_item()?;
            let options_item = matches!(item, AlterItem::SetOptions(_));
            items.push(item);

            self.base.skip_whitespace();
            if self.base.is_at_end() || self.base.check_token(&Token::SemiColon) {
                return Some(items);
            }
            if self.base.expect_token(&Token::Comma).is_some() {
                continue;
            }
            // Options and partition clauses need no separating comma
            if options_item || self.base.check_word_ci("PARTITION") {
                continue;
            }
            self.base.skip_to_any_token(&[Token::Comma, Token::SemiColon]);
            let _ = self.base.expect_token(&Token::Comma);
        }
    }

    fn parse_item(&mut self) -> Option<AlterItem> {
        let start = self.base.pos();

        if self.base.expect_word_ci("ADD").is_some() {
            return self.parse_add(start);
        }
        if self.base.expect_word_ci("DROP").is_some() {
            return self.parse_drop(start);
        }
        if self.base.expect_word_ci("MODIFY").is_some() {
            self.skip_column_keyword();
            let column = ColumnTokenParser::new(self.base).parse()?;
            let position = self.parse_position()?;
            return Some(AlterItem::ModifyColumn { column, position });
        }
        if self.base.expect_word_ci("CHANGE").is_some() {
            self.skip_column_keyword();
            let old_name = self.base.parse_identifier()?;
            let column = ColumnTokenParser::new(self.base).parse()?;
            let position = self.parse_position()?;
            return Some(AlterItem::ChangeColumn {
                old_name,
                column,
                position,
            });
        }
        if self.base.expect_word_ci("RENAME").is_some() {
            return self.parse_rename();
        }
        if self.base.expect_word_ci("ALTER").is_some() {
            return self.parse_alter(start);
        }
        if self.base.check_word_ci("PARTITION") {
            return PartitionTokenParser::new(self.base).parse().map(AlterItem::Partition);
        }
        if self.base.expect_words_ci(&["REMOVE", "PARTITIONING"]).is_some() {
            return Some(AlterItem::RemovePartitioning);
        }
        if self.base.expect_words_ci(&["CONVERT", "TO"]).is_some() {
            let options = parse_table_options(self.base);
            return Some(AlterItem::SetOptions(options));
        }
        if ["ALGORITHM", "LOCK", "FORCE", "VALIDATION", "WITHOUT", "WITH"]
            .iter()
            .any(|w| self.base.check_word_ci(w))
        {
            return Some(self.unsupported_from(start));
        }

        let options = parse_table_options(self.base);
        if !options.is_empty() {
            return Some(AlterItem::SetOptions(options));
        }
        Some(self.unsupported_from(start))
    }

    fn parse_add(&mut self, start: usize) -> Option<AlterItem> {
        self.base.skip_whitespace();
        if self.base.check_word_ci("PARTITION") {
            return Some(self.unsupported_from(start));
        }
        if starts_constraint(self.base) {
            return ConstraintTokenParser::new(self.base)
                .parse()
                .map(AlterItem::AddConstraint);
        }
        self.skip_column_keyword();
        if self.base.expect_token(&Token::LParen).is_some() {
            let mut columns = Vec::new();
            loop {
                columns.push(ColumnTokenParser::new(self.base).parse()?);
                self.base.skip_whitespace();
                if self.base.expect_token(&Token::Comma).is_some() {
                    continue;
                }
                self.base.expect_token(&Token::RParen)?;
                break;
            }
            return Some(AlterItem::AddColumns {
                columns,
                position: ColumnPosition::Default,
            });
        }
        let column = ColumnTokenParser::new(self.base).parse()?;
        let position = self.parse_position()?;
        Some(AlterItem::AddColumns {
            columns: vec![column],
            position,
        })
    }

    fn parse_drop(&mut self, start: usize) -> Option<AlterItem> {
        self.base.skip_whitespace();
        if self.base.expect_words_ci(&["PRIMARY", "KEY"]).is_some() {
            return Some(AlterItem::DropPrimaryKey);
        }
        if self.base.expect_words_ci(&["FOREIGN", "KEY"]).is_some() {
            self.base.skip_whitespace();
            let name = self.base.parse_identifier()?;
            return Some(AlterItem::DropForeignKey { name });
        }
        if self.base.expect_word_ci("INDEX").is_some() || self.base.expect_word_ci("KEY").is_some() {
            self.base.skip_whitespace();
            let name = self.base.parse_identifier()?;
            return Some(AlterItem::DropIndex { name });
        }
        if self.base.expect_word_ci("CHECK").is_some() {
            self.base.skip_whitespace();
            let name = self.base.parse_identifier()?;
            return Some(AlterItem::DropCheck { name });
        }
        if self.base.expect_word_ci("CONSTRAINT").is_some() {
            self.base.skip_whitespace();
            let name = self.base.parse_identifier()?;
            return Some(AlterItem::DropConstraint { name });
        }
        if self.base.check_word_ci("PARTITION") {
            return Some(self.unsupported_from(start));
        }
        self.skip_column_keyword();
        let name = self.base.parse_identifier()?;
        Some(AlterItem::DropColumn { name })
    }

    fn parse_rename(&mut self) -> Option<AlterItem> {
        self.base.skip_whitespace();
        if self.base.expect_word_ci("COLUMN").is_some() {
            self.base.skip_whitespace();
            let old_name = self.base.parse_identifier()?;
            self.base.skip_whitespace();
            self.base.expect_word_ci("TO")?;
            self.base.skip_whitespace();
            let new_name = self.base.parse_identifier()?;
            return Some(AlterItem::RenameColumn { old_name, new_name });
        }
        if self.base.expect_word_ci("INDEX").is_some() || self.base.expect_word_ci("KEY").is_some() {
            self.base.skip_whitespace();
            let old_name = self.base.parse_identifier()?;
            self.base.skip_whitespace();
            self.base.expect_word_ci("TO")?;
            self.base.skip_whitespace();
            let new_name = self.base.parse_identifier()?;
            return Some(AlterItem::RenameIndex { old_name, new_name });
        }
        if self.base.expect_word_ci("TO").is_some() || self.base.expect_word_ci("AS").is_some() {
            self.base.skip_whitespace();
        }
        let (database, name) = self.base.parse_qualified_name()?;
        Some(AlterItem::RenameTable {
            new_name: ObjectName { database, name },
        })
    }

    fn parse_alter(&mut self, start: usize) -> Option<AlterItem> {
        self.base.skip_whitespace();
        if self.base.expect_word_ci("INDEX").is_some() || self.base.expect_word_ci("KEY").is_some() {
            self.base.skip_whitespace();
            let name = self.base.parse_identifier()?;
            self.base.skip_whitespace();
            let visible = if self.base.expect_word_ci("VISIBLE").is_some() {
                true
            } else {
                self.base.expect_word_ci("INVISIBLE")?;
                false
            };
            return Some(AlterItem::AlterIndexVisibility { name, visible });
        }
        if self.base.check_word_ci("CHECK") || self.base.check_word_ci("CONSTRAINT") {
            return Some(self.unsupported_from(start));
        }

        self.skip_column_keyword();
        let column = self.base.parse_identifier()?;
        self.base.skip_whitespace();
        if self.base.expect_words_ci(&["SET", "DEFAULT"]).is_some() {
            self.base.skip_whitespace();
            let default = parse_default_value(self.base)?;
            return Some(AlterItem::AlterColumnDefault {
                column,
                default: Some(default),
            });
        }
        if self.base.expect_words_ci(&["DROP", "DEFAULT"]).is_some() {
            return Some(AlterItem::AlterColumnDefault {
                column,
                default: None,
            });
        }
        Some(self.unsupported_from(start))
    }

    /// Parse an optional `FIRST` / `AFTER col`.
    fn parse_position(&mut self) -> Option<ColumnPosition> {
        let save = self.base.pos();
        self.base.skip_whitespace();
        if self.base.expect_word_ci("FIRST").is_some() {
            return Some(ColumnPosition::First);
        }
        if self.base.expect_word_ci("AFTER").is_some() {
            self.base.skip_whitespace();
            return Some(ColumnPosition::After(self.base.parse_identifier()?));
        }
        self.base.set_pos(save);
        Some(ColumnPosition::Default)
    }

    fn skip_column_keyword(&mut self) {
        self.base.skip_whitespace();
        if self.base.expect_word_ci("COLUMN").is_some() {
            self.base.skip_whitespace();
        }
    }

    /// Consume the rest of the item and keep its text.
    fn unsupported_from(&mut self, start: usize) -> AlterItem {
        self.base.skip_to_any_token(&[Token::Comma, Token::SemiColon]);
        AlterItem::Unsupported(self.base.source_between(start, self.base.pos()).to_string())
    }
}
