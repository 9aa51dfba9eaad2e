//! Token-based CREATE TABLE parsing
//!
//! Besides the structured definition, the parser records the byte span of
//! every table element, the table options and the partition clause. The
//! reconciler uses those spans to rewrite a statement in place.

use std::ops::Range;

use sqlparser::tokenizer::Token;

use super::column_parser::{ColumnDefinition, ColumnTokenParser};
use super::constraint_parser::{starts_constraint, ConstraintTokenParser, TableConstraint};
use super::partition_parser::PartitionTokenParser;
use super::statement_parser::ObjectName;
use super::token_parser_base::TokenParser;
use crate::model::PartitionState;

/// One entry of the parenthesized element list
#[derive(Debug, Clone, PartialEq)]
pub enum TableElement {
    Column(ColumnDefinition),
    Constraint(TableConstraint),
}

/// A table element with its byte span relative to the statement text
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedElement {
    pub element: TableElement,
    pub span: Range<usize>,
}

/// A single `name [=] value` table option
#[derive(Debug, Clone, PartialEq)]
pub struct TableOption {
    /// Upper-case option name; `CHARSET` and `CHARACTER SET` both become `CHARSET`
    pub name: String,
    pub value: String,
    pub span: Range<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateTable {
    pub name: ObjectName,
    pub if_not_exists: bool,
    pub temporary: bool,
    pub elements: Vec<SpannedElement>,
    /// Span of the `(` ... `)` element list, parentheses included
    pub body_span: Range<usize>,
    pub options: Vec<TableOption>,
    pub partition: Option<PartitionState>,
    pub partition_span: Option<Range<usize>>,
}

impl CreateTable {
    pub fn columns(&self) -> impl Iterator<Item = &ColumnDefinition> {
        self.elements.iter().filter_map(|e| match &e.element {
            TableElement::Column(c) => Some(c),
            _ => None,
        })
    }

    pub fn constraints(&self) -> impl Iterator<Item = &TableConstraint> {
        self.elements.iter().filter_map(|e| match &e.element {
            TableElement::Constraint(c) => Some(c),
            _ => None,
        })
    }

    /// Value of the last option with this (upper-case) name.
    pub fn option(&self, name: &str) -> Option<&str> {
        self.options
            .iter()
            .rev()
            .find(|o| o.name == name)
            .map(|o| o.value.as_str())
    }
}

/// What follows `CREATE TABLE name`
#[derive(Debug, Clone, PartialEq)]
pub enum CreateTableBody {
    Definition(CreateTable),
    Like { name: ObjectName, like: ObjectName, if_not_exists: bool },
    AsSelect { name: ObjectName },
}

/// Token-based CREATE TABLE parser
pub struct TableTokenParser<'a> {
    base: &'a mut TokenParser,
}

impl<'a> TableTokenParser<'a> {
    pub fn new(base: &'a mut TokenParser) -> Self {
        Self { base }
    }

    /// Parse the statement tail. Position must be just after `TABLE`.
    pub fn parse(&mut self, temporary: bool) -> Option<CreateTableBody> {
        let if_not_exists = self.base.parse_if_not_exists();
        let (database, table) = self.base.parse_qualified_name()?;
        let name = ObjectName {
            database,
            name: table,
        };
        self.base.skip_whitespace();

        if self.base.expect_word_ci("LIKE").is_some() {
            return self.parse_like(name, if_not_exists);
        }
        if self.base.check_token(&Token::LParen)
            && matches!(self.base.peek_significant(1), Some(Token::Word(w)) if w.value.eq_ignore_ascii_case("LIKE") && w.quote_style.is_none())
        {
            self.base.advance();
            self.base.skip_whitespace();
            self.base.expect_word_ci("LIKE")?;
            return self.parse_like(name, if_not_exists);
        }
        if self.check_select() {
            return Some(CreateTableBody::AsSelect { name });
        }

        let open = self.base.pos();
        self.base.expect_token(&Token::LParen)?;
        if self.check_select() {
            return Some(CreateTableBody::AsSelect { name });
        }
        let elements = self.parse_elements()?;
        let close = self.base.pos();
        self.base.expect_token(&Token::RParen)?;
        let body_span = self.base.offset_at(open)..self.base.end_offset_before(close + 1);

        let options = self.parse_options();
        self.base.skip_whitespace();

        let mut partition = None;
        let mut partition_span = None;
        if self.base.check_word_ci("PARTITION") {
            let start = self.base.pos();
            partition = Some(PartitionTokenParser::new(self.base).parse()?);
            partition_span = Some(self.base.offset_at(start)..self.base.end_offset_before(self.base.pos()));
            self.base.skip_whitespace();
        }

        if self.check_select() {
            return Some(CreateTableBody::AsSelect { name });
        }

        Some(CreateTableBody::Definition(CreateTable {
            name,
            if_not_exists,
            temporary,
            elements,
            body_span,
            options,
            partition,
            partition_span,
        }))
    }

    fn parse_like(&mut self, name: ObjectName, if_not_exists: bool) -> Option<CreateTableBody> {
        self.base.skip_whitespace();
        let (database, like) = self.base.parse_qualified_name()?;
        Some(CreateTableBody::Like {
            name,
            like: ObjectName { database, name: like },
            if_not_exists,
        })
    }

    fn check_select(&mut self) -> bool {
        self.base.skip_whitespace();
        if self.base.expect_word_ci("IGNORE").is_some() || self.base.expect_word_ci("REPLACE").is_some() {
            self.base.skip_whitespace();
        }
        if self.base.check_word_ci("AS") {
            return true;
        }
        self.base.check_word_ci("SELECT") || self.base.check_word_ci("WITH") || self.base.check_word_ci("TABLE")
    }

    fn parse_elements(&mut self) -> Option<Vec<SpannedElement>> {
        let mut elements = Vec::new();
        loop {
            self.base.skip_whitespace();
            let start = self.base.pos();
            let element = if starts_constraint(self.base) {
                TableElement::Constraint(ConstraintTokenParser::new(self.base).parse()?)
            } else {
                TableElement::Column(ColumnTokenParser::new(self.base).parse()?)
            };
            self.base.skip_to_any_token(&[Token::Comma, Token::RParen])?;
            let span = self.base.offset_at(start)..self.base.end_offset_before(self.base.pos());
            elements.push(SpannedElement { element, span });

            if self.base.expect_token(&Token::Comma).is_none() {
                return Some(elements);
            }
        }
    }

    /// Parse table options up to PARTITION, AS/SELECT or the end.
    pub fn parse_options(&mut self) -> Vec<TableOption> {
        parse_table_options(self.base)
    }
}

/// Parse a run of table options (`ENGINE=InnoDB DEFAULT CHARSET=utf8mb4 ...`).
///
/// Stops at PARTITION, a select, or any token that cannot start an option.
pub fn parse_table_options(base: &mut TokenParser) -> Vec<TableOption> {
    let mut options = Vec::new();
    loop {
        let save = base.pos();
        base.skip_whitespace();
        if base.expect_token(&Token::Comma).is_some() {
            base.skip_whitespace();
        }
        let start = base.pos();
        if base.is_at_end()
            || base.check_word_ci("PARTITION")
            || base.check_word_ci("AS")
            || base.check_word_ci("SELECT")
            || !matches!(base.current_token().map(|t| &t.token), Some(Token::Word(w)) if w.quote_style.is_none())
        {
            base.set_pos(save);
            return options;
        }

        let _ = base.expect_word_ci("DEFAULT");
        base.skip_whitespace();
        let name = if base.expect_words_ci(&["CHARACTER", "SET"]).is_some()
            || base.expect_word_ci("CHARSET").is_some()
        {
            "CHARSET".to_string()
        } else {
            match base.parse_identifier() {
                Some(word) => word.to_uppercase(),
                None => {
                    base.set_pos(save);
                    return options;
                }
            }
        };

        base.skip_optional_eq();
        let value = if base.check_token(&Token::LParen) {
            base.consume_parenthesized()
        } else {
            base.parse_option_value()
        };
        let Some(value) = value else {
            base.set_pos(save);
            return options;
        };

        let span = base.offset_at(start)..base.end_offset_before(base.pos());
        options.push(TableOption { name, value, span });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_table(sql: &str) -> CreateTable {
        let mut base = TokenParser::new(sql).unwrap();
        match TableTokenParser::new(&mut base).parse(false).unwrap() {
            CreateTableBody::Definition(t) => t,
            other => panic!("expected table definition, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_table_elements_and_spans() {
        let sql = "IF NOT EXISTS `shop`.`t` (\n  `id` int NOT NULL,\n  PRIMARY KEY (`id`)\n) ENGINE=InnoDB";
        let table = parse_table(sql);
        assert!(table.if_not_exists);
        assert_eq!(table.name.database.as_deref(), Some("shop"));
        assert_eq!(table.name.name, "t");
        assert_eq!(table.elements.len(), 2);
        assert_eq!(&sql[table.elements[0].span.clone()], "`id` int NOT NULL");
        assert_eq!(&sql[table.elements[1].span.clone()], "PRIMARY KEY (`id`)");
        assert!(sql[table.body_span.clone()].starts_with('('));
        assert!(sql[table.body_span.clone()].ends_with(')'));
    }

    #[test]
    fn test_parse_table_options() {
        let sql = "t (id int) ENGINE = InnoDB DEFAULT CHARSET=utf8mb4 COLLATE=utf8mb4_bin COMMENT='orders' AUTO_INCREMENT=5";
        let table = parse_table(sql);
        assert_eq!(table.option("ENGINE"), Some("InnoDB"));
        assert_eq!(table.option("CHARSET"), Some("utf8mb4"));
        assert_eq!(table.option("COLLATE"), Some("utf8mb4_bin"));
        assert_eq!(table.option("COMMENT"), Some("orders"));
        assert_eq!(table.option("AUTO_INCREMENT"), Some("5"));
        assert_eq!(&sql[table.options[3].span.clone()], "COMMENT='orders'");
    }

    #[test]
    fn test_parse_table_with_partition() {
        let sql = "t (id int) ENGINE=InnoDB PARTITION BY HASH (`id`) PARTITIONS 4";
        let table = parse_table(sql);
        assert!(table.partition.is_some());
        let span = table.partition_span.clone().unwrap();
        assert_eq!(&sql[span], "PARTITION BY HASH (`id`) PARTITIONS 4");
    }

    #[test]
    fn test_parse_like_and_select() {
        let mut base = TokenParser::new("t2 LIKE t1").unwrap();
        assert!(matches!(
            TableTokenParser::new(&mut base).parse(false),
            Some(CreateTableBody::Like { .. })
        ));

        let mut base = TokenParser::new("t2 (LIKE t1)").unwrap();
        assert!(matches!(
            TableTokenParser::new(&mut base).parse(false),
            Some(CreateTableBody::Like { .. })
        ));

        let mut base = TokenParser::new("t2 AS SELECT * FROM t1").unwrap();
        assert!(matches!(
            TableTokenParser::new(&mut base).parse(false),
            Some(CreateTableBody::AsSelect { .. })
        ));
    }
}
