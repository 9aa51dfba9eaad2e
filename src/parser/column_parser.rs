//! Token-based column definition parsing for MySQL
//!
//! ## Supported Syntax
//!
//! ```sql
//! `name` type[(args)] [UNSIGNED] [ZEROFILL]
//!     [CHARACTER SET cs] [COLLATE co]
//!     [NOT NULL | NULL]
//!     [DEFAULT {literal | NULL | expr | (expr)}]
//!     [AUTO_INCREMENT | AUTO_RANDOM[(shard[, range])]]
//!     [ON UPDATE CURRENT_TIMESTAMP[(fsp)]]
//!     [UNIQUE [KEY]] [[PRIMARY] KEY]
//!     [COMMENT 'text']
//!     [REFERENCES tbl (cols) [ON DELETE action] [ON UPDATE action]]
//!     [[CONSTRAINT [name]] CHECK (expr) [[NOT] ENFORCED]]
//! ```
//!
//! Attributes may appear in any order. Unknown attributes (`COLUMN_FORMAT`,
//! `STORAGE`, generated-column clauses, ...) are skipped.

use sqlparser::tokenizer::Token;

use super::constraint_parser::{parse_check_tail, parse_reference, CheckDefinition, ReferenceDefinition};
use super::token_parser_base::TokenParser;

/// Default clause exactly as written in the column definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultClause {
    /// `DEFAULT NULL`
    Null,
    /// A quoted string; holds the unescaped value.
    Literal(String),
    /// Anything else, verbatim (`0`, `CURRENT_TIMESTAMP`, `(uuid())`).
    Expression(String),
}

/// Result of parsing a column definition
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    /// Canonical lower-case type, e.g. `varchar(20)`, `int unsigned`
    pub data_type: String,
    /// Some(true) = explicit NULL, Some(false) = NOT NULL, None = implicit
    pub nullable: Option<bool>,
    pub default: Option<DefaultClause>,
    pub auto_increment: bool,
    /// AUTO_RANDOM parameters without parentheses; empty when none were given
    pub auto_random: Option<String>,
    pub on_update: Option<String>,
    pub comment: Option<String>,
    pub charset: Option<String>,
    pub collation: Option<String>,
    pub primary_key: bool,
    pub unique: bool,
    pub references: Option<ReferenceDefinition>,
    pub check: Option<CheckDefinition>,
}

/// Token-based column definition parser
pub struct ColumnTokenParser<'a> {
    base: &'a mut TokenParser,
}

impl<'a> ColumnTokenParser<'a> {
    pub fn new(base: &'a mut TokenParser) -> Self {
        Self { base }
    }

    /// Parse a column definition. Stops at the `,` or `)` that ends it.
    pub fn parse(&mut self) -> Option<ColumnDefinition> {
        self.base.skip_whitespace();
        let name = self.base.parse_identifier()?;
        self.base.skip_whitespace();
        let data_type = self.parse_data_type()?;

        let mut column = ColumnDefinition {
            name,
            data_type,
            ..Default::default()
        };
        self.parse_attributes(&mut column)?;
        Some(column)
    }

    // ========================================================================
    // Data types
    // ========================================================================

    fn parse_data_type(&mut self) -> Option<String> {
        let mut base_name = self.base.parse_identifier()?.to_lowercase();
        self.base.skip_whitespace();

        if base_name == "double" && self.base.expect_word_ci("PRECISION").is_some() {
            self.base.skip_whitespace();
        }
        if base_name == "long" && self.base.expect_word_ci("VARCHAR").is_some() {
            base_name = "mediumtext".to_string();
            self.base.skip_whitespace();
        }

        let args = if self.base.check_token(&Token::LParen) {
            let inner = self.base.consume_parenthesized()?;
            self.base.skip_whitespace();
            Some(inner)
        } else {
            None
        };

        let mut data_type = canonical_type(&base_name, args.as_deref());
        loop {
            if self.base.expect_word_ci("UNSIGNED").is_some() {
                data_type.push_str(" unsigned");
            } else if self.base.expect_word_ci("ZEROFILL").is_some() {
                data_type.push_str(" zerofill");
            } else if self.base.expect_word_ci("SIGNED").is_some() {
            } else {
                break;
            }
            self.base.skip_whitespace();
        }
        Some(data_type)
    }

    // ========================================================================
    // Attributes
    // ========================================================================

    fn parse_attributes(&mut self, column: &mut ColumnDefinition) -> Option<()> {
        loop {
            self.base.skip_whitespace();
            if self.base.is_at_end()
                || self.base.check_token(&Token::Comma)
                || self.base.check_token(&Token::RParen)
                || self.base.check_token(&Token::SemiColon)
                || self.base.check_word_ci("FIRST")
                || self.base.check_word_ci("AFTER")
            {
                return Some(());
            }

            if self.base.expect_words_ci(&["NOT", "NULL"]).is_some() {
                column.nullable = Some(false);
            } else if self.base.expect_word_ci("NULL").is_some() {
                column.nullable = Some(true);
            } else if self.base.expect_word_ci("DEFAULT").is_some() {
                self.base.skip_whitespace();
                if self.check_charset_keyword() {
                    column.charset = Some(self.parse_charset()?);
                } else if self.base.check_word_ci("COLLATE") {
                    column.collation = Some(self.parse_collate()?);
                } else {
                    column.default = Some(parse_default_value(self.base)?);
                }
            } else if self.base.expect_word_ci("AUTO_INCREMENT").is_some() {
                column.auto_increment = true;
            } else if self.base.expect_word_ci("AUTO_RANDOM").is_some() {
                self.base.skip_whitespace();
                let params = if self.base.check_token(&Token::LParen) {
                    self.base.consume_parenthesized()?
                } else {
                    String::new()
                };
                column.auto_random = Some(params);
            } else if self.base.expect_words_ci(&["ON", "UPDATE"]).is_some() {
                self.base.skip_whitespace();
                column.on_update = Some(normalize_on_update(&parse_simple_expression(self.base)?));
            } else if self.base.expect_word_ci("COMMENT").is_some() {
                self.base.skip_whitespace();
                column.comment = Some(self.base.parse_string_literal()?);
            } else if self.check_charset_keyword() {
                column.charset = Some(self.parse_charset()?);
            } else if self.base.check_word_ci("COLLATE") {
                column.collation = Some(self.parse_collate()?);
            } else if self.base.expect_words_ci(&["PRIMARY", "KEY"]).is_some()
                || self.base.expect_word_ci("KEY").is_some()
            {
                column.primary_key = true;
            } else if self.base.expect_word_ci("UNIQUE").is_some() {
                self.base.skip_whitespace();
                let _ = self.base.expect_word_ci("KEY");
                column.unique = true;
            } else if self.base.check_word_ci("REFERENCES") {
                column.references = Some(parse_reference(self.base)?);
            } else if self.base.check_word_ci("CONSTRAINT") || self.base.check_word_ci("CHECK") {
                column.check = Some(self.parse_inline_check()?);
            } else if self.base.check_word_ci("AS")
                || self.base.expect_words_ci(&["GENERATED", "ALWAYS"]).is_some()
            {
                self.skip_generated_clause();
            } else if self.base.check_token(&Token::LParen) {
                self.base.skip_parenthesized();
            } else {
                self.base.advance();
            }
        }
    }

    fn check_charset_keyword(&self) -> bool {
        self.base.check_word_ci("CHARSET") || self.base.check_word_ci("CHARACTER")
    }

    fn parse_charset(&mut self) -> Option<String> {
        if self.base.expect_word_ci("CHARACTER").is_some() {
            self.base.skip_whitespace();
            self.base.expect_word_ci("SET")?;
        } else {
            self.base.expect_word_ci("CHARSET")?;
        }
        self.base.skip_optional_eq();
        self.base.parse_option_value()
    }

    fn parse_collate(&mut self) -> Option<String> {
        self.base.expect_word_ci("COLLATE")?;
        self.base.skip_optional_eq();
        self.base.parse_option_value()
    }

    fn parse_inline_check(&mut self) -> Option<CheckDefinition> {
        let mut name = None;
        if self.base.expect_word_ci("CONSTRAINT").is_some() {
            self.base.skip_whitespace();
            if !self.base.check_word_ci("CHECK") {
                name = Some(self.base.parse_identifier()?);
                self.base.skip_whitespace();
            }
        }
        self.base.expect_word_ci("CHECK")?;
        parse_check_tail(self.base, name)
    }

    /// Skip `[GENERATED ALWAYS] AS (expr) [VIRTUAL | STORED]`.
    fn skip_generated_clause(&mut self) {
        self.base.skip_whitespace();
        let _ = self.base.expect_word_ci("AS");
        self.base.skip_whitespace();
        self.base.skip_parenthesized();
        self.base.skip_whitespace();
        if self.base.expect_word_ci("VIRTUAL").is_none() {
            let _ = self.base.expect_word_ci("STORED");
        }
    }
}

/// Parse a DEFAULT value. Position must be at the first token of the value.
pub fn parse_default_value(base: &mut TokenParser) -> Option<DefaultClause> {
    let start = base.pos();
    let token = base.current_token()?.token.clone();
    match token {
        Token::SingleQuotedString(s)
        | Token::DoubleQuotedString(s)
        | Token::NationalStringLiteral(s) => {
            base.advance();
            Some(DefaultClause::Literal(s))
        }
        Token::Word(w) if w.quote_style.is_none() && w.value.eq_ignore_ascii_case("NULL") => {
            base.advance();
            Some(DefaultClause::Null)
        }
        // Charset introducer: _utf8mb4'text'
        Token::Word(w) if w.quote_style.is_none() && w.value.starts_with('_') => {
            base.advance();
            match base.parse_string_literal() {
                Some(s) => Some(DefaultClause::Literal(s)),
                None => {
                    base.set_pos(start);
                    parse_simple_expression(base).map(DefaultClause::Expression)
                }
            }
        }
        Token::LParen => {
            base.skip_parenthesized();
            Some(DefaultClause::Expression(
                base.source_between(start, base.pos()).to_string(),
            ))
        }
        _ => parse_simple_expression(base).map(DefaultClause::Expression),
    }
}

/// Parse a signed number, a single word with optional call arguments, or any
/// other single literal token, returning its verbatim text.
pub fn parse_simple_expression(base: &mut TokenParser) -> Option<String> {
    let start = base.pos();
    if base.check_token(&Token::Minus) || base.check_token(&Token::Plus) {
        base.advance();
        base.skip_whitespace();
    }
    match &base.current_token()?.token {
        Token::Comma | Token::RParen | Token::SemiColon | Token::Whitespace(_) => return None,
        Token::Word(_) => {
            base.advance();
            let save = base.pos();
            base.skip_whitespace();
            if base.check_token(&Token::LParen) {
                base.skip_parenthesized();
            } else {
                base.set_pos(save);
            }
        }
        _ => base.advance(),
    }
    Some(base.source_between(start, base.pos()).to_string())
}

/// `now()`, `localtimestamp` and friends all mean CURRENT_TIMESTAMP.
pub fn normalize_on_update(expr: &str) -> String {
    let lower = expr.trim().to_lowercase();
    let (name, args) = match lower.find('(') {
        Some(i) => (lower[..i].trim().to_string(), lower[i..].replace(' ', "")),
        None => (lower.clone(), String::new()),
    };
    match name.as_str() {
        "current_timestamp" | "now" | "localtime" | "localtimestamp" => {
            if args.is_empty() || args == "()" {
                "CURRENT_TIMESTAMP".to_string()
            } else {
                format!("CURRENT_TIMESTAMP{}", args)
            }
        }
        _ => expr.trim().to_string(),
    }
}

/// Canonical lower-case spelling of a column type.
///
/// Synonyms collapse to the name MySQL reports (`integer` -> `int`,
/// `bool` -> `tinyint(1)`), YEAR always carries a display width of 4, and
/// ENUM/SET keep their value list verbatim.
pub fn canonical_type(base_name: &str, args: Option<&str>) -> String {
    let name = match base_name {
        "integer" | "int4" => "int",
        "int1" => "tinyint",
        "int2" => "smallint",
        "int3" | "middleint" => "mediumint",
        "int8" => "bigint",
        "numeric" | "dec" | "fixed" => "decimal",
        "real" | "float8" => "double",
        "float4" => "float",
        "character" | "nchar" => "char",
        "nvarchar" => "varchar",
        "bool" | "boolean" => return "tinyint(1)".to_string(),
        other => other,
    };

    match (name, args) {
        ("year", None) => "year(4)".to_string(),
        ("enum" | "set", Some(values)) => format!("{}({})", name, values),
        (_, Some(args)) => {
            let compact: Vec<String> = args.split(',').map(|a| a.trim().to_string()).collect();
            format!("{}({})", name, compact.join(","))
        }
        (_, None) => name.to_string(),
    }
}

/// Types that cannot carry a literal default value.
pub fn is_expression_default_only_type(data_type: &str) -> bool {
    let base = data_type
        .split(|c: char| c == '(' || c.is_whitespace())
        .next()
        .unwrap_or("")
        .to_lowercase();
    matches!(
        base.as_str(),
        "blob"
            | "tinyblob"
            | "mediumblob"
            | "longblob"
            | "text"
            | "tinytext"
            | "mediumtext"
            | "longtext"
            | "json"
            | "geometry"
            | "point"
            | "linestring"
            | "polygon"
            | "multipoint"
            | "multilinestring"
            | "multipolygon"
            | "geometrycollection"
    )
}

/// Whether the type accepts ON UPDATE CURRENT_TIMESTAMP.
pub fn is_time_type(data_type: &str) -> bool {
    let lower = data_type.to_lowercase();
    lower.starts_with("datetime") || lower.starts_with("timestamp")
}
