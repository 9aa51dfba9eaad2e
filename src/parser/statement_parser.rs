//! Token-based detection of the DDL statements the engine understands
//!
//! ## Supported Patterns
//!
//! ```sql
//! CREATE [TEMPORARY] TABLE ... | CREATE [UNIQUE|FULLTEXT|SPATIAL] INDEX ... ON tbl (...)
//! CREATE [OR REPLACE] [ALGORITHM=..] [DEFINER=..] [SQL SECURITY ..] VIEW v [(cols)] AS select
//! CREATE {DATABASE|SCHEMA} [IF NOT EXISTS] db [options]
//! CREATE [DEFINER=..] {FUNCTION|PROCEDURE|EVENT|TRIGGER|SEQUENCE} ...
//! ALTER [ONLINE] [IGNORE] TABLE tbl alter_item, ...
//! ALTER {DATABASE|SCHEMA} [db] options | ALTER VIEW v AS select
//! DROP [TEMPORARY] TABLE [IF EXISTS] a, b | DROP INDEX i ON tbl | DROP VIEW ...
//! DROP {DATABASE|SCHEMA|FUNCTION|PROCEDURE|EVENT|TRIGGER|SEQUENCE} [IF EXISTS] name
//! RENAME TABLE a TO b, c TO d
//! USE db
//! ```
//!
//! Anything else becomes [`DdlStatement::Other`].

use std::fmt;

use sqlparser::tokenizer::Token;

use super::alter_parser::{AlterItem, AlterTokenParser};
use super::constraint_parser::{parse_key_parts, ConstraintTokenParser, IndexDefinition, IndexKind};
use super::table_parser::{parse_table_options, CreateTable, CreateTableBody, TableTokenParser};
use super::token_parser_base::TokenParser;
use crate::model::IndexType;

/// A possibly database-qualified object name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectName {
    pub database: Option<String>,
    pub name: String,
}

impl ObjectName {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            database: None,
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.database {
            Some(db) => write!(f, "{}.{}", db, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Stored program kinds kept as definition text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutineKind {
    Function,
    Procedure,
    Event,
    Trigger,
    Sequence,
}

impl RoutineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutineKind::Function => "FUNCTION",
            RoutineKind::Procedure => "PROCEDURE",
            RoutineKind::Event => "EVENT",
            RoutineKind::Trigger => "TRIGGER",
            RoutineKind::Sequence => "SEQUENCE",
        }
    }

    fn from_word(word: &str) -> Option<Self> {
        match word.to_uppercase().as_str() {
            "FUNCTION" => Some(RoutineKind::Function),
            "PROCEDURE" => Some(RoutineKind::Procedure),
            "EVENT" => Some(RoutineKind::Event),
            "TRIGGER" => Some(RoutineKind::Trigger),
            "SEQUENCE" => Some(RoutineKind::Sequence),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateView {
    pub name: ObjectName,
    pub or_replace: bool,
    /// Explicit `(col, ...)` list after the view name
    pub columns: Vec<String>,
    /// The select text after `AS`
    pub definition: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateRoutine {
    pub kind: RoutineKind,
    pub name: ObjectName,
    pub if_not_exists: bool,
    /// Full statement text
    pub definition: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateTrigger {
    pub name: ObjectName,
    /// `BEFORE` or `AFTER`
    pub timing: String,
    /// `INSERT`, `UPDATE` or `DELETE`
    pub event: String,
    pub table: ObjectName,
    pub body: String,
    /// Full statement text
    pub definition: String,
}

/// Result of statement detection
#[derive(Debug, Clone, PartialEq)]
pub enum DdlStatement {
    CreateTable(CreateTable),
    CreateTableLike {
        name: ObjectName,
        like: ObjectName,
        if_not_exists: bool,
    },
    CreateTableAs {
        name: ObjectName,
    },
    AlterTable {
        name: ObjectName,
        items: Vec<AlterItem>,
    },
    DropTable {
        names: Vec<ObjectName>,
        if_exists: bool,
    },
    CreateIndex {
        table: ObjectName,
        index: IndexDefinition,
    },
    DropIndex {
        table: ObjectName,
        name: String,
    },
    RenameTable {
        pairs: Vec<(ObjectName, ObjectName)>,
    },
    CreateView(CreateView),
    DropView {
        names: Vec<ObjectName>,
        if_exists: bool,
    },
    CreateDatabase {
        name: String,
        if_not_exists: bool,
        charset: Option<String>,
        collation: Option<String>,
    },
    AlterDatabase {
        name: Option<String>,
        charset: Option<String>,
        collation: Option<String>,
    },
    DropDatabase {
        name: String,
        if_exists: bool,
    },
    CreateTrigger(CreateTrigger),
    CreateRoutine(CreateRoutine),
    DropRoutine {
        kind: RoutineKind,
        name: ObjectName,
        if_exists: bool,
    },
    Use {
        database: String,
    },
    Other,
}

impl DdlStatement {
    /// Short upper-case label used in logs and diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            DdlStatement::CreateTable(_) => "CREATE TABLE",
            DdlStatement::CreateTableLike { .. } => "CREATE TABLE LIKE",
            DdlStatement::CreateTableAs { .. } => "CREATE TABLE AS",
            DdlStatement::AlterTable { .. } => "ALTER TABLE",
            DdlStatement::DropTable { .. } => "DROP TABLE",
            DdlStatement::CreateIndex { .. } => "CREATE INDEX",
            DdlStatement::DropIndex { .. } => "DROP INDEX",
            DdlStatement::RenameTable { .. } => "RENAME TABLE",
            DdlStatement::CreateView(_) => "CREATE VIEW",
            DdlStatement::DropView { .. } => "DROP VIEW",
            DdlStatement::CreateDatabase { .. } => "CREATE DATABASE",
            DdlStatement::AlterDatabase { .. } => "ALTER DATABASE",
            DdlStatement::DropDatabase { .. } => "DROP DATABASE",
            DdlStatement::CreateTrigger(_) => "CREATE TRIGGER",
            DdlStatement::CreateRoutine(_) => "CREATE ROUTINE",
            DdlStatement::DropRoutine { .. } => "DROP ROUTINE",
            DdlStatement::Use { .. } => "USE",
            DdlStatement::Other => "OTHER",
        }
    }
}

/// Token-based statement parser
pub struct StatementTokenParser {
    base: TokenParser,
}

impl StatementTokenParser {
    /// Create a parser for one statement's text. Returns `None` if the text
    /// cannot be tokenized.
    pub fn new(sql: &str) -> Option<Self> {
        Some(Self {
            base: TokenParser::new(sql)?,
        })
    }

    /// Position of the token the parser stopped at, as a byte offset.
    pub fn offset(&self) -> usize {
        self.base.offset_at(self.base.pos())
    }

    /// Detect and parse the statement.
    ///
    /// Returns `None` only when a recognized statement is malformed; unknown
    /// statements come back as [`DdlStatement::Other`].
    pub fn parse(&mut self) -> Option<DdlStatement> {
        self.base.skip_whitespace();
        if self.base.expect_word_ci("CREATE").is_some() {
            return self.parse_create();
        }
        if self.base.expect_word_ci("ALTER").is_some() {
            return self.parse_alter();
        }
        if self.base.expect_word_ci("DROP").is_some() {
            return self.parse_drop();
        }
        if self.base.expect_word_ci("RENAME").is_some() {
            self.base.skip_whitespace();
            if self.base.expect_word_ci("TABLE").is_none() && self.base.expect_word_ci("TABLES").is_none() {
                return Some(DdlStatement::Other);
            }
            return self.parse_rename_table();
        }
        if self.base.expect_word_ci("USE").is_some() {
            self.base.skip_whitespace();
            let database = self.base.parse_identifier()?;
            return Some(DdlStatement::Use { database });
        }
        Some(DdlStatement::Other)
    }

    // ========================================================================
    // CREATE
    // ========================================================================

    fn parse_create(&mut self) -> Option<DdlStatement> {
        let mut or_replace = false;
        let mut temporary = false;
        let mut index_kind = IndexKind::Plain;

        loop {
            self.base.skip_whitespace();
            if self.base.expect_words_ci(&["OR", "REPLACE"]).is_some() {
                or_replace = true;
            } else if self.base.expect_word_ci("TEMPORARY").is_some() {
                temporary = true;
            } else if self.base.expect_word_ci("UNIQUE").is_some() {
                index_kind = IndexKind::Unique;
            } else if self.base.expect_word_ci("FULLTEXT").is_some() {
                index_kind = IndexKind::Fulltext;
            } else if self.base.expect_word_ci("SPATIAL").is_some() {
                index_kind = IndexKind::Spatial;
            } else if self.base.expect_word_ci("ALGORITHM").is_some() {
                self.base.skip_optional_eq();
                self.base.parse_option_value()?;
            } else if self.base.expect_word_ci("DEFINER").is_some() {
                self.skip_definer()?;
            } else if self.base.expect_words_ci(&["SQL", "SECURITY"]).is_some() {
                self.base.skip_whitespace();
                self.base.parse_identifier()?;
            } else if self.base.expect_word_ci("AGGREGATE").is_some()
                || self.base.expect_word_ci("ONLINE").is_some()
                || self.base.expect_word_ci("OFFLINE").is_some()
            {
            } else {
                break;
            }
        }

        if self.base.expect_word_ci("TABLE").is_some() {
            return Some(match TableTokenParser::new(&mut self.base).parse(temporary)? {
                CreateTableBody::Definition(table) => DdlStatement::CreateTable(table),
                CreateTableBody::Like {
                    name,
                    like,
                    if_not_exists,
                } => DdlStatement::CreateTableLike {
                    name,
                    like,
                    if_not_exists,
                },
                CreateTableBody::AsSelect { name } => DdlStatement::CreateTableAs { name },
            });
        }
        if self.base.expect_word_ci("INDEX").is_some() {
            return self.parse_create_index(index_kind);
        }
        if self.base.expect_word_ci("VIEW").is_some() {
            return self.parse_view(or_replace).map(DdlStatement::CreateView);
        }
        if self.base.expect_word_ci("DATABASE").is_some() || self.base.expect_word_ci("SCHEMA").is_some() {
            return self.parse_create_database();
        }
        if self.base.expect_word_ci("TRIGGER").is_some() {
            return self.parse_trigger().map(DdlStatement::CreateTrigger);
        }
        if let Some(kind) = self.peek_routine_kind() {
            self.base.advance();
            self.base.skip_whitespace();
            let if_not_exists = self.base.parse_if_not_exists();
            let name = self.parse_object_name()?;
            return Some(DdlStatement::CreateRoutine(CreateRoutine {
                kind,
                name,
                if_not_exists,
                definition: self.base.source().trim().to_string(),
            }));
        }
        Some(DdlStatement::Other)
    }

    /// Skip `= user@host` or `= CURRENT_USER[()]`.
    fn skip_definer(&mut self) -> Option<()> {
        self.base.skip_optional_eq();
        self.base.skip_whitespace();
        while !self.base.is_at_end() {
            if self.base.check_word_ci("SQL") || self.peek_object_keyword() {
                return Some(());
            }
            self.base.advance();
        }
        None
    }

    fn peek_object_keyword(&self) -> bool {
        ["TABLE", "VIEW", "TRIGGER", "FUNCTION", "PROCEDURE", "EVENT", "AGGREGATE"]
            .iter()
            .any(|w| self.base.check_word_ci(w))
    }

    fn peek_routine_kind(&self) -> Option<RoutineKind> {
        match &self.base.current_token()?.token {
            Token::Word(w) if w.quote_style.is_none() => RoutineKind::from_word(&w.value),
            _ => None,
        }
    }

    fn parse_object_name(&mut self) -> Option<ObjectName> {
        self.base.skip_whitespace();
        let (database, name) = self.base.parse_qualified_name()?;
        Some(ObjectName { database, name })
    }

    fn parse_create_index(&mut self, kind: IndexKind) -> Option<DdlStatement> {
        self.base.skip_whitespace();
        let name = self.base.parse_identifier()?;
        self.base.skip_whitespace();

        let mut index = IndexDefinition {
            name: Some(name),
            kind,
            keys: Vec::new(),
            using: None,
            comment: None,
            visible: true,
        };
        if self.base.expect_word_ci("USING").is_some() {
            self.base.skip_whitespace();
            let word = self.base.parse_identifier()?;
            index.using = Some(IndexType::from_keyword(&word)?);
            self.base.skip_whitespace();
        }
        self.base.expect_word_ci("ON")?;
        let table = self.parse_object_name()?;
        self.base.skip_whitespace();
        index.keys = parse_key_parts(&mut self.base)?;
        ConstraintTokenParser::new(&mut self.base).parse_index_options(&mut index)?;
        Some(DdlStatement::CreateIndex { table, index })
    }

    fn parse_view(&mut self, or_replace: bool) -> Option<CreateView> {
        let name = self.parse_object_name()?;
        self.base.skip_whitespace();
        let columns = if self.base.check_token(&Token::LParen) {
            self.base.parse_identifier_list()?
        } else {
            Vec::new()
        };
        self.base.skip_whitespace();
        self.base.expect_word_ci("AS")?;
        self.base.skip_whitespace();
        let start = self.base.pos();
        let end = self.base.tokens().len();
        let definition = self.base.source_between(start, end).trim_end_matches(';').trim().to_string();
        if definition.is_empty() {
            return None;
        }
        Some(CreateView {
            name,
            or_replace,
            columns,
            definition,
        })
    }

    fn parse_create_database(&mut self) -> Option<DdlStatement> {
        self.base.skip_whitespace();
        let if_not_exists = self.base.parse_if_not_exists();
        self.base.skip_whitespace();
        let name = self.base.parse_identifier()?;
        let (charset, collation) = self.parse_database_options();
        Some(DdlStatement::CreateDatabase {
            name,
            if_not_exists,
            charset,
            collation,
        })
    }

    fn parse_database_options(&mut self) -> (Option<String>, Option<String>) {
        let options = parse_table_options(&mut self.base);
        let last = |name: &str| {
            options
                .iter()
                .rev()
                .find(|o| o.name == name)
                .map(|o| o.value.clone())
        };
        (last("CHARSET"), last("COLLATE"))
    }

    /// `TRIGGER [IF NOT EXISTS] name {BEFORE|AFTER} {INSERT|UPDATE|DELETE}
    ///  ON tbl FOR EACH ROW [{FOLLOWS|PRECEDES} other] body`
    fn parse_trigger(&mut self) -> Option<CreateTrigger> {
        self.base.skip_whitespace();
        let _ = self.base.parse_if_not_exists();
        let name = self.parse_object_name()?;
        self.base.skip_whitespace();
        let timing = self.base.parse_identifier()?.to_uppercase();
        if timing != "BEFORE" && timing != "AFTER" {
            return None;
        }
        self.base.skip_whitespace();
        let event = self.base.parse_identifier()?.to_uppercase();
        if !matches!(event.as_str(), "INSERT" | "UPDATE" | "DELETE") {
            return None;
        }
        self.base.skip_whitespace();
        self.base.expect_word_ci("ON")?;
        let table = self.parse_object_name()?;
        self.base.skip_whitespace();
        self.base.expect_words_ci(&["FOR", "EACH", "ROW"])?;
        self.base.skip_whitespace();
        if self.base.expect_word_ci("FOLLOWS").is_some() || self.base.expect_word_ci("PRECEDES").is_some() {
            self.base.skip_whitespace();
            self.base.parse_identifier()?;
            self.base.skip_whitespace();
        }
        let start = self.base.pos();
        let body = self
            .base
            .source_between(start, self.base.tokens().len())
            .trim_end_matches(';')
            .trim()
            .to_string();
        if body.is_empty() {
            return None;
        }
        Some(CreateTrigger {
            name,
            timing,
            event,
            table,
            body,
            definition: self.base.source().trim().to_string(),
        })
    }

    // ========================================================================
    // ALTER
    // ========================================================================

    fn parse_alter(&mut self) -> Option<DdlStatement> {
        loop {
            self.base.skip_whitespace();
            if self.base.expect_word_ci("ONLINE").is_some() || self.base.expect_word_ci("IGNORE").is_some() {
                continue;
            }
            if self.base.expect_word_ci("ALGORITHM").is_some() {
                self.base.skip_optional_eq();
                self.base.parse_option_value()?;
                continue;
            }
            if self.base.expect_word_ci("DEFINER").is_some() {
                self.skip_definer()?;
                continue;
            }
            if self.base.expect_words_ci(&["SQL", "SECURITY"]).is_some() {
                self.base.skip_whitespace();
                self.base.parse_identifier()?;
                continue;
            }
            break;
        }

        if self.base.expect_word_ci("TABLE").is_some() {
            let name = self.parse_object_name()?;
            let items = AlterTokenParser::new(&mut self.base).parse_items()?;
            return Some(DdlStatement::AlterTable { name, items });
        }
        if self.base.expect_word_ci("DATABASE").is_some() || self.base.expect_word_ci("SCHEMA").is_some() {
            self.base.skip_whitespace();
            let name = if self.starts_database_option() {
                None
            } else {
                Some(self.base.parse_identifier()?)
            };
            let (charset, collation) = self.parse_database_options();
            return Some(DdlStatement::AlterDatabase {
                name,
                charset,
                collation,
            });
        }
        if self.base.expect_word_ci("VIEW").is_some() {
            return self.parse_view(true).map(DdlStatement::CreateView);
        }
        Some(DdlStatement::Other)
    }

    fn starts_database_option(&self) -> bool {
        self.base.is_at_end()
            || ["DEFAULT", "CHARACTER", "CHARSET", "COLLATE", "ENCRYPTION", "READ"]
                .iter()
                .any(|w| self.base.check_word_ci(w))
    }

    // ========================================================================
    // DROP / RENAME
    // ========================================================================

    fn parse_drop(&mut self) -> Option<DdlStatement> {
        self.base.skip_whitespace();
        let _ = self.base.expect_word_ci("TEMPORARY");
        self.base.skip_whitespace();

        if self.base.expect_word_ci("TABLE").is_some() || self.base.expect_word_ci("TABLES").is_some() {
            let if_exists = self.parse_if_exists_ws();
            let names = self.parse_name_list()?;
            return Some(DdlStatement::DropTable { names, if_exists });
        }
        if self.base.expect_word_ci("VIEW").is_some() {
            let if_exists = self.parse_if_exists_ws();
            let names = self.parse_name_list()?;
            return Some(DdlStatement::DropView { names, if_exists });
        }
        if self.base.expect_word_ci("INDEX").is_some() {
            self.base.skip_whitespace();
            let name = self.base.parse_identifier()?;
            self.base.skip_whitespace();
            self.base.expect_word_ci("ON")?;
            let table = self.parse_object_name()?;
            return Some(DdlStatement::DropIndex { table, name });
        }
        if self.base.expect_word_ci("DATABASE").is_some() || self.base.expect_word_ci("SCHEMA").is_some() {
            let if_exists = self.parse_if_exists_ws();
            self.base.skip_whitespace();
            let name = self.base.parse_identifier()?;
            return Some(DdlStatement::DropDatabase { name, if_exists });
        }
        if let Some(kind) = self.peek_routine_kind() {
            self.base.advance();
            let if_exists = self.parse_if_exists_ws();
            let name = self.parse_object_name()?;
            return Some(DdlStatement::DropRoutine {
                kind,
                name,
                if_exists,
            });
        }
        Some(DdlStatement::Other)
    }

    fn parse_if_exists_ws(&mut self) -> bool {
        self.base.skip_whitespace();
        self.base.parse_if_exists()
    }

    fn parse_name_list(&mut self) -> Option<Vec<ObjectName>> {
        let mut names = Vec::new();
        loop {
            names.push(self.parse_object_name()?);
            self.base.skip_whitespace();
            if self.base.expect_token(&Token::Comma).is_none() {
                return Some(names);
            }
        }
    }

    fn parse_rename_table(&mut self) -> Option<DdlStatement> {
        let mut pairs = Vec::new();
        loop {
            let from = self.parse_object_name()?;
            self.base.skip_whitespace();
            self.base.expect_word_ci("TO")?;
            let to = self.parse_object_name()?;
            pairs.push((from, to));
            self.base.skip_whitespace();
            if self.base.expect_token(&Token::Comma).is_none() {
                return Some(DdlStatement::RenameTable { pairs });
            }
        }
    }
}

/// Parse one statement's text into a [`DdlStatement`].
pub fn parse_statement(sql: &str) -> Option<DdlStatement> {
    StatementTokenParser::new(sql)?.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_table_variants() {
        assert!(matches!(
            parse_statement("CREATE TABLE t (id int)"),
            Some(DdlStatement::CreateTable(_))
        ));
        assert!(matches!(
            parse_statement("CREATE TABLE IF NOT EXISTS t2 LIKE t1"),
            Some(DdlStatement::CreateTableLike { if_not_exists: true, .. })
        ));
        assert!(matches!(
            parse_statement("CREATE TABLE t3 AS SELECT 1"),
            Some(DdlStatement::CreateTableAs { .. })
        ));
    }

    #[test]
    fn test_create_index() {
        let stmt = parse_statement("CREATE UNIQUE INDEX `uk_email` USING HASH ON `users` (`email`(10) DESC) COMMENT 'x'");
        match stmt {
            Some(DdlStatement::CreateIndex { table, index }) => {
                assert_eq!(table.name, "users");
                assert_eq!(index.name.as_deref(), Some("uk_email"));
                assert_eq!(index.kind, IndexKind::Unique);
                assert_eq!(index.using, Some(IndexType::Hash));
                assert_eq!(index.keys[0].length, Some(10));
                assert!(index.keys[0].descending);
                assert_eq!(index.comment.as_deref(), Some("x"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_create_view_with_definer() {
        let stmt = parse_statement(
            "CREATE OR REPLACE ALGORITHM=UNDEFINED DEFINER=`root`@`%` SQL SECURITY DEFINER VIEW `v` (a, b) AS SELECT id, name FROM t",
        );
        match stmt {
            Some(DdlStatement::CreateView(view)) => {
                assert!(view.or_replace);
                assert_eq!(view.name.name, "v");
                assert_eq!(view.columns, vec!["a".to_string(), "b".to_string()]);
                assert_eq!(view.definition, "SELECT id, name FROM t");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_database_statements() {
        match parse_statement("CREATE DATABASE IF NOT EXISTS shop DEFAULT CHARACTER SET utf8mb4 COLLATE utf8mb4_bin") {
            Some(DdlStatement::CreateDatabase {
                name,
                if_not_exists,
                charset,
                collation,
            }) => {
                assert_eq!(name, "shop");
                assert!(if_not_exists);
                assert_eq!(charset.as_deref(), Some("utf8mb4"));
                assert_eq!(collation.as_deref(), Some("utf8mb4_bin"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            parse_statement("ALTER DATABASE CHARACTER SET latin1"),
            Some(DdlStatement::AlterDatabase { name: None, .. })
        ));
        assert!(matches!(
            parse_statement("DROP SCHEMA IF EXISTS shop"),
            Some(DdlStatement::DropDatabase { if_exists: true, .. })
        ));
    }

    #[test]
    fn test_trigger() {
        let stmt = parse_statement(
            "CREATE DEFINER=`root`@`localhost` TRIGGER trg BEFORE INSERT ON t FOR EACH ROW SET NEW.a = 1",
        );
        match stmt {
            Some(DdlStatement::CreateTrigger(trigger)) => {
                assert_eq!(trigger.name.name, "trg");
                assert_eq!(trigger.timing, "BEFORE");
                assert_eq!(trigger.event, "INSERT");
                assert_eq!(trigger.table.name, "t");
                assert_eq!(trigger.body, "SET NEW.a = 1");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_routines_and_drops() {
        assert!(matches!(
            parse_statement("CREATE FUNCTION f() RETURNS INT RETURN 1"),
            Some(DdlStatement::CreateRoutine(CreateRoutine { kind: RoutineKind::Function, .. }))
        ));
        assert!(matches!(
            parse_statement("DROP PROCEDURE IF EXISTS p"),
            Some(DdlStatement::DropRoutine { kind: RoutineKind::Procedure, if_exists: true, .. })
        ));
        match parse_statement("DROP TABLE IF EXISTS a, db.b CASCADE") {
            Some(DdlStatement::DropTable { names, if_exists }) => {
                assert!(if_exists);
                assert_eq!(names.len(), 2);
                assert_eq!(names[1].database.as_deref(), Some("db"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            parse_statement("DROP INDEX idx ON t"),
            Some(DdlStatement::DropIndex { .. })
        ));
    }

    #[test]
    fn test_rename_and_other() {
        match parse_statement("RENAME TABLE a TO b, c TO other.d") {
            Some(DdlStatement::RenameTable { pairs }) => {
                assert_eq!(pairs.len(), 2);
                assert_eq!(pairs[1].1.database.as_deref(), Some("other"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(parse_statement("SET NAMES utf8mb4"), Some(DdlStatement::Other));
        assert_eq!(parse_statement("INSERT INTO t VALUES (1)"), Some(DdlStatement::Other));
    }

    #[test]
    fn test_malformed_statement() {
        assert_eq!(parse_statement("CREATE TABLE (id int)"), None);
    }
}
