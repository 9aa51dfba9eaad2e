//! MySQL DDL parsing
//!
//! The tokenizer comes from sqlparser; statement detection and the DDL
//! surface the engine consumes are token-based parsers built on
//! [`token_parser_base::TokenParser`].

mod alter_parser;
mod column_parser;
mod constraint_parser;
pub mod identifier_utils;
mod mysql_parser;
mod partition_parser;
mod preprocess_parser;
mod statement_parser;
mod table_parser;
mod token_parser_base;

pub use alter_parser::{AlterItem, ColumnPosition};
pub use column_parser::{
    canonical_type, is_expression_default_only_type, is_time_type, normalize_on_update,
    ColumnDefinition, DefaultClause,
};
pub use constraint_parser::{
    CheckDefinition, ForeignKeyDefinition, IndexDefinition, IndexKind, ReferenceDefinition,
    TableConstraint,
};
pub use mysql_parser::{
    line_column, parse_sql, parse_sql_file, parse_sql_files, read_sql_file, ParsedStatement,
};
pub use partition_parser::split_top_level;
pub use preprocess_parser::preprocess_mysql;
pub use statement_parser::{
    parse_statement, CreateRoutine, CreateTrigger, CreateView, DdlStatement, ObjectName,
    RoutineKind,
};
pub use table_parser::{CreateTable, SpannedElement, TableElement, TableOption};
