//! MySQL script parsing: preprocessing, statement splitting and detection

use std::ops::Range;
use std::path::{Path, PathBuf};

use anyhow::Result;
use rayon::prelude::*;
use sqlparser::tokenizer::Token;
use tracing::debug;

use super::preprocess_parser::preprocess_mysql;
use super::statement_parser::{DdlStatement, StatementTokenParser};
use super::token_parser_base::tokenize;
use crate::error::SchemaDiffError;

/// One statement of a script
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedStatement {
    pub statement: DdlStatement,
    /// Statement text without the terminating `;`, version-comment markers blanked
    pub sql_text: String,
    /// Byte span of `sql_text` within the script
    pub span: Range<usize>,
    /// Byte offset just past the terminating `;` (equal to `span.end` if none)
    pub end: usize,
    /// 1-based line of the first token
    pub line: usize,
    pub source_file: Option<PathBuf>,
}

impl ParsedStatement {
    /// Translate a span relative to `sql_text` into a span of the script.
    pub fn absolute(&self, relative: &Range<usize>) -> Range<usize> {
        self.span.start + relative.start..self.span.start + relative.end
    }
}

/// Minimum number of files to benefit from parallel processing.
/// Below this threshold, sequential processing is faster due to rayon overhead.
const PARALLEL_THRESHOLD: usize = 8;

/// Parse multiple SQL files, using parallel processing for larger file sets
pub fn parse_sql_files(files: &[PathBuf]) -> Result<Vec<ParsedStatement>> {
    let mut all_statements = Vec::with_capacity(files.len() * 4);

    if files.len() >= PARALLEL_THRESHOLD {
        let results: Vec<Result<Vec<ParsedStatement>>> =
            files.par_iter().map(|file| parse_sql_file(file)).collect();

        for result in results {
            all_statements.extend(result?);
        }
    } else {
        for file in files {
            all_statements.extend(parse_sql_file(file)?);
        }
    }

    Ok(all_statements)
}

/// Parse a single SQL file
pub fn parse_sql_file(path: &Path) -> Result<Vec<ParsedStatement>> {
    let content = read_sql_file(path)?;
    let mut statements = parse_sql(&content)?;
    for statement in &mut statements {
        statement.source_file = Some(path.to_path_buf());
    }
    Ok(statements)
}

/// Read a SQL file, stripping a UTF-8 BOM if present.
pub fn read_sql_file(path: &Path) -> Result<String, SchemaDiffError> {
    let content = std::fs::read_to_string(path).map_err(|e| SchemaDiffError::SqlFileReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(match content.strip_prefix('\u{FEFF}') {
        Some(stripped) => stripped.to_string(),
        None => content,
    })
}

/// Split a script into statements and detect each statement's kind.
pub fn parse_sql(text: &str) -> Result<Vec<ParsedStatement>, SchemaDiffError> {
    let preprocessed = preprocess_mysql(text);
    let (tokens, offsets) = tokenize(&preprocessed).map_err(|e| SchemaDiffError::SqlParseError {
        line: e.location.line as usize,
        column: e.location.column as usize,
        message: e.message.clone(),
    })?;

    let mut statements = Vec::new();
    for chunk in split_statements(&tokens.iter().map(|t| &t.token).collect::<Vec<_>>()) {
        let Some(first) = chunk.first else { continue };
        let span = offsets[first].start..offsets[chunk.last].end;
        let end = chunk.terminator.map(|t| offsets[t].end).unwrap_or(span.end);
        let sql_text = preprocessed[span.clone()].to_string();

        let statement = StatementTokenParser::new(&sql_text)
            .and_then(|mut parser| match parser.parse() {
                Some(statement) => Some(Ok(statement)),
                None => Some(Err(parser.offset())),
            })
            .unwrap_or(Err(0));

        let statement = match statement {
            Ok(statement) => statement,
            Err(relative) => {
                let (line, column) = line_column(text, span.start + relative);
                return Err(SchemaDiffError::SqlParseError {
                    line,
                    column,
                    message: format!("Malformed statement: {}", first_line(&sql_text)),
                });
            }
        };

        statements.push(ParsedStatement {
            statement,
            sql_text,
            span,
            end,
            line: tokens[first].span.start.line as usize,
            source_file: None,
        });
    }

    debug!(statements = statements.len(), "parsed SQL script");
    Ok(statements)
}

/// Token index bounds of one statement
struct StatementChunk {
    /// First significant token
    first: Option<usize>,
    /// Last significant token before the terminator
    last: usize,
    terminator: Option<usize>,
}

/// Split on `;` at parenthesis depth zero outside `BEGIN ... END` and
/// `CASE ... END` blocks.
fn split_statements(tokens: &[&Token]) -> Vec<StatementChunk> {
    let mut chunks = Vec::new();
    let mut paren_depth = 0usize;
    let mut block_depth = 0usize;
    let mut current = StatementChunk {
        first: None,
        last: 0,
        terminator: None,
    };

    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::Whitespace(_) => continue,
            Token::LParen => paren_depth += 1,
            Token::RParen => paren_depth = paren_depth.saturating_sub(1),
            Token::SemiColon if paren_depth == 0 && block_depth == 0 => {
                current.terminator = Some(i);
                chunks.push(current);
                current = StatementChunk {
                    first: None,
                    last: 0,
                    terminator: None,
                };
                continue;
            }
            Token::Word(w) if w.quote_style.is_none() => {
                let next = next_significant(tokens, i + 1);
                if w.value.eq_ignore_ascii_case("BEGIN") {
                    let transaction = match next {
                        None | Some(Token::SemiColon) => true,
                        Some(Token::Word(n)) => n.value.eq_ignore_ascii_case("WORK"),
                        _ => false,
                    };
                    if !transaction {
                        block_depth += 1;
                    }
                } else if w.value.eq_ignore_ascii_case("CASE") {
                    block_depth += 1;
                } else if w.value.eq_ignore_ascii_case("END") {
                    let closes_other = matches!(next, Some(Token::Word(n))
                        if n.quote_style.is_none()
                            && ["IF", "LOOP", "WHILE", "REPEAT"].iter().any(|k| n.value.eq_ignore_ascii_case(k)));
                    if !closes_other {
                        block_depth = block_depth.saturating_sub(1);
                    }
                }
            }
            _ => {}
        }
        if current.first.is_none() {
            current.first = Some(i);
        }
        current.last = i;
    }
    if current.first.is_some() {
        chunks.push(current);
    }
    chunks
}

fn next_significant<'a>(tokens: &[&'a Token], from: usize) -> Option<&'a Token> {
    tokens[from.min(tokens.len())..]
        .iter()
        .copied()
        .find(|t| !matches!(t, Token::Whitespace(_)))
}

/// 1-based line and character column of a byte offset.
pub fn line_column(text: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(text.len());
    let before = &text[..offset];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    (line, before[line_start..].chars().count() + 1)
}

fn first_line(sql: &str) -> &str {
    sql.lines().next().unwrap_or("").trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_simple_script() {
        let sql = "CREATE TABLE a (id int);\n\nCREATE TABLE b (id int);\n";
        let statements = parse_sql(sql).unwrap();
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0].sql_text, "CREATE TABLE a (id int)");
        assert_eq!(&sql[statements[1].span.clone()], "CREATE TABLE b (id int)");
        assert_eq!(statements[1].line, 3);
        assert_eq!(&sql[statements[1].span.end..statements[1].end], ";");
    }

    #[test]
    fn test_split_keeps_routine_bodies_whole() {
        let sql = "DELIMITER ;;\nCREATE PROCEDURE p()\nBEGIN\n  IF 1 THEN SELECT 1; END IF;\n  SELECT CASE WHEN 1 THEN 2 END;\nEND;;\nDELIMITER ;\nCREATE TABLE t (id int);";
        let statements = parse_sql(sql).unwrap();
        assert_eq!(statements.len(), 2);
        assert!(matches!(statements[0].statement, DdlStatement::CreateRoutine(_)));
        assert!(statements[0].sql_text.trim_end().ends_with("END"));
        assert!(matches!(statements[1].statement, DdlStatement::CreateTable(_)));
    }

    #[test]
    fn test_transaction_begin_is_not_a_block() {
        let statements = parse_sql("BEGIN; CREATE TABLE t (id int); COMMIT;").unwrap();
        assert_eq!(statements.len(), 3);
    }

    #[test]
    fn test_version_comments_are_parsed() {
        let sql = "/*!40101 SET NAMES utf8mb4 */;\nCREATE TABLE t (id int) /*!50100 PARTITION BY HASH (id) PARTITIONS 2 */;";
        let statements = parse_sql(sql).unwrap();
        match &statements[1].statement {
            DdlStatement::CreateTable(t) => assert!(t.partition.is_some()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_error_position() {
        let err = parse_sql("CREATE TABLE a (id int);\nCREATE TABLE (id int);").unwrap_err();
        match err {
            SchemaDiffError::SqlParseError { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_line_column() {
        assert_eq!(line_column("ab\ncd", 4), (2, 2));
        assert_eq!(line_column("ab", 0), (1, 1));
    }
}
