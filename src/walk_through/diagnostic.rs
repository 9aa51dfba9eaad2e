//! Walk-through diagnostics

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Stable numeric diagnostic codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    Internal,
    StatementCreateTableAs,
    ColumnNotExists,
    ColumnExists,
    DropAllColumns,
    InvalidColumnDefault,
    AutoIncrementExists,
    OnUpdateColumnNotDatetimeOrTimestamp,
    SetNullDefaultForNotNullColumn,
    TableNotExists,
    TableExists,
    NotCurrentDatabase,
    DatabaseIsDeleted,
    IndexExists,
    PrimaryKeyExists,
    IndexEmptyKeys,
    PrimaryKeyNotExists,
    IndexNotExists,
    SpatialIndexKeyNullable,
    ForeignKeyExists,
    ForeignKeyNotExists,
    CheckConstraintExists,
    CheckConstraintNotExists,
    ViewExists,
    ViewNotExists,
    SchemaNotExists,
}

impl DiagnosticCode {
    pub fn code(self) -> u32 {
        match self {
            DiagnosticCode::Internal => 1,
            DiagnosticCode::StatementCreateTableAs => 205,
            DiagnosticCode::ColumnNotExists => 405,
            DiagnosticCode::ColumnExists => 412,
            DiagnosticCode::DropAllColumns => 413,
            DiagnosticCode::InvalidColumnDefault => 423,
            DiagnosticCode::AutoIncrementExists => 426,
            DiagnosticCode::OnUpdateColumnNotDatetimeOrTimestamp => 427,
            DiagnosticCode::SetNullDefaultForNotNullColumn => 428,
            DiagnosticCode::TableNotExists => 604,
            DiagnosticCode::TableExists => 607,
            DiagnosticCode::NotCurrentDatabase => 702,
            DiagnosticCode::DatabaseIsDeleted => 703,
            DiagnosticCode::IndexExists => 805,
            DiagnosticCode::PrimaryKeyExists => 806,
            DiagnosticCode::IndexEmptyKeys => 807,
            DiagnosticCode::PrimaryKeyNotExists => 808,
            DiagnosticCode::IndexNotExists => 809,
            DiagnosticCode::SpatialIndexKeyNullable => 811,
            DiagnosticCode::ForeignKeyExists => 820,
            DiagnosticCode::ForeignKeyNotExists => 821,
            DiagnosticCode::CheckConstraintExists => 822,
            DiagnosticCode::CheckConstraintNotExists => 823,
            DiagnosticCode::ViewExists => 824,
            DiagnosticCode::ViewNotExists => 825,
            DiagnosticCode::SchemaNotExists => 1901,
        }
    }
}

/// A problem found while applying one statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: DiagnosticCode,
    pub message: String,
    /// 1-based line of the statement
    pub line: usize,
}

impl Diagnostic {
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {}: {} [{}] {}",
            self.line,
            self.severity,
            self.code.code(),
            self.message
        )
    }
}

/// Why a statement was refused; becomes an Error diagnostic once the
/// statement's line is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub code: DiagnosticCode,
    pub message: String,
}

impl Rejection {
    pub fn new(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn at(self, severity: Severity, line: usize) -> Diagnostic {
        Diagnostic {
            severity,
            code: self.code,
            message: self.message,
            line,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(DiagnosticCode::Internal.code(), 1);
        assert_eq!(DiagnosticCode::TableExists.code(), 607);
        assert_eq!(DiagnosticCode::IndexExists.code(), 805);
        assert_eq!(DiagnosticCode::SchemaNotExists.code(), 1901);
    }

    #[test]
    fn test_display() {
        let diagnostic = Rejection::new(DiagnosticCode::TableNotExists, "Table `t` does not exist")
            .at(Severity::Error, 3);
        assert_eq!(diagnostic.to_string(), "line 3: error [604] Table `t` does not exist");
        assert!(diagnostic.is_error());
    }
}
