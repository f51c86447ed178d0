use thiserror::Error;

use crate::ast::Location;

/// Everything the engine can fail with. Each variant carries a stable
/// numeric code and, when the trigger was a node, its parse provenance.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error("{loc} syntax error: {message}")]
    Syntax { loc: Location, message: String },

    #[error("{loc} variable @{name} is undeclared")]
    UndeclaredVariable { loc: Location, name: String },
    #[error("{loc} variable @{name} is redeclared")]
    RedeclaredVariable { loc: Location, name: String },

    #[error("{loc} field {field} does not exist")]
    FieldNotExist { loc: Location, field: String },
    #[error("{loc} field {field} is ambiguous")]
    FieldAmbiguous { loc: Location, field: String },
    #[error("{loc} field number {number} does not exist in {view}")]
    FieldNumberNotExist { loc: Location, view: String, number: i64 },

    #[error("{loc} table {name} does not exist")]
    TableNotFound { loc: Location, name: String },
    #[error("{loc} table {name} is redeclared")]
    RedeclaredTable { loc: Location, name: String },
    #[error("{loc} inline table {name} is redeclared")]
    RedeclaredInlineTable { loc: Location, name: String },
    #[error("{loc} inline table {name} declares {defined} fields for {actual} columns")]
    InlineTableFieldMismatch { loc: Location, name: String, defined: usize, actual: usize },
    #[error("{loc} table name {name} is duplicated in the FROM clause")]
    DuplicateTableName { loc: Location, name: String },

    #[error("{loc} function {name} does not exist")]
    FunctionNotFound { loc: Location, name: String },
    #[error("{loc} function {name} is redeclared")]
    RedeclaredFunction { loc: Location, name: String },
    #[error("{loc} function {name} takes {expected} but {got} were given")]
    FunctionArity { loc: Location, name: String, expected: String, got: usize },

    #[error("{loc} cursor {name} is undeclared")]
    UndeclaredCursor { loc: Location, name: String },
    #[error("{loc} cursor {name} is redeclared")]
    RedeclaredCursor { loc: Location, name: String },
    #[error("{loc} cursor {name} is closed")]
    CursorClosed { loc: Location, name: String },
    #[error("{loc} cursor {name} is already open")]
    CursorAlreadyOpen { loc: Location, name: String },
    #[error("{loc} cursor {name} is a pseudo cursor")]
    PseudoCursor { loc: Location, name: String },
    #[error("{loc} fetch position {value} is not an integer")]
    InvalidFetchPosition { loc: Location, value: String },
    #[error("{loc} statement {name} is not a single select query")]
    InvalidCursorStatement { loc: Location, name: String },
    #[error("{loc} fetched row has {fields} fields for {variables} variables")]
    FetchFieldMismatch { loc: Location, fields: usize, variables: usize },

    #[error("{loc} prepared statement {name} does not exist")]
    PreparedStatementNotFound { loc: Location, name: String },
    #[error("{loc} prepared statement {name} is redeclared")]
    RedeclaredStatement { loc: Location, name: String },
    #[error("{loc} placeholder ?{index} has no replacement value")]
    PlaceholderUnbound { loc: Location, index: usize },

    #[error("{loc} UNION, INTERSECT and EXCEPT need matching field counts, got {left} and {right}")]
    SetOperationFieldMismatch { loc: Location, left: usize, right: usize },
    #[error("{loc} subquery returned more than one record")]
    SubqueryTooManyRecords { loc: Location },
    #[error("{loc} subquery returned more than one field")]
    SubqueryTooManyFields { loc: Location },
    #[error("{loc} aggregate function {name} cannot be used here")]
    AggregateNotAllowed { loc: Location, name: String },
    #[error("{loc} analytic function {name} cannot be used here")]
    AnalyticNotAllowed { loc: Location, name: String },
    #[error("{loc} {value} cannot be converted to {expected}")]
    TypeMismatch { loc: Location, value: String, expected: &'static str },
    #[error("{loc} LIMIT value {value} is invalid")]
    InvalidLimitValue { loc: Location, value: String },
    #[error("{loc} OFFSET value {value} is invalid")]
    InvalidOffsetValue { loc: Location, value: String },
    #[error("{loc} LIMIT WITH TIES needs an ORDER BY clause")]
    WithTiesWithoutOrderBy { loc: Location },
    #[error("{loc} NATURAL or USING join has no shared field")]
    JoinFieldNotFound { loc: Location },
    #[error("{loc} INSERT expects {expected} values per row, got {got}")]
    InsertFieldMismatch { loc: Location, expected: usize, got: usize },

    #[error("{loc} io error: {message}")]
    Io { loc: Location, message: String },
    #[error("query cancelled")]
    Cancelled,
    #[error("buffer capacity of {limit} records exceeded")]
    ResourceExhausted { limit: usize },
    #[error("{loc} error code {code}: {message}")]
    UserTriggered { loc: Location, code: i64, message: String },
}

impl QueryError {
    /// Stable code per taxonomy family; exit-status material for the
    /// surrounding command.
    pub fn code(&self) -> i32 {
        match self {
            Self::Syntax { .. } => 200,

            Self::UndeclaredVariable { .. }
            | Self::RedeclaredVariable { .. }
            | Self::FieldNotExist { .. }
            | Self::FieldAmbiguous { .. }
            | Self::FieldNumberNotExist { .. }
            | Self::TableNotFound { .. }
            | Self::RedeclaredTable { .. }
            | Self::RedeclaredInlineTable { .. }
            | Self::InlineTableFieldMismatch { .. }
            | Self::DuplicateTableName { .. }
            | Self::FunctionNotFound { .. }
            | Self::RedeclaredFunction { .. }
            | Self::FunctionArity { .. }
            | Self::PreparedStatementNotFound { .. }
            | Self::RedeclaredStatement { .. }
            | Self::PlaceholderUnbound { .. }
            | Self::SetOperationFieldMismatch { .. }
            | Self::SubqueryTooManyRecords { .. }
            | Self::SubqueryTooManyFields { .. }
            | Self::AggregateNotAllowed { .. }
            | Self::AnalyticNotAllowed { .. }
            | Self::InvalidLimitValue { .. }
            | Self::InvalidOffsetValue { .. }
            | Self::WithTiesWithoutOrderBy { .. }
            | Self::JoinFieldNotFound { .. }
            | Self::InsertFieldMismatch { .. } => 201,

            Self::TypeMismatch { .. } => 202,

            Self::UndeclaredCursor { .. }
            | Self::RedeclaredCursor { .. }
            | Self::CursorClosed { .. }
            | Self::CursorAlreadyOpen { .. }
            | Self::PseudoCursor { .. }
            | Self::InvalidFetchPosition { .. }
            | Self::InvalidCursorStatement { .. }
            | Self::FetchFieldMismatch { .. } => 203,

            Self::Io { .. } => 230,
            Self::Cancelled => 240,
            Self::ResourceExhausted { .. } => 241,
            Self::UserTriggered { code, .. } => (*code).clamp(i32::MIN as i64, i32::MAX as i64) as i32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_location_and_detail() {
        let err = QueryError::FieldNotExist {
            loc: Location::new("q.sql", 2, 8),
            field: "t.missing".into(),
        };
        assert_eq!(err.to_string(), "q.sql [L:2 C:8] field t.missing does not exist");
    }

    #[test]
    fn unknown_locations_render_without_prefix_noise() {
        let err = QueryError::Cancelled;
        assert_eq!(err.to_string(), "query cancelled");
        let err = QueryError::UndeclaredCursor { loc: Location::default(), name: "cur".into() };
        assert_eq!(err.to_string(), " cursor cur is undeclared");
    }

    #[test]
    fn codes_follow_the_taxonomy_families() {
        let loc = Location::default;
        assert_eq!(QueryError::Syntax { loc: loc(), message: String::new() }.code(), 200);
        assert_eq!(
            QueryError::TableNotFound { loc: loc(), name: "t".into() }.code(),
            201
        );
        assert_eq!(
            QueryError::TypeMismatch { loc: loc(), value: "'x'".into(), expected: "number" }.code(),
            202
        );
        assert_eq!(
            QueryError::CursorClosed { loc: loc(), name: "c".into() }.code(),
            203
        );
        assert_eq!(QueryError::Cancelled.code(), 240);
        assert_eq!(
            QueryError::UserTriggered { loc: loc(), code: 7, message: "boom".into() }.code(),
            7
        );
    }
}
