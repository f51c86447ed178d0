pub mod expr;
pub mod location;
pub mod query;
pub mod statement;

pub use expr::{
    ArithmeticOperator, CaseWhen, CursorAttributeType, CursorStatusType, Expr, ExprKind,
    Identifier, LogicOperator, UnarySign, Variable,
};
pub use location::{HasLocation, Location};
pub use query::{
    format_table_name, AnalyticClause, AnalyticFunction, Field, FromClause, InlineTableDef, Join,
    JoinCondition, JoinType, LimitClause, NullsPosition, OrderDirection, OrderItem, SelectBody,
    SelectClause, SelectEntity, SelectQuery, SelectSet, SetOperator, Table, TableObject, TableRef,
};
pub use statement::{
    AggregateDeclaration, CaseStatement, CaseStatementWhen, CursorDeclaration, DeleteQuery, ElseIf,
    FetchPosition, FetchPositionType, FunctionDeclaration, IfStatement, InsertQuery, Statement,
    StatementKind, TableDeclaration, TransactionOp, UpdateQuery, UpdateSet, VariableAssignment,
};
