use crate::ast::expr::{Expr, Identifier, Variable};
use crate::ast::location::{HasLocation, Location};
use crate::ast::query::SelectQuery;

/// A procedural or query statement with its parse provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub loc: Location,
    pub kind: StatementKind,
}

impl Statement {
    pub fn new(kind: StatementKind) -> Self {
        Self { loc: Location::default(), kind }
    }

    pub fn at(kind: StatementKind, loc: Location) -> Self {
        Self { loc, kind }
    }
}

impl HasLocation for Statement {
    fn location(&self) -> &Location {
        &self.loc
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatementKind {
    Select(SelectQuery),
    Insert(InsertQuery),
    Update(UpdateQuery),
    Delete(DeleteQuery),

    VariableDeclaration { assignments: Vec<VariableAssignment> },
    VariableSubstitution { variable: Variable, value: Expr },
    DisposeVariable(Variable),

    CursorDeclaration(CursorDeclaration),
    OpenCursor { cursor: Identifier, values: Vec<Expr> },
    CloseCursor(Identifier),
    DisposeCursor(Identifier),
    FetchCursor { cursor: Identifier, position: FetchPosition, variables: Vec<Variable> },

    TableDeclaration(TableDeclaration),
    DisposeTable(Identifier),

    FunctionDeclaration(FunctionDeclaration),
    AggregateDeclaration(AggregateDeclaration),
    Prepare { name: Identifier, query: SelectQuery },

    If(IfStatement),
    Case(CaseStatement),
    While { condition: Expr, statements: Vec<Statement> },
    WhileInCursor { variables: Vec<Variable>, cursor: Identifier, statements: Vec<Statement> },
    Continue,
    Break,
    Exit,
    Return(Option<Expr>),

    Print(Expr),
    Printf { format: String, values: Vec<Expr> },

    TransactionControl(TransactionOp),
    /// RAISE-style user error with a message and a user code.
    Trigger { message: Option<Expr>, code: Option<i64> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableAssignment {
    pub variable: Variable,
    pub value: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CursorDeclaration {
    pub cursor: Identifier,
    /// Query-backed cursor, or...
    pub query: Option<SelectQuery>,
    /// ...a cursor over a named prepared statement.
    pub statement: Option<Identifier>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchPositionType {
    Next,
    Prior,
    First,
    Last,
    Absolute,
    Relative,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchPosition {
    pub position: FetchPositionType,
    pub number: Option<Expr>,
}

impl Default for FetchPosition {
    fn default() -> Self {
        Self { position: FetchPositionType::Next, number: None }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableDeclaration {
    pub table: Identifier,
    pub columns: Vec<Identifier>,
    pub query: Option<SelectQuery>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDeclaration {
    pub name: Identifier,
    pub parameters: Vec<Variable>,
    pub statements: Vec<Statement>,
}

/// A user aggregate: its body iterates the declared cursor, which presents
/// the grouped values as a pseudo cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateDeclaration {
    pub name: Identifier,
    pub cursor: Identifier,
    pub parameters: Vec<Variable>,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStatement {
    pub condition: Expr,
    pub statements: Vec<Statement>,
    pub elseif: Vec<ElseIf>,
    pub else_statements: Option<Vec<Statement>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElseIf {
    pub condition: Expr,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseStatement {
    pub value: Option<Expr>,
    pub when: Vec<CaseStatementWhen>,
    pub else_statements: Option<Vec<Statement>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseStatementWhen {
    pub condition: Expr,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionOp {
    Commit,
    Rollback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertQuery {
    pub table: Identifier,
    pub columns: Vec<Identifier>,
    pub values: Vec<Vec<Expr>>,
    pub query: Option<SelectQuery>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateQuery {
    pub table: Identifier,
    pub set_list: Vec<UpdateSet>,
    pub filter: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateSet {
    pub column: Identifier,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteQuery {
    pub table: Identifier,
    pub filter: Option<Expr>,
}
