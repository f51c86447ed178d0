use std::fmt;

use crate::ast::location::{HasLocation, Location};
use crate::ast::query::{AnalyticFunction, OrderItem, SelectQuery};
use crate::value::comparer::ComparisonOperator;
use crate::value::Primary;

/// A bare or back-tick quoted name.
#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    pub loc: Location,
    pub literal: String,
    pub quoted: bool,
}

impl Identifier {
    pub fn new(literal: impl Into<String>) -> Self {
        Self { loc: Location::default(), literal: literal.into(), quoted: false }
    }

    pub fn quoted(literal: impl Into<String>) -> Self {
        Self { loc: Location::default(), literal: literal.into(), quoted: true }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.quoted {
            write!(f, "`{}`", self.literal)
        } else {
            write!(f, "{}", self.literal)
        }
    }
}

impl HasLocation for Identifier {
    fn location(&self) -> &Location {
        &self.loc
    }
}

/// A session variable reference, `@name`.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub loc: Location,
    pub name: String,
}

impl Variable {
    pub fn new(name: impl Into<String>) -> Self {
        Self { loc: Location::default(), name: name.into() }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.name)
    }
}

impl HasLocation for Variable {
    fn location(&self) -> &Location {
        &self.loc
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl fmt::Display for ArithmeticOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulo => "%",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOperator {
    And,
    Or,
    Xor,
}

impl fmt::Display for LogicOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::And => "AND",
            Self::Or => "OR",
            Self::Xor => "XOR",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnarySign {
    Plus,
    Minus,
}

impl fmt::Display for UnarySign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", if matches!(self, Self::Plus) { "+" } else { "-" })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorStatusType {
    Open,
    InRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorAttributeType {
    Count,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseWhen {
    pub condition: Expr,
    pub result: Expr,
}

/// A query expression with its parse provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub loc: Location,
    pub kind: ExprKind,
}

/// Every syntactic form an expression can take.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// A literal together with the exact source text it was written as.
    Primitive { literal: Option<String>, value: Primary },
    Identifier(Identifier),
    FieldReference { view: Option<Identifier>, column: Identifier },
    /// Positional column reference, `view.N`, 1-based.
    ColumnNumber { view: Identifier, number: i64 },
    Variable(Variable),
    VariableSubstitution { variable: Variable, value: Box<Expr> },
    AllColumns,
    AllColumnsOf(Identifier),
    Parentheses(Box<Expr>),
    ValueList(Vec<Expr>),
    Subquery(Box<SelectQuery>),
    Exists(Box<SelectQuery>),
    Comparison { lhs: Box<Expr>, op: ComparisonOperator, rhs: Box<Expr> },
    Is { lhs: Box<Expr>, rhs: Box<Expr>, negated: bool },
    Between { lhs: Box<Expr>, low: Box<Expr>, high: Box<Expr>, negated: bool },
    /// `values` is a ValueList or a Subquery.
    In { lhs: Box<Expr>, values: Box<Expr>, negated: bool },
    Any { lhs: Box<Expr>, op: ComparisonOperator, values: Box<Expr> },
    All { lhs: Box<Expr>, op: ComparisonOperator, values: Box<Expr> },
    Like { lhs: Box<Expr>, pattern: Box<Expr>, negated: bool },
    Arithmetic { lhs: Box<Expr>, op: ArithmeticOperator, rhs: Box<Expr> },
    UnaryArithmetic { operand: Box<Expr>, sign: UnarySign },
    Logic { lhs: Box<Expr>, op: LogicOperator, rhs: Box<Expr> },
    /// NOT.
    UnaryLogic { operand: Box<Expr> },
    Concat(Vec<Expr>),
    Function { name: String, args: Vec<Expr> },
    AggregateFunction { name: String, distinct: bool, args: Vec<Expr> },
    ListAgg { distinct: bool, args: Vec<Expr>, order_by: Vec<OrderItem> },
    AnalyticFunction(Box<AnalyticFunction>),
    Case { value: Option<Box<Expr>>, when: Vec<CaseWhen>, else_result: Option<Box<Expr>> },
    CursorStatus { cursor: Identifier, negated: bool, status: CursorStatusType },
    CursorAttribute { cursor: Identifier, attribute: CursorAttributeType },
    /// Positional replacement slot in a prepared statement, 1-based.
    Placeholder { index: usize },
}

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Self { loc: Location::default(), kind }
    }

    pub fn at(kind: ExprKind, loc: Location) -> Self {
        Self { loc, kind }
    }

    pub fn primitive(value: Primary) -> Self {
        Self::new(ExprKind::Primitive { literal: None, value })
    }

    pub fn integer(i: i64) -> Self {
        Self::primitive(Primary::Integer(i))
    }

    pub fn float(f: f64) -> Self {
        Self::primitive(Primary::Float(f))
    }

    pub fn string(s: impl Into<String>) -> Self {
        let s = s.into();
        Self::new(ExprKind::Primitive { literal: Some(s.clone()), value: Primary::String(s) })
    }

    pub fn null() -> Self {
        Self::primitive(Primary::Null)
    }

    pub fn field(column: impl Into<String>) -> Self {
        Self::new(ExprKind::FieldReference { view: None, column: Identifier::new(column) })
    }

    pub fn qualified_field(view: impl Into<String>, column: impl Into<String>) -> Self {
        Self::new(ExprKind::FieldReference {
            view: Some(Identifier::new(view)),
            column: Identifier::new(column),
        })
    }
}

impl HasLocation for Expr {
    fn location(&self) -> &Location {
        &self.loc
    }
}

fn list(exprs: &[Expr]) -> String {
    exprs.iter().map(|e| e.to_string()).collect::<Vec<_>>().join(", ")
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Primitive { literal, value } => match (literal, value) {
                (Some(lit), Primary::String(_)) | (Some(lit), Primary::Datetime(_)) => {
                    write!(f, "'{}'", lit)
                }
                (Some(lit), _) => write!(f, "{}", lit),
                (None, value) => write!(f, "{}", value),
            },
            ExprKind::Identifier(ident) => write!(f, "{}", ident),
            ExprKind::FieldReference { view, column } => match view {
                Some(view) => write!(f, "{}.{}", view, column),
                None => write!(f, "{}", column),
            },
            ExprKind::ColumnNumber { view, number } => write!(f, "{}.{}", view, number),
            ExprKind::Variable(v) => write!(f, "{}", v),
            ExprKind::VariableSubstitution { variable, value } => {
                write!(f, "{} := {}", variable, value)
            }
            ExprKind::AllColumns => write!(f, "*"),
            ExprKind::AllColumnsOf(view) => write!(f, "{}.*", view),
            ExprKind::Parentheses(inner) => write!(f, "({})", inner),
            ExprKind::ValueList(values) => write!(f, "({})", list(values)),
            ExprKind::Subquery(query) => write!(f, "({})", query),
            ExprKind::Exists(query) => write!(f, "EXISTS ({})", query),
            ExprKind::Comparison { lhs, op, rhs } => write!(f, "{} {} {}", lhs, op, rhs),
            ExprKind::Is { lhs, rhs, negated } => {
                if *negated {
                    write!(f, "{} IS NOT {}", lhs, rhs)
                } else {
                    write!(f, "{} IS {}", lhs, rhs)
                }
            }
            ExprKind::Between { lhs, low, high, negated } => {
                if *negated {
                    write!(f, "{} NOT BETWEEN {} AND {}", lhs, low, high)
                } else {
                    write!(f, "{} BETWEEN {} AND {}", lhs, low, high)
                }
            }
            ExprKind::In { lhs, values, negated } => {
                if *negated {
                    write!(f, "{} NOT IN {}", lhs, values)
                } else {
                    write!(f, "{} IN {}", lhs, values)
                }
            }
            ExprKind::Any { lhs, op, values } => write!(f, "{} {} ANY {}", lhs, op, values),
            ExprKind::All { lhs, op, values } => write!(f, "{} {} ALL {}", lhs, op, values),
            ExprKind::Like { lhs, pattern, negated } => {
                if *negated {
                    write!(f, "{} NOT LIKE {}", lhs, pattern)
                } else {
                    write!(f, "{} LIKE {}", lhs, pattern)
                }
            }
            ExprKind::Arithmetic { lhs, op, rhs } => write!(f, "{} {} {}", lhs, op, rhs),
            ExprKind::UnaryArithmetic { operand, sign } => write!(f, "{}{}", sign, operand),
            ExprKind::Logic { lhs, op, rhs } => write!(f, "{} {} {}", lhs, op, rhs),
            ExprKind::UnaryLogic { operand } => write!(f, "NOT {}", operand),
            ExprKind::Concat(items) => {
                let parts: Vec<String> = items.iter().map(|e| e.to_string()).collect();
                write!(f, "{}", parts.join(" || "))
            }
            ExprKind::Function { name, args } => write!(f, "{}({})", name, list(args)),
            ExprKind::AggregateFunction { name, distinct, args } => {
                if *distinct {
                    write!(f, "{}(DISTINCT {})", name, list(args))
                } else {
                    write!(f, "{}({})", name, list(args))
                }
            }
            ExprKind::ListAgg { distinct, args, order_by } => {
                if *distinct {
                    write!(f, "LISTAGG(DISTINCT {})", list(args))?;
                } else {
                    write!(f, "LISTAGG({})", list(args))?;
                }
                if !order_by.is_empty() {
                    let items: Vec<String> = order_by.iter().map(|o| o.to_string()).collect();
                    write!(f, " WITHIN GROUP (ORDER BY {})", items.join(", "))?;
                }
                Ok(())
            }
            ExprKind::AnalyticFunction(af) => write!(f, "{}", af),
            ExprKind::Case { value, when, else_result } => {
                write!(f, "CASE")?;
                if let Some(v) = value {
                    write!(f, " {}", v)?;
                }
                for w in when {
                    write!(f, " WHEN {} THEN {}", w.condition, w.result)?;
                }
                if let Some(e) = else_result {
                    write!(f, " ELSE {}", e)?;
                }
                write!(f, " END")
            }
            ExprKind::CursorStatus { cursor, negated, status } => {
                let status = match status {
                    CursorStatusType::Open => "OPEN",
                    CursorStatusType::InRange => "IN RANGE",
                };
                if *negated {
                    write!(f, "CURSOR {} IS NOT {}", cursor, status)
                } else {
                    write!(f, "CURSOR {} IS {}", cursor, status)
                }
            }
            ExprKind::CursorAttribute { cursor, attribute } => {
                let attr = match attribute {
                    CursorAttributeType::Count => "%COUNT",
                };
                write!(f, "CURSOR {} {}", cursor, attr)
            }
            ExprKind::Placeholder { .. } => write!(f, "?"),
        }
    }
}
