use std::fmt;

use crate::ast::expr::{Expr, Identifier};
use crate::ast::location::{HasLocation, Location};

/// A full SELECT statement: optional WITH, the entity or set-operation
/// body, then ORDER BY / LIMIT / OFFSET.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    pub loc: Location,
    pub with: Vec<InlineTableDef>,
    pub body: SelectBody,
    pub order_by: Vec<OrderItem>,
    pub limit: Option<LimitClause>,
    pub offset: Option<Expr>,
}

impl SelectQuery {
    pub fn new(body: SelectBody) -> Self {
        Self {
            loc: Location::default(),
            with: Vec::new(),
            body,
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }
}

impl HasLocation for SelectQuery {
    fn location(&self) -> &Location {
        &self.loc
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectBody {
    Entity(SelectEntity),
    Set(Box<SelectSet>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectEntity {
    pub select: SelectClause,
    pub from: Option<FromClause>,
    pub filter: Option<Expr>,
    pub group_by: Vec<Expr>,
    pub having: Option<Expr>,
}

impl SelectEntity {
    pub fn new(select: SelectClause) -> Self {
        Self { select, from: None, filter: None, group_by: Vec::new(), having: None }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectClause {
    pub distinct: bool,
    pub fields: Vec<Field>,
}

/// One SELECT-list entry: an expression with an optional alias.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub object: Expr,
    pub alias: Option<Identifier>,
}

impl Field {
    pub fn new(object: Expr) -> Self {
        Self { object, alias: None }
    }

    pub fn aliased(object: Expr, alias: impl Into<String>) -> Self {
        Self { object, alias: Some(Identifier::new(alias)) }
    }

    /// The output column name this field produces.
    pub fn name(&self) -> String {
        if let Some(alias) = &self.alias {
            return alias.literal.clone();
        }
        match &self.object.kind {
            crate::ast::expr::ExprKind::Primitive { literal: Some(lit), .. } => lit.clone(),
            crate::ast::expr::ExprKind::FieldReference { column, .. } => column.literal.clone(),
            _ => self.object.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FromClause {
    pub tables: Vec<TableRef>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableRef {
    Table(Box<Table>),
    Join(Box<Join>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub loc: Location,
    pub object: TableObject,
    pub alias: Option<Identifier>,
}

impl Table {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            loc: Location::default(),
            object: TableObject::Identifier(Identifier::new(name)),
            alias: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(Identifier::new(alias));
        self
    }

    /// The name the table's columns are qualified with in the result.
    pub fn name(&self) -> String {
        if let Some(alias) = &self.alias {
            return alias.literal.clone();
        }
        match &self.object {
            TableObject::Identifier(ident) => format_table_name(&ident.literal),
            TableObject::Subquery(query) => format!("({})", query),
            TableObject::Dual => "DUAL".to_string(),
            TableObject::Stdin => "STDIN".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TableObject {
    Identifier(Identifier),
    Subquery(SelectQuery),
    Dual,
    Stdin,
}

/// Strips directory and extension from a table identifier so a file path
/// yields a bare table name.
pub fn format_table_name(literal: &str) -> String {
    let base = literal.rsplit(['/', '\\']).next().unwrap_or(literal);
    match base.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => base.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub left: TableRef,
    pub right: TableRef,
    pub join_type: JoinType,
    pub natural: bool,
    pub condition: Option<JoinCondition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Cross,
    Inner,
    Left,
    Right,
    Full,
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Cross => "CROSS JOIN",
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT OUTER JOIN",
            Self::Right => "RIGHT OUTER JOIN",
            Self::Full => "FULL OUTER JOIN",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JoinCondition {
    On(Expr),
    Using(Vec<Identifier>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectSet {
    pub lhs: SelectBody,
    pub op: SetOperator,
    pub all: bool,
    pub rhs: SelectBody,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOperator {
    Union,
    Intersect,
    Except,
}

impl fmt::Display for SetOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Union => "UNION",
            Self::Intersect => "INTERSECT",
            Self::Except => "EXCEPT",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullsPosition {
    First,
    Last,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub value: Expr,
    pub direction: Option<OrderDirection>,
    pub nulls: Option<NullsPosition>,
}

impl OrderItem {
    pub fn new(value: Expr) -> Self {
        Self { value, direction: None, nulls: None }
    }

    pub fn ascending(&self) -> bool {
        !matches!(self.direction, Some(OrderDirection::Descending))
    }

    /// NULLS FIRST with ASC, NULLS LAST with DESC unless spelled out.
    pub fn nulls_first(&self) -> bool {
        match self.nulls {
            Some(NullsPosition::First) => true,
            Some(NullsPosition::Last) => false,
            None => self.ascending(),
        }
    }
}

impl fmt::Display for OrderItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)?;
        match self.direction {
            Some(OrderDirection::Ascending) => write!(f, " ASC")?,
            Some(OrderDirection::Descending) => write!(f, " DESC")?,
            None => {}
        }
        match self.nulls {
            Some(NullsPosition::First) => write!(f, " NULLS FIRST")?,
            Some(NullsPosition::Last) => write!(f, " NULLS LAST")?,
            None => {}
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LimitClause {
    pub value: Expr,
    pub percent: bool,
    pub with_ties: bool,
}

/// A WITH-clause member: a named, optionally recursive inline table.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineTableDef {
    pub recursive: bool,
    pub name: Identifier,
    pub columns: Vec<Identifier>,
    pub query: SelectQuery,
}

/// An analytic (window) function call with its OVER clause.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticFunction {
    pub name: String,
    pub distinct: bool,
    pub args: Vec<Expr>,
    pub ignore_nulls: bool,
    pub clause: AnalyticClause,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticClause {
    pub partition: Vec<Expr>,
    pub order_by: Vec<OrderItem>,
}

impl fmt::Display for AnalyticFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut inner = Vec::new();
        if self.distinct {
            inner.push("DISTINCT".to_string());
        }
        if !self.args.is_empty() {
            inner.push(
                self.args.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", "),
            );
        }
        if self.ignore_nulls {
            inner.push("IGNORE NULLS".to_string());
        }
        write!(f, "{}({}) OVER ({})", self.name, inner.join(" "), self.clause)
    }
}

impl fmt::Display for AnalyticClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if !self.partition.is_empty() {
            let values: Vec<String> = self.partition.iter().map(|e| e.to_string()).collect();
            parts.push(format!("PARTITION BY {}", values.join(", ")));
        }
        if !self.order_by.is_empty() {
            let items: Vec<String> = self.order_by.iter().map(|o| o.to_string()).collect();
            parts.push(format!("ORDER BY {}", items.join(", ")));
        }
        write!(f, "{}", parts.join(" "))
    }
}

impl fmt::Display for SelectQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.with.is_empty() {
            let tables: Vec<String> = self.with.iter().map(|t| t.to_string()).collect();
            write!(f, "WITH {} ", tables.join(", "))?;
        }
        write!(f, "{}", self.body)?;
        if !self.order_by.is_empty() {
            let items: Vec<String> = self.order_by.iter().map(|o| o.to_string()).collect();
            write!(f, " ORDER BY {}", items.join(", "))?;
        }
        if let Some(limit) = &self.limit {
            write!(f, " LIMIT {}", limit.value)?;
            if limit.percent {
                write!(f, " PERCENT")?;
            }
            if limit.with_ties {
                write!(f, " WITH TIES")?;
            }
        }
        if let Some(offset) = &self.offset {
            write!(f, " OFFSET {}", offset)?;
        }
        Ok(())
    }
}

impl fmt::Display for SelectBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entity(e) => write!(f, "{}", e),
            Self::Set(s) => write!(f, "{} {}{} {}", s.lhs, s.op, if s.all { " ALL" } else { "" }, s.rhs),
        }
    }
}

impl fmt::Display for SelectEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.select)?;
        if let Some(from) = &self.from {
            write!(f, " {}", from)?;
        }
        if let Some(filter) = &self.filter {
            write!(f, " WHERE {}", filter)?;
        }
        if !self.group_by.is_empty() {
            let items: Vec<String> = self.group_by.iter().map(|e| e.to_string()).collect();
            write!(f, " GROUP BY {}", items.join(", "))?;
        }
        if let Some(having) = &self.having {
            write!(f, " HAVING {}", having)?;
        }
        Ok(())
    }
}

impl fmt::Display for SelectClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT ")?;
        if self.distinct {
            write!(f, "DISTINCT ")?;
        }
        let fields: Vec<String> = self.fields.iter().map(|x| x.to_string()).collect();
        write!(f, "{}", fields.join(", "))
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.object)?;
        if let Some(alias) = &self.alias {
            write!(f, " AS {}", alias)?;
        }
        Ok(())
    }
}

impl fmt::Display for FromClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tables: Vec<String> = self.tables.iter().map(|t| t.to_string()).collect();
        write!(f, "FROM {}", tables.join(", "))
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Table(t) => write!(f, "{}", t),
            Self::Join(j) => write!(f, "{}", j),
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.object {
            TableObject::Identifier(ident) => write!(f, "{}", ident)?,
            TableObject::Subquery(query) => write!(f, "({})", query)?,
            TableObject::Dual => write!(f, "DUAL")?,
            TableObject::Stdin => write!(f, "STDIN")?,
        }
        if let Some(alias) = &self.alias {
            write!(f, " AS {}", alias)?;
        }
        Ok(())
    }
}

impl fmt::Display for Join {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.left)?;
        if self.natural {
            write!(f, "NATURAL ")?;
        }
        write!(f, "{} {}", self.join_type, self.right)?;
        match &self.condition {
            Some(JoinCondition::On(expr)) => write!(f, " ON {}", expr)?,
            Some(JoinCondition::Using(columns)) => {
                let names: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
                write!(f, " USING ({})", names.join(", "))?;
            }
            None => {}
        }
        Ok(())
    }
}

impl fmt::Display for InlineTableDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.recursive {
            write!(f, "RECURSIVE ")?;
        }
        write!(f, "{}", self.name)?;
        if !self.columns.is_empty() {
            let names: Vec<String> = self.columns.iter().map(|c| c.to_string()).collect();
            write!(f, " ({})", names.join(", "))?;
        }
        write!(f, " AS ({})", self.query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::expr::ExprKind;

    fn entity(fields: Vec<Field>) -> SelectEntity {
        SelectEntity::new(SelectClause { distinct: false, fields })
    }

    #[test]
    fn select_query_renders_all_clauses_in_order() {
        let mut e = entity(vec![Field::new(Expr::qualified_field("t", "a"))]);
        e.from = Some(FromClause { tables: vec![TableRef::Table(Box::new(Table::named("t")))] });
        e.filter = Some(Expr::new(ExprKind::Comparison {
            lhs: Box::new(Expr::qualified_field("t", "a")),
            op: crate::value::comparer::ComparisonOperator::GreaterThan,
            rhs: Box::new(Expr::integer(1)),
        }));
        let mut q = SelectQuery::new(SelectBody::Entity(e));
        q.order_by = vec![OrderItem {
            value: Expr::qualified_field("t", "a"),
            direction: Some(OrderDirection::Descending),
            nulls: Some(NullsPosition::Last),
        }];
        q.limit = Some(LimitClause { value: Expr::integer(10), percent: false, with_ties: false });
        q.offset = Some(Expr::integer(5));

        assert_eq!(
            q.to_string(),
            "SELECT t.a FROM t WHERE t.a > 1 ORDER BY t.a DESC NULLS LAST LIMIT 10 OFFSET 5"
        );
    }

    #[test]
    fn set_operations_render_between_bodies() {
        let lhs = SelectBody::Entity(entity(vec![Field::new(Expr::integer(1))]));
        let rhs = SelectBody::Entity(entity(vec![Field::new(Expr::integer(2))]));
        let set = SelectBody::Set(Box::new(SelectSet {
            lhs,
            op: SetOperator::Union,
            all: true,
            rhs,
        }));
        assert_eq!(set.to_string(), "SELECT 1 UNION ALL SELECT 2");
    }

    #[test]
    fn joins_render_with_conditions() {
        let join = TableRef::Join(Box::new(Join {
            left: TableRef::Table(Box::new(Table::named("a"))),
            right: TableRef::Table(Box::new(Table::named("b"))),
            join_type: JoinType::Left,
            natural: false,
            condition: Some(JoinCondition::Using(vec![Identifier::new("id")])),
        }));
        assert_eq!(join.to_string(), "a LEFT OUTER JOIN b USING (id)");
    }

    #[test]
    fn inline_tables_render_recursive_and_columns() {
        let def = InlineTableDef {
            recursive: true,
            name: Identifier::new("r"),
            columns: vec![Identifier::new("n")],
            query: SelectQuery::new(SelectBody::Entity(entity(vec![Field::new(
                Expr::integer(1),
            )]))),
        };
        assert_eq!(def.to_string(), "RECURSIVE r (n) AS (SELECT 1)");
    }

    #[test]
    fn table_names_strip_paths_and_extensions() {
        assert_eq!(format_table_name("users.csv"), "users");
        assert_eq!(format_table_name("/data/users.csv"), "users");
        assert_eq!(format_table_name("users"), "users");
        assert_eq!(Table::named("t").with_alias("x").name(), "x");
    }

    #[test]
    fn analytic_functions_render_over_clause() {
        let af = AnalyticFunction {
            name: "RANK".into(),
            distinct: false,
            args: vec![],
            ignore_nulls: false,
            clause: AnalyticClause {
                partition: vec![Expr::field("cat")],
                order_by: vec![OrderItem::new(Expr::field("score"))],
            },
        };
        assert_eq!(af.to_string(), "RANK() OVER (PARTITION BY cat ORDER BY score)");
    }
}
