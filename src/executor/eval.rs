use std::collections::HashSet;

use crate::ast::{
    ArithmeticOperator, CursorAttributeType, CursorStatusType, Expr, ExprKind, Identifier,
    Location, LogicOperator, OrderItem, SelectQuery, UnarySign,
};
use crate::error::QueryError;
use crate::executor::aggregators_helper::{list_agg, AggregateRegistry};
use crate::executor::functions::FunctionRegistry;
use crate::executor::select;
use crate::executor::statement;
use crate::scope::{Scope, UserFunction};
use crate::session::ExecContext;
use crate::value::{self, ComparisonKey, Primary, Ternary};
use crate::view::{FieldSearchError, View};

/// The row an expression is evaluated against. `group_index` switches a
/// grouped view from representative values to one group member's values;
/// aggregate evaluation iterates it over the member range.
#[derive(Clone, Copy)]
pub struct RowContext<'v> {
    pub view: &'v View,
    pub index: usize,
    pub group_index: Option<usize>,
}

impl<'v> RowContext<'v> {
    pub fn new(view: &'v View, index: usize) -> Self {
        Self { view, index, group_index: None }
    }

    fn with_group_index(&self, i: usize) -> Self {
        Self { view: self.view, index: self.index, group_index: Some(i) }
    }

    fn group_len(&self) -> usize {
        self.view.records[self.index].group_len()
    }
}

pub fn eval_ternary(
    ctx: &ExecContext,
    scope: &mut Scope,
    row: Option<&RowContext>,
    expr: &Expr,
) -> Result<Ternary, QueryError> {
    Ok(eval(ctx, scope, row, expr)?.ternary())
}

pub fn eval(
    ctx: &ExecContext,
    scope: &mut Scope,
    row: Option<&RowContext>,
    expr: &Expr,
) -> Result<Primary, QueryError> {
    match &expr.kind {
        ExprKind::Primitive { value, .. } => Ok(value.clone()),

        ExprKind::Identifier(ident) => field_value(row, None, ident, &expr.loc),

        ExprKind::FieldReference { view, column } => {
            field_value(row, view.as_ref(), column, &expr.loc)
        }

        ExprKind::ColumnNumber { view, number } => {
            let not_exist = || QueryError::FieldNumberNotExist {
                loc: expr.loc.clone(),
                view: view.literal.clone(),
                number: *number,
            };
            let row = row.ok_or_else(not_exist)?;
            let index =
                row.view.header.search_number(&view.literal, *number).ok_or_else(not_exist)?;
            Ok(cell_value(row, index))
        }

        ExprKind::Variable(var) => scope.variable_value(var),

        ExprKind::VariableSubstitution { variable, value } => {
            let value = eval(ctx, scope, row, value)?;
            scope.substitute_variable(variable, value.clone())?;
            Ok(value)
        }

        ExprKind::AllColumns | ExprKind::AllColumnsOf(_) => Err(QueryError::Syntax {
            loc: expr.loc.clone(),
            message: "wildcards are only allowed in the select clause".to_string(),
        }),

        ExprKind::Parentheses(inner) => eval(ctx, scope, row, inner),

        ExprKind::ValueList(_) => Err(QueryError::Syntax {
            loc: expr.loc.clone(),
            message: "a value list cannot be used as a single value".to_string(),
        }),

        ExprKind::Subquery(query) => scalar_subquery(ctx, scope, query, &expr.loc),

        ExprKind::Exists(query) => {
            let view = select::select(ctx, scope, query)?;
            Ok(Primary::Ternary(Ternary::parse_bool(view.record_len() > 0)))
        }

        ExprKind::Comparison { lhs, op, rhs } => {
            let l = eval(ctx, scope, row, lhs)?;
            let r = eval(ctx, scope, row, rhs)?;
            Ok(Primary::Ternary(value::compare(&l, &r, *op)))
        }

        ExprKind::Is { lhs, rhs, negated } => {
            let l = eval(ctx, scope, row, lhs)?;
            let r = eval(ctx, scope, row, rhs)?;
            // IS NULL tests null-ness; the other IS forms compare ternary
            // projections.
            let t = if r.is_null() {
                Ternary::parse_bool(l.is_null())
            } else {
                value::is(&l, &r)
            };
            Ok(Primary::Ternary(negate(t, *negated)))
        }

        ExprKind::Between { lhs, low, high, negated } => {
            let v = eval(ctx, scope, row, lhs)?;
            let lo = eval(ctx, scope, row, low)?;
            let hi = eval(ctx, scope, row, high)?;
            Ok(Primary::Ternary(negate(value::between(&v, &lo, &hi), *negated)))
        }

        ExprKind::In { lhs, values, negated } => {
            let v = eval(ctx, scope, row, lhs)?;
            let list = list_values(ctx, scope, row, values)?;
            let t = value::any(&v, &list, value::ComparisonOperator::Equal);
            Ok(Primary::Ternary(negate(t, *negated)))
        }

        ExprKind::Any { lhs, op, values } => {
            let v = eval(ctx, scope, row, lhs)?;
            let list = list_values(ctx, scope, row, values)?;
            Ok(Primary::Ternary(value::any(&v, &list, *op)))
        }

        ExprKind::All { lhs, op, values } => {
            let v = eval(ctx, scope, row, lhs)?;
            let list = list_values(ctx, scope, row, values)?;
            Ok(Primary::Ternary(value::all(&v, &list, *op)))
        }

        ExprKind::Like { lhs, pattern, negated } => {
            let v = eval(ctx, scope, row, lhs)?;
            let p = eval(ctx, scope, row, pattern)?;
            Ok(Primary::Ternary(negate(value::like(&v, &p), *negated)))
        }

        ExprKind::Arithmetic { lhs, op, rhs } => {
            let l = eval(ctx, scope, row, lhs)?;
            let r = eval(ctx, scope, row, rhs)?;
            arithmetic(ctx, &expr.loc, &l, *op, &r)
        }

        ExprKind::UnaryArithmetic { operand, sign } => {
            let v = eval(ctx, scope, row, operand)?;
            unary_arithmetic(ctx, &expr.loc, &v, *sign)
        }

        ExprKind::Logic { lhs, op, rhs } => {
            let l = eval_ternary(ctx, scope, row, lhs)?;
            // AND and OR short-circuit on a decided left side.
            match (op, l) {
                (LogicOperator::And, Ternary::False) => {
                    return Ok(Primary::Ternary(Ternary::False))
                }
                (LogicOperator::Or, Ternary::True) => return Ok(Primary::Ternary(Ternary::True)),
                _ => {}
            }
            let r = eval_ternary(ctx, scope, row, rhs)?;
            let t = match op {
                LogicOperator::And => l.and(r),
                LogicOperator::Or => l.or(r),
                LogicOperator::Xor => l.xor(r),
            };
            Ok(Primary::Ternary(t))
        }

        ExprKind::UnaryLogic { operand } => {
            Ok(Primary::Ternary(eval_ternary(ctx, scope, row, operand)?.not()))
        }

        ExprKind::Concat(items) => {
            let mut out = String::new();
            for item in items {
                let v = eval(ctx, scope, row, item)?;
                if v.is_null() {
                    return Ok(Primary::Null);
                }
                match v.to_text() {
                    Some(s) => out.push_str(&s),
                    None => {
                        if ctx.session.flags.strict_types {
                            return Err(QueryError::TypeMismatch {
                                loc: item.loc.clone(),
                                value: v.to_string(),
                                expected: "a string",
                            });
                        }
                        return Ok(Primary::Null);
                    }
                }
            }
            Ok(Primary::String(out))
        }

        ExprKind::Function { name, args } => eval_function(ctx, scope, row, name, args, &expr.loc),

        ExprKind::AggregateFunction { name, distinct, args } => {
            eval_aggregate(ctx, scope, row, name, *distinct, args, &expr.loc)
        }

        ExprKind::ListAgg { distinct, args, order_by } => {
            eval_list_agg(ctx, scope, row, *distinct, args, order_by, &expr.loc)
        }

        ExprKind::AnalyticFunction(af) => {
            // Computed columns appended before projection carry the
            // rendered call as their name; anywhere else is an error.
            let rendered = expr.to_string();
            if let Some(row) = row {
                for (i, field) in row.view.header.fields().iter().enumerate() {
                    if !field.from_table && field.view.is_empty() && field.column == rendered {
                        return Ok(cell_value(row, i));
                    }
                }
            }
            Err(QueryError::AnalyticNotAllowed { loc: expr.loc.clone(), name: af.name.clone() })
        }

        ExprKind::Case { value, when, else_result } => {
            let base = match value {
                Some(value) => Some(eval(ctx, scope, row, value)?),
                None => None,
            };
            for branch in when {
                let matched = match &base {
                    Some(base) => {
                        let cond = eval(ctx, scope, row, &branch.condition)?;
                        value::equal_to(base, &cond) == Ternary::True
                    }
                    None => eval_ternary(ctx, scope, row, &branch.condition)? == Ternary::True,
                };
                if matched {
                    return eval(ctx, scope, row, &branch.result);
                }
            }
            match else_result {
                Some(result) => eval(ctx, scope, row, result),
                None => Ok(Primary::Null),
            }
        }

        ExprKind::CursorStatus { cursor, negated, status } => {
            let cur = scope.cursor(cursor)?;
            let t = match status {
                CursorStatusType::Open => cur.is_open(),
                CursorStatusType::InRange => cur.is_in_range(cursor)?,
            };
            Ok(Primary::Ternary(negate(t, *negated)))
        }

        ExprKind::CursorAttribute { cursor, attribute } => {
            let cur = scope.cursor(cursor)?;
            match attribute {
                CursorAttributeType::Count => Ok(Primary::Integer(cur.count(cursor)?)),
            }
        }

        ExprKind::Placeholder { index } => ctx
            .replace_values
            .as_deref()
            .and_then(|vs| vs.get(index.checked_sub(1)?))
            .cloned()
            .ok_or_else(|| QueryError::PlaceholderUnbound {
                loc: expr.loc.clone(),
                index: *index,
            }),
    }
}

fn negate(t: Ternary, negated: bool) -> Ternary {
    if negated {
        t.not()
    } else {
        t
    }
}

fn cell_value(row: &RowContext, index: usize) -> Primary {
    let cell = &row.view.records[row.index].0[index];
    match row.group_index {
        Some(i) => cell.group_value(i).clone(),
        None => cell.value().clone(),
    }
}

fn field_value(
    row: Option<&RowContext>,
    view: Option<&Identifier>,
    column: &Identifier,
    loc: &Location,
) -> Result<Primary, QueryError> {
    let describe = || match view {
        Some(view) => format!("{}.{}", view, column),
        None => column.to_string(),
    };
    let row = row.ok_or_else(|| QueryError::FieldNotExist {
        loc: loc.clone(),
        field: describe(),
    })?;
    let index = row
        .view
        .header
        .search(view.map(|v| v.literal.as_str()), &column.literal)
        .map_err(|e| match e {
            FieldSearchError::NotExist => {
                QueryError::FieldNotExist { loc: loc.clone(), field: describe() }
            }
            FieldSearchError::Ambiguous => {
                QueryError::FieldAmbiguous { loc: loc.clone(), field: describe() }
            }
        })?;
    Ok(cell_value(row, index))
}

/// A scalar subquery: one field, at most one record; no record means NULL.
fn scalar_subquery(
    ctx: &ExecContext,
    scope: &mut Scope,
    query: &SelectQuery,
    loc: &Location,
) -> Result<Primary, QueryError> {
    let view = select::select(ctx, scope, query)?;
    if view.field_len() != 1 {
        return Err(QueryError::SubqueryTooManyFields { loc: loc.clone() });
    }
    if view.record_len() > 1 {
        return Err(QueryError::SubqueryTooManyRecords { loc: loc.clone() });
    }
    Ok(view.records.first().map_or(Primary::Null, |r| r.0[0].value().clone()))
}

/// The right-hand side of IN / ANY / ALL: a literal value list or a
/// single-column subquery.
fn list_values(
    ctx: &ExecContext,
    scope: &mut Scope,
    row: Option<&RowContext>,
    values: &Expr,
) -> Result<Vec<Primary>, QueryError> {
    match &values.kind {
        ExprKind::ValueList(items) => items.iter().map(|e| eval(ctx, scope, row, e)).collect(),
        ExprKind::Subquery(query) => {
            let view = select::select(ctx, scope, query)?;
            if view.field_len() != 1 {
                return Err(QueryError::SubqueryTooManyFields { loc: values.loc.clone() });
            }
            Ok(view.records.iter().map(|r| r.0[0].value().clone()).collect())
        }
        _ => Err(QueryError::Syntax {
            loc: values.loc.clone(),
            message: "IN, ANY and ALL take a value list or a subquery".to_string(),
        }),
    }
}

fn arithmetic(
    ctx: &ExecContext,
    loc: &Location,
    l: &Primary,
    op: ArithmeticOperator,
    r: &Primary,
) -> Result<Primary, QueryError> {
    if l.is_null() || r.is_null() {
        return Ok(Primary::Null);
    }

    // Integer stays integer except for division; modulo by zero falls to
    // the float path.
    if let (Primary::Integer(a), Primary::Integer(b)) = (l, r) {
        match op {
            ArithmeticOperator::Add => return Ok(Primary::Integer(a.wrapping_add(*b))),
            ArithmeticOperator::Subtract => return Ok(Primary::Integer(a.wrapping_sub(*b))),
            ArithmeticOperator::Multiply => return Ok(Primary::Integer(a.wrapping_mul(*b))),
            ArithmeticOperator::Modulo if *b != 0 => return Ok(Primary::Integer(a % b)),
            _ => {}
        }
    }

    let (a, b) = match (l.to_float(), r.to_float()) {
        (Some(a), Some(b)) => (a, b),
        (None, _) => return non_numeric(ctx, loc, l),
        (_, None) => return non_numeric(ctx, loc, r),
    };
    let result = match op {
        ArithmeticOperator::Add => a + b,
        ArithmeticOperator::Subtract => a - b,
        ArithmeticOperator::Multiply => a * b,
        ArithmeticOperator::Divide => a / b,
        ArithmeticOperator::Modulo => a % b,
    };
    Ok(Primary::Float(result))
}

fn unary_arithmetic(
    ctx: &ExecContext,
    loc: &Location,
    v: &Primary,
    sign: UnarySign,
) -> Result<Primary, QueryError> {
    if v.is_null() {
        return Ok(Primary::Null);
    }
    if let Primary::Integer(i) = v {
        return Ok(Primary::Integer(match sign {
            UnarySign::Plus => *i,
            UnarySign::Minus => i.wrapping_neg(),
        }));
    }
    match v.to_float() {
        Some(f) => Ok(Primary::Float(match sign {
            UnarySign::Plus => f,
            UnarySign::Minus => -f,
        })),
        None => non_numeric(ctx, loc, v),
    }
}

fn non_numeric(ctx: &ExecContext, loc: &Location, v: &Primary) -> Result<Primary, QueryError> {
    if ctx.session.flags.strict_types {
        Err(QueryError::TypeMismatch {
            loc: loc.clone(),
            value: v.to_string(),
            expected: "a number",
        })
    } else {
        Ok(Primary::Null)
    }
}

fn arity_error(loc: &Location, name: &str, expected: String, got: usize) -> QueryError {
    QueryError::FunctionArity { loc: loc.clone(), name: name.to_string(), expected, got }
}

fn eval_function(
    ctx: &ExecContext,
    scope: &mut Scope,
    row: Option<&RowContext>,
    name: &str,
    args: &[Expr],
    loc: &Location,
) -> Result<Primary, QueryError> {
    if let Some(builtin) = FunctionRegistry::global().get(name) {
        let min = builtin.min_args();
        let max = builtin.max_args();
        if args.len() < min || max.is_some_and(|m| args.len() > m) {
            let expected = match max {
                Some(m) if m == min => format!("{} arguments", min),
                Some(m) => format!("{} to {} arguments", min, m),
                None => format!("at least {} arguments", min),
            };
            return Err(arity_error(loc, name, expected, args.len()));
        }
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(eval(ctx, scope, row, arg)?);
        }
        return builtin.call(ctx, &values);
    }

    match scope.function(name) {
        Some(function) => match function.as_ref() {
            UserFunction::Scalar(decl) => {
                let decl = decl.clone();
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(eval(ctx, scope, row, arg)?);
                }
                statement::call_user_scalar(ctx, scope, &decl, values, loc)
            }
            UserFunction::Aggregate(_) => eval_aggregate(ctx, scope, row, name, false, args, loc),
        },
        None => Err(QueryError::FunctionNotFound { loc: loc.clone(), name: name.to_string() }),
    }
}

/// Evaluates an aggregate call against a grouped row: the argument runs
/// once per group member, DISTINCT dedupes the collected values, and the
/// builtin accumulator or the user aggregate body folds them.
fn eval_aggregate(
    ctx: &ExecContext,
    scope: &mut Scope,
    row: Option<&RowContext>,
    name: &str,
    distinct: bool,
    args: &[Expr],
    loc: &Location,
) -> Result<Primary, QueryError> {
    let row = match row {
        Some(row) if row.view.is_grouped => *row,
        _ => {
            return Err(QueryError::AggregateNotAllowed {
                loc: loc.clone(),
                name: name.to_string(),
            })
        }
    };

    if let Some(builtin) = AggregateRegistry::global().get(name) {
        if args.len() != 1 {
            return Err(arity_error(loc, name, "1 argument".to_string(), args.len()));
        }
        // COUNT(*) counts members regardless of NULL.
        if matches!(args[0].kind, ExprKind::AllColumns) {
            if builtin.name() == "count" && !distinct {
                return Ok(Primary::Integer(row.group_len() as i64));
            }
            return Err(QueryError::Syntax {
                loc: args[0].loc.clone(),
                message: format!("* cannot be an argument of {}", name.to_uppercase()),
            });
        }

        let mut values = group_arg_values(ctx, scope, &row, &args[0])?;
        if distinct {
            values = dedup_values(values);
        }
        let mut acc = builtin.create_accumulator();
        for value in &values {
            acc.update(value);
        }
        return Ok(acc.finalize());
    }

    match scope.function(name) {
        Some(function) => match function.as_ref() {
            UserFunction::Aggregate(decl) => {
                let decl = decl.clone();
                if args.is_empty() {
                    return Err(arity_error(loc, name, "at least 1 argument".to_string(), 0));
                }
                let mut values = group_arg_values(ctx, scope, &row, &args[0])?;
                if distinct {
                    values = dedup_values(values);
                }
                let mut extra = Vec::with_capacity(args.len() - 1);
                for arg in &args[1..] {
                    extra.push(eval(ctx, scope, Some(&row), arg)?);
                }
                statement::call_user_aggregate(ctx, scope, &decl, values, extra, loc)
            }
            UserFunction::Scalar(_) => Err(QueryError::AggregateNotAllowed {
                loc: loc.clone(),
                name: name.to_string(),
            }),
        },
        None => Err(QueryError::FunctionNotFound { loc: loc.clone(), name: name.to_string() }),
    }
}

fn group_arg_values(
    ctx: &ExecContext,
    scope: &mut Scope,
    row: &RowContext,
    arg: &Expr,
) -> Result<Vec<Primary>, QueryError> {
    let mut values = Vec::with_capacity(row.group_len());
    for i in 0..row.group_len() {
        values.push(eval(ctx, scope, Some(&row.with_group_index(i)), arg)?);
    }
    Ok(values)
}

fn dedup_values(values: Vec<Primary>) -> Vec<Primary> {
    let mut seen: HashSet<ComparisonKey> = HashSet::new();
    values.into_iter().filter(|v| seen.insert(v.comparison_key())).collect()
}

fn eval_list_agg(
    ctx: &ExecContext,
    scope: &mut Scope,
    row: Option<&RowContext>,
    distinct: bool,
    args: &[Expr],
    order_by: &[OrderItem],
    loc: &Location,
) -> Result<Primary, QueryError> {
    let row = match row {
        Some(row) if row.view.is_grouped => *row,
        _ => {
            return Err(QueryError::AggregateNotAllowed {
                loc: loc.clone(),
                name: "LISTAGG".to_string(),
            })
        }
    };
    if args.is_empty() || args.len() > 2 {
        return Err(arity_error(loc, "listagg", "1 to 2 arguments".to_string(), args.len()));
    }

    let separator = match args.get(1) {
        Some(arg) => {
            let v = eval(ctx, scope, Some(&row), arg)?;
            v.to_text().ok_or_else(|| QueryError::TypeMismatch {
                loc: arg.loc.clone(),
                value: v.to_string(),
                expected: "a string",
            })?
        }
        None => String::new(),
    };

    // WITHIN GROUP ordering permutes the member indexes before the
    // argument values are collected.
    let mut indexes: Vec<usize> = (0..row.group_len()).collect();
    if !order_by.is_empty() {
        let mut keys: Vec<Vec<Primary>> = Vec::with_capacity(indexes.len());
        for &i in &indexes {
            let member = row.with_group_index(i);
            let mut key = Vec::with_capacity(order_by.len());
            for item in order_by {
                key.push(eval(ctx, scope, Some(&member), &item.value)?);
            }
            keys.push(key);
        }
        indexes.sort_by(|&a, &b| {
            for (k, item) in order_by.iter().enumerate() {
                let ord = select::compare_for_sort(
                    &keys[a][k],
                    &keys[b][k],
                    item.ascending(),
                    item.nulls_first(),
                );
                if ord != std::cmp::Ordering::Equal {
                    return ord;
                }
            }
            std::cmp::Ordering::Equal
        });
    }

    let mut values = Vec::with_capacity(indexes.len());
    for i in indexes {
        values.push(eval(ctx, scope, Some(&row.with_group_index(i)), &args[0])?);
    }
    if distinct {
        values = dedup_values(values);
    }
    Ok(list_agg(&values, &separator))
}
