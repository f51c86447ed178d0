use std::cmp::Ordering;
use std::collections::HashSet;

use indexmap::IndexMap;

use crate::ast::{AnalyticFunction, Expr, ExprKind, Location};
use crate::error::QueryError;
use crate::executor::aggregators_helper::{list_agg, AggregateRegistry};
use crate::executor::eval::{eval, RowContext};
use crate::executor::select;
use crate::scope::Scope;
use crate::session::ExecContext;
use crate::value::{ComparisonKey, Primary};
use crate::view::{Cell, HeaderField, View};

/// Collects the analytic calls appearing in an expression, keyed by their
/// rendered form. Subqueries keep their own analytic scope and are not
/// descended into.
pub fn collect_analytic_calls<'e>(expr: &'e Expr, out: &mut Vec<(String, &'e AnalyticFunction)>) {
    if let ExprKind::AnalyticFunction(af) = &expr.kind {
        let rendered = expr.to_string();
        if !out.iter().any(|(name, _)| *name == rendered) {
            out.push((rendered, af));
        }
        return;
    }
    match &expr.kind {
        ExprKind::Parentheses(inner) | ExprKind::UnaryLogic { operand: inner } => {
            collect_analytic_calls(inner, out)
        }
        ExprKind::UnaryArithmetic { operand, .. } => collect_analytic_calls(operand, out),
        ExprKind::VariableSubstitution { value, .. } => collect_analytic_calls(value, out),
        ExprKind::Comparison { lhs, rhs, .. }
        | ExprKind::Arithmetic { lhs, rhs, .. }
        | ExprKind::Logic { lhs, rhs, .. }
        | ExprKind::Is { lhs, rhs, .. } => {
            collect_analytic_calls(lhs, out);
            collect_analytic_calls(rhs, out);
        }
        ExprKind::Between { lhs, low, high, .. } => {
            collect_analytic_calls(lhs, out);
            collect_analytic_calls(low, out);
            collect_analytic_calls(high, out);
        }
        ExprKind::In { lhs, values, .. } => {
            collect_analytic_calls(lhs, out);
            collect_analytic_calls(values, out);
        }
        ExprKind::Any { lhs, values, .. } | ExprKind::All { lhs, values, .. } => {
            collect_analytic_calls(lhs, out);
            collect_analytic_calls(values, out);
        }
        ExprKind::Like { lhs, pattern, .. } => {
            collect_analytic_calls(lhs, out);
            collect_analytic_calls(pattern, out);
        }
        ExprKind::Concat(items) | ExprKind::ValueList(items) => {
            for item in items {
                collect_analytic_calls(item, out);
            }
        }
        ExprKind::Function { args, .. } | ExprKind::AggregateFunction { args, .. } => {
            for arg in args {
                collect_analytic_calls(arg, out);
            }
        }
        ExprKind::Case { value, when, else_result } => {
            if let Some(value) = value {
                collect_analytic_calls(value, out);
            }
            for branch in when {
                collect_analytic_calls(&branch.condition, out);
                collect_analytic_calls(&branch.result, out);
            }
            if let Some(else_result) = else_result {
                collect_analytic_calls(else_result, out);
            }
        }
        _ => {}
    }
}

/// Computes every analytic call found in `exprs` and appends each as a
/// hidden column named by its rendered form; expression evaluation then
/// reads the per-row results back by that name.
pub fn append_analytic_columns(
    ctx: &ExecContext,
    scope: &mut Scope,
    view: &mut View,
    exprs: &[&Expr],
) -> Result<(), QueryError> {
    let mut calls: Vec<(String, &AnalyticFunction)> = Vec::new();
    for expr in exprs {
        collect_analytic_calls(expr, &mut calls);
    }

    for (rendered, af) in calls {
        let exists = view.header.fields().iter().any(|f| {
            !f.from_table && f.view.is_empty() && f.column == rendered
        });
        if exists {
            continue;
        }
        let values = compute(ctx, scope, view, af)?;
        view.header.push(HeaderField { view: String::new(), column: rendered, from_table: false });
        for (record, value) in view.records.iter_mut().zip(values) {
            record.0.push(Cell::new(value));
        }
    }
    Ok(())
}

/// One value per record. Partitions come from PARTITION BY (NULL keys
/// group together), ordering within a partition from the clause's ORDER
/// BY; aggregate forms accumulate over the ordered prefix when an
/// ordering is present and over the whole partition when not.
fn compute(
    ctx: &ExecContext,
    scope: &mut Scope,
    view: &View,
    af: &AnalyticFunction,
) -> Result<Vec<Primary>, QueryError> {
    let mut partitions: IndexMap<Vec<ComparisonKey>, Vec<usize>> = IndexMap::new();
    for i in 0..view.record_len() {
        ctx.check_cancelled()?;
        let row = RowContext::new(view, i);
        let mut key = Vec::with_capacity(af.clause.partition.len());
        for expr in &af.clause.partition {
            key.push(eval(ctx, scope, Some(&row), expr)?.comparison_key());
        }
        partitions.entry(key).or_default().push(i);
    }

    let mut results: Vec<Primary> = vec![Primary::Null; view.record_len()];
    let name = af.name.to_ascii_lowercase();

    for (_, members) in partitions {
        let mut ordered = members.clone();
        let mut keys: IndexMap<usize, Vec<Primary>> = IndexMap::new();
        if !af.clause.order_by.is_empty() {
            for &i in &members {
                let row = RowContext::new(view, i);
                let mut key = Vec::with_capacity(af.clause.order_by.len());
                for item in &af.clause.order_by {
                    key.push(eval(ctx, scope, Some(&row), &item.value)?);
                }
                keys.insert(i, key);
            }
            ordered.sort_by(|a, b| {
                for (k, item) in af.clause.order_by.iter().enumerate() {
                    let ord = select::compare_for_sort(
                        &keys[a][k],
                        &keys[b][k],
                        item.ascending(),
                        item.nulls_first(),
                    );
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
        }

        match name.as_str() {
            "row_number" => {
                check_arity(af, 0, 0)?;
                for (seq, &i) in ordered.iter().enumerate() {
                    results[i] = Primary::Integer(seq as i64 + 1);
                }
            }
            "rank" | "dense_rank" => {
                check_arity(af, 0, 0)?;
                let mut rank = 0i64;
                let mut dense = 0i64;
                for (seq, &i) in ordered.iter().enumerate() {
                    let new_group = seq == 0 || !peers(&keys, ordered[seq - 1], i);
                    if new_group {
                        rank = seq as i64 + 1;
                        dense += 1;
                    }
                    results[i] = Primary::Integer(if name == "rank" { rank } else { dense });
                }
            }
            "first_value" | "last_value" => {
                check_arity(af, 1, 1)?;
                let values = member_values(ctx, scope, view, &ordered, &af.args[0])?;
                let picked = if name == "first_value" {
                    pick_value(&values, af.ignore_nulls, false)
                } else {
                    pick_value(&values, af.ignore_nulls, true)
                };
                for &i in &ordered {
                    results[i] = picked.clone();
                }
            }
            "lag" | "lead" => {
                check_arity(af, 1, 3)?;
                let values = member_values(ctx, scope, view, &ordered, &af.args[0])?;
                let offset = match af.args.get(1) {
                    Some(arg) => eval(ctx, scope, None, arg)?.to_integer().unwrap_or(1),
                    None => 1,
                };
                let default = match af.args.get(2) {
                    Some(arg) => eval(ctx, scope, None, arg)?,
                    None => Primary::Null,
                };
                let pool: Vec<(usize, &Primary)> = if af.ignore_nulls {
                    values.iter().enumerate().filter(|(_, v)| !v.is_null()).collect()
                } else {
                    values.iter().enumerate().collect()
                };
                for (seq, &i) in ordered.iter().enumerate() {
                    // Position of this row within the (possibly filtered)
                    // pool; rows filtered out look back from their slot.
                    let pos = pool.iter().take_while(|(p, _)| *p < seq).count();
                    let at = if name == "lag" {
                        (pos as i64) - offset
                    } else {
                        let here = pool.iter().position(|(p, _)| *p == seq);
                        match here {
                            Some(h) => h as i64 + offset,
                            None => pos as i64 + offset - 1,
                        }
                    };
                    results[i] = if at >= 0 && (at as usize) < pool.len() {
                        pool[at as usize].1.clone()
                    } else {
                        default.clone()
                    };
                }
            }
            "count" | "sum" | "avg" | "min" | "max" | "listagg" => {
                let cumulative = !af.clause.order_by.is_empty();
                for (seq, &i) in ordered.iter().enumerate() {
                    let slice = if cumulative { &ordered[..=seq] } else { &ordered[..] };
                    results[i] = aggregate_over(ctx, scope, view, af, &name, slice)?;
                }
            }
            _ => {
                return Err(QueryError::FunctionNotFound {
                    loc: Location::default(),
                    name: af.name.clone(),
                })
            }
        }
    }

    Ok(results)
}

fn check_arity(af: &AnalyticFunction, min: usize, max: usize) -> Result<(), QueryError> {
    if af.args.len() < min || af.args.len() > max {
        let expected = if min == max {
            format!("{} arguments", min)
        } else {
            format!("{} to {} arguments", min, max)
        };
        return Err(QueryError::FunctionArity {
            loc: Location::default(),
            name: af.name.clone(),
            expected,
            got: af.args.len(),
        });
    }
    Ok(())
}

fn peers(keys: &IndexMap<usize, Vec<Primary>>, a: usize, b: usize) -> bool {
    match (keys.get(&a), keys.get(&b)) {
        (Some(ka), Some(kb)) => ka
            .iter()
            .zip(kb.iter())
            .all(|(x, y)| x.comparison_key() == y.comparison_key()),
        _ => true,
    }
}

fn member_values(
    ctx: &ExecContext,
    scope: &mut Scope,
    view: &View,
    members: &[usize],
    arg: &Expr,
) -> Result<Vec<Primary>, QueryError> {
    let mut values = Vec::with_capacity(members.len());
    for &i in members {
        values.push(eval(ctx, scope, Some(&RowContext::new(view, i)), arg)?);
    }
    Ok(values)
}

fn pick_value(values: &[Primary], ignore_nulls: bool, from_end: bool) -> Primary {
    let mut iter: Box<dyn Iterator<Item = &Primary>> = if from_end {
        Box::new(values.iter().rev())
    } else {
        Box::new(values.iter())
    };
    if ignore_nulls {
        iter.find(|v| !v.is_null()).cloned().unwrap_or(Primary::Null)
    } else {
        iter.next().cloned().unwrap_or(Primary::Null)
    }
}

fn aggregate_over(
    ctx: &ExecContext,
    scope: &mut Scope,
    view: &View,
    af: &AnalyticFunction,
    name: &str,
    members: &[usize],
) -> Result<Primary, QueryError> {
    if name == "count" && matches!(af.args.first().map(|a| &a.kind), Some(ExprKind::AllColumns)) {
        return Ok(Primary::Integer(members.len() as i64));
    }
    check_arity(af, 1, if name == "listagg" { 2 } else { 1 })?;
    let mut values = member_values(ctx, scope, view, members, &af.args[0])?;
    if af.distinct {
        let mut seen: HashSet<ComparisonKey> = HashSet::new();
        values.retain(|v| seen.insert(v.comparison_key()));
    }
    if name == "listagg" {
        let separator = match af.args.get(1) {
            Some(arg) => {
                let v = eval(ctx, scope, None, arg)?;
                v.to_text().unwrap_or_default()
            }
            None => String::new(),
        };
        return Ok(list_agg(&values, &separator));
    }
    let agg = AggregateRegistry::global().get(name).ok_or_else(|| {
        QueryError::FunctionNotFound { loc: Location::default(), name: name.to_string() }
    })?;
    let mut acc = agg.create_accumulator();
    for value in &values {
        acc.update(value);
    }
    Ok(acc.finalize())
}
