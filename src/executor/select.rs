use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use crate::ast::{
    Expr, ExprKind, HasLocation, InlineTableDef, LimitClause, Location, OrderItem, SelectBody,
    SelectClause, SelectEntity, SelectQuery, SelectSet, SetOperator, Table, TableObject, TableRef,
};
use crate::error::QueryError;
use crate::executor::analytic;
use crate::executor::eval::{eval, eval_ternary, RowContext};
use crate::executor::join;
use crate::loader;
use crate::scope::{Scope, UserFunction};
use crate::session::ExecContext;
use crate::value::{compare_combinedly, ComparisonKey, ComparisonResult, Primary, Ternary};
use crate::view::{Cell, Header, HeaderField, Record, View};

/// Executes a SELECT query in a child scope frame: WITH bindings and any
/// other query-local state die with the query.
pub fn select(ctx: &ExecContext, scope: &mut Scope, query: &SelectQuery) -> Result<View, QueryError> {
    scope.push();
    let result = select_with_scope(ctx, scope, query);
    scope.pop();
    result
}

fn select_with_scope(
    ctx: &ExecContext,
    scope: &mut Scope,
    query: &SelectQuery,
) -> Result<View, QueryError> {
    for def in &query.with {
        install_inline_table(ctx, scope, def)?;
    }

    let (mut view, result_fields) = match &query.body {
        SelectBody::Entity(entity) => select_entity(ctx, scope, entity)?,
        SelectBody::Set(set) => {
            let view = select_set(ctx, scope, set)?;
            let fields = (0..view.field_len()).collect();
            (view, fields)
        }
    };

    let mut sort_keys = Vec::new();
    if !query.order_by.is_empty() {
        let order_exprs: Vec<&Expr> = query.order_by.iter().map(|o| &o.value).collect();
        analytic::append_analytic_columns(ctx, scope, &mut view, &order_exprs)?;
        sort_keys = append_sort_columns(ctx, scope, &mut view, &query.order_by, &result_fields)?;
        ctx.check_cancelled()?;
        sort_records(&mut view, &sort_keys);
    }

    if let Some(offset) = &query.offset {
        apply_offset(ctx, scope, &mut view, offset)?;
    }
    if let Some(limit) = &query.limit {
        apply_limit(ctx, scope, &mut view, limit, &sort_keys, &query.loc)?;
    }

    Ok(fix(view, &result_fields))
}

/// Runs one SELECT entity and returns the working view together with the
/// indexes of the columns the select list produced. The working view
/// keeps every source column so ORDER BY can still see them; `fix` trims
/// at the very end.
fn select_entity(
    ctx: &ExecContext,
    scope: &mut Scope,
    entity: &SelectEntity,
) -> Result<(View, Vec<usize>), QueryError> {
    let mut view = match &entity.from {
        Some(from) => from_clause(ctx, scope, from)?,
        None => loader::dual_view(),
    };

    if let Some(filter) = &entity.filter {
        filter_records(ctx, scope, &mut view, filter)?;
    }

    let needs_group = !entity.group_by.is_empty()
        || entity.having.as_ref().is_some_and(|h| uses_aggregate(scope, h))
        || entity.select.fields.iter().any(|f| uses_aggregate(scope, &f.object));
    if needs_group {
        group_records(ctx, scope, &mut view, &entity.group_by)?;
    }

    if let Some(having) = &entity.having {
        filter_records(ctx, scope, &mut view, having)?;
    }

    let field_exprs: Vec<&Expr> = entity.select.fields.iter().map(|f| &f.object).collect();
    analytic::append_analytic_columns(ctx, scope, &mut view, &field_exprs)?;

    let result_fields = project(ctx, scope, &mut view, &entity.select)?;
    if entity.select.distinct {
        distinct_records(ctx, &mut view, &result_fields)?;
    }
    Ok((view, result_fields))
}

fn body_view(ctx: &ExecContext, scope: &mut Scope, body: &SelectBody) -> Result<View, QueryError> {
    match body {
        SelectBody::Entity(entity) => {
            let (view, fields) = select_entity(ctx, scope, entity)?;
            Ok(fix(view, &fields))
        }
        SelectBody::Set(set) => select_set(ctx, scope, set),
    }
}

// ---- FROM ------------------------------------------------------------

fn from_clause(
    ctx: &ExecContext,
    scope: &mut Scope,
    from: &crate::ast::FromClause,
) -> Result<View, QueryError> {
    let mut names: HashSet<String> = HashSet::new();
    for table in &from.tables {
        check_table_names(table, &mut names)?;
    }

    let mut view: Option<View> = None;
    for table in &from.tables {
        let next = resolve_table_ref(ctx, scope, table)?;
        view = Some(match view {
            Some(current) => join::join_views(
                ctx,
                scope,
                current,
                next,
                crate::ast::JoinType::Cross,
                false,
                None,
                &Location::default(),
            )?,
            None => next,
        });
    }
    Ok(view.unwrap_or_else(loader::dual_view))
}

fn check_table_names(table_ref: &TableRef, names: &mut HashSet<String>) -> Result<(), QueryError> {
    match table_ref {
        TableRef::Table(table) => {
            let name = table.name().to_uppercase();
            if !names.insert(name) {
                return Err(QueryError::DuplicateTableName {
                    loc: table.loc.clone(),
                    name: table.name(),
                });
            }
            Ok(())
        }
        TableRef::Join(join) => {
            check_table_names(&join.left, names)?;
            check_table_names(&join.right, names)
        }
    }
}

fn resolve_table_ref(
    ctx: &ExecContext,
    scope: &mut Scope,
    table_ref: &TableRef,
) -> Result<View, QueryError> {
    match table_ref {
        TableRef::Table(table) => resolve_table(ctx, scope, table),
        TableRef::Join(join_ref) => {
            let left = resolve_table_ref(ctx, scope, &join_ref.left)?;
            let right = resolve_table_ref(ctx, scope, &join_ref.right)?;
            join::join_views(
                ctx,
                scope,
                left,
                right,
                join_ref.join_type,
                join_ref.natural,
                join_ref.condition.as_ref(),
                &Location::default(),
            )
        }
    }
}

/// A table leaf resolves, in order, to an inline table, a declared
/// temporary table, a loaded source table, a subquery, DUAL or STDIN.
fn resolve_table(ctx: &ExecContext, scope: &mut Scope, table: &Table) -> Result<View, QueryError> {
    let name = table.name();
    let mut view = match &table.object {
        TableObject::Identifier(ident) => {
            if let Some(view) = scope.inline_table(&ident.literal) {
                (*view).clone()
            } else if let Some(view) = scope.temp_table(&ident.literal) {
                (*view).clone()
            } else {
                (*ctx.session.load_table(ident)?).clone()
            }
        }
        TableObject::Subquery(query) => select(ctx, scope, query)?,
        TableObject::Dual => return Ok(loader::dual_view()),
        TableObject::Stdin => match ctx.session.stdin_view() {
            Some(view) => (*view).clone(),
            None => {
                return Err(QueryError::TableNotFound {
                    loc: table.loc.clone(),
                    name: "STDIN".to_string(),
                })
            }
        },
    };
    view.header = std::mem::take(&mut view.header).with_view_name(&name);
    Ok(view)
}

// ---- WHERE / HAVING --------------------------------------------------

fn filter_records(
    ctx: &ExecContext,
    scope: &mut Scope,
    view: &mut View,
    filter: &Expr,
) -> Result<(), QueryError> {
    let mut keep = Vec::with_capacity(view.record_len());
    for i in 0..view.record_len() {
        ctx.check_cancelled()?;
        let t = eval_ternary(ctx, scope, Some(&RowContext::new(view, i)), filter)?;
        keep.push(t == Ternary::True);
    }
    let records = std::mem::take(&mut view.records);
    view.records =
        records.into_iter().zip(keep).filter_map(|(r, k)| k.then_some(r)).collect();
    Ok(())
}

// ---- GROUP BY --------------------------------------------------------

/// Partitions records by the group expressions; NULL keys form their own
/// group. Every column cell becomes the backing list of the partition's
/// values; with no group expressions the whole record set is one group.
fn group_records(
    ctx: &ExecContext,
    scope: &mut Scope,
    view: &mut View,
    group_by: &[Expr],
) -> Result<(), QueryError> {
    let mut groups: IndexMap<Vec<ComparisonKey>, Vec<usize>> = IndexMap::new();
    if group_by.is_empty() {
        groups.insert(Vec::new(), (0..view.record_len()).collect());
    } else {
        for i in 0..view.record_len() {
            ctx.check_cancelled()?;
            let row = RowContext::new(view, i);
            let mut key = Vec::with_capacity(group_by.len());
            for expr in group_by {
                key.push(eval(ctx, scope, Some(&row), expr)?.comparison_key());
            }
            groups.entry(key).or_default().push(i);
        }
    }

    let old = std::mem::take(&mut view.records);
    for (_, members) in groups {
        let mut cells = Vec::with_capacity(view.header.len());
        for c in 0..view.header.len() {
            cells.push(Cell::grouped(
                members.iter().map(|&i| old[i].0[c].value().clone()).collect(),
            ));
        }
        view.records.push(Record(cells));
    }
    view.is_grouped = true;
    Ok(())
}

/// Whether an expression forces aggregation. Analytic calls and
/// subqueries keep their own aggregation context and do not count.
fn uses_aggregate(scope: &Scope, expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::AggregateFunction { .. } | ExprKind::ListAgg { .. } => true,
        ExprKind::Function { name, args } => {
            scope
                .function(name)
                .is_some_and(|f| matches!(f.as_ref(), UserFunction::Aggregate(_)))
                || args.iter().any(|a| uses_aggregate(scope, a))
        }
        ExprKind::AnalyticFunction(_) | ExprKind::Subquery(_) | ExprKind::Exists(_) => false,
        ExprKind::Parentheses(inner) | ExprKind::UnaryLogic { operand: inner } => {
            uses_aggregate(scope, inner)
        }
        ExprKind::UnaryArithmetic { operand, .. } => uses_aggregate(scope, operand),
        ExprKind::VariableSubstitution { value, .. } => uses_aggregate(scope, value),
        ExprKind::Comparison { lhs, rhs, .. }
        | ExprKind::Arithmetic { lhs, rhs, .. }
        | ExprKind::Logic { lhs, rhs, .. }
        | ExprKind::Is { lhs, rhs, .. } => {
            uses_aggregate(scope, lhs) || uses_aggregate(scope, rhs)
        }
        ExprKind::Between { lhs, low, high, .. } => {
            uses_aggregate(scope, lhs) || uses_aggregate(scope, low) || uses_aggregate(scope, high)
        }
        ExprKind::In { lhs, values, .. } => {
            uses_aggregate(scope, lhs) || uses_aggregate(scope, values)
        }
        ExprKind::Any { lhs, values, .. } | ExprKind::All { lhs, values, .. } => {
            uses_aggregate(scope, lhs) || uses_aggregate(scope, values)
        }
        ExprKind::Like { lhs, pattern, .. } => {
            uses_aggregate(scope, lhs) || uses_aggregate(scope, pattern)
        }
        ExprKind::Concat(items) | ExprKind::ValueList(items) => {
            items.iter().any(|i| uses_aggregate(scope, i))
        }
        ExprKind::Case { value, when, else_result } => {
            value.as_ref().is_some_and(|v| uses_aggregate(scope, v))
                || when.iter().any(|w| {
                    uses_aggregate(scope, &w.condition) || uses_aggregate(scope, &w.result)
                })
                || else_result.as_ref().is_some_and(|e| uses_aggregate(scope, e))
        }
        _ => false,
    }
}

// ---- projection ------------------------------------------------------

/// Evaluates the select list. Wildcards expand to existing table
/// columns; every other field is appended as a computed column named by
/// its alias or derived name. Returns the result column indexes in
/// select-list order.
fn project(
    ctx: &ExecContext,
    scope: &mut Scope,
    view: &mut View,
    select_clause: &SelectClause,
) -> Result<Vec<usize>, QueryError> {
    let mut result = Vec::new();
    for field in &select_clause.fields {
        match &field.object.kind {
            ExprKind::AllColumns => result.extend(view.header.wildcard_indexes(None)),
            ExprKind::AllColumnsOf(table) => {
                let indexes = view.header.wildcard_indexes(Some(&table.literal));
                if indexes.is_empty() {
                    return Err(QueryError::FieldNotExist {
                        loc: field.object.loc.clone(),
                        field: format!("{}.*", table),
                    });
                }
                result.extend(indexes);
            }
            _ => {
                let mut values = Vec::with_capacity(view.record_len());
                for i in 0..view.record_len() {
                    ctx.check_cancelled()?;
                    values.push(eval(ctx, scope, Some(&RowContext::new(view, i)), &field.object)?);
                }
                view.header.push(HeaderField {
                    view: String::new(),
                    column: field.name(),
                    from_table: false,
                });
                for (record, value) in view.records.iter_mut().zip(values) {
                    record.0.push(Cell::new(value));
                }
                result.push(view.header.len() - 1);
            }
        }
    }
    Ok(result)
}

fn record_key(record: &Record, fields: &[usize]) -> Vec<ComparisonKey> {
    fields.iter().map(|&i| record.0[i].value().comparison_key()).collect()
}

fn distinct_records(
    ctx: &ExecContext,
    view: &mut View,
    fields: &[usize],
) -> Result<(), QueryError> {
    ctx.check_cancelled()?;
    let mut seen: HashSet<Vec<ComparisonKey>> = HashSet::new();
    let records = std::mem::take(&mut view.records);
    view.records =
        records.into_iter().filter(|r| seen.insert(record_key(r, fields))).collect();
    Ok(())
}

// ---- set operations --------------------------------------------------

fn select_set(ctx: &ExecContext, scope: &mut Scope, set: &SelectSet) -> Result<View, QueryError> {
    let left = body_view(ctx, scope, &set.lhs)?;
    let right = body_view(ctx, scope, &set.rhs)?;
    combine(ctx, left, right, set.op, set.all)
}

/// UNION / INTERSECT / EXCEPT. Headers come from the left side; the ALL
/// variants are multiset-valued, the plain forms set-valued.
fn combine(
    ctx: &ExecContext,
    left: View,
    right: View,
    op: SetOperator,
    all: bool,
) -> Result<View, QueryError> {
    if left.field_len() != right.field_len() {
        return Err(QueryError::SetOperationFieldMismatch {
            loc: Location::default(),
            left: left.field_len(),
            right: right.field_len(),
        });
    }
    ctx.check_cancelled()?;

    let width: Vec<usize> = (0..left.field_len()).collect();
    let mut out = View::new(left.header.clone());

    match op {
        SetOperator::Union => {
            out.records = left.records;
            out.records.extend(right.records);
            if !all {
                let mut seen = HashSet::new();
                let records = std::mem::take(&mut out.records);
                out.records =
                    records.into_iter().filter(|r| seen.insert(record_key(r, &width))).collect();
            }
        }
        SetOperator::Intersect => {
            let mut counts: HashMap<Vec<ComparisonKey>, usize> = HashMap::new();
            for record in &right.records {
                *counts.entry(record_key(record, &width)).or_insert(0) += 1;
            }
            let mut seen = HashSet::new();
            for record in left.records {
                ctx.check_cancelled()?;
                let key = record_key(&record, &width);
                if all {
                    if let Some(n) = counts.get_mut(&key) {
                        if *n > 0 {
                            *n -= 1;
                            out.records.push(record);
                        }
                    }
                } else if counts.contains_key(&key) && seen.insert(key) {
                    out.records.push(record);
                }
            }
        }
        SetOperator::Except => {
            let mut counts: HashMap<Vec<ComparisonKey>, usize> = HashMap::new();
            for record in &right.records {
                *counts.entry(record_key(record, &width)).or_insert(0) += 1;
            }
            let mut seen = HashSet::new();
            for record in left.records {
                ctx.check_cancelled()?;
                let key = record_key(&record, &width);
                if all {
                    match counts.get_mut(&key) {
                        Some(n) if *n > 0 => *n -= 1,
                        _ => out.records.push(record),
                    }
                } else if !counts.contains_key(&key) && seen.insert(key) {
                    out.records.push(record);
                }
            }
        }
    }
    Ok(out)
}

// ---- WITH ------------------------------------------------------------

fn install_inline_table(
    ctx: &ExecContext,
    scope: &mut Scope,
    def: &InlineTableDef,
) -> Result<(), QueryError> {
    if def.recursive {
        // Reserve the name first so redeclaration fails before any work
        // and the recursive reference resolves during iteration.
        scope.set_inline_table(&def.name, View::default())?;
        let view = recursive_inline_view(ctx, scope, def)?;
        scope.replace_inline_table(&def.name, inline_shaped(view, def)?);
        Ok(())
    } else {
        let view = select(ctx, scope, &def.query)?;
        scope.set_inline_table(&def.name, inline_shaped(view, def)?)
    }
}

/// Applies the inline table's name and declared column list to a result
/// view so later FROM references see real table columns.
fn inline_shaped(mut view: View, def: &InlineTableDef) -> Result<View, QueryError> {
    if !def.columns.is_empty() && def.columns.len() != view.field_len() {
        return Err(QueryError::InlineTableFieldMismatch {
            loc: def.name.location().clone(),
            name: def.name.literal.clone(),
            defined: def.columns.len(),
            actual: view.field_len(),
        });
    }
    let mut fields = Vec::with_capacity(view.field_len());
    for (i, field) in view.header.fields().iter().enumerate() {
        let column = match def.columns.get(i) {
            Some(name) => name.literal.clone(),
            None => field.column.clone(),
        };
        fields.push(HeaderField { view: def.name.literal.clone(), column, from_table: true });
    }
    view.header = Header::from_fields(fields);
    Ok(view)
}

/// The recursive union: run the anchor, then re-run the recursive side
/// against the previous round's rows, accumulating until a round adds
/// nothing.
fn recursive_inline_view(
    ctx: &ExecContext,
    scope: &mut Scope,
    def: &InlineTableDef,
) -> Result<View, QueryError> {
    let set = match &def.query.body {
        SelectBody::Set(set) => set.clone(),
        // A RECURSIVE marker without a union body degrades to a plain
        // inline table.
        _ => return select(ctx, scope, &def.query),
    };

    let anchor = body_view(ctx, scope, &set.lhs)?;
    let mut seen: HashSet<Vec<ComparisonKey>> = HashSet::new();
    let width: Vec<usize> = (0..anchor.field_len()).collect();
    if !set.all {
        for record in &anchor.records {
            seen.insert(record_key(record, &width));
        }
    }

    let mut accumulated = anchor.clone();
    let mut working = anchor;
    while working.record_len() > 0 {
        ctx.check_cancelled()?;
        scope.replace_inline_table(&def.name, inline_shaped(working.clone(), def)?);
        let produced = body_view(ctx, scope, &set.rhs)?;
        if produced.field_len() != accumulated.field_len() {
            return Err(QueryError::SetOperationFieldMismatch {
                loc: def.name.location().clone(),
                left: accumulated.field_len(),
                right: produced.field_len(),
            });
        }

        let mut fresh: Vec<Record> = Vec::new();
        for record in produced.records {
            if set.all || seen.insert(record_key(&record, &width)) {
                fresh.push(record);
            }
        }
        if fresh.is_empty() {
            break;
        }
        accumulated.records.extend(fresh.clone());
        working = View { header: accumulated.header.clone(), records: fresh, is_grouped: false };
    }
    Ok(accumulated)
}

// ---- ORDER BY / LIMIT / OFFSET ---------------------------------------

pub(crate) struct SortKey {
    pub index: usize,
    pub ascending: bool,
    pub nulls_first: bool,
}

/// Resolves each ORDER BY item to a column of the working view: a select
/// field alias, an existing column, or a freshly evaluated hidden column.
fn append_sort_columns(
    ctx: &ExecContext,
    scope: &mut Scope,
    view: &mut View,
    items: &[OrderItem],
    result_fields: &[usize],
) -> Result<Vec<SortKey>, QueryError> {
    let mut keys = Vec::with_capacity(items.len());
    for item in items {
        let index = resolve_sort_column(ctx, scope, view, &item.value, result_fields)?;
        keys.push(SortKey {
            index,
            ascending: item.ascending(),
            nulls_first: item.nulls_first(),
        });
    }
    Ok(keys)
}

fn resolve_sort_column(
    ctx: &ExecContext,
    scope: &mut Scope,
    view: &mut View,
    expr: &Expr,
    result_fields: &[usize],
) -> Result<usize, QueryError> {
    // Select-list aliases win over source columns.
    if let ExprKind::FieldReference { view: None, column } = &expr.kind {
        for &fi in result_fields {
            let field = &view.header.fields()[fi];
            if field.view.is_empty() && field.column.eq_ignore_ascii_case(&column.literal) {
                return Ok(fi);
            }
        }
    }
    if let ExprKind::FieldReference { view: qualifier, column } = &expr.kind {
        if let Ok(index) =
            view.header.search(qualifier.as_ref().map(|q| q.literal.as_str()), &column.literal)
        {
            return Ok(index);
        }
    }

    // Computed expressions reuse a column with the same rendered form
    // when one exists (analytic calls in particular).
    let rendered = expr.to_string();
    for (i, field) in view.header.fields().iter().enumerate() {
        if !field.from_table && field.view.is_empty() && field.column == rendered {
            return Ok(i);
        }
    }

    let mut values = Vec::with_capacity(view.record_len());
    for i in 0..view.record_len() {
        ctx.check_cancelled()?;
        values.push(eval(ctx, scope, Some(&RowContext::new(view, i)), expr)?);
    }
    view.header.push(HeaderField { view: String::new(), column: rendered, from_table: false });
    for (record, value) in view.records.iter_mut().zip(values) {
        record.0.push(Cell::new(value));
    }
    Ok(view.header.len() - 1)
}

/// Orders NULLs absolutely by position, then applies the combined
/// comparator; incomparable pairs keep their relative order.
pub(crate) fn compare_for_sort(
    a: &Primary,
    b: &Primary,
    ascending: bool,
    nulls_first: bool,
) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => {
            if nulls_first {
                Ordering::Less
            } else {
                Ordering::Greater
            }
        }
        (false, true) => {
            if nulls_first {
                Ordering::Greater
            } else {
                Ordering::Less
            }
        }
        (false, false) => {
            let ord = match compare_combinedly(a, b) {
                ComparisonResult::Less => Ordering::Less,
                ComparisonResult::Greater => Ordering::Greater,
                _ => Ordering::Equal,
            };
            if ascending {
                ord
            } else {
                ord.reverse()
            }
        }
    }
}

fn sort_records(view: &mut View, keys: &[SortKey]) {
    view.records.sort_by(|a, b| {
        for key in keys {
            let ord = compare_for_sort(
                a.0[key.index].value(),
                b.0[key.index].value(),
                key.ascending,
                key.nulls_first,
            );
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

fn apply_offset(
    ctx: &ExecContext,
    scope: &mut Scope,
    view: &mut View,
    offset: &Expr,
) -> Result<(), QueryError> {
    let value = eval(ctx, scope, None, offset)?;
    let n = value.to_integer().filter(|n| *n >= 0).ok_or_else(|| {
        QueryError::InvalidOffsetValue { loc: offset.loc.clone(), value: value.to_string() }
    })?;
    let n = (n as usize).min(view.record_len());
    view.records = view.records.split_off(n);
    Ok(())
}

fn apply_limit(
    ctx: &ExecContext,
    scope: &mut Scope,
    view: &mut View,
    limit: &LimitClause,
    sort_keys: &[SortKey],
    loc: &Location,
) -> Result<(), QueryError> {
    let value = eval(ctx, scope, None, &limit.value)?;
    let count = if limit.percent {
        let pct = value.to_float().filter(|p| *p >= 0.0).ok_or_else(|| {
            QueryError::InvalidLimitValue { loc: limit.value.loc.clone(), value: value.to_string() }
        })?;
        ((view.record_len() as f64) * pct / 100.0).floor() as usize
    } else {
        let n = value.to_integer().filter(|n| *n >= 0).ok_or_else(|| {
            QueryError::InvalidLimitValue { loc: limit.value.loc.clone(), value: value.to_string() }
        })?;
        n as usize
    };

    if count >= view.record_len() {
        return Ok(());
    }

    let mut end = count;
    if limit.with_ties {
        if sort_keys.is_empty() {
            return Err(QueryError::WithTiesWithoutOrderBy { loc: loc.clone() });
        }
        if end > 0 {
            while end < view.record_len() && ties(&view.records[end - 1], &view.records[end], sort_keys)
            {
                end += 1;
            }
        }
    }
    view.records.truncate(end);
    Ok(())
}

fn ties(a: &Record, b: &Record, keys: &[SortKey]) -> bool {
    keys.iter().all(|key| {
        compare_for_sort(a.0[key.index].value(), b.0[key.index].value(), true, true)
            == Ordering::Equal
    })
}

/// Trims the working view down to the select-list columns. Result
/// columns count as table columns so the view works as a source again
/// (subqueries in FROM, inline tables).
fn fix(view: View, result_fields: &[usize]) -> View {
    let mut header = Header::default();
    for &i in result_fields {
        let field = &view.header.fields()[i];
        header.push(HeaderField {
            view: field.view.clone(),
            column: field.column.clone(),
            from_table: true,
        });
    }
    let mut out = View::new(header);
    out.records = view
        .records
        .into_iter()
        .map(|record| {
            Record(result_fields.iter().map(|&i| Cell::new(record.0[i].value().clone())).collect())
        })
        .collect();
    out
}
