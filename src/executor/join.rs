use crate::ast::{JoinCondition, JoinType, Location};
use crate::error::QueryError;
use crate::executor::eval::{eval_ternary, RowContext};
use crate::scope::Scope;
use crate::session::ExecContext;
use crate::value::{self, Primary, Ternary};
use crate::view::{Cell, FieldSearchError, Header, Record, View};

/// Joins two resolved views. NATURAL derives the USING column list from
/// the shared column names; USING coalesces the matched columns into a
/// single output column at the left side's position.
pub fn join_views(
    ctx: &ExecContext,
    scope: &mut Scope,
    left: View,
    right: View,
    join_type: JoinType,
    natural: bool,
    condition: Option<&JoinCondition>,
    loc: &Location,
) -> Result<View, QueryError> {
    let using = using_columns(&left, &right, natural, condition, loc)?;

    let merged_header = Header::merge(&left.header, &right.header);
    let mut scratch = View::new(merged_header.clone());
    scratch.records.push(Record::default());

    let on = match condition {
        Some(JoinCondition::On(expr)) => Some(expr),
        _ => None,
    };

    let (keep_left, keep_right) = match join_type {
        JoinType::Cross | JoinType::Inner => (false, false),
        JoinType::Left => (true, false),
        JoinType::Right => (false, true),
        JoinType::Full => (true, true),
    };

    let left_width = left.header.len();
    let right_width = right.header.len();
    let mut out = View::new(output_header(&left, &right, &using));
    let mut right_matched = vec![false; right.records.len()];

    for left_record in &left.records {
        ctx.check_cancelled()?;
        let mut matched = false;

        for (ri, right_record) in right.records.iter().enumerate() {
            let hit = match (&using[..], on) {
                (pairs, _) if !pairs.is_empty() => pairs.iter().all(|(l, r)| {
                    value::equal_to(left_record.0[*l].value(), right_record.0[*r].value())
                        == Ternary::True
                }),
                (_, Some(expr)) => {
                    let mut cells = left_record.0.clone();
                    cells.extend(right_record.0.iter().cloned());
                    scratch.records[0] = Record(cells);
                    eval_ternary(ctx, scope, Some(&RowContext::new(&scratch, 0)), expr)?
                        == Ternary::True
                }
                _ => true,
            };
            if hit {
                matched = true;
                right_matched[ri] = true;
                out.records.push(output_record(
                    Some(left_record),
                    Some(right_record),
                    left_width,
                    right_width,
                    &using,
                ));
            }
        }

        if !matched && keep_left {
            out.records.push(output_record(
                Some(left_record),
                None,
                left_width,
                right_width,
                &using,
            ));
        }
    }

    if keep_right {
        for (ri, right_record) in right.records.iter().enumerate() {
            if !right_matched[ri] {
                ctx.check_cancelled()?;
                out.records.push(output_record(
                    None,
                    Some(right_record),
                    left_width,
                    right_width,
                    &using,
                ));
            }
        }
    }

    Ok(out)
}

/// (left index, right index) pairs the join matches and coalesces.
fn using_columns(
    left: &View,
    right: &View,
    natural: bool,
    condition: Option<&JoinCondition>,
    loc: &Location,
) -> Result<Vec<(usize, usize)>, QueryError> {
    if natural {
        let mut pairs = Vec::new();
        for (li, field) in left.header.fields().iter().enumerate() {
            if !field.from_table {
                continue;
            }
            if let Ok(ri) = right.header.search(None, &field.column) {
                pairs.push((li, ri));
            }
        }
        return Ok(pairs);
    }

    let columns = match condition {
        Some(JoinCondition::Using(columns)) => columns,
        _ => return Ok(Vec::new()),
    };
    let mut pairs = Vec::with_capacity(columns.len());
    for column in columns {
        let resolve = |view: &View| match view.header.search(None, &column.literal) {
            Ok(i) => Ok(i),
            Err(FieldSearchError::NotExist) => Err(QueryError::JoinFieldNotFound { loc: loc.clone() }),
            Err(FieldSearchError::Ambiguous) => Err(QueryError::FieldAmbiguous {
                loc: loc.clone(),
                field: column.literal.clone(),
            }),
        };
        pairs.push((resolve(left)?, resolve(right)?));
    }
    Ok(pairs)
}

/// Output columns: all of the left side, then the right side minus the
/// coalesced USING columns.
fn output_header(left: &View, right: &View, using: &[(usize, usize)]) -> Header {
    let mut fields = left.header.fields().to_vec();
    for (ri, field) in right.header.fields().iter().enumerate() {
        if !using.iter().any(|(_, u)| *u == ri) {
            fields.push(field.clone());
        }
    }
    Header::from_fields(fields)
}

fn output_record(
    left: Option<&Record>,
    right: Option<&Record>,
    left_width: usize,
    right_width: usize,
    using: &[(usize, usize)],
) -> Record {
    let mut cells: Vec<Cell> = match left {
        Some(record) => record.0.clone(),
        None => vec![Cell::new(Primary::Null); left_width],
    };
    // A right-only row supplies the coalesced USING values.
    if left.is_none() {
        if let Some(right_record) = right {
            for (li, ri) in using {
                cells[*li] = right_record.0[*ri].clone();
            }
        }
    }
    match right {
        Some(record) => {
            for (ri, cell) in record.0.iter().enumerate() {
                if !using.iter().any(|(_, u)| *u == ri) {
                    cells.push(cell.clone());
                }
            }
        }
        None => {
            let dropped = using.len();
            cells.extend(vec![Cell::new(Primary::Null); right_width - dropped]);
        }
    }
    Record(cells)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expr, ExprKind};
    use crate::flags::Flags;
    use crate::session::{CancelToken, Session};
    use crate::value::ComparisonOperator;

    fn left_view() -> View {
        let mut view = View::new(Header::new("l", &["id", "x"]));
        view.records.push(Record::from_values(vec![
            Primary::Integer(1),
            Primary::String("A".into()),
        ]));
        view.records.push(Record::from_values(vec![
            Primary::Integer(2),
            Primary::String("B".into()),
        ]));
        view
    }

    fn right_view() -> View {
        let mut view = View::new(Header::new("r", &["id", "y"]));
        view.records.push(Record::from_values(vec![
            Primary::Integer(1),
            Primary::Boolean(true),
        ]));
        view.records.push(Record::from_values(vec![
            Primary::Integer(3),
            Primary::Boolean(false),
        ]));
        view
    }

    fn on_ids_equal() -> JoinCondition {
        JoinCondition::On(Expr::new(ExprKind::Comparison {
            lhs: Box::new(Expr::qualified_field("l", "id")),
            op: ComparisonOperator::Equal,
            rhs: Box::new(Expr::qualified_field("r", "id")),
        }))
    }

    fn run_join(join_type: JoinType, natural: bool, condition: Option<JoinCondition>) -> View {
        let session = Session::new(Flags::default());
        let ctx = ExecContext::new(&session, CancelToken::new());
        let mut scope = Scope::new();
        join_views(
            &ctx,
            &mut scope,
            left_view(),
            right_view(),
            join_type,
            natural,
            condition.as_ref(),
            &Location::default(),
        )
        .unwrap()
    }

    #[test]
    fn cross_join_is_the_full_product() {
        let out = run_join(JoinType::Cross, false, None);
        assert_eq!(out.record_len(), 4);
        assert_eq!(out.field_len(), 4);
    }

    #[test]
    fn inner_join_keeps_matching_pairs() {
        let out = run_join(JoinType::Inner, false, Some(on_ids_equal()));
        assert_eq!(out.record_len(), 1);
        assert_eq!(out.records[0].values()[0], Primary::Integer(1));
    }

    #[test]
    fn left_join_null_extends_unmatched_rows() {
        let out = run_join(JoinType::Left, false, Some(on_ids_equal()));
        assert_eq!(out.record_len(), 2);
        // Second left row has no partner: right columns are NULL.
        let row = out.records[1].values();
        assert_eq!(row[0], Primary::Integer(2));
        assert_eq!(row[2], Primary::Null);
        assert_eq!(row[3], Primary::Null);
    }

    #[test]
    fn full_join_emits_both_unmatched_sides() {
        let out = run_join(JoinType::Full, false, Some(on_ids_equal()));
        assert_eq!(out.record_len(), 3);
        let last = out.records[2].values();
        assert_eq!(last[0], Primary::Null);
        assert_eq!(last[2], Primary::Integer(3));
    }

    #[test]
    fn natural_join_coalesces_shared_columns() {
        let out = run_join(JoinType::Inner, true, None);
        // id appears once; columns are id, x, y.
        assert_eq!(out.field_len(), 3);
        assert_eq!(out.record_len(), 1);
        assert_eq!(
            out.records[0].values(),
            vec![Primary::Integer(1), Primary::String("A".into()), Primary::Boolean(true)]
        );
    }

    #[test]
    fn full_natural_join_takes_using_values_from_the_right() {
        let out = run_join(JoinType::Full, true, None);
        assert_eq!(out.record_len(), 3);
        let last = out.records[2].values();
        // The coalesced id of the right-only row is 3, not NULL.
        assert_eq!(last[0], Primary::Integer(3));
        assert_eq!(last[1], Primary::Null);
        assert_eq!(last[2], Primary::Boolean(false));
    }

    #[test]
    fn using_an_unknown_column_errors() {
        let session = Session::new(Flags::default());
        let ctx = ExecContext::new(&session, CancelToken::new());
        let mut scope = Scope::new();
        let condition = JoinCondition::Using(vec![crate::ast::Identifier::new("zzz")]);
        let result = join_views(
            &ctx,
            &mut scope,
            left_view(),
            right_view(),
            JoinType::Inner,
            false,
            Some(&condition),
            &Location::default(),
        );
        assert!(matches!(result, Err(QueryError::JoinFieldNotFound { .. })));
    }
}
