// End-to-end statement and query scenarios over in-memory tables.

use std::sync::Arc;

use crate::ast::*;
use crate::error::QueryError;
use crate::executor::statement::{Flow, Processor};
use crate::flags::Flags;
use crate::loader::MemoryLoader;
use crate::session::Session;
use crate::value::{ComparisonOperator, Primary, Ternary};
use crate::view::{Header, Record, View};

// --- builders ------------------------------------------------------------

fn table(name: &str, columns: &[&str], rows: Vec<Vec<Primary>>) -> View {
    let mut view = View::new(Header::new(name, columns));
    view.records = rows.into_iter().map(Record::from_values).collect();
    view
}

fn session_with(tables: Vec<(&str, View)>) -> Session {
    let mut loader = MemoryLoader::new();
    for (name, view) in tables {
        loader.register(name, view);
    }
    Session::new(Flags::default()).with_loader(Arc::new(loader))
}

fn i(v: i64) -> Primary {
    Primary::Integer(v)
}

fn s(v: &str) -> Primary {
    Primary::String(v.to_string())
}

fn null() -> Primary {
    Primary::Null
}

fn entity(fields: Vec<Field>) -> SelectEntity {
    SelectEntity::new(SelectClause { distinct: false, fields })
}

fn entity_from(fields: Vec<Field>, table: &str) -> SelectEntity {
    let mut e = entity(fields);
    e.from = Some(FromClause {
        tables: vec![TableRef::Table(Box::new(Table::named(table)))],
    });
    e
}

fn query(e: SelectEntity) -> SelectQuery {
    SelectQuery::new(SelectBody::Entity(e))
}

fn cmp(l: Expr, op: ComparisonOperator, r: Expr) -> Expr {
    Expr::new(ExprKind::Comparison { lhs: Box::new(l), op, rhs: Box::new(r) })
}

fn agg(name: &str, arg: Expr) -> Expr {
    Expr::new(ExprKind::AggregateFunction { name: name.into(), distinct: false, args: vec![arg] })
}

fn count_star() -> Expr {
    agg("count", Expr::new(ExprKind::AllColumns))
}

fn select_stmt(q: SelectQuery) -> Statement {
    Statement::new(StatementKind::Select(q))
}

fn column_values(view: &View, index: usize) -> Vec<Primary> {
    view.records.iter().map(|r| r.0[index].value().clone()).collect()
}

fn run_query(session: &Session, q: &SelectQuery) -> View {
    Processor::new(session).select(q).unwrap()
}

fn t_ab() -> View {
    table(
        "t",
        &["a", "b"],
        vec![
            vec![i(1), s("x")],
            vec![i(2), s("y")],
            vec![null(), s("z")],
        ],
    )
}

// --- query scenarios -----------------------------------------------------

#[test]
fn select_literal_plus_null_is_one_null_cell() {
    let session = session_with(vec![]);
    let add = Expr::new(ExprKind::Arithmetic {
        lhs: Box::new(Expr::integer(1)),
        op: ArithmeticOperator::Add,
        rhs: Box::new(Expr::null()),
    });
    let q = query(entity(vec![Field::new(add)]));
    let view = run_query(&session, &q);
    assert_eq!(view.record_len(), 1);
    assert_eq!(view.field_len(), 1);
    assert_eq!(view.records[0].values(), vec![null()]);
}

#[test]
fn where_with_is_null_and_nulls_first_ordering() {
    let session = session_with(vec![("t", t_ab())]);
    let filter = Expr::new(ExprKind::Logic {
        lhs: Box::new(cmp(Expr::field("a"), ComparisonOperator::Equal, Expr::integer(1))),
        op: LogicOperator::Or,
        rhs: Box::new(Expr::new(ExprKind::Is {
            lhs: Box::new(Expr::field("a")),
            rhs: Box::new(Expr::null()),
            negated: false,
        })),
    });
    let mut e = entity_from(vec![Field::new(Expr::field("a"))], "t");
    e.filter = Some(filter);
    let mut q = query(e);
    q.order_by = vec![OrderItem {
        value: Expr::field("a"),
        direction: None,
        nulls: Some(NullsPosition::First),
    }];

    let view = run_query(&session, &q);
    assert_eq!(column_values(&view, 0), vec![null(), i(1)]);
}

#[test]
fn aggregates_over_nullable_column() {
    let session = session_with(vec![(
        "t",
        table("t", &["a"], vec![vec![i(1)], vec![i(2)], vec![null()]]),
    )]);
    let q = query(entity_from(
        vec![
            Field::new(count_star()),
            Field::new(agg("count", Expr::field("a"))),
            Field::new(agg("sum", Expr::field("a"))),
            Field::new(agg("avg", Expr::field("a"))),
        ],
        "t",
    ));
    let view = run_query(&session, &q);
    assert_eq!(view.record_len(), 1);
    assert_eq!(
        view.records[0].values(),
        vec![i(3), i(2), i(3), Primary::Float(1.5)]
    );
}

#[test]
fn recursive_inline_table_counts_up() {
    // WITH r (n) AS (SELECT 1 UNION ALL SELECT n + 1 FROM r WHERE n < 3)
    // SELECT n FROM r
    let session = session_with(vec![]);
    let anchor = SelectBody::Entity(entity(vec![Field::new(Expr::integer(1))]));
    let mut step = entity_from(
        vec![Field::new(Expr::new(ExprKind::Arithmetic {
            lhs: Box::new(Expr::field("n")),
            op: ArithmeticOperator::Add,
            rhs: Box::new(Expr::integer(1)),
        }))],
        "r",
    );
    step.filter = Some(cmp(Expr::field("n"), ComparisonOperator::LessThan, Expr::integer(3)));
    let with_query = SelectQuery::new(SelectBody::Set(Box::new(SelectSet {
        lhs: anchor,
        op: SetOperator::Union,
        all: true,
        rhs: SelectBody::Entity(step),
    })));

    let mut q = query(entity_from(vec![Field::new(Expr::field("n"))], "r"));
    q.with = vec![InlineTableDef {
        recursive: true,
        name: Identifier::new("r"),
        columns: vec![Identifier::new("n")],
        query: with_query,
    }];

    let view = run_query(&session, &q);
    assert_eq!(column_values(&view, 0), vec![i(1), i(2), i(3)]);
}

#[test]
fn union_dedupes_and_union_all_preserves_order() {
    let session = session_with(vec![]);
    let one = SelectBody::Entity(entity(vec![Field::new(Expr::integer(1))]));
    let also_one = SelectBody::Entity(entity(vec![Field::new(Expr::integer(1))]));
    let two = SelectBody::Entity(entity(vec![Field::new(Expr::integer(2))]));

    let union = SelectQuery::new(SelectBody::Set(Box::new(SelectSet {
        lhs: SelectBody::Set(Box::new(SelectSet {
            lhs: one.clone(),
            op: SetOperator::Union,
            all: true,
            rhs: also_one.clone(),
        })),
        op: SetOperator::Union,
        all: false,
        rhs: two.clone(),
    })));
    let view = run_query(&session, &union);
    assert_eq!(column_values(&view, 0), vec![i(1), i(2)]);

    let union_all = SelectQuery::new(SelectBody::Set(Box::new(SelectSet {
        lhs: one,
        op: SetOperator::Union,
        all: true,
        rhs: also_one,
    })));
    let view = run_query(&session, &union_all);
    assert_eq!(column_values(&view, 0), vec![i(1), i(1)]);
}

#[test]
fn intersect_and_except_have_set_and_multiset_forms() {
    let session = session_with(vec![
        ("l", table("l", &["v"], vec![vec![i(1)], vec![i(1)], vec![i(2)], vec![i(3)]])),
        ("r", table("r", &["v"], vec![vec![i(1)], vec![i(1)], vec![i(2)]])),
    ]);
    let l = SelectBody::Entity(entity_from(vec![Field::new(Expr::field("v"))], "l"));
    let r = SelectBody::Entity(entity_from(vec![Field::new(Expr::field("v"))], "r"));

    let intersect_all = SelectQuery::new(SelectBody::Set(Box::new(SelectSet {
        lhs: l.clone(),
        op: SetOperator::Intersect,
        all: true,
        rhs: r.clone(),
    })));
    let view = run_query(&session, &intersect_all);
    assert_eq!(column_values(&view, 0), vec![i(1), i(1), i(2)]);

    let intersect = SelectQuery::new(SelectBody::Set(Box::new(SelectSet {
        lhs: l.clone(),
        op: SetOperator::Intersect,
        all: false,
        rhs: r.clone(),
    })));
    let view = run_query(&session, &intersect);
    assert_eq!(column_values(&view, 0), vec![i(1), i(2)]);

    let except_all = SelectQuery::new(SelectBody::Set(Box::new(SelectSet {
        lhs: l.clone(),
        op: SetOperator::Except,
        all: true,
        rhs: r.clone(),
    })));
    let view = run_query(&session, &except_all);
    assert_eq!(column_values(&view, 0), vec![i(3)]);

    let except = SelectQuery::new(SelectBody::Set(Box::new(SelectSet {
        lhs: l,
        op: SetOperator::Except,
        all: false,
        rhs: r,
    })));
    let view = run_query(&session, &except);
    assert_eq!(column_values(&view, 0), vec![i(3)]);
}

#[test]
fn set_operation_field_counts_must_match() {
    let session = session_with(vec![]);
    let one = SelectBody::Entity(entity(vec![Field::new(Expr::integer(1))]));
    let pair = SelectBody::Entity(entity(vec![
        Field::new(Expr::integer(1)),
        Field::new(Expr::integer(2)),
    ]));
    let bad = SelectQuery::new(SelectBody::Set(Box::new(SelectSet {
        lhs: one,
        op: SetOperator::Union,
        all: false,
        rhs: pair,
    })));
    let err = Processor::new(&session).select(&bad).unwrap_err();
    assert!(matches!(err, QueryError::SetOperationFieldMismatch { left: 1, right: 2, .. }));
}

#[test]
fn limit_offset_take_the_ordered_window() {
    let rows = (1..=5).map(|n| vec![i(n)]).collect();
    let session = session_with(vec![("t", table("t", &["n"], rows))]);
    let mut q = query(entity_from(vec![Field::new(Expr::field("n"))], "t"));
    q.order_by = vec![OrderItem::new(Expr::field("n"))];
    q.limit = Some(LimitClause { value: Expr::integer(2), percent: false, with_ties: false });
    q.offset = Some(Expr::integer(1));

    let view = run_query(&session, &q);
    assert_eq!(column_values(&view, 0), vec![i(2), i(3)]);

    // Offset beyond the record count clamps to empty.
    let mut over = query(entity_from(vec![Field::new(Expr::field("n"))], "t"));
    over.offset = Some(Expr::integer(99));
    assert_eq!(run_query(&session, &over).record_len(), 0);
}

#[test]
fn limit_percent_and_with_ties() {
    let rows = vec![vec![i(1)], vec![i(1)], vec![i(2)], vec![i(3)]];
    let session = session_with(vec![("t", table("t", &["n"], rows))]);

    let mut percent = query(entity_from(vec![Field::new(Expr::field("n"))], "t"));
    percent.order_by = vec![OrderItem::new(Expr::field("n"))];
    percent.limit = Some(LimitClause { value: Expr::integer(50), percent: true, with_ties: false });
    assert_eq!(run_query(&session, &percent).record_len(), 2);

    // LIMIT 1 WITH TIES keeps the second 1.
    let mut ties = query(entity_from(vec![Field::new(Expr::field("n"))], "t"));
    ties.order_by = vec![OrderItem::new(Expr::field("n"))];
    ties.limit = Some(LimitClause { value: Expr::integer(1), percent: false, with_ties: true });
    let view = run_query(&session, &ties);
    assert_eq!(column_values(&view, 0), vec![i(1), i(1)]);

    // WITH TIES without ORDER BY is an error.
    let mut bare = query(entity_from(vec![Field::new(Expr::field("n"))], "t"));
    bare.limit = Some(LimitClause { value: Expr::integer(1), percent: false, with_ties: true });
    assert!(matches!(
        Processor::new(&session).select(&bare),
        Err(QueryError::WithTiesWithoutOrderBy { .. })
    ));
}

#[test]
fn group_by_puts_nulls_in_one_group() {
    let session = session_with(vec![(
        "t",
        table("t", &["a"], vec![vec![null()], vec![i(1)], vec![null()]]),
    )]);
    let mut e = entity_from(
        vec![Field::new(Expr::field("a")), Field::new(count_star())],
        "t",
    );
    e.group_by = vec![Expr::field("a")];
    let mut q = query(e);
    q.order_by = vec![OrderItem::new(Expr::new(ExprKind::ColumnNumber {
        view: Identifier::new("t"),
        number: 1,
    }))];

    let view = run_query(&session, &q);
    assert_eq!(view.record_len(), 2);
    let mut counts: Vec<(Primary, Primary)> = view
        .records
        .iter()
        .map(|r| (r.0[0].value().clone(), r.0[1].value().clone()))
        .collect();
    counts.sort_by_key(|(_, c)| matches!(c, Primary::Integer(1)));
    assert_eq!(counts[0], (null(), i(2)));
    assert_eq!(counts[1], (i(1), i(1)));
}

#[test]
fn distinct_dedupes_the_projection() {
    let session = session_with(vec![(
        "t",
        table("t", &["a"], vec![vec![i(1)], vec![i(1)], vec![i(2)]]),
    )]);
    let mut e = entity_from(vec![Field::new(Expr::field("a"))], "t");
    e.select.distinct = true;
    let view = run_query(&session, &query(e));
    assert_eq!(column_values(&view, 0), vec![i(1), i(2)]);
}

#[test]
fn wildcards_expand_table_columns() {
    let session = session_with(vec![("t", t_ab())]);
    let q = query(entity_from(vec![Field::new(Expr::new(ExprKind::AllColumns))], "t"));
    let view = run_query(&session, &q);
    assert_eq!(view.field_len(), 2);

    let q = query(entity_from(
        vec![Field::new(Expr::new(ExprKind::AllColumnsOf(Identifier::new("t"))))],
        "t",
    ));
    assert_eq!(run_query(&session, &q).field_len(), 2);
}

#[test]
fn subqueries_in_from_where_and_exists() {
    let session = session_with(vec![("t", t_ab())]);

    // FROM (SELECT a FROM t) AS sub
    let inner = query(entity_from(vec![Field::new(Expr::field("a"))], "t"));
    let mut outer_entity = entity(vec![Field::new(Expr::field("a"))]);
    outer_entity.from = Some(FromClause {
        tables: vec![TableRef::Table(Box::new(Table {
            loc: Location::default(),
            object: TableObject::Subquery(inner.clone()),
            alias: Some(Identifier::new("sub")),
        }))],
    });
    assert_eq!(run_query(&session, &query(outer_entity)).record_len(), 3);

    // WHERE a = (SELECT MAX(a) FROM t) yields the row with a = 2.
    let max_q = query(entity_from(vec![Field::new(agg("max", Expr::field("a")))], "t"));
    let mut e = entity_from(vec![Field::new(Expr::field("a"))], "t");
    e.filter = Some(cmp(
        Expr::field("a"),
        ComparisonOperator::Equal,
        Expr::new(ExprKind::Subquery(Box::new(max_q))),
    ));
    let view = run_query(&session, &query(e));
    assert_eq!(column_values(&view, 0), vec![i(2)]);

    // EXISTS over a non-empty subquery.
    let mut e = entity(vec![Field::new(Expr::new(ExprKind::Exists(Box::new(inner))))]);
    e.from = None;
    let view = run_query(&session, &query(e));
    assert_eq!(view.records[0].values(), vec![Primary::Ternary(Ternary::True)]);
}

#[test]
fn natural_join_through_the_from_clause() {
    let session = session_with(vec![
        ("p", table("p", &["id", "name"], vec![vec![i(1), s("ann")], vec![i(2), s("bob")]])),
        ("q", table("q", &["id", "score"], vec![vec![i(1), i(90)]])),
    ]);
    let join = TableRef::Join(Box::new(Join {
        left: TableRef::Table(Box::new(Table::named("p"))),
        right: TableRef::Table(Box::new(Table::named("q"))),
        join_type: JoinType::Inner,
        natural: true,
        condition: None,
    }));
    let mut e = entity(vec![Field::new(Expr::new(ExprKind::AllColumns))]);
    e.from = Some(FromClause { tables: vec![join] });
    let view = run_query(&session, &query(e));
    assert_eq!(view.field_len(), 3);
    assert_eq!(view.record_len(), 1);
    assert_eq!(view.records[0].values(), vec![i(1), s("ann"), i(90)]);
}

#[test]
fn analytic_function_in_the_select_list() {
    let rows = vec![vec![s("a"), i(3)], vec![s("a"), i(1)], vec![s("b"), i(5)]];
    let session = session_with(vec![("t", table("t", &["cat", "score"], rows))]);
    let rank = Expr::new(ExprKind::AnalyticFunction(Box::new(AnalyticFunction {
        name: "row_number".into(),
        distinct: false,
        args: vec![],
        ignore_nulls: false,
        clause: AnalyticClause {
            partition: vec![Expr::field("cat")],
            order_by: vec![OrderItem::new(Expr::field("score"))],
        },
    })));
    let q = query(entity_from(
        vec![Field::new(Expr::field("cat")), Field::aliased(rank, "rn")],
        "t",
    ));
    let view = run_query(&session, &q);
    assert_eq!(column_values(&view, 1), vec![i(2), i(1), i(1)]);
}

#[test]
fn duplicate_from_names_are_rejected() {
    let session = session_with(vec![("t", t_ab())]);
    let mut e = entity(vec![Field::new(Expr::new(ExprKind::AllColumns))]);
    e.from = Some(FromClause {
        tables: vec![
            TableRef::Table(Box::new(Table::named("t"))),
            TableRef::Table(Box::new(Table::named("t"))),
        ],
    });
    assert!(matches!(
        Processor::new(&session).select(&query(e)),
        Err(QueryError::DuplicateTableName { .. })
    ));
}

// --- cursor scenarios ----------------------------------------------------

fn values_query(values: &[i64]) -> SelectQuery {
    let mut body = SelectBody::Entity(entity(vec![Field::aliased(
        Expr::integer(values[0]),
        "n",
    )]));
    for &v in &values[1..] {
        body = SelectBody::Set(Box::new(SelectSet {
            lhs: body,
            op: SetOperator::Union,
            all: true,
            rhs: SelectBody::Entity(entity(vec![Field::new(Expr::integer(v))])),
        }));
    }
    SelectQuery::new(body)
}

#[test]
fn cursor_walks_fetch_positions_over_a_query() {
    let session = session_with(vec![]);
    let mut processor = Processor::new(&session);
    let cur = Identifier::new("cur");
    let v = Variable::new("v");

    let fetch = |position, number: Option<i64>| {
        Statement::new(StatementKind::FetchCursor {
            cursor: Identifier::new("cur"),
            position: FetchPosition {
                position,
                number: number.map(Expr::integer),
            },
            variables: vec![Variable::new("v")],
        })
    };

    let program = vec![
        Statement::new(StatementKind::VariableDeclaration {
            assignments: vec![VariableAssignment { variable: v.clone(), value: None }],
        }),
        Statement::new(StatementKind::CursorDeclaration(CursorDeclaration {
            cursor: cur.clone(),
            query: Some(values_query(&[10, 20, 30])),
            statement: None,
        })),
        Statement::new(StatementKind::OpenCursor { cursor: cur.clone(), values: vec![] }),
    ];
    processor.execute(&program).unwrap();

    processor.execute(&[fetch(FetchPositionType::Next, None)]).unwrap();
    assert_eq!(processor.scope.variable_value(&v).unwrap(), i(10));

    processor.execute(&[fetch(FetchPositionType::Next, None)]).unwrap();
    assert_eq!(processor.scope.variable_value(&v).unwrap(), i(20));

    processor.execute(&[fetch(FetchPositionType::Relative, Some(-1))]).unwrap();
    assert_eq!(processor.scope.variable_value(&v).unwrap(), i(10));

    processor.execute(&[fetch(FetchPositionType::Last, None)]).unwrap();
    assert_eq!(processor.scope.variable_value(&v).unwrap(), i(30));

    // Past the end: no row, the variable keeps its value, and the cursor
    // reports out of range.
    processor.execute(&[fetch(FetchPositionType::Next, None)]).unwrap();
    assert_eq!(processor.scope.variable_value(&v).unwrap(), i(30));
    let held = processor.scope.cursor(&cur).unwrap();
    assert_eq!(held.is_in_range(&cur).unwrap(), Ternary::False);
}

#[test]
fn cursor_over_a_prepared_statement_binds_placeholders() {
    let session = session_with(vec![]);
    let mut processor = Processor::new(&session);
    let prepared = query(entity(vec![Field::aliased(
        Expr::new(ExprKind::Placeholder { index: 1 }),
        "n",
    )]));

    let program = vec![
        Statement::new(StatementKind::Prepare {
            name: Identifier::new("pick"),
            query: prepared,
        }),
        Statement::new(StatementKind::VariableDeclaration {
            assignments: vec![VariableAssignment {
                variable: Variable::new("v"),
                value: None,
            }],
        }),
        Statement::new(StatementKind::CursorDeclaration(CursorDeclaration {
            cursor: Identifier::new("cur"),
            query: None,
            statement: Some(Identifier::new("pick")),
        })),
        Statement::new(StatementKind::OpenCursor {
            cursor: Identifier::new("cur"),
            values: vec![Expr::integer(42)],
        }),
        Statement::new(StatementKind::FetchCursor {
            cursor: Identifier::new("cur"),
            position: FetchPosition::default(),
            variables: vec![Variable::new("v")],
        }),
    ];
    processor.execute(&program).unwrap();
    assert_eq!(processor.scope.variable_value(&Variable::new("v")).unwrap(), i(42));
}

#[test]
fn open_close_lifecycle_errors() {
    let session = session_with(vec![]);
    let mut processor = Processor::new(&session);
    let cur = Identifier::new("cur");

    processor
        .execute(&[Statement::new(StatementKind::CursorDeclaration(CursorDeclaration {
            cursor: cur.clone(),
            query: Some(values_query(&[1])),
            statement: None,
        }))])
        .unwrap();

    // Fetch before open.
    let err = processor
        .execute(&[Statement::new(StatementKind::FetchCursor {
            cursor: cur.clone(),
            position: FetchPosition::default(),
            variables: vec![],
        })])
        .unwrap_err();
    assert!(matches!(err, QueryError::CursorClosed { .. }));

    let open = Statement::new(StatementKind::OpenCursor { cursor: cur.clone(), values: vec![] });
    processor.execute(&[open.clone()]).unwrap();
    let err = processor.execute(&[open]).unwrap_err();
    assert!(matches!(err, QueryError::CursorAlreadyOpen { .. }));

    // Redeclaration of a live cursor.
    let err = processor
        .execute(&[Statement::new(StatementKind::CursorDeclaration(CursorDeclaration {
            cursor: cur.clone(),
            query: Some(values_query(&[1])),
            statement: None,
        }))])
        .unwrap_err();
    assert!(matches!(err, QueryError::RedeclaredCursor { .. }));
}

// --- procedural scenarios ------------------------------------------------

#[test]
fn while_loop_accumulates_with_flow_control() {
    let session = session_with(vec![]);
    let mut processor = Processor::new(&session);
    let n = Variable::new("n");

    // DECLARE @n := 0; WHILE @n < 10: @n := @n + 1; IF @n = 3 BREAK.
    let bump = Statement::new(StatementKind::VariableSubstitution {
        variable: n.clone(),
        value: Expr::new(ExprKind::Arithmetic {
            lhs: Box::new(Expr::new(ExprKind::Variable(n.clone()))),
            op: ArithmeticOperator::Add,
            rhs: Box::new(Expr::integer(1)),
        }),
    });
    let brk = Statement::new(StatementKind::If(IfStatement {
        condition: cmp(
            Expr::new(ExprKind::Variable(n.clone())),
            ComparisonOperator::Equal,
            Expr::integer(3),
        ),
        statements: vec![Statement::new(StatementKind::Break)],
        elseif: vec![],
        else_statements: None,
    }));
    let program = vec![
        Statement::new(StatementKind::VariableDeclaration {
            assignments: vec![VariableAssignment {
                variable: n.clone(),
                value: Some(Expr::integer(0)),
            }],
        }),
        Statement::new(StatementKind::While {
            condition: cmp(
                Expr::new(ExprKind::Variable(n.clone())),
                ComparisonOperator::LessThan,
                Expr::integer(10),
            ),
            statements: vec![bump, brk],
        }),
    ];
    assert_eq!(processor.execute(&program).unwrap(), Flow::Normal);
    assert_eq!(processor.scope.variable_value(&n).unwrap(), i(3));
}

#[test]
fn print_and_printf_write_to_the_log() {
    let session = session_with(vec![]);
    let mut processor = Processor::new(&session);
    let program = vec![
        Statement::new(StatementKind::Print(Expr::string("hello"))),
        Statement::new(StatementKind::Printf {
            format: "%s-%s (%d stays, %% literal)".into(),
            values: vec![Expr::integer(1), Expr::string("two")],
        }),
    ];
    processor.execute(&program).unwrap();
    assert_eq!(
        processor.logs(),
        vec!["'hello'".to_string(), "1-two (%d stays, % literal)".to_string()]
    );
}

#[test]
fn trigger_raises_a_user_error() {
    let session = session_with(vec![]);
    let mut processor = Processor::new(&session);
    let err = processor
        .execute(&[Statement::new(StatementKind::Trigger {
            message: Some(Expr::string("boom")),
            code: Some(42),
        })])
        .unwrap_err();
    assert_eq!(
        err,
        QueryError::UserTriggered { loc: Location::default(), code: 42, message: "boom".into() }
    );
    assert_eq!(err.code(), 42);
}

#[test]
fn user_function_declares_binds_and_returns() {
    let session = session_with(vec![(
        "t",
        table("t", &["a"], vec![vec![i(2)], vec![i(5)]]),
    )]);
    let mut processor = Processor::new(&session);

    // DECLARE FUNCTION twice(@x): RETURN @x * 2.
    let decl = Statement::new(StatementKind::FunctionDeclaration(FunctionDeclaration {
        name: Identifier::new("twice"),
        parameters: vec![Variable::new("x")],
        statements: vec![Statement::new(StatementKind::Return(Some(Expr::new(
            ExprKind::Arithmetic {
                lhs: Box::new(Expr::new(ExprKind::Variable(Variable::new("x")))),
                op: ArithmeticOperator::Multiply,
                rhs: Box::new(Expr::integer(2)),
            },
        ))))],
    }));
    processor.execute(&[decl]).unwrap();

    let q = query(entity_from(
        vec![Field::new(Expr::new(ExprKind::Function {
            name: "twice".into(),
            args: vec![Expr::field("a")],
        }))],
        "t",
    ));
    let view = processor.select(&q).unwrap();
    assert_eq!(column_values(&view, 0), vec![i(4), i(10)]);

    // Builtins cannot be shadowed.
    let err = processor
        .execute(&[Statement::new(StatementKind::FunctionDeclaration(FunctionDeclaration {
            name: Identifier::new("upper"),
            parameters: vec![],
            statements: vec![],
        }))])
        .unwrap_err();
    assert!(matches!(err, QueryError::RedeclaredFunction { .. }));
}

#[test]
fn user_aggregate_iterates_its_pseudo_cursor() {
    let session = session_with(vec![(
        "t",
        table("t", &["a"], vec![vec![i(10)], vec![i(20)], vec![i(30)]]),
    )]);
    let mut processor = Processor::new(&session);

    // DECLARE AGGREGATE second(list): fetch twice, return the second row.
    let fetch_into = |var: &str| {
        Statement::new(StatementKind::FetchCursor {
            cursor: Identifier::new("list"),
            position: FetchPosition::default(),
            variables: vec![Variable::new(var)],
        })
    };
    let decl = Statement::new(StatementKind::AggregateDeclaration(AggregateDeclaration {
        name: Identifier::new("second"),
        cursor: Identifier::new("list"),
        parameters: vec![],
        statements: vec![
            Statement::new(StatementKind::VariableDeclaration {
                assignments: vec![VariableAssignment {
                    variable: Variable::new("v"),
                    value: None,
                }],
            }),
            fetch_into("v"),
            fetch_into("v"),
            Statement::new(StatementKind::Return(Some(Expr::new(ExprKind::Variable(
                Variable::new("v"),
            ))))),
        ],
    }));
    processor.execute(&[decl]).unwrap();

    let q = query(entity_from(
        vec![Field::new(Expr::new(ExprKind::Function {
            name: "second".into(),
            args: vec![Expr::field("a")],
        }))],
        "t",
    ));
    let view = processor.select(&q).unwrap();
    assert_eq!(view.record_len(), 1);
    assert_eq!(view.records[0].values(), vec![i(20)]);
}

// --- DML and transactions ------------------------------------------------

#[test]
fn dml_updates_shadow_until_commit() {
    let session = session_with(vec![(
        "t",
        table("t", &["a", "b"], vec![vec![i(1), s("x")], vec![i(2), s("y")]]),
    )]);
    let mut processor = Processor::new(&session);

    let program = vec![
        Statement::new(StatementKind::Insert(InsertQuery {
            table: Identifier::new("t"),
            columns: vec![Identifier::new("a")],
            values: vec![vec![Expr::integer(3)]],
            query: None,
        })),
        Statement::new(StatementKind::Update(UpdateQuery {
            table: Identifier::new("t"),
            set_list: vec![UpdateSet { column: Identifier::new("b"), value: Expr::string("z") }],
            filter: Some(cmp(Expr::field("a"), ComparisonOperator::Equal, Expr::integer(1))),
        })),
        Statement::new(StatementKind::Delete(DeleteQuery {
            table: Identifier::new("t"),
            filter: Some(cmp(Expr::field("a"), ComparisonOperator::Equal, Expr::integer(2))),
        })),
    ];
    processor.execute(&program).unwrap();

    let q = query(entity_from(
        vec![Field::new(Expr::field("a")), Field::new(Expr::field("b"))],
        "t",
    ));
    let view = processor.select(&q).unwrap();
    assert_eq!(view.record_len(), 2);
    assert_eq!(view.records[0].values(), vec![i(1), s("z")]);
    assert_eq!(view.records[1].values(), vec![i(3), null()]);

    // Nothing published yet; commit hands the view to the writer.
    assert!(session.take_committed().is_empty());
    processor
        .execute(&[Statement::new(StatementKind::TransactionControl(TransactionOp::Commit))])
        .unwrap();
    let committed = session.take_committed();
    assert_eq!(committed.len(), 1);
    assert_eq!(committed[0].0, "T");
}

#[test]
fn rollback_discards_pending_updates() {
    let session = session_with(vec![("t", table("t", &["a"], vec![vec![i(1)]]))]);
    let mut processor = Processor::new(&session);
    processor
        .execute(&[Statement::new(StatementKind::Delete(DeleteQuery {
            table: Identifier::new("t"),
            filter: None,
        }))])
        .unwrap();
    let q = query(entity_from(vec![Field::new(Expr::field("a"))], "t"));
    assert_eq!(processor.select(&q).unwrap().record_len(), 0);

    processor
        .execute(&[Statement::new(StatementKind::TransactionControl(TransactionOp::Rollback))])
        .unwrap();
    assert_eq!(processor.select(&q).unwrap().record_len(), 1);
}

#[test]
fn temporary_tables_take_dml_without_touching_the_session() {
    let session = session_with(vec![]);
    let mut processor = Processor::new(&session);

    let program = vec![
        Statement::new(StatementKind::TableDeclaration(TableDeclaration {
            table: Identifier::new("work"),
            columns: vec![Identifier::new("n")],
            query: None,
        })),
        Statement::new(StatementKind::Insert(InsertQuery {
            table: Identifier::new("work"),
            columns: vec![],
            values: vec![vec![Expr::integer(1)], vec![Expr::integer(2)]],
            query: None,
        })),
    ];
    processor.execute(&program).unwrap();

    let q = query(entity_from(vec![Field::new(Expr::field("n"))], "work"));
    assert_eq!(processor.select(&q).unwrap().record_len(), 2);
    processor
        .execute(&[Statement::new(StatementKind::DisposeTable(Identifier::new("work")))])
        .unwrap();
    assert!(matches!(
        processor.select(&q),
        Err(QueryError::TableNotFound { .. })
    ));
}

#[test]
fn cancellation_stops_statement_execution() {
    let session = session_with(vec![("t", t_ab())]);
    let mut processor = Processor::new(&session);
    processor.cancel.cancel();
    let q = query(entity_from(vec![Field::new(Expr::field("a"))], "t"));
    assert_eq!(processor.select(&q), Err(QueryError::Cancelled));
}

#[test]
fn select_statements_land_in_the_sink() {
    let session = session_with(vec![("t", t_ab())]);
    let mut processor = Processor::new(&session);
    let q = query(entity_from(vec![Field::new(Expr::field("a"))], "t"));
    processor.execute(&[select_stmt(q)]).unwrap();
    let views = processor.take_views();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].record_len(), 3);
}
