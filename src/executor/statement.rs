use crate::ast::{
    AggregateDeclaration, CaseStatement, DeleteQuery, FetchPosition, FunctionDeclaration,
    HasLocation, Identifier, IfStatement, InsertQuery, Location, Statement, StatementKind,
    TableDeclaration, TransactionOp, UpdateQuery, Variable,
};
use crate::error::QueryError;
use crate::executor::aggregators_helper::AggregateRegistry;
use crate::executor::eval::{eval, eval_ternary, RowContext};
use crate::executor::functions::FunctionRegistry;
use crate::executor::select;
use crate::scope::{Scope, UserFunction};
use crate::session::{CancelToken, ExecContext, Session, Sink};
use crate::value::{self, Primary, Ternary};
use crate::view::{Cell, Header, HeaderField, Record, View};

/// How a statement list ended: normally, or through a flow-control
/// statement the enclosing construct must honor.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    Continue,
    Break,
    Exit,
    Return(Primary),
}

/// Drives a statement program against a session. Owns the scope stack
/// and the output sink; each statement gets a fresh execution context so
/// the frozen clock is read at statement start.
pub struct Processor<'a> {
    session: &'a Session,
    pub cancel: CancelToken,
    pub scope: Scope,
    sink: Sink,
}

impl<'a> Processor<'a> {
    pub fn new(session: &'a Session) -> Self {
        Self {
            session,
            cancel: CancelToken::new(),
            scope: Scope::new(),
            sink: Sink::default(),
        }
    }

    fn ctx(&self) -> ExecContext<'a> {
        ExecContext::new(self.session, self.cancel.clone()).with_sink(self.sink.clone())
    }

    pub fn execute(&mut self, statements: &[Statement]) -> Result<Flow, QueryError> {
        let ctx = self.ctx();
        execute_statements(&ctx, &mut self.scope, statements)
    }

    /// Runs a single query and returns its view directly.
    pub fn select(&mut self, query: &crate::ast::SelectQuery) -> Result<View, QueryError> {
        let ctx = self.ctx();
        select::select(&ctx, &mut self.scope, query)
    }

    pub fn logs(&self) -> Vec<String> {
        self.sink.logs()
    }

    pub fn take_views(&self) -> Vec<View> {
        self.sink.take_views()
    }
}

pub fn execute_statements(
    ctx: &ExecContext,
    scope: &mut Scope,
    statements: &[Statement],
) -> Result<Flow, QueryError> {
    for statement in statements {
        ctx.check_cancelled()?;
        match execute_statement(ctx, scope, statement)? {
            Flow::Normal => {}
            flow => return Ok(flow),
        }
    }
    Ok(Flow::Normal)
}

pub fn execute_statement(
    ctx: &ExecContext,
    scope: &mut Scope,
    statement: &Statement,
) -> Result<Flow, QueryError> {
    match &statement.kind {
        StatementKind::Select(query) => {
            let view = select::select(ctx, scope, query)?;
            ctx.sink.push_view(view);
            Ok(Flow::Normal)
        }

        StatementKind::Insert(query) => insert(ctx, scope, query),
        StatementKind::Update(query) => update(ctx, scope, query),
        StatementKind::Delete(query) => delete(ctx, scope, query),

        StatementKind::VariableDeclaration { assignments } => {
            for assignment in assignments {
                let value = match &assignment.value {
                    Some(expr) => eval(ctx, scope, None, expr)?,
                    None => Primary::Null,
                };
                scope.declare_variable(&assignment.variable, value)?;
            }
            Ok(Flow::Normal)
        }
        StatementKind::VariableSubstitution { variable, value } => {
            let value = eval(ctx, scope, None, value)?;
            scope.substitute_variable(variable, value)?;
            Ok(Flow::Normal)
        }
        StatementKind::DisposeVariable(variable) => {
            scope.dispose_variable(variable)?;
            Ok(Flow::Normal)
        }

        StatementKind::CursorDeclaration(decl) => {
            scope.declare_cursor(decl)?;
            Ok(Flow::Normal)
        }
        StatementKind::OpenCursor { cursor, values } => {
            let mut replace_values = Vec::with_capacity(values.len());
            for expr in values {
                replace_values.push(eval(ctx, scope, None, expr)?);
            }
            let cur = scope.cursor(cursor)?;
            cur.open(ctx, scope, cursor, replace_values)?;
            Ok(Flow::Normal)
        }
        StatementKind::CloseCursor(cursor) => {
            scope.cursor(cursor)?.close(cursor)?;
            Ok(Flow::Normal)
        }
        StatementKind::DisposeCursor(cursor) => {
            scope.dispose_cursor(cursor)?;
            Ok(Flow::Normal)
        }
        StatementKind::FetchCursor { cursor, position, variables } => {
            let cur = scope.cursor(cursor)?;
            let number = fetch_number(ctx, scope, position)?;
            if let Some(values) = cur.fetch(cursor, position.position, number)? {
                assign_fetched(scope, cursor, variables, values)?;
            }
            Ok(Flow::Normal)
        }

        StatementKind::TableDeclaration(decl) => {
            declare_table(ctx, scope, decl)?;
            Ok(Flow::Normal)
        }
        StatementKind::DisposeTable(table) => {
            scope.dispose_temp_table(table)?;
            Ok(Flow::Normal)
        }

        StatementKind::FunctionDeclaration(decl) => {
            check_function_name(&decl.name)?;
            scope.declare_function(UserFunction::Scalar(decl.clone()))?;
            Ok(Flow::Normal)
        }
        StatementKind::AggregateDeclaration(decl) => {
            check_function_name(&decl.name)?;
            scope.declare_function(UserFunction::Aggregate(decl.clone()))?;
            Ok(Flow::Normal)
        }
        StatementKind::Prepare { name, query } => {
            ctx.session.prepare(name, query.clone())?;
            Ok(Flow::Normal)
        }

        StatementKind::If(stmt) => execute_if(ctx, scope, stmt),
        StatementKind::Case(stmt) => execute_case(ctx, scope, stmt),

        StatementKind::While { condition, statements } => loop {
            ctx.check_cancelled()?;
            if eval_ternary(ctx, scope, None, condition)? != Ternary::True {
                return Ok(Flow::Normal);
            }
            match execute_statements(ctx, scope, statements)? {
                Flow::Normal | Flow::Continue => {}
                Flow::Break => return Ok(Flow::Normal),
                flow => return Ok(flow),
            }
        },
        StatementKind::WhileInCursor { variables, cursor, statements } => loop {
            ctx.check_cancelled()?;
            let cur = scope.cursor(cursor)?;
            let values =
                match cur.fetch(cursor, crate::ast::FetchPositionType::Next, 0)? {
                    Some(values) => values,
                    None => return Ok(Flow::Normal),
                };
            assign_fetched(scope, cursor, variables, values)?;
            match execute_statements(ctx, scope, statements)? {
                Flow::Normal | Flow::Continue => {}
                Flow::Break => return Ok(Flow::Normal),
                flow => return Ok(flow),
            }
        },

        StatementKind::Continue => Ok(Flow::Continue),
        StatementKind::Break => Ok(Flow::Break),
        StatementKind::Exit => Ok(Flow::Exit),
        StatementKind::Return(value) => {
            let value = match value {
                Some(expr) => eval(ctx, scope, None, expr)?,
                None => Primary::Null,
            };
            Ok(Flow::Return(value))
        }

        StatementKind::Print(expr) => {
            let value = eval(ctx, scope, None, expr)?;
            ctx.sink.log(value.to_string());
            Ok(Flow::Normal)
        }
        StatementKind::Printf { format, values } => {
            let mut args = Vec::with_capacity(values.len());
            for expr in values {
                args.push(eval(ctx, scope, None, expr)?);
            }
            ctx.sink.log(format_printf(format, &args));
            Ok(Flow::Normal)
        }

        StatementKind::TransactionControl(op) => {
            match op {
                TransactionOp::Commit => ctx.session.commit(),
                TransactionOp::Rollback => ctx.session.rollback(),
            }
            Ok(Flow::Normal)
        }
        StatementKind::Trigger { message, code } => {
            let message = match message {
                Some(expr) => {
                    let v = eval(ctx, scope, None, expr)?;
                    v.to_text().unwrap_or_else(|| v.to_string())
                }
                None => String::new(),
            };
            Err(QueryError::UserTriggered {
                loc: statement.loc.clone(),
                code: code.unwrap_or(1),
                message,
            })
        }
    }
}

fn execute_if(ctx: &ExecContext, scope: &mut Scope, stmt: &IfStatement) -> Result<Flow, QueryError> {
    if eval_ternary(ctx, scope, None, &stmt.condition)? == Ternary::True {
        return execute_statements(ctx, scope, &stmt.statements);
    }
    for elseif in &stmt.elseif {
        if eval_ternary(ctx, scope, None, &elseif.condition)? == Ternary::True {
            return execute_statements(ctx, scope, &elseif.statements);
        }
    }
    match &stmt.else_statements {
        Some(statements) => execute_statements(ctx, scope, statements),
        None => Ok(Flow::Normal),
    }
}

fn execute_case(
    ctx: &ExecContext,
    scope: &mut Scope,
    stmt: &CaseStatement,
) -> Result<Flow, QueryError> {
    let base = match &stmt.value {
        Some(expr) => Some(eval(ctx, scope, None, expr)?),
        None => None,
    };
    for when in &stmt.when {
        let matched = match &base {
            Some(base) => {
                let cond = eval(ctx, scope, None, &when.condition)?;
                value::equal_to(base, &cond) == Ternary::True
            }
            None => eval_ternary(ctx, scope, None, &when.condition)? == Ternary::True,
        };
        if matched {
            return execute_statements(ctx, scope, &when.statements);
        }
    }
    match &stmt.else_statements {
        Some(statements) => execute_statements(ctx, scope, statements),
        None => Ok(Flow::Normal),
    }
}

fn fetch_number(
    ctx: &ExecContext,
    scope: &mut Scope,
    position: &FetchPosition,
) -> Result<i64, QueryError> {
    match &position.number {
        Some(expr) => {
            let value = eval(ctx, scope, None, expr)?;
            value.to_integer().ok_or_else(|| QueryError::InvalidFetchPosition {
                loc: expr.loc.clone(),
                value: value.to_string(),
            })
        }
        None => Ok(0),
    }
}

fn assign_fetched(
    scope: &mut Scope,
    cursor: &Identifier,
    variables: &[Variable],
    values: Vec<Primary>,
) -> Result<(), QueryError> {
    if variables.len() != values.len() {
        return Err(QueryError::FetchFieldMismatch {
            loc: cursor.location().clone(),
            fields: values.len(),
            variables: variables.len(),
        });
    }
    for (variable, value) in variables.iter().zip(values) {
        scope.substitute_variable(variable, value)?;
    }
    Ok(())
}

fn check_function_name(name: &Identifier) -> Result<(), QueryError> {
    if FunctionRegistry::global().contains(&name.literal)
        || AggregateRegistry::global().contains(&name.literal)
    {
        return Err(QueryError::RedeclaredFunction {
            loc: name.location().clone(),
            name: name.literal.clone(),
        });
    }
    Ok(())
}

fn declare_table(
    ctx: &ExecContext,
    scope: &mut Scope,
    decl: &TableDeclaration,
) -> Result<(), QueryError> {
    let view = match &decl.query {
        Some(query) => {
            let view = select::select(ctx, scope, query)?;
            if !decl.columns.is_empty() && decl.columns.len() != view.field_len() {
                return Err(QueryError::InlineTableFieldMismatch {
                    loc: decl.table.location().clone(),
                    name: decl.table.literal.clone(),
                    defined: decl.columns.len(),
                    actual: view.field_len(),
                });
            }
            reshape(view, &decl.table.literal, &decl.columns)
        }
        None => {
            let columns: Vec<&str> = decl.columns.iter().map(|c| c.literal.as_str()).collect();
            View::new(Header::new(&decl.table.literal, &columns))
        }
    };
    scope.declare_temp_table(&decl.table, view)
}

fn reshape(mut view: View, table: &str, columns: &[Identifier]) -> View {
    let mut fields = Vec::with_capacity(view.field_len());
    for (i, field) in view.header.fields().iter().enumerate() {
        let column = match columns.get(i) {
            Some(name) => name.literal.clone(),
            None => field.column.clone(),
        };
        fields.push(HeaderField { view: table.to_string(), column, from_table: true });
    }
    view.header = Header::from_fields(fields);
    view
}

// ---- user declarations -----------------------------------------------

pub(crate) fn call_user_scalar(
    ctx: &ExecContext,
    scope: &mut Scope,
    decl: &FunctionDeclaration,
    args: Vec<Primary>,
    loc: &Location,
) -> Result<Primary, QueryError> {
    if args.len() != decl.parameters.len() {
        return Err(QueryError::FunctionArity {
            loc: loc.clone(),
            name: decl.name.literal.clone(),
            expected: format!("{} arguments", decl.parameters.len()),
            got: args.len(),
        });
    }
    scope.push();
    let result = (|| {
        for (parameter, value) in decl.parameters.iter().zip(args) {
            scope.declare_variable(parameter, value)?;
        }
        execute_statements(ctx, scope, &decl.statements)
    })();
    scope.pop();
    match result? {
        Flow::Return(value) => Ok(value),
        _ => Ok(Primary::Null),
    }
}

/// A user aggregate runs its body with the group's values bound to the
/// declared cursor as a pseudo cursor; extra arguments bind to the
/// declared parameters.
pub(crate) fn call_user_aggregate(
    ctx: &ExecContext,
    scope: &mut Scope,
    decl: &AggregateDeclaration,
    values: Vec<Primary>,
    args: Vec<Primary>,
    loc: &Location,
) -> Result<Primary, QueryError> {
    if args.len() != decl.parameters.len() {
        return Err(QueryError::FunctionArity {
            loc: loc.clone(),
            name: decl.name.literal.clone(),
            expected: format!("{} arguments", decl.parameters.len() + 1),
            got: args.len() + 1,
        });
    }
    scope.push();
    let result = (|| {
        scope.add_pseudo_cursor(&decl.cursor, values)?;
        for (parameter, value) in decl.parameters.iter().zip(args) {
            scope.declare_variable(parameter, value)?;
        }
        execute_statements(ctx, scope, &decl.statements)
    })();
    scope.pop();
    match result? {
        Flow::Return(value) => Ok(value),
        _ => Ok(Primary::Null),
    }
}

// ---- DML -------------------------------------------------------------

fn target_view(
    ctx: &ExecContext,
    scope: &mut Scope,
    table: &Identifier,
) -> Result<(View, bool), QueryError> {
    if let Some(view) = scope.temp_table(&table.literal) {
        return Ok(((*view).clone(), true));
    }
    Ok(((*ctx.session.load_table(table)?).clone(), false))
}

fn store_target(
    ctx: &ExecContext,
    scope: &mut Scope,
    table: &Identifier,
    view: View,
    is_temp: bool,
) {
    if is_temp {
        scope.update_temp_table(&table.literal, view);
    } else {
        ctx.session.record_update(&table.literal, view);
    }
}

fn insert(ctx: &ExecContext, scope: &mut Scope, query: &InsertQuery) -> Result<Flow, QueryError> {
    let (mut view, is_temp) = target_view(ctx, scope, &query.table)?;

    let indexes: Vec<usize> = if query.columns.is_empty() {
        (0..view.field_len()).collect()
    } else {
        let mut indexes = Vec::with_capacity(query.columns.len());
        for column in &query.columns {
            let index = view.header.search(None, &column.literal).map_err(|_| {
                QueryError::FieldNotExist {
                    loc: column.location().clone(),
                    field: column.literal.clone(),
                }
            })?;
            indexes.push(index);
        }
        indexes
    };

    let mut rows: Vec<Vec<Primary>> = Vec::new();
    if let Some(source) = &query.query {
        let source = select::select(ctx, scope, source)?;
        if source.field_len() != indexes.len() {
            return Err(QueryError::InsertFieldMismatch {
                loc: query.table.location().clone(),
                expected: indexes.len(),
                got: source.field_len(),
            });
        }
        rows.extend(source.records.iter().map(Record::values));
    } else {
        for value_row in &query.values {
            if value_row.len() != indexes.len() {
                return Err(QueryError::InsertFieldMismatch {
                    loc: query.table.location().clone(),
                    expected: indexes.len(),
                    got: value_row.len(),
                });
            }
            let mut row = Vec::with_capacity(value_row.len());
            for expr in value_row {
                row.push(eval(ctx, scope, None, expr)?);
            }
            rows.push(row);
        }
    }

    for row in rows {
        ctx.check_cancelled()?;
        let mut cells = vec![Cell::new(Primary::Null); view.field_len()];
        for (&index, value) in indexes.iter().zip(row) {
            cells[index] = Cell::new(value);
        }
        view.records.push(Record(cells));
    }

    store_target(ctx, scope, &query.table, view, is_temp);
    Ok(Flow::Normal)
}

fn update(ctx: &ExecContext, scope: &mut Scope, query: &UpdateQuery) -> Result<Flow, QueryError> {
    let (mut view, is_temp) = target_view(ctx, scope, &query.table)?;

    let mut set_indexes = Vec::with_capacity(query.set_list.len());
    for set in &query.set_list {
        let index = view.header.search(None, &set.column.literal).map_err(|_| {
            QueryError::FieldNotExist {
                loc: set.column.location().clone(),
                field: set.column.literal.clone(),
            }
        })?;
        set_indexes.push(index);
    }

    let mut changes: Vec<(usize, Vec<Primary>)> = Vec::new();
    for i in 0..view.record_len() {
        ctx.check_cancelled()?;
        let row = RowContext::new(&view, i);
        let hit = match &query.filter {
            Some(filter) => eval_ternary(ctx, scope, Some(&row), filter)? == Ternary::True,
            None => true,
        };
        if !hit {
            continue;
        }
        let mut values = Vec::with_capacity(query.set_list.len());
        for set in &query.set_list {
            values.push(eval(ctx, scope, Some(&row), &set.value)?);
        }
        changes.push((i, values));
    }

    for (i, values) in changes {
        for (&index, value) in set_indexes.iter().zip(values) {
            view.records[i].0[index] = Cell::new(value);
        }
    }

    store_target(ctx, scope, &query.table, view, is_temp);
    Ok(Flow::Normal)
}

fn delete(ctx: &ExecContext, scope: &mut Scope, query: &DeleteQuery) -> Result<Flow, QueryError> {
    let (mut view, is_temp) = target_view(ctx, scope, &query.table)?;

    let mut keep = Vec::with_capacity(view.record_len());
    for i in 0..view.record_len() {
        ctx.check_cancelled()?;
        let hit = match &query.filter {
            Some(filter) => {
                eval_ternary(ctx, scope, Some(&RowContext::new(&view, i)), filter)?
                    == Ternary::True
            }
            None => true,
        };
        keep.push(!hit);
    }
    let records = std::mem::take(&mut view.records);
    view.records = records.into_iter().zip(keep).filter_map(|(r, k)| k.then_some(r)).collect();

    store_target(ctx, scope, &query.table, view, is_temp);
    Ok(Flow::Normal)
}

/// `%s` consumes the next value's text form; `%%` is a literal percent;
/// anything else after a percent stays as written.
fn format_printf(format: &str, values: &[Primary]) -> String {
    let mut out = String::with_capacity(format.len());
    let mut args = values.iter();
    let mut chars = format.chars();
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('s') => match args.next() {
                Some(value) => match value.to_text() {
                    Some(s) => out.push_str(&s),
                    None => out.push_str(&value.to_string()),
                },
                None => out.push_str("%s"),
            },
            Some('%') => out.push('%'),
            Some(other) => {
                out.push('%');
                out.push(other);
            }
            None => out.push('%'),
        }
    }
    out
}
