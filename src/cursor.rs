use parking_lot::Mutex;

use crate::ast::{CursorDeclaration, FetchPositionType, HasLocation, Identifier, SelectQuery};
use crate::error::QueryError;
use crate::executor::select;
use crate::scope::Scope;
use crate::session::ExecContext;
use crate::value::{Primary, Ternary};
use crate::view::{Header, Record, View};

enum CursorSource {
    /// A query executed at OPEN.
    Query(SelectQuery),
    /// A named prepared statement resolved at OPEN.
    Statement(Identifier),
    /// A fixed value list, already materialized.
    Pseudo,
}

struct CursorState {
    view: Option<View>,
    index: i64,
    fetched: bool,
}

/// A named, stateful position over a materialized view. The mutable state
/// sits behind a mutex: user-defined aggregates iterate cursors from
/// worker contexts.
pub struct Cursor {
    name: String,
    source: CursorSource,
    state: Mutex<CursorState>,
}

impl Cursor {
    pub fn from_declaration(decl: &CursorDeclaration) -> Self {
        let source = match (&decl.query, &decl.statement) {
            (Some(query), _) => CursorSource::Query(query.clone()),
            (None, Some(statement)) => CursorSource::Statement(statement.clone()),
            (None, None) => CursorSource::Pseudo,
        };
        Self {
            name: decl.cursor.literal.clone(),
            source,
            state: Mutex::new(CursorState { view: None, index: -1, fetched: false }),
        }
    }

    /// A pseudo cursor over a value list, presented as the single-column
    /// view `c1`. Created open; OPEN, CLOSE and DISPOSE reject it.
    pub fn pseudo(name: &str, values: Vec<Primary>) -> Self {
        let mut view = View::new(Header::new("", &["c1"]));
        view.records = values.into_iter().map(|v| Record::from_values(vec![v])).collect();
        Self {
            name: name.to_string(),
            source: CursorSource::Pseudo,
            state: Mutex::new(CursorState { view: Some(view), index: -1, fetched: false }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_pseudo(&self) -> bool {
        matches!(self.source, CursorSource::Pseudo)
    }

    pub fn open(
        &self,
        ctx: &ExecContext,
        scope: &mut Scope,
        name: &Identifier,
        replace_values: Vec<Primary>,
    ) -> Result<(), QueryError> {
        if self.is_pseudo() {
            return Err(pseudo_cursor(name));
        }

        let mut state = self.state.lock();
        if state.view.is_some() {
            return Err(QueryError::CursorAlreadyOpen {
                loc: name.location().clone(),
                name: name.literal.clone(),
            });
        }

        let query = match &self.source {
            CursorSource::Query(query) => query.clone(),
            CursorSource::Statement(statement) => ctx.session.prepared_query(statement)?,
            CursorSource::Pseudo => unreachable!(),
        };
        let ctx = if replace_values.is_empty() {
            ctx.clone()
        } else {
            ctx.with_replace_values(replace_values)
        };
        let view = select::select(&ctx, scope, &query)?;

        state.view = Some(view);
        state.index = -1;
        state.fetched = false;
        Ok(())
    }

    pub fn close(&self, name: &Identifier) -> Result<(), QueryError> {
        if self.is_pseudo() {
            return Err(pseudo_cursor(name));
        }
        let mut state = self.state.lock();
        state.view = None;
        state.index = 0;
        state.fetched = false;
        Ok(())
    }

    /// Repositions and reads one row. `None` means the cursor moved past
    /// either end; the index clamps to -1 or the record count.
    pub fn fetch(
        &self,
        name: &Identifier,
        position: FetchPositionType,
        number: i64,
    ) -> Result<Option<Vec<Primary>>, QueryError> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let view = match state.view.as_ref() {
            Some(view) => view,
            None => return Err(cursor_closed(name)),
        };
        let record_len = view.record_len() as i64;

        state.fetched = true;
        state.index = match position {
            FetchPositionType::Absolute => number,
            FetchPositionType::Relative => state.index + number,
            FetchPositionType::First => 0,
            FetchPositionType::Last => record_len - 1,
            FetchPositionType::Prior => state.index - 1,
            FetchPositionType::Next => state.index + 1,
        };

        if state.index < 0 {
            state.index = -1;
            return Ok(None);
        }
        if state.index >= record_len {
            state.index = record_len;
            return Ok(None);
        }

        Ok(Some(view.records[state.index as usize].values()))
    }

    pub fn is_open(&self) -> Ternary {
        Ternary::parse_bool(self.state.lock().view.is_some())
    }

    /// UNKNOWN before the first fetch, then whether the index sits on a
    /// row.
    pub fn is_in_range(&self, name: &Identifier) -> Result<Ternary, QueryError> {
        let state = self.state.lock();
        let view = match &state.view {
            Some(view) => view,
            None => return Err(cursor_closed(name)),
        };
        if !state.fetched {
            return Ok(Ternary::Unknown);
        }
        Ok(Ternary::parse_bool(state.index > -1 && state.index < view.record_len() as i64))
    }

    pub fn count(&self, name: &Identifier) -> Result<i64, QueryError> {
        let state = self.state.lock();
        match &state.view {
            Some(view) => Ok(view.record_len() as i64),
            None => Err(cursor_closed(name)),
        }
    }

    pub fn pointer(&self) -> i64 {
        self.state.lock().index
    }
}

fn pseudo_cursor(name: &Identifier) -> QueryError {
    QueryError::PseudoCursor { loc: name.location().clone(), name: name.literal.clone() }
}

fn cursor_closed(name: &Identifier) -> QueryError {
    QueryError::CursorClosed { loc: name.location().clone(), name: name.literal.clone() }
}
