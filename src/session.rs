use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};

use crate::ast::{HasLocation, Identifier, SelectQuery};
use crate::error::QueryError;
use crate::flags;
use crate::flags::Flags;
use crate::loader::{self, TableLoader};
use crate::value::Primary;
use crate::view::View;

/// Cooperative cancellation. Long-running operations check it between
/// rows; the caller trips it from any thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-session state: configuration, the table source and its read-mostly
/// cache, prepared statements, and views produced by DML awaiting commit.
pub struct Session {
    pub flags: Flags,
    loader: Option<Arc<dyn TableLoader>>,
    cache: RwLock<IndexMap<String, Arc<View>>>,
    updated: Mutex<IndexMap<String, Arc<View>>>,
    committed: Mutex<Vec<(String, Arc<View>)>>,
    prepared: Mutex<IndexMap<String, SelectQuery>>,
    stdin: Mutex<Option<Arc<View>>>,
}

impl Session {
    pub fn new(flags: Flags) -> Self {
        flags::init_location(&flags.location);
        Self {
            flags,
            loader: None,
            cache: RwLock::new(IndexMap::new()),
            updated: Mutex::new(IndexMap::new()),
            committed: Mutex::new(Vec::new()),
            prepared: Mutex::new(IndexMap::new()),
            stdin: Mutex::new(None),
        }
    }

    pub fn with_loader(mut self, loader: Arc<dyn TableLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn set_stdin(&self, view: View) {
        *self.stdin.lock() = Some(Arc::new(view));
    }

    pub fn stdin_view(&self) -> Option<Arc<View>> {
        self.stdin.lock().clone()
    }

    /// Resolves a table identifier: uncommitted DML results first, then
    /// the cache, then the external loader. The cache lock is taken for
    /// writing only on first load.
    pub fn load_table(&self, ident: &Identifier) -> Result<Arc<View>, QueryError> {
        let key = ident.literal.to_uppercase();
        if let Some(view) = self.updated.lock().get(&key) {
            return Ok(Arc::clone(view));
        }
        if let Some(view) = self.cache.read().get(&key) {
            return Ok(Arc::clone(view));
        }

        let loader = self.loader.as_ref().ok_or_else(|| loader::table_not_found(ident))?;
        let view = loader.load(&ident.literal, &self.flags).map_err(|e| match e {
            QueryError::TableNotFound { .. } => loader::table_not_found(ident),
            other => other,
        })?;
        let view = Arc::new(view);
        self.cache.write().insert(key, Arc::clone(&view));
        Ok(view)
    }

    /// Whether an identifier currently resolves to a loaded or updated
    /// table without consulting the loader.
    pub fn is_loaded(&self, name: &str) -> bool {
        let key = name.to_uppercase();
        self.updated.lock().contains_key(&key) || self.cache.read().contains_key(&key)
    }

    /// Records a replacement view produced by a DML statement. Queries in
    /// the same transaction observe it immediately; files change at commit.
    pub fn record_update(&self, name: &str, view: View) {
        self.updated.lock().insert(name.to_uppercase(), Arc::new(view));
    }

    /// Publishes pending DML results: the cache starts serving them and
    /// the surrounding writer can collect them with `take_committed`.
    pub fn commit(&self) {
        let mut updated = self.updated.lock();
        let mut cache = self.cache.write();
        let mut committed = self.committed.lock();
        for (name, view) in updated.drain(..) {
            cache.insert(name.clone(), Arc::clone(&view));
            committed.push((name, view));
        }
    }

    /// Discards pending DML results; loaded views stay as read.
    pub fn rollback(&self) {
        self.updated.lock().clear();
    }

    pub fn take_committed(&self) -> Vec<(String, Arc<View>)> {
        std::mem::take(&mut *self.committed.lock())
    }

    pub fn prepare(&self, name: &Identifier, query: SelectQuery) -> Result<(), QueryError> {
        let mut prepared = self.prepared.lock();
        let key = name.literal.to_uppercase();
        if prepared.contains_key(&key) {
            return Err(QueryError::RedeclaredStatement {
                loc: name.location().clone(),
                name: name.literal.clone(),
            });
        }
        prepared.insert(key, query);
        Ok(())
    }

    pub fn prepared_query(&self, name: &Identifier) -> Result<SelectQuery, QueryError> {
        self.prepared.lock().get(&name.literal.to_uppercase()).cloned().ok_or_else(|| {
            QueryError::PreparedStatementNotFound {
                loc: name.location().clone(),
                name: name.literal.clone(),
            }
        })
    }
}

/// Shared output channel: PRINT lines and result views land here. Shared
/// by handle so statements inside user function bodies write to the same
/// place as top-level ones.
#[derive(Clone, Default)]
pub struct Sink(Arc<Mutex<SinkState>>);

#[derive(Default)]
struct SinkState {
    logs: Vec<String>,
    views: Vec<View>,
}

impl Sink {
    pub fn log(&self, line: impl Into<String>) {
        self.0.lock().logs.push(line.into());
    }

    pub fn push_view(&self, view: View) {
        self.0.lock().views.push(view);
    }

    pub fn logs(&self) -> Vec<String> {
        self.0.lock().logs.clone()
    }

    pub fn take_views(&self) -> Vec<View> {
        std::mem::take(&mut self.0.lock().views)
    }
}

/// Everything expression evaluation needs besides the scope: the session,
/// the cancellation token, the query-start clock, the output sink, and
/// replacement values when executing a prepared statement.
#[derive(Clone)]
pub struct ExecContext<'a> {
    pub session: &'a Session,
    pub cancel: CancelToken,
    pub now: DateTime<FixedOffset>,
    pub sink: Sink,
    pub replace_values: Option<Arc<Vec<Primary>>>,
}

impl<'a> ExecContext<'a> {
    pub fn new(session: &'a Session, cancel: CancelToken) -> Self {
        let now = session.flags.query_now();
        Self { session, cancel, now, sink: Sink::default(), replace_values: None }
    }

    pub fn with_sink(mut self, sink: Sink) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_replace_values(&self, values: Vec<Primary>) -> Self {
        let mut ctx = self.clone();
        ctx.replace_values = Some(Arc::new(values));
        ctx
    }

    pub fn check_cancelled(&self) -> Result<(), QueryError> {
        if self.cancel.is_cancelled() {
            Err(QueryError::Cancelled)
        } else {
            Ok(())
        }
    }
}
