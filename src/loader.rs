use std::collections::HashMap;

use crate::ast::{HasLocation, Identifier, Location};
use crate::error::QueryError;
use crate::flags::Flags;
use crate::view::{Header, Record, View};

/// External source of tables. The engine resolves FROM identifiers through
/// one of these; the CSV/TSV readers implement it outside the core.
pub trait TableLoader: Send + Sync {
    /// Loads the table a bare identifier names. The returned view's
    /// columns must be qualified with the table's own name; the engine
    /// re-qualifies on aliasing.
    fn load(&self, name: &str, flags: &Flags) -> Result<View, QueryError>;
}

/// The single synthetic row queries without a FROM clause select against.
pub fn dual_view() -> View {
    let mut view = View::new(Header::default());
    view.records.push(Record::default());
    view
}

pub(crate) fn table_not_found(ident: &Identifier) -> QueryError {
    QueryError::TableNotFound {
        loc: ident.location().clone(),
        name: ident.literal.clone(),
    }
}

/// A loader over pre-registered in-memory views. The test suites and
/// embedding callers that already hold their data use this.
#[derive(Default)]
pub struct MemoryLoader {
    tables: HashMap<String, View>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, view: View) {
        self.tables.insert(name.to_uppercase(), view);
    }

    pub fn with_table(mut self, name: &str, view: View) -> Self {
        self.register(name, view);
        self
    }
}

impl TableLoader for MemoryLoader {
    fn load(&self, name: &str, _flags: &Flags) -> Result<View, QueryError> {
        self.tables.get(&name.to_uppercase()).cloned().ok_or(QueryError::TableNotFound {
            loc: Location::default(),
            name: name.to_string(),
        })
    }
}
