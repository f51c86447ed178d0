use std::sync::Arc;

use indexmap::IndexMap;

use crate::ast::{
    AggregateDeclaration, CursorDeclaration, FunctionDeclaration, HasLocation, Identifier,
    Variable,
};
use crate::cursor::Cursor;
use crate::error::QueryError;
use crate::value::Primary;
use crate::view::View;

/// A user declaration callable from expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum UserFunction {
    Scalar(FunctionDeclaration),
    Aggregate(AggregateDeclaration),
}

/// One lexical frame. Every namespace is keyed case-insensitively by
/// storing uppercase names; insertion order is kept for diagnostics.
#[derive(Default)]
struct ScopeFrame {
    variables: IndexMap<String, Primary>,
    cursors: IndexMap<String, Arc<Cursor>>,
    inline_tables: IndexMap<String, Arc<View>>,
    temp_tables: IndexMap<String, Arc<View>>,
    functions: IndexMap<String, Arc<UserFunction>>,
}

/// The scope stack. Reads walk from the innermost frame outward;
/// declarations land in the innermost frame.
pub struct Scope {
    frames: Vec<ScopeFrame>,
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

fn key(name: &str) -> String {
    name.to_uppercase()
}

impl Scope {
    pub fn new() -> Self {
        Self { frames: vec![ScopeFrame::default()] }
    }

    pub fn push(&mut self) {
        self.frames.push(ScopeFrame::default());
    }

    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    // The stack always holds the root frame.
    fn innermost(&mut self) -> &mut ScopeFrame {
        self.frames.last_mut().expect("scope has a root frame")
    }

    // ---- variables ----------------------------------------------------

    pub fn declare_variable(&mut self, var: &Variable, value: Primary) -> Result<(), QueryError> {
        let k = key(&var.name);
        let frame = self.innermost();
        if frame.variables.contains_key(&k) {
            return Err(QueryError::RedeclaredVariable {
                loc: var.location().clone(),
                name: var.name.clone(),
            });
        }
        frame.variables.insert(k, value);
        Ok(())
    }

    pub fn substitute_variable(
        &mut self,
        var: &Variable,
        value: Primary,
    ) -> Result<(), QueryError> {
        let k = key(&var.name);
        for frame in self.frames.iter_mut().rev() {
            if let Some(slot) = frame.variables.get_mut(&k) {
                *slot = value;
                return Ok(());
            }
        }
        Err(QueryError::UndeclaredVariable {
            loc: var.location().clone(),
            name: var.name.clone(),
        })
    }

    pub fn variable_value(&self, var: &Variable) -> Result<Primary, QueryError> {
        let k = key(&var.name);
        for frame in self.frames.iter().rev() {
            if let Some(value) = frame.variables.get(&k) {
                return Ok(value.clone());
            }
        }
        Err(QueryError::UndeclaredVariable {
            loc: var.location().clone(),
            name: var.name.clone(),
        })
    }

    pub fn dispose_variable(&mut self, var: &Variable) -> Result<(), QueryError> {
        let k = key(&var.name);
        for frame in self.frames.iter_mut().rev() {
            if frame.variables.shift_remove(&k).is_some() {
                return Ok(());
            }
        }
        Err(QueryError::UndeclaredVariable {
            loc: var.location().clone(),
            name: var.name.clone(),
        })
    }

    // ---- cursors ------------------------------------------------------

    pub fn declare_cursor(&mut self, decl: &CursorDeclaration) -> Result<(), QueryError> {
        let k = key(&decl.cursor.literal);
        let frame = self.innermost();
        if frame.cursors.contains_key(&k) {
            return Err(QueryError::RedeclaredCursor {
                loc: decl.cursor.location().clone(),
                name: decl.cursor.literal.clone(),
            });
        }
        frame.cursors.insert(k, Arc::new(Cursor::from_declaration(decl)));
        Ok(())
    }

    pub fn add_pseudo_cursor(
        &mut self,
        name: &Identifier,
        values: Vec<Primary>,
    ) -> Result<(), QueryError> {
        let k = key(&name.literal);
        let frame = self.innermost();
        if frame.cursors.contains_key(&k) {
            return Err(QueryError::RedeclaredCursor {
                loc: name.location().clone(),
                name: name.literal.clone(),
            });
        }
        frame.cursors.insert(k, Arc::new(Cursor::pseudo(&name.literal, values)));
        Ok(())
    }

    pub fn cursor(&self, name: &Identifier) -> Result<Arc<Cursor>, QueryError> {
        let k = key(&name.literal);
        for frame in self.frames.iter().rev() {
            if let Some(cursor) = frame.cursors.get(&k) {
                return Ok(Arc::clone(cursor));
            }
        }
        Err(QueryError::UndeclaredCursor {
            loc: name.location().clone(),
            name: name.literal.clone(),
        })
    }

    pub fn dispose_cursor(&mut self, name: &Identifier) -> Result<(), QueryError> {
        let k = key(&name.literal);
        for frame in self.frames.iter_mut().rev() {
            if let Some(cursor) = frame.cursors.get(&k) {
                if cursor.is_pseudo() {
                    return Err(QueryError::PseudoCursor {
                        loc: name.location().clone(),
                        name: name.literal.clone(),
                    });
                }
                frame.cursors.shift_remove(&k);
                return Ok(());
            }
        }
        Err(QueryError::UndeclaredCursor {
            loc: name.location().clone(),
            name: name.literal.clone(),
        })
    }

    // ---- inline tables (WITH) -----------------------------------------

    pub fn set_inline_table(
        &mut self,
        name: &Identifier,
        view: View,
    ) -> Result<(), QueryError> {
        let k = key(&name.literal);
        let frame = self.innermost();
        if frame.inline_tables.contains_key(&k) {
            return Err(QueryError::RedeclaredInlineTable {
                loc: name.location().clone(),
                name: name.literal.clone(),
            });
        }
        frame.inline_tables.insert(k, Arc::new(view));
        Ok(())
    }

    /// Overwrites an inline table binding; the recursive CTE loop rebinds
    /// its working table every round.
    pub fn replace_inline_table(&mut self, name: &Identifier, view: View) {
        let k = key(&name.literal);
        let frame = self.innermost();
        frame.inline_tables.insert(k, Arc::new(view));
    }

    pub fn inline_table(&self, name: &str) -> Option<Arc<View>> {
        let k = key(name);
        for frame in self.frames.iter().rev() {
            if let Some(view) = frame.inline_tables.get(&k) {
                return Some(Arc::clone(view));
            }
        }
        None
    }

    // ---- temporary tables ---------------------------------------------

    pub fn declare_temp_table(&mut self, name: &Identifier, view: View) -> Result<(), QueryError> {
        let k = key(&name.literal);
        let frame = self.innermost();
        if frame.temp_tables.contains_key(&k) {
            return Err(QueryError::RedeclaredTable {
                loc: name.location().clone(),
                name: name.literal.clone(),
            });
        }
        frame.temp_tables.insert(k, Arc::new(view));
        Ok(())
    }

    pub fn temp_table(&self, name: &str) -> Option<Arc<View>> {
        let k = key(name);
        for frame in self.frames.iter().rev() {
            if let Some(view) = frame.temp_tables.get(&k) {
                return Some(Arc::clone(view));
            }
        }
        None
    }

    /// Replaces the content of a declared temporary table wherever it
    /// lives on the stack; DML statements write through this.
    pub fn update_temp_table(&mut self, name: &str, view: View) -> bool {
        let k = key(name);
        for frame in self.frames.iter_mut().rev() {
            if frame.temp_tables.contains_key(&k) {
                frame.temp_tables.insert(k, Arc::new(view));
                return true;
            }
        }
        false
    }

    pub fn dispose_temp_table(&mut self, name: &Identifier) -> Result<(), QueryError> {
        let k = key(&name.literal);
        for frame in self.frames.iter_mut().rev() {
            if frame.temp_tables.shift_remove(&k).is_some() {
                return Ok(());
            }
        }
        Err(QueryError::TableNotFound {
            loc: name.location().clone(),
            name: name.literal.clone(),
        })
    }

    // ---- user functions -----------------------------------------------

    pub fn declare_function(&mut self, function: UserFunction) -> Result<(), QueryError> {
        let (loc, name) = match &function {
            UserFunction::Scalar(d) => (d.name.location().clone(), d.name.literal.clone()),
            UserFunction::Aggregate(d) => (d.name.location().clone(), d.name.literal.clone()),
        };
        let k = key(&name);
        let frame = self.innermost();
        if frame.functions.contains_key(&k) {
            return Err(QueryError::RedeclaredFunction { loc, name });
        }
        frame.functions.insert(k, Arc::new(function));
        Ok(())
    }

    pub fn function(&self, name: &str) -> Option<Arc<UserFunction>> {
        let k = key(name);
        for frame in self.frames.iter().rev() {
            if let Some(function) = frame.functions.get(&k) {
                return Some(Arc::clone(function));
            }
        }
        None
    }
}
