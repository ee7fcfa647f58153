//! Lexically scoped name resolution.
//!
//! Tables live in an arena and refer to their enclosing table by index, so
//! leaving a scope never invalidates the table it was nested in.

use hashbrown::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolScope {
    Global,
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub scope: SymbolScope,
    pub index: usize,
}

#[derive(Debug, Clone, Default)]
struct Table {
    store: HashMap<String, Symbol>,
    num_definitions: usize,
    outer: Option<usize>,
}

/// Stack of nested symbol tables; the outermost one is global.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    tables: Vec<Table>,
    current: usize,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            tables: vec![Table::default()],
            current: 0,
        }
    }

    /// Binds `name` in the current scope to the next free index.
    ///
    /// Redefining a name rebinds it to a fresh index.
    pub fn define(&mut self, name: &str) -> Symbol {
        let scope = self.scope_kind();
        let table = &mut self.tables[self.current];
        let symbol = Symbol {
            name: name.to_string(),
            scope,
            index: table.num_definitions,
        };
        table.num_definitions += 1;
        table.store.insert(name.to_string(), symbol.clone());
        symbol
    }

    pub fn resolve(&self, name: &str) -> Option<&Symbol> {
        self.resolve_with_depth(name).map(|(symbol, _)| symbol)
    }

    /// Resolves `name` and reports how many scopes outward it was found
    /// (0 for the current scope).
    pub fn resolve_with_depth(&self, name: &str) -> Option<(&Symbol, usize)> {
        let mut table = Some(self.current);
        let mut depth = 0;
        while let Some(index) = table {
            let t = &self.tables[index];
            if let Some(symbol) = t.store.get(name) {
                return Some((symbol, depth));
            }
            table = t.outer;
            depth += 1;
        }
        None
    }

    /// Opens a scope nested in the current one.
    pub fn enter_scope(&mut self) {
        self.tables.push(Table {
            outer: Some(self.current),
            ..Table::default()
        });
        self.current = self.tables.len() - 1;
        debug!(depth = self.depth(), "enter symbol scope");
    }

    /// Closes the current scope and returns how many symbols it defined.
    ///
    /// Leaving the global scope is a no-op that still reports its count.
    pub fn leave_scope(&mut self) -> usize {
        let num_definitions = self.num_definitions();
        if let Some(outer) = self.tables[self.current].outer {
            // Scopes are strictly nested, so the current table is the last one.
            self.tables.truncate(self.current);
            self.current = outer;
        }
        debug!(depth = self.depth(), num_definitions, "leave symbol scope");
        num_definitions
    }

    pub fn num_definitions(&self) -> usize {
        self.tables[self.current].num_definitions
    }

    pub fn is_global(&self) -> bool {
        self.tables[self.current].outer.is_none()
    }

    /// Nesting depth of the current scope (0 for global).
    pub fn depth(&self) -> usize {
        self.tables.len() - 1
    }

    fn scope_kind(&self) -> SymbolScope {
        if self.is_global() {
            SymbolScope::Global
        } else {
            SymbolScope::Local
        }
    }
}
