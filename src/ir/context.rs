use rustc_hash::FxHashMap;

use super::{Func, FuncData, Value, ValueData};
use crate::collections::storage::BaseArena;

/// A symbol defined at module level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Global(Value),
    Func(Func),
}

/// The context of the IR.
///
/// A context is the container of all the data of one module. Handles of
/// values and functions are indices into its arenas, so they are stable and
/// unique within the context.
pub struct Context {
    // +-----------------+
    // |    storages     |
    // +-----------------+
    /// The storage of values, including instructions and block labels.
    pub(super) values: BaseArena<ValueData>,
    /// The storage of functions.
    pub(super) funcs: BaseArena<FuncData>,

    // +-----------------+
    // |  module layout  |
    // +-----------------+
    /// The name of the module.
    name: String,
    /// Global variables in declaration order.
    globals: Vec<Value>,
    /// Functions in declaration order.
    func_list: Vec<Func>,
    /// The symbols defined in the module.
    symbols: FxHashMap<String, SymbolKind>,
}

impl Default for Context {
    fn default() -> Self { Self::new("module") }
}

impl Context {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            values: BaseArena::default(),
            funcs: BaseArena::default(),

            name: name.into(),
            globals: Vec::new(),
            func_list: Vec::new(),
            symbols: FxHashMap::default(),
        }
    }

    pub fn name(&self) -> &str { &self.name }

    fn insert_symbol(&mut self, name: String, kind: SymbolKind) {
        if self.symbols.contains_key(&name) {
            panic!("symbol {:?} is already defined", name);
        }
        self.symbols.insert(name, kind);
    }

    pub(super) fn insert_func(&mut self, func: Func) {
        let name = func.name(self).to_string();
        self.insert_symbol(name, SymbolKind::Func(func));
        self.func_list.push(func);
    }

    pub(super) fn insert_global(&mut self, global: Value) {
        let name = global
            .name(self)
            .expect("global variables are always named")
            .to_string();
        self.insert_symbol(name, SymbolKind::Global(global));
        self.globals.push(global);
    }

    /// Lookup a symbol in the context.
    pub fn lookup_symbol(&self, name: &str) -> Option<SymbolKind> { self.symbols.get(name).copied() }

    /// All the global variables, in declaration order.
    pub fn globals(&self) -> &[Value] { &self.globals }

    /// All the functions, including declarations, in declaration order.
    pub fn funcs(&self) -> &[Func] { &self.func_list }

    /// The functions with a body, in declaration order.
    pub fn defined_funcs(&self) -> impl Iterator<Item = Func> + '_ {
        self.func_list
            .iter()
            .copied()
            .filter(|func| !func.is_declaration(self))
    }
}
