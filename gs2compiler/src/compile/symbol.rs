use crate::parsing::{Binding, ConstValue};
use smol_str::SmolStr;
use std::collections::BTreeMap;

pub type ScopeId = usize;

#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub name: SmolStr,
    pub kind: SymbolKind,
    /// Scope the symbol was declared in.
    pub scope: ScopeId,
    /// Line of the declaration, zero when implicit.
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SymbolKind {
    /// Object variable, declared by assignment anywhere in the script.
    Var,
    /// Declared with `var`.
    Local,
    Param,
    /// Constants have a value fixed at compile time.
    Const(ConstValue),
    Func,
}

impl SymbolKind {
    /// Binding recorded on names that refer to a symbol of this kind.
    pub fn binding(&self) -> Binding {
        match self {
            Self::Var => Binding::Var,
            Self::Local => Binding::Local,
            Self::Param => Binding::Param,
            Self::Const(value) => Binding::Const(value.clone()),
            Self::Func => Binding::Func,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Program,
    Function,
    Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scope {
    pub id: ScopeId,
    pub parent: Option<ScopeId>,
    pub kind: ScopeKind,
    symbols: BTreeMap<SmolStr, Symbol>,
}

impl Scope {
    pub fn new(id: ScopeId, parent: Option<ScopeId>, kind: ScopeKind) -> Self {
        Self {
            id,
            parent,
            kind,
            symbols: BTreeMap::new(),
        }
    }

    #[inline]
    pub fn add_symbol(&mut self, symbol: Symbol) {
        self.symbols.insert(symbol.name.clone(), symbol);
    }

    #[inline]
    pub fn get_symbol(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    #[inline]
    pub fn contains_symbol(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }
}

/// Every scope of a resolved program, indexed by scope id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
}

impl SymbolTable {
    pub(crate) fn from_scopes(mut scopes: Vec<Scope>) -> Self {
        scopes.sort_by_key(|scope| scope.id);
        Self { scopes }
    }

    #[inline]
    pub fn scope(&self, id: ScopeId) -> Option<&Scope> {
        self.scopes.get(id)
    }

    #[inline]
    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    /// Program level scope.
    #[inline]
    pub fn root(&self) -> Option<&Scope> {
        self.scopes.first()
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.scopes.iter().flat_map(Scope::symbols)
    }

    /// All symbols with the given name, in scope order.
    pub fn find<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Symbol> + 'a {
        self.scopes.iter().filter_map(move |scope| scope.get_symbol(name))
    }
}
