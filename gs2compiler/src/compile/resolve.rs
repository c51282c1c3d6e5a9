use super::{
    builtins,
    consteval::ConstEval,
    symbol::{Scope, ScopeId, ScopeKind, Symbol, SymbolKind, SymbolTable},
    ResolveError,
};
use crate::{
    header::Environment,
    parsing::{
        walk_expr, walk_stmt, AstVisitor, Binding, Block, CompilationUnit, ConstDef, Expr, ExprKind, ForInit, FuncDef,
        Item, Name, Stmt, VarDecl,
    },
};
use smol_str::SmolStr;
use std::collections::{HashSet, VecDeque};

/// Builds up a symbol table and binds every name in the syntax tree.
///
/// Lookups walk the scopes from the innermost outward, then fall back
/// to the script's environment and finally the core built-ins.
pub struct Resolver<'a> {
    env: &'a Environment,
    /// Current scope that's being resolved.
    current: Scope,
    /// Enclosing scopes, innermost at the front.
    ///
    /// When the current scope starts a sub-scope, the current
    /// scope is pushed onto the stack. When the sub-scope ends
    /// it's archived and the front of the stack becomes current.
    stack: VecDeque<Scope>,
    /// Finished scopes.
    archive: Vec<Scope>,
    next_id: ScopeId,
}

impl<'a> Resolver<'a> {
    pub fn new(env: &'a Environment) -> Self {
        Resolver {
            env,
            // Implicitly the resolver starts with the program scope.
            current: Scope::new(0, None, ScopeKind::Program),
            stack: VecDeque::new(),
            archive: vec![],
            next_id: 1,
        }
    }

    /// Lookup the given symbol name according to the scope rules.
    ///
    /// First search the current scope for the symbol. If not
    /// found, walk the stack from the innermost to the outermost.
    ///
    /// Blocks have access to their parent scopes, but not their siblings.
    pub(crate) fn lookup_symbol(&self, name: &str) -> Option<&Symbol> {
        std::iter::once(&self.current)
            .chain(self.stack.iter())
            .find_map(|scope| scope.get_symbol(name))
    }

    fn push_scope(&mut self, kind: ScopeKind) {
        let scope = Scope::new(self.next_id, Some(self.current.id), kind);
        self.next_id += 1;
        let parent = std::mem::replace(&mut self.current, scope);
        self.stack.push_front(parent);
    }

    fn pop_scope(&mut self) {
        if let Some(parent) = self.stack.pop_front() {
            let finished = std::mem::replace(&mut self.current, parent);
            self.archive.push(finished);
        }
    }

    /// Run the closure within a new scope.
    fn scoped<T>(&mut self, kind: ScopeKind, f: impl FnOnce(&mut Self) -> T) -> T {
        self.push_scope(kind);
        let result = f(self);
        self.pop_scope();
        result
    }

    /// Declare a symbol in the current scope.
    ///
    /// A `var` may take over a name that was implicitly declared by assignment.
    fn declare(&mut self, name: &SmolStr, kind: SymbolKind, line: usize) -> Result<(), ResolveError> {
        let takes_over = matches!(
            (self.current.get_symbol(name), &kind),
            (Some(Symbol { kind: SymbolKind::Var, .. }), SymbolKind::Local)
        );
        if self.current.contains_symbol(name) && !takes_over {
            return Err(ResolveError::Duplicate {
                name: name.clone(),
                line,
            });
        }

        log::trace!("declare {} {:?} in scope {}", name, kind, self.current.id);
        self.current.add_symbol(Symbol {
            name: name.clone(),
            kind,
            scope: self.current.id,
            line,
        });
        Ok(())
    }

    /// Declare an object variable, visible to the whole script.
    fn declare_implicit(&mut self, name: &SmolStr, line: usize) {
        // The program scope is the outermost one.
        let object = match self.stack.back_mut() {
            Some(scope) => scope,
            None => &mut self.current,
        };

        log::trace!("object variable {} in scope {}", name, object.id);
        object.add_symbol(Symbol {
            name: name.clone(),
            kind: SymbolKind::Var,
            scope: object.id,
            line,
        });
    }

    /// Whether the name is provided by the environment or the runtime.
    fn is_builtin_value(&self, name: &str) -> bool {
        self.env.has_variable(name)
            || self.env.has_function(name)
            || builtins::is_core_name(name)
            || builtins::is_core_function(name)
    }

    fn is_builtin_function(&self, name: &str) -> bool {
        self.env.has_function(name) || self.env.has_variable(name) || builtins::is_core_function(name)
    }
}

// Visitor
impl<'a> Resolver<'a> {
    pub fn resolve(mut self, unit: &mut CompilationUnit) -> Result<SymbolTable, ResolveError> {
        self.hoist_funcs(unit)?;
        self.hoist_object_vars(unit);

        for item in &mut unit.items {
            match item {
                Item::Func(func) => self.resolve_func(func)?,
                Item::Stmt(stmt) => self.resolve_stmt(stmt)?,
            }
        }

        self.archive.push(self.current);

        Ok(SymbolTable::from_scopes(self.archive))
    }

    /// Top level functions can be called before their declaration.
    fn hoist_funcs(&mut self, unit: &CompilationUnit) -> Result<(), ResolveError> {
        let mut table_names = HashSet::new();

        for func in unit.funcs() {
            if !table_names.insert(func.table_name()) {
                return Err(ResolveError::Duplicate {
                    name: func.name.name.clone(),
                    line: func.name.line,
                });
            }

            if !func.is_method() {
                self.declare(&func.name.name, SymbolKind::Func, func.name.line)?;
            }
        }

        Ok(())
    }

    /// Object variables assigned in one function can be read in another.
    fn hoist_object_vars(&mut self, unit: &CompilationUnit) {
        for (name, line) in ObjectVars::collect(unit) {
            if self.current.contains_symbol(&name) || self.is_builtin_value(&name) {
                continue;
            }
            self.declare_implicit(&name, line);
        }
    }

    fn resolve_func(&mut self, func: &mut FuncDef) -> Result<(), ResolveError> {
        log::trace!("resolve function {}", func.table_name());

        self.scoped(ScopeKind::Function, |this| {
            for param in &func.params {
                this.declare(&param.name, SymbolKind::Param, param.line)?;
            }

            // Parameters and the body share one scope.
            this.resolve_stmts(&mut func.body.stmts)
        })
    }

    fn resolve_block(&mut self, block: &mut Block) -> Result<(), ResolveError> {
        self.scoped(ScopeKind::Block, |this| this.resolve_stmts(&mut block.stmts))
    }

    fn resolve_stmts(&mut self, stmts: &mut [Stmt]) -> Result<(), ResolveError> {
        for stmt in stmts {
            self.resolve_stmt(stmt)?;
        }
        Ok(())
    }

    fn resolve_stmt(&mut self, stmt: &mut Stmt) -> Result<(), ResolveError> {
        match stmt {
            Stmt::Block(block) => self.resolve_block(block),
            Stmt::If(stmt) => {
                self.resolve_expr(&mut stmt.cond)?;
                self.resolve_stmt(&mut stmt.then)?;
                if let Some(otherwise) = &mut stmt.otherwise {
                    self.resolve_stmt(otherwise)?;
                }
                Ok(())
            }
            Stmt::While(stmt) => {
                self.resolve_expr(&mut stmt.cond)?;
                self.resolve_stmt(&mut stmt.body)
            }
            Stmt::For(stmt) => self.scoped(ScopeKind::Block, |this| {
                match &mut stmt.init {
                    Some(ForInit::Var(decl)) => this.resolve_var_decl(decl)?,
                    Some(ForInit::Expr(expr)) => this.resolve_expr(expr)?,
                    None => {}
                }
                if let Some(cond) = &mut stmt.cond {
                    this.resolve_expr(cond)?;
                }
                if let Some(step) = &mut stmt.step {
                    this.resolve_expr(step)?;
                }
                this.resolve_stmt(&mut stmt.body)
            }),
            Stmt::ForEach(stmt) => {
                self.resolve_expr(&mut stmt.iterable)?;
                self.scoped(ScopeKind::Block, |this| {
                    if stmt.declared {
                        this.declare(&stmt.var.name, SymbolKind::Local, stmt.line)?;
                        stmt.var.binding = Binding::Local;
                    } else {
                        this.resolve_target_name(&mut stmt.var, stmt.line)?;
                    }
                    this.resolve_stmt(&mut stmt.body)
                })
            }
            Stmt::With(stmt) => {
                self.resolve_expr(&mut stmt.object)?;
                self.resolve_stmt(&mut stmt.body)
            }
            Stmt::Switch(stmt) => {
                self.resolve_expr(&mut stmt.value)?;
                self.scoped(ScopeKind::Block, |this| {
                    for case in &mut stmt.cases {
                        for label in case.labels.iter_mut().flatten() {
                            this.resolve_expr(label)?;
                        }
                        this.resolve_stmts(&mut case.body)?;
                    }
                    Ok(())
                })
            }
            Stmt::New(stmt) => {
                self.resolve_expr(&mut stmt.name)?;
                self.resolve_block(&mut stmt.body)
            }
            Stmt::Return(stmt) => match &mut stmt.value {
                Some(value) => self.resolve_expr(value),
                None => Ok(()),
            },
            Stmt::Var(decl) => self.resolve_var_decl(decl),
            Stmt::Const(def) => self.resolve_const_def(def),
            Stmt::Expr(expr) => self.resolve_expr(expr),
            Stmt::Break(_) | Stmt::Continue(_) | Stmt::Empty(_) => Ok(()),
        }
    }

    fn resolve_var_decl(&mut self, decl: &mut VarDecl) -> Result<(), ResolveError> {
        for def in &mut decl.defs {
            // Before adding the symbol to the table, check the right-hand-side.
            if let Some(rhs) = &mut def.rhs {
                self.resolve_expr(rhs)?;
            }
            self.declare(&def.name.name, SymbolKind::Local, def.name.line)?;
        }
        Ok(())
    }

    fn resolve_const_def(&mut self, def: &ConstDef) -> Result<(), ResolveError> {
        if self.current.contains_symbol(&def.name.name) {
            return Err(ResolveError::Duplicate {
                name: def.name.name.clone(),
                line: def.line,
            });
        }

        // Before adding the symbol to the table, fold the right-hand-side
        // into a compile time value.
        let value = ConstEval::new(self, &def.name.name, def.line).eval_expr(&def.rhs)?;
        log::trace!("constant {} = {}", def.name.name, value);

        self.declare(&def.name.name, SymbolKind::Const(value), def.line)
    }

    fn resolve_expr(&mut self, expr: &mut Expr) -> Result<(), ResolveError> {
        let line = expr.line;

        match &mut expr.kind {
            ExprKind::Literal(_) => Ok(()),
            ExprKind::Ident(name) => self.resolve_read(name, line),
            // Names after the dot are members, not symbols.
            ExprKind::Member { object, .. } => self.resolve_expr(object),
            ExprKind::Index { object, index } => {
                self.resolve_expr(object)?;
                self.resolve_expr(index)
            }
            ExprKind::Call { callee, args } => {
                let callee_line = callee.line;
                match &mut callee.kind {
                    ExprKind::Ident(name) => self.resolve_callee(name, callee_line)?,
                    _ => self.resolve_expr(callee)?,
                }
                for arg in args {
                    self.resolve_expr(arg)?;
                }
                Ok(())
            }
            ExprKind::Array(items) => {
                for item in items {
                    self.resolve_expr(item)?;
                }
                Ok(())
            }
            ExprKind::Unary { operand, .. } => self.resolve_expr(operand),
            ExprKind::Step { target, .. } => self.resolve_target(target),
            ExprKind::Binary { lhs, rhs, .. } | ExprKind::Logical { lhs, rhs, .. } => {
                self.resolve_expr(lhs)?;
                self.resolve_expr(rhs)
            }
            ExprKind::Assign { target, value, .. } => {
                self.resolve_expr(value)?;
                self.resolve_target(target)
            }
            ExprKind::Ternary { cond, then, otherwise } => {
                self.resolve_expr(cond)?;
                self.resolve_expr(then)?;
                self.resolve_expr(otherwise)
            }
            ExprKind::Cast { operand, .. } => self.resolve_expr(operand),
            ExprKind::In { value, lower, upper } => {
                self.resolve_expr(value)?;
                self.resolve_expr(lower)?;
                match upper {
                    Some(upper) => self.resolve_expr(upper),
                    None => Ok(()),
                }
            }
            // Class names are looked up by the runtime.
            ExprKind::New { args, .. } => {
                for arg in args {
                    self.resolve_expr(arg)?;
                }
                Ok(())
            }
            ExprKind::NewArray(_) => Ok(()),
        }
    }

    /// Reading a name requires it to exist.
    fn resolve_read(&mut self, name: &mut Name, line: usize) -> Result<(), ResolveError> {
        name.binding = match self.lookup_symbol(&name.name) {
            Some(symbol) => symbol.kind.binding(),
            None if self.is_builtin_value(&name.name) => Binding::Builtin,
            None => {
                return Err(ResolveError::Unresolved {
                    name: name.name.clone(),
                    line,
                })
            }
        };
        Ok(())
    }

    fn resolve_callee(&mut self, name: &mut Name, line: usize) -> Result<(), ResolveError> {
        name.binding = match self.lookup_symbol(&name.name) {
            Some(symbol) => symbol.kind.binding(),
            None if self.is_builtin_function(&name.name) => Binding::Builtin,
            None => {
                return Err(ResolveError::Unresolved {
                    name: name.name.clone(),
                    line,
                })
            }
        };
        Ok(())
    }

    fn resolve_target(&mut self, target: &mut Expr) -> Result<(), ResolveError> {
        let line = target.line;
        match &mut target.kind {
            ExprKind::Ident(name) => self.resolve_target_name(name, line),
            _ => self.resolve_expr(target),
        }
    }

    /// Assigning to an unknown name declares it.
    fn resolve_target_name(&mut self, name: &mut Name, line: usize) -> Result<(), ResolveError> {
        name.binding = match self.lookup_symbol(&name.name) {
            Some(Symbol {
                kind: SymbolKind::Const(_),
                ..
            }) => {
                return Err(ResolveError::Duplicate {
                    name: name.name.clone(),
                    line,
                })
            }
            Some(symbol) => symbol.kind.binding(),
            None if self.is_builtin_value(&name.name) => Binding::Builtin,
            None => {
                self.declare_implicit(&name.name, line);
                Binding::Var
            }
        };
        Ok(())
    }
}

/// Collects the names a script assigns without declaring them.
///
/// Names declared with `var` or `const`, or bound as parameters, are
/// skipped while they are in scope.
#[derive(Debug, Default)]
struct ObjectVars {
    /// Declared names of each open scope, innermost last.
    declared: Vec<HashSet<SmolStr>>,
    seen: HashSet<SmolStr>,
    /// Assigned names with the line of their first assignment, in source order.
    names: Vec<(SmolStr, usize)>,
}

impl ObjectVars {
    fn collect(unit: &CompilationUnit) -> Vec<(SmolStr, usize)> {
        let mut vars = ObjectVars {
            declared: vec![HashSet::new()],
            ..Default::default()
        };

        for item in &unit.items {
            match item {
                Item::Func(func) => {
                    let params = func.params.iter().map(|param| param.name.clone()).collect();
                    vars.scoped(params, |vars| vars.block(&func.body));
                }
                Item::Stmt(stmt) => vars.stmt(stmt),
            }
        }

        vars.names
    }

    fn scoped(&mut self, names: HashSet<SmolStr>, f: impl FnOnce(&mut Self)) {
        self.declared.push(names);
        f(self);
        self.declared.pop();
    }

    fn declare(&mut self, name: &SmolStr) {
        if let Some(scope) = self.declared.last_mut() {
            scope.insert(name.clone());
        }
    }

    fn assigned(&mut self, name: &SmolStr, line: usize) {
        let is_declared = self.declared.iter().any(|scope| scope.contains(name));
        if !is_declared && self.seen.insert(name.clone()) {
            self.names.push((name.clone(), line));
        }
    }
}

impl AstVisitor for ObjectVars {
    fn block(&mut self, block: &Block) {
        self.scoped(HashSet::new(), |vars| {
            for stmt in &block.stmts {
                vars.stmt(stmt);
            }
        });
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Var(decl) => {
                for def in &decl.defs {
                    if let Some(rhs) = &def.rhs {
                        self.expr(rhs);
                    }
                    self.declare(&def.name.name);
                }
            }
            Stmt::Const(def) => {
                self.expr(&def.rhs);
                self.declare(&def.name.name);
            }
            Stmt::For(_) | Stmt::Switch(_) => self.scoped(HashSet::new(), |vars| {
                if let Stmt::For(stmt) = stmt {
                    if let Some(ForInit::Var(decl)) = &stmt.init {
                        for def in &decl.defs {
                            vars.declare(&def.name.name);
                        }
                    }
                }
                walk_stmt(vars, stmt);
            }),
            Stmt::ForEach(each) => {
                self.expr(&each.iterable);
                self.scoped(HashSet::new(), |vars| {
                    if each.declared {
                        vars.declare(&each.var.name);
                    } else {
                        vars.assigned(&each.var.name, each.line);
                    }
                    vars.stmt(&each.body);
                });
            }
            _ => walk_stmt(self, stmt),
        }
    }

    fn expr(&mut self, expr: &Expr) {
        if let ExprKind::Assign { target, .. } | ExprKind::Step { target, .. } = &expr.kind {
            if let ExprKind::Ident(name) = &target.kind {
                self.assigned(&name.name, target.line);
            }
        }

        walk_expr(self, expr);
    }
}
