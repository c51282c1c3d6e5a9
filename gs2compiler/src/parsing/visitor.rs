//! Read-only traversal of the syntax tree.
use super::{Block, Expr, ExprKind, ForInit, Stmt};

/// Visitor over statements and expressions.
///
/// Default methods walk into every child node, so an implementation
/// only overrides the nodes it cares about.
pub trait AstVisitor {
    #[inline]
    fn block(&mut self, block: &Block) {
        for stmt in &block.stmts {
            self.stmt(stmt);
        }
    }

    #[inline]
    fn stmt(&mut self, stmt: &Stmt) {
        walk_stmt(self, stmt)
    }

    #[inline]
    fn expr(&mut self, expr: &Expr) {
        walk_expr(self, expr)
    }
}

pub fn walk_stmt<V: AstVisitor + ?Sized>(visitor: &mut V, stmt: &Stmt) {
    match stmt {
        Stmt::Block(block) => visitor.block(block),
        Stmt::If(stmt) => {
            visitor.expr(&stmt.cond);
            visitor.stmt(&stmt.then);
            if let Some(otherwise) = &stmt.otherwise {
                visitor.stmt(otherwise);
            }
        }
        Stmt::While(stmt) => {
            visitor.expr(&stmt.cond);
            visitor.stmt(&stmt.body);
        }
        Stmt::For(stmt) => {
            match &stmt.init {
                Some(ForInit::Var(decl)) => {
                    for def in &decl.defs {
                        if let Some(rhs) = &def.rhs {
                            visitor.expr(rhs);
                        }
                    }
                }
                Some(ForInit::Expr(expr)) => visitor.expr(expr),
                None => {}
            }
            if let Some(cond) = &stmt.cond {
                visitor.expr(cond);
            }
            if let Some(step) = &stmt.step {
                visitor.expr(step);
            }
            visitor.stmt(&stmt.body);
        }
        Stmt::ForEach(stmt) => {
            visitor.expr(&stmt.iterable);
            visitor.stmt(&stmt.body);
        }
        Stmt::With(stmt) => {
            visitor.expr(&stmt.object);
            visitor.stmt(&stmt.body);
        }
        Stmt::Switch(stmt) => {
            visitor.expr(&stmt.value);
            for case in &stmt.cases {
                for label in case.labels.iter().flatten() {
                    visitor.expr(label);
                }
                for stmt in &case.body {
                    visitor.stmt(stmt);
                }
            }
        }
        Stmt::New(stmt) => {
            visitor.expr(&stmt.name);
            visitor.block(&stmt.body);
        }
        Stmt::Return(stmt) => {
            if let Some(value) = &stmt.value {
                visitor.expr(value);
            }
        }
        Stmt::Var(decl) => {
            for def in &decl.defs {
                if let Some(rhs) = &def.rhs {
                    visitor.expr(rhs);
                }
            }
        }
        Stmt::Const(def) => visitor.expr(&def.rhs),
        Stmt::Expr(expr) => visitor.expr(expr),
        Stmt::Break(_) | Stmt::Continue(_) | Stmt::Empty(_) => {}
    }
}

pub fn walk_expr<V: AstVisitor + ?Sized>(visitor: &mut V, expr: &Expr) {
    match &expr.kind {
        ExprKind::Literal(_) | ExprKind::Ident(_) | ExprKind::NewArray(_) => {}
        ExprKind::Member { object, .. } => visitor.expr(object),
        ExprKind::Index { object, index } => {
            visitor.expr(object);
            visitor.expr(index);
        }
        ExprKind::Call { callee, args } => {
            visitor.expr(callee);
            for arg in args {
                visitor.expr(arg);
            }
        }
        ExprKind::Array(items) => {
            for item in items {
                visitor.expr(item);
            }
        }
        ExprKind::Unary { operand, .. } => visitor.expr(operand),
        ExprKind::Step { target, .. } => visitor.expr(target),
        ExprKind::Binary { lhs, rhs, .. } | ExprKind::Logical { lhs, rhs, .. } => {
            visitor.expr(lhs);
            visitor.expr(rhs);
        }
        ExprKind::Assign { target, value, .. } => {
            visitor.expr(target);
            visitor.expr(value);
        }
        ExprKind::Ternary {
            cond,
            then,
            otherwise,
        } => {
            visitor.expr(cond);
            visitor.expr(then);
            visitor.expr(otherwise);
        }
        ExprKind::Cast { operand, .. } => visitor.expr(operand),
        ExprKind::In { value, lower, upper } => {
            visitor.expr(value);
            visitor.expr(lower);
            if let Some(upper) = upper {
                visitor.expr(upper);
            }
        }
        ExprKind::New { args, .. } => {
            for arg in args {
                visitor.expr(arg);
            }
        }
    }
}

/// Finds whether a function body makes any calls.
#[derive(Debug, Default)]
pub struct CallFinder {
    pub found: bool,
}

impl CallFinder {
    pub fn contains_call(block: &Block) -> bool {
        let mut finder = CallFinder::default();
        finder.block(block);
        finder.found
    }
}

impl AstVisitor for CallFinder {
    /// Objects built with a body are added with a call.
    fn stmt(&mut self, stmt: &Stmt) {
        if let Stmt::New(_) = stmt {
            self.found = true;
        } else if !self.found {
            walk_stmt(self, stmt);
        }
    }

    fn expr(&mut self, expr: &Expr) {
        if let ExprKind::Call { .. } = expr.kind {
            self.found = true;
        } else if !self.found {
            walk_expr(self, expr);
        }
    }
}
