// Constant expression evaluator.
use super::{resolve::Resolver, symbol::SymbolKind, ResolveError};
use crate::parsing::{BinaryOp, ConstValue, Expr, ExprKind, LitValue, LogicalOp, UnaryOp};

/// Constant expression evaluator.
///
/// Constant values are evaluated by the compiler, and a fixed
/// compile-time value is stored with the symbol. Every use of the
/// constant is replaced by that value.
///
/// The implementation is a simple tree walker over the subset of
/// expressions without side effects. Booleans fold to `1` and `0`.
pub struct ConstEval<'a> {
    /// Only existing constant symbols may be accessed.
    symbols: &'a Resolver<'a>,
    /// Constant being defined, for error reporting.
    name: &'a str,
    line: usize,
}

impl<'a> ConstEval<'a> {
    #[inline]
    pub fn new(symbols: &'a Resolver<'a>, name: &'a str, line: usize) -> Self {
        Self { symbols, name, line }
    }

    /// Entry point for the evaluator.
    pub fn eval_expr(&self, expr: &Expr) -> Result<ConstValue, ResolveError> {
        use ConstValue as V;

        match &expr.kind {
            ExprKind::Literal(lit) => match lit {
                LitValue::Int(val) => Ok(V::Number(f64::from(*val))),
                LitValue::Float(text) => {
                    let value = text.parse().map_err(|_| self.not_const())?;
                    self.finite(value)
                }
                LitValue::Str(text) => Ok(V::Str(text.clone())),
                LitValue::Bool(val) => Ok(V::Number(if *val { 1.0 } else { 0.0 })),
                LitValue::Null => Err(self.not_const()),
            },
            ExprKind::Ident(name) => {
                // A constant expression cannot access a runtime value.
                let symbol = self
                    .symbols
                    .lookup_symbol(&name.name)
                    .ok_or_else(|| ResolveError::Unresolved {
                        name: name.name.clone(),
                        line: expr.line,
                    })?;
                match &symbol.kind {
                    SymbolKind::Const(value) => Ok(value.clone()),
                    _ => Err(self.not_const()),
                }
            }
            ExprKind::Unary { op, operand } => {
                let value = self.eval_number(operand)?;
                self.finite(match op {
                    UnaryOp::Neg => -value,
                    UnaryOp::Not => bool_number(value == 0.0),
                })
            }
            ExprKind::Binary {
                op: BinaryOp::Concat,
                lhs,
                rhs,
            } => {
                let lhs = self.eval_expr(lhs)?;
                let rhs = self.eval_expr(rhs)?;
                Ok(V::Str(format!("{}{}", lhs, rhs)))
            }
            ExprKind::Binary { op, lhs, rhs } if op.is_equality() => {
                let equal = self.eval_expr(lhs)? == self.eval_expr(rhs)?;
                Ok(V::Number(bool_number(equal == (*op == BinaryOp::Eq))))
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let a = self.eval_number(lhs)?;
                let b = self.eval_number(rhs)?;
                let value = match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Sub => a - b,
                    BinaryOp::Mul => a * b,
                    BinaryOp::Div | BinaryOp::Mod if b == 0.0 => return Err(self.not_const()),
                    BinaryOp::Div => a / b,
                    BinaryOp::Mod => a % b,
                    BinaryOp::Pow => a.powf(b),
                    BinaryOp::Less => bool_number(a < b),
                    BinaryOp::Greater => bool_number(a > b),
                    BinaryOp::LessEq => bool_number(a <= b),
                    BinaryOp::GreaterEq => bool_number(a >= b),
                    BinaryOp::Concat | BinaryOp::Eq | BinaryOp::NotEq => return Err(self.not_const()),
                };
                self.finite(value)
            }
            ExprKind::Logical { op, lhs, rhs } => {
                let lhs = self.eval_number(lhs)? != 0.0;
                let value = match op {
                    LogicalOp::And => lhs && self.eval_number(rhs)? != 0.0,
                    LogicalOp::Or => lhs || self.eval_number(rhs)? != 0.0,
                };
                Ok(V::Number(bool_number(value)))
            }
            ExprKind::Ternary { cond, then, otherwise } => {
                if self.eval_number(cond)? != 0.0 {
                    self.eval_expr(then)
                } else {
                    self.eval_expr(otherwise)
                }
            }
            _ => Err(self.not_const()),
        }
    }

    fn eval_number(&self, expr: &Expr) -> Result<f64, ResolveError> {
        match self.eval_expr(expr)? {
            ConstValue::Number(value) => Ok(value),
            ConstValue::Str(_) => Err(self.not_const()),
        }
    }

    /// Infinite and NaN values have no literal form in the image.
    fn finite(&self, value: f64) -> Result<ConstValue, ResolveError> {
        if value.is_finite() {
            Ok(ConstValue::Number(value))
        } else {
            Err(self.not_const())
        }
    }

    fn not_const(&self) -> ResolveError {
        ResolveError::NotConstant {
            name: self.name.into(),
            line: self.line,
        }
    }
}

#[inline]
fn bool_number(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}
