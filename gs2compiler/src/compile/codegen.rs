use super::{
    builtins::{self, BuiltinCmd, CmdFlags, DEFAULT_CALL, DEFAULT_OBJ_CALL},
    bytecode::{BytecodeBuilder, Label},
    opcode::Opcode,
    CodegenError,
};
use crate::parsing::{
    BinaryOp, Binding, CallFinder, CastKind, CompilationUnit, ConstValue, Expr, ExprKind, ForEachStmt, ForInit,
    ForStmt, FuncDef, Ident, IfStmt, Item, LitValue, LogicalOp, Name, NewStmt, StepOp, Stmt, SwitchStmt, UnaryOp,
    VarDecl, WhileStmt, WithStmt,
};
use std::collections::BTreeSet;

/// Result of code generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    /// Complete image, prologue included.
    pub bytecode: Vec<u8>,
    /// Classes joined by name with a string literal, `join("util")`.
    pub joined_classes: BTreeSet<String>,
}

/// Static type of an expression, as far as it is known.
///
/// Decides which conversion opcodes are needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueType {
    Number,
    String,
    Bool,
    Any,
}

/// Pending jumps out of, and back into, the innermost loop.
///
/// A `switch` takes breaks but passes continues to its loop.
#[derive(Debug, Default)]
struct LoopLabels {
    breaks: Vec<Label>,
    continues: Vec<Label>,
    is_switch: bool,
}

/// Code generator.
///
/// Walks a resolved syntax tree once, emitting instructions into
/// a [`BytecodeBuilder`].
pub struct CodeGen {
    code: BytecodeBuilder,
    /// Innermost loop at the back.
    loops: Vec<LoopLabels>,
    joined_classes: BTreeSet<String>,
}

impl CodeGen {
    #[inline]
    pub fn new() -> Self {
        Self {
            code: BytecodeBuilder::new(),
            loops: vec![],
            joined_classes: BTreeSet::new(),
        }
    }

    pub fn compile(mut self, unit: &CompilationUnit, prologue: &[u8]) -> Result<Output, CodegenError> {
        self.emit_comp_unit(unit)?;

        log::debug!(
            "emitted {} opcodes, {} strings, {} functions",
            self.code.op_index(),
            self.code.strings().len(),
            self.code.functions().len()
        );

        Ok(Output {
            bytecode: self.code.finish(prologue)?,
            joined_classes: self.joined_classes,
        })
    }

    /// Emit the jump back to a loop's start.
    fn emit_jump_to(&mut self, op: Opcode, target: usize) -> Result<(), CodegenError> {
        let label = self.code.emit_jump(op);
        self.code.patch_jump(label, target)
    }

    fn current_loop(&mut self, line: usize) -> Result<&mut LoopLabels, CodegenError> {
        self.loops.last_mut().ok_or(CodegenError::NoLoop { line })
    }

    /// Jump to the start of the next iteration of the innermost real loop,
    /// dropping the values of the switches in between.
    fn emit_continue(&mut self, line: usize) -> Result<(), CodegenError> {
        let switches = self.loops.iter().rev().take_while(|labels| labels.is_switch).count();
        if switches == self.loops.len() {
            return Err(CodegenError::NoLoop { line });
        }

        for _ in 0..switches {
            self.code.emit(Opcode::IndexDec);
        }
        let label = self.code.emit_jump(Opcode::SetIndex);
        let index = self.loops.len() - switches - 1;
        self.loops[index].continues.push(label);
        Ok(())
    }
}

impl Default for CodeGen {
    #[inline]
    fn default() -> Self {
        CodeGen::new()
    }
}

/// Recursive visitor
impl CodeGen {
    fn emit_comp_unit(&mut self, unit: &CompilationUnit) -> Result<(), CodegenError> {
        for item in &unit.items {
            match item {
                Item::Func(func) => self.emit_func(func)?,
                Item::Stmt(stmt) => self.emit_stmt(stmt)?,
            }
        }
        Ok(())
    }

    fn emit_func(&mut self, func: &FuncDef) -> Result<(), CodegenError> {
        let name = func.table_name();
        log::trace!("function {} at opcode {}", name, self.code.op_index());

        // Code running top to bottom skips over the function body.
        let skip = self.code.emit_jump(Opcode::SetIndex);
        self.code.add_function(name, self.code.op_index())?;

        self.code.emit(Opcode::TypeArray);
        for param in func.params.iter().rev() {
            self.code.emit(Opcode::TypeVar);
            self.code.emit_pool_ref(&param.name);
        }
        self.code.emit(Opcode::FuncParamsEnd);
        self.code.emit(Opcode::Jmp);

        if CallFinder::contains_call(&func.body) {
            self.code.emit(Opcode::CmdCall);
        }

        for stmt in &func.body.stmts {
            self.emit_stmt(stmt)?;
        }

        let returns = matches!(func.body.stmts.last(), Some(Stmt::Return(_)));
        if !returns || self.code.last_op() != Some(Opcode::Ret) {
            self.emit_int(0);
            self.code.emit(Opcode::Ret);
        }

        self.code.patch_here(skip)
    }

    fn emit_stmt(&mut self, stmt: &Stmt) -> Result<(), CodegenError> {
        match stmt {
            Stmt::Block(block) => {
                for stmt in &block.stmts {
                    self.emit_stmt(stmt)?;
                }
                Ok(())
            }
            Stmt::If(stmt) => self.emit_if(stmt),
            Stmt::While(stmt) => self.emit_while(stmt),
            Stmt::For(stmt) => self.emit_for(stmt),
            Stmt::ForEach(stmt) => self.emit_foreach(stmt),
            Stmt::With(stmt) => self.emit_with(stmt),
            Stmt::Switch(stmt) => self.emit_switch(stmt),
            Stmt::New(stmt) => self.emit_new_stmt(stmt),
            Stmt::Return(stmt) => {
                match &stmt.value {
                    Some(value) => self.emit_expr(value)?,
                    None => self.emit_int(0),
                }
                self.code.emit(Opcode::Ret);
                Ok(())
            }
            Stmt::Break(line) => {
                let label = self.code.emit_jump(Opcode::SetIndex);
                self.current_loop(*line)?.breaks.push(label);
                Ok(())
            }
            Stmt::Continue(line) => self.emit_continue(*line),
            Stmt::Var(decl) => self.emit_var_decl(decl),
            // Constants are inlined where they are used.
            Stmt::Const(_) => Ok(()),
            Stmt::Expr(expr) => self.emit_expr_stmt(expr),
            Stmt::Empty(_) => Ok(()),
        }
    }

    fn emit_if(&mut self, stmt: &IfStmt) -> Result<(), CodegenError> {
        self.emit_condition(&stmt.cond)?;
        let otherwise = self.code.emit_jump(Opcode::If);

        self.emit_stmt(&stmt.then)?;

        match &stmt.otherwise {
            Some(else_stmt) => {
                let end = self.code.emit_jump(Opcode::SetIndex);
                self.code.patch_here(otherwise)?;
                self.emit_stmt(else_stmt)?;
                self.code.patch_here(end)
            }
            None => self.code.patch_here(otherwise),
        }
    }

    fn emit_while(&mut self, stmt: &WhileStmt) -> Result<(), CodegenError> {
        let start = self.code.op_index();
        self.emit_condition(&stmt.cond)?;
        let exit = self.code.emit_jump(Opcode::If);

        // Counts loop iterations.
        self.code.emit(Opcode::CmdCall);

        self.loops.push(LoopLabels::default());
        self.emit_stmt(&stmt.body)?;
        self.emit_jump_to(Opcode::SetIndex, start)?;

        self.end_loop(exit, start)
    }

    fn emit_for(&mut self, stmt: &ForStmt) -> Result<(), CodegenError> {
        match &stmt.init {
            Some(ForInit::Var(decl)) => self.emit_var_decl(decl)?,
            Some(ForInit::Expr(expr)) => self.emit_expr_stmt(expr)?,
            None => {}
        }

        let start = self.code.op_index();
        match &stmt.cond {
            Some(cond) => self.emit_condition(cond)?,
            None => self.code.emit(Opcode::TypeTrue),
        }
        let exit = self.code.emit_jump(Opcode::If);
        self.code.emit(Opcode::CmdCall);

        self.loops.push(LoopLabels::default());
        self.emit_stmt(&stmt.body)?;

        // `continue` runs the step expression.
        let step = self.code.op_index();
        if let Some(expr) = &stmt.step {
            self.emit_expr_stmt(expr)?;
        }
        self.emit_jump_to(Opcode::SetIndex, start)?;

        self.end_loop(exit, step)
    }

    fn emit_foreach(&mut self, stmt: &ForEachStmt) -> Result<(), CodegenError> {
        // Iteration state on the stack: variable, object, index.
        self.emit_name(&stmt.var, stmt.line)?;
        self.emit_expr(&stmt.iterable)?;
        self.code.emit(Opcode::ConvToObject);
        self.emit_int(0);

        let start = self.code.op_index();
        let exit = self.code.emit_jump(Opcode::ForEach);
        self.code.emit(Opcode::CmdCall);

        self.loops.push(LoopLabels::default());
        self.emit_stmt(&stmt.body)?;

        let next = self.code.op_index();
        self.code.emit(Opcode::Inc);
        self.emit_jump_to(Opcode::SetIndex, start)?;

        self.end_loop(exit, next)?;

        // Pop the index.
        self.code.emit(Opcode::IndexDec);
        Ok(())
    }

    /// Patch the exit jump and every `break` to the next opcode,
    /// and every `continue` to the given target.
    fn end_loop(&mut self, exit: Label, continue_target: usize) -> Result<(), CodegenError> {
        let labels = self.loops.pop().unwrap_or_default();
        self.code.patch_here(exit)?;
        for label in labels.breaks {
            self.code.patch_here(label)?;
        }
        for label in labels.continues {
            self.code.patch_jump(label, continue_target)?;
        }
        Ok(())
    }

    fn emit_with(&mut self, stmt: &WithStmt) -> Result<(), CodegenError> {
        self.emit_expr(&stmt.object)?;
        self.code.emit(Opcode::ConvToObject);
        let end = self.code.emit_jump(Opcode::With);

        self.emit_stmt(&stmt.body)?;

        self.code.emit(Opcode::WithEnd);
        self.code.patch_here(end)
    }

    /// Case bodies come first, in source order, so they fall through.
    /// The tests after them compare a copy of the value with each label
    /// and jump into the matching body. The value is dropped at the end.
    fn emit_switch(&mut self, stmt: &SwitchStmt) -> Result<(), CodegenError> {
        let tests = self.code.emit_jump(Opcode::SetIndex);

        self.loops.push(LoopLabels {
            is_switch: true,
            ..Default::default()
        });

        let mut starts = Vec::with_capacity(stmt.cases.len());
        for case in &stmt.cases {
            starts.push(self.code.op_index());
            for stmt in &case.body {
                self.emit_stmt(stmt)?;
            }
        }
        let end = self.code.emit_jump(Opcode::SetIndex);

        self.code.patch_here(tests)?;
        self.emit_expr(&stmt.value)?;

        let mut default = None;
        for (case, start) in stmt.cases.iter().zip(starts) {
            for label in &case.labels {
                match label {
                    Some(label) => {
                        self.code.emit(Opcode::CopyLastOp);
                        self.emit_expr(label)?;
                        self.code.emit(Opcode::Eq);
                        self.emit_jump_to(Opcode::SetIndexTrue, start)?;
                    }
                    None => default = Some(start),
                }
            }
        }
        // The default is only taken when no label matched.
        if let Some(start) = default {
            self.emit_jump_to(Opcode::SetIndex, start)?;
        }

        let labels = self.loops.pop().unwrap_or_default();
        self.code.patch_here(end)?;
        for label in labels.breaks {
            self.code.patch_here(label)?;
        }
        self.code.emit(Opcode::IndexDec);
        Ok(())
    }

    /// Create a named object, run the body with it as the current
    /// object and add it to the enclosing object.
    fn emit_new_stmt(&mut self, stmt: &NewStmt) -> Result<(), CodegenError> {
        self.emit_expr(&stmt.name)?;
        self.code.emit(Opcode::InlineNew);
        for _ in 0..3 {
            self.code.emit(Opcode::CopyLastOp);
        }
        self.emit_string(&stmt.class.name);
        self.code.emit(Opcode::ConvToString);
        self.code.emit(Opcode::NewObject);
        self.code.emit(Opcode::Assign);

        self.code.emit(Opcode::ConvToObject);
        let end = self.code.emit_jump(Opcode::With);
        for stmt in &stmt.body.stmts {
            self.emit_stmt(stmt)?;
        }
        self.code.emit(Opcode::WithEnd);
        self.code.patch_here(end)?;

        self.code.emit(Opcode::TypeArray);
        self.code.emit(Opcode::SwapLastOps);
        self.code.emit(Opcode::TypeVar);
        self.code.emit_pool_ref("addcontrol");
        self.code.emit(Opcode::Call);
        self.code.emit(Opcode::IndexDec);
        Ok(())
    }

    /// Locals live in the `temp` object.
    fn emit_var_decl(&mut self, decl: &VarDecl) -> Result<(), CodegenError> {
        for def in &decl.defs {
            self.emit_local(&def.name.name);
            match &def.rhs {
                Some(rhs) => self.emit_expr(rhs)?,
                None => self.code.emit(Opcode::TypeNull),
            }
            self.code.emit(Opcode::Assign);
        }
        Ok(())
    }

    fn emit_expr_stmt(&mut self, expr: &Expr) -> Result<(), CodegenError> {
        match &expr.kind {
            ExprKind::Call { callee, args } => self.emit_call(callee, args, true),
            ExprKind::Assign { op, target, value } => self.emit_assign(*op, target, value),
            ExprKind::Step { op, target, .. } => {
                self.emit_expr(target)?;
                self.code.emit(step_opcode(*op));
                self.code.emit(Opcode::IndexDec);
                Ok(())
            }
            _ => {
                self.emit_expr(expr)?;
                self.code.emit(Opcode::IndexDec);
                Ok(())
            }
        }
    }

    /// Leaves a number or boolean for a conditional jump.
    fn emit_condition(&mut self, cond: &Expr) -> Result<(), CodegenError> {
        self.emit_expr(cond)?;
        if !self.code.last_op().map_or(false, Opcode::is_boolean_returning) {
            self.emit_conversion(value_type(cond), ValueType::Number);
        }
        Ok(())
    }

    fn emit_expr(&mut self, expr: &Expr) -> Result<(), CodegenError> {
        match &expr.kind {
            ExprKind::Literal(lit) => {
                self.emit_literal(lit);
                Ok(())
            }
            ExprKind::Ident(name) => self.emit_name(name, expr.line),
            ExprKind::Member { object, member } => {
                self.emit_object(object)?;
                self.code.emit(Opcode::TypeVar);
                self.code.emit_pool_ref(&member.name);
                self.code.emit(Opcode::MemberAccess);
                Ok(())
            }
            ExprKind::Index { object, index } => {
                self.emit_index(object, index)?;
                self.code.emit(Opcode::Array);
                Ok(())
            }
            ExprKind::Call { callee, args } => self.emit_call(callee, args, false),
            ExprKind::Array(items) => {
                self.code.emit(Opcode::TypeArray);
                for item in items.iter().rev() {
                    self.emit_expr(item)?;
                }
                self.code.emit(Opcode::ArrayEnd);
                Ok(())
            }
            ExprKind::Unary { op, operand } => {
                self.emit_expr(operand)?;
                self.code.emit(Opcode::ConvToFloat);
                self.code.emit(match op {
                    UnaryOp::Neg => Opcode::UnarySub,
                    UnaryOp::Not => Opcode::Not,
                });
                Ok(())
            }
            ExprKind::Step { op, prefix, target } => {
                self.emit_expr(target)?;
                if *prefix {
                    self.code.emit(step_opcode(*op));
                } else {
                    // Keep a copy of the old value below the stepped variable.
                    self.code.emit(Opcode::CopyLastOp);
                    self.code.emit(Opcode::ConvToFloat);
                    self.code.emit(Opcode::SwapLastOps);
                    self.code.emit(step_opcode(*op));
                    self.code.emit(Opcode::IndexDec);
                }
                Ok(())
            }
            ExprKind::Binary { op, lhs, rhs } => self.emit_binary(*op, lhs, rhs),
            ExprKind::Logical { op, lhs, rhs } => self.emit_logical(*op, lhs, rhs),
            ExprKind::Assign { op, target, value } => {
                self.emit_assign(*op, target, value)?;
                // The assignment consumed the target, read it back as the value.
                self.emit_expr(target)
            }
            ExprKind::Ternary { cond, then, otherwise } => {
                self.emit_condition(cond)?;
                let else_label = self.code.emit_jump(Opcode::If);
                self.emit_expr(then)?;
                let end = self.code.emit_jump(Opcode::SetIndex);
                self.code.patch_here(else_label)?;
                self.emit_expr(otherwise)?;
                self.code.patch_here(end)
            }
            ExprKind::Cast { kind, operand } => {
                self.emit_expr(operand)?;
                self.code.emit(match kind {
                    CastKind::Int => Opcode::Int,
                    CastKind::Float => Opcode::ConvToFloat,
                    CastKind::String => Opcode::ConvToString,
                });
                Ok(())
            }
            ExprKind::In { value, lower, upper } => {
                self.emit_expr(value)?;
                self.emit_expr(lower)?;
                match upper {
                    Some(upper) => {
                        self.emit_conversion(value_type(lower), ValueType::Number);
                        self.emit_expr(upper)?;
                        self.emit_conversion(value_type(upper), ValueType::Number);
                        self.code.emit(Opcode::InRange);
                    }
                    None => {
                        if !self.code.last_op().map_or(false, Opcode::is_object_returning) {
                            self.code.emit(Opcode::ConvToObject);
                        }
                        self.code.emit(Opcode::InObj);
                    }
                }
                Ok(())
            }
            ExprKind::New { class, args } => self.emit_new(class, args),
            ExprKind::NewArray(dims) => {
                for (i, dim) in dims.iter().enumerate() {
                    self.emit_int(*dim);
                    self.code.emit(if i == 0 { Opcode::ArrayNew } else { Opcode::ArrayNewMultidim });
                }
                Ok(())
            }
        }
    }

    /// Objects are named by their single argument.
    fn emit_new(&mut self, class: &Ident, args: &[Expr]) -> Result<(), CodegenError> {
        match args {
            [name] => {
                self.emit_expr(name)?;
                self.code.emit(Opcode::InlineNew);
            }
            _ => {
                self.code.emit(Opcode::TypeVar);
                self.code.emit_pool_ref("unknown_object");
            }
        }
        self.emit_string(&class.name);
        self.code.emit(Opcode::NewObject);
        Ok(())
    }

    fn emit_literal(&mut self, lit: &LitValue) {
        match lit {
            LitValue::Int(value) => self.emit_int(*value),
            LitValue::Float(text) => {
                self.code.emit(Opcode::TypeNumber);
                self.code.emit_float(text);
            }
            LitValue::Str(text) => self.emit_string(text),
            LitValue::Bool(true) => self.code.emit(Opcode::TypeTrue),
            LitValue::Bool(false) => self.code.emit(Opcode::TypeFalse),
            LitValue::Null => self.code.emit(Opcode::TypeNull),
        }
    }

    #[inline]
    fn emit_int(&mut self, value: u32) {
        self.code.emit(Opcode::TypeNumber);
        self.code.emit_int(value);
    }

    #[inline]
    fn emit_string(&mut self, text: &str) {
        self.code.emit(Opcode::TypeString);
        self.code.emit_pool_ref(text);
    }

    fn emit_const(&mut self, value: &ConstValue) {
        match value {
            ConstValue::Number(number) => {
                let int = (number.fract() == 0.0 && *number >= 0.0 && *number <= f64::from(u32::MAX))
                    .then(|| *number as u32);
                match int {
                    Some(int) => self.emit_int(int),
                    None => {
                        self.code.emit(Opcode::TypeNumber);
                        self.code.emit_float(&number.to_string());
                    }
                }
            }
            ConstValue::Str(text) => self.emit_string(text),
        }
    }

    fn emit_local(&mut self, name: &str) {
        self.code.emit(Opcode::Temp);
        self.code.emit(Opcode::TypeVar);
        self.code.emit_pool_ref(name);
        self.code.emit(Opcode::MemberAccess);
    }

    fn emit_name(&mut self, name: &Name, line: usize) -> Result<(), CodegenError> {
        match &name.binding {
            Binding::Unresolved => {
                return Err(CodegenError::Unbound {
                    name: name.name.clone(),
                    line,
                })
            }
            Binding::Const(value) => self.emit_const(value),
            Binding::Local => self.emit_local(&name.name),
            Binding::Builtin => match Opcode::from_root(&name.name) {
                Some(op) => self.code.emit(op),
                None => {
                    self.code.emit(Opcode::TypeVar);
                    self.code.emit_pool_ref(&name.name);
                }
            },
            Binding::Var | Binding::Param | Binding::Func => {
                self.code.emit(Opcode::TypeVar);
                self.code.emit_pool_ref(&name.name);
            }
        }
        Ok(())
    }

    /// Emit an expression used as the object of a member access.
    fn emit_object(&mut self, object: &Expr) -> Result<(), CodegenError> {
        self.emit_expr(object)?;
        if !self.code.last_op().map_or(false, Opcode::is_object_returning) {
            self.code.emit(Opcode::ConvToObject);
        }
        Ok(())
    }

    /// Array and index, without the read.
    fn emit_index(&mut self, object: &Expr, index: &Expr) -> Result<(), CodegenError> {
        self.emit_expr(object)?;
        self.emit_expr(index)?;
        if value_type(index) != ValueType::Number {
            self.code.emit(Opcode::ConvToFloat);
        }
        Ok(())
    }

    fn emit_conversion(&mut self, from: ValueType, to: ValueType) {
        match to {
            ValueType::Number if !matches!(from, ValueType::Number | ValueType::Bool) => {
                self.code.emit(Opcode::ConvToFloat)
            }
            ValueType::String if from != ValueType::String => self.code.emit(Opcode::ConvToString),
            _ => {}
        }
    }

    fn emit_binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> Result<(), CodegenError> {
        let operand = match op {
            BinaryOp::Concat => Some(ValueType::String),
            _ if op.is_equality() => None,
            _ => Some(ValueType::Number),
        };

        self.emit_expr(lhs)?;
        if let Some(to) = operand {
            self.emit_conversion(value_type(lhs), to);
        }
        self.emit_expr(rhs)?;
        if let Some(to) = operand {
            self.emit_conversion(value_type(rhs), to);
        }

        self.code.emit(binary_opcode(op));
        Ok(())
    }

    /// Short circuit evaluation, leaving exactly one value.
    fn emit_logical(&mut self, op: LogicalOp, lhs: &Expr, rhs: &Expr) -> Result<(), CodegenError> {
        let (jump, short_value) = match op {
            LogicalOp::And => (Opcode::If, Opcode::TypeFalse),
            LogicalOp::Or => (Opcode::Or, Opcode::TypeTrue),
        };

        self.emit_condition(lhs)?;
        let short = self.code.emit_jump(jump);
        self.emit_condition(rhs)?;
        let end = self.code.emit_jump(Opcode::SetIndex);
        self.code.patch_here(short)?;
        self.code.emit(short_value);
        self.code.patch_here(end)
    }

    fn emit_assign(&mut self, op: Option<BinaryOp>, target: &Expr, value: &Expr) -> Result<(), CodegenError> {
        let assign = match &target.kind {
            ExprKind::Index { object, index } => {
                self.emit_index(object, index)?;
                Opcode::ArrayAssign
            }
            _ => {
                self.emit_expr(target)?;
                Opcode::Assign
            }
        };

        match op {
            None => self.emit_expr(value)?,
            Some(op) => {
                let to = match op {
                    BinaryOp::Concat => ValueType::String,
                    _ => ValueType::Number,
                };

                // Current value of the target.
                if assign == Opcode::ArrayAssign {
                    self.emit_expr(target)?;
                } else {
                    self.code.emit(Opcode::CopyLastOp);
                }
                self.emit_conversion(value_type(target), to);
                self.emit_expr(value)?;
                self.emit_conversion(value_type(value), to);
                self.code.emit(binary_opcode(op));
            }
        }

        self.code.emit(assign);
        Ok(())
    }

    /// Calls to builtins emit their opcode, everything else is a script call.
    fn emit_call(&mut self, callee: &Expr, args: &[Expr], is_stmt: bool) -> Result<(), CodegenError> {
        let (cmd, object): (&BuiltinCmd, Option<&Expr>) = match &callee.kind {
            ExprKind::Member { object, member } => (
                builtins::lookup_obj_cmd(&member.name).unwrap_or(&DEFAULT_OBJ_CALL),
                Some(object.as_ref()),
            ),
            ExprKind::Ident(name) if name.binding == Binding::Builtin => {
                (builtins::lookup_cmd(&name.name).unwrap_or(&DEFAULT_CALL), None)
            }
            _ => (&DEFAULT_CALL, None),
        };

        if let ExprKind::Ident(name) = &callee.kind {
            self.record_join(name, args);
        }

        if cmd.flags.contains(CmdFlags::OBJECT_FIRST) {
            self.emit_call_object(cmd, object)?;
        }

        if cmd.flags.contains(CmdFlags::USE_ARRAY) {
            self.code.emit(Opcode::TypeArray);
        }

        if cmd.flags.contains(CmdFlags::REVERSE_ARGS) {
            for arg in args.iter().rev() {
                self.emit_expr(arg)?;
            }
        } else if args.is_empty() && cmd.op == Opcode::ObjTokenize {
            self.emit_string(builtins::TOKENIZE_SEPARATORS);
        } else {
            for arg in args {
                self.emit_expr(arg)?;
            }
        }

        if !cmd.flags.contains(CmdFlags::OBJECT_FIRST) {
            self.emit_call_object(cmd, object)?;
        }

        if cmd.op == Opcode::Call {
            match &callee.kind {
                ExprKind::Member { member, .. } => {
                    self.code.emit(Opcode::TypeVar);
                    self.code.emit_pool_ref(&member.name);
                    self.code.emit(Opcode::MemberAccess);
                }
                _ => self.emit_expr(callee)?,
            }
        }

        self.code.emit(cmd.op);

        // Discard the unused return value.
        if is_stmt && cmd.returns_value() {
            self.code.emit(Opcode::IndexDec);
        }

        Ok(())
    }

    fn emit_call_object(&mut self, cmd: &BuiltinCmd, object: Option<&Expr>) -> Result<(), CodegenError> {
        if let Some(object) = object {
            self.emit_expr(object)?;
        }

        if let Some(convert) = cmd.convert {
            let last_op = self.code.last_op();
            let converted = last_op == Some(convert)
                || (convert == Opcode::ConvToObject && last_op.map_or(false, Opcode::is_object_returning));
            if !converted {
                self.code.emit(convert);
            }
        }

        Ok(())
    }

    /// Scripts joined with a literal name are needed before this one runs.
    fn record_join(&mut self, name: &Name, args: &[Expr]) {
        if name.name != "join" || name.binding != Binding::Builtin {
            return;
        }
        if let [Expr {
            kind: ExprKind::Literal(LitValue::Str(class)),
            ..
        }] = args
        {
            self.joined_classes.insert(class.clone());
        }
    }
}

fn value_type(expr: &Expr) -> ValueType {
    match &expr.kind {
        ExprKind::Literal(LitValue::Int(_) | LitValue::Float(_)) => ValueType::Number,
        ExprKind::Literal(LitValue::Str(_)) => ValueType::String,
        ExprKind::Literal(LitValue::Bool(_)) => ValueType::Bool,
        ExprKind::Ident(Name {
            binding: Binding::Const(value),
            ..
        }) => match value {
            ConstValue::Number(_) => ValueType::Number,
            ConstValue::Str(_) => ValueType::String,
        },
        ExprKind::Binary { op: BinaryOp::Concat, .. } => ValueType::String,
        ExprKind::Binary { op, .. } if op.is_comparison() => ValueType::Bool,
        ExprKind::Binary { .. } | ExprKind::Step { .. } => ValueType::Number,
        ExprKind::Unary { op: UnaryOp::Neg, .. } => ValueType::Number,
        ExprKind::Unary { op: UnaryOp::Not, .. } | ExprKind::Logical { .. } => ValueType::Bool,
        ExprKind::Cast { kind: CastKind::String, .. } => ValueType::String,
        ExprKind::Cast { .. } => ValueType::Number,
        ExprKind::In { .. } => ValueType::Bool,
        _ => ValueType::Any,
    }
}

#[rustfmt::skip]
fn binary_opcode(op: BinaryOp) -> Opcode {
    match op {
        BinaryOp::Add       => Opcode::Add,
        BinaryOp::Sub       => Opcode::Sub,
        BinaryOp::Mul       => Opcode::Mul,
        BinaryOp::Div       => Opcode::Div,
        BinaryOp::Mod       => Opcode::Mod,
        BinaryOp::Pow       => Opcode::Pow,
        BinaryOp::Concat    => Opcode::Join,
        BinaryOp::Eq        => Opcode::Eq,
        BinaryOp::NotEq     => Opcode::Neq,
        BinaryOp::Less      => Opcode::Lt,
        BinaryOp::Greater   => Opcode::Gt,
        BinaryOp::LessEq    => Opcode::Lte,
        BinaryOp::GreaterEq => Opcode::Gte,
    }
}

#[inline]
fn step_opcode(op: StepOp) -> Opcode {
    match op {
        StepOp::Inc => Opcode::Inc,
        StepOp::Dec => Opcode::Dec,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{encoding::read_u32_be, header::Environment, lex::Lexer, parsing::Parse, token_stream::TokenStream};
    use crate::compile::Resolver;

    fn generate(source: &str) -> Output {
        let env = Environment::empty();
        let mut input = TokenStream::new(Lexer::new(source));
        let mut unit = CompilationUnit::parse(&mut input).unwrap();
        Resolver::new(&env).resolve(&mut unit).unwrap();
        CodeGen::new().compile(&unit, &[]).unwrap()
    }

    /// Payload of the given segment in an image without prologue.
    fn segment(image: &[u8], id: u32) -> Vec<u8> {
        let mut rest = image;
        while rest.len() >= 8 {
            let seg_id = read_u32_be(rest).unwrap();
            let len = read_u32_be(&rest[4..]).unwrap() as usize;
            if seg_id == id {
                return rest[8..8 + len].to_vec();
            }
            rest = &rest[8 + len..];
        }
        panic!("segment {} not found", id);
    }

    fn instructions(source: &str) -> Vec<u8> {
        segment(&generate(source).bytecode, 4)
    }

    #[test]
    fn test_assign_global() {
        let output = generate("x = 1;");
        assert_eq!(segment(&output.bytecode, 3), b"x\0");
        assert_eq!(segment(&output.bytecode, 4), &[22, 0xF0, 0, 20, 0xF3, 1, 50]);
        assert_eq!(output.bytecode.last(), Some(&b'\n'));
    }

    #[test]
    fn test_local_var() {
        assert_eq!(instructions("var a = 5;"), &[189, 22, 0xF0, 0, 35, 20, 0xF3, 5, 50]);
    }

    #[test]
    fn test_const_inlined() {
        let output = generate("const A = 2 * 3; x = A;");
        assert_eq!(segment(&output.bytecode, 3), b"x\0");
        assert_eq!(segment(&output.bytecode, 4), &[22, 0xF0, 0, 20, 0xF3, 6, 50]);
    }

    #[test]
    fn test_builtin_call_statement() {
        let output = generate("echo(\"hi\");");
        assert_eq!(segment(&output.bytecode, 3), b"hi\0echo\0");
        #[rustfmt::skip]
        assert_eq!(segment(&output.bytecode, 4), &[
            23,
            21, 0xF0, 0,
            22, 0xF0, 1,
            6,
            32,
        ]);
    }

    #[test]
    fn test_function_layout() {
        let output = generate("function onCreated() { return 1; }");
        assert_eq!(segment(&output.bytecode, 2), b"\0\0\0\x01onCreated\0");
        #[rustfmt::skip]
        assert_eq!(segment(&output.bytecode, 4), &[
            1, 0xF4, 0, 6,
            23,
            51,
            10,
            20, 0xF3, 1,
            7,
        ]);
    }

    #[test]
    fn test_implicit_return() {
        #[rustfmt::skip]
        assert_eq!(instructions("function f() {}"), &[
            1, 0xF4, 0, 6,
            23,
            51,
            10,
            20, 0xF3, 0,
            7,
        ]);
    }

    #[test]
    fn test_if_else() {
        #[rustfmt::skip]
        assert_eq!(instructions("x = 1; if (x == 1) x = 2; else x = 3;"), &[
            22, 0xF0, 0, 20, 0xF3, 1, 50,
            22, 0xF0, 0, 20, 0xF3, 1, 70,
            4, 0xF4, 0, 11,
            22, 0xF0, 0, 20, 0xF3, 2, 50,
            1, 0xF4, 0, 14,
            22, 0xF0, 0, 20, 0xF3, 3, 50,
        ]);
    }

    #[test]
    fn test_while_break() {
        #[rustfmt::skip]
        assert_eq!(instructions("while (true) { break; }"), &[
            24,
            4, 0xF4, 0, 5,
            9,
            1, 0xF4, 0, 5,
            1, 0xF4, 0, 0,
        ]);
    }

    #[test]
    fn test_new_array_layout() {
        #[rustfmt::skip]
        assert_eq!(instructions("a = new[3][300];"), &[
            22, 0xF0, 0,
            20, 0xF3, 3, 38,
            20, 0xF4, 0x01, 0x2C, 142,
            50,
        ]);
    }

    #[test]
    fn test_switch_without_default() {
        #[rustfmt::skip]
        assert_eq!(instructions("switch (1) { case 1: break; }"), &[
            1, 0xF4, 0, 3,
            1, 0xF4, 0, 8,
            1, 0xF4, 0, 8,
            20, 0xF3, 1,
            30,
            20, 0xF3, 1,
            70,
            2, 0xF4, 0, 1,
            32,
        ]);
    }

    #[test]
    fn test_joined_classes() {
        let output = generate("join(\"util\"); join(\"util\"); join(\"net\");");
        let joined: Vec<_> = output.joined_classes.iter().map(String::as_str).collect();
        assert_eq!(joined, vec!["net", "util"]);
    }

    #[test]
    fn test_deterministic() {
        let source = "function onCreated() { for (var i = 0; i < 3; i++) echo(i @ \"x\"); }";
        assert_eq!(generate(source), generate(source));
    }
}
