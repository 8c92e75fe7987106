//! Lowered tree to instruction stream.
//!
//! Every instruction goes through [`Emitter::emit`], which applies its stack
//! effect, so the current depth is always known. Forward jumps are emitted
//! as placeholders and patched once their target is known.

use cinder_types::{ConversionKind, PrimitiveKind};
use hashbrown::{HashMap, HashSet};
use smallvec::SmallVec;

use super::array_init::{self, ArrayStrategy};
use super::instruction::{CallShape, Instruction, NumericTarget};
use super::slots::SlotMap;
use super::tokens::{Token, TokenTable};
use super::{ExceptionRegion, RegionKind, SequencePoint};
use crate::api::CompileOptions;
use crate::bound::{
    ArrayInitializer, BinaryOp, ConstantValue, DecimalValue, Expr, ExprKind, LabelId, LocalTable,
    Stmt, StmtKind, UnaryOp,
};
use crate::bound::walk::left_spine;
use crate::error::{CompileError, Stage};
use crate::symbols::{MethodDef, MethodFlags, MethodId, Param, SymbolTable, TypeId, WellKnownMember};
use crate::syntax::Span;
use crate::{String, Vec, format, vec};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
enum Part {
    Body,
    Catch(u16),
    Finally,
}

/// One level of protected-region nesting.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
struct Context {
    region: u32,
    part: Part,
}

type Path = SmallVec<[Context; 4]>;

/// Where every label sits relative to the try statements of the body.
struct LabelScan<'a> {
    paths: HashMap<LabelId, Path>,
    targeted: HashSet<LabelId>,
    regions: HashMap<*const Stmt<'a>, u32>,
}

impl<'a> LabelScan<'a> {
    fn new(body: &'a Stmt<'a>) -> Result<Self, CompileError> {
        let mut scan = LabelScan {
            paths: HashMap::new(),
            targeted: HashSet::new(),
            regions: HashMap::new(),
        };
        let mut stack: Vec<(&'a Stmt<'a>, Path)> = vec![(body, Path::new())];
        while let Some((stmt, path)) = stack.pop() {
            match stmt.kind {
                StmtKind::Block { stmts, .. } => {
                    stack.extend(stmts.iter().rev().map(|stmt| (stmt, path.clone())));
                }
                StmtKind::Marker(inner) => stack.push((inner, path)),
                StmtKind::Try {
                    body,
                    catches,
                    finally,
                } => {
                    let region = scan.regions.len() as u32;
                    scan.regions.insert(core::ptr::from_ref(stmt), region);
                    let enter = |part| {
                        let mut inner = path.clone();
                        inner.push(Context { region, part });
                        inner
                    };
                    if let Some(finally) = finally {
                        stack.push((finally, enter(Part::Finally)));
                    }
                    for (i, clause) in catches.iter().enumerate().rev() {
                        stack.push((clause.body, enter(Part::Catch(i as u16))));
                    }
                    stack.push((body, enter(Part::Body)));
                }
                StmtKind::Label(label) => {
                    if scan.paths.insert(label, path).is_some() {
                        return Err(CompileError::UnsupportedOperand(format!(
                            "label L{} is placed twice",
                            label.0
                        )));
                    }
                }
                StmtKind::Goto(label) | StmtKind::ConditionalGoto { label, .. } => {
                    scan.targeted.insert(label);
                }
                StmtKind::Switch { targets, .. } => scan.targeted.extend(targets.iter().copied()),
                _ => {}
            }
        }
        Ok(scan)
    }
}

/// How a branch reaches its label.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Exit {
    /// Same region: a plain branch.
    Same,
    /// The label is in an enclosing region: `leave`.
    Leave,
}

#[derive(Copy, Clone, Debug)]
enum Condition {
    Always,
    IfTrue,
    IfFalse,
}

/// A branch operand waiting for its label to be placed.
#[derive(Copy, Clone, Debug)]
struct Fixup {
    index: usize,
    slot: usize,
    label: LabelId,
}

pub(super) struct EmittedBody {
    pub instructions: Vec<Instruction>,
    pub locals: Vec<TypeId>,
    pub max_stack: u32,
    pub regions: Vec<ExceptionRegion>,
    pub sequence_points: Vec<SequencePoint>,
}

pub(super) struct Emitter<'s, 'a> {
    symbols: &'s SymbolTable,
    tokens: &'s mut TokenTable,
    method: &'s MethodDef,
    locals: &'s LocalTable,
    options: &'s CompileOptions,
    slots: SlotMap,

    instructions: Vec<Instruction>,
    /// Current stack depth during emission
    current_stack_depth: u32,
    /// Maximum stack depth observed
    max_stack_size: u32,
    /// Whether the next instruction can execute.
    reachable: bool,

    scan: LabelScan<'a>,
    placed: HashMap<LabelId, u32>,
    fixups: Vec<Fixup>,
    contexts: Path,
    regions: Vec<ExceptionRegion>,
    sequence_points: Vec<SequencePoint>,

    /// Holds the value of a `return` inside a protected region until the
    /// shared exit.
    return_slot: Option<u16>,
    return_leaves: Vec<usize>,
}

impl<'s, 'a> Emitter<'s, 'a> {
    pub fn new(
        symbols: &'s SymbolTable,
        tokens: &'s mut TokenTable,
        method: MethodId,
        body: &'a Stmt<'a>,
        locals: &'s LocalTable,
        options: &'s CompileOptions,
    ) -> Result<Self, CompileError> {
        Ok(Self {
            symbols,
            tokens,
            method: symbols.method(method),
            locals,
            options,
            slots: SlotMap::allocate(body, locals)?,
            instructions: Vec::new(),
            current_stack_depth: 0,
            max_stack_size: 0,
            reachable: true,
            scan: LabelScan::new(body)?,
            placed: HashMap::new(),
            fixups: Vec::new(),
            contexts: Path::new(),
            regions: Vec::new(),
            sequence_points: Vec::new(),
            return_slot: None,
            return_leaves: Vec::new(),
        })
    }

    pub fn emit_body(mut self, body: &'a Stmt<'a>) -> Result<EmittedBody, CompileError> {
        self.emit_stmt(body)?;

        if self.reachable {
            if self.method.returns_value() {
                return Err(CompileError::UnsupportedOperand(format!(
                    "control reaches the end of `{}`, which returns a value",
                    self.method.name
                )));
            }
            self.emit_return()?;
        }
        if !self.return_leaves.is_empty() {
            let exit = self.label();
            for leave in core::mem::take(&mut self.return_leaves) {
                self.patch_jump(leave, exit)?;
            }
            self.current_stack_depth = 0;
            self.reachable = true;
            if let Some(slot) = self.return_slot {
                self.emit(Instruction::LoadLocal(slot))?;
            }
            self.emit_return()?;
        }

        for fixup in core::mem::take(&mut self.fixups) {
            let target = *self
                .placed
                .get(&fixup.label)
                .ok_or(CompileError::UndefinedLabel(fixup.label.0))?;
            self.instructions[fixup.index].targets_mut()[fixup.slot] = target;
        }

        Ok(EmittedBody {
            instructions: self.instructions,
            locals: self.slots.into_types(),
            max_stack: self.max_stack_size,
            regions: self.regions,
            sequence_points: self.sequence_points,
        })
    }

    // === Stack Management ===

    fn push_stack(&mut self) {
        self.current_stack_depth += 1;
        if self.current_stack_depth > self.max_stack_size {
            self.max_stack_size = self.current_stack_depth;
        }
    }

    fn pop_stack_n(&mut self, n: u32) -> Result<(), CompileError> {
        if self.current_stack_depth < n {
            return Err(CompileError::StackUnderflow {
                offset: self.instructions.len(),
            });
        }
        self.current_stack_depth -= n;
        Ok(())
    }

    // === Instruction Emission ===

    /// Appends an instruction and applies its stack effect.
    fn emit(&mut self, instruction: Instruction) -> Result<(), CompileError> {
        let effect = instruction.stack_effect();
        self.pop_stack_n(effect.pops)?;
        for _ in 0..effect.pushes {
            self.push_stack();
        }
        if instruction.ends_block() {
            self.reachable = false;
        }
        self.instructions.push(instruction);
        Ok(())
    }

    /// `ret` leaves exactly the return value on the stack.
    fn emit_return(&mut self) -> Result<(), CompileError> {
        let expected = self.method.returns_value() as u32;
        if self.current_stack_depth != expected {
            return Err(CompileError::StackImbalance {
                offset: self.instructions.len(),
                expected,
                actual: self.current_stack_depth,
            });
        }
        self.pop_stack_n(expected)?;
        self.emit(Instruction::Return)
    }

    fn label(&self) -> usize {
        self.instructions.len()
    }

    // === Jump Patching Infrastructure ===

    /// Emits a jump with a dummy target and returns its index for
    /// [`patch_jump`](Self::patch_jump).
    fn jump_placeholder(&mut self, make_jump: fn(u32) -> Instruction) -> Result<usize, CompileError> {
        let placeholder_index = self.instructions.len();
        self.emit(make_jump(0))?;
        Ok(placeholder_index)
    }

    fn patch_jump(&mut self, placeholder_index: usize, target_label: usize) -> Result<(), CompileError> {
        let target: u32 = target_label
            .try_into()
            .map_err(|_| CompileError::UnsupportedOperand(String::from("method body too large")))?;
        debug_assert_eq!(self.instructions[placeholder_index].targets().len(), 1);
        self.instructions[placeholder_index].targets_mut()[0] = target;
        Ok(())
    }

    /// Points branch operand `slot` of instruction `index` at `label`, now
    /// or once the label is placed.
    fn target_label(&mut self, index: usize, slot: usize, label: LabelId) {
        match self.placed.get(&label) {
            Some(target) => self.instructions[index].targets_mut()[slot] = *target,
            None => self.fixups.push(Fixup { index, slot, label }),
        }
    }

    fn place_label(&mut self, label: LabelId) -> Result<(), CompileError> {
        let here: u32 = self
            .label()
            .try_into()
            .map_err(|_| CompileError::UnsupportedOperand(String::from("method body too large")))?;
        self.placed.insert(label, here);
        if self.scan.targeted.contains(&label) {
            self.reachable = true;
        }
        self.current_stack_depth = 0;
        Ok(())
    }

    fn exit_kind(&self, label: LabelId) -> Result<Exit, CompileError> {
        let target = self
            .scan
            .paths
            .get(&label)
            .ok_or(CompileError::UndefinedLabel(label.0))?;
        let current = &self.contexts;
        if target.len() > current.len() || current[..target.len()] != target[..] {
            return Err(CompileError::BranchIntoProtectedRegion(label.0));
        }
        if target.len() == current.len() {
            return Ok(Exit::Same);
        }
        if current[target.len()..].iter().any(|context| context.part == Part::Finally) {
            return Err(CompileError::UnsupportedOperand(format!(
                "branch to L{} leaves a finally handler",
                label.0
            )));
        }
        Ok(Exit::Leave)
    }

    /// Branch to a bound label; the condition, if any, is on the stack.
    fn branch(&mut self, label: LabelId, condition: Condition) -> Result<(), CompileError> {
        let exit = self.exit_kind(label)?;
        let index = match (condition, exit) {
            (Condition::Always, Exit::Same) => self.jump_placeholder(Instruction::Branch)?,
            (Condition::IfTrue, Exit::Same) => self.jump_placeholder(Instruction::BranchTrue)?,
            (Condition::IfFalse, Exit::Same) => self.jump_placeholder(Instruction::BranchFalse)?,
            (Condition::Always, Exit::Leave) => self.jump_placeholder(Instruction::Leave)?,
            (Condition::IfTrue | Condition::IfFalse, Exit::Leave) => {
                // Conditional leave: skip an unconditional one.
                let skip = match condition {
                    Condition::IfTrue => self.jump_placeholder(Instruction::BranchFalse)?,
                    _ => self.jump_placeholder(Instruction::BranchTrue)?,
                };
                let leave = self.jump_placeholder(Instruction::Leave)?;
                let after = self.label();
                self.patch_jump(skip, after)?;
                self.reachable = true;
                leave
            }
        };
        self.target_label(index, 0, label);
        Ok(())
    }

    // === Symbol Resolution ===

    fn type_token(&mut self, ty: TypeId) -> Result<Token, CompileError> {
        self.tokens.type_token(self.symbols, ty)
    }

    fn method_token(&mut self, method: MethodId) -> Result<Token, CompileError> {
        self.tokens.method(self.symbols, method)
    }

    fn field_token(&mut self, field: crate::symbols::FieldId) -> Result<Token, CompileError> {
        self.tokens.field(self.symbols, field)
    }

    fn shape(&self, method: MethodId, args: usize) -> Result<CallShape, CompileError> {
        let def = self.symbols.method(method);
        Ok(CallShape {
            args: arg_count(args)?,
            has_this: def.has_this(),
            returns: def.returns_value(),
        })
    }

    fn call_well_known(&mut self, member: WellKnownMember, args: usize) -> Result<(), CompileError> {
        let method = self.symbols.well_known_method(member)?;
        let token = self.method_token(method)?;
        let shape = self.shape(method, args)?;
        self.emit(Instruction::Call(token, shape))
    }

    fn param(&self, index: u16, span: Span) -> Result<(u16, &'s Param), CompileError> {
        let method = self.method;
        let param = method
            .params
            .get(index as usize)
            .ok_or_else(|| CompileError::unexpected(Stage::Emit, "parameter", span))?;
        Ok((index + method.has_this() as u16, param))
    }

    fn primitive_kind(&self, ty: TypeId) -> Option<PrimitiveKind> {
        self.symbols
            .primitive_of(ty)
            .filter(|prim| !prim.is_nullable())
            .map(|prim| prim.kind())
    }

    fn array_shape(&self, array: TypeId) -> Result<(TypeId, u8), CompileError> {
        self.symbols.array_info(array).ok_or_else(|| {
            CompileError::UnsupportedOperand(format!("`{}` is not an array", self.symbols.type_name(array)))
        })
    }

    // === Statements ===

    fn emit_stmt(&mut self, stmt: &'a Stmt<'a>) -> Result<(), CompileError> {
        match stmt.kind {
            StmtKind::Block { stmts, .. } => {
                for stmt in stmts {
                    self.emit_stmt(stmt)?;
                }
            }
            StmtKind::Expression(expr) => self.emit_effect(expr)?,
            StmtKind::Label(label) => self.place_label(label)?,
            StmtKind::Goto(label) => self.branch(label, Condition::Always)?,
            StmtKind::ConditionalGoto { cond, jump_if, label } => {
                self.emit_expr(cond)?;
                let condition = if jump_if { Condition::IfTrue } else { Condition::IfFalse };
                self.branch(label, condition)?;
            }
            StmtKind::Switch { value, targets } => self.emit_switch(value, targets)?,
            StmtKind::Return(value) => self.emit_return_stmt(value)?,
            StmtKind::Throw(Some(exception)) => {
                self.emit_expr(exception)?;
                self.emit(Instruction::Throw)?;
            }
            StmtKind::Throw(None) => {
                let handler = self
                    .contexts
                    .iter()
                    .rev()
                    .find(|context| context.part != Part::Body);
                if !matches!(handler, Some(Context { part: Part::Catch(_), .. })) {
                    return Err(CompileError::RethrowOutsideCatch);
                }
                self.emit(Instruction::Rethrow)?;
            }
            StmtKind::Try {
                body,
                catches,
                finally,
            } => self.emit_try(stmt, body, catches, finally)?,
            StmtKind::Marker(inner) => {
                self.sequence_points.push(SequencePoint {
                    offset: self.label() as u32,
                    span: inner.span,
                });
                if self.options.is_debug() {
                    self.emit(Instruction::Nop)?;
                }
                self.emit_stmt(inner)?;
            }
            _ => return Err(CompileError::unexpected(Stage::Emit, stmt.node_name(), stmt.span)),
        }
        if self.current_stack_depth != 0 {
            return Err(CompileError::StackImbalance {
                offset: self.label(),
                expected: 0,
                actual: self.current_stack_depth,
            });
        }
        Ok(())
    }

    fn emit_switch(&mut self, value: &'a Expr<'a>, targets: &[LabelId]) -> Result<(), CompileError> {
        self.emit_expr(value)?;
        let index = self.label();
        self.emit(Instruction::Switch(vec![0; targets.len()]))?;

        let mut stubs = SmallVec::<[(usize, LabelId); 4]>::new();
        for (slot, label) in targets.iter().enumerate() {
            match self.exit_kind(*label)? {
                Exit::Same => self.target_label(index, slot, *label),
                Exit::Leave => stubs.push((slot, *label)),
            }
        }
        if stubs.is_empty() {
            return Ok(());
        }

        // Targets outside the current region go through `leave` stubs.
        let over = self.jump_placeholder(Instruction::Branch)?;
        for (slot, label) in stubs {
            let stub = self.label();
            self.instructions[index].targets_mut()[slot] = stub as u32;
            let leave = self.jump_placeholder(Instruction::Leave)?;
            self.target_label(leave, 0, label);
        }
        let after = self.label();
        self.patch_jump(over, after)?;
        self.reachable = true;
        Ok(())
    }

    fn emit_return_stmt(&mut self, value: Option<&'a Expr<'a>>) -> Result<(), CompileError> {
        if self.contexts.is_empty() {
            if let Some(value) = value {
                self.emit_expr(value)?;
            }
            return self.emit_return();
        }
        if self.contexts.iter().any(|context| context.part == Part::Finally) {
            return Err(CompileError::UnsupportedOperand(String::from(
                "return inside a finally handler",
            )));
        }
        if let Some(value) = value {
            self.emit_expr(value)?;
            let slot = match self.return_slot {
                Some(slot) => slot,
                None => {
                    let slot = self.slots.temp(self.method.ret)?;
                    self.return_slot = Some(slot);
                    slot
                }
            };
            self.emit(Instruction::StoreLocal(slot))?;
        }
        let leave = self.jump_placeholder(Instruction::Leave)?;
        self.return_leaves.push(leave);
        Ok(())
    }

    fn emit_try(
        &mut self,
        stmt: &'a Stmt<'a>,
        body: &'a Stmt<'a>,
        catches: &'a [crate::bound::CatchClause<'a>],
        finally: Option<&'a Stmt<'a>>,
    ) -> Result<(), CompileError> {
        let region = *self
            .scan
            .regions
            .get(&core::ptr::from_ref(stmt))
            .ok_or_else(|| CompileError::unexpected(Stage::Emit, stmt.node_name(), stmt.span))?;
        let mut leaves = Vec::new();

        let try_start = self.label() as u32;
        self.contexts.push(Context {
            region,
            part: Part::Body,
        });
        self.emit_stmt(body)?;
        if self.reachable {
            leaves.push(self.jump_placeholder(Instruction::Leave)?);
        }
        self.contexts.pop();
        let try_end = self.label() as u32;

        for (i, clause) in catches.iter().enumerate() {
            let handler_start = self.label() as u32;
            self.contexts.push(Context {
                region,
                part: Part::Catch(i as u16),
            });
            // The handler starts with the exception on the stack.
            self.reachable = true;
            self.current_stack_depth = 0;
            self.push_stack();
            match clause.local {
                Some(local) => {
                    let slot = self.slots.slot(local, self.locals)?;
                    self.emit(Instruction::StoreLocal(slot))?;
                }
                None => self.emit(Instruction::Pop)?,
            }
            self.emit_stmt(clause.body)?;
            if self.reachable {
                leaves.push(self.jump_placeholder(Instruction::Leave)?);
            }
            self.contexts.pop();
            let token = self.type_token(clause.exception_type)?;
            self.regions.push(ExceptionRegion {
                kind: RegionKind::Catch(token),
                try_start,
                try_end,
                handler_start,
                handler_end: self.label() as u32,
            });
        }

        if let Some(finally) = finally {
            // Protects the body and every catch handler.
            let protected_end = self.label() as u32;
            self.contexts.push(Context {
                region,
                part: Part::Finally,
            });
            self.reachable = true;
            self.current_stack_depth = 0;
            self.emit_stmt(finally)?;
            if self.reachable {
                self.emit(Instruction::EndFinally)?;
            }
            self.contexts.pop();
            self.regions.push(ExceptionRegion {
                kind: RegionKind::Finally,
                try_start,
                try_end: protected_end,
                handler_start: protected_end,
                handler_end: self.label() as u32,
            });
        }

        let end = self.label();
        self.reachable = !leaves.is_empty();
        for leave in leaves {
            self.patch_jump(leave, end)?;
        }
        self.current_stack_depth = 0;
        Ok(())
    }

    // === Expressions ===

    /// Evaluates `expr` for its side effects only.
    fn emit_effect(&mut self, expr: &'a Expr<'a>) -> Result<(), CompileError> {
        match expr.kind {
            ExprKind::Assignment { target, value } => self.emit_assignment(target, value, false),
            ExprKind::Sequence { effects, value } => {
                for effect in effects {
                    self.emit_effect(effect)?;
                }
                self.emit_effect(value)
            }
            _ => {
                let before = self.current_stack_depth;
                self.emit_expr(expr)?;
                if self.current_stack_depth > before {
                    self.emit(Instruction::Pop)?;
                }
                Ok(())
            }
        }
    }

    /// Pushes the value of `expr`, or nothing for void expressions.
    fn emit_expr(&mut self, expr: &'a Expr<'a>) -> Result<(), CompileError> {
        match expr.kind {
            ExprKind::Literal(value) => self.emit_constant(value, expr.ty),
            ExprKind::Default => self.emit_default(expr.ty),
            ExprKind::Local(local) => {
                let slot = self.slots.slot(local, self.locals)?;
                self.emit(Instruction::LoadLocal(slot))
            }
            ExprKind::Parameter(index) => {
                let (slot, param) = self.param(index, expr.span)?;
                if param.by_ref {
                    return Err(CompileError::UnsupportedOperand(format!(
                        "by-reference parameter `{}` used as a value",
                        param.name
                    )));
                }
                self.emit(Instruction::LoadArg(slot))
            }
            ExprKind::This => {
                if !self.method.has_this() {
                    return Err(CompileError::unexpected(Stage::Emit, "this", expr.span));
                }
                if self.symbols.is_value_type(self.method.owner) {
                    return Err(CompileError::UnsupportedOperand(String::from(
                        "`this` of a value type used as a value",
                    )));
                }
                self.emit(Instruction::LoadArg(0))
            }
            ExprKind::Binary { .. } => self.emit_binary_chain(expr),
            ExprKind::Unary { op, operand } => {
                self.emit_expr(operand)?;
                match op {
                    UnaryOp::Neg => self.emit(Instruction::Neg),
                    UnaryOp::Not => self.emit(Instruction::Not),
                    UnaryOp::LogicalNot => {
                        self.emit(Instruction::LoadInt32(0))?;
                        self.emit(Instruction::CompareEqual)
                    }
                }
            }
            ExprKind::Conversion { operand, kind } => self.emit_conversion(expr, operand, kind),
            ExprKind::Conditional {
                cond,
                when_true,
                when_false,
            } => {
                self.emit_expr(cond)?;
                let to_else = self.jump_placeholder(Instruction::BranchFalse)?;
                let base = self.current_stack_depth;
                self.emit_expr(when_true)?;
                let to_end = self.jump_placeholder(Instruction::Branch)?;
                let else_label = self.label();
                self.patch_jump(to_else, else_label)?;
                let true_depth = self.current_stack_depth;
                self.current_stack_depth = base;
                self.reachable = true;
                self.emit_expr(when_false)?;
                // Both arms must leave the same stack at the join.
                if self.current_stack_depth != true_depth {
                    return Err(CompileError::StackImbalance {
                        offset: self.instructions.len(),
                        expected: true_depth,
                        actual: self.current_stack_depth,
                    });
                }
                let end = self.label();
                self.patch_jump(to_end, end)?;
                self.reachable = true;
                Ok(())
            }
            ExprKind::Call {
                receiver,
                method,
                args,
            } => self.emit_call(receiver, method, args, expr.span),
            ExprKind::ObjectCreation { ctor, args } => {
                self.emit_args(ctor, args)?;
                let token = self.method_token(ctor)?;
                let shape = self.shape(ctor, args.len())?;
                self.emit(Instruction::NewObject(token, shape))
            }
            ExprKind::FieldAccess { receiver, field } => {
                let token = self.field_token(field)?;
                match receiver {
                    Some(receiver) => {
                        self.emit_instance(receiver)?;
                        self.emit(Instruction::LoadField(token))
                    }
                    None => self.emit(Instruction::LoadStaticField(token)),
                }
            }
            ExprKind::ArrayElement { array, indices } => {
                let (element, rank) = self.array_shape(array.ty)?;
                self.emit_expr(array)?;
                for index in indices {
                    self.emit_expr(index)?;
                }
                if rank <= 1 {
                    let token = self.type_token(element)?;
                    self.emit(Instruction::LoadElement(token))
                } else {
                    self.call_intrinsic(array.ty, "Get", indices.len(), true)
                }
            }
            ExprKind::ArrayLength { array } => {
                let (_, rank) = self.array_shape(array.ty)?;
                self.emit_expr(array)?;
                if rank <= 1 {
                    self.emit(Instruction::LoadLength)
                } else {
                    self.call_intrinsic(array.ty, "get_Length", 0, true)
                }
            }
            ExprKind::ArrayCreation {
                element,
                sizes,
                initializer,
            } => self.emit_array_creation(expr.ty, element, sizes, initializer),
            ExprKind::SpanFromArray { array, ctor } => {
                if self.try_wrap_bytes(array, ctor)? {
                    return Ok(());
                }
                self.emit_expr(array)?;
                let token = self.method_token(ctor)?;
                let shape = self.shape(ctor, 1)?;
                self.emit(Instruction::NewObject(token, shape))
            }
            ExprKind::Assignment { target, value } => self.emit_assignment(target, value, true),
            ExprKind::Sequence { effects, value } => {
                for effect in effects {
                    self.emit_effect(effect)?;
                }
                self.emit_expr(value)
            }
            ExprKind::Throw { exception } => {
                self.emit_expr(exception)?;
                self.emit(Instruction::Throw)?;
                // The consumer still accounts for a value.
                if !expr.is_void() {
                    self.push_stack();
                }
                Ok(())
            }
            ExprKind::CompoundAssignment { .. } | ExprKind::AnonymousObject { .. } | ExprKind::Await { .. } => {
                Err(CompileError::unexpected(Stage::Emit, expr.node_name(), expr.span))
            }
        }
    }

    fn emit_constant(&mut self, value: ConstantValue<'a>, ty: TypeId) -> Result<(), CompileError> {
        use ConstantValue as V;
        let instruction = match value {
            V::Null if self.symbols.is_value_type(ty) => return self.emit_default(ty),
            V::Null => Instruction::LoadNull,
            V::Bool(v) => Instruction::LoadInt32(v as i32),
            V::Char(v) | V::UInt16(v) => Instruction::LoadInt32(v as i32),
            V::SByte(v) => Instruction::LoadInt32(v as i32),
            V::Byte(v) => Instruction::LoadInt32(v as i32),
            V::Int16(v) => Instruction::LoadInt32(v as i32),
            V::Int32(v) => Instruction::LoadInt32(v),
            V::UInt32(v) => Instruction::LoadInt32(v as i32),
            V::Int64(v) => Instruction::LoadInt64(v),
            V::UInt64(v) => Instruction::LoadInt64(v as i64),
            V::NInt(v) => {
                self.emit(Instruction::LoadInt64(v))?;
                Instruction::Convert(NumericTarget::I)
            }
            V::NUInt(v) => {
                self.emit(Instruction::LoadInt64(v as i64))?;
                Instruction::Convert(NumericTarget::U)
            }
            V::Single(v) => Instruction::LoadFloat32(v.to_bits()),
            V::Double(v) => Instruction::LoadFloat64(v.to_bits()),
            V::String(s) => Instruction::LoadString(self.tokens.user_string(s)),
            V::Decimal(d) => return self.emit_decimal(d),
        };
        self.emit(instruction)
    }

    fn emit_decimal(&mut self, value: DecimalValue) -> Result<(), CompileError> {
        for part in [
            value.lo as i32,
            value.mid as i32,
            value.hi as i32,
            value.negative as i32,
            value.scale as i32,
        ] {
            self.emit(Instruction::LoadInt32(part))?;
        }
        let ctor = self.symbols.well_known_method(WellKnownMember::DecimalCtor)?;
        let token = self.method_token(ctor)?;
        let shape = self.shape(ctor, 5)?;
        self.emit(Instruction::NewObject(token, shape))
    }

    fn emit_default(&mut self, ty: TypeId) -> Result<(), CompileError> {
        match self.primitive_kind(ty) {
            Some(kind) if kind.is_reference() => self.emit(Instruction::LoadNull),
            Some(kind) => self.emit_constant(ConstantValue::default_of(kind), ty),
            None if self.symbols.is_value_type(ty) => {
                let slot = self.slots.temp(ty)?;
                let token = self.type_token(ty)?;
                self.emit(Instruction::LoadLocalAddress(slot))?;
                self.emit(Instruction::InitObject(token))?;
                self.emit(Instruction::LoadLocal(slot))
            }
            None => self.emit(Instruction::LoadNull),
        }
    }

    /// Left-leaning chains are emitted with a loop; only right operands
    /// recurse.
    fn emit_binary_chain(&mut self, expr: &'a Expr<'a>) -> Result<(), CompileError> {
        let spine = left_spine(expr);
        self.emit_expr(spine.leaf)?;
        for node in spine.nodes {
            let ExprKind::Binary {
                op,
                operand_ty,
                right,
                ..
            } = node.kind
            else {
                return Err(CompileError::unexpected(Stage::Emit, node.node_name(), node.span));
            };
            if op.is_logical() {
                // Keep the left value as the result when it decides.
                self.emit(Instruction::Dup)?;
                let skip = if op == BinaryOp::LogicalAnd {
                    self.jump_placeholder(Instruction::BranchFalse)?
                } else {
                    self.jump_placeholder(Instruction::BranchTrue)?
                };
                self.emit(Instruction::Pop)?;
                self.emit_expr(right)?;
                let end = self.label();
                self.patch_jump(skip, end)?;
            } else {
                self.emit_expr(right)?;
                self.emit_operator(op, operand_ty)?;
            }
        }
        Ok(())
    }

    fn emit_operator(&mut self, op: BinaryOp, operand_ty: TypeId) -> Result<(), CompileError> {
        use Instruction as I;

        let prim = self.symbols.primitive_of(operand_ty);
        if prim.is_some_and(|prim| prim.is_nullable()) {
            return Err(CompileError::UnsupportedOperand(format!(
                "lifted operator on `{}`",
                self.symbols.type_name(operand_ty)
            )));
        }
        let kind = prim.map(|prim| prim.kind());
        let numeric = kind.is_some_and(|kind| !kind.is_reference());
        if kind == Some(PrimitiveKind::Decimal) || (!numeric && !matches!(op, BinaryOp::Eq | BinaryOp::Ne)) {
            return Err(CompileError::UnsupportedOperand(format!(
                "operator {:?} on `{}`",
                op,
                self.symbols.type_name(operand_ty)
            )));
        }
        let unsigned = kind.is_some_and(|kind| kind.is_unsigned_integral());
        let unordered = unsigned || kind.is_some_and(|kind| kind.is_floating());

        let (first, negate) = match op {
            BinaryOp::Add => (I::Add, false),
            BinaryOp::Sub => (I::Sub, false),
            BinaryOp::Mul => (I::Mul, false),
            BinaryOp::Div if unsigned => (I::DivUnsigned, false),
            BinaryOp::Div => (I::Div, false),
            BinaryOp::Rem if unsigned => (I::RemUnsigned, false),
            BinaryOp::Rem => (I::Rem, false),
            BinaryOp::And => (I::And, false),
            BinaryOp::Or => (I::Or, false),
            BinaryOp::Xor => (I::Xor, false),
            BinaryOp::Shl => (I::Shl, false),
            BinaryOp::Shr if unsigned => (I::ShrUnsigned, false),
            BinaryOp::Shr => (I::Shr, false),
            BinaryOp::Eq => (I::CompareEqual, false),
            BinaryOp::Ne => (I::CompareEqual, true),
            BinaryOp::Lt if unsigned => (I::CompareLessUnsigned, false),
            BinaryOp::Lt => (I::CompareLess, false),
            BinaryOp::Gt if unsigned => (I::CompareGreaterUnsigned, false),
            BinaryOp::Gt => (I::CompareGreater, false),
            // `a <= b` is `!(a > b)`; for floats the unordered compare keeps
            // NaN operands false.
            BinaryOp::Le if unordered => (I::CompareGreaterUnsigned, true),
            BinaryOp::Le => (I::CompareGreater, true),
            BinaryOp::Ge if unordered => (I::CompareLessUnsigned, true),
            BinaryOp::Ge => (I::CompareLess, true),
            BinaryOp::LogicalAnd | BinaryOp::LogicalOr => {
                return Err(CompileError::UnsupportedOperand(String::from(
                    "logical operator outside a chain",
                )));
            }
        };
        self.emit(first)?;
        if negate {
            self.emit(I::LoadInt32(0))?;
            self.emit(I::CompareEqual)?;
        }
        Ok(())
    }

    fn emit_conversion(
        &mut self,
        expr: &'a Expr<'a>,
        operand: &'a Expr<'a>,
        kind: ConversionKind,
    ) -> Result<(), CompileError> {
        let (from, to) = (operand.ty, expr.ty);
        match kind {
            ConversionKind::Identity | ConversionKind::ImplicitReference => self.emit_expr(operand),
            ConversionKind::ExplicitReference => {
                self.emit_expr(operand)?;
                let token = self.type_token(to)?;
                self.emit(Instruction::CastClass(token))
            }
            ConversionKind::Boxing => {
                self.emit_expr(operand)?;
                let token = self.type_token(from)?;
                self.emit(Instruction::Box(token))
            }
            ConversionKind::Unboxing => {
                self.emit_expr(operand)?;
                let token = self.type_token(to)?;
                self.emit(Instruction::UnboxAny(token))
            }
            ConversionKind::ImplicitNumeric | ConversionKind::ExplicitNumeric => {
                self.emit_expr(operand)?;
                self.emit_numeric(from, to)
            }
            ConversionKind::ImplicitNullable | ConversionKind::ExplicitNullable => {
                self.emit_nullable(operand, from, to)
            }
            ConversionKind::NoConversion => Err(self.missing_conversion(from, to)),
        }
    }

    fn missing_conversion(&self, from: TypeId, to: TypeId) -> CompileError {
        CompileError::MissingConversion {
            from: self.symbols.type_name(from),
            to: self.symbols.type_name(to),
        }
    }

    /// Converts the numeric value on the stack.
    fn emit_numeric(&mut self, from: TypeId, to: TypeId) -> Result<(), CompileError> {
        let (Some(source), Some(target)) = (self.primitive_kind(from), self.primitive_kind(to)) else {
            return Err(self.missing_conversion(from, to));
        };
        if source == target {
            return Ok(());
        }

        if target == PrimitiveKind::Decimal {
            let helper = if source.is_floating() {
                if source == PrimitiveKind::Single {
                    self.emit(Instruction::Convert(NumericTarget::R8))?;
                }
                WellKnownMember::DecimalFromDouble
            } else if source.is_unsigned_integral() {
                self.emit(Instruction::Convert(NumericTarget::U8))?;
                WellKnownMember::DecimalFromUInt64
            } else {
                self.emit(Instruction::Convert(NumericTarget::I8))?;
                WellKnownMember::DecimalFromInt64
            };
            return self.call_well_known(helper, 1);
        }

        if source == PrimitiveKind::Decimal {
            let (helper, wide) = if target.is_floating() {
                (WellKnownMember::DecimalToDouble, PrimitiveKind::Double)
            } else if target.is_unsigned_integral() {
                (WellKnownMember::DecimalToUInt64, PrimitiveKind::UInt64)
            } else {
                (WellKnownMember::DecimalToInt64, PrimitiveKind::Int64)
            };
            let target_op = numeric_target(target).ok_or_else(|| self.missing_conversion(from, to))?;
            self.call_well_known(helper, 1)?;
            if target != wide {
                self.emit(Instruction::Convert(target_op))?;
            }
            return Ok(());
        }

        let target_op = numeric_target(target).ok_or_else(|| self.missing_conversion(from, to))?;
        if source.is_unsigned_integral() && target.is_floating() {
            self.emit(Instruction::Convert(NumericTarget::RUn))?;
        }
        self.emit(Instruction::Convert(target_op))
    }

    fn emit_nullable(&mut self, operand: &'a Expr<'a>, from: TypeId, to: TypeId) -> Result<(), CompileError> {
        if matches!(operand.kind, ExprKind::Literal(ConstantValue::Null)) {
            return self.emit_default(to);
        }
        let (Some(source), Some(target)) = (self.symbols.primitive_of(from), self.symbols.primitive_of(to)) else {
            return Err(self.missing_conversion(from, to));
        };
        match (source.is_nullable(), target.is_nullable()) {
            (false, true) => {
                self.emit_expr(operand)?;
                self.emit_numeric(from, TypeId::primitive(target.underlying()))?;
                let ctor = self.tokens.member_ref(to, ".ctor");
                self.emit(Instruction::NewObject(
                    ctor,
                    CallShape {
                        args: 1,
                        has_this: true,
                        returns: false,
                    },
                ))
            }
            (true, false) => {
                self.emit_address(operand)?;
                self.call_intrinsic(from, "get_Value", 0, true)?;
                self.emit_numeric(TypeId::primitive(source.underlying()), to)
            }
            (true, true) if source.underlying() == target.underlying() => self.emit_expr(operand),
            _ => Err(CompileError::UnsupportedOperand(format!(
                "lifted conversion from `{}` to `{}`",
                self.symbols.type_name(from),
                self.symbols.type_name(to)
            ))),
        }
    }

    /// Calls a member of an array or nullable type by name.
    fn call_intrinsic(&mut self, owner: TypeId, name: &str, args: usize, returns: bool) -> Result<(), CompileError> {
        let token = self.tokens.member_ref(owner, name);
        self.emit(Instruction::Call(
            token,
            CallShape {
                args: arg_count(args)?,
                has_this: true,
                returns,
            },
        ))
    }

    fn emit_call(
        &mut self,
        receiver: Option<&'a Expr<'a>>,
        method: MethodId,
        args: &'a [Expr<'a>],
        span: Span,
    ) -> Result<(), CompileError> {
        let symbols = self.symbols;
        let def = symbols.method(method);
        let mut value_receiver = false;
        match (def.has_this(), receiver) {
            (true, Some(receiver)) => {
                value_receiver = self.symbols.is_value_type(receiver.ty);
                self.emit_receiver(receiver, def.owner)?;
            }
            (false, None) => {}
            _ => return Err(CompileError::unexpected(Stage::Emit, "call", span)),
        }
        self.emit_args(method, args)?;
        let token = self.method_token(method)?;
        let shape = self.shape(method, args.len())?;
        if def.flags.contains(MethodFlags::VIRTUAL) && !value_receiver {
            self.emit(Instruction::CallVirtual(token, shape))
        } else {
            self.emit(Instruction::Call(token, shape))
        }
    }

    fn emit_args(&mut self, method: MethodId, args: &'a [Expr<'a>]) -> Result<(), CompileError> {
        let symbols = self.symbols;
        let params = &symbols.method(method).params;
        for (i, arg) in args.iter().enumerate() {
            if params.get(i).is_some_and(|param| param.by_ref) {
                self.emit_address(arg)?;
            } else {
                self.emit_expr(arg)?;
            }
        }
        Ok(())
    }

    /// Receiver of a call on a member of `owner`: value types are passed by
    /// address, or boxed when the member belongs to a reference type.
    fn emit_receiver(&mut self, receiver: &'a Expr<'a>, owner: TypeId) -> Result<(), CompileError> {
        if !self.symbols.is_value_type(receiver.ty) {
            return self.emit_expr(receiver);
        }
        if self.symbols.is_value_type(owner) {
            return self.emit_address(receiver);
        }
        self.emit_expr(receiver)?;
        let token = self.type_token(receiver.ty)?;
        self.emit(Instruction::Box(token))
    }

    /// Receiver of a field access.
    fn emit_instance(&mut self, receiver: &'a Expr<'a>) -> Result<(), CompileError> {
        if self.symbols.is_value_type(receiver.ty) {
            self.emit_address(receiver)
        } else {
            self.emit_expr(receiver)
        }
    }

    /// Pushes the address of `expr`, spilling to a temp when it has none.
    fn emit_address(&mut self, expr: &'a Expr<'a>) -> Result<(), CompileError> {
        match expr.kind {
            ExprKind::Local(local) => {
                let slot = self.slots.slot(local, self.locals)?;
                self.emit(Instruction::LoadLocalAddress(slot))
            }
            ExprKind::Parameter(index) => {
                let (slot, param) = self.param(index, expr.span)?;
                if param.by_ref {
                    self.emit(Instruction::LoadArg(slot))
                } else {
                    self.emit(Instruction::LoadArgAddress(slot))
                }
            }
            ExprKind::This if self.method.has_this() => {
                if self.symbols.is_value_type(self.method.owner) {
                    self.emit(Instruction::LoadArg(0))
                } else {
                    self.emit(Instruction::LoadArgAddress(0))
                }
            }
            ExprKind::FieldAccess {
                receiver: Some(receiver),
                field,
            } => {
                self.emit_instance(receiver)?;
                let token = self.field_token(field)?;
                self.emit(Instruction::LoadFieldAddress(token))
            }
            ExprKind::FieldAccess { receiver: None, field } => {
                let token = self.field_token(field)?;
                self.emit(Instruction::LoadStaticFieldAddress(token))
            }
            ExprKind::ArrayElement { array, indices } => {
                let (element, rank) = self.array_shape(array.ty)?;
                self.emit_expr(array)?;
                for index in indices {
                    self.emit_expr(index)?;
                }
                if rank <= 1 {
                    let token = self.type_token(element)?;
                    self.emit(Instruction::LoadElementAddress(token))
                } else {
                    self.call_intrinsic(array.ty, "Address", indices.len(), true)
                }
            }
            _ => {
                self.emit_expr(expr)?;
                let slot = self.slots.temp(expr.ty)?;
                self.emit(Instruction::StoreLocal(slot))?;
                self.emit(Instruction::LoadLocalAddress(slot))
            }
        }
    }

    /// Stores `value` into `target`, leaving a copy on the stack when `used`.
    fn emit_assignment(&mut self, target: &'a Expr<'a>, value: &'a Expr<'a>, used: bool) -> Result<(), CompileError> {
        match target.kind {
            ExprKind::Local(local) => {
                let slot = self.slots.slot(local, self.locals)?;
                self.emit_expr(value)?;
                if used {
                    self.emit(Instruction::Dup)?;
                }
                self.emit(Instruction::StoreLocal(slot))
            }
            ExprKind::Parameter(index) => {
                let (slot, param) = self.param(index, target.span)?;
                if param.by_ref {
                    return Err(CompileError::UnsupportedOperand(format!(
                        "store through by-reference parameter `{}`",
                        param.name
                    )));
                }
                self.emit_expr(value)?;
                if used {
                    self.emit(Instruction::Dup)?;
                }
                self.emit(Instruction::StoreArg(slot))
            }
            ExprKind::FieldAccess { receiver: None, field } => {
                let token = self.field_token(field)?;
                self.emit_expr(value)?;
                if used {
                    self.emit(Instruction::Dup)?;
                }
                self.emit(Instruction::StoreStaticField(token))
            }
            ExprKind::FieldAccess {
                receiver: Some(receiver),
                field,
            } => {
                let token = self.field_token(field)?;
                self.emit_instance(receiver)?;
                self.emit_expr(value)?;
                let kept = self.keep_copy(value.ty, used)?;
                self.emit(Instruction::StoreField(token))?;
                self.reload(kept)
            }
            ExprKind::ArrayElement { array, indices } => {
                let (element, rank) = self.array_shape(array.ty)?;
                self.emit_expr(array)?;
                for index in indices {
                    self.emit_expr(index)?;
                }
                self.emit_expr(value)?;
                let kept = self.keep_copy(value.ty, used)?;
                if rank <= 1 {
                    let token = self.type_token(element)?;
                    self.emit(Instruction::StoreElement(token))?;
                } else {
                    self.call_intrinsic(array.ty, "Set", indices.len() + 1, false)?;
                }
                self.reload(kept)
            }
            _ => Err(CompileError::unexpected(Stage::Emit, target.node_name(), target.span)),
        }
    }

    /// Copies the value on top of the stack into a temp when `used`.
    fn keep_copy(&mut self, ty: TypeId, used: bool) -> Result<Option<u16>, CompileError> {
        if !used {
            return Ok(None);
        }
        let slot = self.slots.temp(ty)?;
        self.emit(Instruction::Dup)?;
        self.emit(Instruction::StoreLocal(slot))?;
        Ok(Some(slot))
    }

    fn reload(&mut self, kept: Option<u16>) -> Result<(), CompileError> {
        match kept {
            Some(slot) => self.emit(Instruction::LoadLocal(slot)),
            None => Ok(()),
        }
    }

    // === Arrays ===

    fn emit_array_creation(
        &mut self,
        array_ty: TypeId,
        element: TypeId,
        sizes: &'a [Expr<'a>],
        initializer: Option<ArrayInitializer<'a>>,
    ) -> Result<(), CompileError> {
        let rank = sizes.len();
        for size in sizes {
            self.emit_expr(size)?;
        }
        if rank <= 1 {
            let token = self.type_token(element)?;
            self.emit(Instruction::NewArray(token))?;
        } else {
            let ctor = self.tokens.member_ref(array_ty, ".ctor");
            self.emit(Instruction::NewObject(
                ctor,
                CallShape {
                    args: arg_count(rank)?,
                    has_this: true,
                    returns: false,
                },
            ))?;
        }

        let Some(init) = initializer else {
            return Ok(());
        };
        let leaves = array_init::leaves(&init);
        let plan = array_init::plan(&leaves, self.primitive_kind(element));
        let blob = match (plan.strategy, plan.blob) {
            (ArrayStrategy::Block | ArrayStrategy::Mixed, Some(blob)) => Some(blob),
            _ => None,
        };
        let store_constants = blob.is_none();
        if let Some(blob) = blob {
            let token = self.tokens.blob(blob);
            self.emit(Instruction::Dup)?;
            self.emit(Instruction::LoadToken(token))?;
            self.call_well_known(WellKnownMember::InitializeArray, 2)?;
        }

        for leaf in &leaves {
            if array_init::is_default(leaf.value) || (!store_constants && leaf.constant().is_some()) {
                continue;
            }
            self.emit(Instruction::Dup)?;
            for index in &leaf.indices {
                self.emit(Instruction::LoadInt32(*index))?;
            }
            self.emit_expr(leaf.value)?;
            if rank <= 1 {
                let token = self.type_token(element)?;
                self.emit(Instruction::StoreElement(token))?;
            } else {
                self.call_intrinsic(array_ty, "Set", rank + 1, false)?;
            }
        }
        Ok(())
    }

    /// Read-only byte view over constant data without allocating an array.
    fn try_wrap_bytes(&mut self, array: &'a Expr<'a>, ctor: MethodId) -> Result<bool, CompileError> {
        let ExprKind::ArrayCreation {
            element,
            sizes: [size],
            initializer: Some(init),
        } = array.kind
        else {
            return Ok(false);
        };
        let kind = self.primitive_kind(element);
        if !array_init::can_wrap_bytes(kind) {
            return Ok(false);
        }
        let Ok(from_pointer) = self.symbols.well_known_method(WellKnownMember::ByteSpanFromPointer) else {
            return Ok(false);
        };
        if self.symbols.method(from_pointer).owner != self.symbols.method(ctor).owner {
            return Ok(false);
        }
        let leaves = array_init::leaves(&init);
        let declared = array_init::constant_of(size).and_then(|value| value.convert(PrimitiveKind::Int64));
        if declared != Some(ConstantValue::Int64(leaves.len() as i64))
            || !leaves.iter().all(|leaf| leaf.constant().is_some())
        {
            return Ok(false);
        }
        let Some(bytes) = kind.and_then(|kind| array_init::blob(&leaves, kind)) else {
            return Ok(false);
        };
        let Ok(length) = i32::try_from(bytes.len()) else {
            return Ok(false);
        };

        let data = self.tokens.blob(bytes);
        self.emit(Instruction::LoadDataAddress(data))?;
        self.emit(Instruction::LoadInt32(length))?;
        let token = self.method_token(from_pointer)?;
        let shape = self.shape(from_pointer, 2)?;
        self.emit(Instruction::NewObject(token, shape))?;
        Ok(true)
    }
}

fn arg_count(args: usize) -> Result<u16, CompileError> {
    args.try_into()
        .map_err(|_| CompileError::UnsupportedOperand(format!("call with {} arguments", args)))
}

fn numeric_target(kind: PrimitiveKind) -> Option<NumericTarget> {
    use PrimitiveKind as K;
    Some(match kind {
        K::SByte => NumericTarget::I1,
        K::Byte => NumericTarget::U1,
        K::Int16 => NumericTarget::I2,
        K::UInt16 | K::Char => NumericTarget::U2,
        K::Int32 => NumericTarget::I4,
        K::UInt32 => NumericTarget::U4,
        K::Int64 => NumericTarget::I8,
        K::UInt64 => NumericTarget::U8,
        K::NInt => NumericTarget::I,
        K::NUInt => NumericTarget::U,
        K::Single => NumericTarget::R4,
        K::Double => NumericTarget::R8,
        K::Bool | K::Object | K::String | K::Decimal => return None,
    })
}
