//! Declares the state machine type and builds its members.

use cinder_types::ConversionKind;

use super::rewrite::{MoveNextBody, TryInfo};
use super::{Capabilities, FINISHED_STATE, INITIAL_STATE, StateMachineInfo, StateMachineKind, capabilities};
use crate::bound::{
    BinaryOp, BoundBuilder, BoundMethod, Expr, LabelGen, LocalId, LocalKind, LocalTable, Stmt,
};
use crate::error::CompileError;
use crate::lowering::LoweredMethod;
use crate::symbols::{
    FieldId, MethodDef, MethodFlags, MethodId, MethodKind, SymbolTable, TypeDef, TypeId, TypeKind,
    WellKnownMember,
};
use crate::{Vec, format, vec};

/// Fields of a declared state machine type.
#[derive(Debug)]
pub(super) struct MachineLayout {
    pub kind: StateMachineKind,
    pub ty: TypeId,
    pub state: FieldId,
    /// Builder field and builder type, for async kinds.
    pub builder: Option<(FieldId, TypeId)>,
    /// Current-value field and element type, for iterators.
    pub current: Option<(FieldId, TypeId)>,
    /// Copy of the receiver, for instance methods.
    pub this_proxy: Option<(FieldId, TypeId)>,
    /// One field per declared parameter, in order.
    pub params: Vec<FieldId>,
    pub hoisted: Vec<(LocalId, FieldId)>,
    /// Awaiter fields, one per awaiter type.
    pub awaiters: Vec<(TypeId, FieldId)>,
    /// `SetResult` argument type of async methods returning a value.
    pub result_ty: Option<TypeId>,
}

impl MachineLayout {
    pub fn hoisted_field(&self, local: LocalId) -> Option<FieldId> {
        self.hoisted
            .iter()
            .find(|(hoisted, _)| *hoisted == local)
            .map(|(_, field)| *field)
    }

    /// Field holding a pending awaiter of type `ty`; shared by every await on
    /// that type.
    pub fn awaiter_field(&mut self, symbols: &mut SymbolTable, ty: TypeId) -> FieldId {
        if let Some((_, field)) = self.awaiters.iter().find(|(awaiter, _)| *awaiter == ty) {
            return *field;
        }
        let name = format!("<>u__{}", self.awaiters.len() + 1);
        let field = symbols.add_field(self.ty, name, ty, false);
        self.awaiters.push((ty, field));
        field
    }
}

pub(super) fn declare_machine(
    symbols: &mut SymbolTable,
    method: MethodId,
    kind: StateMachineKind,
    locals: &LocalTable,
    hoisted: &[LocalId],
) -> Result<MachineLayout, CompileError> {
    let def = symbols.method(method).clone();
    if let Some(param) = def.params.iter().find(|param| param.by_ref) {
        return Err(CompileError::UnsupportedOperand(format!(
            "by-reference parameter `{}` of a suspending method",
            param.name
        )));
    }
    let result_ty = match def.kind {
        MethodKind::Async { builder } => {
            let set_result = symbols.require_method(builder, "SetResult")?;
            symbols.method(set_result).params.first().map(|param| param.ty)
        }
        _ => None,
    };

    let ordinal = symbols.next_synthesized_ordinal();
    let mut type_def = TypeDef::class(format!("<{}>d__{}", def.name, ordinal)).with_base(TypeId::OBJECT);
    type_def.enclosing = Some(def.owner);
    type_def.synthesized = true;
    if symbols.type_def(def.ret).kind == TypeKind::Interface {
        type_def.interfaces.push(def.ret);
    }
    let ty = symbols.add_type(type_def);

    let state = symbols.add_field(ty, "<>1__state", TypeId::INT32, false);
    let builder = match def.kind {
        MethodKind::Async { builder } | MethodKind::AsyncIterator { builder, .. } => {
            Some((symbols.add_field(ty, "<>t__builder", builder, false), builder))
        }
        _ => None,
    };
    let current = match def.kind {
        MethodKind::Iterator { element } | MethodKind::AsyncIterator { element, .. } => {
            Some((symbols.add_field(ty, "<>2__current", element, false), element))
        }
        _ => None,
    };
    let this_proxy = def
        .has_this()
        .then(|| (symbols.add_field(ty, "<>4__this", def.owner, false), def.owner));
    let params = def
        .params
        .iter()
        .map(|param| symbols.add_field(ty, param.name.clone(), param.ty, false))
        .collect();
    let hoisted = hoisted
        .iter()
        .enumerate()
        .map(|(i, &local)| {
            let decl = locals.get(local);
            let name = match decl.kind {
                LocalKind::User => format!("<{}>5__{}", decl.name, i + 1),
                LocalKind::Temp => format!("<>s__{}", i + 1),
            };
            (local, symbols.add_field(ty, name, decl.ty, false))
        })
        .collect();

    Ok(MachineLayout {
        kind,
        ty,
        state,
        builder,
        current,
        this_proxy,
        params,
        hoisted,
        awaiters: Vec::new(),
        result_ty,
    })
}

/// Declares the constructor, `MoveNext`, the accessors and the kickoff body.
pub(super) fn synthesize_members<'a>(
    b: BoundBuilder<'a>,
    symbols: &mut SymbolTable,
    layout: &MachineLayout,
    move_next: MoveNextBody<'a>,
    locals: LocalTable,
    labels: LabelGen,
    kickoff: MethodId,
) -> Result<LoweredMethod<'a>, CompileError> {
    let ty = layout.ty;
    let this = b.this(ty);
    let state = b.field(Some(this), layout.state, TypeId::INT32);
    let synthesized_flags = MethodFlags::SYNTHESIZED;
    let mut synthesized = Vec::new();

    let object_ctor = symbols.well_known_method(WellKnownMember::ObjectCtor)?;
    let ctor = symbols.add_method(
        MethodDef::new(ty, ".ctor", vec![], TypeId::VOID).with_flags(MethodFlags::CONSTRUCTOR | synthesized_flags),
    );
    let ctor_body = b.block(&[
        b.expr_stmt(b.call(Some(this), object_ctor, &[], TypeId::VOID)),
        b.assign_stmt(state, b.int32(INITIAL_STATE)),
        b.ret(None),
    ]);
    synthesized.push(BoundMethod::new(ctor, b.alloc(ctor_body), LocalTable::new(), LabelGen::new()));

    let advance_ret = match layout.kind {
        StateMachineKind::SyncIterator => TypeId::BOOL,
        _ => TypeId::VOID,
    };
    let move_next_id = symbols.add_method(
        MethodDef::new(ty, "MoveNext", vec![], advance_ret).with_flags(MethodFlags::VIRTUAL | synthesized_flags),
    );
    let dispose_locals = locals.clone();
    let dispose_labels = LabelGen::starting_at(labels.count());
    synthesized.push(BoundMethod::new(move_next_id, move_next.body, locals, labels));

    let caps = capabilities(layout.kind);
    let mut current = None;
    if let (true, Some((field, element))) = (caps.contains(Capabilities::CURRENT), layout.current) {
        let id = symbols.add_method(
            MethodDef::new(ty, "get_Current", vec![], element).with_flags(MethodFlags::VIRTUAL | synthesized_flags),
        );
        let body = b.block(&[b.ret(Some(b.field(Some(this), field, element)))]);
        synthesized.push(BoundMethod::new(id, b.alloc(body), LocalTable::new(), LabelGen::new()));
        current = Some(id);
    }

    let mut dispose = None;
    if caps.contains(Capabilities::DISPOSE) {
        let name = match layout.kind {
            StateMachineKind::AsyncIterator => "DisposeAsync",
            _ => "Dispose",
        };
        let id = symbols.add_method(
            MethodDef::new(ty, name, vec![], TypeId::VOID).with_flags(MethodFlags::VIRTUAL | synthesized_flags),
        );
        let mut labels = dispose_labels;
        let body = dispose_body(b, state, &move_next.tries, &mut labels);
        synthesized.push(BoundMethod::new(id, b.alloc(body), dispose_locals, labels));
        dispose = Some(id);
    }

    let kickoff_method = kickoff_body(b, symbols, layout, kickoff, ctor)?;

    Ok(LoweredMethod {
        kickoff: kickoff_method,
        synthesized,
        state_machine: Some(StateMachineInfo {
            kind: layout.kind,
            ty,
            state_field: layout.state,
            builder_field: layout.builder.map(|(field, _)| field),
            current_field: layout.current.map(|(field, _)| field),
            hoisted: layout.hoisted.clone(),
            resume_states: move_next.resumes.iter().map(|resume| resume.state).collect(),
            constructor: ctor,
            move_next: move_next_id,
            current,
            dispose,
        }),
    })
}

/// Runs the finally blocks whose try covers the current state, innermost
/// first, then marks the machine finished.
fn dispose_body<'a>(b: BoundBuilder<'a>, state: &'a Expr<'a>, tries: &[TryInfo<'a>], labels: &mut LabelGen) -> Stmt<'a> {
    let mut stmts = Vec::new();
    for (index, info) in tries.iter().enumerate() {
        if info.parent.is_none() {
            stmts.extend(dispose_try(b, state, tries, index, labels));
        }
    }
    stmts.push(b.assign_stmt(state, b.int32(FINISHED_STATE)));
    stmts.push(b.ret(None));
    b.block(&stmts)
}

/// Try nesting follows source nesting, which is shallow, so this recurses.
fn dispose_try<'a>(
    b: BoundBuilder<'a>,
    state: &'a Expr<'a>,
    tries: &[TryInfo<'a>],
    index: usize,
    labels: &mut LabelGen,
) -> Option<Stmt<'a>> {
    let info = &tries[index];
    let (first, last) = info.states?;
    let nested: Vec<Stmt<'a>> = tries
        .iter()
        .enumerate()
        .filter(|(_, child)| child.parent == Some(index))
        .filter_map(|(child, _)| dispose_try(b, state, tries, child, labels))
        .collect();
    if info.finally.is_none() && nested.is_empty() {
        return None;
    }

    let skip = labels.fresh();
    let below = b.binary(BinaryOp::Lt, state, b.int32(first), TypeId::BOOL);
    let above = b.binary(BinaryOp::Gt, state, b.int32(last), TypeId::BOOL);
    let inner = b.block(&nested);
    let guarded = match info.finally {
        Some(finally) => b.try_stmt(inner, &[], Some(*finally)),
        None => inner,
    };
    Some(b.block(&[
        b.cond_goto(below, true, skip),
        b.cond_goto(above, true, skip),
        guarded,
        b.label(skip),
    ]))
}

/// Replaces the original body: create the machine, copy the receiver and
/// arguments into it, then start it or hand it out.
fn kickoff_body<'a>(
    b: BoundBuilder<'a>,
    symbols: &SymbolTable,
    layout: &MachineLayout,
    kickoff: MethodId,
    ctor: MethodId,
) -> Result<BoundMethod<'a>, CompileError> {
    let def = symbols.method(kickoff);
    let mut locals = LocalTable::new();
    let machine_local = locals.temp(layout.ty);
    let machine = b.local(machine_local, layout.ty);

    let mut stmts = vec![b.assign_stmt(machine, b.new_object(ctor, &[], layout.ty))];
    if let Some((field, owner)) = layout.this_proxy {
        stmts.push(b.assign_stmt(b.field(Some(machine), field, owner), b.this(def.owner)));
    }
    for (index, (&field, param)) in layout.params.iter().zip(&def.params).enumerate() {
        stmts.push(b.assign_stmt(
            b.field(Some(machine), field, param.ty),
            b.parameter(index as u16, param.ty),
        ));
    }

    match (layout.kind, layout.builder) {
        (StateMachineKind::Async, Some((field, builder_ty))) => {
            let builder = b.field(Some(machine), field, builder_ty);
            let create = symbols.require_method(builder_ty, "Create")?;
            let start = symbols.require_method(builder_ty, "Start")?;
            stmts.push(b.assign_stmt(builder, b.call(None, create, &[], builder_ty)));
            stmts.push(b.expr_stmt(b.call(Some(builder), start, &[*machine], TypeId::VOID)));
            let task = symbols
                .find_method(builder_ty, "get_Task")
                .filter(|_| def.returns_value());
            match task {
                Some(get_task) => {
                    let task_ty = symbols.method(get_task).ret;
                    stmts.push(b.ret(Some(b.call(Some(builder), get_task, &[], task_ty))));
                }
                None => stmts.push(b.ret(None)),
            }
        }
        (StateMachineKind::AsyncIterator, Some((field, builder_ty))) => {
            let create = symbols.require_method(builder_ty, "Create")?;
            stmts.push(b.assign_stmt(
                b.field(Some(machine), field, builder_ty),
                b.call(None, create, &[], builder_ty),
            ));
            stmts.push(b.ret(Some(as_return_type(b, symbols, machine, def.ret))));
        }
        _ => stmts.push(b.ret(Some(as_return_type(b, symbols, machine, def.ret)))),
    }

    let body = b.block_with_locals(&[machine_local], &stmts);
    Ok(BoundMethod::new(kickoff, b.alloc(body), locals, LabelGen::new()))
}

fn as_return_type<'a>(b: BoundBuilder<'a>, symbols: &SymbolTable, machine: &'a Expr<'a>, ret: TypeId) -> &'a Expr<'a> {
    match symbols.classify_conversion(machine.ty, ret) {
        ConversionKind::Identity => machine,
        kind => b.convert(machine, ret, kind),
    }
}
