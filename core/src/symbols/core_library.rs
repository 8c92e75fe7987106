use super::{
    MethodDef, MethodFlags, MethodId, Param, SymbolTable, TypeDef, TypeId, TypeKind,
    WellKnownMember, WellKnownSymbol,
};
use crate::vec;

/// Ids of the runtime library declared by [`declare_core_library`].
#[derive(Debug, Clone, Copy)]
pub struct CoreLibrary {
    pub object_ctor: MethodId,
    pub exception: TypeId,
    pub exception_ctor: MethodId,
    pub runtime_helpers: TypeId,
    pub field_handle: TypeId,
    pub initialize_array: MethodId,
    pub byte_span: TypeId,
    pub byte_span_from_pointer: MethodId,
    pub byte_span_from_array: MethodId,
    pub task: TypeId,
    pub task_get_awaiter: MethodId,
    pub task_awaiter: TypeId,
    pub task_of_int: TypeId,
    pub task_of_int_get_awaiter: MethodId,
    pub task_awaiter_of_int: TypeId,
    pub async_builder: TypeId,
    pub async_builder_of_int: TypeId,
    pub async_iterator_builder: TypeId,
}

/// Declares the minimal runtime library the back end relies on and registers
/// its well-known members.
///
/// Hosts with their own library can skip this and register members one by
/// one with [`SymbolTable::register_well_known`].
pub fn declare_core_library(symbols: &mut SymbolTable) -> CoreLibrary {
    let object = TypeId::OBJECT;
    let ctor_flags = MethodFlags::CONSTRUCTOR;

    let object_ctor = symbols.add_method(MethodDef::new(object, ".ctor", vec![], TypeId::VOID).with_flags(ctor_flags));

    let exception = symbols.add_type(TypeDef::class("Exception").with_base(object));
    let exception_ctor = symbols.add_method(MethodDef::new(exception, ".ctor", vec![], TypeId::VOID).with_flags(ctor_flags));

    let field_handle = symbols.add_type(TypeDef::value_struct("RuntimeFieldHandle"));
    let runtime_helpers = symbols.add_type(TypeDef::class("RuntimeHelpers").with_base(object));
    let initialize_array = symbols.add_method(
        MethodDef::new(
            runtime_helpers,
            "InitializeArray",
            vec![Param::new("array", object), Param::new("field", field_handle)],
            TypeId::VOID,
        )
        .with_flags(MethodFlags::STATIC),
    );

    let byte_array = symbols.array_of(TypeId::BYTE, 1);
    let byte_span = symbols.add_type(TypeDef::value_struct("ReadOnlySpan<byte>"));
    let byte_span_from_pointer = symbols.add_method(
        MethodDef::new(
            byte_span,
            ".ctor",
            vec![
                Param::new("pointer", TypeId::of_kind(cinder_types::PrimitiveKind::NUInt)),
                Param::new("length", TypeId::INT32),
            ],
            TypeId::VOID,
        )
        .with_flags(ctor_flags),
    );
    let byte_span_from_array = symbols.add_method(
        MethodDef::new(byte_span, ".ctor", vec![Param::new("array", byte_array)], TypeId::VOID).with_flags(ctor_flags),
    );

    declare_decimal_helpers(symbols);

    let (task, task_awaiter, task_get_awaiter) = declare_task(symbols, "Task", "TaskAwaiter", TypeId::VOID);
    let (task_of_int, task_awaiter_of_int, task_of_int_get_awaiter) =
        declare_task(symbols, "Task<int>", "TaskAwaiter<int>", TypeId::INT32);

    let async_builder = declare_builder(symbols, "AsyncTaskMethodBuilder", exception, TypeId::VOID, Some(task));
    let async_builder_of_int =
        declare_builder(symbols, "AsyncTaskMethodBuilder<int>", exception, TypeId::INT32, Some(task_of_int));
    let async_iterator_builder = declare_builder(symbols, "AsyncIteratorMethodBuilder", exception, TypeId::BOOL, None);

    symbols.register_well_known(WellKnownMember::ObjectCtor, WellKnownSymbol::Method(object_ctor));
    symbols.register_well_known(WellKnownMember::Exception, WellKnownSymbol::Type(exception));
    symbols.register_well_known(WellKnownMember::InitializeArray, WellKnownSymbol::Method(initialize_array));
    symbols.register_well_known(
        WellKnownMember::ByteSpanFromPointer,
        WellKnownSymbol::Method(byte_span_from_pointer),
    );

    CoreLibrary {
        object_ctor,
        exception,
        exception_ctor,
        runtime_helpers,
        field_handle,
        initialize_array,
        byte_span,
        byte_span_from_pointer,
        byte_span_from_array,
        task,
        task_get_awaiter,
        task_awaiter,
        task_of_int,
        task_of_int_get_awaiter,
        task_awaiter_of_int,
        async_builder,
        async_builder_of_int,
        async_iterator_builder,
    }
}

fn declare_decimal_helpers(symbols: &mut SymbolTable) {
    let decimal = TypeId::DECIMAL;
    let int64 = TypeId::INT64;
    let uint64 = TypeId::of_kind(cinder_types::PrimitiveKind::UInt64);
    let double = TypeId::DOUBLE;

    let ctor = symbols.add_method(
        MethodDef::new(
            decimal,
            ".ctor",
            vec![
                Param::new("lo", TypeId::INT32),
                Param::new("mid", TypeId::INT32),
                Param::new("hi", TypeId::INT32),
                Param::new("isNegative", TypeId::BOOL),
                Param::new("scale", TypeId::BYTE),
            ],
            TypeId::VOID,
        )
        .with_flags(MethodFlags::CONSTRUCTOR),
    );
    symbols.register_well_known(WellKnownMember::DecimalCtor, WellKnownSymbol::Method(ctor));

    let helpers = [
        (WellKnownMember::DecimalFromInt64, "op_Implicit", int64, decimal),
        (WellKnownMember::DecimalFromUInt64, "op_Implicit", uint64, decimal),
        (WellKnownMember::DecimalFromDouble, "op_Explicit", double, decimal),
        (WellKnownMember::DecimalToInt64, "op_Explicit", decimal, int64),
        (WellKnownMember::DecimalToUInt64, "op_Explicit", decimal, uint64),
        (WellKnownMember::DecimalToDouble, "op_Explicit", decimal, double),
    ];
    for (member, name, from, to) in helpers {
        let id = symbols.add_method(
            MethodDef::new(decimal, name, vec![Param::new("value", from)], to).with_flags(MethodFlags::STATIC),
        );
        symbols.register_well_known(member, WellKnownSymbol::Method(id));
    }
}

/// A task class with `GetAwaiter` and its awaiter struct.
fn declare_task(symbols: &mut SymbolTable, task_name: &str, awaiter_name: &str, result: TypeId) -> (TypeId, TypeId, MethodId) {
    let task = symbols.add_type(TypeDef::class(task_name).with_base(TypeId::OBJECT));
    let awaiter = symbols.add_type(TypeDef::value_struct(awaiter_name));
    symbols.add_method(MethodDef::new(awaiter, "get_IsCompleted", vec![], TypeId::BOOL));
    symbols.add_method(MethodDef::new(awaiter, "GetResult", vec![], result));
    let get_awaiter = symbols.add_method(MethodDef::new(task, "GetAwaiter", vec![], awaiter));
    (task, awaiter, get_awaiter)
}

/// A method builder struct. `result` is the `SetResult` argument type.
fn declare_builder(
    symbols: &mut SymbolTable,
    name: &str,
    exception: TypeId,
    result: TypeId,
    task: Option<TypeId>,
) -> TypeId {
    let builder = symbols.add_type(TypeDef::new(name, TypeKind::Struct));
    symbols.add_method(MethodDef::new(builder, "Create", vec![], builder).with_flags(MethodFlags::STATIC));
    symbols.add_method(MethodDef::new(
        builder,
        "Start",
        vec![Param::by_ref("stateMachine", TypeId::OBJECT)],
        TypeId::VOID,
    ));
    symbols.add_method(MethodDef::new(
        builder,
        "AwaitOnCompleted",
        vec![
            Param::by_ref("awaiter", TypeId::OBJECT),
            Param::by_ref("stateMachine", TypeId::OBJECT),
        ],
        TypeId::VOID,
    ));
    let set_result_params = if result == TypeId::VOID {
        vec![]
    } else {
        vec![Param::new("result", result)]
    };
    symbols.add_method(MethodDef::new(builder, "SetResult", set_result_params, TypeId::VOID));
    symbols.add_method(MethodDef::new(
        builder,
        "SetException",
        vec![Param::new("exception", exception)],
        TypeId::VOID,
    ));
    if let Some(task) = task {
        symbols.add_method(MethodDef::new(builder, "get_Task", vec![], task));
    }
    builder
}
