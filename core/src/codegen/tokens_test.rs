use pretty_assertions::assert_eq;

use super::*;
use crate::symbols::{MethodDef, TypeDef};
use crate::vec;

fn program(symbols: &mut SymbolTable) -> (TypeId, MethodId) {
    let owner = symbols.add_type(TypeDef::class("Program").with_base(TypeId::OBJECT));
    let method = symbols.add_method(MethodDef::new(owner, "Main", vec![], TypeId::VOID));
    (owner, method)
}

#[test]
fn test_tokens_are_memoized_per_symbol() {
    let mut symbols = SymbolTable::new();
    let (owner, method) = program(&mut symbols);
    let mut tokens = TokenTable::new();

    let first = tokens.method(&symbols, method).unwrap();
    let again = tokens.method(&symbols, method).unwrap();
    assert_eq!(first, again);
    assert_eq!(first, Token(0x0600_0001));

    let ty = tokens.type_token(&symbols, owner).unwrap();
    assert_eq!(ty.tag(), Some(TokenTag::TypeDef));
    assert_eq!(ty.row(), 1);
    assert_eq!(tokens.len(), 2);
}

#[test]
fn test_arrays_and_nullables_are_type_specs() {
    let mut symbols = SymbolTable::new();
    let array = symbols.array_of(TypeId::INT32, 1);
    let nullable = TypeId::primitive(
        cinder_types::PrimitiveType::nullable(cinder_types::PrimitiveKind::Int32).unwrap(),
    );
    let mut tokens = TokenTable::new();

    assert_eq!(tokens.type_token(&symbols, array).unwrap(), Token(0x1B00_0001));
    assert_eq!(tokens.type_token(&symbols, nullable).unwrap(), Token(0x1B00_0002));
    assert_eq!(tokens.type_token(&symbols, TypeId::INT32).unwrap(), Token(0x0200_0001));
}

#[test]
fn test_void_and_unknown_ids_are_unresolved() {
    let symbols = SymbolTable::new();
    let mut tokens = TokenTable::new();

    assert!(matches!(
        tokens.type_token(&symbols, TypeId::VOID),
        Err(CompileError::UnresolvedSymbol(_))
    ));
    assert!(matches!(
        tokens.method(&symbols, MethodId(99)),
        Err(CompileError::UnresolvedSymbol(_))
    ));
    assert!(tokens.is_empty());
}

#[test]
fn test_merge_appends_and_remaps() {
    let mut symbols = SymbolTable::new();
    let (owner, method) = program(&mut symbols);

    let mut module = TokenTable::new();
    module.user_string("hello");
    module.method(&symbols, method).unwrap();

    let mut partition = TokenTable::new();
    let local_string = partition.user_string("world");
    let local_method = partition.method(&symbols, method).unwrap();
    let local_type = partition.type_token(&symbols, owner).unwrap();

    let remap = module.merge(&partition);
    assert_eq!(remap.apply(local_string), Token(0x7000_0002));
    assert_eq!(remap.apply(local_method), Token(0x0600_0001));
    assert_eq!(remap.apply(local_type), Token(0x0200_0001));
    assert_eq!(module.get(Token(0x7000_0002)), Some(&TokenKey::UserString("world".into())));
}

#[test]
fn test_rollback_frees_rows() {
    let mut tokens = TokenTable::new();
    tokens.blob(vec![1, 2, 3]);
    let checkpoint = tokens.checkpoint();
    tokens.blob(vec![4]);
    tokens.user_string("gone");

    tokens.rollback(checkpoint);
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens.blob(vec![5]), Token(0x1D00_0002));
    assert_eq!(tokens.blob(vec![1, 2, 3]), Token(0x1D00_0001));
}
