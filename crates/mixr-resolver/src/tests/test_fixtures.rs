//! Shared metadata builders for resolver unit tests.

use mixr_common::{
    MemberFlags, MethodInfo, OverrideMarker, Signature, TypeId, TypeInfo, TypeTable,
};

pub fn declare(table: &mut TypeTable, info: TypeInfo) -> TypeId {
    let name = info.name.clone();
    table
        .declare(info)
        .unwrap_or_else(|err| panic!("declaring {name}: {err}"))
}

pub fn void_method(name: &str) -> MethodInfo {
    MethodInfo::new(name, Signature::procedure())
}

pub fn virtual_method(name: &str) -> MethodInfo {
    void_method(name).with_flags(MemberFlags::VIRTUAL)
}

/// A method marked as overriding a target member.
pub fn target_override(name: &str) -> MethodInfo {
    void_method(name).overriding(OverrideMarker::target())
}

/// An interface declaring parameterless void methods.
pub fn interface(table: &mut TypeTable, name: &str, methods: &[&str]) -> TypeId {
    let info = methods
        .iter()
        .fold(TypeInfo::interface(name), |info, m| info.with_method(void_method(m)));
    declare(table, info)
}

/// Base type of a mixin with a face requirement only.
pub fn mixin_base(table: &mut TypeTable, face: TypeId) -> TypeId {
    table
        .construct(TypeId::MIXIN_BASE, &[face])
        .expect("construct Mixin<TTarget>")
}

/// Base type of a mixin with face and base-call requirements.
pub fn mixin_base_with_next(table: &mut TypeTable, face: TypeId, next: TypeId) -> TypeId {
    table
        .construct(TypeId::MIXIN_BASE_WITH_NEXT, &[face, next])
        .expect("construct Mixin<TTarget, TNext>")
}

/// A mixin class requiring `next` on its base-call chain.
pub fn mixin_needing(table: &mut TypeTable, name: &str, next: TypeId) -> TypeId {
    let base = mixin_base_with_next(table, TypeId::OBJECT, next);
    declare(table, TypeInfo::class(name).extends(base))
}
