//! Common types for the mixr composition engine.
//!
//! This crate provides the metadata substrate every other mixr crate reads:
//! - Type identifiers and well-known types (`TypeId`)
//! - Member metadata (`MethodInfo`, `PropertyInfo`, `EventInfo`, `Signature`)
//! - Annotation instances and their usage rules (`AnnotationInstance`, `AnnotationUsage`)
//! - The immutable type arena (`TypeTable`) with inheritance, interface and
//!   assignability queries
//! - Traversal limits

// Type identifiers, member metadata and annotations
pub mod types;
pub use types::{
    AnnotationInstance, AnnotationUsage, EventDecl, EventInfo, InterfaceImpl, MemberFlags,
    MemberKind, MemberRef, MethodInfo, OverrideDirection, OverrideMarker, PropertyDecl,
    PropertyInfo, Signature, TypeId, TypeInfo, TypeKind, Visibility,
};

// The type arena and its queries
pub mod table;
pub use table::{TableError, TypeTable};

// Centralized traversal limits
pub mod limits;
