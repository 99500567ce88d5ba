//! Type identifiers and member metadata.
//!
//! These are plain data records. Upstream tooling (an attribute scanner, a
//! manifest loader, a test) fills them in and registers them with a
//! [`crate::TypeTable`]; the composition engine only ever reads them.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

// =============================================================================
// TypeId
// =============================================================================

/// Index of a type inside a [`crate::TypeTable`].
///
/// The first few ids are reserved for well-known types that every table
/// registers on construction.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeId(pub u32);

impl TypeId {
    /// The universal top type (`System.Object`).
    pub const OBJECT: Self = Self(0);
    /// `System.Void`, the return type of procedures.
    pub const VOID: Self = Self(1);
    pub const STRING: Self = Self(2);
    pub const INT32: Self = Self(3);
    pub const BOOLEAN: Self = Self(4);
    /// Generic mixin base marker `Mixin<TTarget>`.
    pub const MIXIN_BASE: Self = Self(5);
    /// Generic mixin base marker `Mixin<TTarget, TNext>`.
    pub const MIXIN_BASE_WITH_NEXT: Self = Self(6);
    /// `TTarget` of [`TypeId::MIXIN_BASE`].
    pub const MIXIN_TARGET_PARAM: Self = Self(7);
    /// `TTarget` of [`TypeId::MIXIN_BASE_WITH_NEXT`].
    pub const MIXIN_NEXT_TARGET_PARAM: Self = Self(8);
    /// `TNext` of [`TypeId::MIXIN_BASE_WITH_NEXT`].
    pub const MIXIN_NEXT_PARAM: Self = Self(9);

    /// First id handed out for user types.
    pub const FIRST_USER: u32 = 10;

    /// Whether this is one of the two mixin base markers.
    pub const fn is_mixin_base(self) -> bool {
        self.0 == Self::MIXIN_BASE.0 || self.0 == Self::MIXIN_BASE_WITH_NEXT.0
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Kind of a registered type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TypeKind {
    Class,
    Interface,
    /// An open type parameter of a generic definition.
    GenericParameter,
}

/// Declared accessibility of a member.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Visibility {
    Private,
    Internal,
    Protected,
    ProtectedInternal,
    Public,
}

impl Visibility {
    pub const fn is_private(self) -> bool {
        matches!(self, Self::Private)
    }

    /// Public or protected (in any combination): reachable from a subclass.
    pub const fn is_family_visible(self) -> bool {
        matches!(self, Self::Public | Self::Protected | Self::ProtectedInternal)
    }
}

bitflags! {
    /// Modifier flags of a method (and, through its accessors, of a property or event).
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct MemberFlags: u16 {
        const STATIC = 1 << 0;
        const VIRTUAL = 1 << 1;
        const ABSTRACT = 1 << 2;
        /// Sealed override: cannot be overridden further.
        const FINAL = 1 << 3;
        /// Declared with `new`: hides a same-signature member of a base class.
        const NEW_SLOT = 1 << 4;
        /// Compiler-generated accessor of a property or event.
        const SPECIAL_NAME = 1 << 5;
    }
}

impl MemberFlags {
    /// Virtual (or abstract) and not sealed.
    pub fn is_overridable(self) -> bool {
        self.intersects(Self::VIRTUAL | Self::ABSTRACT) && !self.contains(Self::FINAL)
    }
}

/// Which kind of member a [`MemberRef`] points at.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MemberKind {
    Method,
    Property,
    Event,
}

impl std::fmt::Display for MemberKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Method => "method",
            Self::Property => "property",
            Self::Event => "event",
        })
    }
}

/// Handle to a member declared directly on `owner`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MemberRef {
    pub owner: TypeId,
    pub kind: MemberKind,
    pub index: u32,
}

impl MemberRef {
    pub const fn method(owner: TypeId, index: u32) -> Self {
        Self {
            owner,
            kind: MemberKind::Method,
            index,
        }
    }

    pub const fn property(owner: TypeId, index: u32) -> Self {
        Self {
            owner,
            kind: MemberKind::Property,
            index,
        }
    }

    pub const fn event(owner: TypeId, index: u32) -> Self {
        Self {
            owner,
            kind: MemberKind::Event,
            index,
        }
    }
}

// =============================================================================
// Signatures and annotations
// =============================================================================

/// Parameter and return types of a member.
///
/// Properties use their index parameters and property type; events use a
/// single handler-type parameter and `void`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature {
    pub parameters: SmallVec<[TypeId; 4]>,
    pub return_type: TypeId,
}

impl Signature {
    pub fn new(parameters: impl IntoIterator<Item = TypeId>, return_type: TypeId) -> Self {
        Self {
            parameters: parameters.into_iter().collect(),
            return_type,
        }
    }

    /// A parameterless procedure.
    pub fn procedure() -> Self {
        Self::new([], TypeId::VOID)
    }
}

/// Usage rules declared on an annotation type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationUsage {
    /// Flows from a declaration to derived/composed declarations.
    pub inherited: bool,
    /// Several instances of the kind may decorate one declaration.
    pub allow_multiple: bool,
}

impl Default for AnnotationUsage {
    fn default() -> Self {
        Self {
            inherited: true,
            allow_multiple: false,
        }
    }
}

/// One annotation applied to a type or member.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnnotationInstance {
    /// The annotation type.
    pub kind: TypeId,
    /// Constructor arguments, rendered as text.
    pub arguments: Vec<String>,
    /// Explicitly marked for copying onto composed declarations even when
    /// the kind is not inheritable.
    pub copied: bool,
}

impl AnnotationInstance {
    pub fn new(kind: TypeId) -> Self {
        Self {
            kind,
            arguments: Vec::new(),
            copied: false,
        }
    }

    pub fn with_argument(mut self, argument: impl Into<String>) -> Self {
        self.arguments.push(argument.into());
        self
    }

    pub fn copied(mut self) -> Self {
        self.copied = true;
        self
    }
}

/// Direction of an override declaration.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OverrideDirection {
    /// A mixin member overrides a member of the target class.
    Target,
    /// A target member overrides a member of one of the mixins.
    Mixin,
}

/// Marks a member as an overrider.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OverrideMarker {
    pub direction: OverrideDirection,
    /// Restricts candidates to those declared by a type assignable to this one.
    pub target: Option<TypeId>,
}

impl OverrideMarker {
    pub const fn target() -> Self {
        Self {
            direction: OverrideDirection::Target,
            target: None,
        }
    }

    pub const fn mixin() -> Self {
        Self {
            direction: OverrideDirection::Mixin,
            target: None,
        }
    }

    pub const fn restricted_to(mut self, ty: TypeId) -> Self {
        self.target = Some(ty);
        self
    }
}

// =============================================================================
// Members
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodInfo {
    pub name: String,
    pub signature: Signature,
    pub visibility: Visibility,
    pub flags: MemberFlags,
    pub annotations: Vec<AnnotationInstance>,
    pub override_marker: Option<OverrideMarker>,
}

impl MethodInfo {
    /// A public, non-virtual instance method.
    pub fn new(name: impl Into<String>, signature: Signature) -> Self {
        Self {
            name: name.into(),
            signature,
            visibility: Visibility::Public,
            flags: MemberFlags::empty(),
            annotations: Vec::new(),
            override_marker: None,
        }
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_flags(mut self, flags: MemberFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn with_annotation(mut self, annotation: AnnotationInstance) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn overriding(mut self, marker: OverrideMarker) -> Self {
        self.override_marker = Some(marker);
        self
    }

    pub fn is_static(&self) -> bool {
        self.flags.contains(MemberFlags::STATIC)
    }
}

/// A property; its accessors are methods of the same declaring type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyInfo {
    pub name: String,
    pub property_type: TypeId,
    pub index_parameters: SmallVec<[TypeId; 2]>,
    pub getter: Option<u32>,
    pub setter: Option<u32>,
    pub annotations: Vec<AnnotationInstance>,
    pub override_marker: Option<OverrideMarker>,
}

impl PropertyInfo {
    /// Identity signature: index parameters to property type.
    pub fn signature(&self) -> Signature {
        Signature::new(self.index_parameters.iter().copied(), self.property_type)
    }
}

/// An event; its add/remove accessors are methods of the same declaring type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventInfo {
    pub name: String,
    pub handler_type: TypeId,
    pub add: Option<u32>,
    pub remove: Option<u32>,
    pub annotations: Vec<AnnotationInstance>,
    pub override_marker: Option<OverrideMarker>,
}

impl EventInfo {
    pub fn signature(&self) -> Signature {
        Signature::new([self.handler_type], TypeId::VOID)
    }
}

/// Declaration of a property; [`TypeInfo::with_property`] lowers it into a
/// [`PropertyInfo`] plus `get_`/`set_` accessor methods.
#[derive(Clone, Debug)]
pub struct PropertyDecl {
    pub name: String,
    pub property_type: TypeId,
    pub index_parameters: Vec<TypeId>,
    pub readable: bool,
    pub writable: bool,
    pub visibility: Visibility,
    pub flags: MemberFlags,
    pub annotations: Vec<AnnotationInstance>,
    pub override_marker: Option<OverrideMarker>,
}

impl PropertyDecl {
    /// A public read/write property.
    pub fn new(name: impl Into<String>, property_type: TypeId) -> Self {
        Self {
            name: name.into(),
            property_type,
            index_parameters: Vec::new(),
            readable: true,
            writable: true,
            visibility: Visibility::Public,
            flags: MemberFlags::empty(),
            annotations: Vec::new(),
            override_marker: None,
        }
    }

    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_flags(mut self, flags: MemberFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn with_annotation(mut self, annotation: AnnotationInstance) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn overriding(mut self, marker: OverrideMarker) -> Self {
        self.override_marker = Some(marker);
        self
    }
}

/// Declaration of an event; lowered into an [`EventInfo`] plus `add_`/`remove_` methods.
#[derive(Clone, Debug)]
pub struct EventDecl {
    pub name: String,
    pub handler_type: TypeId,
    pub visibility: Visibility,
    pub flags: MemberFlags,
    pub annotations: Vec<AnnotationInstance>,
    pub override_marker: Option<OverrideMarker>,
}

impl EventDecl {
    pub fn new(name: impl Into<String>, handler_type: TypeId) -> Self {
        Self {
            name: name.into(),
            handler_type,
            visibility: Visibility::Public,
            flags: MemberFlags::empty(),
            annotations: Vec::new(),
            override_marker: None,
        }
    }

    pub fn with_flags(mut self, flags: MemberFlags) -> Self {
        self.flags |= flags;
        self
    }

    pub fn with_annotation(mut self, annotation: AnnotationInstance) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn overriding(mut self, marker: OverrideMarker) -> Self {
        self.override_marker = Some(marker);
        self
    }
}

/// Explicit implementation of an interface method by a method of the declaring type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct InterfaceImpl {
    /// Method of the implemented interface.
    pub interface_method: MemberRef,
    /// Index of the implementing method in the declaring type.
    pub implementation: u32,
}

// =============================================================================
// TypeInfo
// =============================================================================

/// Complete metadata of one type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeInfo {
    /// Fully-qualified name, unique within a table (generic parameters excepted).
    pub name: String,
    pub kind: TypeKind,
    /// Base class; `None` only for the top type, interfaces and parameters.
    pub base: Option<TypeId>,
    /// Interfaces declared directly (for an interface: the ones it extends).
    pub interfaces: Vec<TypeId>,
    /// Open parameters of a generic definition.
    pub generic_parameters: Vec<TypeId>,
    /// For a constructed generic: its definition and arguments.
    pub generic_definition: Option<TypeId>,
    pub generic_arguments: Vec<TypeId>,
    /// For a generic parameter: its declared constraints.
    pub constraints: Vec<TypeId>,
    pub methods: Vec<MethodInfo>,
    pub properties: Vec<PropertyInfo>,
    pub events: Vec<EventInfo>,
    pub annotations: Vec<AnnotationInstance>,
    /// Present when this type is itself an annotation kind.
    pub annotation_usage: Option<AnnotationUsage>,
    pub interface_impls: Vec<InterfaceImpl>,
}

impl TypeInfo {
    fn empty(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            base: None,
            interfaces: Vec::new(),
            generic_parameters: Vec::new(),
            generic_definition: None,
            generic_arguments: Vec::new(),
            constraints: Vec::new(),
            methods: Vec::new(),
            properties: Vec::new(),
            events: Vec::new(),
            annotations: Vec::new(),
            annotation_usage: None,
            interface_impls: Vec::new(),
        }
    }

    /// A class deriving from the top type.
    pub fn class(name: impl Into<String>) -> Self {
        let mut info = Self::empty(name, TypeKind::Class);
        info.base = Some(TypeId::OBJECT);
        info
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self::empty(name, TypeKind::Interface)
    }

    pub fn generic_parameter(name: impl Into<String>) -> Self {
        Self::empty(name, TypeKind::GenericParameter)
    }

    /// An annotation kind with the given usage rules.
    pub fn annotation(name: impl Into<String>, usage: AnnotationUsage) -> Self {
        let mut info = Self::class(name);
        info.annotation_usage = Some(usage);
        info
    }

    pub(crate) fn top(name: impl Into<String>) -> Self {
        Self::empty(name, TypeKind::Class)
    }

    pub fn extends(mut self, base: TypeId) -> Self {
        match self.kind {
            TypeKind::Class => self.base = Some(base),
            // interfaces extend interfaces
            TypeKind::Interface => self.interfaces.push(base),
            TypeKind::GenericParameter => self.constraints.push(base),
        }
        self
    }

    pub fn implements(mut self, interface: TypeId) -> Self {
        self.interfaces.push(interface);
        self
    }

    pub fn constrained_by(mut self, constraint: TypeId) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn with_generic_parameters(mut self, params: impl IntoIterator<Item = TypeId>) -> Self {
        self.generic_parameters.extend(params);
        self
    }

    pub fn with_annotation(mut self, annotation: AnnotationInstance) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn with_method(mut self, method: MethodInfo) -> Self {
        self.methods.push(method);
        self
    }

    /// Declares `method` as the explicit implementation of `interface_method`.
    pub fn with_explicit_impl(mut self, interface_method: MemberRef, method: MethodInfo) -> Self {
        let implementation = self.methods.len() as u32;
        self.methods.push(method);
        self.interface_impls.push(InterfaceImpl {
            interface_method,
            implementation,
        });
        self
    }

    pub fn with_property(mut self, decl: PropertyDecl) -> Self {
        let accessor_flags = decl.flags | MemberFlags::SPECIAL_NAME;
        let getter = decl.readable.then(|| {
            let signature = Signature::new(decl.index_parameters.iter().copied(), decl.property_type);
            self.push_accessor(format!("get_{}", decl.name), signature, decl.visibility, accessor_flags)
        });
        let setter = decl.writable.then(|| {
            let mut parameters = decl.index_parameters.clone();
            parameters.push(decl.property_type);
            let signature = Signature::new(parameters, TypeId::VOID);
            self.push_accessor(format!("set_{}", decl.name), signature, decl.visibility, accessor_flags)
        });
        self.properties.push(PropertyInfo {
            name: decl.name,
            property_type: decl.property_type,
            index_parameters: decl.index_parameters.into_iter().collect(),
            getter,
            setter,
            annotations: decl.annotations,
            override_marker: decl.override_marker,
        });
        self
    }

    pub fn with_event(mut self, decl: EventDecl) -> Self {
        let accessor_flags = decl.flags | MemberFlags::SPECIAL_NAME;
        let signature = Signature::new([decl.handler_type], TypeId::VOID);
        let add = self.push_accessor(
            format!("add_{}", decl.name),
            signature.clone(),
            decl.visibility,
            accessor_flags,
        );
        let remove = self.push_accessor(
            format!("remove_{}", decl.name),
            signature,
            decl.visibility,
            accessor_flags,
        );
        self.events.push(EventInfo {
            name: decl.name,
            handler_type: decl.handler_type,
            add: Some(add),
            remove: Some(remove),
            annotations: decl.annotations,
            override_marker: decl.override_marker,
        });
        self
    }

    fn push_accessor(
        &mut self,
        name: String,
        signature: Signature,
        visibility: Visibility,
        flags: MemberFlags,
    ) -> u32 {
        let index = self.methods.len() as u32;
        self.methods.push(
            MethodInfo::new(name, signature)
                .with_visibility(visibility)
                .with_flags(flags),
        );
        index
    }

    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    pub fn is_generic_parameter(&self) -> bool {
        self.kind == TypeKind::GenericParameter
    }

    pub fn is_generic_definition(&self) -> bool {
        !self.generic_parameters.is_empty()
    }

    /// Visibility of a property: the most visible of its accessors.
    pub fn property_visibility(&self, property: &PropertyInfo) -> Visibility {
        self.accessor_visibility([property.getter, property.setter])
    }

    pub fn event_visibility(&self, event: &EventInfo) -> Visibility {
        self.accessor_visibility([event.add, event.remove])
    }

    /// Flags of the first accessor present.
    pub fn property_flags(&self, property: &PropertyInfo) -> MemberFlags {
        self.accessor_flags([property.getter, property.setter])
    }

    pub fn event_flags(&self, event: &EventInfo) -> MemberFlags {
        self.accessor_flags([event.add, event.remove])
    }

    fn accessor_visibility(&self, accessors: [Option<u32>; 2]) -> Visibility {
        accessors
            .into_iter()
            .flatten()
            .filter_map(|index| self.methods.get(index as usize))
            .map(|method| method.visibility)
            .max()
            .unwrap_or(Visibility::Private)
    }

    fn accessor_flags(&self, accessors: [Option<u32>; 2]) -> MemberFlags {
        accessors
            .into_iter()
            .flatten()
            .filter_map(|index| self.methods.get(index as usize))
            .map(|method| method.flags)
            .next()
            .unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "tests/types_tests.rs"]
mod tests;
