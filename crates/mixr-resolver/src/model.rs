//! The composition model: the validated blueprint a type emitter consumes.
//!
//! ## Member graph storage
//!
//! Every member definition of one build (target members, mixin members and
//! their property/event accessors) lives in a single [`MemberArena`] and is
//! addressed by [`MemberDefId`]. Override edges are ids in both directions:
//!
//! | Field | Direction | Arity |
//! |-------|-----------|-------|
//! | `base` | overrider -> overridden | at most one |
//! | `overrides` | overridden -> overriders | any number |
//!
//! so the graph can be walked either way without shared ownership.

use crate::context::MemberVisibility;
use crate::error::{InternalError, ensure_invariant};
use indexmap::IndexMap;
use mixr_common::{
    MemberFlags, MemberKind, MemberRef, OverrideMarker, Signature, TypeId, TypeTable, Visibility,
};
use rustc_hash::FxHashMap;
use serde::{Serialize, Serializer};

// =============================================================================
// Member definitions
// =============================================================================

/// Index of a member definition inside a [`MemberArena`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct MemberDefId(pub u32);

impl MemberDefId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// The class a member definition belongs to in the composed type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MemberOwner {
    Target,
    Mixin(TypeId),
}

impl MemberOwner {
    /// The owning type, given the target of the build.
    pub fn owner_type(self, target: TypeId) -> TypeId {
        match self {
            Self::Target => target,
            Self::Mixin(mixin) => mixin,
        }
    }
}

/// Name + signature: the identity under which members are deduplicated
/// and matched.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct MemberKey {
    pub name: String,
    pub signature: Signature,
}

impl MemberKey {
    pub fn new(name: impl Into<String>, signature: Signature) -> Self {
        Self {
            name: name.into(),
            signature,
        }
    }
}

/// Variant data of a member definition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum MemberDefinitionKind {
    Method,
    Property {
        getter: Option<MemberDefId>,
        setter: Option<MemberDefId>,
    },
    Event {
        add: Option<MemberDefId>,
        remove: Option<MemberDefId>,
    },
}

impl MemberDefinitionKind {
    pub fn member_kind(&self) -> MemberKind {
        match self {
            Self::Method => MemberKind::Method,
            Self::Property { .. } => MemberKind::Property,
            Self::Event { .. } => MemberKind::Event,
        }
    }

    /// Accessor method definitions of a property or event.
    pub fn accessors(&self) -> [Option<MemberDefId>; 2] {
        match *self {
            Self::Method => [None, None],
            Self::Property { getter, setter } => [getter, setter],
            Self::Event { add, remove } => [add, remove],
        }
    }
}

/// An annotation carried by a type or member definition.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct AnnotationDefinition {
    pub kind: TypeId,
    pub arguments: Vec<String>,
    pub copied: bool,
}

impl From<&mixr_common::AnnotationInstance> for AnnotationDefinition {
    fn from(instance: &mixr_common::AnnotationInstance) -> Self {
        Self {
            kind: instance.kind,
            arguments: instance.arguments.clone(),
            copied: instance.copied,
        }
    }
}

/// Where an introduced annotation came from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AnnotationSource {
    Mixin(TypeId),
    Member(MemberDefId),
}

/// Attribute introduction: an annotation placed on the composed surface.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AnnotationIntroduction {
    pub annotation: AnnotationDefinition,
    pub source: AnnotationSource,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MemberDefinition {
    pub id: MemberDefId,
    pub owner: MemberOwner,
    /// Underlying metadata member; its owner may be a base class of the
    /// definition's owner.
    pub member: MemberRef,
    pub name: String,
    pub signature: Signature,
    pub visibility: Visibility,
    pub flags: MemberFlags,
    #[serde(flatten)]
    pub kind: MemberDefinitionKind,
    pub annotations: Vec<AnnotationDefinition>,
    /// Annotations introduced onto this member by its overriders.
    pub received_annotations: Vec<AnnotationIntroduction>,
    pub override_marker: Option<OverrideMarker>,
    /// The member this one overrides.
    pub base: Option<MemberDefId>,
    /// Members overriding this one.
    pub overrides: Vec<MemberDefId>,
}

impl MemberDefinition {
    pub fn member_kind(&self) -> MemberKind {
        self.kind.member_kind()
    }

    pub fn key(&self) -> MemberKey {
        MemberKey::new(self.name.clone(), self.signature.clone())
    }

    /// Every annotation kind this definition carries, own or received.
    pub fn carried_annotations(&self) -> impl Iterator<Item = &AnnotationDefinition> {
        self.annotations
            .iter()
            .chain(self.received_annotations.iter().map(|r| &r.annotation))
    }
}

/// Owning storage for all member definitions of one build.
#[derive(Clone, Debug, Default, Serialize)]
pub struct MemberArena {
    members: Vec<MemberDefinition>,
    #[serde(skip)]
    by_member: FxHashMap<(MemberOwner, MemberRef), MemberDefId>,
}

impl MemberArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a definition, assigning its id.
    pub(crate) fn alloc(&mut self, mut definition: MemberDefinition) -> MemberDefId {
        let id = MemberDefId(self.members.len() as u32);
        definition.id = id;
        self.by_member
            .insert((definition.owner, definition.member), id);
        self.members.push(definition);
        id
    }

    pub fn get(&self, id: MemberDefId) -> Option<&MemberDefinition> {
        self.members.get(id.index())
    }

    pub(crate) fn get_mut(&mut self, id: MemberDefId) -> Option<&mut MemberDefinition> {
        self.members.get_mut(id.index())
    }

    /// Definition created for `member` on behalf of `owner`.
    pub fn find(&self, owner: MemberOwner, member: MemberRef) -> Option<MemberDefId> {
        self.by_member.get(&(owner, member)).copied()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MemberDefinition> {
        self.members.iter()
    }

    /// Records `overrider` overriding `base`, accessors included.
    pub(crate) fn link_override(
        &mut self,
        overrider: MemberDefId,
        base: MemberDefId,
    ) -> Result<(), InternalError> {
        let (overrider_accessors, base_accessors) = {
            let o = self
                .get(overrider)
                .ok_or_else(|| InternalError::new(format!("unknown overrider {overrider:?}")))?;
            let b = self
                .get(base)
                .ok_or_else(|| InternalError::new(format!("unknown base member {base:?}")))?;
            ensure_invariant(o.member_kind() == b.member_kind(), || {
                format!("override links a {} to a {}", o.member_kind(), b.member_kind())
            })?;
            ensure_invariant(o.base.is_none(), || {
                format!("'{}' already has a base member", o.name)
            })?;
            (o.kind.accessors(), b.kind.accessors())
        };

        self.set_link(overrider, base);
        for (o, b) in overrider_accessors.into_iter().zip(base_accessors) {
            if let (Some(o), Some(b)) = (o, b) {
                self.set_link(o, b);
            }
        }
        Ok(())
    }

    fn set_link(&mut self, overrider: MemberDefId, base: MemberDefId) {
        if let Some(o) = self.get_mut(overrider) {
            o.base = Some(base);
        }
        if let Some(b) = self.get_mut(base) {
            b.overrides.push(overrider);
        }
    }

    /// `Owner.Name(Params)` of a definition, for diagnostics.
    pub fn display(&self, table: &TypeTable, target: TypeId, id: MemberDefId) -> String {
        let Some(def) = self.get(id) else {
            return format!("<member {}>", id.0);
        };
        let owner = table.name(def.owner.owner_type(target));
        match def.member_kind() {
            MemberKind::Method => format!(
                "{owner}.{}({})",
                def.name,
                table.display_parameters(&def.signature)
            ),
            MemberKind::Property | MemberKind::Event => format!("{owner}.{}", def.name),
        }
    }
}

impl std::ops::Index<MemberDefId> for MemberArena {
    type Output = MemberDefinition;

    fn index(&self, id: MemberDefId) -> &MemberDefinition {
        &self.members[id.index()]
    }
}

fn serialize_ids<S: Serializer>(
    map: &IndexMap<MemberKey, MemberDefId>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(map.values())
}

/// The deduplicated members of one class, keyed by name + signature.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ClassMembers {
    #[serde(serialize_with = "serialize_ids")]
    pub methods: IndexMap<MemberKey, MemberDefId>,
    #[serde(serialize_with = "serialize_ids")]
    pub properties: IndexMap<MemberKey, MemberDefId>,
    #[serde(serialize_with = "serialize_ids")]
    pub events: IndexMap<MemberKey, MemberDefId>,
}

impl ClassMembers {
    pub fn of_kind(&self, kind: MemberKind) -> &IndexMap<MemberKey, MemberDefId> {
        match kind {
            MemberKind::Method => &self.methods,
            MemberKind::Property => &self.properties,
            MemberKind::Event => &self.events,
        }
    }

    pub fn all(&self) -> impl Iterator<Item = MemberDefId> + '_ {
        self.methods
            .values()
            .chain(self.properties.values())
            .chain(self.events.values())
            .copied()
    }
}

// =============================================================================
// Mixins, requirements and dependencies
// =============================================================================

/// Requirement flavor.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RequirementKind {
    /// Needed on the outward-facing composed object (`TTarget`).
    Face,
    /// Needed on the base-call chain a mixin calls into (`TNext`).
    BaseCall,
}

impl std::fmt::Display for RequirementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Face => "face",
            Self::BaseCall => "base call",
        })
    }
}

/// A mixin's dependency on a requirement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DependencyEdge {
    pub depender: TypeId,
    pub kind: RequirementKind,
    pub requirement: TypeId,
    /// The umbrella requirement this edge was expanded from.
    pub aggregator: Option<TypeId>,
}

/// How a required method got its implementation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BindingSource {
    /// The target implements the interface itself.
    DeclaredImplementation,
    /// A mixin introduces the interface onto the target.
    IntroducedInterface,
    /// A target member matches by name and signature.
    Structural,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RequiredMethodBinding {
    pub required_method: MemberRef,
    pub implementer: MemberDefId,
    pub source: BindingSource,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RequirementDefinition {
    pub kind: RequirementKind,
    pub required_type: TypeId,
    /// Mixins with an edge to this requirement, in registration order.
    pub requiring_mixins: Vec<TypeId>,
    /// Registered because the context lists it as a complete interface.
    pub explicitly_requested: bool,
    /// Umbrella requirement (generic parameter or empty extending interface)
    /// satisfied through its aggregated requirements.
    pub is_aggregator: bool,
    /// Populated by the binder; complete or the build has failed.
    pub required_methods: Vec<RequiredMethodBinding>,
}

impl RequirementDefinition {
    pub fn new(kind: RequirementKind, required_type: TypeId) -> Self {
        Self {
            kind,
            required_type,
            requiring_mixins: Vec::new(),
            explicitly_requested: false,
            is_aggregator: false,
            required_methods: Vec::new(),
        }
    }
}

/// Requirements of one kind, keyed by required type in registration order.
#[derive(Clone, Debug, Serialize)]
pub struct RequirementCollection {
    pub kind: RequirementKind,
    pub items: IndexMap<TypeId, RequirementDefinition>,
}

impl RequirementCollection {
    pub fn new(kind: RequirementKind) -> Self {
        Self {
            kind,
            items: IndexMap::new(),
        }
    }

    pub fn get(&self, required_type: TypeId) -> Option<&RequirementDefinition> {
        self.items.get(&required_type)
    }

    pub(crate) fn get_or_create(&mut self, required_type: TypeId) -> &mut RequirementDefinition {
        let kind = self.kind;
        self.items
            .entry(required_type)
            .or_insert_with(|| RequirementDefinition::new(kind, required_type))
    }

    pub fn iter(&self) -> impl Iterator<Item = &RequirementDefinition> {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct MixinDefinition {
    pub mixin_type: TypeId,
    pub members: ClassMembers,
    pub annotations: Vec<AnnotationDefinition>,
    pub introduced_member_visibility: MemberVisibility,
    pub face_dependencies: IndexMap<TypeId, DependencyEdge>,
    pub base_call_dependencies: IndexMap<TypeId, DependencyEdge>,
    /// Explicit ordering dependencies on other configured mixins.
    pub mixin_dependencies: Vec<TypeId>,
    /// Interfaces this mixin introduces onto the target.
    pub introduced_interfaces: Vec<TypeId>,
    index: Option<usize>,
}

impl MixinDefinition {
    pub fn new(
        mixin_type: TypeId,
        members: ClassMembers,
        annotations: Vec<AnnotationDefinition>,
        introduced_member_visibility: MemberVisibility,
    ) -> Self {
        Self {
            mixin_type,
            members,
            annotations,
            introduced_member_visibility,
            face_dependencies: IndexMap::new(),
            base_call_dependencies: IndexMap::new(),
            mixin_dependencies: Vec::new(),
            introduced_interfaces: Vec::new(),
            index: None,
        }
    }

    /// Position in the base-call chain; `None` until the mixins are sorted.
    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub(crate) fn assign_index(&mut self, index: usize) {
        self.index = Some(index);
    }

    pub fn dependencies(&self, kind: RequirementKind) -> &IndexMap<TypeId, DependencyEdge> {
        match kind {
            RequirementKind::Face => &self.face_dependencies,
            RequirementKind::BaseCall => &self.base_call_dependencies,
        }
    }

    pub(crate) fn dependencies_mut(
        &mut self,
        kind: RequirementKind,
    ) -> &mut IndexMap<TypeId, DependencyEdge> {
        match kind {
            RequirementKind::Face => &mut self.face_dependencies,
            RequirementKind::BaseCall => &mut self.base_call_dependencies,
        }
    }
}

// =============================================================================
// Introductions
// =============================================================================

/// One interface member made available on the composed type by a mixin.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MemberIntroduction {
    pub kind: MemberKind,
    /// Method, property or event of the introduced interface.
    pub interface_member: MemberRef,
    /// The implementing mixin member.
    pub implementer: MemberDefId,
    pub visibility: MemberVisibility,
}

/// Interface introduction: an interface a mixin adds to the composed type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct InterfaceIntroduction {
    pub interface: TypeId,
    pub implementer: TypeId,
    pub methods: Vec<MemberIntroduction>,
    pub properties: Vec<MemberIntroduction>,
    pub events: Vec<MemberIntroduction>,
}

impl InterfaceIntroduction {
    pub fn introductions(&self, kind: MemberKind) -> &[MemberIntroduction] {
        match kind {
            MemberKind::Method => &self.methods,
            MemberKind::Property => &self.properties,
            MemberKind::Event => &self.events,
        }
    }

    /// Implementer of an interface member.
    pub fn implementer_of(&self, interface_member: MemberRef) -> Option<MemberDefId> {
        self.introductions(interface_member.kind)
            .iter()
            .find(|i| i.interface_member == interface_member)
            .map(|i| i.implementer)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NonIntroductionReason {
    /// The target already implements the interface.
    ImplementedByTarget,
    /// The mixin opted out of introducing it.
    Suppressed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NonIntroducedInterface {
    pub interface: TypeId,
    pub mixin: TypeId,
    pub reason: NonIntroductionReason,
}

// =============================================================================
// CompositionModel
// =============================================================================

/// Complete, validated result of composing one context.
#[derive(Clone, Debug, Serialize)]
pub struct CompositionModel {
    pub target: TypeId,
    pub members: MemberArena,
    pub target_members: ClassMembers,
    pub target_annotations: Vec<AnnotationDefinition>,
    /// Annotations introduced onto the target class by its mixins.
    pub received_annotations: Vec<AnnotationIntroduction>,
    /// Mixins in base-call chain order; `mixins[i].index() == Some(i)`.
    pub mixins: Vec<MixinDefinition>,
    pub face_requirements: RequirementCollection,
    pub base_call_requirements: RequirementCollection,
    pub introduced_interfaces: IndexMap<TypeId, InterfaceIntroduction>,
    pub non_introduced_interfaces: Vec<NonIntroducedInterface>,
}

impl CompositionModel {
    pub fn mixin(&self, mixin_type: TypeId) -> Option<&MixinDefinition> {
        self.mixins.iter().find(|m| m.mixin_type == mixin_type)
    }

    /// Chain position of a mixin.
    pub fn mixin_index(&self, mixin_type: TypeId) -> Option<usize> {
        self.mixin(mixin_type).and_then(MixinDefinition::index)
    }

    pub fn requirements(&self, kind: RequirementKind) -> &RequirementCollection {
        match kind {
            RequirementKind::Face => &self.face_requirements,
            RequirementKind::BaseCall => &self.base_call_requirements,
        }
    }

    /// Target member definition by kind, name and signature.
    pub fn target_member(&self, kind: MemberKind, key: &MemberKey) -> Option<&MemberDefinition> {
        self.target_members
            .of_kind(kind)
            .get(key)
            .and_then(|&id| self.members.get(id))
    }

    /// First target method with the given name.
    pub fn target_method_named(&self, name: &str) -> Option<&MemberDefinition> {
        self.target_members
            .methods
            .iter()
            .find(|(key, _)| key.name == name)
            .and_then(|(_, &id)| self.members.get(id))
    }

    /// Mixin member definition by kind and name.
    pub fn mixin_member_named(
        &self,
        mixin_type: TypeId,
        kind: MemberKind,
        name: &str,
    ) -> Option<&MemberDefinition> {
        self.mixin(mixin_type)?
            .members
            .of_kind(kind)
            .iter()
            .find(|(key, _)| key.name == name)
            .and_then(|(_, &id)| self.members.get(id))
    }
}
