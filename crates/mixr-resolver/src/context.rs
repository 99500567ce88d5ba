//! Context descriptions: the input of one composition build.
//!
//! A context is produced upstream (by attribute scanning, a manifest loader
//! or a test) and is never mutated by the engine.

use mixr_common::TypeId;
use serde::{Deserialize, Serialize};

/// Visibility given to interface members a mixin introduces onto the
/// composed type.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MemberVisibility {
    /// Explicit interface implementation: reachable only through the interface.
    #[default]
    Private,
    Public,
}

/// One mixin applied to the target.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MixinDescriptor {
    pub mixin_type: TypeId,
    /// Explicit dependencies: configured mixin types (ordering only) or
    /// interfaces (base-call requirements).
    #[serde(default)]
    pub explicit_dependencies: Vec<TypeId>,
    #[serde(default)]
    pub introduced_member_visibility: MemberVisibility,
    /// Replace rules: mixin types or generic definitions removed from the context.
    #[serde(default)]
    pub suppressed_mixins: Vec<TypeId>,
    /// Interfaces this mixin implements but does not introduce.
    #[serde(default)]
    pub non_introduced: Vec<TypeId>,
}

impl MixinDescriptor {
    pub fn new(mixin_type: TypeId) -> Self {
        Self {
            mixin_type,
            explicit_dependencies: Vec::new(),
            introduced_member_visibility: MemberVisibility::Private,
            suppressed_mixins: Vec::new(),
            non_introduced: Vec::new(),
        }
    }

    pub fn depends_on(mut self, dependency: TypeId) -> Self {
        self.explicit_dependencies.push(dependency);
        self
    }

    pub fn introducing_public_members(mut self) -> Self {
        self.introduced_member_visibility = MemberVisibility::Public;
        self
    }

    pub fn replaces(mut self, suppressed: TypeId) -> Self {
        self.suppressed_mixins.push(suppressed);
        self
    }

    pub fn without_introducing(mut self, interface: TypeId) -> Self {
        self.non_introduced.push(interface);
        self
    }

    /// Every type id this descriptor mentions.
    pub(crate) fn referenced_types(&self) -> impl Iterator<Item = TypeId> + '_ {
        std::iter::once(self.mixin_type)
            .chain(self.explicit_dependencies.iter().copied())
            .chain(self.suppressed_mixins.iter().copied())
            .chain(self.non_introduced.iter().copied())
    }
}

/// Everything needed to compose one target type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextDescription {
    pub target: TypeId,
    #[serde(default)]
    pub mixins: Vec<MixinDescriptor>,
    /// Interfaces the composed type must implement in full.
    #[serde(default)]
    pub complete_interfaces: Vec<TypeId>,
}

impl ContextDescription {
    pub fn new(target: TypeId) -> Self {
        Self {
            target,
            mixins: Vec::new(),
            complete_interfaces: Vec::new(),
        }
    }

    pub fn with_mixin(mut self, mixin: MixinDescriptor) -> Self {
        self.mixins.push(mixin);
        self
    }

    pub fn with_complete_interface(mut self, interface: TypeId) -> Self {
        self.complete_interfaces.push(interface);
        self
    }

    pub(crate) fn referenced_types(&self) -> impl Iterator<Item = TypeId> + '_ {
        std::iter::once(self.target)
            .chain(self.mixins.iter().flat_map(MixinDescriptor::referenced_types))
            .chain(self.complete_interfaces.iter().copied())
    }
}
