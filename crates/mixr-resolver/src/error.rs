//! Error channel of the composition engine.
//!
//! Two disjoint kinds:
//! - [`ConfigurationError`]: a user-fixable problem in the context or the
//!   type metadata. Messages always carry fully-qualified names.
//! - [`InternalError`]: an engine invariant did not hold. This is a defect in
//!   the engine, never something the caller can fix by changing input.

use mixr_common::{MemberKind, TableError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("cannot compose mixins onto '{target}': the target type contains unresolved generic parameters")]
    OpenGenericTarget { target: String },

    #[error("type id {id} referenced by the context of '{target}' is not registered")]
    UnknownType { id: u32, target: String },

    #[error("'{mixin}' is a mixin base type and cannot be applied as a mixin itself (target '{target}')")]
    MixinBaseAppliedDirectly { mixin: String, target: String },

    #[error("mixin '{mixin}' applied to '{target}' declares a dependency on itself")]
    SelfDependency { mixin: String, target: String },

    #[error("mixin '{mixin}' applied to '{target}' suppresses itself through the replace rule '{rule}'")]
    SelfSuppression {
        mixin: String,
        rule: String,
        target: String,
    },

    #[error("mixin '{mixin}' is configured more than once for '{target}'")]
    DuplicateMixin { mixin: String, target: String },

    #[error("mixin '{mixin}' applied to '{target}' depends on '{dependency}', which is neither an interface nor a mixin configured for the target")]
    UnconfiguredMixinDependency {
        mixin: String,
        dependency: String,
        target: String,
    },

    #[error("base call dependency '{requirement}' of mixin '{mixin}' applied to '{target}' must be an interface")]
    NonInterfaceBaseCallRequirement {
        requirement: String,
        mixin: String,
        target: String,
    },

    #[error("the dependency '{requirement}' (required by {requirers} applied to class '{target}') is not fulfilled: public or protected member '{member}' could not be found on the target class")]
    UnmetRequirement {
        member: String,
        requirement: String,
        target: String,
        requirers: String,
    },

    #[error("the dependency '{requirement}' (required by {requirers}) is not fulfilled: class '{target}' does not derive from it")]
    UnsatisfiedClassRequirement {
        requirement: String,
        target: String,
        requirers: String,
    },

    #[error("the {kind} overridden by '{overrider}' could not be found on {scope}")]
    OverriddenMemberNotFound {
        kind: MemberKind,
        overrider: String,
        scope: String,
    },

    #[error("ambiguous override: '{overrider}' matches both '{first}' and '{second}'; name the intended declaring type on the override")]
    AmbiguousOverride {
        overrider: String,
        first: String,
        second: String,
    },

    #[error("the mixins applied to '{target}' contain circular dependencies: {}", .mixins.join(" -> "))]
    CircularDependency { target: String, mixins: Vec<String> },

    #[error("interface '{interface}' is introduced by both '{first}' and '{second}' onto '{target}'")]
    DuplicateIntroduction {
        interface: String,
        first: String,
        second: String,
        target: String,
    },
}

/// An engine invariant failed. Always a bug, never a configuration problem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("internal invariant violated: {message}")]
pub struct InternalError {
    pub message: String,
}

impl InternalError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<TableError> for InternalError {
    fn from(err: TableError) -> Self {
        Self::new(format!("type metadata traversal failed: {err}"))
    }
}

/// Failure of one composition build.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompositionError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl CompositionError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    pub fn as_configuration(&self) -> Option<&ConfigurationError> {
        match self {
            Self::Configuration(err) => Some(err),
            Self::Internal(_) => None,
        }
    }
}

impl From<TableError> for CompositionError {
    fn from(err: TableError) -> Self {
        Self::Internal(err.into())
    }
}

/// Returns an [`InternalError`] when `condition` does not hold.
pub(crate) fn ensure_invariant(
    condition: bool,
    message: impl FnOnce() -> String,
) -> Result<(), InternalError> {
    if condition {
        Ok(())
    } else {
        Err(InternalError::new(message()))
    }
}

pub type Result<T, E = CompositionError> = std::result::Result<T, E>;
