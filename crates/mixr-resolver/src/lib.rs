//! Mixin Composition Resolver
//!
//! Given a target class, the mixins configured for it and the complete
//! interfaces it must implement, this crate computes a validated
//! [`CompositionModel`]: the blueprint a type emitter needs to generate the
//! composed type.
//!
//! The build resolves:
//! - the members of the target and every mixin (hidden members dropped)
//! - the requirements each mixin places on the composed object (face) and
//!   on the chain it calls into (base call)
//! - a deterministic order of the base-call chain
//! - an implementation for every required interface method
//! - override links between mixin and target members
//! - interfaces and annotations introduced onto the composed type
//!
//! Every failure is either a [`ConfigurationError`] (the context or the
//! metadata is wrong) or an [`InternalError`] (the engine is wrong).
//!
//! ```ignore
//! let model = CompositionBuilder::new(&table).build(&context)?;
//! for mixin in &model.mixins {
//!     println!("{:?} at {:?}", mixin.mixin_type, mixin.index());
//! }
//! ```

mod annotations;
mod binder;
mod compose;
pub mod context;
mod dependencies;
pub mod error;
mod inference;
mod introductions;
mod members;
pub mod model;
mod options;
mod overrides;
mod sorter;

pub use annotations::AnnotationIntroducer;
pub use binder::RequirementBinder;
pub use compose::{CompositionBuilder, build_composition};
pub use context::{ContextDescription, MemberVisibility, MixinDescriptor};
pub use dependencies::{DependencyEdgeBuilder, admits_requirement_type};
pub use error::{CompositionError, ConfigurationError, InternalError, Result};
pub use inference::{InferredRequirement, InferredRequirements, RequirementInference};
pub use introductions::InterfaceIntroducer;
pub use members::MemberCollector;
pub use model::{
    AnnotationDefinition, AnnotationIntroduction, AnnotationSource, BindingSource, ClassMembers,
    CompositionModel, DependencyEdge, InterfaceIntroduction, MemberArena, MemberDefId,
    MemberDefinition, MemberDefinitionKind, MemberIntroduction, MemberKey, MemberOwner,
    MixinDefinition, NonIntroducedInterface, NonIntroductionReason, RequiredMethodBinding,
    RequirementCollection, RequirementDefinition, RequirementKind,
};
pub use options::CompositionOptions;
pub use overrides::{BaseMemberIndex, OverrideAnalyzer};
pub use sorter::MixinSorter;

#[cfg(test)]
#[path = "tests/test_fixtures.rs"]
pub(crate) mod test_fixtures;
