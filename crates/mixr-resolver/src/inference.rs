//! Mixin requirement inference.
//!
//! A mixin declares what it needs from its host through the generic
//! arguments of its mixin base:
//!
//! | Base | Argument 0 | Argument 1 |
//! |------|------------|------------|
//! | `Mixin<TTarget>` | face requirement | - |
//! | `Mixin<TTarget, TNext>` | face requirement | base-call requirement |
//!
//! An argument that is an open generic parameter aggregates its
//! constraints; any other argument is required together with every
//! interface it transitively extends.

use crate::error::{ConfigurationError, InternalError, Result};
use mixr_common::limits::MAX_INTERFACE_NESTING;
use mixr_common::{TypeId, TypeTable};
use tracing::trace;

/// A required type and the requirements it aggregates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InferredRequirement {
    pub required_type: TypeId,
    pub children: Vec<InferredRequirement>,
}

impl InferredRequirement {
    pub fn leaf(required_type: TypeId) -> Self {
        Self {
            required_type,
            children: Vec::new(),
        }
    }

    /// This node and all aggregated nodes, depth first.
    pub fn flatten(&self) -> Vec<TypeId> {
        let mut out = vec![self.required_type];
        for child in &self.children {
            out.extend(child.flatten());
        }
        out
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InferredRequirements {
    pub face: Vec<InferredRequirement>,
    pub base_call: Vec<InferredRequirement>,
}

pub struct RequirementInference<'a> {
    table: &'a TypeTable,
}

impl<'a> RequirementInference<'a> {
    pub fn new(table: &'a TypeTable) -> Self {
        Self { table }
    }

    /// Requirements implied by the declaration of `mixin`.
    pub fn infer(&self, mixin: TypeId, target: TypeId) -> Result<InferredRequirements> {
        if mixin.is_mixin_base()
            || self
                .table
                .generic_definition(mixin)
                .is_some_and(TypeId::is_mixin_base)
        {
            return Err(ConfigurationError::MixinBaseAppliedDirectly {
                mixin: self.table.name(mixin).to_string(),
                target: self.table.name(target).to_string(),
            }
            .into());
        }

        let chain = self.table.base_chain(mixin)?;
        let Some(base) = chain.iter().skip(1).copied().find(|&ty| {
            self.table
                .generic_definition(ty)
                .is_some_and(TypeId::is_mixin_base)
        }) else {
            trace!(mixin = %self.table.name(mixin), "not derived from a mixin base");
            return Ok(InferredRequirements::default());
        };

        let arguments = &self.table.info(base).generic_arguments;
        let mut inferred = InferredRequirements::default();
        if let Some(&face) = arguments.first() {
            inferred.face.push(self.expand(face)?);
        }
        if let Some(&next) = arguments.get(1) {
            inferred.base_call.push(self.expand(next)?);
        }
        trace!(
            mixin = %self.table.name(mixin),
            face = inferred.face.len(),
            base_call = inferred.base_call.len(),
            "inferred requirements"
        );
        Ok(inferred)
    }

    /// Expands a requirement argument into its aggregation tree.
    pub fn expand(&self, argument: TypeId) -> Result<InferredRequirement, InternalError> {
        self.expand_at(argument, 0)
    }

    fn expand_at(
        &self,
        argument: TypeId,
        depth: usize,
    ) -> Result<InferredRequirement, InternalError> {
        if depth > MAX_INTERFACE_NESTING {
            return Err(InternalError::new(format!(
                "requirement expansion below '{}' exceeds the nesting limit",
                self.table.name(argument)
            )));
        }
        let info = self
            .table
            .get(argument)
            .ok_or_else(|| InternalError::new(format!("unknown requirement type {}", argument.0)))?;

        let nested = if info.is_generic_parameter() {
            &info.constraints
        } else if info.is_interface() {
            &info.interfaces
        } else {
            return Ok(InferredRequirement::leaf(argument));
        };

        let mut children = Vec::with_capacity(nested.len());
        for &ty in nested {
            children.push(self.expand_at(ty, depth + 1)?);
        }
        Ok(InferredRequirement {
            required_type: argument,
            children,
        })
    }
}

#[cfg(test)]
#[path = "tests/inference_tests.rs"]
mod tests;
