//! Dependency edge construction.
//!
//! Face and base-call dependencies are built by the same algorithm; the
//! [`RequirementKind`] selects the requirement collection and the type rule:
//!
//! | Kind | Admitted requirement types |
//! |------|----------------------------|
//! | Face | any type |
//! | BaseCall | interfaces, the top type, aggregating generic parameters |
//!
//! Explicit dependencies naming another configured mixin only constrain the
//! chain order and produce no requirement.

use crate::error::{ConfigurationError, Result};
use crate::inference::{InferredRequirement, RequirementInference};
use crate::model::{DependencyEdge, MixinDefinition, RequirementCollection, RequirementKind};
use mixr_common::{TypeId, TypeTable};
use tracing::trace;

/// Whether `kind` admits `ty` as a requirement type.
pub fn admits_requirement_type(table: &TypeTable, kind: RequirementKind, ty: TypeId) -> bool {
    match kind {
        RequirementKind::Face => true,
        RequirementKind::BaseCall => {
            ty == TypeId::OBJECT || table.is_interface(ty) || table.is_generic_parameter(ty)
        }
    }
}

pub struct DependencyEdgeBuilder<'a> {
    table: &'a TypeTable,
    target: TypeId,
}

impl<'a> DependencyEdgeBuilder<'a> {
    pub fn new(table: &'a TypeTable, target: TypeId) -> Self {
        Self { table, target }
    }

    /// Adds edges from `mixin` to every requirement in `inferred`.
    pub fn add_dependencies(
        &self,
        kind: RequirementKind,
        mixin: &mut MixinDefinition,
        inferred: &[InferredRequirement],
        requirements: &mut RequirementCollection,
    ) -> Result<()> {
        debug_assert_eq!(requirements.kind, kind);
        for node in inferred {
            self.add_edge(kind, mixin, node, None, requirements)?;
        }
        Ok(())
    }

    fn add_edge(
        &self,
        kind: RequirementKind,
        mixin: &mut MixinDefinition,
        node: &InferredRequirement,
        aggregator: Option<TypeId>,
        requirements: &mut RequirementCollection,
    ) -> Result<()> {
        let ty = node.required_type;
        if !admits_requirement_type(self.table, kind, ty) {
            return Err(ConfigurationError::NonInterfaceBaseCallRequirement {
                requirement: self.table.name(ty).to_string(),
                mixin: self.table.name(mixin.mixin_type).to_string(),
                target: self.table.name(self.target).to_string(),
            }
            .into());
        }

        let requirement = requirements.get_or_create(ty);
        requirement.is_aggregator |= self.is_aggregator(node);
        if !requirement.requiring_mixins.contains(&mixin.mixin_type) {
            requirement.requiring_mixins.push(mixin.mixin_type);
        }

        let mixin_type = mixin.mixin_type;
        let edges = mixin.dependencies_mut(kind);
        if !edges.contains_key(&ty) {
            trace!(
                mixin = %self.table.name(mixin_type),
                requirement = %self.table.name(ty),
                %kind,
                "dependency edge"
            );
            edges.insert(
                ty,
                DependencyEdge {
                    depender: mixin_type,
                    kind,
                    requirement: ty,
                    aggregator,
                },
            );
        }

        for child in &node.children {
            self.add_edge(kind, mixin, child, Some(ty), requirements)?;
        }
        Ok(())
    }

    /// Handles the explicitly configured dependencies of `mixin`.
    ///
    /// `configured` lists every mixin type of the context.
    pub fn add_explicit_dependencies(
        &self,
        mixin: &mut MixinDefinition,
        dependencies: &[TypeId],
        configured: &[TypeId],
        inference: &RequirementInference<'_>,
        base_call_requirements: &mut RequirementCollection,
    ) -> Result<()> {
        let own_definition = self.table.generic_definition(mixin.mixin_type);
        for &dependency in dependencies {
            if dependency == mixin.mixin_type || own_definition == Some(dependency) {
                return Err(ConfigurationError::SelfDependency {
                    mixin: self.table.name(mixin.mixin_type).to_string(),
                    target: self.table.name(self.target).to_string(),
                }
                .into());
            }

            let matching = configured.iter().copied().find(|&other| {
                other == dependency || self.table.generic_definition(other) == Some(dependency)
            });
            if let Some(other) = matching {
                if !mixin.mixin_dependencies.contains(&other) {
                    trace!(
                        mixin = %self.table.name(mixin.mixin_type),
                        on = %self.table.name(other),
                        "mixin ordering dependency"
                    );
                    mixin.mixin_dependencies.push(other);
                }
                continue;
            }

            if dependency != TypeId::OBJECT && !self.table.is_interface(dependency) {
                return Err(ConfigurationError::UnconfiguredMixinDependency {
                    mixin: self.table.name(mixin.mixin_type).to_string(),
                    dependency: self.table.name(dependency).to_string(),
                    target: self.table.name(self.target).to_string(),
                }
                .into());
            }
            let node = inference.expand(dependency)?;
            self.add_edge(
                RequirementKind::BaseCall,
                mixin,
                &node,
                None,
                base_call_requirements,
            )?;
        }
        Ok(())
    }

    /// Registers a complete interface (and what it extends) as face requirements.
    pub fn register_complete_interface(
        &self,
        node: &InferredRequirement,
        face_requirements: &mut RequirementCollection,
    ) {
        let requirement = face_requirements.get_or_create(node.required_type);
        requirement.explicitly_requested = true;
        requirement.is_aggregator |= self.is_aggregator(node);
        for child in &node.children {
            self.register_complete_interface(child, face_requirements);
        }
    }

    fn is_aggregator(&self, node: &InferredRequirement) -> bool {
        if node.children.is_empty() {
            return false;
        }
        self.table.get(node.required_type).is_some_and(|info| {
            info.is_generic_parameter()
                || (info.methods.is_empty() && info.properties.is_empty() && info.events.is_empty())
        })
    }
}

#[cfg(test)]
#[path = "tests/dependencies_tests.rs"]
mod tests;
