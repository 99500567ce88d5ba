//! Composition orchestration.
//!
//! `CompositionBuilder::build` runs the phases of one build in a fixed
//! order over a shared member arena:
//!
//! 1. validation of the context (known types, closed target, suppression)
//! 2. member collection for the target and every active mixin
//! 3. interface introductions and dependency edges
//! 4. chain ordering
//! 5. requirement binding (face, then base call)
//! 6. override analysis
//! 7. annotation introduction
//!
//! Each build owns all of its state; the type table is only read.

use crate::annotations::AnnotationIntroducer;
use crate::binder::RequirementBinder;
use crate::context::{ContextDescription, MixinDescriptor};
use crate::dependencies::DependencyEdgeBuilder;
use crate::error::{ConfigurationError, InternalError, Result, ensure_invariant};
use crate::inference::RequirementInference;
use crate::introductions::InterfaceIntroducer;
use crate::members::MemberCollector;
use crate::model::{
    AnnotationDefinition, AnnotationIntroduction, AnnotationSource, CompositionModel, MemberArena,
    MemberOwner, MixinDefinition, RequirementCollection, RequirementKind,
};
use crate::options::CompositionOptions;
use crate::overrides::OverrideAnalyzer;
use crate::sorter::MixinSorter;
use indexmap::IndexMap;
use mixr_common::{OverrideDirection, TypeId, TypeTable};
use rustc_hash::FxHashSet;
use tracing::{debug, debug_span, trace};

/// Builds composition models over one type table.
pub struct CompositionBuilder<'a> {
    table: &'a TypeTable,
    options: CompositionOptions,
}

impl<'a> CompositionBuilder<'a> {
    pub fn new(table: &'a TypeTable) -> Self {
        Self {
            table,
            options: CompositionOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CompositionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> CompositionOptions {
        self.options
    }

    /// Composes the mixins of `context` onto its target.
    pub fn build(&self, context: &ContextDescription) -> Result<CompositionModel> {
        let target = context.target;
        self.validate_references(context)?;
        let target_name = self.table.name(target);
        let _span = debug_span!("compose", target = %target_name).entered();

        if self.table.contains_generic_parameters(target) {
            return Err(ConfigurationError::OpenGenericTarget {
                target: target_name.to_string(),
            }
            .into());
        }

        let active = self.active_mixins(context)?;
        let configured: Vec<TypeId> = active.iter().map(|d| d.mixin_type).collect();
        debug!(mixins = active.len(), "active mixins");

        let mut arena = MemberArena::new();
        let collector = MemberCollector::new(self.table);
        let target_members =
            collector.collect(target, MemberOwner::Target, &mut arena, |_, _| true)?;
        let target_annotations = collector.collect_type_annotations(target)?;

        let inference = RequirementInference::new(self.table);
        let edges = DependencyEdgeBuilder::new(self.table, target);
        let introducer = InterfaceIntroducer::new(self.table, target)?;
        let mut face_requirements = RequirementCollection::new(RequirementKind::Face);
        let mut base_call_requirements = RequirementCollection::new(RequirementKind::BaseCall);
        let mut introduced_interfaces = IndexMap::new();
        let mut non_introduced_interfaces = Vec::new();

        for &interface in &context.complete_interfaces {
            let node = inference.expand(interface)?;
            edges.register_complete_interface(&node, &mut face_requirements);
        }

        let mut mixins = Vec::with_capacity(active.len());
        for descriptor in &active {
            let mixin_type = descriptor.mixin_type;
            let inferred = inference.infer(mixin_type, target)?;
            let members = collector.collect(
                mixin_type,
                MemberOwner::Mixin(mixin_type),
                &mut arena,
                |_, _| true,
            )?;
            let annotations = collector.collect_type_annotations(mixin_type)?;
            let mut mixin = MixinDefinition::new(
                mixin_type,
                members,
                annotations,
                descriptor.introduced_member_visibility,
            );

            introducer.introduce(
                &mut mixin,
                &descriptor.non_introduced,
                &arena,
                &mut introduced_interfaces,
                &mut non_introduced_interfaces,
            )?;
            edges.add_dependencies(
                RequirementKind::Face,
                &mut mixin,
                &inferred.face,
                &mut face_requirements,
            )?;
            edges.add_dependencies(
                RequirementKind::BaseCall,
                &mut mixin,
                &inferred.base_call,
                &mut base_call_requirements,
            )?;
            edges.add_explicit_dependencies(
                &mut mixin,
                &descriptor.explicit_dependencies,
                &configured,
                &inference,
                &mut base_call_requirements,
            )?;
            mixins.push(mixin);
        }

        let mixins = MixinSorter::new(self.table, target).sort(mixins, &introduced_interfaces)?;

        let binder = RequirementBinder::new(self.table, target, self.options)?;
        binder.bind_all(
            &mut face_requirements,
            &arena,
            &target_members,
            &introduced_interfaces,
        )?;
        binder.bind_all(
            &mut base_call_requirements,
            &arena,
            &target_members,
            &introduced_interfaces,
        )?;

        OverrideAnalyzer::new(self.table, target).analyze(&mut arena, &target_members, &mixins)?;

        let mut received_annotations = Vec::new();
        if self.options.introduce_annotations {
            self.introduce_annotations(
                &mixins,
                &target_annotations,
                &mut received_annotations,
                &mut arena,
            )?;
        }

        let model = CompositionModel {
            target,
            members: arena,
            target_members,
            target_annotations,
            received_annotations,
            mixins,
            face_requirements,
            base_call_requirements,
            introduced_interfaces,
            non_introduced_interfaces,
        };
        self.check_model(&model)?;

        debug!(
            mixins = model.mixins.len(),
            members = model.members.len(),
            introduced = model.introduced_interfaces.len(),
            "composed"
        );
        Ok(model)
    }

    fn validate_references(&self, context: &ContextDescription) -> Result<()> {
        let target_name = if self.table.contains(context.target) {
            self.table.name(context.target).to_string()
        } else {
            format!("#{}", context.target.0)
        };
        if let Some(unknown) = context.referenced_types().find(|&ty| !self.table.contains(ty)) {
            return Err(ConfigurationError::UnknownType {
                id: unknown.0,
                target: target_name,
            }
            .into());
        }
        Ok(())
    }

    /// Applies replace rules and rejects duplicate mixins.
    fn active_mixins<'c>(
        &self,
        context: &'c ContextDescription,
    ) -> Result<Vec<&'c MixinDescriptor>> {
        let target_name = self.table.name(context.target);
        let matches_rule = |mixin: TypeId, rule: TypeId| {
            mixin == rule || self.table.generic_definition(mixin) == Some(rule)
        };

        let mut rules: Vec<TypeId> = Vec::new();
        for descriptor in &context.mixins {
            for &rule in &descriptor.suppressed_mixins {
                if matches_rule(descriptor.mixin_type, rule) {
                    return Err(ConfigurationError::SelfSuppression {
                        mixin: self.table.name(descriptor.mixin_type).to_string(),
                        rule: self.table.name(rule).to_string(),
                        target: target_name.to_string(),
                    }
                    .into());
                }
                rules.push(rule);
            }
        }

        let mut seen = FxHashSet::default();
        let mut active = Vec::with_capacity(context.mixins.len());
        for descriptor in &context.mixins {
            if rules.iter().any(|&rule| matches_rule(descriptor.mixin_type, rule)) {
                trace!(mixin = %self.table.name(descriptor.mixin_type), "suppressed");
                continue;
            }
            if !seen.insert(descriptor.mixin_type) {
                return Err(ConfigurationError::DuplicateMixin {
                    mixin: self.table.name(descriptor.mixin_type).to_string(),
                    target: target_name.to_string(),
                }
                .into());
            }
            active.push(descriptor);
        }
        Ok(active)
    }

    fn introduce_annotations(
        &self,
        mixins: &[MixinDefinition],
        target_annotations: &[AnnotationDefinition],
        received: &mut Vec<AnnotationIntroduction>,
        arena: &mut MemberArena,
    ) -> Result<(), InternalError> {
        let introducer = AnnotationIntroducer::new(self.table);
        for mixin in mixins {
            introducer.introduce(
                &mixin.annotations,
                AnnotationSource::Mixin(mixin.mixin_type),
                target_annotations,
                received,
            );
        }

        let overrides: Vec<_> = arena
            .iter()
            .filter_map(|def| def.base.map(|base| (def.id, base)))
            .collect();
        for (overrider, base) in overrides {
            let source = arena[overrider].annotations.clone();
            let base = arena
                .get_mut(base)
                .ok_or_else(|| InternalError::new(format!("unknown base member {base:?}")))?;
            introducer.introduce(
                &source,
                AnnotationSource::Member(overrider),
                &base.annotations,
                &mut base.received_annotations,
            );
        }
        Ok(())
    }

    fn check_model(&self, model: &CompositionModel) -> Result<(), InternalError> {
        for (position, mixin) in model.mixins.iter().enumerate() {
            ensure_invariant(mixin.index() == Some(position), || {
                format!(
                    "mixin '{}' at position {position} has index {:?}",
                    self.table.name(mixin.mixin_type),
                    mixin.index()
                )
            })?;
        }

        let overriders = model
            .target_members
            .all()
            .map(|id| (id, OverrideDirection::Mixin))
            .chain(model.mixins.iter().flat_map(|m| {
                m.members.all().map(|id| (id, OverrideDirection::Target))
            }));
        for (id, direction) in overriders {
            let def = &model.members[id];
            if def.override_marker.is_some_and(|m| m.direction == direction) {
                ensure_invariant(def.base.is_some(), || {
                    format!("overrider '{}' has no base member", def.name)
                })?;
            }
        }
        Ok(())
    }
}

/// Composes `context` over `table` with default options.
pub fn build_composition(table: &TypeTable, context: &ContextDescription) -> Result<CompositionModel> {
    CompositionBuilder::new(table).build(context)
}
