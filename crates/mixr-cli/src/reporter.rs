//! Human and machine readable rendering of composition results.
//!
//! Models reference types and members by id; reports replace every id with
//! its fully-qualified name so output is stable across manifests.

use colored::Colorize;
use mixr_common::{TypeId, TypeTable};
use mixr_resolver::{
    AnnotationIntroduction, AnnotationSource, BindingSource, CompositionError, CompositionModel,
    MemberDefId, NonIntroductionReason, RequirementCollection,
};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelReport {
    pub target: String,
    pub mixins: Vec<MixinReport>,
    pub introduced_interfaces: Vec<IntroductionReport>,
    pub non_introduced_interfaces: Vec<SkippedInterfaceReport>,
    pub face_requirements: Vec<RequirementReport>,
    pub base_call_requirements: Vec<RequirementReport>,
    pub overrides: Vec<OverrideReport>,
    pub received_annotations: Vec<AnnotationReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MixinReport {
    pub index: usize,
    pub name: String,
    /// Explicitly configured mixin dependencies.
    pub depends_on: Vec<String>,
    pub introduces: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntroductionReport {
    pub interface: String,
    pub implementer: String,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedInterfaceReport {
    pub interface: String,
    pub mixin: String,
    pub reason: NonIntroductionReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementReport {
    pub required_type: String,
    pub requiring_mixins: Vec<String>,
    pub explicitly_requested: bool,
    pub aggregator: bool,
    pub bindings: Vec<BindingReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingReport {
    pub required: String,
    pub implementer: String,
    pub source: BindingSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideReport {
    pub overrider: String,
    pub base: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationReport {
    /// Declaration the annotation landed on.
    pub on: String,
    pub kind: String,
    pub arguments: Vec<String>,
    pub source: String,
}

impl ModelReport {
    pub fn new(table: &TypeTable, model: &CompositionModel) -> Self {
        let target = model.target;
        let name = |id: TypeId| table.name(id).to_string();
        let member = |id: MemberDefId| model.members.display(table, target, id);

        let mixins = model
            .mixins
            .iter()
            .enumerate()
            .map(|(position, mixin)| MixinReport {
                index: mixin.index().unwrap_or(position),
                name: name(mixin.mixin_type),
                depends_on: mixin.mixin_dependencies.iter().map(|&m| name(m)).collect(),
                introduces: mixin.introduced_interfaces.iter().map(|&i| name(i)).collect(),
            })
            .collect();

        let introduced_interfaces = model
            .introduced_interfaces
            .values()
            .map(|introduction| IntroductionReport {
                interface: name(introduction.interface),
                implementer: name(introduction.implementer),
                members: introduction
                    .methods
                    .iter()
                    .chain(&introduction.properties)
                    .chain(&introduction.events)
                    .map(|m| member(m.implementer))
                    .collect(),
            })
            .collect();

        let non_introduced_interfaces = model
            .non_introduced_interfaces
            .iter()
            .map(|skipped| SkippedInterfaceReport {
                interface: name(skipped.interface),
                mixin: name(skipped.mixin),
                reason: skipped.reason,
            })
            .collect();

        let requirements = |collection: &RequirementCollection| {
            collection
                .iter()
                .map(|requirement| RequirementReport {
                    required_type: name(requirement.required_type),
                    requiring_mixins: requirement
                        .requiring_mixins
                        .iter()
                        .map(|&m| name(m))
                        .collect(),
                    explicitly_requested: requirement.explicitly_requested,
                    aggregator: requirement.is_aggregator,
                    bindings: requirement
                        .required_methods
                        .iter()
                        .map(|binding| BindingReport {
                            required: table.display_member(binding.required_method),
                            implementer: member(binding.implementer),
                            source: binding.source,
                        })
                        .collect(),
                })
                .collect::<Vec<_>>()
        };

        let overrides = model
            .members
            .iter()
            .filter_map(|def| {
                def.base.map(|base| OverrideReport {
                    overrider: member(def.id),
                    base: member(base),
                })
            })
            .collect();

        let annotation = |on: String, received: &AnnotationIntroduction| AnnotationReport {
            on,
            kind: name(received.annotation.kind),
            arguments: received.annotation.arguments.clone(),
            source: match received.source {
                AnnotationSource::Mixin(mixin) => name(mixin),
                AnnotationSource::Member(id) => member(id),
            },
        };
        let member_annotations = model.members.iter().flat_map(|def| {
            def.received_annotations
                .iter()
                .map(move |received| (def.id, received))
        });
        let received_annotations = model
            .received_annotations
            .iter()
            .map(|received| annotation(name(target), received))
            .chain(member_annotations.map(|(id, received)| annotation(member(id), received)))
            .collect();

        Self {
            target: name(target),
            mixins,
            introduced_interfaces,
            non_introduced_interfaces,
            face_requirements: requirements(&model.face_requirements),
            base_call_requirements: requirements(&model.base_call_requirements),
            overrides,
            received_annotations,
        }
    }
}

/// Error half of a context report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    Configuration,
    Internal,
}

impl From<&CompositionError> for ErrorReport {
    fn from(error: &CompositionError) -> Self {
        Self {
            kind: if error.is_configuration() {
                ErrorKind::Configuration
            } else {
                ErrorKind::Internal
            },
            message: error.to_string(),
        }
    }
}

/// Outcome of building one named context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextReport {
    pub context: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
}

impl ContextReport {
    pub fn new(
        context: &str,
        table: &TypeTable,
        result: &Result<CompositionModel, CompositionError>,
    ) -> Self {
        let (model, error) = match result {
            Ok(model) => (Some(ModelReport::new(table, model)), None),
            Err(err) => (None, Some(ErrorReport::from(err))),
        };
        Self {
            context: context.to_string(),
            model,
            error,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

pub struct Reporter {
    color: bool,
}

impl Reporter {
    pub fn new(color: bool) -> Self {
        Reporter { color }
    }

    pub fn render(&self, reports: &[ContextReport]) -> String {
        let mut out = String::new();
        for (index, report) in reports.iter().enumerate() {
            if index > 0 {
                out.push('\n');
            }
            out.push_str(&self.format_context(report));
        }
        out
    }

    pub fn format_context(&self, report: &ContextReport) -> String {
        let mut out = format!("{} {}\n", self.heading("context"), report.context);
        if let Some(error) = &report.error {
            out.push_str(&format!("  {}: {}\n", self.format_error_kind(error.kind), error.message));
        }
        if let Some(model) = &report.model {
            self.format_model(model, &mut out);
        }
        out
    }

    fn format_model(&self, model: &ModelReport, out: &mut String) {
        out.push_str(&format!("  target {}\n", model.target));

        out.push_str(&format!("  {}\n", self.heading("mixins")));
        for mixin in &model.mixins {
            out.push_str(&format!("    {} {}\n", mixin.index, mixin.name));
            if !mixin.depends_on.is_empty() {
                out.push_str(&format!("      after {}\n", mixin.depends_on.join(", ")));
            }
        }

        if !model.introduced_interfaces.is_empty() {
            out.push_str(&format!("  {}\n", self.heading("introduced interfaces")));
            for introduction in &model.introduced_interfaces {
                out.push_str(&format!(
                    "    {} <- {}\n",
                    introduction.interface, introduction.implementer
                ));
            }
        }
        for skipped in &model.non_introduced_interfaces {
            let reason = match skipped.reason {
                NonIntroductionReason::ImplementedByTarget => "implemented by target",
                NonIntroductionReason::Suppressed => "suppressed",
            };
            out.push_str(&format!(
                "    {} not introduced by {} ({reason})\n",
                skipped.interface, skipped.mixin
            ));
        }

        self.format_requirements("face requirements", &model.face_requirements, out);
        self.format_requirements("base call requirements", &model.base_call_requirements, out);

        if !model.overrides.is_empty() {
            out.push_str(&format!("  {}\n", self.heading("overrides")));
            for link in &model.overrides {
                out.push_str(&format!("    {} -> {}\n", link.overrider, link.base));
            }
        }

        if !model.received_annotations.is_empty() {
            out.push_str(&format!("  {}\n", self.heading("annotations")));
            for annotation in &model.received_annotations {
                out.push_str(&format!(
                    "    {} on {} from {}\n",
                    annotation.kind, annotation.on, annotation.source
                ));
            }
        }
    }

    fn format_requirements(&self, title: &str, requirements: &[RequirementReport], out: &mut String) {
        if requirements.is_empty() {
            return;
        }
        out.push_str(&format!("  {}\n", self.heading(title)));
        for requirement in requirements {
            let requirers = if requirement.requiring_mixins.is_empty() {
                "complete interface".to_string()
            } else {
                requirement.requiring_mixins.join(", ")
            };
            out.push_str(&format!("    {} ({requirers})\n", requirement.required_type));
            for binding in &requirement.bindings {
                let source = match binding.source {
                    BindingSource::DeclaredImplementation => "declared",
                    BindingSource::IntroducedInterface => "introduced",
                    BindingSource::Structural => "structural",
                };
                out.push_str(&format!(
                    "      {} -> {} [{source}]\n",
                    binding.required, binding.implementer
                ));
            }
        }
    }

    fn heading(&self, label: &str) -> String {
        if self.color {
            label.bold().to_string()
        } else {
            label.to_string()
        }
    }

    fn format_error_kind(&self, kind: ErrorKind) -> String {
        let label = match kind {
            ErrorKind::Configuration => "error",
            ErrorKind::Internal => "internal error",
        };
        if self.color {
            label.red().bold().to_string()
        } else {
            label.to_string()
        }
    }
}

#[cfg(test)]
#[path = "tests/reporter_tests.rs"]
mod tests;
