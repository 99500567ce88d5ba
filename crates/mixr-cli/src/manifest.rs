//! JSON manifest loading.
//!
//! A manifest describes a type universe by fully-qualified name plus the
//! contexts to compose over it:
//!
//! ```json
//! {
//!   "types": [
//!     { "name": "Shop.ILogger", "kind": "interface", "methods": [{ "name": "Log" }] },
//!     { "name": "Shop.Order", "methods": [{ "name": "Submit", "modifiers": ["virtual"] }] },
//!     {
//!       "name": "Shop.AuditMixin",
//!       "base": { "definition": "Mixr.Mixin`2", "arguments": ["object", "Shop.ILogger"] },
//!       "methods": [{ "name": "Submit", "override": { "direction": "target" } }]
//!     }
//!   ],
//!   "contexts": {
//!     "orders": { "target": "Shop.Order", "mixins": [{ "type": "Shop.AuditMixin" }] }
//!   },
//!   "options": { "structuralBinding": true }
//! }
//! ```
//!
//! Loading runs in two passes: every type is declared first so references
//! may point forward, then bases, interfaces and members are filled in.

use indexmap::IndexMap;
use mixr_common::{
    AnnotationInstance, AnnotationUsage, EventDecl, MemberFlags, MemberRef, MethodInfo,
    OverrideDirection, OverrideMarker, PropertyDecl, Signature, TableError, TypeId, TypeInfo,
    TypeTable, Visibility,
};
use mixr_resolver::{CompositionOptions, ContextDescription, MixinDescriptor};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, trace};

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("invalid manifest: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown type '{name}' referenced from {scope}")]
    UnknownType { name: String, scope: String },
    #[error("generic parameter '{name}' is declared twice on '{owner}'")]
    DuplicateGenericParameter { name: String, owner: String },
    #[error("'{interface}' declares no method '{method}' (explicit implementation on '{owner}')")]
    UnknownInterfaceMethod {
        interface: String,
        method: String,
        owner: String,
    },
    #[error("context '{0}' is not defined in the manifest")]
    UnknownContext(String),
    #[error(transparent)]
    Table(#[from] TableError),
}

// =============================================================================
// Documents
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub types: Vec<TypeDoc>,
    #[serde(default)]
    pub contexts: IndexMap<String, ContextDoc>,
    #[serde(default)]
    pub options: CompositionOptions,
}

/// A type reference: a name, or a generic definition closed over arguments.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TypeRefDoc {
    Named(String),
    Constructed {
        definition: String,
        arguments: Vec<TypeRefDoc>,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TypeKindDoc {
    #[default]
    Class,
    Interface,
    Annotation,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TypeDoc {
    pub name: String,
    #[serde(default)]
    pub kind: TypeKindDoc,
    /// Usage rules; only meaningful for annotation kinds.
    #[serde(default)]
    pub usage: UsageDoc,
    #[serde(default)]
    pub generic_parameters: Vec<GenericParameterDoc>,
    #[serde(default)]
    pub base: Option<TypeRefDoc>,
    /// Implemented interfaces; extended interfaces for an interface.
    #[serde(default)]
    pub implements: Vec<TypeRefDoc>,
    #[serde(default)]
    pub methods: Vec<MethodDoc>,
    #[serde(default)]
    pub properties: Vec<PropertyDoc>,
    #[serde(default)]
    pub events: Vec<EventDoc>,
    #[serde(default)]
    pub annotations: Vec<AnnotationDoc>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UsageDoc {
    pub inherited: Option<bool>,
    pub allow_multiple: Option<bool>,
}

impl UsageDoc {
    fn resolve(self) -> AnnotationUsage {
        let default = AnnotationUsage::default();
        AnnotationUsage {
            inherited: self.inherited.unwrap_or(default.inherited),
            allow_multiple: self.allow_multiple.unwrap_or(default.allow_multiple),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GenericParameterDoc {
    pub name: String,
    #[serde(default)]
    pub constraints: Vec<TypeRefDoc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ModifierDoc {
    Static,
    Virtual,
    Abstract,
    Final,
    NewSlot,
}

impl ModifierDoc {
    fn flag(self) -> MemberFlags {
        match self {
            Self::Static => MemberFlags::STATIC,
            Self::Virtual => MemberFlags::VIRTUAL,
            Self::Abstract => MemberFlags::ABSTRACT,
            Self::Final => MemberFlags::FINAL,
            Self::NewSlot => MemberFlags::NEW_SLOT,
        }
    }
}

fn flags(modifiers: &[ModifierDoc]) -> MemberFlags {
    modifiers
        .iter()
        .fold(MemberFlags::empty(), |flags, m| flags | m.flag())
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OverrideDoc {
    pub direction: OverrideDirection,
    /// Only members declared by a type assignable to this one are candidates.
    #[serde(default)]
    pub restricted_to: Option<TypeRefDoc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ExplicitImplDoc {
    pub interface: TypeRefDoc,
    pub method: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MethodDoc {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<TypeRefDoc>,
    #[serde(default)]
    pub returns: Option<TypeRefDoc>,
    #[serde(default)]
    pub visibility: Option<Visibility>,
    #[serde(default)]
    pub modifiers: Vec<ModifierDoc>,
    #[serde(default, rename = "override")]
    pub override_marker: Option<OverrideDoc>,
    #[serde(default)]
    pub annotations: Vec<AnnotationDoc>,
    /// Makes this method the explicit implementation of an interface method.
    #[serde(default)]
    pub implements: Option<ExplicitImplDoc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PropertyDoc {
    pub name: String,
    #[serde(rename = "type")]
    pub property_type: TypeRefDoc,
    #[serde(default)]
    pub index_parameters: Vec<TypeRefDoc>,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub visibility: Option<Visibility>,
    #[serde(default)]
    pub modifiers: Vec<ModifierDoc>,
    #[serde(default, rename = "override")]
    pub override_marker: Option<OverrideDoc>,
    #[serde(default)]
    pub annotations: Vec<AnnotationDoc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EventDoc {
    pub name: String,
    pub handler: TypeRefDoc,
    #[serde(default)]
    pub visibility: Option<Visibility>,
    #[serde(default)]
    pub modifiers: Vec<ModifierDoc>,
    #[serde(default, rename = "override")]
    pub override_marker: Option<OverrideDoc>,
    #[serde(default)]
    pub annotations: Vec<AnnotationDoc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AnnotationDoc {
    #[serde(rename = "type")]
    pub kind: TypeRefDoc,
    #[serde(default)]
    pub arguments: Vec<String>,
    #[serde(default)]
    pub copied: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ContextDoc {
    pub target: TypeRefDoc,
    #[serde(default)]
    pub mixins: Vec<MixinDoc>,
    #[serde(default)]
    pub complete_interfaces: Vec<TypeRefDoc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MixinDoc {
    #[serde(rename = "type")]
    pub mixin_type: TypeRefDoc,
    #[serde(default)]
    pub depends_on: Vec<TypeRefDoc>,
    #[serde(default)]
    pub replaces: Vec<TypeRefDoc>,
    /// Implemented interfaces that must not be introduced onto the target.
    #[serde(default)]
    pub suppress_introduction: Vec<TypeRefDoc>,
    /// Introduce interface members publicly instead of explicitly.
    #[serde(default)]
    pub public_introductions: bool,
}

impl Manifest {
    pub fn from_json(text: &str) -> Result<Self, ManifestError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Builds the type table and resolves every context.
    pub fn load(&self) -> Result<LoadedManifest, ManifestError> {
        let mut loader = TypeLoader::new();
        let ids = loader.declare_all(&self.types)?;
        loader.fill_all(&self.types, &ids)?;
        loader.refresh_constructed();

        let mut contexts = IndexMap::with_capacity(self.contexts.len());
        for (name, doc) in &self.contexts {
            contexts.insert(name.clone(), loader.context(name, doc)?);
        }

        debug!(
            types = loader.table.len(),
            contexts = contexts.len(),
            "loaded manifest"
        );
        Ok(LoadedManifest {
            table: loader.table,
            contexts,
            options: self.options,
        })
    }
}

/// A manifest resolved against its own type table.
#[derive(Debug, Clone)]
pub struct LoadedManifest {
    pub table: TypeTable,
    pub contexts: IndexMap<String, ContextDescription>,
    pub options: CompositionOptions,
}

impl LoadedManifest {
    /// Contexts to build, in manifest order; `names` filters when non-empty.
    pub fn select<'a>(
        &'a self,
        names: &[String],
    ) -> Result<Vec<(&'a str, &'a ContextDescription)>, ManifestError> {
        if names.is_empty() {
            return Ok(self
                .contexts
                .iter()
                .map(|(name, context)| (name.as_str(), context))
                .collect());
        }
        names
            .iter()
            .map(|name| {
                self.contexts
                    .get_key_value(name)
                    .map(|(name, context)| (name.as_str(), context))
                    .ok_or_else(|| ManifestError::UnknownContext(name.clone()))
            })
            .collect()
    }
}

/// Parses and loads a manifest in one step.
pub fn load_manifest(text: &str) -> Result<LoadedManifest, ManifestError> {
    Manifest::from_json(text)?.load()
}

// =============================================================================
// Loader
// =============================================================================

/// Name resolution scope: the generic parameters in view plus a label for
/// error messages.
#[derive(Clone, Debug, Default)]
struct Scope {
    label: String,
    parameters: Vec<(String, TypeId)>,
}

impl Scope {
    fn parameter(&self, name: &str) -> Option<TypeId> {
        self.parameters
            .iter()
            .find(|(param, _)| param == name)
            .map(|&(_, id)| id)
    }
}

/// Short spellings for the well-known types.
fn builtin_alias(name: &str) -> Option<TypeId> {
    Some(match name {
        "object" => TypeId::OBJECT,
        "void" => TypeId::VOID,
        "string" => TypeId::STRING,
        "int" => TypeId::INT32,
        "bool" => TypeId::BOOLEAN,
        _ => return None,
    })
}

struct TypeLoader {
    table: TypeTable,
    /// Generic parameters by declaring type, in declaration order.
    parameters: FxHashMap<TypeId, Vec<(String, TypeId)>>,
    /// Non-accessor method names by declaring type, for explicit implementations.
    method_names: FxHashMap<TypeId, Vec<String>>,
    constructed: FxHashSet<TypeId>,
}

impl TypeLoader {
    fn new() -> Self {
        Self {
            table: TypeTable::new(),
            parameters: FxHashMap::default(),
            method_names: FxHashMap::default(),
            constructed: FxHashSet::default(),
        }
    }

    /// Pass one: declares every type as an empty shell.
    fn declare_all(&mut self, docs: &[TypeDoc]) -> Result<Vec<TypeId>, ManifestError> {
        docs.iter().map(|doc| self.declare(doc)).collect()
    }

    fn declare(&mut self, doc: &TypeDoc) -> Result<TypeId, ManifestError> {
        let mut parameters: Vec<(String, TypeId)> = Vec::with_capacity(doc.generic_parameters.len());
        for param in &doc.generic_parameters {
            if parameters.iter().any(|(name, _)| *name == param.name) {
                return Err(ManifestError::DuplicateGenericParameter {
                    name: param.name.clone(),
                    owner: doc.name.clone(),
                });
            }
            let id = self.table.declare(TypeInfo::generic_parameter(&param.name))?;
            parameters.push((param.name.clone(), id));
        }

        let shell = match doc.kind {
            TypeKindDoc::Class => TypeInfo::class(&doc.name),
            TypeKindDoc::Interface => TypeInfo::interface(&doc.name),
            TypeKindDoc::Annotation => TypeInfo::annotation(&doc.name, doc.usage.resolve()),
        }
        .with_generic_parameters(parameters.iter().map(|&(_, id)| id));
        let id = self.table.declare(shell)?;

        self.method_names
            .insert(id, doc.methods.iter().map(|m| m.name.clone()).collect());
        if !parameters.is_empty() {
            self.parameters.insert(id, parameters);
        }
        Ok(id)
    }

    /// Pass two: bases, interfaces, constraints, members and annotations.
    fn fill_all(&mut self, docs: &[TypeDoc], ids: &[TypeId]) -> Result<(), ManifestError> {
        for (doc, &id) in docs.iter().zip(ids) {
            self.fill(doc, id)?;
        }
        Ok(())
    }

    fn fill(&mut self, doc: &TypeDoc, id: TypeId) -> Result<(), ManifestError> {
        let scope = Scope {
            label: format!("'{}'", doc.name),
            parameters: self.parameters.get(&id).cloned().unwrap_or_default(),
        };

        for (param, &(_, param_id)) in doc.generic_parameters.iter().zip(&scope.parameters) {
            let constraints = self.resolve_all(&param.constraints, &scope)?;
            if let Some(info) = self.table.get_mut(param_id) {
                info.constraints = constraints;
            }
        }

        let mut info = self
            .table
            .get(id)
            .cloned()
            .ok_or(TableError::UnknownType(id.0))?;
        if let Some(base) = &doc.base {
            info = info.extends(self.resolve(base, &scope)?);
        }
        for interface in &doc.implements {
            info = info.implements(self.resolve(interface, &scope)?);
        }

        // Methods go first so explicit implementation indices line up with
        // the declared method list.
        for method in &doc.methods {
            let built = self.method(method, &scope)?;
            info = match &method.implements {
                Some(explicit) => {
                    let interface_method = self.interface_method(explicit, &doc.name, &scope)?;
                    info.with_explicit_impl(interface_method, built)
                }
                None => info.with_method(built),
            };
        }
        for property in &doc.properties {
            info = info.with_property(self.property(property, &scope)?);
        }
        for event in &doc.events {
            info = info.with_event(self.event(event, &scope)?);
        }
        for annotation in &doc.annotations {
            info = info.with_annotation(self.annotation(annotation, &scope)?);
        }

        trace!(name = %doc.name, methods = info.methods.len(), "filled type");
        if let Some(slot) = self.table.get_mut(id) {
            *slot = info;
        }
        Ok(())
    }

    fn method(&mut self, doc: &MethodDoc, scope: &Scope) -> Result<MethodInfo, ManifestError> {
        let parameters = self.resolve_all(&doc.parameters, scope)?;
        let returns = match &doc.returns {
            Some(ty) => self.resolve(ty, scope)?,
            None => TypeId::VOID,
        };
        let mut method = MethodInfo::new(&doc.name, Signature::new(parameters, returns))
            .with_visibility(doc.visibility.unwrap_or(Visibility::Public))
            .with_flags(flags(&doc.modifiers));
        if let Some(marker) = &doc.override_marker {
            method = method.overriding(self.override_marker(marker, scope)?);
        }
        for annotation in &doc.annotations {
            method = method.with_annotation(self.annotation(annotation, scope)?);
        }
        Ok(method)
    }

    fn property(&mut self, doc: &PropertyDoc, scope: &Scope) -> Result<PropertyDecl, ManifestError> {
        let mut decl = PropertyDecl::new(&doc.name, self.resolve(&doc.property_type, scope)?)
            .with_visibility(doc.visibility.unwrap_or(Visibility::Public))
            .with_flags(flags(&doc.modifiers));
        decl.index_parameters = self.resolve_all(&doc.index_parameters, scope)?;
        if doc.read_only {
            decl = decl.read_only();
        }
        if let Some(marker) = &doc.override_marker {
            decl = decl.overriding(self.override_marker(marker, scope)?);
        }
        for annotation in &doc.annotations {
            decl = decl.with_annotation(self.annotation(annotation, scope)?);
        }
        Ok(decl)
    }

    fn event(&mut self, doc: &EventDoc, scope: &Scope) -> Result<EventDecl, ManifestError> {
        let mut decl = EventDecl::new(&doc.name, self.resolve(&doc.handler, scope)?)
            .with_flags(flags(&doc.modifiers));
        decl.visibility = doc.visibility.unwrap_or(Visibility::Public);
        if let Some(marker) = &doc.override_marker {
            decl = decl.overriding(self.override_marker(marker, scope)?);
        }
        for annotation in &doc.annotations {
            decl = decl.with_annotation(self.annotation(annotation, scope)?);
        }
        Ok(decl)
    }

    fn override_marker(
        &mut self,
        doc: &OverrideDoc,
        scope: &Scope,
    ) -> Result<OverrideMarker, ManifestError> {
        let marker = match doc.direction {
            OverrideDirection::Target => OverrideMarker::target(),
            OverrideDirection::Mixin => OverrideMarker::mixin(),
        };
        Ok(match &doc.restricted_to {
            Some(ty) => marker.restricted_to(self.resolve(ty, scope)?),
            None => marker,
        })
    }

    fn annotation(
        &mut self,
        doc: &AnnotationDoc,
        scope: &Scope,
    ) -> Result<AnnotationInstance, ManifestError> {
        let mut annotation = AnnotationInstance::new(self.resolve(&doc.kind, scope)?);
        for argument in &doc.arguments {
            annotation = annotation.with_argument(argument.clone());
        }
        if doc.copied {
            annotation = annotation.copied();
        }
        Ok(annotation)
    }

    fn interface_method(
        &mut self,
        doc: &ExplicitImplDoc,
        owner: &str,
        scope: &Scope,
    ) -> Result<MemberRef, ManifestError> {
        let interface = self.resolve(&doc.interface, scope)?;
        let index = self
            .method_names
            .get(&interface)
            .and_then(|names| names.iter().position(|name| *name == doc.method));
        match index {
            Some(index) => Ok(MemberRef::method(interface, index as u32)),
            None => Err(ManifestError::UnknownInterfaceMethod {
                interface: self.table.name(interface).to_string(),
                method: doc.method.clone(),
                owner: owner.to_string(),
            }),
        }
    }

    fn context(&mut self, name: &str, doc: &ContextDoc) -> Result<ContextDescription, ManifestError> {
        let scope = Scope {
            label: format!("context '{name}'"),
            parameters: Vec::new(),
        };
        let mut context = ContextDescription::new(self.resolve(&doc.target, &scope)?);
        for mixin in &doc.mixins {
            let mut descriptor = MixinDescriptor::new(self.resolve(&mixin.mixin_type, &scope)?);
            for dependency in self.resolve_all(&mixin.depends_on, &scope)? {
                descriptor = descriptor.depends_on(dependency);
            }
            for suppressed in self.resolve_all(&mixin.replaces, &scope)? {
                descriptor = descriptor.replaces(suppressed);
            }
            for interface in self.resolve_all(&mixin.suppress_introduction, &scope)? {
                descriptor = descriptor.without_introducing(interface);
            }
            if mixin.public_introductions {
                descriptor = descriptor.introducing_public_members();
            }
            context = context.with_mixin(descriptor);
        }
        for interface in self.resolve_all(&doc.complete_interfaces, &scope)? {
            context = context.with_complete_interface(interface);
        }
        Ok(context)
    }

    fn resolve_all(
        &mut self,
        references: &[TypeRefDoc],
        scope: &Scope,
    ) -> Result<Vec<TypeId>, ManifestError> {
        references.iter().map(|r| self.resolve(r, scope)).collect()
    }

    fn resolve(&mut self, reference: &TypeRefDoc, scope: &Scope) -> Result<TypeId, ManifestError> {
        match reference {
            TypeRefDoc::Named(name) => self.resolve_name(name, scope),
            TypeRefDoc::Constructed {
                definition,
                arguments,
            } => {
                let definition = self.resolve_name(definition, scope)?;
                let arguments = self.resolve_all(arguments, scope)?;
                let id = self.table.construct(definition, &arguments)?;
                self.constructed.insert(id);
                Ok(id)
            }
        }
    }

    fn resolve_name(&self, name: &str, scope: &Scope) -> Result<TypeId, ManifestError> {
        scope
            .parameter(name)
            .or_else(|| self.table.lookup(name))
            .or_else(|| builtin_alias(name))
            .ok_or_else(|| ManifestError::UnknownType {
                name: name.to_string(),
                scope: scope.label.clone(),
            })
    }

    /// Constructed types copy their definition's base and interfaces when
    /// created; re-sync them now that every definition is complete.
    fn refresh_constructed(&mut self) {
        for &id in &self.constructed {
            let Some(definition) = self.table.generic_definition(id) else {
                continue;
            };
            let Some(def) = self.table.get(definition) else {
                continue;
            };
            let (base, interfaces) = (def.base, def.interfaces.clone());
            if let Some(info) = self.table.get_mut(id) {
                info.base = base;
                info.interfaces = interfaces;
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/loader_tests.rs"]
mod tests;
