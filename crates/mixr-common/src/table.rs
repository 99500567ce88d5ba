//! The type arena.
//!
//! `TypeTable` owns every [`TypeInfo`] of one universe and answers the
//! structural questions the composition engine asks: inheritance chains,
//! implemented interfaces, assignability, generic openness and interface
//! mapping. All queries are read-only, so a finished table can be shared
//! across threads and used by any number of concurrent builds.

use crate::limits::{MAX_BASE_CHAIN_DEPTH, MAX_INTERFACE_NESTING};
use crate::types::{
    AnnotationUsage, EventInfo, MemberKind, MemberRef, MethodInfo, PropertyInfo, Signature, TypeId,
    TypeInfo, TypeKind,
};
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use thiserror::Error;
use tracing::trace;

/// Errors raised while registering types or walking malformed metadata.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    #[error("a type named '{0}' is already registered")]
    DuplicateName(String),
    #[error("type id {0} is not registered")]
    UnknownType(u32),
    #[error("'{0}' is not a generic type definition")]
    NotGenericDefinition(String),
    #[error("'{name}' expects {expected} generic arguments but {actual} were supplied")]
    ArityMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },
    #[error("inheritance chain of '{0}' exceeds the traversal limit (cyclic base types?)")]
    BaseChainTooDeep(String),
    #[error("interface nesting below '{0}' exceeds the traversal limit (cyclic interfaces?)")]
    InterfaceNestingTooDeep(String),
}

/// Immutable-once-built arena of type metadata.
#[derive(Debug, Clone)]
pub struct TypeTable {
    types: Vec<TypeInfo>,
    by_name: FxHashMap<String, TypeId>,
    constructed: FxHashMap<(TypeId, SmallVec<[TypeId; 2]>), TypeId>,
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeTable {
    /// Creates a table holding only the well-known types.
    pub fn new() -> Self {
        let mut table = Self {
            types: Vec::with_capacity(64),
            by_name: FxHashMap::default(),
            constructed: FxHashMap::default(),
        };

        // Order must match the reserved constants on TypeId.
        table.push(TypeInfo::top("System.Object"));
        table.push(TypeInfo::class("System.Void"));
        table.push(TypeInfo::class("System.String"));
        table.push(TypeInfo::class("System.Int32"));
        table.push(TypeInfo::class("System.Boolean"));
        table.push(
            TypeInfo::class("Mixr.Mixin`1").with_generic_parameters([TypeId::MIXIN_TARGET_PARAM]),
        );
        table.push(TypeInfo::class("Mixr.Mixin`2").with_generic_parameters([
            TypeId::MIXIN_NEXT_TARGET_PARAM,
            TypeId::MIXIN_NEXT_PARAM,
        ]));
        table.push(TypeInfo::generic_parameter("TTarget"));
        table.push(TypeInfo::generic_parameter("TTarget"));
        table.push(TypeInfo::generic_parameter("TNext"));
        debug_assert_eq!(table.types.len() as u32, TypeId::FIRST_USER);

        table
    }

    fn push(&mut self, info: TypeInfo) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        if info.kind != TypeKind::GenericParameter {
            self.by_name.insert(info.name.clone(), id);
        }
        self.types.push(info);
        id
    }

    /// Registers a type. Names must be unique except for generic parameters.
    pub fn declare(&mut self, info: TypeInfo) -> Result<TypeId, TableError> {
        if info.kind != TypeKind::GenericParameter && self.by_name.contains_key(&info.name) {
            return Err(TableError::DuplicateName(info.name));
        }
        let id = self.push(info);
        trace!(id = id.0, name = %self.types[id.index()].name, "declared type");
        Ok(id)
    }

    /// Returns the constructed generic `definition<arguments>`, creating it on first use.
    ///
    /// Constructed types inherit the definition's base and interfaces; member
    /// substitution is not modelled, since constructed generics only appear
    /// as base types, requirements and annotation arguments here.
    pub fn construct(
        &mut self,
        definition: TypeId,
        arguments: &[TypeId],
    ) -> Result<TypeId, TableError> {
        let def = self.get(definition).ok_or(TableError::UnknownType(definition.0))?;
        if !def.is_generic_definition() {
            return Err(TableError::NotGenericDefinition(def.name.clone()));
        }
        if def.generic_parameters.len() != arguments.len() {
            return Err(TableError::ArityMismatch {
                name: def.name.clone(),
                expected: def.generic_parameters.len(),
                actual: arguments.len(),
            });
        }
        for &argument in arguments {
            self.get(argument).ok_or(TableError::UnknownType(argument.0))?;
        }

        let key = (definition, arguments.iter().copied().collect::<SmallVec<_>>());
        if let Some(&existing) = self.constructed.get(&key) {
            return Ok(existing);
        }

        let argument_names: Vec<&str> = arguments.iter().map(|&a| self.name(a)).collect();
        let mut info = TypeInfo {
            name: format!("{}[{}]", def.name, argument_names.join(",")),
            generic_definition: Some(definition),
            generic_arguments: arguments.to_vec(),
            generic_parameters: Vec::new(),
            methods: Vec::new(),
            properties: Vec::new(),
            events: Vec::new(),
            interface_impls: Vec::new(),
            ..def.clone()
        };
        info.annotations.clear();

        let id = self.push(info);
        self.constructed.insert(key, id);
        Ok(id)
    }

    /// Mutable access for multi-pass loaders that declare first and fill in later.
    pub fn get_mut(&mut self, id: TypeId) -> Option<&mut TypeInfo> {
        self.types.get_mut(id.index())
    }

    pub fn get(&self, id: TypeId) -> Option<&TypeInfo> {
        self.types.get(id.index())
    }

    pub fn contains(&self, id: TypeId) -> bool {
        id.index() < self.types.len()
    }

    /// Metadata of a type known to be registered.
    ///
    /// # Panics
    /// Panics when `id` was not produced by this table.
    pub fn info(&self, id: TypeId) -> &TypeInfo {
        &self.types[id.index()]
    }

    pub fn name(&self, id: TypeId) -> &str {
        self.get(id).map_or("<unknown type>", |info| info.name.as_str())
    }

    pub fn lookup(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn is_interface(&self, id: TypeId) -> bool {
        self.get(id).is_some_and(TypeInfo::is_interface)
    }

    pub fn is_generic_parameter(&self, id: TypeId) -> bool {
        self.get(id).is_some_and(TypeInfo::is_generic_parameter)
    }

    pub fn generic_definition(&self, id: TypeId) -> Option<TypeId> {
        self.get(id).and_then(|info| info.generic_definition)
    }

    /// Usage rules of an annotation kind; kinds registered without explicit
    /// usage get the defaults (inherited, single use).
    pub fn annotation_usage(&self, kind: TypeId) -> AnnotationUsage {
        self.get(kind)
            .and_then(|info| info.annotation_usage)
            .unwrap_or_default()
    }

    // =========================================================================
    // Members
    // =========================================================================

    pub fn method(&self, member: MemberRef) -> Option<&MethodInfo> {
        debug_assert_eq!(member.kind, MemberKind::Method);
        self.get(member.owner)?.methods.get(member.index as usize)
    }

    pub fn property(&self, member: MemberRef) -> Option<&PropertyInfo> {
        debug_assert_eq!(member.kind, MemberKind::Property);
        self.get(member.owner)?.properties.get(member.index as usize)
    }

    pub fn event(&self, member: MemberRef) -> Option<&EventInfo> {
        debug_assert_eq!(member.kind, MemberKind::Event);
        self.get(member.owner)?.events.get(member.index as usize)
    }

    /// Name of any member, for diagnostics.
    pub fn member_name(&self, member: MemberRef) -> &str {
        let name = match member.kind {
            MemberKind::Method => self.method(member).map(|m| m.name.as_str()),
            MemberKind::Property => self.property(member).map(|p| p.name.as_str()),
            MemberKind::Event => self.event(member).map(|e| e.name.as_str()),
        };
        name.unwrap_or("<unknown member>")
    }

    /// `Owner.Name(ParamType, ...)`, as used in configuration error messages.
    pub fn display_member(&self, member: MemberRef) -> String {
        let owner = self.name(member.owner);
        match member.kind {
            MemberKind::Method => match self.method(member) {
                Some(method) => format!(
                    "{owner}.{}({})",
                    method.name,
                    self.display_parameters(&method.signature)
                ),
                None => format!("{owner}.<unknown method>"),
            },
            _ => format!("{owner}.{}", self.member_name(member)),
        }
    }

    pub fn display_parameters(&self, signature: &Signature) -> String {
        let names: Vec<&str> = signature.parameters.iter().map(|&p| self.name(p)).collect();
        names.join(", ")
    }

    // =========================================================================
    // Hierarchy queries
    // =========================================================================

    /// The type itself followed by its base classes, most derived first.
    pub fn base_chain(&self, id: TypeId) -> Result<Vec<TypeId>, TableError> {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(ty) = current {
            if chain.len() >= MAX_BASE_CHAIN_DEPTH {
                return Err(TableError::BaseChainTooDeep(self.name(id).to_string()));
            }
            let info = self.get(ty).ok_or(TableError::UnknownType(ty.0))?;
            chain.push(ty);
            current = info.base;
        }
        Ok(chain)
    }

    /// Every interface implemented by `id` (through its bases and through
    /// interface inheritance), in discovery order. For an interface this is
    /// the set of interfaces it transitively extends, excluding itself.
    pub fn all_interfaces(&self, id: TypeId) -> Result<Vec<TypeId>, TableError> {
        let mut seen = FxHashSet::default();
        let mut result = Vec::new();
        for ty in self.base_chain(id)? {
            let info = self.get(ty).ok_or(TableError::UnknownType(ty.0))?;
            for &interface in &info.interfaces {
                self.collect_interface(interface, 0, &mut seen, &mut result)?;
            }
        }
        Ok(result)
    }

    fn collect_interface(
        &self,
        interface: TypeId,
        depth: usize,
        seen: &mut FxHashSet<TypeId>,
        result: &mut Vec<TypeId>,
    ) -> Result<(), TableError> {
        if depth > MAX_INTERFACE_NESTING {
            return Err(TableError::InterfaceNestingTooDeep(
                self.name(interface).to_string(),
            ));
        }
        if !seen.insert(interface) {
            return Ok(());
        }
        result.push(interface);
        let info = self.get(interface).ok_or(TableError::UnknownType(interface.0))?;
        for &extended in &info.interfaces {
            self.collect_interface(extended, depth + 1, seen, result)?;
        }
        Ok(())
    }

    /// Whether `ty` or any type it contains is an open generic parameter.
    pub fn contains_generic_parameters(&self, ty: TypeId) -> bool {
        self.contains_generic_parameters_at(ty, 0)
    }

    fn contains_generic_parameters_at(&self, ty: TypeId, depth: usize) -> bool {
        let Some(info) = self.get(ty) else {
            return false;
        };
        if info.is_generic_parameter() || info.is_generic_definition() {
            return true;
        }
        depth < MAX_INTERFACE_NESTING
            && info
                .generic_arguments
                .iter()
                .any(|&argument| self.contains_generic_parameters_at(argument, depth + 1))
    }

    /// Assignability as the engine needs it: identity, the top type, base
    /// classes, implemented interfaces, and generic definitions (a type is
    /// assignable to an open definition when some type in its chain is
    /// constructed from it). Generic parameters are assignable to whatever
    /// their constraints are assignable to.
    pub fn is_assignable_to(&self, from: TypeId, to: TypeId) -> Result<bool, TableError> {
        self.is_assignable_at(from, to, 0)
    }

    fn is_assignable_at(&self, from: TypeId, to: TypeId, depth: usize) -> Result<bool, TableError> {
        if from == to || to == TypeId::OBJECT {
            return Ok(true);
        }
        let info = self.get(from).ok_or(TableError::UnknownType(from.0))?;
        if info.is_generic_parameter() {
            if depth > MAX_INTERFACE_NESTING {
                return Err(TableError::InterfaceNestingTooDeep(info.name.clone()));
            }
            for &constraint in &info.constraints {
                if self.is_assignable_at(constraint, to, depth + 1)? {
                    return Ok(true);
                }
            }
            return Ok(false);
        }

        let chain = self.base_chain(from)?;
        let interfaces = self.all_interfaces(from)?;
        let derives = |ty: &TypeId| *ty == to || self.generic_definition(*ty) == Some(to);
        Ok(chain.iter().any(derives) || interfaces.iter().any(derives))
    }

    // =========================================================================
    // Interface mapping
    // =========================================================================

    /// Maps each method of `interface` to its implementation on `class`.
    ///
    /// Explicit implementations (most derived first) win over implicit ones;
    /// an implicit implementation is a non-static, non-private method with the
    /// same name and signature found along the base chain. `None` entries mean
    /// the class does not implement that method.
    pub fn interface_map(
        &self,
        class: TypeId,
        interface: TypeId,
    ) -> Result<Vec<(MemberRef, Option<MemberRef>)>, TableError> {
        let iface = self.get(interface).ok_or(TableError::UnknownType(interface.0))?;
        let chain = self.base_chain(class)?;

        let mut explicit: FxHashMap<MemberRef, MemberRef> = FxHashMap::default();
        for &ty in &chain {
            for implementation in &self.info(ty).interface_impls {
                explicit
                    .entry(implementation.interface_method)
                    .or_insert(MemberRef::method(ty, implementation.implementation));
            }
        }

        let mut mapping = Vec::with_capacity(iface.methods.len());
        for (index, required) in iface.methods.iter().enumerate() {
            let interface_method = MemberRef::method(interface, index as u32);
            let implementation = explicit.get(&interface_method).copied().or_else(|| {
                chain.iter().find_map(|&ty| {
                    self.info(ty).methods.iter().enumerate().find_map(|(i, m)| {
                        (m.name == required.name
                            && m.signature == required.signature
                            && !m.is_static()
                            && !m.visibility.is_private())
                        .then(|| MemberRef::method(ty, i as u32))
                    })
                })
            });
            mapping.push((interface_method, implementation));
        }
        Ok(mapping)
    }

    /// Iterates all registered types with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (TypeId, &TypeInfo)> {
        self.types
            .iter()
            .enumerate()
            .map(|(index, info)| (TypeId(index as u32), info))
    }
}

#[cfg(test)]
#[path = "tests/table_tests.rs"]
mod tests;
