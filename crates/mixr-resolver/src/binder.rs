//! Requirement binding.
//!
//! Every method of a required interface is bound to exactly one
//! implementing member definition. Sources are tried in order:
//!
//! 1. the target's own implementation of the interface;
//! 2. the mixin that introduces the interface;
//! 3. a structurally matching target member (name + signature), when
//!    structural binding is enabled.
//!
//! Property and event accessors bind through the property or event that
//! owns them so that accessor pairs stay together.

use crate::error::{
    CompositionError, ConfigurationError, InternalError, Result, ensure_invariant,
};
use crate::model::{
    BindingSource, ClassMembers, InterfaceIntroduction, MemberArena, MemberDefId, MemberKey,
    MemberOwner, RequiredMethodBinding, RequirementCollection, RequirementDefinition,
};
use crate::options::CompositionOptions;
use indexmap::IndexMap;
use mixr_common::{MemberKind, MemberRef, TypeId, TypeInfo, TypeTable};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

/// Structural lookup of interface accessors: interface method index ->
/// accessor definition on the target.
type AccessorTable = FxHashMap<u32, MemberDefId>;

pub struct RequirementBinder<'a> {
    table: &'a TypeTable,
    target: TypeId,
    options: CompositionOptions,
    target_interfaces: FxHashSet<TypeId>,
}

impl<'a> RequirementBinder<'a> {
    pub fn new(table: &'a TypeTable, target: TypeId, options: CompositionOptions) -> Result<Self> {
        let target_interfaces = table.all_interfaces(target)?.into_iter().collect();
        Ok(Self {
            table,
            target,
            options,
            target_interfaces,
        })
    }

    /// Binds the required methods of every requirement in `requirements`.
    pub fn bind_all(
        &self,
        requirements: &mut RequirementCollection,
        arena: &MemberArena,
        target_members: &ClassMembers,
        introduced: &IndexMap<TypeId, InterfaceIntroduction>,
    ) -> Result<()> {
        for requirement in requirements.items.values_mut() {
            self.bind(requirement, arena, target_members, introduced)?;
        }
        Ok(())
    }

    fn bind(
        &self,
        requirement: &mut RequirementDefinition,
        arena: &MemberArena,
        target_members: &ClassMembers,
        introduced: &IndexMap<TypeId, InterfaceIntroduction>,
    ) -> Result<()> {
        let required = requirement.required_type;
        if required == TypeId::OBJECT || self.table.is_generic_parameter(required) {
            return Ok(());
        }
        let info = self.table.info(required);
        if !info.is_interface() {
            if self.table.is_assignable_to(self.target, required)? {
                return Ok(());
            }
            return Err(ConfigurationError::UnsatisfiedClassRequirement {
                requirement: info.name.clone(),
                target: self.table.name(self.target).to_string(),
                requirers: self.requirers(requirement),
            }
            .into());
        }
        if info.methods.is_empty() {
            return Ok(());
        }

        let bindings = if self.target_interfaces.contains(&required) {
            self.bind_declared(requirement, arena)?
        } else if let Some(introduction) = introduced.get(&required) {
            self.bind_introduced(requirement, introduction, arena)?
        } else if self.options.structural_binding {
            self.bind_structural(requirement, arena, target_members)?
        } else {
            return Err(self.unmet(requirement, MemberRef::method(required, 0)));
        };

        ensure_invariant(bindings.len() == info.methods.len(), || {
            format!(
                "'{}' bound {} of {} methods",
                info.name,
                bindings.len(),
                info.methods.len()
            )
        })?;
        debug!(
            requirement = %info.name,
            kind = %requirement.kind,
            methods = bindings.len(),
            "bound requirement"
        );
        requirement.required_methods = bindings;
        Ok(())
    }

    fn bind_declared(
        &self,
        requirement: &RequirementDefinition,
        arena: &MemberArena,
    ) -> Result<Vec<RequiredMethodBinding>> {
        let mapping = self
            .table
            .interface_map(self.target, requirement.required_type)?;
        let mut bindings = Vec::with_capacity(mapping.len());
        for (required_method, implementation) in mapping {
            let Some(implementation) = implementation else {
                return Err(self.unmet(requirement, required_method));
            };
            let implementer = arena
                .find(MemberOwner::Target, implementation)
                .ok_or_else(|| {
                    InternalError::new(format!(
                        "no member definition for '{}', which implements '{}'",
                        self.table.display_member(implementation),
                        self.table.display_member(required_method)
                    ))
                })?;
            bindings.push(RequiredMethodBinding {
                required_method,
                implementer,
                source: BindingSource::DeclaredImplementation,
            });
        }
        Ok(bindings)
    }

    fn bind_introduced(
        &self,
        requirement: &RequirementDefinition,
        introduction: &InterfaceIntroduction,
        arena: &MemberArena,
    ) -> Result<Vec<RequiredMethodBinding>> {
        let interface = requirement.required_type;
        let info = self.table.info(interface);

        // Accessor method index -> (owning member, accessor slot).
        let mut owners: FxHashMap<u32, (MemberRef, usize)> = FxHashMap::default();
        for (index, property) in info.properties.iter().enumerate() {
            let owner = MemberRef::property(interface, index as u32);
            for (slot, accessor) in [property.getter, property.setter].into_iter().enumerate() {
                if let Some(accessor) = accessor {
                    owners.insert(accessor, (owner, slot));
                }
            }
        }
        for (index, event) in info.events.iter().enumerate() {
            let owner = MemberRef::event(interface, index as u32);
            for (slot, accessor) in [event.add, event.remove].into_iter().enumerate() {
                if let Some(accessor) = accessor {
                    owners.insert(accessor, (owner, slot));
                }
            }
        }

        let mut bindings = Vec::with_capacity(info.methods.len());
        for index in 0..info.methods.len() as u32 {
            let required_method = MemberRef::method(interface, index);
            let implementer = match owners.get(&index) {
                Some(&(owner, slot)) => introduction
                    .implementer_of(owner)
                    .and_then(|id| arena.get(id))
                    .and_then(|def| def.kind.accessors()[slot]),
                None => introduction.implementer_of(required_method),
            };
            let Some(implementer) = implementer else {
                return Err(self.unmet(requirement, required_method));
            };
            bindings.push(RequiredMethodBinding {
                required_method,
                implementer,
                source: BindingSource::IntroducedInterface,
            });
        }
        Ok(bindings)
    }

    fn bind_structural(
        &self,
        requirement: &RequirementDefinition,
        arena: &MemberArena,
        target_members: &ClassMembers,
    ) -> Result<Vec<RequiredMethodBinding>> {
        let interface = requirement.required_type;
        let info = self.table.info(interface);
        let accessors = self.structural_accessors(info, arena, target_members);

        let mut bindings = Vec::with_capacity(info.methods.len());
        for (index, method) in info.methods.iter().enumerate() {
            let index = index as u32;
            let required_method = MemberRef::method(interface, index);
            let implementer = if is_accessor(info, index) {
                accessors.get(&index).copied()
            } else {
                target_members
                    .methods
                    .get(&MemberKey::new(method.name.clone(), method.signature.clone()))
                    .copied()
            };
            let implementer =
                implementer.filter(|&id| arena[id].visibility.is_family_visible());
            let Some(implementer) = implementer else {
                return Err(self.unmet(requirement, required_method));
            };
            trace!(
                method = %self.table.display_member(required_method),
                implementer = %arena.display(self.table, self.target, implementer),
                "structural binding"
            );
            bindings.push(RequiredMethodBinding {
                required_method,
                implementer,
                source: BindingSource::Structural,
            });
        }
        Ok(bindings)
    }

    /// Target accessors matching the properties and events of `interface`.
    fn structural_accessors(
        &self,
        interface: &TypeInfo,
        arena: &MemberArena,
        target_members: &ClassMembers,
    ) -> AccessorTable {
        let mut table = AccessorTable::default();
        let mut record = |kind: MemberKind, key: MemberKey, slots: [Option<u32>; 2]| {
            let Some(&id) = target_members.of_kind(kind).get(&key) else {
                return;
            };
            for (slot, target_accessor) in slots.into_iter().zip(arena[id].kind.accessors()) {
                if let (Some(slot), Some(target_accessor)) = (slot, target_accessor) {
                    table.insert(slot, target_accessor);
                }
            }
        };
        for property in &interface.properties {
            record(
                MemberKind::Property,
                MemberKey::new(property.name.clone(), property.signature()),
                [property.getter, property.setter],
            );
        }
        for event in &interface.events {
            record(
                MemberKind::Event,
                MemberKey::new(event.name.clone(), event.signature()),
                [event.add, event.remove],
            );
        }
        table
    }

    fn requirers(&self, requirement: &RequirementDefinition) -> String {
        if requirement.requiring_mixins.is_empty() {
            return "<complete interface>".to_string();
        }
        let names: Vec<String> = requirement
            .requiring_mixins
            .iter()
            .map(|&m| format!("mixin '{}'", self.table.name(m)))
            .collect();
        names.join(", ")
    }

    fn unmet(
        &self,
        requirement: &RequirementDefinition,
        required_method: MemberRef,
    ) -> CompositionError {
        ConfigurationError::UnmetRequirement {
            member: format!(
                "{}.{}",
                self.table.name(required_method.owner),
                self.table.member_name(required_method)
            ),
            requirement: self.table.name(requirement.required_type).to_string(),
            target: self.table.name(self.target).to_string(),
            requirers: self.requirers(requirement),
        }
        .into()
    }
}

fn is_accessor(interface: &TypeInfo, method: u32) -> bool {
    interface
        .properties
        .iter()
        .any(|p| p.getter == Some(method) || p.setter == Some(method))
        || interface
            .events
            .iter()
            .any(|e| e.add == Some(method) || e.remove == Some(method))
}

#[cfg(test)]
#[path = "tests/binder_tests.rs"]
mod tests;
