//! Interface introduction.
//!
//! Every interface a mixin implements is introduced onto the target unless
//! the mixin opts out of it or the target already implements it. Each
//! interface is introduced by at most one mixin.

use crate::error::{ConfigurationError, InternalError, Result};
use crate::model::{
    InterfaceIntroduction, MemberArena, MemberDefId, MemberIntroduction, MemberOwner,
    MixinDefinition, NonIntroducedInterface, NonIntroductionReason,
};
use indexmap::IndexMap;
use mixr_common::{MemberKind, MemberRef, TypeId, TypeTable};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

pub struct InterfaceIntroducer<'a> {
    table: &'a TypeTable,
    target: TypeId,
    target_interfaces: FxHashSet<TypeId>,
}

impl<'a> InterfaceIntroducer<'a> {
    pub fn new(table: &'a TypeTable, target: TypeId) -> Result<Self> {
        let target_interfaces = table.all_interfaces(target)?.into_iter().collect();
        Ok(Self {
            table,
            target,
            target_interfaces,
        })
    }

    /// Records the introductions of one mixin.
    pub fn introduce(
        &self,
        mixin: &mut MixinDefinition,
        non_introduced: &[TypeId],
        arena: &MemberArena,
        introduced: &mut IndexMap<TypeId, InterfaceIntroduction>,
        skipped: &mut Vec<NonIntroducedInterface>,
    ) -> Result<()> {
        for interface in self.table.all_interfaces(mixin.mixin_type)? {
            let reason = if non_introduced.contains(&interface) {
                Some(NonIntroductionReason::Suppressed)
            } else if self.target_interfaces.contains(&interface) {
                Some(NonIntroductionReason::ImplementedByTarget)
            } else {
                None
            };
            if let Some(reason) = reason {
                trace!(
                    interface = %self.table.name(interface),
                    mixin = %self.table.name(mixin.mixin_type),
                    ?reason,
                    "interface not introduced"
                );
                skipped.push(NonIntroducedInterface {
                    interface,
                    mixin: mixin.mixin_type,
                    reason,
                });
                continue;
            }

            if let Some(existing) = introduced.get(&interface) {
                return Err(ConfigurationError::DuplicateIntroduction {
                    interface: self.table.name(interface).to_string(),
                    first: self.table.name(existing.implementer).to_string(),
                    second: self.table.name(mixin.mixin_type).to_string(),
                    target: self.table.name(self.target).to_string(),
                }
                .into());
            }

            let introduction = self.build_introduction(mixin, interface, arena)?;
            debug!(
                interface = %self.table.name(interface),
                mixin = %self.table.name(mixin.mixin_type),
                methods = introduction.methods.len(),
                "introducing interface"
            );
            introduced.insert(interface, introduction);
            mixin.introduced_interfaces.push(interface);
        }
        Ok(())
    }

    fn build_introduction(
        &self,
        mixin: &MixinDefinition,
        interface: TypeId,
        arena: &MemberArena,
    ) -> Result<InterfaceIntroduction, InternalError> {
        let owner = MemberOwner::Mixin(mixin.mixin_type);
        let mapping: FxHashMap<MemberRef, Option<MemberRef>> = self
            .table
            .interface_map(mixin.mixin_type, interface)?
            .into_iter()
            .collect();
        let implementation_of = |interface_method: MemberRef| {
            mapping.get(&interface_method).copied().flatten().ok_or_else(|| {
                InternalError::new(format!(
                    "mixin '{}' implements '{}' but has no implementation for '{}'",
                    self.table.name(mixin.mixin_type),
                    self.table.name(interface),
                    self.table.display_member(interface_method)
                ))
            })
        };

        let info = self.table.info(interface);
        let mut accessors: FxHashSet<u32> = FxHashSet::default();
        for property in &info.properties {
            accessors.extend([property.getter, property.setter].into_iter().flatten());
        }
        for event in &info.events {
            accessors.extend([event.add, event.remove].into_iter().flatten());
        }

        let mut introduction = InterfaceIntroduction {
            interface,
            implementer: mixin.mixin_type,
            methods: Vec::new(),
            properties: Vec::new(),
            events: Vec::new(),
        };
        let visibility = mixin.introduced_member_visibility;

        for index in 0..info.methods.len() as u32 {
            if accessors.contains(&index) {
                continue;
            }
            let interface_method = MemberRef::method(interface, index);
            let implementation = implementation_of(interface_method)?;
            let implementer = arena.find(owner, implementation).ok_or_else(|| {
                InternalError::new(format!(
                    "no member definition for '{}' on mixin '{}'",
                    self.table.display_member(implementation),
                    self.table.name(mixin.mixin_type)
                ))
            })?;
            introduction.methods.push(MemberIntroduction {
                kind: MemberKind::Method,
                interface_member: interface_method,
                implementer,
                visibility,
            });
        }

        for (index, property) in info.properties.iter().enumerate() {
            let Some(accessor) = property.getter.or(property.setter) else {
                continue;
            };
            let implementation = implementation_of(MemberRef::method(interface, accessor))?;
            let implementer =
                self.find_by_accessor(mixin, MemberKind::Property, implementation, arena)?;
            introduction.properties.push(MemberIntroduction {
                kind: MemberKind::Property,
                interface_member: MemberRef::property(interface, index as u32),
                implementer,
                visibility,
            });
        }

        for (index, event) in info.events.iter().enumerate() {
            let Some(accessor) = event.add.or(event.remove) else {
                continue;
            };
            let implementation = implementation_of(MemberRef::method(interface, accessor))?;
            let implementer =
                self.find_by_accessor(mixin, MemberKind::Event, implementation, arena)?;
            introduction.events.push(MemberIntroduction {
                kind: MemberKind::Event,
                interface_member: MemberRef::event(interface, index as u32),
                implementer,
                visibility,
            });
        }

        Ok(introduction)
    }

    /// The mixin property or event one of whose accessors is `accessor`.
    fn find_by_accessor(
        &self,
        mixin: &MixinDefinition,
        kind: MemberKind,
        accessor: MemberRef,
        arena: &MemberArena,
    ) -> Result<MemberDefId, InternalError> {
        mixin
            .members
            .of_kind(kind)
            .values()
            .copied()
            .find(|&id| {
                arena[id]
                    .kind
                    .accessors()
                    .into_iter()
                    .flatten()
                    .any(|a| arena.get(a).is_some_and(|def| def.member == accessor))
            })
            .ok_or_else(|| {
                InternalError::new(format!(
                    "no {kind} of mixin '{}' owns the accessor '{}'",
                    self.table.name(mixin.mixin_type),
                    self.table.display_member(accessor)
                ))
            })
    }
}

#[cfg(test)]
#[path = "tests/introductions_tests.rs"]
mod tests;
