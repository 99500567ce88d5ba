//! Member collection.
//!
//! Reflects over a class and its base chain and produces one member
//! definition per logical member:
//!
//! - Members are grouped by name + signature; walking most-derived first, the
//!   first member of each group wins and base members it hides or overrides
//!   are dropped from the composed surface.
//! - A private redeclaration does not hide an accessible base member, unless
//!   it is an explicit interface implementation. This keeps the surface in
//!   line with [`TypeTable::interface_map`], which skips private methods.
//! - Property and event accessors are claimed in a side table and never show
//!   up as plain methods, even when the property itself is hidden.
//! - Static members never take part in composition.

use crate::error::InternalError;
use crate::model::{
    AnnotationDefinition, ClassMembers, MemberArena, MemberDefId, MemberDefinition,
    MemberDefinitionKind, MemberKey, MemberOwner,
};
use indexmap::IndexMap;
use indexmap::map::Entry;
use mixr_common::{MemberFlags, MemberRef, TypeId, TypeTable, Visibility};
use rustc_hash::FxHashSet;
use tracing::trace;

/// First declaration of a member key seen while walking the base chain.
#[derive(Copy, Clone, Debug)]
struct Sighting {
    declaring: TypeId,
    index: u32,
    private: bool,
    explicit_implementation: bool,
}

impl Sighting {
    fn new(declaring: TypeId, index: usize, visibility: Visibility, explicit: bool) -> Self {
        Self {
            declaring,
            index: index as u32,
            private: visibility.is_private(),
            explicit_implementation: explicit,
        }
    }

    /// The most derived sighting wins, except that an accessible base member
    /// replaces a private redeclaration that implements no interface.
    fn record(self, seen: &mut IndexMap<MemberKey, Sighting>, key: MemberKey) {
        match seen.entry(key) {
            Entry::Vacant(entry) => {
                entry.insert(self);
            }
            Entry::Occupied(mut entry) => {
                let hider = *entry.get();
                if hider.private && !hider.explicit_implementation && !self.private {
                    entry.insert(self);
                }
            }
        }
    }
}

/// Collects deduplicated member definitions of a class into an arena.
pub struct MemberCollector<'a> {
    table: &'a TypeTable,
}

impl<'a> MemberCollector<'a> {
    pub fn new(table: &'a TypeTable) -> Self {
        Self { table }
    }

    /// Collects the members of `ty` accepted by `filter` on behalf of `owner`.
    pub fn collect<F>(
        &self,
        ty: TypeId,
        owner: MemberOwner,
        arena: &mut MemberArena,
        filter: F,
    ) -> Result<ClassMembers, InternalError>
    where
        F: Fn(Visibility, MemberFlags) -> bool,
    {
        let chain = self.table.base_chain(ty)?;
        let accepts = |visibility: Visibility, flags: MemberFlags| {
            !flags.contains(MemberFlags::STATIC) && filter(visibility, flags)
        };

        // Accessors of every property/event along the chain, hidden or not.
        let mut claimed: FxHashSet<MemberRef> = FxHashSet::default();
        for &declaring in &chain {
            let info = self.table.info(declaring);
            for property in &info.properties {
                for accessor in [property.getter, property.setter].into_iter().flatten() {
                    claimed.insert(MemberRef::method(declaring, accessor));
                }
            }
            for event in &info.events {
                for accessor in [event.add, event.remove].into_iter().flatten() {
                    claimed.insert(MemberRef::method(declaring, accessor));
                }
            }
        }

        let mut members = ClassMembers::default();

        let mut seen_properties: IndexMap<MemberKey, Sighting> = IndexMap::new();
        let mut seen_events: IndexMap<MemberKey, Sighting> = IndexMap::new();
        let mut seen_methods: IndexMap<MemberKey, Sighting> = IndexMap::new();
        for &declaring in &chain {
            let info = self.table.info(declaring);
            for (index, property) in info.properties.iter().enumerate() {
                let key = MemberKey::new(property.name.clone(), property.signature());
                let visibility = info.property_visibility(property);
                if accepts(visibility, info.property_flags(property)) {
                    let sighting = Sighting::new(declaring, index, visibility, false);
                    sighting.record(&mut seen_properties, key);
                }
            }
            for (index, event) in info.events.iter().enumerate() {
                let key = MemberKey::new(event.name.clone(), event.signature());
                let visibility = info.event_visibility(event);
                if accepts(visibility, info.event_flags(event)) {
                    let sighting = Sighting::new(declaring, index, visibility, false);
                    sighting.record(&mut seen_events, key);
                }
            }
            for (index, method) in info.methods.iter().enumerate() {
                if claimed.contains(&MemberRef::method(declaring, index as u32)) {
                    continue;
                }
                if accepts(method.visibility, method.flags) {
                    let key = MemberKey::new(method.name.clone(), method.signature.clone());
                    let explicit = info
                        .interface_impls
                        .iter()
                        .any(|i| i.implementation == index as u32);
                    let sighting = Sighting::new(declaring, index, method.visibility, explicit);
                    sighting.record(&mut seen_methods, key);
                }
            }
        }

        for (key, Sighting { declaring, index, .. }) in seen_methods {
            let id = self.alloc_method(arena, owner, declaring, index);
            members.methods.insert(key, id);
        }
        for (key, Sighting { declaring, index, .. }) in seen_properties {
            let id = self.alloc_property(arena, owner, declaring, index)?;
            members.properties.insert(key, id);
        }
        for (key, Sighting { declaring, index, .. }) in seen_events {
            let id = self.alloc_event(arena, owner, declaring, index)?;
            members.events.insert(key, id);
        }

        trace!(
            ty = %self.table.name(ty),
            methods = members.methods.len(),
            properties = members.properties.len(),
            events = members.events.len(),
            "collected members"
        );
        Ok(members)
    }

    /// Type-level annotations of `ty`: its own, then inheritable ones from its
    /// base classes that the derived declarations do not already carry.
    pub fn collect_type_annotations(
        &self,
        ty: TypeId,
    ) -> Result<Vec<AnnotationDefinition>, InternalError> {
        let chain = self.table.base_chain(ty)?;
        let mut annotations: Vec<AnnotationDefinition> = self
            .table
            .info(ty)
            .annotations
            .iter()
            .map(AnnotationDefinition::from)
            .collect();

        for &base in chain.iter().skip(1) {
            for instance in &self.table.info(base).annotations {
                let usage = self.table.annotation_usage(instance.kind);
                let present = annotations.iter().any(|a| a.kind == instance.kind);
                if usage.inherited && (usage.allow_multiple || !present) {
                    annotations.push(AnnotationDefinition::from(instance));
                }
            }
        }
        Ok(annotations)
    }

    fn alloc_method(
        &self,
        arena: &mut MemberArena,
        owner: MemberOwner,
        declaring: TypeId,
        index: u32,
    ) -> MemberDefId {
        let method = &self.table.info(declaring).methods[index as usize];
        arena.alloc(MemberDefinition {
            id: MemberDefId(0),
            owner,
            member: MemberRef::method(declaring, index),
            name: method.name.clone(),
            signature: method.signature.clone(),
            visibility: method.visibility,
            flags: method.flags,
            kind: MemberDefinitionKind::Method,
            annotations: method.annotations.iter().map(AnnotationDefinition::from).collect(),
            received_annotations: Vec::new(),
            override_marker: method.override_marker,
            base: None,
            overrides: Vec::new(),
        })
    }

    fn alloc_accessor(
        &self,
        arena: &mut MemberArena,
        owner: MemberOwner,
        declaring: TypeId,
        accessor: Option<u32>,
    ) -> Result<Option<MemberDefId>, InternalError> {
        let Some(index) = accessor else {
            return Ok(None);
        };
        if self.table.info(declaring).methods.get(index as usize).is_none() {
            return Err(InternalError::new(format!(
                "accessor #{index} of a member of '{}' does not exist",
                self.table.name(declaring)
            )));
        }
        Ok(Some(self.alloc_method(arena, owner, declaring, index)))
    }

    fn alloc_property(
        &self,
        arena: &mut MemberArena,
        owner: MemberOwner,
        declaring: TypeId,
        index: u32,
    ) -> Result<MemberDefId, InternalError> {
        let info = self.table.info(declaring);
        let property = &info.properties[index as usize];
        let getter = self.alloc_accessor(arena, owner, declaring, property.getter)?;
        let setter = self.alloc_accessor(arena, owner, declaring, property.setter)?;
        Ok(arena.alloc(MemberDefinition {
            id: MemberDefId(0),
            owner,
            member: MemberRef::property(declaring, index),
            name: property.name.clone(),
            signature: property.signature(),
            visibility: info.property_visibility(property),
            flags: info.property_flags(property),
            kind: MemberDefinitionKind::Property { getter, setter },
            annotations: property.annotations.iter().map(AnnotationDefinition::from).collect(),
            received_annotations: Vec::new(),
            override_marker: property.override_marker,
            base: None,
            overrides: Vec::new(),
        }))
    }

    fn alloc_event(
        &self,
        arena: &mut MemberArena,
        owner: MemberOwner,
        declaring: TypeId,
        index: u32,
    ) -> Result<MemberDefId, InternalError> {
        let info = self.table.info(declaring);
        let event = &info.events[index as usize];
        let add = self.alloc_accessor(arena, owner, declaring, event.add)?;
        let remove = self.alloc_accessor(arena, owner, declaring, event.remove)?;
        Ok(arena.alloc(MemberDefinition {
            id: MemberDefId(0),
            owner,
            member: MemberRef::event(declaring, index),
            name: event.name.clone(),
            signature: event.signature(),
            visibility: info.event_visibility(event),
            flags: info.event_flags(event),
            kind: MemberDefinitionKind::Event { add, remove },
            annotations: event.annotations.iter().map(AnnotationDefinition::from).collect(),
            received_annotations: Vec::new(),
            override_marker: event.override_marker,
            base: None,
            overrides: Vec::new(),
        }))
    }
}

#[cfg(test)]
#[path = "tests/members_tests.rs"]
mod tests;
