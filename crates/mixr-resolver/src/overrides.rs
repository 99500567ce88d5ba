//! Override analysis.
//!
//! Links members marked as overriders to the member they override:
//!
//! | Marker direction | Overriders | Candidates |
//! |------------------|------------|------------|
//! | `Target` | mixin members | target members |
//! | `Mixin` | target members | members of every mixin |
//!
//! A candidate matches on name and signature, must be overridable and not
//! private, and must belong to the marker's restriction type if one is
//! given. Exactly one candidate must match.
//!
//! Candidates are indexed once per kind and then queried; the index is
//! never mutated while lookups are in flight.

use crate::error::{ConfigurationError, Result};
use crate::model::{ClassMembers, MemberArena, MemberDefId, MemberDefinition, MixinDefinition};
use mixr_common::{MemberKind, OverrideDirection, TypeId, TypeTable};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::{debug, trace};

/// Candidate base members grouped by name.
#[derive(Debug, Default)]
pub struct BaseMemberIndex {
    by_name: FxHashMap<String, SmallVec<[MemberDefId; 2]>>,
}

impl BaseMemberIndex {
    pub fn build(arena: &MemberArena, members: impl IntoIterator<Item = MemberDefId>) -> Self {
        let mut index = Self::default();
        for id in members {
            index
                .by_name
                .entry(arena[id].name.clone())
                .or_default()
                .push(id);
        }
        index
    }

    pub fn lookup(&self, name: &str) -> &[MemberDefId] {
        self.by_name.get(name).map_or(&[], |ids| ids.as_slice())
    }

    pub fn len(&self) -> usize {
        self.by_name.values().map(SmallVec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

pub struct OverrideAnalyzer<'a> {
    table: &'a TypeTable,
    target: TypeId,
}

impl<'a> OverrideAnalyzer<'a> {
    pub fn new(table: &'a TypeTable, target: TypeId) -> Self {
        Self { table, target }
    }

    /// Resolves and links every override of the build.
    pub fn analyze(
        &self,
        arena: &mut MemberArena,
        target_members: &ClassMembers,
        mixins: &[MixinDefinition],
    ) -> Result<()> {
        for kind in [MemberKind::Method, MemberKind::Property, MemberKind::Event] {
            let links = self.resolve_kind(kind, arena, target_members, mixins)?;
            for (overrider, base) in links {
                arena.link_override(overrider, base)?;
            }
        }
        Ok(())
    }

    fn resolve_kind(
        &self,
        kind: MemberKind,
        arena: &MemberArena,
        target_members: &ClassMembers,
        mixins: &[MixinDefinition],
    ) -> Result<Vec<(MemberDefId, MemberDefId)>> {
        let target_index =
            BaseMemberIndex::build(arena, target_members.of_kind(kind).values().copied());
        let mixin_index = BaseMemberIndex::build(
            arena,
            mixins
                .iter()
                .flat_map(|m| m.members.of_kind(kind).values().copied()),
        );

        let mut links = Vec::new();
        for mixin in mixins {
            for &id in mixin.members.of_kind(kind).values() {
                if arena[id]
                    .override_marker
                    .is_some_and(|m| m.direction == OverrideDirection::Target)
                {
                    let scope = format!("target class '{}'", self.table.name(self.target));
                    links.push((id, self.resolve(arena, id, &target_index, scope)?));
                }
            }
        }
        for &id in target_members.of_kind(kind).values() {
            if arena[id]
                .override_marker
                .is_some_and(|m| m.direction == OverrideDirection::Mixin)
            {
                let scope = format!("the mixins applied to '{}'", self.table.name(self.target));
                links.push((id, self.resolve(arena, id, &mixin_index, scope)?));
            }
        }

        if !links.is_empty() {
            debug!(%kind, overrides = links.len(), "resolved overrides");
        }
        Ok(links)
    }

    fn resolve(
        &self,
        arena: &MemberArena,
        overrider: MemberDefId,
        candidates: &BaseMemberIndex,
        scope: String,
    ) -> Result<MemberDefId> {
        let definition = &arena[overrider];
        let mut matches: SmallVec<[MemberDefId; 2]> = SmallVec::new();
        for &candidate in candidates.lookup(&definition.name) {
            if self.matches(definition, &arena[candidate])? {
                matches.push(candidate);
            }
        }

        match matches.as_slice() {
            [] => Err(ConfigurationError::OverriddenMemberNotFound {
                kind: definition.member_kind(),
                overrider: arena.display(self.table, self.target, overrider),
                scope,
            }
            .into()),
            [base] => {
                trace!(
                    overrider = %arena.display(self.table, self.target, overrider),
                    base = %arena.display(self.table, self.target, *base),
                    "override"
                );
                Ok(*base)
            }
            [first, second, ..] => Err(ConfigurationError::AmbiguousOverride {
                overrider: arena.display(self.table, self.target, overrider),
                first: arena.display(self.table, self.target, *first),
                second: arena.display(self.table, self.target, *second),
            }
            .into()),
        }
    }

    fn matches(&self, overrider: &MemberDefinition, candidate: &MemberDefinition) -> Result<bool> {
        if candidate.signature != overrider.signature
            || !candidate.flags.is_overridable()
            || candidate.visibility.is_private()
        {
            return Ok(false);
        }
        match overrider.override_marker.and_then(|m| m.target) {
            Some(restriction) => Ok(self
                .table
                .is_assignable_to(candidate.owner.owner_type(self.target), restriction)?),
            None => Ok(true),
        }
    }
}

#[cfg(test)]
#[path = "tests/overrides_tests.rs"]
mod tests;
