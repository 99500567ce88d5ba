//! Mixin ordering.
//!
//! Mixin `A` depends on mixin `B` when `A` names `B` as an explicit
//! dependency, or when one of `A`'s base-call requirements is satisfied by
//! `B` (`B` is assignable to it or introduces it). A dependent mixin sits
//! before its dependencies in the chain, so its base calls reach them.
//!
//! Ordering proceeds in three steps:
//! 1. Mixins are split into groups of mutually connected mixins.
//! 2. Each group is ordered topologically; among mixins that are ready at
//!    the same time the one configured first wins.
//! 3. Groups are concatenated, ordered by the alphabetically first full
//!    name of their members.
//!
//! The result depends only on the context, never on hashing or timing.

use crate::error::{CompositionError, ConfigurationError, InternalError, Result};
use crate::model::{InterfaceIntroduction, MixinDefinition};
use indexmap::IndexMap;
use mixr_common::{TypeId, TypeTable};
use std::collections::VecDeque;
use tracing::debug;

/// Dependency graph over mixin positions in input order.
#[derive(Debug, Default)]
struct MixinGraph {
    /// `dependencies[a]`: mixins `a` depends on.
    dependencies: Vec<Vec<usize>>,
    /// `dependents[b]`: mixins depending on `b`.
    dependents: Vec<Vec<usize>>,
}

impl MixinGraph {
    fn with_len(len: usize) -> Self {
        Self {
            dependencies: vec![Vec::new(); len],
            dependents: vec![Vec::new(); len],
        }
    }

    fn add_edge(&mut self, depender: usize, dependency: usize) {
        if !self.dependencies[depender].contains(&dependency) {
            self.dependencies[depender].push(dependency);
            self.dependents[dependency].push(depender);
        }
    }

    /// Connected components, each in input order, discovered in input order.
    fn groups(&self) -> Vec<Vec<usize>> {
        let len = self.dependencies.len();
        let mut visited = vec![false; len];
        let mut groups = Vec::new();
        for start in 0..len {
            if visited[start] {
                continue;
            }
            visited[start] = true;
            let mut group = Vec::new();
            let mut queue = VecDeque::from([start]);
            while let Some(node) = queue.pop_front() {
                group.push(node);
                for &next in self.dependencies[node].iter().chain(&self.dependents[node]) {
                    if !visited[next] {
                        visited[next] = true;
                        queue.push_back(next);
                    }
                }
            }
            group.sort_unstable();
            groups.push(group);
        }
        groups
    }
}

pub struct MixinSorter<'a> {
    table: &'a TypeTable,
    target: TypeId,
}

impl<'a> MixinSorter<'a> {
    pub fn new(table: &'a TypeTable, target: TypeId) -> Self {
        Self { table, target }
    }

    /// Orders `mixins` into base-call chain order and assigns their indices.
    pub fn sort(
        &self,
        mixins: Vec<MixinDefinition>,
        introduced: &IndexMap<TypeId, InterfaceIntroduction>,
    ) -> Result<Vec<MixinDefinition>> {
        let graph = self.build_graph(&mixins, introduced)?;

        let mut groups = graph.groups();
        groups.sort_by_cached_key(|group| {
            group
                .iter()
                .map(|&i| self.table.name(mixins[i].mixin_type))
                .min()
                .unwrap_or_default()
                .to_string()
        });

        let mut order = Vec::with_capacity(mixins.len());
        for group in &groups {
            self.order_group(group, &graph, &mixins, &mut order)?;
        }

        let mut slots: Vec<Option<MixinDefinition>> = mixins.into_iter().map(Some).collect();
        let mut sorted = Vec::with_capacity(slots.len());
        for (index, position) in order.into_iter().enumerate() {
            let mut mixin = slots
                .get_mut(position)
                .and_then(Option::take)
                .ok_or_else(|| InternalError::new(format!("mixin #{position} ordered twice")))?;
            mixin.assign_index(index);
            sorted.push(mixin);
        }

        debug!(
            target = %self.table.name(self.target),
            order = ?sorted.iter().map(|m| self.table.name(m.mixin_type)).collect::<Vec<_>>(),
            "mixin order"
        );
        Ok(sorted)
    }

    fn build_graph(
        &self,
        mixins: &[MixinDefinition],
        introduced: &IndexMap<TypeId, InterfaceIntroduction>,
    ) -> Result<MixinGraph> {
        let mut graph = MixinGraph::with_len(mixins.len());
        for (a, depender) in mixins.iter().enumerate() {
            for (b, dependency) in mixins.iter().enumerate() {
                if a != b && self.depends_on(depender, dependency, introduced)? {
                    graph.add_edge(a, b);
                }
            }
        }
        Ok(graph)
    }

    fn depends_on(
        &self,
        depender: &MixinDefinition,
        dependency: &MixinDefinition,
        introduced: &IndexMap<TypeId, InterfaceIntroduction>,
    ) -> Result<bool> {
        if depender.mixin_dependencies.contains(&dependency.mixin_type) {
            return Ok(true);
        }
        for &requirement in depender.base_call_dependencies.keys() {
            if requirement == TypeId::OBJECT || self.table.is_generic_parameter(requirement) {
                continue;
            }
            let introduces = introduced
                .get(&requirement)
                .is_some_and(|i| i.implementer == dependency.mixin_type);
            if introduces
                || self
                    .table
                    .is_assignable_to(dependency.mixin_type, requirement)?
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Kahn's algorithm over one group: a mixin is ready once every mixin
    /// depending on it has been placed.
    fn order_group(
        &self,
        group: &[usize],
        graph: &MixinGraph,
        mixins: &[MixinDefinition],
        order: &mut Vec<usize>,
    ) -> Result<()> {
        let mut pending: Vec<usize> = graph.dependents.iter().map(Vec::len).collect();
        let mut placed = vec![false; mixins.len()];

        for _ in 0..group.len() {
            let Some(&next) = group.iter().find(|&&i| !placed[i] && pending[i] == 0) else {
                return Err(self.cycle_error(group, graph, &placed, mixins));
            };
            placed[next] = true;
            order.push(next);
            for &dependency in &graph.dependencies[next] {
                pending[dependency] -= 1;
            }
        }
        Ok(())
    }

    /// Every unplaced mixin still has an unplaced dependent, so walking
    /// dependents from any of them must revisit a node.
    fn cycle_error(
        &self,
        group: &[usize],
        graph: &MixinGraph,
        placed: &[bool],
        mixins: &[MixinDefinition],
    ) -> CompositionError {
        let mut path: Vec<usize> = Vec::new();
        let mut current = group.iter().copied().find(|&i| !placed[i]);
        let mut cycle = Vec::new();
        while let Some(node) = current {
            if let Some(position) = path.iter().position(|&p| p == node) {
                cycle = path.split_off(position);
                break;
            }
            path.push(node);
            current = graph.dependents[node].iter().copied().find(|&d| !placed[d]);
        }

        // Walked against the edges; present it as "depends on" order,
        // starting from the earliest configured mixin.
        cycle.reverse();
        if let Some(start) = cycle
            .iter()
            .enumerate()
            .min_by_key(|&(_, &node)| node)
            .map(|(i, _)| i)
        {
            cycle.rotate_left(start);
        }
        if let Some(&first) = cycle.first() {
            cycle.push(first);
        }

        ConfigurationError::CircularDependency {
            target: self.table.name(self.target).to_string(),
            mixins: cycle
                .into_iter()
                .map(|i| self.table.name(mixins[i].mixin_type).to_string())
                .collect(),
        }
        .into()
    }
}

#[cfg(test)]
#[path = "tests/sorter_tests.rs"]
mod tests;
