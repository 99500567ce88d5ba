//! Annotation introduction.
//!
//! Decides which annotations of a source declaration propagate onto a
//! composed declaration. An annotation is introduced when
//!
//! - its kind is inheritable, or the instance is explicitly marked as copied, and
//! - its kind allows multiple instances, or the target does not carry that
//!   kind yet (own or previously introduced).
//!
//! The second rule makes re-running an introduction idempotent for
//! single-use kinds.

use crate::model::{AnnotationDefinition, AnnotationIntroduction, AnnotationSource};
use mixr_common::TypeTable;
use tracing::trace;

pub struct AnnotationIntroducer<'a> {
    table: &'a TypeTable,
}

impl<'a> AnnotationIntroducer<'a> {
    pub fn new(table: &'a TypeTable) -> Self {
        Self { table }
    }

    /// Introduces `source` annotations onto a target that already carries
    /// `existing` and `received`. Returns how many were introduced.
    pub fn introduce(
        &self,
        source: &[AnnotationDefinition],
        origin: AnnotationSource,
        existing: &[AnnotationDefinition],
        received: &mut Vec<AnnotationIntroduction>,
    ) -> usize {
        let mut introduced = 0;
        for annotation in source {
            let usage = self.table.annotation_usage(annotation.kind);
            if !(usage.inherited || annotation.copied) {
                continue;
            }
            let carried = existing.iter().any(|a| a.kind == annotation.kind)
                || received.iter().any(|r| r.annotation.kind == annotation.kind);
            if carried && !usage.allow_multiple {
                continue;
            }
            trace!(
                kind = %self.table.name(annotation.kind),
                ?origin,
                "introducing annotation"
            );
            received.push(AnnotationIntroduction {
                annotation: annotation.clone(),
                source: origin,
            });
            introduced += 1;
        }
        introduced
    }
}

#[cfg(test)]
#[path = "tests/annotations_tests.rs"]
mod tests;
