//! Build options.

use serde::{Deserialize, Serialize};

/// Switches for one composition build.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompositionOptions {
    /// Bind required interface methods to same-named, same-signature target
    /// members when the target does not implement the interface.
    pub structural_binding: bool,
    /// Propagate inheritable and copied annotations from mixins and
    /// overriders onto the composed surface.
    pub introduce_annotations: bool,
}

impl Default for CompositionOptions {
    fn default() -> Self {
        Self {
            structural_binding: true,
            introduce_annotations: true,
        }
    }
}

impl CompositionOptions {
    pub fn without_structural_binding(mut self) -> Self {
        self.structural_binding = false;
        self
    }

    pub fn without_annotation_introduction(mut self) -> Self {
        self.introduce_annotations = false;
        self
    }
}
