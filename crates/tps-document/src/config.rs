//! Settings that seed new documents.
//!
//! With the `config` feature, [`WarperSettings`] can be loaded from and
//! saved to TOML or JSON:
//!
//! ```toml
//! blending_factor = 0.5
//! recalculate_normals = true
//! max_undo_entries = 200
//!
//! [warp_options]
//! apply_affine_translation = false
//! ```

use crate::document::{TpsDocument, UndoableTpsDocument};
#[cfg(feature = "config")]
use crate::error::{DocumentError, DocumentResult};
use tps_warp::TpsWarpOptions;

/// Defaults for a new warping document.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct WarperSettings {
    /// Initial blend factor (0 = no warp, 1 = full warp).
    pub blending_factor: f64,
    /// Recompute normals of the warped mesh.
    pub recalculate_normals: bool,
    /// Undo history cap. `None` keeps everything.
    pub max_undo_entries: Option<usize>,
    pub warp_options: TpsWarpOptions,
}

impl Default for WarperSettings {
    fn default() -> Self {
        Self {
            blending_factor: 1.0,
            recalculate_normals: false,
            max_undo_entries: None,
            warp_options: TpsWarpOptions::default(),
        }
    }
}

impl WarperSettings {
    pub fn with_blending_factor(mut self, blending_factor: f64) -> Self {
        self.blending_factor = blending_factor;
        self
    }

    pub fn with_recalculate_normals(mut self, enabled: bool) -> Self {
        self.recalculate_normals = enabled;
        self
    }

    pub fn with_max_undo_entries(mut self, max: usize) -> Self {
        self.max_undo_entries = Some(max);
        self
    }

    pub fn with_warp_options(mut self, options: TpsWarpOptions) -> Self {
        self.warp_options = options;
        self
    }

    /// Apply these settings to a document's warp parameters.
    pub fn apply_to(&self, doc: &mut TpsDocument) {
        doc.blending_factor = self.blending_factor;
        doc.recalculate_normals = self.recalculate_normals;
        doc.warp_options = self.warp_options;
    }

    /// A default document with these settings applied.
    pub fn create_document(&self) -> TpsDocument {
        let mut doc = TpsDocument::default();
        self.apply_to(&mut doc);
        doc
    }

    /// A default document with these settings and history cap.
    pub fn create_undoable_document(&self) -> UndoableTpsDocument {
        let doc = UndoableTpsDocument::new(self.create_document());
        match self.max_undo_entries {
            Some(max) => doc.with_max_undo_entries(max),
            None => doc,
        }
    }
}

#[cfg(feature = "config")]
impl WarperSettings {
    /// Parse settings from TOML. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentError::Settings`] if the TOML is invalid or a key
    /// has the wrong type.
    pub fn from_toml(toml_str: &str) -> DocumentResult<Self> {
        toml::from_str(toml_str).map_err(|e| DocumentError::settings(e.to_string()))
    }

    /// Load settings from a TOML file.
    pub fn from_toml_file(path: impl AsRef<std::path::Path>) -> DocumentResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| DocumentError::io_read(path, e))?;
        Self::from_toml(&contents)
    }

    pub fn to_toml(&self) -> DocumentResult<String> {
        toml::to_string_pretty(self).map_err(|e| DocumentError::settings(e.to_string()))
    }

    /// Save settings to a TOML file.
    pub fn save_toml(&self, path: impl AsRef<std::path::Path>) -> DocumentResult<()> {
        let path = path.as_ref();
        let toml_str = self.to_toml()?;
        std::fs::write(path, toml_str).map_err(|e| DocumentError::io_write(path, e))
    }

    pub fn from_json(json_str: &str) -> DocumentResult<Self> {
        serde_json::from_str(json_str).map_err(|e| DocumentError::settings(e.to_string()))
    }

    pub fn to_json(&self) -> DocumentResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| DocumentError::settings(e.to_string()))
    }
}
