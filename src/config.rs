use serde::{Deserialize, Serialize};

use crate::error::{BlameError, Result};

/// Rendering and refresh settings supplied by the host extension.
///
/// Every field has a default, so the host only sends what it overrides,
/// e.g. `{"debounceMs": 500}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HeatConfig {
    /// Total gutter width in character cells.
    pub gutter_width: usize,
    /// Spaces placed before the label inside the gutter.
    pub left_padding: usize,
    /// Author names are truncated or padded to exactly this many chars.
    pub author_width: usize,
    /// Hue of the heat scale, in degrees.
    pub hue: u16,
    pub dark_text_color: String,
    pub light_text_color: String,
    /// Coalescing delay before a blame request is issued.
    pub debounce_ms: u64,
    /// Blame output beyond this many bytes is treated as a failure.
    pub max_output_bytes: usize,
    pub git_path: String,
}

impl Default for HeatConfig {
    fn default() -> Self {
        Self {
            gutter_width: 18,
            left_padding: 1,
            author_width: 6,
            hue: 210,
            dark_text_color: "#cccccc".to_string(),
            light_text_color: "#444444".to_string(),
            debounce_ms: 300,
            max_output_bytes: 16 * 1024 * 1024,
            git_path: "git".to_string(),
        }
    }
}

impl HeatConfig {
    /// Parse a (possibly partial) JSON config and validate it.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: HeatConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Width of a formatted label: `YYYY/MM/DD` + space + author.
    pub fn label_width(&self) -> usize {
        10 + 1 + self.author_width
    }

    pub fn validate(&self) -> Result<()> {
        if self.left_padding + self.label_width() > self.gutter_width {
            return Err(invalid(format!(
                "gutterWidth {} cannot hold padding {} and a {}-cell label",
                self.gutter_width,
                self.left_padding,
                self.label_width()
            )));
        }
        if self.hue >= 360 {
            return Err(invalid(format!("hue {} is out of range 0..360", self.hue)));
        }
        if self.max_output_bytes == 0 {
            return Err(invalid("maxOutputBytes must be positive".to_string()));
        }
        Ok(())
    }
}

fn invalid(msg: String) -> BlameError {
    BlameError::InvalidConfig(msg)
}
