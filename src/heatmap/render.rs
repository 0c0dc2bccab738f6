use serde::Serialize;

use super::color::{heat_color, Theme, TimeRange};
use super::label::format_label;
use crate::blame::AttributionTable;
use crate::config::HeatConfig;

/// What the host should draw in the gutter of one line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RenderInstruction {
    #[serde(rename_all = "camelCase")]
    Annotated {
        text: String,
        background_color: String,
        text_color: String,
    },
    #[serde(rename_all = "camelCase")]
    Placeholder {
        text: String,
        background_color: String,
    },
}

impl RenderInstruction {
    pub fn placeholder(config: &HeatConfig) -> Self {
        RenderInstruction::Placeholder {
            text: " ".repeat(config.gutter_width),
            background_color: "transparent".to_string(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, RenderInstruction::Placeholder { .. })
    }

    pub fn text(&self) -> &str {
        match self {
            RenderInstruction::Annotated { text, .. } | RenderInstruction::Placeholder { text, .. } => text,
        }
    }
}

/// Pad a label into the fixed gutter: left padding, label, trailing fill.
fn gutter_text(label: &str, config: &HeatConfig) -> String {
    let content_width = config.gutter_width.saturating_sub(config.left_padding);
    format!(
        "{}{:<width$}",
        " ".repeat(config.left_padding),
        label,
        width = content_width
    )
}

/// Compute one render instruction per line `0..total_lines`.
///
/// Lines without attribution, or whose commit has no author time, become
/// placeholders. Colors are scaled over the time range of the lines that
/// actually fall inside the buffer.
pub fn compute_render(
    table: &AttributionTable,
    total_lines: usize,
    theme: Theme,
    config: &HeatConfig,
) -> Vec<RenderInstruction> {
    let slots = table.by_line(total_lines);
    let range = TimeRange::from_times(slots.iter().flatten().map(|c| c.author_time));

    let text_color = match theme {
        Theme::Dark => &config.dark_text_color,
        Theme::Light => &config.light_text_color,
    };

    slots
        .into_iter()
        .map(|slot| match (slot, range) {
            (Some(commit), Some(range)) if commit.author_time > 0 => {
                let ratio = range.ratio(commit.author_time);
                let label = format_label(commit.author_time, &commit.author, config.author_width);
                RenderInstruction::Annotated {
                    text: gutter_text(&label, config),
                    background_color: heat_color(ratio, theme, config.hue).to_string(),
                    text_color: text_color.clone(),
                }
            }
            _ => RenderInstruction::placeholder(config),
        })
        .collect()
}

/// Placeholders for every line, used when no blame is available.
pub fn placeholder_render(total_lines: usize, config: &HeatConfig) -> Vec<RenderInstruction> {
    vec![RenderInstruction::placeholder(config); total_lines]
}
