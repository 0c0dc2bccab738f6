pub mod color;
pub mod label;
pub mod render;

pub use color::{heat_color, Hsl, Theme, TimeRange};
pub use label::{fit_author, format_label, format_label_in};
pub use render::{compute_render, placeholder_render, RenderInstruction};
