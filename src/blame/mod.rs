pub mod types;
pub mod parser;

pub use types::*;
pub use parser::{
    parse_blame_bytes, parse_blame_bytes_limited, parse_blame_limited, parse_blame_output,
    DEFAULT_MAX_LINES,
};
