//! CLI domain: parse, route and output mapping for the `stylesync` binary.

mod output;
mod parse;
mod route;

pub use output::map_error;
pub use parse::{Cli, Commands};
pub use route::RunContext;
