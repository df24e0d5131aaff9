pub mod commands;
pub mod output;

pub use commands::{CliArgs, Commands, ExtractArgs, OutputFormatArg, ResolveArgs};
pub use output::{OutputFormat, OutputFormatter};
