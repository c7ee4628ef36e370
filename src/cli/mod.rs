pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{CliArgs, Commands, ComponentArgs, NewAppArgs, NewBuildArgs};
pub use handlers::{build_app_config, effective_config, handle_new_app, handle_new_build};
pub use output::{OutputFormat, OutputFormatter};
