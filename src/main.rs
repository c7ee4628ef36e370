use appgen::cli::commands::{CliArgs, Commands};
use appgen::cli::handlers::{handle_new_app, handle_new_build};
use appgen::util::logging::{self, parse_level, LoggingConfig};
use appgen::{NAME, VERSION};

use clap::Parser;
use std::process;
use tracing::{debug, Level};

fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("{} v{} starting", NAME, VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::NewApp(new_app_args) => handle_new_app(new_app_args, args.quiet),
        Commands::NewBuild(new_build_args) => handle_new_build(new_build_args, args.quiet),
    };

    process::exit(exit_code);
}

fn init_logging_from_args(args: &CliArgs) {
    let from_env = logging::config_from_env();
    let level = if let Some(level_str) = &args.log_level {
        parse_level(level_str)
    } else if args.verbose {
        Level::DEBUG
    } else if args.quiet {
        Level::ERROR
    } else {
        from_env.level
    };

    logging::init_logging(LoggingConfig { level, ..from_env });
}
