use containers_resolver::cli::commands::{CliArgs, Commands, ExtractArgs, ResolveArgs};
use containers_resolver::cli::output::OutputFormatter;
use containers_resolver::util::logging::{self, LoggingConfig};
use containers_resolver::{Resolver, ResolverConfig, NAME, RESOLUTION_FILE_NAME, VERSION};

use clap::Parser;
use std::process;
use tracing::{debug, error, info, Level};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    let config = ResolverConfig::default();
    init_logging_from_args(&args, &config);

    debug!("{} v{} starting", NAME, VERSION);
    debug!("Arguments: {:?}", args);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        eprintln!("\nPlease check the RESOLVER_* environment variables.");
        process::exit(1);
    }
    debug!("Configuration:\n{}", config);

    let exit_code = match &args.command {
        Commands::Resolve(resolve_args) => handle_resolve(resolve_args, config).await,
        Commands::Extract(extract_args) => handle_extract(extract_args, config).await,
    };

    process::exit(exit_code);
}

fn init_logging_from_args(args: &CliArgs, config: &ResolverConfig) {
    let level = if let Some(level_str) = &args.log_level {
        logging::parse_level(level_str)
    } else if args.verbose {
        Level::DEBUG
    } else if args.quiet {
        Level::ERROR
    } else {
        logging::parse_level(&config.log_level)
    };

    logging::init_logging(LoggingConfig {
        level,
        ..logging::config_from_env()
    });
}

async fn handle_resolve(args: &ResolveArgs, config: ResolverConfig) -> i32 {
    let resolver = Resolver::new(config);
    match resolver
        .resolve(&args.scan_path, &args.output_dir, &args.images)
        .await
    {
        Ok(resolutions) => {
            info!(
                images = resolutions.len(),
                output = %args.output_dir.join(RESOLUTION_FILE_NAME).display(),
                "Resolution written"
            );
            0
        }
        Err(e) => {
            error!("Resolution failed: {}", e);
            1
        }
    }
}

async fn handle_extract(args: &ExtractArgs, config: ResolverConfig) -> i32 {
    let images = match Resolver::new(config)
        .extract(&args.scan_path, &args.images)
        .await
    {
        Ok(images) => images,
        Err(e) => {
            error!("Extraction failed: {}", e);
            return 1;
        }
    };

    match OutputFormatter::new(args.format.into()).format_images(&images) {
        Ok(output) => {
            print!("{}", output);
            if !output.ends_with('\n') {
                println!();
            }
            0
        }
        Err(e) => {
            error!("Failed to format output: {:#}", e);
            1
        }
    }
}
