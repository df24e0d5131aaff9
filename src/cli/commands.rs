use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Finds the container images a project uses and inventories their contents
#[derive(Parser, Debug)]
#[command(
    name = "containers-resolver",
    about = "Extract container image references from a project and resolve their packages",
    version,
    long_about = "containers-resolver walks a project directory (or a zip/tar archive of one), \
                  collects image references from Dockerfiles, docker-compose files and Helm \
                  charts, merges them with explicitly requested images and analyzes each image \
                  for its layers and installed packages."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - only log errors"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Resolve all images and write containers-resolution.json",
        long_about = "Extracts image references, analyzes every image and writes the result to \
                      <OUTPUT_DIR>/containers-resolution.json.\n\n\
                      Examples:\n  \
                      containers-resolver resolve ./repo --output-dir ./out\n  \
                      containers-resolver resolve repo.zip -o ./out --image nginx:1.25"
    )]
    Resolve(ResolveArgs),

    #[command(
        about = "List the image references found in a project",
        long_about = "Runs discovery and merging only, without analyzing images.\n\n\
                      Examples:\n  \
                      containers-resolver extract ./repo\n  \
                      containers-resolver extract ./repo --format json"
    )]
    Extract(ExtractArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct ResolveArgs {
    #[arg(value_name = "SCAN_PATH", help = "Project directory, .zip, .tar, .tar.gz or .tgz")]
    pub scan_path: PathBuf,

    #[arg(
        short = 'o',
        long,
        value_name = "DIR",
        help = "Existing directory that receives containers-resolution.json"
    )]
    pub output_dir: PathBuf,

    #[arg(
        short = 'i',
        long = "image",
        value_name = "IMAGE",
        help = "Additional image to resolve (repeatable)"
    )]
    pub images: Vec<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct ExtractArgs {
    #[arg(value_name = "SCAN_PATH", help = "Project directory, .zip, .tar, .tar.gz or .tgz")]
    pub scan_path: PathBuf,

    #[arg(
        short = 'i',
        long = "image",
        value_name = "IMAGE",
        help = "Additional image to include (repeatable)"
    )]
    pub images: Vec<String>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_args_verify() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_resolve_args() {
        let args = CliArgs::parse_from([
            "containers-resolver",
            "resolve",
            "/tmp/repo.zip",
            "--output-dir",
            "/tmp/out",
            "--image",
            "nginx:1.25",
            "-i",
            "redis",
        ]);

        match args.command {
            Commands::Resolve(resolve) => {
                assert_eq!(resolve.scan_path, PathBuf::from("/tmp/repo.zip"));
                assert_eq!(resolve.output_dir, PathBuf::from("/tmp/out"));
                assert_eq!(resolve.images, vec!["nginx:1.25", "redis"]);
            }
            _ => panic!("Expected Resolve command"),
        }
    }

    #[test]
    fn test_resolve_requires_output_dir() {
        let result = CliArgs::try_parse_from(["containers-resolver", "resolve", "/tmp/repo"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_extract_defaults() {
        let args = CliArgs::parse_from(["containers-resolver", "extract", "."]);
        match args.command {
            Commands::Extract(extract) => {
                assert_eq!(extract.format, OutputFormatArg::Human);
                assert!(extract.images.is_empty());
            }
            _ => panic!("Expected Extract command"),
        }
    }

    #[test]
    fn test_extract_format() {
        let args = CliArgs::parse_from(["containers-resolver", "extract", ".", "--format", "yaml"]);
        match args.command {
            Commands::Extract(extract) => assert_eq!(extract.format, OutputFormatArg::Yaml),
            _ => panic!("Expected Extract command"),
        }
    }

    #[test]
    fn test_global_flags() {
        let args = CliArgs::parse_from(["containers-resolver", "-v", "extract", "."]);
        assert!(args.verbose);
        assert!(!args.quiet);

        let args = CliArgs::parse_from(["containers-resolver", "extract", ".", "-q"]);
        assert!(args.quiet);

        let args = CliArgs::parse_from(["containers-resolver", "--log-level", "trace", "extract", "."]);
        assert_eq!(args.log_level, Some("trace".to_string()));
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        let result = CliArgs::try_parse_from(["containers-resolver", "-v", "-q", "extract", "."]);
        assert!(result.is_err());
    }
}
