//! tagsmith CLI - Main entry point

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "tagsmith")]
#[command(version)]
#[command(about = "Compile HTML-like templates into Rust render functions", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile every template and write the generated modules
    Build {
        /// Project directory (defaults to the nearest directory with tagsmith.yml)
        #[arg(short, long)]
        project: Option<PathBuf>,

        /// Run the host compiler afterwards and report errors against templates
        #[arg(long)]
        compile: bool,

        /// Write generated modules to DIR (project relative)
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Print diagnostics as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Parse and generate every template without writing anything
    Check {
        /// Project directory (defaults to the nearest directory with tagsmith.yml)
        #[arg(short, long)]
        project: Option<PathBuf>,

        /// Print diagnostics as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Rebuild templates as they change
    Watch {
        /// Project directory (defaults to the nearest directory with tagsmith.yml)
        #[arg(short, long)]
        project: Option<PathBuf>,

        /// Run the host compiler after every rebuild
        #[arg(long)]
        compile: bool,
    },

    /// List the templates of a project
    List {
        /// Project directory (defaults to the nearest directory with tagsmith.yml)
        #[arg(short, long)]
        project: Option<PathBuf>,
    },
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "tagsmith=info",
        1 => "tagsmith=debug",
        _ => "tagsmith=trace",
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Build {
            project,
            compile,
            output,
            json,
        } => commands::build::execute(commands::build::BuildArgs {
            project,
            compile,
            output,
            json,
        }),
        Commands::Check { project, json } => {
            commands::check::execute(commands::check::CheckArgs { project, json })
        }
        Commands::Watch { project, compile } => {
            commands::watch::execute(commands::watch::WatchArgs { project, compile })
        }
        Commands::List { project } => commands::list::execute(commands::list::ListArgs { project }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_build_flags() {
        let cli = Cli::try_parse_from([
            "tagsmith", "-vv", "build", "--project", "site", "--compile", "-o", "gen",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Build {
                project,
                compile,
                output,
                json,
            } => {
                assert_eq!(project, Some(PathBuf::from("site")));
                assert!(compile);
                assert_eq!(output, Some(PathBuf::from("gen")));
                assert!(!json);
            }
            _ => panic!("expected build"),
        }
    }

    #[test]
    fn verbose_flag_is_global() {
        let cli = Cli::try_parse_from(["tagsmith", "list", "-v"]).unwrap();
        assert_eq!(cli.verbose, 1);
    }
}
