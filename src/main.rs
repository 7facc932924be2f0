//! incert - Throwaway X.509 Certificate Chains
//!
//! Command-line front end for issuing a root, an intermediate and leaf
//! certificates into an output directory.
//!
//! # Commands
//!
//! - `incert issue single`: one leaf from flags and/or a config file
//! - `incert issue batch --config FILE`: every leaf listed in a config file
//! - `incert version`: version and commit of this build
//!
//! Logging goes to stderr and is controlled with `RUST_LOG` (default `info`).

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use incert::build_info::BuildInfo;
use incert::configs::{BatchConfig, PartialSingle, SingleFile};
use incert::issue::{self, IssuedChain};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "incert")]
#[command(about = "Issue X.509 certificate chains for development and testing", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Issue one or more certificates
    #[command(subcommand)]
    Issue(IssueCommands),

    /// Print version information
    Version,
}

#[derive(Subcommand)]
enum IssueCommands {
    /// Issue a certificate based upon command line arguments
    Single {
        /// Configuration file (TOML, YAML or JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Common name of the certificate [default: localhost]
        #[arg(short = 'c', long = "common")]
        common_name: Option<String>,

        /// Subject alternative name of the certificate (repeatable) [default: localhost]
        #[arg(short = 'a', long = "alternative", value_delimiter = ',')]
        alternative_names: Vec<String>,

        /// Duration for which the certificate is valid, e.g. 24h [default: 8760h]
        #[arg(short = 'e', long, value_parser = parse_duration)]
        expires: Option<Duration>,

        /// Directory for the output files
        #[arg(short = 'd', long, default_value = ".")]
        directory: PathBuf,
    },

    /// Issue multiple certificates based upon a configuration file
    Batch {
        /// Configuration file (TOML, YAML or JSON)
        #[arg(long)]
        config: PathBuf,

        /// Directory for the output files
        #[arg(short = 'd', long, default_value = ".")]
        directory: PathBuf,
    },
}

fn parse_duration(text: &str) -> Result<Duration> {
    incert::duration::parse(text)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let build_info = BuildInfo::current();
    let cli = Cli::parse();

    match cli.command {
        Commands::Issue(IssueCommands::Single {
            config,
            common_name,
            alternative_names,
            expires,
            directory,
        }) => {
            let file = match config {
                Some(path) => SingleFile::from_file(&path)?,
                None => SingleFile::default(),
            };
            let flags = PartialSingle {
                common_name,
                alternative_names: (!alternative_names.is_empty()).then_some(alternative_names),
                expires,
            };
            let request = file.single.resolve(flags);

            println!(
                "Issuing [{}] valid for {}",
                request.common_name,
                incert::duration::format(request.expires)
            );
            let chain = issue::issue_single(&request, &file.issuer)
                .context("Failed to issue certificate chain")?;
            write_chain(&chain, &directory)?;
        }
        Commands::Issue(IssueCommands::Batch { config, directory }) => {
            let batch = BatchConfig::from_file(&config)?;
            println!("Issuing {} certificate(s)", batch.values.len());
            let chain = issue::issue_batch(&batch).context("Failed to issue certificate chain")?;
            write_chain(&chain, &directory)?;
        }
        Commands::Version => {
            println!("incert {}", build_info.version());
            println!("commit {}", build_info.commit());
        }
    }

    Ok(())
}

fn write_chain(chain: &IssuedChain, directory: &Path) -> Result<()> {
    let written = chain.write_to(directory)?;
    for path in &written {
        println!("✓ {}", path.display());
    }
    println!(
        "✓ Root, intermediate and {} leaf certificate(s) written to {}",
        chain.leaves.len(),
        directory.display()
    );
    Ok(())
}
