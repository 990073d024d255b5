//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use repo_mirror::{DEFAULT_CONCURRENCY, MirrorConfig, TlsVerification, Traversal};

/// Contents listing the original tool mirrored.
const DEFAULT_ROOT_URL: &str =
    "https://gitea.radium.group/api/v1/repos/radium/project-configuration/contents/";

/// Mirror a remote repository tree and write a SHA-256 manifest.
///
/// Walks the repository's contents API recursively, downloads every file
/// into the output directory, then hashes the downloaded tree.
#[derive(Parser, Debug)]
#[command(name = "repo-mirror")]
#[command(author, version, about)]
pub struct Args {
    /// Contents API listing URL of the root directory
    #[arg(short = 'u', long, default_value = DEFAULT_ROOT_URL)]
    pub url: String,

    /// Local directory the tree is mirrored into
    #[arg(short = 'o', long, default_value = "temp")]
    pub output: PathBuf,

    /// Manifest file to write after the download pass
    #[arg(short = 'm', long, default_value = repo_mirror::config::DEFAULT_MANIFEST_PATH)]
    pub manifest: PathBuf,

    /// Maximum concurrent file downloads (1-100)
    #[arg(short = 'c', long, default_value_t = DEFAULT_CONCURRENCY as u8, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub concurrency: u8,

    /// Per-request timeout in seconds (1-3600)
    #[arg(short = 't', long, default_value_t = 300, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub timeout: u64,

    /// Disable TLS certificate verification (INSECURE; trusted upstreams only)
    #[arg(long)]
    pub insecure: bool,

    /// Traverse sibling subdirectories concurrently
    #[arg(long)]
    pub parallel_dirs: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Builds the run configuration from parsed arguments.
    pub fn to_config(&self) -> MirrorConfig {
        let tls = if self.insecure {
            TlsVerification::AcceptInvalidCerts
        } else {
            TlsVerification::Verify
        };
        let traversal = if self.parallel_dirs {
            Traversal::Parallel
        } else {
            Traversal::Sequential
        };
        MirrorConfig::new(&self.url, &self.output)
            .with_manifest_path(&self.manifest)
            .with_concurrency(usize::from(self.concurrency))
            .with_request_timeout(Duration::from_secs(self.timeout))
            .with_tls(tls)
            .with_traversal(traversal)
    }

    /// Default log filter: quiet -> error, -v -> debug, -vv -> trace, else info.
    pub fn default_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "info",
                1 => "debug",
                _ => "trace",
            }
        }
    }
}
