//! CLI argument parsing using clap.

use clap::Parser;
use clap::Subcommand;
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "safext")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output and debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output results in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract archive contents
    Extract(ExtractArgs),
    /// Generate shell completions
    Completion(CompletionArgs),
}

/// A size or count ceiling; `-1` disables it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit(pub Option<u64>);

#[derive(clap::Args)]
pub struct ExtractArgs {
    /// Archive or compressed file, `-` for standard input
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Destination directory, or output file for a single compressed stream
    /// (default: current directory)
    #[arg(value_name = "DEST")]
    pub output_dir: Option<PathBuf>,

    /// Replace existing files
    #[arg(long)]
    pub overwrite: bool,

    /// Skip entries that fail and keep going
    #[arg(long)]
    pub continue_on_error: bool,

    /// Skip devices, FIFOs and hard links instead of failing
    #[arg(long)]
    pub continue_on_unsupported_files: bool,

    /// Treat symlink entries as unsupported
    #[arg(long)]
    pub deny_symlinks: bool,

    /// Follow symlinks already present in the destination (insecure)
    #[arg(long)]
    pub insecure_traverse_symlinks: bool,

    /// Create the destination if it does not exist
    #[arg(long)]
    pub create_destination: bool,

    /// Maximum number of entries (-1 disables)
    #[arg(long, value_name = "N", value_parser = parse_limit, allow_hyphen_values = true)]
    pub max_files: Option<Limit>,

    /// Maximum bytes written, with optional K/M/G/T suffix (-1 disables)
    #[arg(long, value_name = "SIZE", value_parser = parse_limit, allow_hyphen_values = true)]
    pub max_extraction_size: Option<Limit>,

    /// Maximum bytes read from the input, with optional K/M/G/T suffix
    /// (-1 disables)
    #[arg(long, value_name = "SIZE", value_parser = parse_limit, allow_hyphen_values = true)]
    pub max_input_size: Option<Limit>,

    /// Octal mode for created directories
    #[arg(long, value_name = "MODE", value_parser = parse_mode)]
    pub dir_mode: Option<u32>,

    /// Octal mode for decompressed single files
    #[arg(long, value_name = "MODE", value_parser = parse_mode)]
    pub file_mode: Option<u32>,

    /// Format to assume instead of sniffing (tar, zip, 7z, rar, gz, ...)
    #[arg(long = "type", value_name = "TYPE")]
    pub extract_type: Option<String>,

    /// Keep a decompressed tar stream as a single file
    #[arg(long)]
    pub no_untar: bool,

    /// Only extract entries matching this glob (repeatable)
    #[arg(long = "pattern", short = 'p', value_name = "GLOB")]
    pub patterns: Vec<String>,

    /// Apply modes and timestamps from the archive
    #[arg(long)]
    pub preserve_attributes: bool,

    /// Apply owners from the archive (needs privileges)
    #[arg(long)]
    pub preserve_owner: bool,

    /// Buffer non-seekable input in memory instead of a temporary file
    #[arg(long)]
    pub cache_in_memory: bool,

    /// Abort after this many seconds
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,
}

#[derive(clap::Args)]
pub struct CompletionArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Parse byte size with optional suffix (K, M, G, T)
#[allow(clippy::option_if_let_else)]
fn parse_byte_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty byte size".to_string());
    }

    let (num_str, multiplier) = if let Some(stripped) = s.strip_suffix(['T', 't']) {
        (stripped, 1024_u64.pow(4))
    } else if let Some(stripped) = s.strip_suffix(['G', 'g']) {
        (stripped, 1024_u64.pow(3))
    } else if let Some(stripped) = s.strip_suffix(['M', 'm']) {
        (stripped, 1024_u64.pow(2))
    } else if let Some(stripped) = s.strip_suffix(['K', 'k']) {
        (stripped, 1024)
    } else {
        (s, 1)
    };

    num_str
        .parse::<u64>()
        .map_err(|_| format!("invalid byte size: {s}"))
        .and_then(|n| {
            n.checked_mul(multiplier)
                .ok_or_else(|| format!("byte size overflow: {s}"))
        })
}

fn parse_limit(s: &str) -> Result<Limit, String> {
    if s.trim() == "-1" {
        return Ok(Limit(None));
    }
    parse_byte_size(s).map(|n| Limit(Some(n)))
}

fn parse_mode(s: &str) -> Result<u32, String> {
    let digits = s.trim().trim_start_matches("0o");
    u32::from_str_radix(digits, 8)
        .ok()
        .filter(|mode| *mode <= 0o7777)
        .ok_or_else(|| format!("invalid octal mode: {s}"))
}
