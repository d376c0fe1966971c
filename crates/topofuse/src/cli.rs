//! Clap derive structures for the `topofuse` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// topofuse -- fused switch/port/device topology from every source you have
#[derive(Debug, Parser)]
#[command(
    name = "topofuse",
    version,
    about = "Fuse network topology sources into one switch/port/device view",
    long_about = "Queries switch controllers, SNMP inventories, MAC tables, cloud-managed\n\
        switches and discovery scanners concurrently, then merges them by\n\
        source priority into a single topology with vendor identification.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config directory)
    #[arg(long, env = "TOPOFUSE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "TOPOFUSE_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Overall request deadline in seconds (overrides engine.deadline_secs)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch every source and print the fused topology
    #[command(alias = "topo", alias = "t")]
    Topology(TopologyArgs),

    /// Identify the vendor behind one or more MAC addresses
    #[command(alias = "r")]
    Resolve(ResolveArgs),

    /// Inspect configuration
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
pub struct TopologyArgs {
    /// Include cloud-managed switches
    #[arg(long)]
    pub cloud: bool,

    /// Skip the discovery scanner pass
    #[arg(long)]
    pub no_scanner: bool,

    /// Leave vendor fields as the sources reported them
    #[arg(long)]
    pub no_resolve: bool,

    /// Only show this switch (name or serial)
    #[arg(long, short = 's')]
    pub switch: Option<String>,
}

#[derive(Debug, Args)]
pub struct ResolveArgs {
    /// MAC addresses in any common notation
    #[arg(required = true, value_name = "MAC")]
    pub macs: Vec<String>,

    /// Use only the local table and vendor cache
    #[arg(long)]
    pub offline: bool,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file path in use
    Path,
    /// Print the effective configuration with secrets redacted
    Show,
}
