//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "pharm",
    version,
    about = "Match supplier invoice lines to a pharmacy master catalog",
    long_about = "Match supplier invoice lines to a pharmacy master catalog.\n\n\
                  Each line is scored against the catalog with a fuzzy-matching ensemble\n\
                  and classified AUTO_OK, CHECK or NO_MATCH. Reviewer corrections are\n\
                  learned and short-circuit matching for recurring lines."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Matching configuration (TOML). Defaults apply when omitted.
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Normalization vocabulary (TOML). The built-in vocabulary applies when omitted.
    #[arg(long = "vocabulary", value_name = "PATH", global = true)]
    pub vocabulary: Option<PathBuf>,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Allow invoice item text in trace logs (redacted by default).
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Match an invoice against the catalog and write the results as CSV.
    Match(MatchArgs),

    /// Feed reviewed corrections into the learning store.
    Learn(LearnArgs),

    /// Export learned mappings and their correction history as JSON.
    Export(ExportArgs),

    /// Show learning store statistics.
    Stats(StoreArgs),

    /// Remove a learned mapping.
    Forget(ForgetArgs),
}

#[derive(Args)]
pub struct MatchArgs {
    /// Master catalog CSV (Item Code, Item Name, B.Rate, S.Rate).
    #[arg(long = "catalog", value_name = "CSV")]
    pub catalog: PathBuf,

    /// Invoice lines CSV.
    #[arg(value_name = "INVOICE")]
    pub invoice: PathBuf,

    /// Purchase history CSV for the supplier signal.
    #[arg(long = "purchases", value_name = "CSV")]
    pub purchases: Option<PathBuf>,

    /// Learning store journal; learned mappings are consulted when given.
    #[arg(long = "store", value_name = "PATH")]
    pub store: Option<PathBuf>,

    /// Output CSV (default: <INVOICE>_matched.csv next to the invoice).
    #[arg(long = "output", short = 'o', value_name = "CSV")]
    pub output: Option<PathBuf>,

    /// Rows to list in the review table (CHECK and NO_MATCH lines).
    #[arg(long = "review-limit", value_name = "N", default_value_t = 20)]
    pub review_limit: usize,

    /// Match without the progress bar.
    #[arg(long = "no-progress")]
    pub no_progress: bool,
}

#[derive(Args)]
pub struct LearnArgs {
    /// Master catalog CSV; corrected item codes must exist in it.
    #[arg(long = "catalog", value_name = "CSV")]
    pub catalog: PathBuf,

    /// Corrections CSV (a reviewed match output with Corrected_Item_Code filled in).
    #[arg(value_name = "CORRECTIONS")]
    pub corrections: PathBuf,

    /// Learning store journal (created when missing).
    #[arg(long = "store", value_name = "PATH")]
    pub store: PathBuf,
}

#[derive(Args)]
pub struct ExportArgs {
    /// Learning store journal.
    #[arg(long = "store", value_name = "PATH")]
    pub store: PathBuf,

    /// Export file (JSON).
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,
}

#[derive(Args)]
pub struct StoreArgs {
    /// Learning store journal.
    #[arg(long = "store", value_name = "PATH")]
    pub store: PathBuf,
}

#[derive(Args)]
pub struct ForgetArgs {
    /// Learning store journal.
    #[arg(long = "store", value_name = "PATH")]
    pub store: PathBuf,

    /// Invoice item text as it appeared on the invoice.
    #[arg(long = "item", value_name = "TEXT")]
    pub item: String,

    /// Supplier name as it appeared on the invoice.
    #[arg(long = "supplier", value_name = "NAME", default_value = "")]
    pub supplier: String,

    /// Reason recorded in the history.
    #[arg(long = "reason", value_name = "TEXT")]
    pub reason: Option<String>,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
