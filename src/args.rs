//! These structs provide the CLI interface for the pulse CLI.

use crate::model::{Amount, OperationType, Owner, Period, Subtype};
use crate::MergePolicy;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// pulse: a command-line personal finance tracker.
///
/// Log income and expense operations, track savings goals, view aggregated
/// reports, and optionally keep the full state synchronized with a snapshot
/// vault so several machines share one ledger.
///
/// All data lives under the pulse home directory (~/pulse by default).
/// Cloud sync is opt-in: link or push a snapshot id with the `cloud`
/// subcommands and run `pulse watch` to keep reconciling in the background.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory and initialize the configuration file.
    ///
    /// This is the first command you should run. Decide what directory you
    /// want to store data in and pass it as --pulse-home (defaults to
    /// $HOME/pulse). If you plan to use cloud sync, also pass the base URL
    /// of your snapshot-vault service as --vault-url; the access token is
    /// read from $PULSE_HOME/.secrets/vault_token or the PULSE_VAULT_TOKEN
    /// environment variable, never from the config file.
    Init(InitArgs),
    /// Add, update, delete or list income/expense operations.
    Op(OpArgs),
    /// Add, update, delete or list savings goals.
    Goal(GoalArgs),
    /// Manage the category vocabulary.
    Category(CategoryArgs),
    /// Show aggregated totals, the expense breakdown and the monthly trend.
    Report(ReportArgs),
    /// Write the full state to a JSON document.
    Export(ExportArgs),
    /// Link, push, pull or load cloud snapshots.
    Cloud(CloudArgs),
    /// Run the background sync loop in the foreground until interrupted.
    Watch(WatchArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG. See the tracing-subscriber crate
    /// for instructions.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where pulse data and configuration is held. Defaults
    /// to ~/pulse
    #[arg(long, env = "PULSE_HOME", default_value_t = default_pulse_home())]
    pulse_home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, pulse_home: PathBuf) -> Self {
        Self {
            log_level,
            pulse_home: pulse_home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn pulse_home(&self) -> &DisplayPath {
        &self.pulse_home
    }
}

#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// Base URL of the snapshot-vault service, e.g.
    /// https://vault.example.com/
    #[arg(long)]
    vault_url: Option<String>,
}

impl InitArgs {
    pub fn vault_url(&self) -> Option<&str> {
        self.vault_url.as_deref()
    }
}

#[derive(Debug, Parser, Clone)]
pub struct OpArgs {
    #[command(subcommand)]
    pub command: OpSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum OpSubcommand {
    /// Record a new operation.
    Add(OpFieldArgs),
    /// Replace the fields of an existing operation.
    Update(OpUpdateArgs),
    /// Delete an operation by id. Deleting an unknown id is a no-op.
    Delete(IdArg),
    /// List operations, most recent first.
    List(OpListArgs),
}

/// The user-editable fields of an operation.
#[derive(Debug, Parser, Clone)]
pub struct OpFieldArgs {
    /// income or expense
    #[arg(value_enum)]
    pub kind: OperationType,

    /// income: main|side, expense: personal|business
    #[arg(long, value_enum)]
    pub subtype: Subtype,

    /// The amount, e.g. 1500 or "1,500.50"
    #[arg(long)]
    pub amount: Amount,

    /// Category name, e.g. Groceries
    #[arg(long)]
    pub category: String,

    /// Calendar date of the operation (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Free-form comment
    #[arg(long, default_value = "")]
    pub comment: String,

    /// Whose operation this is
    #[arg(long, value_enum, default_value_t = Owner::Me)]
    pub owner: Owner,
}

#[derive(Debug, Parser, Clone)]
pub struct OpUpdateArgs {
    /// The id of the operation to update.
    pub id: i64,

    #[clap(flatten)]
    pub fields: OpFieldArgs,
}

#[derive(Debug, Parser, Clone)]
pub struct IdArg {
    /// The record id.
    pub id: i64,
}

#[derive(Debug, Parser, Clone)]
pub struct OpListArgs {
    /// Limit the listing to a period.
    #[arg(long, value_enum, default_value_t = Period::All)]
    pub period: Period,

    /// Show at most this many operations.
    #[arg(long, default_value_t = 50)]
    pub limit: usize,
}

#[derive(Debug, Parser, Clone)]
pub struct GoalArgs {
    #[command(subcommand)]
    pub command: GoalSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum GoalSubcommand {
    /// Create a new savings goal.
    Add(GoalFieldArgs),
    /// Replace the fields of an existing goal.
    Update(GoalUpdateArgs),
    /// Delete a goal by id. Deleting an unknown id is a no-op.
    Delete(IdArg),
    /// List goals with their progress.
    List,
}

#[derive(Debug, Parser, Clone)]
pub struct GoalFieldArgs {
    /// The goal's name, e.g. "Vacation"
    pub name: String,

    /// The target amount to save.
    #[arg(long)]
    pub target: Amount,

    /// How much is already saved.
    #[arg(long, default_value = "0")]
    pub current: Amount,
}

#[derive(Debug, Parser, Clone)]
pub struct GoalUpdateArgs {
    /// The id of the goal to update.
    pub id: i64,

    #[clap(flatten)]
    pub fields: GoalFieldArgs,
}

#[derive(Debug, Parser, Clone)]
pub struct CategoryArgs {
    #[command(subcommand)]
    pub command: CategorySubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CategorySubcommand {
    /// Add a category name to the vocabulary.
    Add(CategoryFieldArgs),
    /// Remove a category name. Operations tagged with it keep their tag.
    Remove(CategoryFieldArgs),
    /// Print the full vocabulary.
    List,
}

#[derive(Debug, Parser, Clone)]
pub struct CategoryFieldArgs {
    /// income or expense
    #[arg(value_enum)]
    pub kind: OperationType,

    /// income: main|side, expense: personal|business
    #[arg(value_enum)]
    pub subtype: Subtype,

    /// The category name.
    pub name: String,
}

#[derive(Debug, Parser, Clone)]
pub struct ReportArgs {
    /// Which period the totals cover.
    #[arg(long, value_enum, default_value_t = Period::CurrentMonth)]
    pub period: Period,

    /// How many months of trend to include; 0 skips the trend table.
    #[arg(long, default_value_t = 6)]
    pub months: u32,
}

#[derive(Debug, Parser, Clone)]
pub struct ExportArgs {
    /// Where to write the export document. Defaults to
    /// ./pulse-export-YYYY-MM-DD.json
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Parser, Clone)]
pub struct CloudArgs {
    #[command(subcommand)]
    pub command: CloudSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CloudSubcommand {
    /// Point this installation at an existing snapshot id.
    Link(LinkArgs),
    /// Push the full local state to the vault now.
    Push,
    /// Fetch the remote snapshot and show what it contains, without
    /// merging.
    Pull,
    /// Fetch the remote snapshot and reconcile it into local state.
    ///
    /// With no local data the remote snapshot replaces local state
    /// outright; otherwise the chosen policy applies.
    Load(LoadArgs),
    /// Show the remote id, last sync time and current status.
    Status,
}

#[derive(Debug, Parser, Clone)]
pub struct LinkArgs {
    /// The snapshot id to sync with.
    pub id: String,
}

#[derive(Debug, Parser, Clone)]
pub struct LoadArgs {
    /// How to reconcile the fetched snapshot when local data exists.
    #[arg(long, value_enum, default_value_t = MergePolicy::Union)]
    pub policy: MergePolicy,
}

#[derive(Debug, Parser, Clone)]
pub struct WatchArgs {
    /// Override the configured sync interval, in seconds.
    #[arg(long)]
    pub interval: Option<u64>,
}

fn default_pulse_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("pulse"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --pulse-home or PULSE_HOME instead of relying on the default \
                pulse home directory. If you continue using the program right now, you may have \
                problems!",
            );
            PathBuf::from("pulse")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn new(path: PathBuf) -> Self {
        Self(path)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}
