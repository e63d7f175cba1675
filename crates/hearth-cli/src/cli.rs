use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use hearth_core::Recurrence;

#[derive(Parser)]
#[command(name = "hearth")]
#[command(about = "Keep household members and chores in sync from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to the local store file
    #[arg(long, global = true, value_name = "PATH")]
    pub store_path: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage household members
    #[command(subcommand)]
    Member(MemberCommand),
    /// Manage chores
    #[command(subcommand)]
    Task(TaskCommand),
    /// Reconcile local data with the sync endpoint
    Sync {
        /// Only check that the endpoint answers
        #[arg(long)]
        test: bool,
    },
    /// Show sync status
    Status,
    /// Manage the sync endpoint
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Export members and tasks as a backup file
    Export {
        /// Output path; defaults to hearth-backup-<date>.json, `-` for stdout
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Replace local members and tasks with a backup file
    Import {
        /// Backup file to read
        path: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum MemberCommand {
    /// Add a member
    #[command(alias = "new")]
    Add {
        /// Member name
        name: Vec<String>,
        /// Chart color (hex); picked from the palette when omitted
        #[arg(long)]
        color: Option<String>,
    },
    /// List members
    List,
    /// Rename a member
    Rename {
        /// Member ID
        id: String,
        /// New name
        name: Vec<String>,
    },
    /// Delete a member and their tasks
    Delete {
        /// Member ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum TaskCommand {
    /// Add a task for a member
    #[command(alias = "new")]
    Add {
        /// Task name
        name: Vec<String>,
        /// Assigned member ID
        #[arg(short, long)]
        member: String,
        /// Due date (YYYY-MM-DD, default today)
        #[arg(short, long)]
        date: Option<String>,
        /// Due time (HH:MM)
        #[arg(short, long)]
        time: Option<String>,
        /// Repeat pattern used by quick-add
        #[arg(short, long, value_enum, default_value_t = RecurrenceArg::None)]
        recurrence: RecurrenceArg,
    },
    /// List tasks
    List {
        /// Only tasks assigned to this member ID
        #[arg(short, long)]
        member: Option<String>,
    },
    /// Delete a task
    Delete {
        /// Task ID
        id: String,
    },
    /// Copy a recurring task onto every matching date in a range
    QuickAdd {
        /// Template task ID
        id: String,
        /// Member IDs receiving the copies
        #[arg(short, long = "member", required = true)]
        members: Vec<String>,
        /// First date of the range (YYYY-MM-DD)
        #[arg(long)]
        from: String,
        /// Last date of the range (YYYY-MM-DD)
        #[arg(long)]
        to: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Set the sync endpoint URL
    SetUrl {
        /// http(s) endpoint
        url: String,
    },
    /// Remove the sync endpoint and disable sync
    ClearUrl,
    /// Show the sync configuration
    Show,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum RecurrenceArg {
    None,
    Daily,
    Weekly,
    Monthly,
}

impl From<RecurrenceArg> for Recurrence {
    fn from(value: RecurrenceArg) -> Self {
        match value {
            RecurrenceArg::None => Self::None,
            RecurrenceArg::Daily => Self::Daily,
            RecurrenceArg::Weekly => Self::Weekly,
            RecurrenceArg::Monthly => Self::Monthly,
        }
    }
}
