use clap::{Parser, Subcommand};
use dirconf_core::ResourceAddress;
use std::path::PathBuf;

/// Declarative configuration management for directory servers
///
/// Connection, state store and engine settings come from `DIRCONF_*`
/// environment variables; the resources to manage come from a JSON file.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the changes needed to reach the desired configuration
    Plan {
        /// Desired configuration file
        file: PathBuf,
    },

    /// Plan, then apply the changes
    Apply {
        /// Desired configuration file
        file: PathBuf,
    },

    /// Re-read every managed object and record changes made outside dirconf
    Refresh,

    /// Start managing an existing object
    Import {
        /// Resource address, `<type>.<name>`
        address: ResourceAddress,

        /// Object name on the server
        id: String,
    },

    /// Delete every managed object (singletons are only forgotten)
    Destroy,

    /// Print the recorded state, sensitive values masked
    Show,
}

impl Command {
    /// Name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Command::Plan { .. } => "plan",
            Command::Apply { .. } => "apply",
            Command::Refresh => "refresh",
            Command::Import { .. } => "import",
            Command::Destroy => "destroy",
            Command::Show => "show",
        }
    }
}
