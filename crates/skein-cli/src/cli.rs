use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "skein",
    about = "Skein: a real-time collaborative issue tracker with a git audit trail",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the tracker server
    Serve {
        /// Address to bind; successive higher ports are tried if taken
        #[arg(long, default_value = "127.0.0.1:7077")]
        bind: String,

        /// Path to the snapshot document
        #[arg(long, default_value = ".skein/issues.json")]
        data: String,

        /// Directory from which the audit repository is discovered
        #[arg(long, default_value = ".")]
        repo: String,

        /// How many successive ports to try before giving up
        #[arg(long, default_value_t = skein_server::DEFAULT_PORT_ATTEMPTS)]
        port_attempts: u32,
    },

    /// Print the current snapshot
    Show {
        /// Path to the snapshot document
        #[arg(long, default_value = ".skein/issues.json")]
        data: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
