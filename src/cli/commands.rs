use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tavola")]
#[command(author, version, about = "Dining assistant with a tiered semantic cache", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Send a single message through the orchestrator
    Chat {
        message: String,

        /// Session id (default: "default")
        #[arg(long, default_value = "default")]
        session_id: String,

        /// Chat id within the session
        #[arg(long, default_value = "main")]
        chat_id: String,

        /// Scope cache lookups and writes to this session
        #[arg(long)]
        smart_recall: bool,
    },

    /// Start an interactive conversation
    Interactive {
        /// Session id (default: "default")
        #[arg(long, default_value = "default")]
        session_id: String,

        /// Scope cache lookups and writes to this session
        #[arg(long)]
        smart_recall: bool,
    },

    /// Load restaurant seed data from a JSON file into the index
    Load {
        file: String,
    },

    /// List known session ids
    Sessions,
}
