use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "roster", version, about = "Manage user records by typing plain sentences")]
pub struct Cli {
    /// JSON file holding the user records
    #[arg(long, global = true, env = "ROSTER_DATA", default_value = "users.json")]
    pub data: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Interactive chat (the default). /history, /clear and /quit are understood.
    Chat,
    /// Run a single command and print the reply
    Run {
        #[arg(required = true, trailing_var_arg = true)]
        text: Vec<String>,
    },
    /// Print users as a table
    List {
        /// Only show users whose name, email, phone or city contains this text
        #[arg(long, short)]
        search: Option<String>,
        /// Write the (filtered) users as CSV to this file, or "-" for stdout
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Show the language model's raw analysis of a command without running it
    Ask {
        #[arg(required = true, trailing_var_arg = true)]
        text: Vec<String>,
    },
    /// Show or change the AI provider settings
    Settings {
        #[arg(long)]
        provider: Option<String>,
        #[arg(long)]
        model: Option<String>,
        /// An empty value keeps the stored key
        #[arg(long)]
        api_key: Option<String>,
    },
}
