use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP endpoint for editor actions and Crowdin webhooks
    Serve {
        /// Address to bind (overrides config)
        #[arg(short, long)]
        bind: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Encode a JSON document into translatable HTML
    Encode {
        /// Input document (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file, stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Decode translated HTML back into a JSON document
    Decode {
        /// Input markup (HTML)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file, stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write a default configuration file
    InitConfig {
        /// Where to write the configuration
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,
    },
}
