use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about = "penta tournament engine")]
pub struct Cli {
    /// Command
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
#[clap(rename_all = "lower_case")]
pub enum Command {
    /// Start the HTTP server and the daily maintenance schedule
    Serve {
        /// Port number (optional, defaults to 3000)
        #[arg(short, long, default_value_t = 3000)]
        port: u16,
    },
    /// Create the database schema
    Setup,
    /// Run maintenance once and print the report
    Maintain,
}
