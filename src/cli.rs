use clap::{Parser, Subcommand};

/// Real-estate listings API
#[derive(Parser)]
#[command(name = "listings-api", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server (runs pending migrations first)
    Serve {
        /// Port to bind; overrides LISTINGS_PORT
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Apply pending database migrations and exit
    Migrate,

    /// Print the SHA-256 hash of a client secret for the clients file
    HashSecret {
        secret: String,
    },
}
