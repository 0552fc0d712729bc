use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "keepsake")]
#[command(author, version, about = "Media library for landing pages and invitations")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create or migrate the database
    Init,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Create a user
    CreateUser {
        /// Display name
        #[arg(required = true)]
        name: String,
    },

    /// List users
    Users,

    /// Upload an image for a user
    Upload {
        /// Owning user ID
        user_id: i64,

        /// Image file to upload
        #[arg(required = true)]
        file: PathBuf,

        /// Store under the theme backgrounds namespace
        #[arg(long)]
        theme: bool,
    },

    /// List the themes available to a user
    Themes {
        /// User ID
        user_id: i64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Display version information
    Version,
}
