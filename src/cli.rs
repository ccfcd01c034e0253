use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "merchbot")]
#[command(author, version, about = "Telegram merch shop bot for a cycling club", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the bot with long polling (default)
    Run,

    /// Apply database migrations and exit
    Migrate {
        /// Database file, defaults to DATABASE_PATH
        #[arg(long)]
        database: Option<String>,
    },

    /// Print the configuration report and exit with an error if something required is missing
    CheckConfig,

    /// Fill an empty database with a demo catalog and promo code
    SeedDemo {
        /// Database file, defaults to DATABASE_PATH
        #[arg(long)]
        database: Option<String>,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
