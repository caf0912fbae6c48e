mod cli;
mod handlers;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use handlers::{env, list, run};

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { name, quickfix, editor } => run::handle_run(&name, &editor, quickfix),
        Commands::List { editor } => list::handle_list(&editor),
        Commands::Env { editor } => env::handle_env(&editor),
    }
}
