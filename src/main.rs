mod common;
mod subtitle;
mod ui;

use clap::{Parser, Subcommand};
use std::io::IsTerminal;

use crate::subtitle::commands::EXIT_FAILURE;
use crate::subtitle::{ConfigCommands, GenerateArgs};
use crate::ui::prelude::*;

/// easysub: word-timed subtitles from speech
#[derive(Parser, Debug)]
#[command(name = "easysub", author, version, about, long_about = None)]
struct Cli {
    /// Activate debug mode
    #[arg(short, long, global = true)]
    debug: bool,

    /// Output format for messages
    #[arg(long, value_enum, global = true, default_value = "text")]
    output: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Transcribe a media file into an SRT file, optionally rendering a subtitled video
    Generate(GenerateArgs),
    /// Inspect the subtitle configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    ui::set_debug_mode(cli.debug);
    ui::init(cli.output, !cli.no_color && std::io::stdout().is_terminal());

    let result = match cli.command {
        Commands::Generate(args) => subtitle::handle_generate(args).await,
        Commands::Config { command } => subtitle::handle_config_command(command).map(|()| 0),
    };

    let code = match result {
        Ok(code) => code,
        Err(err) => {
            emit(Level::Error, "easysub.error", &format!("{err:#}"), None);
            EXIT_FAILURE
        }
    };

    std::process::exit(code);
}
