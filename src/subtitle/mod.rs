pub mod cancel;
pub mod cli;
pub mod commands;
pub mod config;
pub mod cue;
pub mod error;
pub mod pipeline;
pub mod render;
pub mod timestamp;
pub mod transcribe;
mod utils;
pub mod writer;

pub use cli::{ConfigCommands, GenerateArgs};
pub use commands::{handle_config_command, handle_generate};
