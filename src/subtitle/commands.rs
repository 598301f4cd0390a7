use anyhow::{Context, Result, anyhow};
use indicatif::ProgressBar;
use serde_json::json;

use super::cli::{ConfigCommands, GenerateArgs};
use super::config::SubtitleConfig;
use super::pipeline::{Completion, PipelineController, PipelineEvent, PipelineRequest};
use super::transcribe::{JsonTranscriptRecognizer, Recognizer, WhisperCliRecognizer};
use super::utils::{
    canonicalize_existing, default_subtitle_path, default_video_path, resolve_output_path,
};
use crate::common::paths;
use crate::common::progress::{create_percent_bar, finish_bar_with_message};
use crate::ui::prelude::*;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_CANCELLED: i32 = 130;

/// Run one subtitle generation and return the process exit code.
///
/// Setup problems (missing media, refusing to overwrite) are returned as
/// errors; everything that happens inside the run is reported through its
/// completion.
pub async fn handle_generate(args: GenerateArgs) -> Result<i32> {
    let mut config = SubtitleConfig::load().context("Failed to load subtitle config")?;
    if let Some(model) = args.model {
        config.model = model;
    }
    if let Some(mode) = args.mode {
        config.mode = mode;
    }
    if let Some(max_words) = args.max_words {
        config.max_words = max_words.max(1);
    }

    let media = canonicalize_existing(&args.media)?;
    let subtitle_path = match &args.srt_out {
        Some(path) => resolve_output_path(path)?,
        None => default_subtitle_path(&media),
    };
    if subtitle_path == media {
        anyhow::bail!(
            "Subtitle file would overwrite the source {}",
            media.display()
        );
    }
    if subtitle_path.exists() && !args.force {
        anyhow::bail!(
            "Subtitle file {} already exists. Use --force to overwrite.",
            subtitle_path.display()
        );
    }

    let render_to = if args.render {
        let destination = match &args.video_out {
            Some(path) => resolve_output_path(path)?,
            None => default_video_path(&media),
        };
        if destination == media {
            anyhow::bail!(
                "Rendered video would overwrite the source {}",
                media.display()
            );
        }
        if destination == subtitle_path {
            anyhow::bail!(
                "Rendered video and subtitle file are both {}",
                destination.display()
            );
        }
        Some(destination)
    } else {
        None
    };

    let recognizer: Box<dyn Recognizer> = match args.transcript {
        Some(path) => Box::new(JsonTranscriptRecognizer::new(path)),
        None => Box::new(WhisperCliRecognizer::new(config.recognizer_program.clone())),
    };

    let request = PipelineRequest {
        media,
        subtitle_path: subtitle_path.clone(),
        model: config.model.clone(),
        mode: config.mode,
        max_words: config.max_words,
        render_to: render_to.clone(),
    };

    emit(
        Level::Debug,
        "subtitle.generate.request",
        &format!("{request:?}"),
        None,
    );

    let mut handle = PipelineController::spawn(config, recognizer, request);
    let bar = match get_output_format() {
        OutputFormat::Text => Some(create_percent_bar("Starting...")),
        OutputFormat::Json => None,
    };

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut cancel_requested = false;

    loop {
        tokio::select! {
            event = handle.events.recv() => match event {
                Some(event) => show_event(&event, bar.as_ref()),
                None => break,
            },
            signal = &mut ctrl_c, if !cancel_requested => {
                cancel_requested = true;
                if let Err(err) = signal {
                    emit(
                        Level::Warn,
                        "subtitle.generate.signal",
                        &format!("Failed to listen for Ctrl-C: {err}"),
                        None,
                    );
                    continue;
                }
                handle.cancel.cancel();
                if let Some(pb) = &bar {
                    pb.set_message("Cancelling...");
                }
            }
        }
    }

    // The event channel closes when the worker is done, so this does not block
    let completion = handle
        .join
        .join()
        .map_err(|_| anyhow!("Subtitle worker panicked"))?;

    let data = json!({
        "subtitles": subtitle_path.display().to_string(),
        "video": render_to.map(|p| p.display().to_string()),
    });

    let message = completion.message();
    let (level, code, exit_code) = match &completion {
        Completion::Succeeded { .. } => {
            (Level::Success, "subtitle.generate.succeeded", EXIT_SUCCESS)
        }
        Completion::Cancelled { .. } => {
            (Level::Warn, "subtitle.generate.cancelled", EXIT_CANCELLED)
        }
        Completion::Failed { .. } => (Level::Error, "subtitle.generate.failed", EXIT_FAILURE),
    };

    match bar {
        Some(pb) if exit_code == EXIT_SUCCESS => finish_bar_with_message(pb, message),
        bar => {
            if let Some(pb) = bar {
                pb.finish_and_clear();
            }
            emit(level, code, message, Some(data));
        }
    }

    Ok(exit_code)
}

fn show_event(event: &PipelineEvent, bar: Option<&ProgressBar>) {
    match (event, bar) {
        (PipelineEvent::Progress(value), Some(pb)) => pb.set_position(u64::from(*value)),
        (PipelineEvent::Status { message, .. }, Some(pb)) => pb.set_message(message.clone()),
        (PipelineEvent::Progress(value), None) => emit(
            Level::Debug,
            "subtitle.generate.progress",
            &format!("{value}%"),
            Some(json!({ "progress": value })),
        ),
        (PipelineEvent::Status { state, message }, None) => emit(
            Level::Info,
            "subtitle.generate.status",
            message,
            Some(json!({ "state": state.label() })),
        ),
        // The completion is reported once the worker has been joined
        (PipelineEvent::Finished(_), _) => {}
    }
}

pub fn handle_config_command(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            let config = SubtitleConfig::load().context("Failed to load subtitle config")?;
            match get_output_format() {
                OutputFormat::Json => {
                    let data = serde_json::to_value(&config)
                        .context("Failed to serialize subtitle config")?;
                    emit(Level::Info, "subtitle.config.show", "Subtitle config", Some(data));
                }
                OutputFormat::Text => print!("{}", config.to_toml()?),
            }
        }
        ConfigCommands::Path => {
            let path = paths::subtitle_config_path()?;
            emit(
                Level::Info,
                "subtitle.config.path",
                &path.display().to_string(),
                Some(json!({ "path": path.display().to_string() })),
            );
        }
    }
    Ok(())
}
