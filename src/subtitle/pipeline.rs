//! The run controller: recognition, cue writing and optional rendering on a
//! single worker, reported to the foreground as ordered events.

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use super::cancel::CancelToken;
use super::config::SubtitleConfig;
use super::cue::{CueBuilder, CueMode};
use super::error::PipelineError;
use super::render::{Platform, RenderJob, RenderProcess, render_args};
use super::transcribe::Recognizer;
use super::writer::{ProgressRange, WriteOutcome, write_srt};
use crate::ui::prelude::{Level, emit};

pub const MODEL_LOADED_PROGRESS: u8 = 5;
pub const TRANSCRIBED_PROGRESS: u8 = 10;
pub const WRITE_RANGE: ProgressRange = ProgressRange::new(50, 90);
pub const RENDERING_PROGRESS: u8 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    LoadingModel,
    Transcribing,
    BuildingCues,
    Rendering,
    Cancelling,
    Succeeded,
    Failed,
    Cancelled,
}

impl PipelineState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PipelineState::Succeeded | PipelineState::Failed | PipelineState::Cancelled
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::LoadingModel => "loading-model",
            PipelineState::Transcribing => "transcribing",
            PipelineState::BuildingCues => "building-cues",
            PipelineState::Rendering => "rendering",
            PipelineState::Cancelling => "cancelling",
            PipelineState::Succeeded => "succeeded",
            PipelineState::Failed => "failed",
            PipelineState::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Succeeded { message: String },
    Cancelled { message: String },
    Failed { message: String },
}

impl Completion {
    pub fn message(&self) -> &str {
        match self {
            Completion::Succeeded { message }
            | Completion::Cancelled { message }
            | Completion::Failed { message } => message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    Progress(u8),
    Status {
        state: PipelineState,
        message: String,
    },
    Finished(Completion),
}

#[derive(Debug, Clone)]
pub struct PipelineRequest {
    pub media: PathBuf,
    pub subtitle_path: PathBuf,
    pub model: String,
    pub mode: CueMode,
    pub max_words: usize,
    /// Set when the caller wants a rendered video as well
    pub render_to: Option<PathBuf>,
}

/// Receives the ordered event stream of a run.
pub trait EventSink: Send {
    fn emit(&self, event: PipelineEvent);
}

impl EventSink for UnboundedSender<PipelineEvent> {
    fn emit(&self, event: PipelineEvent) {
        // A dropped receiver only means nobody is watching anymore
        let _ = self.send(event);
    }
}

/// How a run that did not fail came to an end.
enum Ending {
    Done(String),
    Cancelled,
}

/// Drives one run through its states. Not shared between runs.
pub struct PipelineController {
    config: SubtitleConfig,
    recognizer: Box<dyn Recognizer>,
    events: Box<dyn EventSink>,
    cancel: CancelToken,
    platform: Platform,
    state: PipelineState,
    cancelled_in: Option<PipelineState>,
    progress: u8,
}

impl PipelineController {
    pub fn new(
        config: SubtitleConfig,
        recognizer: Box<dyn Recognizer>,
        events: Box<dyn EventSink>,
        cancel: CancelToken,
    ) -> Self {
        Self {
            config,
            recognizer,
            events,
            cancel,
            platform: Platform::current(),
            state: PipelineState::Idle,
            cancelled_in: None,
            progress: 0,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Start a run on a background worker thread.
    pub fn spawn(
        config: SubtitleConfig,
        recognizer: Box<dyn Recognizer>,
        request: PipelineRequest,
    ) -> RunHandle {
        let (tx, rx) = unbounded_channel();
        let cancel = CancelToken::new();
        let mut controller =
            PipelineController::new(config, recognizer, Box::new(tx), cancel.clone());

        let join = thread::spawn(move || controller.run(&request));

        RunHandle {
            events: rx,
            cancel,
            join,
        }
    }

    /// Execute the whole run on the current thread and report its completion.
    ///
    /// The same completion is also sent as the final event.
    pub fn run(&mut self, request: &PipelineRequest) -> Completion {
        emit(
            Level::Debug,
            "subtitle.pipeline.start",
            &format!("Starting run for {}", request.media.display()),
            None,
        );

        // A collaborator error after a cancel request ends the run as cancelled
        let outcome = match self.execute(request) {
            Err(err) if self.cancel.is_cancelled() => {
                emit(
                    Level::Debug,
                    "subtitle.pipeline.cancel_error",
                    &format!("Ignoring error after cancel request: {err}"),
                    None,
                );
                Ok(Ending::Cancelled)
            }
            outcome => outcome,
        };

        let completion = match outcome {
            Ok(Ending::Done(message)) => {
                self.report_progress(100);
                self.transition(PipelineState::Succeeded, "Done");
                Completion::Succeeded { message }
            }
            Ok(Ending::Cancelled) => {
                if self.state != PipelineState::Cancelling {
                    self.begin_cancel();
                }
                self.transition(PipelineState::Cancelled, "Cancelled by user");
                Completion::Cancelled {
                    message: format!("Cancelled while {}", self.interrupted_activity()),
                }
            }
            Err(err) => {
                let message = err.to_string();
                self.transition(PipelineState::Failed, message.clone());
                Completion::Failed { message }
            }
        };

        debug_assert!(self.state.is_terminal());
        self.events.emit(PipelineEvent::Finished(completion.clone()));
        completion
    }

    fn execute(&mut self, request: &PipelineRequest) -> Result<Ending, PipelineError> {
        self.transition(
            PipelineState::LoadingModel,
            format!("Loading recognition model '{}'...", request.model),
        );
        self.recognizer.load_model(&request.model)?;
        self.report_progress(MODEL_LOADED_PROGRESS);
        if self.cancel.is_cancelled() {
            return Ok(Ending::Cancelled);
        }

        self.transition(PipelineState::Transcribing, "Transcribing audio...");
        let transcript = self.recognizer.transcribe(&request.media)?;
        self.report_progress(TRANSCRIBED_PROGRESS);
        if self.cancel.is_cancelled() {
            return Ok(Ending::Cancelled);
        }

        self.transition(
            PipelineState::BuildingCues,
            format!(
                "Processing {} segments ({} words)...",
                transcript.segments.len(),
                transcript.word_count()
            ),
        );
        let subtitle_path = request.subtitle_path.as_path();
        let file =
            File::create(subtitle_path).map_err(|err| PipelineError::io(subtitle_path, err))?;
        let mut out = BufWriter::new(file);

        if transcript.is_empty() {
            out.flush()
                .map_err(|err| PipelineError::io(subtitle_path, err))?;
            return Ok(Ending::Done(format!(
                "No speech detected. Wrote empty subtitle file {}",
                display_name(subtitle_path)
            )));
        }

        let mut builder = CueBuilder::new(request.mode, request.max_words)
            .with_repair(self.config.repair_policy());
        let cancel = self.cancel.clone();
        let outcome = write_srt(
            &mut out,
            &transcript,
            &mut builder,
            &cancel,
            WRITE_RANGE,
            |p| self.report_progress(p),
        )
        .map_err(|err| PipelineError::io(subtitle_path, err))?;
        drop(out);

        let cues = match outcome {
            WriteOutcome::Completed { cues } => cues,
            WriteOutcome::Cancelled { .. } => return Ok(Ending::Cancelled),
        };
        if self.cancel.is_cancelled() {
            return Ok(Ending::Cancelled);
        }

        let mut message = format!("Wrote {cues} cues to {}", display_name(subtitle_path));

        if let Some(destination) = &request.render_to {
            let job = RenderJob {
                source: request.media.clone(),
                subtitles: request.subtitle_path.clone(),
                destination: destination.clone(),
            };
            match self.render(&job)? {
                Ending::Done(video) => {
                    message.push('\n');
                    message.push_str(&video);
                }
                Ending::Cancelled => return Ok(Ending::Cancelled),
            }
        }

        Ok(Ending::Done(message))
    }

    fn render(&mut self, job: &RenderJob) -> Result<Ending, PipelineError> {
        self.transition(
            PipelineState::Rendering,
            format!("Rendering video with {}...", self.config.renderer_program),
        );
        self.report_progress(RENDERING_PROGRESS);

        let program = self.config.renderer_program.clone();
        let args = render_args(job, self.platform);
        emit(
            Level::Debug,
            "subtitle.render.spawn",
            &format!("{} {}", program, args.join(" ")),
            None,
        );

        let mut process = RenderProcess::spawn(&program, &args, self.config.diagnostic_cap)
            .map_err(|source| PipelineError::RenderSpawn {
                program: program.clone(),
                source,
            })?;

        let status = loop {
            if self.cancel.is_cancelled() {
                self.begin_cancel();
                if let Err(err) =
                    process.terminate(self.config.cancel_grace(), self.config.poll_interval())
                {
                    emit(
                        Level::Warn,
                        "subtitle.render.terminate_failed",
                        &format!("Failed to stop renderer (pid {}): {err}", process.id()),
                        None,
                    );
                }
                return Ok(Ending::Cancelled);
            }

            match process.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => thread::sleep(self.config.poll_interval()),
                Err(source) => return Err(PipelineError::RenderWait { program, source }),
            }
        };

        if !status.success() {
            return Err(PipelineError::Render {
                code: status.code(),
                diagnostics: process.diagnostics(),
            });
        }

        Ok(Ending::Done(format!("Video: {}", display_name(&job.destination))))
    }

    fn begin_cancel(&mut self) {
        self.cancelled_in = Some(self.state);
        self.transition(PipelineState::Cancelling, "Cancelling...");
    }

    fn interrupted_activity(&self) -> &'static str {
        match self.cancelled_in {
            Some(PipelineState::LoadingModel) => "loading the model",
            Some(PipelineState::Transcribing) => "transcribing",
            Some(PipelineState::Rendering) => "rendering",
            _ => "writing subtitles",
        }
    }

    fn transition(&mut self, state: PipelineState, message: impl Into<String>) {
        self.state = state;
        let message = message.into();
        emit(
            Level::Debug,
            "subtitle.pipeline.state",
            &format!("[{state}] {message}"),
            None,
        );
        self.events.emit(PipelineEvent::Status { state, message });
    }

    /// Progress never moves backwards.
    fn report_progress(&mut self, value: u8) {
        let value = value.min(100).max(self.progress);
        self.progress = value;
        self.events.emit(PipelineEvent::Progress(value));
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Foreground side of a spawned run.
pub struct RunHandle {
    pub events: UnboundedReceiver<PipelineEvent>,
    pub cancel: CancelToken,
    pub join: JoinHandle<Completion>,
}
