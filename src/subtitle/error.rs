use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Recognition failed: {0}")]
    Recognition(String),

    #[error("Failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to start renderer {program}: {source}")]
    RenderSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Lost track of renderer {program}: {source}")]
    RenderWait {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The renderer ran and exited unsuccessfully. `code` is `None` when it
    /// was ended by a signal.
    #[error("{}", render_message(.code, .diagnostics))]
    Render {
        code: Option<i32>,
        diagnostics: String,
    },
}

impl PipelineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn recognition(cause: impl std::fmt::Display) -> Self {
        PipelineError::Recognition(cause.to_string())
    }
}

fn render_message(code: &Option<i32>, diagnostics: &str) -> String {
    let status = match code {
        Some(code) => format!("Renderer exited with status {code}"),
        None => "Renderer was terminated by a signal".to_string(),
    };
    if diagnostics.is_empty() {
        status
    } else {
        format!("{status}: {diagnostics}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_error_includes_exit_code_and_diagnostics() {
        let err = PipelineError::Render {
            code: Some(1),
            diagnostics: "No such filter: 'subtitles'".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Renderer exited with status 1: No such filter: 'subtitles'"
        );
    }

    #[test]
    fn render_error_without_diagnostics() {
        let err = PipelineError::Render {
            code: None,
            diagnostics: String::new(),
        };
        assert_eq!(err.to_string(), "Renderer was terminated by a signal");
    }

    #[test]
    fn spawn_failure_names_program_not_a_signal() {
        let err = PipelineError::RenderSpawn {
            program: "ffmpeg".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert_eq!(err.to_string(), "Failed to start renderer ffmpeg: not found");
    }
}
