//! Burning subtitles into a video with an external renderer (ffmpeg).

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Unix,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenderJob {
    pub source: PathBuf,
    pub subtitles: PathBuf,
    pub destination: PathBuf,
}

/// Path as it has to appear inside the `subtitles='...'` filter argument.
pub fn subtitle_filter_path(path: &Path, platform: Platform) -> String {
    let mut escaped = path
        .to_string_lossy()
        .replace('\\', "/")
        .replace('\'', "'\\''");
    if platform == Platform::Windows {
        escaped = escaped.replace(':', "\\:");
    }
    escaped
}

/// The fixed renderer argument list for `job`.
pub fn render_args(job: &RenderJob, platform: Platform) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-i".to_string(),
        job.source.to_string_lossy().into_owned(),
        "-vf".to_string(),
        format!(
            "subtitles='{}'",
            subtitle_filter_path(&job.subtitles, platform)
        ),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-preset".to_string(),
        "fast".to_string(),
        "-crf".to_string(),
        "23".to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
        "-b:a".to_string(),
        "192k".to_string(),
        job.destination.to_string_lossy().into_owned(),
    ]
}

/// Keeps only the last `cap` characters of everything pushed into it.
#[derive(Debug, Clone)]
pub struct DiagnosticBuffer {
    cap: usize,
    text: String,
    /// Start of a UTF-8 sequence cut off at the end of the last read
    partial: Vec<u8>,
}

impl DiagnosticBuffer {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            text: String::new(),
            partial: Vec::new(),
        }
    }

    /// Append raw stream bytes. A multi-byte character split across two
    /// reads is held back until the rest of it arrives.
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        let mut pending = std::mem::take(&mut self.partial);
        pending.extend_from_slice(bytes);

        let mut rest = pending.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    self.push(text);
                    rest = &[];
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    self.push(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        Some(len) => {
                            self.push("\u{FFFD}");
                            rest = &after[len..];
                        }
                        None => {
                            rest = after;
                            break;
                        }
                    }
                }
            }
        }
        self.partial = rest.to_vec();
    }

    pub fn push(&mut self, chunk: &str) {
        self.text.push_str(chunk);
        // Trim lazily so long streams are not re-copied on every chunk
        if self.text.len() > self.cap.saturating_mul(8).max(4096) {
            self.truncate_to_cap();
        }
    }

    fn truncate_to_cap(&mut self) {
        let count = self.text.chars().count();
        if count > self.cap {
            let skip = count - self.cap;
            let offset = self
                .text
                .char_indices()
                .nth(skip)
                .map(|(i, _)| i)
                .unwrap_or(self.text.len());
            self.text.drain(..offset);
        }
    }

    pub fn into_string(mut self) -> String {
        if !self.partial.is_empty() {
            let tail = std::mem::take(&mut self.partial);
            self.push(&String::from_utf8_lossy(&tail));
        }
        self.truncate_to_cap();
        self.text
    }
}

/// A running renderer child whose stderr is drained in the background.
pub struct RenderProcess {
    child: Child,
    stderr_reader: Option<JoinHandle<DiagnosticBuffer>>,
}

impl RenderProcess {
    pub fn spawn(program: &str, args: &[String], diagnostic_cap: usize) -> io::Result<Self> {
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        // Own process group: a terminal Ctrl-C reaches only us, and we decide
        // how the renderer stops
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }
        let mut child = command.spawn()?;

        let stderr_reader = child.stderr.take().map(|stderr| {
            thread::spawn(move || {
                let mut buffer = DiagnosticBuffer::new(diagnostic_cap);
                drain_stderr(stderr, &mut buffer);
                buffer
            })
        });

        Ok(Self {
            child,
            stderr_reader,
        })
    }

    pub fn id(&self) -> u32 {
        self.child.id()
    }

    pub fn try_wait(&mut self) -> io::Result<Option<ExitStatus>> {
        self.child.try_wait()
    }

    /// Ask the child to stop, then kill it if it is still alive after `grace`.
    pub fn terminate(&mut self, grace: Duration, poll: Duration) -> io::Result<ExitStatus> {
        if let Some(status) = self.child.try_wait()? {
            return Ok(status);
        }

        send_terminate(&mut self.child)?;

        let deadline = Instant::now() + grace;
        while Instant::now() < deadline {
            if let Some(status) = self.child.try_wait()? {
                return Ok(status);
            }
            thread::sleep(poll.min(deadline.saturating_duration_since(Instant::now())));
        }

        // kill() errors if the child exited in the meantime; wait() reports either way
        let _ = self.child.kill();
        self.child.wait()
    }

    /// Collected stderr, trimmed to the configured cap.
    pub fn diagnostics(mut self) -> String {
        self.stderr_reader
            .take()
            .and_then(|handle| handle.join().ok())
            .map(|buffer| buffer.into_string().trim().to_string())
            .unwrap_or_default()
    }
}

fn drain_stderr<R: Read>(mut stderr: R, buffer: &mut DiagnosticBuffer) {
    let mut chunk = [0u8; 4096];
    loop {
        match stderr.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => buffer.push_bytes(&chunk[..n]),
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(_) => break,
        }
    }
}

#[cfg(unix)]
fn send_terminate(child: &mut Child) -> io::Result<()> {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    kill(Pid::from_raw(child.id() as i32), Signal::SIGTERM).map_err(io::Error::from)
}

#[cfg(not(unix))]
fn send_terminate(child: &mut Child) -> io::Result<()> {
    child.kill()
}
