//! SRT serialization of the cue stream.

use std::io::{self, Write};
use std::ops::ControlFlow;

use super::cancel::CancelToken;
use super::cue::{Cue, CueBuilder, Transcript};
use super::timestamp::format_timestamp;

/// Sub-range of the overall percentage reserved for writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressRange {
    pub start: u8,
    pub end: u8,
}

impl ProgressRange {
    /// Both ends are capped at 100 and `end` never lies before `start`.
    pub const fn new(start: u8, end: u8) -> Self {
        let start = if start > 100 { 100 } else { start };
        let end = if end > 100 {
            100
        } else if end < start {
            start
        } else {
            end
        };
        Self { start, end }
    }

    /// Percentage after `done` of `total` segments.
    pub fn at(&self, done: usize, total: usize) -> u8 {
        if total == 0 {
            return self.end;
        }
        let span = (self.end - self.start) as usize;
        let done = done.min(total);
        self.start + (span * done / total) as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Completed { cues: usize },
    Cancelled { cues: usize },
}

/// Write a single cue block: index, timing line, text, blank line.
pub fn write_cue<W: Write>(out: &mut W, cue: &Cue) -> io::Result<()> {
    write!(
        out,
        "{}\n{} --> {}\n{}\n\n",
        cue.index,
        format_timestamp(cue.start),
        format_timestamp(cue.end),
        cue.text
    )
}

/// Stream the cues of `transcript` into `out`.
///
/// `on_progress` fires once per source segment with a value inside `range`.
/// The cancel token is checked before every segment and before every cue;
/// when it is set, whatever was written so far stays in `out`.
pub fn write_srt<W, F>(
    out: &mut W,
    transcript: &Transcript,
    builder: &mut CueBuilder,
    cancel: &CancelToken,
    range: ProgressRange,
    mut on_progress: F,
) -> io::Result<WriteOutcome>
where
    W: Write,
    F: FnMut(u8),
{
    let total = transcript.segments.len();
    let mut written = 0usize;

    for (i, segment) in transcript.segments.iter().enumerate() {
        if cancel.is_cancelled() {
            out.flush()?;
            return Ok(WriteOutcome::Cancelled { cues: written });
        }

        let mut failure: Option<io::Error> = None;
        let flow = builder.push_segment(segment, |cue| {
            if cancel.is_cancelled() {
                return ControlFlow::Break(());
            }
            match write_cue(out, &cue) {
                Ok(()) => {
                    written += 1;
                    ControlFlow::Continue(())
                }
                Err(err) => {
                    failure = Some(err);
                    ControlFlow::Break(())
                }
            }
        });

        if let Some(err) = failure {
            return Err(err);
        }
        if flow.is_break() {
            out.flush()?;
            return Ok(WriteOutcome::Cancelled { cues: written });
        }

        out.flush()?;
        on_progress(range.at(i + 1, total));
    }

    out.flush()?;
    Ok(WriteOutcome::Completed { cues: written })
}
