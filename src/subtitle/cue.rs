//! Transcript data model and the transcript → cue segmentation.

use serde::{Deserialize, Serialize};
use std::ops::ControlFlow;

/// A single recognized word with its timing in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct WordTiming {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl WordTiming {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }
}

/// One recognizer segment, usually a single utterance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Segment {
    pub words: Vec<WordTiming>,
}

impl Segment {
    pub fn new(words: Vec<WordTiming>) -> Self {
        Self { words }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Transcript {
    pub segments: Vec<Segment>,
}

impl Transcript {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn word_count(&self) -> usize {
        self.segments.iter().map(|s| s.words.len()).sum()
    }
}

/// One timed subtitle entry. `index` is 1-based across the whole output.
#[derive(Debug, Clone, PartialEq)]
pub struct Cue {
    pub index: usize,
    pub start: f64,
    pub end: f64,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CueMode {
    /// One cue per recognized word
    #[value(name = "word")]
    #[serde(alias = "word")]
    WordByWord,
    /// Up to `max_words` words per cue, never crossing a segment boundary
    #[default]
    Phrase,
}

/// Minimum durations applied when a cue would otherwise end at or before its start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepairPolicy {
    pub word_min_duration: f64,
    pub phrase_min_duration: f64,
}

impl RepairPolicy {
    pub const DEFAULT_WORD_MIN_DURATION: f64 = 0.100;
    pub const DEFAULT_PHRASE_MIN_DURATION: f64 = 0.500;
}

impl Default for RepairPolicy {
    fn default() -> Self {
        Self {
            word_min_duration: Self::DEFAULT_WORD_MIN_DURATION,
            phrase_min_duration: Self::DEFAULT_PHRASE_MIN_DURATION,
        }
    }
}

fn repaired_end(start: f64, end: f64, min_duration: f64) -> f64 {
    // `!(a > b)` also catches NaN
    if !(end > start) {
        start + min_duration
    } else {
        end
    }
}

/// Turns segments into cues while keeping one index counter for the whole run.
///
/// Timing anomalies are repaired locally; building never fails.
#[derive(Debug, Clone)]
pub struct CueBuilder {
    mode: CueMode,
    max_words: usize,
    repair: RepairPolicy,
    next_index: usize,
}

impl CueBuilder {
    pub fn new(mode: CueMode, max_words: usize) -> Self {
        Self {
            mode,
            max_words: max_words.max(1),
            repair: RepairPolicy::default(),
            next_index: 1,
        }
    }

    pub fn with_repair(mut self, repair: RepairPolicy) -> Self {
        self.repair = repair;
        self
    }

    /// Build the cues of one segment, passing each to `emit` as soon as it is
    /// complete. Stops early when `emit` breaks; the index of a cue that was
    /// refused is not reused.
    pub fn push_segment<F>(&mut self, segment: &Segment, mut emit: F) -> ControlFlow<()>
    where
        F: FnMut(Cue) -> ControlFlow<()>,
    {
        let words = &segment.words;
        if words.is_empty() {
            return ControlFlow::Continue(());
        }

        match self.mode {
            CueMode::WordByWord => {
                for word in words {
                    let end = repaired_end(word.start, word.end, self.repair.word_min_duration);
                    let cue = self.next_cue(word.start, end, word.text.trim().to_string());
                    if emit(cue).is_break() {
                        return ControlFlow::Break(());
                    }
                }
            }
            CueMode::Phrase => {
                let mut phrase: Vec<&str> = Vec::with_capacity(self.max_words);
                let mut phrase_start = words[0].start;

                for (idx, word) in words.iter().enumerate() {
                    phrase.push(word.text.trim());
                    let is_last = idx + 1 == words.len();

                    if phrase.len() >= self.max_words || is_last {
                        let end =
                            repaired_end(phrase_start, word.end, self.repair.phrase_min_duration);
                        let text = join_words(&phrase);
                        let cue = self.next_cue(phrase_start, end, text);
                        if emit(cue).is_break() {
                            return ControlFlow::Break(());
                        }

                        phrase.clear();
                        if let Some(next) = words.get(idx + 1) {
                            phrase_start = next.start;
                        }
                    }
                }
            }
        }

        ControlFlow::Continue(())
    }

    /// Build every cue of `transcript` in order. Runs stream segments through
    /// [`CueBuilder::push_segment`] instead.
    #[cfg(test)]
    pub fn build(mut self, transcript: &Transcript) -> Vec<Cue> {
        let mut cues = Vec::new();
        for segment in &transcript.segments {
            let _ = self.push_segment(segment, |cue| {
                cues.push(cue);
                ControlFlow::Continue(())
            });
        }
        cues
    }

    fn next_cue(&mut self, start: f64, end: f64, text: String) -> Cue {
        let cue = Cue {
            index: self.next_index,
            start,
            end,
            text,
        };
        self.next_index += 1;
        cue
    }
}

fn join_words(words: &[&str]) -> String {
    words
        .iter()
        .copied()
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Convenience wrapper around [`CueBuilder`] with the default repair policy.
#[cfg(test)]
pub fn build_cues(transcript: &Transcript, mode: CueMode, max_words: usize) -> Vec<Cue> {
    CueBuilder::new(mode, max_words).build(transcript)
}
