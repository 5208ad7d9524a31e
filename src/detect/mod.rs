pub mod discovery;
pub mod pair;
pub mod scan;
pub mod similarity;
#[cfg(test)]
pub(crate) mod testutil;

use std::path::PathBuf;

use crate::dsp::signal::FloatSignal;

/// Analysis sample rate in Hz. All decoded audio is resampled to this before
/// any correlation runs; timestamps downstream are in these units.
pub const SAMPLE_RATE: u32 = 1024;

/// Start of the search window in seconds.
pub const SOURCE_START: usize = 0;

/// Only the first 10 minutes of each track are searched.
pub const SOURCE_END: usize = 600;

/// Match score at or above which a file is considered to contain the intro.
pub const ACCEPTANCE_THRESHOLD: f32 = 0.8;

/// Candidate intros shorter than this are rejected.
pub const MIN_INTRO_SECS: f32 = 20.0;

/// Consecutive weakly-matching files before a seed is abandoned.
pub const BAD_STREAK_LIMIT: u32 = 5;

/// Probe patch duration in seconds for the chunk scanner.
pub const PATCH_SECS: usize = 4;

/// Location and strength of the best patch alignment inside a source signal.
#[allow(dead_code)]
#[derive(Clone, Copy, Debug, Default)]
pub struct CorrelateResult {
    pub sample_index: u64,
    pub value: f32,
    pub timestamp: f32,
}

/// Contiguous region of matching patches found by the chunk scanner.
/// Times are seconds, patch bounds are patch-index units.
#[allow(dead_code)]
#[derive(Clone, Copy, Debug, Default)]
pub struct IntroChunk {
    pub start_time: f32,
    pub end_time: f32,
    pub patch_start: usize,
    pub patch_end: usize,
}

/// A scored intro candidate. `intro` carries the materialized seed slice
/// while a discovery round is using it and is dropped once per round.
#[derive(Clone, Debug, Default)]
pub struct IntroInfo {
    pub start_time: f32,
    pub end_time: f32,
    pub match_percent: f32,
    pub intro: Option<FloatSignal>,
    pub other_start_time: f32,
    pub other_end_time: f32,
}

/// Decoded audio for one input file. `signal` is `None` when decoding
/// failed; such entries pass through the pipeline as no-ops.
#[derive(Debug)]
pub struct FileSignal {
    pub signal: Option<FloatSignal>,
    pub file: PathBuf,
}

/// One per-file evaluation emitted by the discovery loop.
#[allow(dead_code)]
#[derive(Clone, Debug)]
pub struct FindSoundResult {
    pub file: PathBuf,
    pub index: usize,
    pub intro_info: IntroInfo,
    pub is_progress: bool,
    pub is_better: bool,
    pub is_source_of_intro: bool,
}
