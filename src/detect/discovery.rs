use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{unbounded, Receiver, Sender};
use rayon::prelude::*;

use crate::audio::decode::decode_audio;
use crate::dsp::signal::FloatSignal;

use super::pair::get_intro_from_pair;
use super::similarity::{best_patch_position, how_close_are_signals, signal_slice};
use super::{
    FileSignal, FindSoundResult, IntroInfo, ACCEPTANCE_THRESHOLD, BAD_STREAK_LIMIT,
    MIN_INTRO_SECS, SAMPLE_RATE, SOURCE_END,
};

/// Discovery facade: load a set of files, then search them for a shared
/// intro on a worker thread, emitting one [`FindSoundResult`] per evaluated
/// file over a channel.
pub struct FindSound {
    files: Vec<FileSignal>,
    cancel: Arc<AtomicBool>,
}

impl FindSound {
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Decodes the given paths in parallel and appends them to the file
    /// list. A file that fails to decode is kept as an ineligible entry.
    pub fn add_files(&mut self, paths: &[PathBuf]) {
        let mut loaded: Vec<FileSignal> = paths
            .par_iter()
            .map(|path| {
                let signal = match decode_audio(path, SAMPLE_RATE, SOURCE_END as f32) {
                    Ok(samples) => {
                        let signal = FloatSignal::from(samples);
                        if signal.is_empty() {
                            log::warn!("No audio decoded from {}", path.display());
                            None
                        } else {
                            Some(signal)
                        }
                    }
                    Err(err) => {
                        log::warn!("Failed to decode {}: {:#}", path.display(), err);
                        None
                    }
                };
                FileSignal {
                    signal,
                    file: path.clone(),
                }
            })
            .collect();
        self.files.append(&mut loaded);
    }

    /// Adds already-decoded signals, bypassing the decode stage.
    #[allow(dead_code)]
    pub fn add_signals(&mut self, files: Vec<FileSignal>) {
        self.files.extend(files);
    }

    /// Token for cooperative cancellation; checked between files and
    /// between iterations of the discovery loop.
    #[allow(dead_code)]
    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    /// Starts discovery on a worker thread. Returns the expected number of
    /// progress emissions (one per file) and the result channel; the channel
    /// closes when discovery is done.
    pub fn run(self) -> (usize, Receiver<FindSoundResult>) {
        let expected = self.files.len();
        let (tx, rx) = unbounded();
        let files = self.files;
        let cancel = self.cancel;
        thread::spawn(move || discover(files, &tx, &cancel));
        (expected, rx)
    }
}

impl Default for FindSound {
    fn default() -> Self {
        Self::new()
    }
}

fn discover(files: Vec<FileSignal>, tx: &Sender<FindSoundResult>, cancel: &Arc<AtomicBool>) {
    let mut best_matches: HashMap<PathBuf, f32> = HashMap::new();
    let mut rest: Vec<usize> = (0..files.len()).collect();
    let mut last_best_intro_idx = 0usize;

    while rest.len() > 1 {
        if cancel.load(Ordering::Relaxed) {
            return;
        }

        let Some((seed_pos, mut intro_info)) =
            next_best_intro(&files, &rest, last_best_intro_idx)
        else {
            break;
        };
        last_best_intro_idx = seed_pos;
        let seed_file = files[rest[seed_pos]].file.clone();
        let intro = intro_info
            .intro
            .take()
            .expect("next_best_intro attaches the seed intro");
        let intro_secs = intro_info.end_time - intro_info.start_time;
        log::info!(
            "Testing intro from {} ({:.0}s-{:.0}s, {:.0}% pair match) against all files",
            seed_file.display(),
            intro_info.start_time,
            intro_info.end_time,
            intro_info.match_percent * 100.0
        );

        let mut bad_streak = 0u32;
        rest.clear();

        for (i, file_signal) in files.iter().enumerate() {
            if cancel.load(Ordering::Relaxed) {
                return;
            }
            let Some(signal) = &file_signal.signal else {
                // undecodable, but still unmatched; keep it for the final
                // progress sweep
                rest.push(i);
                continue;
            };

            let best_value = best_matches
                .get(&file_signal.file)
                .copied()
                .unwrap_or(0.0);
            if best_value >= 0.9 {
                continue;
            }

            let find = best_patch_position(signal, &intro);
            let start_time = find.timestamp;
            let end_time = start_time + intro_secs;
            let other_intro = signal_slice(signal, start_time, end_time);
            let how_close = how_close_are_signals(&other_intro, &intro);

            let mut is_better = false;
            let mut is_progress = false;

            if best_value < how_close.value {
                is_better = true;
                best_matches.insert(file_signal.file.clone(), how_close.value);
            }

            if best_value < ACCEPTANCE_THRESHOLD && how_close.value >= ACCEPTANCE_THRESHOLD {
                // the file just graduated
                is_progress = true;
            } else if how_close.value < ACCEPTANCE_THRESHOLD && best_value < ACCEPTANCE_THRESHOLD
            {
                rest.push(i);
            }

            let result = FindSoundResult {
                file: file_signal.file.clone(),
                index: i,
                intro_info: IntroInfo {
                    start_time,
                    end_time,
                    match_percent: how_close.value,
                    intro: None,
                    other_start_time: 0.0,
                    other_end_time: 0.0,
                },
                is_progress,
                is_better,
                is_source_of_intro: file_signal.file == seed_file,
            };
            if tx.send(result).is_err() {
                return;
            }

            if how_close.value < 0.2 && best_value == 0.0 {
                bad_streak += 1;
            } else {
                bad_streak = 0;
            }

            if bad_streak >= BAD_STREAK_LIMIT {
                log::info!(
                    "Abandoning intro from {} after {} weak files",
                    seed_file.display(),
                    bad_streak
                );
                rest = files
                    .iter()
                    .enumerate()
                    .filter(|(_, f)| {
                        best_matches.get(&f.file).copied().unwrap_or(0.0) < ACCEPTANCE_THRESHOLD
                    })
                    .map(|(j, _)| j)
                    .collect();
                break;
            }
        }

        drop(intro);
    }

    // files that never crossed the threshold still complete the progress
    // contract
    for &i in &rest {
        let result = FindSoundResult {
            file: files[i].file.clone(),
            index: i,
            intro_info: IntroInfo::default(),
            is_progress: true,
            is_better: false,
            is_source_of_intro: false,
        };
        if tx.send(result).is_err() {
            return;
        }
    }
}

/// Scans adjacent pairs of `rest`, starting at `start`, for the first pair
/// whose extracted intro clears the acceptance threshold, is long enough,
/// and does not run into the end of the search window. Returns the seed's
/// position in `rest` with the intro slice attached.
fn next_best_intro(
    files: &[FileSignal],
    rest: &[usize],
    start: usize,
) -> Option<(usize, IntroInfo)> {
    for i in start..rest.len().saturating_sub(1) {
        let (Some(one), Some(two)) = (
            &files[rest[i]].signal,
            &files[rest[i + 1]].signal,
        ) else {
            continue;
        };

        let mut info = get_intro_from_pair(one, two);

        let end_limit = (SOURCE_END as f32) - MIN_INTRO_SECS;
        let too_close_to_end =
            info.end_time >= end_limit || info.other_end_time >= end_limit;
        let too_short = info.end_time - info.start_time <= MIN_INTRO_SECS;

        if info.match_percent >= ACCEPTANCE_THRESHOLD && !too_close_to_end && !too_short {
            info.intro = Some(signal_slice(one, info.start_time, info.end_time));
            return Some((i, info));
        }
    }

    None
}
