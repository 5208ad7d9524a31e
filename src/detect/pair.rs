use crate::dsp::signal::FloatSignal;

use super::scan::do_chunk_scan;
use super::similarity::{best_patch_position, how_close_are_signals, signal_slice};
use super::{IntroInfo, PATCH_SECS, SOURCE_END, SOURCE_START};

/// Derives an intro candidate from two signals: the chunk scanner picks the
/// best contiguous region in `one`, the region is aligned inside `two`, and
/// the pair of slices is scored. `intro` is left unset; the caller
/// materializes it only for accepted candidates.
pub fn get_intro_from_pair(one: &FloatSignal, two: &FloatSignal) -> IntroInfo {
    let scan = do_chunk_scan(one, two, SOURCE_START, SOURCE_END, PATCH_SECS);
    log::debug!(
        "intro candidate: {:.1}s - {:.1}s",
        scan.start_time,
        scan.end_time
    );

    let intro_one = signal_slice(one, scan.start_time, scan.end_time);

    let find = best_patch_position(two, &intro_one);
    let other_start = find.timestamp;
    let other_end = other_start + scan.end_time - scan.start_time;
    let intro_two = signal_slice(two, other_start, other_end);

    let how_close = how_close_are_signals(&intro_one, &intro_two);

    IntroInfo {
        start_time: scan.start_time,
        end_time: scan.end_time,
        match_percent: how_close.value,
        intro: None,
        other_start_time: other_start,
        other_end_time: other_end,
    }
}
