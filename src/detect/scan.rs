use crate::dsp::signal::FloatSignal;

use super::similarity::{best_patch_position, signal_slice};
use super::{CorrelateResult, IntroChunk, SAMPLE_RATE, SOURCE_END};

/// Slides consecutive `patch_secs`-second patches cut from `two` across
/// `one` and clusters the best-match timestamps into contiguous blocks.
/// The longest block is the intro candidate in `one`. Always returns a
/// block; with nothing usable to cluster, the result degrades to a single
/// patch at the origin.
pub fn do_chunk_scan(
    one: &FloatSignal,
    two: &FloatSignal,
    patch_start: usize,
    patch_end: usize,
    patch_secs: usize,
) -> IntroChunk {
    assert!(patch_end > patch_start, "chunk scan: empty patch window");

    // probe patches must come from real audio, so the window is clamped to
    // the source's actual duration as well as the search bound
    let source_secs = two.len() / SAMPLE_RATE as usize;
    let limit = patch_end.min(SOURCE_END).min(source_secs);

    let mut results = Vec::new();
    let mut i = patch_start;
    while i + patch_secs < limit {
        let patch = signal_slice(two, i as f32, (i + patch_secs) as f32);
        results.push(best_patch_position(one, &patch));
        i += patch_secs;
    }

    chunk_search_results(&results, patch_secs)
}

fn chunk_search_results(results: &[CorrelateResult], patch_secs: usize) -> IntroChunk {
    if results.is_empty() {
        return IntroChunk {
            start_time: 0.0,
            end_time: patch_secs as f32,
            patch_start: 0,
            patch_end: 0,
        };
    }

    let value_mean = results.iter().map(|r| r.value).sum::<f32>() / results.len() as f32;

    // NOTE: patch_start/patch_end are relative to the first scanned patch;
    // correct as long as the scan started at time 0
    let mut blocks = vec![IntroChunk {
        start_time: results[0].timestamp,
        end_time: results[0].timestamp,
        patch_start: 0,
        patch_end: 0,
    }];
    let mut current = 0usize;

    for (i, result) in results.iter().enumerate() {
        log::trace!(
            "patch {}: value={:.4} timestamp={:.2}",
            i,
            result.value,
            result.timestamp
        );
        if result.value < value_mean {
            continue;
        }

        let gap = (result.timestamp - blocks[current].end_time).abs();
        if gap < (patch_secs + 1) as f32 {
            blocks[current].end_time = result.timestamp.max(blocks[current].end_time);
            blocks[current].patch_end = i * patch_secs;
        } else if result.timestamp > blocks[current].start_time
            && result.timestamp < blocks[current].end_time
        {
            // the patch repeats inside the block and matched an earlier
            // occurrence of itself; grow the block by one patch
            blocks[current].end_time += patch_secs as f32;
            blocks[current].patch_end = i * patch_secs;
        } else {
            current += 1;
            blocks.push(IntroChunk {
                start_time: result.timestamp,
                end_time: result.timestamp,
                patch_start: i * patch_secs,
                patch_end: i * patch_secs,
            });
        }
    }

    // the block spanning the most time becomes the candidate
    let mut best = IntroChunk::default();
    for block in &blocks {
        if block.end_time - block.start_time > best.end_time - best.start_time {
            best = *block;
        }
    }

    // end_time records the start of the last matching patch; extend by one
    // patch to include it
    best.end_time += patch_secs as f32;
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(timestamp: f32, value: f32) -> CorrelateResult {
        CorrelateResult {
            sample_index: (timestamp * SAMPLE_RATE as f32) as u64,
            value,
            timestamp,
        }
    }

    #[test]
    fn clusters_contiguous_matches_and_picks_longest() {
        let results = vec![
            result(100.0, 0.0),
            result(50.0, 1.0),
            result(54.0, 1.0),
            result(58.0, 1.0),
            result(200.0, 0.0),
            result(120.0, 1.0),
            result(124.0, 1.0),
        ];

        let block = chunk_search_results(&results, 4);
        assert_eq!(block.start_time, 50.0);
        assert_eq!(block.end_time, 62.0);
        assert_eq!(block.patch_start, 4);
        assert_eq!(block.patch_end, 12);
    }

    #[test]
    fn repeat_inside_block_grows_the_end() {
        let results = vec![
            result(10.0, 1.0),
            result(14.0, 1.0),
            result(18.0, 1.0),
            // matched an earlier repetition inside the block
            result(12.0, 1.0),
            result(22.0, 1.0),
        ];

        let block = chunk_search_results(&results, 4);
        assert_eq!(block.start_time, 10.0);
        // 18 -> grown to 22 by the repeat, extended to 22 by the last
        // patch, then +4 for the final patch duration
        assert_eq!(block.end_time, 26.0);
        assert_eq!(block.patch_end, 16);
    }

    #[test]
    fn block_start_is_not_moved_by_later_results() {
        let results = vec![
            result(30.0, 1.0),
            result(27.0, 1.0),
            result(34.0, 1.0),
        ];

        let block = chunk_search_results(&results, 4);
        assert_eq!(block.start_time, 30.0);
        assert_eq!(block.end_time, 38.0);
    }

    #[test]
    fn degenerate_input_reports_a_single_patch() {
        let block = chunk_search_results(&[], 4);
        assert_eq!(block.start_time, 0.0);
        assert_eq!(block.end_time, 4.0);

        let block = chunk_search_results(&[result(42.0, 1.0)], 4);
        assert!(block.start_time < block.end_time);
    }

    #[test]
    fn scan_finds_shared_segment() {
        use crate::detect::testutil::{noise, with_intro};

        let shared = noise(3, 16 * SAMPLE_RATE as usize);
        let one = FloatSignal::from_slice(&with_intro(1, 60, &shared, 20));
        let two = FloatSignal::from_slice(&with_intro(2, 60, &shared, 20));
        let block = do_chunk_scan(&one, &two, 0, SOURCE_END, 4);

        assert!(
            (14.0..=26.0).contains(&block.start_time),
            "start = {}",
            block.start_time
        );
        assert!(
            (34.0..=38.0).contains(&block.end_time),
            "end = {}",
            block.end_time
        );
    }
}
