mod audio;
mod cli;
mod config;
mod detect;
mod dsp;

use std::collections::BTreeMap;

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use cli::Cli;
use detect::discovery::FindSound;
use detect::{FindSoundResult, ACCEPTANCE_THRESHOLD};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    if let Some(path) = &cli.export_plan_cache {
        dsp::fft::write_plan_cache(path, 1, 25)?;
        log::info!("Wrote plan cache: {}", path.display());
        return Ok(());
    }

    if cli.inputs.len() < 2 {
        anyhow::bail!("Need at least two input files to search for a shared intro");
    }
    for input in &cli.inputs {
        if !input.exists() {
            anyhow::bail!("Input file not found: {}", input.display());
        }
    }

    let cfg = config::load_config(&cli.config).unwrap_or_default();
    if let Some(threads) = cli.threads.or(cfg.threads) {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()?;
    }
    if let Some(path) = cli.plan_cache.as_ref().or(cfg.plan_cache.as_ref()) {
        dsp::fft::load_plan_cache(path);
    }

    log::info!("introseek - shared intro detection");
    log::info!("Files: {}", cli.inputs.len());

    // 1. Decode all inputs (parallel)
    log::info!("Decoding audio tracks...");
    let mut finder = FindSound::new();
    finder.add_files(&cli.inputs);

    // 2. Run discovery, following the emission stream
    log::info!("Searching for the shared intro...");
    let (expected, results) = finder.run();

    let pb = ProgressBar::new(expected as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} files")
            .unwrap()
            .progress_chars("=>-"),
    );

    let mut best: BTreeMap<usize, FindSoundResult> = BTreeMap::new();
    for result in results {
        if result.is_better {
            log::info!(
                "{}: {:.0}% match at {} - {}",
                result.file.display(),
                result.intro_info.match_percent * 100.0,
                fmt_time(result.intro_info.start_time),
                fmt_time(result.intro_info.end_time)
            );
            best.insert(result.index, result.clone());
        }
        if result.is_progress {
            pb.inc(1);
        }
    }
    pb.finish_with_message("Search complete");

    // 3. Report
    let mut found = 0usize;
    for result in best.values() {
        let info = &result.intro_info;
        if info.match_percent >= ACCEPTANCE_THRESHOLD {
            found += 1;
        }
        println!(
            "{}  {} - {}  {:>5.1}%{}",
            result.file.display(),
            fmt_time(info.start_time),
            fmt_time(info.end_time),
            info.match_percent * 100.0,
            if info.match_percent >= ACCEPTANCE_THRESHOLD {
                ""
            } else {
                "  (below threshold)"
            }
        );
    }
    for (index, input) in cli.inputs.iter().enumerate() {
        if !best.contains_key(&index) {
            println!("{}  no intro found", input.display());
        }
    }

    log::info!("Done: {}/{} files matched the intro", found, cli.inputs.len());
    Ok(())
}

fn fmt_time(secs: f32) -> String {
    let total = secs.max(0.0).round() as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}
