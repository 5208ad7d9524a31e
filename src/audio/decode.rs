use anyhow::{Context, Result};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Decodes the first `max_secs` of the best audio stream at `path`, downmixed
/// to mono and resampled to `target_rate` Hz. Decoding starts at the
/// container start and stops as soon as the search window is full; no
/// seeking is involved.
pub fn decode_audio(path: &Path, target_rate: u32, max_secs: f32) -> Result<Vec<f32>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open media file: {}", path.display()))?;

    let stream = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, stream, &FormatOptions::default(), &MetadataOptions::default())
        .context("Failed to probe media format")?;
    let mut reader = probed.format;

    let track = reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .context("No audio tracks found")?;
    let track_id = track.id;
    let channels = track.codec_params.channels.map_or(1, |c| c.count());
    let native_rate = track.codec_params.sample_rate.context("Unknown sample rate")?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("Failed to create audio decoder")?;

    // frames of the search window still missing, at the native rate; the
    // packet loop ends mid-packet once this runs out
    let mut budget = (native_rate as f64 * max_secs as f64) as usize;
    let mut mono: Vec<f32> = Vec::with_capacity(budget);

    while budget > 0 {
        let packet = match reader.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(e.into()),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(symphonia::core::errors::Error::DecodeError(_)) => continue,
            Err(e) => return Err(e.into()),
        };

        let mut interleaved = SampleBuffer::<f32>::new(decoded.frames() as u64, *decoded.spec());
        interleaved.copy_interleaved_ref(decoded);

        // downmix frame by frame, but never past the window
        let wanted = (interleaved.samples().len() / channels.max(1)).min(budget);
        for frame in interleaved.samples().chunks(channels.max(1)).take(wanted) {
            mono.push(frame.iter().sum::<f32>() / frame.len() as f32);
        }
        budget -= wanted;
    }

    log::info!(
        "Decoded {}: {:.1}s of {} channel(s) at {}Hz, resampling to {}Hz",
        path.display(),
        mono.len() as f32 / native_rate as f32,
        channels,
        native_rate,
        target_rate
    );

    Ok(resample_linear(&mono, native_rate, target_rate))
}

/// Simple linear resampler (mono).
fn resample_linear(x: &[f32], sr_in: u32, sr_out: u32) -> Vec<f32> {
    if x.is_empty() || sr_in == 0 || sr_out == 0 || sr_in == sr_out {
        return x.to_vec();
    }
    let ratio = sr_out as f64 / sr_in as f64;
    let n_out = ((x.len() as f64) * ratio).floor().max(1.0) as usize;
    let mut y = Vec::with_capacity(n_out);

    for i in 0..n_out {
        let pos = i as f64 / ratio;
        let i0 = pos.floor() as usize;
        if i0 + 1 >= x.len() {
            y.push(x[x.len() - 1]);
        } else {
            let t = (pos - i0 as f64) as f32;
            let a = x[i0];
            let b = x[i0 + 1];
            y.push(a + (b - a) * t);
        }
    }
    y
}
