//! Estimates playback duration of raw audio bytes

use std::{
    io::Cursor,
    panic::{self, UnwindSafe},
    path::Path,
};

use log::{debug, warn};
use symphonia::core::{
    errors::Error as SymphoniaError,
    formats::{FormatOptions, FormatReader},
    io::MediaSourceStream,
    meta::MetadataOptions,
    probe::Hint,
    units::TimeBase,
};
use thiserror::Error;

/// Duration prober contract: never fails, yields 0 when the audio can't be decoded
pub trait DurationProber: Send + Sync {
    /// `file_name` is only a hint for picking the container format
    fn probe(&self, data: &[u8], file_name: Option<&str>) -> f64;
}

#[derive(Debug, Error)]
enum ProbeError {
    #[error("audio could not be decoded: {0}")]
    Decode(#[from] SymphoniaError),

    #[error("no audio track found")]
    NoTrack,

    #[error("audio track has neither time base nor sample rate")]
    NoTimeBase,
}

/// Prober reading container headers with symphonia, falling back to
/// summing packet durations when the header carries no frame count
#[derive(Debug, Default, Clone, Copy)]
pub struct SymphoniaProber;

impl DurationProber for SymphoniaProber {
    fn probe(&self, data: &[u8], file_name: Option<&str>) -> f64 {
        duration_or_zero(file_name, || probe_seconds(data.to_vec(), file_name))
    }
}

/// runs a probe, turning errors, panics and nonsense results into 0
fn duration_or_zero(
    file_name: Option<&str>,
    probe: impl FnOnce() -> Result<f64, ProbeError> + UnwindSafe,
) -> f64 {
    let name = file_name.unwrap_or("<unnamed>");
    match panic::catch_unwind(probe) {
        Ok(Ok(seconds)) if seconds.is_finite() && seconds >= 0.0 => {
            debug!("Probed duration {seconds:.3}s for {name}");
            seconds
        }
        Ok(Ok(seconds)) => {
            warn!("Probe returned nonsensical duration {seconds} for {name}, using 0");
            0.0
        }
        Ok(Err(err)) => {
            warn!("Failed to probe duration of {name}: {err}, using 0");
            0.0
        }
        Err(_) => {
            warn!("Decoder panicked while probing {name}, using 0");
            0.0
        }
    }
}

fn probe_seconds(data: Vec<u8>, file_name: Option<&str>) -> Result<f64, ProbeError> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(data)), Default::default());
    let mut hint = Hint::new();
    if let Some(extension) = file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
    {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;

    let (track_id, params) = {
        let track = format.default_track().ok_or(ProbeError::NoTrack)?;
        (track.id, track.codec_params.clone())
    };

    let time_base = params
        .time_base
        .or_else(|| {
            params
                .sample_rate
                .filter(|rate| *rate > 0)
                .map(|rate| TimeBase::new(1, rate))
        })
        .ok_or(ProbeError::NoTimeBase)?;

    let frames = match params.n_frames {
        Some(frames) => frames,
        None => count_frames(format.as_mut(), track_id)?,
    };

    let time = time_base.calc_time(frames);
    Ok(time.seconds as f64 + time.frac)
}

/// walks all packets of the track, summing their durations
fn count_frames(format: &mut dyn FormatReader, track_id: u32) -> Result<u64, ProbeError> {
    let mut total = 0u64;
    loop {
        match format.next_packet() {
            Ok(packet) => {
                if packet.track_id() == track_id {
                    total += packet.dur();
                }
            }
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(total)
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// 16-bit mono PCM wav of silence
    pub(crate) fn wav_bytes(seconds: u32) -> Vec<u8> {
        const SAMPLE_RATE: u32 = 8_000;
        const BLOCK_ALIGN: u16 = 2;

        let data_len = SAMPLE_RATE * seconds * BLOCK_ALIGN as u32;
        let mut bytes = Vec::with_capacity(44 + data_len as usize);

        bytes.extend_from_slice(b"RIFF");
        bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
        bytes.extend_from_slice(b"WAVE");

        bytes.extend_from_slice(b"fmt ");
        bytes.extend_from_slice(&16u32.to_le_bytes());
        bytes.extend_from_slice(&1u16.to_le_bytes()); // pcm
        bytes.extend_from_slice(&1u16.to_le_bytes()); // mono
        bytes.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        bytes.extend_from_slice(&(SAMPLE_RATE * BLOCK_ALIGN as u32).to_le_bytes());
        bytes.extend_from_slice(&BLOCK_ALIGN.to_le_bytes());
        bytes.extend_from_slice(&16u16.to_le_bytes());

        bytes.extend_from_slice(b"data");
        bytes.extend_from_slice(&data_len.to_le_bytes());
        bytes.resize(44 + data_len as usize, 0);
        bytes
    }
}
