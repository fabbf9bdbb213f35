//! Downmix helpers bridging stream callbacks and the sample ring.

use super::ring::SampleRing;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Downmix interleaved multi-channel input to mono while applying the provided
/// converter, so the detectors see a single channel regardless of the
/// microphone layout.
pub(super) fn append_downmixed<T, F>(buf: &mut Vec<f32>, data: &[T], channels: usize, mut convert: F)
where
    T: Copy,
    F: FnMut(T) -> f32,
{
    if channels <= 1 {
        buf.extend(data.iter().copied().map(&mut convert));
        return;
    }

    // Average each interleaved frame to produce a mono sample.
    let mut acc = 0.0f32;
    let mut count = 0usize;
    for sample in data.iter().copied() {
        acc += convert(sample);
        count += 1;
        if count == channels {
            buf.push(acc / channels as f32);
            acc = 0.0;
            count = 0;
        }
    }
    if count > 0 {
        buf.push(acc / count as f32);
    }
}

/// Convert and downmix one callback batch, then push it into the shared ring.
/// The callback runs on the audio thread, so contention with a window fetch is
/// resolved by dropping the batch and counting it rather than blocking.
pub(super) fn write_into_ring<T, F>(
    ring: &Mutex<SampleRing>,
    scratch: &mut Vec<f32>,
    data: &[T],
    channels: usize,
    convert: F,
    dropped: &AtomicUsize,
) where
    T: Copy,
    F: FnMut(T) -> f32,
{
    scratch.clear();
    append_downmixed(scratch, data, channels, convert);
    match ring.try_lock() {
        Ok(mut ring) => ring.push_slice(scratch),
        Err(_) => {
            dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}
