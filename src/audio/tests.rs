use super::dispatch::{append_downmixed, write_into_ring};
use super::ring::SampleRing;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[test]
fn downmixes_multi_channel_audio() {
    let mut buf = Vec::new();
    let samples = [1.0f32, -1.0, 0.5, 0.5];
    append_downmixed(&mut buf, &samples, 2, |sample| sample);
    assert_eq!(buf, vec![0.0, 0.5]);
}

#[test]
fn preserves_single_channel_audio() {
    let mut buf = Vec::new();
    let samples = [0.1f32, 0.2, 0.3];
    append_downmixed(&mut buf, &samples, 1, |sample| sample);
    assert_eq!(buf, samples);
}

#[test]
fn downmix_averages_trailing_partial_frame() {
    let mut buf = Vec::new();
    let samples = [0.2f32, 0.4, 0.6];
    append_downmixed(&mut buf, &samples, 2, |sample| sample);
    assert_eq!(buf.len(), 2);
    assert!((buf[0] - 0.3).abs() < 1e-6);
    assert!((buf[1] - 0.6).abs() < 1e-6);
}

#[test]
fn downmix_applies_converter() {
    let mut buf = Vec::new();
    let samples = [16_384_i16, -16_384];
    append_downmixed(&mut buf, &samples, 1, |sample| sample as f32 / 32_768.0);
    assert_eq!(buf, vec![0.5, -0.5]);
}

#[test]
fn ring_reads_zero_before_anything_is_written() {
    let ring = SampleRing::new(8);
    let mut out = [1.0f32; 4];
    ring.copy_latest(&mut out);
    assert_eq!(out, [0.0; 4]);
}

#[test]
fn ring_returns_latest_samples_in_order() {
    let mut ring = SampleRing::new(8);
    ring.push_slice(&[1.0, 2.0, 3.0, 4.0, 5.0]);
    let mut out = [0.0f32; 3];
    ring.copy_latest(&mut out);
    assert_eq!(out, [3.0, 4.0, 5.0]);
}

#[test]
fn ring_wraps_around_capacity() {
    let mut ring = SampleRing::new(4);
    ring.push_slice(&[1.0, 2.0, 3.0]);
    ring.push_slice(&[4.0, 5.0, 6.0]);
    let mut out = [0.0f32; 4];
    ring.copy_latest(&mut out);
    assert_eq!(out, [3.0, 4.0, 5.0, 6.0]);
}

#[test]
fn ring_keeps_only_the_tail_of_an_oversized_push() {
    let mut ring = SampleRing::new(3);
    ring.push_slice(&[1.0, 2.0, 3.0, 4.0, 5.0]);
    let mut out = [0.0f32; 3];
    ring.copy_latest(&mut out);
    assert_eq!(out, [3.0, 4.0, 5.0]);
}

#[test]
fn ring_zero_pads_windows_larger_than_capacity() {
    let mut ring = SampleRing::new(2);
    ring.push_slice(&[7.0, 8.0]);
    let mut out = [9.0f32; 4];
    ring.copy_latest(&mut out);
    assert_eq!(out, [0.0, 0.0, 7.0, 8.0]);
}

#[test]
fn write_into_ring_downmixes_and_stores() {
    let ring = Mutex::new(SampleRing::new(8));
    let dropped = AtomicUsize::new(0);
    let mut scratch = Vec::new();

    write_into_ring(
        &ring,
        &mut scratch,
        &[0.5f32, -0.5, 0.25, 0.25],
        2,
        |sample| sample,
        &dropped,
    );

    let mut out = [0.0f32; 2];
    ring.lock().expect("ring lock").copy_latest(&mut out);
    assert_eq!(out, [0.0, 0.25]);
    assert_eq!(dropped.load(Ordering::Relaxed), 0);
}

#[test]
fn write_into_ring_counts_contended_batches() {
    let ring = Mutex::new(SampleRing::new(8));
    let dropped = AtomicUsize::new(0);
    let mut scratch = Vec::new();

    let guard = ring.lock().expect("ring lock");
    write_into_ring(&ring, &mut scratch, &[0.1f32], 1, |sample| sample, &dropped);
    drop(guard);

    assert_eq!(dropped.load(Ordering::Relaxed), 1);
    let mut out = [1.0f32; 1];
    ring.lock().expect("ring lock").copy_latest(&mut out);
    assert_eq!(out, [0.0], "contended batch must be discarded, not queued");
}
