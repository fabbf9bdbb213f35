//! Fixed-capacity circular buffer of mono samples.

/// Rolling buffer the capture callbacks write into. Starts zero-filled, so a
/// window fetched before the first wrap reads as leading silence, matching the
/// zeroed capture clip the original implementation polled.
#[derive(Debug, Clone)]
pub struct SampleRing {
    buf: Vec<f32>,
    head: usize,
}

impl SampleRing {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: vec![0.0; capacity.max(1)],
            head: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Append samples, overwriting the oldest once the buffer is full. When
    /// the slice is longer than the capacity only its tail survives.
    pub fn push_slice(&mut self, samples: &[f32]) {
        let cap = self.buf.len();
        let tail = if samples.len() > cap {
            &samples[samples.len() - cap..]
        } else {
            samples
        };
        for &sample in tail {
            self.buf[self.head] = sample;
            self.head = (self.head + 1) % cap;
        }
    }

    /// Copy the most recent `out.len()` samples into `out`, oldest first. If
    /// the request exceeds the capacity the leading slots are zeroed.
    pub fn copy_latest(&self, out: &mut [f32]) {
        let cap = self.buf.len();
        let n = out.len().min(cap);
        let pad = out.len() - n;
        for slot in out.iter_mut().take(pad) {
            *slot = 0.0;
        }
        let start = (self.head + cap - n) % cap;
        for (i, slot) in out.iter_mut().skip(pad).enumerate() {
            *slot = self.buf[(start + i) % cap];
        }
    }
}
