//! Sampling and ASCII encoding of a signal.
//!
//! Every line of the signal is read in declared order, at call time, and
//! encoded as `'1'` (high) or `'0'` (low). The first line is the leftmost
//! character, i.e. the most significant bit. Nothing is cached between calls.

use mux_core::{LineBackend, LineError, Signal, MAX_LINES};
use std::fmt;
use tracing::trace;

/// An encoded sample: exactly one ASCII `'0'`/`'1'` per line of the signal.
///
/// Backed by a fixed staging buffer of [`MAX_LINES`] bytes; only the first
/// `len()` bytes are meaningful and only those are ever handed out.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    buf: [u8; MAX_LINES],
    len: usize,
}

impl Sample {
    /// Encode line levels, most significant first.
    ///
    /// Levels beyond [`MAX_LINES`] are ignored; validated tables never have
    /// that many lines.
    pub fn from_levels(levels: &[bool]) -> Self {
        let mut buf = [b'0'; MAX_LINES];
        let len = levels.len().min(MAX_LINES);
        for (slot, &high) in buf.iter_mut().zip(levels) {
            *slot = if high { b'1' } else { b'0' };
        }
        Self { buf, len }
    }

    /// Encoded bytes, exactly one per line.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Encoded bytes as a string slice.
    pub fn as_str(&self) -> &str {
        // Only b'0' and b'1' are ever written to the live prefix.
        std::str::from_utf8(self.as_bytes()).unwrap_or_default()
    }

    /// Number of characters (= lines sampled).
    pub fn len(&self) -> usize {
        self.len
    }

    /// True for a zero-line sample.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Level of line `index`, if in range.
    pub fn bit(&self, index: usize) -> Option<bool> {
        self.as_bytes().get(index).map(|&c| c == b'1')
    }

    /// The bit string read as an unsigned integer, first line most significant.
    pub fn value(&self) -> u32 {
        self.as_bytes()
            .iter()
            .fold(0u32, |acc, &c| (acc << 1) | u32::from(c == b'1'))
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Sample").field(&self.as_str()).finish()
    }
}

/// Sample every line of `signal` now and encode the result.
pub fn sample(signal: &Signal, backend: &dyn LineBackend) -> Result<Sample, LineError> {
    let mut levels = [false; MAX_LINES];
    let width = signal.lines.len().min(MAX_LINES);

    for (slot, line) in levels.iter_mut().zip(&signal.lines) {
        *slot = backend.read_line(line.id)?;
    }

    let sample = Sample::from_levels(&levels[..width]);
    trace!(signal = %signal.name, sample = %sample, "Sampled signal");
    Ok(sample)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mux_core::{Direction, LineId};
    use mux_driver_mock::MockLineBackend;

    fn claimed(signal: &Signal) -> MockLineBackend {
        let backend = MockLineBackend::new();
        for id in signal.line_ids() {
            backend.claim_line(id, Direction::Input).unwrap();
        }
        backend
    }

    #[test]
    fn test_all_low() {
        let signal = Signal::from_ids("s1", &[17, 18, 27, 22]);
        let backend = claimed(&signal);
        let sample = sample(&signal, &backend).unwrap();
        assert_eq!(sample.as_bytes(), b"0000");
        assert_eq!(sample.value(), 0);
    }

    #[test]
    fn test_first_line_is_most_significant() {
        let signal = Signal::from_ids("s1", &[17, 18, 27, 22]);
        let backend = claimed(&signal);
        backend.set_level(LineId(17), true);
        backend.set_level(LineId(22), true);

        let sample = sample(&signal, &backend).unwrap();
        assert_eq!(sample.as_str(), "1001");
        assert_eq!(sample.value(), 9);
        assert_eq!(sample.bit(0), Some(true));
        assert_eq!(sample.bit(4), None);
    }

    #[test]
    fn test_resamples_every_call() {
        let signal = Signal::from_ids("s1", &[5]);
        let backend = claimed(&signal);
        assert_eq!(sample(&signal, &backend).unwrap().as_str(), "0");
        backend.set_level(LineId(5), true);
        assert_eq!(sample(&signal, &backend).unwrap().as_str(), "1");
    }

    #[test]
    fn test_width_matches_signal_not_buffer() {
        let signal = Signal::from_ids("narrow", &[1, 2, 3]);
        let backend = claimed(&signal);
        let sample = sample(&signal, &backend).unwrap();
        assert_eq!(sample.len(), 3);
        assert!(MAX_LINES > sample.len());
    }

    #[test]
    fn test_unclaimed_line_fails() {
        let signal = Signal::from_ids("s1", &[1, 2]);
        let backend = MockLineBackend::new();
        assert!(sample(&signal, &backend).is_err());
    }

    #[test]
    fn test_sample_matches_from_levels() {
        let signal = Signal::from_ids("s2", &[23, 24, 25, 4]);
        let backend = claimed(&signal);
        backend.set_level(LineId(25), true);

        let sampled = sample(&signal, &backend).unwrap();
        assert_eq!(sampled, Sample::from_levels(&[false, false, true, false]));
    }

    #[test]
    fn test_from_levels_display() {
        let sample = Sample::from_levels(&[false, false, true, false]);
        assert_eq!(sample.to_string(), "0010");
        assert_eq!(format!("{:?}", sample), "Sample(\"0010\")");
    }
}
