//! Append-only in-memory reading buffer for a single session.

use chrono::{DateTime, Utc};

use super::reading::Reading;

/// Ordered, append-only sequence of readings owned by a session.
///
/// Sequence indices start at 1 and increase by one per appended reading.
/// Timestamps never go backwards: a wall-clock step back is clamped to the
/// previous reading's timestamp.
#[derive(Debug, Default)]
pub struct SessionBuffer {
    readings: Vec<Reading>,
    next_index: u64,
}

impl SessionBuffer {
    pub fn new() -> Self {
        Self {
            readings: Vec::new(),
            next_index: 1,
        }
    }

    /// Append a new reading and return it.
    pub fn push(
        &mut self,
        timestamp: DateTime<Utc>,
        location: &str,
        concentration: f64,
    ) -> &Reading {
        let timestamp = match self.readings.last() {
            Some(last) if timestamp < last.timestamp() => last.timestamp(),
            _ => timestamp,
        };
        // Default-constructed buffers start counting at 0 otherwise
        let index = self.next_index.max(1);
        self.next_index = index + 1;

        self.readings.push(Reading::new(index, timestamp, location, concentration));
        &self.readings[self.readings.len() - 1]
    }

    /// Read-only view of every reading in arrival order.
    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    pub fn has_readings(&self) -> bool {
        !self.readings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn last(&self) -> Option<&Reading> {
        self.readings.last()
    }

    /// Drop every reading. Only called once the session has been flushed.
    pub fn clear(&mut self) {
        self.readings.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_indices_strictly_increase() {
        let mut buffer = SessionBuffer::new();
        let start = Utc::now();
        for i in 0..5 {
            buffer.push(start + Duration::seconds(i * 5), "Lab", 0.01 * i as f64);
        }

        let indices: Vec<u64> = buffer.readings().iter().map(|r| r.sequence_index()).collect();
        assert_eq!(indices, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_default_buffer_starts_at_one() {
        let mut buffer = SessionBuffer::default();
        assert_eq!(buffer.push(Utc::now(), "Lab", 0.0).sequence_index(), 1);
        assert_eq!(buffer.push(Utc::now(), "Lab", 0.0).sequence_index(), 2);
    }

    #[test]
    fn test_timestamp_never_goes_backwards() {
        let mut buffer = SessionBuffer::new();
        let start = Utc::now();
        buffer.push(start, "Lab", 0.02);
        buffer.push(start - Duration::seconds(30), "Lab", 0.03);
        buffer.push(start + Duration::seconds(5), "Lab", 0.04);

        let stamps: Vec<_> = buffer.readings().iter().map(|r| r.timestamp()).collect();
        assert_eq!(stamps[1], start);
        assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_has_readings_and_clear() {
        let mut buffer = SessionBuffer::new();
        assert!(!buffer.has_readings());

        buffer.push(Utc::now(), "Lab", 0.2);
        assert!(buffer.has_readings());
        assert_eq!(buffer.len(), 1);
        assert!(buffer.last().is_some_and(|r| r.is_high_risk()));

        buffer.clear();
        assert!(buffer.is_empty());
    }
}
