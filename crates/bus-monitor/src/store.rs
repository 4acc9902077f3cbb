//! Per-identifier frame state
//!
//! The [`FrameStore`] is the single owner of the latest payload and the
//! rolling statistics of every identifier seen on the stream.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::config::MonitorConfig;
use crate::error::MonitorError;
use crate::id::FrameId;

/// Mutable state kept for one identifier
#[derive(Debug, Clone)]
pub struct FrameRecord {
    payload: Vec<u8>,
    previous_payload: Vec<u8>,
    count: u64,
    first_seen: Duration,
    last_seen: Duration,
    /// None until two in-order frames have been observed
    frequency: Option<f64>,
}

impl FrameRecord {
    fn new(data: &[u8], timestamp: Duration) -> Self {
        Self {
            payload: data.to_vec(),
            previous_payload: data.to_vec(),
            count: 1,
            first_seen: timestamp,
            last_seen: timestamp,
            frequency: None,
        }
    }

    /// Most recent payload
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Payload immediately prior to the most recent one
    pub fn previous_payload(&self) -> &[u8] {
        &self.previous_payload
    }

    /// Accepted frames since the stream started
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Timestamp of the first accepted frame
    pub fn first_seen(&self) -> Duration {
        self.first_seen
    }

    /// Newest timestamp seen for this identifier
    pub fn last_seen(&self) -> Duration {
        self.last_seen
    }

    /// Smoothed arrival rate in frames per second (0 until estimated)
    pub fn frequency(&self) -> f64 {
        self.frequency.unwrap_or(0.0)
    }
}

/// Read-only copy of a [`FrameRecord`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameStats {
    /// Identifier
    pub id: FrameId,
    /// Most recent payload
    pub payload: Vec<u8>,
    /// Accepted frames
    pub count: u64,
    /// First accepted timestamp
    pub first_seen: Duration,
    /// Newest timestamp
    pub last_seen: Duration,
    /// Frames per second
    pub frequency: f64,
}

/// Result of applying one frame to the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameUpdate<'a> {
    /// First frame ever seen for this identifier
    pub is_new: bool,
    /// Timestamp was older than the newest one seen for this identifier
    pub out_of_order: bool,
    /// Payload before this frame (equal to `current` for a new identifier)
    pub previous: &'a [u8],
    /// Payload carried by this frame
    pub current: &'a [u8],
}

/// Owner of every [`FrameRecord`], keyed by identifier
#[derive(Debug)]
pub struct FrameStore {
    records: HashMap<FrameId, FrameRecord>,
    max_payload_len: usize,
    frequency_window: Duration,
    min_frame_interval: Duration,
    rejected: u64,
    latest: Option<Duration>,
}

impl FrameStore {
    /// Create an empty store
    pub fn new(config: &MonitorConfig) -> Self {
        Self {
            records: HashMap::new(),
            max_payload_len: config.max_payload_len,
            frequency_window: config.frequency_window(),
            min_frame_interval: config.min_frame_interval(),
            rejected: 0,
            latest: None,
        }
    }

    /// Record one frame
    ///
    /// Oversized payloads are rejected without touching any record. Frames
    /// whose timestamp is older than the identifier's newest one still update
    /// payload and count but leave the frequency estimate alone.
    pub fn apply(
        &mut self,
        id: FrameId,
        data: &[u8],
        timestamp: Duration,
    ) -> Result<FrameUpdate<'_>, MonitorError> {
        if data.len() > self.max_payload_len {
            self.rejected += 1;
            if self.rejected.is_power_of_two() {
                warn!(
                    "Rejected frame {} with {}-byte payload ({} rejected so far)",
                    id,
                    data.len(),
                    self.rejected
                );
            }
            return Err(MonitorError::MalformedFrame {
                id,
                len: data.len(),
                max: self.max_payload_len,
            });
        }

        self.latest = Some(self.latest.map_or(timestamp, |t| t.max(timestamp)));

        let window = self.frequency_window;
        let min_interval = self.min_frame_interval;

        let mut is_new = false;
        let mut out_of_order = false;
        let record = self
            .records
            .entry(id)
            .and_modify(|record| {
                std::mem::swap(&mut record.previous_payload, &mut record.payload);
                record.payload.clear();
                record.payload.extend_from_slice(data);
                record.count += 1;

                if timestamp >= record.last_seen {
                    let dt = timestamp - record.last_seen;
                    record.frequency =
                        smoothed_frequency(record.frequency, dt, window, min_interval);
                    record.last_seen = timestamp;
                } else {
                    out_of_order = true;
                    trace!("Out-of-order frame for {}, frequency unchanged", id);
                }
            })
            .or_insert_with(|| {
                is_new = true;
                FrameRecord::new(data, timestamp)
            });

        Ok(FrameUpdate {
            is_new,
            out_of_order,
            previous: &record.previous_payload,
            current: &record.payload,
        })
    }

    /// Drop every record and counter
    pub fn reset(&mut self) {
        self.records.clear();
        self.rejected = 0;
        self.latest = None;
    }

    /// Borrow a record
    pub fn get(&self, id: FrameId) -> Option<&FrameRecord> {
        self.records.get(&id)
    }

    /// Copy of a record's fields
    pub fn stats(&self, id: FrameId) -> Option<FrameStats> {
        self.records.get(&id).map(|record| FrameStats {
            id,
            payload: record.payload.clone(),
            count: record.count,
            first_seen: record.first_seen,
            last_seen: record.last_seen,
            frequency: record.frequency(),
        })
    }

    /// Check whether an identifier has been seen
    pub fn contains(&self, id: FrameId) -> bool {
        self.records.contains_key(&id)
    }

    /// Iterate all known identifiers (unordered)
    pub fn ids(&self) -> impl Iterator<Item = FrameId> + '_ {
        self.records.keys().copied()
    }

    /// Number of known identifiers
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if no frame has been accepted since the last reset
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Frames rejected as malformed since the last reset
    pub fn rejected_frames(&self) -> u64 {
        self.rejected
    }

    /// Newest accepted timestamp across all identifiers
    pub fn current_time(&self) -> Duration {
        self.latest.unwrap_or_default()
    }
}

/// Blend the instantaneous rate `1 / dt` into the prior estimate
///
/// The blend weight is `1 - exp(-dt / window)` over the same clamped `dt`
/// as the sample, so each frame contributes about `1 / window` and the
/// estimate tracks the last `window` of traffic. An interval shorter than
/// `min_interval` never seeds the estimate.
fn smoothed_frequency(
    prior: Option<f64>,
    dt: Duration,
    window: Duration,
    min_interval: Duration,
) -> Option<f64> {
    match prior {
        None if dt < min_interval => None,
        None => Some(1.0 / dt.as_secs_f64()),
        Some(prior) => {
            let dt = dt.max(min_interval).as_secs_f64();
            let alpha = 1.0 - (-dt / window.as_secs_f64()).exp();
            Some(alpha / dt + (1.0 - alpha) * prior)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn store() -> FrameStore {
        FrameStore::new(&MonitorConfig::default())
    }

    const ID: FrameId = FrameId::new(0, 0x100);

    #[test]
    fn test_first_frame_creates_record() {
        let mut store = store();
        let update = store.apply(ID, &[1, 2, 3], ms(10)).unwrap();
        assert!(update.is_new);
        assert_eq!(update.previous, update.current);

        let record = store.get(ID).unwrap();
        assert_eq!(record.count(), 1);
        assert_eq!(record.first_seen(), ms(10));
        assert_eq!(record.last_seen(), ms(10));
        assert_eq!(record.frequency(), 0.0);
    }

    #[test]
    fn test_second_frame_moves_payload_to_previous() {
        let mut store = store();
        store.apply(ID, &[1, 2], ms(0)).unwrap();
        let update = store.apply(ID, &[1, 3], ms(100)).unwrap();
        assert!(!update.is_new);
        assert_eq!(update.previous, &[1, 2]);
        assert_eq!(update.current, &[1, 3]);
        assert_eq!(store.get(ID).unwrap().count(), 2);
    }

    #[test]
    fn test_frequency_converges_to_rate() {
        let mut store = store();
        for i in 0..200 {
            store.apply(ID, &[0], ms(i * 10)).unwrap();
        }
        let freq = store.get(ID).unwrap().frequency();
        assert!((freq - 100.0).abs() < 1.0, "got {}", freq);
    }

    #[test]
    fn test_frequency_seeded_by_second_frame() {
        let mut store = store();
        store.apply(ID, &[0], ms(0)).unwrap();
        store.apply(ID, &[0], ms(250)).unwrap();
        assert!((store.get(ID).unwrap().frequency() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_duplicate_timestamp_does_not_seed_frequency() {
        let mut store = store();
        store.apply(ID, &[0], ms(0)).unwrap();
        store.apply(ID, &[0], ms(0)).unwrap();
        assert_eq!(store.get(ID).unwrap().frequency(), 0.0);

        for i in 1..=100 {
            store.apply(ID, &[0], ms(i * 10)).unwrap();
        }
        let freq = store.get(ID).unwrap().frequency();
        assert!(freq.is_finite());
        assert!((freq - 100.0).abs() < 5.0, "got {}", freq);
    }

    #[test]
    fn test_burst_inside_steady_traffic_stays_bounded() {
        let mut store = store();
        for i in 0..200 {
            store.apply(ID, &[0], ms(i * 10)).unwrap();
        }
        // three frames sharing one timestamp
        store.apply(ID, &[0], ms(1990)).unwrap();
        store.apply(ID, &[0], ms(1990)).unwrap();
        let freq = store.get(ID).unwrap().frequency();
        assert!(freq.is_finite());
        assert!(freq < 110.0, "got {}", freq);

        for i in 200..400 {
            store.apply(ID, &[0], ms(i * 10)).unwrap();
        }
        let freq = store.get(ID).unwrap().frequency();
        assert!((freq - 100.0).abs() < 1.0, "got {}", freq);
    }

    #[test]
    fn test_out_of_order_keeps_frequency() {
        let mut store = store();
        store.apply(ID, &[0], ms(0)).unwrap();
        store.apply(ID, &[1], ms(100)).unwrap();
        let before = store.get(ID).unwrap().frequency();

        let update = store.apply(ID, &[2], ms(50)).unwrap();
        assert!(update.out_of_order);

        let record = store.get(ID).unwrap();
        assert_eq!(record.frequency(), before);
        assert_eq!(record.payload(), &[2]);
        assert_eq!(record.count(), 3);
        assert_eq!(record.last_seen(), ms(100));
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let mut store = store();
        store.apply(ID, &[7], ms(0)).unwrap();

        let err = store.apply(ID, &[0; 65], ms(1)).unwrap_err();
        assert_eq!(
            err,
            MonitorError::MalformedFrame {
                id: ID,
                len: 65,
                max: 64
            }
        );
        assert_eq!(store.rejected_frames(), 1);
        assert_eq!(store.get(ID).unwrap().count(), 1);
        assert_eq!(store.get(ID).unwrap().payload(), &[7]);
    }

    #[test]
    fn test_payload_length_may_change() {
        let mut store = store();
        store.apply(ID, &[0; 8], ms(0)).unwrap();
        let update = store.apply(ID, &[0; 4], ms(1)).unwrap();
        assert_eq!(update.previous.len(), 8);
        assert_eq!(update.current.len(), 4);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut store = store();
        store.apply(ID, &[1], ms(5)).unwrap();
        let _ = store.apply(ID, &[0; 70], ms(6));
        store.reset();
        assert!(store.is_empty());
        assert_eq!(store.rejected_frames(), 0);
        assert_eq!(store.current_time(), Duration::ZERO);

        let update = store.apply(ID, &[1], ms(7)).unwrap();
        assert!(update.is_new);
        assert_eq!(store.get(ID).unwrap().count(), 1);
    }

    #[test]
    fn test_current_time_is_newest_timestamp() {
        let mut store = store();
        store.apply(ID, &[1], ms(30)).unwrap();
        store.apply(FrameId::new(1, 0x200), &[1], ms(20)).unwrap();
        assert_eq!(store.current_time(), ms(30));
    }

    #[test]
    fn test_stats_is_a_copy() {
        let mut store = store();
        store.apply(ID, &[9, 9], ms(0)).unwrap();
        let stats = store.stats(ID).unwrap();
        store.apply(ID, &[1], ms(1)).unwrap();
        assert_eq!(stats.payload, vec![9, 9]);
        assert_eq!(stats.count, 1);
    }
}
