// Snowflake-style ids for users, tuits and messages
// 64-bit layout: [timestamp:41][shard:10][sequence:12], top bit always clear,
// timestamp counted in millis from 2020-01-01

use std::sync::atomic::{AtomicU64, Ordering};

use crate::core::{current_time_millis, EntityId};

const SHARD_BITS: u64 = 10;
const SEQUENCE_BITS: u64 = 12;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;
const TIMESTAMP_MASK: u64 = (1 << 41) - 1;
const EPOCH_MILLIS: i64 = 1_577_836_800_000;

/// Generates unique, roughly time-ordered ids for one shard.
#[derive(Debug)]
pub struct IdGenerator {
    shard_id: u16,
    /// Last issued (timestamp << SEQUENCE_BITS | sequence).
    state: AtomicU64,
}

impl IdGenerator {
    pub fn new(shard_id: u16) -> Self {
        Self {
            shard_id: shard_id & ((1 << SHARD_BITS) - 1) as u16,
            state: AtomicU64::new(0),
        }
    }

    pub fn next_id(&self) -> EntityId {
        let now = ((current_time_millis() - EPOCH_MILLIS).max(0) as u64) & TIMESTAMP_MASK;
        let mut current = self.state.load(Ordering::Relaxed);
        loop {
            let last_ts = current >> SEQUENCE_BITS;
            let next = if now > last_ts {
                now << SEQUENCE_BITS
            } else {
                // Same (or earlier, after a clock step back) millisecond: borrow
                // from the sequence, rolling into the next logical millisecond.
                current + 1
            };

            match self
                .state
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return EntityId(self.compose(next)),
                Err(actual) => current = actual,
            }
        }
    }

    fn compose(&self, state: u64) -> i64 {
        let timestamp = (state >> SEQUENCE_BITS) & TIMESTAMP_MASK;
        let sequence = state & SEQUENCE_MASK;
        ((timestamp << (SHARD_BITS + SEQUENCE_BITS))
            | ((self.shard_id as u64) << SEQUENCE_BITS)
            | sequence) as i64
    }

    pub fn extract_shard_id(id: EntityId) -> u16 {
        ((id.value() as u64 >> SEQUENCE_BITS) & ((1 << SHARD_BITS) - 1)) as u16
    }

    /// Millis since the Unix epoch at which the id was issued.
    pub fn extract_timestamp(id: EntityId) -> i64 {
        (id.value() as u64 >> (SHARD_BITS + SEQUENCE_BITS)) as i64 + EPOCH_MILLIS
    }

    pub fn shard_id(&self) -> u16 {
        self.shard_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_id_generation() {
        let generator = IdGenerator::new(123);

        let id1 = generator.next_id();
        let id2 = generator.next_id();
        let id3 = generator.next_id();

        assert!(id1 < id2 && id2 < id3);
        assert!(id1.is_valid());

        for id in [id1, id2, id3] {
            assert_eq!(IdGenerator::extract_shard_id(id), 123);
        }
    }

    #[test]
    fn test_timestamp_is_recoverable() {
        let generator = IdGenerator::new(7);
        let before = current_time_millis();
        let id = generator.next_id();
        let ts = IdGenerator::extract_timestamp(id);
        assert!(ts >= before);
        assert!(ts <= current_time_millis() + 1000);
        assert_eq!(generator.shard_id(), 7);
    }

    #[test]
    fn test_unique_across_threads() {
        let generator = Arc::new(IdGenerator::new(3));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let generator = Arc::clone(&generator);
                std::thread::spawn(move || {
                    (0..5000).map(|_| generator.next_id()).collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id {}", id);
            }
        }
        assert_eq!(seen.len(), 20000);
    }
}
