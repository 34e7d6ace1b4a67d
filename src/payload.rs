use bytes::Bytes;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::SizeRange;

/// Byte every payload is filled with; content is never inspected downstream.
pub const FILLER: u8 = b'1';

/// A generated record. Only its length carries meaning.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    pub payload: Bytes,
}

impl Record {
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Produces records whose length is `u * scale` for `u` uniform in `[min, max)`.
pub struct RecordGenerator {
    rng: StdRng,
    range: SizeRange,
    scale: u32,
}

impl RecordGenerator {
    pub fn new(range: SizeRange, scale: u32, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_os_rng(),
        };
        Self { rng, range, scale }
    }

    /// Draw one payload length in bytes.
    pub fn next_len(&mut self) -> usize {
        let units = self.rng.random_range(self.range.min..self.range.max);
        units as usize * self.scale as usize
    }

    pub fn next_record(&mut self) -> Record {
        let len = self.next_len();
        Record {
            payload: Bytes::from(vec![FILLER; len]),
        }
    }

    pub fn generate(&mut self, count: usize) -> Vec<Record> {
        let mut records = Vec::with_capacity(count);
        for _ in 0..count {
            records.push(self.next_record());
        }
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lengths_stay_within_scaled_range_and_cover_it() {
        let mut g = RecordGenerator::new(SizeRange { min: 10, max: 50 }, 500, Some(7));
        let mut seen = std::collections::BTreeSet::new();
        for _ in 0..10_000 {
            let len = g.next_len();
            assert!((5000..25000).contains(&len), "len {len} out of range");
            assert_eq!(len % 500, 0);
            seen.insert(len);
        }
        assert_eq!(seen.len(), 40);
        assert_eq!(seen.first(), Some(&5000));
        assert_eq!(seen.last(), Some(&24500));
    }

    #[test]
    fn payload_is_uniform_filler() {
        let mut g = RecordGenerator::new(SizeRange { min: 1, max: 3 }, 4, None);
        let records = g.generate(20);
        assert_eq!(records.len(), 20);
        for r in &records {
            assert!(r.len() == 4 || r.len() == 8);
            assert!(r.payload.iter().all(|b| *b == FILLER));
        }
    }

    #[test]
    fn zero_count_yields_nothing() {
        let mut g = RecordGenerator::new(SizeRange::default(), 500, Some(1));
        assert!(g.generate(0).is_empty());
    }

    #[test]
    fn same_seed_same_lengths() {
        let mut a = RecordGenerator::new(SizeRange::default(), 500, Some(42));
        let mut b = RecordGenerator::new(SizeRange::default(), 500, Some(42));
        let la: Vec<usize> = a.generate(100).iter().map(Record::len).collect();
        let lb: Vec<usize> = b.generate(100).iter().map(Record::len).collect();
        assert_eq!(la, lb);
    }
}
