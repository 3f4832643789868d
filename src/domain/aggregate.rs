use super::records::SecondCount;
use std::collections::BTreeMap;

#[derive(Debug, Default, Clone, Copy)]
struct Bucket {
    sum: u64,
    frames: u64,
}

/// Reduces per-frame person counts into one averaged count per second of source video.
///
/// Samples may arrive in any order; each second keeps its own accumulator.
#[derive(Debug, Default)]
pub struct SecondBuckets {
    buckets: BTreeMap<u64, Bucket>,
}

impl SecondBuckets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bucket index of a source frame: whole seconds elapsed at `fps`.
    pub fn second_of(frame_index: u64, fps: f64) -> u64 {
        (frame_index as f64 / fps).floor() as u64
    }

    pub fn record(&mut self, second: u64, person_count: u32) {
        let bucket = self.buckets.entry(second).or_default();
        bucket.sum += u64::from(person_count);
        bucket.frames += 1;
    }

    /// Sorted per-second averages; seconds without samples are absent.
    /// Halves round to even.
    pub fn finalize(self) -> Vec<SecondCount> {
        self.buckets
            .into_iter()
            .filter(|(_, bucket)| bucket.frames > 0)
            .map(|(second, bucket)| SecondCount {
                second,
                count: (bucket.sum as f64 / bucket.frames as f64).round_ties_even() as u32,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_average_is_rounded() {
        let mut buckets = SecondBuckets::new();
        for count in [1, 1, 2] {
            buckets.record(0, count);
        }

        assert_eq!(buckets.finalize(), vec![SecondCount { second: 0, count: 1 }]);
    }

    #[test]
    fn test_seconds_without_samples_are_absent() {
        let mut buckets = SecondBuckets::new();
        buckets.record(0, 2);
        buckets.record(3, 5);

        let seconds: Vec<u64> = buckets.finalize().iter().map(|c| c.second).collect();
        assert_eq!(seconds, vec![0, 3]);
    }

    #[test]
    fn test_out_of_order_samples_are_sorted() {
        let mut buckets = SecondBuckets::new();
        buckets.record(2, 4);
        buckets.record(0, 1);
        buckets.record(2, 6);

        assert_eq!(
            buckets.finalize(),
            vec![
                SecondCount { second: 0, count: 1 },
                SecondCount { second: 2, count: 5 },
            ]
        );
    }

    #[test]
    fn test_half_rounds_to_even() {
        let mut buckets = SecondBuckets::new();
        buckets.record(0, 2);
        buckets.record(0, 3);
        buckets.record(1, 3);
        buckets.record(1, 4);

        let counts: Vec<u32> = buckets.finalize().iter().map(|c| c.count).collect();
        assert_eq!(counts, vec![2, 4]);
    }

    #[test]
    fn test_second_of_uses_fps() {
        assert_eq!(SecondBuckets::second_of(0, 30.0), 0);
        assert_eq!(SecondBuckets::second_of(29, 30.0), 0);
        assert_eq!(SecondBuckets::second_of(30, 30.0), 1);
        assert_eq!(SecondBuckets::second_of(50, 25.0), 2);
    }

    #[test]
    fn test_empty_finalizes_to_nothing() {
        assert!(SecondBuckets::new().finalize().is_empty());
    }
}
