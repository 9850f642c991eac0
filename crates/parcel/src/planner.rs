//! Partitioning of a resource into contiguous byte ranges.

use crate::DownloadError;

/// One planned byte range, `start..=end`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub start: u64,
    pub end: u64,
}

impl Chunk {
    /// Number of bytes covered by this chunk
    pub fn len(&self) -> u64 {
        (self.end + 1).saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    /// Value of the `Range` request header for this chunk
    pub fn range_header(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

/// Divides `total_size` bytes into `workers` contiguous chunks.
///
/// Every chunk spans `total_size / workers` bytes except the last one, which
/// also absorbs the remainder. The worker count is clamped to `total_size`
/// so that no chunk is empty.
pub fn plan_chunks(total_size: i64, workers: usize) -> Result<Vec<Chunk>, DownloadError> {
    if total_size <= 0 {
        return Err(DownloadError::InvalidContentLength(total_size));
    }

    let total_size = total_size as u64;
    let workers = (workers.max(1) as u64).min(total_size);
    let chunk_size = total_size / workers;

    let chunks = (0..workers)
        .map(|i| {
            let start = i * chunk_size;
            let end = if i == workers - 1 {
                total_size - 1
            } else {
                start + chunk_size - 1
            };
            Chunk {
                index: i as usize,
                start,
                end,
            }
        })
        .collect();

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_covers(chunks: &[Chunk], total: u64) {
        assert_eq!(chunks.first().unwrap().start, 0);
        assert_eq!(chunks.last().unwrap().end, total - 1);
        for (i, pair) in chunks.windows(2).enumerate() {
            assert_eq!(pair[0].index, i);
            assert_eq!(pair[0].end + 1, pair[1].start, "gap or overlap after chunk {i}");
        }
        assert_eq!(chunks.iter().map(Chunk::len).sum::<u64>(), total);
    }

    #[test]
    fn test_even_split() {
        let chunks = plan_chunks(100, 4).unwrap();
        assert_eq!(chunks.len(), 4);
        assert_eq!((chunks[0].start, chunks[0].end), (0, 24));
        assert_eq!((chunks[3].start, chunks[3].end), (75, 99));
        assert_covers(&chunks, 100);
    }

    #[test]
    fn test_last_chunk_absorbs_remainder() {
        let chunks = plan_chunks(100, 3).unwrap();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 33);
        assert_eq!(chunks[1].len(), 33);
        assert_eq!(chunks[2].len(), 34);
        assert_eq!(chunks[2].range_header(), "bytes=66-99");
    }

    #[test]
    fn test_contiguous_for_many_shapes() {
        for total in [1u64, 2, 7, 10, 99, 1_000, 4_097, 100_000_000] {
            for workers in [1usize, 2, 3, 10, 30, 64] {
                if workers as u64 > total {
                    continue;
                }
                let chunks = plan_chunks(total as i64, workers).unwrap();
                assert_eq!(chunks.len(), workers);
                assert_covers(&chunks, total);
            }
        }
    }

    #[test]
    fn test_workers_clamped_to_size() {
        let chunks = plan_chunks(5, 10).unwrap();
        assert_eq!(chunks.len(), 5);
        assert!(chunks.iter().all(|c| c.len() == 1));
        assert_covers(&chunks, 5);
    }

    #[test]
    fn test_non_positive_size_rejected() {
        assert!(matches!(
            plan_chunks(0, 10),
            Err(DownloadError::InvalidContentLength(0))
        ));
        let err = plan_chunks(-1, 10).unwrap_err();
        assert_eq!(err.to_string(), "Invalid content length '-1'");
    }
}
