use std::ops::Range;
use std::sync::{mpsc, Arc};

use threadpool::ThreadPool;

use crate::cancellation::{CancellationToken, Outcome};
use crate::codebook::Codebook;
use crate::error::Error;
use crate::tiler::TileVectors;
use crate::Result;

/// Number of tiles handed to a worker at once. Cancellation is checked
/// between batches.
pub const BATCH_SIZE: usize = 1024;

/// Codebook index of every tile, in raster order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexStream {
    indices: Vec<u8>,
}

impl IndexStream {
    pub fn new(indices: Vec<u8>) -> Self {
        Self { indices }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.indices
    }

    pub fn iter(&self) -> std::slice::Iter<'_, u8> {
        self.indices.iter()
    }
}

pub fn squared_distance(a: &[u8], b: &[u8]) -> u32 {
    a.iter()
        .zip(b)
        .map(|(&a, &b)| {
            let difference = a as i32 - b as i32;
            (difference * difference) as u32
        })
        .sum()
}

/// Index and squared distance of the closest code vector. Ties go to the
/// lowest index.
pub fn nearest_index(vector: &[u8], codebook: &Codebook) -> (u8, u32) {
    let mut best_index = 0;
    let mut best_distance = u32::MAX;
    for (index, code_vector) in codebook.iter().enumerate() {
        let distance = squared_distance(vector, code_vector);
        if distance < best_distance {
            best_index = index;
            best_distance = distance;
            if distance == 0 {
                break;
            }
        }
    }
    (best_index as u8, best_distance)
}

/// Maps every tile vector onto its nearest code vector.
pub fn assign(tile_vectors: &TileVectors, codebook: &Codebook) -> IndexStream {
    IndexStream::new(assign_range(tile_vectors, codebook, 0..tile_vectors.len()))
}

fn assign_range(tile_vectors: &TileVectors, codebook: &Codebook, range: Range<usize>) -> Vec<u8> {
    range
        .map(|index| nearest_index(tile_vectors.get(index), codebook).0)
        .collect()
}

/// Runs the nearest vector search batch by batch, either on the calling
/// thread or spread over a thread pool.
pub struct Quantizer<'a> {
    threadpool: Option<&'a ThreadPool>,
    cancellation: Option<&'a CancellationToken>,
    batch_size: usize,
}

impl<'a> Quantizer<'a> {
    pub fn new(
        threadpool: Option<&'a ThreadPool>,
        cancellation: Option<&'a CancellationToken>,
    ) -> Self {
        Quantizer {
            threadpool,
            cancellation,
            batch_size: BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation
            .is_some_and(|cancellation| cancellation.is_cancelled())
    }

    pub fn assign(
        &self,
        tile_vectors: &Arc<TileVectors>,
        codebook: &Arc<Codebook>,
    ) -> Result<Outcome<IndexStream>> {
        match self.threadpool {
            Some(threadpool) => self.assign_on_threadpool(threadpool, tile_vectors, codebook),
            None => Ok(self.assign_serial(tile_vectors, codebook)),
        }
    }

    fn batches(&self, length: usize) -> Vec<Range<usize>> {
        (0..length)
            .step_by(self.batch_size)
            .map(|start| start..(start + self.batch_size).min(length))
            .collect()
    }

    fn assign_serial(&self, tile_vectors: &TileVectors, codebook: &Codebook) -> Outcome<IndexStream> {
        let mut indices = Vec::with_capacity(tile_vectors.len());
        for batch in self.batches(tile_vectors.len()) {
            if self.is_cancelled() {
                return Outcome::Aborted;
            }
            indices.extend(assign_range(tile_vectors, codebook, batch));
        }
        Outcome::Completed(IndexStream::new(indices))
    }

    fn assign_on_threadpool(
        &self,
        threadpool: &ThreadPool,
        tile_vectors: &Arc<TileVectors>,
        codebook: &Arc<Codebook>,
    ) -> Result<Outcome<IndexStream>> {
        let batches = self.batches(tile_vectors.len());
        let (sender, receiver) = mpsc::channel();
        for batch in batches.iter().cloned() {
            let sender = sender.clone();
            let tile_vectors = Arc::clone(tile_vectors);
            let codebook = Arc::clone(codebook);
            let cancellation = self.cancellation.cloned();
            threadpool.execute(move || {
                let cancelled = cancellation.is_some_and(|c| c.is_cancelled());
                let indices = (!cancelled).then(|| assign_range(&tile_vectors, &codebook, batch.clone()));
                // receiver is only gone when the caller unwound
                let _ = sender.send((batch.start, indices));
            });
        }
        drop(sender);

        let mut indices = vec![0; tile_vectors.len()];
        let mut received = 0;
        let mut aborted = false;
        for (start, batch_indices) in receiver.iter().take(batches.len()) {
            received += 1;
            match batch_indices {
                Some(batch_indices) => {
                    indices[start..start + batch_indices.len()].copy_from_slice(&batch_indices)
                }
                None => aborted = true,
            }
        }
        if aborted || self.is_cancelled() {
            return Ok(Outcome::Aborted);
        }
        if received != batches.len() {
            return Err(Error::QuantizerWorkerLost {
                expected: batches.len(),
                received,
            });
        }
        Ok(Outcome::Completed(IndexStream::new(indices)))
    }
}

impl Default for Quantizer<'_> {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use threadpool::ThreadPool;

    use super::{assign, nearest_index, squared_distance, Quantizer};
    use crate::{
        cancellation::{CancellationToken, Outcome},
        codebook::Codebook,
        tiler::TileVectors,
    };

    fn create_test_codebook() -> Codebook {
        Codebook::new(2, vec![0, 0, 10, 10, 10, 10, 200, 200]).unwrap()
    }

    fn create_test_tile_vectors(count: usize) -> TileVectors {
        let samples = (0..count * 2).map(|index| (index * 37 % 256) as u8).collect();
        TileVectors::new(2, samples).unwrap()
    }

    #[test]
    fn test_squared_distance() {
        assert_eq!(squared_distance(&[1, 2, 3], &[4, 5, 6]), 27);
        assert_eq!(squared_distance(&[255], &[0]), 65025);
    }

    #[test]
    fn ties_go_to_lowest_index() {
        let codebook = create_test_codebook();
        assert_eq!(nearest_index(&[10, 10], &codebook), (1, 0));
        assert_eq!(nearest_index(&[5, 5], &codebook), (0, 50));
    }

    #[test]
    fn assign_nearest() {
        let codebook = create_test_codebook();
        let tile_vectors = TileVectors::new(2, vec![1, 1, 150, 180, 12, 9]).unwrap();
        let indices = assign(&tile_vectors, &codebook);
        assert_eq!(indices.as_slice(), &[0, 3, 1]);
    }

    #[test]
    fn threadpool_matches_serial() {
        let tile_vectors = Arc::new(create_test_tile_vectors(1000));
        let codebook = Arc::new(create_test_codebook());
        let expected = assign(&tile_vectors, &codebook);
        let threadpool = ThreadPool::new(4);
        let quantizer = Quantizer::new(Some(&threadpool), None).with_batch_size(7);
        let actual = quantizer.assign(&tile_vectors, &codebook).unwrap();
        assert_eq!(actual, Outcome::Completed(expected));
    }

    #[test]
    fn serial_batches_match_single_pass() {
        let tile_vectors = Arc::new(create_test_tile_vectors(100));
        let codebook = Arc::new(create_test_codebook());
        let expected = assign(&tile_vectors, &codebook);
        let quantizer = Quantizer::default().with_batch_size(9);
        let actual = quantizer.assign(&tile_vectors, &codebook).unwrap();
        assert_eq!(actual, Outcome::Completed(expected));
    }

    #[test]
    fn cancelled_assignment_aborts() {
        let tile_vectors = Arc::new(create_test_tile_vectors(100));
        let codebook = Arc::new(create_test_codebook());
        let token = CancellationToken::new();
        token.cancel();
        let threadpool = ThreadPool::new(2);
        for quantizer in [
            Quantizer::new(None, Some(&token)),
            Quantizer::new(Some(&threadpool), Some(&token)),
        ] {
            let outcome = quantizer.assign(&tile_vectors, &codebook).unwrap();
            assert!(outcome.is_aborted());
        }
    }
}
