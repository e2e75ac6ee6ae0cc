//! Linde-Buzo-Gray refinement of a seeded codebook.
//!
//! Every iteration assigns all tiles to their nearest code vector (spread
//! over the quantizer's workers) and then, on the calling thread, moves each
//! code vector to the rounded mean of the tiles assigned to it. Code vectors
//! without any tile keep their position.

use std::sync::Arc;

use super::Codebook;
use crate::cancellation::{completed_or_abort, Outcome};
use crate::quantizer::{squared_distance, IndexStream, Quantizer};
use crate::tiler::TileVectors;
use crate::Result;

pub fn refine(
    seeds: Codebook,
    tile_vectors: &Arc<TileVectors>,
    quantizer: &Quantizer,
    max_iterations: u32,
    convergence_epsilon: f64,
) -> Result<Outcome<Codebook>> {
    let mut codebook = Arc::new(seeds);
    let mut indices = completed_or_abort!(quantizer.assign(tile_vectors, &codebook)?);
    let mut distortion = total_distortion(tile_vectors, &codebook, &indices);
    log::debug!("Seed distortion {}", distortion);

    for iteration in 1..=max_iterations {
        if distortion == 0 {
            break;
        }
        if quantizer.is_cancelled() {
            return Ok(Outcome::Aborted);
        }
        let candidate = Arc::new(recompute_centroids(tile_vectors, &codebook, &indices));
        let candidate_indices = completed_or_abort!(quantizer.assign(tile_vectors, &candidate)?);
        let candidate_distortion = total_distortion(tile_vectors, &candidate, &candidate_indices);
        log::debug!(
            "Iteration {}: distortion {} -> {}",
            iteration,
            distortion,
            candidate_distortion
        );
        // rounding the means can make things worse, keep the better codebook then
        if candidate_distortion > distortion {
            break;
        }
        let improvement = (distortion - candidate_distortion) as f64 / distortion as f64;
        codebook = candidate;
        indices = candidate_indices;
        distortion = candidate_distortion;
        if improvement < convergence_epsilon {
            log::info!("Codebook converged after {} iterations", iteration);
            break;
        }
    }

    log::info!("Refined codebook distortion {}", distortion);
    Ok(Outcome::Completed(
        Arc::try_unwrap(codebook).unwrap_or_else(|shared| (*shared).clone()),
    ))
}

/// Sum of squared distances between every tile and its assigned code vector.
pub fn total_distortion(
    tile_vectors: &TileVectors,
    codebook: &Codebook,
    indices: &IndexStream,
) -> u64 {
    tile_vectors
        .iter()
        .zip(indices.iter())
        .map(|(vector, &index)| squared_distance(vector, codebook.vector(index as usize)) as u64)
        .sum()
}

fn recompute_centroids(
    tile_vectors: &TileVectors,
    codebook: &Codebook,
    indices: &IndexStream,
) -> Codebook {
    let dimension = codebook.dimension();
    let mut sums = vec![0_u64; codebook.len() * dimension];
    let mut counts = vec![0_u64; codebook.len()];
    for (vector, &index) in tile_vectors.iter().zip(indices.iter()) {
        let index = index as usize;
        counts[index] += 1;
        let sum = &mut sums[index * dimension..(index + 1) * dimension];
        for (total, &sample) in sum.iter_mut().zip(vector) {
            *total += sample as u64;
        }
    }

    let mut vectors = Vec::with_capacity(codebook.samples().len());
    for (index, &count) in counts.iter().enumerate() {
        if count == 0 {
            vectors.extend_from_slice(codebook.vector(index));
            continue;
        }
        let sum = &sums[index * dimension..(index + 1) * dimension];
        vectors.extend(sum.iter().map(|&total| ((total + count / 2) / count) as u8));
    }
    Codebook {
        dimension,
        vectors,
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use threadpool::ThreadPool;

    use super::{recompute_centroids, refine, total_distortion};
    use crate::{
        cancellation::CancellationToken,
        codebook::{stride_sample, Codebook},
        quantizer::{assign, Quantizer},
        tiler::TileVectors,
    };

    fn create_clustered_tile_vectors() -> TileVectors {
        let samples = (0..400_usize)
            .flat_map(|index| {
                let cluster = (index % 4) as u8 * 60;
                let jitter = (index * 13 % 11) as u8;
                [cluster + jitter, cluster + 10 - jitter / 2, jitter]
            })
            .collect();
        TileVectors::new(3, samples).unwrap()
    }

    #[test]
    fn centroid_is_rounded_mean() {
        let tile_vectors = TileVectors::new(1, vec![1, 2, 9, 100]).unwrap();
        let codebook = Codebook::new(1, vec![0, 10, 50, 200]).unwrap();
        let indices = assign(&tile_vectors, &codebook);
        assert_eq!(indices.as_slice(), &[0, 0, 1, 2]);
        let centroids = recompute_centroids(&tile_vectors, &codebook, &indices);
        assert_eq!(centroids.samples(), &[2, 9, 100, 200]);
    }

    #[test]
    fn refinement_never_increases_distortion() {
        let tile_vectors = Arc::new(create_clustered_tile_vectors());
        let seeds = stride_sample(&tile_vectors, 64).unwrap();
        let seed_distortion =
            total_distortion(&tile_vectors, &seeds, &assign(&tile_vectors, &seeds));
        let threadpool = ThreadPool::new(3);
        let quantizer = Quantizer::new(Some(&threadpool), None).with_batch_size(50);
        let refined = refine(seeds, &tile_vectors, &quantizer, 10, 0.0)
            .unwrap()
            .completed()
            .expect("refinement without cancellation completes");
        let refined_distortion =
            total_distortion(&tile_vectors, &refined, &assign(&tile_vectors, &refined));
        assert_eq!(refined.len(), 64);
        assert!(refined_distortion <= seed_distortion);
    }

    #[test]
    fn refinement_is_deterministic() {
        let tile_vectors = Arc::new(create_clustered_tile_vectors());
        let serial = Quantizer::default();
        let threadpool = ThreadPool::new(4);
        let parallel = Quantizer::new(Some(&threadpool), None).with_batch_size(13);
        let first = refine(
            stride_sample(&tile_vectors, 64).unwrap(),
            &tile_vectors,
            &serial,
            5,
            0.001,
        )
        .unwrap();
        let second = refine(
            stride_sample(&tile_vectors, 64).unwrap(),
            &tile_vectors,
            &parallel,
            5,
            0.001,
        )
        .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn cancelled_refinement_aborts() {
        let tile_vectors = Arc::new(create_clustered_tile_vectors());
        let token = CancellationToken::new();
        token.cancel();
        let quantizer = Quantizer::new(None, Some(&token));
        let outcome = refine(
            stride_sample(&tile_vectors, 64).unwrap(),
            &tile_vectors,
            &quantizer,
            5,
            0.001,
        )
        .unwrap();
        assert!(outcome.is_aborted());
    }
}
