use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use threadpool::ThreadPool;
use vq_image_compressor::codebook::{stride_sample, Codebook};
use vq_image_compressor::quantizer::Quantizer;
use vq_image_compressor::tiler::{partition, TileSize, TileVectors};
use vq_image_compressor::{Quality, RasterBuffer};

const IMAGE_WIDTH: u32 = 3840;
const IMAGE_HEIGHT: u32 = 2160;
const IMAGE_SIZE: usize = IMAGE_WIDTH as usize * IMAGE_HEIGHT as usize;

fn create_test_raster() -> RasterBuffer {
    let samples = (0..IMAGE_SIZE)
        .map(|index| {
            let x = index as u32 % IMAGE_WIDTH;
            let y = index as u32 / IMAGE_WIDTH;
            ((x + y * 8) % 256) as u8
        })
        .collect();
    RasterBuffer::new(IMAGE_WIDTH, IMAGE_HEIGHT, 1, samples).unwrap()
}

fn create_test_codebook(tile_vectors: &TileVectors) -> Codebook {
    stride_sample(tile_vectors, Quality::High.codebook_size()).unwrap()
}

fn calculate_std_deviation_in_micros(mean: &Duration, measurements: &[Duration]) -> u64 {
    let mean_micros = mean.as_micros() as i128;
    let sum = measurements
        .iter()
        .map(|m| m.as_micros() as i128 - mean_micros)
        .map(|v| v.pow(2).unsigned_abs())
        .sum::<u128>();
    let variance = sum / measurements.len() as u128;
    (variance as f64).sqrt().round() as u64
}

fn measure(
    name: &str,
    quantizer: &Quantizer,
    tile_vectors: &Arc<TileVectors>,
    codebook: &Arc<Codebook>,
) {
    println!("Starting {} assignment", name);
    let mut durations: Vec<Duration> = Vec::new();

    for round in 1..=NUMBER_OF_ROUNDS {
        println!("Starting round {}", round);

        let start = Instant::now();
        quantizer.assign(tile_vectors, codebook).unwrap();
        let duration = start.elapsed();

        println!(
            "Finished round {} after {} microseconds",
            round,
            duration.as_micros(),
        );
        durations.push(duration);
    }

    let min_duration = durations.iter().min().unwrap();
    let max_duration = durations.iter().max().unwrap();
    let avg_duration = durations.iter().sum::<Duration>() / NUMBER_OF_ROUNDS;
    let std_deviation = calculate_std_deviation_in_micros(&avg_duration, &durations);

    println!(
        "{}: Min: {}, Max: {}, Average: {}, Std Deviation: {}",
        name,
        min_duration.as_micros(),
        max_duration.as_micros(),
        avg_duration.as_micros(),
        std_deviation,
    );
}

const NUMBER_OF_ROUNDS: u32 = 10;

fn main() {
    println!("Creating test raster");
    let test_raster = create_test_raster();
    println!("Splitting test raster into tiles");
    let (_, tile_vectors) = partition(&test_raster, TileSize::Four).unwrap();
    let codebook = Arc::new(create_test_codebook(&tile_vectors));
    let tile_vectors = Arc::new(tile_vectors);

    measure("Serial", &Quantizer::default(), &tile_vectors, &codebook);

    let number_of_threads = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let threadpool = ThreadPool::new(number_of_threads);
    let quantizer = Quantizer::new(Some(&threadpool), None);
    measure(
        &format!("Pooled ({} threads)", number_of_threads),
        &quantizer,
        &tile_vectors,
        &codebook,
    );
}
