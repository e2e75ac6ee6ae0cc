use std::fmt::Display;

use crate::error::Error;
use crate::raster::RasterBuffer;
use crate::Result;

const SIZE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// File sizes and fidelity of one compression run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompressionReport {
    pub original_size: u64,
    pub compressed_size: u64,
    pub mean_squared_error: Option<f64>,
}

impl CompressionReport {
    pub fn ratio(&self) -> Option<f64> {
        if self.compressed_size == 0 {
            return None;
        }
        Some(self.original_size as f64 / self.compressed_size as f64)
    }
}

impl Display for CompressionReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Original: {}, Compressed: {}",
            format_file_size(self.original_size),
            format_file_size(self.compressed_size)
        )?;
        if let Some(ratio) = self.ratio() {
            write!(f, ", Ratio: {:.2} : 1", ratio)?;
        }
        if let Some(error) = self.mean_squared_error {
            write!(
                f,
                ", MSE: {:.2}, PSNR: {:.2} dB",
                error,
                peak_signal_to_noise_ratio(error)
            )?;
        }
        Ok(())
    }
}

/// Human readable size with at most one decimal, e.g. `1.5 KB`.
pub fn format_file_size(size: u64) -> String {
    if size == 0 {
        return String::from("0 B");
    }
    let digit_groups = ((size as f64).log10() / 1024_f64.log10()) as usize;
    let digit_groups = digit_groups.min(SIZE_UNITS.len() - 1);
    let value = size as f64 / 1024_f64.powi(digit_groups as i32);
    let rounded = (value * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{:.0} {}", rounded, SIZE_UNITS[digit_groups])
    } else {
        format!("{:.1} {}", rounded, SIZE_UNITS[digit_groups])
    }
}

pub fn mean_squared_error(original: &RasterBuffer, reconstructed: &RasterBuffer) -> Result<f64> {
    if !original.same_shape(reconstructed) {
        return Err(Error::RasterDimensionMismatch);
    }
    let sum = original
        .samples()
        .iter()
        .zip(reconstructed.samples())
        .map(|(&a, &b)| {
            let difference = a as f64 - b as f64;
            difference * difference
        })
        .sum::<f64>();
    Ok(sum / original.samples().len() as f64)
}

/// PSNR in decibels for 8 bit samples, infinite for identical rasters.
pub fn peak_signal_to_noise_ratio(mean_squared_error: f64) -> f64 {
    if mean_squared_error == 0.0 {
        return f64::INFINITY;
    }
    10.0 * (255.0 * 255.0 / mean_squared_error).log10()
}
