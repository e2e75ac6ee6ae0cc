use crate::error::{Error, UnsupportedParameter};
use crate::Result;

pub mod netpbm;

pub trait RasterReader {
    fn read_raster(&mut self) -> Result<RasterBuffer>;
}

pub trait RasterWriter {
    fn write_raster(&mut self, raster: &RasterBuffer) -> Result<()>;
}

/// Interleaved 8 bit samples of an image, row by row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RasterBuffer {
    width: u32,
    height: u32,
    channels: u8,
    samples: Vec<u8>,
}

impl RasterBuffer {
    pub fn new(width: u32, height: u32, channels: u8, samples: Vec<u8>) -> Result<Self> {
        check_dimensions(width, height, channels)?;
        let expected = width as usize * height as usize * channels as usize;
        if samples.len() != expected {
            return Err(Error::RasterSizeMismatch {
                expected,
                actual: samples.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            samples,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    /// Samples of the pixel at the given position.
    ///
    /// Positions outside of the raster are clamped onto the nearest edge
    /// pixel, which yields edge replicating padding for free.
    pub fn pixel_clamped(&self, column_index: u32, row_index: u32) -> &[u8] {
        let column_index = column_index.min(self.width - 1) as usize;
        let row_index = row_index.min(self.height - 1) as usize;
        let channels = self.channels as usize;
        let start = (row_index * self.width as usize + column_index) * channels;
        &self.samples[start..start + channels]
    }

    pub fn same_shape(&self, other: &RasterBuffer) -> bool {
        self.width == other.width && self.height == other.height && self.channels == other.channels
    }

    /// Copy of the top left `width` x `height` region.
    pub fn crop(&self, width: u32, height: u32) -> Result<RasterBuffer> {
        if width > self.width || height > self.height {
            return Err(Error::RasterDimensionMismatch);
        }
        let channels = self.channels as usize;
        let row_length = width as usize * channels;
        let stride = self.width as usize * channels;
        let mut samples = Vec::with_capacity(row_length * height as usize);
        for row in self.samples.chunks_exact(stride).take(height as usize) {
            samples.extend_from_slice(&row[..row_length]);
        }
        RasterBuffer::new(width, height, self.channels, samples)
    }
}

pub(crate) fn check_dimensions(width: u32, height: u32, channels: u8) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(UnsupportedParameter::EmptyRaster { width, height }.into());
    }
    if channels != 1 && channels != 3 {
        return Err(UnsupportedParameter::Channels(channels).into());
    }
    Ok(())
}
