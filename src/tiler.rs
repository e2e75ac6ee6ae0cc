use std::slice::ChunksExact;

use clap::{builder::PossibleValue, ValueEnum};

use crate::error::{GeometryError, UnsupportedParameter};
use crate::raster::{check_dimensions, RasterBuffer};
use crate::Result;

/// Edge length of the square tiles an image is cut into.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TileSize {
    Two,
    Four,
    Eight,
    Sixteen,
}

impl TileSize {
    pub fn edge_length(&self) -> u32 {
        match self {
            Self::Two => 2,
            Self::Four => 4,
            Self::Eight => 8,
            Self::Sixteen => 16,
        }
    }

    /// `length` rounded up to whole tiles, `None` if that no longer fits a `u32`.
    pub fn padded_length(&self, length: u32) -> Option<u32> {
        let edge = self.edge_length();
        length.div_ceil(edge).checked_mul(edge)
    }
}

impl TryFrom<u32> for TileSize {
    type Error = UnsupportedParameter;

    fn try_from(value: u32) -> std::result::Result<Self, Self::Error> {
        match value {
            2 => Ok(Self::Two),
            4 => Ok(Self::Four),
            8 => Ok(Self::Eight),
            16 => Ok(Self::Sixteen),
            _ => Err(UnsupportedParameter::TileSize(value)),
        }
    }
}

impl ValueEnum for TileSize {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Two, Self::Four, Self::Eight, Self::Sixteen]
    }

    fn to_possible_value(&self) -> Option<PossibleValue> {
        match self {
            Self::Two => Some(PossibleValue::new("2")),
            Self::Four => Some(PossibleValue::new("4")),
            Self::Eight => Some(PossibleValue::new("8")),
            Self::Sixteen => Some(PossibleValue::new("16")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileGeometry {
    width: u32,
    height: u32,
    channels: u8,
    tile_size: TileSize,
}

impl TileGeometry {
    pub fn new(width: u32, height: u32, channels: u8, tile_size: TileSize) -> Result<Self> {
        check_dimensions(width, height, channels)?;
        if tile_size.padded_length(width).is_none() || tile_size.padded_length(height).is_none() {
            return Err(GeometryError::PaddedSizeOverflow {
                width,
                height,
                edge_length: tile_size.edge_length(),
            }
            .into());
        }
        Ok(Self {
            width,
            height,
            channels,
            tile_size,
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

    pub fn tile_size(&self) -> TileSize {
        self.tile_size
    }

    pub fn tile_columns(&self) -> u32 {
        self.width.div_ceil(self.tile_size.edge_length())
    }

    pub fn tile_rows(&self) -> u32 {
        self.height.div_ceil(self.tile_size.edge_length())
    }

    pub fn tile_count(&self) -> usize {
        self.tile_columns() as usize * self.tile_rows() as usize
    }

    pub fn padded_width(&self) -> u32 {
        self.tile_columns() * self.tile_size.edge_length()
    }

    pub fn padded_height(&self) -> u32 {
        self.tile_rows() * self.tile_size.edge_length()
    }

    /// Number of samples in one tile vector.
    pub fn dimension(&self) -> usize {
        let edge = self.tile_size.edge_length() as usize;
        edge * edge * self.channels as usize
    }
}

/// Tile vectors of equal dimension, stored back to back in raster order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TileVectors {
    dimension: usize,
    samples: Vec<u8>,
}

impl TileVectors {
    pub fn new(dimension: usize, samples: Vec<u8>) -> std::result::Result<Self, GeometryError> {
        if dimension == 0 || samples.len() % dimension != 0 {
            return Err(GeometryError::VectorDimensionMismatch {
                expected: dimension,
                actual: samples.len(),
            });
        }
        Ok(Self { dimension, samples })
    }

    fn with_capacity(dimension: usize, count: usize) -> Self {
        Self {
            dimension,
            samples: Vec::with_capacity(dimension * count),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.samples.len() / self.dimension
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn get(&self, index: usize) -> &[u8] {
        let start = index * self.dimension;
        &self.samples[start..start + self.dimension]
    }

    pub fn iter(&self) -> ChunksExact<'_, u8> {
        self.samples.chunks_exact(self.dimension)
    }

    pub(crate) fn push(&mut self, vector: &[u8]) {
        debug_assert_eq!(vector.len(), self.dimension);
        self.samples.extend_from_slice(vector);
    }
}

/// Cuts the raster into tiles, replicating the last row and column into
/// the padding of tiles that reach over the border.
pub fn partition(
    raster: &RasterBuffer,
    tile_size: TileSize,
) -> Result<(TileGeometry, TileVectors)> {
    let geometry = TileGeometry::new(raster.width(), raster.height(), raster.channels(), tile_size)?;
    let edge = tile_size.edge_length();
    let mut tile_vectors = TileVectors::with_capacity(geometry.dimension(), geometry.tile_count());
    let mut vector = Vec::with_capacity(geometry.dimension());
    for tile_row in 0..geometry.tile_rows() {
        for tile_column in 0..geometry.tile_columns() {
            vector.clear();
            for y in 0..edge {
                for x in 0..edge {
                    let pixel = raster.pixel_clamped(tile_column * edge + x, tile_row * edge + y);
                    vector.extend_from_slice(pixel);
                }
            }
            tile_vectors.push(&vector);
        }
    }
    Ok((geometry, tile_vectors))
}

pub fn reassemble(geometry: &TileGeometry, tile_vectors: &TileVectors) -> Result<RasterBuffer> {
    let padded = reassemble_padded(geometry, tile_vectors)?;
    crop(geometry, &padded)
}

/// Writes the tiles back into a raster of the padded size.
pub fn reassemble_padded(
    geometry: &TileGeometry,
    tile_vectors: &TileVectors,
) -> Result<RasterBuffer> {
    check_tile_vectors(geometry, tile_vectors)?;
    let channels = geometry.channels as usize;
    let edge = geometry.tile_size.edge_length() as usize;
    let padded_width = geometry.padded_width() as usize;
    let tile_columns = geometry.tile_columns() as usize;
    let tile_row_length = edge * channels;
    let mut samples = vec![0; padded_width * geometry.padded_height() as usize * channels];
    for (tile_index, vector) in tile_vectors.iter().enumerate() {
        let tile_row = tile_index / tile_columns;
        let tile_column = tile_index % tile_columns;
        for (y, row) in vector.chunks_exact(tile_row_length).enumerate() {
            let start = ((tile_row * edge + y) * padded_width + tile_column * edge) * channels;
            samples[start..start + tile_row_length].copy_from_slice(row);
        }
    }
    RasterBuffer::new(
        geometry.padded_width(),
        geometry.padded_height(),
        geometry.channels,
        samples,
    )
}

/// Drops the padding, leaving the original width and height.
pub fn crop(geometry: &TileGeometry, padded: &RasterBuffer) -> Result<RasterBuffer> {
    padded.crop(geometry.width, geometry.height)
}

fn check_tile_vectors(
    geometry: &TileGeometry,
    tile_vectors: &TileVectors,
) -> std::result::Result<(), GeometryError> {
    if tile_vectors.dimension() != geometry.dimension() {
        return Err(GeometryError::VectorDimensionMismatch {
            expected: geometry.dimension(),
            actual: tile_vectors.dimension(),
        });
    }
    if tile_vectors.len() != geometry.tile_count() {
        return Err(GeometryError::TileCountMismatch {
            expected: geometry.tile_count(),
            actual: tile_vectors.len(),
        });
    }
    Ok(())
}
