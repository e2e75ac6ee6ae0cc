use std::slice::ChunksExact;
use std::sync::Arc;

use clap::{builder::PossibleValue, ValueEnum};

use crate::cancellation::Outcome;
use crate::error::{GeometryError, UnsupportedParameter};
use crate::quantizer::Quantizer;
use crate::tiler::TileVectors;
use crate::Result;

pub mod lbg;

/// Quality preset, each level mapping onto a fixed codebook size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Quality {
    Low,
    Medium,
    High,
}

impl Quality {
    pub fn codebook_size(&self) -> usize {
        match self {
            Self::Low => 64,
            Self::Medium => 128,
            Self::High => 256,
        }
    }
}

impl TryFrom<u32> for Quality {
    type Error = UnsupportedParameter;

    fn try_from(value: u32) -> std::result::Result<Self, Self::Error> {
        match value {
            64 => Ok(Self::Low),
            128 => Ok(Self::Medium),
            256 => Ok(Self::High),
            _ => Err(UnsupportedParameter::CodebookSize(value)),
        }
    }
}

impl ValueEnum for Quality {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::High, Self::Medium, Self::Low]
    }

    fn to_possible_value(&self) -> Option<PossibleValue> {
        match self {
            Self::High => Some(PossibleValue::new("High").help("256 codebook entries")),
            Self::Medium => Some(PossibleValue::new("Medium").help("128 codebook entries")),
            Self::Low => Some(PossibleValue::new("Low").help("64 codebook entries")),
        }
    }
}

/// Representative tile vectors of one image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Codebook {
    dimension: usize,
    vectors: Vec<u8>,
}

impl Codebook {
    /// Code vectors are stored back to back; at most 256 of them so every
    /// index fits into one byte.
    pub fn new(dimension: usize, vectors: Vec<u8>) -> Result<Self> {
        if dimension == 0 || vectors.len() % dimension != 0 {
            return Err(GeometryError::VectorDimensionMismatch {
                expected: dimension,
                actual: vectors.len(),
            }
            .into());
        }
        let count = vectors.len() / dimension;
        if count == 0 || count > u8::MAX as usize + 1 {
            return Err(UnsupportedParameter::CodebookSize(count as u32).into());
        }
        Ok(Self { dimension, vectors })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.vectors.len() / self.dimension
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn vector(&self, index: usize) -> &[u8] {
        let start = index * self.dimension;
        &self.vectors[start..start + self.dimension]
    }

    pub fn iter(&self) -> ChunksExact<'_, u8> {
        self.vectors.chunks_exact(self.dimension)
    }

    pub fn samples(&self) -> &[u8] {
        &self.vectors
    }
}

/// How the codebook is chosen from the tiles of an image.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Initializer {
    /// Tiles picked at a uniform stride over the raster order.
    #[default]
    StrideSample,
    /// Stride sampled seeds, refined by Linde-Buzo-Gray iterations.
    LbgRefine {
        max_iterations: u32,
        convergence_epsilon: f64,
    },
}

impl Initializer {
    pub fn validate(&self) -> Result<()> {
        if let Self::LbgRefine {
            convergence_epsilon,
            ..
        } = self
        {
            if !convergence_epsilon.is_finite() || *convergence_epsilon < 0.0 {
                return Err(UnsupportedParameter::ConvergenceEpsilon(*convergence_epsilon).into());
            }
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InitializerKind {
    StrideSample,
    LbgRefine,
}

impl ValueEnum for InitializerKind {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::StrideSample, Self::LbgRefine]
    }

    fn to_possible_value(&self) -> Option<PossibleValue> {
        match self {
            Self::StrideSample => Some(PossibleValue::new("StrideSample")),
            Self::LbgRefine => Some(PossibleValue::new("LBGRefine")),
        }
    }
}

/// Picks `size` tiles at a uniform stride. With fewer tiles than entries the
/// selection wraps around, so the codebook always has the requested size.
pub fn stride_sample(tile_vectors: &TileVectors, size: usize) -> Result<Codebook> {
    let tile_count = tile_vectors.len();
    if tile_count == 0 {
        return Err(GeometryError::TileCountMismatch {
            expected: 1,
            actual: 0,
        }
        .into());
    }
    let mut vectors = Vec::with_capacity(size * tile_vectors.dimension());
    for entry in 0..size {
        let tile_index = if tile_count >= size {
            entry * tile_count / size
        } else {
            entry % tile_count
        };
        vectors.extend_from_slice(tile_vectors.get(tile_index));
    }
    Codebook::new(tile_vectors.dimension(), vectors)
}

pub struct CodebookBuilder<'a> {
    initializer: Initializer,
    quantizer: &'a Quantizer<'a>,
}

impl<'a> CodebookBuilder<'a> {
    pub fn new(initializer: Initializer, quantizer: &'a Quantizer<'a>) -> Self {
        CodebookBuilder {
            initializer,
            quantizer,
        }
    }

    pub fn build(
        &self,
        tile_vectors: &Arc<TileVectors>,
        quality: Quality,
    ) -> Result<Outcome<Codebook>> {
        let seeds = stride_sample(tile_vectors, quality.codebook_size())?;
        log::info!(
            "Sampled {} code vectors from {} tiles",
            seeds.len(),
            tile_vectors.len()
        );
        match self.initializer {
            Initializer::StrideSample => Ok(Outcome::Completed(seeds)),
            Initializer::LbgRefine {
                max_iterations,
                convergence_epsilon,
            } => lbg::refine(
                seeds,
                tile_vectors,
                self.quantizer,
                max_iterations,
                convergence_epsilon,
            ),
        }
    }
}
