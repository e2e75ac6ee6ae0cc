use std::fmt::Display;
use std::sync::Arc;

use threadpool::ThreadPool;

use crate::cancellation::{completed_or_abort, CancellationToken, Outcome};
use crate::codebook::{CodebookBuilder, Initializer, Quality};
use crate::codec::{self, CompressedArtifact};
use crate::decoder;
use crate::quantizer::Quantizer;
use crate::raster::RasterBuffer;
use crate::tiler::{self, TileSize};
use crate::Result;

/// Steps of compression (`Loaded` to `Serialized`) and decompression
/// (`Deserialized` to `Cropped`), always passed in declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Loaded,
    Tiled,
    CodebookBuilt,
    Quantized,
    Serialized,
    Deserialized,
    Reassembled,
    Cropped,
}

impl Stage {
    pub(crate) fn enter(self) {
        log::info!("Stage: {}", self);
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loaded => write!(f, "Loaded"),
            Self::Tiled => write!(f, "Tiled"),
            Self::CodebookBuilt => write!(f, "Codebook built"),
            Self::Quantized => write!(f, "Quantized"),
            Self::Serialized => write!(f, "Serialized"),
            Self::Deserialized => write!(f, "Deserialized"),
            Self::Reassembled => write!(f, "Reassembled"),
            Self::Cropped => write!(f, "Cropped"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompressionOptions {
    pub tile_size: TileSize,
    pub quality: Quality,
    pub initializer: Initializer,
}

impl CompressionOptions {
    pub fn new(tile_size: TileSize, quality: Quality) -> Self {
        Self {
            tile_size,
            quality,
            initializer: Initializer::StrideSample,
        }
    }

    /// Options from raw numbers, rejecting anything outside the supported
    /// tile and codebook sizes.
    pub fn from_parameters(tile_size: u8, codebook_size: u16) -> Result<Self> {
        let tile_size = TileSize::try_from(tile_size as u32)?;
        let quality = Quality::try_from(codebook_size as u32)?;
        Ok(Self::new(tile_size, quality))
    }

    pub fn with_initializer(self, initializer: Initializer) -> Result<Self> {
        initializer.validate()?;
        Ok(Self {
            initializer,
            ..self
        })
    }
}

pub struct Compressor<'a> {
    options: &'a CompressionOptions,
    threadpool: Option<&'a ThreadPool>,
    cancellation: Option<&'a CancellationToken>,
}

impl<'a> Compressor<'a> {
    pub fn new(options: &'a CompressionOptions) -> Self {
        Compressor {
            options,
            threadpool: None,
            cancellation: None,
        }
    }

    pub fn with_threadpool(self, threadpool: &'a ThreadPool) -> Self {
        Self {
            threadpool: Some(threadpool),
            ..self
        }
    }

    pub fn with_cancellation(self, cancellation: &'a CancellationToken) -> Self {
        Self {
            cancellation: Some(cancellation),
            ..self
        }
    }

    /// Compresses into artifact bytes. Nothing is produced when the run is
    /// cancelled.
    pub fn compress(&self, raster: &RasterBuffer) -> Result<Outcome<Vec<u8>>> {
        let artifact = completed_or_abort!(self.compress_to_artifact(raster)?);
        let bytes = codec::serialize(artifact.geometry(), artifact.codebook(), artifact.indices())?;
        Stage::Serialized.enter();
        Ok(Outcome::Completed(bytes))
    }

    pub fn compress_to_artifact(&self, raster: &RasterBuffer) -> Result<Outcome<CompressedArtifact>> {
        self.options.initializer.validate()?;
        Stage::Loaded.enter();

        let (geometry, tile_vectors) = tiler::partition(raster, self.options.tile_size)?;
        log::info!(
            "{}x{} image cut into {} tiles of {} samples",
            geometry.width(),
            geometry.height(),
            tile_vectors.len(),
            tile_vectors.dimension()
        );
        Stage::Tiled.enter();

        let tile_vectors = Arc::new(tile_vectors);
        let quantizer = Quantizer::new(self.threadpool, self.cancellation);
        let builder = CodebookBuilder::new(self.options.initializer, &quantizer);
        let codebook = completed_or_abort!(builder.build(&tile_vectors, self.options.quality)?);
        Stage::CodebookBuilt.enter();

        let codebook = Arc::new(codebook);
        let indices = completed_or_abort!(quantizer.assign(&tile_vectors, &codebook)?);
        Stage::Quantized.enter();

        let codebook = Arc::try_unwrap(codebook).unwrap_or_else(|shared| (*shared).clone());
        Ok(Outcome::Completed(CompressedArtifact::new(
            geometry, codebook, indices,
        )))
    }
}

/// Compresses with the stride sampled codebook on the calling thread.
pub fn compress(raster: &RasterBuffer, tile_size: u8, codebook_size: u16) -> Result<Vec<u8>> {
    let options = CompressionOptions::from_parameters(tile_size, codebook_size)?;
    match Compressor::new(&options).compress(raster)? {
        Outcome::Completed(bytes) => Ok(bytes),
        Outcome::Aborted => unreachable!("compression without cancellation token never aborts"),
    }
}

pub fn decompress(bytes: &[u8]) -> Result<RasterBuffer> {
    let artifact = codec::deserialize(bytes)?;
    Stage::Deserialized.enter();
    decoder::decode(&artifact)
}
