use std::fmt::Display;
use std::io;

#[derive(Debug)]
pub enum Error {
    Geometry(GeometryError),
    Format(FormatError),
    IndexOutOfRange {
        position: usize,
        index: u8,
        codebook_size: usize,
    },
    UnsupportedParameter(UnsupportedParameter),
    RasterSizeMismatch {
        expected: usize,
        actual: usize,
    },
    RasterDimensionMismatch,
    QuantizerWorkerLost {
        expected: usize,
        received: usize,
    },
    NetpbmFileDoesNotContainRequiredToken(&'static str),
    ParsingOfTokenFailed(&'static str),
    UnsupportedNetpbmMagic(String),
    InvalidMaxValue(u32),
    SampleExceedsMaxValue(u16, u16),
    RasterTooLarge {
        width: u32,
        height: u32,
        channels: u8,
    },
    MismatchOfSizeBetweenHeaderAndValues,
    FailedToReadRasterData(io::Error),
    FailedToWriteRaster(io::Error),
    UnableToOpenInputFileForReading(String, io::Error),
    UnableToOpenOutputFileForWriting(String, io::Error),
    FailedToReadInputFile(String, io::Error),
    FailedToWriteHeader(io::Error),
    FailedToWriteCodebook(io::Error),
    FailedToWriteIndices(io::Error),
    FailedToPersistArtifact(String, io::Error),
}

/// Tile layout does not match the geometry it is supposed to describe.
#[derive(Debug, PartialEq, Eq)]
pub enum GeometryError {
    TileCountMismatch { expected: usize, actual: usize },
    VectorDimensionMismatch { expected: usize, actual: usize },
    PaddedSizeOverflow {
        width: u32,
        height: u32,
        edge_length: u32,
    },
}

/// A compressed artifact that can not be decoded.
#[derive(Debug, PartialEq, Eq)]
pub enum FormatError {
    Truncated {
        section: &'static str,
        needed: usize,
        available: usize,
    },
    BadMagic([u8; 4]),
    UnsupportedVersion(u8),
    InvalidHeaderField {
        field: &'static str,
        value: u32,
    },
    LengthMismatch {
        expected: u64,
        actual: u64,
    },
}

#[derive(Debug, PartialEq)]
pub enum UnsupportedParameter {
    TileSize(u32),
    CodebookSize(u32),
    Channels(u8),
    EmptyRaster { width: u32, height: u32 },
    ConvergenceEpsilon(f64),
    Threads(usize),
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Geometry(error) => write!(f, "Geometry error: {}", error),
            Self::Format(error) => write!(f, "Malformed artifact: {}", error),
            Self::IndexOutOfRange {
                position,
                index,
                codebook_size,
            } => {
                write!(
                    f,
                    "Index {} of tile {} is outside of the codebook with {} entries",
                    index, position, codebook_size
                )
            }
            Self::UnsupportedParameter(parameter) => {
                write!(f, "Unsupported parameter: {}", parameter)
            }
            Self::RasterSizeMismatch { expected, actual } => {
                write!(
                    f,
                    "Raster holds {} samples, but its dimensions require {}",
                    actual, expected
                )
            }
            Self::RasterDimensionMismatch => {
                write!(f, "Rasters differ in width, height or channel count")
            }
            Self::QuantizerWorkerLost { expected, received } => {
                write!(
                    f,
                    "Quantizer worker lost. Expected {} batches, but received {}.",
                    expected, received
                )
            }
            Self::NetpbmFileDoesNotContainRequiredToken(token_name) => {
                write!(f, "Expected token '{}' not found in Netpbm file", token_name)
            }
            Self::ParsingOfTokenFailed(token_name) => {
                write!(f, "Parsing of token '{}' failed", token_name)
            }
            Self::UnsupportedNetpbmMagic(magic) => {
                write!(
                    f,
                    "Netpbm format '{}' is not supported, expected P2, P3, P5 or P6",
                    magic
                )
            }
            Self::InvalidMaxValue(max_value) => {
                write!(f, "Max value {} is outside of 1..=65535", max_value)
            }
            Self::SampleExceedsMaxValue(sample, max_value) => {
                write!(f, "Sample {} exceeds max value {}", sample, max_value)
            }
            Self::RasterTooLarge {
                width,
                height,
                channels,
            } => {
                write!(
                    f,
                    "Raster of {}x{} with {} channels is too large to be held in memory",
                    width, height, channels
                )
            }
            Self::MismatchOfSizeBetweenHeaderAndValues => {
                write!(
                    f,
                    "Number of samples does not match the size provided in header"
                )
            }
            Self::FailedToReadRasterData(error) => {
                write!(f, "Failed to read raster data: {}", error)
            }
            Self::FailedToWriteRaster(error) => write!(f, "Failed to write raster: {}", error),
            Self::UnableToOpenInputFileForReading(path, error) => {
                write!(
                    f,
                    "Unable to open input file '{}' for reading: {}",
                    path, error
                )
            }
            Self::UnableToOpenOutputFileForWriting(path, error) => {
                write!(
                    f,
                    "Unable to open output file '{}' for writing: {}",
                    path, error
                )
            }
            Self::FailedToReadInputFile(path, error) => {
                write!(f, "Failed to read input file '{}': {}", path, error)
            }
            Self::FailedToWriteHeader(error) => {
                write!(f, "Failed to write artifact header: {}", error)
            }
            Self::FailedToWriteCodebook(error) => write!(f, "Failed to write codebook: {}", error),
            Self::FailedToWriteIndices(error) => write!(f, "Failed to write indices: {}", error),
            Self::FailedToPersistArtifact(path, error) => {
                write!(f, "Failed to persist artifact '{}': {}", path, error)
            }
        }
    }
}

impl Display for GeometryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TileCountMismatch { expected, actual } => {
                write!(f, "Expected {} tiles, but got {}", expected, actual)
            }
            Self::VectorDimensionMismatch { expected, actual } => {
                write!(
                    f,
                    "Expected vectors of {} samples, but got {}",
                    expected, actual
                )
            }
            Self::PaddedSizeOverflow {
                width,
                height,
                edge_length,
            } => {
                write!(
                    f,
                    "Padding {}x{} to whole tiles of {} exceeds the supported size",
                    width, height, edge_length
                )
            }
        }
    }
}

impl Display for FormatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Truncated {
                section,
                needed,
                available,
            } => {
                write!(
                    f,
                    "{} truncated, needed {} bytes but only {} are left",
                    section, needed, available
                )
            }
            Self::BadMagic(magic) => write!(f, "Unknown magic bytes {:02X?}", magic),
            Self::UnsupportedVersion(version) => {
                write!(f, "Unsupported format version {}", version)
            }
            Self::InvalidHeaderField { field, value } => {
                write!(f, "Header field '{}' has invalid value {}", field, value)
            }
            Self::LengthMismatch { expected, actual } => {
                write!(
                    f,
                    "Header describes {} bytes, but the artifact has {}",
                    expected, actual
                )
            }
        }
    }
}

impl Display for UnsupportedParameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TileSize(size) => {
                write!(f, "Tile size {} is not one of 2, 4, 8, 16", size)
            }
            Self::CodebookSize(size) => {
                write!(f, "Codebook size {} is not one of 64, 128, 256", size)
            }
            Self::Channels(channels) => {
                write!(f, "{} channels given, expected 1 or 3", channels)
            }
            Self::EmptyRaster { width, height } => {
                write!(f, "Raster of {}x{} has no pixels", width, height)
            }
            Self::ConvergenceEpsilon(epsilon) => {
                write!(
                    f,
                    "Convergence epsilon {} must be a finite, non negative number",
                    epsilon
                )
            }
            Self::Threads(threads) => write!(f, "{} threads requested, need at least 1", threads),
        }
    }
}

impl std::error::Error for Error {}

impl From<GeometryError> for Error {
    fn from(value: GeometryError) -> Self {
        Self::Geometry(value)
    }
}

impl From<FormatError> for Error {
    fn from(value: FormatError) -> Self {
        Self::Format(value)
    }
}

impl From<UnsupportedParameter> for Error {
    fn from(value: UnsupportedParameter) -> Self {
        Self::UnsupportedParameter(value)
    }
}
