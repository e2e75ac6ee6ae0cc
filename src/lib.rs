use std::{
    ffi::OsString,
    fs::{self, File, OpenOptions},
    io::{BufReader, BufWriter, Read, Write},
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

use clap::{builder::PossibleValue, ValueEnum};
use threadpool::ThreadPool;

pub use cancellation::{CancellationToken, Outcome};
pub use cli::CLIParser;
use codebook::InitializerKind;
pub use codebook::{Initializer, Quality};
use error::{Error, UnsupportedParameter};
pub use pipeline::{compress, decompress, CompressionOptions, Compressor};
pub use raster::RasterBuffer;
use raster::{
    netpbm::{NetpbmRasterReader, NetpbmRasterWriter},
    RasterReader, RasterWriter,
};
pub use statistics::CompressionReport;
pub use tiler::TileSize;

pub mod cancellation;
mod cli;
pub mod codebook;
pub mod codec;
pub mod decoder;
pub mod error;
mod logger;
pub mod pipeline;
pub mod quantizer;
pub mod raster;
pub mod statistics;
pub mod tiler;

pub type Result<T> = std::result::Result<T, error::Error>;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Mode {
    Compress,
    Decompress,
}

impl ValueEnum for Mode {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Compress, Self::Decompress]
    }

    fn to_possible_value(&self) -> Option<PossibleValue> {
        match self {
            Self::Compress => Some(PossibleValue::new("Compress")),
            Self::Decompress => Some(PossibleValue::new("Decompress")),
        }
    }
}

pub struct Arguments {
    mode: Mode,
    input_file: PathBuf,
    output_file: PathBuf,
    tile_size: TileSize,
    quality: Quality,
    initializer: InitializerKind,
    max_iterations: u32,
    convergence_epsilon: f64,
    number_of_threads: usize,
    preview_file: Option<PathBuf>,
    time_limit: Option<Duration>,
}

impl Arguments {
    pub fn mode(&self) -> Mode {
        self.mode
    }

    fn initializer(&self) -> Initializer {
        match self.initializer {
            InitializerKind::StrideSample => Initializer::StrideSample,
            InitializerKind::LbgRefine => Initializer::LbgRefine {
                max_iterations: self.max_iterations,
                convergence_epsilon: self.convergence_epsilon,
            },
        }
    }
}

impl TryFrom<&Arguments> for CompressionOptions {
    type Error = Error;

    fn try_from(value: &Arguments) -> Result<Self> {
        CompressionOptions::new(value.tile_size, value.quality).with_initializer(value.initializer())
    }
}

fn path_name(file_path: &Path) -> String {
    file_path.display().to_string()
}

fn open_input_file(file_path: &Path) -> Result<File> {
    File::open(file_path)
        .map_err(|e| Error::UnableToOpenInputFileForReading(path_name(file_path), e))
}

fn open_output_file(file_path: &Path) -> Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(file_path)
        .map_err(|e| Error::UnableToOpenOutputFileForWriting(path_name(file_path), e))
}

fn read_raster_file(file_path: &Path) -> Result<(RasterBuffer, u64)> {
    let input_file = open_input_file(file_path)?;
    let file_size = input_file
        .metadata()
        .map_err(|e| Error::FailedToReadInputFile(path_name(file_path), e))?
        .len();
    let raster = NetpbmRasterReader::new(BufReader::new(&input_file)).read_raster()?;
    Ok((raster, file_size))
}

fn write_raster_file(file_path: &Path, raster: &RasterBuffer) -> Result<()> {
    let output_file = open_output_file(file_path)?;
    let mut writer = NetpbmRasterWriter::new(BufWriter::new(&output_file));
    writer.write_raster(raster)
}

fn read_artifact_file(file_path: &Path) -> Result<Vec<u8>> {
    let mut input_file = open_input_file(file_path)?;
    let mut bytes = Vec::new();
    input_file
        .read_to_end(&mut bytes)
        .map_err(|e| Error::FailedToReadInputFile(path_name(file_path), e))?;
    Ok(bytes)
}

/// Sibling file the artifact is written to before it is renamed into
/// place. Removed again unless committed.
struct PartialFile {
    path: PathBuf,
    committed: bool,
}

impl PartialFile {
    fn new(final_path: &Path) -> Self {
        let mut file_name = final_path
            .file_name()
            .map(OsString::from)
            .unwrap_or_default();
        file_name.push(".partial");
        Self {
            path: final_path.with_file_name(file_name),
            committed: false,
        }
    }

    fn commit(mut self, final_path: &Path) -> Result<()> {
        fs::rename(&self.path, final_path)
            .map_err(|e| Error::FailedToPersistArtifact(path_name(final_path), e))?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.path);
        }
    }
}

fn persist_artifact(file_path: &Path, bytes: &[u8]) -> Result<()> {
    let persist_error = |e: std::io::Error| Error::FailedToPersistArtifact(path_name(file_path), e);
    let partial_file = PartialFile::new(file_path);
    let mut writer = BufWriter::new(open_output_file(&partial_file.path)?);
    writer.write_all(bytes).map_err(persist_error)?;
    let output_file = writer
        .into_inner()
        .map_err(|e| persist_error(e.into_error()))?;
    output_file.sync_all().map_err(persist_error)?;
    drop(output_file);
    partial_file.commit(file_path)
}

fn cancel_after(time_limit: Duration, cancellation: CancellationToken) {
    thread::spawn(move || {
        thread::sleep(time_limit);
        log::warn!("Time limit of {:?} reached, cancelling", time_limit);
        cancellation.cancel();
    });
}

pub fn compress_image_file(arguments: &Arguments) -> Result<Outcome<CompressionReport>> {
    compress_image_file_with_cancellation(arguments, &CancellationToken::new())
}

/// Like [`compress_image_file`], but stops once `cancellation` is raised. An
/// aborted run leaves neither the artifact nor a partial file behind.
pub fn compress_image_file_with_cancellation(
    arguments: &Arguments,
    cancellation: &CancellationToken,
) -> Result<Outcome<CompressionReport>> {
    let options = CompressionOptions::try_from(arguments)?;
    if arguments.number_of_threads == 0 {
        return Err(UnsupportedParameter::Threads(arguments.number_of_threads).into());
    }
    let (raster, original_size) = read_raster_file(&arguments.input_file)?;
    let threadpool = ThreadPool::new(arguments.number_of_threads);
    if let Some(time_limit) = arguments.time_limit {
        cancel_after(time_limit, cancellation.clone());
    }
    let compressor = Compressor::new(&options)
        .with_threadpool(&threadpool)
        .with_cancellation(cancellation);
    let bytes = match compressor.compress(&raster)? {
        Outcome::Completed(bytes) => bytes,
        Outcome::Aborted => {
            log::warn!("Compression aborted, no artifact written");
            return Ok(Outcome::Aborted);
        }
    };
    persist_artifact(&arguments.output_file, &bytes)?;

    let mean_squared_error = match &arguments.preview_file {
        Some(preview_file) => {
            let preview = decompress(&bytes)?;
            write_raster_file(preview_file, &preview)?;
            Some(statistics::mean_squared_error(&raster, &preview)?)
        }
        None => None,
    };
    Ok(Outcome::Completed(CompressionReport {
        original_size,
        compressed_size: bytes.len() as u64,
        mean_squared_error,
    }))
}

pub fn decompress_artifact_file(arguments: &Arguments) -> Result<()> {
    let bytes = read_artifact_file(&arguments.input_file)?;
    let raster = decompress(&bytes)?;
    write_raster_file(&arguments.output_file, &raster)
}
