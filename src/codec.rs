//! Binary layout of a compressed image, all integers little endian:
//!
//! ```text
//! magic "VQIC" | version u8 | width u32 | height u32 | channels u8 | tile size u8 | codebook size u16
//! codebook size x (tile size^2 x channels) codebook samples
//! tile count x u8 indices, raster order
//! ```

use std::io::Write;

use crate::codebook::{Codebook, Quality};
use crate::error::{Error, FormatError, GeometryError};
use crate::logger::log_section;
use crate::quantizer::IndexStream;
use crate::tiler::{TileGeometry, TileSize};
use crate::Result;

pub const MAGIC: [u8; 4] = *b"VQIC";
pub const VERSION: u8 = 1;
pub const HEADER_LENGTH: usize = 17;

const HEADER_SECTION_NAME: &str = "Header";
const CODEBOOK_SECTION_NAME: &str = "Codebook";
const INDICES_SECTION_NAME: &str = "Indices";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompressedArtifact {
    geometry: TileGeometry,
    codebook: Codebook,
    indices: IndexStream,
}

impl CompressedArtifact {
    pub fn new(geometry: TileGeometry, codebook: Codebook, indices: IndexStream) -> Self {
        Self {
            geometry,
            codebook,
            indices,
        }
    }

    pub fn geometry(&self) -> &TileGeometry {
        &self.geometry
    }

    pub fn codebook(&self) -> &Codebook {
        &self.codebook
    }

    pub fn indices(&self) -> &IndexStream {
        &self.indices
    }

    pub fn into_parts(self) -> (TileGeometry, Codebook, IndexStream) {
        (self.geometry, self.codebook, self.indices)
    }
}

pub fn encoded_length(geometry: &TileGeometry, codebook_size: usize) -> u64 {
    HEADER_LENGTH as u64
        + codebook_size as u64 * geometry.dimension() as u64
        + geometry.tile_count() as u64
}

pub fn serialize(
    geometry: &TileGeometry,
    codebook: &Codebook,
    indices: &IndexStream,
) -> Result<Vec<u8>> {
    check_consistency(geometry, codebook, indices)?;
    let mut bytes = Vec::with_capacity(encoded_length(geometry, codebook.len()) as usize);
    let mut writer = ArtifactWriter::new(&mut bytes);
    writer.write(geometry, codebook, indices)?;
    Ok(bytes)
}

pub fn deserialize(bytes: &[u8]) -> Result<CompressedArtifact> {
    let mut reader = ArtifactReader::new(bytes);
    let (geometry, quality) = reader.read_header()?;
    let expected = encoded_length(&geometry, quality.codebook_size());
    if expected != bytes.len() as u64 {
        return Err(FormatError::LengthMismatch {
            expected,
            actual: bytes.len() as u64,
        }
        .into());
    }
    let codebook_samples = reader.take(
        CODEBOOK_SECTION_NAME,
        quality.codebook_size() * geometry.dimension(),
    )?;
    let codebook = Codebook::new(geometry.dimension(), codebook_samples.to_vec())?;
    let indices = reader.take(INDICES_SECTION_NAME, geometry.tile_count())?;
    Ok(CompressedArtifact::new(
        geometry,
        codebook,
        IndexStream::new(indices.to_vec()),
    ))
}

fn check_consistency(
    geometry: &TileGeometry,
    codebook: &Codebook,
    indices: &IndexStream,
) -> Result<()> {
    Quality::try_from(codebook.len() as u32)?;
    if codebook.dimension() != geometry.dimension() {
        return Err(GeometryError::VectorDimensionMismatch {
            expected: geometry.dimension(),
            actual: codebook.dimension(),
        }
        .into());
    }
    if indices.len() != geometry.tile_count() {
        return Err(GeometryError::TileCountMismatch {
            expected: geometry.tile_count(),
            actual: indices.len(),
        }
        .into());
    }
    Ok(())
}

struct ArtifactWriter<'a, W: Write> {
    writer: &'a mut W,
}

impl<'a, W: Write> ArtifactWriter<'a, W> {
    fn new(writer: &'a mut W) -> Self {
        ArtifactWriter { writer }
    }

    fn write(
        &mut self,
        geometry: &TileGeometry,
        codebook: &Codebook,
        indices: &IndexStream,
    ) -> Result<()> {
        self.write_header(geometry, codebook)?;
        self.write_codebook(codebook)?;
        self.write_indices(indices)?;
        self.writer.flush().map_err(Error::FailedToWriteIndices)
    }

    fn write_header(&mut self, geometry: &TileGeometry, codebook: &Codebook) -> Result<()> {
        let mut header = [0_u8; HEADER_LENGTH];
        header[0..4].copy_from_slice(&MAGIC);
        header[4] = VERSION;
        header[5..9].copy_from_slice(&geometry.width().to_le_bytes());
        header[9..13].copy_from_slice(&geometry.height().to_le_bytes());
        header[13] = geometry.channels();
        header[14] = geometry.tile_size().edge_length() as u8;
        header[15..17].copy_from_slice(&(codebook.len() as u16).to_le_bytes());
        log_section(HEADER_SECTION_NAME, &header);
        self.writer
            .write_all(&header)
            .map_err(Error::FailedToWriteHeader)
    }

    fn write_codebook(&mut self, codebook: &Codebook) -> Result<()> {
        self.writer
            .write_all(codebook.samples())
            .map_err(Error::FailedToWriteCodebook)
    }

    fn write_indices(&mut self, indices: &IndexStream) -> Result<()> {
        self.writer
            .write_all(indices.as_slice())
            .map_err(Error::FailedToWriteIndices)
    }
}

struct ArtifactReader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> ArtifactReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        ArtifactReader { bytes, position: 0 }
    }

    fn take(&mut self, section: &'static str, length: usize) -> Result<&'a [u8]> {
        let available = self.bytes.len() - self.position;
        if length > available {
            return Err(FormatError::Truncated {
                section,
                needed: length,
                available,
            }
            .into());
        }
        let bytes = self.bytes;
        let start = self.position;
        self.position += length;
        Ok(&bytes[start..self.position])
    }

    fn read_header(&mut self) -> Result<(TileGeometry, Quality)> {
        let header = self.take(HEADER_SECTION_NAME, HEADER_LENGTH)?;
        let magic = [header[0], header[1], header[2], header[3]];
        if magic != MAGIC {
            return Err(FormatError::BadMagic(magic).into());
        }
        if header[4] != VERSION {
            return Err(FormatError::UnsupportedVersion(header[4]).into());
        }
        let width = u32::from_le_bytes([header[5], header[6], header[7], header[8]]);
        let height = u32::from_le_bytes([header[9], header[10], header[11], header[12]]);
        let channels = header[13];
        let tile_size = header[14];
        let codebook_size = u16::from_le_bytes([header[15], header[16]]);

        Self::check_field("width", width, width > 0)?;
        Self::check_field("height", height, height > 0)?;
        Self::check_field("channels", channels as u32, channels == 1 || channels == 3)?;
        let tile_size = TileSize::try_from(tile_size as u32).map_err(|_| {
            FormatError::InvalidHeaderField {
                field: "tile size",
                value: tile_size as u32,
            }
        })?;
        let quality = Quality::try_from(codebook_size as u32).map_err(|_| {
            FormatError::InvalidHeaderField {
                field: "codebook size",
                value: codebook_size as u32,
            }
        })?;
        Self::check_field("width", width, tile_size.padded_length(width).is_some())?;
        Self::check_field("height", height, tile_size.padded_length(height).is_some())?;
        let geometry = TileGeometry::new(width, height, channels, tile_size)?;
        Ok((geometry, quality))
    }

    fn check_field(field: &'static str, value: u32, valid: bool) -> Result<()> {
        if !valid {
            return Err(FormatError::InvalidHeaderField { field, value }.into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::{deserialize, serialize, HEADER_LENGTH};
    use crate::{
        codebook::Codebook,
        error::{Error, FormatError, GeometryError},
        quantizer::IndexStream,
        tiler::{TileGeometry, TileSize},
    };

    fn create_test_parts() -> (TileGeometry, Codebook, IndexStream) {
        let geometry = TileGeometry::new(5, 3, 1, TileSize::Two).unwrap();
        let codebook_samples = (0..64 * 4).map(|index| (index % 251) as u8).collect();
        let codebook = Codebook::new(4, codebook_samples).unwrap();
        let indices = IndexStream::new(vec![0, 1, 2, 63, 62, 5]);
        (geometry, codebook, indices)
    }

    #[test]
    fn write_header_layout() {
        let (geometry, codebook, indices) = create_test_parts();
        let bytes = serialize(&geometry, &codebook, &indices).unwrap();
        #[rustfmt::skip]
        let expected_header: &[u8] = &[
            b'V', b'Q', b'I', b'C',
            1,
            5, 0, 0, 0,
            3, 0, 0, 0,
            1,
            2,
            64, 0,
        ];
        assert_eq!(&bytes[..HEADER_LENGTH], expected_header);
        assert_eq!(bytes.len(), HEADER_LENGTH + 64 * 4 + 6);
        assert_eq!(&bytes[bytes.len() - 6..], &[0, 1, 2, 63, 62, 5]);
    }

    #[test]
    fn read_what_was_written() {
        let (geometry, codebook, indices) = create_test_parts();
        let bytes = serialize(&geometry, &codebook, &indices).unwrap();
        let artifact = deserialize(&bytes).unwrap();
        assert_eq!(artifact.into_parts(), (geometry, codebook, indices));
    }

    #[test]
    fn reject_inconsistent_index_count() {
        let (geometry, codebook, _) = create_test_parts();
        let result = serialize(&geometry, &codebook, &IndexStream::new(vec![0; 5]));
        assert!(matches!(
            result,
            Err(Error::Geometry(GeometryError::TileCountMismatch {
                expected: 6,
                actual: 5
            }))
        ));
    }

    #[test]
    fn reject_bad_magic() {
        let (geometry, codebook, indices) = create_test_parts();
        let mut bytes = serialize(&geometry, &codebook, &indices).unwrap();
        bytes[0] = b'X';
        assert!(matches!(
            deserialize(&bytes),
            Err(Error::Format(FormatError::BadMagic(_)))
        ));
    }

    #[test]
    fn reject_unknown_version() {
        let (geometry, codebook, indices) = create_test_parts();
        let mut bytes = serialize(&geometry, &codebook, &indices).unwrap();
        bytes[4] = 2;
        assert!(matches!(
            deserialize(&bytes),
            Err(Error::Format(FormatError::UnsupportedVersion(2)))
        ));
    }

    #[test]
    fn reject_truncated_header() {
        let result = deserialize(b"VQIC\x01\x05");
        assert!(matches!(
            result,
            Err(Error::Format(FormatError::Truncated {
                section: "Header",
                needed: 17,
                available: 6
            }))
        ));
    }

    #[test]
    fn reject_truncated_indices() {
        let (geometry, codebook, indices) = create_test_parts();
        let bytes = serialize(&geometry, &codebook, &indices).unwrap();
        let result = deserialize(&bytes[..bytes.len() - 1]);
        assert!(matches!(
            result,
            Err(Error::Format(FormatError::LengthMismatch { .. }))
        ));
    }

    #[test]
    fn reject_trailing_bytes() {
        let (geometry, codebook, indices) = create_test_parts();
        let mut bytes = serialize(&geometry, &codebook, &indices).unwrap();
        bytes.push(0);
        assert!(matches!(
            deserialize(&bytes),
            Err(Error::Format(FormatError::LengthMismatch { .. }))
        ));
    }

    #[test]
    fn reject_codebook_size_inconsistent_with_length() {
        let (geometry, codebook, indices) = create_test_parts();
        let mut bytes = serialize(&geometry, &codebook, &indices).unwrap();
        bytes[15] = 128;
        assert!(matches!(
            deserialize(&bytes),
            Err(Error::Format(FormatError::LengthMismatch { .. }))
        ));
    }

    #[test]
    fn reject_unsupported_tile_size_field() {
        let (geometry, codebook, indices) = create_test_parts();
        let mut bytes = serialize(&geometry, &codebook, &indices).unwrap();
        bytes[14] = 3;
        assert!(matches!(
            deserialize(&bytes),
            Err(Error::Format(FormatError::InvalidHeaderField {
                field: "tile size",
                value: 3
            }))
        ));
    }

    #[test]
    fn reject_width_that_overflows_when_padded() {
        let (geometry, codebook, indices) = create_test_parts();
        let mut bytes = serialize(&geometry, &codebook, &indices).unwrap();
        bytes[5..9].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(
            deserialize(&bytes),
            Err(Error::Format(FormatError::InvalidHeaderField {
                field: "width",
                value: u32::MAX
            }))
        ));
    }
}
