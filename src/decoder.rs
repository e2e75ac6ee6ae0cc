use crate::codec::CompressedArtifact;
use crate::error::Error;
use crate::pipeline::Stage;
use crate::raster::RasterBuffer;
use crate::tiler::{self, TileVectors};
use crate::Result;

/// Expands every index into its code vector and reassembles the raster.
pub fn decode(artifact: &CompressedArtifact) -> Result<RasterBuffer> {
    let tile_vectors = look_up_tile_vectors(artifact)?;
    let padded = tiler::reassemble_padded(artifact.geometry(), &tile_vectors)?;
    Stage::Reassembled.enter();
    let raster = tiler::crop(artifact.geometry(), &padded)?;
    Stage::Cropped.enter();
    Ok(raster)
}

fn look_up_tile_vectors(artifact: &CompressedArtifact) -> Result<TileVectors> {
    let codebook = artifact.codebook();
    let mut samples = Vec::with_capacity(artifact.indices().len() * codebook.dimension());
    for (position, &index) in artifact.indices().iter().enumerate() {
        if index as usize >= codebook.len() {
            return Err(Error::IndexOutOfRange {
                position,
                index,
                codebook_size: codebook.len(),
            });
        }
        samples.extend_from_slice(codebook.vector(index as usize));
    }
    Ok(TileVectors::new(codebook.dimension(), samples)?)
}

#[cfg(test)]
mod test {
    use super::decode;
    use crate::{
        codec::CompressedArtifact,
        codebook::Codebook,
        error::Error,
        quantizer::IndexStream,
        tiler::{TileGeometry, TileSize},
    };

    fn create_test_codebook() -> Codebook {
        let samples = (0..64_u8).flat_map(|index| [index; 4]).collect();
        Codebook::new(4, samples).unwrap()
    }

    #[test]
    fn decode_and_crop() {
        let geometry = TileGeometry::new(3, 2, 1, TileSize::Two).unwrap();
        let artifact =
            CompressedArtifact::new(geometry, create_test_codebook(), IndexStream::new(vec![7, 9]));
        let raster = decode(&artifact).unwrap();
        assert_eq!(raster.width(), 3);
        assert_eq!(raster.height(), 2);
        assert_eq!(raster.samples(), &[7, 7, 9, 7, 7, 9]);
    }

    #[test]
    fn reject_index_out_of_range() {
        let geometry = TileGeometry::new(4, 2, 1, TileSize::Two).unwrap();
        let artifact = CompressedArtifact::new(
            geometry,
            create_test_codebook(),
            IndexStream::new(vec![3, 64]),
        );
        assert!(matches!(
            decode(&artifact),
            Err(Error::IndexOutOfRange {
                position: 1,
                index: 64,
                codebook_size: 64
            })
        ));
    }
}
