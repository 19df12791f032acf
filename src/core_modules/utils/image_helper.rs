pub mod image_helper {
    use crate::error::DiffError;
    use image::{ExtendedColorType, ImageEncoder};
    use std::path::Path;

    /// Encodes a raw pixel buffer as an in-memory PNG.
    pub fn encode_png(
        buffer: &[u8],
        width: u32,
        height: u32,
        color: ExtendedColorType,
    ) -> Result<Vec<u8>, image::error::ImageError> {
        let mut bytes = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut bytes);
        encoder.write_image(buffer, width, height, color)?;
        Ok(bytes)
    }

    /// Writes a raw pixel buffer to `path`, picking the codec from the extension.
    pub fn save(
        path: &Path,
        buffer: &[u8],
        width: u32,
        height: u32,
        color: ExtendedColorType,
    ) -> Result<(), DiffError> {
        image::save_buffer(path, buffer, width, height, color).map_err(|source| DiffError::ArtifactWrite {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {

    use super::image_helper::*;
    use image::ExtendedColorType;

    #[test]
    fn encode_white_file() {
        let width = 250u32;
        let height = 160u32;
        let buffer = vec![255u8; (width * height * 3) as usize];

        let bytes = encode_png(&buffer, width, height, ExtendedColorType::Rgb8).expect("Error Encoding File.");
        let decoded = image::load_from_memory(&bytes).expect("Error Decoding File.").to_rgb8();

        assert_eq!(decoded.dimensions(), (width, height));
        assert!(decoded.pixels().all(|p| p.0 == [255, 255, 255]));
    }

    #[test]
    fn save_gradient_file() {
        let width = 256u32;
        let height = 16u32;
        let mut buffer = vec![0u8; (width * height) as usize];
        for row in buffer.chunks_mut(width as usize) {
            for (intensity, value) in row.iter_mut().enumerate() {
                *value = intensity as u8;
            }
        }
        let dir = tempfile::tempdir().expect("Error Creating Dir.");
        let path = dir.path().join("gradient_file.png");

        save(&path, &buffer, width, height, ExtendedColorType::L8).expect("Error Saving File.");

        let reloaded = image::open(&path).expect("Error Opening File.").to_luma8();
        assert_eq!(reloaded.as_raw(), &buffer);
    }

    #[test]
    fn save_into_missing_directory_is_an_artifact_error() {
        let dir = tempfile::tempdir().expect("Error Creating Dir.");
        let path = dir.path().join("nope").join("image_diff.png");

        let err = save(&path, &[0u8; 4], 2, 2, ExtendedColorType::L8).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ArtifactWrite);
    }
}
