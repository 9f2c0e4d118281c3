//! Thumbnail decoding from `data:` URLs.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::ImageFormat;

use crate::config::MAX_IMAGE_BYTES;
use crate::error::{Result, WorkOrderError};

/// Longest edge, in pixels, of an embedded thumbnail.
pub const THUMBNAIL_PX: u32 = 96;

/// A decoded RGB thumbnail ready for embedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub width: u32,
    pub height: u32,
    /// Packed 8-bit RGB, row-major.
    pub rgb: Vec<u8>,
}

/// Decode a `data:image/...;base64,...` URL into a thumbnail.
pub fn decode_data_url(url: &str) -> Result<Thumbnail> {
    let (header, payload) = url
        .split_once(',')
        .ok_or_else(|| WorkOrderError::Engine("image data URL has no payload".to_string()))?;
    if !header.starts_with("data:image/") || !header.ends_with(";base64") {
        return Err(WorkOrderError::Engine(format!(
            "unsupported image header '{}'",
            header
        )));
    }

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| WorkOrderError::Engine(format!("invalid base64 image: {}", e)))?;
    let decoded = image::load_from_memory(&bytes)
        .map_err(|e| WorkOrderError::Engine(format!("undecodable image: {}", e)))?;
    let scaled = if decoded.width() > THUMBNAIL_PX || decoded.height() > THUMBNAIL_PX {
        decoded.thumbnail(THUMBNAIL_PX, THUMBNAIL_PX)
    } else {
        decoded
    };
    let rgb = scaled.to_rgb8();

    Ok(Thumbnail {
        width: rgb.width(),
        height: rgb.height(),
        rgb: rgb.into_raw(),
    })
}

/// Encode an uploaded product image as a data URL.
///
/// Only JPEG, PNG and GIF files up to [`MAX_IMAGE_BYTES`] are accepted; the
/// type is taken from the file's signature.
pub fn encode_data_url(bytes: &[u8]) -> Result<String> {
    if bytes.is_empty() {
        return Err(WorkOrderError::validation("Image file is empty"));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(WorkOrderError::validation(format!(
            "Image is {} bytes; the limit is {} bytes",
            bytes.len(),
            MAX_IMAGE_BYTES
        )));
    }
    let mime = match image::guess_format(bytes) {
        Ok(ImageFormat::Jpeg) => "image/jpeg",
        Ok(ImageFormat::Png) => "image/png",
        Ok(ImageFormat::Gif) => "image/gif",
        _ => {
            return Err(WorkOrderError::validation(
                "Select a JPG, PNG or GIF image",
            ))
        }
    };
    Ok(format!("data:{};base64,{}", mime, STANDARD.encode(bytes)))
}

/// Solid-colour PNG as a data URL.
#[cfg(test)]
pub(crate) fn png_data_url(width: u32, height: u32) -> String {
    use image::{Rgb, RgbImage};
    use std::io::Cursor;

    let img = RgbImage::from_pixel(width, height, Rgb([200, 160, 40]));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    format!("data:image/png;base64,{}", STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_encode_accepts_png_and_decodes_back() {
        let url = png_data_url(3, 3);
        let bytes = STANDARD.decode(url.split_once(',').unwrap().1).unwrap();
        let encoded = encode_data_url(&bytes).unwrap();
        assert_eq!(encoded, url);
        assert_eq!(decode_data_url(&encoded).unwrap().width, 3);
    }

    #[test]
    fn test_encode_detects_gif_and_jpeg() {
        let gif = encode_data_url(b"GIF89a\x01\x00\x01\x00").unwrap();
        assert!(gif.starts_with("data:image/gif;base64,"));
        let jpeg = encode_data_url(&[0xFF, 0xD8, 0xFF, 0xE0, 0, 0x10]).unwrap();
        assert!(jpeg.starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn test_encode_rejects_other_files() {
        let err = encode_data_url(b"plain text, not an image").unwrap_err();
        assert_eq!(err.code(), ErrorCode::Validation);
        assert_eq!(encode_data_url(&[]).unwrap_err().code(), ErrorCode::Validation);
    }

    #[test]
    fn test_encode_rejects_oversized_file() {
        let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
        bytes.resize(MAX_IMAGE_BYTES + 1, 0);
        let err = encode_data_url(&bytes).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Validation);
    }

    #[test]
    fn test_decode_small_png() {
        let thumb = decode_data_url(&png_data_url(4, 2)).unwrap();
        assert_eq!((thumb.width, thumb.height), (4, 2));
        assert_eq!(thumb.rgb.len(), 4 * 2 * 3);
        assert_eq!(&thumb.rgb[..3], &[200, 160, 40]);
    }

    #[test]
    fn test_large_image_is_scaled_down() {
        let thumb = decode_data_url(&png_data_url(400, 200)).unwrap();
        assert_eq!(thumb.width, THUMBNAIL_PX);
        assert!(thumb.height <= THUMBNAIL_PX / 2 + 1);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(decode_data_url("page1_item1").is_err());
        assert!(decode_data_url("data:text/plain;base64,aGk=").is_err());
        assert!(decode_data_url("data:image/png;base64,!!!").is_err());
        assert!(decode_data_url("data:image/png;base64,aGVsbG8=").is_err());
    }
}
