use image::GenericImageView;

use crate::controller::events::PreviewImage;

const PREVIEW_MAX_DIMENSION: f32 = 320.0;

/// Decodes `bytes` into a downscaled RGBA preview. Non-image files have no
/// preview.
pub fn decode_preview(uri: &str, bytes: &[u8]) -> Option<PreviewImage> {
    let decoded = match image::load_from_memory(bytes) {
        Ok(decoded) => decoded,
        Err(err) => {
            tracing::debug!(uri, error = %err, "preview: not a decodable image");
            return None;
        }
    };
    let (orig_w, orig_h) = decoded.dimensions();
    let scale = (PREVIEW_MAX_DIMENSION / (orig_w.max(orig_h) as f32)).min(1.0);
    let resized = if scale < 1.0 {
        decoded.resize(
            (orig_w as f32 * scale).max(1.0) as u32,
            (orig_h as f32 * scale).max(1.0) as u32,
            image::imageops::FilterType::Triangle,
        )
    } else {
        decoded
    };
    let rgba = resized.to_rgba8();
    Some(PreviewImage {
        uri: uri.to_string(),
        width: rgba.width() as usize,
        height: rgba.height() as usize,
        rgba: rgba.into_raw(),
    })
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{ImageFormat, Rgb, RgbImage};

    use super::*;

    #[test]
    fn large_images_are_scaled_to_fit() {
        let image = RgbImage::from_pixel(640, 160, Rgb([10, 200, 10]));
        let mut bytes = Cursor::new(Vec::new());
        image
            .write_to(&mut bytes, ImageFormat::Png)
            .expect("encode png");

        let preview = decode_preview("preview://1/kale.png", bytes.get_ref()).expect("preview");
        assert_eq!((preview.width, preview.height), (320, 80));
        assert_eq!(preview.rgba.len(), 320 * 80 * 4);
        assert_eq!(preview.uri, "preview://1/kale.png");
    }

    #[test]
    fn non_images_have_no_preview() {
        assert!(decode_preview("preview://2/notes.txt", b"plain text").is_none());
    }
}
