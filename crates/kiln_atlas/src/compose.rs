//! Atlas page composition.

use std::collections::BTreeMap;

use image::RgbaImage;

use crate::error::AtlasError;
use crate::layout::PackedAtlasLayout;

/// Renders one atlas page: every frame's pixels are blitted into its
/// original (margin-trimmed) rectangle; margins stay transparent.
///
/// `sources` maps frame names to their decoded images and must cover every
/// frame on the page at the declared size.
pub fn compose_page(
    layout: &PackedAtlasLayout,
    sources: &BTreeMap<String, RgbaImage>,
) -> Result<RgbaImage, AtlasError> {
    let mut page = RgbaImage::new(layout.width, layout.height);
    for frame in &layout.frames {
        let source = sources
            .get(&frame.name)
            .ok_or_else(|| AtlasError::MissingImage {
                name: frame.name.clone(),
            })?;
        if source.width() != frame.original.width || source.height() != frame.original.height {
            return Err(AtlasError::SizeMismatch {
                name: frame.name.clone(),
                declared_width: frame.original.width,
                declared_height: frame.original.height,
                actual_width: source.width(),
                actual_height: source.height(),
            });
        }
        image::imageops::overlay(
            &mut page,
            source,
            i64::from(frame.original.x),
            i64::from(frame.original.y),
        );
    }
    Ok(page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::PlacedFrame;
    use crate::rect::Rect;
    use image::Rgba;

    fn solid(width: u32, height: u32, color: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba(color))
    }

    fn one_frame_layout() -> PackedAtlasLayout {
        PackedAtlasLayout {
            width: 64,
            height: 64,
            frames: vec![PlacedFrame {
                name: "red".to_string(),
                page: 0,
                placed: Rect::new(0, 0, 20, 20),
                original: Rect::new(2, 2, 16, 16),
                margin: 2,
            }],
        }
    }

    #[test]
    fn frame_pixels_land_inside_original_rect() {
        let mut sources = BTreeMap::new();
        sources.insert("red".to_string(), solid(16, 16, [255, 0, 0, 255]));

        let page = compose_page(&one_frame_layout(), &sources).unwrap();
        assert_eq!(page.dimensions(), (64, 64));
        assert_eq!(*page.get_pixel(2, 2), Rgba([255, 0, 0, 255]));
        assert_eq!(*page.get_pixel(17, 17), Rgba([255, 0, 0, 255]));
        // Margin and the rest of the page stay transparent.
        assert_eq!(*page.get_pixel(0, 0), Rgba([0, 0, 0, 0]));
        assert_eq!(*page.get_pixel(30, 30), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn missing_source_is_an_error() {
        let sources = BTreeMap::new();
        assert!(matches!(
            compose_page(&one_frame_layout(), &sources),
            Err(AtlasError::MissingImage { name }) if name == "red"
        ));
    }

    #[test]
    fn wrong_sized_source_is_an_error() {
        let mut sources = BTreeMap::new();
        sources.insert("red".to_string(), solid(8, 8, [255, 0, 0, 255]));
        assert!(matches!(
            compose_page(&one_frame_layout(), &sources),
            Err(AtlasError::SizeMismatch { actual_width: 8, .. })
        ));
    }
}
