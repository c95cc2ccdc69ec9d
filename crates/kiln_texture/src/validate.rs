//! Pre-compression validation.
//!
//! Each (texture, GPU family) pair is checked against its resolved pixel
//! format before any encoder runs. A failed check rejects only that pair;
//! the same texture can still succeed for other families.

use crate::container::MIN_COMPRESS_DIM;
use crate::error::TextureError;
use crate::gpu::PixelFormat;
use crate::source::TextureSource;

/// Validates a source texture against the pixel format it will be encoded
/// to, plus the HD-split request.
///
/// Checks every face: cube maps must satisfy the constraints on all six.
pub fn validate_source(
    source: &TextureSource,
    format: PixelFormat,
    hd_split: bool,
) -> Result<(), TextureError> {
    for face in &source.faces {
        if format.requires_square() && face.width != face.height {
            return Err(TextureError::NonSquareSource {
                path: source.path.clone(),
                format,
                width: face.width,
                height: face.height,
            });
        }
        if format != PixelFormat::Rgba8
            && (face.width < MIN_COMPRESS_DIM || face.height < MIN_COMPRESS_DIM)
        {
            return Err(TextureError::SourceTooSmall {
                path: source.path.clone(),
                width: face.width,
                height: face.height,
                min: MIN_COMPRESS_DIM,
            });
        }
    }

    // Uncompressed artifacts are passed through in their native container,
    // so splitting them needs a container that already carries a mip chain.
    if hd_split && format == PixelFormat::Rgba8 && !source.format.supports_hd_split() {
        return Err(TextureError::HdSplitUnsupported {
            path: source.path.clone(),
            container: source.format.to_string(),
        });
    }

    Ok(())
}
