use anyhow::Context;
use image::{ImageFormat, RgbaImage};

/// Decodes a JPEG or Motion-JPEG frame.
///
/// Webcams often omit the Huffman tables from MJPG frames; the decoder substitutes the standard
/// tables in that case.
pub(super) fn decode(data: &[u8]) -> anyhow::Result<RgbaImage> {
    let frame = image::load_from_memory_with_format(data, ImageFormat::Jpeg)
        .with_context(|| format!("failed to decode {} byte JPEG", data.len()))?;
    Ok(frame.into_rgba8())
}
