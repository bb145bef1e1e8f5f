//! Re-encode downloaded artwork as JPEG.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;

use super::error::AcquireError;

/// Quality used for stored high-res images.
pub const JPEG_QUALITY: u8 = 100;

/// Decode any supported format (the wiki serves WebP and PNG as well as
/// JPEG) and re-encode it as a baseline JPEG. Runs on the blocking pool.
pub async fn to_jpeg(bytes: Vec<u8>) -> Result<Vec<u8>, AcquireError> {
    tokio::task::spawn_blocking(move || encode_jpeg(&bytes)).await?
}

fn encode_jpeg(bytes: &[u8]) -> Result<Vec<u8>, AcquireError> {
    let decoded = image::load_from_memory(bytes).map_err(AcquireError::Decode)?;
    // JPEG has no alpha channel.
    let rgb = decoded.to_rgb8();

    let mut out = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY)
        .encode_image(&rgb)
        .map_err(AcquireError::Encode)?;
    Ok(out.into_inner())
}
