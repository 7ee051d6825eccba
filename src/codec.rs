//! Frame codec for the transport.
//!
//! Frames travel as base64 text, optionally wrapped in a `data:image/...;base64,` URL.
//! Any format the `image` crate can sniff is accepted on the way in; annotated frames go
//! out as JPEG data URLs.

use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use image::codecs::jpeg::JpegEncoder;

use crate::frame::Frame;

pub const DEFAULT_JPEG_QUALITY: u8 = 80;

const JPEG_DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

/// Strip an optional data-URL header and decode the base64 payload.
pub fn decode_payload(payload: &str) -> Result<Vec<u8>> {
    let payload = payload.trim();
    let encoded = match payload.strip_prefix("data:") {
        Some(rest) => {
            let (header, data) = rest
                .split_once(',')
                .ok_or_else(|| anyhow!("data URL has no payload"))?;
            if !header.ends_with(";base64") {
                return Err(anyhow!("data URL is not base64 encoded"));
            }
            data
        }
        None => payload,
    };
    if encoded.is_empty() {
        return Err(anyhow!("frame payload is empty"));
    }
    STANDARD.decode(encoded).context("frame payload is not valid base64")
}

/// Decode compressed image bytes into an RGB frame.
pub fn decode_frame(bytes: &[u8]) -> Result<Frame> {
    let image = image::load_from_memory(bytes).context("failed to decode frame")?;
    Ok(Frame::from_image(image.to_rgb8()))
}

/// Encode a frame as JPEG bytes.
pub fn encode_frame(frame: &Frame, quality: u8) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100))
        .encode_image(frame.image())
        .context("failed to encode frame")?;
    Ok(out)
}

/// Encode a frame as a JPEG data URL.
pub fn encode_data_url(frame: &Frame, quality: u8) -> Result<String> {
    let jpeg = encode_frame(frame, quality)?;
    Ok(format!("{}{}", JPEG_DATA_URL_PREFIX, STANDARD.encode(jpeg)))
}
