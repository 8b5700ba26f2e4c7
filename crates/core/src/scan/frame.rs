//! Pixel frames and the visual-code decoder seam.
//!
//! The scanner only relies on the decoder's contract: a 2-D pixel grid plus an inversion flag in,
//! decoded text or nothing out. [`QrFrameDecoder`] fulfils it with `rqrr`.

use crate::{CoreError, CoreResult};
use std::borrow::Cow;

/// Pixel layout of a [`Frame`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// 4 bytes per pixel, red/green/blue/alpha.
    Rgba8,
    /// 1 byte per pixel, luminance.
    Luma8,
}

impl PixelFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgba8 => 4,
            PixelFormat::Luma8 => 1,
        }
    }
}

/// A captured camera frame or uploaded still image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
}

impl Frame {
    /// Wrap raw pixel data.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidFrame`] if either dimension is zero or `data` does not hold
    /// exactly `width * height` pixels of `format`.
    pub fn new(width: u32, height: u32, format: PixelFormat, data: Vec<u8>) -> CoreResult<Self> {
        if width == 0 || height == 0 {
            return Err(CoreError::InvalidFrame(format!(
                "frame dimensions must be non-zero, got {}x{}",
                width, height
            )));
        }

        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|px| px.checked_mul(format.bytes_per_pixel()))
            .ok_or_else(|| CoreError::InvalidFrame("frame dimensions overflow".into()))?;

        if data.len() != expected {
            return Err(CoreError::InvalidFrame(format!(
                "expected {} bytes for {}x{} {:?}, got {}",
                expected,
                width,
                height,
                format,
                data.len()
            )));
        }

        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Luminance plane of the frame, converting RGBA with integer BT.601 weights.
    ///
    /// Alpha is ignored.
    pub fn luminance(&self) -> Cow<'_, [u8]> {
        match self.format {
            PixelFormat::Luma8 => Cow::Borrowed(&self.data),
            PixelFormat::Rgba8 => Cow::Owned(
                self.data
                    .chunks_exact(4)
                    .map(|px| {
                        let (r, g, b) = (px[0] as u32, px[1] as u32, px[2] as u32);
                        ((r * 299 + g * 587 + b * 114) / 1000) as u8
                    })
                    .collect(),
            ),
        }
    }
}

/// Which polarities the decoder should try.
///
/// Inverted codes (light modules on a dark background) are common on dark-mode screens.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum InversionMode {
    /// Only the frame as captured.
    DontInvert,
    /// Only the inverted frame.
    OnlyInvert,
    /// As captured, then inverted.
    #[default]
    AttemptBoth,
    /// Inverted, then as captured.
    InvertFirst,
}

impl InversionMode {
    /// Polarities to try, in order (`true` means inverted).
    pub fn passes(self) -> &'static [bool] {
        match self {
            InversionMode::DontInvert => &[false],
            InversionMode::OnlyInvert => &[true],
            InversionMode::AttemptBoth => &[false, true],
            InversionMode::InvertFirst => &[true, false],
        }
    }
}

impl std::str::FromStr for InversionMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dont-invert" => Ok(InversionMode::DontInvert),
            "only-invert" => Ok(InversionMode::OnlyInvert),
            "attempt-both" => Ok(InversionMode::AttemptBoth),
            "invert-first" => Ok(InversionMode::InvertFirst),
            other => Err(CoreError::InvalidInput(format!(
                "unknown inversion mode '{}' (expected dont-invert, only-invert, attempt-both or invert-first)",
                other
            ))),
        }
    }
}

/// Extracts a text payload from a frame.
pub trait FrameDecoder {
    /// Returns the decoded payload, or `None` when no code is found.
    fn decode(&mut self, frame: &Frame, mode: InversionMode) -> Option<String>;
}

/// QR decoder backed by `rqrr`.
#[derive(Clone, Copy, Debug, Default)]
pub struct QrFrameDecoder;

impl QrFrameDecoder {
    fn decode_luma(width: usize, height: usize, luma: &[u8], invert: bool) -> Option<String> {
        let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(width, height, |x, y| {
            let v = luma[y * width + x];
            if invert {
                255 - v
            } else {
                v
            }
        });

        prepared
            .detect_grids()
            .into_iter()
            .find_map(|grid| match grid.decode() {
                Ok((_meta, content)) => Some(content),
                Err(e) => {
                    tracing::debug!("QR grid found but not decodable: {:?}", e);
                    None
                }
            })
    }
}

impl FrameDecoder for QrFrameDecoder {
    fn decode(&mut self, frame: &Frame, mode: InversionMode) -> Option<String> {
        let luma = frame.luminance();
        let (width, height) = (frame.width() as usize, frame.height() as usize);

        mode.passes()
            .iter()
            .find_map(|&invert| Self::decode_luma(width, height, &luma, invert))
    }
}
