//! Rendering share links as QR codes.
//!
//! Codes are rendered for screens (SVG), terminals (Unicode half blocks) and as raw luminance
//! frames that the decoder can read back.

use crate::scan::frame::{Frame, PixelFormat};
use crate::{CoreError, CoreResult};
use qrcode::render::{svg, unicode};
use qrcode::{Color, QrCode};

/// Modules of light margin around a code, as the QR standard asks for.
const QUIET_ZONE_MODULES: usize = 4;

/// Render `payload` as an SVG document at least `min_size` pixels wide.
pub fn render_svg(payload: &str, min_size: u32) -> CoreResult<String> {
    let code = QrCode::new(payload.as_bytes())?;
    Ok(code
        .render::<svg::Color>()
        .min_dimensions(min_size, min_size)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build())
}

/// Render `payload` with Unicode half blocks for display in a terminal.
pub fn render_text(payload: &str) -> CoreResult<String> {
    let code = QrCode::new(payload.as_bytes())?;
    Ok(code
        .render::<unicode::Dense1x2>()
        .dark_color(unicode::Dense1x2::Light)
        .light_color(unicode::Dense1x2::Dark)
        .build())
}

/// Render `payload` into a luminance frame, `scale` pixels per module.
///
/// With `invert` set, modules are light on a dark background.
///
/// # Errors
///
/// Returns [`CoreError::InvalidInput`] if `scale` makes the frame too large to address.
pub fn render_frame(payload: &str, scale: u32, invert: bool) -> CoreResult<Frame> {
    let code = QrCode::new(payload.as_bytes())?;
    let modules = code.width();
    let colors = code.to_colors();
    let scale = scale.max(1) as usize;
    let too_large = || CoreError::InvalidInput(format!("frame scale {} is too large", scale));
    let side = (modules + 2 * QUIET_ZONE_MODULES)
        .checked_mul(scale)
        .filter(|side| u32::try_from(*side).is_ok())
        .ok_or_else(too_large)?;
    let len = side
        .checked_mul(side)
        .filter(|len| u32::try_from(*len).is_ok())
        .ok_or_else(too_large)?;

    let (dark, light) = if invert { (255u8, 0u8) } else { (0u8, 255u8) };
    let mut data = vec![light; len];

    for (index, color) in colors.iter().enumerate() {
        if *color != Color::Dark {
            continue;
        }
        let mx = index % modules + QUIET_ZONE_MODULES;
        let my = index / modules + QUIET_ZONE_MODULES;
        for y in my * scale..(my + 1) * scale {
            let row = y * side;
            data[row + mx * scale..row + (mx + 1) * scale].fill(dark);
        }
    }

    Frame::new(side as u32, side as u32, PixelFormat::Luma8, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn svg_is_an_svg_document() {
        let svg = render_svg("http://localhost:3000/patient/profile/p1?ts=1", 200).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("#000000"));
    }

    #[test]
    fn text_rendering_is_multiline() {
        let text = render_text("hello").unwrap();
        assert!(text.lines().count() > 5);
    }

    #[test]
    fn oversized_scale_is_an_error() {
        let err = render_frame("x", 1 << 30, false).unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }

    #[test]
    fn frame_has_quiet_zone() {
        let frame = render_frame("hello", 2, false).unwrap();
        let luma = frame.luminance();
        let side = frame.width() as usize;
        assert_eq!(frame.width(), frame.height());
        // First rows are entirely quiet zone.
        assert!(luma[..side * 2 * QUIET_ZONE_MODULES].iter().all(|&v| v == 255));
        assert!(luma.iter().any(|&v| v == 0));
    }
}
