use qrcode::{Color, QrCode};

use super::document::PassDocumentError;

/// Light modules surrounding the symbol, as recommended for scanners.
pub const QUIET_ZONE_MODULES: usize = 4;
/// Pixels per module edge in the rasterized image.
pub const MODULE_PIXELS: usize = 4;

const DARK: u8 = 0x00;
const LIGHT: u8 = 0xFF;

/// 8-bit grayscale raster, rows top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Encode `summary` as a QR symbol and rasterize it.
pub fn encode_summary(summary: &str) -> Result<GrayImage, PassDocumentError> {
    let code = QrCode::new(summary.as_bytes())
        .map_err(|err| PassDocumentError::Barcode(err.to_string()))?;
    Ok(rasterize(code.width(), &code.to_colors()))
}

fn rasterize(modules: usize, colors: &[Color]) -> GrayImage {
    let side = (modules + 2 * QUIET_ZONE_MODULES) * MODULE_PIXELS;
    let mut pixels = vec![LIGHT; side * side];

    for (index, color) in colors.iter().enumerate() {
        if !matches!(color, Color::Dark) {
            continue;
        }
        let left = (index % modules + QUIET_ZONE_MODULES) * MODULE_PIXELS;
        let top = (index / modules + QUIET_ZONE_MODULES) * MODULE_PIXELS;
        for row in top..top + MODULE_PIXELS {
            let start = row * side + left;
            pixels[start..start + MODULE_PIXELS].fill(DARK);
        }
    }

    GrayImage {
        width: side as u32,
        height: side as u32,
        pixels,
    }
}
