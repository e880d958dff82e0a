use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Luma};
use qrcode::QrCode;

use super::QrError;

/// Smallest edge of the rendered image in pixels
const MIN_SIZE: u32 = 256;

/// Encode `payload` as a QR code and return PNG bytes
pub fn render_png(payload: &str) -> Result<Vec<u8>, QrError> {
    let code = QrCode::new(payload.as_bytes())?;
    let img = code
        .render::<Luma<u8>>()
        .min_dimensions(MIN_SIZE, MIN_SIZE)
        .build();

    let mut buf = Vec::new();
    DynamicImage::ImageLuma8(img).write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    Ok(buf)
}
