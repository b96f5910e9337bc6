use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::utils::redact::redact_sensitive_text;

pub const MAX_QR_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Decodes the first readable QR code in an encoded image (PNG, JPEG, ...).
pub fn decode_qr_image(bytes: &[u8]) -> AppResult<String> {
    if bytes.is_empty() {
        return Err(AppError::validation("Please select a valid image file."));
    }
    if bytes.len() > MAX_QR_IMAGE_BYTES {
        return Err(AppError::validation(
            "Image file is too large. Please select a file smaller than 10MB.",
        ));
    }

    let format = image::guess_format(bytes)
        .map_err(|_| AppError::validation("Please select a valid image file."))?;
    let image = image::load_from_memory_with_format(bytes, format)
        .map_err(|err| {
            AppError::validation(format!("Failed to process the uploaded image: {err}"))
        })?
        .to_luma8();

    let (width, height) = image.dimensions();
    let mut prepared =
        rqrr::PreparedImage::prepare_from_greyscale(width as usize, height as usize, |x, y| {
            image.get_pixel(x as u32, y as u32).0[0]
        });

    let grids = prepared.detect_grids();
    debug!(
        target: "app::scam::qr",
        width,
        height,
        grids = grids.len(),
        "scanned image for QR codes"
    );

    for grid in grids {
        match grid.decode() {
            Ok((_, content)) if !content.trim().is_empty() => {
                debug!(
                    target: "app::scam::qr",
                    decoded = %redact_sensitive_text(&content),
                    "decoded QR payload"
                );
                return Ok(content);
            }
            Ok(_) => {}
            Err(err) => {
                debug!(target: "app::scam::qr", error = ?err, "skipping unreadable QR grid");
            }
        }
    }

    Err(AppError::validation(
        "No QR code found in the uploaded image. Please try a different image.",
    ))
}
