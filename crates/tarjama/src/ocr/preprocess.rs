//! Image preprocessing ahead of recognition.
//!
//! Converts the page to single-channel intensity and applies light
//! denoising. Best-effort: callers fall back to the raw image on failure,
//! so errors here are never fatal.

use crate::extraction::PageImage;
use crate::{Result, TarjamaError};
use image::{imageops, GrayImage, RgbImage};

/// Gaussian sigma for the denoising pass.
const DENOISE_SIGMA: f32 = 0.8;

/// Grayscale + denoise a page image.
pub fn preprocess_image(image: &PageImage) -> Result<PageImage> {
    let gray = to_gray(image)?;
    let denoised = imageops::blur(&gray, DENOISE_SIGMA);

    Ok(PageImage {
        width: denoised.width(),
        height: denoised.height(),
        pixels: denoised.into_raw(),
        grayscale: true,
    })
}

fn to_gray(image: &PageImage) -> Result<GrayImage> {
    if image.grayscale {
        return GrayImage::from_raw(image.width, image.height, image.pixels.clone()).ok_or_else(|| {
            TarjamaError::image_processing(format!(
                "luma buffer size mismatch for {}x{} image",
                image.width, image.height
            ))
        });
    }

    let rgb = RgbImage::from_raw(image.width, image.height, image.pixels.clone()).ok_or_else(|| {
        TarjamaError::image_processing(format!(
            "rgb buffer size mismatch for {}x{} image",
            image.width, image.height
        ))
    })?;
    Ok(imageops::grayscale(&rgb))
}
