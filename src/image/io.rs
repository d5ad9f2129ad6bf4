//! Conversions between the `image` crate and rotmatch buffers.

use crate::image::{ImageView, OwnedImage};
use crate::util::{RotMatchError, RotMatchResult};
use std::path::Path;

/// Creates a borrowed view from a grayscale image buffer.
pub fn view_from_gray_image(img: &image::GrayImage) -> RotMatchResult<ImageView<'_, u8>> {
    ImageView::from_slice(img.as_raw(), img.width() as usize, img.height() as usize)
}

/// Converts any decoded image (BGRA captures included) to owned grayscale.
pub fn owned_from_dynamic_image(img: &image::DynamicImage) -> RotMatchResult<OwnedImage> {
    let gray = img.to_luma8();
    let width = gray.width() as usize;
    let height = gray.height() as usize;
    OwnedImage::new(gray.into_raw(), width, height)
}

/// Loads an image from disk as grayscale.
///
/// Decode failures and empty images are reported as `InvalidReference`.
pub fn load_gray_image<P: AsRef<Path>>(path: P) -> RotMatchResult<OwnedImage> {
    let path = path.as_ref();
    let source_name = path.display().to_string();
    let img = image::open(path).map_err(|err| RotMatchError::InvalidReference {
        source_name: source_name.clone(),
        reason: err.to_string(),
    })?;
    owned_from_dynamic_image(&img).map_err(|err| RotMatchError::InvalidReference {
        source_name,
        reason: err.to_string(),
    })
}

/// Wraps an owned grayscale image for saving or drawing with `image`.
pub fn to_gray_image(img: &OwnedImage) -> RotMatchResult<image::GrayImage> {
    image::GrayImage::from_raw(
        img.width() as u32,
        img.height() as u32,
        img.data().to_vec(),
    )
    .ok_or(RotMatchError::InvalidDimensions {
        width: img.width(),
        height: img.height(),
    })
}
