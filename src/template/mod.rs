//! Reference templates and their matching plans.

use crate::image::{io, ImageView, OwnedImage};
use crate::util::{RotMatchError, RotMatchResult};
use std::path::Path;

mod plan;
pub mod rotate;

pub use plan::TemplatePlan;

/// Owned reference image in contiguous grayscale format.
#[derive(Clone, Debug)]
pub struct Template {
    img: OwnedImage,
}

impl Template {
    /// Creates a template from a contiguous grayscale buffer.
    pub fn new(data: Vec<u8>, width: usize, height: usize) -> RotMatchResult<Self> {
        let img = OwnedImage::new(data, width, height)?;
        Ok(Self { img })
    }

    /// Wraps an already decoded grayscale image.
    pub fn from_image(img: OwnedImage) -> Self {
        Self { img }
    }

    /// Decodes an image file and converts it to grayscale.
    pub fn from_path<P: AsRef<Path>>(path: P) -> RotMatchResult<Self> {
        io::load_gray_image(path).map(Self::from_image)
    }

    /// Returns a borrowed view of the template data.
    pub fn view(&self) -> ImageView<'_, u8> {
        self.img.view()
    }

    /// Returns the template width in pixels.
    pub fn width(&self) -> usize {
        self.img.width()
    }

    /// Returns the template height in pixels.
    pub fn height(&self) -> usize {
        self.img.height()
    }

    /// Rejects references that cannot produce a meaningful correlation.
    pub(crate) fn validate_reference(&self, source_name: &str) -> RotMatchResult<()> {
        if self.img.is_flat() {
            return Err(RotMatchError::InvalidReference {
                source_name: source_name.to_string(),
                reason: "reference has no contrast".to_string(),
            });
        }
        Ok(())
    }
}
