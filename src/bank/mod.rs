//! Precomputed rotated template variants.
//!
//! Rotating the reference is the expensive step, so it runs once: `build`
//! produces one variant per grid angle and `store` persists the set so later
//! runs only load it. Matching never rotates; it compares the live frame
//! against these immutable copies.

mod angles;
mod store;

pub use angles::AngleGrid;

use crate::image::OwnedImage;
use crate::template::rotate::rotate_u8_bicubic;
use crate::template::{Template, TemplatePlan};
use crate::trace::{trace_event, trace_span};
use crate::util::{RotMatchError, RotMatchResult};
use std::path::Path;

/// Default angular step for precomputation, in degrees.
pub const DEFAULT_ANGLE_STEP_DEG: u32 = 5;

/// Fill value for pixels rotated in from outside the reference canvas.
const ROTATION_FILL: u8 = 0;

/// One rotated copy of the reference with its matching statistics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateVariant {
    angle_deg: u32,
    image: OwnedImage,
    plan: Option<TemplatePlan>,
}

impl TemplateVariant {
    /// Creates a variant; the angle must be below 360.
    pub fn new(angle_deg: u32, image: OwnedImage) -> RotMatchResult<Self> {
        if angle_deg >= 360 {
            return Err(RotMatchError::InvalidInput("variant angle must be below 360"));
        }
        Ok(Self::prepared(angle_deg, image))
    }

    fn prepared(angle_deg: u32, image: OwnedImage) -> Self {
        // A variant without contrast keeps no plan and correlates with nothing.
        let plan = TemplatePlan::from_view(image.view()).ok();
        Self {
            angle_deg,
            image,
            plan,
        }
    }

    /// Returns the rotation angle in degrees.
    pub fn angle_deg(&self) -> u32 {
        self.angle_deg
    }

    /// Returns the rotated pixels.
    pub fn image(&self) -> &OwnedImage {
        &self.image
    }

    /// Returns the precomputed statistics, `None` for a flat variant.
    pub fn plan(&self) -> Option<&TemplatePlan> {
        self.plan.as_ref()
    }
}

/// Ordered, immutable set of rotated variants of one reference.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VariantLibrary {
    variants: Vec<TemplateVariant>,
}

impl VariantLibrary {
    /// Returns a library with no variants ("not yet precomputed").
    pub fn empty() -> Self {
        Self::default()
    }

    /// Rotates `reference` to every angle of a `step_deg` grid.
    pub fn build(reference: &Template, step_deg: u32) -> RotMatchResult<Self> {
        reference.validate_reference("reference")?;
        let grid = AngleGrid::new(step_deg)?;
        let _span = trace_span!("build_variants", angles = grid.len()).entered();

        let variants = grid
            .iter()
            .map(|angle| {
                TemplateVariant::prepared(
                    angle,
                    rotate_u8_bicubic(reference.view(), angle as f32, ROTATION_FILL),
                )
            })
            .collect::<Vec<_>>();

        trace_event!("variants_built", count = variants.len());
        Ok(Self { variants })
    }

    /// Decodes the reference image at `path` and builds its variants.
    pub fn build_from_path<P: AsRef<Path>>(path: P, step_deg: u32) -> RotMatchResult<Self> {
        let path = path.as_ref();
        let reference = Template::from_path(path)?;
        reference.validate_reference(&path.display().to_string())?;
        Self::build(&reference, step_deg)
    }

    /// Assembles a library from existing variants, keeping their order.
    ///
    /// Every variant must share the first one's dimensions and angles must be
    /// unique.
    pub fn from_variants(variants: Vec<TemplateVariant>) -> RotMatchResult<Self> {
        if let Some(first) = variants.first() {
            let size = (first.image.width(), first.image.height());
            let mut seen = [false; 360];
            for variant in &variants {
                if (variant.image.width(), variant.image.height()) != size {
                    return Err(RotMatchError::InvalidInput(
                        "variants must share one template size",
                    ));
                }
                let slot = &mut seen[variant.angle_deg as usize];
                if *slot {
                    return Err(RotMatchError::InvalidInput("duplicate variant angle"));
                }
                *slot = true;
            }
        }
        Ok(Self { variants })
    }

    /// Returns the variants in stored order.
    pub fn variants(&self) -> &[TemplateVariant] {
        &self.variants
    }

    /// Returns the number of variants.
    pub fn len(&self) -> usize {
        self.variants.len()
    }

    /// Returns true if nothing has been precomputed.
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// Returns the shared `(width, height)` of the variants.
    pub fn template_size(&self) -> Option<(usize, usize)> {
        self.variants
            .first()
            .map(|v| (v.image.width(), v.image.height()))
    }

    /// Returns the variant stored for `angle_deg`, if any.
    pub fn variant_at(&self, angle_deg: u32) -> Option<&TemplateVariant> {
        self.variants.iter().find(|v| v.angle_deg == angle_deg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: usize, height: usize) -> Template {
        let data = (0..width * height).map(|i| (i * 5 % 256) as u8).collect();
        Template::new(data, width, height).unwrap()
    }

    #[test]
    fn build_zero_variant_is_the_reference() {
        let reference = gradient(9, 7);
        let library = VariantLibrary::build(&reference, 90).unwrap();
        assert_eq!(library.len(), 4);
        let zero = library.variant_at(0).unwrap();
        assert_eq!(zero.image().data(), reference.view().as_slice());
    }

    #[test]
    fn build_rejects_flat_reference() {
        let flat = Template::new(vec![10u8; 16], 4, 4).unwrap();
        let err = VariantLibrary::build(&flat, 5).unwrap_err();
        assert!(matches!(err, RotMatchError::InvalidReference { .. }));
    }

    #[test]
    fn from_variants_rejects_mixed_sizes_and_duplicates() {
        let a = TemplateVariant::new(0, OwnedImage::new(vec![0, 1, 2, 3], 2, 2).unwrap()).unwrap();
        let b = TemplateVariant::new(90, OwnedImage::new(vec![0, 1, 2], 3, 1).unwrap()).unwrap();
        assert!(VariantLibrary::from_variants(vec![a.clone(), b]).is_err());
        assert!(VariantLibrary::from_variants(vec![a.clone(), a]).is_err());
        assert!(TemplateVariant::new(360, OwnedImage::new(vec![1], 1, 1).unwrap()).is_err());
    }

    #[test]
    fn variants_carry_their_plans() {
        let library = VariantLibrary::build(&gradient(9, 7), 90).unwrap();
        for variant in library.variants() {
            let plan = variant.plan().unwrap();
            assert_eq!((plan.width(), plan.height()), (9, 7));
            assert_eq!(plan.pixels(), variant.image().data());
        }
        let flat = TemplateVariant::new(0, OwnedImage::new(vec![3u8; 4], 2, 2).unwrap()).unwrap();
        assert!(flat.plan().is_none());
    }
}
