//! Single-orientation matching for targets that never rotate.

use crate::search::{scan_plans, Frame, Match};
use crate::template::{Template, TemplatePlan};
use crate::trace::status_warn;
use crate::util::{RotMatchError, RotMatchResult};
use std::collections::BTreeMap;
use std::path::Path;

/// Named template matched at a single orientation.
#[derive(Clone, Debug)]
pub struct FixedTemplate {
    name: String,
    plan: TemplatePlan,
}

impl FixedTemplate {
    /// Prepares `template` under the logical target `name`.
    pub fn from_template(name: impl Into<String>, template: &Template) -> RotMatchResult<Self> {
        let name = name.into();
        let plan = TemplatePlan::from_view(template.view()).map_err(|err| {
            RotMatchError::InvalidReference {
                source_name: name.clone(),
                reason: err.to_string(),
            }
        })?;
        Ok(Self { name, plan })
    }

    /// Decodes the image at `path` and prepares it under `name`.
    pub fn from_path<P: AsRef<Path>>(name: impl Into<String>, path: P) -> RotMatchResult<Self> {
        let template = Template::from_path(path)?;
        Self::from_template(name, &template)
    }

    /// Returns the logical target name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the template width in pixels.
    pub fn width(&self) -> usize {
        self.plan.width()
    }

    /// Returns the template height in pixels.
    pub fn height(&self) -> usize {
        self.plan.height()
    }

    /// Returns the maximum of the score surface over the whole frame.
    pub fn best_match(&self, frame: &Frame) -> RotMatchResult<Match> {
        let peaks = scan_plans(frame, &[(&self.plan, 0)])?;
        peaks
            .into_iter()
            .next()
            .map(Match::from)
            .ok_or(RotMatchError::NoTemplates)
    }

    /// Center of a placement of this template.
    pub fn center_of(&self, m: &Match) -> (usize, usize) {
        m.center(self.width(), self.height())
    }
}

/// Fixed templates keyed by target name; immutable once loaded.
#[derive(Clone, Debug, Default)]
pub struct FixedTemplates {
    templates: BTreeMap<String, FixedTemplate>,
}

impl FixedTemplates {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every `(name, path)` entry.
    ///
    /// Entries that fail to load are returned alongside the set so the caller
    /// can report them at startup; the corresponding names stay unregistered.
    pub fn load<I, N, P>(entries: I) -> (Self, Vec<RotMatchError>)
    where
        I: IntoIterator<Item = (N, P)>,
        N: Into<String>,
        P: AsRef<Path>,
    {
        let mut set = Self::new();
        let mut failures = Vec::new();
        for (name, path) in entries {
            match FixedTemplate::from_path(name, path) {
                Ok(template) => set.insert(template),
                Err(err) => {
                    status_warn!("fixed template not loaded: {err}");
                    failures.push(err);
                }
            }
        }
        (set, failures)
    }

    /// Registers a template, replacing any previous one with the same name.
    pub fn insert(&mut self, template: FixedTemplate) {
        self.templates.insert(template.name.clone(), template);
    }

    /// Returns the template registered under `name`.
    pub fn get(&self, name: &str) -> Option<&FixedTemplate> {
        self.templates.get(name)
    }

    /// Returns the number of registered templates.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Returns true if no template is registered.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::OwnedImage;

    fn checker(width: usize, height: usize) -> Template {
        let data = (0..width * height)
            .map(|i| if (i % width + i / width) % 2 == 0 { 30 } else { 220 })
            .collect();
        Template::new(data, width, height).unwrap()
    }

    #[test]
    fn flat_template_is_invalid_reference() {
        let flat = Template::new(vec![50u8; 9], 3, 3).unwrap();
        let err = FixedTemplate::from_template("restart_btn", &flat).unwrap_err();
        assert!(matches!(
            err,
            RotMatchError::InvalidReference { ref source_name, .. } if source_name == "restart_btn"
        ));
    }

    #[test]
    fn finds_template_and_reports_center() {
        let tpl = checker(5, 4);
        let mut frame = vec![100u8; 20 * 15];
        for (i, &v) in tpl.view().as_slice().iter().enumerate() {
            frame[(6 + i / 5) * 20 + 9 + i % 5] = v;
        }
        let frame = crate::search::Frame::new(OwnedImage::new(frame, 20, 15).unwrap());
        let fixed = FixedTemplate::from_template("fixed_gem", &tpl).unwrap();
        let m = fixed.best_match(&frame).unwrap();
        assert_eq!((m.x, m.y), (9, 6));
        assert_eq!(m.score, 1.0);
        assert_eq!(fixed.center_of(&m), (11, 8));
    }

    #[test]
    fn large_frame_match_equals_direct_scan() {
        use crate::kernel::{Kernel, ZnccScalar};

        let (width, height) = (120, 90);
        let mut state = 0x2545_f491u32;
        let data: Vec<u8> = (0..width * height)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state >> 24) as u8
            })
            .collect();
        let mut tpl = Vec::new();
        for y in 40..60 {
            tpl.extend_from_slice(&data[y * width + 71..y * width + 89]);
        }
        let tpl = Template::new(tpl, 18, 20).unwrap();
        let frame = crate::search::Frame::new(OwnedImage::new(data, width, height).unwrap());
        assert!(frame.prefers_spectral(18, 20));

        let fixed = FixedTemplate::from_template("fixed_gem", &tpl).unwrap();
        let m = fixed.best_match(&frame).unwrap();
        let direct =
            ZnccScalar::scan_best(frame.view(), frame.integral(), &fixed.plan, 0).unwrap();
        assert_eq!((m.x, m.y), (71, 40));
        assert_eq!(m.score, 1.0);
        assert_eq!(
            (m.x, m.y, m.score.to_bits()),
            (direct.x, direct.y, direct.score.to_bits())
        );
    }

    #[test]
    fn load_reports_missing_files_and_keeps_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("gem.png");
        crate::image::io::to_gray_image(&OwnedImage::new(vec![0, 255, 255, 0], 2, 2).unwrap())
            .unwrap()
            .save(&good)
            .unwrap();

        let (set, failures) = FixedTemplates::load([
            ("fixed_gem", good),
            ("restart_btn", dir.path().join("missing.png")),
        ]);
        assert_eq!(set.len(), 1);
        assert!(set.get("fixed_gem").is_some());
        assert!(set.get("restart_btn").is_none());
        assert_eq!(failures.len(), 1);
        assert!(matches!(failures[0], RotMatchError::InvalidReference { .. }));
    }
}
