//! On-disk persistence for variant libraries.
//!
//! The store is a versioned JSON document of `(angle, width, height, pixels)`
//! records. It is an internal cache, not an interchange format; the only
//! contract is an exact round trip.

use crate::bank::{TemplateVariant, VariantLibrary};
use crate::image::OwnedImage;
use crate::trace::{status_info, status_warn};
use crate::util::{RotMatchError, RotMatchResult};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::Path;

const FORMAT_TAG: &str = "rotmatch-variants";
const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct StoredLibrary {
    format: String,
    version: u32,
    variants: Vec<StoredVariant>,
}

#[derive(Serialize, Deserialize)]
struct StoredVariant {
    angle_deg: u32,
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl VariantLibrary {
    /// Writes the library to `path`, replacing any previous store.
    ///
    /// The document is written next to the target and renamed into place so
    /// an interrupted save never leaves a truncated store behind.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> RotMatchResult<()> {
        let path = path.as_ref();
        let io_err = |err: std::io::Error| RotMatchError::Io {
            path: path.display().to_string(),
            reason: err.to_string(),
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let doc = StoredLibrary {
            format: FORMAT_TAG.to_string(),
            version: FORMAT_VERSION,
            variants: self
                .variants()
                .iter()
                .map(|v| StoredVariant {
                    angle_deg: v.angle_deg(),
                    width: v.image().width(),
                    height: v.image().height(),
                    pixels: v.image().data().to_vec(),
                })
                .collect(),
        };

        let tmp = path.with_extension("tmp");
        let file = File::create(&tmp).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &doc).map_err(|err| RotMatchError::Io {
            path: tmp.display().to_string(),
            reason: err.to_string(),
        })?;
        writer.flush().map_err(io_err)?;
        drop(writer);
        fs::rename(&tmp, path).map_err(io_err)?;

        status_info!("saved {} variants to {}", self.len(), path.display());
        Ok(())
    }

    /// Reads a library written by [`VariantLibrary::save`].
    ///
    /// A missing file yields an empty library; a file that exists but cannot
    /// be parsed or validated is a `Serialization` error.
    pub fn load<P: AsRef<Path>>(path: P) -> RotMatchResult<Self> {
        let path = path.as_ref();
        let file = match File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Self::empty()),
            Err(err) => {
                return Err(RotMatchError::Io {
                    path: path.display().to_string(),
                    reason: err.to_string(),
                })
            }
        };

        let corrupt = |reason: String| RotMatchError::Serialization {
            path: path.display().to_string(),
            reason,
        };

        let doc: StoredLibrary = serde_json::from_reader(BufReader::new(file))
            .map_err(|err| corrupt(err.to_string()))?;
        if doc.format != FORMAT_TAG || doc.version != FORMAT_VERSION {
            return Err(corrupt(format!(
                "unsupported format {} v{}",
                doc.format, doc.version
            )));
        }

        let variants = doc
            .variants
            .into_iter()
            .map(|stored| {
                let image = OwnedImage::new(stored.pixels, stored.width, stored.height)?;
                TemplateVariant::new(stored.angle_deg, image)
            })
            .collect::<RotMatchResult<Vec<_>>>()
            .map_err(|err| corrupt(err.to_string()))?;

        Self::from_variants(variants).map_err(|err| corrupt(err.to_string()))
    }

    /// Loads the library, treating a corrupt store like a missing one.
    pub fn load_or_empty<P: AsRef<Path>>(path: P) -> RotMatchResult<Self> {
        match Self::load(path) {
            Err(err @ RotMatchError::Serialization { .. }) => {
                status_warn!("{err}; precomputation required");
                Ok(Self::empty())
            }
            other => other,
        }
    }

    /// Loads the store, building and saving it from `reference` when empty.
    pub fn load_or_build<P: AsRef<Path>, R: AsRef<Path>>(
        store: P,
        reference: R,
        step_deg: u32,
    ) -> RotMatchResult<Self> {
        let store = store.as_ref();
        let library = Self::load_or_empty(store)?;
        if !library.is_empty() {
            return Ok(library);
        }
        status_info!(
            "precomputing variants of {} every {step_deg} degrees",
            reference.as_ref().display()
        );
        let library = Self::build_from_path(reference, step_deg)?;
        library.save(store)?;
        Ok(library)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::Template;

    fn sample_library() -> VariantLibrary {
        let data = (0..64u8).map(|v| v.wrapping_mul(29)).collect();
        let reference = Template::new(data, 8, 8).unwrap();
        VariantLibrary::build(&reference, 45).unwrap()
    }

    #[test]
    fn missing_store_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let library = VariantLibrary::load(dir.path().join("absent.json")).unwrap();
        assert!(library.is_empty());
    }

    #[test]
    fn wrong_version_is_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lib.json");
        fs::write(
            &path,
            r#"{"format":"rotmatch-variants","version":99,"variants":[]}"#,
        )
        .unwrap();
        let err = VariantLibrary::load(&path).unwrap_err();
        assert!(matches!(err, RotMatchError::Serialization { .. }));
    }

    #[test]
    fn pixel_count_mismatch_is_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lib.json");
        fs::write(
            &path,
            r#"{"format":"rotmatch-variants","version":1,"variants":[{"angle_deg":0,"width":2,"height":2,"pixels":[1,2,3]}]}"#,
        )
        .unwrap();
        assert!(matches!(
            VariantLibrary::load(&path),
            Err(RotMatchError::Serialization { .. })
        ));
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache/nested/lib.json");
        let library = sample_library();
        library.save(&path).unwrap();
        assert_eq!(VariantLibrary::load(&path).unwrap(), library);
        assert!(!path.with_extension("tmp").exists());
    }
}
