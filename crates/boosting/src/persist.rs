//! Versioned Model Files
//!
//! A model file is the postcard encoding of `(format_version, kind, model)`.
//! The header is decoded first so a stale or foreign file fails with a
//! precise error instead of a garbled model.

use crate::error::BoostingError;
use crate::ModelKind;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Current on-disk layout
pub const FORMAT_VERSION: u32 = 1;

pub(crate) fn write_model<T: Serialize>(
    path: &Path,
    kind: ModelKind,
    model: &T,
) -> Result<(), BoostingError> {
    let bytes = postcard::to_allocvec(&(FORMAT_VERSION, kind, model))?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, &bytes)?;
    info!("Saved {} model to {:?} ({} bytes)", kind, path, bytes.len());
    Ok(())
}

pub(crate) fn read_model<T: DeserializeOwned>(
    path: &Path,
    expected: ModelKind,
) -> Result<T, BoostingError> {
    let bytes = fs::read(path)?;
    let (version, rest): (u32, _) = postcard::take_from_bytes(&bytes)?;
    if version != FORMAT_VERSION {
        return Err(BoostingError::UnsupportedFormat {
            found: version,
            expected: FORMAT_VERSION,
        });
    }
    let (kind, rest): (ModelKind, _) = postcard::take_from_bytes(rest)?;
    if kind != expected {
        return Err(BoostingError::WrongModelKind {
            found: kind,
            expected,
        });
    }
    let model = postcard::from_bytes(rest)?;
    debug!("Loaded {} model from {:?}", kind, path);
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_header_checked() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model.bin");
        write_model(&path, ModelKind::GradientBoostedTrees, &vec![1.0f64, 2.0]).unwrap();

        let back: Vec<f64> = read_model(&path, ModelKind::GradientBoostedTrees).unwrap();
        assert_eq!(back, vec![1.0, 2.0]);

        let wrong = read_model::<Vec<f64>>(&path, ModelKind::ObliviousBoosting);
        assert!(matches!(wrong, Err(BoostingError::WrongModelKind { .. })));
    }

    #[test]
    fn test_future_version_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model.bin");
        let bytes =
            postcard::to_allocvec(&(FORMAT_VERSION + 1, ModelKind::ObliviousBoosting, 0u8)).unwrap();
        fs::write(&path, bytes).unwrap();

        assert!(matches!(
            read_model::<u8>(&path, ModelKind::ObliviousBoosting),
            Err(BoostingError::UnsupportedFormat { found: 2, expected: 1 })
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = read_model::<u8>(Path::new("/nonexistent/model.bin"), ModelKind::GradientBoostedTrees);
        assert!(matches!(result, Err(BoostingError::Io(_))));
    }
}
