//! Loading of the risk catalog, weight matrix and submission files.

use crate::audit::AuditContext;
use crate::errors::{SdltError, SdltResult, ValidationErrors};
use crate::matrix::{ControlWeightSet, WeightMatrix};
use crate::models::{Catalog, Risk, SecurityComponent, SecurityControl};
use crate::submission::Submission;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Catalog and weight rows as stored in a dataset file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub risks: Vec<Risk>,
    #[serde(default)]
    pub components: Vec<SecurityComponent>,
    #[serde(default)]
    pub controls: Vec<SecurityControl>,
    #[serde(default)]
    pub weights: Vec<ControlWeightSet>,
}

/// A weight row refused by the validating load.
#[derive(Debug, Clone, Serialize)]
pub struct RejectedRow {
    /// Position in the dataset file
    pub index: usize,
    pub row: ControlWeightSet,
    pub errors: ValidationErrors,
}

impl Dataset {
    pub fn load<P: AsRef<Path>>(path: P) -> SdltResult<Self> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(|e| SdltError::io(e, path.to_path_buf()))?;
        let dataset: Dataset =
            serde_json::from_str(&contents).map_err(|e| SdltError::json(e, path.to_path_buf()))?;
        log::info!(
            "Loaded dataset {:?}: {} risks, {} components, {} controls, {} weight rows",
            path,
            dataset.risks.len(),
            dataset.components.len(),
            dataset.controls.len(),
            dataset.weights.len()
        );
        Ok(dataset)
    }

    pub fn catalog(&self) -> Catalog {
        Catalog::new(
            self.risks.clone(),
            self.components.clone(),
            self.controls.clone(),
        )
    }

    /// Build the matrix through the validating write path, collecting every rejection.
    pub fn build_matrix(
        &self,
        catalog: &Catalog,
        ctx: &AuditContext,
    ) -> (WeightMatrix, Vec<RejectedRow>) {
        let mut matrix = WeightMatrix::new();
        let mut rejected = Vec::new();

        for (index, row) in self.weights.iter().enumerate() {
            if let Err(errors) = matrix.save(row.clone(), catalog, ctx) {
                log::warn!("Weight row {} rejected: {}", index, errors);
                rejected.push(RejectedRow {
                    index,
                    row: row.clone(),
                    errors,
                });
            }
        }
        (matrix, rejected)
    }

    /// Build the matrix from stored rows as-is.
    pub fn build_matrix_unchecked(&self, catalog: &Catalog) -> WeightMatrix {
        WeightMatrix::load_unchecked(self.weights.clone(), catalog)
    }
}

/// JSON files under `dir`, sorted by path.
pub fn discover_submissions(dir: &Path) -> SdltResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(SdltError::io(
            std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
            dir.to_path_buf(),
        ));
    }

    let mut paths: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::warn!("Error accessing entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("json"))
        .collect();
    paths.sort();

    log::debug!("Found {} submission files under {:?}", paths.len(), dir);
    Ok(paths)
}

/// Load every file, keeping parse failures alongside their path.
pub fn load_submissions(paths: &[PathBuf]) -> (Vec<Submission>, Vec<(PathBuf, SdltError)>) {
    let mut loaded = Vec::new();
    let mut failed = Vec::new();
    for path in paths {
        match Submission::load(path) {
            Ok(submission) => loaded.push(submission),
            Err(e) => {
                log::warn!("Skipping {:?}: {}", path, e);
                failed.push((path.clone(), e));
            }
        }
    }
    (loaded, failed)
}
