use crate::error::StateResult;
use std::path::{Path, PathBuf};

/// Extension of the opaque state blobs.
pub const BLOB_EXT: &str = "json";

/// Filesystem layout of one checkpoint directory.
///
/// ```text
/// <root>/system.json
/// <root>/<model>.<weights-ext>
/// <root>/<model>_opt.<optimizer-ext>
/// <root>/summary.json
/// <root>/traces.json  tops.json  nops.json  ds.json
/// ```
#[derive(Debug, Clone)]
pub struct CheckpointLayout {
    root: PathBuf,
}

impl CheckpointLayout {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn system_path(&self) -> PathBuf {
        self.root.join("system.json")
    }

    #[must_use]
    pub fn summary_path(&self) -> PathBuf {
        self.blob_path("summary")
    }

    #[must_use]
    pub fn traces_path(&self) -> PathBuf {
        self.blob_path("traces")
    }

    #[must_use]
    pub fn tensor_ops_path(&self) -> PathBuf {
        self.blob_path("tops")
    }

    #[must_use]
    pub fn numpy_ops_path(&self) -> PathBuf {
        self.blob_path("nops")
    }

    #[must_use]
    pub fn datasets_path(&self) -> PathBuf {
        self.blob_path("ds")
    }

    /// Every non-model file a restore requires, in restore order.
    #[must_use]
    pub fn state_files(&self) -> Vec<PathBuf> {
        vec![
            self.system_path(),
            self.summary_path(),
            self.traces_path(),
            self.tensor_ops_path(),
            self.numpy_ops_path(),
            self.datasets_path(),
        ]
    }

    #[must_use]
    pub fn weights_path(&self, model_name: &str, ext: &str) -> PathBuf {
        self.root.join(format!("{model_name}.{ext}"))
    }

    #[must_use]
    pub fn optimizer_path(&self, model_name: &str, ext: &str) -> PathBuf {
        self.root.join(format!("{model_name}_opt.{ext}"))
    }

    pub fn ensure_dir(&self) -> StateResult<()> {
        std::fs::create_dir_all(&self.root)?;
        Ok(())
    }

    fn blob_path(&self, stem: &str) -> PathBuf {
        self.root.join(format!("{stem}.{BLOB_EXT}"))
    }
}
