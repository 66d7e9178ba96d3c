//! External model bridge.
//!
//! The inpainting network is not linked into this binary. Instead a runner
//! program wrapping the model artifact is invoked once per image:
//!
//! ```text
//! <program> [model-args...] <input.png> <output.png>
//! ```
//!
//! The input is the preprocessed image written as 8-bit PNG; the runner
//! must write a reconstruction of the same size to the output path.

use facefill::{
    load_rgb, postprocess_to_u8, FacefillError, FacefillResult, Inpainter, NormalizedImage,
};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;
use uuid::Uuid;

/// Per-call scratch directory, removed on drop
#[derive(Debug)]
struct ScratchDir(PathBuf);

impl ScratchDir {
    fn create(parent: &Path) -> FacefillResult<Self> {
        let dir = parent.join(format!("facefill-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir)?;
        Ok(Self(dir))
    }

    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

/// Inpainter backed by an external runner program
#[derive(Debug, Clone)]
pub struct CommandInpainter {
    program: PathBuf,
    args: Vec<String>,
    scratch_root: PathBuf,
}

impl CommandInpainter {
    /// Create a bridge to `program`, passing `args` before the file paths
    #[must_use]
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            scratch_root: std::env::temp_dir(),
        }
    }

    /// Put scratch files under `dir` instead of the system temp directory
    #[must_use]
    pub fn with_scratch_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_root = dir.into();
        self
    }

    /// Runner program
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Inpainter for CommandInpainter {
    fn inpaint(&self, input: &NormalizedImage) -> FacefillResult<NormalizedImage> {
        let scratch = ScratchDir::create(&self.scratch_root)?;
        let in_path = scratch.path().join("input.png");
        let out_path = scratch.path().join("output.png");

        postprocess_to_u8(input).save(&in_path)?;

        debug!(program = %self.program.display(), args = ?self.args, "invoking model");
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(&in_path)
            .arg(&out_path)
            .output()
            .map_err(|e| FacefillError::inference(&self.program, format!("cannot start: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr.lines().last().unwrap_or("").trim();
            return Err(FacefillError::inference(
                &self.program,
                format!("runner exited with {}: {detail}", output.status),
            ));
        }

        let reconstructed = load_rgb(&out_path).map_err(|e| {
            FacefillError::inference(&self.program, format!("unreadable output: {e}"))
        })?;
        if (reconstructed.width(), reconstructed.height()) != (input.width(), input.height()) {
            return Err(FacefillError::inference(
                &self.program,
                format!(
                    "runner wrote {}x{}, expected {}x{}",
                    reconstructed.width(),
                    reconstructed.height(),
                    input.width(),
                    input.height()
                ),
            ));
        }

        Ok(NormalizedImage::from_rgb(&reconstructed))
    }
}
