//! Progress notifications for long-running batch jobs.
//!
//! The library never prints; front ends implement [`Progress`] to drive a
//! progress bar or console lines. Implementations must be `Sync` because
//! parallel evaluation notifies from worker threads.

use std::path::Path;

/// Something that happened to one file of a batch
#[derive(Debug, Clone, Copy)]
pub enum ProgressEvent<'a> {
    /// A pair was scored
    Evaluated {
        /// Ground-truth file name
        file: &'a str,
    },
    /// A pair had to be cropped to a common shape before scoring
    Cropped {
        /// Ground-truth file name
        file: &'a str,
        /// Ground-truth (height, width) before cropping
        gt: (u32, u32),
        /// Prediction (height, width) before cropping
        pred: (u32, u32),
        /// Common (height, width)
        to: (u32, u32),
    },
    /// No prediction file with the same name exists
    MissingPrediction {
        /// Ground-truth file name
        file: &'a str,
    },
    /// The file could not be processed and was skipped
    Failed {
        /// File name
        file: &'a str,
        /// Error description
        reason: &'a str,
    },
    /// An inference output was written
    Written {
        /// Input file name
        file: &'a str,
        /// Output path
        output: &'a Path,
    },
}

/// Observer of batch progress
pub trait Progress: Sync {
    /// A batch of `total` files is starting
    fn begin(&self, _total: usize, _label: &str) {}

    /// One file finished, successfully or not
    fn event(&self, _event: &ProgressEvent<'_>) {}

    /// The batch is complete
    fn finish(&self) {}
}

/// Progress observer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl Progress for Silent {}
