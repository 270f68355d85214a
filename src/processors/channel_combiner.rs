use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::error::Result;
use crate::models::{Channel, PassType, SwathSample};
use crate::readers::SwathReader;
use crate::utils::coordinates::BoundingBox;
use crate::utils::filename::combined_csv_path;
use crate::writers::csv_writer;

/// Merges the granules of one calendar day into two directional daily
/// tables per frequency channel.
///
/// The pair of output paths is the cache key: when both exist the inputs
/// are not touched at all, which is what makes multi-month backfills
/// resumable after interruption. One existing file alone (a partial prior
/// failure) does not count as done.
pub struct ChannelCombiner {
    reader: SwathReader,
    output_root: PathBuf,
    bounding_box: Option<BoundingBox>,
}

impl ChannelCombiner {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            reader: SwathReader::new(),
            output_root: output_root.into(),
            bounding_box: None,
        }
    }

    pub fn with_bounding_box(mut self, bbox: BoundingBox) -> Self {
        self.bounding_box = Some(bbox);
        self
    }

    /// Combine one day's granules for one channel. Returns the
    /// (ascending, descending) table paths whether or not anything new was
    /// written.
    pub fn combine(
        &self,
        files: &[PathBuf],
        date: NaiveDate,
        channel: Channel,
    ) -> Result<(PathBuf, PathBuf)> {
        let ascending_path =
            combined_csv_path(&self.output_root, date, channel, PassType::Ascending);
        let descending_path =
            combined_csv_path(&self.output_root, date, channel, PassType::Descending);

        if ascending_path.exists() && descending_path.exists() {
            info!(date = %date, channel = %channel, "combined tables already exist, skipping");
            return Ok((ascending_path, descending_path));
        }

        // Decoding is read-only and fans out across granules; the two
        // writes below happen on this thread only, after the join.
        let per_file: Vec<Vec<SwathSample>> = files
            .par_iter()
            .filter_map(|path| self.decode_one(path, channel))
            .collect();

        let mut ascending = Vec::new();
        let mut descending = Vec::new();
        for samples in per_file {
            for sample in samples {
                match sample.pass_type {
                    PassType::Ascending => ascending.push(sample),
                    PassType::Descending => descending.push(sample),
                }
            }
        }

        if !ascending.is_empty() {
            csv_writer::write_samples(&ascending_path, &ascending, channel)?;
            info!(
                path = %ascending_path.display(),
                rows = ascending.len(),
                "wrote ascending table"
            );
        }
        if !descending.is_empty() {
            csv_writer::write_samples(&descending_path, &descending, channel)?;
            info!(
                path = %descending_path.display(),
                rows = descending.len(),
                "wrote descending table"
            );
        }

        Ok((ascending_path, descending_path))
    }

    /// Decode one granule into flattened samples. Every failure mode here
    /// is per-file: unknown pass markers are dropped silently, decode and
    /// alignment errors are logged and skipped, and the batch continues.
    fn decode_one(&self, path: &Path, channel: Channel) -> Option<Vec<SwathSample>> {
        let file_name = path.file_name()?.to_str()?;
        let pass_type = PassType::from_file_name(file_name)?;

        match self.reader.decode(path, channel) {
            Ok(grid) => Some(grid.samples(pass_type, self.bounding_box.as_ref())),
            Err(e) => {
                warn!(granule = %path.display(), error = %e, "skipping undecodable granule");
                None
            }
        }
    }
}
