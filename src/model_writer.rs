use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::feature::Feature;
use crate::model::Model;

/// Write a model in the `label<TAB>feature<TAB>weight` text format
pub struct ModelWriter;

impl ModelWriter {
    /// Write model to file
    pub fn write(path: &Path, model: &Model, threshold: f64) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        let written = Self::write_to(&mut writer, model, threshold)?;
        writer.flush()?;
        log::debug!(
            "saved {} of {} parameters to {}",
            written,
            model.num_params(),
            path.display()
        );
        Ok(())
    }

    /// Write the parameters to `w`, feature-name major and label minor.
    ///
    /// Parameters whose absolute weight is below `|threshold|` are skipped.
    /// Returns the number of lines written.
    pub fn write_to<W: Write>(w: &mut W, model: &Model, threshold: f64) -> Result<usize> {
        let threshold = threshold.abs();
        let mut written = 0;
        for (name, aid) in model.attrs.iter() {
            for (label, lid) in model.labels.iter() {
                let fid = match model.bag.get(Feature::new(lid, aid)) {
                    Some(fid) => fid,
                    None => continue,
                };
                let weight = model.weights[fid as usize];
                if weight.abs() < threshold {
                    continue;
                }
                writeln!(w, "{}\t{}\t{:.6}", label, name, weight)?;
                written += 1;
            }
        }
        Ok(written)
    }
}
