use crate::align::{ExpandedAlignment, ScoreComponents};
use crate::score::writers::ReportWriter;
use crate::utils::{open_text_writer, Result};
use itertools::Itertools;
use std::fs::File;
use std::io::{BufWriter, Write};

/// One line of space-joined label codes per utterance, expanded so that
/// every hypothesis token carries its own label.
pub struct AlignWriter {
    out: BufWriter<File>,
    path: String,
}

impl AlignWriter {
    pub fn create(path: &str) -> Result<Self> {
        Ok(AlignWriter {
            out: open_text_writer(path)?,
            path: path.to_string(),
        })
    }
}

impl ReportWriter for AlignWriter {
    fn write(
        &mut self,
        _id: usize,
        _components: &ScoreComponents,
        alignment: &ExpandedAlignment,
        _phonetic_alignments: Option<&[Option<ExpandedAlignment>]>,
    ) -> Result<()> {
        let line = alignment
            .hyp_oriented_labels()
            .iter()
            .map(|label| label.code())
            .join(" ");
        writeln!(self.out, "{}", line).map_err(|e| format!("Failed to write {}: {}", self.path, e))
    }

    fn write_blank(&mut self) -> Result<()> {
        writeln!(self.out).map_err(|e| format!("Failed to write {}: {}", self.path, e))
    }

    fn finalize(&mut self) -> Result<()> {
        self.out
            .flush()
            .map_err(|e| format!("Failed to flush {}: {}", self.path, e))?;
        log::info!("File written to {}", self.path);
        Ok(())
    }
}
