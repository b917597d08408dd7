mod align;
mod compare;
mod confusion;
mod json;
mod snt;

pub use align::AlignWriter;
pub use compare::write_comparison;
pub use confusion::{write_confusions_json, write_confusions_text, ConfusionCounts, ConfusionFormat};
pub use json::JsonWriter;
pub use snt::SntWriter;

use crate::align::{ExpandedAlignment, ScoreComponents};
use crate::utils::Result;

/// Per-utterance report sink. One writer owns one output file; `finalize`
/// flushes it and logs the path. Writers are handed off to the writer
/// thread, hence `Send`.
pub trait ReportWriter: Send {
    fn write(
        &mut self,
        id: usize,
        components: &ScoreComponents,
        alignment: &ExpandedAlignment,
        phonetic_alignments: Option<&[Option<ExpandedAlignment>]>,
    ) -> Result<()>;

    fn write_blank(&mut self) -> Result<()> {
        Ok(())
    }

    fn finalize(&mut self) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    Snt,
    Json,
    Align,
}

impl ReportFormat {
    pub fn suffix(&self) -> &'static str {
        match self {
            ReportFormat::Snt => "snt",
            ReportFormat::Json => "json",
            ReportFormat::Align => "align",
        }
    }

    pub fn create_writer(&self, path: &str, hyp_name: &str) -> Result<Box<dyn ReportWriter>> {
        Ok(match self {
            ReportFormat::Snt => Box::new(SntWriter::create(path, hyp_name)?),
            ReportFormat::Json => Box::new(JsonWriter::create(path)?),
            ReportFormat::Align => Box::new(AlignWriter::create(path)?),
        })
    }
}
