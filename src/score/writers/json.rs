use crate::align::{ExpandedAlignment, ScoreComponents};
use crate::score::writers::ReportWriter;
use crate::utils::{open_text_writer, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};

#[derive(Serialize)]
struct ErrorTypes {
    #[serde(rename = "C")]
    correct: usize,
    #[serde(rename = "S")]
    substitution: usize,
    #[serde(rename = "D")]
    deletion: usize,
    #[serde(rename = "I")]
    insertion: usize,
    #[serde(rename = "refLength")]
    ref_length: usize,
}

#[derive(Serialize)]
struct AlignmentSlot<'a> {
    align: char,
    #[serde(rename = "ref")]
    ref_slot: &'a str,
    hyp: &'a str,
}

#[derive(Serialize)]
struct SegmentRecord<'a> {
    id: usize,
    #[serde(rename = "errorTypes")]
    error_types: ErrorTypes,
    #[serde(rename = "errRate")]
    err_rate: f64,
    alignments: Vec<AlignmentSlot<'a>>,
}

/// One JSON object per line; blank line pairs serialize as `{}`.
pub struct JsonWriter {
    out: BufWriter<File>,
    path: String,
}

impl JsonWriter {
    pub fn create(path: &str) -> Result<Self> {
        Ok(JsonWriter {
            out: open_text_writer(path)?,
            path: path.to_string(),
        })
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        writeln!(self.out, "{}", line).map_err(|e| format!("Failed to write {}: {}", self.path, e))
    }
}

impl ReportWriter for JsonWriter {
    fn write(
        &mut self,
        id: usize,
        components: &ScoreComponents,
        alignment: &ExpandedAlignment,
        _phonetic_alignments: Option<&[Option<ExpandedAlignment>]>,
    ) -> Result<()> {
        let record = SegmentRecord {
            id,
            error_types: ErrorTypes {
                correct: components.correct,
                substitution: components.substitution,
                deletion: components.deletion,
                insertion: components.insertion,
                ref_length: components.ref_length,
            },
            err_rate: components.error_rate(),
            alignments: (0..alignment.len())
                .map(|i| AlignmentSlot {
                    align: alignment.labels[i].code(),
                    ref_slot: &alignment.ref_slots[i],
                    hyp: &alignment.hyp_slots[i],
                })
                .collect(),
        };
        let line = serde_json::to_string(&record)
            .map_err(|e| format!("Failed to serialize segment {}: {}", id, e))?;
        self.write_line(&line)
    }

    fn write_blank(&mut self) -> Result<()> {
        self.write_line("{}")
    }

    fn finalize(&mut self) -> Result<()> {
        self.out
            .flush()
            .map_err(|e| format!("Failed to flush {}: {}", self.path, e))?;
        log::info!("File written to {}", self.path);
        Ok(())
    }
}
