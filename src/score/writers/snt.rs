use crate::align::{ExpandedAlignment, ScoreComponents};
use crate::score::writers::ReportWriter;
use crate::utils::{open_text_writer, Result};
use std::fs::File;
use std::io::{BufWriter, Write};

const RULE_HEAVY: &str =
    "===============================================================================";
const RULE_LIGHT: &str =
    "-------------------------------------------------------------------------------";

fn percent(count: usize, total: usize) -> String {
    format!("{:.1}%", 100.0 * count as f64 / total.max(1) as f64)
}

/// Sentence-level plain text report, one block per utterance.
pub struct SntWriter {
    out: BufWriter<File>,
    path: String,
}

impl SntWriter {
    pub fn create(path: &str, hyp_name: &str) -> Result<Self> {
        let mut out = open_text_writer(path)?;
        let header = format!(
            "{rule}\n             SENTENCE LEVEL REPORT FOR THE SYSTEM:\n\tName: {hyp_name}\n{rule}\n\n\n",
            rule = RULE_HEAVY
        );
        out.write_all(header.as_bytes())
            .map_err(|e| format!("Failed to write {}: {}", path, e))?;
        Ok(SntWriter {
            out,
            path: path.to_string(),
        })
    }
}

impl ReportWriter for SntWriter {
    fn write(
        &mut self,
        id: usize,
        components: &ScoreComponents,
        alignment: &ExpandedAlignment,
        phonetic_alignments: Option<&[Option<ExpandedAlignment>]>,
    ) -> Result<()> {
        let mut block = String::new();
        block.push_str(&format!("id: ({})\n", id));
        block.push_str(&format!(
            "Scores (#C #S #D #I) {} {} {} {}\n",
            components.correct,
            components.substitution,
            components.deletion,
            components.insertion
        ));
        block.push_str(&format!("{}\n\n", alignment));

        if let Some(phonetic_alignments) = phonetic_alignments {
            for phonetic in phonetic_alignments.iter().flatten() {
                block.push_str(&format!("{}\n", phonetic));
            }
            block.push('\n');
        }

        let length = components.ref_length;
        block.push_str(&format!(
            "Correct               =  {}   {}   ({})\n",
            percent(components.correct, length),
            components.correct,
            length
        ));
        block.push_str(&format!(
            "Substitutions         =  {}   {}   ({})\n",
            percent(components.substitution, length),
            components.substitution,
            length
        ));
        block.push_str(&format!(
            "Deletions             =  {}   {}   ({})\n",
            percent(components.deletion, length),
            components.deletion,
            length
        ));
        block.push_str(&format!(
            "Insertions            =  {}   {}   ({})\n\n",
            percent(components.insertion, length),
            components.insertion,
            length
        ));
        block.push_str(&format!(
            "Errors                =  {}   {}   ({})\n\n",
            percent(components.errors(), length),
            components.errors(),
            length
        ));
        block.push_str(&format!(
            "Ref. words            =         {}   ({})\n",
            length, length
        ));
        block.push_str(&format!(
            "Hyp. words            =         {}   ({})\n",
            alignment.hyp_tokens().join(" ").split_whitespace().count(),
            length
        ));
        block.push_str(&format!(
            "Aligned words         =         {}   ({})\n\n",
            components.correct + components.substitution,
            length
        ));
        block.push_str(&format!("{}\n\n", RULE_LIGHT));

        self.out
            .write_all(block.as_bytes())
            .map_err(|e| format!("Failed to write {}: {}", self.path, e))
    }

    fn finalize(&mut self) -> Result<()> {
        self.out
            .flush()
            .map_err(|e| format!("Failed to flush {}: {}", self.path, e))?;
        log::info!("File written to {}", self.path);
        Ok(())
    }
}
