use crate::align::{ExpandedAlignment, ScoreComponents};

/// Everything the writer thread needs about one scored utterance pair.
#[derive(Debug)]
pub struct SegmentScore {
    pub wer_components: ScoreComponents,
    pub wer_alignment: ExpandedAlignment,
    pub power_components: ScoreComponents,
    pub power_alignment: ExpandedAlignment,
    pub phonetic_alignments: Vec<Option<ExpandedAlignment>>,
}

/// Outcome of scoring one line pair. Blank line pairs and per-utterance
/// failures still occupy their slot in the output so that line numbers stay
/// aligned with the input files.
#[derive(Debug)]
pub enum SegmentOutcome {
    Scored(Box<SegmentScore>),
    Blank,
    Failed(String),
}
