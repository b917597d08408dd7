use crate::align::AlignLabel;
use crate::utils::AlignError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;

/// Matches maximal label runs that contain at least one substitution plus at
/// least one more error. Applied leftmost-longest over the one-letter label
/// codes.
static ERROR_REGION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new("[SDI]*S[SDI]+|[SDI]+S[SDI]*").unwrap());

/// Aggregated alignment counts. `ref_length` is the number of reference
/// tokens covered by non-insertion slots.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScoreComponents {
    pub correct: usize,
    pub substitution: usize,
    pub deletion: usize,
    pub insertion: usize,
    pub ref_length: usize,
}

impl ScoreComponents {
    pub fn error_rate(&self) -> f64 {
        if self.ref_length == 0 {
            return 1.0;
        }
        (self.substitution + self.deletion + self.insertion) as f64 / self.ref_length as f64
    }

    pub fn errors(&self) -> usize {
        self.substitution + self.deletion + self.insertion
    }
}

impl std::ops::AddAssign for ScoreComponents {
    fn add_assign(&mut self, other: ScoreComponents) {
        self.correct += other.correct;
        self.substitution += other.substitution;
        self.deletion += other.deletion;
        self.insertion += other.insertion;
        self.ref_length += other.ref_length;
    }
}

/// A slot-per-slot alignment of two token sequences. The three parallel
/// sequences always have equal length; a slot holds the aligned surface
/// tokens (possibly several, space-joined, after reconciliation merges
/// words) or an empty string on the side an indel skips. `ref_map` and
/// `hyp_map` give the slot index of every surface token in order.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedAlignment {
    pub ref_slots: Vec<String>,
    pub hyp_slots: Vec<String>,
    pub labels: Vec<AlignLabel>,
    pub ref_map: Vec<usize>,
    pub hyp_map: Vec<usize>,
    pub lowercase: bool,
}

impl ExpandedAlignment {
    pub fn new(
        ref_slots: Vec<String>,
        hyp_slots: Vec<String>,
        labels: Vec<AlignLabel>,
        ref_map: Option<Vec<usize>>,
        hyp_map: Option<Vec<usize>>,
        lowercase: bool,
    ) -> Result<Self, AlignError> {
        if ref_slots.len() != labels.len() || hyp_slots.len() != labels.len() {
            return Err(AlignError::invalid_input(format!(
                "slot length mismatch: labels {}, ref {}, hyp {}",
                labels.len(),
                ref_slots.len(),
                hyp_slots.len()
            )));
        }
        if labels.is_empty() {
            return Err(AlignError::invalid_input("alignment has no slots"));
        }

        let mut alignment = ExpandedAlignment {
            ref_slots,
            hyp_slots,
            labels,
            ref_map: Vec::new(),
            hyp_map: Vec::new(),
            lowercase,
        };
        match (ref_map, hyp_map) {
            (Some(ref_map), Some(hyp_map)) => {
                alignment.ref_map = ref_map;
                alignment.hyp_map = hyp_map;
            }
            _ => alignment.recompute_maps(),
        }
        Ok(alignment)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Non-empty reference slots, in order. Joining them reproduces the
    /// original reference string.
    pub fn ref_tokens(&self) -> Vec<String> {
        self.ref_slots.iter().filter(|s| !s.is_empty()).cloned().collect()
    }

    pub fn hyp_tokens(&self) -> Vec<String> {
        self.hyp_slots.iter().filter(|s| !s.is_empty()).cloned().collect()
    }

    pub fn ref_string(&self) -> String {
        self.ref_tokens().join(" ")
    }

    pub fn hyp_string(&self) -> String {
        self.hyp_tokens().join(" ")
    }

    /// The surface tokens held by one reference slot.
    pub fn ref_slot_tokens(&self, i: usize) -> Vec<&str> {
        self.ref_slots[i].split_whitespace().collect()
    }

    pub fn hyp_slot_tokens(&self, i: usize) -> Vec<&str> {
        self.hyp_slots[i].split_whitespace().collect()
    }

    pub fn label_codes(&self) -> String {
        self.labels.iter().map(|l| l.code()).collect()
    }

    /// Copies the slot range [i, j). With `preserve_index` the token maps
    /// keep their absolute slot positions instead of rebasing to the start
    /// of the subsequence.
    pub fn subsequence(
        &self,
        i: usize,
        j: usize,
        preserve_index: bool,
    ) -> Result<ExpandedAlignment, AlignError> {
        let scale = if preserve_index { 0 } else { i };
        let ref_map = self
            .ref_map
            .iter()
            .filter(|&&pos| i <= pos && pos < j)
            .map(|&pos| pos - scale)
            .collect();
        let hyp_map = self
            .hyp_map
            .iter()
            .filter(|&&pos| i <= pos && pos < j)
            .map(|&pos| pos - scale)
            .collect();
        ExpandedAlignment::new(
            self.ref_slots[i..j].to_vec(),
            self.hyp_slots[i..j].to_vec(),
            self.labels[i..j].to_vec(),
            Some(ref_map),
            Some(hyp_map),
            self.lowercase,
        )
    }

    /// Splits the alignment into contiguous segments, flagging the segments
    /// that are candidate error regions. Returns the segments in order plus
    /// the indices of the flagged ones; the segments cover the alignment
    /// without gaps or overlaps.
    pub fn split_error_regions(
        &self,
    ) -> Result<(Vec<ExpandedAlignment>, Vec<usize>), AlignError> {
        let mut regions = Vec::new();
        let mut error_indexes = Vec::new();
        let codes = self.label_codes();

        let mut prev_index = 0;
        for found in ERROR_REGION_RE.find_iter(&codes) {
            let (i, j) = (found.start(), found.end());
            if prev_index < i {
                regions.push(self.subsequence(prev_index, i, false)?);
            }
            error_indexes.push(regions.len());
            regions.push(self.subsequence(i, j, false)?);
            prev_index = j;
        }
        if prev_index < self.len() {
            regions.push(self.subsequence(prev_index, self.len(), false)?);
        }
        Ok((regions, error_indexes))
    }

    /// Concatenates another alignment onto this one, shifting its token maps
    /// past the current slots.
    pub fn append_alignment(&mut self, other: &ExpandedAlignment) {
        let map_offset = self.len();
        self.ref_slots.extend_from_slice(&other.ref_slots);
        self.hyp_slots.extend_from_slice(&other.hyp_slots);
        self.labels.extend_from_slice(&other.labels);
        self.ref_map.extend(other.ref_map.iter().map(|pos| pos + map_offset));
        self.hyp_map.extend(other.hyp_map.iter().map(|pos| pos + map_offset));
    }

    /// Regenerates both token maps from the slots and labels.
    pub fn recompute_maps(&mut self) {
        self.ref_map.clear();
        self.hyp_map.clear();
        for i in 0..self.len() {
            if self.labels[i] != AlignLabel::Insertion {
                self.ref_map
                    .extend(std::iter::repeat(i).take(self.ref_slot_tokens(i).len()));
            }
            if self.labels[i] != AlignLabel::Deletion {
                self.hyp_map
                    .extend(std::iter::repeat(i).take(self.hyp_slot_tokens(i).len()));
            }
        }
    }

    /// Error rate over this alignment, with the reference as ground truth.
    /// A multiword slot counts with the magnitude of its larger side; an
    /// empty reference yields a rate of 1.0.
    pub fn error_rate(&self) -> (f64, ScoreComponents) {
        let mut components = ScoreComponents::default();

        for i in 0..self.len() {
            let label = self.labels[i];
            let mut magnitude = 1;
            if label != AlignLabel::Insertion {
                let ref_seg_len = self.ref_slot_tokens(i).len();
                let hyp_seg_len = self.hyp_slot_tokens(i).len();
                magnitude = ref_seg_len.max(hyp_seg_len);
                components.ref_length += ref_seg_len;
            }
            match label {
                AlignLabel::Correct => components.correct += magnitude,
                AlignLabel::Substitution => components.substitution += magnitude,
                AlignLabel::Deletion => components.deletion += magnitude,
                AlignLabel::Insertion => components.insertion += magnitude,
            }
        }

        (components.error_rate(), components)
    }

    /// Substitution pairs keyed by reference token, with hypothesis token
    /// counts. Keys are lowercased when the alignment is case-insensitive.
    pub fn confusion_pairs(&self) -> BTreeMap<String, BTreeMap<String, usize>> {
        let mut pairs: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();
        for i in 0..self.len() {
            if self.labels[i] == AlignLabel::Substitution {
                let (mut ref_tok, mut hyp_tok) =
                    (self.ref_slots[i].clone(), self.hyp_slots[i].clone());
                if self.lowercase {
                    ref_tok = ref_tok.to_lowercase();
                    hyp_tok = hyp_tok.to_lowercase();
                }
                *pairs.entry(ref_tok).or_default().entry(hyp_tok).or_insert(0) += 1;
            }
        }
        pairs
    }

    /// Expands each slot's label once per hypothesis token (at least once),
    /// giving a per-token label sequence oriented on the hypothesis.
    pub fn hyp_oriented_labels(&self) -> Vec<AlignLabel> {
        let mut labels = Vec::new();
        for i in 0..self.len() {
            let count = self.hyp_slot_tokens(i).len().max(1);
            labels.extend(std::iter::repeat(self.labels[i]).take(count));
        }
        labels
    }
}

impl fmt::Display for ExpandedAlignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Width padding counts characters, not bytes, so non-ASCII tokens
        // stay column-aligned.
        let widths: Vec<usize> = (0..self.len())
            .map(|i| {
                self.ref_slots[i]
                    .chars()
                    .count()
                    .max(self.hyp_slots[i].chars().count())
            })
            .collect();

        let pad_row = |row: Vec<String>| -> String {
            row.iter()
                .zip(&widths)
                .map(|(cell, &w)| format!("{:<width$}", cell, width = w))
                .collect::<Vec<_>>()
                .join("  ")
        };

        let label_row: Vec<String> = self.labels.iter().map(|l| l.code().to_string()).collect();
        writeln!(f, "REF:  {}", pad_row(self.ref_slots.clone()))?;
        writeln!(f, "HYP:  {}", pad_row(self.hyp_slots.clone()))?;
        write!(f, "Eval: {}", pad_row(label_row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::AlignLabel::*;

    fn slots(s: &[&str]) -> Vec<String> {
        s.iter().map(|t| t.to_string()).collect()
    }

    fn sample() -> ExpandedAlignment {
        // REF: the big _   cat sat
        // HYP: the _   wee cat sit
        ExpandedAlignment::new(
            slots(&["the", "big", "", "cat", "sat"]),
            slots(&["the", "", "wee", "cat", "sit"]),
            vec![Correct, Deletion, Insertion, Correct, Substitution],
            None,
            None,
            false,
        )
        .unwrap()
    }

    #[test]
    fn round_trip_reconstruction() {
        let alignment = sample();
        assert_eq!(alignment.ref_string(), "the big cat sat");
        assert_eq!(alignment.hyp_string(), "the wee cat sit");
    }

    #[test]
    fn unequal_lengths_rejected() {
        let err = ExpandedAlignment::new(
            slots(&["a"]),
            slots(&["a", "b"]),
            vec![Correct],
            None,
            None,
            false,
        )
        .unwrap_err();
        assert!(matches!(err, AlignError::InvalidInput { .. }));
    }

    #[test]
    fn zero_length_rejected() {
        let err =
            ExpandedAlignment::new(vec![], vec![], vec![], None, None, false).unwrap_err();
        assert!(matches!(err, AlignError::InvalidInput { .. }));
    }

    #[test]
    fn maps_skip_indel_gaps() {
        let alignment = sample();
        assert_eq!(alignment.ref_map, vec![0, 1, 3, 4]);
        assert_eq!(alignment.hyp_map, vec![0, 2, 3, 4]);
    }

    #[test]
    fn maps_count_multiword_slots_per_token() {
        let alignment = ExpandedAlignment::new(
            slots(&["new york", "city"]),
            slots(&["newark", "city"]),
            vec![Substitution, Correct],
            None,
            None,
            false,
        )
        .unwrap();
        assert_eq!(alignment.ref_map, vec![0, 0, 1]);
        assert_eq!(alignment.hyp_map, vec![0, 1]);
    }

    #[test]
    fn provided_maps_match_recomputed_maps() {
        let reference = slots(&["They", "", "asked"]);
        let hypothesis = slots(&["they", "gave", "ask"]);
        let labels = vec![Correct, Insertion, Substitution];
        let recomputed = ExpandedAlignment::new(
            reference.clone(),
            hypothesis.clone(),
            labels.clone(),
            None,
            None,
            true,
        )
        .unwrap();
        let provided = ExpandedAlignment::new(
            reference,
            hypothesis,
            labels,
            Some(vec![0, 2]),
            Some(vec![0, 1, 2]),
            true,
        )
        .unwrap();
        assert_eq!(recomputed.ref_map, provided.ref_map);
        assert_eq!(recomputed.hyp_map, provided.hyp_map);
    }

    #[test]
    fn subsequence_rebases_maps() {
        let alignment = sample();
        let sub = alignment.subsequence(1, 4, false).unwrap();
        assert_eq!(sub.ref_slots, slots(&["big", "", "cat"]));
        assert_eq!(sub.ref_map, vec![0, 2]);
        assert_eq!(sub.hyp_map, vec![1, 2]);
    }

    #[test]
    fn subsequence_can_preserve_absolute_indices() {
        let alignment = sample();
        let sub = alignment.subsequence(3, 5, true).unwrap();
        assert_eq!(sub.ref_map, vec![3, 4]);
        assert_eq!(sub.hyp_map, vec![3, 4]);
    }

    #[test]
    fn append_offsets_maps() {
        let mut head = sample().subsequence(0, 2, false).unwrap();
        let tail = sample().subsequence(2, 5, false).unwrap();
        head.append_alignment(&tail);
        let full = sample();
        assert_eq!(head.ref_slots, full.ref_slots);
        assert_eq!(head.hyp_slots, full.hyp_slots);
        assert_eq!(head.labels, full.labels);
        assert_eq!(head.ref_map, full.ref_map);
        assert_eq!(head.hyp_map, full.hyp_map);
    }

    #[test]
    fn split_error_regions_is_a_gap_free_cover() {
        let alignment = ExpandedAlignment::new(
            slots(&["a", "b", "", "c", "d", "e", "f"]),
            slots(&["a", "x", "y", "c", "d", "z", ""]),
            vec![
                Correct,
                Substitution,
                Insertion,
                Correct,
                Correct,
                Substitution,
                Deletion,
            ],
            None,
            None,
            false,
        )
        .unwrap();

        let (regions, error_indexes) = alignment.split_error_regions().unwrap();
        assert_eq!(error_indexes, vec![1, 3]);
        assert_eq!(regions.len(), 4);
        assert_eq!(regions[0].label_codes(), "C");
        assert_eq!(regions[1].label_codes(), "SI");
        assert_eq!(regions[2].label_codes(), "CC");
        assert_eq!(regions[3].label_codes(), "SD");

        // Concatenating the segments restores the original alignment.
        let mut rebuilt = regions[0].clone();
        for region in &regions[1..] {
            rebuilt.append_alignment(region);
        }
        assert_eq!(rebuilt.labels, alignment.labels);
        assert_eq!(rebuilt.ref_slots, alignment.ref_slots);
        assert_eq!(rebuilt.hyp_slots, alignment.hyp_slots);
    }

    #[test]
    fn lone_substitution_is_not_an_error_region() {
        let alignment = ExpandedAlignment::new(
            slots(&["a", "b", "c"]),
            slots(&["a", "x", "c"]),
            vec![Correct, Substitution, Correct],
            None,
            None,
            false,
        )
        .unwrap();
        let (regions, error_indexes) = alignment.split_error_regions().unwrap();
        assert!(error_indexes.is_empty());
        assert_eq!(regions.len(), 1);
    }

    #[test]
    fn indel_run_without_substitution_is_not_an_error_region() {
        let alignment = ExpandedAlignment::new(
            slots(&["a", "b", "c", ""]),
            slots(&["a", "", "c", "y"]),
            vec![Correct, Deletion, Correct, Insertion],
            None,
            None,
            false,
        )
        .unwrap();
        let (_, error_indexes) = alignment.split_error_regions().unwrap();
        assert!(error_indexes.is_empty());
    }

    #[test]
    fn splitting_a_split_region_again_is_idempotent() {
        let alignment = ExpandedAlignment::new(
            slots(&["a", "b", "", "c"]),
            slots(&["a", "x", "y", "c"]),
            vec![Correct, Substitution, Insertion, Correct],
            None,
            None,
            false,
        )
        .unwrap();
        let (regions, error_indexes) = alignment.split_error_regions().unwrap();
        assert_eq!(error_indexes, vec![1]);
        let (again, again_indexes) = regions[1].split_error_regions().unwrap();
        assert_eq!(again.len(), 1);
        assert_eq!(again_indexes, vec![0]);
        assert_eq!(again[0].labels, regions[1].labels);
    }

    #[test]
    fn error_rate_components_identity() {
        let alignment = sample();
        let (rate, components) = alignment.error_rate();
        assert_eq!(components.correct, 2);
        assert_eq!(components.substitution, 1);
        assert_eq!(components.deletion, 1);
        assert_eq!(components.insertion, 1);
        assert_eq!(components.ref_length, 4);
        assert!((rate - 0.75).abs() < 1e-9);
        assert_eq!(
            components.correct + components.substitution + components.deletion,
            components.ref_length
        );
    }

    #[test]
    fn multiword_slot_magnitude_is_the_larger_side() {
        let alignment = ExpandedAlignment::new(
            slots(&["new york"]),
            slots(&["newark"]),
            vec![Substitution],
            None,
            None,
            false,
        )
        .unwrap();
        let (rate, components) = alignment.error_rate();
        assert_eq!(components.substitution, 2);
        assert_eq!(components.ref_length, 2);
        assert!((rate - 1.0).abs() < 1e-9);
    }

    #[test]
    fn all_insertion_alignment_has_unit_error_rate() {
        let alignment = ExpandedAlignment::new(
            slots(&["", ""]),
            slots(&["a", "b"]),
            vec![Insertion, Insertion],
            None,
            None,
            false,
        )
        .unwrap();
        let (rate, components) = alignment.error_rate();
        assert_eq!(components.ref_length, 0);
        assert!((rate - 1.0).abs() < 1e-9);
    }

    #[test]
    fn confusion_pairs_lowercase_when_configured() {
        let alignment = ExpandedAlignment::new(
            slots(&["An", "an"]),
            slots(&["on", "On"]),
            vec![Substitution, Substitution],
            None,
            None,
            true,
        )
        .unwrap();
        let pairs = alignment.confusion_pairs();
        assert_eq!(pairs["an"]["on"], 2);
    }

    #[test]
    fn hyp_oriented_labels_expand_multiword_slots() {
        let alignment = ExpandedAlignment::new(
            slots(&["big", "cat"]),
            slots(&["bug king", "cat"]),
            vec![Substitution, Correct],
            None,
            None,
            false,
        )
        .unwrap();
        assert_eq!(
            alignment.hyp_oriented_labels(),
            vec![Substitution, Substitution, Correct]
        );
    }

    #[test]
    fn display_pads_columns() {
        let alignment = ExpandedAlignment::new(
            slots(&["an", "envelope"]),
            slots(&["on", "low"]),
            vec![Substitution, Substitution],
            None,
            None,
            false,
        )
        .unwrap();
        let rendered = alignment.to_string();
        let expected = "REF:  an  envelope\n\
                        HYP:  on  low     \n\
                        Eval: S   S       ";
        assert_eq!(rendered, expected);
    }

    #[test]
    fn display_pads_multibyte_tokens_by_character() {
        let alignment = ExpandedAlignment::new(
            slots(&["café", "au"]),
            slots(&["cave", "eau"]),
            vec![Substitution, Substitution],
            None,
            None,
            false,
        )
        .unwrap();
        let rendered = alignment.to_string();
        // "café" is four characters wide despite its five bytes.
        let expected = "REF:  café  au \n\
                        HYP:  cave  eau\n\
                        Eval: S     S  ";
        assert_eq!(rendered, expected);
    }
}
