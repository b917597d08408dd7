use crate::align::{AlignLabel, CostWeights, ExpandedAlignment, SubstitutionPolicy};
use crate::utils::AlignError;
use arrayvec::ArrayVec;

/// Configuration for a single alignment run.
#[derive(Debug, Clone, Default)]
pub struct AlignConfig {
    pub weights: CostWeights,
    pub policy: SubstitutionPolicy,
    pub lowercase: bool,
}

/// One cell of the backtrack matrix: the minimal cumulative cost and every
/// label that achieves it. Options are ordered match/substitution first,
/// then deletion, then insertion.
#[derive(Debug, Clone)]
pub(crate) struct BackTrackCell {
    pub(crate) cost: u32,
    pub(crate) options: ArrayVec<AlignLabel, 3>,
}

#[derive(Debug)]
pub(crate) struct BackTrackMatrix {
    cells: Vec<BackTrackCell>,
    pub(crate) ref_len: usize,
    pub(crate) hyp_len: usize,
}

impl BackTrackMatrix {
    fn new(ref_len: usize, hyp_len: usize, weights: &CostWeights) -> Self {
        let empty = BackTrackCell {
            cost: 0,
            options: ArrayVec::new(),
        };
        let mut matrix = BackTrackMatrix {
            cells: vec![empty; (hyp_len + 1) * (ref_len + 1)],
            ref_len,
            hyp_len,
        };
        for i in 1..=hyp_len {
            let cell = matrix.cell_mut(i, 0);
            cell.cost = i as u32 * weights.insertion;
            cell.options.push(AlignLabel::Insertion);
        }
        for j in 1..=ref_len {
            let cell = matrix.cell_mut(0, j);
            cell.cost = j as u32 * weights.deletion;
            cell.options.push(AlignLabel::Deletion);
        }
        matrix
    }

    pub(crate) fn cell(&self, i: usize, j: usize) -> &BackTrackCell {
        &self.cells[i * (self.ref_len + 1) + j]
    }

    fn cell_mut(&mut self, i: usize, j: usize) -> &mut BackTrackCell {
        &mut self.cells[i * (self.ref_len + 1) + j]
    }
}

/// Weighted Levenshtein alignment between a reference and a hypothesis token
/// sequence. The matrix keeps every cost-tied backtrack label per cell, so a
/// single run supports both the fast single-path expansion and the canonical
/// tie-consistent extraction.
#[derive(Debug)]
pub struct Levenshtein {
    pub(crate) matrix: BackTrackMatrix,
    pub(crate) ref_tokens: Vec<String>,
    pub(crate) hyp_tokens: Vec<String>,
    pub(crate) lowercase: bool,
    pub dist: u32,
}

impl Levenshtein {
    /// Builds the (|hyp|+1) x (|ref|+1) backtrack matrix. Both sequences
    /// empty is rejected; a single empty side yields an all-deletion or
    /// all-insertion alignment.
    pub fn align(
        ref_tokens: &[String],
        hyp_tokens: &[String],
        config: &AlignConfig,
    ) -> Result<Self, AlignError> {
        if ref_tokens.is_empty() && hyp_tokens.is_empty() {
            return Err(AlignError::invalid_input(
                "cannot align two empty token sequences",
            ));
        }

        let ref_cmp: Vec<String> = if config.lowercase {
            ref_tokens.iter().map(|t| t.to_lowercase()).collect()
        } else {
            ref_tokens.to_vec()
        };
        let hyp_cmp: Vec<String> = if config.lowercase {
            hyp_tokens.iter().map(|t| t.to_lowercase()).collect()
        } else {
            hyp_tokens.to_vec()
        };

        let weights = &config.weights;
        let mut matrix = BackTrackMatrix::new(ref_tokens.len(), hyp_tokens.len(), weights);

        for (i, hyp_tok) in hyp_cmp.iter().enumerate() {
            for (j, ref_tok) in ref_cmp.iter().enumerate() {
                let ins_cost = matrix.cell(i, j + 1).cost + weights.insertion;
                let del_cost = matrix.cell(i + 1, j).cost + weights.deletion;

                let diag = if ref_tok == hyp_tok {
                    Some((AlignLabel::Correct, matrix.cell(i, j).cost + weights.correct))
                } else if config.policy.allows_substitution(ref_tok, hyp_tok) {
                    Some((
                        AlignLabel::Substitution,
                        matrix.cell(i, j).cost + weights.substitution,
                    ))
                } else {
                    None
                };

                let mut best = ins_cost.min(del_cost);
                if let Some((_, diag_cost)) = diag {
                    best = best.min(diag_cost);
                }

                let mut options: ArrayVec<AlignLabel, 3> = ArrayVec::new();
                if let Some((diag_label, diag_cost)) = diag {
                    if diag_cost == best {
                        options.push(diag_label);
                    }
                }
                if del_cost == best {
                    options.push(AlignLabel::Deletion);
                }
                if ins_cost == best {
                    options.push(AlignLabel::Insertion);
                }

                let cell = matrix.cell_mut(i + 1, j + 1);
                cell.cost = best;
                cell.options = options;
            }
        }

        let dist = matrix.cell(hyp_tokens.len(), ref_tokens.len()).cost;
        Ok(Levenshtein {
            matrix,
            ref_tokens: ref_tokens.to_vec(),
            hyp_tokens: hyp_tokens.to_vec(),
            lowercase: config.lowercase,
            dist,
        })
    }

    /// Walks the backtrack matrix from the final cell, resolving ties by the
    /// fixed priority Correct/Substitution > Deletion > Insertion. Returns
    /// the edit operations in forward order, each paired with the index of
    /// the token it consumes on (hyp, ref).
    pub fn editops(&self) -> Vec<(AlignLabel, (usize, usize))> {
        let mut i = self.matrix.hyp_len;
        let mut j = self.matrix.ref_len;
        let mut ops = Vec::with_capacity(i + j);

        while i > 0 || j > 0 {
            let label = self.matrix.cell(i, j).options[0];
            let (off_i, off_j) = label.backtrack_offset();
            i = (i as isize + off_i) as usize;
            j = (j as isize + off_j) as usize;
            ops.push((label, (i, j)));
        }

        ops.reverse();
        ops
    }

    /// Expands the single-path edit operations into a slot-per-slot
    /// alignment over the original (non-lowercased) tokens.
    pub fn expand_align(&self) -> Result<ExpandedAlignment, AlignError> {
        let ops = self.editops();

        let mut ref_slots = Vec::with_capacity(ops.len());
        let mut hyp_slots = Vec::with_capacity(ops.len());
        let mut labels = Vec::with_capacity(ops.len());
        let mut ref_map = Vec::new();
        let mut hyp_map = Vec::new();

        for (label, (i, j)) in ops {
            match label {
                AlignLabel::Deletion => {
                    ref_slots.push(self.ref_tokens[j].clone());
                    hyp_slots.push(String::new());
                    ref_map.push(labels.len());
                }
                AlignLabel::Insertion => {
                    ref_slots.push(String::new());
                    hyp_slots.push(self.hyp_tokens[i].clone());
                    hyp_map.push(labels.len());
                }
                AlignLabel::Correct | AlignLabel::Substitution => {
                    ref_slots.push(self.ref_tokens[j].clone());
                    hyp_slots.push(self.hyp_tokens[i].clone());
                    ref_map.push(labels.len());
                    hyp_map.push(labels.len());
                }
            }
            labels.push(label);
        }

        ExpandedAlignment::new(
            ref_slots,
            hyp_slots,
            labels,
            Some(ref_map),
            Some(hyp_map),
            self.lowercase,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::AlignLabel::*;

    fn toks(s: &str) -> Vec<String> {
        s.split_whitespace().map(|t| t.to_string()).collect()
    }

    fn labels(alignment: &ExpandedAlignment) -> Vec<AlignLabel> {
        alignment.labels.clone()
    }

    #[test]
    fn identical_sequences_align_as_all_correct() {
        let reference = toks("the quick brown fox");
        let lev = Levenshtein::align(&reference, &reference, &AlignConfig::default()).unwrap();
        assert_eq!(lev.dist, 0);
        let alignment = lev.expand_align().unwrap();
        assert_eq!(labels(&alignment), vec![Correct; 4]);
        assert_eq!(alignment.ref_string(), "the quick brown fox");
        assert_eq!(alignment.hyp_string(), "the quick brown fox");
    }

    #[test]
    fn both_empty_is_invalid_input() {
        let err = Levenshtein::align(&[], &[], &AlignConfig::default()).unwrap_err();
        assert!(matches!(err, AlignError::InvalidInput { .. }));
    }

    #[test]
    fn empty_hypothesis_is_all_deletions() {
        let reference = toks("a b c");
        let lev = Levenshtein::align(&reference, &[], &AlignConfig::default()).unwrap();
        let alignment = lev.expand_align().unwrap();
        assert_eq!(labels(&alignment), vec![Deletion; 3]);
        assert_eq!(alignment.ref_string(), "a b c");
        assert_eq!(alignment.hyp_string(), "");
    }

    #[test]
    fn empty_reference_is_all_insertions() {
        let hypothesis = toks("a b");
        let lev = Levenshtein::align(&[], &hypothesis, &AlignConfig::default()).unwrap();
        let alignment = lev.expand_align().unwrap();
        assert_eq!(labels(&alignment), vec![Insertion; 2]);
        assert_eq!(alignment.hyp_string(), "a b");
    }

    #[test]
    fn lowercase_matching_preserves_original_case() {
        let reference = toks("They said Yes");
        let hypothesis = toks("they said yes");
        let config = AlignConfig {
            lowercase: true,
            ..AlignConfig::default()
        };
        let lev = Levenshtein::align(&reference, &hypothesis, &config).unwrap();
        let alignment = lev.expand_align().unwrap();
        assert_eq!(labels(&alignment), vec![Correct; 3]);
        assert_eq!(alignment.ref_string(), "They said Yes");
        assert_eq!(alignment.hyp_string(), "they said yes");
    }

    #[test]
    fn word_align_weights_prefer_substitution_over_indel_pair() {
        let reference = toks("an envelope");
        let hypothesis = toks("on low");
        let config = AlignConfig {
            weights: CostWeights::word_align(),
            ..AlignConfig::default()
        };
        let lev = Levenshtein::align(&reference, &hypothesis, &config).unwrap();
        assert_eq!(lev.dist, 8);
        let alignment = lev.expand_align().unwrap();
        assert_eq!(labels(&alignment), vec![Substitution, Substitution]);
    }

    #[test]
    fn tie_break_prefers_diagonal_over_insertion() {
        // Doubled "a" in the hypothesis creates a genuine tie: the cell
        // aligning the second "a" can be reached at equal cost by a match or
        // by an insertion. The backward walk must take the match, which
        // forces the inserted token to the front.
        let reference = toks("a b");
        let hypothesis = toks("a a b");
        let lev = Levenshtein::align(&reference, &hypothesis, &AlignConfig::default()).unwrap();
        assert_eq!(lev.dist, 1);
        let alignment = lev.expand_align().unwrap();
        assert_eq!(labels(&alignment), vec![Insertion, Correct, Correct]);
    }

    #[test]
    fn barred_substitution_falls_back_to_indel_pair() {
        let policy = SubstitutionPolicy::new()
            .exclusive_class(["a"])
            .exclusive_class(["b"]);
        let config = AlignConfig {
            policy,
            ..AlignConfig::default()
        };
        let reference = toks("a");
        let hypothesis = toks("b");
        let lev = Levenshtein::align(&reference, &hypothesis, &config).unwrap();
        assert_eq!(lev.dist, 2);
        let alignment = lev.expand_align().unwrap();
        let codes: String = alignment.labels.iter().map(|l| l.code()).collect();
        // Deletion and insertion in some order, never a substitution.
        assert!(codes == "DI" || codes == "ID");
    }

    #[test]
    fn editops_walk_is_deterministic() {
        let reference = toks("w x y z");
        let hypothesis = toks("w q y");
        let lev = Levenshtein::align(&reference, &hypothesis, &AlignConfig::default()).unwrap();
        let first = lev.editops();
        for _ in 0..5 {
            assert_eq!(lev.editops(), first);
        }
    }
}
