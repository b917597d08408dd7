use crate::align::{
    AlignConfig, CostWeights, ExpandedAlignment, Levenshtein, ScoreComponents,
    SubstitutionPolicy,
};
use crate::power::pronounce::Pronouncer;
use crate::power::reconcile::phone_align_to_word_align;
use crate::utils::AlignError;

#[derive(Debug, Clone)]
pub struct PowerConfig {
    pub lowercase: bool,
    pub word_align_weights: CostWeights,
}

impl Default for PowerConfig {
    fn default() -> Self {
        PowerConfig {
            lowercase: true,
            word_align_weights: CostWeights::word_align(),
        }
    }
}

/// Two-stage scorer: a word-level alignment locates candidate error regions,
/// then each region is refined through a phoneme-level alignment of its
/// pronunciations.
pub struct PowerAligner<'a> {
    ref_words: Vec<String>,
    hyp_words: Vec<String>,
    ref_line: String,
    hyp_line: String,
    lowercase: bool,
    pronouncer: &'a dyn Pronouncer,

    pub wer_alignment: ExpandedAlignment,
    pub wer: f64,
    pub wer_components: ScoreComponents,

    pub power_alignment: Option<ExpandedAlignment>,
    pub power: Option<f64>,
    pub power_components: Option<ScoreComponents>,
    pub phonetic_alignments: Vec<Option<ExpandedAlignment>>,
}

impl<'a> PowerAligner<'a> {
    pub fn new(
        ref_line: &str,
        hyp_line: &str,
        config: &PowerConfig,
        pronouncer: &'a dyn Pronouncer,
    ) -> Result<Self, AlignError> {
        let ref_words: Vec<String> = ref_line.split_whitespace().map(str::to_string).collect();
        let hyp_words: Vec<String> = hyp_line.split_whitespace().map(str::to_string).collect();
        if ref_words.is_empty() {
            return Err(AlignError::invalid_input("empty reference"));
        }

        let align_config = AlignConfig {
            weights: config.word_align_weights,
            policy: SubstitutionPolicy::default(),
            lowercase: config.lowercase,
        };
        let lev = Levenshtein::align(&ref_words, &hyp_words, &align_config)?;
        let wer_alignment = lev.expand_align_compact()?;
        let (wer, wer_components) = wer_alignment.error_rate();

        Ok(PowerAligner {
            ref_line: ref_words.join(" "),
            hyp_line: hyp_words.join(" "),
            ref_words,
            hyp_words,
            lowercase: config.lowercase,
            pronouncer,
            wer_alignment,
            wer,
            wer_components,
            power_alignment: None,
            power: None,
            power_components: None,
            phonetic_alignments: Vec::new(),
        })
    }

    /// Refines every candidate error region phonetically and rebuilds the
    /// full alignment from the refined segments.
    pub fn align(&mut self) -> Result<(), AlignError> {
        let (mut split_regions, error_indexes) = self.wer_alignment.split_error_regions()?;
        self.phonetic_alignments = vec![None; split_regions.len()];

        for &error_index in &error_indexes {
            let segment = &split_regions[error_index];
            let ref_words = segment.ref_tokens();
            let hyp_words = segment.hyp_tokens();
            let ref_phones = self.pronouncer.pronounce(&ref_words);
            let hyp_phones = self.pronouncer.pronounce(&hyp_words);
            log::debug!(
                "realigning region {}: {:?} vs {:?}",
                error_index,
                ref_words,
                hyp_words
            );

            let (word_align, phonetic) =
                phone_align_to_word_align(&ref_words, &hyp_words, &ref_phones, &hyp_phones)?;
            self.phonetic_alignments[error_index] = Some(phonetic);
            split_regions[error_index] = word_align;
        }

        let mut regions = split_regions.into_iter();
        let mut power_alignment = regions
            .next()
            .ok_or_else(|| AlignError::inconsistency("alignment split into no regions"))?;
        for region in regions {
            power_alignment.append_alignment(&region);
        }
        power_alignment.lowercase = self.lowercase;

        if power_alignment.ref_string() != self.ref_line {
            return Err(AlignError::inconsistency(format!(
                "reference mismatch after realignment:\n{}\n{}",
                self.ref_line,
                power_alignment.ref_string()
            )));
        }
        if power_alignment.hyp_string() != self.hyp_line {
            return Err(AlignError::inconsistency(format!(
                "hypothesis mismatch after realignment:\n{}\n{}",
                self.hyp_line,
                power_alignment.hyp_string()
            )));
        }

        let (power, power_components) = power_alignment.error_rate();
        self.power = Some(power);
        self.power_components = Some(power_components);
        self.power_alignment = Some(power_alignment);
        Ok(())
    }

    pub fn ref_words(&self) -> &[String] {
        &self.ref_words
    }

    pub fn hyp_words(&self) -> &[String] {
        &self.hyp_words
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::AlignLabel;
    use crate::power::pronounce::LexiconPronouncer;

    fn pronouncer() -> LexiconPronouncer {
        LexiconPronouncer::from_entries([
            ("asked", "ae s k t"),
            ("gave", "g ey v"),
            ("we", "w iy"),
            ("ask", "ae s k"),
            ("an", "ae n"),
            ("envelope", "eh n # v ax # l ow p"),
            ("on", "aa n"),
            ("low", "l ow"),
        ])
    }

    #[test]
    fn misrecognized_sentence_end_to_end() {
        let reference =
            "They said Yes We asked them how happy they were and then we gave them an envelope";
        let hypothesis =
            "they said yes we gave we ask them how happy they were and then we gave them on low";
        let lex = pronouncer();
        let mut aligner =
            PowerAligner::new(reference, hypothesis, &PowerConfig::default(), &lex).unwrap();
        aligner.align().unwrap();

        let alignment = aligner.power_alignment.as_ref().unwrap();
        let codes: String = alignment.labels.iter().map(AlignLabel::code).collect();
        assert_eq!(codes, "CCCCIISCCCCCCCCCCSS");
        assert_eq!(
            alignment.ref_slots,
            vec![
                "They", "said", "Yes", "We", "", "", "asked", "them", "how", "happy", "they",
                "were", "and", "then", "we", "gave", "them", "an", "envelope"
            ]
        );
        assert_eq!(
            alignment.hyp_slots,
            vec![
                "they", "said", "yes", "we", "gave", "we", "ask", "them", "how", "happy", "they",
                "were", "and", "then", "we", "gave", "them", "on", "low"
            ]
        );

        let components = aligner.power_components.unwrap();
        assert_eq!(components.correct, 14);
        assert_eq!(components.substitution, 3);
        assert_eq!(components.insertion, 2);
        assert_eq!(components.deletion, 0);
        assert_eq!(components.ref_length, 17);
        assert!((aligner.power.unwrap() - 5.0 / 17.0).abs() < 1e-9);
    }

    #[test]
    fn realignment_preserves_both_surfaces() {
        let reference = "We asked them";
        let hypothesis = "we gave we ask them";
        let lex = pronouncer();
        let mut aligner =
            PowerAligner::new(reference, hypothesis, &PowerConfig::default(), &lex).unwrap();
        aligner.align().unwrap();
        let alignment = aligner.power_alignment.as_ref().unwrap();
        assert_eq!(alignment.ref_string(), "We asked them");
        assert_eq!(alignment.hyp_string(), "we gave we ask them");
    }

    #[test]
    fn identical_lines_skip_phonetic_realignment() {
        let line = "we gave them an envelope";
        let lex = pronouncer();
        let mut aligner = PowerAligner::new(line, line, &PowerConfig::default(), &lex).unwrap();
        aligner.align().unwrap();
        assert_eq!(aligner.power, Some(0.0));
        assert!(aligner.phonetic_alignments.iter().all(Option::is_none));
    }

    #[test]
    fn empty_reference_is_rejected() {
        let lex = pronouncer();
        let err = PowerAligner::new("", "we ask", &PowerConfig::default(), &lex)
            .err()
            .unwrap();
        assert!(matches!(err, AlignError::InvalidInput { .. }));
    }
}
