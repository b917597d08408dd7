use crate::align::{
    AlignConfig, AlignLabel, CostWeights, ExpandedAlignment, Levenshtein, SubstitutionPolicy,
};
use crate::power::phonemes::{CONSONANTS, R_SOUNDS, VOWELS};
use crate::utils::AlignError;
use once_cell::sync::Lazy;

/// Phoneme-level alignment configuration. Boundary markers only ever align
/// to themselves, and substitutions stay within vowels, consonants, or the
/// rhotic class.
pub(crate) static PHONE_CONFIG: Lazy<AlignConfig> = Lazy::new(|| AlignConfig {
    weights: CostWeights::word_align(),
    policy: SubstitutionPolicy::new()
        .reserve(["|", "#"])
        .exclusive_class(VOWELS.iter().cloned())
        .exclusive_class(CONSONANTS.iter().cloned())
        .exclusive_class(R_SOUNDS.iter().cloned()),
    lowercase: false,
});

pub(crate) fn phone_align(
    ref_phones: &[String],
    hyp_phones: &[String],
) -> Result<ExpandedAlignment, AlignError> {
    Levenshtein::align(ref_phones, hyp_phones, &PHONE_CONFIG)?.expand_align_compact()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokKind {
    Empty,
    WordBoundary,
    SyllableBoundary,
    Phoneme,
}

fn classify(tok: &str) -> TokKind {
    match tok {
        "" => TokKind::Empty,
        "|" => TokKind::WordBoundary,
        "#" => TokKind::SyllableBoundary,
        _ => TokKind::Phoneme,
    }
}

/// A syllable-conflict marker. The stored index is relative to the word
/// builder at the moment the conflict was seen and may be -1 (builder still
/// empty) or 0; 0 counts as unset, and negative values wrap from the end of
/// the builder when the peel-off is applied.
fn peel_point(marker: Option<isize>, builder_len: usize) -> Option<usize> {
    match marker {
        None | Some(0) => None,
        Some(k) if k < 0 => Some((builder_len as isize + k).max(0) as usize),
        Some(k) => Some((k as usize).min(builder_len)),
    }
}

fn is_unset(marker: Option<isize>) -> bool {
    matches!(marker, None | Some(0))
}

fn non_empty(slots: &[String]) -> Vec<String> {
    slots.iter().filter(|s| !s.is_empty()).cloned().collect()
}

type Span = (usize, usize);

struct Committed {
    ref_slots: Vec<String>,
    hyp_slots: Vec<String>,
    labels: Vec<AlignLabel>,
    phone_pieces: Vec<ExpandedAlignment>,
}

/// Refines a word-level error region using a phoneme-level alignment of its
/// pronunciations.
///
/// The phoneme alignment is scanned for word boundaries; each stretch
/// between simultaneous boundaries commits one word-level event, and a
/// boundary reached on only one side while the other has unmatched words
/// commits an orphan indel and realigns the remaining phonemes. Extra
/// syllables opening right after a word boundary peel the surplus word off
/// as its own indel instead of gluing it onto the substitution.
///
/// Returns the reconciled word alignment plus the concatenated phoneme
/// alignment pieces that produced it.
pub fn phone_align_to_word_align(
    ref_words: &[String],
    hyp_words: &[String],
    ref_phones: &[String],
    hyp_phones: &[String],
) -> Result<(ExpandedAlignment, ExpandedAlignment), AlignError> {
    let initial = phone_align(ref_phones, hyp_phones)?;

    let mut worklist: Vec<(Span, Span, ExpandedAlignment)> = Vec::new();
    worklist.push(((0, ref_words.len()), (0, hyp_words.len()), initial));

    let mut out = Committed {
        ref_slots: Vec::new(),
        hyp_slots: Vec::new(),
        labels: Vec::new(),
        phone_pieces: Vec::new(),
    };

    // Each pop either commits at least one word event or shrinks the span it
    // requeues, so a bound proportional to the input guards against a cycle.
    let max_steps = 8 * (ref_phones.len() + hyp_phones.len() + 2);
    let mut steps = 0;

    while let Some((ref_span, hyp_span, phone_align)) = worklist.pop() {
        steps += 1;
        if steps > max_steps {
            return Err(AlignError::inconsistency(format!(
                "phoneme-to-word reconciliation did not converge after {} passes",
                steps
            )));
        }
        scan_segment(
            ref_words,
            hyp_words,
            ref_span,
            hyp_span,
            &phone_align,
            &mut worklist,
            &mut out,
        )?;
    }

    let word_align = ExpandedAlignment::new(
        out.ref_slots,
        out.hyp_slots,
        out.labels,
        None,
        None,
        false,
    )
    .map_err(|_| AlignError::inconsistency("reconciliation produced no word events"))?;

    let mut pieces = out.phone_pieces.into_iter();
    let mut fp_align = pieces
        .next()
        .ok_or_else(|| AlignError::inconsistency("reconciliation kept no phoneme alignment"))?;
    for piece in pieces {
        fp_align.append_alignment(&piece);
    }

    Ok((word_align, fp_align))
}

fn scan_segment(
    ref_words: &[String],
    hyp_words: &[String],
    ref_span: Span,
    hyp_span: Span,
    segment: &ExpandedAlignment,
    worklist: &mut Vec<(Span, Span, ExpandedAlignment)>,
    out: &mut Committed,
) -> Result<(), AlignError> {
    use AlignLabel::*;

    let mut ref_word_iter = ref_words[ref_span.0..ref_span.1].iter();
    let mut hyp_word_iter = hyp_words[hyp_span.0..hyp_span.1].iter();
    let mut ref_builder: Vec<String> = Vec::new();
    let mut hyp_builder: Vec<String> = Vec::new();

    // Pending rows, discarded unless the pass commits.
    let mut ref_aligned: Vec<String> = Vec::new();
    let mut hyp_aligned: Vec<String> = Vec::new();
    let mut labels: Vec<AlignLabel> = Vec::new();

    let mut ref_extra_syllable: Option<isize> = None;
    let mut hyp_extra_syllable: Option<isize> = None;
    let mut ref_syllables = 0usize;
    let mut hyp_syllables = 0usize;
    let mut ref_word_started = false;
    let mut hyp_word_started = false;

    let len = segment.len();
    for i in 0..len {
        let ref_kind = classify(&segment.ref_slots[i]);
        let hyp_kind = classify(&segment.hyp_slots[i]);
        let at_end = i == len - 1;

        if at_end || (ref_kind == TokKind::WordBoundary && hyp_kind == TokKind::WordBoundary) {
            let event = if !ref_builder.is_empty() {
                if !hyp_builder.is_empty() {
                    if ref_builder == hyp_builder {
                        Some(Correct)
                    } else {
                        Some(Substitution)
                    }
                } else {
                    Some(Deletion)
                }
            } else if !hyp_builder.is_empty() {
                Some(Insertion)
            } else {
                None
            };

            if let Some(event) = event {
                let next_ref_span = (ref_span.0 + ref_builder.len(), ref_span.1);
                let next_hyp_span = (hyp_span.0 + hyp_builder.len(), hyp_span.1);
                worklist.push((
                    next_ref_span,
                    next_hyp_span,
                    segment.subsequence(i, len, false)?,
                ));

                let mut commit = false;
                match event {
                    Correct | Substitution => {
                        let ref_peel = peel_point(ref_extra_syllable, ref_builder.len());
                        let hyp_peel = peel_point(hyp_extra_syllable, hyp_builder.len());
                        let ref_main = ref_builder[..ref_peel.unwrap_or(ref_builder.len())]
                            .join(" ");
                        let hyp_main = hyp_builder[..hyp_peel.unwrap_or(hyp_builder.len())]
                            .join(" ");
                        labels.push(event);
                        ref_aligned.push(ref_main);
                        hyp_aligned.push(hyp_main);
                        if let Some(k) = ref_peel {
                            for word in &ref_builder[k..] {
                                labels.push(Deletion);
                                ref_aligned.push(word.clone());
                                hyp_aligned.push(String::new());
                            }
                        }
                        if let Some(k) = hyp_peel {
                            for word in &hyp_builder[k..] {
                                labels.push(Insertion);
                                ref_aligned.push(String::new());
                                hyp_aligned.push(word.clone());
                            }
                        }

                        if event == Substitution && ref_builder.len() != hyp_builder.len() {
                            // Uneven substitution span. Realign just its
                            // phonemes; a changed alignment means the span
                            // needs a fresh scan instead of this event.
                            let current = segment.subsequence(0, i + 1, false)?;
                            let adjusted =
                                phone_align(&current.ref_tokens(), &current.hyp_tokens())?;
                            if adjusted.labels != current.labels {
                                worklist.push((
                                    (ref_span.0, ref_span.0 + ref_builder.len()),
                                    (hyp_span.0, hyp_span.0 + hyp_builder.len()),
                                    adjusted,
                                ));
                            } else {
                                commit = true;
                            }
                        } else {
                            commit = true;
                        }
                    }
                    Deletion => {
                        for word in &ref_builder {
                            labels.push(Deletion);
                            ref_aligned.push(word.clone());
                            hyp_aligned.push(String::new());
                        }
                        commit = true;
                    }
                    Insertion => {
                        for word in &hyp_builder {
                            labels.push(Insertion);
                            ref_aligned.push(String::new());
                            hyp_aligned.push(word.clone());
                        }
                        commit = true;
                    }
                }

                if commit {
                    out.ref_slots.extend(ref_aligned);
                    out.hyp_slots.extend(hyp_aligned);
                    out.labels.extend(labels);
                    if i > 0 {
                        out.phone_pieces.push(segment.subsequence(0, i, false)?);
                    }
                }
                return Ok(());
            }
        } else {
            if ref_kind == TokKind::WordBoundary {
                ref_word_started = false;
                if hyp_kind != TokKind::WordBoundary
                    && !ref_builder.is_empty()
                    && hyp_builder.is_empty()
                {
                    // A reference word ended mid-hypothesis-word with nothing
                    // matched against it: commit it as a deletion and realign
                    // the leftover reference phonemes against the whole
                    // hypothesis.
                    for word in &ref_builder {
                        labels.push(AlignLabel::Deletion);
                        ref_aligned.push(word.clone());
                        hyp_aligned.push(String::new());
                    }
                    out.ref_slots.extend(ref_aligned);
                    out.hyp_slots.extend(hyp_aligned);
                    out.labels.extend(labels);
                    if i > 0 {
                        out.phone_pieces.push(segment.subsequence(0, i, false)?);
                    }

                    let next_ref_span = (ref_span.0 + ref_builder.len(), ref_span.1);
                    let next_hyp_span = (hyp_span.0 + hyp_builder.len(), hyp_span.1);
                    let realigned = phone_align(
                        &non_empty(&segment.ref_slots[i..]),
                        &non_empty(&segment.hyp_slots),
                    )?;
                    worklist.push((next_ref_span, next_hyp_span, realigned));
                    return Ok(());
                }
            } else if ref_kind == TokKind::Phoneme && !ref_word_started {
                ref_word_started = true;
                if let Some(word) = ref_word_iter.next() {
                    ref_builder.push(word.clone());
                }
            }

            if hyp_kind == TokKind::WordBoundary {
                hyp_word_started = false;
                if ref_kind != TokKind::WordBoundary
                    && !hyp_builder.is_empty()
                    && ref_builder.is_empty()
                {
                    for word in &hyp_builder {
                        labels.push(AlignLabel::Insertion);
                        ref_aligned.push(String::new());
                        hyp_aligned.push(word.clone());
                    }
                    out.ref_slots.extend(ref_aligned);
                    out.hyp_slots.extend(hyp_aligned);
                    out.labels.extend(labels);
                    if i > 0 {
                        out.phone_pieces.push(segment.subsequence(0, i, false)?);
                    }

                    let next_ref_span = (ref_span.0 + ref_builder.len(), ref_span.1);
                    let next_hyp_span = (hyp_span.0 + hyp_builder.len(), hyp_span.1);
                    let realigned = phone_align(
                        &non_empty(&segment.ref_slots),
                        &non_empty(&segment.hyp_slots[i..]),
                    )?;
                    worklist.push((next_ref_span, next_hyp_span, realigned));
                    return Ok(());
                }
            } else if hyp_kind == TokKind::Phoneme && !hyp_word_started {
                hyp_word_started = true;
                if let Some(word) = hyp_word_iter.next() {
                    hyp_builder.push(word.clone());
                }
            }
        }

        if ref_kind == TokKind::SyllableBoundary {
            ref_syllables += 1;
        }
        if hyp_kind == TokKind::SyllableBoundary {
            hyp_syllables += 1;
        }
        let prev_hyp = classify(&segment.hyp_slots[if i == 0 { len - 1 } else { i - 1 }]);
        if (ref_kind == TokKind::SyllableBoundary && hyp_kind == TokKind::SyllableBoundary)
            || ref_syllables == hyp_syllables
        {
            ref_extra_syllable = None;
            hyp_extra_syllable = None;
        } else if ref_kind == TokKind::SyllableBoundary
            && is_unset(ref_extra_syllable)
            && prev_hyp == TokKind::WordBoundary
        {
            // The hypothesis opened a fresh word where the reference only
            // opens a syllable: the latest reference word likely absorbs an
            // inserted hypothesis word.
            ref_extra_syllable = Some(ref_builder.len() as isize - 1);
        } else if hyp_kind == TokKind::SyllableBoundary
            && is_unset(hyp_extra_syllable)
            && prev_hyp == TokKind::WordBoundary
        {
            hyp_extra_syllable = Some(hyp_builder.len() as isize - 1);
        }
    }

    Ok(())
}
