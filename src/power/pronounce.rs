use crate::utils::AlignError;
use itertools::Itertools;
use std::collections::HashMap;
use std::path::Path;

/// Grapheme-to-phoneme conversion for a sequence of words.
///
/// The returned tokens form one string per phoneme or boundary marker: each
/// word is rendered as `| # p1 p2 ... |`, with `#` separating syllables and
/// `|` separating words. Adjacent words share their `|` marker.
pub trait Pronouncer: Send + Sync {
    fn pronounce(&self, words: &[String]) -> Vec<String>;
}

fn wrap_word_prons(prons: Vec<String>) -> Vec<String> {
    let body = prons
        .iter()
        .map(|pron| format!("# {}", pron))
        .join(" | ");
    format!("| {} |", body)
        .split_whitespace()
        .map(|t| t.to_string())
        .collect()
}

/// Letter-per-phoneme fallback with no lexicon at all. Useful for tests and
/// for languages without a pronunciation dictionary.
#[derive(Debug, Default)]
pub struct NaivePronouncer;

impl Pronouncer for NaivePronouncer {
    fn pronounce(&self, words: &[String]) -> Vec<String> {
        let prons = words
            .iter()
            .map(|word| word.to_lowercase().chars().join(" "))
            .collect();
        wrap_word_prons(prons)
    }
}

/// Lexicon-backed pronouncer. Out-of-vocabulary words fall back to greedy
/// lexicon-prefix matching per hyphen-separated part, and finally to the
/// word's characters as pseudo-phonemes.
pub struct LexiconPronouncer {
    lexicon: HashMap<String, String>,
}

impl LexiconPronouncer {
    pub fn from_json_file(path: &Path) -> Result<Self, AlignError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| AlignError::io(format!("failed to read lexicon {}", path.display()), e))?;
        let raw: HashMap<String, String> = serde_json::from_str(&text)
            .map_err(|e| AlignError::json(format!("failed to parse lexicon {}", path.display()), e))?;
        // Tolerate entries carrying an explicit leading syllable marker.
        let lexicon = raw
            .into_iter()
            .map(|(word, pron)| {
                let pron = pron.strip_prefix("# ").unwrap_or(&pron).to_string();
                (word, pron)
            })
            .collect();
        Ok(LexiconPronouncer { lexicon })
    }

    #[cfg(test)]
    pub(crate) fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        LexiconPronouncer {
            lexicon: entries
                .into_iter()
                .map(|(w, p)| (w.into(), p.into()))
                .collect(),
        }
    }

    pub fn contains(&self, word: &str) -> bool {
        self.lexicon.contains_key(word)
    }

    /// Pronunciation of a single out-of-vocabulary word. Hyphenated words
    /// pronounce each part on its own syllable.
    fn fallback_pronounce(&self, word: &str) -> String {
        word.split('-')
            .filter(|part| !part.is_empty())
            .map(|part| self.greedy_pronounce(part))
            .join(" # ")
    }

    /// Repeatedly matches the longest lexicon entry prefixing the unconsumed
    /// remainder. When nothing matches at all, the characters themselves
    /// stand in as pseudo-phonemes.
    fn greedy_pronounce(&self, part: &str) -> String {
        let chars: Vec<char> = part.chars().collect();
        let mut pieces: Vec<String> = Vec::new();
        let mut m = 0;
        while m < chars.len() {
            let found = (m + 1..=chars.len())
                .rev()
                .map(|end| chars[m..end].iter().collect::<String>())
                .enumerate()
                .find_map(|(back, prefix)| {
                    self.lexicon
                        .get(&prefix)
                        .map(|pron| (chars.len() - back, pron.clone()))
                });
            match found {
                Some((consumed, pron)) => {
                    pieces.push(pron);
                    m = consumed;
                }
                None => break,
            }
        }
        if pieces.is_empty() {
            pieces = chars.iter().map(|c| c.to_string()).collect();
        }
        pieces.into_iter().dedup().join(" ")
    }
}

impl Pronouncer for LexiconPronouncer {
    fn pronounce(&self, words: &[String]) -> Vec<String> {
        let prons = words
            .iter()
            .map(|word| {
                let word = word.to_lowercase();
                match self.lexicon.get(&word) {
                    Some(pron) => pron.clone(),
                    None => self.fallback_pronounce(&word),
                }
            })
            .collect();
        wrap_word_prons(prons)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(s: &str) -> Vec<String> {
        s.split_whitespace().map(|w| w.to_string()).collect()
    }

    #[test]
    fn naive_pronouncer_spells_words_out() {
        let tokens = NaivePronouncer.pronounce(&words("We ask"));
        assert_eq!(tokens.join(" "), "| # w e | # a s k |");
    }

    #[test]
    fn lexicon_hits_are_wrapped_with_boundaries() {
        let lex = LexiconPronouncer::from_entries([
            ("asked", "ae s k t"),
            ("envelope", "eh n # v ax # l ow p"),
        ]);
        let tokens = lex.pronounce(&words("Asked envelope"));
        assert_eq!(
            tokens.join(" "),
            "| # ae s k t | # eh n # v ax # l ow p |"
        );
    }

    #[test]
    fn hyphenated_oov_words_syllabify_per_part() {
        let lex = LexiconPronouncer::from_entries([("data", "d ey t ax"), ("base", "b ey s")]);
        let tokens = lex.pronounce(&words("data-base"));
        assert_eq!(tokens.join(" "), "| # d ey t ax # b ey s |");
    }

    #[test]
    fn greedy_fallback_prefers_longest_prefix() {
        let lex = LexiconPronouncer::from_entries([
            ("foot", "f uh t"),
            ("footban", "f uh t b ae n"),
            ("d", "d iy"),
        ]);
        // "footban" wins over "foot", then "d" covers the remainder.
        assert_eq!(lex.greedy_pronounce("footband"), "f uh t b ae n d iy");
    }

    #[test]
    fn unmatched_part_falls_back_to_deduped_characters() {
        let lex = LexiconPronouncer::from_entries([("we", "w iy")]);
        let tokens = lex.pronounce(&words("xyzzy"));
        // Doubled letters collapse like any other repeated piece.
        assert_eq!(tokens.join(" "), "| # x y z y |");
    }

    #[test]
    fn loading_strips_leading_syllable_markers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lex.json");
        std::fs::write(&path, r##"{"ask": "# ae s k", "we": "w iy"}"##).unwrap();
        let lex = LexiconPronouncer::from_json_file(&path).unwrap();
        let tokens = lex.pronounce(&words("we ask"));
        assert_eq!(tokens.join(" "), "| # w iy | # ae s k |");
    }
}
