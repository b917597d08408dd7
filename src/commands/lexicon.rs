use crate::cli::LexiconArgs;
use crate::utils::{open_text_reader, open_text_writer, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::io::{BufRead, Write};

static VARIANT_SUFFIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\(\d+\)$").unwrap());

/// Converts a CMU-style dictionary (optionally with `-` syllable marks) into
/// the JSON lexicon the scorer loads. Only the first pronunciation variant
/// of each word is kept.
pub fn lexicon(args: LexiconArgs) -> Result<()> {
    let reader = open_text_reader(&args.dict_path)?;
    let mut lex: BTreeMap<String, String> = BTreeMap::new();
    let mut line_number = 0;

    for line in reader.lines() {
        line_number += 1;
        let line = line
            .map_err(|e| format!("Failed to read {}: {}", args.dict_path.display(), e))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with(';') {
            continue;
        }
        if let Some((word, phonemes)) = parse_entry(line) {
            lex.entry(word).or_insert(phonemes);
        } else {
            log::debug!("Skipping line {}: no pronunciation", line_number);
        }
    }

    let mut out = open_text_writer(&args.output_path)?;
    let body = serde_json::to_string(&lex).map_err(|e| format!("Failed to serialize: {}", e))?;
    out.write_all(body.as_bytes())
        .map_err(|e| format!("Failed to write {}: {}", args.output_path, e))?;
    out.flush()
        .map_err(|e| format!("Failed to flush {}: {}", args.output_path, e))?;

    log::info!("Wrote {} entries to {}", lex.len(), args.output_path);
    println!("Wrote {} entries to {}", lex.len(), args.output_path);
    Ok(())
}

fn parse_entry(line: &str) -> Option<(String, String)> {
    let mut tokens = line.split_whitespace();
    let head = tokens.next()?;
    let word = VARIANT_SUFFIX_RE.replace(head, "").to_lowercase();

    let phonemes: Vec<String> = tokens
        .map(|tok| {
            let tok = if tok == "-" { "#" } else { tok };
            tok.chars()
                .filter(|c| !c.is_ascii_digit())
                .collect::<String>()
                .to_lowercase()
        })
        .collect();
    if phonemes.is_empty() {
        return None;
    }
    // Implausible entries (acronyms spelled out letter by letter and the
    // like) would poison the greedy fallback matching.
    if phonemes.len() > 2 * word.chars().count() {
        return None;
    }
    Some((word, phonemes.join(" ")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stress_digits_and_syllable_dashes_are_normalized() {
        let (word, phonemes) = parse_entry("ABANDON  AH0 - B AE1 N - D AH0 N").unwrap();
        assert_eq!(word, "abandon");
        assert_eq!(phonemes, "ah # b ae n # d ah n");
    }

    #[test]
    fn variant_suffix_is_stripped() {
        let (word, _) = parse_entry("READ(2)  R EH1 D").unwrap();
        assert_eq!(word, "read");
    }

    #[test]
    fn implausibly_long_pronunciations_are_dropped() {
        assert!(parse_entry("AB  EY1 B IY1 S IY1 D IY1").is_none());
    }

    #[test]
    fn entries_without_phonemes_are_dropped() {
        assert!(parse_entry("WORD").is_none());
    }

    #[test]
    fn end_to_end_writes_sorted_json() {
        let dir = tempfile::tempdir().unwrap();
        let dict_path = dir.path().join("cmudict.rep");
        let out_path = dir.path().join("lexicon.json");
        std::fs::write(
            &dict_path,
            ";;; comment\nWE  W IY1\nASK  AE1 S K\nASK(2)  AA1 S K\n",
        )
        .unwrap();

        lexicon(LexiconArgs {
            dict_path: dict_path.clone(),
            output_path: out_path.to_str().unwrap().to_string(),
        })
        .unwrap();

        let text = std::fs::read_to_string(&out_path).unwrap();
        let parsed: BTreeMap<String, String> = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["we"], "w iy");
        // First variant wins.
        assert_eq!(parsed["ask"], "ae s k");
        assert!(text.find("\"ask\"").unwrap() < text.find("\"we\"").unwrap());
    }
}
