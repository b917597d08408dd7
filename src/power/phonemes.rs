use once_cell::sync::Lazy;
use std::collections::HashSet;

const MONOPHTHONGS: &[&str] = &["ao", "aa", "iy", "uw", "eh", "ih", "uh", "ah", "ax", "ae"];
const DIPHTHONGS: &[&str] = &["ey", "ay", "ow", "aw", "oy"];
// r-colored vowels that survive as a single token.
const R_VOWELS: &[&str] = &["er", "axr"];

const STOPS: &[&str] = &["p", "b", "t", "d", "k", "g"];
const AFFRICATES: &[&str] = &["ch", "jh"];
const FRICATIVES: &[&str] = &["f", "v", "th", "dh", "s", "z", "sh", "zh", "hh"];
const NASALS: &[&str] = &["m", "em", "n", "en", "ng", "eng"];
const LIQUIDS: &[&str] = &["l", "el", "r", "dx", "nx"];
const SEMIVOWELS: &[&str] = &["y", "w", "q"];

fn collect(groups: &[&[&str]]) -> HashSet<String> {
    groups
        .iter()
        .flat_map(|group| group.iter().map(|p| p.to_string()))
        .collect()
}

pub static VOWELS: Lazy<HashSet<String>> =
    Lazy::new(|| collect(&[MONOPHTHONGS, DIPHTHONGS, R_VOWELS]));

pub static CONSONANTS: Lazy<HashSet<String>> =
    Lazy::new(|| collect(&[STOPS, AFFRICATES, FRICATIVES, NASALS, LIQUIDS, SEMIVOWELS]));

/// The rhotic sounds overlap both vowels and consonants, so they get their
/// own substitution class.
pub static R_SOUNDS: Lazy<HashSet<String>> = Lazy::new(|| collect(&[&["r"], R_VOWELS]));
