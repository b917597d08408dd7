pub mod lexicon;
pub mod score;
