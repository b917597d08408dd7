mod aligner;
pub mod phonemes;
mod pronounce;
mod reconcile;

pub use aligner::{PowerAligner, PowerConfig};
pub use pronounce::{LexiconPronouncer, NaivePronouncer, Pronouncer};
pub use reconcile::phone_align_to_word_align;
