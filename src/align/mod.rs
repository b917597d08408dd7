mod canonical;
mod expand;
mod labels;
mod matrix;

pub use expand::{ExpandedAlignment, ScoreComponents};
pub use labels::{AlignLabel, CostWeights, SubstitutionPolicy};
pub use matrix::{AlignConfig, Levenshtein};
