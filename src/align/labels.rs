use std::collections::HashSet;
use std::fmt;

/// Outcome of aligning one reference slot against one hypothesis slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlignLabel {
    Correct,
    Substitution,
    Deletion,
    Insertion,
}

impl AlignLabel {
    pub fn code(&self) -> char {
        match self {
            AlignLabel::Correct => 'C',
            AlignLabel::Substitution => 'S',
            AlignLabel::Deletion => 'D',
            AlignLabel::Insertion => 'I',
        }
    }

    /// Offset added to matrix coordinates (i, j) to reach the predecessor
    /// cell. i indexes the hypothesis, j the reference.
    pub(crate) fn backtrack_offset(&self) -> (isize, isize) {
        match self {
            AlignLabel::Correct | AlignLabel::Substitution => (-1, -1),
            AlignLabel::Deletion => (0, -1),
            AlignLabel::Insertion => (-1, 0),
        }
    }
}

impl fmt::Display for AlignLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Per-label costs for the weighted Levenshtein alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostWeights {
    pub correct: u32,
    pub substitution: u32,
    pub deletion: u32,
    pub insertion: u32,
}

impl CostWeights {
    pub fn uniform() -> Self {
        CostWeights {
            correct: 0,
            substitution: 1,
            deletion: 1,
            insertion: 1,
        }
    }

    /// Weights tuned for word-level alignment: substitutions are preferred
    /// over deletion-insertion pairs.
    pub fn word_align() -> Self {
        CostWeights {
            correct: 0,
            substitution: 4,
            deletion: 3,
            insertion: 3,
        }
    }

    pub fn cost(&self, label: AlignLabel) -> u32 {
        match label {
            AlignLabel::Correct => self.correct,
            AlignLabel::Substitution => self.substitution,
            AlignLabel::Deletion => self.deletion,
            AlignLabel::Insertion => self.insertion,
        }
    }
}

impl Default for CostWeights {
    fn default() -> Self {
        CostWeights::uniform()
    }
}

/// Controls which token pairs may be labeled as substitutions.
///
/// Reserved tokens never substitute for anything. When exclusive classes are
/// configured, two distinct tokens substitute only if they share a class or
/// neither belongs to any class.
#[derive(Debug, Clone, Default)]
pub struct SubstitutionPolicy {
    reserved: HashSet<String>,
    classes: Vec<HashSet<String>>,
}

impl SubstitutionPolicy {
    pub fn new() -> Self {
        SubstitutionPolicy::default()
    }

    pub fn reserve<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reserved.extend(tokens.into_iter().map(Into::into));
        self
    }

    pub fn exclusive_class<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.classes
            .push(tokens.into_iter().map(Into::into).collect());
        self
    }

    pub fn is_reserved(&self, token: &str) -> bool {
        self.reserved.contains(token)
    }

    pub fn allows_substitution(&self, a: &str, b: &str) -> bool {
        if self.reserved.contains(a) || self.reserved.contains(b) {
            return false;
        }
        if self.classes.is_empty() {
            return true;
        }
        let a_classes: Vec<usize> = self.membership(a);
        let b_classes: Vec<usize> = self.membership(b);
        if a_classes.is_empty() && b_classes.is_empty() {
            return true;
        }
        a_classes.iter().any(|k| b_classes.contains(k))
    }

    fn membership(&self, token: &str) -> Vec<usize> {
        self.classes
            .iter()
            .enumerate()
            .filter(|(_, set)| set.contains(token))
            .map(|(k, _)| k)
            .collect()
    }
}
