use crate::align::{AlignLabel, ExpandedAlignment, Levenshtein};
use crate::utils::AlignError;
use pathfinding::prelude::dijkstra;
use std::collections::{BTreeMap, BTreeSet};

type Node = (usize, usize);

impl Levenshtein {
    /// Canonical tie-consistent extraction.
    ///
    /// Collects every cost-tied backtrack edge between (0,0) and
    /// (|hyp|,|ref|) into a graph and returns the expansion of its shortest
    /// path. Indel edges running along the hull of the rectangle (first or
    /// last row for deletions, first or last column for insertions) weigh 0,
    /// all other edges weigh 1, so runs of insertions and deletions are
    /// pushed to the boundaries of the aligned span. Among paths of equal
    /// hull weight a secondary bias takes matches as early and substitutions
    /// as late as possible, so inserted or deleted material sits between the
    /// last matched token and the substitution it displaced.
    /// Edge enumeration is ordered, so equal inputs give identical output.
    pub fn expand_align_compact(&self) -> Result<ExpandedAlignment, AlignError> {
        let hyp_len = self.matrix.hyp_len;
        let ref_len = self.matrix.ref_len;
        let start: Node = (0, 0);
        let goal: Node = (hyp_len, ref_len);

        // Forward adjacency over all tied backtrack edges, found by walking
        // the options backwards from the goal.
        let mut successors: BTreeMap<Node, Vec<(Node, AlignLabel)>> = BTreeMap::new();
        let mut labels: BTreeMap<(Node, Node), AlignLabel> = BTreeMap::new();
        let mut seen: BTreeSet<Node> = BTreeSet::new();
        let mut stack = vec![goal];
        while let Some((i, j)) = stack.pop() {
            if !seen.insert((i, j)) {
                continue;
            }
            for &label in self.matrix.cell(i, j).options.iter() {
                let (off_i, off_j) = label.backtrack_offset();
                let prev = ((i as isize + off_i) as usize, (j as isize + off_j) as usize);
                successors.entry(prev).or_default().push(((i, j), label));
                labels.insert((prev, (i, j)), label);
                stack.push(prev);
            }
        }
        for targets in successors.values_mut() {
            targets.sort_by_key(|&(node, label)| (node, label.code()));
        }

        let max_sum = (hyp_len + ref_len) as u64;
        let scale = (max_sum + 2) * (max_sum + 2);
        let edge_cost = |source: Node, label: AlignLabel| -> u64 {
            let on_hull = match label {
                AlignLabel::Deletion => source.0 == 0 || source.0 == hyp_len,
                AlignLabel::Insertion => source.1 == 0 || source.1 == ref_len,
                _ => false,
            };
            let hull_weight = if on_hull { 0 } else { 1 };
            let bias = match label {
                AlignLabel::Correct => (source.0 + source.1) as u64,
                AlignLabel::Substitution => max_sum - (source.0 + source.1) as u64,
                _ => 0,
            };
            hull_weight * scale + bias
        };

        let search = dijkstra(
            &start,
            |&node| {
                successors
                    .get(&node)
                    .into_iter()
                    .flatten()
                    .map(|&(next, label)| (next, edge_cost(node, label)))
                    .collect::<Vec<_>>()
            },
            |&node| node == goal,
        );
        let (path, _) = search.ok_or_else(|| {
            AlignError::inconsistency("no path through the backtrack graph")
        })?;

        let mut ref_slots = Vec::with_capacity(path.len() - 1);
        let mut hyp_slots = Vec::with_capacity(path.len() - 1);
        let mut align = Vec::with_capacity(path.len() - 1);
        for window in path.windows(2) {
            let (prev, cur) = (window[0], window[1]);
            let label = labels[&(prev, cur)];
            match label {
                AlignLabel::Deletion => {
                    ref_slots.push(self.ref_tokens[cur.1 - 1].clone());
                    hyp_slots.push(String::new());
                }
                AlignLabel::Insertion => {
                    ref_slots.push(String::new());
                    hyp_slots.push(self.hyp_tokens[cur.0 - 1].clone());
                }
                AlignLabel::Correct | AlignLabel::Substitution => {
                    ref_slots.push(self.ref_tokens[cur.1 - 1].clone());
                    hyp_slots.push(self.hyp_tokens[cur.0 - 1].clone());
                }
            }
            align.push(label);
        }

        ExpandedAlignment::new(ref_slots, hyp_slots, align, None, None, self.lowercase)
    }
}
