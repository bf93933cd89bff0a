use bitflags::bitflags;
use ndarray::{Array2, Array3, Array4};

use crate::dataset::Sequence;
use crate::model::Model;

/// Number of pseudo-label slots in front of every history buffer.
///
/// Equals the longest edge feature's predecessor count, so every edge lookup
/// before position 0 lands on `!BOS!`.
pub(crate) const HISTORY_OFFSET: usize = 3;

bitflags! {
    /// Edge feature orders scored by a model
    pub struct Edges: u32 {
        /// Previous label -> current label
        const UNIGRAM = 0x01;
        /// Previous two labels -> current label
        const BIGRAM = 0x02;
        /// Previous three labels -> current label
        const TRIGRAM = 0x04;
    }
}

impl Default for Edges {
    fn default() -> Self {
        Edges::UNIGRAM | Edges::BIGRAM
    }
}

/// Dense transition tables mapping label tuples to parameter indices
///
/// Every table is indexed by `[prev_k, .., prev_1, current]` over the whole
/// label vocabulary, reserved labels included.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct EdgeTables {
    pub unigram: Option<Array2<u32>>,
    pub bigram: Option<Array3<u32>>,
    pub trigram: Option<Array4<u32>>,
}

impl EdgeTables {
    /// Parameter indices of the edge features engaged when `label` is placed
    /// at `pos`.
    ///
    /// Bigram edges start at position 1 and trigram edges at position 2.
    pub fn engaged(&self, history: &History, pos: usize, label: u32) -> [Option<u32>; 3] {
        let cur = label as usize;
        let p1 = history.prev(pos, 1) as usize;
        let unigram = self.unigram.as_ref().map(|t| t[[p1, cur]]);
        let bigram = match &self.bigram {
            Some(t) if pos >= 1 => {
                let p2 = history.prev(pos, 2) as usize;
                Some(t[[p2, p1, cur]])
            }
            _ => None,
        };
        let trigram = match &self.trigram {
            Some(t) if pos >= 2 => {
                let p2 = history.prev(pos, 2) as usize;
                let p3 = history.prev(pos, 3) as usize;
                Some(t[[p3, p2, p1, cur]])
            }
            _ => None,
        };
        [unigram, bigram, trigram]
    }
}

/// Label history of one sequence, prefixed with `!BOS!` pseudo-labels
///
/// Positions up to the current one hold committed labels; positions after it
/// are scratch space for the lookahead search.
#[derive(Debug, Clone)]
pub(crate) struct History {
    labels: Vec<u32>,
}

impl History {
    pub fn new(len: usize, bos: u32) -> Self {
        // Slots after the prefix are always written before they are read
        let mut labels = vec![u32::MAX; len + HISTORY_OFFSET];
        labels[..HISTORY_OFFSET].fill(bos);
        Self { labels }
    }

    /// Label placed `back` positions before `pos`
    #[inline]
    pub fn prev(&self, pos: usize, back: usize) -> u32 {
        self.labels[HISTORY_OFFSET + pos - back]
    }

    #[inline]
    pub fn get(&self, pos: usize) -> u32 {
        self.labels[HISTORY_OFFSET + pos]
    }

    #[inline]
    pub fn set(&mut self, pos: usize, label: u32) {
        self.labels[HISTORY_OFFSET + pos] = label;
    }

    /// Write a label path starting at `start`
    pub fn fill(&mut self, start: usize, path: &[u32]) {
        let from = HISTORY_OFFSET + start;
        self.labels[from..from + path.len()].copy_from_slice(path);
    }
}

/// Observation-feature scores of a sequence
///
/// This is a `[T][L]` matrix whose element `[t][l]` holds the total weight of
/// the observation features firing at #t for user label #l. Edge features are
/// not included.
#[derive(Debug, Clone)]
pub(crate) struct StateScores {
    state: Array2<f64>,
}

impl StateScores {
    pub fn compute(model: &Model, weights: &[f64], seq: &Sequence) -> Self {
        let mut state = Array2::zeros((seq.len(), model.num_labels()));
        for (t, item) in seq.items.iter().enumerate() {
            for &aid in item {
                for &fid in model.attr_refs(aid) {
                    let label = model.bag.feature(fid).label as usize;
                    state[[t, label]] += weights[fid as usize];
                }
            }
        }
        Self { state }
    }

    #[inline]
    pub fn get(&self, t: usize, label: u32) -> f64 {
        self.state[[t, label as usize]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_prefix() {
        let mut history = History::new(3, 7);
        assert_eq!(history.prev(0, 1), 7);
        assert_eq!(history.prev(0, 3), 7);

        history.set(0, 1);
        history.set(1, 2);
        assert_eq!(history.prev(2, 1), 2);
        assert_eq!(history.prev(2, 2), 1);
        assert_eq!(history.prev(2, 3), 7);

        history.fill(1, &[4, 5]);
        assert_eq!(history.get(1), 4);
        assert_eq!(history.get(2), 5);
    }

    #[test]
    fn test_default_edges() {
        let edges = Edges::default();
        assert!(edges.contains(Edges::UNIGRAM | Edges::BIGRAM));
        assert!(!edges.contains(Edges::TRIGRAM));
    }

    #[test]
    fn test_engaged_edges_by_position() {
        let l = 3;
        let tables = EdgeTables {
            unigram: Some(Array2::from_shape_fn((l, l), |(a, b)| (a * l + b) as u32)),
            bigram: Some(Array3::from_shape_fn((l, l, l), |(a, b, c)| {
                (100 + a * l * l + b * l + c) as u32
            })),
            trigram: None,
        };
        let mut history = History::new(2, 2);
        let [uni, bi, tri] = tables.engaged(&history, 0, 1);
        assert_eq!(uni, Some(2 * 3 + 1));
        assert_eq!(bi, None);
        assert_eq!(tri, None);

        history.set(0, 0);
        let [uni, bi, _] = tables.engaged(&history, 1, 1);
        assert_eq!(uni, Some(1));
        assert_eq!(bi, Some(100 + 2 * 9 + 1));
    }
}
