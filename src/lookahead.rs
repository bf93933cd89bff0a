use crate::context::{History, StateScores};
use crate::error::{Error, Result};
use crate::model::Model;

/// Scores beyond this magnitude are treated as a numeric overflow
const SCORE_LIMIT: f64 = 0.001 * f64::MAX;

/// Best label path found by a lookahead search
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Path {
    pub score: f64,
    /// Labels from the search start, at most `max_depth` long
    pub labels: Vec<u32>,
}

/// Bounded-depth exhaustive search over label assignments
///
/// Scores a path as the sum of its edge weights and observation weights.
/// Leaves receive `margin` unless the path starts with the forbidden label,
/// so a competing path has to beat the gold path by more than the margin.
pub(crate) struct Lookahead<'a> {
    model: &'a Model,
    weights: &'a [f64],
    state: &'a StateScores,
    len: usize,
    margin: f64,
}

impl<'a> Lookahead<'a> {
    pub fn new(
        model: &'a Model,
        weights: &'a [f64],
        state: &'a StateScores,
        len: usize,
        margin: f64,
    ) -> Self {
        Self {
            model,
            weights,
            state,
            len,
            margin,
        }
    }

    /// Search `max_depth` positions ahead of `start`.
    ///
    /// With `gold` set only that label is tried at `start`; later positions
    /// are unconstrained. `forbidden` removes the margin bonus from paths
    /// whose first label equals it. Positions from `start` on are used as
    /// scratch space in `history`. Ties go to the lowest label ID.
    pub fn search(
        &self,
        history: &mut History,
        start: usize,
        max_depth: usize,
        gold: Option<u32>,
        forbidden: Option<u32>,
    ) -> Result<Path> {
        self.descend(history, start, max_depth, 0, 0.0, gold, forbidden)
    }

    #[allow(clippy::too_many_arguments)]
    fn descend(
        &self,
        history: &mut History,
        start: usize,
        max_depth: usize,
        depth: usize,
        score: f64,
        gold: Option<u32>,
        forbidden: Option<u32>,
    ) -> Result<Path> {
        if !(-SCORE_LIMIT..=SCORE_LIMIT).contains(&score) {
            return Err(Error::Overflow);
        }

        // Only the first decision is compared against the forbidden label
        let forbidden = if depth == 1 {
            forbidden.filter(|&label| label == history.get(start))
        } else {
            forbidden
        };

        let pos = start + depth;
        if depth >= max_depth || pos >= self.len {
            let score = match forbidden {
                Some(_) => score,
                None => score + self.margin,
            };
            return Ok(Path {
                score,
                labels: Vec::new(),
            });
        }

        let mut best = Path {
            score: f64::MIN,
            labels: Vec::new(),
        };
        for label in 0..self.model.num_labels() as u32 {
            if gold.map_or(false, |g| g != label) {
                continue;
            }
            let step = self.transition_score(history, pos, label) + self.state.get(pos, label);
            history.set(pos, label);
            let sub = self.descend(
                history,
                start,
                max_depth,
                depth + 1,
                score + step,
                None,
                forbidden,
            )?;
            if sub.score > best.score {
                let mut labels = Vec::with_capacity(sub.labels.len() + 1);
                labels.push(label);
                labels.extend(sub.labels);
                best = Path {
                    score: sub.score,
                    labels,
                };
            }
        }
        Ok(best)
    }

    fn transition_score(&self, history: &History, pos: usize, label: u32) -> f64 {
        self.model
            .tables
            .engaged(history, pos, label)
            .iter()
            .flatten()
            .map(|&fid| self.weights[fid as usize])
            .sum()
    }
}
