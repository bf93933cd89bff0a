use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::evaluation::heldout_error;
use crate::context::{History, StateScores};
use crate::dataset::Sequence;
use crate::error::{Error, Result};
use crate::lookahead::Lookahead;
use crate::model::Model;

/// Lookahead perceptron training parameters.
#[derive(Debug, Clone)]
pub struct LookaheadParams {
    max_iterations: usize,
    margin: f64,
    heldout: usize,
    shuffle_seed: Option<u64>,
}

impl Default for LookaheadParams {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            margin: 40.0,
            heldout: 0,
            shuffle_seed: None,
        }
    }
}

impl LookaheadParams {
    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn set_max_iterations(&mut self, max_iterations: usize) -> Result<()> {
        if max_iterations < 1 {
            return Err(Error::invalid("max_iterations must be at least 1"));
        }
        self.max_iterations = max_iterations;
        Ok(())
    }

    /// Score bonus a competing path must overcome to beat the gold path
    pub fn margin(&self) -> f64 {
        self.margin
    }

    pub fn set_margin(&mut self, margin: f64) -> Result<()> {
        if !(margin >= 0.0) || margin.is_infinite() {
            return Err(Error::invalid("margin must be a non-negative number"));
        }
        self.margin = margin;
        Ok(())
    }

    /// Number of trailing sequences held out from training
    pub fn heldout(&self) -> usize {
        self.heldout
    }

    pub fn set_heldout(&mut self, heldout: usize) {
        self.heldout = heldout;
    }

    pub fn shuffle_seed(&self) -> Option<u64> {
        self.shuffle_seed
    }

    pub fn set_shuffle_seed(&mut self, seed: Option<u64>) {
        self.shuffle_seed = seed;
    }
}

/// Statistics of one training epoch
#[derive(Debug, Clone, PartialEq)]
pub struct EpochStats {
    /// 1-based epoch number
    pub epoch: usize,
    /// Number of positions whose lookahead decision disagreed with the gold label
    pub num_errors: usize,
    /// Error rate of the averaged weights on the held-out sequences
    pub heldout_error: Option<f64>,
}

/// Parameter state of one training run
struct Run {
    weights: Vec<f64>,
    /// Sum of `timestep * delta` over all updates
    summed: Vec<f64>,
    timestep: f64,
}

impl Run {
    fn new(dim: usize) -> Self {
        Self {
            weights: vec![0.0; dim],
            summed: vec![0.0; dim],
            timestep: 1.0,
        }
    }

    fn apply(&mut self, diff: &BTreeMap<u32, f64>) {
        for (&fid, &delta) in diff {
            self.weights[fid as usize] += delta;
            self.summed[fid as usize] += self.timestep * delta;
        }
    }

    /// Time-averaged weights
    fn averaged(&self) -> Vec<f64> {
        self.weights
            .iter()
            .zip(&self.summed)
            .map(|(w, s)| w - s / self.timestep)
            .collect()
    }
}

/// Online averaged perceptron driven by the lookahead search
pub(super) struct Perceptron<'a> {
    model: &'a Model,
    params: &'a LookaheadParams,
}

impl<'a> Perceptron<'a> {
    pub fn new(model: &'a Model, params: &'a LookaheadParams) -> Self {
        Self { model, params }
    }

    /// Train on `train`, evaluating on `heldout` after every epoch.
    ///
    /// Returns the averaged weights and the per-epoch statistics.
    pub fn train(
        &self,
        train: &[Sequence],
        heldout: &[Sequence],
    ) -> Result<(Vec<f64>, Vec<EpochStats>)> {
        let mut run = Run::new(self.model.num_params());
        let mut order: Vec<usize> = (0..train.len()).collect();
        let mut rng = match self.params.shuffle_seed() {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut stats = Vec::new();

        log::info!(
            "lookahead depth = {}, perceptron margin = {}, perceptron niter = {}",
            self.model.options().lookahead_depth(),
            self.params.margin(),
            self.params.max_iterations()
        );

        for epoch in 1..=self.params.max_iterations() {
            if order.len() > 1 {
                order.shuffle(&mut rng);
            }

            let mut num_errors = 0;
            for &idx in &order {
                num_errors += self.train_sequence(&train[idx], &mut run)?;
            }

            // Evaluate a snapshot of the averaged weights, the live ones keep training
            let heldout_error = if heldout.is_empty() {
                None
            } else {
                Some(heldout_error(self.model, &run.averaged(), heldout)?)
            };
            match heldout_error {
                Some(err) => log::info!(
                    "iter = {} num_errors = {}\theldout_error = {:.6}",
                    epoch,
                    num_errors,
                    err
                ),
                None => log::info!("iter = {} num_errors = {}", epoch, num_errors),
            }
            stats.push(EpochStats {
                epoch,
                num_errors,
                heldout_error,
            });

            if num_errors == 0 {
                log::info!("converged at epoch {}", epoch);
                break;
            }
        }

        Ok((run.averaged(), stats))
    }

    /// One left-to-right pass over a sequence; returns the number of
    /// positions that triggered an update
    fn train_sequence(&self, seq: &Sequence, run: &mut Run) -> Result<usize> {
        let len = seq.len();
        let depth = self.model.options().lookahead_depth();
        // Observation scores are fixed for the whole sequence, edge weights
        // are read live
        let state = StateScores::compute(self.model, &run.weights, seq);
        let mut history = History::new(len, self.model.bos());
        let mut num_errors = 0;

        for pos in 0..len {
            let gold_label = seq.labels[pos];
            let diff = {
                let search = Lookahead::new(
                    self.model,
                    &run.weights,
                    &state,
                    len,
                    self.params.margin(),
                );
                let gold = search.search(&mut history, pos, depth, Some(gold_label), None)?;
                let best = search.search(&mut history, pos, depth, None, Some(gold.labels[0]))?;
                if best.labels[0] == gold.labels[0] {
                    None
                } else {
                    let mut diff = BTreeMap::new();
                    self.gradient(&mut history, seq, pos, &gold.labels, 1.0, &mut diff);
                    self.gradient(&mut history, seq, pos, &best.labels, -1.0, &mut diff);
                    Some(diff)
                }
            };
            if let Some(diff) = diff {
                run.apply(&diff);
                num_errors += 1;
            }
            run.timestep += 1.0;
            // Condition the following positions on the gold past
            history.set(pos, gold_label);
        }

        Ok(num_errors)
    }

    /// Add `val` to every edge and observation parameter engaged by `path`
    /// placed at `start`
    fn gradient(
        &self,
        history: &mut History,
        seq: &Sequence,
        start: usize,
        path: &[u32],
        val: f64,
        diff: &mut BTreeMap<u32, f64>,
    ) {
        history.fill(start, path);
        for (offset, &label) in path.iter().enumerate() {
            let pos = start + offset;
            for &fid in self.model.tables.engaged(history, pos, label).iter().flatten() {
                *diff.entry(fid).or_insert(0.0) += val;
            }
            for &aid in &seq.items[pos] {
                for &fid in self.model.attr_refs(aid) {
                    if self.model.bag.feature(fid).label == label {
                        *diff.entry(fid).or_insert(0.0) += val;
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::Dictionary;
    use crate::feature::Feature;
    use crate::model::ModelOptions;

    fn setup() -> (Model, Sequence) {
        let mut labels = Dictionary::new();
        labels.get_or_insert("N");
        labels.get_or_insert("V");
        let mut attrs = Dictionary::new();
        attrs.get_or_insert("f1");
        attrs.get_or_insert("f2");
        let mut model = Model::new(labels, attrs, ModelOptions::default());
        model.bag.get_or_insert(Feature::new(0, 0));
        model.bag.get_or_insert(Feature::new(1, 1));
        model.build_tables();

        let mut seq = Sequence::with_capacity(2);
        seq.push(vec![0], 0);
        seq.push(vec![1], 1);
        (model, seq)
    }

    #[test]
    fn test_params_validation() {
        let mut params = LookaheadParams::default();
        assert_eq!(params.max_iterations(), 10);
        assert_eq!(params.margin(), 40.0);
        assert!(params.set_max_iterations(0).is_err());
        assert!(params.set_margin(-1.0).is_err());
        assert!(params.set_margin(f64::NAN).is_err());
        assert!(params.set_margin(0.0).is_ok());
    }

    #[test]
    fn test_gradient_signs() {
        let (model, seq) = setup();
        let params = LookaheadParams::default();
        let perceptron = Perceptron::new(&model, &params);
        let mut history = History::new(seq.len(), model.bos());
        let mut diff = BTreeMap::new();
        perceptron.gradient(&mut history, &seq, 0, &[0, 1], 1.0, &mut diff);
        perceptron.gradient(&mut history, &seq, 0, &[1, 1], -1.0, &mut diff);

        let tables = &model.tables;
        let unigram = tables.unigram.as_ref().unwrap();
        let bigram = tables.bigram.as_ref().unwrap();
        let bos = model.bos() as usize;

        // Observation feature (N, f1) is only engaged by the gold path
        assert_eq!(diff[&0], 1.0);
        // (V, f2) is engaged by both and cancels out
        assert_eq!(diff[&1], 0.0);
        assert_eq!(diff[&unigram[[bos, 0]]], 1.0);
        assert_eq!(diff[&unigram[[bos, 1]]], -1.0);
        assert_eq!(diff[&unigram[[0, 1]]], 1.0);
        assert_eq!(diff[&unigram[[1, 1]]], -1.0);
        assert_eq!(diff[&bigram[[bos, 0, 1]]], 1.0);
        assert_eq!(diff[&bigram[[bos, 1, 1]]], -1.0);
        // No bigram edge is engaged at position 0
        assert!(!diff.contains_key(&bigram[[bos, bos, 0]]));
    }

    #[test]
    fn test_update_and_averaging() {
        let (model, seq) = setup();
        let mut params = LookaheadParams::default();
        params.set_max_iterations(1).unwrap();
        params.set_shuffle_seed(Some(1));
        let perceptron = Perceptron::new(&model, &params);

        let mut run = Run::new(model.num_params());
        let errors = perceptron.train_sequence(&seq, &mut run).unwrap();
        // With all weights at zero the forbidden label loses the margin, so
        // the first position disagrees and is updated
        assert!(errors >= 1);
        assert_eq!(run.timestep, 3.0);
        assert!(run.weights[0] > 0.0);

        let averaged = run.averaged();
        for fid in 0..model.num_params() {
            let expected = run.weights[fid] - run.summed[fid] / run.timestep;
            assert_eq!(averaged[fid], expected);
        }
    }

    #[test]
    fn test_single_label_converges_immediately() {
        let mut labels = Dictionary::new();
        labels.get_or_insert("N");
        let mut attrs = Dictionary::new();
        attrs.get_or_insert("f");
        let mut model = Model::new(labels, attrs, ModelOptions::default());
        model.bag.get_or_insert(Feature::new(0, 0));
        model.build_tables();
        let mut seq = Sequence::with_capacity(3);
        for _ in 0..3 {
            seq.push(vec![0], 0);
        }

        let mut params = LookaheadParams::default();
        params.set_shuffle_seed(Some(7));
        let perceptron = Perceptron::new(&model, &params);
        let (weights, stats) = perceptron.train(&[seq], &[]).unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].num_errors, 0);
        assert_eq!(stats[0].heldout_error, None);
        assert!(weights.iter().all(|&w| w == 0.0));
    }
}
