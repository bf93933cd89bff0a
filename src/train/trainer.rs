use std::collections::HashSet;

use super::feature_gen::make_feature_bag;
use super::perceptron::{EpochStats, LookaheadParams, Perceptron};
use crate::context::Edges;
use crate::dataset::{Item, Sequence};
use crate::dictionary::Dictionary;
use crate::error::{Error, Result};
use crate::model::{is_reserved_label, Model, ModelOptions};

fn contains_space(s: &str) -> bool {
    s.chars().any(char::is_whitespace)
}

/// Lookahead perceptron trainer
#[derive(Debug, Default)]
pub struct Trainer {
    /// Training sequences, held-out ones last
    sequences: Vec<Sequence>,
    /// Feature-name dictionary
    attrs: Dictionary,
    /// Label dictionary, user labels only
    labels: Dictionary,
    /// Model structure options
    options: ModelOptions,
    /// Training parameters
    params: LookaheadParams,
    /// Statistics of the last training run
    epochs: Vec<EpochStats>,
}

impl Trainer {
    /// Create a new trainer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new trainer producing models with the given options
    pub fn with_options(options: ModelOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Get training parameters
    pub fn params(&self) -> &LookaheadParams {
        &self.params
    }

    /// Get training parameters for mutation
    pub fn params_mut(&mut self) -> &mut LookaheadParams {
        &mut self.params
    }

    pub fn options(&self) -> &ModelOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut ModelOptions {
        &mut self.options
    }

    /// Number of appended sequences, held-out ones included
    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Statistics of the epochs run by the last call to [`Trainer::train`]
    pub fn epochs(&self) -> &[EpochStats] {
        &self.epochs
    }

    /// Set a parameter by name
    pub fn set(&mut self, name: &str, value: &str) -> Result<()> {
        fn parse<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
            value
                .trim()
                .parse()
                .map_err(|_| Error::invalid(format!("invalid value for {}: {:?}", name, value)))
        }

        match name {
            "max_iterations" => self.params.set_max_iterations(parse(name, value)?),
            "margin" => self.params.set_margin(parse(name, value)?),
            "heldout" => {
                self.params.set_heldout(parse(name, value)?);
                Ok(())
            }
            "lookahead_depth" => self.options.set_lookahead_depth(parse(name, value)?),
            "edge_trigrams" => {
                let mut edges = self.options.edges();
                edges.set(Edges::TRIGRAM, parse(name, value)?);
                self.options.set_edges(edges)
            }
            "max_labels" => self.options.set_max_labels(parse(name, value)?),
            "max_sequence_len" => self.options.set_max_sequence_len(parse(name, value)?),
            _ => Err(Error::UnknownParameter(name.to_string())),
        }
    }

    /// Get a parameter value by name
    pub fn get(&self, name: &str) -> Result<String> {
        let value = match name {
            "max_iterations" => self.params.max_iterations().to_string(),
            "margin" => self.params.margin().to_string(),
            "heldout" => self.params.heldout().to_string(),
            "lookahead_depth" => self.options.lookahead_depth().to_string(),
            "edge_trigrams" => self.options.edges().contains(Edges::TRIGRAM).to_string(),
            "max_labels" => self.options.max_labels().to_string(),
            "max_sequence_len" => self.options.max_sequence_len().to_string(),
            _ => return Err(Error::UnknownParameter(name.to_string())),
        };
        Ok(value)
    }

    /// Append a labeled sequence
    ///
    /// `xseq` holds the observation features of each token and `yseq` the
    /// gold labels. The whole sequence is validated before anything is
    /// interned. Empty sequences are skipped.
    pub fn append<I, F, L>(&mut self, xseq: &[I], yseq: &[L]) -> Result<()>
    where
        I: AsRef<[F]>,
        F: AsRef<str>,
        L: AsRef<str>,
    {
        if xseq.len() != yseq.len() {
            return Err(Error::LengthMismatch);
        }
        let max = self.options.max_sequence_len();
        if xseq.len() > max {
            return Err(Error::SequenceTooLong {
                len: xseq.len(),
                max,
            });
        }
        if xseq.is_empty() {
            log::warn!("empty sentence");
            return Ok(());
        }

        let mut new_labels = HashSet::new();
        for label in yseq {
            let label = label.as_ref();
            if is_reserved_label(label) {
                return Err(Error::ReservedLabel(label.to_string()));
            }
            if contains_space(label) {
                return Err(Error::LabelWhitespace(label.to_string()));
            }
            if !self.labels.contains(label) {
                new_labels.insert(label);
            }
        }
        if self.labels.len() + new_labels.len() + 2 > self.options.max_labels() {
            return Err(Error::TooManyLabels {
                max: self.options.max_labels(),
            });
        }
        for item in xseq {
            for name in item.as_ref() {
                let name: &str = name.as_ref();
                if contains_space(name) {
                    return Err(Error::FeatureWhitespace(name.to_string()));
                }
            }
        }

        let mut seq = Sequence::with_capacity(xseq.len());
        for (item, label) in xseq.iter().zip(yseq) {
            let ids: Item = item
                .as_ref()
                .iter()
                .map(|name| self.attrs.get_or_insert(name.as_ref()))
                .collect();
            let lid = self.labels.get_or_insert(label.as_ref());
            seq.push(ids, lid);
        }
        self.sequences.push(seq);
        Ok(())
    }

    /// Clear all training data
    pub fn clear(&mut self) {
        self.sequences.clear();
        self.attrs.clear();
        self.labels.clear();
        self.epochs.clear();
    }

    /// Train a model.
    ///
    /// `cutoff` drops `(label, feature)` pairs seen at most that many times.
    /// `sigma` and `width_factor` are mutually exclusive regularization
    /// settings; passing both above zero is rejected before anything is
    /// touched.
    pub fn train(&mut self, cutoff: usize, sigma: f64, width_factor: f64) -> Result<Model> {
        if !(sigma >= 0.0) || !(width_factor >= 0.0) {
            return Err(Error::invalid("sigma and width_factor must be non-negative"));
        }
        if sigma > 0.0 && width_factor > 0.0 {
            return Err(Error::ConflictingRegularization);
        }
        if self.sequences.is_empty() {
            return Err(Error::NoTrainingData);
        }
        let heldout = self.params.heldout();
        if heldout >= self.sequences.len() {
            return Err(Error::TooMuchHeldout {
                heldout,
                total: self.sequences.len(),
            });
        }
        if self.labels.len() + 2 > self.options.max_labels() {
            return Err(Error::TooManyLabels {
                max: self.options.max_labels(),
            });
        }

        let (train, heldout) = self.sequences.split_at(self.sequences.len() - heldout);
        if cutoff > 0 {
            log::info!("cutoff threshold = {}", cutoff);
        }
        if sigma > 0.0 {
            log::info!("gaussian prior sigma = {}", sigma);
        }
        let inequality_width = width_factor / train.len() as f64;
        if width_factor > 0.0 {
            log::info!(
                "widthfactor = {}, inequality width = {}",
                width_factor,
                inequality_width
            );
        }

        log::info!("preparing for estimation...");
        let mut model = Model::new(
            self.labels.clone(),
            self.attrs.clone(),
            self.options.clone(),
        );
        make_feature_bag(&mut model, train, cutoff);
        log::info!("number of state types = {}", model.num_labels());
        log::info!("number of samples = {}", train.len());
        log::info!("number of features = {}", model.num_params());

        let (weights, epochs) = Perceptron::new(&model, &self.params).train(train, heldout)?;
        model.set_weights(weights);
        self.epochs = epochs;

        if inequality_width > 0.0 {
            let active = model.weights().iter().filter(|&&w| w != 0.0).count();
            log::info!("number of active features = {}", active);
        }
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trainer_basic() {
        let mut trainer = Trainer::new();

        let xseq = vec![vec!["w=the", "suf=he"], vec!["w=dog"]];
        let yseq = vec!["DT", "NN"];

        assert!(trainer.append(&xseq, &yseq).is_ok());
        assert_eq!(trainer.sequences.len(), 1);
        assert_eq!(trainer.attrs.len(), 3);
        assert_eq!(trainer.labels.len(), 2);
    }

    #[test]
    fn test_trainer_skips_empty_sequences() {
        let mut trainer = Trainer::new();
        let xseq: Vec<Vec<&str>> = vec![];
        let yseq: Vec<&str> = vec![];
        assert!(trainer.append(&xseq, &yseq).is_ok());
        assert!(trainer.is_empty());
    }

    #[test]
    fn test_trainer_rejects_without_interning() {
        let mut trainer = Trainer::new();
        let err = trainer
            .append(&[vec!["a"], vec!["b c"]], &["X", "Y"])
            .unwrap_err();
        assert!(matches!(err, Error::FeatureWhitespace(_)));
        // Nothing from the rejected sequence is interned
        assert_eq!(trainer.labels.len(), 0);
        assert_eq!(trainer.attrs.len(), 0);

        let err = trainer.append(&[vec!["a"]], &["!EOS!"]).unwrap_err();
        assert!(matches!(err, Error::ReservedLabel(_)));
        let err = trainer.append(&[vec!["a"]], &["N N"]).unwrap_err();
        assert!(matches!(err, Error::LabelWhitespace(_)));
        let err = trainer.append(&[vec!["a"]], &["N", "V"]).unwrap_err();
        assert!(matches!(err, Error::LengthMismatch));
    }

    #[test]
    fn test_trainer_set_get() {
        let mut trainer = Trainer::new();
        trainer.set("max_iterations", "3").unwrap();
        trainer.set("edge_trigrams", "true").unwrap();
        trainer.set("lookahead_depth", "1").unwrap();
        assert_eq!(trainer.get("max_iterations").unwrap(), "3");
        assert_eq!(trainer.get("edge_trigrams").unwrap(), "true");
        assert_eq!(trainer.params().max_iterations(), 3);
        assert_eq!(trainer.options().lookahead_depth(), 1);
        assert!(trainer.options().edges().contains(Edges::TRIGRAM));

        trainer.set("edge_trigrams", "false").unwrap();
        assert!(!trainer.options().edges().contains(Edges::TRIGRAM));
    }
}
