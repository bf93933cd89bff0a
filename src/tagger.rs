use crate::context::{History, StateScores};
use crate::dataset::{Item, Sequence};
use crate::error::{Error, Result};
use crate::lookahead::Lookahead;
use crate::model::Model;

/// The tagger provides the functionality for predicting label sequences for input sequences using a model
#[derive(Debug, Clone, Copy)]
pub struct Tagger<'a> {
    model: &'a Model,
}

impl<'a> Tagger<'a> {
    pub(crate) fn new(model: &'a Model) -> Self {
        Self { model }
    }

    /// Predict the label sequence for the item sequence.
    ///
    /// Each item is the list of observation features of one token. Features
    /// the model has never seen contribute nothing.
    pub fn tag<T, F>(&self, xseq: &[T]) -> Result<Vec<&'a str>>
    where
        T: AsRef<[F]>,
        F: AsRef<str>,
    {
        let ids = self.tag_ids(xseq)?;
        Ok(ids
            .into_iter()
            .map(|id| self.model.to_label(id).unwrap_or_default())
            .collect())
    }

    /// Predict label IDs for the item sequence
    pub fn tag_ids<T, F>(&self, xseq: &[T]) -> Result<Vec<u32>>
    where
        T: AsRef<[F]>,
        F: AsRef<str>,
    {
        let max = self.model.options().max_sequence_len();
        if xseq.len() > max {
            return Err(Error::SequenceTooLong {
                len: xseq.len(),
                max,
            });
        }
        if xseq.is_empty() {
            return Ok(Vec::new());
        }

        let mut seq = Sequence::with_capacity(xseq.len());
        for item in xseq {
            let mut ids = Item::new();
            for name in item.as_ref() {
                let name = name.as_ref();
                if name.chars().any(char::is_whitespace) {
                    return Err(Error::FeatureWhitespace(name.to_string()));
                }
                if let Some(aid) = self.model.to_attr_id(name) {
                    ids.push(aid);
                }
            }
            seq.push_item(ids);
        }
        decode(self.model, &self.model.weights, &seq)
    }
}

/// Greedy lookahead decoding of a sequence under the given weights
///
/// At every position the best path over the lookahead window is searched and
/// only its first label is committed.
pub(crate) fn decode(model: &Model, weights: &[f64], seq: &Sequence) -> Result<Vec<u32>> {
    let len = seq.len();
    let depth = model.options().lookahead_depth();
    let state = StateScores::compute(model, weights, seq);
    // No gold path competes at decode time, so the margin is irrelevant
    let search = Lookahead::new(model, weights, &state, len, 0.0);
    let mut history = History::new(len, model.bos());
    let mut labels = Vec::with_capacity(len);
    for pos in 0..len {
        let path = search.search(&mut history, pos, depth, None, None)?;
        let label = *path.labels.first().ok_or(Error::NoLabels)?;
        history.set(pos, label);
        labels.push(label);
    }
    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::Dictionary;
    use crate::feature::Feature;
    use crate::model::ModelOptions;

    fn weighted_model() -> Model {
        weighted_model_with(ModelOptions::default())
    }

    fn weighted_model_with(options: ModelOptions) -> Model {
        let mut labels = Dictionary::new();
        labels.get_or_insert("N");
        labels.get_or_insert("V");
        let mut attrs = Dictionary::new();
        attrs.get_or_insert("w=dog");
        attrs.get_or_insert("w=runs");
        let mut model = Model::new(labels, attrs, options);
        let n = model.bag.get_or_insert(Feature::new(0, 0));
        let v = model.bag.get_or_insert(Feature::new(1, 1));
        model.build_tables();
        model.weights[n as usize] = 2.0;
        model.weights[v as usize] = 2.0;
        model
    }

    #[test]
    fn test_tag() {
        let model = weighted_model();
        let tagger = model.tagger();
        let res = tagger.tag(&[vec!["w=dog"], vec!["w=runs"]]).unwrap();
        assert_eq!(res, ["N", "V"]);

        // Unknown features are ignored
        let res = tagger
            .tag(&[vec!["w=runs", "w=unseen"], vec!["w=dog"]])
            .unwrap();
        assert_eq!(res, ["V", "N"]);

        let res = tagger.tag::<Vec<&str>, &str>(&[]).unwrap();
        assert!(res.is_empty());
    }

    #[test]
    fn test_tag_is_deterministic() {
        let model = weighted_model();
        let xseq = vec![vec!["w=dog"], vec![], vec!["w=runs"], vec!["w=dog"]];
        let first = model.tagger().tag(&xseq).unwrap();
        let second = model.tagger().tag(&xseq).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 4);
    }

    #[test]
    fn test_tag_rejects_bad_input() {
        let mut options = ModelOptions::default();
        options.set_max_sequence_len(2).unwrap();
        let model = weighted_model_with(options);
        let err = model.tagger().tag(&[vec!["w dog"]]).unwrap_err();
        assert!(matches!(err, Error::FeatureWhitespace(_)));

        assert!(model.tagger().tag(&[vec!["w=dog"], vec!["w=dog"]]).is_ok());
        let err = model
            .tagger()
            .tag(&[vec!["w=dog"], vec!["w=dog"], vec!["w=dog"]])
            .unwrap_err();
        assert!(matches!(err, Error::SequenceTooLong { len: 3, max: 2 }));
    }

    #[test]
    fn test_decode_never_yields_reserved_labels() {
        let mut model = weighted_model();
        // Make transitions into the reserved labels attractive; they must
        // still never be chosen since only user labels are candidates.
        for w in model.weights.iter_mut() {
            *w = 1.0;
        }
        let xseq = vec![vec!["w=dog"]; 5];
        for label in model.tagger().tag(&xseq).unwrap() {
            assert!(label == "N" || label == "V");
        }
    }

    #[test]
    fn test_decode_without_labels_is_an_error() {
        let mut model = Model::new(Dictionary::new(), Dictionary::new(), ModelOptions::default());
        model.build_tables();
        let err = model.tagger().tag(&[vec!["x"]]).unwrap_err();
        assert!(matches!(err, Error::NoLabels));
    }
}
