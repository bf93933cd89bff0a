use std::collections::BTreeMap;

use crate::dataset::Sequence;
use crate::feature::Feature;
use crate::model::Model;

/// Intern the observation parameters of the training sequences and build the
/// model's tables.
///
/// A `(label, feature)` pair is kept only if it occurs more than `cutoff`
/// times; with a cutoff of 0 every observed pair is kept.
pub(super) fn make_feature_bag(model: &mut Model, sequences: &[Sequence], cutoff: usize) {
    let mut counts: BTreeMap<(u32, u32), usize> = BTreeMap::new();
    if cutoff > 0 {
        for seq in sequences {
            for (item, &label) in seq.items.iter().zip(&seq.labels) {
                for &aid in item {
                    *counts.entry((label, aid)).or_insert(0) += 1;
                }
            }
        }
    }

    for seq in sequences {
        for (item, &label) in seq.items.iter().zip(&seq.labels) {
            for &aid in item {
                if cutoff > 0 && counts.get(&(label, aid)).copied().unwrap_or(0) <= cutoff {
                    continue;
                }
                model.bag.get_or_insert(Feature::new(label, aid));
            }
        }
    }

    model.build_tables();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::Dictionary;
    use crate::model::ModelOptions;

    fn corpus() -> (Dictionary, Dictionary, Vec<Sequence>) {
        let mut labels = Dictionary::new();
        let n = labels.get_or_insert("N");
        let v = labels.get_or_insert("V");
        let mut attrs = Dictionary::new();
        let common = attrs.get_or_insert("common");
        let rare = attrs.get_or_insert("rare");

        let mut seq = Sequence::with_capacity(3);
        seq.push(vec![common], n);
        seq.push(vec![common, rare], n);
        seq.push(vec![common], v);
        (labels, attrs, vec![seq])
    }

    #[test]
    fn test_feature_bag_without_cutoff() {
        let (labels, attrs, sequences) = corpus();
        let mut model = Model::new(labels, attrs, ModelOptions::default());
        make_feature_bag(&mut model, &sequences, 0);
        assert!(model.weight("N", "common").is_some());
        assert!(model.weight("N", "rare").is_some());
        assert!(model.weight("V", "common").is_some());
        assert!(model.weight("V", "rare").is_none());
    }

    #[test]
    fn test_feature_bag_with_cutoff() {
        let (labels, attrs, sequences) = corpus();
        let mut model = Model::new(labels, attrs, ModelOptions::default());
        make_feature_bag(&mut model, &sequences, 1);
        // Only (N, common) occurs more than once
        assert!(model.weight("N", "common").is_some());
        assert!(model.weight("N", "rare").is_none());
        assert!(model.weight("V", "common").is_none());

        let common = model.to_attr_id("common").unwrap();
        assert_eq!(model.attr_refs(common).len(), 1);
        let rare = model.to_attr_id("rare").unwrap();
        assert!(model.attr_refs(rare).is_empty());
    }

    #[test]
    fn test_edges_exist_even_when_unobserved() {
        let (labels, attrs, sequences) = corpus();
        let mut model = Model::new(labels, attrs, ModelOptions::default());
        make_feature_bag(&mut model, &sequences, 0);
        // V never follows V in the data
        assert_eq!(model.weight("V", "->\tV"), Some(0.0));
        assert_eq!(model.weight("!EOS!", "->\t!EOS!\t->\t!BOS!"), Some(0.0));
    }
}
