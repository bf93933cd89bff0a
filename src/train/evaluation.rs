use crate::dataset::Sequence;
use crate::error::Result;
use crate::model::Model;
use crate::tagger::decode;

/// Fraction of held-out positions whose decoded label differs from the gold
/// label, decoding with `weights` instead of the model's own parameters
pub(super) fn heldout_error(model: &Model, weights: &[f64], sequences: &[Sequence]) -> Result<f64> {
    let mut num_errors = 0;
    let mut total = 0;
    for seq in sequences {
        total += seq.len();
        let predicted = decode(model, weights, seq)?;
        num_errors += predicted
            .iter()
            .zip(&seq.labels)
            .filter(|(p, l)| p != l)
            .count();
    }
    if total == 0 {
        return Ok(0.0);
    }
    Ok(num_errors as f64 / total as f64)
}
