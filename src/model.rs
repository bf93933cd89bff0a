use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;

use bstr::ByteSlice;
use ndarray::{Array2, Array3, Array4};

use crate::context::{EdgeTables, Edges};
use crate::dictionary::Dictionary;
use crate::error::{Error, Result};
use crate::feature::{edge_arity, edge_labels, edge_marker, Feature, FeatureBag};
use crate::model_writer::ModelWriter;
use crate::Tagger;

/// Reserved pseudo-label placed before the first token
pub const BOS_LABEL: &str = "!BOS!";
/// Reserved pseudo-label placed after the last token
pub const EOS_LABEL: &str = "!EOS!";

/// Returns `true` for the reserved pseudo-label names
pub fn is_reserved_label(label: &str) -> bool {
    label == BOS_LABEL || label == EOS_LABEL
}

/// Structural options shared by training and decoding
#[derive(Debug, Clone)]
pub struct ModelOptions {
    edges: Edges,
    lookahead_depth: usize,
    max_labels: usize,
    max_sequence_len: usize,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            edges: Edges::default(),
            lookahead_depth: 2,
            max_labels: 64,
            max_sequence_len: 1000,
        }
    }
}

impl ModelOptions {
    pub fn edges(&self) -> Edges {
        self.edges
    }

    pub fn set_edges(&mut self, edges: Edges) -> Result<()> {
        if edges.is_empty() {
            return Err(Error::invalid("at least one edge order must be enabled"));
        }
        self.edges = edges;
        Ok(())
    }

    /// Number of future positions explored before committing a label
    pub fn lookahead_depth(&self) -> usize {
        self.lookahead_depth
    }

    pub fn set_lookahead_depth(&mut self, depth: usize) -> Result<()> {
        if depth < 1 {
            return Err(Error::invalid("lookahead_depth must be at least 1"));
        }
        self.lookahead_depth = depth;
        Ok(())
    }

    /// Maximum number of label types, the two reserved labels included
    pub fn max_labels(&self) -> usize {
        self.max_labels
    }

    pub fn set_max_labels(&mut self, max_labels: usize) -> Result<()> {
        if max_labels < 3 {
            return Err(Error::invalid("max_labels must be at least 3"));
        }
        self.max_labels = max_labels;
        Ok(())
    }

    /// Maximum number of tokens in a sequence
    pub fn max_sequence_len(&self) -> usize {
        self.max_sequence_len
    }

    pub fn set_max_sequence_len(&mut self, max_sequence_len: usize) -> Result<()> {
        if max_sequence_len < 1 {
            return Err(Error::invalid("max_sequence_len must be at least 1"));
        }
        self.max_sequence_len = max_sequence_len;
        Ok(())
    }
}

/// The linear sequence-labeling model
///
/// Owns the label and feature-name vocabularies, the feature bag, the flat
/// parameter vector and the dense edge tables derived from them.
#[derive(Debug, Clone)]
pub struct Model {
    /// Label vocabulary, user labels first and the reserved labels last
    pub(crate) labels: Dictionary,
    /// Feature-name vocabulary (observation features and edge markers)
    pub(crate) attrs: Dictionary,
    pub(crate) bag: FeatureBag,
    pub(crate) weights: Vec<f64>,
    /// Parameter indices of every user label for each feature name
    attr_refs: Vec<Vec<u32>>,
    pub(crate) tables: EdgeTables,
    num_classes: usize,
    options: ModelOptions,
}

impl Model {
    /// Freeze a label vocabulary by appending the reserved labels to it
    pub(crate) fn new(mut labels: Dictionary, attrs: Dictionary, options: ModelOptions) -> Self {
        let num_classes = labels.len();
        labels.get_or_insert(BOS_LABEL);
        labels.get_or_insert(EOS_LABEL);
        Self {
            labels,
            attrs,
            bag: FeatureBag::new(),
            weights: Vec::new(),
            attr_refs: Vec::new(),
            tables: EdgeTables::default(),
            num_classes,
            options,
        }
    }

    /// Load a model from a file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, ModelOptions::default())
    }

    /// Load a model from a file using the given options
    ///
    /// Trigram edges are enabled automatically when the file contains them.
    pub fn open_with<P: AsRef<Path>>(path: P, options: ModelOptions) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        log::debug!("loading model from {}", path.display());
        let model = Self::from_reader_with(BufReader::new(file), options)?;
        log::debug!(
            "loaded {} labels, {} feature names, {} parameters",
            model.num_labels(),
            model.num_attrs(),
            model.num_params()
        );
        Ok(model)
    }

    /// Replace this model with the one stored in `path`
    ///
    /// On error the current model is left untouched.
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        *self = Self::open_with(path, self.options.clone())?;
        Ok(())
    }

    /// Read a model in the `label<TAB>feature<TAB>weight` text format
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        Self::from_reader_with(reader, ModelOptions::default())
    }

    pub fn from_reader_with<R: BufRead>(mut reader: R, options: ModelOptions) -> Result<Self> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf)?;

        let mut records = Vec::new();
        for (index, line) in ByteSlice::lines(buf.as_slice()).enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            records.push(parse_line(line, index + 1)?);
        }

        // User labels keep their order of first appearance, whether they
        // appear in the label column or inside an edge marker. The file is
        // written feature-name major, so ids may differ from the ones the
        // model was trained with; weights follow their labels by name.
        let mut labels = Dictionary::new();
        for (label, name, _) in &records {
            let markers = edge_labels(name).into_iter().flatten();
            for l in std::iter::once(*label).chain(markers) {
                if !is_reserved_label(l) {
                    labels.get_or_insert(l);
                }
            }
        }
        if labels.is_empty() {
            return Err(Error::NoLabels);
        }
        if labels.len() + 2 > options.max_labels() {
            return Err(Error::TooManyLabels {
                max: options.max_labels(),
            });
        }

        let mut model = Self::new(labels, Dictionary::new(), options);
        for (label, name, weight) in records {
            if edge_arity(name) == Some(3) {
                model.options.edges |= Edges::TRIGRAM;
            }
            let lid = model.labels.get_or_insert(label);
            let aid = model.attrs.get_or_insert(name);
            let fid = model.bag.get_or_insert(Feature::new(lid, aid)) as usize;
            if fid == model.weights.len() {
                model.weights.push(weight);
            } else {
                model.weights[fid] = weight;
            }
        }
        model.build_tables();
        Ok(model)
    }

    /// Save the model, skipping parameters whose absolute weight is below
    /// `threshold`
    pub fn save<P: AsRef<Path>>(&self, path: P, threshold: f64) -> Result<()> {
        ModelWriter::write(path.as_ref(), self, threshold)
    }

    /// Construct the dense edge tables and the per-feature parameter lists.
    ///
    /// Every edge over the whole label vocabulary receives a parameter, so any
    /// label tuple the search can form resolves to an index. Newly created
    /// parameters start at zero. Running this again on a frozen vocabulary
    /// yields identical tables.
    pub(crate) fn build_tables(&mut self) {
        let Model {
            labels,
            attrs,
            bag,
            options,
            ..
        } = self;
        let names: Vec<&str> = labels.iter().map(|(s, _)| s).collect();
        let l = names.len();
        let mut intern = |prevs: &[usize], cur: usize| -> u32 {
            let marker = edge_marker(prevs.iter().map(|&p| names[p]));
            let aid = attrs.get_or_insert(&marker);
            bag.get_or_insert(Feature::new(cur as u32, aid))
        };

        let edges = options.edges;
        let unigram = edges
            .contains(Edges::UNIGRAM)
            .then(|| Array2::from_shape_fn((l, l), |(p1, cur)| intern(&[p1], cur)));
        let bigram = edges.contains(Edges::BIGRAM).then(|| {
            Array3::from_shape_fn((l, l, l), |(p2, p1, cur)| intern(&[p2, p1], cur))
        });
        let trigram = edges.contains(Edges::TRIGRAM).then(|| {
            Array4::from_shape_fn((l, l, l, l), |(p3, p2, p1, cur)| {
                intern(&[p3, p2, p1], cur)
            })
        });
        self.tables = EdgeTables {
            unigram,
            bigram,
            trigram,
        };

        let num_classes = self.num_classes as u32;
        let bag = &self.bag;
        self.attr_refs = self
            .attrs
            .iter()
            .map(|(name, aid)| {
                if edge_arity(name).is_some() {
                    return Vec::new();
                }
                (0..num_classes)
                    .filter_map(|lid| bag.get(Feature::new(lid, aid)))
                    .collect()
            })
            .collect();
        self.weights.resize(self.bag.len(), 0.0);
    }

    /// Number of user labels, excluding the reserved labels
    pub fn num_labels(&self) -> usize {
        self.num_classes
    }

    /// Number of feature names, edge markers included
    pub fn num_attrs(&self) -> usize {
        self.attrs.len()
    }

    /// Number of parameters
    pub fn num_params(&self) -> usize {
        self.bag.len()
    }

    pub fn options(&self) -> &ModelOptions {
        &self.options
    }

    /// Change the lookahead depth used for decoding
    pub fn set_lookahead_depth(&mut self, depth: usize) -> Result<()> {
        self.options.set_lookahead_depth(depth)
    }

    /// ID of the `!BOS!` pseudo-label
    pub(crate) fn bos(&self) -> u32 {
        self.num_classes as u32
    }

    /// Convert a label ID to label string
    pub fn to_label(&self, lid: u32) -> Option<&str> {
        self.labels.to_str(lid)
    }

    /// Convert a label string to label ID
    pub fn to_label_id(&self, value: &str) -> Option<u32> {
        self.labels.get(value)
    }

    /// Convert a feature-name ID to its string
    pub fn to_attr(&self, aid: u32) -> Option<&str> {
        self.attrs.to_str(aid)
    }

    /// Convert a feature name to its ID
    pub fn to_attr_id(&self, value: &str) -> Option<u32> {
        self.attrs.get(value)
    }

    /// Weight of the parameter pairing `label` with the feature `name`
    pub fn weight(&self, label: &str, name: &str) -> Option<f64> {
        let lid = self.labels.get(label)?;
        let aid = self.attrs.get(name)?;
        let fid = self.bag.get(Feature::new(lid, aid))?;
        Some(self.weights[fid as usize])
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Replace the parameter vector
    ///
    /// # Panics
    ///
    /// Panics if `weights.len()` does not equal `self.num_params()`.
    pub(crate) fn set_weights(&mut self, weights: Vec<f64>) {
        assert_eq!(
            weights.len(),
            self.bag.len(),
            "weights length ({}) must equal number of parameters ({})",
            weights.len(),
            self.bag.len()
        );
        self.weights = weights;
    }

    /// Parameter indices fired by an observation feature, one per user label
    /// that has it
    pub(crate) fn attr_refs(&self, aid: u32) -> &[u32] {
        self.attr_refs
            .get(aid as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Get a new tagger
    pub fn tagger(&self) -> Tagger<'_> {
        Tagger::new(self)
    }

    /// Print the model in human-readable format
    pub fn dump<W: Write>(&self, w: &mut W) -> Result<()> {
        writeln!(w, "LABELS = {{")?;
        for (label, lid) in self.labels.iter() {
            writeln!(w, "  {:>5}: {}", lid, label)?;
        }
        writeln!(w, "}}\n")?;

        let mut transitions = Vec::new();
        let mut states = Vec::new();
        for (fid, feature) in self.bag.iter() {
            let name = self.attrs.to_str(feature.name).unwrap_or_default();
            let target = self.labels.to_str(feature.label).unwrap_or_default();
            let weight = self.weights[fid as usize];
            match edge_labels(name) {
                Some(prevs) => {
                    let source = prevs.collect::<Vec<_>>().join(" ");
                    transitions.push(format!("  {} --> {}: {:.6}", source, target, weight));
                }
                None => states.push(format!("  {} --> {}: {:.6}", name, target, weight)),
            }
        }

        writeln!(w, "TRANSITIONS = {{")?;
        for line in transitions {
            writeln!(w, "{}", line)?;
        }
        writeln!(w, "}}\n")?;
        writeln!(w, "STATE_FEATURES = {{")?;
        for line in states {
            writeln!(w, "{}", line)?;
        }
        writeln!(w, "}}\n")?;
        Ok(())
    }
}

fn parse_line(line: &[u8], lineno: usize) -> Result<(&str, &str, f64)> {
    let malformed = |reason: &str| Error::MalformedModel {
        line: lineno,
        reason: reason.to_string(),
    };
    // The feature name may itself contain tabs, so split on the first and
    // last one only.
    let (t1, t2) = match (line.find_byte(b'\t'), line.rfind_byte(b'\t')) {
        (Some(t1), Some(t2)) if t1 < t2 => (t1, t2),
        _ => return Err(malformed("expected label, feature and weight separated by tabs")),
    };
    let label = line[..t1]
        .to_str()
        .map_err(|_| malformed("label is not valid UTF-8"))?;
    if label.chars().any(char::is_whitespace) {
        return Err(malformed("invalid label"));
    }
    let name = line[t1 + 1..t2]
        .to_str()
        .map_err(|_| malformed("feature name is not valid UTF-8"))?;
    let weight = line[t2 + 1..]
        .to_str()
        .ok()
        .and_then(|w| w.trim().parse::<f64>().ok())
        .ok_or_else(|| malformed("invalid weight"))?;
    Ok((label, name, weight))
}
