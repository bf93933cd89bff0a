use std::io::{self, Write};

use postag_rs::{Model, Trainer};
use pyo3::exceptions::{PyIOError, PyKeyError, PyValueError};
use pyo3::prelude::*;

fn to_py_err(err: postag_rs::Error) -> PyErr {
    match err {
        postag_rs::Error::Io(err) => PyIOError::new_err(err.to_string()),
        postag_rs::Error::UnknownParameter(name) => PyKeyError::new_err(name),
        err => PyValueError::new_err(err.to_string()),
    }
}

#[pyclass(module = "postag", name = "Model")]
struct PyModel {
    model: Model,
}

#[pymethods]
impl PyModel {
    /// Load a model from a local file
    #[staticmethod]
    fn open(path: &str) -> PyResult<Self> {
        let model = Model::open(path).map_err(to_py_err)?;
        Ok(Self { model })
    }

    /// Replace this model with the one stored in a local file
    fn load(&mut self, path: &str) -> PyResult<()> {
        self.model.load(path).map_err(to_py_err)
    }

    /// Save the model, skipping weights whose magnitude is below `threshold`
    #[pyo3(signature = (path, threshold = 0.0))]
    fn save(&self, path: &str, threshold: f64) -> PyResult<()> {
        self.model.save(path, threshold).map_err(to_py_err)
    }

    /// Predict the label sequence for the item sequence.
    fn tag(&self, xseq: Vec<Vec<String>>) -> PyResult<Vec<String>> {
        let labels = self.model.tagger().tag(&xseq).map_err(to_py_err)?;
        Ok(labels.iter().map(|l| l.to_string()).collect())
    }

    fn label_for_id(&self, lid: u32) -> Option<String> {
        self.model.to_label(lid).map(str::to_string)
    }

    fn id_for_label(&self, label: &str) -> Option<u32> {
        self.model.to_label_id(label)
    }

    #[getter]
    fn num_labels(&self) -> usize {
        self.model.num_labels()
    }

    /// Print the model in human-readable format
    fn dump(&self) -> PyResult<()> {
        let mut out = Vec::new();
        self.model.dump(&mut out).map_err(to_py_err)?;
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle.write_all(&out)?;
        Ok(())
    }
}

#[pyclass(module = "postag", name = "Trainer")]
struct PyTrainer {
    trainer: Trainer,
}

#[pymethods]
impl PyTrainer {
    #[new]
    fn new() -> Self {
        Self {
            trainer: Trainer::new(),
        }
    }

    /// Append a labeled sequence
    fn append(&mut self, xseq: Vec<Vec<String>>, yseq: Vec<String>) -> PyResult<()> {
        self.trainer.append(&xseq, &yseq).map_err(to_py_err)
    }

    /// Set a training parameter by name
    fn set(&mut self, name: &str, value: &str) -> PyResult<()> {
        self.trainer.set(name, value).map_err(to_py_err)
    }

    fn get(&self, name: &str) -> PyResult<String> {
        self.trainer.get(name).map_err(to_py_err)
    }

    fn clear(&mut self) {
        self.trainer.clear();
    }

    /// Train a model
    #[pyo3(signature = (cutoff = 0, sigma = 0.0, width_factor = 0.0))]
    fn train(&mut self, cutoff: usize, sigma: f64, width_factor: f64) -> PyResult<PyModel> {
        let model = self
            .trainer
            .train(cutoff, sigma, width_factor)
            .map_err(to_py_err)?;
        Ok(PyModel { model })
    }

    fn __len__(&self) -> usize {
        self.trainer.len()
    }
}

#[pymodule]
fn postag(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    m.add_class::<PyModel>()?;
    m.add_class::<PyTrainer>()?;
    Ok(())
}
