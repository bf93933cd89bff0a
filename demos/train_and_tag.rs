//! Train a tiny tagger, save it and tag a sentence with the reloaded model.
//!
//! Run with `RUST_LOG=info cargo run --example train_and_tag` to see the
//! training progress.

use postag::{Model, Trainer};

fn features(words: &[&str]) -> Vec<Vec<String>> {
    words
        .iter()
        .enumerate()
        .map(|(i, word)| {
            let lower = word.to_lowercase();
            let start = lower.char_indices().rev().nth(1).map_or(0, |(i, _)| i);
            let suffix = &lower[start..];
            let mut item = vec![format!("w={}", lower), format!("suf={}", suffix)];
            match i.checked_sub(1) {
                Some(p) => item.push(format!("w-1={}", words[p].to_lowercase())),
                None => item.push("w-1=<s>".to_string()),
            }
            item
        })
        .collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let corpus: &[(&[&str], &[&str])] = &[
        (&["The", "dog", "runs"], &["DT", "NN", "VBZ"]),
        (&["A", "cat", "sleeps"], &["DT", "NN", "VBZ"]),
        (&["The", "cat", "runs", "fast"], &["DT", "NN", "VBZ", "RB"]),
        (&["Dogs", "sleep"], &["NNS", "VBP"]),
        (&["Cats", "run", "fast"], &["NNS", "VBP", "RB"]),
    ];

    let mut trainer = Trainer::new();
    for &(words, tags) in corpus {
        trainer.append(&features(words), tags)?;
    }
    trainer.set("max_iterations", "20")?;
    trainer.params_mut().set_shuffle_seed(Some(1));
    let model = trainer.train(0, 0.0, 0.0)?;

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("model.txt");
    model.save(&path, 0.0)?;
    let model = Model::open(&path)?;

    let sentence = ["The", "dog", "sleeps", "fast"];
    let tags = model.tagger().tag(&features(&sentence))?;
    for (word, tag) in sentence.iter().zip(tags) {
        println!("{}\t{}", word, tag);
    }
    Ok(())
}
