use criterion::{black_box, criterion_group, criterion_main, Criterion};
use postag::{Model, Trainer};

fn train_model() -> Model {
    let xseq = vec![
        vec!["walk", "shop"],
        vec!["walk"],
        vec!["walk", "clean"],
        vec!["shop", "clean"],
        vec!["walk", "clean"],
        vec!["clean", "shop"],
        vec!["walk", "shop"],
        vec![],
        vec!["clean"],
    ];
    let yseq = vec![
        "sunny", "sunny", "sunny", "rainy", "rainy", "rainy", "sunny", "sunny", "rainy",
    ];
    let mut trainer = Trainer::new();
    trainer.append(&xseq, &yseq).unwrap();
    trainer.params_mut().set_shuffle_seed(Some(1));
    trainer.train(0, 0.0, 0.0).unwrap()
}

fn criterion_benchmark(c: &mut Criterion) {
    let model = train_model();
    let xseq = vec![
        vec!["walk", "shop"],
        vec!["walk"],
        vec!["walk", "clean"],
        vec!["shop", "clean"],
        vec!["walk", "clean"],
        vec!["clean", "shop"],
        vec!["walk", "shop"],
        vec![],
        vec!["clean"],
    ];

    let mut group = c.benchmark_group("tag");
    group.bench_function("postag", |b| {
        let tagger = model.tagger();
        b.iter(|| {
            let _res = tagger.tag(black_box(&xseq)).unwrap();
        })
    });
    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
