use std::path::Path;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use paraclean::{
    filtering::{punctuation::similarity, Mode, OracleConfig},
    models::ModelCache,
    pipeline::FilterPipeline,
    record::Record,
};
use serde_json::json;

fn records() -> Vec<Record> {
    [
        ("Hello world.", "Hei maailma."),
        ("<b>Bold</b> move!", "Rohkea siirto!"),
        ("There are 12 apples and 3 pears.", "Omenoita on 12 ja päärynöitä 3."),
        (
            "A rather long sentence with quite a few words in it.",
            "Lyhyt.",
        ),
        ("?????", "!!!!!"),
    ]
    .iter()
    .cycle()
    .take(1000)
    .enumerate()
    .map(|(i, (src, tgt))| Record::from((i, vec![*src, *tgt])))
    .collect()
}

fn pipeline(mode: Mode) -> FilterPipeline {
    let configs: Vec<OracleConfig> = serde_json::from_value(json!([
        {"LengthFilter": {"max_length": 20}},
        {"LengthRatioFilter": {}},
        {"LongWordFilter": {}},
        {"HtmlTagFilter": {}},
        {"CharacterScoreFilter": {"scripts": ["Latin", "Latin"]}},
        {"TerminalPunctuationFilter": {}},
        {"NonZeroNumeralsFilter": {}}
    ]))
    .unwrap();
    FilterPipeline::from_config(&configs, mode, Path::new("."), &ModelCache::new()).unwrap()
}

pub fn filter(c: &mut Criterion) {
    let records = records();
    let pipeline = pipeline(Mode::Filter);
    c.bench_function("filter_accepts", |b| {
        b.iter(|| {
            for r in &records {
                black_box(pipeline.accepts(black_box(r)).unwrap());
            }
        })
    });
}

pub fn score(c: &mut Criterion) {
    let records = records();
    let pipeline = pipeline(Mode::Score);
    c.bench_function("score_objects", |b| {
        b.iter(|| {
            for r in &records {
                black_box(pipeline.scores(black_box(r)).unwrap());
            }
        })
    });
}

pub fn numerals(c: &mut Criterion) {
    c.bench_function("numeral_similarity", |b| {
        b.iter(|| similarity(black_box(&b"1234567891234"[..]), black_box(&b"1243567899321"[..])))
    });
}

criterion_group!(benches, filter, score, numerals);
criterion_main!(benches);
