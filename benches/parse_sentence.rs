use criterion::{black_box, criterion_group, criterion_main, Criterion};

use pcfg_cyk::cyk::{parse_chart_with, Strategy};
use pcfg_cyk::oov::Corrector;
use pcfg_cyk::treebank::read_treebank;
use pcfg_cyk::{Config, NoEmbeddings, Pcfg};

const TREEBANK_SRC: &str = include_str!("./sample.mrg");

fn parse(pcfg: &Pcfg, input: &[&str]) -> bool {
  pcfg.parse(input, &NoEmbeddings).is_some()
}

fn criterion_benchmark(c: &mut Criterion) {
  let config = Config::default();
  let trees = read_treebank(TREEBANK_SRC, &config).unwrap();
  let pcfg = Pcfg::estimate(&trees, &config).unwrap();

  let simple_input = "le chat dort .".split(' ').collect::<Vec<_>>();
  let complex_input = "la femme regarde le chat noir dans le jardin ."
    .split(' ')
    .collect::<Vec<_>>();
  let typo_input = "la feme regarde le chatt noir dans le jardn ."
    .split(' ')
    .collect::<Vec<_>>();

  c.bench_function("parse simple", |b| {
    b.iter(|| parse(black_box(&pcfg), black_box(&simple_input)))
  });

  c.bench_function("parse complex", |b| {
    b.iter(|| parse(black_box(&pcfg), black_box(&complex_input)))
  });

  c.bench_function("parse with typos", |b| {
    b.iter(|| parse(black_box(&pcfg), black_box(&typo_input)))
  });

  let hypotheses = Corrector::new(&pcfg, &NoEmbeddings).correct_all(&complex_input);
  for (name, strategy) in [
    ("chart adaptive", Strategy::Adaptive),
    ("chart rule-driven", Strategy::RuleDriven),
    ("chart cell-driven", Strategy::CellDriven),
  ] {
    c.bench_function(name, |b| {
      b.iter(|| parse_chart_with(black_box(&pcfg), black_box(&hypotheses), strategy).cell_count())
    });
  }
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
