#[macro_use]
extern crate lazy_static;

pub mod config;
pub mod cyk;
pub mod embeddings;
pub mod error;
pub mod eval;
pub mod normalize;
pub mod oov;
pub mod pcfg;
pub mod rules;
pub mod syntree;
pub mod treebank;
pub mod utils;

use crate::cyk::{parse_chart, Chart};
use crate::oov::Corrector;
pub use crate::config::Config;
pub use crate::embeddings::{EmbeddingTable, Embeddings, NoEmbeddings};
pub use crate::error::LoadError;
pub use crate::pcfg::Pcfg;
pub use crate::syntree::Tree;
pub use crate::utils::Err;

/// The most probable tree for a sentence, in the grammar's normal form
#[derive(Debug, Clone, PartialEq)]
pub struct Parse {
  pub tree: Tree,
  pub log_prob: f64,
}

impl Parse {
  /// The tree with the binarization and terminal wrapping undone
  pub fn simplified(&self, pcfg: &Pcfg) -> Tree {
    pcfg.normalizer().simplified(&self.tree)
  }
}

impl Pcfg {
  /// Corrects every token, then fills the chart over the candidates
  pub fn parse_chart(&self, tokens: &[&str], embeddings: &dyn Embeddings) -> Chart {
    let hypotheses = Corrector::new(self, embeddings).correct_all(tokens);
    parse_chart(self, &hypotheses)
  }

  /// Most probable parse rooted in the start symbol, if any covers all of `tokens`
  pub fn parse(&self, tokens: &[&str], embeddings: &dyn Embeddings) -> Option<Parse> {
    if tokens.is_empty() {
      return None;
    }
    let chart = self.parse_chart(tokens, embeddings);
    chart
      .best(self.start_symbol().as_str())
      .map(|(tree, log_prob)| Parse { tree, log_prob })
  }
}

#[cfg(test)]
fn single_sentence() -> Pcfg {
  let trees =
    treebank::read_treebank("( (SENT (NP (DET le) (NC chat)) (VN (V dort))) )", &Config::default()).unwrap();
  Pcfg::estimate(&trees, &Config::default()).unwrap()
}

#[test]
fn test_parse_training_sentence() {
  let pcfg = single_sentence();
  let parse = pcfg.parse(&["le", "chat", "dort"], &NoEmbeddings).unwrap();

  // every emission competes with <UNK>, every grammar rule is alone in its row
  assert!((parse.log_prob - 3.0 * 0.5f64.ln()).abs() < 1e-9);
  assert_eq!(
    format!("{}", parse.tree),
    "(SENT (NP (_DET (DET le)) (_NC (NC chat))) (VN (V dort)))"
  );
  assert_eq!(
    format!("{}", parse.simplified(&pcfg)),
    "(SENT (NP (DET le) (NC chat)) (VN (V dort)))"
  );
}

#[test]
fn test_parse_corrects_tokens() {
  let pcfg = single_sentence();

  let parse = pcfg.parse(&["le", "chatt", "dort"], &NoEmbeddings).unwrap();
  assert_eq!(
    format!("{}", parse.simplified(&pcfg)),
    "(SENT (NP (DET le) (NC chat)) (VN (V dort)))"
  );

  let parse = pcfg.parse(&["le", "xyzzy", "dort"], &NoEmbeddings).unwrap();
  assert_eq!(
    format!("{}", parse.simplified(&pcfg)),
    "(SENT (NP (DET le) (NC <UNK>)) (VN (V dort)))"
  );

  let mut embeddings = EmbeddingTable::new(2);
  embeddings.insert("matou", &[1.0, 0.2]);
  embeddings.insert("chat", &[0.9, 0.25]);
  let parse = pcfg.parse(&["le", "matou", "dort"], &embeddings).unwrap();
  assert_eq!(parse.tree.terminals().iter().map(|t| t.as_str()).collect::<Vec<_>>(), ["le", "chat", "dort"]);
}

#[test]
fn test_no_parse() {
  let pcfg = single_sentence();
  assert!(pcfg.parse(&["dort", "le", "chat"], &NoEmbeddings).is_none());
  assert!(pcfg.parse(&[], &NoEmbeddings).is_none());

  let other_start = Pcfg::estimate(
    &treebank::read_treebank("( (SENT (NP (DET le) (NC chat)) (VN (V dort))) )", &Config::default()).unwrap(),
    &Config::default().with_start_symbol("S"),
  )
  .unwrap();
  assert!(other_start.parse(&["le", "chat", "dort"], &NoEmbeddings).is_none());
}
