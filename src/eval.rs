//! Held-out evaluation: how many sentences get a parse, and how many of
//! their tokens get the gold POS tag.

use std::fmt;

use tracing::{debug, info};

use crate::embeddings::Embeddings;
use crate::pcfg::Pcfg;
use crate::syntree::Tree;

/// First 80% of the corpus for training, last 10% for testing. The 10% in
/// between is left for development.
pub fn split_corpus(trees: &[Tree]) -> (&[Tree], &[Tree]) {
  let n = trees.len();
  let train = n * 8 / 10;
  let test = n / 10;
  (&trees[..train], &trees[n - test..])
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation {
  pub sentences: usize,
  pub parsed: usize,
  /// Tokens of the parsed sentences
  pub tokens: usize,
  pub correct_tags: usize,
}

impl Evaluation {
  pub fn coverage(&self) -> f64 {
    if self.sentences == 0 {
      return 0.0;
    }
    self.parsed as f64 / self.sentences as f64
  }

  /// POS accuracy over the sentences that got a parse
  pub fn accuracy(&self) -> f64 {
    if self.tokens == 0 {
      return 0.0;
    }
    self.correct_tags as f64 / self.tokens as f64
  }
}

impl fmt::Display for Evaluation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "parsed {}/{} sentences ({:.2}%), tagged {}/{} tokens correctly ({:.2}%)",
      self.parsed,
      self.sentences,
      self.coverage() * 100.0,
      self.correct_tags,
      self.tokens,
      self.accuracy() * 100.0
    )
  }
}

/// Number of positions where both trees put the same POS tag
pub fn matching_tags(gold: &Tree, predicted: &Tree) -> usize {
  gold
    .token_pos_mapping()
    .iter()
    .zip(predicted.token_pos_mapping().iter())
    .filter(|((_, a), (_, b))| a == b)
    .count()
}

/// Parses the tokens of every gold tree and compares the POS tags
pub fn evaluate(pcfg: &Pcfg, gold: &[Tree], embeddings: &dyn Embeddings) -> Evaluation {
  let mut eval = Evaluation::default();

  for (idx, tree) in gold.iter().enumerate() {
    let tokens = tree.terminals();
    let tokens = tokens.iter().map(|t| t.as_str()).collect::<Vec<_>>();
    eval.sentences += 1;

    match pcfg.parse(&tokens, embeddings) {
      Some(parse) => {
        let correct = matching_tags(tree, &parse.tree);
        debug!(sentence = idx, tokens = tokens.len(), correct, "parsed");
        eval.parsed += 1;
        eval.tokens += tokens.len();
        eval.correct_tags += correct;
      }
      None => debug!(sentence = idx, tokens = tokens.len(), "no parse"),
    }
  }

  info!(
    sentences = eval.sentences,
    coverage = eval.coverage(),
    accuracy = eval.accuracy(),
    "evaluated"
  );
  eval
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::Config;
  use crate::embeddings::NoEmbeddings;
  use crate::pcfg::small_corpus;
  use crate::treebank::parse_tree;

  #[test]
  fn test_split_corpus() {
    let trees = (0..25)
      .map(|i| Tree::new(format!("S{}", i)))
      .collect::<Vec<_>>();
    let (train, test) = split_corpus(&trees);
    assert_eq!(train.len(), 20);
    assert_eq!(test.len(), 2);
    assert_eq!(test[0], Tree::new("S23"));

    let (train, test) = split_corpus(&trees[..3]);
    assert_eq!(train.len(), 2);
    assert!(test.is_empty());
  }

  #[test]
  fn test_evaluate() {
    let corpus = small_corpus();
    let pcfg = Pcfg::estimate(&corpus, &Config::default()).unwrap();
    let unparsable = parse_tree("(SENT (VN (V dort)) (NP (DET le) (NC chat)))", &Config::default()).unwrap();

    let mut gold = corpus.clone();
    gold.push(unparsable);
    let eval = evaluate(&pcfg, &gold, &NoEmbeddings);

    assert_eq!(eval.sentences, 4);
    assert_eq!(eval.parsed, 3);
    assert_eq!(eval.tokens, 3 + 3 + 5);
    assert_eq!(eval.correct_tags, eval.tokens);
    assert!((eval.coverage() - 0.75).abs() < 1e-9);
    assert!((eval.accuracy() - 1.0).abs() < 1e-9);
  }

  #[test]
  fn test_matching_tags() {
    let config = Config::default();
    let gold = parse_tree("(SENT (NP (DET le) (NC chat)) (VN (V dort)))", &config).unwrap();
    let other = parse_tree("(SENT (NP (DET le) (ADJ chat)) (VN (NC dort)))", &config).unwrap();
    assert_eq!(matching_tags(&gold, &gold), 3);
    assert_eq!(matching_tags(&gold, &other), 1);
    assert_eq!(format!("{}", Evaluation::default()), "parsed 0/0 sentences (0.00%), tagged 0/0 tokens correctly (0.00%)");
  }
}
