//! Out-of-vocabulary and typo handling.
//!
//! Every input token is turned into a list of candidate tokens the lexicon
//! knows about, tried in order until one level finds something:
//!
//! 1. the token itself, if it's in the vocabulary
//! 2. vocabulary words within a small optimal string alignment distance
//! 3. the nearest vocabulary words in an embedding space
//! 4. the unknown token
//!
//! Candidates all carry log probability 0: the lexicon probabilities decide
//! between them during parsing.

use std::collections::{BTreeSet, HashSet};

use tracing::trace;

use crate::config::Config;
use crate::embeddings::Embeddings;
use crate::pcfg::Pcfg;
use crate::rules::Symbol;

/// A candidate reading of one input token
#[derive(Debug, Clone, PartialEq)]
pub struct Hypothesis {
  pub token: Symbol,
  pub log_prob: f64,
}

impl Hypothesis {
  pub fn new(token: Symbol, log_prob: f64) -> Self {
    Self { token, log_prob }
  }

  /// A hypothesis that costs nothing
  pub fn certain(token: Symbol) -> Self {
    Self::new(token, 0.0)
  }
}

/// Which level produced a token's candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correction {
  Known,
  EditDistance,
  Embedding,
  Unknown,
}

/// Optimal string alignment distance between `a` and `b`, counted in chars:
/// insertions, deletions, substitutions and swaps of two adjacent characters
/// each cost 1, and no substring is edited twice.
///
/// ```
/// use pcfg_cyk::oov::dl_distance;
///
/// assert_eq!(dl_distance("chat", "chat"), 0);
/// assert_eq!(dl_distance("chat", "caht"), 1);
/// assert_eq!(dl_distance("ca", "abc"), 3);
/// ```
pub fn dl_distance(a: &str, b: &str) -> usize {
  let a = a.chars().collect::<Vec<_>>();
  let b = b.chars().collect::<Vec<_>>();
  let width = b.len() + 1;
  let mut dist = vec![0usize; (a.len() + 1) * width];

  for i in 0..=a.len() {
    dist[i * width] = i;
  }
  for j in 0..=b.len() {
    dist[j] = j;
  }

  for i in 1..=a.len() {
    for j in 1..=b.len() {
      let substitution = if a[i - 1] == b[j - 1] { 0 } else { 1 };
      let mut d = (dist[(i - 1) * width + j] + 1)
        .min(dist[i * width + j - 1] + 1)
        .min(dist[(i - 1) * width + j - 1] + substitution);
      if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
        d = d.min(dist[(i - 2) * width + j - 2] + 1);
      }
      dist[i * width + j] = d;
    }
  }

  dist[a.len() * width + b.len()]
}

/// |cos(u, v)|: strongly opposite vectors count as similar. A zero vector is
/// similar to nothing.
pub fn cosine_similarity(u: &[f32], v: &[f32]) -> f64 {
  let (mut dot, mut nu, mut nv) = (0f64, 0f64, 0f64);
  for (&x, &y) in u.iter().zip(v.iter()) {
    let (x, y) = (x as f64, y as f64);
    dot += x * y;
    nu += x * x;
    nv += y * y;
  }
  if nu == 0.0 || nv == 0.0 {
    return 0.0;
  }
  (dot / (nu.sqrt() * nv.sqrt())).abs()
}

pub struct Corrector<'a> {
  vocabulary: &'a BTreeSet<Symbol>,
  embeddings: &'a dyn Embeddings,
  config: &'a Config,
}

impl<'a> Corrector<'a> {
  pub fn new(pcfg: &'a Pcfg, embeddings: &'a dyn Embeddings) -> Self {
    Self::with_vocabulary(pcfg.vocabulary(), embeddings, pcfg.config())
  }

  pub fn with_vocabulary(
    vocabulary: &'a BTreeSet<Symbol>,
    embeddings: &'a dyn Embeddings,
    config: &'a Config,
  ) -> Self {
    Self {
      vocabulary,
      embeddings,
      config,
    }
  }

  /// Candidate tokens for `token`, never empty
  pub fn correct(&self, token: &str) -> Vec<Hypothesis> {
    self.correct_explained(token).1
  }

  /// Candidates for every token of a sentence
  pub fn correct_all(&self, tokens: &[&str]) -> Vec<Vec<Hypothesis>> {
    tokens.iter().map(|t| self.correct(t)).collect()
  }

  /// Candidate tokens for `token`, along with the level that found them
  pub fn correct_explained(&self, token: &str) -> (Correction, Vec<Hypothesis>) {
    let (level, candidates) = self.candidates(token);
    trace!(token, level = ?level, candidates = candidates.len(), "corrected");
    (
      level,
      candidates.into_iter().map(Hypothesis::certain).collect(),
    )
  }

  fn candidates(&self, token: &str) -> (Correction, Vec<Symbol>) {
    if let Some(known) = self.vocabulary.get(token) {
      return (Correction::Known, vec![known.clone()]);
    }

    let close = self.edit_candidates(token);
    if !close.is_empty() {
      return (
        Correction::EditDistance,
        close.into_iter().map(|(word, _)| word).collect(),
      );
    }

    let similar = self.embedding_candidates(token);
    if !similar.is_empty() {
      return (
        Correction::Embedding,
        similar.into_iter().map(|(word, _)| word).collect(),
      );
    }

    (Correction::Unknown, vec![self.config.unknown_token.clone()])
  }

  /// Vocabulary words within the edit distance limit, with their distance.
  /// Two cheap tests (length difference, character set difference) rule out
  /// most words before the quadratic distance computation.
  pub fn edit_candidates(&self, token: &str) -> Vec<(Symbol, usize)> {
    let token_len = token.chars().count();
    let token_chars = token.chars().collect::<HashSet<_>>();

    let mut close = Vec::new();
    for word in self.vocabulary.iter() {
      let word_len = word.as_str().chars().count();
      if token_len.abs_diff(word_len) > self.config.max_length_difference {
        continue;
      }
      let word_chars = word.as_str().chars().collect::<HashSet<_>>();
      if token_chars.symmetric_difference(&word_chars).count() > self.config.max_charset_difference {
        continue;
      }

      let dist = dl_distance(token, word.as_str());
      if dist < self.config.edit_distance_limit {
        close.push((word.clone(), dist));
      }
    }
    close
  }

  /// The vocabulary words most similar to `token` in the embedding space,
  /// in vocabulary order. Empty if `token` has no vector.
  pub fn embedding_candidates(&self, token: &str) -> Vec<(Symbol, f64)> {
    let Some(target) = self.embeddings.vector(token) else {
      return Vec::new();
    };

    let mut closest: Vec<(Symbol, f64)> = Vec::new();
    for word in self.vocabulary.iter() {
      let Some(v) = self.embeddings.vector(word.as_str()) else {
        continue;
      };
      closest.push((word.clone(), cosine_similarity(target, v)));
      if closest.len() > self.config.nearest_neighbors {
        let mut worst = 0;
        for (idx, (_, sim)) in closest.iter().enumerate() {
          if *sim < closest[worst].1 {
            worst = idx;
          }
        }
        closest.remove(worst);
      }
    }
    closest
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::embeddings::{EmbeddingTable, NoEmbeddings};

  fn vocabulary(words: &[&str]) -> BTreeSet<Symbol> {
    words.iter().map(|&w| Symbol::new(w)).collect()
  }

  fn tokens(hyps: &[Hypothesis]) -> Vec<&str> {
    hyps.iter().map(|h| h.token.as_str()).collect()
  }

  #[test]
  fn test_dl_distance() {
    for (a, b) in [("chat", "chien"), ("", "abc"), ("maison", "mason"), ("ab", "ba")] {
      assert_eq!(dl_distance(a, a), 0);
      assert_eq!(dl_distance(a, b), dl_distance(b, a));
    }
    assert_eq!(dl_distance("ab", "ba"), 1);
    assert_eq!(dl_distance("chatt", "chat"), 1);
    assert_eq!(dl_distance("", "abc"), 3);
    assert_eq!(dl_distance("kitten", "sitting"), 3);
    // true Damerau-Levenshtein would give 2
    assert_eq!(dl_distance("ca", "abc"), 3);
    // multibyte characters count once
    assert_eq!(dl_distance("été", "ete"), 2);
  }

  #[test]
  fn test_cosine_is_absolute() {
    assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-9);
    assert!((cosine_similarity(&[1.0, 0.0], &[-3.0, 0.0]) - 1.0).abs() < 1e-9);
    assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-9);
    assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
  }

  #[test]
  fn test_known_word() {
    let vocab = vocabulary(&["chat", "chats", "dort"]);
    let config = Config::default();
    let corrector = Corrector::with_vocabulary(&vocab, &NoEmbeddings, &config);

    let (level, hyps) = corrector.correct_explained("chat");
    assert_eq!(level, Correction::Known);
    assert_eq!(hyps, vec![Hypothesis::certain("chat".into())]);
  }

  #[test]
  fn test_typo_before_embeddings() {
    let vocab = vocabulary(&["chat", "chien", "dort", "maison"]);
    let config = Config::default();
    let mut table = EmbeddingTable::new(2);
    table.insert("chatt", &[0.0, 1.0]);
    table.insert("maison", &[0.0, 1.0]);
    table.insert("chat", &[1.0, 0.0]);
    let corrector = Corrector::with_vocabulary(&vocab, &table, &config);

    let (level, hyps) = corrector.correct_explained("chatt");
    assert_eq!(level, Correction::EditDistance);
    assert_eq!(tokens(&hyps), vec!["chat"]);
    assert!(hyps.iter().all(|h| h.log_prob == 0.0));
  }

  #[test]
  fn test_edit_candidates_limits() {
    let vocab = vocabulary(&["dort", "dors", "dormir", "porte", "xyz"]);
    let config = Config::default();
    let corrector = Corrector::with_vocabulary(&vocab, &NoEmbeddings, &config);

    let found = corrector
      .edit_candidates("dorts")
      .into_iter()
      .map(|(w, d)| (w.to_string(), d))
      .collect::<Vec<_>>();
    // dormir passes both cheap filters but is 3 edits away
    assert_eq!(
      found,
      vec![
        ("dors".to_string(), 1),
        ("dort".to_string(), 1),
        ("porte".to_string(), 2),
      ]
    );
  }

  #[test]
  fn test_embedding_fallback_keeps_top_three() {
    let vocab = vocabulary(&["alpha", "beta", "delta", "gamma", "omega"]);
    let config = Config::default();
    let mut table = EmbeddingTable::new(2);
    table.insert("zzzzzzzzz", &[1.0, 0.0]);
    table.insert("alpha", &[1.0, 0.1]);
    table.insert("beta", &[0.0, 1.0]);
    table.insert("delta", &[-1.0, 0.0]);
    table.insert("gamma", &[1.0, 1.0]);
    table.insert("omega", &[0.5, 0.0]);
    let corrector = Corrector::with_vocabulary(&vocab, &table, &config);

    let (level, hyps) = corrector.correct_explained("zzzzzzzzz");
    assert_eq!(level, Correction::Embedding);
    // beta is orthogonal and gamma at 45 degrees; delta counts as close because it is opposite
    assert_eq!(tokens(&hyps), vec!["alpha", "delta", "omega"]);
  }

  #[test]
  fn test_unknown_word() {
    let vocab = vocabulary(&["chat", "dort"]);
    let config = Config::default();
    let mut table = EmbeddingTable::new(2);
    table.insert("chat", &[1.0, 0.0]);
    let corrector = Corrector::with_vocabulary(&vocab, &table, &config);

    let (level, hyps) = corrector.correct_explained("anticonstitutionnellement");
    assert_eq!(level, Correction::Unknown);
    assert_eq!(hyps, vec![Hypothesis::certain("<UNK>".into())]);
  }
}
