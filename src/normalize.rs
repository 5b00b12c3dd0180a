//! Chomsky normal form for treebank trees.
//!
//! [`Normalizer::normalize`] rewrites a copy of a tree until every internal
//! node has exactly two nonterminal children, or a single preterminal child.
//! Three local rewrites are applied, in this order of precedence:
//!
//! - UNIT: a node whose only child is an internal nonterminal adopts that
//!   child's children. The child's label is gone for good.
//! - TERM: when a node has several children and some of them are lexical
//!   (preterminals or bare tokens), each lexical child gets a new parent
//!   labelled `_` + its label.
//! - BIN: a node with more than two children keeps its first child and moves
//!   the rest under a new node labelled with their labels joined by `&`.
//!
//! [`Normalizer::simplify`] undoes TERM and BIN for display. UNIT can't be
//! undone.

use tracing::trace;

use crate::config::Config;
use crate::rules::Symbol;
use crate::syntree::{NodeIdx, Tree};

#[derive(Debug, Clone, PartialEq)]
pub struct Normalizer {
  term_prefix: String,
  bin_separator: String,
}

impl Default for Normalizer {
  fn default() -> Self {
    Self::from_config(&Config::default())
  }
}

impl Normalizer {
  pub fn new(term_prefix: &str, bin_separator: &str) -> Self {
    Self {
      term_prefix: term_prefix.to_string(),
      bin_separator: bin_separator.to_string(),
    }
  }

  pub fn from_config(config: &Config) -> Self {
    Self::new(&config.term_prefix, &config.bin_separator)
  }

  /// Whether `label` was made up by TERM or BIN
  pub fn is_synthetic(&self, label: &str) -> bool {
    label.starts_with(&self.term_prefix) || label.contains(&self.bin_separator)
  }

  fn is_lexical(tree: &Tree, idx: NodeIdx) -> bool {
    tree.is_terminal(idx) || tree.is_preterminal(idx)
  }

  /// Returns a CNF copy of `tree`; the input is left alone.
  pub fn normalize(&self, tree: &Tree) -> Tree {
    let mut work = tree.compact();

    // chains of unit rules can be arbitrarily long, so this is a worklist
    // rather than a recursion: a node is pushed back whenever it was rewritten
    let mut stack = vec![work.root()];
    while let Some(idx) = stack.pop() {
      if Self::is_lexical(&work, idx) {
        continue;
      }

      let children = work.children(idx).to_vec();

      if children.len() == 1 {
        let child = children[0];
        if work.is_preterminal(child) {
          continue;
        }
        // UNIT
        trace!(parent = %work.value(idx), collapsed = %work.value(child), "unit");
        let grandchildren = work.children(child).to_vec();
        work.set_children(idx, grandchildren);
        stack.push(idx);
        continue;
      }

      if children.iter().any(|&c| Self::is_lexical(&work, c)) {
        // TERM
        let shielded = children
          .into_iter()
          .map(|c| {
            if Self::is_lexical(&work, c) {
              let label = format!("{}{}", self.term_prefix, work.value(c));
              let wrapper = work.alloc(Symbol::from(label));
              work.set_children(wrapper, vec![c]);
              wrapper
            } else {
              c
            }
          })
          .collect::<Vec<_>>();
        work.set_children(idx, shielded);
        stack.push(idx);
        continue;
      }

      if children.len() == 2 {
        stack.extend(children);
        continue;
      }

      // BIN
      let rest = children[1..].to_vec();
      let label = rest
        .iter()
        .map(|&c| work.value(c).as_str())
        .collect::<Vec<_>>()
        .join(&self.bin_separator);
      let group = work.alloc(Symbol::from(label));
      work.set_children(group, rest);
      work.set_children(idx, vec![children[0], group]);
      stack.push(idx);
    }

    work.compact()
  }

  /// Splices the children of every TERM/BIN node into its parent, in place.
  pub fn simplify(&self, tree: &mut Tree) {
    let mut stack = vec![tree.root()];
    while let Some(idx) = stack.pop() {
      if tree.is_terminal(idx) {
        continue;
      }

      let mut collapsed = false;
      let mut children = Vec::with_capacity(tree.children(idx).len());
      for &child in tree.children(idx) {
        if !tree.is_terminal(child) && self.is_synthetic(tree.value(child).as_str()) {
          children.extend_from_slice(tree.children(child));
          collapsed = true;
        } else {
          children.push(child);
        }
      }
      tree.set_children(idx, children);

      if collapsed {
        // spliced-in children may be synthetic themselves
        stack.push(idx);
      } else {
        stack.extend_from_slice(tree.children(idx));
      }
    }
    *tree = tree.compact();
  }

  pub fn simplified(&self, tree: &Tree) -> Tree {
    let mut tree = tree.clone();
    self.simplify(&mut tree);
    tree
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::syntree::le_chat_dort;
  use crate::treebank::parse_tree;

  fn tree(s: &str) -> Tree {
    parse_tree(s, &Config::default()).unwrap()
  }

  /// every internal node has two internal children, or one preterminal child
  fn assert_cnf(t: &Tree) {
    for idx in t.preorder() {
      if !t.is_internal(idx) {
        continue;
      }
      let children = t.children(idx);
      match children.len() {
        1 => assert!(t.is_preterminal(children[0]), "unit over {} in {}", t.value(idx), t),
        2 => assert!(
          children.iter().all(|&c| t.is_internal(c)),
          "lexical child under {} in {}",
          t.value(idx),
          t
        ),
        n => panic!("{} children under {} in {}", n, t.value(idx), t),
      }
    }
  }

  #[test]
  fn test_term() {
    let n = Normalizer::default();
    let t = n.normalize(&le_chat_dort());
    assert_eq!(
      format!("{}", t),
      "(SENT (NP (_DET (DET le)) (_NC (NC chat))) (VN (V dort)))"
    );
    assert_cnf(&t);
  }

  #[test]
  fn test_bin() {
    let n = Normalizer::default();
    let t = n.normalize(&tree("(SENT (NP (DET le) (NC chat)) (VN (V dort)) (PP (P sur) (NP (DET le) (NC lit))) (PONCT .))"));
    assert_eq!(
      format!("{}", t),
      "(SENT (NP (_DET (DET le)) (_NC (NC chat))) (VN&PP&_PONCT (VN (V dort)) (PP&_PONCT (PP (_P (P sur)) (NP (_DET (DET le)) (_NC (NC lit)))) (_PONCT (PONCT .)))))"
    );
    assert_cnf(&t);
  }

  #[test]
  fn test_unit_collapses_chains() {
    let n = Normalizer::default();
    let t = n.normalize(&tree("(SENT (VN (VP (V dort))))"));
    assert_eq!(format!("{}", t), "(SENT (V dort))");

    let t = n.normalize(&tree("(SENT (NP (NP (NP (DET le) (NC chat)))) (VN (V dort)))"));
    assert_eq!(
      format!("{}", t),
      "(SENT (NP (_DET (DET le)) (_NC (NC chat))) (VN (V dort)))"
    );
  }

  #[test]
  fn test_input_untouched() {
    let n = Normalizer::default();
    let original = le_chat_dort();
    let before = format!("{}", original);
    n.normalize(&original);
    assert_eq!(format!("{}", original), before);
  }

  #[test]
  fn test_idempotent() {
    let n = Normalizer::default();
    for s in [
      "(SENT (NP (DET le) (NC chat)) (VN (V dort)))",
      "(SENT (VN (VP (V dort))))",
      "(SENT (NP (DET un) (ADJ petit) (NC chat) (AP (ADJ noir))) (VN (V dort) (ADV bien)) (PONCT .))",
    ] {
      let once = n.normalize(&tree(s));
      let twice = n.normalize(&once);
      assert_eq!(once, twice, "normalizing twice changed {}", s);
      assert_cnf(&once);
    }
  }

  #[test]
  fn test_simplify_round_trip() {
    let n = Normalizer::default();
    for s in [
      "(SENT (NP (DET le) (NC chat)) (VN (V dort)))",
      "(SENT (NP (DET un) (ADJ petit) (NC chat) (ADJ noir)) (VN (V dort) (ADV bien)) (PONCT .))",
      "(SENT (PP (P à) (NP (NPP Paris))) (PONCT ,) (NP (DET les) (NC chats)) (VN (V dorment)))",
    ] {
      let original = tree(s);
      let restored = n.simplified(&n.normalize(&original));
      assert_eq!(format!("{}", restored), format!("{}", original));
    }
  }

  #[test]
  fn test_simplify_cannot_restore_unit() {
    let n = Normalizer::default();
    let original = tree("(SENT (VN (VP (V dort))))");
    let restored = n.simplified(&n.normalize(&original));
    assert_eq!(format!("{}", restored), "(SENT (V dort))");
  }

  #[test]
  fn test_simplify_keeps_tokens() {
    let n = Normalizer::default();
    let mut t = Tree::new("SENT");
    let root = t.root();
    let np = t.add_child(root, "_PONCT");
    let p = t.add_child(np, "PONCT");
    t.add_child(p, "_");
    n.simplify(&mut t);
    assert_eq!(format!("{}", t), "(SENT (PONCT _))");
  }
}
