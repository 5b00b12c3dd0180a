use std::collections::{BTreeSet, HashSet};
use std::fmt;

use crate::rules::{Rule, Symbol};

/// Index type for the node arena of a [`Tree`]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIdx(pub u32);

#[derive(Debug, Clone)]
struct Node {
  value: Symbol,
  children: Vec<NodeIdx>,
  /// back-reference only, the parent's children list owns this node
  parent: Option<NodeIdx>,
}

/// A parse tree stored as an arena of nodes. Children are the only owning
/// edges; parent links exist so rewrites can walk upwards.
///
/// A node without children is a *terminal* (a token). A node whose only child
/// is a terminal is a *preterminal* (a POS tag). Everything else is an internal
/// nonterminal.
///
/// Rewrites may leave detached nodes in the arena, [`Tree::compact`] drops them.
#[derive(Debug, Clone)]
pub struct Tree {
  nodes: Vec<Node>,
  root: NodeIdx,
}

/// The three symbol classes found in a tree
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TreeSymbols {
  pub nonterminals: BTreeSet<Symbol>,
  pub pos_tags: BTreeSet<Symbol>,
  pub vocabulary: BTreeSet<Symbol>,
}

impl Tree {
  /// A single-node tree
  pub fn new(value: impl Into<Symbol>) -> Self {
    Self {
      nodes: vec![Node {
        value: value.into(),
        children: Vec::new(),
        parent: None,
      }],
      root: NodeIdx(0),
    }
  }

  pub fn root(&self) -> NodeIdx {
    self.root
  }

  pub fn value(&self, idx: NodeIdx) -> &Symbol {
    &self.node(idx).value
  }

  pub fn children(&self, idx: NodeIdx) -> &[NodeIdx] {
    &self.node(idx).children
  }

  pub fn parent(&self, idx: NodeIdx) -> Option<NodeIdx> {
    self.node(idx).parent
  }

  pub fn is_root(&self, idx: NodeIdx) -> bool {
    self.parent(idx).is_none()
  }

  pub fn is_terminal(&self, idx: NodeIdx) -> bool {
    self.children(idx).is_empty()
  }

  pub fn is_preterminal(&self, idx: NodeIdx) -> bool {
    let children = self.children(idx);
    children.len() == 1 && self.is_terminal(children[0])
  }

  pub fn is_internal(&self, idx: NodeIdx) -> bool {
    !self.is_terminal(idx) && !self.is_preterminal(idx)
  }

  /// Appends a new node with `value` as the last child of `parent`
  pub fn add_child(&mut self, parent: NodeIdx, value: impl Into<Symbol>) -> NodeIdx {
    let idx = self.alloc(value.into());
    self.nodes[idx.0 as usize].parent = Some(parent);
    self.nodes[parent.0 as usize].children.push(idx);
    idx
  }

  /// Copies the whole of `other` below `parent`, returning the index of the copied root
  pub fn graft(&mut self, parent: NodeIdx, other: &Tree) -> NodeIdx {
    let top = self.add_child(parent, other.value(other.root).clone());
    let mut stack = vec![(other.root, top)];
    while let Some((from, to)) = stack.pop() {
      for &child in other.children(from) {
        let copied = self.add_child(to, other.value(child).clone());
        stack.push((child, copied));
      }
    }
    top
  }

  /// Allocates a detached node, to be hooked in with [`Tree::set_children`]
  pub(crate) fn alloc(&mut self, value: Symbol) -> NodeIdx {
    let idx = NodeIdx(self.nodes.len() as u32);
    self.nodes.push(Node {
      value,
      children: Vec::new(),
      parent: None,
    });
    idx
  }

  /// Replaces the children of `idx`, pointing each new child's parent link at `idx`
  pub(crate) fn set_children(&mut self, idx: NodeIdx, children: Vec<NodeIdx>) {
    for &child in children.iter() {
      self.nodes[child.0 as usize].parent = Some(idx);
    }
    self.nodes[idx.0 as usize].children = children;
  }

  fn node(&self, idx: NodeIdx) -> &Node {
    &self.nodes[idx.0 as usize]
  }

  /// All nodes reachable from the root, parents before children, children in order
  pub fn preorder(&self) -> Vec<NodeIdx> {
    let mut order = Vec::new();
    let mut stack = vec![self.root];
    while let Some(idx) = stack.pop() {
      order.push(idx);
      stack.extend(self.children(idx).iter().rev());
    }
    order
  }

  /// Number of nodes reachable from the root
  pub fn len(&self) -> usize {
    self.preorder().len()
  }

  /// A copy of the tree holding only the nodes reachable from the root
  pub fn compact(&self) -> Tree {
    let mut tree = Tree::new(self.value(self.root).clone());
    let root = tree.root;
    let mut stack = vec![(self.root, root)];
    while let Some((from, to)) = stack.pop() {
      for &child in self.children(from) {
        let copied = tree.add_child(to, self.value(child).clone());
        stack.push((child, copied));
      }
    }
    tree
  }

  /// The tokens of the sentence, left to right
  pub fn terminals(&self) -> Vec<&Symbol> {
    self
      .preorder()
      .into_iter()
      .filter(|&idx| self.is_terminal(idx))
      .map(|idx| self.value(idx))
      .collect()
  }

  /// (token, POS tag) for every preterminal, left to right
  pub fn token_pos_mapping(&self) -> Vec<(&Symbol, &Symbol)> {
    self
      .preorder()
      .into_iter()
      .filter(|&idx| self.is_preterminal(idx))
      .map(|idx| (self.value(self.children(idx)[0]), self.value(idx)))
      .collect()
  }

  pub fn symbols(&self) -> TreeSymbols {
    let mut symbols = TreeSymbols::default();
    for idx in self.preorder() {
      let value = self.value(idx).clone();
      if self.is_terminal(idx) {
        symbols.vocabulary.insert(value);
      } else if self.is_preterminal(idx) {
        symbols.pos_tags.insert(value);
      } else {
        symbols.nonterminals.insert(value);
      }
    }
    symbols
  }

  /// The distinct rules used in the tree, as (lexicon rules, grammar rules).
  /// Lexicon rules are POS -> token, grammar rules are everything else.
  ///
  /// Panics on a node with more than two children: normalize the tree first.
  pub fn rules(&self) -> (HashSet<Rule>, HashSet<Rule>) {
    let mut lexicon = HashSet::new();
    let mut grammar = HashSet::new();
    for idx in self.preorder() {
      if self.is_terminal(idx) {
        continue;
      }
      let rhs = self
        .children(idx)
        .iter()
        .map(|&c| self.value(c).clone())
        .collect::<Vec<_>>();
      let rule = Rule::new(self.value(idx).clone(), rhs);
      if self.children(idx).iter().all(|&c| self.is_terminal(c)) {
        lexicon.insert(rule);
      } else {
        grammar.insert(rule);
      }
    }
    (lexicon, grammar)
  }
}

/// Pending output while rendering: a node still to open, or a paren to close
enum Frame {
  Open { idx: NodeIdx, spaced: bool },
  Close,
}

/// Structural equality: same labels in the same shape, regardless of arena layout
impl PartialEq for Tree {
  fn eq(&self, other: &Self) -> bool {
    let mut stack = vec![(self.root, other.root)];
    while let Some((a, b)) = stack.pop() {
      if self.value(a) != other.value(b) || self.children(a).len() != other.children(b).len() {
        return false;
      }
      stack.extend(
        self
          .children(a)
          .iter()
          .copied()
          .zip(other.children(b).iter().copied()),
      );
    }
    true
  }
}

/// Bracketed form: `(SENT (NP (DET le) (NC chat)) (VN (V dort)))`
impl fmt::Display for Tree {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut stack = vec![Frame::Open {
      idx: self.root,
      spaced: false,
    }];
    while let Some(frame) = stack.pop() {
      match frame {
        Frame::Close => write!(f, ")")?,
        Frame::Open { idx, spaced } => {
          if spaced {
            write!(f, " ")?;
          }
          if self.is_terminal(idx) {
            write!(f, "{}", self.value(idx))?;
            continue;
          }
          write!(f, "({}", self.value(idx))?;
          stack.push(Frame::Close);
          stack.extend(
            self
              .children(idx)
              .iter()
              .rev()
              .map(|&idx| Frame::Open { idx, spaced: true }),
          );
        }
      }
    }
    Ok(())
  }
}

#[cfg(test)]
pub(crate) fn le_chat_dort() -> Tree {
  let mut t = Tree::new("SENT");
  let root = t.root();
  let np = t.add_child(root, "NP");
  let det = t.add_child(np, "DET");
  t.add_child(det, "le");
  let nc = t.add_child(np, "NC");
  t.add_child(nc, "chat");
  let vn = t.add_child(root, "VN");
  let v = t.add_child(vn, "V");
  t.add_child(v, "dort");
  t
}

#[test]
fn test_display_bracketed() {
  let t = le_chat_dort();
  assert_eq!(
    format!("{}", t),
    "(SENT (NP (DET le) (NC chat)) (VN (V dort)))"
  );
}

#[test]
fn test_display_deep_chain() {
  let depth = 100_000;
  let mut t = Tree::new("N");
  let mut idx = t.root();
  for _ in 1..depth {
    idx = t.add_child(idx, "N");
  }
  t.add_child(idx, "x");

  let shown = format!("{}", t);
  assert_eq!(shown.len(), 4 * depth + 1);
  assert!(shown.starts_with("(N (N (N "));
  assert!(shown.ends_with("(N x)))"));
  assert_eq!(format!("{}", Tree::new("x")), "x");
}

#[test]
fn test_node_classes() {
  let t = le_chat_dort();
  let root = t.root();
  let np = t.children(root)[0];
  let det = t.children(np)[0];
  let le = t.children(det)[0];

  assert!(t.is_internal(root) && t.is_root(root));
  assert!(t.is_internal(np));
  assert!(t.is_preterminal(det));
  assert!(t.is_terminal(le));
  assert_eq!(t.parent(le), Some(det));
  assert_eq!(t.parent(det), Some(np));
}

#[test]
fn test_terminals_and_mapping() {
  let t = le_chat_dort();
  let tokens = t.terminals().into_iter().map(Symbol::as_str).collect::<Vec<_>>();
  assert_eq!(tokens, vec!["le", "chat", "dort"]);

  let mapping = t
    .token_pos_mapping()
    .into_iter()
    .map(|(tok, pos)| (tok.as_str(), pos.as_str()))
    .collect::<Vec<_>>();
  assert_eq!(mapping, vec![("le", "DET"), ("chat", "NC"), ("dort", "V")]);
}

#[test]
fn test_symbols() {
  let symbols = le_chat_dort().symbols();
  let names = |set: &BTreeSet<Symbol>| set.iter().map(|s| s.to_string()).collect::<Vec<_>>();
  assert_eq!(names(&symbols.nonterminals), vec!["NP", "SENT", "VN"]);
  assert_eq!(names(&symbols.pos_tags), vec!["DET", "NC", "V"]);
  assert_eq!(names(&symbols.vocabulary), vec!["chat", "dort", "le"]);
}

#[test]
fn test_graft_and_compact_preserve_structure() {
  let original = le_chat_dort();
  let mut t = Tree::new("ROOT");
  let root = t.root();
  let copied = t.graft(root, &original);

  assert_eq!(t.parent(copied), Some(root));
  assert_eq!(
    format!("{}", t),
    "(ROOT (SENT (NP (DET le) (NC chat)) (VN (V dort))))"
  );
  assert_eq!(original.compact(), original);
  assert_eq!(original.len(), 9);
}

#[test]
fn test_rules_are_deduplicated() {
  let mut t = Tree::new("SENT");
  let root = t.root();
  for word in ["a", "a"] {
    let np = t.add_child(root, "NP");
    let n = t.add_child(np, "N");
    t.add_child(n, word);
  }
  let (lexicon, grammar) = t.rules();
  assert_eq!(lexicon.len(), 1);
  assert_eq!(grammar.len(), 2);
  assert!(grammar.contains(&Rule::binary("SENT".into(), "NP".into(), "NP".into())));
  assert!(grammar.contains(&Rule::unary("NP".into(), "N".into())));
}
