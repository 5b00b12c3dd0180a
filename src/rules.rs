use std::borrow::Borrow;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A nonterminal, POS tag or token. Cloning is cheap, equality and hashing
/// go through the string value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(Arc<str>);

impl Symbol {
  pub fn new(name: &str) -> Self {
    Self(Arc::from(name))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for Symbol {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl Borrow<str> for Symbol {
  fn borrow(&self) -> &str {
    &self.0
  }
}

impl AsRef<str> for Symbol {
  fn as_ref(&self) -> &str {
    &self.0
  }
}

impl From<&str> for Symbol {
  fn from(s: &str) -> Self {
    Self::new(s)
  }
}

impl From<String> for Symbol {
  fn from(s: String) -> Self {
    Self(Arc::from(s))
  }
}

/// Hands out one shared allocation per distinct string, so a corpus with
/// thousands of `NP` labels only stores the text once.
#[derive(Debug, Default, Clone)]
pub struct SymbolTable {
  symbols: HashSet<Symbol>,
}

impl SymbolTable {
  pub fn new() -> Self {
    Default::default()
  }

  pub fn intern(&mut self, name: &str) -> Symbol {
    if let Some(sym) = self.symbols.get(name) {
      return sym.clone();
    }
    let sym = Symbol::new(name);
    self.symbols.insert(sym.clone());
    sym
  }

  pub fn len(&self) -> usize {
    self.symbols.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

/// A production `lhs -> rhs`. The right-hand side holds one symbol (a lexicon
/// rule POS -> token, or a unit rule NT -> POS) or two (a binary rule).
#[derive(Debug, Clone)]
pub struct Rule {
  lhs: Symbol,
  rhs: Vec<Symbol>,
  /// space-joined rhs, used as the column key of the probability tables
  key: String,
}

impl Rule {
  /// Panics if the right-hand side doesn't have exactly one or two symbols:
  /// only normalized trees produce rules, so anything else is a normalizer bug.
  pub fn new(lhs: Symbol, rhs: Vec<Symbol>) -> Self {
    assert!(
      rhs.len() == 1 || rhs.len() == 2,
      "rule {} has {} right-hand side symbols, expected 1 or 2",
      lhs,
      rhs.len()
    );
    let key = rhs
      .iter()
      .map(Symbol::as_str)
      .collect::<Vec<_>>()
      .join(" ");
    Self { lhs, rhs, key }
  }

  pub fn unary(lhs: Symbol, child: Symbol) -> Self {
    Self::new(lhs, vec![child])
  }

  pub fn binary(lhs: Symbol, left: Symbol, right: Symbol) -> Self {
    Self::new(lhs, vec![left, right])
  }

  pub fn lhs(&self) -> &Symbol {
    &self.lhs
  }

  pub fn rhs(&self) -> &[Symbol] {
    &self.rhs
  }

  pub fn rhs_key(&self) -> &str {
    &self.key
  }

  pub fn len(&self) -> usize {
    self.rhs.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn is_binary(&self) -> bool {
    self.len() == 2
  }

  pub fn left(&self) -> &Symbol {
    &self.rhs[0]
  }

  pub fn right(&self) -> Option<&Symbol> {
    self.rhs.get(1)
  }
}

impl PartialEq for Rule {
  fn eq(&self, other: &Self) -> bool {
    self.lhs == other.lhs && self.rhs == other.rhs
  }
}

impl Eq for Rule {}

impl Hash for Rule {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.lhs.hash(state);
    self.rhs.hash(state);
  }
}

impl PartialOrd for Rule {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for Rule {
  fn cmp(&self, other: &Self) -> Ordering {
    (&self.lhs, &self.rhs).cmp(&(&other.lhs, &other.rhs))
  }
}

impl fmt::Display for Rule {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} ->", self.lhs)?;
    for s in self.rhs.iter() {
      write!(f, " {}", s)?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_rule_key_and_equality() {
    let a = Rule::binary("NP".into(), "_DET".into(), "_NC".into());
    let b = Rule::new("NP".into(), vec!["_DET".into(), "_NC".into()]);

    assert_eq!(a.rhs_key(), "_DET _NC");
    assert_eq!(a, b);
    assert_eq!(format!("{}", a), "NP -> _DET _NC");

    let set = vec![a, b].into_iter().collect::<HashSet<_>>();
    assert_eq!(set.len(), 1);
  }

  #[test]
  #[should_panic]
  fn test_ternary_rule_is_fatal() {
    Rule::new("S".into(), vec!["A".into(), "B".into(), "C".into()]);
  }

  #[test]
  fn test_interning_shares_allocations() {
    let mut table = SymbolTable::new();
    let a = table.intern("NP");
    let b = table.intern("NP");
    assert!(Arc::ptr_eq(&a.0, &b.0));
    assert_eq!(table.len(), 1);
  }
}
