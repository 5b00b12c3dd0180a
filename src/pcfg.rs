use std::collections::{BTreeSet, HashMap};
use std::fmt;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::LoadError;
use crate::normalize::Normalizer;
use crate::rules::{Rule, Symbol};
use crate::syntree::{Tree, TreeSymbols};
use crate::utils::intersect_sorted;

/// Position of a rule in [`Pcfg::grammar_rules`]
pub type RuleId = usize;

/// `lhs -> rhs key -> natural log probability`
pub type ProbTable = HashMap<Symbol, HashMap<String, f64>>;

/// A probabilistic grammar estimated from a treebank. Two rule categories are
/// kept apart: the lexicon (POS -> token) and the grammar (NT -> NT NT and
/// NT -> POS). Each has its own probability table, normalized per left-hand side.
///
/// Immutable once built; parses only borrow it.
#[derive(Debug, Clone)]
pub struct Pcfg {
  config: Config,
  lexicon_rules: Vec<Rule>,
  grammar_rules: Vec<Rule>,
  /// log probability of `grammar_rules[id]`
  grammar_scores: Vec<f64>,
  binary_rules: Vec<RuleId>,
  lexicon_probs: ProbTable,
  grammar_probs: ProbTable,
  vocabulary: BTreeSet<Symbol>,
  pos_tags: BTreeSet<Symbol>,
  nonterminals: BTreeSet<Symbol>,
  left_child: HashMap<Symbol, Vec<RuleId>>,
  right_child: HashMap<Symbol, Vec<RuleId>>,
  pos_parents: HashMap<Symbol, Vec<RuleId>>,
}

/// Turns counts into per-lhs log probabilities. Totals are integer sums, so the
/// result doesn't depend on the order rules were counted in.
fn log_probabilities(counts: &HashMap<Rule, u64>) -> ProbTable {
  let mut totals: HashMap<&Symbol, u64> = HashMap::new();
  for (rule, &count) in counts.iter() {
    *totals.entry(rule.lhs()).or_insert(0) += count;
  }

  let mut table = ProbTable::new();
  for (rule, &count) in counts.iter() {
    let total = totals[rule.lhs()];
    table
      .entry(rule.lhs().clone())
      .or_default()
      .insert(rule.rhs_key().to_string(), (count as f64 / total as f64).ln());
  }
  table
}

fn index_push(index: &mut HashMap<Symbol, Vec<RuleId>>, key: &Symbol, id: RuleId) {
  index.entry(key.clone()).or_default().push(id);
}

impl Pcfg {
  /// Normalizes every tree, counts the rules of each (a rule counts once per
  /// tree it appears in), lets every POS tag emit the unknown token once, and
  /// turns the counts into log probabilities.
  pub fn estimate(trees: &[Tree], config: &Config) -> Result<Self, LoadError> {
    if trees.is_empty() {
      return Err(LoadError::EmptyCorpus);
    }

    let normalizer = Normalizer::from_config(config);
    let mut lexicon_counts: HashMap<Rule, u64> = HashMap::new();
    let mut grammar_counts: HashMap<Rule, u64> = HashMap::new();
    let mut symbols = TreeSymbols::default();

    for tree in trees {
      let cnf = normalizer.normalize(tree);
      let (lexicon, grammar) = cnf.rules();
      for rule in lexicon {
        *lexicon_counts.entry(rule).or_insert(0) += 1;
      }
      for rule in grammar {
        *grammar_counts.entry(rule).or_insert(0) += 1;
      }

      let found = cnf.symbols();
      symbols.nonterminals.extend(found.nonterminals);
      symbols.pos_tags.extend(found.pos_tags);
      symbols.vocabulary.extend(found.vocabulary);
    }

    for pos in symbols.pos_tags.iter() {
      lexicon_counts.insert(Rule::unary(pos.clone(), config.unknown_token.clone()), 1);
    }

    if !symbols.nonterminals.contains(&config.start_symbol) {
      warn!(start = %config.start_symbol, "start symbol never heads a training tree, nothing will parse");
    }

    let pcfg = Self::from_counts(&lexicon_counts, &grammar_counts, symbols, config.clone());
    info!(
      trees = trees.len(),
      lexicon_rules = pcfg.lexicon_rules.len(),
      grammar_rules = pcfg.grammar_rules.len(),
      vocabulary = pcfg.vocabulary.len(),
      pos_tags = pcfg.pos_tags.len(),
      nonterminals = pcfg.nonterminals.len(),
      "estimated pcfg"
    );
    Ok(pcfg)
  }

  /// Builds the grammar and its indices from rule counts.
  pub fn from_counts(
    lexicon_counts: &HashMap<Rule, u64>,
    grammar_counts: &HashMap<Rule, u64>,
    symbols: TreeSymbols,
    config: Config,
  ) -> Self {
    let lexicon_probs = log_probabilities(lexicon_counts);
    let grammar_probs = log_probabilities(grammar_counts);

    let mut lexicon_rules = lexicon_counts.keys().cloned().collect::<Vec<_>>();
    lexicon_rules.sort();
    let mut grammar_rules = grammar_counts.keys().cloned().collect::<Vec<_>>();
    grammar_rules.sort();

    let grammar_scores = grammar_rules
      .iter()
      .map(|r| grammar_probs[r.lhs()][r.rhs_key()])
      .collect::<Vec<_>>();

    // ids are pushed in ascending order, so every index list stays sorted
    let mut binary_rules = Vec::new();
    let mut left_child = HashMap::new();
    let mut right_child = HashMap::new();
    let mut pos_parents = HashMap::new();
    for (id, rule) in grammar_rules.iter().enumerate() {
      match rule.right() {
        Some(right) => {
          binary_rules.push(id);
          index_push(&mut left_child, rule.left(), id);
          index_push(&mut right_child, right, id);
        }
        None => index_push(&mut pos_parents, rule.left(), id),
      }
    }
    debug!(
      binary = binary_rules.len(),
      unary = grammar_rules.len() - binary_rules.len(),
      "indexed grammar rules"
    );

    let TreeSymbols {
      nonterminals,
      pos_tags,
      vocabulary,
    } = symbols;

    Self {
      config,
      lexicon_rules,
      grammar_rules,
      grammar_scores,
      binary_rules,
      lexicon_probs,
      grammar_probs,
      vocabulary,
      pos_tags,
      nonterminals,
      left_child,
      right_child,
      pos_parents,
    }
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  pub fn start_symbol(&self) -> &Symbol {
    &self.config.start_symbol
  }

  pub fn unknown_token(&self) -> &Symbol {
    &self.config.unknown_token
  }

  /// The normalizer the training trees went through, for simplifying parses
  pub fn normalizer(&self) -> Normalizer {
    Normalizer::from_config(&self.config)
  }

  pub fn vocabulary(&self) -> &BTreeSet<Symbol> {
    &self.vocabulary
  }

  pub fn pos_tags(&self) -> &BTreeSet<Symbol> {
    &self.pos_tags
  }

  pub fn nonterminals(&self) -> &BTreeSet<Symbol> {
    &self.nonterminals
  }

  pub fn lexicon_rules(&self) -> &[Rule] {
    &self.lexicon_rules
  }

  pub fn grammar_rules(&self) -> &[Rule] {
    &self.grammar_rules
  }

  pub fn binary_rules(&self) -> &[RuleId] {
    &self.binary_rules
  }

  pub fn lexicon_table(&self) -> &ProbTable {
    &self.lexicon_probs
  }

  pub fn grammar_table(&self) -> &ProbTable {
    &self.grammar_probs
  }

  pub fn rule(&self, id: RuleId) -> &Rule {
    &self.grammar_rules[id]
  }

  pub fn rule_log_prob(&self, id: RuleId) -> f64 {
    self.grammar_scores[id]
  }

  /// log P(pos -> token), or None if the lexicon has no such rule.
  ///
  /// Panics if `pos` isn't a POS tag of this grammar.
  pub fn lexicon_log_prob(&self, pos: &str, token: &str) -> Option<f64> {
    match self.lexicon_probs.get(pos) {
      Some(row) => row.get(token).copied(),
      None => panic!("lexicon lookup for unknown POS tag {}", pos),
    }
  }

  pub fn grammar_log_prob(&self, rule: &Rule) -> Option<f64> {
    self
      .grammar_probs
      .get(rule.lhs())
      .and_then(|row| row.get(rule.rhs_key()))
      .copied()
  }

  /// Unit rules `NT -> pos`
  pub fn pos_parents(&self, pos: &str) -> &[RuleId] {
    self.pos_parents.get(pos).map(Vec::as_slice).unwrap_or(&[])
  }

  /// Binary rules `NT -> symbol _`
  pub fn rules_with_left_child(&self, symbol: &str) -> &[RuleId] {
    self.left_child.get(symbol).map(Vec::as_slice).unwrap_or(&[])
  }

  /// Binary rules `NT -> _ symbol`
  pub fn rules_with_right_child(&self, symbol: &str) -> &[RuleId] {
    self.right_child.get(symbol).map(Vec::as_slice).unwrap_or(&[])
  }

  /// Binary rules `NT -> left right`, in ascending id order
  pub fn possible_parents(&self, left: &str, right: &str) -> Vec<RuleId> {
    intersect_sorted(
      self.rules_with_left_child(left),
      self.rules_with_right_child(right),
    )
  }
}

impl fmt::Display for Pcfg {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "//** start: {}", self.start_symbol())?;
    writeln!(
      f,
      "//** {} nonterminals, {} pos tags, {} words",
      self.nonterminals.len(),
      self.pos_tags.len(),
      self.vocabulary.len()
    )?;

    writeln!(f, "//** grammar")?;
    for (id, rule) in self.grammar_rules.iter().enumerate() {
      writeln!(f, "{}  {:.6}", rule, self.grammar_scores[id].exp())?;
    }

    writeln!(f, "//** lexicon")?;
    for rule in self.lexicon_rules.iter() {
      let p = self.lexicon_probs[rule.lhs()][rule.rhs_key()];
      writeln!(f, "{}  {:.6}", rule, p.exp())?;
    }

    Ok(())
  }
}

#[cfg(test)]
pub(crate) fn small_corpus() -> Vec<Tree> {
  use crate::treebank::read_treebank;

  read_treebank(
    r#"
      ( (SENT (NP (DET le) (NC chat)) (VN (V dort))) )
      ( (SENT (NP (DET le) (NC chien)) (VN (V mange))) )
      ( (SENT (NP (DET un) (NC chat)) (VN (V mange)) (NP (DET le) (NC poisson))) )
    "#,
    &Config::default(),
  )
  .unwrap()
}
