use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use crate::oov::Hypothesis;
use crate::pcfg::Pcfg;
use crate::rules::Symbol;
use crate::syntree::{NodeIdx, Tree};

/// How a span is split between two cells is searched for binary rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
  /// Per split point, whichever of the two below touches fewer combinations
  Adaptive,
  /// Walk every binary rule and look its children up in the two cells
  RuleDriven,
  /// Walk every pair of symbols from the two cells and look up their parents
  CellDriven,
}

/// The best reading of one position as one POS tag
#[derive(Debug, Clone, PartialEq)]
pub struct PosEntry {
  pub pos: Symbol,
  pub token: Symbol,
  pub log_prob: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Backpointer {
  /// `NT -> POS`, with the POS entry's index in the POS row at this position
  Unary { pos: usize },
  /// `NT -> left right`, with the left part covering `split` tokens
  Binary {
    split: usize,
    left: Symbol,
    right: Symbol,
  },
}

impl Backpointer {
  /// Tie-break between derivations of equal probability: lowest POS entry,
  /// or lowest (split, left, right)
  fn precedes(&self, other: &Backpointer) -> bool {
    match (self, other) {
      (Self::Unary { pos: a }, Self::Unary { pos: b }) => a < b,
      (
        Self::Binary {
          split: s1,
          left: l1,
          right: r1,
        },
        Self::Binary {
          split: s2,
          left: l2,
          right: r2,
        },
      ) => (s1, l1, r1) < (s2, l2, r2),
      _ => false,
    }
  }
}

/// Best derivation of one symbol over one span
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
  pub log_prob: f64,
  pub back: Backpointer,
}

pub type Cell = BTreeMap<Symbol, Entry>;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ChartStats {
  pub cells: usize,
  pub entries: usize,
  pub rule_driven_splits: usize,
  pub cell_driven_splits: usize,
}

/// Keeps `candidate` for `lhs` if it beats what the cell already has
fn offer(cell: &mut Cell, lhs: &Symbol, candidate: Entry) {
  match cell.get_mut(lhs) {
    Some(current) => {
      if candidate.log_prob > current.log_prob
        || (candidate.log_prob == current.log_prob && candidate.back.precedes(&current.back))
      {
        *current = candidate;
      }
    }
    None => {
      cell.insert(lhs.clone(), candidate);
    }
  }
}

/// For every POS tag, the hypothesis it emits best, if it emits any
fn pos_entries(pcfg: &Pcfg, hypotheses: &[Hypothesis]) -> Vec<PosEntry> {
  let mut row = Vec::new();
  for pos in pcfg.pos_tags() {
    let mut best: Option<PosEntry> = None;
    for hyp in hypotheses {
      if let Some(emission) = pcfg.lexicon_log_prob(pos.as_str(), hyp.token.as_str()) {
        let log_prob = hyp.log_prob + emission;
        if best.as_ref().is_none_or(|b| log_prob > b.log_prob) {
          best = Some(PosEntry {
            pos: pos.clone(),
            token: hyp.token.clone(),
            log_prob,
          });
        }
      }
    }
    row.extend(best);
  }
  row
}

/// Chart over a sentence of n tokens. Cell (start, len) holds, for every
/// symbol deriving tokens start..start+len, its best derivation.
#[derive(Debug)]
pub struct Chart {
  n: usize,
  pos_row: Vec<Vec<PosEntry>>,
  /// cells[start][len - 1]
  cells: Vec<Vec<Cell>>,
  stats: ChartStats,
}

impl Chart {
  /// Number of tokens
  pub fn len(&self) -> usize {
    self.n
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn cell(&self, start: usize, len: usize) -> Option<&Cell> {
    if len == 0 {
      return None;
    }
    self.cells.get(start).and_then(|row| row.get(len - 1))
  }

  pub fn cell_count(&self) -> usize {
    self.cells.iter().map(Vec::len).sum()
  }

  pub fn pos_entries(&self, position: usize) -> &[PosEntry] {
    &self.pos_row[position]
  }

  pub fn stats(&self) -> ChartStats {
    self.stats
  }

  fn unary_cell(&self, pcfg: &Pcfg, start: usize) -> Cell {
    let mut cell = Cell::new();
    for (idx, entry) in self.pos_row[start].iter().enumerate() {
      for &id in pcfg.pos_parents(entry.pos.as_str()) {
        let candidate = Entry {
          log_prob: entry.log_prob + pcfg.rule_log_prob(id),
          back: Backpointer::Unary { pos: idx },
        };
        offer(&mut cell, pcfg.rule(id).lhs(), candidate);
      }
    }
    cell
  }

  fn binary_cell(&mut self, pcfg: &Pcfg, strategy: Strategy, start: usize, len: usize) -> Cell {
    let mut cell = Cell::new();

    for split in 1..len {
      let left = &self.cells[start][split - 1];
      let right = &self.cells[start + split][len - split - 1];
      if left.is_empty() || right.is_empty() {
        continue;
      }

      let rule_driven = match strategy {
        Strategy::Adaptive => left.len() * right.len() > pcfg.grammar_rules().len(),
        Strategy::RuleDriven => true,
        Strategy::CellDriven => false,
      };

      if rule_driven {
        self.stats.rule_driven_splits += 1;
        for &id in pcfg.binary_rules() {
          let rule = pcfg.rule(id);
          let Some(l) = left.get(rule.left()) else {
            continue;
          };
          let Some(r) = rule.right().and_then(|c| right.get(c)) else {
            continue;
          };
          let candidate = Entry {
            log_prob: l.log_prob + r.log_prob + pcfg.rule_log_prob(id),
            back: Backpointer::Binary {
              split,
              left: rule.left().clone(),
              right: rule.rhs()[1].clone(),
            },
          };
          offer(&mut cell, rule.lhs(), candidate);
        }
      } else {
        self.stats.cell_driven_splits += 1;
        for (b, l) in left.iter() {
          for (c, r) in right.iter() {
            for id in pcfg.possible_parents(b.as_str(), c.as_str()) {
              let candidate = Entry {
                log_prob: l.log_prob + r.log_prob + pcfg.rule_log_prob(id),
                back: Backpointer::Binary {
                  split,
                  left: b.clone(),
                  right: c.clone(),
                },
              };
              offer(&mut cell, pcfg.rule(id).lhs(), candidate);
            }
          }
        }
      }
    }

    cell
  }

  /// The best tree for `symbol` over (start, len), with its log probability
  pub fn derivation(&self, start: usize, len: usize, symbol: &str) -> Option<(Tree, f64)> {
    let (symbol, entry) = self.cell(start, len)?.get_key_value(symbol)?;

    let mut tree = Tree::new(symbol.clone());
    let mut stack: Vec<(NodeIdx, usize, usize, &Symbol)> = vec![(tree.root(), start, len, symbol)];
    while let Some((idx, start, len, symbol)) = stack.pop() {
      match &self.cells[start][len - 1][symbol].back {
        Backpointer::Unary { pos } => {
          let reading = &self.pos_row[start][*pos];
          let pos_idx = tree.add_child(idx, reading.pos.clone());
          tree.add_child(pos_idx, reading.token.clone());
        }
        Backpointer::Binary { split, left, right } => {
          let left_idx = tree.add_child(idx, left.clone());
          let right_idx = tree.add_child(idx, right.clone());
          stack.push((left_idx, start, *split, left));
          stack.push((right_idx, start + split, len - split, right));
        }
      }
    }

    Some((tree, entry.log_prob))
  }

  /// The best tree for `symbol` over the whole sentence
  pub fn best(&self, symbol: &str) -> Option<(Tree, f64)> {
    self.derivation(0, self.n, symbol)
  }
}

impl fmt::Display for Chart {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for len in 1..=self.n {
      for start in 0..=(self.n - len) {
        writeln!(f, "{}..{}:", start, start + len)?;
        for (symbol, entry) in self.cells[start][len - 1].iter() {
          writeln!(f, "  {} {:.4}", symbol, entry.log_prob)?;
        }
      }
    }
    Ok(())
  }
}

/// Fills a chart for one sentence, given the candidate tokens of each position.
pub fn parse_chart(pcfg: &Pcfg, hypotheses: &[Vec<Hypothesis>]) -> Chart {
  parse_chart_with(pcfg, hypotheses, Strategy::Adaptive)
}

pub fn parse_chart_with(pcfg: &Pcfg, hypotheses: &[Vec<Hypothesis>], strategy: Strategy) -> Chart {
  let n = hypotheses.len();
  let mut chart = Chart {
    n,
    pos_row: hypotheses.iter().map(|h| pos_entries(pcfg, h)).collect(),
    cells: (0..n).map(|start| Vec::with_capacity(n - start)).collect(),
    stats: ChartStats::default(),
  };

  // shorter spans first: a cell only reads cells strictly shorter than itself
  for len in 1..=n {
    for start in 0..=(n - len) {
      let cell = if len == 1 {
        chart.unary_cell(pcfg, start)
      } else {
        chart.binary_cell(pcfg, strategy, start, len)
      };
      debug_assert_eq!(chart.cells[start].len(), len - 1);
      chart.stats.cells += 1;
      chart.stats.entries += cell.len();
      chart.cells[start].push(cell);
    }
  }

  debug!(
    tokens = n,
    cells = chart.stats.cells,
    entries = chart.stats.entries,
    rule_driven = chart.stats.rule_driven_splits,
    cell_driven = chart.stats.cell_driven_splits,
    "filled chart"
  );
  chart
}
