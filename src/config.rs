use crate::rules::Symbol;

/// Label of the root of every training tree, and the symbol a full parse must reach
pub const START_SYMBOL: &str = "SENT";
/// Token every POS tag may emit, and the last-resort correction of an unknown word
pub const UNKNOWN_TOKEN: &str = "<UNK>";
/// Prefix of the nonterminals TERM inserts above lexical children
pub const TERM_PREFIX: &str = "_";
/// Joins the labels of the children grouped together by BIN
pub const BIN_SEPARATOR: &str = "&";
/// Starts the functional part of a treebank label: PP-MOD is read as PP
pub const FUNCTION_DELIMITER: char = '-';

/// The small set of constants shared between the normalizer, the estimator,
/// the corrector and the treebank reader.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
  pub start_symbol: Symbol,
  pub unknown_token: Symbol,
  pub term_prefix: String,
  pub bin_separator: String,
  pub function_delimiter: char,
  /// Vocabulary words strictly closer than this (optimal string alignment distance) are corrections
  pub edit_distance_limit: usize,
  /// Cheap pre-filter: skip words whose length differs by more than this
  pub max_length_difference: usize,
  /// Cheap pre-filter: skip words whose character sets differ in more than this many characters
  pub max_charset_difference: usize,
  /// How many embedding neighbours to keep when edit distance finds nothing
  pub nearest_neighbors: usize,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      start_symbol: Symbol::new(START_SYMBOL),
      unknown_token: Symbol::new(UNKNOWN_TOKEN),
      term_prefix: TERM_PREFIX.to_string(),
      bin_separator: BIN_SEPARATOR.to_string(),
      function_delimiter: FUNCTION_DELIMITER,
      edit_distance_limit: 3,
      max_length_difference: 2,
      max_charset_difference: 4,
      nearest_neighbors: 3,
    }
  }
}

impl Config {
  pub fn new() -> Self {
    Default::default()
  }

  pub fn with_start_symbol(mut self, start: &str) -> Self {
    self.start_symbol = Symbol::new(start);
    self
  }
}
