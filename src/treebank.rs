//! Simple recursive-descent reading of bracketed treebank lines

use regex::Regex;
use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::Err;
use crate::config::Config;
use crate::error::LoadError;
use crate::rules::{Symbol, SymbolTable};
use crate::syntree::{NodeIdx, Tree};

type Infallible<'a, T> = (T, &'a str);
type ParseResult<'a, T> = Result<(T, &'a str), Err>;

/// helper macro for initializing a regex with lazy_static!
macro_rules! regex_static {
  ($name:ident, $pattern:expr) => {
    lazy_static! {
      static ref $name: Regex = Regex::new($pattern).unwrap();
    }
  };
}

/// Try to consume a regex, returning None if it doesn't match
fn optional_re<'a>(re: &'static Regex, s: &'a str) -> Infallible<'a, Option<&'a str>> {
  if let Some(m) = re.find(s) {
    if m.start() > 0 {
      return (None, s);
    }
    let (_, rest) = s.split_at(m.end());
    (Some(m.as_str()), rest)
  } else {
    (None, s)
  }
}

/// Try to consume a regex, failing if it doesn't match
fn needed_re<'a>(re: &'static Regex, s: &'a str) -> ParseResult<'a, &'a str> {
  if let (Some(c), rest) = optional_re(re, s) {
    Ok((c, rest))
  } else {
    Err(format!("couldn't match {} at {}", re, s).into())
  }
}

/// Try to consume a char, returning None if it doesn't match
fn optional_char(c: char, s: &str) -> Infallible<'_, Option<char>> {
  match s.strip_prefix(c) {
    Some(rest) => (Some(c), rest),
    None => (None, s),
  }
}

/// Try to consume a char, failing if it doesn't match
fn needed_char(c: char, s: &str) -> ParseResult<'_, char> {
  if let (Some(c), rest) = optional_char(c, s) {
    Ok((c, rest))
  } else {
    Err(format!("couldn't match {} at {}", c, s).into())
  }
}

fn skip_whitespace(s: &str) -> &str {
  s.trim_start()
}

/// Anything up to the next paren or whitespace
fn parse_atom(s: &str) -> ParseResult<'_, &str> {
  regex_static!(ATOM, r"[^\s()]+");
  needed_re(&*ATOM, s)
}

/// Drops the functional part of a label: `PP-MOD` -> `PP`. A label starting
/// with the delimiter (`-NONE-`) is kept whole.
pub fn simplified_label(label: &str, delimiter: char) -> &str {
  match label.find(delimiter) {
    Some(idx) if idx > 0 => &label[..idx],
    _ => label,
  }
}

struct Reader<'t> {
  delimiter: char,
  symbols: &'t mut SymbolTable,
}

impl Reader<'_> {
  /// A nonterminal label, with the functional part stripped
  fn label<'a>(&mut self, s: &'a str) -> ParseResult<'a, Symbol> {
    let (raw, s) = parse_atom(s).map_err(|e| -> Err { format!("label: {}", e).into() })?;
    Ok((self.symbols.intern(simplified_label(raw, self.delimiter)), s))
  }

  /// A token, taken verbatim
  fn token<'a>(&mut self, s: &'a str) -> ParseResult<'a, Symbol> {
    let (raw, s) = parse_atom(s).map_err(|e| -> Err { format!("token: {}", e).into() })?;
    Ok((self.symbols.intern(raw), s))
  }

  /// `( LABEL`
  fn open<'a>(&mut self, s: &'a str) -> ParseResult<'a, Symbol> {
    let (_, s) = needed_char('(', s)?;
    let s = skip_whitespace(s);
    self.label(s)
  }

  /// Children of `idx` up to and including the closing paren
  fn children<'a>(&mut self, s: &'a str, tree: &mut Tree, idx: NodeIdx) -> ParseResult<'a, ()> {
    let mut rem = s;
    loop {
      rem = skip_whitespace(rem);
      if let (Some(_), s) = optional_char(')', rem) {
        rem = s;
        break;
      }
      if rem.is_empty() {
        return Err(format!("unclosed constituent {}", tree.value(idx)).into());
      }
      if rem.starts_with('(') {
        let (label, s) = self.open(rem)?;
        let child = tree.add_child(idx, label);
        rem = self.children(s, tree, child)?.1;
      } else {
        let (token, s) = self.token(rem)?;
        tree.add_child(idx, token);
        rem = s;
      }
    }

    let children = tree.children(idx);
    if children.is_empty() {
      return Err(format!("empty constituent {}", tree.value(idx)).into());
    }
    if children.len() > 1 {
      if let Some(&tok) = children.iter().find(|&&c| tree.is_terminal(c)) {
        return Err(
          format!(
            "token {} mixed with constituents under {}",
            tree.value(tok),
            tree.value(idx)
          )
          .into(),
        );
      }
    }
    Ok(((), rem))
  }

  /// `( (SENT ...) )`, or a bare `(SENT ...)`
  fn tree<'a>(&mut self, s: &'a str) -> ParseResult<'a, Tree> {
    let s = skip_whitespace(s);
    let (_, s) = needed_char('(', s)?;
    let s = skip_whitespace(s);

    let wrapped = s.starts_with('(');
    let (label, s) = if wrapped { self.open(s)? } else { self.label(s)? };
    let mut tree = Tree::new(label);
    let root = tree.root();
    let ((), mut s) = self.children(s, &mut tree, root)?;

    if wrapped {
      s = skip_whitespace(s);
      s = needed_char(')', s)?.1;
    }
    Ok((tree, s))
  }
}

/// Parses a single bracketed tree
pub fn parse_tree(s: &str, config: &Config) -> Result<Tree, Err> {
  let mut symbols = SymbolTable::new();
  parse_tree_interned(s, config.function_delimiter, &mut symbols)
}

fn parse_tree_interned(s: &str, delimiter: char, symbols: &mut SymbolTable) -> Result<Tree, Err> {
  let mut reader = Reader { delimiter, symbols };
  let (tree, rest) = reader.tree(s)?;
  let rest = skip_whitespace(rest);
  if !rest.is_empty() {
    return Err(format!("trailing input after tree: {}", rest).into());
  }
  Ok(tree)
}

/// Parses one tree per non-blank line. Labels are interned across the whole corpus.
pub fn read_treebank(text: &str, config: &Config) -> Result<Vec<Tree>, LoadError> {
  let mut symbols = SymbolTable::new();
  let mut trees = Vec::new();
  for (idx, line) in text.lines().enumerate() {
    let line = line.trim();
    if line.is_empty() {
      continue;
    }
    let tree = parse_tree_interned(line, config.function_delimiter, &mut symbols).map_err(|e| {
      LoadError::Treebank {
        line: idx + 1,
        message: e.to_string(),
      }
    })?;
    trees.push(tree);
  }
  debug!(symbols = symbols.len(), "interned treebank symbols");
  Ok(trees)
}

pub fn read_treebank_file(path: impl AsRef<Path>, config: &Config) -> Result<Vec<Tree>, LoadError> {
  let path = path.as_ref();
  let text = fs::read_to_string(path).map_err(|source| LoadError::Corpus {
    path: path.to_path_buf(),
    source,
  })?;
  let trees = read_treebank(&text, config)?;
  info!(path = %path.display(), trees = trees.len(), "read treebank");
  if trees.is_empty() {
    return Err(LoadError::EmptyCorpus);
  }
  Ok(trees)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_wrapped_and_bare() {
    let config = Config::default();
    let wrapped = parse_tree("( (SENT (NP (DET le) (NC chat)) (VN (V dort))) )", &config).unwrap();
    let bare = parse_tree("(SENT (NP (DET le) (NC chat)) (VN (V dort)))", &config).unwrap();

    assert_eq!(wrapped, bare);
    assert_eq!(
      format!("{}", wrapped),
      "(SENT (NP (DET le) (NC chat)) (VN (V dort)))"
    );
  }

  #[test]
  fn test_functional_labels_stripped() {
    let t = parse_tree(
      "( (SENT (NP-SUJ (DET le) (NC chat)) (VN (V dort)) (PP-MOD (P-OBJ à) (NP (NPP Jean-Pierre)))) )",
      &Config::default(),
    )
    .unwrap();
    // tokens keep their dashes
    assert_eq!(
      format!("{}", t),
      "(SENT (NP (DET le) (NC chat)) (VN (V dort)) (PP (P à) (NP (NPP Jean-Pierre))))"
    );
    assert_eq!(simplified_label("-NONE-", '-'), "-NONE-");
  }

  #[test]
  fn test_malformed_lines() {
    let config = Config::default();
    assert!(parse_tree("(SENT (NP (DET le)", &config).is_err());
    assert!(parse_tree("(SENT (NP))", &config).is_err());
    assert!(parse_tree("(SENT le (NP (NC chat)))", &config).is_err());
    assert!(parse_tree("(SENT (V dort)) (SENT (V dort))", &config).is_err());
    assert!(parse_tree("SENT", &config).is_err());
  }

  #[test]
  fn test_read_treebank_reports_line() {
    let text = "( (SENT (V dort)) )\n\n( (SENT (V mange) )\n";
    match read_treebank(text, &Config::default()) {
      Err(LoadError::Treebank { line, .. }) => assert_eq!(line, 3),
      other => panic!("expected a treebank error, got {:?}", other),
    }

    let trees = read_treebank("( (SENT (V dort)) )\n\n( (SENT (V mange)) )\n", &Config::default()).unwrap();
    assert_eq!(trees.len(), 2);
  }

  #[test]
  fn test_missing_file() {
    let err = read_treebank_file("/nonexistent/corpus.mrg", &Config::default()).unwrap_err();
    assert!(matches!(err, LoadError::Corpus { .. }));
  }
}
