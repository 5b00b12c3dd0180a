use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::LoadError;

/// Nearest-neighbour oracle used when a token is neither known nor a likely typo.
pub trait Embeddings {
  /// The vector of `word`, if it has one. All vectors share one dimension.
  fn vector(&self, word: &str) -> Option<&[f32]>;
}

/// An oracle that knows no words
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEmbeddings;

impl Embeddings for NoEmbeddings {
  fn vector(&self, _word: &str) -> Option<&[f32]> {
    None
  }
}

/// Word vectors held in one flat buffer
#[derive(Debug, Default, Clone, PartialEq)]
pub struct EmbeddingTable {
  dimension: usize,
  index: HashMap<String, usize>,
  vectors: Vec<f32>,
}

impl EmbeddingTable {
  pub fn new(dimension: usize) -> Self {
    Self {
      dimension,
      ..Default::default()
    }
  }

  pub fn dimension(&self) -> usize {
    self.dimension
  }

  pub fn len(&self) -> usize {
    self.index.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Adds or replaces the vector of `word`. Panics if the dimension is wrong.
  pub fn insert(&mut self, word: &str, vector: &[f32]) {
    assert_eq!(
      vector.len(),
      self.dimension,
      "vector for {} has the wrong dimension",
      word
    );
    match self.index.get(word) {
      Some(&row) => {
        let start = row * self.dimension;
        self.vectors[start..start + self.dimension].copy_from_slice(vector);
      }
      None => {
        self.index.insert(word.to_string(), self.index.len());
        self.vectors.extend_from_slice(vector);
      }
    }
  }

  /// Reads the plain text format: one `word v1 v2 ... vd` per line. The first
  /// line fixes the dimension. A leading `count dimension` header line, as
  /// written by word2vec, is skipped when the line after it has that many values.
  pub fn from_text(text: &str) -> Result<Self, LoadError> {
    let lines = text
      .lines()
      .enumerate()
      .filter(|(_, line)| !line.trim().is_empty())
      .collect::<Vec<_>>();
    let skip = match lines.as_slice() {
      [(_, first), (_, second), ..] => is_header(first, second),
      _ => false,
    };

    let mut table: Option<EmbeddingTable> = None;
    for &(idx, line) in lines.iter().skip(usize::from(skip)) {
      let mut fields = line.split_whitespace();
      let Some(word) = fields.next() else {
        continue;
      };
      let values = fields
        .map(|v| v.parse::<f32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| LoadError::EmbeddingFormat {
          line: idx + 1,
          message: format!("{}: {}", word, e),
        })?;

      if values.is_empty() {
        return Err(LoadError::EmbeddingFormat {
          line: idx + 1,
          message: format!("no vector for {}", word),
        });
      }

      let current = table.get_or_insert_with(|| EmbeddingTable::new(values.len()));
      if values.len() != current.dimension {
        return Err(LoadError::Dimension {
          line: idx + 1,
          expected: current.dimension,
          found: values.len(),
        });
      }
      current.insert(word, &values);
    }

    table.ok_or_else(|| LoadError::EmbeddingFormat {
      line: text.lines().count(),
      message: "no vectors".to_string(),
    })
  }

  pub fn read_from_file(path: impl AsRef<Path>) -> Result<Self, LoadError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| LoadError::Embeddings {
      path: path.to_path_buf(),
      source,
    })?;
    let table = Self::from_text(&text)?;
    info!(path = %path.display(), words = table.len(), dimension = table.dimension, "read embeddings");
    Ok(table)
  }
}

/// `count dimension`, followed by a line with a word and `dimension` values
fn is_header(first: &str, second: &str) -> bool {
  let fields = first.split_whitespace().collect::<Vec<_>>();
  let [count, dimension] = fields.as_slice() else {
    return false;
  };
  count.parse::<usize>().is_ok()
    && dimension
      .parse::<usize>()
      .is_ok_and(|d| second.split_whitespace().count() == d + 1)
}

impl Embeddings for EmbeddingTable {
  fn vector(&self, word: &str) -> Option<&[f32]> {
    self.index.get(word).map(|&row| {
      let start = row * self.dimension;
      &self.vectors[start..start + self.dimension]
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_from_text() {
    let table = EmbeddingTable::from_text("chat 1 0 0.5\nchien 0.9 0.1 0.5\n\nmaison 0 1 0\n").unwrap();
    assert_eq!(table.len(), 3);
    assert_eq!(table.dimension(), 3);
    assert_eq!(table.vector("chien"), Some(&[0.9f32, 0.1, 0.5][..]));
    assert_eq!(table.vector("oiseau"), None);
  }

  #[test]
  fn test_word2vec_header_skipped() {
    let table = EmbeddingTable::from_text("2 2\nchat 1 0\nchien 0 1\n").unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(table.dimension(), 2);
  }

  #[test]
  fn test_numeric_first_word_is_not_a_header() {
    let table = EmbeddingTable::from_text("1 0.5\n2 0.25\n").unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(table.dimension(), 1);
    assert_eq!(table.vector("1"), Some(&[0.5f32][..]));

    // looks like a header, but the next line has one value, not three
    let table = EmbeddingTable::from_text("4 3\nchat 0.5\n").unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(table.vector("4"), Some(&[3.0f32][..]));
  }

  #[test]
  fn test_no_vectors() {
    for text in ["", "  \n\n\t\n"] {
      assert!(matches!(
        EmbeddingTable::from_text(text),
        Err(LoadError::EmbeddingFormat { .. })
      ));
    }
  }

  #[test]
  fn test_bad_lines() {
    assert!(matches!(
      EmbeddingTable::from_text("chat 1 0\nchien 1 0 0\n"),
      Err(LoadError::Dimension {
        line: 2,
        expected: 2,
        found: 3
      })
    ));
    assert!(matches!(
      EmbeddingTable::from_text("chat 1 zero\n"),
      Err(LoadError::EmbeddingFormat { line: 1, .. })
    ));
    assert!(matches!(
      EmbeddingTable::read_from_file("/nonexistent/vectors.txt"),
      Err(LoadError::Embeddings { .. })
    ));
  }

  #[test]
  fn test_insert_replaces() {
    let mut table = EmbeddingTable::new(2);
    table.insert("chat", &[1.0, 0.0]);
    table.insert("chat", &[0.0, 1.0]);
    assert_eq!(table.len(), 1);
    assert_eq!(table.vector("chat"), Some(&[0.0f32, 1.0][..]));
    assert!(NoEmbeddings.vector("chat").is_none());
  }
}
