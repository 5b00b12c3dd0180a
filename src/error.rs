use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures while gathering what a parser needs before it can run: the
/// training corpus and the embedding vectors.
#[derive(Debug, Error)]
pub enum LoadError {
  #[error("couldn't read corpus {path}: {source}")]
  Corpus {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
  #[error("corpus line {line}: {message}")]
  Treebank { line: usize, message: String },
  #[error("corpus has no trees, refusing to estimate an empty grammar")]
  EmptyCorpus,
  #[error("couldn't read embeddings {path}: {source}")]
  Embeddings {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
  #[error("embeddings line {line}: {message}")]
  EmbeddingFormat { line: usize, message: String },
  #[error("embeddings line {line}: expected {expected} dimensions, found {found}")]
  Dimension {
    line: usize,
    expected: usize,
    found: usize,
  },
}
