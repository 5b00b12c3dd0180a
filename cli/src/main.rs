use std::env;
use std::io;
use std::io::Write;
use std::process;

use tracing_subscriber::EnvFilter;

use pcfg_cyk::eval::{evaluate, split_corpus};
use pcfg_cyk::treebank::read_treebank_file;
use pcfg_cyk::{Config, EmbeddingTable, Embeddings, Err, NoEmbeddings, Pcfg};

fn usage(prog_name: &str) -> String {
  format!(
    r"Usage: {} CORPUS [options]

Reads one bracketed tree per line from CORPUS, estimates a grammar from it,
then parses whitespace-separated sentences from stdin.

Options:
  -h, --help             Print this message
  -e, --embeddings FILE  Word vectors for out-of-vocabulary tokens
  -s, --start SYMBOL     Start symbol (defaults to SENT)
  -c, --chart            Print the parse chart (defaults to not printing)
  -r, --raw              Print the normalized tree instead of the simplified one
  -g, --grammar          Print the estimated grammar and exit
      --eval             Train on the first 80% of CORPUS, evaluate on the last 10% and exit",
    prog_name
  )
}

fn parse(pcfg: &Pcfg, embeddings: &dyn Embeddings, sentence: &str, opts: &Args) {
  let tokens = sentence.split_whitespace().collect::<Vec<_>>();
  if tokens.is_empty() {
    return;
  }

  if opts.print_chart {
    println!("chart:\n{}\n", pcfg.parse_chart(&tokens, embeddings));
  }

  match pcfg.parse(&tokens, embeddings) {
    Some(parse) => {
      if opts.raw {
        println!("{}", parse.tree);
      } else {
        println!("{}", parse.simplified(pcfg));
      }
      println!("log probability: {:.4}\n", parse.log_prob);
    }
    None => println!("no parse found\n"),
  }
}

struct Args {
  corpus: String,
  embeddings: Option<String>,
  start: Option<String>,
  print_chart: bool,
  raw: bool,
  print_grammar: bool,
  eval: bool,
}

impl Args {
  fn make_error_message(msg: &str, prog_name: impl AsRef<str>) -> String {
    format!("argument error: {}.\n\n{}", msg, usage(prog_name.as_ref()))
  }

  fn parse(v: Vec<String>) -> Result<Self, String> {
    if v.is_empty() {
      return Err(Self::make_error_message("bad argument vector", "cli"));
    }

    let args_len = v.len();
    let mut iter = v.into_iter();
    let prog_name = iter.next().unwrap_or_else(|| "cli".to_string());

    if args_len < 2 {
      return Err(Self::make_error_message("not enough arguments", prog_name));
    }

    let mut corpus: Option<String> = None;
    let mut embeddings: Option<String> = None;
    let mut start: Option<String> = None;
    let mut print_chart = false;
    let mut raw = false;
    let mut print_grammar = false;
    let mut eval = false;

    while let Some(o) = iter.next() {
      if o == "-h" || o == "--help" {
        println!("{}", usage(&prog_name));
        process::exit(0);
      } else if o == "-e" || o == "--embeddings" {
        match iter.next() {
          Some(file) => embeddings = Some(file),
          None => return Err(Self::make_error_message("missing embeddings file", prog_name)),
        }
      } else if o == "-s" || o == "--start" {
        match iter.next() {
          Some(symbol) => start = Some(symbol),
          None => return Err(Self::make_error_message("missing start symbol", prog_name)),
        }
      } else if o == "-c" || o == "--chart" {
        print_chart = true;
      } else if o == "-r" || o == "--raw" {
        raw = true;
      } else if o == "-g" || o == "--grammar" {
        print_grammar = true;
      } else if o == "--eval" {
        eval = true;
      } else if corpus.is_none() {
        corpus = Some(o);
      } else {
        return Err(Self::make_error_message("invalid arguments", prog_name));
      }
    }

    if let Some(corpus) = corpus {
      Ok(Self {
        corpus,
        embeddings,
        start,
        print_chart,
        raw,
        print_grammar,
        eval,
      })
    } else {
      Err(Self::make_error_message("missing corpus", prog_name))
    }
  }
}

fn main() -> Result<(), Err> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_writer(io::stderr)
    .init();

  let opts = match Args::parse(env::args().collect()) {
    Ok(opts) => opts,
    Err(msg) => {
      eprintln!("{}", msg);
      process::exit(255);
    }
  };

  let config = match &opts.start {
    Some(start) => Config::new().with_start_symbol(start),
    None => Config::new(),
  };

  let embeddings: Box<dyn Embeddings> = match &opts.embeddings {
    Some(path) => Box::new(EmbeddingTable::read_from_file(path)?),
    None => Box::new(NoEmbeddings),
  };

  let trees = read_treebank_file(&opts.corpus, &config)?;

  if opts.eval {
    let (train, test) = split_corpus(&trees);
    let pcfg = Pcfg::estimate(train, &config)?;
    println!("{}", evaluate(&pcfg, test, embeddings.as_ref()));
    return Ok(());
  }

  let pcfg = Pcfg::estimate(&trees, &config)?;
  if opts.print_grammar {
    print!("{}", pcfg);
    return Ok(());
  }

  let mut input = String::new();
  loop {
    print!("> ");
    io::stdout().flush()?;

    match io::stdin().read_line(&mut input) {
      Ok(_) => {
        if input.is_empty() {
          // ctrl+d
          return Ok(());
        }
        parse(&pcfg, embeddings.as_ref(), input.trim(), &opts);
        input.clear();
      }
      Err(error) => return Err(error.into()),
    }
  }
}
