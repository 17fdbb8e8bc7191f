use anyhow::Result;
use clap::{Parser, Subcommand};
use lyricsir_core::config::DEFAULT_LATENT_DIMENSIONS;
use lyricsir_core::corpus::{load_corpus, load_judgments};
use lyricsir_core::eval::{evaluate, mean_average_precision};
use lyricsir_core::{DocId, EngineConfig, Evaluation, Ranking, SearchEngine};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "lyricsir")]
#[command(about = "Boolean, vector-space and latent semantic search over song lyrics", long_about = None)]
struct Cli {
    /// Corpus root: one directory per artist holding <title>.txt files
    #[arg(long, env = "LYRICSIR_CORPUS", default_value = "./Lyrics", global = true)]
    corpus: PathBuf,
    /// Latent dimensions, capped by the rank of the term-document matrix
    #[arg(long, env = "LYRICSIR_DIMENSIONS", default_value_t = DEFAULT_LATENT_DIMENSIONS, global = true)]
    dimensions: usize,
    /// Index documents on the current thread only
    #[arg(long, default_value_t = false, global = true)]
    sequential: bool,
    /// Print results as JSON
    #[arg(long, default_value_t = false, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Corpus and index statistics
    Stats,
    /// Exact search: "quoted text" is a phrase query, anything else a boolean query
    Search {
        #[arg(required = true)]
        query: Vec<String>,
    },
    /// Boolean query: `t`, `not t`, `t1 and t2` or `t1 or t2`
    Boolean {
        #[arg(required = true)]
        query: Vec<String>,
    },
    /// Positional phrase query
    Phrase {
        #[arg(required = true)]
        phrase: Vec<String>,
    },
    /// TF-IDF cosine ranking
    Vector {
        #[arg(required = true)]
        query: Vec<String>,
        /// Number of results to print
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Latent semantic (SVD) ranking
    Latent {
        #[arg(required = true)]
        query: Vec<String>,
        /// Number of results to print
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
    /// Precision@k and average precision of the vector and latent models against judgments
    Eval {
        /// JSON object: query text -> list of relevant "artist/title" labels
        #[arg(long)]
        judgments: PathBuf,
        /// Cutoff for precision@k
        #[arg(long, default_value_t = 10)]
        k: usize,
    },
}

#[derive(Serialize)]
struct Hit<'a> {
    doc_id: DocId,
    label: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    score: Option<f64>,
}

#[derive(Serialize)]
struct EvalRow<'a> {
    query: &'a str,
    model: &'static str,
    #[serde(flatten)]
    eval: Evaluation,
}

#[derive(Serialize)]
struct EvalSummary<'a> {
    k: usize,
    queries: Vec<EvalRow<'a>>,
    /// Mean of per-query average precision, per model
    mean_average_precision: Vec<(&'static str, f64)>,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    let config = EngineConfig { latent_dimensions: cli.dimensions, parallel_build: !cli.sequential };
    let engine = SearchEngine::build(load_corpus(&cli.corpus)?, config);

    match &cli.command {
        Commands::Stats => stats(&engine, cli.json),
        Commands::Search { query } => print_set(&engine, &engine.submit_exact(&query.join(" ")), cli.json),
        Commands::Boolean { query } => print_set(&engine, &engine.submit_boolean(&query.join(" ")), cli.json),
        Commands::Phrase { phrase } => print_set(&engine, &engine.submit_phrase(&phrase.join(" ")), cli.json),
        Commands::Vector { query, top } => print_ranked(&engine, &engine.submit_vector(&query.join(" ")), *top, cli.json),
        Commands::Latent { query, top } => {
            let ranked = engine.submit_latent(&query.join(" "))?;
            print_ranked(&engine, &ranked, *top, cli.json)
        }
        Commands::Eval { judgments, k } => run_eval(&engine, judgments, *k, cli.json),
    }
}

fn stats(engine: &SearchEngine, json: bool) -> Result<()> {
    let index = engine.index();
    let latent = engine.latent().wait()?;
    if json {
        let out = serde_json::json!({
            "documents": index.num_docs(),
            "terms": index.num_terms(),
            "latent_dimensions": latent.k(),
            "config": engine.config(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("documents: {}", index.num_docs());
        println!("terms: {}", index.num_terms());
        println!("latent dimensions: {} (requested {})", latent.k(), engine.config().latent_dimensions);
    }
    Ok(())
}

fn print_set(engine: &SearchEngine, docs: &BTreeSet<DocId>, json: bool) -> Result<()> {
    let hits: Vec<Hit> = docs
        .iter()
        .filter_map(|&doc_id| engine.label(doc_id).map(|label| Hit { doc_id, label, score: None }))
        .collect();
    if json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
    } else if hits.is_empty() {
        println!("No results found.");
    } else {
        for hit in hits {
            println!("{}", hit.label);
        }
    }
    Ok(())
}

fn print_ranked(engine: &SearchEngine, ranked: &Ranking, top: usize, json: bool) -> Result<()> {
    let hits: Vec<Hit> = ranked
        .iter()
        .take(top)
        .filter_map(|&(doc_id, score)| engine.label(doc_id).map(|label| Hit { doc_id, label, score: Some(score) }))
        .collect();
    if json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
    } else if hits.is_empty() {
        println!("No results found.");
    } else {
        for hit in hits {
            println!("{} (score: {:.4})", hit.label, hit.score.unwrap_or(0.0));
        }
    }
    Ok(())
}

fn run_eval(engine: &SearchEngine, path: &Path, k: usize, json: bool) -> Result<()> {
    let judgments = load_judgments(path)?;
    let mut rows: Vec<EvalRow> = Vec::new();
    for (query, labels) in &judgments {
        let relevant = engine.relevant_ids(labels.as_slice());
        if relevant.len() < labels.len() {
            tracing::warn!(query = query.as_str(), dropped = labels.len() - relevant.len(), "unknown labels in judgments");
        }
        let vector = engine.submit_vector(query);
        let latent = engine.submit_latent(query)?;
        rows.push(EvalRow { query, model: "vector", eval: evaluate(&vector, &relevant, k) });
        rows.push(EvalRow { query, model: "latent", eval: evaluate(&latent, &relevant, k) });
    }

    let per_model: Vec<(&'static str, f64)> = ["vector", "latent"]
        .into_iter()
        .map(|model| {
            let evals: Vec<Evaluation> = rows.iter().filter(|r| r.model == model).map(|r| r.eval).collect();
            (model, mean_average_precision(&evals))
        })
        .collect();

    if json {
        let summary = EvalSummary { k, queries: rows, mean_average_precision: per_model };
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }
    for row in &rows {
        println!(
            "{:<30} {:<7} P@{}={:.4} AP={:.4}",
            row.query, row.model, k, row.eval.precision_at_k, row.eval.average_precision
        );
    }
    for (model, map) in &per_model {
        println!("mean over {} queries ({model}): {map:.4}", judgments.len());
    }
    Ok(())
}
