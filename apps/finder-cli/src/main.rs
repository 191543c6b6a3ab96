use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use finder_core::config::{Config, Settings};
use finder_core::data_processor::DataProcessor;
use finder_core::traits::TextGenerator;
use finder_embed::embedder_from_settings;
use finder_hybrid::{ConversationIndexes, FusionConfig, RetrievalPipeline};
use finder_llm::{provider_from_settings, LlmService, QueryExpander};
use finder_rerank::{cross_encoder_from_settings, Reranker};

const INGEST_BATCH: usize = 64;

const USAGE: &str = "Usage: finder-cli <command> <conversation> [args...]

Commands:
  ingest <conversation> <dir>        index every .txt file under <dir>
  query <conversation> <question>    retrieve matching chunks
      --keyword-only | --vector-only
      --no-expand  --no-rerank  --top-k N  --answer
  count <conversation>               number of indexed chunks
  delete <conversation> <id>...      remove chunks by id
  clear <conversation>               remove every chunk, keep the store
  drop <conversation>                delete the conversation's store";

#[derive(Debug, Default)]
struct QueryFlags {
    keyword_only: bool,
    vector_only: bool,
    no_expand: bool,
    no_rerank: bool,
    answer: bool,
    top_k: Option<usize>,
}

fn usage_exit(msg: &str) -> ! {
    eprintln!("{msg}\n\n{USAGE}");
    std::process::exit(1)
}

fn parse_query_args(args: &[String]) -> (String, QueryFlags) {
    let mut flags = QueryFlags::default();
    let mut words = Vec::new();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--keyword-only" => flags.keyword_only = true,
            "--vector-only" => flags.vector_only = true,
            "--no-expand" => flags.no_expand = true,
            "--no-rerank" => flags.no_rerank = true,
            "--answer" => flags.answer = true,
            "--top-k" => {
                match args.get(i + 1).and_then(|v| v.parse::<usize>().ok()) {
                    Some(k) if k > 0 => flags.top_k = Some(k),
                    _ => usage_exit("Error: --top-k requires a positive number"),
                }
                i += 1;
            }
            flag if flag.starts_with("--") => usage_exit(&format!("Error: unknown flag {flag}")),
            word => words.push(word.to_string()),
        }
        i += 1;
    }
    if flags.keyword_only && flags.vector_only { usage_exit("Error: --keyword-only and --vector-only are exclusive"); }
    if words.is_empty() { usage_exit("Error: query needs a question"); }
    (words.join(" "), flags)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

fn open_indexes(settings: &Settings, base: &Path) -> Result<ConversationIndexes> {
    let embedder = embedder_from_settings(&settings.embedding, base)?;
    Ok(ConversationIndexes::new(settings.data.store_path(base), embedder, FusionConfig::from(&settings.search)))
}

/// The generation backend is optional for retrieval; a misconfigured one only disables expansion and answers.
fn try_provider(settings: &Settings) -> Option<Arc<dyn TextGenerator>> {
    match provider_from_settings(&settings.llm) {
        Ok(provider) => Some(provider),
        Err(e) => {
            warn!(error = %e, "LLM provider unavailable; query expansion and answers disabled");
            None
        }
    }
}

fn ingest(indexes: &mut ConversationIndexes, conversation: &str, data_dir: &Path) -> Result<()> {
    if !data_dir.is_dir() { bail!("{} is not a directory", data_dir.display()); }
    let docs = DataProcessor::new().process_directory(data_dir)?;
    if docs.is_empty() {
        println!("No .txt content found under {}", data_dir.display());
        return Ok(());
    }
    let engine = indexes.open(conversation)?;
    let pb = ProgressBar::new(docs.len() as u64);
    pb.set_style(ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:40} {pos}/{len} chunks")?);
    for batch in docs.chunks(INGEST_BATCH) {
        engine.add_documents(batch)?;
        pb.inc(batch.len() as u64);
    }
    pb.finish_and_clear();
    println!("Indexed {} chunks into '{}' ({} total)", docs.len(), conversation, engine.document_count()?);
    Ok(())
}

fn query(settings: &Settings, base: &Path, indexes: &mut ConversationIndexes, conversation: &str, question: &str, flags: &QueryFlags) -> Result<()> {
    let mut search = settings.search.clone();
    if let Some(k) = flags.top_k { search.top_k_rerank = k; }
    if flags.no_expand { search.use_multi_query = false; }
    if flags.no_rerank { search.use_reranking = false; }
    let shown = search.top_k_rerank;

    let provider = if search.use_multi_query || flags.answer { try_provider(settings) } else { None };
    let mut pipeline = RetrievalPipeline::new(search.clone()).with_signals(!flags.keyword_only, !flags.vector_only);
    if let (true, Some(provider)) = (search.use_multi_query, &provider) {
        pipeline = pipeline.with_expander(QueryExpander::new(provider.clone()));
    }
    if search.use_reranking {
        match cross_encoder_from_settings(&settings.reranker, base) {
            Ok(encoder) => pipeline = pipeline.with_reranker(Reranker::new(encoder)),
            Err(e) => warn!(error = %e, "cross-encoder unavailable; results stay in fused order"),
        }
    }

    let engine = indexes.open(conversation)?;
    let retrieval = pipeline.retrieve(&*engine, question)?;
    if retrieval.queries.len() > 1 {
        println!("Query variants:");
        for q in &retrieval.queries { println!("  - {q}"); }
    }
    let results: Vec<_> = retrieval.results.into_iter().take(shown).collect();
    println!("\nFound {} results for \"{}\"", results.len(), question);
    for (i, r) in results.iter().enumerate() {
        println!("\n  {}. score={:.4} [{}] id={} source={} page={}", i + 1, r.score, r.search_type, r.id(), r.document.source_file, r.document.page_number);
        let snippet: String = r.document.content.chars().take(200).collect();
        println!("     {}", snippet.replace('\n', " "));
    }

    if flags.answer {
        let Some(provider) = provider else { bail!("--answer needs a configured LLM provider") };
        let service = LlmService::with_settings(provider, &settings.llm);
        let context = LlmService::format_context(&results);
        println!("\nAnswer:");
        let mut out = std::io::stdout().lock();
        for chunk in service.generate_response_stream(question, &context, &[], None)? {
            write!(out, "{}", chunk?)?;
            out.flush()?;
        }
        writeln!(out)?;
    }
    Ok(())
}

fn main() -> Result<()> {
    init_tracing();
    let base = PathBuf::from(".");
    let config = Config::load_from(&base).map_err(|e| { eprintln!("Error loading config: {}", e); e })?;
    let settings = config.settings()?;

    let args: Vec<String> = env::args().skip(1).collect();
    let (Some(cmd), Some(conversation)) = (args.first(), args.get(1)) else { usage_exit("Error: missing command or conversation") };
    let rest = &args[2..];
    let mut indexes = open_indexes(&settings, &base).context("failed to initialise the embedder")?;
    info!(store = %indexes.root().display(), conversation = conversation.as_str(), "finder-cli starting");

    match cmd.as_str() {
        "ingest" => {
            let Some(dir) = rest.first() else { usage_exit("Error: ingest needs a directory") };
            ingest(&mut indexes, conversation, Path::new(dir))?;
        }
        "query" => {
            let (question, flags) = parse_query_args(rest);
            query(&settings, &base, &mut indexes, conversation, &question, &flags)?;
        }
        "count" => println!("{}", indexes.open(conversation)?.document_count()?),
        "delete" => {
            if rest.is_empty() { usage_exit("Error: delete needs at least one chunk id"); }
            let engine = indexes.open(conversation)?;
            engine.delete_documents(rest)?;
            println!("Deleted {} ids; {} chunks remain", rest.len(), engine.document_count()?);
        }
        "clear" => {
            indexes.open(conversation)?.clear()?;
            println!("Cleared '{conversation}'");
        }
        "drop" => {
            indexes.delete(conversation)?;
            println!("Dropped '{conversation}'");
        }
        other => usage_exit(&format!("Unknown command: {other}")),
    }
    Ok(())
}
