//! CLI binary for medkg: build, serve, visualize, and inspect the medical
//! knowledge graph.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use medkg_core::config::MedkgConfig;
use medkg_core::graph::MedGraph;
use medkg_core::storage;
use medkg_extract::{GraphBuilder, LlmClient};
use medkg_query::QaService;
use medkg_server::AppState;
use medkg_viz::ExportFormat;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "medkg", about = "Medical knowledge graph builder and QA service")]
struct Cli {
    /// Directory containing medkg.toml (defaults to current directory)
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the knowledge graph from a raw text corpus
    Build {
        /// Directory of raw .txt / .json documents
        #[arg(long, default_value = "data/raw")]
        data_dir: PathBuf,

        /// Directory for the graph and extraction checkpoints
        #[arg(long, default_value = "data/processed")]
        output_dir: PathBuf,

        /// Model name override
        #[arg(short, long)]
        model: Option<String>,

        /// API key (falls back to DEEPSEEK_API_KEY / OPENAI_API_KEY / MEDKG_API_KEY)
        #[arg(long)]
        api_key: Option<String>,

        /// Re-extract from scratch, ignoring checkpoints
        #[arg(long)]
        force: bool,
    },

    /// Serve the question form and JSON API
    Serve {
        /// Path to the graph JSON file
        #[arg(long, default_value = "data/processed/medical_kg.json")]
        kg_path: PathBuf,

        /// Bind host (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Bind port (overrides config)
        #[arg(short, long)]
        port: Option<u16>,

        /// Model name override
        #[arg(short, long)]
        model: Option<String>,

        /// API key (falls back to environment variables)
        #[arg(long)]
        api_key: Option<String>,
    },

    /// Export the graph for external renderers
    Visualize {
        /// Path to the graph JSON file
        #[arg(long, default_value = "data/processed/medical_kg.json")]
        kg_path: PathBuf,

        /// Output directory for export files
        #[arg(long, default_value = "data/visualization")]
        output_dir: PathBuf,

        /// Export format: dot, d3, html, all
        #[arg(short, long, default_value = "all")]
        format: String,

        /// Focus on the neighborhood of this entity name
        #[arg(short, long)]
        entity: Option<String>,

        /// Neighborhood depth in hops
        #[arg(long, default_value = "2")]
        depth: usize,

        /// Maximum nodes per export
        #[arg(long)]
        max_nodes: Option<usize>,

        /// Also write the statistics JSON
        #[arg(long)]
        stats: bool,
    },

    /// Show graph summary statistics
    Info {
        /// Path to the graph JSON file
        #[arg(long, default_value = "data/processed/medical_kg.json")]
        kg_path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config_dir = match &cli.config_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("failed to get current directory")?,
    };
    let config = MedkgConfig::load(&config_dir)?;

    match cli.command {
        Commands::Build { data_dir, output_dir, model, api_key, force } => {
            cmd_build(config, data_dir, output_dir, model, api_key, force).await
        }
        Commands::Serve { kg_path, host, port, model, api_key } => {
            cmd_serve(config, kg_path, host, port, model, api_key).await
        }
        Commands::Visualize { kg_path, output_dir, format, entity, depth, max_nodes, stats } => {
            cmd_visualize(config, kg_path, output_dir, &format, entity, depth, max_nodes, stats)
        }
        Commands::Info { kg_path } => cmd_info(&kg_path),
    }
}

fn spinner(message: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("valid template"),
    );
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));
    spinner.set_message(message);
    spinner
}

fn make_client(
    config: &mut MedkgConfig,
    model: Option<String>,
    api_key: Option<String>,
) -> Result<LlmClient> {
    if let Some(model) = model {
        config.llm.model = model;
    }
    LlmClient::from_config(api_key, &config.llm)
}

async fn cmd_build(
    mut config: MedkgConfig,
    data_dir: PathBuf,
    output_dir: PathBuf,
    model: Option<String>,
    api_key: Option<String>,
    force: bool,
) -> Result<()> {
    let client = make_client(&mut config, model, api_key)?;
    eprintln!("Building knowledge graph with {}", client.provider_name());

    let builder = GraphBuilder::new(Arc::new(client), data_dir, output_dir, config);

    let pb = spinner("Extracting entities...");
    let entities = builder.extract_entities(force).await?;
    pb.finish_and_clear();
    eprintln!("  {} entities", entities.len());

    let pb = spinner("Extracting relations...");
    let relations = builder.extract_relations(&entities, force).await?;
    pb.finish_and_clear();
    eprintln!("  {} relations", relations.len());

    let graph = builder.build_graph(entities, relations);
    builder.save(&graph)?;
    eprintln!(
        "Done: {} entities, {} relations",
        graph.metadata.total_entities, graph.metadata.total_relations
    );
    Ok(())
}

async fn cmd_serve(
    mut config: MedkgConfig,
    kg_path: PathBuf,
    host: Option<String>,
    port: Option<u16>,
    model: Option<String>,
    api_key: Option<String>,
) -> Result<()> {
    let client = make_client(&mut config, model, api_key)?;

    let graph = if kg_path.exists() {
        let graph = storage::load_path(&kg_path)?;
        eprintln!(
            "Loaded graph: {} entities, {} relations",
            graph.metadata.total_entities, graph.metadata.total_relations
        );
        Some(Arc::new(graph))
    } else {
        tracing::warn!(
            path = %kg_path.display(),
            "graph file not found, answering without graph context"
        );
        None
    };

    let qa = Arc::new(QaService::new(
        Arc::new(client),
        graph.clone(),
        config.llm.answer_max_tokens,
    ));
    let host = host.unwrap_or(config.server.host);
    let port = port.unwrap_or(config.server.port);
    medkg_server::serve(AppState::new(graph, qa), &host, port).await
}

#[allow(clippy::too_many_arguments)]
fn cmd_visualize(
    config: MedkgConfig,
    kg_path: PathBuf,
    output_dir: PathBuf,
    format: &str,
    entity: Option<String>,
    depth: usize,
    max_nodes: Option<usize>,
    stats: bool,
) -> Result<()> {
    let graph = storage::load_path(&kg_path)?;
    let max_nodes = max_nodes.unwrap_or(config.visualization.max_nodes);

    let graph = match entity {
        Some(name) => focus_neighborhood(&graph, &name, depth, max_nodes)?,
        None => graph,
    };

    let mut formats = match format {
        "dot" => vec![ExportFormat::Dot],
        "d3" => vec![ExportFormat::D3],
        "html" => vec![ExportFormat::Html],
        "all" => vec![ExportFormat::Dot, ExportFormat::D3, ExportFormat::Html, ExportFormat::Stats],
        other => anyhow::bail!("unknown format: {other} (expected dot, d3, html, or all)"),
    };
    if stats && !formats.contains(&ExportFormat::Stats) {
        formats.push(ExportFormat::Stats);
    }

    let written = medkg_viz::write_outputs(&graph, &output_dir, &formats, max_nodes)?;
    for path in written {
        eprintln!("Wrote {}", path.display());
    }
    Ok(())
}

/// Reduce the graph to the neighborhood of one named entity.
fn focus_neighborhood(
    graph: &MedGraph,
    name: &str,
    depth: usize,
    max_nodes: usize,
) -> Result<MedGraph> {
    let seeds: Vec<String> = graph
        .find_by_name(name, None)
        .into_iter()
        .map(|e| e.id.clone())
        .collect();
    if seeds.is_empty() {
        anyhow::bail!("no entity matches \"{name}\"");
    }

    let subgraph = graph.neighborhood(&seeds, depth, max_nodes);
    let mut focused = MedGraph::new();
    for entity in subgraph.entities {
        focused.insert_entity(entity);
    }
    for relation in subgraph.relations {
        focused.insert_relation(relation);
    }
    focused.refresh_metadata();
    Ok(focused)
}

fn cmd_info(kg_path: &Path) -> Result<()> {
    if !kg_path.exists() {
        eprintln!("No graph found at {}. Run `medkg build` first.", kg_path.display());
        return Ok(());
    }

    let graph = storage::load_path(kg_path)?;
    let stats = medkg_viz::graph_stats(&graph);

    println!("Medical KG v{}", graph.version);
    println!("Created: {}", graph.created_at);
    println!("Updated: {}", graph.updated_at);
    println!();
    println!("Entities: {}", stats.total_entities);
    println!("Relations: {}", stats.total_relations);
    println!("Average degree: {:.2}", stats.average_degree);

    if !stats.categories.is_empty() {
        println!("\nCategories:");
        for (category, count) in &stats.categories {
            println!("  {} ({})", category, count);
        }
    }
    if !stats.relation_kinds.is_empty() {
        println!("\nRelation kinds:");
        for (kind, count) in &stats.relation_kinds {
            println!("  {} ({})", kind, count);
        }
    }
    if !stats.top_entities.is_empty() {
        println!("\nMost connected:");
        for entry in &stats.top_entities {
            println!("  {} [{}] degree {}", entry.name, entry.category, entry.degree);
        }
    }
    Ok(())
}
