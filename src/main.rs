use clap::{Parser, Subcommand};
use kitab::{
    catalog::Catalog,
    config::{Config, EmbedderKind},
    index::{self, VectorStore},
    present::Gallery,
    recommend::{self, Query, Tone},
    web::AppState,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "kitab")]
#[command(about = "किताब - Find your next book by describing it", long_about = None)]
struct Cli {
    /// Description of the book you want (if no subcommand provided)
    query: Option<String>,

    /// Category to restrict results to
    #[arg(long, short, default_value = recommend::ALL)]
    category: String,

    /// Emotional tone to rank by (Happy, Surprising, Angry, Suspenseful, Sad)
    #[arg(long, short, default_value = recommend::ALL)]
    tone: String,

    /// Number of results to return
    #[arg(long, short)]
    limit: Option<usize>,

    /// Number of candidates requested from the semantic index
    #[arg(long)]
    candidates: Option<usize>,

    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Books CSV (default: ./books_with_emotions.csv)
    #[arg(long, global = true)]
    books: Option<PathBuf>,

    /// Tagged description file (default: ./tagged_description.txt)
    #[arg(long, global = true)]
    descriptions: Option<PathBuf>,

    /// Index directory (default: ~/.kitab)
    #[arg(long, global = true)]
    index_dir: Option<PathBuf>,

    /// Embedding backend: onnx or hash
    #[arg(long, global = true)]
    embedder: Option<EmbedderKind>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start web interface
    Serve {
        /// Port to listen on
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Embed the tagged descriptions and persist the semantic index
    Index {
        /// Rebuild even if the persisted index is up to date
        #[arg(long, short)]
        force: bool,
    },

    /// Show statistics about the catalog and index
    Stats,

    /// List the categories available for filtering
    Categories,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    match cli.command {
        Some(Commands::Serve { port }) => {
            let port = port.unwrap_or(config.server.port);
            let recommender = kitab::init(&config, false)?;
            let state = AppState {
                recommender: Arc::new(recommender),
                config,
            };
            kitab::web::serve(state, port).await?;
        }
        Some(Commands::Index { force }) => {
            build_index(&config, force)?;
        }
        Some(Commands::Stats) => {
            show_stats(&config)?;
        }
        Some(Commands::Categories) => {
            list_categories(&config)?;
        }
        None => {
            if let Some(query) = cli.query {
                let mut query = Query::new(query, &cli.category, &cli.tone)
                    .with_search_config(&config.search);
                if let Some(limit) = cli.limit {
                    query.final_k = limit;
                    query.initial_k = query.initial_k.max(limit);
                }
                if let Some(candidates) = cli.candidates {
                    query.initial_k = candidates;
                }
                search(&config, &query)?;
            } else {
                eprintln!("Error: Please describe a book or use a subcommand");
                eprintln!();
                eprintln!("Examples:");
                eprintln!("  kitab \"a dark story about revenge\"          # Recommend books");
                eprintln!("  kitab \"space adventure\" -c Fiction -t Happy  # Filter and rank");
                eprintln!("  kitab serve                                 # Start the web gallery");
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

/// Config file (if any) with command-line overrides applied
fn resolve_config(cli: &Cli) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    if let Some(books) = &cli.books {
        config.data.books_path = books.clone();
    }
    if let Some(descriptions) = &cli.descriptions {
        config.data.descriptions_path = descriptions.clone();
    }
    if let Some(index_dir) = &cli.index_dir {
        config.data.index_dir = index_dir.clone();
    }
    if let Some(embedder) = cli.embedder {
        config.model.backend = embedder;
    }

    Ok(config)
}

fn search(config: &Config, query: &Query) -> Result<(), Box<dyn std::error::Error>> {
    use colored::Colorize;

    if query.is_blank() {
        println!("{}", "Describe a book you want to read.".yellow());
        return Ok(());
    }

    let recommender = kitab::init(config, false)?;
    let start = std::time::Instant::now();
    let gallery = Gallery::search(&recommender, query, &config.display)?;
    let took = start.elapsed();

    println!();
    match &gallery {
        Gallery::Prompt => println!("{}", "Describe a book you want to read.".yellow()),
        Gallery::NoResults => {
            println!("{}", "No results found.".yellow());
            println!("Try a broader description or a different category.");
        }
        Gallery::Results(tiles) => {
            println!(
                "{} {} for \"{}\" ({} ms)",
                "Found".green().bold(),
                format!("{} books", tiles.len()).green(),
                query.text,
                took.as_millis()
            );
            println!();

            for (i, tile) in tiles.iter().enumerate() {
                let badge = tile
                    .emotion
                    .map(|e| format!(" [{}]", e.as_str()))
                    .unwrap_or_default();
                println!(
                    "{}. {}{}",
                    (i + 1).to_string().cyan(),
                    tile.title.bold(),
                    badge.magenta()
                );
                println!("   {} {}", "by".dimmed(), tile.authors);
                println!(
                    "   {} · {} · ★ {}",
                    tile.category.dimmed(),
                    tile.year.dimmed(),
                    tile.rating
                );
                println!("   {}", tile.description.dimmed());
                println!();
            }
        }
    }

    Ok(())
}

fn build_index(config: &Config, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    use colored::Colorize;
    use indicatif::{ProgressBar, ProgressStyle};

    println!(
        "{} {}",
        "Indexing:".cyan().bold(),
        config.data.descriptions_path.display()
    );
    println!("{} {}", "Index location:".cyan(), config.data.index_dir.display());
    println!("{} {}", "Embedder:".cyan(), config.model.backend.as_str());
    println!();

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );
    pb.set_message("embedding descriptions");

    let recommender = kitab::init_with_progress(config, force, Some(&pb))?;
    pb.finish_and_clear();

    println!("{}", "Indexing complete!".green().bold());
    println!("  {}: {}", "Books".green(), recommender.catalog().len());
    println!("  {}: {}", "Indexed descriptions".green(), recommender.index().len());
    println!("  {}: {}", "Model".dimmed(), recommender.index().describe());
    println!();

    Ok(())
}

fn show_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    use colored::Colorize;

    let catalog = Catalog::load(&config.data.books_path, &config.display)?;
    let vector_path = config.data.index_dir.join(index::VECTORS_FILE);

    println!();
    println!("{}", "Catalog Statistics".cyan().bold());
    println!("──────────────────");
    println!("  {}: {}", "Total books".green(), catalog.len());
    println!("  {}: {}", "Categories".green(), catalog.categories().len());
    println!(
        "  {}: {}",
        "With cover".green(),
        catalog.iter().filter(|b| b.thumbnail.is_some()).count()
    );
    println!("  {}: {}", "Source".dimmed(), config.data.books_path.display());
    println!();

    if vector_path.exists() {
        let (store, manifest) = VectorStore::load(&vector_path)?;
        let built_at = chrono::DateTime::from_timestamp(manifest.built_at, 0)
            .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
            .unwrap_or_else(|| "unknown".to_string());

        println!("  {} Semantic index: {} entries", "✓".green(), store.len());
        println!("    {}: {}", "Model".dimmed(), manifest.embedder_key);
        println!("    {}: {}", "Built".dimmed(), built_at);
    } else {
        println!("  {} No semantic index yet. Run 'kitab index'.", "✗".yellow());
    }
    println!();

    Ok(())
}

fn list_categories(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    use colored::Colorize;

    let catalog = Catalog::load(&config.data.books_path, &config.display)?;

    println!();
    println!("{}", "Categories".cyan().bold());
    println!("  {}", recommend::ALL);
    for category in catalog.categories() {
        let count = catalog
            .iter()
            .filter(|b| b.category.as_deref() == Some(category.as_str()))
            .count();
        println!("  {} {}", category, format!("({})", count).dimmed());
    }
    println!();
    println!("{}", "Tones".cyan().bold());
    for tone in Tone::OPTIONS {
        match tone.emotion() {
            Some(emotion) => println!("  {} {}", tone.label(), format!("(ranks by {})", emotion.as_str()).dimmed()),
            None => println!("  {}", tone.label()),
        }
    }
    println!();

    Ok(())
}
