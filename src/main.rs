//! promsql CLI
//!
//! Renders stored query recipes into PromQL expressions:
//! - Build one or more recipes
//! - List available recipes
//! - Generate a default config file

use anyhow::Context;
use clap::{Parser, Subcommand};
use promsql::config::{generate_default_config, Config, LoggingConfig};
use promsql::recipe::{self, Recipe};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "promsql")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Build PromQL expressions from stored recipes")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render recipes into query expressions
    Build {
        /// Recipe paths, or names looked up in the recipe directory
        #[arg(required = true)]
        recipes: Vec<String>,
    },

    /// List recipes in the recipe directory
    List,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    init_tracing(&config.logging)?;

    match cli.command {
        Commands::Build { recipes } => {
            let dir = config.recipe_dir();
            for name in recipes {
                let path = recipe::resolve(&dir, &name)
                    .with_context(|| format!("Recipe '{}' not found in {:?}", name, dir))?;
                let recipe = Recipe::load(&path)?;
                let query = recipe
                    .render()
                    .with_context(|| format!("Failed to build recipe {:?}", path))?;

                tracing::info!("Built {:?}", path);

                match cli.format.as_str() {
                    "json" => {
                        let body = serde_json::json!({
                            "name": recipe.name.unwrap_or(name),
                            "query": query,
                        });
                        println!("{}", serde_json::to_string(&body)?);
                    }
                    _ => println!("{}", query),
                }
            }
        }

        Commands::List => {
            let dir = config.recipe_dir();
            for path in recipe::list(&dir)? {
                match Recipe::load(&path) {
                    Ok(recipe) => {
                        let name = recipe.name.unwrap_or_else(|| file_stem(&path));
                        match recipe.description {
                            Some(description) => println!("{:<24} {}", name, description),
                            None => println!("{}", name),
                        }
                    }
                    Err(e) => tracing::warn!("Skipping {:?}: {}", path, e),
                }
            }
        }

        Commands::Config { output } => {
            let content = generate_default_config();
            match output {
                Some(path) => {
                    std::fs::write(&path, content)
                        .with_context(|| format!("Failed to write {:?}", path))?;
                    println!("Config written to {:?}", path);
                }
                None => print!("{}", content),
            }
        }
    }

    Ok(())
}

/// Logs go to stderr (or the configured file) so stdout carries only queries
fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("promsql={}", logging.level)));

    let writer = match &logging.file {
        Some(file) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(file)
                .with_context(|| format!("Failed to open log file {}", file))?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    let registry = tracing_subscriber::registry().with(filter);
    match logging.format.as_str() {
        "json" => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
            .init(),
        _ => registry
            .with(tracing_subscriber::fmt::layer().with_writer(writer))
            .init(),
    }

    Ok(())
}

fn file_stem(path: &std::path::Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}
