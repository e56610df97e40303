use std::{
    io::{self, Read},
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use docbind_api::RestClient;
use docbind_engine::{Filters, Model, ModelManager, Schema};
use docbind_registry::{SchemaRegistry, default_manifest_path};
use tracing::debug;

/// Bind XML and JSON documents to the models declared in a schema manifest.
#[derive(Debug, Parser)]
#[command(name = "docbind", version, about)]
struct Cli {
    /// Schema manifest; defaults to $DOCBIND_SCHEMA_PATH, then the user config directory.
    #[arg(long, global = true, value_name = "PATH")]
    manifest: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Bind a local document and print the model's fields as JSON.
    Parse {
        #[arg(long)]
        model: String,
        /// Document to read; `-` reads standard input.
        #[arg(long, value_name = "FILE")]
        input: PathBuf,
    },
    /// Print the URL a fetch with these filters would request.
    Url(FinderArgs),
    /// Fetch exactly one model and print it as JSON.
    Get(FinderArgs),
    /// Print the number of models matching the filters.
    Count(FinderArgs),
}

#[derive(Debug, Args)]
struct FinderArgs {
    #[arg(long)]
    model: String,
    /// Filters as `key=value`; repeat a key to fill repeated finder positions.
    #[arg(value_name = "KEY=VALUE", value_parser = parse_filter)]
    filters: Vec<(String, String)>,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let manifest = cli.manifest.unwrap_or_else(default_manifest_path);
    let registry = SchemaRegistry::from_path(&manifest)?;
    debug!(manifest = %manifest.display(), models = registry.len(), "schema registry ready");

    match cli.command {
        Command::Parse { model, input } => {
            let schema = registry.schema(&model)?;
            let model = Model::from_source(schema, read_input(&input)?);
            print_json(&model)
        }
        Command::Url(args) => {
            let manager = manager(registry.schema(&args.model)?)?;
            println!("{}", manager.url_for(&filters(args.filters))?);
            Ok(())
        }
        Command::Get(args) => {
            let manager = manager(registry.schema(&args.model)?)?;
            let model = manager.get(&filters(args.filters))?;
            print_json(&model)
        }
        Command::Count(args) => {
            let manager = manager(registry.schema(&args.model)?)?;
            println!("{}", manager.filter(filters(args.filters)).count()?);
            Ok(())
        }
    }
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn manager(schema: Arc<Schema>) -> Result<ModelManager<RestClient>> {
    let client = RestClient::from_env()?;
    Ok(ModelManager::new(schema, client))
}

fn filters(pairs: Vec<(String, String)>) -> Filters {
    pairs.into_iter().collect()
}

fn parse_filter(raw: &str) -> Result<(String, String), String> {
    let Some((key, value)) = raw.split_once('=') else {
        return Err(format!("expected KEY=VALUE, got '{raw}'"));
    };
    if key.trim().is_empty() {
        return Err(format!("filter key is empty in '{raw}'"));
    }
    Ok((key.trim().to_string(), value.to_string()))
}

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer).context("failed to read standard input")?;
        return Ok(buffer);
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn print_json(model: &Model) -> Result<()> {
    let rendered = model.to_json()?;
    println!("{}", serde_json::to_string_pretty(&rendered)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn filters_split_on_the_first_equals_sign() {
        assert_eq!(parse_filter("street=Elm").unwrap(), ("street".to_string(), "Elm".to_string()));
        assert_eq!(parse_filter("q=a=b").unwrap(), ("q".to_string(), "a=b".to_string()));
        assert!(parse_filter("street").is_err());
        assert!(parse_filter("=Elm").is_err());
    }

    #[test]
    fn repeated_keys_are_kept_in_order() {
        let cli = Cli::try_parse_from(["docbind", "url", "--model", "Greeting", "hello=hi", "mum=Babs", "hello=bye"]).unwrap();
        let Command::Url(args) = cli.command else {
            panic!("expected the url command");
        };
        assert_eq!(filters(args.filters).keys(), vec!["hello", "mum", "hello"]);
    }

    #[test]
    fn input_files_are_read_whole() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("muppet.xml");
        std::fs::write(&path, "<muppet/>").unwrap();
        assert_eq!(read_input(&path).unwrap(), "<muppet/>");
        assert!(read_input(&dir.path().join("missing.xml")).is_err());
    }
}
