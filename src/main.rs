//! restbind CLI - run, validate and inspect binding files

use std::time::Duration;

use clap::{Parser, Subcommand};
use colored::Colorize;
use serde_json::{Map, Value};

use restbind::error::{BindError, FixSuggestion};
use restbind::query::strip_endpoint;
use restbind::{
    build_url, create_transport, BindingFile, ConfigStore, LoadOptions, ManagerBuilder,
    TransformRegistry,
};

#[derive(Parser)]
#[command(name = "restbind")]
#[command(about = "restbind - REST data binding runner")]
#[command(version)]
struct Cli {
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mount a binding file, wait for its loads and print the props
    Run {
        /// Path to binding .yaml file
        file: String,

        /// Issue one extra load of this query after mounting
        #[arg(short, long)]
        load: Option<String>,

        /// Params for --load (key=value, value parsed as JSON)
        #[arg(short, long = "param", requires = "load")]
        params: Vec<String>,

        /// Append to previous data (array transform)
        #[arg(long, requires = "load")]
        append: bool,

        /// Give up waiting after this many milliseconds
        #[arg(long, default_value_t = 10_000)]
        wait_ms: u64,

        /// Transport to use (http, mock)
        #[arg(short, long, default_value = "http")]
        transport: String,
    },

    /// Validate a binding file (normalize only, no requests)
    Validate {
        /// Path to binding .yaml file
        file: String,
    },

    /// Print the request URL for an endpoint
    Url {
        endpoint: String,

        /// Filter as JSON
        #[arg(short, long)]
        filter: Option<String>,

        /// Config overrides (key=value)
        #[arg(short, long = "config")]
        config: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (ignore if not present)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    let result = match cli.command {
        Commands::Run {
            file,
            load,
            params,
            append,
            wait_ms,
            transport,
        } => run_binding(&file, load, &params, append, wait_ms, &transport).await,
        Commands::Validate { file } => validate_binding(&file).map(|_| true),
        Commands::Url {
            endpoint,
            filter,
            config,
        } => print_url(&endpoint, filter.as_deref(), &config).map(|_| true),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            if let Some(suggestion) = e.fix_suggestion() {
                eprintln!("  {} {}", "Fix:".yellow(), suggestion);
            }
            std::process::exit(1);
        }
    }
}

/// Returns false if any query ended in error
async fn run_binding(
    file: &str,
    load: Option<String>,
    params: &[String],
    append: bool,
    wait_ms: u64,
    transport: &str,
) -> Result<bool, BindError> {
    let binding = BindingFile::load(file)?;

    // File config first, environment wins
    let config = ConfigStore::global();
    binding.apply_config(&config);
    config.load_env();

    let manager = ManagerBuilder::new(create_transport(transport)?)
        .config(config)
        .mount(binding.query_specs())?;

    eprintln!(
        "{} Mounted {} quer{} via {}",
        "→".cyan(),
        manager.query_names().len(),
        if manager.query_names().len() == 1 { "y" } else { "ies" },
        transport.cyan().bold()
    );

    if let Some(name) = load {
        let options = if append {
            LoadOptions::new().append()
        } else {
            LoadOptions::default()
        };
        manager.load(&name, Value::Object(parse_pairs(params)?), options)?;
    }

    if tokio::time::timeout(Duration::from_millis(wait_ms), manager.settled())
        .await
        .is_err()
    {
        eprintln!(
            "{} Gave up waiting after {}ms",
            "!".yellow().bold(),
            wait_ms
        );
    }

    let snapshot = manager.snapshot();
    manager.dispose();
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(!snapshot.has_errors())
}

fn validate_binding(file: &str) -> Result<(), BindError> {
    let binding = BindingFile::load(file)?;
    let queries = restbind::query::normalize(binding.query_specs(), &TransformRegistry::new())?;

    println!("{} Binding '{}' is valid", "✓".green(), file);
    println!("  Queries: {}", queries.len());
    for query in &queries {
        println!(
            "    {} {} /{} ({}{})",
            "•".cyan(),
            query.name.bold(),
            query.endpoint,
            query.transform.name(),
            if query.auto_load { ", autoLoad" } else { "" }
        );
    }

    Ok(())
}

fn print_url(endpoint: &str, filter: Option<&str>, overrides: &[String]) -> Result<(), BindError> {
    let config = ConfigStore::new();
    config.load_env();
    config.set_many(parse_pairs(overrides)?);

    let filter = filter.map(serde_json::from_str::<Value>).transpose()?;
    println!(
        "{}",
        build_url(&config, &strip_endpoint(endpoint), filter.as_ref())
    );
    Ok(())
}

fn parse_pairs(pairs: &[String]) -> Result<Map<String, Value>, BindError> {
    pairs.iter().map(|p| parse_pair(p)).collect()
}

/// `key=value`; the value is JSON if it parses, a plain string otherwise
fn parse_pair(pair: &str) -> Result<(String, Value), BindError> {
    let (key, raw) = pair
        .split_once('=')
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| BindError::InvalidPair {
            pair: pair.to_string(),
        })?;
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pair_values_parse_as_json() {
        assert_eq!(parse_pair("page=2").unwrap(), ("page".to_string(), json!(2)));
        assert_eq!(
            parse_pair("tags=[\"a\"]").unwrap(),
            ("tags".to_string(), json!(["a"]))
        );
    }

    #[test]
    fn pair_falls_back_to_string() {
        assert_eq!(
            parse_pair("baseUrl=http://x/api").unwrap(),
            ("baseUrl".to_string(), json!("http://x/api"))
        );
        assert_eq!(parse_pair("q=").unwrap(), ("q".to_string(), json!("")));
    }

    #[test]
    fn pair_needs_key() {
        assert!(matches!(parse_pair("novalue"), Err(BindError::InvalidPair { .. })));
        assert!(matches!(parse_pair("=1"), Err(BindError::InvalidPair { .. })));
    }
}
