//! # sitecore-layout CLI
//!
//! Command-line front for the layout deserializer, chrome injection and the
//! preview server.
//!
//! ## Usage
//!
//! ```bash
//! # Parse a layout document and print the content tree as JSON
//! sitecore-layout parse page.json
//!
//! # Print a tree summary instead
//! sitecore-layout parse --summary page.json
//!
//! # Wrap every placeholder, rendering and editable field in chromes
//! sitecore-layout decorate page.json
//!
//! # Run the preview server against an editing endpoint
//! SITECORE_EDITING_ENDPOINT=https://cm.example.com/sitecore/api/graph/edge \
//!     sitecore-layout serve --listen 127.0.0.1:8080
//! ```

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use sitecore_layout::{
    LayoutError,
    chrome::{ChromeFeed, ChromeInjector},
    config::{EditingConfig, ServerConfig},
    layout::{LayoutDeserializer, LayoutResponse, PlaceholderItem, Placeholders},
};

/// sitecore-layout - Sitecore layout service tooling
#[derive(Parser, Debug)]
#[command(name = "sitecore-layout")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Parse a layout document and print the content tree
    Parse {
        /// Layout JSON file ("-" for stdin)
        file: PathBuf,

        /// Print an indented tree summary instead of JSON
        #[arg(long)]
        summary: bool,
    },
    /// Parse a layout document and inject editing chromes
    Decorate {
        /// Layout JSON file ("-" for stdin)
        file: PathBuf,

        /// Print an indented tree summary instead of JSON
        #[arg(long)]
        summary: bool,
    },
    /// Start the preview HTTP server
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:8080")]
        listen: String,

        /// GraphQL editing endpoint (overrides SITECORE_EDITING_ENDPOINT)
        #[arg(long)]
        endpoint: Option<String>,

        /// Upstream timeout in milliseconds (overrides SITECORE_EDITING_TIMEOUT_MS)
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Site used for dictionary lookups when a request names none
        #[arg(long)]
        site: Option<String>,
    },
}

fn main() {
    init_tracing();
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run() -> Result<(), LayoutError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Parse { file, summary } => {
            let response = read_layout(&file)?;
            print_layout(&response, summary)
        }
        Commands::Decorate { file, summary } => {
            let response = read_layout(&file)?;
            let feed = ChromeFeed::everything();
            let mut injector = ChromeInjector::new(&feed);
            let decorated = injector.inject(response);
            let stats = injector.stats();
            eprintln!(
                "Decorated {} placeholders, {} renderings, {} fields",
                stats.placeholders, stats.renderings, stats.fields
            );
            print_layout(&decorated, summary)
        }
        Commands::Serve {
            listen,
            endpoint,
            timeout_ms,
            site,
        } => {
            let mut editing = EditingConfig::from_env()?;
            if let Some(endpoint) = endpoint {
                editing.endpoint = endpoint;
            }
            if let Some(timeout_ms) = timeout_ms {
                editing.request_timeout = Duration::from_millis(timeout_ms);
            }
            if site.is_some() {
                editing.default_site = site;
            }
            let config = ServerConfig {
                listen_addr: listen,
                editing,
            };

            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(sitecore_layout::server::serve(config))
        }
    }
}

fn read_layout(file: &Path) -> Result<LayoutResponse, LayoutError> {
    let json = if file.as_os_str() == "-" {
        std::io::read_to_string(std::io::stdin())?
    } else {
        std::fs::read_to_string(file)?
    };
    LayoutDeserializer::default().deserialize(&json)
}

fn print_layout(response: &LayoutResponse, summary: bool) -> Result<(), LayoutError> {
    if !summary {
        println!("{}", serde_json::to_string_pretty(response)?);
        return Ok(());
    }

    let Some(route) = response.route() else {
        println!("(no route)");
        return Ok(());
    };
    println!(
        "route {} ({} fields, {} components)",
        route.name.as_deref().unwrap_or("<unnamed>"),
        route.fields.len(),
        response.component_count()
    );
    print_placeholders(&route.placeholders, 1);
    Ok(())
}

fn print_placeholders(placeholders: &Placeholders, depth: usize) {
    let indent = "  ".repeat(depth);
    for (key, placeholder) in placeholders {
        println!("{}[{}]", indent, key);
        for item in placeholder {
            match item {
                PlaceholderItem::Component(component) => {
                    println!(
                        "{}  {} {}",
                        indent,
                        component.name.as_deref().unwrap_or("<component>"),
                        component.id
                    );
                    print_placeholders(&component.placeholders, depth + 2);
                }
                PlaceholderItem::Chrome(chrome) => println!(
                    "{}  <{} {} {}>",
                    indent,
                    chrome.chrome_type().map(|t| t.as_str()).unwrap_or("?"),
                    chrome.kind().map(|k| k.as_str()).unwrap_or("?"),
                    chrome.id().unwrap_or("")
                ),
                PlaceholderItem::Unresolved { reason } => {
                    println!("{}  (unresolved: {})", indent, reason)
                }
            }
        }
    }
}
