use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use http::Method;
use serde_json::Value;

use crate::cache::FileStore;
use crate::dispatcher::cors;
use crate::logging::init_logging;
use crate::manifest::load_manifest;
use crate::router::{RouteTable, ROUTE_CACHE_KEY};
use crate::server::normalize_path;

/// Command-line interface for restserver route tables
#[derive(Parser)]
#[command(name = "restserver")]
#[command(about = "Compile, inspect and query restserver route tables", long_about = None)]
pub struct Cli {
    /// Log level: trace/debug/info/warn/error
    #[arg(long, global = true, env = "RESTSRV_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Compile a manifest into a route table and write it to the cache
    Build {
        /// Manifest file (YAML, JSON or TOML)
        #[arg(short, long)]
        manifest: PathBuf,

        /// Directory of the route cache
        #[arg(long, env = "RESTSRV_CACHE_DIR")]
        cache_dir: PathBuf,

        /// URL prefix, used when the manifest does not name one
        #[arg(long, default_value = "")]
        root: String,
    },
    /// Print every route of a cached table
    Routes {
        /// Directory of the route cache
        #[arg(long, env = "RESTSRV_CACHE_DIR")]
        cache_dir: PathBuf,
    },
    /// Show which handler a request would reach
    Match {
        /// Directory of the route cache
        #[arg(long, env = "RESTSRV_CACHE_DIR")]
        cache_dir: PathBuf,

        /// HTTP method, e.g. GET
        method: String,

        /// Request URI, e.g. /users/42?x=1
        uri: String,
    },
}

/// Parse the command line and run it
///
/// # Errors
///
/// Whatever the selected command reports.
pub fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;
    let stdout = std::io::stdout();
    run_command(&cli.command, &mut stdout.lock())
}

/// Run a parsed command, writing its report to `out`
///
/// # Errors
///
/// Unreadable manifests or caches, invalid routes, an unknown method, or a
/// failed write to `out`.
pub fn run_command(command: &Commands, out: &mut dyn Write) -> anyhow::Result<()> {
    match command {
        Commands::Build {
            manifest,
            cache_dir,
            root,
        } => {
            let table = load_manifest(manifest)?.route_table(root)?;
            let store = FileStore::new(cache_dir.as_path());
            table.persist(&store)?;
            writeln!(
                out,
                "Wrote {} routes to {}",
                table.len(),
                store.path_for(ROUTE_CACHE_KEY).display()
            )?;
        }
        Commands::Routes { cache_dir } => {
            let table = cached_table(cache_dir)?;
            writeln!(out, "{} routes", table.len())?;
            for route in table.routes() {
                writeln!(out, "{route}")?;
            }
        }
        Commands::Match {
            cache_dir,
            method,
            uri,
        } => {
            let table = cached_table(cache_dir)?;
            let method = Method::from_bytes(method.to_uppercase().as_bytes())
                .map_err(|_| anyhow!("Invalid HTTP method: {method}"))?;
            let path = normalize_path(uri);

            match table.route(&method, &path, None) {
                Some(matched) => {
                    writeln!(out, "handler: {}", matched.handler())?;
                    writeln!(out, "pattern: {}", matched.route.pattern)?;
                    for (name, value) in &matched.path_params {
                        writeln!(out, "param {name} = {value}")?;
                    }
                    writeln!(out, "args: {}", Value::Array(matched.args.to_values()))?;
                }
                None if method == Method::OPTIONS => {
                    let allowed = cors::allowed_methods(&table, &path)
                        .iter()
                        .map(Method::as_str)
                        .collect::<Vec<_>>()
                        .join(",");
                    writeln!(out, "preflight: {allowed}")?;
                }
                None => writeln!(out, "no route for {method} /{path}")?,
            }
        }
    }
    Ok(())
}

fn cached_table(cache_dir: &Path) -> anyhow::Result<RouteTable> {
    RouteTable::load_from_cache(&FileStore::new(cache_dir))?
        .with_context(|| format!("No route table cached in {}", cache_dir.display()))
}
