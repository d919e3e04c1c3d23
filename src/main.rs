// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

mod cli;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::Args;
use restsql::config::Config;
use restsql::output::QueryResult;
use restsql::rest::PostgrestClient;
use restsql::sql::QueryExecutor;

/// Initialize logging to stderr; `-v` raises the level to debug
fn init_logging(verbose: bool) {
    let filter = if verbose { "restsql=debug" } else { "restsql=warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    // Resolution order: flags > environment > config file
    let config = Config::load()?
        .apply_env()
        .apply_overrides(args.url.clone(), args.key.clone());

    let client = PostgrestClient::new(&config)?;
    let executor = QueryExecutor::new(client);

    // Batch mode: -q or -f
    if args.query.is_some() || args.file.is_some() {
        return run_batch(&args, &executor).await;
    }

    // Default: interactive REPL
    cli::repl::run_repl(executor).await
}

async fn run_batch(args: &Args, executor: &QueryExecutor<PostgrestClient>) -> Result<()> {
    let params: Vec<serde_json::Value> = args.param.iter().map(|raw| parse_param(raw)).collect();

    let statements = if let Some(query) = &args.query {
        vec![query.clone()]
    } else if let Some(file) = &args.file {
        let content = std::fs::read_to_string(file)?;
        content
            .lines()
            .filter(|l| !l.trim().is_empty() && !l.trim().starts_with("--"))
            .map(String::from)
            .collect()
    } else {
        return Ok(());
    };

    for sql in statements {
        match executor.query(&sql, &params).await {
            Ok(output) => {
                let result = QueryResult::from_rows(output.rows);
                println!("{}", result.format(&args.output, args.no_headers));
            }
            Err(e) => {
                eprintln!("Error executing query: {}", e);
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

/// CLI parameters parse as JSON where possible; bare words stay strings
fn parse_param(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}
