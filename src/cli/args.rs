// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use clap::Parser;

use restsql::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "restsql")]
#[command(author, version, about = "Query a PostgREST backend using SQL")]
pub struct Args {
    /// Execute a SQL statement directly
    #[arg(short, long)]
    pub query: Option<String>,

    /// Execute statements from a file, one per line
    #[arg(short, long)]
    pub file: Option<String>,

    /// Positional parameter for $n placeholders; repeatable, parsed as
    /// JSON with plain-string fallback. Example: -p 5 -p true -p male
    #[arg(short, long = "param", value_name = "VALUE")]
    pub param: Vec<String>,

    /// Backend base URL (overrides config and RESTSQL_URL)
    #[arg(long)]
    pub url: Option<String>,

    /// Backend API key (overrides config and RESTSQL_KEY)
    #[arg(long)]
    pub key: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: OutputFormat,

    /// Omit column headers in output
    #[arg(long)]
    pub no_headers: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}
