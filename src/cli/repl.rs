// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use anyhow::Result;
use console::{Style, style};
use indicatif::{ProgressBar, ProgressStyle};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::{CmdKind, Highlighter};
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Context, Editor, Helper};
use std::borrow::Cow;
use std::time::Instant;

use restsql::config;
use restsql::output::QueryResult;
use restsql::rest::PostgrestClient;
use restsql::sql::QueryExecutor;

const KEYWORDS: &[&str] = &[
    "SELECT", "FROM", "WHERE", "ORDER", "BY", "LIMIT", "AND", "ASC", "DESC", "IN", "LIKE", "NULL",
    "TRUE", "FALSE", "INSERT", "INTO", "VALUES", "UPDATE", "SET", "DELETE", "RETURNING", "DEFAULT",
];

struct SqlHelper;

impl Helper for SqlHelper {}

impl Hinter for SqlHelper {
    type Hint = String;

    fn hint(&self, _line: &str, _pos: usize, _ctx: &Context<'_>) -> Option<Self::Hint> {
        None
    }
}

impl Validator for SqlHelper {
    fn validate(&self, _ctx: &mut ValidationContext<'_>) -> rustyline::Result<ValidationResult> {
        Ok(ValidationResult::Valid(None))
    }
}

impl Completer for SqlHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &rustyline::Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line_to_cursor = &line[..pos];

        // Find the start of the current word
        let word_start = line_to_cursor
            .rfind(|c: char| c.is_whitespace() || c == ',' || c == '(' || c == '=')
            .map(|i| i + 1)
            .unwrap_or(0);

        let prefix = &line_to_cursor[word_start..];
        if prefix.is_empty() {
            return Ok((pos, vec![]));
        }

        let prefix_upper = prefix.to_uppercase();
        let matches: Vec<Pair> = KEYWORDS
            .iter()
            .filter(|kw| kw.starts_with(&prefix_upper))
            .map(|kw| Pair {
                display: kw.to_string(),
                replacement: kw.to_string(),
            })
            .collect();

        Ok((word_start, matches))
    }
}

impl Highlighter for SqlHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        // Simple SQL keyword highlighting
        let mut result = line.to_string();

        for &kw in KEYWORDS {
            // Case-insensitive replacement with colored version
            let re = regex::RegexBuilder::new(&format!(r"\b{}\b", regex::escape(kw)))
                .case_insensitive(true)
                .build()
                .unwrap();
            result = re
                .replace_all(&result, |_caps: &regex::Captures| {
                    format!("\x1b[1;34m{}\x1b[0m", kw)
                })
                .to_string();
        }

        Cow::Owned(result)
    }

    fn highlight_prompt<'b, 's: 'b, 'p: 'b>(&'s self, prompt: &'p str, _default: bool) -> Cow<'b, str> {
        Cow::Owned(format!("\x1b[1;32m{}\x1b[0m", prompt))
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _kind: CmdKind) -> bool {
        true
    }
}

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.cyan} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}

fn print_welcome() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        "{} {} - Query PostgREST with SQL",
        style("restsql").cyan().bold(),
        style(format!("v{}", version)).dim()
    );
    println!(
        "{}",
        style("Type 'help' for commands, Ctrl+D to exit").dim()
    );
    println!();
}

fn print_help() {
    let help_style = Style::new().cyan();
    let cmd_style = Style::new().yellow();

    println!("{}", help_style.apply_to("Statements:"));
    println!(
        "  {}",
        cmd_style.apply_to("SELECT * FROM hair_styles WHERE gender = 'male' ORDER BY sort_order")
    );
    println!(
        "  {}",
        cmd_style.apply_to("INSERT INTO hair_colors (color_name, gender) VALUES ('Copper', 'female') RETURNING *")
    );
    println!(
        "  {}",
        cmd_style.apply_to("UPDATE hair_styles SET is_premium = true WHERE id = 5")
    );
    println!(
        "  {}",
        cmd_style.apply_to("DELETE FROM face_analyses WHERE id = 'abc-123' RETURNING *")
    );
    println!();
    println!("{}", help_style.apply_to("Notes:"));
    println!("  WHERE clauses are flat AND conjunctions of column/value comparisons.");
    println!("  Mutations without RETURNING run but print no rows.");
    println!();
    println!("{}", help_style.apply_to("Shortcuts:"));
    println!("  {} - Clear screen", cmd_style.apply_to("\\c"));
    println!("  {} - Quit", cmd_style.apply_to("\\q"));
    println!();
}

pub async fn run_repl(executor: QueryExecutor<PostgrestClient>) -> Result<()> {
    let helper = SqlHelper;
    let config = rustyline::Config::builder()
        .auto_add_history(true)
        .max_history_size(1000)?
        .build();

    let mut rl: Editor<SqlHelper, DefaultHistory> = Editor::with_config(config)?;
    rl.set_helper(Some(helper));

    // Load history
    let history_path = config::base_dir()
        .map(|p| p.join("history"))
        .unwrap_or_else(|_| ".restsql_history".into());
    let _ = rl.load_history(&history_path);

    print_welcome();

    loop {
        let prompt = format!("{}> ", style("restsql").green().bold());

        match rl.readline(&prompt) {
            Ok(line) => {
                let input = line.trim();

                if input.is_empty() {
                    continue;
                }

                // Handle special commands
                let lower = input.to_lowercase();
                if lower == "quit" || lower == "exit" || lower == "\\q" {
                    println!("{}", style("Goodbye!").dim());
                    break;
                }
                if lower == "help" || lower == "\\?" {
                    print_help();
                    continue;
                }
                if lower == "clear" || lower == "\\c" {
                    print!("\x1B[2J\x1B[1;1H"); // Clear screen
                    continue;
                }

                // Execute with spinner
                let spinner = create_spinner("Executing query...");
                let start = Instant::now();

                match executor.query(input, &[]).await {
                    Ok(output) => {
                        spinner.finish_and_clear();
                        let elapsed = start.elapsed();
                        let result = QueryResult::from_rows(output.rows);

                        if result.is_empty() {
                            println!("{}", style("(0 rows)").dim());
                        } else {
                            println!(
                                "{}",
                                result.format(&restsql::output::OutputFormat::Table, false)
                            );
                            println!(
                                "{}",
                                style(format!("({:.2}s)", elapsed.as_secs_f64())).dim()
                            );
                        }
                    }
                    Err(e) => {
                        spinner.finish_and_clear();
                        println!("{} {}", style("Error:").red().bold(), style(e).red());
                    }
                }
                println!();
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", style("^C").dim());
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("{}", style("Goodbye!").dim());
                break;
            }
            Err(err) => {
                println!("{} {:?}", style("Error:").red().bold(), err);
                break;
            }
        }
    }

    // Save history
    let _ = rl.save_history(&history_path);

    Ok(())
}
