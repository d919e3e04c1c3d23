// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! restsql - run a bounded SQL subset against PostgREST-style table APIs.
//!
//! One parameterized SELECT / INSERT / UPDATE / DELETE statement becomes
//! exactly one REST table request:
//!
//! ```no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use restsql::config::Config;
//! use restsql::rest::PostgrestClient;
//! use restsql::sql::QueryExecutor;
//!
//! let config = Config::load()?.apply_env();
//! let executor = QueryExecutor::new(PostgrestClient::new(&config)?);
//!
//! let output = executor
//!     .query(
//!         "SELECT * FROM hair_styles WHERE gender = $1 ORDER BY sort_order ASC",
//!         &[serde_json::json!("male")],
//!     )
//!     .await?;
//! println!("{} rows", output.rows.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod output;
pub mod rest;
pub mod sql;

pub use error::QueryError;
pub use rest::{BackendError, PostgrestClient, TableBackend, TableRequest};
pub use sql::{QueryExecutor, QueryOutput};
