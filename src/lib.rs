/*
 * Copyright 2024 ArpNetworking
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! # graphite-influxdb
//!
//! Finder and reader that let a Graphite-compatible front-end browse and
//! read metrics stored in InfluxDB.
//!
//! Graphite thinks in dotted trees (`servers.web1.load`); InfluxDB 0.8 keeps
//! flat series with columns. A leaf path is a series name, a configurable
//! delimiter (`._field_` by default) and a column name, e.g.
//! `servers.web1._field_load`. Branches are the dotted prefixes of leaf paths.
//!
//! ## Features
//!
//! - **Path resolution**: `*` wildcards matched against every series/column
//! - **Fast path**: fully qualified leaf paths resolve without a database scan
//! - **Range reads**: rows normalized into `(start, end, step)` plus values
//! - **Two configuration sources**: explicit JSON mapping or `INFLUXDB_*` settings
//!
//! ## Example
//!
//! ```rust,no_run
//! use graphite_influxdb::{config::GraphiteConfig, Finder};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = GraphiteConfig::from_file("graphite.json")?;
//!     let finder = Finder::from_config(Some(&config))?;
//!
//!     let mut nodes = finder.find_nodes("servers.*.*")?;
//!     while let Some(node) = nodes.next().await? {
//!         if let Some(reader) = node.reader() {
//!             let result = reader.fetch(1_700_000_000, 1_700_003_600).await;
//!             println!("{} {:?}", node.path(), result.time_info);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod finder;
pub mod model;
pub mod reader;
pub mod testing;

pub use client::{HttpClient, InfluxClient};
pub use error::{Error, Result};
pub use finder::{FindNodes, Finder};
pub use model::{BranchNode, FetchResult, Interval, LeafNode, Node, TimeInfo};
pub use reader::SeriesReader;
