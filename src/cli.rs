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

//! Command-line front end
//!
//! Answers the same questions a Graphite front-end asks the finder, and
//! prints the answers in the JSON shapes graphite-api uses.

use crate::finder::Finder;
use crate::model::Node;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;

/// Browse and read Graphite metrics stored in InfluxDB
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// JSON configuration file; INFLUXDB_* settings are used without it
    #[arg(short, long, global = true, env = "GRAPHITE_INFLUXDB_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log at DEBUG instead of INFO
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List nodes matching a path pattern
    Find { pattern: String },

    /// Fetch datapoints for every matching leaf
    Fetch {
        pattern: String,

        /// Epoch seconds, RFC 3339 timestamp, or `now`
        #[arg(value_parser = parse_time)]
        from: i64,

        /// Epoch seconds, RFC 3339 timestamp, or `now`
        #[arg(value_parser = parse_time)]
        until: i64,
    },

    /// Show the known interval of every matching leaf
    Interval { pattern: String },
}

/// Epoch seconds, an RFC 3339 timestamp, or `now`
pub fn parse_time(s: &str) -> Result<i64> {
    let s = s.trim();
    if s == "now" {
        return Ok(Utc::now().timestamp());
    }
    if let Ok(seconds) = s.parse::<i64>() {
        return Ok(seconds);
    }
    let time = DateTime::parse_from_rfc3339(s).with_context(|| format!("Invalid time: {}", s))?;
    Ok(time.timestamp())
}

#[derive(Debug, Serialize)]
struct FindResponse {
    metrics: Vec<MetricEntry>,
}

#[derive(Debug, Serialize)]
struct MetricEntry {
    path: String,
    name: String,
    is_leaf: bool,
}

#[derive(Debug, Serialize)]
struct RenderSeries {
    target: String,
    start: i64,
    end: i64,
    step: i64,
    values: Vec<Option<f64>>,
}

#[derive(Debug, Serialize)]
struct IntervalEntry {
    path: String,
    start: i64,
    end: i64,
}

/// Run `command` and return the JSON document to print
pub async fn run(finder: &Finder, command: &Command) -> Result<Value> {
    match command {
        Command::Find { pattern } => {
            let nodes = finder.find_nodes(pattern)?.collect().await?;
            let metrics = nodes
                .iter()
                .map(|node| MetricEntry {
                    path: node.path().to_string(),
                    name: node.name().to_string(),
                    is_leaf: node.is_leaf(),
                })
                .collect();
            Ok(serde_json::to_value(FindResponse { metrics })?)
        }
        Command::Fetch {
            pattern,
            from,
            until,
        } => {
            let mut series = Vec::new();
            for node in leaves(finder, pattern).await? {
                if let Node::Leaf(leaf) = node {
                    let result = leaf.reader.fetch(*from, *until).await;
                    series.push(RenderSeries {
                        target: leaf.path,
                        start: result.time_info.start,
                        end: result.time_info.end,
                        step: result.time_info.step,
                        values: result.values,
                    });
                }
            }
            Ok(serde_json::to_value(series)?)
        }
        Command::Interval { pattern } => {
            let mut intervals = Vec::new();
            for node in leaves(finder, pattern).await? {
                if let Node::Leaf(leaf) = node {
                    let interval = leaf.reader.get_known_interval().await;
                    intervals.push(IntervalEntry {
                        path: leaf.path,
                        start: interval.start,
                        end: interval.end,
                    });
                }
            }
            Ok(serde_json::to_value(intervals)?)
        }
    }
}

async fn leaves(finder: &Finder, pattern: &str) -> Result<Vec<Node>> {
    let nodes = finder.find_nodes(pattern)?.collect().await?;
    Ok(nodes.into_iter().filter(Node::is_leaf).collect())
}
