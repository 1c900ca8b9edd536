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

//! Path resolution over the flat series/column namespace
//!
//! InfluxDB has no tree, only series with columns. A leaf path is the series
//! name, the leaf/value delimiter, and a column name; branches are the dotted
//! prefixes of those leaf paths.

use crate::client::{HttpClient, InfluxClient, Order};
use crate::config::{GraphiteConfig, InfluxdbConfig};
use crate::error::Result;
use crate::model::{BranchNode, LeafNode, Node};
use crate::reader::SeriesReader;
use ahash::{HashSet, HashSetExt};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info};

pub mod pattern;

pub use pattern::PathPattern;

/// Resolves Graphite path patterns into leaf and branch nodes
#[derive(Debug, Clone)]
pub struct Finder {
    client: Arc<dyn InfluxClient>,
    leaf_value_delimiter: String,
}

impl Finder {
    /// Connect to the InfluxDB described by `config`
    pub fn new(config: &InfluxdbConfig) -> Result<Self> {
        let client = HttpClient::new(config)?;
        Ok(Self::with_client(Arc::new(client), &config.leafvaluedelimiter))
    }

    /// Resolve configuration from the explicit mapping or the environment,
    /// then connect
    pub fn from_config(explicit: Option<&GraphiteConfig>) -> anyhow::Result<Self> {
        let config = InfluxdbConfig::resolve(explicit)?;
        Ok(Self::new(&config)?)
    }

    pub fn with_client(client: Arc<dyn InfluxClient>, leaf_value_delimiter: impl Into<String>) -> Self {
        Self {
            client,
            leaf_value_delimiter: leaf_value_delimiter.into(),
        }
    }

    pub fn leaf_value_delimiter(&self) -> &str {
        &self.leaf_value_delimiter
    }

    /// Start resolving `pattern`
    ///
    /// A pattern containing the delimiter and no `*` names exactly one leaf
    /// and is answered without touching the database. Anything else is
    /// matched against every series and column, lazily, as the returned
    /// sequence is pulled.
    pub fn find_nodes(&self, pattern: &str) -> Result<FindNodes> {
        if pattern.contains(self.leaf_value_delimiter.as_str()) && !pattern.contains('*') {
            let mut pending = VecDeque::with_capacity(1);
            pending.push_back(self.leaf(pattern));
            return Ok(FindNodes {
                finder: self.clone(),
                pending,
                scan: None,
            });
        }

        let pattern = PathPattern::compile(pattern, &self.leaf_value_delimiter)?;
        info!(pattern = pattern.pattern(), regex = pattern.regex(), "searching for nodes");

        Ok(FindNodes {
            finder: self.clone(),
            pending: VecDeque::new(),
            scan: Some(Scan {
                pattern,
                series: None,
                seen_branches: HashSet::new(),
            }),
        })
    }

    /// Leaf for a full path, split on the last delimiter
    fn leaf(&self, path: &str) -> Node {
        let (series, value) = path
            .rsplit_once(self.leaf_value_delimiter.as_str())
            .unwrap_or((path, ""));
        self.leaf_for(path.to_string(), series, value)
    }

    fn leaf_for(&self, path: String, series: &str, value: &str) -> Node {
        Node::Leaf(LeafNode {
            path,
            reader: SeriesReader::new(Arc::clone(&self.client), series, value),
        })
    }
}

/// Lazy, single-pass sequence of nodes matching one pattern
#[derive(Debug)]
pub struct FindNodes {
    finder: Finder,
    pending: VecDeque<Node>,
    scan: Option<Scan>,
}

/// Namespace walk state for the general path
#[derive(Debug)]
struct Scan {
    pattern: PathPattern,
    /// Remaining series, listed on the first pull
    series: Option<std::vec::IntoIter<String>>,
    /// Branch names already considered in this resolution
    seen_branches: HashSet<String>,
}

impl FindNodes {
    /// Next matching node, scanning one more series when needed
    ///
    /// A database error ends the sequence.
    pub async fn next(&mut self) -> Result<Option<Node>> {
        loop {
            if let Some(node) = self.pending.pop_front() {
                return Ok(Some(node));
            }

            let Some(scan) = self.scan.as_mut() else {
                return Ok(None);
            };

            match scan.advance(&self.finder, &mut self.pending).await {
                Ok(true) => {}
                Ok(false) => self.scan = None,
                Err(err) => {
                    self.scan = None;
                    return Err(err);
                }
            }
        }
    }

    /// Drain the sequence
    pub async fn collect(mut self) -> Result<Vec<Node>> {
        let mut nodes = Vec::new();
        while let Some(node) = self.next().await? {
            nodes.push(node);
        }
        Ok(nodes)
    }
}

impl Scan {
    /// Scan one series into `out`; `false` once every series is done
    async fn advance(&mut self, finder: &Finder, out: &mut VecDeque<Node>) -> Result<bool> {
        if self.series.is_none() {
            let names = finder.client.list_series().await?;
            debug!(count = names.len(), "listed series");
            self.series = Some(names.into_iter());
        }

        let Some(series) = self.series.as_mut().and_then(Iterator::next) else {
            return Ok(false);
        };

        let sample = finder.client.sample_row(&series, Order::Descending).await?;

        let mut candidates = Vec::new();
        for result in &sample {
            for column in result.value_columns() {
                let name = format!("{}{}{}", series, finder.leaf_value_delimiter, column);
                if self.pattern.is_match(&name) {
                    debug!(name = %name, "found leaf");
                    out.push_back(finder.leaf_for(name.clone(), &series, column));
                }
                candidates.push(name);
            }
        }

        for candidate in &candidates {
            let mut name = candidate.as_str();
            while let Some((parent, _)) = name.rsplit_once('.') {
                name = parent;
                if !self.seen_branches.insert(name.to_string()) {
                    continue;
                }
                if self.pattern.is_match(name) {
                    debug!(name, "found branch");
                    out.push_back(Node::Branch(BranchNode {
                        path: name.to_string(),
                    }));
                }
            }
        }

        Ok(true)
    }
}
