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

//! Core data model shared by the finder and the reader
//!
//! Defines the node tree handed to the Graphite front-end, the normalized
//! time-series shapes the reader produces, and the raw tabular result shape
//! returned by InfluxDB.

use crate::reader::SeriesReader;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Step reported when the spacing of samples cannot be derived
pub const FALLBACK_STEP: i64 = 10;

/// Column names InfluxDB attaches to every series that never name a value
pub const HIDDEN_COLUMNS: [&str; 2] = ["time", "sequence_number"];

/// A node of the metric tree produced by path resolution
#[derive(Debug, Clone)]
pub enum Node {
    /// Queryable metric: one series and one value column
    Leaf(LeafNode),
    /// Intermediate level of the dotted namespace
    Branch(BranchNode),
}

impl Node {
    /// Full dotted path of this node
    pub fn path(&self) -> &str {
        match self {
            Node::Leaf(leaf) => &leaf.path,
            Node::Branch(branch) => &branch.path,
        }
    }

    /// Last dotted segment of the path
    pub fn name(&self) -> &str {
        let path = self.path();
        path.rsplit('.').next().unwrap_or(path)
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    /// Reader attached to a leaf, `None` for branches
    pub fn reader(&self) -> Option<&SeriesReader> {
        match self {
            Node::Leaf(leaf) => Some(&leaf.reader),
            Node::Branch(_) => None,
        }
    }
}

/// Terminal node with a reader bound to its series and value column
#[derive(Debug, Clone)]
pub struct LeafNode {
    /// Full path: series name, delimiter, value column
    pub path: String,

    /// Reader bound to this leaf's series and value
    pub reader: SeriesReader,
}

/// Non-terminal path prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchNode {
    pub path: String,
}

/// Sample spacing metadata for a fetched range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeInfo {
    /// Timestamp of the first returned sample
    pub start: i64,

    /// Timestamp of the last returned sample
    pub end: i64,

    /// Seconds between consecutive samples
    pub step: i64,
}

impl Default for TimeInfo {
    fn default() -> Self {
        Self {
            start: 0,
            end: 0,
            step: FALLBACK_STEP,
        }
    }
}

/// Normalized result of a range fetch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchResult {
    pub time_info: TimeInfo,

    /// Values in ascending time order, `None` where the cell was not numeric
    pub values: Vec<Option<f64>>,
}

/// First and last known sample timestamps of a leaf
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub start: i64,
    pub end: i64,
}

impl Interval {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }
}

/// One table of an InfluxDB 0.8 query response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Series name
    pub name: String,

    /// Column names, `time` and `sequence_number` included
    #[serde(default)]
    pub columns: Vec<String>,

    /// Rows, each aligned with `columns`
    #[serde(default)]
    pub points: Vec<Vec<Value>>,
}

impl QueryResult {
    /// Position of a column by name
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Column names that can carry values
    pub fn value_columns(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .map(String::as_str)
            .filter(|c| !HIDDEN_COLUMNS.contains(c))
    }
}
