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

//! Database access for the finder and reader
//!
//! The finder and reader only ever issue three shapes of query. They are
//! expressed as the [`InfluxClient`] trait so the HTTP implementation can be
//! swapped for an in-memory one.

use crate::error::{Error, Result};
use crate::model::QueryResult;
use async_trait::async_trait;
use std::fmt;

pub mod http;

pub use http::HttpClient;

/// Table name InfluxDB 0.8 uses for `list series` output
const LIST_SERIES_RESULT: &str = "list_series_result";

/// Time ordering of a sample query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Ascending,
    Descending,
}

/// The queries the finder and reader need from InfluxDB
#[async_trait]
pub trait InfluxClient: Send + Sync + fmt::Debug {
    /// Names of every series in the database
    async fn list_series(&self) -> Result<Vec<String>>;

    /// All columns of a single row of `series`, newest or oldest first
    async fn sample_row(&self, series: &str, order: Order) -> Result<Vec<QueryResult>>;

    /// `time` and `value` of `series` with `start < time < end`, ascending
    async fn select_range(
        &self,
        series: &str,
        value: &str,
        start: i64,
        end: i64,
    ) -> Result<Vec<QueryResult>>;
}

pub fn list_series_query() -> &'static str {
    "list series"
}

/// `select * from "<series>" limit 1`, InfluxDB defaults to descending order
pub fn sample_row_query(series: &str, order: Order) -> String {
    match order {
        Order::Descending => format!("select * from {} limit 1", quote_name(series)),
        Order::Ascending => format!("select * from {} limit 1 order asc", quote_name(series)),
    }
}

/// Both bounds are exclusive.
pub fn range_query(series: &str, value: &str, start: i64, end: i64) -> String {
    format!(
        "select time, {} from {} where time > {}s and time < {}s order asc",
        quote_name(value),
        quote_name(series),
        start,
        end
    )
}

/// Series and column names may contain dots and other punctuation
pub fn quote_name(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\\\""))
}

/// Extract series names from a `list series` response
///
/// InfluxDB 0.8 answers with a single `list_series_result` table holding the
/// names in its `name` column; older servers answer with one empty table per
/// series.
pub fn series_names(results: Vec<QueryResult>) -> Result<Vec<String>> {
    let mut names = Vec::new();

    for result in results {
        if result.name != LIST_SERIES_RESULT {
            names.push(result.name);
            continue;
        }

        let idx = result
            .column_index("name")
            .ok_or_else(|| Error::malformed(LIST_SERIES_RESULT, "no name column"))?;
        for row in &result.points {
            let name = row
                .get(idx)
                .and_then(|v| v.as_str())
                .ok_or_else(|| Error::malformed(LIST_SERIES_RESULT, "series name is not a string"))?;
            names.push(name.to_string());
        }
    }

    Ok(names)
}
