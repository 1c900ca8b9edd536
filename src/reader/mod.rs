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

//! Time-series reads for a single leaf
//!
//! Both read operations degrade to zero-valued defaults instead of failing:
//! an empty answer is easier for a Graphite front-end to render than an
//! error. Each operation has an inner `try_` variant returning `Result` and
//! a single place where the error is dropped.

use crate::client::{InfluxClient, Order};
use crate::error::{Error, Result};
use crate::model::{FetchResult, Interval, QueryResult, TimeInfo, FALLBACK_STEP};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Reader bound to one series and one value column
#[derive(Debug, Clone)]
pub struct SeriesReader {
    client: Arc<dyn InfluxClient>,
    series: String,
    value: String,
}

impl SeriesReader {
    pub fn new(client: Arc<dyn InfluxClient>, series: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            client,
            series: series.into(),
            value: value.into(),
        }
    }

    /// Series this reader queries
    pub fn series(&self) -> &str {
        &self.series
    }

    /// Value column this reader selects
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Fetch samples with `start_time < time < end_time`
    ///
    /// Returns `(0, 0, 10)` and no values when the query fails or the
    /// response is empty or malformed.
    pub async fn fetch(&self, start_time: i64, end_time: i64) -> FetchResult {
        let result = self
            .try_fetch(start_time, end_time)
            .await
            .unwrap_or_else(|err| {
                debug!(series = %self.series, value = %self.value, error = %err, "fetch degraded to empty result");
                FetchResult::default()
            });

        debug!(
            "influx REQUESTED RANGE for {}: {} to {}",
            self.series, start_time, end_time
        );
        debug!(
            "influx RETURNED  RANGE for {}: {} to {}",
            self.series, result.time_info.start, result.time_info.end
        );

        result
    }

    /// Fetch without the degrade-to-default policy
    pub async fn try_fetch(&self, start_time: i64, end_time: i64) -> Result<FetchResult> {
        let results = self
            .client
            .select_range(&self.series, &self.value, start_time, end_time)
            .await?;
        normalize(&self.series, &self.value, &results)
    }

    /// First and last known sample timestamps, `(0, 0)` on failure
    pub async fn get_known_interval(&self) -> Interval {
        self.try_get_known_interval().await.unwrap_or_else(|err| {
            debug!(series = %self.series, error = %err, "interval lookup degraded to (0, 0)");
            Interval::default()
        })
    }

    /// Interval lookup without the degrade-to-default policy
    pub async fn try_get_known_interval(&self) -> Result<Interval> {
        let last = self.client.sample_row(&self.series, Order::Descending).await?;
        let first = self.client.sample_row(&self.series, Order::Ascending).await?;

        Ok(Interval::new(
            first_timestamp(&self.series, &first)?,
            first_timestamp(&self.series, &last)?,
        ))
    }
}

/// Turn a range query response into time info and values
fn normalize(series: &str, value: &str, results: &[QueryResult]) -> Result<FetchResult> {
    let result = results
        .first()
        .ok_or_else(|| Error::malformed(series, "empty response"))?;
    if result.points.is_empty() {
        return Err(Error::malformed(series, "no points"));
    }

    let time_idx = result.column_index("time").unwrap_or(0);
    let value_idx = result
        .column_index(value)
        .ok_or_else(|| Error::malformed(series, format!("no {} column", value)))?;

    let mut timestamps = Vec::with_capacity(result.points.len());
    let mut values = Vec::with_capacity(result.points.len());
    for row in &result.points {
        timestamps.push(timestamp(series, row, time_idx)?);
        let cell = row
            .get(value_idx)
            .ok_or_else(|| Error::malformed(series, "short row"))?;
        values.push(cell.as_f64());
    }

    let start = timestamps[0];
    let end = timestamps[timestamps.len() - 1];

    // A lone sample keeps its timestamps but no spacing or values.
    let Some(second) = timestamps.get(1) else {
        return Ok(FetchResult {
            time_info: TimeInfo {
                start,
                end,
                step: FALLBACK_STEP,
            },
            values: Vec::new(),
        });
    };

    Ok(FetchResult {
        time_info: TimeInfo {
            start,
            end,
            step: second - start,
        },
        values,
    })
}

fn first_timestamp(series: &str, results: &[QueryResult]) -> Result<i64> {
    let result = results
        .first()
        .ok_or_else(|| Error::malformed(series, "empty response"))?;
    let row = result
        .points
        .first()
        .ok_or_else(|| Error::malformed(series, "no points"))?;
    timestamp(series, row, result.column_index("time").unwrap_or(0))
}

fn timestamp(series: &str, row: &[Value], idx: usize) -> Result<i64> {
    row.get(idx)
        .and_then(Value::as_i64)
        .ok_or_else(|| Error::malformed(series, "time is not an integer"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryClient;
    use serde_json::json;

    fn reader(client: MemoryClient) -> SeriesReader {
        SeriesReader::new(Arc::new(client), "servers.web1", "load")
    }

    #[tokio::test]
    async fn test_fetch_normalizes_rows() {
        let client = MemoryClient::new().with_series(
            "servers.web1",
            &["load"],
            vec![(100, vec![json!(5)]), (110, vec![json!(7)]), (120, vec![json!(9)])],
        );

        let result = reader(client).fetch(0, 1000).await;
        assert_eq!(
            result.time_info,
            TimeInfo {
                start: 100,
                end: 120,
                step: 10
            }
        );
        assert_eq!(result.values, vec![Some(5.0), Some(7.0), Some(9.0)]);
    }

    #[tokio::test]
    async fn test_fetch_bounds_are_exclusive() {
        let client = MemoryClient::new().with_series(
            "servers.web1",
            &["load"],
            vec![
                (100, vec![json!(1)]),
                (110, vec![json!(2)]),
                (120, vec![json!(3)]),
                (130, vec![json!(4)]),
            ],
        );

        let result = reader(client).fetch(100, 130).await;
        assert_eq!(result.time_info.start, 110);
        assert_eq!(result.time_info.end, 120);
        assert_eq!(result.values, vec![Some(2.0), Some(3.0)]);
    }

    #[tokio::test]
    async fn test_fetch_selects_bound_column_and_keeps_gaps() {
        let client = MemoryClient::new().with_series(
            "servers.web1",
            &["cpu", "load"],
            vec![
                (60, vec![json!(90), json!(0.5)]),
                (120, vec![json!(91), json!(null)]),
            ],
        );

        let result = reader(client).fetch(0, 1000).await;
        assert_eq!(result.time_info.step, 60);
        assert_eq!(result.values, vec![Some(0.5), None]);
    }

    #[tokio::test]
    async fn test_fetch_single_row_keeps_time_but_drops_values() {
        let client = MemoryClient::new().with_series(
            "servers.web1",
            &["load"],
            vec![(100, vec![json!(5)])],
        );

        let result = reader(client).fetch(0, 1000).await;
        assert_eq!(
            result.time_info,
            TimeInfo {
                start: 100,
                end: 100,
                step: 10
            }
        );
        assert!(result.values.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_quotes_dotted_columns() {
        let client = Arc::new(MemoryClient::new().with_series(
            "a.b",
            &["x.y"],
            vec![(100, vec![json!(1)]), (110, vec![json!(2)])],
        ));
        let reader = SeriesReader::new(Arc::clone(&client) as Arc<dyn InfluxClient>, "a.b", "x.y");

        assert_eq!(reader.fetch(0, 1000).await.values, vec![Some(1.0), Some(2.0)]);
        assert_eq!(
            client.calls(),
            vec![r#"select time, "x.y" from "a.b" where time > 0s and time < 1000s order asc"#.to_string()]
        );
    }

    #[tokio::test]
    async fn test_fetch_degrades_on_empty_range() {
        let client = MemoryClient::new().with_series(
            "servers.web1",
            &["load"],
            vec![(100, vec![json!(5)])],
        );

        let result = reader(client).fetch(500, 1000).await;
        assert_eq!(result, FetchResult::default());
    }

    #[tokio::test]
    async fn test_fetch_degrades_on_query_failure() {
        let client = MemoryClient::new()
            .with_series("servers.web1", &["load"], vec![(100, vec![json!(5)])])
            .failing();

        let reader = reader(client);
        assert!(reader.try_fetch(0, 1000).await.is_err());
        assert_eq!(reader.fetch(0, 1000).await, FetchResult::default());
    }

    #[test]
    fn test_normalize_rejects_malformed_results() {
        assert!(normalize("s", "load", &[]).is_err());

        let missing_column = QueryResult {
            name: "s".to_string(),
            columns: vec!["time".to_string(), "sequence_number".to_string(), "cpu".to_string()],
            points: vec![vec![json!(100), json!(1), json!(5)]],
        };
        assert!(normalize("s", "load", &[missing_column]).is_err());

        let bad_time = QueryResult {
            name: "s".to_string(),
            columns: vec!["time".to_string(), "sequence_number".to_string(), "load".to_string()],
            points: vec![vec![json!("noon"), json!(1), json!(5)]],
        };
        assert!(normalize("s", "load", &[bad_time]).is_err());
    }

    #[tokio::test]
    async fn test_known_interval() {
        let client = MemoryClient::new().with_series(
            "servers.web1",
            &["load"],
            vec![(50, vec![json!(1)]), (200, vec![json!(2)]), (500, vec![json!(3)])],
        );

        assert_eq!(reader(client).get_known_interval().await, Interval::new(50, 500));
    }

    #[tokio::test]
    async fn test_known_interval_degrades() {
        let empty = MemoryClient::new().with_series("servers.web1", &["load"], vec![]);
        assert_eq!(reader(empty).get_known_interval().await, Interval::new(0, 0));

        let failing = MemoryClient::new()
            .with_series("servers.web1", &["load"], vec![(50, vec![json!(1)])])
            .failing();
        assert_eq!(reader(failing).get_known_interval().await, Interval::new(0, 0));
    }
}
