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

//! In-memory [`InfluxClient`] for exercising the finder and reader without
//! a running InfluxDB.
//!
//! Answers the same three query shapes with the same result layout InfluxDB
//! 0.8 uses, and records the query text of every call.

use crate::client::{list_series_query, range_query, sample_row_query, InfluxClient, Order};
use crate::error::{Error, Result};
use crate::model::QueryResult;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug)]
struct MemorySeries {
    name: String,
    columns: Vec<String>,
    /// Sorted ascending by time
    rows: Vec<(i64, Vec<Value>)>,
}

/// Series held in memory, listed in insertion order
#[derive(Debug, Default)]
pub struct MemoryClient {
    series: Vec<MemorySeries>,
    fail: bool,
    calls: Mutex<Vec<String>>,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a series with value `columns`; each row is `(time, values)`
    pub fn with_series(mut self, name: &str, columns: &[&str], mut rows: Vec<(i64, Vec<Value>)>) -> Self {
        rows.sort_by_key(|(time, _)| *time);
        self.series.push(MemorySeries {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        });
        self
    }

    /// Make every query fail with a server error
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Query text of every call so far
    pub fn calls(&self) -> Vec<String> {
        self.lock_calls().clone()
    }

    /// Number of `list series` queries so far
    pub fn list_series_calls(&self) -> usize {
        self.lock_calls()
            .iter()
            .filter(|q| q.as_str() == list_series_query())
            .count()
    }

    fn lock_calls(&self) -> MutexGuard<'_, Vec<String>> {
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, query: String) -> Result<()> {
        self.lock_calls().push(query);
        if self.fail {
            return Err(Error::Status {
                status: 500,
                body: "memory client configured to fail".to_string(),
            });
        }
        Ok(())
    }

    fn find(&self, name: &str) -> Result<&MemorySeries> {
        self.series
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| Error::Status {
                status: 400,
                body: format!("Couldn't find series: {}", name),
            })
    }
}

#[async_trait]
impl InfluxClient for MemoryClient {
    async fn list_series(&self) -> Result<Vec<String>> {
        self.record(list_series_query().to_string())?;
        Ok(self.series.iter().map(|s| s.name.clone()).collect())
    }

    async fn sample_row(&self, series: &str, order: Order) -> Result<Vec<QueryResult>> {
        self.record(sample_row_query(series, order))?;
        let found = self.find(series)?;

        let picked = match order {
            Order::Ascending => found.rows.iter().enumerate().next(),
            Order::Descending => found.rows.iter().enumerate().next_back(),
        };
        let Some((seq, (time, values))) = picked else {
            return Ok(Vec::new());
        };

        let mut columns = vec!["time".to_string(), "sequence_number".to_string()];
        columns.extend(found.columns.iter().cloned());
        let mut point = vec![Value::from(*time), Value::from(seq as u64 + 1)];
        point.extend(values.iter().cloned());

        Ok(vec![QueryResult {
            name: found.name.clone(),
            columns,
            points: vec![point],
        }])
    }

    async fn select_range(
        &self,
        series: &str,
        value: &str,
        start: i64,
        end: i64,
    ) -> Result<Vec<QueryResult>> {
        self.record(range_query(series, value, start, end))?;
        let found = self.find(series)?;
        let idx = found
            .columns
            .iter()
            .position(|c| c == value)
            .ok_or_else(|| Error::Status {
                status: 400,
                body: format!("Field {} doesn't exist in series {}", value, series),
            })?;

        let points: Vec<Vec<Value>> = found
            .rows
            .iter()
            .enumerate()
            .filter(|(_, (time, _))| start < *time && *time < end)
            .map(|(seq, (time, values))| {
                vec![
                    Value::from(*time),
                    Value::from(seq as u64 + 1),
                    values.get(idx).cloned().unwrap_or(Value::Null),
                ]
            })
            .collect();

        if points.is_empty() {
            return Ok(Vec::new());
        }

        Ok(vec![QueryResult {
            name: found.name.clone(),
            columns: vec!["time".to_string(), "sequence_number".to_string(), value.to_string()],
            points,
        }])
    }
}
