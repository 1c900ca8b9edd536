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

//! Error types for InfluxDB access and path resolution

use thiserror::Error;

/// Result type alias for finder and reader operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while talking to InfluxDB or resolving a path pattern
#[derive(Debug, Error)]
pub enum Error {
    /// Transport-level failure (connect, timeout, body read)
    #[error("influxdb request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// InfluxDB answered with a non-success status
    #[error("influxdb returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body was not the expected JSON
    #[error("failed to decode influxdb response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The path pattern could not be compiled into a matcher
    #[error("invalid path pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A query result did not have the expected shape
    #[error("malformed result for series {series:?}: {reason}")]
    Malformed { series: String, reason: String },
}

impl Error {
    pub(crate) fn malformed(series: &str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            series: series.to_string(),
            reason: reason.into(),
        }
    }
}
