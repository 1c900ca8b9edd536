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

//! Configuration parsing and resolution
//!
//! Connection settings come from one of two sources: an explicit mapping
//! (the `influxdb` section of a JSON document) or, when no mapping is given,
//! the process-wide `INFLUXDB_*` settings in the environment.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration document
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GraphiteConfig {
    /// InfluxDB connection section
    #[serde(default)]
    pub influxdb: InfluxdbConfig,
}

/// InfluxDB connection and path layout settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct InfluxdbConfig {
    /// InfluxDB host name
    #[serde(default = "default_host")]
    pub host: String,

    /// InfluxDB HTTP API port
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_user")]
    pub user: String,

    #[serde(default = "default_pass")]
    pub pass: String,

    /// Database holding the Graphite series
    #[serde(default = "default_db")]
    pub db: String,

    /// Token separating the series name from the value column in a leaf path
    #[serde(default = "default_leaf_value_delimiter")]
    pub leafvaluedelimiter: String,

    /// Per request timeout
    #[serde(default = "default_timeout", with = "duration_serde")]
    pub timeout: Duration,
}

impl GraphiteConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_json(&contents)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Parse configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("Failed to parse configuration")?;
        config.influxdb.validate()?;
        Ok(config)
    }
}

impl InfluxdbConfig {
    /// Pick the explicit mapping when there is one, the environment otherwise
    pub fn resolve(explicit: Option<&GraphiteConfig>) -> Result<Self> {
        match explicit {
            Some(config) => Ok(config.influxdb.clone()),
            None => Self::from_env(),
        }
    }

    /// Read `INFLUXDB_*` settings from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_settings(|key| std::env::var(key).ok())
    }

    /// Read `INFLUXDB_*` settings through `lookup`, defaulting what is unset
    pub fn from_settings<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = lookup("INFLUXDB_HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("INFLUXDB_PORT") {
            config.port = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid INFLUXDB_PORT: {}", port))?;
        }
        if let Some(user) = lookup("INFLUXDB_USER") {
            config.user = user;
        }
        if let Some(pass) = lookup("INFLUXDB_PASS") {
            config.pass = pass;
        }
        if let Some(db) = lookup("INFLUXDB_DB") {
            config.db = db;
        }
        if let Some(delimiter) = lookup("INFLUXDB_LEAFVALUEDELIMITER") {
            config.leafvaluedelimiter = delimiter;
        }
        if let Some(timeout) = lookup("INFLUXDB_TIMEOUT") {
            let seconds: f64 = timeout
                .trim()
                .parse()
                .with_context(|| format!("Invalid INFLUXDB_TIMEOUT: {}", timeout))?;
            config.timeout = Duration::try_from_secs_f64(seconds)
                .with_context(|| format!("Invalid INFLUXDB_TIMEOUT: {}", timeout))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the finder cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.leafvaluedelimiter.is_empty() {
            bail!("leafvaluedelimiter must not be empty");
        }
        Ok(())
    }
}

impl Default for InfluxdbConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            user: default_user(),
            pass: default_pass(),
            db: default_db(),
            leafvaluedelimiter: default_leaf_value_delimiter(),
            timeout: default_timeout(),
        }
    }
}

// Default value functions
fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    8086
}

fn default_user() -> String {
    "graphite".to_string()
}

fn default_pass() -> String {
    "graphite".to_string()
}

fn default_db() -> String {
    "graphite".to_string()
}

fn default_leaf_value_delimiter() -> String {
    "._field_".to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

// Duration serialization helpers
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // ISO-8601 duration (PT1.5S)
        serializer.serialize_str(&format!("PT{}S", duration.as_secs_f64()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;

        let seconds_str = s
            .strip_prefix("PT")
            .and_then(|rest| rest.strip_suffix('S'))
            .ok_or_else(|| serde::de::Error::custom(format!("Invalid duration format: {}", s)))?;
        let seconds: f64 = seconds_str.parse().map_err(serde::de::Error::custom)?;
        Duration::try_from_secs_f64(seconds).map_err(serde::de::Error::custom)
    }
}
