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

//! InfluxDB 0.8 HTTP API client

use super::{list_series_query, range_query, sample_row_query, series_names, InfluxClient, Order};
use crate::config::InfluxdbConfig;
use crate::error::{Error, Result};
use crate::model::QueryResult;
use async_trait::async_trait;
use reqwest::Client;
use std::fmt;
use tracing::debug;

/// Client for the `/db/<db>/series` query endpoint
pub struct HttpClient {
    http: Client,
    url: String,
    user: String,
    pass: String,
}

impl HttpClient {
    /// Build a client from resolved configuration
    pub fn new(config: &InfluxdbConfig) -> Result<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            http,
            url: series_url(config),
            user: config.user.clone(),
            pass: config.pass.clone(),
        })
    }

    /// Endpoint queries are sent to
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Run one query with second precision timestamps
    pub async fn query(&self, query: &str) -> Result<Vec<QueryResult>> {
        debug!(url = %self.url, query, "influxdb query");

        let response = self
            .http
            .get(&self.url)
            .query(&[
                ("u", self.user.as_str()),
                ("p", self.pass.as_str()),
                ("q", query),
                ("time_precision", "s"),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                body,
            });
        }

        parse_body(&body)
    }
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("url", &self.url)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl InfluxClient for HttpClient {
    async fn list_series(&self) -> Result<Vec<String>> {
        series_names(self.query(list_series_query()).await?)
    }

    async fn sample_row(&self, series: &str, order: Order) -> Result<Vec<QueryResult>> {
        self.query(&sample_row_query(series, order)).await
    }

    async fn select_range(
        &self,
        series: &str,
        value: &str,
        start: i64,
        end: i64,
    ) -> Result<Vec<QueryResult>> {
        self.query(&range_query(series, value, start, end)).await
    }
}

fn series_url(config: &InfluxdbConfig) -> String {
    format!(
        "http://{}:{}/db/{}/series",
        config.host, config.port, config.db
    )
}

/// Some queries answer with an empty body instead of `[]`
fn parse_body(body: &str) -> Result<Vec<QueryResult>> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Answer one request with a canned response; yields the request line
    async fn serve_once(status: &'static str, body: &'static str) -> (u16, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            let _ = stream.shutdown().await;

            let request = String::from_utf8_lossy(&request).into_owned();
            let request_line = request.lines().next().unwrap_or_default().to_string();
            request_line
        });

        (port, handle)
    }

    fn local_client(port: u16) -> HttpClient {
        HttpClient::new(&InfluxdbConfig {
            host: "127.0.0.1".to_string(),
            port,
            user: "reader".to_string(),
            pass: "s3cret".to_string(),
            db: "metrics".to_string(),
            ..InfluxdbConfig::default()
        })
        .unwrap()
    }

    /// Method, path and decoded query pairs of a request line
    fn split_request(line: &str) -> (String, String, Vec<(String, String)>) {
        let mut parts = line.split_whitespace();
        let method = parts.next().unwrap().to_string();
        let target = parts.next().unwrap();
        let url = reqwest::Url::parse(&format!("http://localhost{}", target)).unwrap();
        let pairs = url.query_pairs().into_owned().collect();
        (method, url.path().to_string(), pairs)
    }

    fn pairs(query: &str) -> Vec<(String, String)> {
        [("u", "reader"), ("p", "s3cret"), ("q", query), ("time_precision", "s")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_list_series_request() {
        let (port, server) = serve_once(
            "200 OK",
            r#"[{"name":"list_series_result","columns":["time","name"],"points":[[0,"servers.web1"]]}]"#,
        )
        .await;

        let names = local_client(port).list_series().await.unwrap();
        assert_eq!(names, vec!["servers.web1"]);

        let (method, path, query) = split_request(&server.await.unwrap());
        assert_eq!(method, "GET");
        assert_eq!(path, "/db/metrics/series");
        assert_eq!(query, pairs("list series"));
    }

    #[tokio::test]
    async fn test_select_range_request() {
        let (port, server) = serve_once(
            "200 OK",
            r#"[{"name":"servers.web1","columns":["time","sequence_number","load"],"points":[[110,1,0.5]]}]"#,
        )
        .await;

        let results = local_client(port)
            .select_range("servers.web1", "load", 100, 200)
            .await
            .unwrap();
        assert_eq!(results[0].points.len(), 1);

        let (_, _, query) = split_request(&server.await.unwrap());
        assert_eq!(
            query,
            pairs(r#"select time, "load" from "servers.web1" where time > 100s and time < 200s order asc"#)
        );
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let (port, server) = serve_once("500 Internal Server Error", "database unavailable").await;

        let err = local_client(port)
            .sample_row("servers.web1", Order::Descending)
            .await
            .unwrap_err();
        match err {
            Error::Status { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "database unavailable");
            }
            other => panic!("unexpected error: {}", other),
        }

        let (_, _, query) = split_request(&server.await.unwrap());
        assert_eq!(query, pairs(r#"select * from "servers.web1" limit 1"#));
    }

    #[test]
    fn test_series_url() {
        let config = InfluxdbConfig {
            host: "influx.internal".to_string(),
            port: 8087,
            db: "metrics".to_string(),
            ..InfluxdbConfig::default()
        };

        let client = HttpClient::new(&config).unwrap();
        assert_eq!(client.url(), "http://influx.internal:8087/db/metrics/series");
    }

    #[test]
    fn test_debug_hides_password() {
        let config = InfluxdbConfig {
            pass: "hunter2".to_string(),
            ..InfluxdbConfig::default()
        };

        let client = HttpClient::new(&config).unwrap();
        assert!(!format!("{:?}", client).contains("hunter2"));
    }

    #[test]
    fn test_parse_body() {
        assert!(parse_body("").unwrap().is_empty());
        assert!(parse_body("[]").unwrap().is_empty());

        let results = parse_body(r#"[{"name":"cpu","columns":["time"],"points":[[1]]}]"#).unwrap();
        assert_eq!(results[0].name, "cpu");

        assert!(matches!(parse_body("not json"), Err(Error::Decode(_))));
    }
}
