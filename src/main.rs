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

use anyhow::Result;
use clap::Parser;
use graphite_influxdb::cli::{self, Cli};
use graphite_influxdb::config::GraphiteConfig;
use graphite_influxdb::Finder;
use tracing::{debug, Level};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; stdout is reserved for results
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Load configuration, falling back to INFLUXDB_* settings
    let explicit = cli.config.as_ref().map(GraphiteConfig::from_file).transpose()?;
    let finder = Finder::from_config(explicit.as_ref())?;
    debug!("Finder ready, delimiter {:?}", finder.leaf_value_delimiter());

    let output = cli::run(&finder, &cli.command).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
