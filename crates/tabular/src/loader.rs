use crate::error::{Result, TabularError};
use crate::location::ResourceLocation;
use crate::parse::{parse_delimited, DEFAULT_DELIMITER};
use crate::typing::coerce_numeric;
use reqwest::Client;
use simlog_protocol::TabularDataset;
use std::time::Duration;

/// Behaviour of a single load.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Field delimiter byte
    pub delimiter: u8,

    /// Run the first-row numeric typing pass after parsing
    pub coerce_numeric: bool,

    /// Upper bound for reading and parsing one resource
    pub timeout: Option<Duration>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
            coerce_numeric: true,
            timeout: Some(Duration::from_secs(30)),
        }
    }
}

impl LoadOptions {
    /// Keeps every value as text.
    pub fn text_only() -> Self {
        Self {
            coerce_numeric: false,
            ..Default::default()
        }
    }
}

/// Reads a delimited resource from disk or over http(s) and parses it.
#[derive(Clone)]
pub struct TabularLoader {
    client: Client,
    options: LoadOptions,
}

impl TabularLoader {
    pub fn new(options: LoadOptions) -> Self {
        Self {
            client: Client::new(),
            options,
        }
    }

    pub async fn load(&self, location: &ResourceLocation) -> Result<TabularDataset> {
        match self.options.timeout {
            Some(limit) => tokio::time::timeout(limit, self.load_inner(location))
                .await
                .map_err(|_| TabularError::Timeout {
                    location: location.to_string(),
                    millis: limit.as_millis(),
                })?,
            None => self.load_inner(location).await,
        }
    }

    async fn load_inner(&self, location: &ResourceLocation) -> Result<TabularDataset> {
        let bytes = self.read_bytes(location).await?;
        let delimiter = self.options.delimiter;
        let coerce = self.options.coerce_numeric;
        let started = std::time::Instant::now();

        let dataset = tokio::task::spawn_blocking(move || {
            let dataset = parse_delimited(&bytes, delimiter)?;
            Ok::<_, TabularError>(if coerce {
                coerce_numeric(dataset)
            } else {
                dataset
            })
        })
        .await
        .map_err(|err| TabularError::Task(err.to_string()))??;

        log::debug!(
            "Loaded {location}: {} rows x {} columns in {} ms",
            dataset.row_count,
            dataset.col_count,
            started.elapsed().as_millis()
        );
        Ok(dataset)
    }

    async fn read_bytes(&self, location: &ResourceLocation) -> Result<Vec<u8>> {
        match location {
            ResourceLocation::Local(path) => tokio::fs::read(path)
                .await
                .map_err(|err| TabularError::not_found(format!("{}: {err}", path.display()))),
            ResourceLocation::Remote(url) => {
                let response = self.client.get(url.clone()).send().await.map_err(|err| {
                    TabularError::Fetch {
                        location: url.to_string(),
                        message: err.to_string(),
                    }
                })?;
                let status = response.status();
                if !status.is_success() {
                    return Err(TabularError::not_found(format!("{url}: HTTP {status}")));
                }
                let body = response.bytes().await.map_err(|err| TabularError::Fetch {
                    location: url.to_string(),
                    message: err.to_string(),
                })?;
                Ok(body.to_vec())
            }
        }
    }
}

impl Default for TabularLoader {
    fn default() -> Self {
        Self::new(LoadOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use simlog_protocol::Cell;
    use tempfile::TempDir;

    #[tokio::test]
    async fn loads_and_types_local_file() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("passenger_logbook.csv");
        tokio::fs::write(&path, "wait_time,travel_time\n12,30.5\n8,22\n")
            .await
            .expect("write csv");

        let dataset = TabularLoader::default()
            .load(&ResourceLocation::local(&path))
            .await
            .expect("load");
        assert_eq!(dataset.columns, vec!["wait_time", "travel_time"]);
        assert_eq!(dataset.rows[0], vec![Cell::Int(12), Cell::Float(30.5)]);
        assert_eq!(dataset.rows[1], vec![Cell::Int(8), Cell::Float(22.0)]);
    }

    #[tokio::test]
    async fn text_only_keeps_strings() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("lift_logbook.csv");
        tokio::fs::write(&path, "a,b\n1,2\n").await.expect("write csv");

        let dataset = TabularLoader::new(LoadOptions::text_only())
            .load(&ResourceLocation::local(&path))
            .await
            .expect("load");
        assert_eq!(dataset.rows[0], vec![Cell::from("1"), Cell::from("2")]);
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let temp = TempDir::new().expect("tempdir");
        let err = TabularLoader::default()
            .load(&ResourceLocation::local(temp.path().join("absent.csv")))
            .await
            .unwrap_err();
        assert!(err.is_not_found(), "{err}");
    }

    #[tokio::test]
    async fn directory_is_not_readable_as_a_resource() {
        let temp = TempDir::new().expect("tempdir");
        let err = TabularLoader::default()
            .load(&ResourceLocation::local(temp.path()))
            .await
            .unwrap_err();
        assert!(err.is_not_found(), "{err}");
    }
}
