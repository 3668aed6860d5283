//! Wire types shared by the scanner, the loader, the aggregator and the HTTP API.
//!
//! Every type here serializes to the exact JSON shape visualization clients
//! consume (`camelCase` keys, run/zone/config names as map keys).

use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod dataset;

pub use dataset::{Cell, TabularDataset};

pub type ZoneName = String;
pub type ConfigId = String;
pub type RunId = String;
pub type Level = String;

/// Level key used for timeline logbooks whose filename encodes no level.
pub const ALL_LEVELS: &str = "all";

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LogbookCategory {
    Lift,
    Timeline,
    Passenger,
}

impl LogbookCategory {
    pub const ALL: [LogbookCategory; 3] = [Self::Lift, Self::Timeline, Self::Passenger];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lift => "lift",
            Self::Timeline => "timeline",
            Self::Passenger => "passenger",
        }
    }
}

impl std::fmt::Display for LogbookCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified log files of one simulation run.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    #[serde(default)]
    pub lift_logbooks: Vec<String>,
    #[serde(default)]
    pub timeline_logbooks: Vec<String>,
    #[serde(default)]
    pub passenger_logbooks: Vec<String>,
}

impl Run {
    pub fn files(&self, category: LogbookCategory) -> &[String] {
        match category {
            LogbookCategory::Lift => &self.lift_logbooks,
            LogbookCategory::Timeline => &self.timeline_logbooks,
            LogbookCategory::Passenger => &self.passenger_logbooks,
        }
    }

    pub fn push(&mut self, category: LogbookCategory, filename: String) {
        match category {
            LogbookCategory::Lift => self.lift_logbooks.push(filename),
            LogbookCategory::Timeline => self.timeline_logbooks.push(filename),
            LogbookCategory::Passenger => self.passenger_logbooks.push(filename),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lift_logbooks.is_empty()
            && self.timeline_logbooks.is_empty()
            && self.passenger_logbooks.is_empty()
    }
}

/// A scenario variant; serialized as a bare `RunId -> Run` map.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq, JsonSchema)]
#[serde(transparent)]
pub struct Config {
    pub runs: BTreeMap<RunId, Run>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq, JsonSchema)]
pub struct Zone {
    pub configs: BTreeMap<ConfigId, Config>,
}

/// Result of scanning `zone/config/run` directories under a requested path.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq, JsonSchema)]
pub struct DirectoryTree {
    /// The relative path the tree was requested for.
    pub url: String,
    pub zones: BTreeMap<ZoneName, Zone>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LoadFailureKind {
    NotFound,
    Parse,
    Fetch,
    Timeout,
    DuplicateLevel,
    Internal,
}

/// A per-file failure that was isolated during aggregation.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoadWarning {
    pub run_id: RunId,
    pub category: LogbookCategory,
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<Level>,
    pub kind: LoadFailureKind,
    pub message: String,
}

/// Aggregated datasets for a set of runs.
///
/// A missing run, category or level means "no data". Files that failed to
/// load are listed in `warnings`.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SimDataPack {
    pub lift_logbooks: BTreeMap<RunId, TabularDataset>,
    pub timeline_logbooks: BTreeMap<RunId, BTreeMap<Level, TabularDataset>>,
    pub passenger_logbooks: BTreeMap<RunId, TabularDataset>,
    #[serde(default)]
    pub warnings: Vec<LoadWarning>,
}

impl SimDataPack {
    pub fn dataset_count(&self) -> usize {
        self.lift_logbooks.len()
            + self.passenger_logbooks.len()
            + self
                .timeline_logbooks
                .values()
                .map(BTreeMap::len)
                .sum::<usize>()
    }
}

/// JSON error body returned by every failing endpoint.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
pub struct ErrorEnvelope {
    pub error: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

pub fn serialize_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn directory_tree_serializes_configs_as_run_maps() {
        let mut run = Run::default();
        run.push(LogbookCategory::Lift, "lift_logbook.csv".to_string());
        run.push(LogbookCategory::Timeline, "timeline_logbook.csv".to_string());

        let mut config = Config::default();
        config.runs.insert("run_1".to_string(), run);
        let mut zone = Zone::default();
        zone.configs.insert("cfg_a".to_string(), config);
        let mut tree = DirectoryTree {
            url: "Direct-3Zone".to_string(),
            ..Default::default()
        };
        tree.zones.insert("zone_1".to_string(), zone);

        let value = serde_json::to_value(&tree).unwrap();
        assert_eq!(
            value,
            json!({
                "url": "Direct-3Zone",
                "zones": {
                    "zone_1": {
                        "configs": {
                            "cfg_a": {
                                "run_1": {
                                    "liftLogbooks": ["lift_logbook.csv"],
                                    "timelineLogbooks": ["timeline_logbook.csv"],
                                    "passengerLogbooks": []
                                }
                            }
                        }
                    }
                }
            })
        );
    }

    #[test]
    fn run_accepts_partial_category_lists() {
        let run: Run = serde_json::from_value(json!({
            "passengerLogbooks": ["passenger_logbook.csv"]
        }))
        .unwrap();
        assert!(run.lift_logbooks.is_empty());
        assert_eq!(run.files(LogbookCategory::Passenger).len(), 1);
        assert!(!run.is_empty());
    }

    #[test]
    fn warning_omits_missing_level() {
        let warning = LoadWarning {
            run_id: "run_1".to_string(),
            category: LogbookCategory::Passenger,
            file: "passenger_logbook.csv".to_string(),
            level: None,
            kind: LoadFailureKind::NotFound,
            message: "missing".to_string(),
        };
        let value = serde_json::to_value(&warning).unwrap();
        assert_eq!(value["kind"], "not_found");
        assert_eq!(value["category"], "passenger");
        assert!(value.get("level").is_none());
    }
}
