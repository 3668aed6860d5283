use crate::error::{PackError, Result};
use serde::Deserialize;
use serde_json::Value;
use simlog_indexer::classify;
use simlog_protocol::{LogbookCategory, Run, RunId};
use std::collections::BTreeMap;

/// A validated `POST /data-pack` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPackRequest {
    /// Base location; files are read from `url/<run id>/<filename>`.
    pub url: String,
    pub sim_tree: BTreeMap<RunId, Run>,
}

impl DataPackRequest {
    /// Checks the body shape before anything is loaded.
    pub fn from_json(body: &Value) -> Result<Self> {
        let Value::Object(fields) = body else {
            return Err(PackError::validation("request body must be a JSON object"));
        };
        let sim_tree = match fields.get("simTree") {
            None | Some(Value::Null) => {
                return Err(PackError::validation("`simTree` is required"));
            }
            Some(value) => parse_sim_tree(value)?,
        };
        let url = match fields.get("url") {
            Some(Value::String(url)) => url.clone(),
            _ => return Err(PackError::validation("`url` must be a string")),
        };
        Ok(Self { url, sim_tree })
    }
}

/// Parses a `RunId -> Run` mapping as produced by the directory tree endpoint.
pub fn parse_sim_tree(value: &Value) -> Result<BTreeMap<RunId, Run>> {
    let Value::Object(runs) = value else {
        return Err(PackError::validation(
            "`simTree` must be an object mapping run ids to runs",
        ));
    };

    let mut parsed = BTreeMap::new();
    for (run_id, raw) in runs {
        check_segment("run id", run_id)?;
        let run = Run::deserialize(raw)
            .map_err(|err| PackError::validation(format!("simTree.{run_id}: {err}")))?;
        for category in LogbookCategory::ALL {
            for file in run.files(category) {
                check_segment("filename", file)?;
                if classify(file).category != Some(category) {
                    return Err(PackError::validation(format!(
                        "simTree.{run_id}: `{file}` is not a {category} logbook"
                    )));
                }
            }
        }
        parsed.insert(run_id.clone(), run);
    }
    Ok(parsed)
}

/// Run ids and filenames become path segments, so they must stay single segments.
fn check_segment(what: &str, segment: &str) -> Result<()> {
    let invalid = segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains(['/', '\\', '\0']);
    if invalid {
        return Err(PackError::validation(format!("invalid {what} `{segment}`")));
    }
    Ok(())
}
