use simlog_protocol::{LogbookCategory, ALL_LEVELS};

pub const CSV_EXTENSION: &str = ".csv";
pub const LIFT_LOGBOOK_MARKER: &str = "lift_logbook";
pub const TIMELINE_LOGBOOK_MARKER: &str = "timeline_logbook";
pub const PASSENGER_LOGBOOK_MARKER: &str = "passenger_logbook";

/// Markers in priority order; the first one contained in a filename wins.
const MARKERS: [(&str, LogbookCategory); 3] = [
    (LIFT_LOGBOOK_MARKER, LogbookCategory::Lift),
    (TIMELINE_LOGBOOK_MARKER, LogbookCategory::Timeline),
    (PASSENGER_LOGBOOK_MARKER, LogbookCategory::Passenger),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedFile {
    pub filename: String,
    /// `None` for files that belong to no logbook category.
    pub category: Option<LogbookCategory>,
    /// Only meaningful for timeline logbooks.
    pub level: String,
}

/// Maps a bare filename to its logbook category and level.
pub fn classify(filename: &str) -> ClassifiedFile {
    let category = category_of(filename);
    let level = match category {
        Some(LogbookCategory::Timeline) => timeline_level(filename),
        _ => ALL_LEVELS.to_string(),
    };
    ClassifiedFile {
        filename: filename.to_string(),
        category,
        level,
    }
}

pub fn category_of(filename: &str) -> Option<LogbookCategory> {
    if !filename.ends_with(CSV_EXTENSION) {
        return None;
    }
    MARKERS
        .iter()
        .find(|(marker, _)| filename.contains(marker))
        .map(|(_, category)| *category)
}

/// Level encoded in a timeline filename.
///
/// `timeline_logbook.csv` splits into two `_` tokens and has no level
/// (`"all"`); any longer name carries its level in the last token, e.g.
/// `605_timeline_logbook_L3.csv` -> `L3`.
pub fn timeline_level(filename: &str) -> String {
    let stem = filename.strip_suffix(CSV_EXTENSION).unwrap_or(filename);
    let tokens: Vec<&str> = stem.split('_').collect();
    match tokens.as_slice() {
        [_, _, third] => (*third).to_string(),
        [_, _, _, .., last] => (*last).to_string(),
        _ => ALL_LEVELS.to_string(),
    }
}
