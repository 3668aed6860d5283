use crate::error::{Result, TabularError};
use reqwest::Url;
use std::fmt;
use std::path::{Path, PathBuf};

/// Where a delimited resource lives: on disk or behind an http(s) URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceLocation {
    Local(PathBuf),
    Remote(Url),
}

impl ResourceLocation {
    /// Interprets `raw` as a URL when it carries an http(s) scheme, else as a path.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TabularError::InvalidLocation(
                "location must be non-empty".to_string(),
            ));
        }
        if is_http_url(trimmed) {
            let url = Url::parse(trimmed)
                .map_err(|err| TabularError::InvalidLocation(format!("{trimmed}: {err}")))?;
            if url.cannot_be_a_base() {
                return Err(TabularError::InvalidLocation(trimmed.to_string()));
            }
            return Ok(Self::Remote(url));
        }
        Ok(Self::Local(PathBuf::from(trimmed)))
    }

    pub fn local(path: impl AsRef<Path>) -> Self {
        Self::Local(path.as_ref().to_path_buf())
    }

    /// Appends one path segment (`base/segment`).
    pub fn join(&self, segment: &str) -> Self {
        match self {
            Self::Local(path) => Self::Local(path.join(segment)),
            Self::Remote(url) => {
                let mut url = url.clone();
                if let Ok(mut segments) = url.path_segments_mut() {
                    segments.pop_if_empty().push(segment);
                }
                Self::Remote(url)
            }
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }

    /// `scheme://host[:port]` of a remote location; default ports are omitted.
    pub fn origin(&self) -> Option<String> {
        match self {
            Self::Local(_) => None,
            Self::Remote(url) => Some(url.origin().ascii_serialization()),
        }
    }
}

impl fmt::Display for ResourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Remote(url) => write!(f, "{url}"),
        }
    }
}

pub fn is_http_url(raw: &str) -> bool {
    let lowered = raw.trim_start().to_ascii_lowercase();
    lowered.starts_with("http://") || lowered.starts_with("https://")
}
