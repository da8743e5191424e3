// src/watch/filter.rs

use std::path::Path;

use regex::Regex;

use crate::errors::Result;

/// Pure predicate deciding whether a raw filesystem path is worth buffering.
///
/// Four independent checks, all against precompiled regexes:
/// - the basename must match `filename_match` (absent = match all),
/// - the basename must not match `filename_exclude` (absent = match none),
/// - the full path must match `path_match`,
/// - the full path must not match `path_exclude`.
///
/// Exclusion is opt-in: an unset exclude pattern never matches anything.
#[derive(Debug, Clone)]
pub struct PathFilter {
    filename_match: Option<Regex>,
    filename_exclude: Option<Regex>,
    path_match: Option<Regex>,
    path_exclude: Option<Regex>,
}

impl PathFilter {
    /// Compile the four optional patterns. Patterns are compiled exactly once
    /// here; `accept` has no side effects and allocates nothing.
    pub fn compile(
        filename_match: Option<&str>,
        filename_exclude: Option<&str>,
        path_match: Option<&str>,
        path_exclude: Option<&str>,
    ) -> Result<Self> {
        Ok(Self {
            filename_match: filename_match.map(Regex::new).transpose()?,
            filename_exclude: filename_exclude.map(Regex::new).transpose()?,
            path_match: path_match.map(Regex::new).transpose()?,
            path_exclude: path_exclude.map(Regex::new).transpose()?,
        })
    }

    /// A filter that accepts every path.
    pub fn accept_all() -> Self {
        Self {
            filename_match: None,
            filename_exclude: None,
            path_match: None,
            path_exclude: None,
        }
    }

    pub fn accept(&self, path: &Path) -> bool {
        let filename = match path.file_name() {
            Some(name) => name.to_string_lossy(),
            None => return false,
        };
        let full = path.to_string_lossy();

        if let Some(re) = &self.filename_match {
            if !re.is_match(&filename) {
                return false;
            }
        }
        if let Some(re) = &self.filename_exclude {
            if re.is_match(&filename) {
                return false;
            }
        }
        if let Some(re) = &self.path_match {
            if !re.is_match(&full) {
                return false;
            }
        }
        if let Some(re) = &self.path_exclude {
            if re.is_match(&full) {
                return false;
            }
        }
        true
    }
}
