//! Lexical path resolution.
//!
//! Everything here works on the path string alone and never consults the
//! filesystem, so it behaves the same for paths that do not exist yet. The
//! only environment lookups are the home directory (tilde expansion) and the
//! current working directory (relative input to [`absolute_path`]).

use std::path::{MAIN_SEPARATOR, MAIN_SEPARATOR_STR};

use crate::spec::{FsError, FsResult};

////////////////////////////////////////////////////////////////////////////////
// #region StringAffixes

/// Prepend `prefix` unless `subject` already starts with it.
pub fn add_prefix(subject: &str, prefix: &str) -> String {
    if subject.starts_with(prefix) {
        return subject.to_string();
    }
    format!("{prefix}{subject}")
}

/// Strip one leading `prefix` if present.
pub fn remove_prefix<'a>(subject: &'a str, prefix: &str) -> &'a str {
    subject.strip_prefix(prefix).unwrap_or(subject)
}

/// Append `suffix` unless `subject` already ends with it.
pub fn add_suffix(subject: &str, suffix: &str) -> String {
    if subject.ends_with(suffix) {
        return subject.to_string();
    }
    format!("{subject}{suffix}")
}

/// Strip one trailing `suffix` if present.
pub fn remove_suffix<'a>(subject: &'a str, suffix: &str) -> &'a str {
    subject.strip_suffix(suffix).unwrap_or(subject)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Resolver

/// Join `segments` onto `base` with exactly one separator between parts.
///
/// Leading separators of a segment and trailing separators of the
/// accumulated path are collapsed, so `("/a/", ["/b"])` gives `/a/b`.
/// Empty segments are ignored; when every segment is empty the trailing
/// separators of `base` are dropped, except for the root itself.
pub fn append_to_path(base: &str, segments: &[&str]) -> String {
    let mut c_path = base.to_string();
    let mut b_is_appended = false;
    for segment in segments {
        let c_segment = segment.trim_start_matches(MAIN_SEPARATOR);
        if c_segment.is_empty() {
            continue;
        }
        b_is_appended = true;
        if c_path.is_empty() {
            c_path.push_str(c_segment);
            continue;
        }
        let n_keep = c_path.trim_end_matches(MAIN_SEPARATOR).len();
        c_path.truncate(n_keep);
        c_path.push(MAIN_SEPARATOR);
        c_path.push_str(c_segment);
    }
    if !b_is_appended && !segments.is_empty() {
        let n_keep = c_path.trim_end_matches(MAIN_SEPARATOR).len().max(1);
        c_path.truncate(n_keep.min(c_path.len()));
    }
    c_path
}

/// Home directory of the current user.
pub fn home_directory_path() -> FsResult<String> {
    let base_dirs = directories::BaseDirs::new().ok_or_else(|| {
        FsError::Resolution("home directory of the current user is unknown".to_string())
    })?;
    Ok(base_dirs.home_dir().to_string_lossy().into_owned())
}

fn expand_home(path: &str) -> FsResult<String> {
    if path == "~" {
        return home_directory_path();
    }
    match path.strip_prefix("~").filter(|rest| rest.starts_with(MAIN_SEPARATOR)) {
        Some(rest) => Ok(append_to_path(&home_directory_path()?, &[rest])),
        None => Ok(path.to_string()),
    }
}

/// Collapse empty, `.` and `..` segments.
///
/// A `..` with nothing left to pop is dropped for absolute paths (the parent
/// of the root is the root) and kept verbatim for relative paths.
pub fn normalize_path(path: &str) -> String {
    let b_is_absolute = path.starts_with(MAIN_SEPARATOR);
    let mut l_parts: Vec<&str> = Vec::new();

    for part in path.split(MAIN_SEPARATOR) {
        match part {
            "" | "." => {}
            ".." => match l_parts.last() {
                Some(&last) if last != ".." => {
                    l_parts.pop();
                }
                _ if b_is_absolute => {}
                _ => l_parts.push(".."),
            },
            _ => l_parts.push(part),
        }
    }

    let c_joined = l_parts.join(MAIN_SEPARATOR_STR);
    if b_is_absolute {
        return format!("{MAIN_SEPARATOR}{c_joined}");
    }
    if c_joined.is_empty() {
        return ".".to_string();
    }
    c_joined
}

/// Resolve `path` to a normalized absolute path without touching the target.
///
/// A leading `~` expands to the home directory; relative input is joined
/// onto the current working directory. Unlike `fs::canonicalize`, symlinks
/// are not followed and the path does not have to exist.
pub fn absolute_path(path: &str) -> FsResult<String> {
    let c_expanded = expand_home(path)?;
    if c_expanded.starts_with(MAIN_SEPARATOR) {
        return Ok(normalize_path(&c_expanded));
    }

    let path_cwd = std::env::current_dir()
        .map_err(|e| FsError::Resolution(format!("current directory is unavailable ({e})")))?;
    Ok(normalize_path(&append_to_path(
        &path_cwd.to_string_lossy(),
        &[&c_expanded],
    )))
}

/// Suffix of `path` below `ancestor`.
///
/// Purely lexical: `ancestor` (with a trailing separator added) must be a
/// literal prefix of `path`. Resolve both sides first when semantic ancestry
/// matters. A path is relative to itself with an empty result.
pub fn relative_path(path: &str, ancestor: &str) -> FsResult<String> {
    if remove_suffix(path, MAIN_SEPARATOR_STR) == remove_suffix(ancestor, MAIN_SEPARATOR_STR) {
        return Ok(String::new());
    }

    let c_prefix = add_suffix(ancestor, MAIN_SEPARATOR_STR);
    match path.strip_prefix(c_prefix.as_str()) {
        Some(rest) => Ok(rest.to_string()),
        None => Err(FsError::NotRelative {
            path: path.to_string(),
            ancestor: ancestor.to_string(),
        }),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
