//! Filter chains over filesystem objects.
//!
//! A chain is an ordered list of [`FilesystemFilter`]s combined with logical
//! AND. Evaluation stops at the first rejecting filter and an empty chain
//! passes everything. Filters only look at the object's path and kind.

use std::fmt;
use std::sync::Arc;

use globset::{Glob, GlobMatcher};
use regex::Regex;

use crate::object::FilesystemObject;
use crate::spec::{EnumPatternMode, FsError, FsResult};

/// Predicate over a [`FilesystemObject`].
pub trait FilesystemFilter: Send + Sync {
    /// `true` when `object` should be kept.
    fn should_pass(&self, object: &FilesystemObject) -> bool;

    /// Label used in debug output.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

////////////////////////////////////////////////////////////////////////////////
// #region Chain

/// Ordered, cheaply clonable AND-combination of filters.
#[derive(Clone, Default)]
pub struct SpecFilterChain {
    l_filters: Vec<Arc<dyn FilesystemFilter>>,
}

impl SpecFilterChain {
    /// Empty chain; passes everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Self::push`].
    pub fn with<F>(mut self, filter: F) -> Self
    where
        F: FilesystemFilter + 'static,
    {
        self.push(filter);
        self
    }

    /// Builder form of [`Self::push_closure`].
    pub fn with_closure<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&FilesystemObject) -> bool + Send + Sync + 'static,
    {
        self.push_closure(predicate);
        self
    }

    /// Append a named filter.
    pub fn push<F>(&mut self, filter: F)
    where
        F: FilesystemFilter + 'static,
    {
        self.l_filters.push(Arc::new(filter));
    }

    /// Append an ad-hoc predicate, wrapped in [`ClosureFilter`].
    pub fn push_closure<F>(&mut self, predicate: F)
    where
        F: Fn(&FilesystemObject) -> bool + Send + Sync + 'static,
    {
        self.push(ClosureFilter::new(predicate));
    }

    /// Number of filters.
    pub fn len(&self) -> usize {
        self.l_filters.len()
    }

    /// `true` when the chain has no filters.
    pub fn is_empty(&self) -> bool {
        self.l_filters.is_empty()
    }

    /// `true` iff every filter accepts `object`.
    pub fn should_pass(&self, object: &FilesystemObject) -> bool {
        self.l_filters.iter().all(|f| f.should_pass(object))
    }

    /// Negation of [`Self::should_pass`].
    pub fn should_prune(&self, object: &FilesystemObject) -> bool {
        !self.should_pass(object)
    }
}

impl fmt::Debug for SpecFilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.l_filters.iter().map(|filter| filter.name()))
            .finish()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region NamedFilters

/// Adapter turning a closure into a [`FilesystemFilter`].
pub struct ClosureFilter<F> {
    predicate: F,
}

impl<F> ClosureFilter<F>
where
    F: Fn(&FilesystemObject) -> bool + Send + Sync,
{
    /// Wrap `predicate`.
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

impl<F> FilesystemFilter for ClosureFilter<F>
where
    F: Fn(&FilesystemObject) -> bool + Send + Sync,
{
    fn should_pass(&self, object: &FilesystemObject) -> bool {
        (self.predicate)(object)
    }

    fn name(&self) -> &str {
        "closure"
    }
}

/// Keeps files only.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileFilter;

impl FilesystemFilter for FileFilter {
    fn should_pass(&self, object: &FilesystemObject) -> bool {
        object.is_file()
    }

    fn name(&self) -> &str {
        "file"
    }
}

/// Keeps directories only.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectoryFilter;

impl FilesystemFilter for DirectoryFilter {
    fn should_pass(&self, object: &FilesystemObject) -> bool {
        object.is_dir()
    }

    fn name(&self) -> &str {
        "directory"
    }
}

/// Rejects objects whose filename equals `name`.
#[derive(Debug, Clone)]
pub struct NameFilter {
    name: String,
}

impl NameFilter {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl FilesystemFilter for NameFilter {
    fn should_pass(&self, object: &FilesystemObject) -> bool {
        object.filename() != self.name
    }

    fn name(&self) -> &str {
        "name"
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region PatternMatching

#[derive(Debug, Clone)]
enum TypeFilterPatternSeq {
    Literal(Vec<String>),
    Glob(Vec<GlobMatcher>),
    Regex(Vec<Regex>),
}

impl TypeFilterPatternSeq {
    fn is_match(&self, value: &str) -> bool {
        match self {
            Self::Literal(v) => v.iter().any(|p| value.contains(p.as_str())),
            Self::Glob(v) => v.iter().any(|p| p.is_match(value)),
            Self::Regex(v) => v.iter().any(|p| p.is_match(value)),
        }
    }
}

fn compile_patterns(
    patterns: &[String],
    rule_pattern: EnumPatternMode,
) -> FsResult<TypeFilterPatternSeq> {
    match rule_pattern {
        EnumPatternMode::Literal => Ok(TypeFilterPatternSeq::Literal(patterns.to_vec())),
        EnumPatternMode::Glob => {
            let mut l_glob = Vec::with_capacity(patterns.len());
            for pattern in patterns {
                let matcher = Glob::new(pattern)
                    .map_err(|e| FsError::InvalidPattern(format!("{pattern} ({e})")))?
                    .compile_matcher();
                l_glob.push(matcher);
            }
            Ok(TypeFilterPatternSeq::Glob(l_glob))
        }
        EnumPatternMode::Regex => {
            let mut l_regex = Vec::with_capacity(patterns.len());
            for pattern in patterns {
                let regex = Regex::new(pattern)
                    .map_err(|e| FsError::InvalidPattern(format!("{pattern} ({e})")))?;
                l_regex.push(regex);
            }
            Ok(TypeFilterPatternSeq::Regex(l_regex))
        }
    }
}

/// Filename pattern filter in include or exclude mode.
///
/// In include mode an object passes when any pattern matches its filename;
/// in exclude mode it passes when none does. An empty include list passes
/// everything.
#[derive(Debug, Clone)]
pub struct PatternFilter {
    patterns: TypeFilterPatternSeq,
    b_is_exclude: bool,
    b_is_empty: bool,
}

impl PatternFilter {
    /// Keep objects whose filename matches one of `patterns`.
    pub fn include(patterns: &[String], rule_pattern: EnumPatternMode) -> FsResult<Self> {
        Ok(Self {
            patterns: compile_patterns(patterns, rule_pattern)?,
            b_is_exclude: false,
            b_is_empty: patterns.is_empty(),
        })
    }

    /// Drop objects whose filename matches one of `patterns`.
    pub fn exclude(patterns: &[String], rule_pattern: EnumPatternMode) -> FsResult<Self> {
        Ok(Self {
            patterns: compile_patterns(patterns, rule_pattern)?,
            b_is_exclude: true,
            b_is_empty: patterns.is_empty(),
        })
    }
}

impl FilesystemFilter for PatternFilter {
    fn should_pass(&self, object: &FilesystemObject) -> bool {
        if self.b_is_empty {
            return true;
        }
        let b_is_match = self.patterns.is_match(&object.filename());
        b_is_match != self.b_is_exclude
    }

    fn name(&self) -> &str {
        if self.b_is_exclude {
            "pattern_exclude"
        } else {
            "pattern_include"
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
