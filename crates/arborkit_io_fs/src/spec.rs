//! Option models, iterator configuration and the error taxonomy.

use std::io;
use std::path::PathBuf;

use crate::filter::SpecFilterChain;

////////////////////////////////////////////////////////////////////////////////
// #region EnumsInit

/// Kind of a filesystem node as seen by the object model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumObjectKind {
    /// Regular file (or anything that is not a directory).
    File,
    /// Directory.
    Directory,
}

/// Existing destination file conflict policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumCopyFileConflictStrategy {
    /// Keep destination file and skip current source file.
    Skip,
    /// Replace destination file with source file.
    Overwrite,
    /// Fail with [`FsError::AlreadyExists`].
    Error,
}

/// Pattern matching mode for [`crate::filter::PatternFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumPatternMode {
    /// Shell-like wildcards (`*`, `?`, character classes).
    Glob,
    /// Regular expression pattern.
    Regex,
    /// Substring match.
    Literal,
}

/// Stream open modes, one per `fopen`-style mode string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumStreamMode {
    /// `r`
    Read,
    /// `r+`
    ReadWrite,
    /// `w`, truncates.
    Write,
    /// `w+`, truncates.
    WriteRead,
    /// `a`
    Append,
    /// `a+`
    AppendRead,
    /// `x`, fails if the file exists.
    CreateExclusive,
    /// `x+`
    CreateExclusiveRead,
    /// `c`, opens or creates without truncating.
    OpenOrCreate,
    /// `c+`
    OpenOrCreateRead,
}

impl EnumStreamMode {
    /// Whether the mode needs read capability on the target.
    pub fn requires_read(self) -> bool {
        matches!(
            self,
            Self::Read
                | Self::ReadWrite
                | Self::WriteRead
                | Self::AppendRead
                | Self::CreateExclusiveRead
                | Self::OpenOrCreateRead
        )
    }

    /// Whether the mode needs write capability on the target.
    pub fn requires_write(self) -> bool {
        !matches!(self, Self::Read)
    }

    /// Whether the target must already exist.
    pub fn requires_existing(self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite)
    }

    /// The `fopen`-style mode string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "r",
            Self::ReadWrite => "r+",
            Self::Write => "w",
            Self::WriteRead => "w+",
            Self::Append => "a",
            Self::AppendRead => "a+",
            Self::CreateExclusive => "x",
            Self::CreateExclusiveRead => "x+",
            Self::OpenOrCreate => "c",
            Self::OpenOrCreateRead => "c+",
        }
    }

    pub(crate) fn to_open_options(self) -> std::fs::OpenOptions {
        let mut opts = std::fs::OpenOptions::new();
        match self {
            Self::Read => opts.read(true),
            Self::ReadWrite => opts.read(true).write(true),
            Self::Write => opts.write(true).create(true).truncate(true),
            Self::WriteRead => opts.read(true).write(true).create(true).truncate(true),
            Self::Append => opts.append(true).create(true),
            Self::AppendRead => opts.read(true).append(true).create(true),
            Self::CreateExclusive => opts.write(true).create_new(true),
            Self::CreateExclusiveRead => opts.read(true).write(true).create_new(true),
            Self::OpenOrCreate => opts.write(true).create(true),
            Self::OpenOrCreateRead => opts.read(true).write(true).create(true),
        };
        opts
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Configs

/// Filter configuration shared by every directory iterator.
///
/// `filters_descend` decides which directories a recursive walk enters;
/// `filters_result` decides which visited nodes are yielded. The two are
/// independent: a directory can be yielded without being entered and the
/// other way around.
#[derive(Debug, Clone, Default)]
pub struct SpecIteratorConfig {
    /// Applied to directories before entering them.
    pub filters_descend: SpecFilterChain,
    /// Applied to every yielded node.
    pub filters_result: SpecFilterChain,
    /// Used by [`crate::Directory::walk`] to pick flat or recursive iteration.
    pub if_recursive: bool,
}

/// Partial iterator configuration; `Some` fields override on merge.
#[derive(Debug, Clone, Default)]
pub struct SpecIteratorConfigPatch {
    /// See [`SpecIteratorConfig::filters_descend`].
    pub filters_descend: Option<SpecFilterChain>,
    /// See [`SpecIteratorConfig::filters_result`].
    pub filters_result: Option<SpecFilterChain>,
    /// See [`SpecIteratorConfig::if_recursive`].
    pub if_recursive: Option<bool>,
}

impl SpecIteratorConfig {
    /// Clone with `filters_descend` replaced.
    pub fn with_filters_descend(&self, filters_descend: SpecFilterChain) -> Self {
        Self {
            filters_descend,
            ..self.clone()
        }
    }

    /// Clone with `filters_result` replaced.
    pub fn with_filters_result(&self, filters_result: SpecFilterChain) -> Self {
        Self {
            filters_result,
            ..self.clone()
        }
    }

    /// Clone with `if_recursive` replaced.
    pub fn with_recursive(&self, if_recursive: bool) -> Self {
        Self {
            if_recursive,
            ..self.clone()
        }
    }

    /// Merge a partial config; values present in `patch` win.
    pub fn merge(&self, patch: SpecIteratorConfigPatch) -> Self {
        Self {
            filters_descend: patch
                .filters_descend
                .unwrap_or_else(|| self.filters_descend.clone()),
            filters_result: patch
                .filters_result
                .unwrap_or_else(|| self.filters_result.clone()),
            if_recursive: patch.if_recursive.unwrap_or(self.if_recursive),
        }
    }
}

/// Input options for [`crate::copy_tree`] and [`crate::Directory::copy`].
#[derive(Debug, Clone)]
pub struct SpecCopyOptions {
    /// Copy children (and their subtrees) after creating the destination.
    pub if_recursive: bool,
    /// Create missing parents of the destination root.
    pub if_create_parents: bool,
    /// Conflict behavior for destination files.
    pub rule_conflict_file: EnumCopyFileConflictStrategy,
    /// `filters_result` selects which children are copied at every level.
    pub config_iterator: SpecIteratorConfig,
}

impl Default for SpecCopyOptions {
    fn default() -> Self {
        Self {
            if_recursive: true,
            if_create_parents: false,
            rule_conflict_file: EnumCopyFileConflictStrategy::Overwrite,
            config_iterator: SpecIteratorConfig::default(),
        }
    }
}

/// Input options for [`crate::delete_tree`] and [`crate::Directory::delete`].
#[derive(Debug, Clone, Default)]
pub struct SpecDeleteOptions {
    /// Delete subdirectories too. A non-recursive delete requires an empty directory.
    pub if_recursive: bool,
    /// Filenames, root-relative paths or absolute paths that must survive.
    pub exclude: Vec<String>,
    /// Children failing `filters_result` are left in place.
    pub config_iterator: SpecIteratorConfig,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Result alias used across the crate.
pub type FsResult<T> = Result<T, FsError>;

/// Failure kinds raised by filesystem operations.
///
/// Every variant that concerns a node carries the offending path.
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    /// Target path does not exist when existence was required.
    #[error("not found: {}", path.display())]
    NotFound {
        /// Missing path.
        path: PathBuf,
    },

    /// Destination conflicts with an existing node.
    #[error("{operation}: already exists: {}", path.display())]
    AlreadyExists {
        /// Conflicting path.
        path: PathBuf,
        /// Operation that failed.
        operation: &'static str,
    },

    /// A read or write capability is missing.
    #[error("{operation}: permission denied: {}", path.display())]
    PermissionDenied {
        /// Path lacking the capability.
        path: PathBuf,
        /// Operation that was about to run.
        operation: &'static str,
    },

    /// Non-recursive delete of a directory with contents.
    #[error("directory not empty: {}", path.display())]
    NotEmpty {
        /// Non-empty directory.
        path: PathBuf,
    },

    /// `ancestor` is not a literal prefix of `path`.
    #[error("path '{path}' is not relative to '{ancestor}'")]
    NotRelative {
        /// Descendant candidate.
        path: String,
        /// Claimed ancestor.
        ancestor: String,
    },

    /// Environment-dependent resolution failed (home directory, cwd).
    #[error("could not resolve path: {0}")]
    Resolution(String),

    /// Iterator root is not a directory.
    #[error("not a directory: {}", path.display())]
    NotADirectory {
        /// Offending path.
        path: PathBuf,
    },

    /// Copy/move destination lies inside the source tree or the other way around.
    #[error(
        "source and destination overlap: {} <-> {}",
        source_dir.display(),
        destination.display()
    )]
    Overlap {
        /// Source directory.
        source_dir: PathBuf,
        /// Destination directory.
        destination: PathBuf,
    },

    /// Invalid include/exclude pattern.
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),

    /// `current` called on an iterator that is not positioned.
    #[error("iterator over {} is not positioned on an entry", path.display())]
    InvalidIteratorState {
        /// Directory being iterated.
        path: PathBuf,
    },

    /// Any other OS failure.
    #[error("{}: {source}", path.display())]
    Io {
        /// Path of the failed call.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

impl FsError {
    /// Map an OS error onto the taxonomy, keeping the path.
    pub(crate) fn from_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound { path },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied {
                path,
                operation: "io",
            },
            io::ErrorKind::AlreadyExists => Self::AlreadyExists {
                path,
                operation: "io",
            },
            _ => Self::Io { path, source },
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
