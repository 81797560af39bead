//! `arborkit_io_fs` v1:
//! Typed filesystem objects, lazy filterable tree iteration and tree mutation.
//!
//! Module layout:
//! - `object`      : `FilesystemObject` / `File` / `Directory`
//! - `iter`        : single-level and recursive directory iterators
//! - `filter`      : filter chains and named filters
//! - `mutate`      : copy / move / delete over trees, upward/downward lookup
//! - `path`        : lexical path resolution and string affix helpers
//! - `permissions` : read/write capability checks
//! - `spec`        : enums/options/errors
//! - `report`      : run-time report model
//! - `util`        : shared helper functions
//!
//! Iteration is synchronous and pull-based. Each open directory level holds
//! one OS handle that is released on exhaustion, skip or drop.

pub mod filter;
pub mod iter;
pub mod mutate;
pub mod object;
pub mod path;
pub mod permissions;
pub mod report;
pub mod spec;
mod util;

pub use filter::{
    ClosureFilter, DirectoryFilter, FileFilter, FilesystemFilter, NameFilter, PatternFilter,
    SpecFilterChain,
};
pub use iter::{DirectoryIterator, DirectoryWalk, RecursiveDirectoryIterator};
pub use mutate::{
    contains_relative_path, copy_tree, delete_tree, delete_tree_contents, find_downwards,
    find_upwards, move_tree,
};
pub use object::{Directory, File, FilesystemObject};
pub use permissions::FilesystemPermissions;
pub use report::{ReportTree, ReportTreeBuilder};
pub use spec::{
    EnumCopyFileConflictStrategy, EnumObjectKind, EnumPatternMode, EnumStreamMode, FsError,
    FsResult, SpecCopyOptions, SpecDeleteOptions, SpecIteratorConfig, SpecIteratorConfigPatch,
};
