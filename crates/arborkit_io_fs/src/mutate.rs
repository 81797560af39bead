//! Tree mutation over directory trees, plus upward/downward lookups.
//!
//! Every algorithm walks one level at a time with [`DirectoryIterator`] and
//! recurses by itself. Nothing is rolled back: a failure leaves the tree in
//! whatever state it reached, and the returned [`ReportTree`] says so.

use std::fs;
use std::path::{Path, PathBuf};

use crate::filter::SpecFilterChain;
use crate::iter::{DirectoryIterator, DirectoryWalk, RecursiveDirectoryIterator};
use crate::object::{Directory, File, FilesystemObject};
use crate::path;
use crate::permissions::FilesystemPermissions;
use crate::report::{ReportTree, ReportTreeBuilder};
use crate::spec::{
    EnumCopyFileConflictStrategy, FsError, FsResult, SpecCopyOptions, SpecDeleteOptions,
    SpecIteratorConfig,
};
use crate::util::is_overlap;

fn validate_source_directory(path_dir: &Path) -> FsResult<()> {
    match fs::metadata(path_dir) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(FsError::NotADirectory {
            path: path_dir.to_path_buf(),
        }),
        Err(e) => Err(FsError::from_io(path_dir, e)),
    }
}

fn destination_of(object: &FilesystemObject, path_dir_dst: &Path) -> Option<PathBuf> {
    object.path().file_name().map(|name| path_dir_dst.join(name))
}

fn is_symlink(path: &Path) -> bool {
    path.symlink_metadata()
        .map(|meta| meta.file_type().is_symlink())
        .unwrap_or(false)
}

////////////////////////////////////////////////////////////////////////////////
// #region Copy

#[derive(Debug)]
struct SpecCopyContext<'a> {
    spec_cp_options: &'a SpecCopyOptions,
    builder_tree_report: ReportTreeBuilder,
}

/// Copy the directory `dir_source` to `dir_destination`.
///
/// The destination directory is created first; missing parents of it are
/// created only with [`SpecCopyOptions::if_create_parents`]. With
/// [`SpecCopyOptions::if_recursive`], the children passing
/// `config_iterator.filters_result` are copied level by level, and existing
/// destination files are handled by
/// [`SpecCopyOptions::rule_conflict_file`].
///
/// A destination directory that cannot be created stops the copy and yields
/// a report with `is_completed() == false`. Missing or unreadable sources,
/// overlapping trees and kind conflicts are returned as errors.
pub fn copy_tree<P, Q>(
    dir_source: P,
    dir_destination: Q,
    spec_cp_options: &SpecCopyOptions,
) -> FsResult<ReportTree>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let path_dir_src = dir_source.as_ref();
    let path_dir_dst = dir_destination.as_ref();

    validate_source_directory(path_dir_src)?;
    if !FilesystemPermissions::new(path_dir_src).is_readable() {
        return Err(FsError::PermissionDenied {
            path: path_dir_src.to_path_buf(),
            operation: "copy_directory",
        });
    }
    if is_overlap(path_dir_src, path_dir_dst) {
        return Err(FsError::Overlap {
            source_dir: path_dir_src.to_path_buf(),
            destination: path_dir_dst.to_path_buf(),
        });
    }

    let mut spec_cp_ctx = SpecCopyContext {
        spec_cp_options,
        builder_tree_report: ReportTreeBuilder::default(),
    };
    let b_completed = copy_directory(
        path_dir_src,
        path_dir_dst,
        spec_cp_options.if_create_parents,
        &mut spec_cp_ctx,
    )?;
    Ok(spec_cp_ctx.builder_tree_report.build(b_completed))
}

fn copy_directory(
    path_dir_src: &Path,
    path_dir_dst: &Path,
    if_create_parents: bool,
    spec_cp_ctx: &mut SpecCopyContext<'_>,
) -> FsResult<bool> {
    let dir_dst = Directory::new(path_dir_dst);
    if path_dir_dst.exists() && !dir_dst.exists() {
        return Err(FsError::AlreadyExists {
            path: path_dir_dst.to_path_buf(),
            operation: "copy_directory",
        });
    }

    let b_existed = dir_dst.exists();
    if let Err(e) = dir_dst.create(if_create_parents) {
        tracing::warn!(
            path = %path_dir_dst.display(),
            error = %e,
            "destination directory not created"
        );
        spec_cp_ctx.builder_tree_report.add_warning(format!(
            "Failed to create directory {} ({e})",
            path_dir_dst.display()
        ));
        return Ok(false);
    }
    if !b_existed {
        spec_cp_ctx.builder_tree_report.add_copied();
    }
    if !spec_cp_ctx.spec_cp_options.if_recursive {
        return Ok(true);
    }

    let iter_children =
        DirectoryIterator::new(path_dir_src, &spec_cp_ctx.spec_cp_options.config_iterator)?;
    for res_object in iter_children {
        let object = res_object?;
        spec_cp_ctx.builder_tree_report.add_scanned();
        let Some(path_dst) = destination_of(&object, path_dir_dst) else {
            continue;
        };

        let b_is_ok = match &object {
            FilesystemObject::Directory(dir) => {
                copy_directory(dir.path(), &path_dst, false, spec_cp_ctx)?
            }
            FilesystemObject::File(file) => copy_file_entry(file, &path_dst, spec_cp_ctx)?,
        };
        if !b_is_ok {
            return Ok(false);
        }
    }
    Ok(true)
}

fn copy_file_entry(
    file: &File,
    path_file_dst: &Path,
    spec_cp_ctx: &mut SpecCopyContext<'_>,
) -> FsResult<bool> {
    if path_file_dst.is_dir() {
        return Err(FsError::AlreadyExists {
            path: path_file_dst.to_path_buf(),
            operation: "copy_file",
        });
    }
    if path_file_dst.exists() {
        match spec_cp_ctx.spec_cp_options.rule_conflict_file {
            EnumCopyFileConflictStrategy::Skip => {
                tracing::debug!(path = %path_file_dst.display(), "existing file kept");
                spec_cp_ctx.builder_tree_report.add_skipped();
                return Ok(true);
            }
            EnumCopyFileConflictStrategy::Error => {
                return Err(FsError::AlreadyExists {
                    path: path_file_dst.to_path_buf(),
                    operation: "copy_file",
                });
            }
            EnumCopyFileConflictStrategy::Overwrite => {}
        }
    }

    file.copy(path_file_dst)?;
    tracing::debug!(src = %file.path().display(), dst = %path_file_dst.display(), "file copied");
    spec_cp_ctx.builder_tree_report.add_copied();
    Ok(true)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Move

/// Copy `dir_source` to `dir_destination`, then delete the source.
///
/// Not atomic. If the copy does not complete the source is left alone; if
/// the delete fails afterwards both trees exist. The returned report merges
/// both phases and is completed only when the source was removed.
pub fn move_tree<P, Q>(
    dir_source: P,
    dir_destination: Q,
    if_recursive: bool,
) -> FsResult<ReportTree>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let path_dir_src = dir_source.as_ref();
    let spec_cp_options = SpecCopyOptions {
        if_recursive,
        ..SpecCopyOptions::default()
    };
    let report_copy = copy_tree(path_dir_src, dir_destination, &spec_cp_options)?;
    if !report_copy.is_completed() {
        tracing::warn!(path = %path_dir_src.display(), "copy incomplete, source kept");
        return Ok(report_copy);
    }

    let spec_del_options = SpecDeleteOptions {
        if_recursive,
        ..SpecDeleteOptions::default()
    };
    let report_delete = delete_tree(path_dir_src, &spec_del_options)?;
    Ok(report_copy.chain(report_delete))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Delete

#[derive(Debug)]
struct SpecDeleteContext<'a> {
    c_root: String,
    spec_del_options: &'a SpecDeleteOptions,
    builder_tree_report: ReportTreeBuilder,
}

impl SpecDeleteContext<'_> {
    /// Exclude entries match the filename, the root-relative path or the
    /// absolute path.
    fn is_excluded(&self, object: &FilesystemObject) -> bool {
        let l_exclude = &self.spec_del_options.exclude;
        if l_exclude.is_empty() {
            return false;
        }

        let c_name = object.filename();
        let c_path = object.path_string();
        let c_relative = path::relative_path(&c_path, &self.c_root).ok();
        let c_absolute = path::absolute_path(&c_path).ok();
        l_exclude.iter().any(|c_exclude| {
            *c_exclude == c_name
                || *c_exclude == c_path
                || c_relative.as_ref() == Some(c_exclude)
                || c_absolute.as_ref() == Some(c_exclude)
        })
    }
}

/// Delete the directory `dir`.
///
/// A non-recursive delete fails with [`FsError::NotEmpty`] unless the
/// directory is empty. A recursive delete removes the children one level at
/// a time; children matching [`SpecDeleteOptions::exclude`] or failing
/// `config_iterator.filters_result` stay, and so does every directory above
/// them. The report is completed only if `dir` itself was removed.
pub fn delete_tree<P>(dir: P, spec_del_options: &SpecDeleteOptions) -> FsResult<ReportTree>
where
    P: AsRef<Path>,
{
    let path_dir = dir.as_ref();
    validate_source_directory(path_dir)?;
    if !spec_del_options.if_recursive && !Directory::new(path_dir).is_empty()? {
        return Err(FsError::NotEmpty {
            path: path_dir.to_path_buf(),
        });
    }

    let mut spec_del_ctx = SpecDeleteContext {
        c_root: path_dir.to_string_lossy().into_owned(),
        spec_del_options,
        builder_tree_report: ReportTreeBuilder::default(),
    };
    let b_removed = delete_directory(path_dir, &mut spec_del_ctx)?;
    Ok(spec_del_ctx.builder_tree_report.build(b_removed))
}

/// Delete the children of `dir` and keep `dir` itself.
///
/// Subdirectories are removed only with [`SpecDeleteOptions::if_recursive`].
/// The report is completed when nothing was left behind.
pub fn delete_tree_contents<P>(
    dir: P,
    spec_del_options: &SpecDeleteOptions,
) -> FsResult<ReportTree>
where
    P: AsRef<Path>,
{
    let path_dir = dir.as_ref();
    validate_source_directory(path_dir)?;

    let mut spec_del_ctx = SpecDeleteContext {
        c_root: path_dir.to_string_lossy().into_owned(),
        spec_del_options,
        builder_tree_report: ReportTreeBuilder::default(),
    };
    let b_is_empty = delete_children(path_dir, &mut spec_del_ctx)?;
    Ok(spec_del_ctx.builder_tree_report.build(b_is_empty))
}

fn delete_directory(path_dir: &Path, spec_del_ctx: &mut SpecDeleteContext<'_>) -> FsResult<bool> {
    if !delete_children(path_dir, spec_del_ctx)? {
        tracing::warn!(path = %path_dir.display(), "directory retained");
        spec_del_ctx
            .builder_tree_report
            .add_retained(path_dir.to_path_buf());
        return Ok(false);
    }

    if let Some(dir_parent) = Directory::new(path_dir).parent_directory()
        && !dir_parent.permissions().is_writable()
    {
        return Err(FsError::PermissionDenied {
            path: path_dir.to_path_buf(),
            operation: "delete_directory",
        });
    }
    fs::remove_dir(path_dir).map_err(|e| FsError::from_io(path_dir, e))?;
    tracing::debug!(path = %path_dir.display(), "directory removed");
    spec_del_ctx.builder_tree_report.add_deleted();
    Ok(true)
}

/// Returns whether every child is gone.
fn delete_children(path_dir: &Path, spec_del_ctx: &mut SpecDeleteContext<'_>) -> FsResult<bool> {
    let iter_children = DirectoryIterator::with_filters(path_dir, SpecFilterChain::new())?;
    let mut b_is_all_deleted = true;

    for res_object in iter_children {
        let object = res_object?;
        spec_del_ctx.builder_tree_report.add_scanned();

        if spec_del_ctx.is_excluded(&object) {
            tracing::debug!(path = %object.path().display(), "excluded from delete");
            spec_del_ctx.builder_tree_report.add_excluded();
            b_is_all_deleted = false;
            continue;
        }
        if spec_del_ctx
            .spec_del_options
            .config_iterator
            .filters_result
            .should_prune(&object)
        {
            tracing::debug!(path = %object.path().display(), "filtered out of delete");
            spec_del_ctx.builder_tree_report.add_filtered();
            b_is_all_deleted = false;
            continue;
        }

        match &object {
            FilesystemObject::Directory(dir) if !is_symlink(dir.path()) => {
                if !spec_del_ctx.spec_del_options.if_recursive {
                    spec_del_ctx
                        .builder_tree_report
                        .add_retained(dir.path().to_path_buf());
                    b_is_all_deleted = false;
                    continue;
                }
                if !delete_directory(dir.path(), spec_del_ctx)? {
                    b_is_all_deleted = false;
                }
            }
            _ => {
                File::new(object.path()).delete()?;
                tracing::debug!(path = %object.path().display(), "file removed");
                spec_del_ctx.builder_tree_report.add_deleted();
            }
        }
    }
    Ok(b_is_all_deleted)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Lookup

/// Whether an entry of `dir` has exactly `relative_path` as its path below `dir`.
///
/// Plain string equality, so `sub/` does not match `sub`.
pub fn contains_relative_path<P>(dir: P, relative_path: &str, if_recursive: bool) -> FsResult<bool>
where
    P: AsRef<Path>,
{
    let path_dir = dir.as_ref();
    let c_root = path_dir.to_string_lossy().into_owned();
    let config = SpecIteratorConfig::default().with_recursive(if_recursive);

    for res_object in DirectoryWalk::new(path_dir, &config)? {
        let object = res_object?;
        if object.relative_path(&c_root).is_ok_and(|c| c == relative_path) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Look for `target_name` in the directory of `start` and then in each
/// ancestor up to the filesystem root.
pub fn find_upwards<P>(start: P, target_name: &str) -> FsResult<FilesystemObject>
where
    P: AsRef<Path>,
{
    let mut path_dir = PathBuf::from(path::absolute_path(&start.as_ref().to_string_lossy())?);
    if !path_dir.is_dir() {
        path_dir.pop();
    }

    loop {
        let path_candidate = path_dir.join(target_name);
        if path_candidate.exists() {
            return FilesystemObject::from_path(path_candidate);
        }
        if !path_dir.pop() {
            break;
        }
    }
    Err(FsError::NotFound {
        path: PathBuf::from(target_name),
    })
}

/// First entry named `target_name` in a pre-order walk below `start`.
pub fn find_downwards<P>(start: P, target_name: &str) -> FsResult<FilesystemObject>
where
    P: AsRef<Path>,
{
    let path_dir = start.as_ref();
    for res_object in RecursiveDirectoryIterator::new(path_dir, &SpecIteratorConfig::default())? {
        let object = res_object?;
        if object.filename() == target_name {
            return Ok(object);
        }
    }
    Err(FsError::NotFound {
        path: path_dir.join(target_name),
    })
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
