//! Filesystem object model.
//!
//! [`File`] and [`Directory`] wrap a path and nothing else: construction does
//! no I/O, and existence or kind are checked lazily by the operation that
//! needs them. [`FilesystemObject`] is the tagged union yielded by iterators.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::iter::{DirectoryIterator, DirectoryWalk, RecursiveDirectoryIterator};
use crate::mutate;
use crate::path;
use crate::permissions::FilesystemPermissions;
use crate::spec::{
    EnumObjectKind, EnumStreamMode, FsError, FsResult, SpecCopyOptions, SpecDeleteOptions,
    SpecIteratorConfig,
};
use crate::util::copy_file_with_metadata;

fn filename_of(path: &Path) -> String {
    match path.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => path.to_string_lossy().into_owned(),
    }
}

fn parent_of(path: &Path) -> Option<Directory> {
    match path.parent() {
        Some(p) if p.as_os_str().is_empty() => Some(Directory::new(".")),
        Some(p) => Some(Directory::new(p)),
        None => None,
    }
}

fn sibling_path(path: &Path, new_name: &str) -> PathBuf {
    match path.parent() {
        Some(p) => p.join(new_name),
        None => PathBuf::from(new_name),
    }
}

////////////////////////////////////////////////////////////////////////////////
// #region FilesystemObject

/// A file or a directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FilesystemObject {
    File(File),
    Directory(Directory),
}

impl FilesystemObject {
    /// Wrap an existing path, detecting its kind.
    pub fn from_path(path: impl AsRef<Path>) -> FsResult<Self> {
        let path = path.as_ref();
        match fs::metadata(path) {
            Ok(meta) if meta.is_dir() => Ok(Self::Directory(Directory::new(path))),
            Ok(_) => Ok(Self::File(File::new(path))),
            Err(e) => Err(FsError::from_io(path, e)),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::File(file) => file.path(),
            Self::Directory(dir) => dir.path(),
        }
    }

    /// Path as a (lossily converted) string.
    pub fn path_string(&self) -> String {
        self.path().to_string_lossy().into_owned()
    }

    pub fn kind(&self) -> EnumObjectKind {
        match self {
            Self::File(_) => EnumObjectKind::File,
            Self::Directory(_) => EnumObjectKind::Directory,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Self::File(_))
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Directory(_))
    }

    /// Last path component; the whole path when there is none (`/`).
    pub fn filename(&self) -> String {
        filename_of(self.path())
    }

    pub fn extension(&self) -> Option<String> {
        self.path()
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
    }

    pub fn exists(&self) -> bool {
        match self {
            Self::File(file) => file.exists(),
            Self::Directory(dir) => dir.exists(),
        }
    }

    /// `true` for a path without parent, i.e. the filesystem root.
    pub fn is_root(&self) -> bool {
        self.path().has_root() && self.path().parent().is_none()
    }

    /// See [`path::absolute_path`].
    pub fn absolute_path(&self) -> FsResult<String> {
        path::absolute_path(&self.path_string())
    }

    /// Lexical path below `ancestor`; see [`path::relative_path`].
    pub fn relative_path(&self, ancestor: &str) -> FsResult<String> {
        path::relative_path(&self.path_string(), ancestor)
    }

    pub fn parent_directory(&self) -> Option<Directory> {
        parent_of(self.path())
    }

    /// Delete the node; files ignore `options`.
    ///
    /// Returns whether the node is gone afterwards.
    pub fn delete(&self, options: &SpecDeleteOptions) -> FsResult<bool> {
        match self {
            Self::File(file) => file.delete().map(|_| true),
            Self::Directory(dir) => dir.delete(options),
        }
    }

    pub fn as_file(&self) -> Option<&File> {
        match self {
            Self::File(file) => Some(file),
            Self::Directory(_) => None,
        }
    }

    pub fn as_directory(&self) -> Option<&Directory> {
        match self {
            Self::File(_) => None,
            Self::Directory(dir) => Some(dir),
        }
    }
}

impl From<File> for FilesystemObject {
    fn from(file: File) -> Self {
        Self::File(file)
    }
}

impl From<Directory> for FilesystemObject {
    fn from(dir: Directory) -> Self {
        Self::Directory(dir)
    }
}

impl fmt::Display for FilesystemObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path().display())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region File

/// A regular file addressed by path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct File {
    path: PathBuf,
}

impl File {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn filename(&self) -> String {
        filename_of(&self.path)
    }

    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
    }

    /// Compare the extension, ignoring leading dots of `extension`.
    ///
    /// `None` asks whether the file has no extension at all.
    pub fn has_extension(&self, extension: Option<&str>) -> bool {
        match (self.extension(), extension) {
            (None, None) => true,
            (Some(actual), Some(expected)) => actual == expected.trim_start_matches('.'),
            _ => false,
        }
    }

    /// `true` when a regular file (or a link to one) exists at the path.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Size in bytes.
    pub fn size(&self) -> FsResult<u64> {
        let meta = fs::metadata(&self.path).map_err(|e| FsError::from_io(&self.path, e))?;
        Ok(meta.len())
    }

    pub fn is_empty(&self) -> FsResult<bool> {
        Ok(self.size()? == 0)
    }

    pub fn permissions(&self) -> FilesystemPermissions {
        FilesystemPermissions::new(&self.path)
    }

    pub fn parent_directory(&self) -> Option<Directory> {
        parent_of(&self.path)
    }

    /// Create an empty file; an existing file is left untouched.
    ///
    /// Missing parents are created only when `if_recursive` is set.
    pub fn create(&self, if_recursive: bool) -> FsResult<()> {
        if self.path.is_dir() {
            return Err(FsError::AlreadyExists {
                path: self.path.clone(),
                operation: "create_file",
            });
        }
        if self.exists() {
            return Ok(());
        }

        if let Some(dir_parent) = self.parent_directory()
            && !dir_parent.exists()
        {
            if !if_recursive {
                return Err(FsError::NotFound {
                    path: dir_parent.path().to_path_buf(),
                });
            }
            dir_parent.create(true)?;
        }
        if !self.permissions().is_writable() {
            return Err(FsError::PermissionDenied {
                path: self.path.clone(),
                operation: "create_file",
            });
        }

        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .map_err(|e| FsError::from_io(&self.path, e))?;
        Ok(())
    }

    /// Open a stream after checking the capabilities `mode` needs.
    ///
    /// The handle closes when dropped.
    pub fn open_stream(&self, mode: EnumStreamMode) -> FsResult<fs::File> {
        if mode.requires_existing() && !self.exists() {
            return Err(FsError::NotFound {
                path: self.path.clone(),
            });
        }
        self.permissions().validate_stream_mode(mode)?;
        mode.to_open_options()
            .open(&self.path)
            .map_err(|e| FsError::from_io(&self.path, e))
    }

    /// Copy to `destination`, replacing an existing file there.
    pub fn copy(&self, destination: impl AsRef<Path>) -> FsResult<File> {
        let path_file_dst = destination.as_ref();
        if !self.exists() {
            return Err(FsError::NotFound {
                path: self.path.clone(),
            });
        }
        if !self.permissions().is_readable() {
            return Err(FsError::PermissionDenied {
                path: self.path.clone(),
                operation: "copy_file",
            });
        }
        if path_file_dst.is_dir() {
            return Err(FsError::AlreadyExists {
                path: path_file_dst.to_path_buf(),
                operation: "copy_file",
            });
        }
        if let Some(dir_parent) = parent_of(path_file_dst)
            && !dir_parent.exists()
        {
            return Err(FsError::NotFound {
                path: dir_parent.path().to_path_buf(),
            });
        }
        if !FilesystemPermissions::new(path_file_dst).is_writable() {
            return Err(FsError::PermissionDenied {
                path: path_file_dst.to_path_buf(),
                operation: "copy_file",
            });
        }

        copy_file_with_metadata(&self.path, path_file_dst)
            .map_err(|e| FsError::from_io(path_file_dst, e))?;
        Ok(File::new(path_file_dst))
    }

    /// Copy to `destination`, then delete the source.
    pub fn move_to(&self, destination: impl AsRef<Path>) -> FsResult<File> {
        let file_dst = self.copy(destination)?;
        self.delete()?;
        Ok(file_dst)
    }

    /// Rename within the parent directory.
    pub fn rename(&self, new_name: &str) -> FsResult<File> {
        let path_file_dst = sibling_path(&self.path, new_name);
        if path_file_dst.symlink_metadata().is_ok() {
            return Err(FsError::AlreadyExists {
                path: path_file_dst,
                operation: "rename",
            });
        }
        fs::rename(&self.path, &path_file_dst).map_err(|e| FsError::from_io(&self.path, e))?;
        Ok(File::new(path_file_dst))
    }

    /// Remove the file; the parent directory must be writable.
    pub fn delete(&self) -> FsResult<()> {
        if self.path.symlink_metadata().is_err() {
            return Err(FsError::NotFound {
                path: self.path.clone(),
            });
        }
        if let Some(dir_parent) = self.parent_directory()
            && !dir_parent.permissions().is_writable()
        {
            return Err(FsError::PermissionDenied {
                path: self.path.clone(),
                operation: "delete_file",
            });
        }
        fs::remove_file(&self.path).map_err(|e| FsError::from_io(&self.path, e))
    }

    /// Truncate to zero length.
    pub fn delete_contents(&self) -> FsResult<()> {
        self.open_stream(EnumStreamMode::ReadWrite)?
            .set_len(0)
            .map_err(|e| FsError::from_io(&self.path, e))
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Directory

/// A directory addressed by path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Directory {
    path: PathBuf,
}

impl Directory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn filename(&self) -> String {
        filename_of(&self.path)
    }

    pub fn exists(&self) -> bool {
        self.path.is_dir()
    }

    pub fn permissions(&self) -> FilesystemPermissions {
        FilesystemPermissions::new(&self.path)
    }

    pub fn parent_directory(&self) -> Option<Directory> {
        parent_of(&self.path)
    }

    /// Create the directory; an existing directory is left untouched.
    pub fn create(&self, if_recursive: bool) -> FsResult<()> {
        if self.exists() {
            return Ok(());
        }
        if self.path.symlink_metadata().is_ok() {
            return Err(FsError::AlreadyExists {
                path: self.path.clone(),
                operation: "create_directory",
            });
        }

        if if_recursive {
            return fs::create_dir_all(&self.path).map_err(|e| FsError::from_io(&self.path, e));
        }
        if let Some(dir_parent) = self.parent_directory()
            && !dir_parent.exists()
        {
            return Err(FsError::NotFound {
                path: dir_parent.path().to_path_buf(),
            });
        }
        if !self.permissions().is_writable() {
            return Err(FsError::PermissionDenied {
                path: self.path.clone(),
                operation: "create_directory",
            });
        }
        fs::create_dir(&self.path).map_err(|e| FsError::from_io(&self.path, e))
    }

    /// `true` when the directory has no entries.
    pub fn is_empty(&self) -> FsResult<bool> {
        let mut iter_read_dir =
            fs::read_dir(&self.path).map_err(|e| FsError::from_io(&self.path, e))?;
        Ok(iter_read_dir.next().is_none())
    }

    /// Sum of the sizes of every file in the tree.
    pub fn size(&self) -> FsResult<u64> {
        let mut n_bytes = 0u64;
        for res_object in self.iter_recursive(&SpecIteratorConfig::default())? {
            if let FilesystemObject::File(file) = res_object? {
                n_bytes += file.size()?;
            }
        }
        Ok(n_bytes)
    }

    /// Immediate children passing `config.filters_result`.
    pub fn iter(&self, config: &SpecIteratorConfig) -> FsResult<DirectoryIterator> {
        DirectoryIterator::new(&self.path, config)
    }

    /// Whole tree, pre-order.
    pub fn iter_recursive(
        &self,
        config: &SpecIteratorConfig,
    ) -> FsResult<RecursiveDirectoryIterator> {
        RecursiveDirectoryIterator::new(&self.path, config)
    }

    /// Flat or recursive iteration depending on `config.if_recursive`.
    pub fn walk(&self, config: &SpecIteratorConfig) -> FsResult<DirectoryWalk> {
        DirectoryWalk::new(&self.path, config)
    }

    /// See [`crate::copy_tree`]. Returns whether the copy completed.
    pub fn copy(&self, destination: impl AsRef<Path>, options: &SpecCopyOptions) -> FsResult<bool> {
        mutate::copy_tree(&self.path, destination, options).map(|report| report.is_completed())
    }

    /// See [`crate::move_tree`]. Returns whether the source was removed.
    pub fn move_to(&self, destination: impl AsRef<Path>, if_recursive: bool) -> FsResult<bool> {
        mutate::move_tree(&self.path, destination, if_recursive).map(|report| report.is_completed())
    }

    /// Rename within the parent directory.
    pub fn rename(&self, new_name: &str) -> FsResult<Directory> {
        let path_dir_dst = sibling_path(&self.path, new_name);
        if path_dir_dst.symlink_metadata().is_ok() {
            return Err(FsError::AlreadyExists {
                path: path_dir_dst,
                operation: "rename",
            });
        }
        fs::rename(&self.path, &path_dir_dst).map_err(|e| FsError::from_io(&self.path, e))?;
        Ok(Directory::new(path_dir_dst))
    }

    /// See [`crate::delete_tree`]. Returns whether the directory was removed.
    pub fn delete(&self, options: &SpecDeleteOptions) -> FsResult<bool> {
        mutate::delete_tree(&self.path, options).map(|report| report.is_completed())
    }

    /// Delete the children but keep the directory.
    ///
    /// Returns whether every child was removed.
    pub fn delete_contents(&self, options: &SpecDeleteOptions) -> FsResult<bool> {
        mutate::delete_tree_contents(&self.path, options).map(|report| report.is_completed())
    }

    /// Whether an entry's path relative to this directory equals `relative_path`.
    pub fn contains_relative_path(
        &self,
        relative_path: &str,
        if_recursive: bool,
    ) -> FsResult<bool> {
        mutate::contains_relative_path(&self.path, relative_path, if_recursive)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};

    use super::{Directory, File, FilesystemObject};
    use crate::spec::{EnumObjectKind, EnumStreamMode, FsError, SpecDeleteOptions};

    #[test]
    fn construction_does_no_io() {
        let file = File::new("/definitely/not/here.txt");
        assert!(!file.exists());
        assert_eq!(file.filename(), "here.txt");
        assert_eq!(file.extension().as_deref(), Some("txt"));
        assert!(file.has_extension(Some(".txt")));
        assert!(file.has_extension(Some("txt")));
        assert!(!file.has_extension(None));
        assert!(File::new("/x/Makefile").has_extension(None));

        let object = FilesystemObject::from(Directory::new("/definitely/not"));
        assert_eq!(object.kind(), EnumObjectKind::Directory);
        assert!(!object.exists());
        assert!(!object.is_root());
        assert!(FilesystemObject::from(Directory::new("/")).is_root());
    }

    #[test]
    fn from_path_detects_kind() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path_file = tmp.path().join("a.txt");
        std::fs::write(&path_file, "a").expect("write");

        assert!(FilesystemObject::from_path(&path_file).expect("file").is_file());
        assert!(FilesystemObject::from_path(tmp.path()).expect("dir").is_dir());
        let err = FilesystemObject::from_path(tmp.path().join("missing")).expect_err("missing");
        assert!(matches!(err, FsError::NotFound { .. }));
    }

    #[test]
    fn relative_path_and_parent() {
        let object = FilesystemObject::from(File::new("/data/run/a.txt"));
        assert_eq!(object.relative_path("/data").expect("relative"), "run/a.txt");
        assert!(matches!(
            object.relative_path("/other"),
            Err(FsError::NotRelative { .. })
        ));
        let dir_parent = object.parent_directory().expect("parent");
        assert_eq!(dir_parent.path(), std::path::Path::new("/data/run"));
        assert_eq!(
            File::new("a.txt").parent_directory().expect("parent").path(),
            std::path::Path::new(".")
        );
    }

    #[test]
    fn file_create_requires_parent_unless_recursive() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let file = File::new(tmp.path().join("deep/nested/a.txt"));

        let err = file.create(false).expect_err("missing parent");
        assert!(matches!(err, FsError::NotFound { .. }));

        file.create(true).expect("recursive create");
        assert!(file.exists());
        assert!(file.is_empty().expect("is_empty"));
        file.create(false).expect("existing file is fine");

        let err = File::new(tmp.path()).create(false).expect_err("dir at path");
        assert!(matches!(err, FsError::AlreadyExists { .. }));
    }

    #[test]
    fn missing_destination_parent_is_not_found() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let file = File::new(tmp.path().join("a.txt"));
        file.create(false).expect("create");
        let path_missing_parent = tmp.path().join("no/such");

        let err = file
            .copy(path_missing_parent.join("b.txt"))
            .expect_err("copy into missing parent");
        assert!(matches!(err, FsError::NotFound { ref path } if *path == path_missing_parent));

        let err = file
            .move_to(path_missing_parent.join("b.txt"))
            .expect_err("move into missing parent");
        assert!(matches!(err, FsError::NotFound { .. }));
        assert!(file.exists());

        let err = File::new(path_missing_parent.join("c.txt"))
            .open_stream(EnumStreamMode::Write)
            .expect_err("write stream into missing parent");
        assert!(matches!(err, FsError::NotFound { ref path } if *path == path_missing_parent));
    }

    #[test]
    fn file_streams_copy_and_truncate() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let file = File::new(tmp.path().join("a.txt"));

        let err = file.open_stream(EnumStreamMode::Read).expect_err("missing");
        assert!(matches!(err, FsError::NotFound { .. }));

        file.open_stream(EnumStreamMode::Write)
            .expect("write stream")
            .write_all(b"hello")
            .expect("write");
        file.open_stream(EnumStreamMode::Append)
            .expect("append stream")
            .write_all(b" world")
            .expect("append");
        let err = file
            .open_stream(EnumStreamMode::CreateExclusive)
            .expect_err("exclusive on existing");
        assert!(matches!(err, FsError::AlreadyExists { .. }));

        let mut txt = String::new();
        file.open_stream(EnumStreamMode::Read)
            .expect("read stream")
            .read_to_string(&mut txt)
            .expect("read");
        assert_eq!(txt, "hello world");
        assert_eq!(file.size().expect("size"), 11);

        let file_copy = file.copy(tmp.path().join("b.txt")).expect("copy");
        assert_eq!(file_copy.size().expect("size"), 11);
        let err = file.copy(tmp.path()).expect_err("dir destination");
        assert!(matches!(err, FsError::AlreadyExists { .. }));

        file.delete_contents().expect("truncate");
        assert!(file.is_empty().expect("is_empty"));
    }

    #[test]
    fn file_rename_move_and_delete() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let file = File::new(tmp.path().join("a.txt"));
        file.create(false).expect("create");
        File::new(tmp.path().join("taken.txt")).create(false).expect("create");

        let err = file.rename("taken.txt").expect_err("taken");
        assert!(matches!(err, FsError::AlreadyExists { .. }));
        let file = file.rename("b.txt").expect("rename");
        assert_eq!(file.filename(), "b.txt");

        let file = file.move_to(tmp.path().join("c.txt")).expect("move");
        assert!(file.exists());
        assert!(!tmp.path().join("b.txt").exists());

        file.delete().expect("delete");
        assert!(matches!(file.delete(), Err(FsError::NotFound { .. })));
    }

    #[test]
    fn directory_create_is_empty_and_size() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let dir = Directory::new(tmp.path().join("a/b"));

        assert!(matches!(dir.create(false), Err(FsError::NotFound { .. })));
        dir.create(true).expect("create");
        dir.create(false).expect("idempotent");
        assert!(dir.is_empty().expect("is_empty"));

        std::fs::write(dir.path().join("x.bin"), [0u8; 3]).expect("write");
        std::fs::create_dir(dir.path().join("c")).expect("mkdir");
        std::fs::write(dir.path().join("c/y.bin"), [0u8; 4]).expect("write");
        assert!(!dir.is_empty().expect("is_empty"));
        assert_eq!(dir.size().expect("size"), 7);

        std::fs::write(tmp.path().join("file"), "").expect("write");
        let err = Directory::new(tmp.path().join("file"))
            .create(false)
            .expect_err("file at path");
        assert!(matches!(err, FsError::AlreadyExists { .. }));
    }

    #[test]
    fn directory_rename_and_delete_dispatch() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let dir = Directory::new(tmp.path().join("old"));
        dir.create(false).expect("create");
        std::fs::write(dir.path().join("x.txt"), "x").expect("write");

        let dir = dir.rename("new").expect("rename");
        assert!(dir.exists());

        let object = FilesystemObject::from(dir.clone());
        let err = object
            .delete(&SpecDeleteOptions::default())
            .expect_err("non-recursive on non-empty");
        assert!(matches!(err, FsError::NotEmpty { .. }));

        let b_removed = object
            .delete(&SpecDeleteOptions {
                if_recursive: true,
                ..SpecDeleteOptions::default()
            })
            .expect("delete");
        assert!(b_removed);
        assert!(!dir.exists());
    }
}
