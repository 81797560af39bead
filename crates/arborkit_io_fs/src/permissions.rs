//! Read/write capability checks, run before the OS call that needs them.

use std::path::{Path, PathBuf};

use crate::spec::{EnumStreamMode, FsError, FsResult};

/// Capability view of one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilesystemPermissions {
    path: PathBuf,
}

impl FilesystemPermissions {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path the checks apply to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the current process may read the path.
    pub fn is_readable(&self) -> bool {
        check_access(&self.path, EnumAccess::Read)
    }

    /// Whether the current process may write the path.
    ///
    /// For a missing path this is the writability of its parent directory,
    /// i.e. whether the path could be created.
    pub fn is_writable(&self) -> bool {
        if self.path.symlink_metadata().is_ok() {
            return check_access(&self.path, EnumAccess::Write);
        }
        let path_parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        check_access(path_parent, EnumAccess::Write)
    }

    /// Fail with [`FsError::PermissionDenied`] unless `mode` can be opened.
    ///
    /// A creating mode on a path whose parent directory is missing fails
    /// with [`FsError::NotFound`] for that parent instead.
    pub fn validate_stream_mode(&self, mode: EnumStreamMode) -> FsResult<()> {
        if mode.requires_write()
            && self.path.symlink_metadata().is_err()
            && let Some(path_parent) = self.path.parent()
            && !path_parent.as_os_str().is_empty()
            && !path_parent.is_dir()
        {
            return Err(FsError::NotFound {
                path: path_parent.to_path_buf(),
            });
        }
        let mut l_missing: Vec<&str> = Vec::new();
        if mode.requires_read() && self.path.exists() && !self.is_readable() {
            l_missing.push("read");
        }
        if mode.requires_write() && !self.is_writable() {
            l_missing.push("write");
        }
        if l_missing.is_empty() {
            return Ok(());
        }

        tracing::debug!(
            path = %self.path.display(),
            mode = mode.as_str(),
            missing = ?l_missing,
            "stream mode rejected"
        );
        Err(FsError::PermissionDenied {
            path: self.path.clone(),
            operation: "open_stream",
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum EnumAccess {
    Read,
    Write,
}

#[cfg(unix)]
fn check_access(path: &Path, access: EnumAccess) -> bool {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let Ok(c_path) = CString::new(path.as_os_str().as_bytes()) else {
        return false;
    };
    let n_mode = match access {
        EnumAccess::Read => libc::R_OK,
        EnumAccess::Write => libc::W_OK,
    };
    // SAFETY: `c_path` is a valid NUL-terminated string for the duration of the call.
    unsafe { libc::access(c_path.as_ptr(), n_mode) == 0 }
}

#[cfg(not(unix))]
fn check_access(path: &Path, access: EnumAccess) -> bool {
    match (std::fs::metadata(path), access) {
        (Ok(_), EnumAccess::Read) => true,
        (Ok(meta), EnumAccess::Write) => !meta.permissions().readonly(),
        (Err(_), _) => false,
    }
}

#[cfg(all(test, unix))]
pub(crate) fn is_privileged_process() -> bool {
    // SAFETY: geteuid has no preconditions.
    unsafe { libc::geteuid() == 0 }
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::fs::PermissionsExt;

    use super::{FilesystemPermissions, is_privileged_process};
    use crate::spec::{EnumStreamMode, FsError};

    #[test]
    fn missing_path_inherits_parent_writability() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let permissions = FilesystemPermissions::new(tmp.path().join("new.txt"));
        assert!(permissions.is_writable());
        assert!(!permissions.is_readable());
        assert!(permissions.validate_stream_mode(EnumStreamMode::Write).is_ok());
    }

    #[test]
    fn read_only_file_rejects_write_modes() {
        if is_privileged_process() {
            return;
        }
        let tmp = tempfile::tempdir().expect("tempdir");
        let path_file = tmp.path().join("ro.txt");
        std::fs::write(&path_file, "x").expect("write");
        std::fs::set_permissions(&path_file, std::fs::Permissions::from_mode(0o444))
            .expect("chmod");

        let permissions = FilesystemPermissions::new(&path_file);
        assert!(permissions.is_readable());
        assert!(!permissions.is_writable());
        assert!(permissions.validate_stream_mode(EnumStreamMode::Read).is_ok());
        let err = permissions
            .validate_stream_mode(EnumStreamMode::Append)
            .expect_err("append needs write");
        assert!(matches!(err, FsError::PermissionDenied { .. }));
    }
}
