//! Lazy, pull-based directory iteration.
//!
//! Entry order follows the host directory listing (`fs::read_dir`), which is
//! not sorted; collect and sort when order matters. Every open directory
//! level holds exactly one OS handle, released when the level is exhausted,
//! skipped or dropped.

use std::fs;
use std::path::{Path, PathBuf};

use crate::filter::SpecFilterChain;
use crate::object::{Directory, File, FilesystemObject};
use crate::spec::{FsError, FsResult, SpecIteratorConfig};

fn validate_root(path_dir: &Path) -> FsResult<()> {
    match fs::metadata(path_dir) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(FsError::NotADirectory {
            path: path_dir.to_path_buf(),
        }),
        Err(e) => Err(FsError::from_io(path_dir, e)),
    }
}

/// Classify a listing entry; symlinks take the kind of their target.
fn object_from_entry(entry: &fs::DirEntry) -> FilesystemObject {
    let path_entry = entry.path();
    let b_is_dir = match entry.file_type() {
        Ok(file_type) if file_type.is_symlink() => path_entry.is_dir(),
        Ok(file_type) => file_type.is_dir(),
        Err(_) => path_entry.is_dir(),
    };
    if b_is_dir {
        FilesystemObject::Directory(Directory::new(path_entry))
    } else {
        FilesystemObject::File(File::new(path_entry))
    }
}

////////////////////////////////////////////////////////////////////////////////
// #region DirectoryIterator

#[derive(Debug)]
enum EnumIteratorState {
    NotStarted,
    Positioned(FilesystemObject),
    Exhausted,
}

/// Iterator over the immediate children of one directory.
///
/// Entries failing `filters_result` are skipped transparently. Besides the
/// [`Iterator`] impl it exposes the explicit cursor (`rewind`, `advance`,
/// `current`, `valid`); `Iterator::next` yields the cursor position that has
/// not been handed out yet and advances otherwise, so both styles can be
/// mixed.
#[derive(Debug)]
pub struct DirectoryIterator {
    path_dir: PathBuf,
    filters_result: SpecFilterChain,
    iter_read_dir: Option<fs::ReadDir>,
    state: EnumIteratorState,
    b_is_fresh: bool,
    n_key: usize,
}

impl DirectoryIterator {
    /// Iterate `path_dir` filtered by `config.filters_result`.
    ///
    /// The directory is validated here but only opened on the first advance.
    pub fn new(path_dir: impl AsRef<Path>, config: &SpecIteratorConfig) -> FsResult<Self> {
        Self::with_filters(path_dir, config.filters_result.clone())
    }

    pub(crate) fn with_filters(
        path_dir: impl AsRef<Path>,
        filters_result: SpecFilterChain,
    ) -> FsResult<Self> {
        let path_dir = path_dir.as_ref().to_path_buf();
        validate_root(&path_dir)?;
        Ok(Self {
            path_dir,
            filters_result,
            iter_read_dir: None,
            state: EnumIteratorState::NotStarted,
            b_is_fresh: false,
            n_key: 0,
        })
    }

    /// Directory being iterated.
    pub fn path(&self) -> &Path {
        &self.path_dir
    }

    /// Zero-based position among the entries that passed the filters.
    pub fn key(&self) -> usize {
        self.n_key
    }

    /// Reopen the directory and position on the first passing entry.
    pub fn rewind(&mut self) -> FsResult<()> {
        self.iter_read_dir = None;
        self.n_key = 0;
        self.state = EnumIteratorState::NotStarted;

        match fs::read_dir(&self.path_dir) {
            Ok(iter_read_dir) => self.iter_read_dir = Some(iter_read_dir),
            Err(e) => {
                self.state = EnumIteratorState::Exhausted;
                return Err(FsError::from_io(&self.path_dir, e));
            }
        }
        self.advance()
    }

    /// Move to the next passing entry, or to the exhausted state.
    pub fn advance(&mut self) -> FsResult<()> {
        if matches!(self.state, EnumIteratorState::NotStarted) && self.iter_read_dir.is_none() {
            return self.rewind();
        }

        loop {
            let Some(iter_read_dir) = self.iter_read_dir.as_mut() else {
                self.state = EnumIteratorState::Exhausted;
                return Ok(());
            };

            let entry = match iter_read_dir.next() {
                None => {
                    self.iter_read_dir = None;
                    self.state = EnumIteratorState::Exhausted;
                    return Ok(());
                }
                Some(Err(e)) => return Err(FsError::from_io(&self.path_dir, e)),
                Some(Ok(entry)) => entry,
            };

            let c_name = entry.file_name();
            if c_name == "." || c_name == ".." {
                continue;
            }
            let object = object_from_entry(&entry);
            if self.filters_result.should_prune(&object) {
                continue;
            }

            if matches!(self.state, EnumIteratorState::Positioned(_)) {
                self.n_key += 1;
            }
            self.state = EnumIteratorState::Positioned(object);
            self.b_is_fresh = true;
            return Ok(());
        }
    }

    /// Object at the cursor.
    pub fn current(&self) -> FsResult<&FilesystemObject> {
        match &self.state {
            EnumIteratorState::Positioned(object) => Ok(object),
            _ => Err(FsError::InvalidIteratorState {
                path: self.path_dir.clone(),
            }),
        }
    }

    /// `true` while positioned on a passing entry.
    pub fn valid(&self) -> bool {
        matches!(self.state, EnumIteratorState::Positioned(_))
    }
}

impl Iterator for DirectoryIterator {
    type Item = FsResult<FilesystemObject>;

    fn next(&mut self) -> Option<Self::Item> {
        let res_move = match self.state {
            EnumIteratorState::Exhausted => return None,
            EnumIteratorState::NotStarted => self.rewind(),
            EnumIteratorState::Positioned(_) if self.b_is_fresh => Ok(()),
            EnumIteratorState::Positioned(_) => self.advance(),
        };
        if let Err(e) = res_move {
            return Some(Err(e));
        }

        match &self.state {
            EnumIteratorState::Positioned(object) => {
                self.b_is_fresh = false;
                Some(Ok(object.clone()))
            }
            _ => None,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region RecursiveDirectoryIterator

/// Depth-first, pre-order walk over a directory tree.
///
/// The walk is a stack of [`DirectoryIterator`] frames, one per open level.
/// A directory passing `filters_descend` gets its frame pushed on the
/// advance after it was visited, so it is always seen before its children.
/// `filters_result` only decides what is yielded: a directory can be
/// entered without being yielded and yielded without being entered.
#[derive(Debug)]
pub struct RecursiveDirectoryIterator {
    path_root: PathBuf,
    config: SpecIteratorConfig,
    l_frames: Vec<DirectoryIterator>,
    path_pending_descend: Option<PathBuf>,
    object_current: Option<FilesystemObject>,
    b_is_started: bool,
    b_is_exhausted: bool,
}

impl RecursiveDirectoryIterator {
    pub fn new(path_root: impl AsRef<Path>, config: &SpecIteratorConfig) -> FsResult<Self> {
        let path_root = path_root.as_ref().to_path_buf();
        validate_root(&path_root)?;
        Ok(Self {
            path_root,
            config: config.clone(),
            l_frames: Vec::new(),
            path_pending_descend: None,
            object_current: None,
            b_is_started: false,
            b_is_exhausted: false,
        })
    }

    /// Root of the walk.
    pub fn path(&self) -> &Path {
        &self.path_root
    }

    /// Number of open levels; 1 while walking the root's children.
    pub fn depth(&self) -> usize {
        self.l_frames.len()
    }

    /// Last yielded object.
    pub fn current(&self) -> FsResult<&FilesystemObject> {
        self.object_current
            .as_ref()
            .ok_or_else(|| FsError::InvalidIteratorState {
                path: self.path_root.clone(),
            })
    }

    /// `true` while positioned on a yielded object.
    pub fn valid(&self) -> bool {
        !self.b_is_exhausted && self.object_current.is_some()
    }

    /// Drop every open level and start over on the next advance.
    pub fn rewind(&mut self) {
        self.l_frames.clear();
        self.path_pending_descend = None;
        self.object_current = None;
        self.b_is_started = false;
        self.b_is_exhausted = false;
    }

    /// Abandon part of the walk.
    ///
    /// If the last yielded object is a directory, its subtree is not entered
    /// and its siblings still follow. Otherwise the rest of the current level
    /// is abandoned and the walk resumes in the parent level. Once no level
    /// is left the iterator is exhausted.
    pub fn skip_directory(&mut self) {
        if let Some(object) = self.object_current.take()
            && object.is_dir()
        {
            self.path_pending_descend = None;
            tracing::trace!(path = %object.path().display(), "subtree skipped");
            return;
        }

        self.path_pending_descend = None;
        if let Some(frame) = self.l_frames.pop() {
            tracing::trace!(path = %frame.path().display(), "level abandoned");
        }
        if self.l_frames.is_empty() {
            self.b_is_started = true;
            self.b_is_exhausted = true;
        }
    }

    fn push_frame(&mut self, path_dir: &Path) -> FsResult<()> {
        let frame = DirectoryIterator::with_filters(path_dir, SpecFilterChain::new())?;
        tracing::trace!(
            path = %path_dir.display(),
            depth = self.l_frames.len() + 1,
            "level opened"
        );
        self.l_frames.push(frame);
        Ok(())
    }
}

fn is_self_or_parent_reference(object: &FilesystemObject, path_frame: &Path) -> bool {
    let c_name = object.filename();
    c_name == "." || c_name == ".." || object.path() == path_frame
}

impl Iterator for RecursiveDirectoryIterator {
    type Item = FsResult<FilesystemObject>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.b_is_exhausted {
            return None;
        }
        if !self.b_is_started {
            self.b_is_started = true;
            let path_root = self.path_root.clone();
            if let Err(e) = self.push_frame(&path_root) {
                self.b_is_exhausted = true;
                return Some(Err(e));
            }
        }

        loop {
            if let Some(path_dir) = self.path_pending_descend.take()
                && let Err(e) = self.push_frame(&path_dir)
            {
                return Some(Err(e));
            }

            let Some(frame) = self.l_frames.last_mut() else {
                self.object_current = None;
                self.b_is_exhausted = true;
                return None;
            };

            let object = match frame.next() {
                None => {
                    if let Some(frame) = self.l_frames.pop() {
                        tracing::trace!(path = %frame.path().display(), "level closed");
                    }
                    continue;
                }
                Some(Err(e)) => return Some(Err(e)),
                Some(Ok(object)) => object,
            };
            if is_self_or_parent_reference(&object, frame.path()) {
                continue;
            }

            if object.is_dir() && self.config.filters_descend.should_pass(&object) {
                self.path_pending_descend = Some(object.path().to_path_buf());
            }
            if self.config.filters_result.should_pass(&object) {
                self.object_current = Some(object.clone());
                return Some(Ok(object));
            }
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region DirectoryWalk

/// Flat or recursive iteration, chosen by [`SpecIteratorConfig::if_recursive`].
#[derive(Debug)]
pub enum DirectoryWalk {
    /// Immediate children only.
    Flat(DirectoryIterator),
    /// Whole tree.
    Recursive(RecursiveDirectoryIterator),
}

impl DirectoryWalk {
    pub fn new(path_dir: impl AsRef<Path>, config: &SpecIteratorConfig) -> FsResult<Self> {
        if config.if_recursive {
            return Ok(Self::Recursive(RecursiveDirectoryIterator::new(
                path_dir, config,
            )?));
        }
        Ok(Self::Flat(DirectoryIterator::new(path_dir, config)?))
    }
}

impl Iterator for DirectoryWalk {
    type Item = FsResult<FilesystemObject>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::Flat(iter) => iter.next(),
            Self::Recursive(iter) => iter.next(),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::path::{Path, PathBuf};

    use super::{DirectoryIterator, DirectoryWalk, RecursiveDirectoryIterator};
    use crate::filter::{FileFilter, NameFilter, SpecFilterChain};
    use crate::object::FilesystemObject;
    use crate::spec::{FsError, SpecIteratorConfig};

    fn write_text(path: &Path, txt: &str) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent");
        }
        std::fs::write(path, txt).expect("write text");
    }

    /// `root/file_in_base_dir.txt` plus `root/1/2/3`, one `file_in_dir_N.txt` per level.
    fn level_three_dirs(root: &Path) {
        write_text(&root.join("file_in_base_dir.txt"), "0");
        write_text(&root.join("1/file_in_dir_1.txt"), "1");
        write_text(&root.join("1/2/file_in_dir_2.txt"), "2");
        write_text(&root.join("1/2/3/file_in_dir_3.txt"), "3");
    }

    fn names<I>(iter: I) -> Vec<String>
    where
        I: Iterator<Item = crate::spec::FsResult<FilesystemObject>>,
    {
        iter.map(|res| res.expect("entry").filename()).collect()
    }

    fn name_set(l_names: &[String]) -> BTreeSet<&str> {
        l_names.iter().map(String::as_str).collect()
    }

    fn walk_std(path_dir: &Path, l_out: &mut BTreeSet<PathBuf>) {
        for entry in std::fs::read_dir(path_dir).expect("read dir") {
            let path_entry = entry.expect("entry").path();
            l_out.insert(path_entry.clone());
            if path_entry.is_dir() {
                walk_std(&path_entry, l_out);
            }
        }
    }

    #[test]
    fn flat_iterator_yields_immediate_children() {
        let tmp = tempfile::tempdir().expect("tempdir");
        level_three_dirs(tmp.path());

        let iter = DirectoryIterator::new(tmp.path(), &SpecIteratorConfig::default())
            .expect("iterator");
        let l_names = names(iter);
        assert_eq!(l_names.len(), 2);
        assert_eq!(name_set(&l_names), BTreeSet::from(["1", "file_in_base_dir.txt"]));
    }

    #[test]
    fn flat_iterator_applies_result_filters() {
        let tmp = tempfile::tempdir().expect("tempdir");
        level_three_dirs(tmp.path());

        let config = SpecIteratorConfig::default()
            .with_filters_result(SpecFilterChain::new().with(FileFilter));
        let iter = DirectoryIterator::new(tmp.path(), &config).expect("iterator");
        assert_eq!(names(iter), vec!["file_in_base_dir.txt".to_string()]);
    }

    #[test]
    fn flat_iterator_cursor_state_machine() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write_text(&tmp.path().join("only.txt"), "x");

        let mut iter = DirectoryIterator::new(tmp.path(), &SpecIteratorConfig::default())
            .expect("iterator");
        assert!(!iter.valid());
        assert!(matches!(
            iter.current(),
            Err(FsError::InvalidIteratorState { .. })
        ));

        iter.rewind().expect("rewind");
        assert!(iter.valid());
        assert_eq!(iter.key(), 0);
        assert_eq!(iter.current().expect("current").filename(), "only.txt");

        // A cursor positioned by `rewind` is handed out by the next `next`.
        let first = iter.next().expect("some").expect("ok");
        assert_eq!(first.filename(), "only.txt");

        iter.advance().expect("advance");
        assert!(!iter.valid());
        assert!(iter.current().is_err());
        assert!(iter.next().is_none());

        iter.rewind().expect("rewind again");
        assert!(iter.valid());
    }

    #[test]
    fn iterator_rejects_missing_and_file_roots() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write_text(&tmp.path().join("a.txt"), "a");
        let config = SpecIteratorConfig::default();

        let err = DirectoryIterator::new(tmp.path().join("missing"), &config)
            .expect_err("missing root");
        assert!(matches!(err, FsError::NotFound { .. }));
        let err = RecursiveDirectoryIterator::new(tmp.path().join("a.txt"), &config)
            .expect_err("file root");
        assert!(matches!(err, FsError::NotADirectory { .. }));
    }

    #[test]
    fn recursive_iterator_yields_everything_by_default() {
        let tmp = tempfile::tempdir().expect("tempdir");
        level_three_dirs(tmp.path());

        let iter = RecursiveDirectoryIterator::new(tmp.path(), &SpecIteratorConfig::default())
            .expect("iterator");
        let set_yielded: BTreeSet<PathBuf> = iter
            .map(|res| res.expect("entry").path().to_path_buf())
            .collect();

        let mut set_expected = BTreeSet::new();
        walk_std(tmp.path(), &mut set_expected);
        assert_eq!(set_yielded, set_expected);
        assert_eq!(set_yielded.len(), 7);
    }

    #[test]
    fn recursive_iterator_is_pre_order() {
        let tmp = tempfile::tempdir().expect("tempdir");
        level_three_dirs(tmp.path());

        let l_names = names(
            RecursiveDirectoryIterator::new(tmp.path(), &SpecIteratorConfig::default())
                .expect("iterator"),
        );
        let pos = |name: &str| l_names.iter().position(|n| n == name).expect("present");
        assert!(pos("1") < pos("file_in_dir_1.txt"));
        assert!(pos("2") < pos("file_in_dir_2.txt"));
        assert!(pos("3") < pos("file_in_dir_3.txt"));
    }

    #[test]
    fn descend_filter_prunes_subtree_but_still_yields_directory() {
        let tmp = tempfile::tempdir().expect("tempdir");
        level_three_dirs(tmp.path());

        let config = SpecIteratorConfig::default()
            .with_filters_descend(SpecFilterChain::new().with(NameFilter::new("2")));
        let l_names = names(RecursiveDirectoryIterator::new(tmp.path(), &config).expect("iter"));

        assert_eq!(
            name_set(&l_names),
            BTreeSet::from(["file_in_base_dir.txt", "1", "file_in_dir_1.txt", "2"])
        );
    }

    #[test]
    fn result_filter_still_recurses_through_excluded_directories() {
        let tmp = tempfile::tempdir().expect("tempdir");
        level_three_dirs(tmp.path());

        let config = SpecIteratorConfig::default().with_filters_result(
            SpecFilterChain::new().with_closure(|o: &FilesystemObject| o.is_file()),
        );
        let l_names = names(RecursiveDirectoryIterator::new(tmp.path(), &config).expect("iter"));

        assert_eq!(
            name_set(&l_names),
            BTreeSet::from([
                "file_in_base_dir.txt",
                "file_in_dir_1.txt",
                "file_in_dir_2.txt",
                "file_in_dir_3.txt",
            ])
        );
        assert_eq!(l_names.len(), 4);
    }

    #[test]
    fn skip_directory_after_directory_skips_its_subtree_only() {
        let tmp = tempfile::tempdir().expect("tempdir");
        level_three_dirs(tmp.path());
        write_text(&tmp.path().join("zz_sibling/z.txt"), "z");
        let path_dir_1 = tmp.path().join("1");

        let mut iter = RecursiveDirectoryIterator::new(tmp.path(), &SpecIteratorConfig::default())
            .expect("iterator");
        let mut l_seen: Vec<PathBuf> = Vec::new();
        while let Some(res) = iter.next() {
            let object = res.expect("entry");
            l_seen.push(object.path().to_path_buf());
            if object.path() == path_dir_1 {
                iter.skip_directory();
            }
        }

        assert!(l_seen.contains(&path_dir_1));
        assert!(!l_seen.iter().any(|p| p.starts_with(&path_dir_1) && p != &path_dir_1));
        assert!(l_seen.contains(&tmp.path().join("file_in_base_dir.txt")));
        assert!(l_seen.contains(&tmp.path().join("zz_sibling/z.txt")));
    }

    #[test]
    fn skip_directory_after_file_abandons_rest_of_level() {
        let tmp = tempfile::tempdir().expect("tempdir");
        level_three_dirs(tmp.path());
        let path_dir_1 = tmp.path().join("1");
        let path_file_1 = path_dir_1.join("file_in_dir_1.txt");

        let mut iter = RecursiveDirectoryIterator::new(tmp.path(), &SpecIteratorConfig::default())
            .expect("iterator");
        let mut l_after_skip: Vec<PathBuf> = Vec::new();
        let mut b_skipped = false;
        while let Some(res) = iter.next() {
            let object = res.expect("entry");
            if b_skipped {
                l_after_skip.push(object.path().to_path_buf());
            }
            if object.path() == path_file_1 {
                iter.skip_directory();
                b_skipped = true;
            }
        }

        assert!(b_skipped);
        assert!(!l_after_skip.iter().any(|p| p.starts_with(&path_dir_1)));
    }

    #[test]
    fn skip_directory_without_remaining_levels_exhausts() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write_text(&tmp.path().join("a.txt"), "a");

        let mut iter = RecursiveDirectoryIterator::new(tmp.path(), &SpecIteratorConfig::default())
            .expect("iterator");
        let first = iter.next().expect("some").expect("ok");
        assert!(first.is_file());
        assert_eq!(iter.depth(), 1);

        iter.skip_directory();
        assert!(!iter.valid());
        assert!(iter.next().is_none());
        assert!(iter.current().is_err());

        iter.rewind();
        assert_eq!(names(iter), vec!["a.txt".to_string()]);
    }

    #[test]
    fn walk_dispatches_on_recursive_flag() {
        let tmp = tempfile::tempdir().expect("tempdir");
        level_three_dirs(tmp.path());

        let config = SpecIteratorConfig::default();
        assert_eq!(names(DirectoryWalk::new(tmp.path(), &config).expect("walk")).len(), 2);
        let config = config.with_recursive(true);
        assert_eq!(names(DirectoryWalk::new(tmp.path(), &config).expect("walk")).len(), 7);
    }
}
