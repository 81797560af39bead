//! Tree mutation report model and mutable report builder.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Aggregate counters for one `copy_tree`, `move_tree` or `delete_tree` run.
#[derive(Debug, Default, Clone)]
pub struct ReportTree {
    /// Total visited directory/file entries.
    pub cnt_scanned: u64,
    /// Files copied and directories created.
    pub cnt_copied: u64,
    /// Destination files kept by [`crate::EnumCopyFileConflictStrategy::Skip`].
    pub cnt_skipped: u64,
    /// Files and directories removed.
    pub cnt_deleted: u64,
    /// Entries left in place because they matched the exclude list.
    pub cnt_excluded: u64,
    /// Entries left in place because they failed the result filters.
    pub cnt_filtered: u64,
    /// Directories that could not be removed because something below survived.
    pub paths_retained: Vec<PathBuf>,
    /// Non-fatal problems collected during the run.
    pub warnings: Vec<String>,
    /// Whether the run did everything it was asked to.
    pub b_completed: bool,
}

impl ReportTree {
    /// The boolean contract of the object-level operations.
    pub fn is_completed(&self) -> bool {
        self.b_completed
    }

    /// Number of retained directories.
    pub fn retained_count(&self) -> usize {
        self.paths_retained.len()
    }

    /// Number of collected warnings.
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Combine two consecutive runs; completion is taken from `other`.
    pub fn chain(mut self, other: ReportTree) -> ReportTree {
        self.cnt_scanned += other.cnt_scanned;
        self.cnt_copied += other.cnt_copied;
        self.cnt_skipped += other.cnt_skipped;
        self.cnt_deleted += other.cnt_deleted;
        self.cnt_excluded += other.cnt_excluded;
        self.cnt_filtered += other.cnt_filtered;
        self.paths_retained.extend(other.paths_retained);
        self.warnings.extend(other.warnings);
        self.b_completed = other.b_completed;
        self
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_scanned".to_string(), self.cnt_scanned);
        dict_counts.insert("cnt_copied".to_string(), self.cnt_copied);
        dict_counts.insert("cnt_skipped".to_string(), self.cnt_skipped);
        dict_counts.insert("cnt_deleted".to_string(), self.cnt_deleted);
        dict_counts.insert("cnt_excluded".to_string(), self.cnt_excluded);
        dict_counts.insert("cnt_filtered".to_string(), self.cnt_filtered);
        dict_counts.insert("cnt_retained".to_string(), self.retained_count() as u64);
        dict_counts.insert("cnt_warnings".to_string(), self.warning_count() as u64);
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        let dict_counts = self.to_dict();
        format!(
            "{prefix} completed={} scanned={} copied={} skipped={} deleted={} excluded={} filtered={} retained={} warnings={}",
            self.b_completed,
            dict_counts["cnt_scanned"],
            dict_counts["cnt_copied"],
            dict_counts["cnt_skipped"],
            dict_counts["cnt_deleted"],
            dict_counts["cnt_excluded"],
            dict_counts["cnt_filtered"],
            dict_counts["cnt_retained"],
            dict_counts["cnt_warnings"]
        )
    }
}

impl fmt::Display for ReportTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[TREE]"))
    }
}

/// Mutable accumulator for tree statistics.
#[derive(Debug, Default, Clone)]
pub struct ReportTreeBuilder {
    /// See [`ReportTree::cnt_scanned`].
    pub cnt_scanned: u64,
    /// See [`ReportTree::cnt_copied`].
    pub cnt_copied: u64,
    /// See [`ReportTree::cnt_skipped`].
    pub cnt_skipped: u64,
    /// See [`ReportTree::cnt_deleted`].
    pub cnt_deleted: u64,
    /// See [`ReportTree::cnt_excluded`].
    pub cnt_excluded: u64,
    /// See [`ReportTree::cnt_filtered`].
    pub cnt_filtered: u64,
    /// See [`ReportTree::paths_retained`].
    pub paths_retained: Vec<PathBuf>,
    /// See [`ReportTree::warnings`].
    pub warnings: Vec<String>,
}

impl ReportTreeBuilder {
    /// Increment one or more named counters by `value`.
    ///
    /// Unknown names are ignored.
    pub fn add_counts(&mut self, field_names: &[&str], value: u64) {
        for field_name in field_names {
            match *field_name {
                "cnt_scanned" => self.cnt_scanned += value,
                "cnt_copied" => self.cnt_copied += value,
                "cnt_skipped" => self.cnt_skipped += value,
                "cnt_deleted" => self.cnt_deleted += value,
                "cnt_excluded" => self.cnt_excluded += value,
                "cnt_filtered" => self.cnt_filtered += value,
                _ => {}
            }
        }
    }

    /// Record one visited entry.
    pub fn add_scanned(&mut self) {
        self.cnt_scanned += 1;
    }

    /// Record one copied file or created directory.
    pub fn add_copied(&mut self) {
        self.cnt_copied += 1;
    }

    /// Record one destination file kept on conflict.
    pub fn add_skipped(&mut self) {
        self.cnt_skipped += 1;
    }

    /// Record one removed file or directory.
    pub fn add_deleted(&mut self) {
        self.cnt_deleted += 1;
    }

    /// Record one entry kept by the exclude list.
    pub fn add_excluded(&mut self) {
        self.cnt_excluded += 1;
    }

    /// Record one entry kept by the result filters.
    pub fn add_filtered(&mut self) {
        self.cnt_filtered += 1;
    }

    /// Record a directory left in place.
    pub fn add_retained(&mut self, path: PathBuf) {
        self.paths_retained.push(path);
    }

    /// Add warning message.
    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    /// Finalize builder into immutable report.
    pub fn build(self, b_completed: bool) -> ReportTree {
        ReportTree {
            cnt_scanned: self.cnt_scanned,
            cnt_copied: self.cnt_copied,
            cnt_skipped: self.cnt_skipped,
            cnt_deleted: self.cnt_deleted,
            cnt_excluded: self.cnt_excluded,
            cnt_filtered: self.cnt_filtered,
            paths_retained: self.paths_retained,
            warnings: self.warnings,
            b_completed,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{ReportTree, ReportTreeBuilder};

    #[test]
    fn report_tree_to_dict_and_format() {
        let report = ReportTree {
            cnt_scanned: 6,
            cnt_copied: 0,
            cnt_skipped: 0,
            cnt_deleted: 4,
            cnt_excluded: 1,
            cnt_filtered: 0,
            paths_retained: vec![PathBuf::from("/root"), PathBuf::from("/root/sub")],
            warnings: vec![],
            b_completed: false,
        };

        let dict_counts = report.to_dict();
        assert_eq!(dict_counts["cnt_deleted"], 4);
        assert_eq!(dict_counts["cnt_retained"], 2);
        assert_eq!(dict_counts["cnt_warnings"], 0);

        let txt = report.format("[DELETE]");
        assert_eq!(
            txt,
            "[DELETE] completed=false scanned=6 copied=0 skipped=0 deleted=4 excluded=1 filtered=0 retained=2 warnings=0"
        );
        assert!(report.to_string().starts_with("[TREE] completed=false"));
    }

    #[test]
    fn builder_ignores_unknown_counter_names() {
        let mut builder = ReportTreeBuilder::default();
        builder.add_counts(&["cnt_scanned", "cnt_copied", "cnt_bogus"], 2);
        builder.add_deleted();
        builder.add_warning("w".to_string());

        let report = builder.build(true);
        assert!(report.is_completed());
        assert_eq!(report.cnt_scanned, 2);
        assert_eq!(report.cnt_copied, 2);
        assert_eq!(report.cnt_deleted, 1);
        assert_eq!(report.warning_count(), 1);
    }

    #[test]
    fn builder_counts_excluded_and_filtered_entries() {
        let mut builder = ReportTreeBuilder::default();
        builder.add_excluded();
        builder.add_excluded();
        builder.add_filtered();

        let report = builder.build(false);
        assert_eq!(report.cnt_excluded, 2);
        assert_eq!(report.cnt_filtered, 1);
        assert_eq!(report.to_dict()["cnt_excluded"], 2);
    }
}
