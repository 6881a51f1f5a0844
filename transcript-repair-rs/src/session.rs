//! Per-file scan and fix
//!
//! The engine works on text; this module owns the file around it. A fix
//! copies the original aside and syncs the copy before the repaired content
//! replaces the original through a same-directory rename.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use tempfile::NamedTempFile;

use crate::errors::{RepairError, RepairResult};
use crate::record;
use crate::repair::{self, Analysis, RepairOutcome};
use crate::report::SessionReport;

/// Timestamp format appended to backup file names
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// What happened to one transcript
#[derive(Debug, Clone)]
pub enum SessionStatus {
    Clean,
    /// Corrupted and left as is
    Scanned,
    /// Corrupted and rewritten
    Fixed {
        backup: PathBuf,
        outcome: RepairOutcome,
    },
}

/// Report and status for one transcript
#[derive(Debug, Clone)]
pub struct SessionResult {
    pub report: SessionReport,
    pub status: SessionStatus,
}

fn read(path: &Path) -> RepairResult<String> {
    fs::read_to_string(path).map_err(|e| RepairError::io(path, e))
}

/// Analyze one transcript without modifying it
pub fn scan(path: &Path) -> RepairResult<(SessionReport, Analysis)> {
    let text = read(path)?;
    let analysis = repair::analyze(&text);
    let report = SessionReport::from_analysis(path.display().to_string(), &analysis);
    Ok((report, analysis))
}

/// `<file>.backup-<timestamp>`
pub fn backup_path(path: &Path, timestamp: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(format!(".backup-{}", timestamp));
    PathBuf::from(name)
}

fn write_backup(path: &Path) -> RepairResult<PathBuf> {
    let backup = backup_path(path, &Local::now().format(BACKUP_TIMESTAMP_FORMAT).to_string());
    let to_err = |source| RepairError::Backup {
        path: path.to_path_buf(),
        source,
    };
    fs::copy(path, &backup).map_err(to_err)?;
    File::open(&backup).and_then(|f| f.sync_all()).map_err(to_err)?;
    Ok(backup)
}

fn write_atomic(path: &Path, content: &str) -> RepairResult<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let to_err = |source| RepairError::Persist {
        path: path.to_path_buf(),
        source,
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(to_err)?;
    tmp.write_all(content.as_bytes()).map_err(to_err)?;
    tmp.as_file().sync_all().map_err(to_err)?;
    if let Ok(meta) = fs::metadata(path) {
        fs::set_permissions(tmp.path(), meta.permissions()).map_err(to_err)?;
    }
    tmp.persist(path).map_err(|e| to_err(e.error))?;
    Ok(())
}

/// Scan a transcript and, unless `dry_run`, repair it in place.
///
/// Clean transcripts are never written.
pub fn fix(path: &Path, dry_run: bool) -> RepairResult<SessionResult> {
    let text = read(path)?;
    let lines = record::decode_all(&text);
    let analysis = repair::analyze_lines(&lines);
    let mut report = SessionReport::from_analysis(path.display().to_string(), &analysis);

    if !analysis.is_corrupted() {
        return Ok(SessionResult {
            report,
            status: SessionStatus::Clean,
        });
    }
    if dry_run {
        return Ok(SessionResult {
            report,
            status: SessionStatus::Scanned,
        });
    }

    let backup = write_backup(path)?;
    let outcome = repair::apply(&lines, &analysis);
    write_atomic(path, &outcome.content)?;
    report.record_outcome(&outcome);

    if !outcome.verified() {
        tracing::warn!(file = %path.display(), "Transcript still corrupted after repair");
    }

    Ok(SessionResult {
        report,
        status: SessionStatus::Fixed { backup, outcome },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CORRUPT: &str = concat!(
        r#"{"id":"A","parentId":"","message":{"role":"assistant","stopReason":"error","content":[{"type":"toolCall","id":"T1","partialJson":"{"}]}}"#, "\n",
        r#"{"id":"R1","parentId":"A","message":{"role":"toolResult","toolCallId":"T1"}}"#, "\n",
        r#"{"id":"B","parentId":"R1"}"#, "\n",
    );

    #[test]
    fn test_backup_path_appends_suffix() {
        let p = backup_path(Path::new("/s/a.jsonl"), "20260101_120000");
        assert_eq!(p, PathBuf::from("/s/a.jsonl.backup-20260101_120000"));
    }

    #[test]
    fn test_dry_run_leaves_file_alone() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("s.jsonl");
        fs::write(&file, CORRUPT).unwrap();

        let result = fix(&file, true).unwrap();
        assert!(matches!(result.status, SessionStatus::Scanned));
        assert!(result.report.corrupted);
        assert_eq!(fs::read_to_string(&file).unwrap(), CORRUPT);
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_fix_writes_backup_then_repaired_content() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("s.jsonl");
        fs::write(&file, CORRUPT).unwrap();

        let result = fix(&file, false).unwrap();
        let SessionStatus::Fixed { backup, outcome } = result.status else {
            panic!("expected a fix");
        };
        assert!(outcome.verified());
        assert_eq!(result.report.verified, Some(true));
        assert_eq!(fs::read_to_string(&backup).unwrap(), CORRUPT);
        assert_eq!(
            fs::read_to_string(&file).unwrap(),
            "{\"id\":\"B\",\"parentId\":\"\"}\n"
        );

        let (report, _) = scan(&file).unwrap();
        assert!(!report.corrupted);
    }

    #[test]
    fn test_clean_file_is_not_written() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("s.jsonl");
        fs::write(&file, "{\"id\":\"1\",\"parentId\":\"\"}").unwrap();

        let result = fix(&file, false).unwrap();
        assert!(matches!(result.status, SessionStatus::Clean));
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let err = scan(&tmp.path().join("nope.jsonl")).unwrap_err();
        assert!(matches!(err, RepairError::Io { .. }));
    }
}
