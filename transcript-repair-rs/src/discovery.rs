//! Session file discovery

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::RepairConfig;
use crate::errors::{RepairError, RepairResult};

/// Extension of session transcripts
pub const TRANSCRIPT_EXTENSION: &str = "jsonl";

fn is_transcript(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some(TRANSCRIPT_EXTENSION)
}

/// Transcripts directly inside `dir`, sorted. A missing directory yields none.
pub fn transcripts_in(dir: &Path) -> RepairResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| RepairError::Discovery {
            path: dir.to_path_buf(),
            message: e.to_string(),
        })?;
        if entry.file_type().is_file() && is_transcript(entry.path()) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Transcripts of every agent under `<root>/agents/*/sessions`
pub fn all_agent_transcripts(config: &RepairConfig) -> RepairResult<Vec<PathBuf>> {
    let agents = config.agents_dir();
    if !agents.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(&agents).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| RepairError::Discovery {
            path: agents.clone(),
            message: e.to_string(),
        })?;
        if entry.file_type().is_dir() {
            files.extend(transcripts_in(&entry.path().join("sessions"))?);
        }
    }
    files.sort();
    Ok(files)
}

/// Resolve what to scan: an explicit file or directory, or the configured
/// sessions directory (all agents when `all_agents` is set).
pub fn discover(
    target: Option<&Path>,
    config: &RepairConfig,
    all_agents: bool,
) -> RepairResult<Vec<PathBuf>> {
    let files = match target {
        Some(path) if path.is_dir() => transcripts_in(path)?,
        Some(path) if path.is_file() => vec![path.to_path_buf()],
        Some(path) => return Err(RepairError::InvalidTarget(path.to_path_buf())),
        None if all_agents => all_agent_transcripts(config)?,
        None => transcripts_in(&config.sessions_dir())?,
    };
    tracing::debug!(count = files.len(), "Discovered session transcripts");
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "{}\n").unwrap();
    }

    fn config_at(root: &Path) -> RepairConfig {
        RepairConfig {
            root_dir: root.to_path_buf(),
            ..RepairConfig::default()
        }
    }

    #[test]
    fn test_default_agent_sessions_only() {
        let tmp = TempDir::new().unwrap();
        let main = tmp.path().join("agents/main/sessions");
        touch(&main.join("b.jsonl"));
        touch(&main.join("a.jsonl"));
        touch(&main.join("notes.txt"));
        touch(&main.join("nested/c.jsonl"));
        touch(&tmp.path().join("agents/other/sessions/x.jsonl"));

        let files = discover(None, &config_at(tmp.path()), false).unwrap();
        assert_eq!(files, vec![main.join("a.jsonl"), main.join("b.jsonl")]);
    }

    #[test]
    fn test_all_agents() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("agents/main/sessions/a.jsonl"));
        touch(&tmp.path().join("agents/ops/sessions/b.jsonl"));
        fs::create_dir_all(tmp.path().join("agents/empty")).unwrap();

        let files = discover(None, &config_at(tmp.path()), true).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[1].ends_with("agents/ops/sessions/b.jsonl"));
    }

    #[test]
    fn test_explicit_targets() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("one.jsonl");
        touch(&file);
        let config = config_at(tmp.path());

        assert_eq!(discover(Some(&file), &config, false).unwrap(), vec![file.clone()]);
        assert_eq!(discover(Some(tmp.path()), &config, false).unwrap(), vec![file]);

        let missing = tmp.path().join("missing");
        assert!(matches!(
            discover(Some(&missing), &config, false),
            Err(RepairError::InvalidTarget(_))
        ));
    }

    #[test]
    fn test_missing_sessions_dir_is_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(discover(None, &config_at(tmp.path()), false).unwrap().is_empty());
        assert!(discover(None, &config_at(tmp.path()), true).unwrap().is_empty());
    }
}
