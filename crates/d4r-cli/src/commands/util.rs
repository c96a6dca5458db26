//! Shared utilities for CLI commands.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context;
use d4r_core::{IngestSummary, IngestionPipeline};

/// Files of one input run that could not be read.
#[derive(Debug, Default)]
pub struct FailedFiles(Vec<PathBuf>);

impl FailedFiles {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.0
    }
}

/// Lists the regular files directly inside `dir`, sorted by name.
pub fn list_input_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read input folder {}", dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("failed to list {}", dir.display()))?;
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Feeds every file in `dir` through `pipeline`.
///
/// An unreadable file is logged and skipped so the remaining files are still
/// ingested; the skipped paths are returned.
pub fn ingest_folder(pipeline: &mut IngestionPipeline, dir: &Path) -> anyhow::Result<FailedFiles> {
    let files = list_input_files(dir)?;
    if files.is_empty() {
        tracing::warn!(dir = %dir.display(), "input folder contains no files");
    }

    let mut failed = FailedFiles::default();
    for path in files {
        match pipeline.ingest_file(&path) {
            Ok(report) => tracing::info!(
                source = %report.source,
                accepted = report.accepted,
                rejected = report.rejected(),
                "ingested file"
            ),
            Err(e) => {
                tracing::error!(error = %e, "skipping unreadable file");
                failed.0.push(path);
            }
        }
    }
    Ok(failed)
}

/// Writes `contents` to `out`, or to stdout when no path is given.
pub fn write_output(out: Option<&Path>, contents: &str) -> anyhow::Result<()> {
    match out {
        Some(path) => std::fs::write(path, contents)
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            print!("{contents}");
            Ok(())
        }
    }
}

/// One-line description of an ingestion run.
pub fn format_run_summary(summary: &IngestSummary, users: usize, failed: &FailedFiles) -> String {
    let mut line = format!(
        "Read {} file(s): {users} users, {} lines accepted, {} rejected",
        summary.files, summary.accepted, summary.rejected
    );
    if !failed.is_empty() {
        write!(line, ", {} unreadable", failed.len()).unwrap();
    }
    line
}

/// Prints the run summary to stderr and fails if any file was unreadable.
pub fn finish_run(
    summary: &IngestSummary,
    users: usize,
    failed: &FailedFiles,
) -> anyhow::Result<()> {
    eprintln!("{}", format_run_summary(summary, users, failed));
    if failed.is_empty() {
        return Ok(());
    }
    let paths: Vec<String> = failed
        .paths()
        .iter()
        .map(|p| p.display().to_string())
        .collect();
    anyhow::bail!("could not read {} input file(s): {}", failed.len(), paths.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_list_input_files_sorted_and_skips_dirs() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), "").unwrap();
        fs::write(dir.path().join("a.txt"), "").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();

        let files = list_input_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn test_list_input_files_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = list_input_files(&dir.path().join("absent")).unwrap_err();
        assert!(err.to_string().contains("failed to read input folder"));
    }

    #[test]
    fn test_ingest_folder_counts_all_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), "1100,01-02-2017 10:00,5\n").unwrap();
        fs::write(
            dir.path().join("b.txt"),
            "2200,01-02-2017 11:00,6\n2200,bad,6\n",
        )
        .unwrap();

        let mut pipeline = IngestionPipeline::default();
        let failed = ingest_folder(&mut pipeline, dir.path()).unwrap();
        assert!(failed.is_empty());

        let summary = pipeline.summary();
        assert_eq!(summary.files, 2);
        assert_eq!(summary.accepted, 2);
        assert_eq!(summary.rejected, 1);
        assert_eq!(pipeline.population().len(), 2);
    }

    #[test]
    fn test_format_run_summary() {
        let summary = IngestSummary {
            files: 2,
            lines_processed: 5,
            accepted: 4,
            rejected: 1,
        };
        assert_eq!(
            format_run_summary(&summary, 3, &FailedFiles::default()),
            "Read 2 file(s): 3 users, 4 lines accepted, 1 rejected"
        );

        let failed = FailedFiles(vec![PathBuf::from("x")]);
        assert_eq!(
            format_run_summary(&summary, 3, &failed),
            "Read 2 file(s): 3 users, 4 lines accepted, 1 rejected, 1 unreadable"
        );
        assert!(finish_run(&summary, 3, &failed).is_err());
        assert!(finish_run(&summary, 3, &FailedFiles::default()).is_ok());
    }

    #[test]
    fn test_write_output_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        write_output(Some(&path), "hello\n").unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "hello\n");
    }
}
