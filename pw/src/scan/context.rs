//! Project context snapshot
//!
//! Aggregates the scanned file list into the technology-stack summary that
//! grounds prompt construction and fallback synthesis. Built once per
//! session and cached; invalidated only by an explicit rescan.

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use super::{ScanError, ScannedFile, manifest_reference, scan_workspace};
use crate::config::ScanConfig;

/// Maximum languages reported in the tech stack
const TECH_STACK_CAP: usize = 5;

/// Snapshot of the scanned project
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectContext {
    pub root_path: String,
    /// Ordered by scan order
    pub files: Vec<ScannedFile>,
    /// Language names, most frequent first, capped at 5
    pub tech_stack: Vec<String>,
    /// One-line textual digest
    pub summary: String,
}

impl ProjectContext {
    /// Scan a workspace root and build the context snapshot
    pub fn scan(root: &Path, config: &ScanConfig) -> Result<Self, ScanError> {
        let files = scan_workspace(root, config)?;
        let context = Self::from_files(root, files);
        info!(
            root = %context.root_path,
            file_count = context.files.len(),
            tech_stack = ?context.tech_stack,
            "Project context built"
        );
        Ok(context)
    }

    /// Build a context from an already-scanned file list
    pub fn from_files(root: &Path, files: Vec<ScannedFile>) -> Self {
        let tech_stack = rank_languages(&files);
        let summary = summarize(&files, &tech_stack);

        Self {
            root_path: root.display().to_string(),
            files,
            tech_stack,
            summary,
        }
    }

    /// An empty context for a workspace with nothing scannable
    pub fn empty(root: &Path) -> Self {
        Self::from_files(root, Vec::new())
    }

    /// The first recognized manifest file, if any
    pub fn manifest(&self) -> Option<&str> {
        manifest_reference(&self.files)
    }

    /// The first `cap` scanned files - the truncation used for prompts
    /// and fallback synthesis (earliest-scanned files win)
    pub fn capped_files(&self, cap: usize) -> &[ScannedFile] {
        &self.files[..self.files.len().min(cap)]
    }
}

/// Rank languages by file count, most frequent first, ties broken by name
fn rank_languages(files: &[ScannedFile]) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for file in files {
        if file.language != "unknown" {
            *counts.entry(file.language.as_str()).or_default() += 1;
        }
    }

    let mut ranked: Vec<(&str, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    ranked
        .into_iter()
        .take(TECH_STACK_CAP)
        .map(|(lang, _)| lang.to_string())
        .collect()
}

fn summarize(files: &[ScannedFile], tech_stack: &[String]) -> String {
    if files.is_empty() {
        return "Empty project: no scannable files found".to_string();
    }
    if tech_stack.is_empty() {
        return format!("Project with {} files of unclassified types", files.len());
    }
    format!(
        "Project with {} files, primarily {} ({})",
        files.len(),
        tech_stack[0],
        tech_stack.join(", ")
    )
}
