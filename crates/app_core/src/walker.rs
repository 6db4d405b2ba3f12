//! Bounded tree traversal for search and storage analysis
//!
//! Both walks are sequential and iterative. A directory that cannot be
//! listed counts as empty; it never aborts the walk.

use crate::config::{AnalysisConfig, SearchConfig};
use crate::{AppError, Result};
use app_fs::{
    dir_id, is_hidden_name, join_path, DirEntry, FileType, Sentinels, StorageBackend, VirtualNode,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Search filters; all supplied filters must hold
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchOptions {
    /// Case-insensitive substring of the name; empty matches everything
    pub query: String,
    #[serde(rename = "type")]
    pub file_type: Option<FileType>,
    pub min_size: Option<u64>,
    pub max_size: Option<u64>,
    /// Unix epoch, milliseconds
    pub min_date: Option<i64>,
}

impl SearchOptions {
    pub fn query(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    fn matches(&self, entry: &DirEntry, query_lower: &str) -> bool {
        if !query_lower.is_empty() && !entry.name.to_lowercase().contains(query_lower) {
            return false;
        }
        if let Some(file_type) = self.file_type {
            if entry_type(entry) != file_type {
                return false;
            }
        }
        if self.min_size.is_some_and(|min| entry.size < min) {
            return false;
        }
        if self.max_size.is_some_and(|max| entry.size > max) {
            return false;
        }
        if self.min_date.is_some_and(|min| entry.mtime < min) {
            return false;
        }
        true
    }
}

/// Hard caps on one search walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkLimits {
    pub max_depth: usize,
    /// Entries examined before the walk stops
    pub max_examined: usize,
    pub max_results: usize,
}

impl From<&SearchConfig> for WalkLimits {
    fn from(config: &SearchConfig) -> Self {
        Self {
            max_depth: config.max_depth,
            max_examined: config.max_examined,
            max_results: config.max_results,
        }
    }
}

/// Size of one immediate child folder of the analysed root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderUsage {
    pub id: String,
    pub name: String,
    pub size: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub total_size: u64,
    pub type_breakdown: BTreeMap<FileType, u64>,
    /// Depth-1 folders, largest first
    pub folder_breakdown: Vec<FolderUsage>,
    /// Largest files seen, largest first
    pub large_files: Vec<VirtualNode>,
}

/// Top-N files by size, kept as a sorted window during traversal
#[derive(Debug)]
pub struct LargeFileWindow {
    capacity: usize,
    files: Vec<VirtualNode>,
}

impl LargeFileWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            files: Vec::with_capacity(capacity + 1),
        }
    }

    /// Insert, sort, truncate. Ties keep the earlier file.
    pub fn offer(&mut self, node: VirtualNode) {
        if self.capacity == 0 {
            return;
        }
        if self.files.len() == self.capacity
            && self.files.last().is_some_and(|smallest| node.size <= smallest.size)
        {
            return;
        }

        self.files.push(node);
        self.files.sort_by(|a, b| b.size.cmp(&a.size));
        self.files.truncate(self.capacity);
    }

    pub fn into_vec(self) -> Vec<VirtualNode> {
        self.files
    }
}

fn entry_type(entry: &DirEntry) -> FileType {
    if entry.is_dir {
        FileType::Folder
    } else {
        FileType::from_name(&entry.name)
    }
}

/// Sequential walker over one backend
pub struct TreeWalker {
    backend: Arc<dyn StorageBackend>,
    sentinels: Sentinels,
}

impl TreeWalker {
    pub fn new(backend: Arc<dyn StorageBackend>, sentinels: Sentinels) -> Self {
        Self { backend, sentinels }
    }

    /// Keyword search, breadth-first from `seeds`
    pub async fn search(
        &self,
        options: &SearchOptions,
        seeds: &[String],
        limits: WalkLimits,
        cancel: &CancellationToken,
    ) -> Result<Vec<VirtualNode>> {
        let query = options.query.trim().to_lowercase();
        self.walk(seeds, limits, cancel, |entry| options.matches(entry, &query))
            .await
    }

    /// Files modified at or after `since` (epoch ms), newest first
    pub async fn recent(
        &self,
        since: i64,
        limit: usize,
        seeds: &[String],
        limits: WalkLimits,
        cancel: &CancellationToken,
    ) -> Result<Vec<VirtualNode>> {
        let mut nodes = self
            .walk(seeds, limits, cancel, |entry| !entry.is_dir && entry.mtime >= since)
            .await?;

        nodes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        nodes.truncate(limit);
        Ok(nodes)
    }

    /// Everything of one file type
    pub async fn category(
        &self,
        file_type: FileType,
        seeds: &[String],
        limits: WalkLimits,
        cancel: &CancellationToken,
    ) -> Result<Vec<VirtualNode>> {
        self.walk(seeds, limits, cancel, |entry| entry_type(entry) == file_type)
            .await
    }

    /// Breadth-first walk collecting entries accepted by `accept`.
    ///
    /// Hidden entries are neither examined nor descended into. The walk
    /// stops at whichever cap is hit first; cancellation is checked before
    /// each directory is listed.
    async fn walk<F>(
        &self,
        seeds: &[String],
        limits: WalkLimits,
        cancel: &CancellationToken,
        accept: F,
    ) -> Result<Vec<VirtualNode>>
    where
        F: Fn(&DirEntry) -> bool,
    {
        let mut queue: VecDeque<(String, usize)> = VecDeque::new();
        let mut visited: HashSet<String> = HashSet::new();
        for seed in seeds {
            let seed = seed.trim_matches('/').to_string();
            if visited.insert(seed.clone()) {
                queue.push_back((seed, 0));
            }
        }

        let mut results = Vec::new();
        let mut examined = 0usize;

        'walk: while let Some((dir, depth)) = queue.pop_front() {
            if cancel.is_cancelled() {
                tracing::debug!("Walk cancelled after examining {} entries", examined);
                return Err(AppError::Cancelled);
            }

            let entries = match self.backend.list(&dir).await {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::debug!("Skipping unlistable directory {:?}: {}", dir, e);
                    continue;
                }
            };

            for entry in entries {
                if is_hidden_name(&entry.name) {
                    continue;
                }

                examined += 1;
                if examined > limits.max_examined {
                    tracing::debug!("Walk hit the examination cap ({})", limits.max_examined);
                    break 'walk;
                }

                let path = join_path(&dir, &entry.name);
                if entry.is_dir && depth < limits.max_depth && visited.insert(path.clone()) {
                    queue.push_back((path.clone(), depth + 1));
                }

                if accept(&entry) {
                    results.push(VirtualNode::from_entry(path, dir_id(&dir, &self.sentinels), &entry));
                    if results.len() >= limits.max_results {
                        tracing::debug!("Walk hit the result cap ({})", limits.max_results);
                        break 'walk;
                    }
                }
            }
        }

        Ok(results)
    }

    /// Storage usage under the real directory `root`.
    ///
    /// Below `max_depth` the walk continues for sizes only: those files
    /// count toward the totals and their depth-1 folder but are never
    /// candidates for the large-file list.
    pub async fn analyze(&self, root: &str, config: &AnalysisConfig) -> AnalysisResult {
        let mut result = AnalysisResult::default();
        let mut window = LargeFileWindow::new(config.large_file_count);
        let mut buckets: Vec<FolderUsage> = Vec::new();

        // (dir, depth, index of the depth-1 folder it belongs to)
        let mut stack: Vec<(String, usize, Option<usize>)> = vec![(root.to_string(), 0, None)];

        while let Some((dir, depth, bucket)) = stack.pop() {
            let entries = match self.backend.list(&dir).await {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::debug!("Skipping unlistable directory {:?}: {}", dir, e);
                    continue;
                }
            };

            for entry in entries {
                if is_hidden_name(&entry.name) {
                    continue;
                }

                let path = join_path(&dir, &entry.name);
                let bucket = if depth == 0 && entry.is_dir {
                    buckets.push(FolderUsage {
                        id: path.clone(),
                        name: entry.name.clone(),
                        size: 0,
                    });
                    Some(buckets.len() - 1)
                } else {
                    bucket
                };

                if entry.is_dir {
                    stack.push((path, depth + 1, bucket));
                    continue;
                }

                result.total_size += entry.size;
                *result.type_breakdown.entry(entry_type(&entry)).or_insert(0) += entry.size;
                if let Some(i) = bucket {
                    buckets[i].size += entry.size;
                }
                if depth < config.max_depth {
                    window.offer(VirtualNode::from_entry(path, dir_id(&dir, &self.sentinels), &entry));
                }
            }
        }

        buckets.sort_by(|a, b| b.size.cmp(&a.size));
        result.folder_breakdown = buckets;
        result.large_files = window.into_vec();

        tracing::debug!(
            "Analyzed {:?}: {} bytes, {} folders",
            root,
            result.total_size,
            result.folder_breakdown.len()
        );
        result
    }
}
