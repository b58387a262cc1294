//! Virtual directories over a flat key space.
//!
//! The object store has no directories. A directory exists exactly when some
//! key lies under its prefix, and its children are the distinct next path
//! segments among those keys. Listing a directory therefore pages through
//! every key under the prefix and folds them into one entry per segment.
//!
//! Children are collected into a sorted map before being returned, so list
//! and walk order is lexicographic by path even though raw key order is not
//! (`a-b` sorts before `a/b` in byte order). A walk holds one directory's
//! children per depth level.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{trace, warn};

use crate::client::ObjectStoreClient;
use crate::context::Context;
use crate::error::{DriverError, DriverResult};
use crate::path::{KeyMapper, ROOT, join, validate_path};

/// Snapshot of a file or directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Absolute path.
    pub path: String,
    /// Size in bytes; `0` for directories.
    pub size: u64,
    /// Last modification; for directories the newest among observed keys.
    pub mod_time: DateTime<Utc>,
    /// Whether this is an inferred directory.
    pub is_dir: bool,
}

/// What a walk visitor asks for next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkControl {
    /// Keep going, descending into directories.
    Continue,
    /// Do not descend into the directory just visited.
    SkipDir,
}

/// Visitor invoked for every entry of a walk.
pub type WalkFn<'a> = dyn FnMut(&FileInfo) -> DriverResult<WalkControl> + Send + 'a;

/// Directory listing and traversal for one driver call.
pub(crate) struct Walker<'a> {
    pub(crate) client: &'a dyn ObjectStoreClient,
    pub(crate) mapper: &'a KeyMapper,
    pub(crate) ctx: &'a Context,
}

impl Walker<'_> {
    /// Direct children of `path`, sorted by path.
    async fn children(&self, path: &str) -> DriverResult<Vec<FileInfo>> {
        let prefix = self.mapper.dir_prefix(path)?;
        let mut children: BTreeMap<String, FileInfo> = BTreeMap::new();
        let mut cursor = None;
        let mut pages = 0usize;

        loop {
            let page = self
                .ctx
                .run(self.client.list_by_prefix(&prefix, cursor.as_ref()))
                .await?;
            pages += 1;

            for meta in &page.entries {
                let Some(rest) = meta.key.strip_prefix(prefix.as_str()) else {
                    continue;
                };
                let (segment, is_dir) = match rest.split_once('/') {
                    Some((segment, _)) => (segment, true),
                    None => (rest, false),
                };
                if segment.is_empty() {
                    continue;
                }
                let child = join(path, segment);
                if validate_path(&child, false).is_err() {
                    warn!(key = %meta.key, "skipping key that does not map to a valid path");
                    continue;
                }

                children
                    .entry(segment.to_owned())
                    .and_modify(|info| {
                        if is_dir {
                            info.is_dir = true;
                            info.size = 0;
                        }
                        info.mod_time = info.mod_time.max(meta.last_modified);
                    })
                    .or_insert_with(|| FileInfo {
                        path: child,
                        size: if is_dir { 0 } else { meta.size },
                        mod_time: meta.last_modified,
                        is_dir,
                    });
            }

            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        trace!(path, pages, children = children.len(), "listed directory");
        Ok(children.into_values().collect())
    }

    /// Paths of the direct children of `path`.
    pub(crate) async fn list(&self, path: &str) -> DriverResult<Vec<String>> {
        let path = validate_path(path, true)?;
        let children = self.children(path).await?;
        if children.is_empty() && path != ROOT {
            return Err(DriverError::PathNotFound {
                path: path.to_owned(),
            });
        }
        Ok(children.into_iter().map(|info| info.path).collect())
    }

    /// Newest modification time under `path`'s directory prefix, if any key
    /// lies under it. Looks at the first page only.
    pub(crate) async fn directory_mod_time(
        &self,
        path: &str,
    ) -> DriverResult<Option<DateTime<Utc>>> {
        let prefix = self.mapper.dir_prefix(path)?;
        let page = self
            .ctx
            .run(self.client.list_by_prefix(&prefix, None))
            .await?;
        Ok(page.entries.iter().map(|meta| meta.last_modified).max())
    }

    /// Depth-first, lexicographic traversal below `path`.
    pub(crate) async fn walk(&self, path: &str, visit: &mut WalkFn<'_>) -> DriverResult<()> {
        let root = validate_path(path, true)?;
        let top = self.children(root).await?;
        // Unlike `list`, an empty walk is an error even at the root.
        if top.is_empty() {
            return Err(DriverError::PathNotFound {
                path: root.to_owned(),
            });
        }

        let mut stack = vec![top.into_iter()];
        while let Some(level) = stack.last_mut() {
            let Some(info) = level.next() else {
                stack.pop();
                continue;
            };

            self.ctx.check()?;
            let control = visit(&info)?;
            if info.is_dir && control == WalkControl::Continue {
                let children = self.children(&info.path).await?;
                stack.push(children.into_iter());
            }
        }
        Ok(())
    }
}
