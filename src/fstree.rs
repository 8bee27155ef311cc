//! Concurrent filesystem tree walker
//!
//! `walk` descends a directory tree by dispatching one job per directory to
//! the scheduler, so sibling subtrees are listed in parallel on the worker
//! pool. A wait group keeps the walk alive until every scheduled subtree
//! has been processed.
//!
//! The callback is invoked exactly once per discovered entry, including
//! the root, from whatever worker thread happens to list the parent
//! directory. There is no sibling ordering guarantee and no callback
//! serialization; callbacks bring their own concurrency discipline.
//!
//! The callback receives `(path, metadata, stat_error)`: `metadata` is
//! `None` exactly when `stat_error` is `Some`, i.e. the walker discovered
//! the entry but could not stat it. The callback's return value is honored
//! for the root entry only; for all other entries it is ignored, matching
//! the continue-on-error traversal policy.
//!
//! Error policy: only the root stat error is returned. A directory that
//! cannot be listed, or an entry that cannot be stat'd, is reported at
//! warning level and the walk continues with the surviving siblings.

use crate::balancer::Scheduler;
use crate::sync::WaitGroup;
use std::fs::{self, Metadata};
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

/// Walk the tree rooted at `root`, invoking `visit` for every entry
///
/// Returns once the entire tree has been traversed. The only error
/// returned is a failure to stat `root` itself (or the root callback's
/// own verdict); everything below degrades gracefully.
pub fn walk<F>(sched: &Scheduler, root: &Path, visit: F) -> io::Result<()>
where
    F: Fn(&Path, Option<&Metadata>, Option<&io::Error>) -> io::Result<()>
        + Send
        + Sync
        + 'static,
{
    let root = clean_path(root);
    let meta = fs::symlink_metadata(&root)?;

    let walker = Arc::new(TreeWalker {
        sched: sched.clone(),
        visit,
        wg: WaitGroup::new(),
    });

    let result = visit_node(&walker, root, &meta);
    walker.wg.wait();
    result
}

struct TreeWalker<F> {
    sched: Scheduler,
    visit: F,
    wg: WaitGroup,
}

fn visit_node<F>(walker: &Arc<TreeWalker<F>>, path: PathBuf, meta: &Metadata) -> io::Result<()>
where
    F: Fn(&Path, Option<&Metadata>, Option<&io::Error>) -> io::Result<()>
        + Send
        + Sync
        + 'static,
{
    let result = (walker.visit)(&path, Some(meta), None);
    if meta.is_dir() {
        walk_dir(walker, path);
    }
    result
}

/// Schedule the listing of one directory on the pool
fn walk_dir<F>(walker: &Arc<TreeWalker<F>>, path: PathBuf)
where
    F: Fn(&Path, Option<&Metadata>, Option<&io::Error>) -> io::Result<()>
        + Send
        + Sync
        + 'static,
{
    walker.wg.add(1);
    let walker = Arc::clone(walker);
    let sched = walker.sched.clone();
    sched.schedule(move || {
        list_directory(&walker, &path);
        walker.wg.done();
    });
}

fn list_directory<F>(walker: &Arc<TreeWalker<F>>, path: &Path)
where
    F: Fn(&Path, Option<&Metadata>, Option<&io::Error>) -> io::Result<()>
        + Send
        + Sync
        + 'static,
{
    let entries = match fs::read_dir(path) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to list directory");
            return;
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read directory entry");
                continue;
            }
        };

        let child = clean_path(&path.join(entry.file_name()));

        // DirEntry::metadata does not traverse symlinks, so a symlinked
        // directory is reported but never descended into.
        match entry.metadata() {
            Ok(meta) => {
                let _ = visit_node(walker, child, &meta);
            }
            Err(e) => {
                let _ = (walker.visit)(&child, None, Some(&e));
            }
        }
    }
}

/// Normalize a path: drop redundant separators and `.` segments
///
/// An input that reduces to nothing (e.g. `.`) stays `.` so the result is
/// never empty.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            other => cleaned.push(other.as_os_str()),
        }
    }
    if cleaned.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        cleaned
    }
}
