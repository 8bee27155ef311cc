//! Integration tests for dupscan
//!
//! Each test builds a real directory tree under a tempdir, runs the full
//! pipeline, and checks the duplicate report and the run counters.

use dupscan::finder::{Finder, StatsSnapshot};
use dupscan::node::Dup;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

/// SHA-1 of 10 KiB of zero bytes
const SHA1_10K_ZEROS: &str = "5b00669c480d5cffbdfa8bdba99561160f2d1b77";

fn write_file(path: &Path, content: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let mut f = File::create(path).unwrap();
    f.write_all(content).unwrap();
}

fn run_finder(roots: Vec<PathBuf>, fast_prefix: bool) -> (Vec<Dup>, StatsSnapshot) {
    let finder = Finder::new(4).unwrap();
    let dups: Vec<Dup> = finder
        .find_dups(roots, fast_prefix)
        .unwrap()
        .iter()
        .collect();
    (dups, finder.snapshot())
}

/// Sort key for comparing reports across runs
fn sorted(mut dups: Vec<Dup>) -> Vec<Dup> {
    dups.sort_by(|a, b| {
        (&a.node.hash, &a.node.path).cmp(&(&b.node.hash, &b.node.path))
    });
    dups
}

#[test]
fn test_distinct_content_produces_empty_report() {
    let dir = tempdir().unwrap();
    for i in 0..10u8 {
        write_file(&dir.path().join(format!("file-{i}")), &[i; 64]);
    }

    let (dups, stats) = run_finder(vec![dir.path().to_path_buf()], true);

    assert!(dups.is_empty());
    assert_eq!(stats.files, 10);
    assert_eq!(stats.dirs, 1);
    assert_eq!(stats.dup_instances, 0);
    assert_eq!(stats.wasted_bytes, 0);
}

#[test]
fn test_three_identical_zero_block_files() {
    let dir = tempdir().unwrap();
    let zeros = vec![0u8; 10 * 1024];
    for name in ["a", "b", "c"] {
        write_file(&dir.path().join(name), &zeros);
    }

    let (dups, stats) = run_finder(vec![dir.path().to_path_buf()], true);

    assert_eq!(dups.len(), 3);
    for dup in &dups {
        assert_eq!(dup.count, 3);
        assert_eq!(dup.node.size, 10_240);
        assert_eq!(dup.node.hash, SHA1_10K_ZEROS);
        assert!(dup.to_string().starts_with(SHA1_10K_ZEROS));
    }
    assert_eq!(stats.dup_instances, 3);
    assert_eq!(stats.wasted_bytes, 20_480);
}

#[test]
fn test_full_hash_only_variant_agrees() {
    let dir = tempdir().unwrap();
    let zeros = vec![0u8; 10 * 1024];
    for name in ["a", "b", "c"] {
        write_file(&dir.path().join(name), &zeros);
    }

    let (fast, _) = run_finder(vec![dir.path().to_path_buf()], true);
    let (full, _) = run_finder(vec![dir.path().to_path_buf()], false);

    assert_eq!(sorted(fast), sorted(full));
}

#[test]
fn test_same_size_different_content() {
    let dir = tempdir().unwrap();

    // Same size, different from the first byte on.
    write_file(&dir.path().join("x"), &[b'x'; 8192]);
    write_file(&dir.path().join("y"), &[b'y'; 8192]);

    let (dups, stats) = run_finder(vec![dir.path().to_path_buf()], true);
    assert!(dups.is_empty());
    assert_eq!(stats.wasted_bytes, 0);
}

#[test]
fn test_same_prefix_different_tail() {
    let dir = tempdir().unwrap();

    // Identical first 4 KiB, so the prefix stage cannot separate them;
    // only the full hash can.
    let mut one = vec![b'p'; 6000];
    let mut two = one.clone();
    one.push(b'1');
    two.push(b'2');
    write_file(&dir.path().join("one"), &one);
    write_file(&dir.path().join("two"), &two);

    let (dups, _) = run_finder(vec![dir.path().to_path_buf()], true);
    assert!(dups.is_empty());
}

#[test]
fn test_overlapping_roots_report_each_file_once() {
    let dir = tempdir().unwrap();
    let root = dir.path().to_path_buf();
    let nested = root.join("sub");

    // A single unique file under the overlap: without path dedup the two
    // walks would list it twice and fake a duplicate pair.
    write_file(&nested.join("unique"), b"only one of me");

    let (dups, _) = run_finder(vec![root.clone(), nested.clone()], true);
    assert!(dups.is_empty());

    // A real pair spanning the overlap is still found, exactly once each.
    write_file(&root.join("copy1"), b"shared content here");
    write_file(&nested.join("copy2"), b"shared content here");

    let (dups, stats) = run_finder(vec![root, nested], true);
    assert_eq!(dups.len(), 2);
    for dup in &dups {
        assert_eq!(dup.count, 2);
    }
    assert_eq!(stats.dup_instances, 2);
}

#[test]
fn test_zero_byte_pair() {
    let dir = tempdir().unwrap();
    write_file(&dir.path().join("empty-a"), b"");
    write_file(&dir.path().join("empty-b"), b"");

    let (dups, stats) = run_finder(vec![dir.path().to_path_buf()], true);

    assert_eq!(dups.len(), 2);
    for dup in &dups {
        assert_eq!(dup.count, 2);
        assert_eq!(dup.node.size, 0);
    }
    assert_eq!(stats.wasted_bytes, 0);
}

#[test]
fn test_hardlinks_count_as_duplicates() {
    let dir = tempdir().unwrap();
    let original = dir.path().join("original");
    write_file(&original, b"linked payload");
    fs::hard_link(&original, dir.path().join("link")).unwrap();

    let (dups, _) = run_finder(vec![dir.path().to_path_buf()], true);
    assert_eq!(dups.len(), 2);
    assert!(dups.iter().all(|d| d.count == 2));
}

#[test]
fn test_repeat_run_is_idempotent() {
    let dir = tempdir().unwrap();
    let payload = vec![7u8; 2048];
    write_file(&dir.path().join("d1/a"), &payload);
    write_file(&dir.path().join("d2/b"), &payload);
    write_file(&dir.path().join("d2/c"), b"different");

    let (first, first_stats) = run_finder(vec![dir.path().to_path_buf()], true);
    let (second, second_stats) = run_finder(vec![dir.path().to_path_buf()], true);

    assert_eq!(sorted(first), sorted(second));
    assert_eq!(first_stats, second_stats);
}

#[test]
fn test_wasted_space_matches_emitted_classes() {
    let dir = tempdir().unwrap();

    // Two classes: 3 × 1 KiB and 2 × 300 B.
    for name in ["k1/a", "k1/b", "k1/c"] {
        write_file(&dir.path().join(name), &[1u8; 1024]);
    }
    for name in ["k2/a", "k2/b"] {
        write_file(&dir.path().join(name), &[2u8; 300]);
    }

    let (dups, stats) = run_finder(vec![dir.path().to_path_buf()], true);

    // Recompute Σ size × (count − 1) from the report itself.
    let mut classes: Vec<(&str, u64, usize)> = dups
        .iter()
        .map(|d| (d.node.hash.as_str(), d.node.size, d.count))
        .collect();
    classes.sort();
    classes.dedup();
    let expected: u64 = classes
        .iter()
        .map(|&(_, size, count)| size * (count as u64 - 1))
        .sum();

    assert_eq!(stats.wasted_bytes, expected);
    assert_eq!(stats.wasted_bytes, 2 * 1024 + 300);
    assert_eq!(stats.dup_instances, 5);
}

#[test]
fn test_class_lines_are_contiguous() {
    let dir = tempdir().unwrap();
    for name in ["g1/a", "g1/b", "g2/a", "g2/b"] {
        let content = if name.starts_with("g1") { b"first group".as_slice() } else { b"second group!".as_slice() };
        write_file(&dir.path().join(name), content);
    }

    let (dups, _) = run_finder(vec![dir.path().to_path_buf()], true);
    assert_eq!(dups.len(), 4);

    // Members of one class are emitted back to back.
    let hashes: Vec<&str> = dups.iter().map(|d| d.node.hash.as_str()).collect();
    let mut seen_closed: Vec<&str> = Vec::new();
    let mut current: Option<&str> = None;
    for h in hashes {
        if current != Some(h) {
            assert!(!seen_closed.contains(&h), "class split across the report");
            if let Some(prev) = current {
                seen_closed.push(prev);
            }
            current = Some(h);
        }
    }
}
