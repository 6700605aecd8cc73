use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

use dedupe_core::storage::Database;
use dedupe_core::{AppConfig, ScanEngine, SilentReporter};

const QUARANTINE: &str = "duplicate_to_be_deleted";

fn count_files_recursive(dir: &Path) -> usize {
    let mut count = 0;
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                count += count_files_recursive(&path);
            } else if path.is_file() {
                count += 1;
            }
        }
    }
    count
}

fn config_for(root: &Path, db_path: &Path) -> AppConfig {
    AppConfig::default()
        .with_scan_root(root)
        .with_db_path(db_path)
        .with_workers(4)
}

/// Layout:
///   root/
///     a.txt      ("X")
///     b/a.txt    ("X")   ← duplicate of a.txt
///     c.txt      ("Y")
fn create_scenario_tree(root: &Path) {
    fs::create_dir_all(root.join("b")).unwrap();
    fs::write(root.join("a.txt"), "X").unwrap();
    fs::write(root.join("b/a.txt"), "X").unwrap();
    fs::write(root.join("c.txt"), "Y").unwrap();
}

#[test]
fn test_scenario_one_duplicate_two_records() {
    let tmp = tempdir().unwrap();
    let root = fs::canonicalize(tmp.path()).unwrap().join("scan_root");
    create_scenario_tree(&root);

    let db_dir = tempdir().unwrap();
    let db_path = db_dir.path().join("index.db");

    let result = ScanEngine::new(config_for(&root, &db_path))
        .scan(&SilentReporter)
        .unwrap();

    assert_eq!(result.files_discovered, 3);
    assert_eq!(result.files_processed, 3);
    assert_eq!(result.originals, 2);
    assert_eq!(result.duplicates_quarantined, 1);
    assert_eq!(result.quarantined_bytes, 1);
    assert_eq!(result.error_count(), 0);
    assert!(!result.cancelled);

    let top = root.join("a.txt");
    let nested = root.join("b/a.txt");
    let top_moved = root.join(QUARANTINE).join("a.txt");
    let nested_moved = root.join("b").join(QUARANTINE).join("a.txt");

    // Exactly one copy stayed put; the other sits in its own directory's quarantine.
    assert!(top.exists() ^ nested.exists());
    if top.exists() {
        assert!(nested_moved.exists() && !top_moved.exists());
    } else {
        assert!(top_moved.exists() && !nested_moved.exists());
    }
    assert!(root.join("c.txt").exists());

    let db = Database::open(&db_path).unwrap();
    let records = db.get_all_records().unwrap();
    assert_eq!(records.len(), 2);
    let kept = if top.exists() { &top } else { &nested };
    let paths: Vec<PathBuf> = records.iter().map(|r| PathBuf::from(&r.path)).collect();
    assert!(paths.contains(kept));
    assert!(paths.contains(&root.join("c.txt")));
}

#[test]
fn test_rerun_is_stable() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("scan_root");
    create_scenario_tree(&root);
    let db_path = tmp.path().join("index.db");

    let engine = ScanEngine::new(config_for(&root, &db_path));
    engine.scan(&SilentReporter).unwrap();
    let files_after_first = count_files_recursive(&root);

    let second = engine.scan(&SilentReporter).unwrap();
    // The quarantined copy is not walked again.
    assert_eq!(second.files_discovered, 2);
    assert_eq!(second.already_indexed, 2);
    assert_eq!(second.originals, 0);
    assert_eq!(second.duplicates_quarantined, 0);
    assert_eq!(count_files_recursive(&root), files_after_first);

    let db = Database::open(&db_path).unwrap();
    assert_eq!(db.record_count().unwrap(), 2);
}

#[test]
fn test_new_copy_after_first_run_is_quarantined() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("scan_root");
    create_scenario_tree(&root);
    let db_path = tmp.path().join("index.db");

    let engine = ScanEngine::new(config_for(&root, &db_path));
    engine.scan(&SilentReporter).unwrap();

    fs::write(root.join("late_copy.txt"), "Y").unwrap();
    let second = engine.scan(&SilentReporter).unwrap();
    assert_eq!(second.duplicates_quarantined, 1);
    assert!(!root.join("late_copy.txt").exists());
    assert!(root.join(QUARANTINE).join("late_copy.txt").exists());
}

#[test]
fn test_modified_original_refreshes_index() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("scan_root");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("notes.txt"), "draft").unwrap();
    let db_path = tmp.path().join("index.db");

    let engine = ScanEngine::new(config_for(&root, &db_path));
    engine.scan(&SilentReporter).unwrap();

    fs::write(root.join("notes.txt"), "final version").unwrap();
    let second = engine.scan(&SilentReporter).unwrap();
    assert_eq!(second.refreshed, 1);

    let db = Database::open(&db_path).unwrap();
    let records = db.get_all_records().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].size, "final version".len() as i64);
}

#[test]
fn test_no_file_is_lost_in_a_busy_tree() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("scan_root");
    let mut expected_names = Vec::new();
    for dir in 0..8 {
        let d = root.join(format!("dir_{dir}"));
        fs::create_dir_all(&d).unwrap();
        for file in 0..25 {
            let name = format!("file_{file}.dat");
            // 7 distinct contents spread over 200 files.
            fs::write(d.join(&name), vec![((dir * 25 + file) % 7) as u8; 512]).unwrap();
            expected_names.push((d.clone(), name));
        }
    }
    let db_path = tmp.path().join("index.db");

    let mut config = config_for(&root, &db_path).with_workers(16);
    config.queue_capacity = 4;
    let result = ScanEngine::new(config).scan(&SilentReporter).unwrap();

    assert_eq!(result.files_processed, 200);
    assert_eq!(result.originals, 7);
    assert_eq!(result.duplicates_quarantined, 193);
    assert_eq!(count_files_recursive(&root), 200);

    for (dir, name) in &expected_names {
        let in_place = dir.join(name).exists();
        let quarantined = dir.join(QUARANTINE).join(name).exists();
        assert!(in_place ^ quarantined, "{}/{} lost or doubled", dir.display(), name);
    }

    let db = Database::open(&db_path).unwrap();
    assert_eq!(db.record_count().unwrap(), 7);
}

#[test]
fn test_index_inside_scan_root_is_not_scanned() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("scan_root");
    create_scenario_tree(&root);
    let db_path = root.join("index.db");

    let result = ScanEngine::new(config_for(&root, &db_path))
        .scan(&SilentReporter)
        .unwrap();
    assert_eq!(result.files_discovered, 3);
    assert!(db_path.exists());
}

#[test]
fn test_scan_with_ignore_patterns() {
    let tmp = tempdir().unwrap();
    let root = tmp.path().join("scan_root");
    create_scenario_tree(&root);
    let db_path = tmp.path().join("index.db");

    let mut config = config_for(&root, &db_path);
    config.ignore_patterns = vec!["**/b".to_string()];
    let result = ScanEngine::new(config).scan(&SilentReporter).unwrap();

    assert_eq!(result.files_discovered, 2);
    assert_eq!(result.duplicates_quarantined, 0);
    assert!(root.join("b/a.txt").exists());
}
