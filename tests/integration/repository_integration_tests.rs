//! Integration tests for the file-based state repository
//!
//! Tests complete repository workflows against a real backing file:
//! - Cross-instance visibility on a shared file
//! - On-disk format stability (sorting, comments, escaping)
//! - Failure semantics for corrupted files
//! - Host-wide lock scope

use std::fs;

use flagfile::{FeatureState, FileBasedStateRepository, FlagFileError, LockScope};
use tempfile::TempDir;

#[test]
fn test_state_survives_repository_reconstruction() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("features.state");

    {
        let repo = FileBasedStateRepository::new(&path).unwrap();
        repo.set_feature_state(
            "PERSISTED",
            FeatureState::enabled()
                .with_strategy("release-date")
                .with_parameter("date", "2026-08-01"),
        )
        .unwrap();
    }

    let repo = FileBasedStateRepository::new(&path).unwrap();
    let state = repo.get_feature_state("PERSISTED").unwrap().unwrap();
    assert!(state.enabled);
    assert_eq!(state.strategy_id.as_deref(), Some("release-date"));
    assert_eq!(state.parameter("date"), Some("2026-08-01"));
}

#[test]
fn test_two_instances_observe_each_others_writes() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("features.state");

    let repo_a = FileBasedStateRepository::new(&path).unwrap();
    let repo_b = FileBasedStateRepository::new(&path).unwrap();

    repo_a
        .set_feature_state("FROM_A", FeatureState::enabled())
        .unwrap();
    assert!(repo_b.get_feature_state("FROM_A").unwrap().is_some());

    repo_b
        .set_feature_state("FROM_B", FeatureState::disabled())
        .unwrap();
    assert!(repo_a.get_feature_state("FROM_B").unwrap().is_some());

    assert!(repo_b.remove_feature_state("FROM_A").unwrap());
    assert_eq!(repo_a.get_feature_state("FROM_A").unwrap(), None);
}

#[test]
fn test_special_characters_round_trip_through_the_file() {
    let temp_dir = TempDir::new().unwrap();
    let repo =
        FileBasedStateRepository::new(temp_dir.path().join("features.state")).unwrap();

    let state = FeatureState::enabled()
        .with_strategy("strategy|with=delimiters\\and\nnewlines")
        .with_parameter("key|one", "value=two")
        .with_parameter("key\\three", "value\nfour");
    repo.set_feature_state("NAME|WITH=SPECIALS", state.clone())
        .unwrap();

    assert_eq!(
        repo.get_feature_state("NAME|WITH=SPECIALS").unwrap(),
        Some(state)
    );
    // each record still occupies exactly one line on disk
    let content = fs::read_to_string(repo.path()).unwrap();
    assert_eq!(content.lines().count(), 1);
}

#[test]
fn test_file_is_rewritten_name_sorted() {
    let temp_dir = TempDir::new().unwrap();
    let repo =
        FileBasedStateRepository::new(temp_dir.path().join("features.state")).unwrap();

    for name in ["DELTA", "ALPHA", "CHARLIE", "BRAVO"] {
        repo.set_feature_state(name, FeatureState::enabled()).unwrap();
    }

    let content = fs::read_to_string(repo.path()).unwrap();
    let names: Vec<&str> = content
        .lines()
        .map(|l| l.split('|').next().unwrap())
        .collect();
    assert_eq!(names, vec!["ALPHA", "BRAVO", "CHARLIE", "DELTA"]);
}

#[test]
fn test_externally_corrupted_file_is_surfaced_not_discarded() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("features.state");
    let repo = FileBasedStateRepository::new(&path).unwrap();

    repo.set_feature_state("GOOD", FeatureState::enabled()).unwrap();

    // an external writer bypassing the repository corrupts one line
    let mut content = fs::read_to_string(&path).unwrap();
    content.push_str("corrupted trailing line\n");
    fs::write(&path, &content).unwrap();

    let err = repo.get_feature_state("GOOD").unwrap_err();
    assert!(matches!(err, FlagFileError::MalformedFile(_)));

    let err = repo
        .set_feature_state("OTHER", FeatureState::disabled())
        .unwrap_err();
    assert!(matches!(err, FlagFileError::MalformedFile(_)));

    // the file is left exactly as the external writer left it
    assert_eq!(fs::read_to_string(&path).unwrap(), content);
}

#[test]
fn test_not_found_is_not_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let repo =
        FileBasedStateRepository::new(temp_dir.path().join("features.state")).unwrap();

    assert_eq!(repo.get_feature_state("ABSENT").unwrap(), None);

    repo.set_feature_state("PRESENT", FeatureState::enabled()).unwrap();
    assert_eq!(repo.get_feature_state("ABSENT").unwrap(), None);
}

#[test]
fn test_listing_operations() {
    let temp_dir = TempDir::new().unwrap();
    let repo =
        FileBasedStateRepository::new(temp_dir.path().join("features.state")).unwrap();

    repo.set_feature_state("ONE", FeatureState::enabled()).unwrap();
    repo.set_feature_state(
        "TWO",
        FeatureState::disabled().with_strategy("username"),
    )
    .unwrap();

    let table = repo.all_feature_states().unwrap();
    assert_eq!(table.len(), 2);
    assert!(table["ONE"].enabled);
    assert_eq!(table["TWO"].strategy_id.as_deref(), Some("username"));

    assert_eq!(repo.feature_names().unwrap(), vec!["ONE", "TWO"]);
}

#[cfg(unix)]
#[test]
fn test_host_scope_round_trip_and_lock_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("features.state");
    let repo = FileBasedStateRepository::with_lock_scope(&path, LockScope::Host).unwrap();

    repo.set_feature_state(
        "SHARED",
        FeatureState::enabled().with_parameter("p", "v"),
    )
    .unwrap();

    assert!(repo.get_feature_state("SHARED").unwrap().is_some());
    assert!(temp_dir.path().join("features.state.lock").exists());

    // the lock file is not part of the table
    let content = fs::read_to_string(&path).unwrap();
    assert_eq!(content.lines().count(), 1);
}

#[cfg(unix)]
#[test]
fn test_host_and_process_scoped_instances_share_the_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("features.state");

    let host_repo =
        FileBasedStateRepository::with_lock_scope(&path, LockScope::Host).unwrap();
    let process_repo = FileBasedStateRepository::new(&path).unwrap();

    host_repo
        .set_feature_state("FEATURE", FeatureState::enabled())
        .unwrap();
    assert!(process_repo.get_feature_state("FEATURE").unwrap().is_some());
}
