#![cfg(unix)]

mod common;

use chapter_merge_core::backend::Mp4Merge;
use chapter_merge_core::{
    CancelFlag, DispatchError, DispatchSettings, Dispatcher, MergeStatus, SilentReporter,
    SkipReason,
};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tempfile::tempdir;

use common::{make_session, write_script, MERGE_FAIL, MERGE_HANG, MERGE_NOTHING, MERGE_OK};

fn dispatcher(binary: PathBuf, output_directory: &Path, timeout: Option<Duration>) -> Dispatcher {
    Dispatcher::new(
        Box::new(Mp4Merge::new(binary)),
        DispatchSettings {
            output_directory: output_directory.to_path_buf(),
            output_prefix: "concatenated".to_string(),
            output_extension: "mp4".to_string(),
            overwrite: false,
            case_insensitive_outputs: true,
            timeout,
        },
    )
}

#[test]
fn test_successful_merge_passes_chapters_in_order() {
    let tmp = tempdir().unwrap();
    let out = tempdir().unwrap();
    let script = write_script(tmp.path(), "merge-ok", MERGE_OK);
    let session = make_session(tmp.path(), "CLIP", 3);

    let result = dispatcher(script, out.path(), None).dispatch(&session);

    assert_eq!(result.status(), MergeStatus::Succeeded);
    let output = result.output_path().unwrap();
    assert_eq!(output, out.path().join("concatenated-CLIP.mp4"));
    assert!(result.error().is_none());

    let written: Vec<PathBuf> = fs::read_to_string(output)
        .unwrap()
        .lines()
        .map(PathBuf::from)
        .collect();
    assert_eq!(written, session.paths());

    // Sources untouched
    for chapter in &session.chapters {
        assert!(chapter.path.exists());
    }
}

#[test]
fn test_nonzero_exit_captures_stderr_and_removes_partial_file() {
    let tmp = tempdir().unwrap();
    let out = tempdir().unwrap();
    let script = write_script(tmp.path(), "merge-fail", MERGE_FAIL);
    let session = make_session(tmp.path(), "CLIP", 2);

    let d = dispatcher(script, out.path(), None);
    let result = d.dispatch(&session);

    assert_eq!(result.status(), MergeStatus::Failed);
    assert!(result.output_path().is_none());
    match result.error() {
        Some(DispatchError::NonZeroExit { code, stderr }) => {
            assert_eq!(*code, Some(3));
            assert!(stderr.contains("boom: corrupt chapter"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(!d.output_path("CLIP").exists());
}

#[test]
fn test_timeout_kills_backend_and_cleans_up() {
    let tmp = tempdir().unwrap();
    let out = tempdir().unwrap();
    let script = write_script(tmp.path(), "merge-hang", MERGE_HANG);
    let session = make_session(tmp.path(), "CLIP", 2);

    let d = dispatcher(script, out.path(), Some(Duration::from_secs(1)));
    let result = d.dispatch(&session);

    assert_eq!(result.status(), MergeStatus::Failed);
    assert_eq!(
        result.error(),
        Some(&DispatchError::Timeout(Duration::from_secs(1)))
    );
    assert!(result.duration() < Duration::from_secs(10));
    assert!(!d.output_path("CLIP").exists());
}

#[test]
fn test_missing_binary_fails_the_session() {
    let tmp = tempdir().unwrap();
    let out = tempdir().unwrap();
    let session = make_session(tmp.path(), "CLIP", 2);
    let binary = tmp.path().join("not-installed");

    let result = dispatcher(binary.clone(), out.path(), None).dispatch(&session);

    assert_eq!(result.status(), MergeStatus::Failed);
    assert_eq!(result.error(), Some(&DispatchError::BinaryNotFound(binary)));
}

#[test]
fn test_success_without_output_is_a_failure() {
    let tmp = tempdir().unwrap();
    let out = tempdir().unwrap();
    let script = write_script(tmp.path(), "merge-nothing", MERGE_NOTHING);
    let session = make_session(tmp.path(), "CLIP", 2);

    let result = dispatcher(script, out.path(), None).dispatch(&session);

    assert!(matches!(
        result.error(),
        Some(DispatchError::MissingOutput(_))
    ));
}

#[test]
fn test_existing_output_is_not_overwritten() {
    let tmp = tempdir().unwrap();
    let out = tempdir().unwrap();
    let script = write_script(tmp.path(), "merge-ok", MERGE_OK);
    let session = make_session(tmp.path(), "CLIP", 2);
    let target = out.path().join("concatenated-CLIP.mp4");
    fs::write(&target, "earlier run").unwrap();

    let result = dispatcher(script, out.path(), None).dispatch(&session);

    assert_eq!(result.status(), MergeStatus::Skipped);
    assert_eq!(result.skip_reason(), Some(SkipReason::OutputExists));
    assert_eq!(fs::read_to_string(&target).unwrap(), "earlier run");
}

#[test]
fn test_non_candidates_are_skipped() {
    let tmp = tempdir().unwrap();
    let out = tempdir().unwrap();
    let script = write_script(tmp.path(), "merge-ok", MERGE_OK);
    let single = make_session(tmp.path(), "SOLO", 1);
    let mut ambiguous = make_session(tmp.path(), "DUP", 2);
    ambiguous.ambiguous = true;

    let d = dispatcher(script, out.path(), None);
    let results = d.dispatch_all(&[ambiguous, single], 2, &SilentReporter);

    assert_eq!(results.len(), 2);
    for result in &results {
        assert_eq!(result.skip_reason(), Some(SkipReason::NotACandidate));
    }
    assert_eq!(fs::read_dir(out.path()).unwrap().count(), 0);
}

#[test]
fn test_colliding_outputs_fail_the_later_session() {
    let tmp = tempdir().unwrap();
    let out = tempdir().unwrap();
    let script = write_script(tmp.path(), "merge-ok", MERGE_OK);
    let upper_dir = tmp.path().join("upper");
    let lower_dir = tmp.path().join("lower");
    fs::create_dir_all(&upper_dir).unwrap();
    fs::create_dir_all(&lower_dir).unwrap();
    let upper = make_session(&upper_dir, "CLIP", 2);
    let lower = make_session(&lower_dir, "clip", 2);

    let d = dispatcher(script, out.path(), None);
    let results = d.dispatch_all(&[upper, lower], 4, &SilentReporter);

    assert_eq!(results[0].session_key(), "CLIP");
    assert_eq!(results[0].status(), MergeStatus::Succeeded);
    assert_eq!(results[1].session_key(), "clip");
    assert!(matches!(
        results[1].error(),
        Some(DispatchError::OutputCollision { claimed_by, .. }) if claimed_by == "CLIP"
    ));
}

#[test]
fn test_duplicate_session_keys_fail_the_later_session() {
    let tmp = tempdir().unwrap();
    let out = tempdir().unwrap();
    let script = write_script(tmp.path(), "merge-ok", MERGE_OK);
    let first_dir = tmp.path().join("a");
    let second_dir = tmp.path().join("b");
    fs::create_dir_all(&first_dir).unwrap();
    fs::create_dir_all(&second_dir).unwrap();
    let first = make_session(&first_dir, "CLIP", 2);
    let second = make_session(&second_dir, "CLIP", 3);

    let results = dispatcher(script, out.path(), None).dispatch_all(
        &[first, second],
        1,
        &SilentReporter,
    );

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].status(), MergeStatus::Succeeded);
    assert_eq!(results[1].status(), MergeStatus::Failed);
}

#[test]
fn test_parallel_and_sequential_runs_agree() {
    let tmp = tempdir().unwrap();
    let script = write_script(tmp.path(), "merge-ok", MERGE_OK);
    let sessions: Vec<_> = (0..10)
        .map(|i| make_session(tmp.path(), &format!("S{:02}", i), 2 + i % 3))
        .collect();

    let summarize = |parallelism: usize| {
        let out = tempdir().unwrap();
        let results = dispatcher(script.clone(), out.path(), None).dispatch_all(
            &sessions,
            parallelism,
            &SilentReporter,
        );
        let summary: BTreeSet<(String, MergeStatus, Option<String>, String)> = results
            .iter()
            .map(|r| {
                let path = r.output_path().unwrap();
                (
                    r.session_key().to_string(),
                    r.status(),
                    path.file_name().map(|n| n.to_string_lossy().into_owned()),
                    fs::read_to_string(path).unwrap(),
                )
            })
            .collect();
        let keys: Vec<String> = results.iter().map(|r| r.session_key().to_string()).collect();
        (summary, keys)
    };

    let (sequential, sequential_keys) = summarize(1);
    let (parallel, parallel_keys) = summarize(4);

    assert_eq!(sequential.len(), 10);
    assert_eq!(sequential, parallel);
    // Reported in scan order either way
    assert_eq!(sequential_keys, parallel_keys);
}

#[test]
fn test_cancellation_kills_in_flight_and_skips_queued() {
    let tmp = tempdir().unwrap();
    let out = tempdir().unwrap();
    let script = write_script(tmp.path(), "merge-hang", MERGE_HANG);
    let sessions: Vec<_> = ["A", "B", "C"]
        .iter()
        .map(|key| make_session(tmp.path(), key, 2))
        .collect();

    let cancel = CancelFlag::new();
    let d = dispatcher(script, out.path(), None).with_cancel_flag(cancel.clone());

    let trigger = thread::spawn(move || {
        thread::sleep(Duration::from_millis(500));
        cancel.cancel();
    });
    let results = d.dispatch_all(&sessions, 1, &SilentReporter);
    trigger.join().unwrap();

    assert_eq!(results[0].error(), Some(&DispatchError::Cancelled));
    assert!(!d.output_path("A").exists());
    for result in &results[1..] {
        assert_eq!(result.status(), MergeStatus::Skipped);
        assert_eq!(result.skip_reason(), Some(SkipReason::Cancelled));
    }
}
