//! Crate-level tests covering process-wide state and behaviour scenarios.

use std::env;
use std::sync::Mutex;

use tempfile::TempDir;

use crate::WorkingDirGuard;


/// Serialises tests that change the process working directory.
static CWD_MUTEX: Mutex<()> = Mutex::new(());

#[test]
fn working_dir_guard_restores_previous_directory() {
    let _lock = CWD_MUTEX.lock().expect("cwd mutex poisoned");
    let original = env::current_dir().expect("current dir");
    let target = TempDir::new().expect("temp dir");

    {
        let guard = WorkingDirGuard::enter(target.path()).expect("enter");
        let inside = env::current_dir().expect("current dir");
        assert_eq!(
            inside.canonicalize().expect("canonical inside"),
            target.path().canonicalize().expect("canonical target")
        );
        assert_eq!(guard.previous(), original.as_path());
    }

    assert_eq!(env::current_dir().expect("current dir"), original);
}

#[test]
fn working_dir_guard_rejects_missing_directory() {
    let _lock = CWD_MUTEX.lock().expect("cwd mutex poisoned");
    let original = env::current_dir().expect("current dir");
    let target = TempDir::new().expect("temp dir");
    let missing = target.path().join("absent");

    let error = WorkingDirGuard::enter(&missing).expect_err("missing directory");

    assert!(error.to_string().contains("absent"), "{error}");
    assert_eq!(env::current_dir().expect("current dir"), original);
}
