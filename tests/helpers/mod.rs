#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Helper to create a test git repository on branch `main`
pub fn create_test_repo() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let repo_path = temp_dir.path().canonicalize().unwrap();

    git(&repo_path, &["init", "-q"]);
    git(&repo_path, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    git(&repo_path, &["config", "user.name", "Test User"]);
    git(&repo_path, &["config", "user.email", "test@example.com"]);
    git(&repo_path, &["config", "commit.gpgsign", "false"]);

    (temp_dir, repo_path)
}

/// Helper to create a commit
pub fn create_commit(repo_path: &Path, file: &str, content: &str, message: &str) {
    let file_path = repo_path.join(file);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent).expect("Failed to create parent directory");
    }
    fs::write(&file_path, content).expect("Failed to write file");

    git(repo_path, &["add", file]);
    git(repo_path, &["commit", "-q", "-m", message]);
}

/// Helper to create a bare repository wired up as `origin` with `main` pushed
pub fn add_bare_origin(repo_path: &Path) -> TempDir {
    let bare = TempDir::new().unwrap();
    git(bare.path(), &["init", "-q", "--bare"]);
    git(bare.path(), &["symbolic-ref", "HEAD", "refs/heads/main"]);
    let url = bare.path().to_string_lossy().to_string();
    git(repo_path, &["remote", "add", "origin", &url]);
    git(repo_path, &["push", "-q", "-u", "origin", "main"]);
    bare
}

/// Helper to clone `origin` into a second working copy
pub fn clone_origin(bare: &Path) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let clone_path = temp_dir.path().join("clone");
    let url = bare.to_string_lossy().to_string();
    git(temp_dir.path(), &["clone", "-q", &url, "clone"]);
    git(&clone_path, &["config", "user.name", "Other User"]);
    git(&clone_path, &["config", "user.email", "other@example.com"]);
    git(&clone_path, &["config", "commit.gpgsign", "false"]);
    (temp_dir, clone_path)
}

/// Run git in a test repository and return stdout
pub fn run_git(repo_path: &Path, args: &[&str]) -> String {
    git(repo_path, args)
}
