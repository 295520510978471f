//! Runs the tagger against small shell scripts standing in for exiftool.
#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rayban_tag::sniff::{self, Source};
use rayban_tag::tagger::{apply_tags, ErrorKind, Tagger, TaggerError};
use tempfile::TempDir;

/// Write an executable `sh` script into `dir`.
fn stub_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn media_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, bytes).unwrap();
    path
}

#[tokio::test]
async fn backup_left_by_tool_is_removed() {
    let tools = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    // Copy the last argument to <file>_original, like exiftool without -overwrite_original.
    let tool = stub_tool(
        tools.path(),
        "exiftool",
        r#"for last; do :; done; cp "$last" "${last}_original""#,
    );
    let photo = media_file(work.path(), "photo.jpg", b"\xFF\xD8\xFF\xE0rest");

    let tagged = apply_tags(&photo, &tool, &[] as &[&str]).await.unwrap();

    assert_eq!(tagged, photo);
    assert!(photo.exists());
    assert!(!work.path().join("photo.jpg_original").exists());
}

#[tokio::test]
async fn tool_receives_tags_overwrite_flag_and_path_last() {
    let tools = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let log = work.path().join("argv.txt");
    let tool = stub_tool(
        tools.path(),
        "exiftool",
        &format!(r#"for arg; do echo "$arg" >> "{}"; done"#, log.display()),
    );
    let photo = media_file(work.path(), "photo.png", b"\x89PNG\r\n\x1a\n");

    Tagger::new(&tool)
        .with_extra_args(["-q"])
        .apply_tags(&photo)
        .await
        .unwrap();

    let argv = fs::read_to_string(&log).unwrap();
    let argv: Vec<&str> = argv.lines().collect();
    assert_eq!(
        argv,
        vec![
            "-Make=Meta",
            "-Model=Ray-Ban Meta Smart Glasses",
            "-Software=Meta View App",
            "-overwrite_original",
            "-q",
            photo.to_str().unwrap(),
        ]
    );
}

#[tokio::test]
async fn failing_tool_reports_stderr_and_keeps_backup() {
    let tools = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let tool = stub_tool(tools.path(), "exiftool", r#"echo "bad file" >&2; exit 1"#);
    let photo = media_file(work.path(), "photo.jpg", b"\xFF\xD8\xFF");
    let backup = media_file(work.path(), "photo.jpg_original", b"previous run");

    let err = apply_tags(&photo, &tool, &[] as &[&str]).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ToolFailed);
    match err {
        TaggerError::ToolFailed { code, stderr, .. } => {
            assert_eq!(code, Some(1));
            assert!(stderr.contains("bad file"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(backup.exists());
}

#[tokio::test]
async fn missing_tool_is_unavailable() {
    let work = TempDir::new().unwrap();
    let photo = media_file(work.path(), "photo.jpg", b"\xFF\xD8\xFF");

    let err = apply_tags(&photo, Path::new("/nonexistent/bin/exiftool"), &[] as &[&str])
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ToolUnavailable);
}

#[tokio::test]
async fn tool_without_exec_permission_is_unavailable() {
    let tools = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let tool = stub_tool(tools.path(), "exiftool", "exit 0");
    fs::set_permissions(&tool, fs::Permissions::from_mode(0o644)).unwrap();
    let photo = media_file(work.path(), "photo.jpg", b"\xFF\xD8\xFF");
    let backup = media_file(work.path(), "photo.jpg_original", b"previous run");

    let err = apply_tags(&photo, &tool, &[] as &[&str]).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ToolUnavailable);
    assert!(err.to_string().contains(tool.to_str().unwrap()));
    assert!(backup.exists());
}

/// Whether `pid` is a live (non-zombie) process.
#[cfg(target_os = "linux")]
fn is_running(pid: u32) -> bool {
    let Ok(stat) = fs::read_to_string(format!("/proc/{pid}/stat")) else {
        return false;
    };
    // Field 3, after the parenthesised command name.
    let state = stat
        .rsplit_once(')')
        .and_then(|(_, rest)| rest.trim_start().chars().next());
    !matches!(state, Some('Z') | Some('X') | None)
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn hung_tool_is_killed_on_timeout() {
    let tools = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let pid_file = work.path().join("tool.pid");
    let tool = stub_tool(
        tools.path(),
        "exiftool",
        &format!(r#"echo $$ > "{}"; exec sleep 30"#, pid_file.display()),
    );
    let photo = media_file(work.path(), "clip.mp4", b"\x00\x00\x00\x18ftypmp42");

    let started = std::time::Instant::now();
    let err = Tagger::new(&tool)
        .with_timeout(Some(Duration::from_millis(500)))
        .apply_tags(&photo)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::TimedOut);
    assert!(started.elapsed() < Duration::from_secs(5));

    let pid: u32 = fs::read_to_string(&pid_file).unwrap().trim().parse().unwrap();
    let mut alive = is_running(pid);
    for _ in 0..40 {
        if !alive {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        alive = is_running(pid);
    }
    assert!(!alive, "tool process {pid} still running after timeout");
}

#[tokio::test]
async fn png_sniffed_then_tagged_with_pass_through_tool() {
    let tools = TempDir::new().unwrap();
    let work = TempDir::new().unwrap();
    let tool = stub_tool(tools.path(), "exiftool", "exit 0");
    let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
    bytes.extend((0..500u32).map(|i| (i % 251) as u8));
    let upload = media_file(work.path(), "upload", &bytes);

    assert_eq!(sniff::identify(Source::Path(&upload)).unwrap(), Some("png"));

    apply_tags(&upload, &tool, &[] as &[&str]).await.unwrap();

    assert_eq!(fs::metadata(&upload).unwrap().len(), bytes.len() as u64);
    assert_eq!(fs::read_dir(work.path()).unwrap().count(), 1);
}
