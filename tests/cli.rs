use std::fs;
use std::path::Path;
use std::process::Output;

use pretty_assertions::assert_eq;

fn zonesnap(config: &Path, args: &[&str]) -> Output {
    test_bin::get_test_bin("zonesnap")
        .arg("--config")
        .arg(config)
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to run zonesnap")
}

fn stdout(output: &Output) -> String { String::from_utf8_lossy(&output.stdout).into_owned() }

fn setup() -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    let layouts = dir.path().join("layouts");
    fs::write(
        &config,
        format!("[settings]\nlayouts_dir = {:?}\n", layouts.to_str().unwrap()),
    )
    .unwrap();
    (dir, config)
}

#[test]
fn layout_lifecycle() {
    let (_dir, config) = setup();

    let created = zonesnap(
        &config,
        &["layouts", "create", "work", "--columns", "3", "--rows", "2", "--size", "1920x1080"],
    );
    assert!(created.status.success(), "{created:?}");

    let listed = zonesnap(&config, &["layouts", "list"]);
    assert_eq!(stdout(&listed), "work\t6 zones\n");

    let shown = zonesnap(&config, &["layouts", "show", "work"]);
    let layout: serde_json::Value = serde_json::from_str(&stdout(&shown)).unwrap();
    assert_eq!(layout["name"], "work");
    assert_eq!(layout["zones"][4]["bounds"]["left"], 640.0);
    assert_eq!(layout["zones"][4]["bounds"]["top"], 540.0);
    assert_eq!(layout["zones"][4]["columnSpan"], 1);

    let deleted = zonesnap(&config, &["layouts", "delete", "work"]);
    assert_eq!(stdout(&deleted), "Deleted work\n");
    let again = zonesnap(&config, &["layouts", "delete", "work"]);
    assert!(again.status.success());
    assert_eq!(stdout(&again), "No layout named \"work\"\n");

    let listed = zonesnap(&config, &["layouts", "list"]);
    assert_eq!(stdout(&listed), "");
}

#[test]
fn layouts_path_follows_config() {
    let (dir, config) = setup();
    let out = zonesnap(&config, &["layouts", "path"]);
    assert_eq!(stdout(&out).trim_end(), dir.path().join("layouts").to_str().unwrap());
}

#[test]
fn show_missing_layout_fails() {
    let (_dir, config) = setup();
    let out = zonesnap(&config, &["layouts", "show", "nope"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("no layout named \"nope\""));
}

#[test]
fn corrupt_record_is_skipped_in_list() {
    let (dir, config) = setup();
    zonesnap(&config, &["layouts", "create", "a", "--size", "800x600"]);
    fs::write(dir.path().join("layouts").join("broken.json"), "{ not json").unwrap();

    let listed = zonesnap(&config, &["layouts", "list"]);

    assert!(listed.status.success());
    assert_eq!(stdout(&listed), "a\t2 zones\n");
}

#[test]
fn config_validate_reports_problems() {
    let (_dir, config) = setup();
    let ok = zonesnap(&config, &["config", "validate"]);
    assert!(ok.status.success());
    assert_eq!(stdout(&ok), "Config validation passed\n");

    fs::write(&config, "[settings]\nrefresh_interval_secs = 0\n").unwrap();
    let bad = zonesnap(&config, &["config", "validate"]);
    assert!(!bad.status.success());
    assert!(String::from_utf8_lossy(&bad.stderr).contains("refresh_interval_secs"));
}

#[test]
fn default_config_is_printable_and_valid() {
    let (dir, config) = setup();
    let out = zonesnap(&config, &["config", "default"]);
    let written = dir.path().join("default.toml");
    fs::write(&written, out.stdout).unwrap();

    let check = zonesnap(&written, &["config", "validate"]);
    assert!(check.status.success(), "{check:?}");
}

#[test]
fn window_commands_refuse_an_invalid_config() {
    let (dir, config) = setup();
    fs::write(
        &config,
        format!(
            "[settings]\nlayouts_dir = {:?}\n\n[keys]\n\"Left\" = \"cycle_snap\"\n",
            dir.path().join("layouts").to_str().unwrap()
        ),
    )
    .unwrap();

    let commands: [&[&str]; 3] = [&["run"], &["snap"], &["windows"]];
    for args in commands {
        let out = zonesnap(&config, args);
        assert!(!out.status.success(), "{args:?}");
        let stderr = String::from_utf8_lossy(&out.stderr);
        assert!(stderr.contains("problem(s) in"), "{args:?}: {stderr}");
    }

    let listed = zonesnap(&config, &["layouts", "list"]);
    assert!(listed.status.success(), "{listed:?}");
}
