mod common;

use common::apodd_bin;

#[test]
fn version_prints_package_version() {
    let assert = apodd_bin().arg("--version").assert().success();
    let output = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
    assert!(output.contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn help_lists_commands() {
    let assert = apodd_bin().arg("--help").assert().success();
    let output = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
    assert!(output.contains("fetch-now"));
    assert!(output.contains("set-wallpaper"));
    assert!(output.contains("install-service"));
}

#[test]
fn unknown_command_fails() {
    apodd_bin().arg("frobnicate").assert().failure();
}

#[test]
fn set_wallpaper_requires_a_valid_target() {
    apodd_bin()
        .args(["set-wallpaper", "ceiling"])
        .assert()
        .failure();
}

#[test]
fn set_wallpaper_rejects_a_bad_date() {
    apodd_bin()
        .args(["set-wallpaper", "home", "15-01-2024"])
        .assert()
        .failure();
}
