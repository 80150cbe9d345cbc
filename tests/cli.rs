#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use assert_cmd::Command;
use tempfile::tempdir;

#[path = "util.rs"]
mod util;

use util::Fixture;

fn cli() -> Command {
    Command::cargo_bin("usda-import").expect("usda-import binary")
}

#[test]
fn import_then_show_food_as_json() -> Result<()> {
    let dir = tempdir()?;
    let archive = Fixture::sample().write(dir.path());
    let db = dir.path().join("usda.sqlite3");

    let output = cli()
        .args(["--database", db.to_str().unwrap(), "-v", "0", "import", "-f"])
        .arg(&archive)
        .output()?;
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("foods"), "{stdout}");

    let output = cli()
        .args(["--database", db.to_str().unwrap(), "-v", "0", "foods", "show", "1001"])
        .output()?;
    assert!(output.status.success());
    let food: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(food["ndbNumber"], 1001);
    assert_eq!(food["foodGroup"], "Dairy and Egg Products");
    assert_eq!(food["weights"].as_array().unwrap().len(), 2);

    let output = cli()
        .args(["--database", db.to_str().unwrap(), "-v", "0", "foods", "list", "--limit", "1"])
        .output()?;
    assert!(output.status.success());
    let foods: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(foods.as_array().unwrap().len(), 1);
    Ok(())
}

#[test]
fn missing_archive_exits_with_failure() -> Result<()> {
    let dir = tempdir()?;
    let db = dir.path().join("usda.sqlite3");

    let output = cli()
        .args(["--database", db.to_str().unwrap(), "import", "-f"])
        .arg(dir.path().join("nope.zip"))
        .output()?;
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("does not exist"), "{stderr}");
    Ok(())
}

#[test]
fn missing_members_are_named_on_stderr() -> Result<()> {
    let dir = tempdir()?;
    let archive = Fixture::sample()
        .without("WEIGHT.txt")
        .without("DATA_SRC.txt")
        .write(dir.path());
    let db = dir.path().join("usda.sqlite3");

    let output = cli()
        .args(["--database", db.to_str().unwrap(), "import", "--all", "-f"])
        .arg(&archive)
        .output()?;
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("unable to extract WEIGHT.txt, DATA_SRC.txt"), "{stderr}");
    Ok(())
}

#[test]
fn migrate_reports_applied_versions() -> Result<()> {
    let dir = tempdir()?;
    let db = dir.path().join("nested").join("usda.sqlite3");

    let output = cli()
        .args(["--database", db.to_str().unwrap(), "migrate"])
        .output()?;
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains("Applied: 1/1"), "{stdout}");
    assert!(db.exists());
    Ok(())
}
