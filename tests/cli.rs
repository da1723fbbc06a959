use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

fn nread(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("nread").unwrap();
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path().join("config"))
        .env("USERPROFILE", home.path());
    cmd
}

#[test]
fn test_dump_prints_segmented_novel() {
    let home = TempDir::new().unwrap();
    let novel = home.path().join("novel.txt");
    fs::write(
        &novel,
        "\u{FEFF}第1章 开端\r\n这是第一段。\r\n\r\n第2章\r\n第二段内容。\r\n",
    )
    .unwrap();

    nread(&home)
        .arg("--dump")
        .arg(&novel)
        .assert()
        .success()
        .stdout("# 第01章 开端\n\n这是第一段。\n\n# 第02章\n\n第二段内容。\n");

    // Dumping reads no positions, records no history and writes no config.
    assert!(!home.path().join("config/nread/states.db").exists());
    assert!(!home.path().join("config/nread/configuration.json").exists());
}

#[test]
fn test_dump_selects_novel_by_key() {
    let home = TempDir::new().unwrap();
    let first = home.path().join("first.txt");
    let second = home.path().join("second.txt");
    fs::write(&first, "第一本。").unwrap();
    fs::write(&second, "第二本。").unwrap();

    nread(&home)
        .args(["--dump", "--novel", "second"])
        .arg(&first)
        .arg(&second)
        .assert()
        .success()
        .stdout("第二本。\n");
}

#[test]
fn test_dump_single_chapter() {
    let home = TempDir::new().unwrap();
    let chapters = home.path().join("book");
    fs::create_dir(&chapters).unwrap();
    fs::write(chapters.join("003.txt"), "第3章 归来\n\n丙段落。\n").unwrap();

    nread(&home)
        .args(["--dump", "--chapter", "003", "--chapters"])
        .arg(&chapters)
        .assert()
        .success()
        .stdout("# 第3章 归来\n\n丙段落。\n");
}

#[test]
fn test_dump_unreadable_file_prints_notice() {
    let home = TempDir::new().unwrap();
    nread(&home)
        .arg("--dump")
        .arg(home.path().join("missing.txt"))
        .assert()
        .success()
        .stdout(predicate::str::contains("读取失败"));
}

#[test]
fn test_history_without_reading() {
    let home = TempDir::new().unwrap();
    nread(&home)
        .arg("-r")
        .assert()
        .success()
        .stdout(predicate::str::contains("No reading history."));
}

#[test]
fn test_chapter_requires_chapters_dir() {
    let home = TempDir::new().unwrap();
    nread(&home)
        .args(["--chapter", "003"])
        .assert()
        .failure();
}

#[test]
fn test_dump_reads_configured_novels() {
    let home = TempDir::new().unwrap();
    let novel = home.path().join("saga.txt");
    fs::write(&novel, "第5章 远行\n\n出发。").unwrap();
    let config_dir = home.path().join("config/nread");
    fs::create_dir_all(&config_dir).unwrap();
    let config = serde_json::json!({
        "Setting": {"novels": [{"key": "saga", "name": "远行记", "file": novel}]}
    });
    fs::write(config_dir.join("configuration.json"), config.to_string()).unwrap();

    nread(&home)
        .args(["--dump", "--novel", "saga"])
        .assert()
        .success()
        .stdout("# 第05章 远行\n\n出发。\n");
}
