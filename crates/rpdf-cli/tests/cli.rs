use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use predicates::prelude::*;
use tempfile::TempDir;

struct Env {
    dir: TempDir,
}

impl Env {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("config.json"), "{}").unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn rpdf(&self) -> Command {
        let mut cmd = Command::cargo_bin("rpdf").unwrap();
        cmd.arg("--config")
            .arg(self.path("config.json"))
            .arg("--data-dir")
            .arg(self.path("data"));
        cmd
    }

    fn png(&self, name: &str, width: u32, height: u32) -> PathBuf {
        let image = DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 90])
        }));
        let mut data = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut data), ImageFormat::Png)
            .unwrap();

        let path = self.path(name);
        fs::write(&path, data).unwrap();
        path
    }
}

fn add(env: &Env, id: &str, files: &[&Path]) {
    env.rpdf()
        .arg("add")
        .arg(id)
        .args(files)
        .assert()
        .success();
}

#[test]
fn test_add_and_list_pages() {
    let env = Env::new();
    let a = env.png("a.png", 30, 20);
    let b = env.png("b.png", 20, 30);
    add(&env, "scans", &[&a, &b]);

    env.rpdf()
        .args(["pages", "list", "scans"])
        .assert()
        .success()
        .stdout(predicate::str::contains("a.png ⋅ 1"))
        .stdout(predicate::str::contains("b.png ⋅ 1"));
}

#[test]
fn test_move_and_list_as_csv() {
    let env = Env::new();
    let a = env.png("a.png", 30, 20);
    let b = env.png("b.png", 20, 30);
    add(&env, "scans", &[&a, &b]);

    env.rpdf()
        .args(["pages", "move", "scans", "1", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Moved page 1 to 2"));

    let output = env
        .rpdf()
        .args(["pages", "list", "scans", "--format", "csv"])
        .output()
        .unwrap();
    let csv = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = csv.lines().collect();

    assert_eq!(lines.len(), 3);
    assert!(lines[1].contains("b.png"));
    assert!(lines[2].contains("a.png"));
}

#[test]
fn test_export_selected() {
    let env = Env::new();
    let a = env.png("a.png", 30, 20);
    let b = env.png("b.png", 20, 30);
    add(&env, "scans", &[&a, &b]);

    env.rpdf()
        .args(["pages", "select", "scans", "2"])
        .assert()
        .success();

    let out = env.path("out.pdf");
    env.rpdf()
        .args(["export", "scans", "--selected", "-o"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported 1 pages"));

    assert!(fs::read(&out).unwrap().starts_with(b"%PDF-"));
}

#[test]
fn test_page_image() {
    let env = Env::new();
    let a = env.png("a.png", 300, 100);
    add(&env, "scans", &[&a]);

    let out = env.path("page.png");
    env.rpdf()
        .args(["page-image", "scans", "1", "--size", "60", "-o"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("60x20"));

    let image = image::open(&out).unwrap();
    assert_eq!((image.width(), image.height()), (60, 20));
}

#[test]
fn test_rename_and_remove_workspace() {
    let env = Env::new();
    let a = env.png("a.png", 10, 10);
    add(&env, "scans", &[&a]);

    env.rpdf()
        .args(["workspace", "rename", "scans", "Receipts"])
        .assert()
        .success();
    env.rpdf()
        .args(["workspace", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Receipts"));

    env.rpdf()
        .args(["workspace", "remove", "scans"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 files deleted"));
    env.rpdf()
        .args(["workspace", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No workspaces yet"));
}

#[test]
fn test_out_of_range_position_fails() {
    let env = Env::new();
    let a = env.png("a.png", 10, 10);
    add(&env, "scans", &[&a]);

    env.rpdf()
        .args(["pages", "delete", "scans", "5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("out of range"));
}

#[test]
fn test_invalid_workspace_id() {
    let env = Env::new();

    env.rpdf()
        .args(["pages", "list", "../etc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid workspace id"));
}

#[test]
fn test_unsupported_file_is_rejected() {
    let env = Env::new();
    let notes = env.path("notes.txt");
    fs::write(&notes, "hello").unwrap();

    env.rpdf()
        .arg("add")
        .arg("scans")
        .arg(&notes)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported input"));
}

#[test]
fn test_config_get_and_set() {
    let env = Env::new();

    env.rpdf()
        .args(["config", "set", "thumbnails.max_size", "96"])
        .assert()
        .success();
    env.rpdf()
        .args(["config", "get", "thumbnails.max_size"])
        .assert()
        .success()
        .stdout(predicate::str::contains("96"));
}
