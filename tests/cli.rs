//! End-to-end tests for the `workorder` binary.

use pretty_assertions::assert_eq;
use std::path::Path;
use std::process::{Command, Output};

fn run(data_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_workorder"))
        .arg("--data-dir")
        .arg(data_dir)
        .args(args)
        .output()
        .expect("failed to run workorder")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_order_commit_and_render() {
    let data = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let dir = data.path();

    assert!(run(dir, &["customer", "add", "Ayşe Yılmaz", "--phone", "555"]).status.success());
    assert!(run(dir, &["order", "select-customer", "C001"]).status.success());
    assert!(run(dir, &["order", "add", "KP001", "2"]).status.success());
    assert!(run(dir, &["order", "add", "KY001"]).status.success());

    let render_dir = out.path().to_string_lossy().into_owned();
    let commit = run(dir, &["order", "commit", "--render", &render_dir]);
    assert!(commit.status.success());

    let rendered: Vec<_> = std::fs::read_dir(out.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(rendered.len(), 1);
    assert!(rendered[0].starts_with("WorkOrder_WO-"));
    assert!(rendered[0].ends_with(".pdf"));

    let list = stdout(&run(dir, &["customer", "list"]));
    assert!(list.contains("Ayşe Yılmaz"));
    assert!(list.contains("1 order(s)"));

    assert!(run(dir, &["history", "check"]).status.success());
}

#[test]
fn test_add_without_customer_fails() {
    let data = tempfile::tempdir().unwrap();
    let output = run(data.path(), &["order", "add", "KP001", "1"]);
    assert!(!output.status.success());
}

#[test]
fn test_quantity_out_of_range_fails() {
    let data = tempfile::tempdir().unwrap();
    let dir = data.path();
    assert!(run(dir, &["customer", "add", "Nur"]).status.success());
    assert!(run(dir, &["order", "select-customer", "Nur"]).status.success());
    assert!(!run(dir, &["order", "add", "KP001", "1000"]).status.success());
    assert!(run(dir, &["order", "add", "KP001", "999"]).status.success());
}

#[test]
fn test_product_suggest_ranks_code_prefix_first() {
    let data = tempfile::tempdir().unwrap();
    let output = run(data.path(), &["product", "suggest", "kp00"]);
    assert!(output.status.success());
    let codes: Vec<String> = stdout(&output)
        .lines()
        .filter_map(|l| l.split_whitespace().next().map(str::to_string))
        .collect();
    assert_eq!(codes, vec!["KP001", "KP002", "KP003", "KP004"]);
}

#[test]
fn test_customer_orders_lists_committed_orders() {
    let data = tempfile::tempdir().unwrap();
    let dir = data.path();
    assert!(run(dir, &["customer", "add", "Ayşe Yılmaz"]).status.success());
    assert!(run(dir, &["order", "select-customer", "Ayşe Yılmaz"]).status.success());
    assert!(run(dir, &["order", "add", "KP002", "3"]).status.success());
    assert!(run(dir, &["order", "commit"]).status.success());

    let output = run(dir, &["customer", "orders", "AYŞE YILMAZ"]);
    assert!(output.status.success());
    let listing = stdout(&output);
    assert_eq!(listing.lines().count(), 1);
    assert!(listing.starts_with("WO-"));
    assert!(listing.contains("in_production"));
}

#[test]
fn test_product_update_and_image() {
    let data = tempfile::tempdir().unwrap();
    let dir = data.path();

    let png = dir.join("kp001.png");
    std::fs::write(&png, b"\x89PNG\r\n\x1a\n\x00\x00\x00\x0dIHDR").unwrap();
    let text = dir.join("notes.txt");
    std::fs::write(&text, "not an image").unwrap();

    let png_arg = png.to_string_lossy().into_owned();
    let update = run(
        dir,
        &["product", "update", "KP001", "--stone", "0.40", "--image", &png_arg],
    );
    assert!(update.status.success());

    let export = stdout(&run(dir, &["product", "export"]));
    let catalog: serde_json::Value = serde_json::from_str(&export).unwrap();
    let kp001 = catalog["products"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["code"] == "KP001")
        .unwrap()
        .clone();
    assert_eq!(kp001["stoneWeight"], 0.4);
    assert!(kp001["imageData"]
        .as_str()
        .unwrap()
        .starts_with("data:image/png;base64,"));

    let text_arg = text.to_string_lossy().into_owned();
    let rejected = run(
        dir,
        &["product", "update", "KP002", "--description", "Yeni", "--image", &text_arg],
    );
    assert!(!rejected.status.success());
    let export = stdout(&run(dir, &["product", "export"]));
    assert!(!export.contains("\"Yeni\""));

    let added = run(
        dir,
        &[
            "product", "add", "YZ100", "--metal", "3.5", "--material", "Gold", "--type",
            "Ring", "--description", "Taşlı yüzük", "--image", &png_arg,
        ],
    );
    assert!(added.status.success());
    let listing = stdout(&run(dir, &["product", "suggest", "yz1"]));
    assert!(listing.starts_with("YZ100"));
}
