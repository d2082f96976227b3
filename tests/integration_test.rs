// Integration tests for bookmark-organizer
// Run with: cargo test --test integration_test

use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

const CATALOG: &str = r##"{
    "categories": [
        {"id": "hardware", "name": "Hardware", "description": "Vendor portals", "color": "#111111",
         "bookmarks": [
            {"name": "Lenovo Support", "url": "https://support.lenovo.com/", "description": "Lenovo help", "tags": ["hardware", "oem"]},
            {"name": "Dell Support", "url": "https://dell.example", "tags": ["hardware"]}
         ]},
        {"id": "software", "name": "Software", "color": "#222222", "bookmarks": []}
    ]
}"##;

struct Fixture {
    _dir: TempDir,
    catalog: std::path::PathBuf,
    data_dir: std::path::PathBuf,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().expect("temp dir");
    let catalog = dir.path().join("bookmarks.json");
    std::fs::write(&catalog, CATALOG).expect("write catalog");
    let data_dir = dir.path().join("data");
    Fixture {
        catalog,
        data_dir,
        _dir: dir,
    }
}

fn run_cli(fixture: &Fixture, args: &[&str]) -> (bool, String, String) {
    let output = Command::new("cargo")
        .args(["run", "--quiet", "--"])
        .args([
            "--catalog",
            fixture.catalog.to_str().unwrap(),
            "--data-dir",
            fixture.data_dir.to_str().unwrap(),
        ])
        .args(args)
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (output.status.success(), stdout, stderr)
}

#[test]
fn test_show_lists_catalog_categories() {
    let fx = fixture();
    let (success, stdout, _stderr) = run_cli(&fx, &["show"]);

    assert!(success, "show should succeed");
    assert!(stdout.contains("Hardware"), "should list the Hardware category");
    assert!(stdout.contains("Lenovo Support"), "should list catalog bookmarks");
}

#[test]
fn test_search_is_case_insensitive() {
    let fx = fixture();
    let (_, upper, _) = run_cli(&fx, &["search", "LENOVO"]);
    let (_, lower, _) = run_cli(&fx, &["search", "lenovo"]);

    assert!(upper.contains("Lenovo Support"));
    assert!(lower.contains("Lenovo Support"));
    // the Software category has no matching bookmarks and disappears
    assert!(!upper.contains("Software"));
}

#[test]
fn test_add_then_show_and_duplicate_rejection() {
    let fx = fixture();

    let (success, _, _) = run_cli(
        &fx,
        &["add", "--name", "HP Support", "--url", "https://hp.example",
          "--category", "hardware", "--tags", "hardware,oem"],
    );
    assert!(success, "add should succeed");

    let (_, stdout, _) = run_cli(&fx, &["show"]);
    assert!(stdout.contains("HP Support"), "added bookmark should appear in the merged view");

    let (success, _, stderr) = run_cli(
        &fx,
        &["add", "--name", "HP Again", "--url", "https://hp.example", "--category", "software"],
    );
    assert!(!success, "duplicate url must be rejected");
    assert!(stderr.contains("already exists"), "should explain the duplicate");
}

#[test]
fn test_validate_reports_catalog() {
    let fx = fixture();
    let (success, stdout, _) = run_cli(&fx, &["validate"]);

    assert!(success);
    assert!(stdout.contains("Integrity Report"), "should show the report header");
    assert!(stdout.contains("No integrity issues"), "fresh catalog should be clean");
}

#[test]
fn test_export_import_round_trip_is_a_no_op() {
    let fx = fixture();

    run_cli(
        &fx,
        &["add", "--name", "Paste", "--url", "https://paste.example", "--category", "software"],
    );

    let export_path = fx.data_dir.join("export.json");
    let (success, _, _) = run_cli(&fx, &["export", "--output", export_path.to_str().unwrap()]);
    assert!(success, "export should succeed");
    assert!(Path::new(&export_path).exists());

    let (success, stdout, stderr) = run_cli(
        &fx,
        &["import", export_path.to_str().unwrap(), "--conflicts", "skip"],
    );
    assert!(success, "import should succeed");
    let combined = format!("{stdout}{stderr}");
    assert!(
        combined.contains("0 bookmarks, 0 categories"),
        "re-importing the own export must be a pure no-op, got: {combined}"
    );
}

#[test]
fn test_import_rejects_invalid_documents() {
    let fx = fixture();

    let bogus = fx.data_dir.join("bogus.json");
    std::fs::create_dir_all(&fx.data_dir).unwrap();
    std::fs::write(&bogus, r#"{"random": true}"#).unwrap();

    let (success, _, stderr) = run_cli(&fx, &["import", bogus.to_str().unwrap()]);
    assert!(!success, "invalid document must be rejected");
    assert!(stderr.contains("Import rejected"));

    let wrong_ext = fx.data_dir.join("export.txt");
    std::fs::write(&wrong_ext, "{}").unwrap();
    let (success, _, stderr) = run_cli(&fx, &["import", wrong_ext.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains(".json"));
}

#[test]
fn test_visit_tracking_and_recent() {
    let fx = fixture();

    let (success, _, _) = run_cli(&fx, &["visit", "https://support.lenovo.com/"]);
    assert!(success);
    let (success, _, stderr) = run_cli(&fx, &["visit", "https://missing.example"]);
    assert!(!success, "unknown url must fail");
    assert!(stderr.contains("No bookmark"));

    let (_, stdout, _) = run_cli(&fx, &["recent"]);
    assert!(stdout.contains("Lenovo Support"));
    assert!(stdout.contains("(1x)"));
}

#[test]
fn test_help_commands() {
    let fx = fixture();

    let (_, stdout, stderr) = run_cli(&fx, &["--help"]);
    let combined = format!("{}{}", stdout, stderr);
    assert!(combined.contains("import") && combined.contains("export"),
        "Help should list available commands");

    let (_, stdout, stderr) = run_cli(&fx, &["import", "--help"]);
    let combined = format!("{}{}", stdout, stderr);
    assert!(combined.contains("conflicts") || combined.contains("Conflict"),
        "import help should show the conflict policy option");
}
