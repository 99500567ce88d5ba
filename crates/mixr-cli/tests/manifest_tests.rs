//! Drives the CLI pipeline against manifest files on disk.

use clap::Parser;
use mixr_cli::args::CliArgs;
use mixr_cli::driver;
use mixr_cli::reporter::ErrorKind;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

const SHOP: &str = r#"{
    "types": [
        { "name": "Shop.IOrder", "kind": "interface", "methods": [{ "name": "Submit" }] },
        { "name": "Shop.ILogger", "kind": "interface", "methods": [{ "name": "Log", "parameters": ["string"] }] },
        { "name": "Shop.Traced", "kind": "annotation" },
        {
            "name": "Shop.Order",
            "implements": ["Shop.IOrder"],
            "methods": [{ "name": "Submit", "modifiers": ["virtual"] }]
        },
        {
            "name": "Shop.Invoice",
            "methods": [{ "name": "Submit", "modifiers": ["virtual"] }]
        },
        {
            "name": "Shop.LoggingMixin",
            "base": { "definition": "Mixr.Mixin`1", "arguments": ["object"] },
            "implements": ["Shop.ILogger"],
            "methods": [{ "name": "Log", "parameters": ["string"] }],
            "annotations": [{ "type": "Shop.Traced" }]
        },
        {
            "name": "Shop.AuditMixin",
            "base": { "definition": "Mixr.Mixin`2", "arguments": ["Shop.IOrder", "Shop.ILogger"] },
            "methods": [{ "name": "Submit", "override": { "direction": "target" } }]
        }
    ],
    "contexts": {
        "orders": {
            "target": "Shop.Order",
            "mixins": [{ "type": "Shop.LoggingMixin" }, { "type": "Shop.AuditMixin" }]
        },
        "invoices": {
            "target": "Shop.Invoice",
            "mixins": [{ "type": "Shop.LoggingMixin" }, { "type": "Shop.AuditMixin" }]
        }
    }
}"#;

fn manifest_file(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(json.as_bytes()).expect("write manifest");
    file
}

fn args(path: &Path, extra: &[&str]) -> CliArgs {
    let mut argv = vec!["mixr".to_string(), path.display().to_string()];
    argv.extend(extra.iter().map(|s| s.to_string()));
    CliArgs::try_parse_from(argv).expect("args")
}

#[test]
fn test_text_report_for_every_context() {
    let file = manifest_file(SHOP);
    let (text, reports) = driver::run(&args(file.path(), &[]), false).expect("run");

    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r.is_success()), "{text}");
    assert!(text.contains("context orders\n"), "{text}");
    assert!(text.contains("context invoices\n"), "{text}");
    assert!(text.contains("    0 Shop.AuditMixin\n    1 Shop.LoggingMixin\n"), "{text}");
    assert!(
        text.contains("      Shop.IOrder.Submit() -> Shop.Order.Submit() [declared]\n"),
        "{text}"
    );
    assert!(
        text.contains("      Shop.IOrder.Submit() -> Shop.Invoice.Submit() [structural]\n"),
        "{text}"
    );
    assert!(text.contains("    Shop.Traced on Shop.Order from Shop.LoggingMixin\n"), "{text}");
}

#[test]
fn test_context_filter_and_json_output() {
    let file = manifest_file(SHOP);
    let (json, reports) =
        driver::run(&args(file.path(), &["--context", "orders", "--format", "json"]), false)
            .expect("run");

    assert_eq!(reports.len(), 1);
    let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
    assert_eq!(value[0]["context"], "orders");
    assert_eq!(value[0]["model"]["target"], "Shop.Order");
    assert_eq!(value[0]["model"]["overrides"][0]["base"], "Shop.Order.Submit()");
}

#[test]
fn test_no_structural_flag_fails_only_the_structural_context() {
    let file = manifest_file(SHOP);
    let (_, reports) =
        driver::run(&args(file.path(), &["--no-structural"]), false).expect("run");

    let orders = &reports[0];
    let invoices = &reports[1];
    assert!(orders.is_success());
    assert!(!invoices.is_success());
    let error = invoices.error.as_ref().expect("error");
    assert_eq!(error.kind, ErrorKind::Configuration);
    for name in ["Shop.IOrder.Submit", "Shop.Invoice", "Shop.AuditMixin"] {
        assert!(error.message.contains(name), "missing {name}: {}", error.message);
    }
}

#[test]
fn test_cycle_is_reported_per_context() {
    let file = manifest_file(
        r#"{
            "types": [
                { "name": "Shop.Order" },
                { "name": "Shop.XMixin" },
                { "name": "Shop.YMixin" }
            ],
            "contexts": {
                "cyclic": {
                    "target": "Shop.Order",
                    "mixins": [
                        { "type": "Shop.XMixin", "dependsOn": ["Shop.YMixin"] },
                        { "type": "Shop.YMixin", "dependsOn": ["Shop.XMixin"] }
                    ]
                }
            }
        }"#,
    );
    let (text, reports) = driver::run(&args(file.path(), &[]), false).expect("run");

    assert!(!reports[0].is_success());
    assert!(text.contains("circular dependencies"), "{text}");
    assert!(text.contains("Shop.XMixin -> Shop.YMixin -> Shop.XMixin"), "{text}");
}

#[test]
fn test_manifest_errors_carry_the_path() {
    let file = manifest_file(r#"{ "types": [{ "name": "Shop.Order", "base": "Shop.Missing" }] }"#);
    let err = driver::run(&args(file.path(), &[]), false).unwrap_err();
    let message = format!("{err:#}");

    assert!(message.contains(&file.path().display().to_string()), "{message}");
    assert!(message.contains("unknown type 'Shop.Missing'"), "{message}");
}

#[test]
fn test_missing_manifest_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let missing = dir.path().join("absent.json");
    let err = driver::run(&args(&missing, &[]), false).unwrap_err();
    assert!(format!("{err:#}").contains("failed to read manifest"));
}

#[test]
fn test_unknown_context_is_an_error() {
    let file = manifest_file(SHOP);
    let err = driver::run(&args(file.path(), &["--context", "refunds"]), false).unwrap_err();
    assert!(format!("{err:#}").contains("context 'refunds' is not defined"));
}
