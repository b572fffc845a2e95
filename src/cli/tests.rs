//! Tests for the CLI module

use super::*;
use clap::Parser;
use std::collections::HashSet;
use std::io::Write;

#[test]
fn test_parse_fetch_command() {
    let cli = Cli::try_parse_from([
        "solidafy-pager",
        "-c",
        "posts.yaml",
        "fetch",
        "--key",
        "design",
        "--max-pages",
        "3",
    ])
    .unwrap();

    assert_eq!(cli.format, OutputFormat::Json);
    assert!(!cli.verbose);
    match cli.command {
        Commands::Fetch {
            key, max_pages, ..
        } => {
            assert_eq!(key.as_deref(), Some("design"));
            assert_eq!(max_pages, Some(3));
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn test_parse_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from(["solidafy-pager", "inspect", "-c", "posts.yaml", "-f", "pretty", "-v"])
        .unwrap();
    assert_eq!(cli.format, OutputFormat::Pretty);
    assert!(cli.verbose);
    assert!(matches!(cli.command, Commands::Inspect));
}

#[test]
fn test_key_and_key_json_conflict() {
    let result = Cli::try_parse_from([
        "solidafy-pager",
        "fetch",
        "--key",
        "a",
        "--key-json",
        "{}",
    ]);
    assert!(result.is_err());
}

#[test]
fn test_cli_key_identity() {
    let a = CliKey::parse_json(r#"{"user_id": "u-1"}"#).unwrap();
    let b = CliKey::parse_json(r#"{ "user_id":"u-1" }"#).unwrap();
    let plain = CliKey::plain("u-1");

    assert_eq!(a, b);
    assert_ne!(a, plain);

    let set: HashSet<CliKey> = [a, b, plain].into_iter().collect();
    assert_eq!(set.len(), 2);

    assert_eq!(
        serde_json::to_value(CliKey::plain("design")).unwrap(),
        serde_json::json!("design")
    );
    assert!(CliKey::parse_json("{not json").is_err());
}

#[tokio::test]
async fn test_runner_validate() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(
        b"name: posts\nbase_url: https://api.example.com\nrequest:\n  path: /posts\n",
    )
    .unwrap();

    let path = file.path().to_string_lossy().to_string();
    let cli = Cli::try_parse_from(["solidafy-pager", "-c", path.as_str(), "validate"]).unwrap();
    Runner::new(cli).run().await.unwrap();
}

#[tokio::test]
async fn test_runner_requires_collection() {
    let cli = Cli::try_parse_from(["solidafy-pager", "validate"]).unwrap();
    let err = Runner::new(cli).run().await.unwrap_err();
    assert!(err.to_string().contains("-c"));
}

#[tokio::test]
async fn test_runner_fetch_requires_key() {
    let cli = Cli::try_parse_from(["solidafy-pager", "-c", "posts.yaml", "fetch"]).unwrap();
    let err = Runner::new(cli).run().await.unwrap_err();
    assert!(err.to_string().contains("key"));
}

#[test]
fn test_write_items_json_lines() {
    let items = vec![serde_json::json!({"id": 1}), serde_json::json!({"id": "1"})];
    let mut out = Vec::new();
    super::runner::write_items(&mut out, &items, OutputFormat::Json).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "{\"id\":1}\n{\"id\":\"1\"}\n");
}

struct ClosedPipe;

impl Write for ClosedPipe {
    fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
        Err(std::io::ErrorKind::BrokenPipe.into())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_write_items_reports_closed_pipe() {
    let items = vec![serde_json::json!({"id": 1})];
    let err = super::runner::write_items(&mut ClosedPipe, &items, OutputFormat::Json).unwrap_err();
    assert!(matches!(err, crate::error::Error::Io(_)), "got {err:?}");
}
