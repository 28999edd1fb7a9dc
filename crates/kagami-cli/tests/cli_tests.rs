//! CLI argument parsing tests

use clap::Parser;
use kagami_cli::commands::{Cli, Commands, OutputFormat};

#[test]
fn test_parse_replicate_with_query() {
    let cli = Cli::try_parse_from([
        "kagami",
        "replicate",
        "--source",
        "https://www.wikidata.org",
        "--source-sparql",
        "https://query.wikidata.org/sparql",
        "--target",
        "https://wikibase.example",
        "--schema",
        "https://www.wikidata.org/wiki/Special:EntitySchemaText/E37",
        "--query",
        "SELECT ?item WHERE { ?item wdt:P31 wd:Q5 } LIMIT 5",
        "--language",
        "nl",
        "--language",
        "fr",
    ])
    .unwrap();

    let Commands::Replicate {
        source,
        target,
        query,
        root,
        language,
        format,
        ..
    } = cli.command
    else {
        panic!("expected replicate command");
    };
    assert_eq!(source, "https://www.wikidata.org");
    assert_eq!(target, "https://wikibase.example");
    assert!(query.is_some());
    assert!(root.is_empty());
    assert_eq!(language, vec!["nl", "fr"]);
    assert_eq!(format, OutputFormat::Text);
}

#[test]
fn test_parse_replicate_with_roots() {
    let cli = Cli::try_parse_from([
        "kagami",
        "replicate",
        "--source",
        "https://www.wikidata.org",
        "--target",
        "https://wikibase.example",
        "--schema",
        "schema.json",
        "--root",
        "Q42",
        "--root",
        "Q5",
        "--format",
        "json",
    ])
    .unwrap();

    let Commands::Replicate {
        root,
        language,
        format,
        max_depth,
        ..
    } = cli.command
    else {
        panic!("expected replicate command");
    };
    assert_eq!(root, vec!["Q42", "Q5"]);
    assert_eq!(language, vec!["en"]);
    assert_eq!(format, OutputFormat::Json);
    assert_eq!(max_depth, None);
}

#[test]
fn test_replicate_requires_source_and_target() {
    let result = Cli::try_parse_from(["kagami", "replicate", "--source", "https://a.example"]);
    assert!(result.is_err());
}

#[test]
fn test_parse_copy_properties() {
    let cli = Cli::try_parse_from([
        "kagami",
        "copy-properties",
        "--source",
        "https://www.wikidata.org",
        "--target",
        "https://wikibase.example",
        "--schema",
        "schema.json",
        "--username",
        "bot",
        "--password",
        "secret",
    ])
    .unwrap();

    let Commands::CopyProperties {
        username, password, ..
    } = cli.command
    else {
        panic!("expected copy-properties command");
    };
    assert_eq!(username.as_deref(), Some("bot"));
    assert_eq!(password.as_deref(), Some("secret"));
}

#[test]
fn test_parse_list_properties() {
    let cli = Cli::try_parse_from([
        "kagami",
        "list-properties",
        "--target",
        "https://wikibase.example",
    ])
    .unwrap();
    assert!(matches!(cli.command, Commands::ListProperties { .. }));
}

#[test]
fn test_parse_info() {
    let cli = Cli::try_parse_from(["kagami", "info"]).unwrap();
    assert!(matches!(cli.command, Commands::Info));
}
