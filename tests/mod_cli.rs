use stac_static::SearchConfig;
use stac_static::cli::{Command, OutputMode, parse_output_mode, run, run_with_format};
use std::path::PathBuf;

fn catalog() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data-files/test-case-1/catalog.json")
}

fn search_cmd() -> Command {
    Command::Search {
        catalog: catalog(),
        ids: None,
        collections: None,
        bbox: None,
        intersects: None,
        datetime: None,
        filter: None,
        filter_lang: None,
        count: false,
    }
}

fn output(cmd: Command, mode: OutputMode) -> String {
    let mut out = Vec::new();
    run_with_format(&mut out, cmd, mode, &SearchConfig::default()).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn search_count_in_every_mode() {
    let cmd = || Command::Search {
        catalog: catalog(),
        ids: None,
        collections: Some("area-1-1,area-2-2".into()),
        bbox: None,
        intersects: None,
        datetime: None,
        filter: None,
        filter_lang: None,
        count: true,
    };
    assert_eq!(output(cmd(), OutputMode::Plain), "4\n");
    assert_eq!(output(cmd(), OutputMode::Human), "matched=4\n");
    assert_eq!(output(cmd(), OutputMode::Json), "{\"matched\":4}\n");
}

#[test]
fn search_lists_items() {
    let cmd = Command::Search {
        catalog: catalog(),
        ids: None,
        collections: None,
        bbox: Some("-4,3,-1,4".into()),
        intersects: None,
        datetime: Some("2020".into()),
        filter: Some("id LIKE '%imagery'".into()),
        filter_lang: None,
        count: false,
    };
    let plain = output(cmd, OutputMode::Plain);
    assert_eq!(plain.lines().collect::<Vec<_>>(), vec!["area-2-1-imagery", "area-2-2-imagery"]);
}

#[test]
fn search_json_lines_are_items() {
    let cmd = Command::Search {
        catalog: catalog(),
        ids: Some("area-1-2-labels".into()),
        collections: None,
        bbox: None,
        intersects: None,
        datetime: None,
        filter: Some(r#"{"op": "=", "args": [{"property": "label:type"}, "vector"]}"#.into()),
        filter_lang: None,
        count: false,
    };
    let json = output(cmd, OutputMode::Json);
    let lines: Vec<serde_json::Value> =
        json.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["type"], "Feature");
    assert_eq!(lines[0]["id"], "area-1-2-labels");
}

#[test]
fn search_human_summary() {
    let human = output(search_cmd(), OutputMode::Human);
    assert_eq!(human.lines().count(), 9);
    assert!(human.lines().any(|l| l.starts_with("area-1-1-imagery collection=area-1-1")));
    assert_eq!(human.lines().last(), Some("matched=8"));
}

#[test]
fn bad_parameters_fail_before_reading_the_catalog() {
    let cmd = Command::Search {
        catalog: PathBuf::from("/does/not/exist/catalog.json"),
        ids: None,
        collections: None,
        bbox: None,
        intersects: None,
        datetime: Some("2019/2020/2021".into()),
        filter: None,
        filter_lang: None,
        count: true,
    };
    let mut out = Vec::new();
    let err = run_with_format(&mut out, cmd, OutputMode::Plain, &SearchConfig::default()).unwrap_err();
    assert!(err.to_string().contains("too many datetime components"));
    assert!(out.is_empty());
}

#[test]
fn info_summarizes_catalog() {
    let json = output(Command::Info { catalog: catalog() }, OutputMode::Json);
    let v: serde_json::Value = serde_json::from_str(json.trim()).unwrap();
    assert_eq!(v["id"], "test");
    assert_eq!(v["items"], 8);
    assert_eq!(v["collections"].as_array().map(Vec::len), Some(4));
    let plain = output(Command::Info { catalog: catalog() }, OutputMode::Plain);
    assert_eq!(plain, "items=8 collections=4\n");
}

#[test]
fn languages() {
    assert_eq!(output(Command::Languages, OutputMode::Plain), "cql2-json\ncql2-text\n");
    assert_eq!(output(Command::Languages, OutputMode::Json), "[\"cql2-json\",\"cql2-text\"]\n");
    run(Command::Languages, &SearchConfig::default()).unwrap();
}

#[test]
fn output_mode_parsing() {
    assert_eq!(parse_output_mode(Some("json")), OutputMode::Json);
    assert_eq!(parse_output_mode(Some("PLAIN")), OutputMode::Plain);
    assert_eq!(parse_output_mode(None), OutputMode::Human);
}
