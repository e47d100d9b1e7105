use super::*;
use crate::ast::{Node, StringKind, Value};
use crate::error::ErrorKind;

fn parse(input: &str) -> Result<Document> {
    Parser::new(input)?.parse_document()
}

fn parse_ok(input: &str) -> Document {
    parse(input).expect("Failed to parse document")
}

fn parse_err(input: &str) -> XonError {
    parse(input).expect_err("Expected a parse error")
}

fn strings(value: &Value) -> Vec<String> {
    value
        .as_list()
        .expect("Expected a list")
        .iter()
        .map(|v| v.as_str().expect("Expected a string").display())
        .collect()
}

#[test]
fn test_parser_basic_document() {
    let input = r#"
// service settings
name = example
server {
  host = localhost
  port = 8080
}
"#;

    let doc = parse_ok(input);
    assert_eq!(doc.nodes.len(), 2);
    assert_eq!(doc.comments.len(), 1);
    assert_eq!(doc.comments[0].text, " service settings");

    let name = doc.pair("name").expect("name pair");
    assert_eq!(name.value.as_str().map(|s| s.display()), Some("example".into()));

    let server = doc.blocks("server").next().expect("server block");
    assert_eq!(server.version, None);
    assert_eq!(server.children.len(), 2);
    assert_eq!(server.children[1].key().display(), "port");
}

#[test]
fn test_empty_documents() {
    assert!(parse_ok("").is_empty());
    assert!(parse_ok("\n\n  // only a comment\n").is_empty());
}

#[test]
fn test_empty_block() {
    let doc = parse_ok("cache {}\n");
    let block = doc.blocks("cache").next().expect("cache block");
    assert!(block.children.is_empty());
}

#[test]
fn test_nested_blocks() {
    let doc = parse_ok("a {\n  b {\n    c = d\n  }\n}\n");
    match &doc.nodes[0] {
        Node::Block(a) => match &a.children[0] {
            Node::Block(b) => assert_eq!(b.children[0].key().display(), "c"),
            other => panic!("Expected block, got {:?}", other),
        },
        other => panic!("Expected block, got {:?}", other),
    }
}

#[test]
fn test_duplicate_key_reported_at_second_occurrence() {
    let err = parse_err("port = 80\nport = 81\n");
    assert_eq!(err.kind(), ErrorKind::DuplicateKey);
    assert_eq!(err.position().map(|p| p.line), Some(2));
    match err {
        XonError::DuplicateKey { key, first, .. } => {
            assert_eq!(key, "port");
            assert_eq!(first.line, 1);
        }
        other => panic!("Expected duplicate key, got {:?}", other),
    }
}

#[test]
fn test_same_key_in_different_blocks_is_fine() {
    parse_ok("a {\n  port = 1\n}\nb {\n  port = 2\n}\nport = 3\n");
}

#[test]
fn test_repeated_blocks_are_allowed() {
    let doc = parse_ok("user {\n  name = a\n}\nuser {\n  name = b\n}\n");
    assert_eq!(doc.blocks("user").count(), 2);
}

#[test]
fn test_pair_and_block_sharing_a_key() {
    assert_eq!(parse_err("a = 1\na {\n}\n").kind(), ErrorKind::DuplicateKey);
    assert_eq!(parse_err("a {\n}\na = 1\n").kind(), ErrorKind::DuplicateKey);
}

#[test]
fn test_quoted_and_unquoted_keys_collide() {
    assert_eq!(parse_err("a = 1\n\"a\" = 2\n").kind(), ErrorKind::DuplicateKey);
}

#[test]
fn test_unnamed_block() {
    let err = parse_err("{\n}\n");
    assert_eq!(err.kind(), ErrorKind::Structural);
    assert_eq!(err.code(), Some(201));
}

#[test]
fn test_unbalanced_braces() {
    assert_eq!(parse_err("}\n").code(), Some(202));
    let err = parse_err("a {\n  b = c\n");
    assert_eq!(err.code(), Some(203));
    assert_eq!(err.position().map(|p| p.line), Some(1));
}

#[test]
fn test_missing_equals() {
    let err = parse_err("just a string\n");
    assert_eq!(err.code(), Some(208));

    match parse_err("a=b\n") {
        XonError::Structural { hint, .. } => assert!(hint.is_some()),
        other => panic!("Expected structural error, got {:?}", other),
    }
}

#[test]
fn test_missing_value() {
    assert_eq!(parse_err("a = \n").code(), Some(213));
}

#[test]
fn test_entries_end_their_line() {
    assert_eq!(parse_err("a {\n  b = c }\n").code(), Some(206));
    assert_eq!(parse_err("a {\n} b = c\n").code(), Some(206));
}

#[test]
fn test_lists() {
    let doc = parse_ok("hosts = [alpha, \"beta gamma\", delta]\n");
    let hosts = &doc.pair("hosts").expect("hosts").value;
    assert_eq!(strings(hosts), vec!["alpha", "beta gamma", "delta"]);
}

#[test]
fn test_list_separators() {
    let doc = parse_ok("a = [\n  one\n  two,\n  three four\n]\nb = []\nc = [x, y]\n");
    assert_eq!(strings(&doc.pair("a").unwrap().value), vec!["one", "two", "three four"]);
    assert!(doc.pair("b").unwrap().value.as_list().unwrap().is_empty());
    assert_eq!(strings(&doc.pair("c").unwrap().value), vec!["x", "y"]);
}

#[test]
fn test_nested_lists() {
    let doc = parse_ok("m = [[1, 2], [3]]\n");
    let outer = doc.pair("m").unwrap().value.as_list().unwrap();
    assert_eq!(outer.len(), 2);
    assert_eq!(strings(&outer[0]), vec!["1", "2"]);
    assert_eq!(strings(&outer[1]), vec!["3"]);
}

#[test]
fn test_list_comma_ambiguity() {
    let err = parse_err("a = [one two, three]\n");
    assert_eq!(err.kind(), ErrorKind::Structural);
    assert_eq!(err.code(), Some(218));

    assert_eq!(parse_err("a = [one, two three]\n").code(), Some(218));
    parse_ok("a = [\"one two\", three]\n");
    parse_ok("a = [one<|0x20|>two, three]\n");
    parse_ok("a = [one two,\n  three]\n");
}

#[test]
fn test_list_separator_errors() {
    assert_eq!(parse_err("a = [, b]\n").code(), Some(215));
    assert_eq!(parse_err("a = [\"x\" \"y\"]\n").code(), Some(217));
    assert_eq!(parse_err("a = [b\n").code(), Some(219));
    assert_eq!(parse_err("a = [b = c]\n").code(), Some(220));
}

#[test]
fn test_list_rejects_trailing_comma() {
    for bad in ["a = [x, y, ]\n", "a = [x, y,]\n", "a = [\n  \"x\",\n]\n", "a = [[1],]\n"] {
        let err = parse_err(bad);
        assert_eq!(err.kind(), ErrorKind::Structural, "{:?}", bad);
        assert_eq!(err.code(), Some(222), "{:?}", bad);
    }

    let err = parse_err("a = [x, y,]\n");
    assert_eq!(err.position().map(|p| p.column), Some(10));

    let err = parse_err("a = [x,y]\n");
    assert_eq!(err.kind(), ErrorKind::Structural);
    assert_eq!(err.code(), Some(111));
    parse_ok("a = [\"x,y\"]\n");
}

#[test]
fn test_versioned_blocks() {
    let doc = parse_ok("a = 1\n[v5] {\n  b = 2\n}\n");
    match &doc.nodes[1] {
        Node::Block(block) => {
            assert_eq!(block.version, Some(5));
            assert_eq!(block.children[0].key().display(), "b");
        }
        other => panic!("Expected block, got {:?}", other),
    }
}

#[test]
fn test_versioned_block_inside_named_block() {
    let doc = parse_ok("server {\n  [v2] {\n    port = 1\n  }\n}\n");
    match &doc.nodes[0] {
        Node::Block(server) => assert!(matches!(&server.children[0], Node::Block(b) if b.version == Some(2))),
        other => panic!("Expected block, got {:?}", other),
    }
}

#[test]
fn test_version_marker_errors() {
    assert_eq!(parse_err("[x5] {\n}\n").code(), Some(209));
    assert_eq!(parse_err("[v] {\n}\n").code(), Some(209));
    assert_eq!(parse_err("[v9223372036854775808] {\n}\n").code(), Some(210));
    parse_ok("[v9223372036854775807] {\n}\n");
    assert_eq!(parse_err("[v1] {\n  [v1] {\n  }\n}\n").code(), Some(207));
}

#[test]
fn test_version_marker_must_be_tight() {
    for bad in ["[ v1 ] {\n}\n", "[v1 ] {\n}\n", "[ v1] {\n}\n"] {
        let err = parse_err(bad);
        assert_eq!(err.kind(), ErrorKind::Structural, "{:?}", bad);
        assert_eq!(err.code(), Some(209), "{:?}", bad);
    }
    parse_ok("[v12] {\n}\n");
}

#[test]
fn test_keys_keep_their_kind() {
    let doc = parse_ok("\"quoted key\" = `\n  text\n`\n");
    let pair = doc.pair("quoted key").expect("pair");
    assert_eq!(pair.key.kind, StringKind::Quoted);
    assert_eq!(pair.value.as_str().map(|s| s.kind), Some(StringKind::Multiline));
}
