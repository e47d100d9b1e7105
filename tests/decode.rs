use serde::Deserialize;
use xon::{Datetime, Duration, ErrorKind, Node, StringKind, Value};

#[derive(Debug, Deserialize, PartialEq)]
struct Server {
    host: String,
    port: u16,
    #[serde(rename = "tls mode")]
    tls_mode: Option<String>,
}

#[derive(Debug, Deserialize, PartialEq)]
struct Root {
    server: Server,
}

const VERSIONED: &str = "server {
  host = a
  port = 8080
  [v5] {
    tls mode = strict
  }
}
";

#[test]
fn test_unquoted_strings_parse_verbatim() {
    for s in ["plain", "hello world", "a=b", "x,y", "/usr/bin", "http://host/path", "semi; colon", "ü-zürich"] {
        let doc = xon::parse(format!("key = {}\n", s).as_bytes()).unwrap();
        match &doc.nodes[..] {
            [Node::Pair(pair)] => {
                assert_eq!(pair.key.value, "key");
                let value = pair.value.as_str().unwrap();
                assert_eq!(value.value, s, "input {:?}", s);
                assert_eq!(value.kind, StringKind::Unquoted);
            }
            other => panic!("unexpected nodes for {:?}: {:?}", s, other),
        }
    }
}

#[test]
fn test_duplicate_port_rejected() {
    let err = xon::parse(b"port = 8080\nport = 9090\n").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateKey);
}

#[test]
fn test_octal_trap() {
    #[derive(Debug, Deserialize)]
    struct Int {
        #[allow(dead_code)]
        n: i32,
    }
    #[derive(Debug, Deserialize)]
    struct Text {
        n: String,
    }

    let err = xon::decode::<Int>(b"n = 0123\n").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::TypeCoercion);

    let text: Text = xon::decode(b"n = 0123\n").unwrap();
    assert_eq!(text.n, "0123");
}

#[test]
fn test_multiline_indentation() {
    #[derive(Debug, Deserialize)]
    struct X {
        x: String,
    }

    let input = "x = `\n    first line sets indentation baseline\n      subsequent lines must meet or exceed it\n`\n";
    let x: X = xon::decode(input.as_bytes()).unwrap();
    assert_eq!(
        x.x,
        "first line sets indentation baseline\n  subsequent lines must meet or exceed it"
    );
}

#[test]
fn test_list_comma_ambiguity() {
    let err = xon::parse(b"list = [one two, three]\n").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Structural);

    let doc = xon::parse(b"list = [\"one two\", three]\n").unwrap();
    let items = doc.pair("list").unwrap().value.as_list().unwrap();
    assert_eq!(items.len(), 2);
}

#[test]
fn test_version_below_block_is_dropped() {
    let root: Root = xon::decode_version(VERSIONED.as_bytes(), 4).unwrap();
    assert_eq!(root.server, Server { host: "a".into(), port: 8080, tls_mode: None });
}

#[test]
fn test_version_at_block_is_merged() {
    let root: Root = xon::decode_version(VERSIONED.as_bytes(), 5).unwrap();
    assert_eq!(root.server.tls_mode.as_deref(), Some("strict"));
    assert_eq!(root.server.host, "a");
}

#[test]
fn test_version_decode_is_strict() {
    #[derive(Debug, Deserialize)]
    struct HostOnly {
        #[allow(dead_code)]
        host: String,
    }
    #[derive(Debug, Deserialize)]
    struct Partial {
        #[allow(dead_code)]
        server: HostOnly,
    }

    let err = xon::decode_version::<Partial>(VERSIONED.as_bytes(), 4).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownKey);

    // plain decode ignores both the extra key and the version block
    let loose: Partial = xon::decode(VERSIONED.as_bytes()).unwrap();
    assert_eq!(loose.server.host, "a");
}

#[test]
fn test_mixed_versions_conflict() {
    let input = "server {
  host = a
  port = 8080
  [v5] {
    tls mode = strict
  }
}
client {
  [v6] {
    retries = 2
  }
}
";
    for version in [0, 5, 6, 100] {
        let err = xon::decode_version::<Root>(input.as_bytes(), version).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::VersionConflict, "version {}", version);
    }
}

#[test]
fn test_merge_leaves_parsed_document_intact() {
    let doc = xon::parse(VERSIONED.as_bytes()).unwrap();
    let before = doc.clone();

    let v4 = xon::merge(&doc, xon::VersionSelector::UpTo(4)).unwrap();
    let v5 = xon::merge(&doc, xon::VersionSelector::UpTo(5)).unwrap();
    assert_eq!(doc, before);

    let a: Root = xon::from_document(&v4, xon::DecodeOptions::strict()).unwrap();
    let b: Root = xon::from_document(&v5, xon::DecodeOptions::strict()).unwrap();
    assert!(a.server.tls_mode.is_none());
    assert!(b.server.tls_mode.is_some());
}

#[test]
fn test_byte_escape_round_trip() {
    let bytes = xon::unescape("<|0x0D|><|0x0A|>").unwrap();
    assert_eq!(bytes, b"\r\n".as_slice());
    assert_eq!(xon::escape(&bytes), "<|0x0D|><|0x0A|>");

    let doc = xon::parse(format!("k = \"{}\"\n", xon::escape(b"a\r\n\xFFb")).as_bytes()).unwrap();
    match &doc.pair("k").unwrap().value {
        Value::Str(s) => assert_eq!(s.as_bytes(), b"a\r\n\xFFb"),
        other => panic!("expected string, got {:?}", other),
    }
}

#[test]
fn test_nil_precedence() {
    #[derive(Debug, Deserialize)]
    struct Opt {
        field: Option<String>,
    }

    let absent: Opt = xon::decode(b"field = nil\n").unwrap();
    assert_eq!(absent.field, None);

    let present: Opt = xon::decode(b"field = \"nil\"\n").unwrap();
    assert_eq!(present.field.as_deref(), Some("nil"));

    let missing: Opt = xon::decode(b"").unwrap();
    assert_eq!(missing.field, None);
}

#[test]
fn test_repeated_blocks_and_temporal_values() {
    #[derive(Debug, Deserialize)]
    struct Job {
        name: String,
        every: Duration,
        since: Datetime,
    }
    #[derive(Debug, Deserialize)]
    struct Schedule {
        job: Vec<Job>,
    }

    let input = "job {
  name = backup
  every = 1h30m
  since = 2024-01-02T03:04:05Z
}
job {
  name = report
  every = 1.5s
  since = 2024-06-01T00:00:00.25+02:00
}
";
    let schedule: Schedule = xon::decode(input.as_bytes()).unwrap();
    assert_eq!(schedule.job.len(), 2);
    assert_eq!(schedule.job[0].name, "backup");
    assert_eq!(schedule.job[0].every.to_std().unwrap().as_secs(), 5400);
    assert_eq!(schedule.job[1].every.to_std().unwrap().as_millis(), 1500);
    assert!(schedule.job[0].since < schedule.job[1].since);
}

#[test]
fn test_type_error_names_key_literal_and_target() {
    #[derive(Debug, Deserialize)]
    struct Flags {
        #[allow(dead_code)]
        verbose: bool,
    }

    let err = xon::decode::<Flags>(b"verbose = yes\n").unwrap_err();
    let message = err.to_string();
    assert!(message.contains("verbose"), "{}", message);
    assert!(message.contains("yes"), "{}", message);
    assert!(message.contains("bool"), "{}", message);
}
