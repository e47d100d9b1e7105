// Author: Dustin Pilgrim
// License: MIT

use std::collections::HashMap;
use std::io::Write;

use serde::Deserialize;

use super::*;
use crate::error::ErrorKind;

const APP: &str = r#"
// sample app config
name = TestApp
debug = true

server {
  host = localhost
  port = 8080
  tags = [edge, "eu west"]
}

user {
  name = alice
}
user {
  name = bob
}

[v2] {
  retries = 3
}
"#;

#[test]
fn test_config_from_string() {
    let config = XonConfig::from_str(APP).expect("Failed to parse config");

    let name: String = config.get("name").expect("Failed to get name");
    assert_eq!(name, "TestApp");

    let host: String = config.get("server.host").expect("Failed to get host");
    assert_eq!(host, "localhost");

    let port: u16 = config.get("server.port").expect("Failed to get port");
    assert_eq!(port, 8080);

    let debug: bool = config.get("debug").expect("Failed to get debug");
    assert!(debug);

    let tags: Vec<String> = config.get("server.tags").expect("Failed to get tags");
    assert_eq!(tags, vec!["edge", "eu west"]);

    assert!(config.has("server.port"));
    assert!(!config.has("server.nonexistent"));
    assert_eq!(config.comments().len(), 1);
    assert_eq!(config.comments()[0].text, " sample app config");
}

#[test]
fn test_order_preservation() {
    let config = XonConfig::from_str(APP).unwrap();
    assert_eq!(config.keys("").unwrap(), vec!["name", "debug", "server", "user"]);
    assert_eq!(config.keys("server").unwrap(), vec!["host", "port", "tags"]);
}

#[test]
fn test_keys_requires_single_block() {
    let config = XonConfig::from_str(APP).unwrap();
    let err = config.keys("user").unwrap_err();
    assert_eq!(err.code(), Some(306));
    let err = config.keys("server.host").unwrap_err();
    assert_eq!(err.code(), Some(306));
}

#[test]
fn test_repeated_blocks_as_list() {
    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        name: String,
    }

    let config = XonConfig::from_str(APP).unwrap();
    let users: Vec<User> = config.get("user").unwrap();
    assert_eq!(users, vec![User { name: "alice".into() }, User { name: "bob".into() }]);

    let names: Vec<HashMap<String, String>> = config.get("user").unwrap();
    assert_eq!(names[1]["name"], "bob");
}

#[test]
fn test_path_through_repeated_block_is_rejected() {
    let config = XonConfig::from_str(APP).unwrap();
    let err = config.get::<String>("user.name").unwrap_err();
    assert_eq!(err.code(), Some(305));
}

#[test]
fn test_path_through_value_is_rejected() {
    let config = XonConfig::from_str(APP).unwrap();
    let err = config.get::<String>("server.host.name").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Custom);
    assert_eq!(err.code(), Some(305));
}

#[test]
fn test_missing_path() {
    let config = XonConfig::from_str(APP).unwrap();
    let err = config.get::<String>("server.user").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingField);
    assert_eq!(err.code(), Some(304));
    assert_eq!(err.position(), Some(config.document().blocks("server").next().unwrap().position()));
}

#[test]
fn test_get_type_error_carries_path() {
    let config = XonConfig::from_str(APP).unwrap();
    let err = config.get::<u16>("server.host").unwrap_err();
    match err {
        XonError::TypeCoercion { key, position, .. } => {
            assert_eq!(key.as_deref(), Some("server.host"));
            assert_eq!(position.map(|p| (p.line, p.column)), Some((7, 10)));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_get_optional() {
    let config = XonConfig::from_str("a = nil\nb = \"nil\"\nc = 5\n").unwrap();

    assert_eq!(config.get_optional::<u8>("a").unwrap(), None);
    assert_eq!(config.get_optional::<String>("b").unwrap(), Some("nil".to_string()));
    assert_eq!(config.get_optional::<u8>("c").unwrap(), Some(5));
    assert_eq!(config.get_optional::<u8>("missing").unwrap(), None);
    assert!(config.get_optional::<u8>("b").is_err());
}

#[test]
fn test_get_or() {
    let config = XonConfig::from_str(APP).unwrap();
    assert_eq!(config.get_or("server.port", 0u16), 8080);
    assert_eq!(config.get_or("server.timeout", 30u32), 30);
    assert_eq!(config.get_or("server.host", 1u8), 1);
}

#[test]
fn test_versioned_blocks_hidden_from_paths() {
    let config = XonConfig::from_str(APP).unwrap();
    assert!(!config.has("retries"));
    assert!(!config.has("v2"));
    assert_eq!(config.versions(), vec![2]);
}

#[test]
fn test_decode_and_decode_version() {
    #[derive(Debug, Deserialize)]
    struct Server {
        host: String,
        port: u16,
        tags: Vec<String>,
    }

    #[derive(Debug, Deserialize)]
    struct Loose {
        name: String,
        server: Server,
    }

    #[derive(Debug, Deserialize)]
    #[allow(dead_code)]
    struct Full {
        name: String,
        debug: bool,
        server: Server,
        user: Vec<HashMap<String, String>>,
        #[serde(default)]
        retries: u32,
    }

    let config = XonConfig::from_str(APP).unwrap();

    let loose: Loose = config.decode().unwrap();
    assert_eq!(loose.name, "TestApp");
    assert_eq!(loose.server.port, 8080);

    let v1: Full = config.decode_version(1).unwrap();
    assert_eq!(v1.retries, 0);
    let v2: Full = config.decode_version(2).unwrap();
    assert_eq!(v2.retries, 3);
    assert_eq!(v2.server.host, "localhost");
    assert_eq!(v2.server.tags.len(), 2);

    let err = config.decode_version::<Loose>(2).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownKey);
}

#[test]
fn test_parse_errors_surface() {
    let err = XonConfig::from_str("port = 1\nport = 2\n").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateKey);
    assert_eq!(err.position().map(|p| p.line), Some(2));
}

#[test]
fn test_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"server {\r\n  port = 9000\r\n}\r\n").unwrap();

    let config = XonConfig::from_file(file.path()).unwrap();
    assert_eq!(config.get::<u16>("server.port").unwrap(), 9000);
    assert_eq!(config.path(), Some(file.path()));
    assert!(!config.raw().contains('\r'));
}

#[test]
fn test_from_file_missing() {
    let dir = tempfile::tempdir().unwrap();
    let err = XonConfig::from_file(dir.path().join("absent.xon")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::File);
    assert_eq!(err.code(), Some(301));
}

#[test]
fn test_from_file_with_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let primary = dir.path().join("primary.xon");
    let fallback = dir.path().join("fallback.xon");
    std::fs::write(&fallback, "mode = fallback\n").unwrap();

    let config = XonConfig::from_file_with_fallback(&primary, &fallback).unwrap();
    assert_eq!(config.get::<String>("mode").unwrap(), "fallback");
    assert_eq!(config.path(), Some(fallback.as_path()));

    std::fs::write(&primary, "mode = primary\n").unwrap();
    let config = XonConfig::from_file_with_fallback(&primary, &fallback).unwrap();
    assert_eq!(config.get::<String>("mode").unwrap(), "primary");
}

#[test]
fn test_fallback_does_not_hide_parse_errors() {
    let dir = tempfile::tempdir().unwrap();
    let primary = dir.path().join("primary.xon");
    let fallback = dir.path().join("fallback.xon");
    std::fs::write(&primary, "mode = [a\n").unwrap();
    std::fs::write(&fallback, "mode = fallback\n").unwrap();

    let err = XonConfig::from_file_with_fallback(&primary, &fallback).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Structural);
}

#[test]
fn test_both_files_missing() {
    let dir = tempfile::tempdir().unwrap();
    let primary = dir.path().join("a.xon");
    let fallback = dir.path().join("b.xon");

    let err = XonConfig::from_file_with_fallback(&primary, &fallback).unwrap_err();
    assert_eq!(err.code(), Some(302));
}

#[test]
fn test_expand_home() {
    let plain = Path::new("/etc/app.xon");
    assert_eq!(expand_home(plain).unwrap(), plain);

    if let Some(home) = dirs::home_dir() {
        assert_eq!(expand_home(Path::new("~/app.xon")).unwrap(), home.join("app.xon"));
    }
}
