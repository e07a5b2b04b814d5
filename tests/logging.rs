// tests/logging.rs

use devloop::logging::{filter_directives, parse_level_str};
use tracing::Level;

#[test]
fn level_names_parse_case_insensitively() {
    assert_eq!(parse_level_str(" Debug "), Some(Level::DEBUG));
    assert_eq!(parse_level_str("warning"), Some(Level::WARN));
    assert_eq!(parse_level_str("loud"), None);
}

#[test]
fn dependencies_are_capped_below_trace() {
    let info = filter_directives(Level::INFO, false);
    assert!(info.starts_with("info,"));
    assert!(info.contains("hyper=warn"));
    assert!(!info.contains("app="));

    let trace = filter_directives(Level::TRACE, false);
    assert_eq!(trace, "trace");
}

#[test]
fn quiet_app_turns_off_app_output() {
    let d = filter_directives(Level::DEBUG, true);
    assert!(d.ends_with("app=off"), "{d}");
}
