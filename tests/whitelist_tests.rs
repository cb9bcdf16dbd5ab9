// Whitelist filter tests

mod common;

use common::{measurement, server};
use dbsize_monitor::whitelist::filter_measurements;

fn names(ms: &[dbsize_monitor::models::Measurement]) -> Vec<&str> {
    ms.iter().map(|m| m.database_name.as_str()).collect()
}

#[test]
fn whitelist_keeps_only_listed_databases() {
    let profile = server("Server1", None, Some(&["Fichas", "BI"]));
    let out = filter_measurements(
        &profile,
        vec![
            measurement("Fichas", "10", "1"),
            measurement("RandomDB", "10", "1"),
            measurement("BI", "10", "1"),
        ],
    );
    assert_eq!(names(&out), vec!["Fichas", "BI"]);
}

#[test]
fn whitelist_match_is_case_insensitive() {
    let profile = server("Server1", None, Some(&["Fichas", "db.e-BussinessSuite"]));
    let out = filter_measurements(
        &profile,
        vec![
            measurement("FICHAS", "10", "1"),
            measurement("DB.E-BUSSINESSSUITE", "10", "1"),
        ],
    );
    assert_eq!(out.len(), 2);
    // Original casing is kept for labels.
    assert_eq!(out[0].database_name, "FICHAS");
}

#[test]
fn no_whitelist_passes_everything_through() {
    let profile = server("Server4", None, None);
    let input = vec![
        measurement("master", "5", "1"),
        measurement("RandomDB", "10", "1"),
    ];
    let out = filter_measurements(&profile, input.clone());
    assert_eq!(out, input);
}

#[test]
fn empty_whitelist_tracks_nothing() {
    let profile = server("Server1", None, Some(&[]));
    let out = filter_measurements(&profile, vec![measurement("Fichas", "10", "1")]);
    assert!(out.is_empty());
}
