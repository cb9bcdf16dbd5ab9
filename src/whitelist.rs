// Per-server allow-list. Names compare case-insensitively; no list means no filtering.

use crate::config::ServerProfile;
use crate::models::Measurement;
use std::collections::HashSet;

pub fn filter_measurements(
    server: &ServerProfile,
    measurements: Vec<Measurement>,
) -> Vec<Measurement> {
    let Some(whitelist) = server.whitelist.as_ref() else {
        return measurements;
    };
    let allowed: HashSet<String> = whitelist.iter().map(|name| name.to_lowercase()).collect();
    measurements
        .into_iter()
        .filter(|m| allowed.contains(&m.database_name.to_lowercase()))
        .collect()
}
