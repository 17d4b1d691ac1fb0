//! Statistics entries and the superseded-entry cleanup pass (spec.md §4.8;
//! grounded on `original_source/src/engine.cpp` `cleanupStatistics`).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// One recorded statistics snapshot. `time` is a Unix timestamp; `data` is
/// an open bag of fields, two of which (`suite`, `section`) identify which
/// per-suite-section series this entry belongs to when present. Entries
/// missing either field are "combined" (cross-suite) statistics and are
/// never pruned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticsEntry {
    pub time: i64,
    pub data: HashMap<String, Value>,
}

impl StatisticsEntry {
    pub fn new(time: i64, data: HashMap<String, Value>) -> Self {
        Self { time, data }
    }

    fn suite_section_id(&self) -> Option<String> {
        let suite = self.data.get("suite")?.as_str()?;
        let section = self.data.get("section")?.as_str()?;
        Some(format!("{suite}-{section}"))
    }

    /// A stable serialization used purely for equality comparison between
    /// entries (the original compares raw serialized bytes).
    fn fingerprint(&self) -> Value {
        serde_json::to_value(&self.data).unwrap_or(Value::Null)
    }
}

/// Given all statistics entries (any order), returns the `time` of every
/// entry that is superseded: for each `(suite, section)` series, ordered by
/// time, an entry whose data is byte-identical to the *previous* entry in
/// that series is redundant and can be removed, keeping only the latest of
/// each run of identical snapshots.
///
/// Entries without both `suite` and `section` fields are combined/global
/// statistics and are never considered for removal; encountering one also
/// resets the per-series tracking so data isn't lost across such a
/// boundary (mirrors the original's reset-on-combined-entry behavior).
pub fn find_superseded(entries: &[StatisticsEntry]) -> Vec<i64> {
    let mut sorted: Vec<&StatisticsEntry> = entries.iter().collect();
    sorted.sort_by_key(|e| e.time);

    let mut last_data: HashMap<String, Value> = HashMap::new();
    let mut last_time: HashMap<String, i64> = HashMap::new();
    let mut superseded = Vec::new();

    for entry in sorted {
        let Some(ssid) = entry.suite_section_id() else {
            last_data.clear();
            last_time.clear();
            continue;
        };

        let fingerprint = entry.fingerprint();

        match last_data.get(&ssid) {
            None => {
                last_data.insert(ssid.clone(), fingerprint);
                last_time.insert(ssid, entry.time);
                continue;
            }
            Some(prev) if *prev == fingerprint => {
                if let Some(&prev_time) = last_time.get(&ssid) {
                    superseded.push(prev_time);
                }
            }
            _ => {}
        }

        last_time.insert(ssid.clone(), entry.time);
        last_data.insert(ssid, fingerprint);
    }

    superseded
}
