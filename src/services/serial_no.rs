//! Serial number list handling.
//!
//! Serial numbers travel as a single text field, one serial per line. Commas
//! are accepted as separators and serials compare case-insensitively.

use std::collections::HashSet;

/// Splits a serial number field into normalized serials.
pub fn parse_serial_nos(raw: &str) -> Vec<String> {
    raw.trim()
        .to_uppercase()
        .replace(',', "\n")
        .split('\n')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn join_serial_nos<S: AsRef<str>>(serial_nos: &[S]) -> String {
    serial_nos
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Serials of `source` not present in `returned`, in first-seen order and
/// without duplicates.
pub fn remaining_serial_nos(source: &[String], returned: &[String]) -> Vec<String> {
    let returned: HashSet<&str> = returned.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();

    source
        .iter()
        .filter(|serial| !returned.contains(serial.as_str()))
        .filter(|serial| seen.insert(serial.as_str()))
        .cloned()
        .collect()
}
