//! Text layouts for stored records

use super::Record;
use crate::measurement::Field;
use indexmap::IndexMap;

/// `2024-01-01 12:00:00.000000`
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

fn push_fields(logs: &mut String, fields: &[Field]) {
    for field in fields {
        logs.push_str(" - ");
        logs.push_str(&field.to_string());
    }
}

fn stamp(record: &Record) -> String {
    record.timestamp.format(TIMESTAMP_FORMAT).to_string()
}

/// `[timestamp] - [identity] - field...` per record, global arrival order
pub(super) fn datetime(groups: &IndexMap<String, Vec<Record>>) -> String {
    let mut records: Vec<&Record> = groups.values().flatten().collect();
    records.sort_by_key(|record| record.sequence);

    let mut logs = String::new();
    for record in records {
        logs.push_str(&format!("[{}] - [{}]", stamp(record), record.identity));
        push_fields(&mut logs, &record.fields);
        logs.push('\n');
    }
    logs
}

/// `[identity]` header followed by one tab-indented line per record
pub(super) fn function(groups: &IndexMap<String, Vec<Record>>) -> String {
    let mut logs = String::new();
    for (identity, records) in groups {
        logs.push_str(&format!("[{}]\n", identity));
        for record in records {
            logs.push_str(&format!("\t[{}]", stamp(record)));
            push_fields(&mut logs, &record.fields);
            logs.push('\n');
        }
    }
    logs
}

/// Sum readings field by field, in order of first appearance
pub(super) fn sum_fields(records: &[Record]) -> Vec<Field> {
    let mut totals: Vec<Field> = Vec::new();
    for field in records.iter().flat_map(|record| record.fields.iter()) {
        match totals.iter_mut().find(|total| total.name == field.name) {
            Some(total) => {
                total.reading = total
                    .reading
                    .checked_add(&field.reading)
                    .unwrap_or(total.reading);
            }
            None => totals.push(*field),
        }
    }
    totals
}

/// `[identity] - N calls - summed field...` per identity
pub(super) fn cumulative(groups: &IndexMap<String, Vec<Record>>) -> String {
    let mut logs = String::new();
    for (identity, records) in groups {
        logs.push_str(&format!("[{}] - {} calls", identity, records.len()));
        push_fields(&mut logs, &sum_fields(records));
        logs.push('\n');
    }
    logs
}
