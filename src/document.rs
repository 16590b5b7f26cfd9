// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Walks a Messenger conversation export and repairs its human-readable
//! fields: `title`, participant `name`, message `content` and
//! `sender_name`, and reaction `actor`. Everything else is left as parsed.

use indicatif::ProgressBar;
use log::{debug, warn};
use serde_json::{Map, Value};

use crate::error::CleanError;
use crate::repair::{count_patterns, repair_in_place};

const SAMPLE_CHARS: usize = 100;

/// Before/after excerpt of one repaired message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentSample {
    pub before: String,
    pub after: String,
}

#[derive(Debug, Default)]
pub struct CleanReport {
    pub title_changed: bool,
    pub participants: usize,
    pub participants_renamed: usize,
    pub messages: usize,
    /// Messages whose `content` differs after repair.
    pub messages_cleaned: usize,
    pub senders_renamed: usize,
    pub actors_renamed: usize,
    pub samples: Vec<ContentSample>,
}

/// Pattern hits found in message `content` and `sender_name` fields.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanReport {
    pub messages: usize,
    pub problems: usize,
    pub affected_messages: usize,
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Optional list field. Absent and `null` both mean "no entries".
fn array_field<'a>(
    fields: &'a mut Map<String, Value>,
    key: &str,
    owner: &str,
) -> Result<Option<&'a mut Vec<Value>>, CleanError> {
    match fields.get_mut(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => Ok(Some(items)),
        Some(other) => Err(CleanError::UnexpectedShape(format!(
            "`{}` in {} must be an array, found {}",
            key,
            owner,
            kind(other)
        ))),
    }
}

/// Repair `fields[key]` when it holds a string. Returns the old value if
/// the repair changed anything.
fn repair_field(fields: &mut Map<String, Value>, key: &str) -> Option<String> {
    match fields.get_mut(key) {
        Some(Value::String(text)) => repair_in_place(text),
        _ => None,
    }
}

fn preview(text: &str) -> String {
    match text.char_indices().nth(SAMPLE_CHARS) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}

/// Repair every targeted field of `doc` in place.
///
/// Up to `sample_limit` changed message bodies are kept in the report as
/// previews. `pb` advances once per message.
pub fn clean_conversation(
    doc: &mut Value,
    sample_limit: usize,
    pb: &ProgressBar,
) -> Result<CleanReport, CleanError> {
    let found = kind(doc);
    let fields = doc.as_object_mut().ok_or_else(|| {
        CleanError::UnexpectedShape(format!("top level must be an object, found {}", found))
    })?;

    let mut report = CleanReport {
        title_changed: repair_field(fields, "title").is_some(),
        ..Default::default()
    };

    if let Some(participants) = array_field(fields, "participants", "the conversation")? {
        report.participants = participants.len();
        for participant in participants.iter_mut().filter_map(Value::as_object_mut) {
            if repair_field(participant, "name").is_some() {
                report.participants_renamed += 1;
            }
        }
    }

    let Some(messages) = array_field(fields, "messages", "the conversation")? else {
        debug!("No messages in conversation");
        return Ok(report);
    };

    report.messages = messages.len();
    pb.set_length(messages.len() as u64);
    pb.set_message(format!("Cleaning {} messages...", messages.len()));

    for (index, message) in messages.iter_mut().enumerate() {
        pb.inc(1);
        let Some(fields) = message.as_object_mut() else {
            warn!("Message #{} is {}, leaving it untouched", index, kind(message));
            continue;
        };

        if let Some(Value::String(content)) = fields.get_mut("content") {
            if let Some(before) = repair_in_place(content) {
                report.messages_cleaned += 1;
                if report.samples.len() < sample_limit {
                    report.samples.push(ContentSample {
                        before: preview(&before),
                        after: preview(content),
                    });
                }
            }
        }

        if repair_field(fields, "sender_name").is_some() {
            report.senders_renamed += 1;
        }

        if let Some(reactions) = array_field(fields, "reactions", "a message")? {
            for reaction in reactions.iter_mut().filter_map(Value::as_object_mut) {
                if repair_field(reaction, "actor").is_some() {
                    report.actors_renamed += 1;
                }
            }
        }
    }

    debug!(
        "Cleaned {} of {} messages ({} senders, {} reaction actors renamed)",
        report.messages_cleaned, report.messages, report.senders_renamed, report.actors_renamed
    );

    Ok(report)
}

/// Count corrupted patterns without modifying anything.
pub fn scan_conversation(doc: &Value) -> ScanReport {
    let messages = doc
        .get("messages")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut report = ScanReport {
        messages: messages.len(),
        ..Default::default()
    };

    for message in messages {
        let hits: usize = ["content", "sender_name"]
            .into_iter()
            .filter_map(|key| message.get(key).and_then(Value::as_str))
            .map(count_patterns)
            .sum();

        if hits > 0 {
            report.problems += hits;
            report.affected_messages += 1;
        }
    }

    report
}
