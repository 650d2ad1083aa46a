use chrono::{DateTime, Utc};

use super::datetime::parse_timestamp;

const EVENT_BEGIN: &str = "BEGIN:VEVENT";
const EVENT_END: &str = "END:VEVENT";

/// One assignment extracted from a calendar event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAssignment {
    /// The event's `UID`; unique within a single parse result.
    pub uid: String,
    /// The event's `SUMMARY`, unescaped.
    pub title: String,
    /// The event's `CATEGORIES` value; empty when uncategorized.
    pub category_code: String,
    /// Deadline taken from `DTEND`, falling back to `DTSTART`.
    pub deadline: DateTime<Utc>,
    /// Always `false` at parse time; callers join persisted completion state.
    pub completed: bool,
}

/// Parse an iCalendar document into assignments, ascending by deadline.
///
/// The function is a pure function of its input and never fails: events
/// missing a UID, a summary, or a parseable timestamp are dropped, and
/// input without any event blocks yields an empty list. Ties on the
/// deadline keep the original event order.
pub fn parse_feed(input: &str) -> Vec<ParsedAssignment> {
    let mut records: Vec<ParsedAssignment> = event_blocks(input)
        .into_iter()
        .filter_map(build_record)
        .collect();

    // sort_by is stable, so equal deadlines stay in extraction order.
    records.sort_by(|a, b| a.deadline.cmp(&b.deadline));
    records
}

/// Isolate `BEGIN:VEVENT` .. `END:VEVENT` blocks, scanning left to right.
///
/// Blocks are non-overlapping and returned in source order. A begin marker
/// with no matching end marker yields nothing for that fragment.
fn event_blocks(input: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut cursor = 0;

    while let Some(begin_rel) = input[cursor..].find(EVENT_BEGIN) {
        let begin = cursor + begin_rel;
        match input[begin..].find(EVENT_END) {
            Some(end_rel) => {
                let end = begin + end_rel + EVENT_END.len();
                blocks.push(&input[begin..end]);
                cursor = end;
            }
            None => break,
        }
    }

    blocks
}

fn build_record(block: &str) -> Option<ParsedAssignment> {
    let uid = property(block, "UID").filter(|u| !u.is_empty())?;
    let title = property(block, "SUMMARY")?;
    let timestamp = property(block, "DTEND").or_else(|| property(block, "DTSTART"))?;
    let category_code = property(block, "CATEGORIES").unwrap_or_default();

    let deadline = match parse_timestamp(&timestamp) {
        Some(instant) => instant,
        None => {
            tracing::debug!(
                "Skipping event {}: unparseable timestamp '{}'",
                uid,
                timestamp
            );
            return None;
        }
    };

    Some(ParsedAssignment {
        uid,
        title,
        category_code,
        deadline,
        completed: false,
    })
}

/// Read the decoded value of the first matching property line in a block.
///
/// A line matches when it starts with `name` (case-insensitive) followed
/// immediately by `:` (bare value) or `;` (parameterized value, e.g.
/// `DTEND;VALUE=DATE:20240315`). For parameterized lines the value is
/// everything after the first colon following the parameters; a bare value
/// keeps any colons it contains. The value is unescaped and trimmed.
///
/// Folded (continuation) lines are not joined; a folded value yields only
/// its first physical line.
fn property(block: &str, name: &str) -> Option<String> {
    for raw_line in block.lines() {
        let line = raw_line.trim_end_matches('\r');
        let bytes = line.as_bytes();
        if bytes.len() <= name.len() {
            continue;
        }
        if !bytes[..name.len()].eq_ignore_ascii_case(name.as_bytes()) {
            continue;
        }

        let value = match bytes[name.len()] {
            b':' => &line[name.len() + 1..],
            b';' => {
                let params = &line[name.len() + 1..];
                match params.find(':') {
                    Some(idx) => &params[idx + 1..],
                    None => params,
                }
            }
            _ => continue,
        };

        return Some(unescape(value).trim().to_string());
    }

    None
}

/// Decode backslash escapes in a property value.
///
/// A single left-to-right pass consumes each escape pair whole: `\n`
/// becomes a newline, `\,` a comma, `\;` a semicolon, `\\` a backslash.
/// Consuming pairs whole keeps a doubly-escaped `\\n` as a literal
/// backslash followed by `n`. Unknown escapes are preserved verbatim.
fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some(',') => out.push(','),
            Some(';') => out.push(';'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }

    out
}
