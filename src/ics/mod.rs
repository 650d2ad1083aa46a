//! iCalendar feed parsing.
//!
//! Turns a raw ICS export into a deadline-ordered list of assignment
//! records. Only `VEVENT` blocks are inspected; everything else in the
//! document is ignored.

mod datetime;
mod parser;

pub use parser::{parse_feed, ParsedAssignment};
