//! Database models split into separate files.
//! This module re-exports individual model modules so imports like
//! `use crate::db::models::*;` work across the crate.

pub mod assignment;
pub mod feed_settings;
pub mod reminder;
pub mod subject_alias;

pub use self::assignment::*;
pub use self::feed_settings::*;
pub use self::reminder::*;
pub use self::subject_alias::*;
