pub mod assignments;
pub mod health;
pub mod reminders;
pub mod settings;
pub mod subjects;
