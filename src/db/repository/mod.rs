pub mod assignment_repository;
pub mod completion_repository;
pub mod feed_settings_repository;
pub mod reminder_log_repository;
pub mod reminder_queue_repository;
pub mod subject_alias_repository;

pub use assignment_repository::AssignmentRepository;
pub use completion_repository::CompletionRepository;
pub use feed_settings_repository::FeedSettingsRepository;
pub use reminder_log_repository::ReminderLogRepository;
pub use reminder_queue_repository::ReminderQueueRepository;
pub use subject_alias_repository::SubjectAliasRepository;
