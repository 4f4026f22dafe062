// Bookmarkr services
// Services wrap the external integrations: the realtime change feed, the
// generative-text analyzer, and the reminder webhook.

pub mod analyzer;
pub mod notifier;
pub mod realtime;

pub use analyzer::BookmarkAnalyzer;
pub use notifier::ReminderNotifier;
pub use realtime::RealtimeListener;
