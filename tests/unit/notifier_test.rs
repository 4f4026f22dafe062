//! Unit tests for reminder selection and webhook message formatting.

use bookmarkr::services::notifier::{due_reminders, reminder_message, ReminderNotifier};
use bookmarkr::types::bookmark::{Bookmark, Priority, Status};
use bookmarkr::types::errors::NotifyError;
use bookmarkr::types::profile::{Profile, Theme};
use chrono::{Duration, Utc};

fn bookmark(title: &str, reminder_offset_hours: Option<i64>, is_archived: bool) -> Bookmark {
    let now = Utc::now();
    Bookmark {
        id: format!("id-{}", title),
        user_id: "user-1".to_string(),
        title: title.to_string(),
        url: format!("https://example.com/{}", title),
        description: None,
        priority: Priority::Medium,
        status: Status::Saved,
        reminder_at: reminder_offset_hours.map(|h| now + Duration::hours(h)),
        is_archived,
        created_at: now,
        updated_at: now,
    }
}

#[test]
fn test_due_reminders_selects_past_unarchived() {
    let bookmarks = vec![
        bookmark("past", Some(-2), false),
        bookmark("future", Some(2), false),
        bookmark("archived-past", Some(-2), true),
        bookmark("none", None, false),
    ];

    let due = due_reminders(&bookmarks, Utc::now());
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].title, "past");
}

#[test]
fn test_reminder_exactly_now_is_due() {
    let now = Utc::now();
    let mut b = bookmark("now", None, false);
    b.reminder_at = Some(now);

    let bookmarks = vec![b];
    assert_eq!(due_reminders(&bookmarks, now).len(), 1);
}

#[test]
fn test_reminder_message_contains_title_and_url() {
    let b = bookmark("read-this", Some(-1), false);
    let message = reminder_message(&b);
    assert!(message.contains("read-this"));
    assert!(message.contains("https://example.com/read-this"));
}

#[tokio::test]
async fn test_notify_profile_without_webhook() {
    let now = Utc::now();
    let profile = Profile {
        id: "user-1".to_string(),
        full_name: None,
        avatar_url: None,
        slack_webhook: None,
        theme: Theme::System,
        created_at: now,
        updated_at: now,
    };

    let notifier = ReminderNotifier::new();
    let err = notifier
        .notify_profile(&profile, &bookmark("due", Some(-1), false))
        .await
        .unwrap_err();
    assert_eq!(err, NotifyError::NoWebhook);
}
