use std::{sync::Arc, time::Duration};

use chrono::Utc;

use evcal::{
    calendar::{Calendar, CalendarConfig, CalendarError},
    event::EventError,
    persist::memory::{MemoryStore, MemoryStoreHandle},
    priority::Priority,
    runtime::{
        events::NotificationStream,
        scheduler::{Clock, ManualClock, Scheduler},
    },
    types::parse_date,
};

fn clock_at(now: &str) -> Arc<ManualClock> {
    Arc::new(ManualClock::new(parse_date(now).expect("now").with_timezone(&Utc)))
}

fn calendar_at(now: &str) -> (Calendar, NotificationStream, MemoryStoreHandle) {
    let store = MemoryStore::new();
    let handle = store.handle();
    let (calendar, rx) = Calendar::new(Box::new(store), Scheduler::current_with_clock(clock_at(now)));
    (calendar, rx, handle)
}

#[tokio::test(start_paused = true)]
async fn reminder_scenario_delivers_exactly_the_message() {
    let (mut calendar, mut rx, _) = calendar_at("2025-06-01 08:00");

    let event = calendar
        .add_event("Team sync", "2025-06-01 09:00", "medium")
        .expect("add");
    assert!(!event.id().is_empty());
    assert_eq!(event.title(), "Team sync");
    assert_eq!(event.priority(), Priority::Medium);

    calendar
        .set_event_reminder(event.id(), "standup in 5", "2025-06-01 08:55")
        .expect("reminder");

    tokio::time::sleep(Duration::from_secs(54 * 60)).await;
    assert!(rx.try_recv().is_err());

    let got = tokio::time::timeout(Duration::from_secs(120), rx.recv())
        .await
        .expect("fires at 08:55")
        .expect("open");
    assert_eq!(got.message, "standup in 5");
    assert_eq!(got.event_id, event.id());
    assert!(rx.try_recv().is_err());

    let stored = calendar.get_event(event.id()).expect("event");
    assert!(stored.reminder().is_some_and(|r| r.sent()));
}

#[tokio::test(start_paused = true)]
async fn cancelled_reminder_never_fires() {
    let (mut calendar, mut rx, _) = calendar_at("2025-06-01 08:00");
    let event = calendar
        .add_event("Team sync", "2025-06-01 09:00", "medium")
        .expect("add");
    calendar
        .set_event_reminder(event.id(), "standup in 5", "2025-06-01 08:55")
        .expect("reminder");

    calendar.cancel_event_reminder(event.id()).expect("cancel");
    assert!(calendar.get_event(event.id()).expect("event").reminder().is_none());

    tokio::time::sleep(Duration::from_secs(2 * 3600)).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn reminders_at_or_before_now_are_rejected_for_any_message() {
    let (mut calendar, mut rx, _) = calendar_at("2025-06-01 08:00");
    let event = calendar
        .add_event("Team sync", "2025-06-01 09:00", "medium")
        .expect("add");

    for message in ["standup", "", "   "] {
        for date in ["2025-06-01 08:00", "2025-06-01 07:59", "2020-01-01 00:00"] {
            let res = calendar.set_event_reminder(event.id(), message, date);
            assert!(
                matches!(res, Err(CalendarError::PastReminderDate(_))),
                "{message:?} at {date}: {res:?}"
            );
        }
    }
    assert!(calendar.get_event(event.id()).expect("event").reminder().is_none());
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn reminder_errors_are_classified() {
    let (mut calendar, _rx, _) = calendar_at("2025-06-01 08:00");
    let event = calendar
        .add_event("Team sync", "2025-06-01 09:00", "medium")
        .expect("add");

    assert!(matches!(
        calendar.set_event_reminder("missing", "hi", "2025-06-01 08:55"),
        Err(CalendarError::NotFound(_))
    ));
    assert!(matches!(
        calendar.set_event_reminder(event.id(), "hi", "2025-02-30 08:55"),
        Err(CalendarError::Event(EventError::InvalidDate(_)))
    ));
    assert!(matches!(
        calendar.set_event_reminder(event.id(), " ", "2025-06-01 08:55"),
        Err(CalendarError::Event(EventError::EmptyMessage))
    ));
}

#[tokio::test]
async fn deleting_unknown_id_leaves_map_unchanged() {
    let (mut calendar, _rx, store) = calendar_at("2025-06-01 08:00");
    calendar.add_event("Team sync", "2025-06-01 09:00", "medium").expect("a");
    calendar.add_event("Retro", "2025-06-02 15:00", "low").expect("b");
    let saves = store.save_count();

    let res = calendar.delete_event("no-such-id");
    assert!(matches!(res, Err(CalendarError::NotFound(id)) if id == "no-such-id"));
    assert_eq!(calendar.len(), 2);
    assert_eq!(store.save_count(), saves);
}

#[tokio::test]
async fn every_mutation_persists() {
    let (mut calendar, _rx, store) = calendar_at("2025-06-01 08:00");
    let event = calendar.add_event("Team sync", "2025-06-01 09:00", "medium").expect("add");
    assert_eq!(store.save_count(), 1);
    calendar.edit_event(event.id(), "Team sync moved", "2025-06-01 10:00", "high").expect("edit");
    assert_eq!(store.save_count(), 2);
    calendar.set_event_reminder(event.id(), "go", "2025-06-01 09:50").expect("remind");
    assert_eq!(store.save_count(), 3);
    calendar.cancel_event_reminder(event.id()).expect("cancel");
    assert_eq!(store.save_count(), 4);
    calendar.delete_event(event.id()).expect("delete");
    assert_eq!(store.save_count(), 5);
    assert!(calendar.is_empty());
}

#[tokio::test]
async fn failed_edit_changes_nothing() {
    let (mut calendar, _rx, store) = calendar_at("2025-06-01 08:00");
    let event = calendar.add_event("Team sync", "2025-06-01 09:00", "medium").expect("add");

    let res = calendar.edit_event(event.id(), "Team sync", "2025-06-01 09:00", "urgent");
    assert!(matches!(res, Err(ref e) if e.is_validation()));
    assert_eq!(calendar.get_event(event.id()).expect("event").priority(), Priority::Medium);
    assert_eq!(store.save_count(), 1);

    assert!(matches!(
        calendar.edit_event("missing", "Team sync", "2025-06-01 09:00", "low"),
        Err(CalendarError::NotFound(_))
    ));
}

#[tokio::test]
async fn persist_failure_is_reported_but_not_rolled_back() {
    let (mut calendar, _rx, store) = calendar_at("2025-06-01 08:00");
    store.fail_saves(true);

    let res = calendar.add_event("Team sync", "2025-06-01 09:00", "medium");
    assert!(matches!(res, Err(CalendarError::Persist(_))));
    assert_eq!(calendar.len(), 1);

    let id = calendar.get_events().keys().next().cloned().expect("kept in memory");
    calendar
        .set_event_reminder(&id, "standup", "2025-06-01 08:55")
        .expect_err("persist fails");
    assert!(calendar.get_event(&id).expect("event").reminder().is_some());

    let res = calendar.cancel_event_reminder(&id);
    assert!(matches!(res, Err(CalendarError::Persist(_))));
    assert!(calendar.get_event(&id).expect("event").reminder().is_none());

    store.fail_saves(false);
    calendar.save().expect("save recovers");
    assert!(!store.data().is_empty());
}

#[tokio::test]
async fn returned_events_are_isolated_copies() {
    let (mut calendar, _rx, _) = calendar_at("2025-06-01 08:00");
    let event = calendar.add_event("Team sync", "2025-06-01 09:00", "medium").expect("add");
    calendar.set_event_reminder(event.id(), "standup", "2025-06-01 08:55").expect("remind");

    let mut snapshot = calendar.get_events();
    let copy = snapshot.get_mut(event.id()).expect("copy");
    copy.update("Changed", "2030-01-01 00:00", "low").expect("update copy");
    assert!(copy.remove_reminder());
    snapshot.clear();

    let live = calendar.get_event(event.id()).expect("live");
    assert_eq!(live.title(), "Team sync");
    assert!(live.reminder().is_some_and(|r| r.is_pending()));
    assert_eq!(calendar.len(), 1);
}

#[tokio::test]
async fn persisted_document_has_expected_shape() {
    let (mut calendar, _rx, store) = calendar_at("2025-06-01 08:00");
    let event = calendar.add_event("Team sync", "2025-06-01 09:00", "medium").expect("add");
    let plain = calendar.add_event("Retro", "2025-06-02 15:00", "low").expect("add");
    calendar.set_event_reminder(event.id(), "standup in 5", "2025-06-01 08:55").expect("remind");

    let doc: serde_json::Value = serde_json::from_slice(&store.data()).expect("json");
    let rec = &doc[event.id()];
    assert_eq!(rec["id"], event.id());
    assert_eq!(rec["title"], "Team sync");
    assert_eq!(rec["start_at"], "2025-06-01T09:00:00+08:00");
    assert_eq!(rec["priority"], "medium");
    assert_eq!(rec["reminder"]["message"], "standup in 5");
    assert_eq!(rec["reminder"]["at"], "2025-06-01T00:55:00Z");
    assert_eq!(rec["reminder"]["sent"], false);
    assert!(doc[plain.id()]["reminder"].is_null());
}

#[tokio::test(start_paused = true)]
async fn load_restores_events_and_rearms_pending_reminders() {
    let (mut first, _rx1, store) = calendar_at("2025-06-01 08:00");
    let event = first.add_event("Team sync", "2025-06-01 09:00", "medium").expect("add");
    first.set_event_reminder(event.id(), "standup in 5", "2025-06-01 08:55").expect("remind");
    first.close().expect("close");

    let (mut second, mut rx) = Calendar::new(
        Box::new(MemoryStore::with_data(store.data())),
        Scheduler::current_with_clock(clock_at("2025-06-01 08:30")),
    );
    assert_eq!(second.load().expect("load"), 1);
    let restored = second.get_event(event.id()).expect("restored");
    assert_eq!(restored.title(), "Team sync");
    assert_eq!(restored.start_at(), event.start_at());

    let got = tokio::time::timeout(Duration::from_secs(3600), rx.recv())
        .await
        .expect("fires")
        .expect("open");
    assert_eq!(got.message, "standup in 5");
}

#[tokio::test]
async fn overdue_unsent_reminder_fires_on_load() {
    let (mut first, _rx1, store) = calendar_at("2025-06-01 08:00");
    let event = first.add_event("Team sync", "2025-06-01 09:00", "medium").expect("add");
    first.set_event_reminder(event.id(), "missed", "2025-06-01 08:55").expect("remind");
    first.close().expect("close");

    let (mut second, mut rx) = Calendar::new(
        Box::new(MemoryStore::with_data(store.data())),
        Scheduler::current_with_clock(clock_at("2025-06-01 10:00")),
    );
    second.load().expect("load");
    assert_eq!(rx.try_recv().expect("fired on load").message, "missed");
    assert!(second.get_event(event.id()).expect("event").reminder().is_some_and(|r| r.sent()));
}

#[tokio::test(start_paused = true)]
async fn load_without_rearm_keeps_timers_off() {
    let (mut first, _rx1, store) = calendar_at("2025-06-01 08:00");
    let event = first.add_event("Team sync", "2025-06-01 09:00", "medium").expect("add");
    first.set_event_reminder(event.id(), "standup", "2025-06-01 08:55").expect("remind");
    first.close().expect("close");

    let (mut second, mut rx) = Calendar::with_config(
        Box::new(MemoryStore::with_data(store.data())),
        Scheduler::current_with_clock(clock_at("2025-06-01 08:00")),
        CalendarConfig { rearm_on_load: false },
    );
    assert_eq!(second.load().expect("load"), 0);
    tokio::time::sleep(Duration::from_secs(2 * 3600)).await;
    assert!(rx.try_recv().is_err());
    assert!(second.get_event(event.id()).expect("event").reminder().is_some_and(|r| r.is_pending()));
}

#[tokio::test(start_paused = true)]
async fn load_replaces_map_and_cancels_old_timers() {
    let (mut calendar, mut rx, store) = calendar_at("2025-06-01 08:00");
    calendar.save().expect("save empty");
    let empty = store.data();

    let event = calendar.add_event("Team sync", "2025-06-01 09:00", "medium").expect("add");
    calendar.set_event_reminder(event.id(), "stale", "2025-06-01 08:55").expect("remind");

    store.set_data(empty);
    assert_eq!(calendar.load().expect("load"), 0);
    assert!(calendar.is_empty());

    tokio::time::sleep(Duration::from_secs(2 * 3600)).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn empty_store_loads_as_empty_calendar() {
    let (mut calendar, _rx, _) = calendar_at("2025-06-01 08:00");
    assert_eq!(calendar.load().expect("load"), 0);
    assert!(calendar.is_empty());
}

#[tokio::test]
async fn corrupt_document_is_a_persistence_failure() {
    let (mut calendar, _rx) = Calendar::new(
        Box::new(MemoryStore::with_data(b"{not json".to_vec())),
        Scheduler::current_with_clock(clock_at("2025-06-01 08:00")),
    );
    assert!(matches!(calendar.load(), Err(CalendarError::Persist(_))));

    let bad_title = br#"{"x":{"id":"x","title":"!!","start_at":"2025-06-01T09:00:00+08:00","priority":"low","reminder":null}}"#;
    let (mut calendar, _rx) = Calendar::new(
        Box::new(MemoryStore::with_data(bad_title.to_vec())),
        Scheduler::current_with_clock(clock_at("2025-06-01 08:00")),
    );
    assert!(calendar.load().is_err());
}

#[tokio::test]
async fn duplicate_ids_in_document_fail_the_load() {
    let (mut calendar, _rx, handle) = calendar_at("2025-06-01 08:00");
    let existing = calendar.add_event("Kept event", "2025-06-02 10:00", "high").expect("add");

    let duplicated = br#"{
        "a":{"id":"x","title":"Team sync","start_at":"2025-06-01T09:00:00+08:00","priority":"medium",
             "reminder":{"message":"standup","at":"2025-06-01T00:55:00Z","sent":false}},
        "b":{"id":"x","title":"Other sync","start_at":"2025-06-01T10:00:00+08:00","priority":"low","reminder":null}
    }"#;
    handle.set_data(duplicated.to_vec());

    let res = calendar.load();
    assert!(matches!(res, Err(CalendarError::Persist(_))), "{res:?}");
    assert_eq!(calendar.len(), 1);
    assert!(calendar.get_event(existing.id()).is_some());
}

#[tokio::test]
async fn past_reminder_error_shows_calendar_local_time() {
    let (mut calendar, _rx, _) = calendar_at("2025-06-01 08:00");
    let event = calendar.add_event("Team sync", "2025-06-01 09:00", "medium").expect("add");
    let err = calendar
        .set_event_reminder(event.id(), "standup", "2025-06-01 07:30")
        .expect_err("past");
    let text = err.to_string();
    assert!(text.contains("2025-06-01 07:30"), "{text}");
    assert!(!text.contains("UTC"), "{text}");
}

#[tokio::test]
async fn advancing_the_clock_turns_a_future_time_into_a_past_one() {
    let clock = clock_at("2025-06-01 08:00");
    let (mut calendar, _rx) = Calendar::new(
        Box::new(MemoryStore::new()),
        Scheduler::current_with_clock(Arc::clone(&clock) as Arc<dyn Clock>),
    );
    let event = calendar.add_event("Team sync", "2025-06-01 09:00", "medium").expect("add");

    clock.advance(chrono::Duration::minutes(60));
    assert!(matches!(
        calendar.set_event_reminder(event.id(), "standup", "2025-06-01 08:55"),
        Err(CalendarError::PastReminderDate(_))
    ));

    clock.set(parse_date("2025-06-01 07:00").expect("now").with_timezone(&Utc));
    calendar
        .set_event_reminder(event.id(), "standup", "2025-06-01 08:55")
        .expect("future again");
}

#[tokio::test]
async fn close_releases_the_channel() {
    let (mut calendar, mut rx, _) = calendar_at("2025-06-01 08:00");
    let event = calendar.add_event("Team sync", "2025-06-01 09:00", "medium").expect("add");
    calendar.set_event_reminder(event.id(), "standup", "2025-06-01 08:55").expect("remind");
    assert!(calendar.notify(event.id(), "manual"));
    let notifier = calendar.notifier().clone();
    assert!(!notifier.is_closed());

    calendar.close().expect("close");
    drop(notifier);

    let first = rx.recv().await.expect("queued message survives close");
    assert_eq!(first.message, "manual");
    let end = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("channel closes");
    assert!(end.is_none());
}

#[tokio::test]
async fn notify_reports_a_dropped_consumer() {
    let (calendar, rx, _) = calendar_at("2025-06-01 08:00");
    assert!(!calendar.notifier().is_closed());
    drop(rx);
    assert!(calendar.notifier().is_closed());
    assert!(!calendar.notify("evt", "nobody listens"));
}
