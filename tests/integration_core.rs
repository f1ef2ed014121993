use chrono::NaiveDate;
use daytask::{AppController, AppError, ControllerEvent, Database, Surface, TaskRecord};
use std::fs;

fn day(text: &str) -> NaiveDate {
    text.parse().expect("day")
}

#[test]
fn upgrade_path_from_flat_files_to_publish_round_trip() {
    let dir = tempfile::tempdir().expect("tempdir");

    // Data left behind by the old flat-file version of the app.
    let archive = dir.path().join("archive");
    fs::create_dir_all(&archive).expect("archive dir");
    fs::write(
        archive.join("2025-06-01.json"),
        r#"[{"text":"Carried over","done":false,"pinned":true}]"#,
    )
    .expect("legacy tasks");
    fs::write(dir.path().join("apikey.json"), r#"{"api_key":"sk-legacy"}"#).expect("legacy key");

    let (controller, _events) = AppController::new(dir.path(), None).expect("controller");

    // First launch sees the migrated list and credential.
    let startup = controller.startup_tasks(day("2025-06-01")).expect("startup");
    assert_eq!(startup.len(), 1);
    assert_eq!(startup[0].text, "Carried over");
    assert_eq!(controller.api_key().expect("key"), Some("sk-legacy".to_string()));

    // The user edits and publishes; the indexed store is now authoritative.
    let edited = vec![
        TaskRecord::with_flags("Carried over", true, true),
        TaskRecord::new("Something new"),
    ];
    controller.publish(day("2025-06-01"), &edited).expect("publish");

    fs::remove_file(archive.join("2025-06-01.json")).expect("remove legacy");
    let reloaded = controller.startup_tasks(day("2025-06-01")).expect("reload");
    assert_eq!(reloaded, edited);
}

#[test]
fn store_survives_reopen_with_content_and_order_intact() {
    let dir = tempfile::tempdir().expect("tempdir");
    let tasks = vec![
        TaskRecord::with_flags("c", false, false),
        TaskRecord::with_flags("a", false, true),
        TaskRecord::with_flags("b", true, false),
    ];

    {
        let db = Database::open(dir.path(), None).expect("db");
        db.save_tasks(day("2025-06-02"), &tasks).expect("save");
        db.save_api_key("sk-reopen").expect("save key");
    }

    let db = Database::open(dir.path(), None).expect("reopened db");
    assert_eq!(db.load_tasks(day("2025-06-02")).expect("load"), tasks);
    assert_eq!(db.load_api_key().expect("key"), Some("sk-reopen".to_string()));
}

#[test]
fn days_are_isolated_from_each_other() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = Database::open(dir.path(), None).expect("db");

    db.save_tasks(day("2025-06-03"), &[TaskRecord::new("monday")]).expect("save");
    db.save_tasks(day("2025-06-04"), &[TaskRecord::new("tuesday")]).expect("save");

    assert_eq!(db.load_tasks(day("2025-06-03")).expect("load")[0].text, "monday");
    assert_eq!(db.load_tasks(day("2025-06-04")).expect("load")[0].text, "tuesday");

    db.save_tasks(day("2025-06-03"), &[]).expect("clear one day");
    assert!(db.load_tasks(day("2025-06-03")).expect("load cleared").is_empty());
    assert_eq!(db.load_tasks(day("2025-06-04")).expect("other day intact").len(), 1);
}

#[tokio::test]
async fn failed_summarization_leaves_the_stored_list_untouched() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (controller, _events) = AppController::new(dir.path(), None).expect("controller");

    let published = vec![TaskRecord::with_flags("Keep me", false, true)];
    controller.publish(day("2025-06-05"), &published).expect("publish");

    // Point the adapter at a dead endpoint; the call must fail cleanly.
    controller.set_api_key("sk-test").expect("key");
    controller
        .update_settings(serde_json::json!({ "apiBaseUrl": "http://127.0.0.1:1" }))
        .expect("settings");

    let error = controller
        .summarize("turn my vague plans into tasks")
        .await
        .expect_err("unreachable endpoint");
    assert!(matches!(error, AppError::Transport(_)));

    assert_eq!(
        controller.startup_tasks(day("2025-06-05")).expect("reload"),
        published
    );
}

#[test]
fn surface_lifecycle_drives_publish_and_quit_events() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (controller, mut events) = AppController::new(dir.path(), None).expect("controller");

    controller.surface_opened(Surface::Display).expect("open display");
    controller.surface_opened(Surface::Editor).expect("open editor");

    // Display already open: publish emits only the list replacement.
    let tasks = vec![TaskRecord::new("one"), TaskRecord::new("two")];
    controller.publish(day("2025-06-06"), &tasks).expect("publish");
    assert_eq!(
        events.try_recv().expect("publish event"),
        ControllerEvent::TasksPublished(tasks.clone())
    );

    // Closing the display, then publishing again, asks the shell to re-open it.
    controller.surface_closed(Surface::Display).expect("close display");
    controller.publish(day("2025-06-06"), &tasks).expect("republish");
    assert_eq!(events.try_recv().expect("reopen event"), ControllerEvent::DisplayRequested);
    assert_eq!(
        events.try_recv().expect("second publish event"),
        ControllerEvent::TasksPublished(tasks)
    );

    // Publish marked the display open again, so closing both surfaces quits.
    controller.surface_closed(Surface::Editor).expect("close editor");
    controller.surface_closed(Surface::Display).expect("close display again");
    assert_eq!(events.try_recv().expect("quit event"), ControllerEvent::QuitRequested);
}
