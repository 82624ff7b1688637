use super::*;

use tokio::sync::broadcast;

use crate::{
    events::event_channel,
    test_support::{FakeApi, RecordingNotifier},
};

struct Harness {
    registry: Arc<FileRegistry>,
    selection: Arc<SelectionController>,
    api: Arc<FakeApi>,
    notifier: Arc<RecordingNotifier>,
    events: broadcast::Receiver<ClientEvent>,
}

fn harness(api: Arc<FakeApi>) -> Harness {
    let notifier = RecordingNotifier::new();
    let events = event_channel();
    let receiver = events.subscribe();
    let selection = Arc::new(SelectionController::new(Vec::new(), events.clone()));
    let registry = Arc::new(FileRegistry::new(
        api.clone(),
        notifier.clone(),
        selection.clone(),
        events,
    ));
    Harness {
        registry,
        selection,
        api,
        notifier,
        events: receiver,
    }
}

fn names(records: &[FileRecord]) -> Vec<&str> {
    records.iter().map(|record| record.filename.as_str()).collect()
}

async fn wait_for_list_calls(api: &FakeApi, calls: u32) {
    while api.list_calls() < calls {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn refresh_replaces_records_and_publishes_revision() {
    let mut h = harness(FakeApi::with_files(&["a.mp3", "b.mp3"]));

    assert!(h.registry.refresh().await);

    assert_eq!(names(&h.registry.records().await), vec!["a.mp3", "b.mp3"]);
    assert_eq!(h.registry.revision().await, 1);
    assert_eq!(
        h.events.try_recv().expect("event"),
        ClientEvent::RegistryRefreshed {
            revision: 1,
            file_count: 2
        }
    );
}

#[tokio::test]
async fn failed_refresh_keeps_current_list() {
    let h = harness(FakeApi::with_files(&["a.mp3"]));
    h.registry.refresh().await;
    h.api.fail_list(true);

    assert!(!h.registry.refresh().await);

    assert_eq!(names(&h.registry.records().await), vec!["a.mp3"]);
    assert_eq!(h.registry.revision().await, 1);
    assert_eq!(h.notifier.count(NotificationKind::Error), 1);
}

#[tokio::test]
async fn delete_clears_selection_before_removing_record() {
    let mut h = harness(FakeApi::with_files(&["a.mp3", "b.mp3"]));
    h.registry.refresh().await;
    h.selection.select("a.mp3").await;
    while h.events.try_recv().is_ok() {}

    assert!(h.registry.delete("a.mp3").await);

    assert_eq!(names(&h.registry.records().await), vec!["b.mp3"]);
    assert_eq!(h.selection.selected_filename().await, None);
    assert!(matches!(
        h.events.try_recv().expect("selection event"),
        ClientEvent::SelectionChanged { selected: None, .. }
    ));
    assert!(matches!(
        h.events.try_recv().expect("removal event"),
        ClientEvent::FileRemoved { ref filename, .. } if filename == "a.mp3"
    ));
    assert_eq!(h.notifier.count(NotificationKind::Success), 1);
}

#[tokio::test]
async fn failed_delete_leaves_list_and_selection_untouched() {
    let h = harness(FakeApi::with_files(&["a.mp3"]));
    h.registry.refresh().await;
    h.selection.select("a.mp3").await;
    h.api.fail_delete(true);

    assert!(!h.registry.delete("a.mp3").await);

    assert!(h.registry.contains("a.mp3").await);
    assert!(h.selection.is_selected("a.mp3").await);
    assert_eq!(h.registry.revision().await, 1);
    assert_eq!(h.notifier.count(NotificationKind::Error), 1);
}

#[tokio::test]
async fn deleting_unselected_file_keeps_selection() {
    let h = harness(FakeApi::with_files(&["a.mp3", "b.mp3"]));
    h.registry.refresh().await;
    h.selection.select("b.mp3").await;

    assert!(h.registry.delete("a.mp3").await);

    assert_eq!(h.api.delete_calls(), vec!["a.mp3"]);
    assert!(h.selection.is_selected("b.mp3").await);
}

#[tokio::test]
async fn older_refresh_resolving_late_is_dropped() {
    let h = harness(FakeApi::with_files(&["a.mp3"]));
    let release_first = h.api.hold_next_list();

    let registry = Arc::clone(&h.registry);
    let first = tokio::spawn(async move { registry.refresh().await });
    wait_for_list_calls(&h.api, 1).await;

    h.api.remove_remote("a.mp3");
    assert!(h.registry.refresh().await);
    assert!(h.registry.records().await.is_empty());

    let _ = release_first.send(());
    assert!(!first.await.expect("join"));
    assert!(h.registry.records().await.is_empty());
}

#[tokio::test]
async fn in_flight_refresh_does_not_resurrect_deleted_file() {
    let h = harness(FakeApi::with_files(&["a.mp3", "b.mp3"]));
    let release = h.api.hold_next_list();

    let registry = Arc::clone(&h.registry);
    let refresh = tokio::spawn(async move { registry.refresh().await });
    wait_for_list_calls(&h.api, 1).await;

    assert!(h.registry.delete("a.mp3").await);
    let _ = release.send(());
    assert!(refresh.await.expect("join"));

    assert_eq!(names(&h.registry.records().await), vec!["b.mp3"]);
}

#[tokio::test]
async fn refresh_clears_selection_of_vanished_file() {
    let h = harness(FakeApi::with_files(&["a.mp3"]));
    h.registry.refresh().await;
    h.selection.select("a.mp3").await;

    h.api.remove_remote("a.mp3");
    h.registry.refresh().await;

    assert_eq!(h.selection.selected_filename().await, None);
}

#[tokio::test]
async fn refresh_trigger_runs_a_refresh() {
    let h = harness(FakeApi::with_files(&["a.mp3"]));
    let trigger: Arc<dyn RefreshTrigger> = h.registry.clone();

    assert!(trigger.request_refresh().await);
    assert!(h.registry.contains("a.mp3").await);
}

#[tokio::test]
async fn download_saves_media_under_its_name() {
    let h = harness(FakeApi::with_files(&["a.mp3"]));
    let dir = tempfile::tempdir().expect("tempdir");

    let saved = h
        .registry
        .download("a.mp3", dir.path())
        .await
        .expect("download");

    assert_eq!(saved, dir.path().join("a.mp3"));
    assert_eq!(std::fs::read(&saved).expect("read"), b"media:a.mp3");
}

#[tokio::test]
async fn download_of_unknown_file_notifies() {
    let h = harness(FakeApi::new());
    let dir = tempfile::tempdir().expect("tempdir");

    let err = h
        .registry
        .download("nope.mp3", dir.path())
        .await
        .expect_err("must fail");

    assert!(matches!(err, ApiError::Server { status: 404, .. }));
    assert_eq!(h.notifier.count(NotificationKind::Error), 1);
}
