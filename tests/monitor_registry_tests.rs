use chrono::Utc;
use stockmonitor::models::{MonitorStatus, MonitorTask, ThresholdRule};
use stockmonitor::services::monitor_registry::{MonitorHandle, TaskRegistry};

fn handle(id: &str, conversation_id: &str, status: MonitorStatus) -> MonitorHandle {
    let now = Utc::now();
    MonitorHandle::new(MonitorTask {
        id: id.to_string(),
        conversation_id: conversation_id.to_string(),
        user_id: "u1".to_string(),
        notify_target: "u1@example.com".to_string(),
        ticker: "MSFT".to_string(),
        rule: ThresholdRule::Above { value: 400.0 },
        poll_interval_ms: 30_000,
        started_at: now,
        expires_at: now + chrono::Duration::minutes(30),
        status,
        last_price: None,
        baseline_price: None,
        hits: Vec::new(),
    })
}

#[test]
fn unknown_conversation_lists_empty() {
    let reg = TaskRegistry::new();
    assert!(reg.list_by_conversation("nope").is_empty());
    assert!(reg.list_all().is_empty());
    assert_eq!(reg.running_count("nope"), 0);
    assert!(reg.find("nope", "t1").is_none());
}

#[test]
fn insert_keeps_order_per_conversation() {
    let reg = TaskRegistry::new();
    reg.insert("c1", handle("t1", "c1", MonitorStatus::Running));
    reg.insert("c1", handle("t2", "c1", MonitorStatus::Running));
    reg.insert("c2", handle("t3", "c2", MonitorStatus::Running));

    let ids: Vec<String> = reg.list_by_conversation("c1").into_iter().map(|t| t.id).collect();
    assert_eq!(ids, vec!["t1", "t2"]);
    assert_eq!(reg.list_all().len(), 3);
    assert_eq!(reg.conversation_count(), 2);
    assert_eq!(reg.find("c2", "t3").map(|h| h.id().to_string()), Some("t3".to_string()));
}

#[test]
fn remove_is_a_noop_when_absent() {
    let reg = TaskRegistry::new();
    reg.insert("c1", handle("t1", "c1", MonitorStatus::Running));
    reg.insert("c1", handle("t2", "c1", MonitorStatus::Running));

    assert!(reg.remove("c1", "missing").is_none());
    assert!(reg.remove("other", "t1").is_none());

    assert_eq!(reg.remove("c1", "t1").map(|h| h.id().to_string()), Some("t1".to_string()));
    assert!(reg.remove("c1", "t1").is_none());
    assert_eq!(reg.list_by_conversation("c1").len(), 1);

    reg.remove("c1", "t2");
    assert_eq!(reg.conversation_count(), 0);
}

#[test]
fn remove_all_drops_conversation() {
    let reg = TaskRegistry::new();
    reg.insert("c1", handle("t1", "c1", MonitorStatus::Running));
    reg.insert("c1", handle("t2", "c1", MonitorStatus::Triggered));
    reg.insert("c2", handle("t3", "c2", MonitorStatus::Running));

    assert_eq!(reg.remove_all("c1").len(), 2);
    assert!(reg.list_by_conversation("c1").is_empty());
    assert!(reg.remove_all("c1").is_empty());
    assert_eq!(reg.list_all().len(), 1);
}

#[test]
fn try_insert_counts_running_tasks_only() {
    let reg = TaskRegistry::new();
    reg.insert("c1", handle("t1", "c1", MonitorStatus::Running));
    reg.insert("c1", handle("t2", "c1", MonitorStatus::Expired));
    reg.insert("c1", handle("t3", "c1", MonitorStatus::Stopped));
    reg.insert("c1", handle("t4", "c1", MonitorStatus::Running));

    assert_eq!(reg.running_count("c1"), 2);
    assert!(reg.try_insert("c1", handle("t5", "c1", MonitorStatus::Running), 3));
    assert!(!reg.try_insert("c1", handle("t6", "c1", MonitorStatus::Running), 3));

    assert_eq!(reg.running_count("c1"), 3);
    assert_eq!(reg.list_by_conversation("c1").len(), 5);
}

#[test]
fn rejected_insert_leaves_no_empty_key() {
    let reg = TaskRegistry::new();
    assert!(!reg.try_insert("c1", handle("t1", "c1", MonitorStatus::Running), 0));
    assert_eq!(reg.conversation_count(), 0);
}

#[test]
fn snapshots_are_detached_from_the_registry() {
    let reg = TaskRegistry::new();
    reg.insert("c1", handle("t1", "c1", MonitorStatus::Running));

    let mut snap = reg.list_by_conversation("c1").remove(0);
    snap.status = MonitorStatus::Stopped;

    assert_eq!(reg.list_by_conversation("c1")[0].status, MonitorStatus::Running);
}
