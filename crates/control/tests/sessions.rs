use calc_control::SessionRegistry;
use calc_models::{CalcError, JsonRpcResponse};
use serde_json::json;

fn response(id: i64) -> JsonRpcResponse {
    JsonRpcResponse::success(json!(id), json!({"result": id}))
}

#[tokio::test]
async fn delivers_in_order() {
    let sessions = SessionRegistry::new(8);
    let (guard, mut rx) = sessions.register(Some("client-a".into()));
    assert_eq!(guard.client_id(), "client-a");

    sessions.deliver("client-a", response(1)).unwrap();
    sessions.deliver("client-a", response(2)).unwrap();

    assert_eq!(rx.recv().await.unwrap().id, json!(1));
    assert_eq!(rx.recv().await.unwrap().id, json!(2));
}

#[tokio::test]
async fn generates_ids_when_missing() {
    let sessions = SessionRegistry::new(8);
    let (first, _rx1) = sessions.register(None);
    let (second, _rx2) = sessions.register(Some(String::new()));
    assert_eq!(first.client_id().len(), 36);
    assert_ne!(first.client_id(), second.client_id());
    assert_eq!(sessions.len(), 2);
}

#[tokio::test]
async fn unknown_client_is_not_connected() {
    let sessions = SessionRegistry::new(8);
    assert_eq!(
        sessions.deliver("ghost", response(1)),
        Err(CalcError::ClientNotConnected {
            client_id: "ghost".into()
        })
    );
}

#[tokio::test]
async fn full_queue_is_reported() {
    let sessions = SessionRegistry::new(1);
    let (_guard, _rx) = sessions.register(Some("slow".into()));
    sessions.deliver("slow", response(1)).unwrap();
    assert!(matches!(
        sessions.deliver("slow", response(2)),
        Err(CalcError::SessionQueueFull { .. })
    ));
}

#[tokio::test]
async fn dropping_guard_unregisters() {
    let sessions = SessionRegistry::new(8);
    let (guard, _rx) = sessions.register(Some("gone".into()));
    assert!(sessions.is_connected("gone"));
    drop(guard);
    assert!(!sessions.is_connected("gone"));
    assert!(sessions.is_empty());
}

#[tokio::test]
async fn closed_receiver_unregisters_on_delivery() {
    let sessions = SessionRegistry::new(8);
    let (_guard, rx) = sessions.register(Some("closed".into()));
    drop(rx);
    assert!(matches!(
        sessions.deliver("closed", response(1)),
        Err(CalcError::ClientNotConnected { .. })
    ));
    assert!(!sessions.is_connected("closed"));
}

#[tokio::test]
async fn reconnect_replaces_previous_session() {
    let sessions = SessionRegistry::new(8);
    let (old_guard, mut old_rx) = sessions.register(Some("dup".into()));
    let (_new_guard, mut new_rx) = sessions.register(Some("dup".into()));

    // The old stream sees its channel close.
    assert!(old_rx.recv().await.is_none());

    // Dropping the stale guard must not evict the new session.
    drop(old_guard);
    assert!(sessions.is_connected("dup"));

    sessions.deliver("dup", response(7)).unwrap();
    assert_eq!(new_rx.recv().await.unwrap().id, json!(7));
}

#[tokio::test]
async fn status_lists_sorted_clients() {
    let sessions = SessionRegistry::new(8);
    let (_b, _rb) = sessions.register(Some("bravo".into()));
    let (_a, _ra) = sessions.register(Some("alpha".into()));
    let status = sessions.status();
    assert_eq!(status.active_connections, 2);
    assert_eq!(status.connected_clients, vec!["alpha", "bravo"]);
    assert!(status.timestamp > 0.0);
}
