use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

use dfsend::core::SendFileError;
use dfsend::{EventKind, Transport, TransferRequest, TransferResult, TransferSessionManager, err_code};

/// Transport whose completions are released by the test, keyed by device id.
/// Lets tests decide the order in which concurrent sessions finish.
struct GatedTransport {
    gates: Mutex<HashMap<String, oneshot::Receiver<Result<(), SendFileError>>>>,
}

impl GatedTransport {
    fn new() -> (Arc<Self>, GateControl) {
        let transport = Arc::new(Self {
            gates: Mutex::new(HashMap::new()),
        });
        (Arc::clone(&transport), GateControl { transport })
    }
}

struct GateControl {
    transport: Arc<GatedTransport>,
}

impl GateControl {
    /// Arm a gate for `device`; the returned sender releases the transfer.
    fn arm(&self, device: &str) -> oneshot::Sender<Result<(), SendFileError>> {
        let (tx, rx) = oneshot::channel();
        self.transport
            .gates
            .lock()
            .unwrap()
            .insert(device.to_string(), rx);
        tx
    }
}

#[async_trait]
impl Transport for GatedTransport {
    async fn send(&self, request: &TransferRequest) -> Result<(), SendFileError> {
        let gate = self
            .gates
            .lock()
            .unwrap()
            .remove(request.device_id.as_str());
        match gate {
            Some(rx) => rx.await.unwrap_or(Ok(())),
            None => Ok(()),
        }
    }
}

fn request_for(device: &str) -> TransferRequest {
    TransferRequest::new(
        device,
        vec!["/a.txt".to_string()],
        vec!["/b.txt".to_string()],
        1,
    )
}

#[tokio::test]
async fn successful_send_resolves_zero_and_emits_once() {
    let (transport, _control) = GatedTransport::new();
    let manager = TransferSessionManager::new(transport);

    let events: Arc<Mutex<Vec<TransferResult>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    manager.subscribe(EventKind::SendFinished, move |result| {
        sink.lock().unwrap().push(result.clone());
    });

    let handle = manager.initiate(request_for("dev-1")).unwrap();
    assert_eq!(handle.wait().await, 0);

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 1, "exactly one completion event per session");
    assert_eq!(events[0], TransferResult::sent(1));
    assert!(events[0].file_names.is_empty(), "sender side has no file list");
}

#[tokio::test]
async fn validation_failure_is_synchronous_and_silent() {
    let (transport, _control) = GatedTransport::new();
    let manager = TransferSessionManager::new(transport);

    let fired = Arc::new(Mutex::new(0usize));
    let sink = Arc::clone(&fired);
    manager.subscribe(EventKind::SendFinished, move |_| {
        *sink.lock().unwrap() += 1;
    });

    // Two sources, one destination, declared count two.
    let bad = TransferRequest::new(
        "dev-1",
        vec!["/a.txt".to_string(), "/b.txt".to_string()],
        vec!["/x.txt".to_string()],
        2,
    );
    let err = manager.initiate(bad).unwrap_err();
    assert!(err.is_validation());

    // Give any stray task a chance to run before asserting silence.
    tokio::task::yield_now().await;
    assert_eq!(*fired.lock().unwrap(), 0, "no event for a rejected request");
}

#[tokio::test]
async fn transport_failure_surfaces_code_through_both_channels() {
    let (transport, control) = GatedTransport::new();
    let manager = TransferSessionManager::new(transport);

    let events: Arc<Mutex<Vec<TransferResult>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    manager.subscribe(EventKind::SendFinished, move |result| {
        sink.lock().unwrap().push(result.clone());
    });

    let gate = control.arm("dev-1");
    let handle = manager.initiate(request_for("dev-1")).unwrap();
    gate.send(Err(SendFileError::Interrupted("link reset".into())))
        .unwrap();

    assert_eq!(handle.wait().await, err_code::INTERRUPTED);

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].err_code, err_code::INTERRUPTED);
}

#[tokio::test]
async fn concurrent_sessions_deliver_in_completion_order() {
    let (transport, control) = GatedTransport::new();
    let manager = TransferSessionManager::new(transport);

    let finish_order: Arc<Mutex<Vec<i32>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&finish_order);
    manager.subscribe(EventKind::SendFinished, move |result| {
        sink.lock().unwrap().push(result.err_code);
    });

    let gate_a = control.arm("dev-a");
    let gate_b = control.arm("dev-b");

    let handle_a = manager.initiate(request_for("dev-a")).unwrap();
    let handle_b = manager.initiate(request_for("dev-b")).unwrap();

    // Release B first, then A: completion order is the reverse of initiation.
    gate_b
        .send(Err(SendFileError::DeviceUnreachable("dev-b".into())))
        .unwrap();
    assert_eq!(handle_b.wait().await, err_code::DEVICE_UNREACHABLE);

    gate_a.send(Ok(())).unwrap();
    assert_eq!(handle_a.wait().await, err_code::NO_ERROR);

    assert_eq!(
        *finish_order.lock().unwrap(),
        vec![err_code::DEVICE_UNREACHABLE, err_code::NO_ERROR],
        "one listener sees both sessions in the order they actually finished"
    );
}

#[tokio::test]
async fn callback_and_future_styles_agree() {
    let (transport, control) = GatedTransport::new();
    let manager = TransferSessionManager::new(transport);

    let gate = control.arm("dev-cb");
    let (tx, rx) = oneshot::channel();
    manager
        .initiate_with_callback(request_for("dev-cb"), move |code| {
            let _ = tx.send(code);
        })
        .unwrap();
    gate.send(Ok(())).unwrap();
    let callback_code = rx.await.unwrap();

    let future_code = manager.initiate(request_for("dev-fut")).unwrap().wait().await;

    assert_eq!(callback_code, err_code::NO_ERROR);
    assert_eq!(callback_code, future_code);
}

#[tokio::test]
async fn inbound_reports_emit_receive_finished() {
    let (transport, _control) = GatedTransport::new();
    let manager = TransferSessionManager::new(transport);

    let (event_tx, mut event_rx) = tokio::sync::mpsc::unbounded_channel();
    manager.subscribe(EventKind::ReceiveFinished, move |result| {
        let _ = event_tx.send(result.clone());
    });

    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
    manager.spawn_inbound_pump(rx);

    tx.send(TransferResult::received(vec!["/recv/a.txt".to_string()]))
        .unwrap();

    let event = tokio::time::timeout(std::time::Duration::from_secs(2), event_rx.recv())
        .await
        .expect("receiveFinished should be delivered")
        .unwrap();

    assert_eq!(event.err_code, 0);
    assert_eq!(event.file_names, vec!["/recv/a.txt".to_string()]);
    assert_eq!(event.file_count, 1);
}

#[tokio::test]
async fn unsubscribing_send_listeners_leaves_receive_listeners() {
    let (transport, _control) = GatedTransport::new();
    let manager = TransferSessionManager::new(transport);

    let send_hits = Arc::new(Mutex::new(0usize));
    let recv_hits = Arc::new(Mutex::new(0usize));

    let sink = Arc::clone(&send_hits);
    manager.subscribe(EventKind::SendFinished, move |_| {
        *sink.lock().unwrap() += 1;
    });
    let sink = Arc::clone(&recv_hits);
    manager.subscribe(EventKind::ReceiveFinished, move |_| {
        *sink.lock().unwrap() += 1;
    });

    manager.unsubscribe(EventKind::SendFinished, None);

    let handle = manager.initiate(request_for("dev-1")).unwrap();
    handle.wait().await;
    manager.report_received(TransferResult::received(vec!["/r.txt".to_string()]));

    assert_eq!(*send_hits.lock().unwrap(), 0);
    assert_eq!(*recv_hits.lock().unwrap(), 1);
}
