//! Delivery adapters over in-memory transports

use std::sync::{Arc, Mutex};
use std::time::Duration;

use kodegen_ai_command::delivery::{CONNECTED_MESSAGE, INTERRUPT_ACK_MESSAGE};
use kodegen_ai_command::session::{EventSink, Session};
use kodegen_ai_command::{
    Attachment, CommandError, CommandId, CommandManager, CommandRecord, CommandResult,
    CommandStatus, CommandStore, ControlMessage, DeliveryConfig, EventKind, EventSender,
    LaunchSpec, ManagerConfig, MemoryStore, OutputStream, ProcessRequest, ProgressEvent, Result,
    run_duplex, run_push,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

fn attached_session(capacity: usize) -> (Arc<Session>, Attachment, EventSink) {
    let request = ProcessRequest {
        command: "true".to_string(),
        args: Vec::new(),
        working_dir: None,
    };
    let record = CommandRecord::queued_process(CommandId::parse("cmd_1_deliver0").unwrap(), &request);
    let session = Arc::new(Session::new(
        record,
        LaunchSpec::new("true", "/"),
        CommandResult::for_process("true"),
        "true",
        capacity,
    ));
    let (events, job) = session.take_pending().unwrap();
    let attachment = Attachment::new(Arc::clone(&session), events);
    (session, attachment, job.sink)
}

fn complete(session: &Session) -> ProgressEvent {
    ProgressEvent::complete(session.id(), CommandStatus::Completed, Some(0.1), "done")
}

async fn drain(rx: &mut mpsc::Receiver<ProgressEvent>) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

/// Sender that accepts `accept` events, then fails every write
struct FailingSender {
    accept: usize,
    written: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl EventSender for FailingSender {
    async fn send(&mut self, event: &ProgressEvent) -> Result<()> {
        let mut written = self.written.lock().unwrap();
        if written.len() >= self.accept {
            return Err(CommandError::transport("broken pipe"));
        }
        written.push(event.clone());
        Ok(())
    }
}

#[tokio::test]
async fn test_greeting_then_events_then_complete() {
    let (session, attachment, sink) = attached_session(8);
    let (tx, mut rx) = mpsc::channel(64);
    let (_ctrl_tx, ctrl_rx) = mpsc::channel::<ControlMessage>(4);

    let pump = tokio::spawn(run_duplex(attachment, tx, ctrl_rx, DeliveryConfig::duplex()));

    let producer = sink.producer(CancellationToken::new());
    assert!(producer.push(ProgressEvent::output(OutputStream::Stdout, "hello")).await);
    drop(producer);
    sink.finish(vec![ProgressEvent::result(CommandResult::for_process("true")), complete(&session)])
        .await;

    let report = pump.await.unwrap();
    let events = drain(&mut rx).await;

    assert_eq!(events.len(), 4);
    match &events[0].kind {
        EventKind::Status { data: Some(data), .. } => {
            assert_eq!(data.status, "connected");
            assert_eq!(data.message, CONNECTED_MESSAGE);
            assert_eq!(&data.command_id, session.id());
        }
        other => panic!("expected connected greeting, got {other:?}"),
    }
    assert_eq!(events[1].output_line().unwrap().line, "hello");
    assert_eq!(events[2].event_type(), "result");
    assert!(events[3].is_complete());

    assert!(report.completed);
    assert_eq!(report.delivered, 4);
    assert_eq!(report.keep_alives, 0);
}

#[tokio::test(start_paused = true)]
async fn test_keep_alive_when_idle() {
    let (session, attachment, sink) = attached_session(8);
    let (tx, mut rx) = mpsc::channel(64);
    let (_ctrl_tx, ctrl_rx) = mpsc::channel::<ControlMessage>(4);
    let config = DeliveryConfig::duplex().with_keep_alive(Duration::from_millis(30));

    let pump = tokio::spawn(run_duplex(attachment, tx, ctrl_rx, config));
    tokio::time::sleep(Duration::from_millis(95)).await;
    sink.finish(vec![complete(&session)]).await;

    let report = pump.await.unwrap();
    let events = drain(&mut rx).await;
    let kinds: Vec<&str> = events.iter().map(ProgressEvent::event_type).collect();

    assert_eq!(kinds, vec!["status", "ping", "ping", "ping", "complete"]);
    assert_eq!(report.keep_alives, 3);
}

#[tokio::test(start_paused = true)]
async fn test_keep_alive_suppressed_by_traffic() {
    let (session, attachment, sink) = attached_session(8);
    let (tx, mut rx) = mpsc::channel(64);
    let config = DeliveryConfig::push().with_keep_alive(Duration::from_millis(30));

    let pump = tokio::spawn(run_push(attachment, tx, config));
    for i in 0..5 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(sink.push(ProgressEvent::output(OutputStream::Stdout, i.to_string())).await);
    }
    sink.finish(vec![complete(&session)]).await;

    let report = pump.await.unwrap();
    let events = drain(&mut rx).await;
    assert!(events.iter().all(|e| e.event_type() != "ping"));
    assert_eq!(report.keep_alives, 0);
    assert_eq!(events.len(), 7);
}

#[tokio::test(start_paused = true)]
async fn test_no_keep_alive_after_complete() {
    let (session, attachment, sink) = attached_session(8);
    let (tx, mut rx) = mpsc::channel(64);
    let config = DeliveryConfig::push().with_keep_alive(Duration::from_millis(10));

    let pump = tokio::spawn(run_push(attachment, tx, config));
    sink.finish(vec![complete(&session)]).await;
    pump.await.unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    let events = drain(&mut rx).await;
    assert!(events.last().unwrap().is_complete());
    assert!(events.iter().all(|e| e.event_type() != "ping"));
}

#[tokio::test]
async fn test_interrupt_and_ping_relay() {
    let (session, attachment, sink) = attached_session(8);
    let (tx, mut rx) = mpsc::channel(64);
    let (ctrl_tx, ctrl_rx) = mpsc::channel(4);

    let pump = tokio::spawn(run_duplex(attachment, tx, ctrl_rx, DeliveryConfig::duplex()));

    rx.recv().await.unwrap();
    ctrl_tx.send(ControlMessage::Ping).await.unwrap();
    assert_eq!(rx.recv().await.unwrap().event_type(), "ping");

    ctrl_tx.send(ControlMessage::Interrupt).await.unwrap();
    match rx.recv().await.unwrap().kind {
        EventKind::Status { message, .. } => {
            assert_eq!(message.as_deref(), Some(INTERRUPT_ACK_MESSAGE));
        }
        other => panic!("expected interrupt acknowledgement, got {other:?}"),
    }
    assert!(session.is_cancelled());

    // Repeated interrupts stay harmless
    ctrl_tx.send(ControlMessage::Interrupt).await.unwrap();
    rx.recv().await.unwrap();

    sink.finish(vec![ProgressEvent::complete(
        session.id(),
        CommandStatus::Interrupted,
        None,
        "Command was interrupted",
    )])
    .await;
    let report = pump.await.unwrap();
    assert!(report.completed);
    assert_eq!(report.interrupts, 2);
}

#[tokio::test]
async fn test_transport_failure_keeps_draining() {
    let (session, attachment, sink) = attached_session(2);
    let written = Arc::new(Mutex::new(Vec::new()));
    let sender = FailingSender {
        accept: 1,
        written: Arc::clone(&written),
    };
    let (_ctrl_tx, ctrl_rx) = mpsc::channel::<ControlMessage>(4);

    let pump = tokio::spawn(run_duplex(attachment, sender, ctrl_rx, DeliveryConfig::duplex()));

    let producer = sink.producer(session.cancel_token());
    let pushes = async {
        for i in 0..20 {
            assert!(producer.push(ProgressEvent::output(OutputStream::Stdout, i.to_string())).await);
        }
    };
    tokio::time::timeout(Duration::from_secs(2), pushes)
        .await
        .expect("producer blocked after the client went away");
    drop(producer);
    sink.finish(vec![complete(&session)]).await;

    let report = pump.await.unwrap();
    assert!(report.completed);
    assert_eq!(report.transport_error.as_deref(), Some("Transport error: broken pipe"));
    assert_eq!(report.delivered, 1);
    assert!(report.discarded >= 20);
    assert!(!session.is_cancelled());
    assert_eq!(written.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_client_close_does_not_cancel() {
    let (session, attachment, sink) = attached_session(2);
    let (tx, mut rx) = mpsc::channel(64);
    let (ctrl_tx, ctrl_rx) = mpsc::channel::<ControlMessage>(4);

    let pump = tokio::spawn(run_duplex(attachment, tx, ctrl_rx, DeliveryConfig::duplex()));
    rx.recv().await.unwrap();
    drop(ctrl_tx);

    let producer = sink.producer(session.cancel_token());
    for i in 0..10 {
        assert!(producer.push(ProgressEvent::output(OutputStream::Stdout, i.to_string())).await);
    }
    drop(producer);
    sink.finish(vec![complete(&session)]).await;

    let report = pump.await.unwrap();
    assert!(report.client_closed);
    assert!(report.completed);
    assert!(!session.is_cancelled());
}

#[tokio::test]
async fn test_push_only_stream_end_to_end() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempfile::tempdir().unwrap();
    let manager = CommandManager::new(
        Arc::new(MemoryStore::new()) as Arc<dyn CommandStore>,
        ManagerConfig::default()
            .with_workspace_dir(dir.path())
            .with_custom_commands(true),
    );
    let id = manager
        .submit_process(ProcessRequest {
            command: "sh".to_string(),
            args: vec!["-c".to_string(), "echo one; echo two".to_string()],
            working_dir: None,
        })
        .await
        .unwrap();

    let (tx, mut rx) = mpsc::channel(64);
    let report = tokio::time::timeout(
        Duration::from_secs(10),
        run_push(manager.attach(&id).unwrap(), tx, DeliveryConfig::push()),
    )
    .await
    .unwrap();
    let events = drain(&mut rx).await;

    assert!(report.completed);
    let lines: Vec<_> = events
        .iter()
        .filter_map(|e| e.output_line())
        .map(|l| l.line.as_str())
        .collect();
    assert_eq!(lines, vec!["one", "two"]);
    assert_eq!(
        events.last().unwrap().completion_status(),
        Some(CommandStatus::Completed)
    );
}
