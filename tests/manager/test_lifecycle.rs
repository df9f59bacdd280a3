//! Lifecycle controller scenarios driven through the command manager

use std::io;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use kodegen_ai_command::launcher::ProcessExit;
use kodegen_ai_command::types::CommandContext;
use kodegen_ai_command::{
    CommandError, CommandId, CommandManager, CommandRequest, CommandStatus, CommandStore,
    EventKind, InterruptOutcome, ManagerConfig, MemoryStore, ProcessRequest, ProgressEvent,
    SessionOutcome, decide_outcome,
};
use kodegen_ai_command::{CommandRecord, Result};

/// Store that pauses the first terminal-status save until released
#[derive(Default)]
struct GatedStore {
    inner: MemoryStore,
    entered: Notify,
    release: Notify,
}

#[async_trait]
impl CommandStore for GatedStore {
    async fn create(&self, record: &CommandRecord) -> Result<()> {
        self.inner.create(record).await
    }

    async fn save(&self, record: &CommandRecord) -> Result<()> {
        if record.status.is_terminal() {
            self.entered.notify_one();
            self.release.notified().await;
        }
        self.inner.save(record).await
    }

    async fn get(&self, id: &CommandId) -> Result<CommandRecord> {
        self.inner.get(id).await
    }
}

struct Harness {
    manager: CommandManager,
    store: Arc<MemoryStore>,
    _dir: tempfile::TempDir,
}

fn harness(configure: impl FnOnce(ManagerConfig) -> ManagerConfig) -> Harness {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(MemoryStore::new());
    let config = configure(
        ManagerConfig::default()
            .with_workspace_dir(dir.path())
            .with_custom_commands(true)
            .with_sweep_interval(Duration::from_secs(3600)),
    );
    let manager = CommandManager::new(Arc::clone(&store) as Arc<dyn CommandStore>, config);
    Harness {
        manager,
        store,
        _dir: dir,
    }
}

fn shell(script: &str) -> ProcessRequest {
    ProcessRequest {
        command: "sh".to_string(),
        args: vec!["-c".to_string(), script.to_string()],
        working_dir: None,
    }
}

fn ai_request(prompt: &str) -> CommandRequest {
    CommandRequest {
        prompt: prompt.to_string(),
        scope: "current-page".to_string(),
        context: CommandContext {
            page: "home".to_string(),
            ..CommandContext::default()
        },
    }
}

/// Events other than status messages
fn significant(events: &[ProgressEvent]) -> Vec<&ProgressEvent> {
    events
        .iter()
        .filter(|e| !matches!(e.kind, EventKind::Status { .. }))
        .collect()
}

fn assert_single_final_complete(events: &[ProgressEvent]) {
    let completes = events.iter().filter(|e| e.is_complete()).count();
    assert_eq!(completes, 1, "expected exactly one complete event: {events:?}");
    assert!(events.last().unwrap().is_complete());
    if let Some(pos) = events.iter().position(|e| e.event_type() == "result") {
        assert_eq!(pos, events.len() - 2, "result must directly precede complete");
    }
}

async fn run_to_end(manager: &CommandManager, id: &CommandId) -> Vec<ProgressEvent> {
    let attachment = manager.attach(id).unwrap();
    tokio::time::timeout(Duration::from_secs(10), attachment.collect())
        .await
        .expect("session did not finish")
}

async fn wait_removed(manager: &CommandManager, id: &CommandId) {
    for _ in 0..200 {
        if manager.registry().lookup(id).is_none() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("session {id} was never removed from the registry");
}

#[tokio::test]
async fn test_successful_run() {
    let h = harness(|c| c);
    let id = h.manager.submit_process(shell("echo line1; echo line2")).await.unwrap();
    assert_eq!(h.store.get(&id).await.unwrap().status, CommandStatus::Queued);

    let events = run_to_end(&h.manager, &id).await;
    assert_single_final_complete(&events);

    let significant = significant(&events);
    assert_eq!(significant.len(), 4, "{events:?}");
    assert_eq!(significant[0].output_line().unwrap().line, "line1");
    assert_eq!(significant[1].output_line().unwrap().line, "line2");
    assert_eq!(significant[2].event_type(), "result");
    assert_eq!(significant[3].completion_status(), Some(CommandStatus::Completed));

    let record = h.store.get(&id).await.unwrap();
    assert_eq!(record.status, CommandStatus::Completed);
    assert!(record.decoded_result().is_some());
    assert!(record.error_message.is_none());
    assert!(record.completed_at.is_some());

    wait_removed(&h.manager, &id).await;
}

#[tokio::test]
async fn test_ai_command_runs_configured_executable() {
    let h = harness(|c| {
        c.with_executable("sh")
            .with_executable_args(vec!["-c".to_string(), "echo \"$1\"".to_string(), "sh".to_string()])
    });
    let id = h.manager.submit(ai_request("Add a footer")).await.unwrap();

    let events = run_to_end(&h.manager, &id).await;
    let lines: Vec<_> = events.iter().filter_map(|e| e.output_line()).collect();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].line, "Scope: current-page | Page: home | Task: Add a footer");

    match &significant(&events)[1].kind {
        EventKind::Result { data } => {
            assert_eq!(data.action, "Executed command for home");
            assert_eq!(data.affected_pages, vec!["home".to_string()]);
        }
        other => panic!("expected result, got {other:?}"),
    }
}

#[tokio::test]
async fn test_interrupt_after_start() {
    let h = harness(|c| c);
    let id = h
        .manager
        .submit_process(shell("echo started; exec sleep 30"))
        .await
        .unwrap();

    let mut attachment = h.manager.attach(&id).unwrap();
    assert_eq!(h.manager.interrupt(&id).await.unwrap(), InterruptOutcome::Requested);

    let mut events = Vec::new();
    while let Some(event) =
        tokio::time::timeout(Duration::from_secs(5), attachment.next_event())
            .await
            .expect("interrupt did not stop the session")
    {
        events.push(event);
    }

    assert_single_final_complete(&events);
    assert!(events.iter().all(|e| e.event_type() != "result"));
    assert_eq!(
        events.last().unwrap().completion_status(),
        Some(CommandStatus::Interrupted)
    );

    let record = h.store.get(&id).await.unwrap();
    assert_eq!(record.status, CommandStatus::Interrupted);
    assert!(record.result.is_none());
}

#[tokio::test]
async fn test_interrupt_while_running_output() {
    let h = harness(|c| c);
    let id = h
        .manager
        .submit_process(shell("echo first; exec sleep 30"))
        .await
        .unwrap();
    let mut attachment = h.manager.attach(&id).unwrap();

    // Wait for the process to be producing output before interrupting
    loop {
        let event = attachment.next_event().await.unwrap();
        if event.output_line().is_some_and(|l| l.line == "first") {
            break;
        }
    }
    assert_eq!(h.manager.status(&id).await.unwrap().status, CommandStatus::Processing);
    assert_eq!(h.manager.interrupt(&id).await.unwrap(), InterruptOutcome::Requested);

    let rest = tokio::time::timeout(Duration::from_secs(5), attachment.collect())
        .await
        .unwrap();
    let last_two: Vec<_> = rest.iter().rev().take(2).collect();
    assert!(last_two[0].is_complete());
    assert_eq!(last_two[0].completion_status(), Some(CommandStatus::Interrupted));
    assert!(matches!(
        &last_two[1].kind,
        EventKind::Status { message: Some(m), .. } if m == "Command was interrupted"
    ));
}

#[tokio::test]
async fn test_interrupt_before_attach() {
    let h = harness(|c| c);
    let id = h.manager.submit_process(shell("echo never")).await.unwrap();
    assert_eq!(h.manager.interrupt(&id).await.unwrap(), InterruptOutcome::Requested);

    // Finished immediately, without waiting for a client or the sweep
    let record = h.manager.status(&id).await.unwrap();
    assert_eq!(record.status, CommandStatus::Interrupted);
    assert!(record.completed_at.is_some());
    assert!(record.error_message.is_none());
    assert!(h.manager.registry().lookup(&id).is_none());

    assert!(matches!(
        h.manager.attach(&id),
        Err(CommandError::SessionNotFound(_))
    ));
    assert_eq!(
        h.manager.interrupt(&id).await.unwrap(),
        InterruptOutcome::AlreadyFinished
    );
}

#[tokio::test]
async fn test_interrupt_after_clean_exit_with_descendant_holding_pipe() {
    let h = harness(|c| c);
    let id = h
        .manager
        .submit_process(shell("echo hi; sleep 30 & exit 0"))
        .await
        .unwrap();
    let mut attachment = h.manager.attach(&id).unwrap();

    loop {
        let event = tokio::time::timeout(Duration::from_secs(5), attachment.next_event())
            .await
            .unwrap()
            .unwrap();
        if event.output_line().is_some_and(|l| l.line == "hi") {
            break;
        }
    }
    // The shell has exited; the background sleep still holds both pipes
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(h.manager.interrupt(&id).await.is_ok());

    let events = tokio::time::timeout(Duration::from_secs(5), attachment.collect())
        .await
        .expect("interrupt did not release the drains");
    assert_single_final_complete(&events);
    assert_eq!(
        events.last().unwrap().completion_status(),
        Some(CommandStatus::Completed)
    );
    assert_eq!(h.store.get(&id).await.unwrap().status, CommandStatus::Completed);
}

#[tokio::test]
async fn test_interrupt_while_persisting_final_status() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(GatedStore::default());
    let manager = CommandManager::new(
        Arc::clone(&store) as Arc<dyn CommandStore>,
        ManagerConfig::default()
            .with_workspace_dir(dir.path())
            .with_custom_commands(true),
    );
    let id = manager.submit_process(shell("echo done")).await.unwrap();
    let attachment = manager.attach(&id).unwrap();
    let events = tokio::spawn(attachment.collect());

    tokio::time::timeout(Duration::from_secs(5), store.entered.notified())
        .await
        .expect("terminal status was never persisted");
    assert_eq!(
        manager.interrupt(&id).await.unwrap(),
        InterruptOutcome::AlreadyFinished
    );
    store.release.notify_one();

    let events = tokio::time::timeout(Duration::from_secs(5), events)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        events.last().unwrap().completion_status(),
        Some(CommandStatus::Completed)
    );
}

#[tokio::test]
async fn test_missing_executable() {
    let h = harness(|c| c);
    let request = ProcessRequest {
        command: "definitely-not-installed-9000".to_string(),
        args: Vec::new(),
        working_dir: None,
    };
    let id = h.manager.submit_process(request).await.unwrap();

    let events = run_to_end(&h.manager, &id).await;
    assert_eq!(events.len(), 2, "{events:?}");
    assert_eq!(events[0].event_type(), "error");
    assert_eq!(events[1].completion_status(), Some(CommandStatus::Failed));

    let record = h.store.get(&id).await.unwrap();
    assert_eq!(record.status, CommandStatus::Failed);
    assert!(!record.error_message.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_missing_working_directory() {
    let h = harness(|c| c);
    let mut request = shell("echo hi");
    request.working_dir = Some("/definitely/not/here".into());
    let id = h.manager.submit_process(request).await.unwrap();

    let events = run_to_end(&h.manager, &id).await;
    assert_eq!(events.len(), 2);
    match &events[0].kind {
        EventKind::Error { message, .. } => assert!(message.contains("/definitely/not/here")),
        other => panic!("expected error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_nonzero_exit() {
    let h = harness(|c| c);
    let id = h
        .manager
        .submit_process(shell("echo partial; echo bad >&2; exit 3"))
        .await
        .unwrap();

    let events = run_to_end(&h.manager, &id).await;
    assert_single_final_complete(&events);
    assert!(events.iter().all(|e| e.event_type() != "result"));

    let n = events.len();
    match &events[n - 2].kind {
        EventKind::Error { message, .. } => assert!(message.contains("exit code 3")),
        other => panic!("expected error before complete, got {other:?}"),
    }
    assert_eq!(events[n - 1].completion_status(), Some(CommandStatus::Failed));

    let stderr: Vec<_> = events
        .iter()
        .filter_map(|e| e.output_line())
        .filter(|l| l.stream == kodegen_ai_command::OutputStream::Stderr)
        .collect();
    assert_eq!(stderr.len(), 1);
    assert_eq!(stderr[0].line, "bad");

    let record = h.store.get(&id).await.unwrap();
    assert_eq!(record.status, CommandStatus::Failed);
    assert!(record.error_message.unwrap().contains("exit code 3"));
}

#[tokio::test]
async fn test_concurrent_sessions_do_not_mix() {
    let h = harness(|c| c);
    let script = |tag: &str| format!("for i in 1 2 3 4 5 6 7 8; do echo {tag}$i; done");
    let a = h.manager.submit_process(shell(&script("A"))).await.unwrap();
    let b = h.manager.submit_process(shell(&script("B"))).await.unwrap();

    let (events_a, events_b) = tokio::join!(run_to_end(&h.manager, &a), run_to_end(&h.manager, &b));

    for (events, tag, id) in [(&events_a, "A", &a), (&events_b, "B", &b)] {
        assert_single_final_complete(events);
        let lines: Vec<String> = events
            .iter()
            .filter_map(|e| e.output_line())
            .map(|l| l.line.clone())
            .collect();
        let expected: Vec<String> = (1..=8).map(|i| format!("{tag}{i}")).collect();
        assert_eq!(lines, expected);
        match &events.last().unwrap().kind {
            EventKind::Complete { data, .. } => assert_eq!(&data.command_id, id),
            other => panic!("expected complete, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_interrupt_after_completion_is_benign() {
    let h = harness(|c| c);
    let id = h.manager.submit_process(shell("true")).await.unwrap();
    run_to_end(&h.manager, &id).await;

    assert_eq!(
        h.manager.interrupt(&id).await.unwrap(),
        InterruptOutcome::AlreadyFinished
    );
    wait_removed(&h.manager, &id).await;
    assert_eq!(
        h.manager.interrupt(&id).await.unwrap(),
        InterruptOutcome::AlreadyFinished
    );
    assert_eq!(h.store.get(&id).await.unwrap().status, CommandStatus::Completed);
}

#[tokio::test]
async fn test_interrupt_unknown_session() {
    let h = harness(|c| c);
    let id = CommandId::parse("cmd_0_unknown0").unwrap();
    assert!(matches!(
        h.manager.interrupt(&id).await,
        Err(CommandError::SessionNotFound(_))
    ));
}

#[tokio::test]
async fn test_second_attach_rejected() {
    let h = harness(|c| c);
    let id = h.manager.submit_process(shell("exec sleep 30")).await.unwrap();
    let attachment = h.manager.attach(&id).unwrap();

    assert!(matches!(
        h.manager.attach(&id),
        Err(CommandError::AlreadyAttached(_))
    ));

    h.manager.interrupt(&id).await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), attachment.collect())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_exit_racing_interrupt() {
    let h = harness(|c| c);
    for delay in 0..10 {
        let id = h.manager.submit_process(shell("seq 1 50")).await.unwrap();
        let attachment = h.manager.attach(&id).unwrap();
        tokio::time::sleep(Duration::from_millis(delay)).await;
        let outcome = h.manager.interrupt(&id).await;
        assert!(outcome.is_ok());

        let events = tokio::time::timeout(Duration::from_secs(5), attachment.collect())
            .await
            .unwrap();
        assert_single_final_complete(&events);

        let status = events.last().unwrap().completion_status().unwrap();
        let has_result = events.iter().any(|e| e.event_type() == "result");
        let lines = events.iter().filter(|e| e.output_line().is_some()).count();
        match status {
            // A completed run never loses trailing output
            CommandStatus::Completed => {
                assert!(has_result);
                assert_eq!(lines, 50);
            }
            CommandStatus::Interrupted => assert!(!has_result),
            other => panic!("unexpected terminal status {other}"),
        }
        assert_eq!(h.store.get(&id).await.unwrap().status, status);
    }
}

#[test]
fn test_outcome_arbitration() {
    let clean = ProcessExit {
        code: Some(0),
        cancelled: false,
    };
    let killed = ProcessExit {
        code: None,
        cancelled: true,
    };
    let failed = ProcessExit {
        code: Some(2),
        cancelled: false,
    };

    // Cancellation requested before the exit was observed wins, even over a clean exit
    assert_eq!(decide_outcome(true, &Ok(clean), None), SessionOutcome::Interrupted);
    assert_eq!(decide_outcome(true, &Ok(failed), None), SessionOutcome::Interrupted);
    assert_eq!(decide_outcome(false, &Ok(killed), None), SessionOutcome::Interrupted);

    assert_eq!(decide_outcome(false, &Ok(clean), None), SessionOutcome::Completed);
    assert_eq!(
        decide_outcome(false, &Ok(failed), None),
        SessionOutcome::Failed("Process exited with exit code 2".to_string())
    );
    assert!(matches!(
        decide_outcome(false, &Ok(clean), Some(CommandError::stream("stdout", "broken"))),
        SessionOutcome::Failed(m) if m.contains("broken")
    ));
    assert!(matches!(
        decide_outcome(false, &Err(io::Error::other("wait failed")), None),
        SessionOutcome::Failed(_)
    ));
    assert_eq!(SessionOutcome::Interrupted.status(), CommandStatus::Interrupted);
}

#[tokio::test]
async fn test_full_queue_does_not_block_interrupt() {
    let h = harness(|c| c.with_queue_capacity(2));
    let script = "i=0; while [ $i -lt 2000 ]; do echo $i; i=$((i+1)); done; exec sleep 30";
    let id = h.manager.submit_process(shell(script)).await.unwrap();

    let attachment = h.manager.attach(&id).unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(h.manager.interrupt(&id).await.unwrap(), InterruptOutcome::Requested);

    let events = tokio::time::timeout(Duration::from_secs(5), attachment.collect())
        .await
        .expect("blocked producers deadlocked the session");
    assert_single_final_complete(&events);
    assert_eq!(
        events.last().unwrap().completion_status(),
        Some(CommandStatus::Interrupted)
    );
    assert!(events.iter().filter(|e| e.output_line().is_some()).count() < 2000);
}

#[tokio::test]
async fn test_detached_client_does_not_stop_session() {
    let h = harness(|c| c.with_queue_capacity(1));
    let id = h
        .manager
        .submit_process(shell("for i in 1 2 3 4 5; do echo $i; done"))
        .await
        .unwrap();

    drop(h.manager.attach(&id).unwrap());
    wait_removed(&h.manager, &id).await;

    assert_eq!(h.store.get(&id).await.unwrap().status, CommandStatus::Completed);
}

#[tokio::test]
async fn test_submission_validation() {
    let h = harness(|c| c);
    let mut request = ai_request("  ");
    assert!(matches!(h.manager.submit(request.clone()).await, Err(CommandError::MissingPrompt)));
    request.prompt = "ok".to_string();
    request.scope = "galaxy".to_string();
    assert!(matches!(h.manager.submit(request).await, Err(CommandError::InvalidScope(_))));

    assert!(matches!(
        h.manager.submit_process(ProcessRequest {
            command: " ".to_string(),
            args: Vec::new(),
            working_dir: None,
        })
        .await,
        Err(CommandError::InvalidRequest(_))
    ));
    assert!(h.manager.registry().is_empty());
    assert!(h.store.is_empty().await);
}

#[tokio::test]
async fn test_custom_commands_disabled() {
    let h = harness(|c| c.with_custom_commands(false));
    assert!(matches!(
        h.manager.submit_process(shell("true")).await,
        Err(CommandError::Forbidden(_))
    ));
}

#[tokio::test]
async fn test_sessions_listing() {
    let h = harness(|c| c);
    let first = h.manager.submit_process(shell("exec sleep 30")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = h.manager.submit(ai_request("hello")).await.unwrap();

    let sessions = h.manager.list_sessions();
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].command_id, second);
    assert_eq!(sessions[1].command_id, first);
    assert!(sessions.iter().all(|s| s.status == CommandStatus::Queued && !s.attached));
    assert_eq!(sessions[1].label, "sh -c exec sleep 30");

    let attachment = h.manager.attach(&first).unwrap();
    assert!(h.manager.session_info(&first).unwrap().attached);

    h.manager.interrupt(&first).await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), attachment.collect())
        .await
        .unwrap();
    wait_removed(&h.manager, &first).await;
    assert!(matches!(
        h.manager.session_info(&first),
        Err(CommandError::SessionNotFound(_))
    ));
}

#[tokio::test]
async fn test_sweep_abandons_unattached_sessions() {
    let h = harness(|c| c.with_queued_session_ttl(Duration::ZERO));
    let idle = h.manager.submit_process(shell("true")).await.unwrap();
    let cancelled = h.manager.submit_process(shell("true")).await.unwrap();
    h.manager.interrupt(&cancelled).await.unwrap();

    // The interrupted one was already finished by the interrupt
    assert_eq!(h.manager.sweep_abandoned().await, 1);
    assert!(h.manager.registry().is_empty());

    let record = h.store.get(&idle).await.unwrap();
    assert_eq!(record.status, CommandStatus::Failed);
    assert!(record.error_message.is_some());
    assert_eq!(
        h.store.get(&cancelled).await.unwrap().status,
        CommandStatus::Interrupted
    );
    assert!(matches!(
        h.manager.attach(&idle),
        Err(CommandError::SessionNotFound(_))
    ));
}

#[tokio::test]
async fn test_sweep_keeps_fresh_sessions() {
    let h = harness(|c| c.with_queued_session_ttl(Duration::from_secs(600)));
    h.manager.submit_process(shell("true")).await.unwrap();
    assert_eq!(h.manager.sweep_abandoned().await, 0);
    assert_eq!(h.manager.registry().len(), 1);
}

#[tokio::test]
async fn test_shutdown_interrupts_everything() {
    let h = harness(|c| c);
    let running = h.manager.submit_process(shell("exec sleep 30")).await.unwrap();
    let queued = h.manager.submit_process(shell("true")).await.unwrap();
    let attachment = h.manager.attach(&running).unwrap();

    assert_eq!(h.manager.shutdown().await, 2);

    let events = tokio::time::timeout(Duration::from_secs(5), attachment.collect())
        .await
        .unwrap();
    assert_eq!(
        events.last().unwrap().completion_status(),
        Some(CommandStatus::Interrupted)
    );
    assert_eq!(h.store.get(&queued).await.unwrap().status, CommandStatus::Interrupted);
    wait_removed(&h.manager, &running).await;
    assert!(h.manager.registry().is_empty());
}
