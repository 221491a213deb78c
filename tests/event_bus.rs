use std::error::Error;
use std::time::Duration;

use procmux::{ProcessEvent, ProcessState, SpawnOptions, Supervisor};
use tokio::sync::broadcast;
use tokio::time::timeout;

type TestResult = Result<(), Box<dyn Error>>;

fn quiet_capture() -> SpawnOptions {
    SpawnOptions {
        stream_output: false,
        capture_output: true,
        ..SpawnOptions::default()
    }
}

fn sh(script: &str) -> Vec<String> {
    vec!["-c".to_string(), script.to_string()]
}

/// Collect events until the `Exited` for `name` arrives.
async fn drain_until_exit(
    rx: &mut broadcast::Receiver<ProcessEvent>,
    name: &str,
) -> Result<Vec<ProcessEvent>, Box<dyn Error>> {
    let mut events = Vec::new();
    loop {
        let event = timeout(Duration::from_secs(5), rx.recv()).await??;
        let done = matches!(&event, ProcessEvent::Exited { name: n, .. } if n == name);
        events.push(event);
        if done {
            return Ok(events);
        }
    }
}

#[tokio::test]
async fn lifecycle_events_arrive_in_order() -> TestResult {
    let sup = Supervisor::new();
    let mut rx = sup.subscribe();

    let record = sup
        .spawn("sh", &sh("printf 'one\\ntwo\\n'"), quiet_capture())
        .await?;
    sup.wait_for(&record.name).await?;

    let events = drain_until_exit(&mut rx, &record.name).await?;
    assert_eq!(events.len(), 4);
    assert!(
        matches!(&events[0], ProcessEvent::Spawned { record: r } if r.name == record.name)
    );
    assert!(
        matches!(&events[1], ProcessEvent::Stdout { line, .. } if line == "one")
    );
    assert!(
        matches!(&events[2], ProcessEvent::Stdout { line, .. } if line == "two")
    );
    assert!(matches!(&events[3], ProcessEvent::Exited { code: 0, .. }));
    Ok(())
}

#[tokio::test]
async fn spawned_event_record_is_already_registered() -> TestResult {
    let sup = Supervisor::new();
    let mut rx = sup.subscribe();

    sup.spawn("sh", &sh("true"), quiet_capture()).await?;

    let event = timeout(Duration::from_secs(5), rx.recv()).await??;
    let ProcessEvent::Spawned { record } = event else {
        return Err("first event was not Spawned".into());
    };
    assert_eq!(record.state, ProcessState::Running);
    // Registration happens before the event fires, so the lookup succeeds.
    assert!(sup.process(&record.name).is_some());

    sup.wait_for(&record.name).await?;
    Ok(())
}

#[tokio::test]
async fn every_subscriber_receives_the_fanout() -> TestResult {
    let sup = Supervisor::new();
    let mut first = sup.subscribe();
    let mut second = sup.subscribe();

    let record = sup.spawn("sh", &sh("true"), quiet_capture()).await?;
    sup.wait_for(&record.name).await?;

    for rx in [&mut first, &mut second] {
        let events = drain_until_exit(rx, &record.name).await?;
        assert!(matches!(&events[0], ProcessEvent::Spawned { .. }));
        assert!(
            matches!(events.last(), Some(ProcessEvent::Exited { code: 0, .. }))
        );
    }
    Ok(())
}

#[tokio::test]
async fn launch_failure_emits_an_error_event_only() -> TestResult {
    let sup = Supervisor::new();
    let mut rx = sup.subscribe();

    let options = SpawnOptions {
        label: Some("ghost".to_string()),
        ..quiet_capture()
    };
    let _ = sup
        .spawn("/definitely/not/a/binary", &[], options)
        .await
        .expect_err("spawn must fail");

    let event = timeout(Duration::from_secs(5), rx.recv()).await??;
    assert!(matches!(&event, ProcessEvent::Error { name, .. } if name == "ghost"));
    assert!(sup.processes().is_empty());

    // No Exited ever follows a failed launch.
    assert!(
        timeout(Duration::from_millis(100), rx.recv()).await.is_err()
    );
    Ok(())
}
