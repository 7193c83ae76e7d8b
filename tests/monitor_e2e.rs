use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use startwatch::{
    channel_source, same_instance, Event, EventFeed, EventKind, EventRef, MonitorState, StartMonitor,
    StartMonitorConfig,
};

#[derive(Debug)]
struct Screen {
    kind: &'static str,
    finished: AtomicBool,
}

impl Screen {
    fn finish(&self) {
        self.finished.store(true, Ordering::SeqCst);
    }
}

impl Event for Screen {
    fn kind(&self) -> EventKind {
        EventKind::from_static(self.kind)
    }

    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }
}

fn screen(kind: &'static str) -> Arc<Screen> {
    Arc::new(Screen {
        kind,
        finished: AtomicBool::new(false),
    })
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn test_cfg() -> StartMonitorConfig {
    StartMonitorConfig::default()
        .with_poll_timeout(Duration::from_millis(50))
        .with_wait_recheck_interval(Duration::from_millis(25))
        .with_thread_name("startwatch-e2e")
}

fn running_monitor() -> (EventFeed, StartMonitor) {
    init_tracing();
    let (feed, source) = channel_source(64);
    let monitor = StartMonitor::new(source, test_cfg()).unwrap();
    monitor.start().unwrap();
    assert_eq!(monitor.state(), MonitorState::Running);
    (feed, monitor)
}

fn wait_until(deadline: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let end = Instant::now() + deadline;
    while Instant::now() < end {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    cond()
}

fn shutdown(monitor: &StartMonitor) {
    monitor.stop();
    monitor.join().unwrap();
    assert_eq!(monitor.state(), MonitorState::Stopped);
}

#[test]
fn distinct_starts_are_recorded_in_order() {
    let (feed, monitor) = running_monitor();
    let names = ["Splash", "Login", "Home", "Detail", "Home"];
    let screens: Vec<Arc<Screen>> = names.iter().copied().map(screen).collect();
    for s in &screens {
        feed.start(s.clone()).unwrap();
    }

    assert!(wait_until(Duration::from_secs(2), || monitor.started_events().len() == names.len()));
    let records = monitor.started_events();
    for (record, expected) in records.iter().zip(&screens) {
        let expected: EventRef = expected.clone();
        assert!(same_instance(record.event(), &expected));
    }
    assert!(records.windows(2).all(|w| w[0].started_at() <= w[1].started_at()));

    shutdown(&monitor);
}

#[test]
fn repeated_instance_is_recorded_once() {
    let (feed, monitor) = running_monitor();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    monitor.on_start("Login", move |_: &EventRef| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let login = screen("Login");
    feed.start(login.clone()).unwrap();
    feed.start(login.clone()).unwrap();
    feed.start(login).unwrap();

    let marker = screen("Marker");
    feed.start(marker).unwrap();
    assert!(wait_until(Duration::from_secs(2), || monitor.started_events().len() == 2));

    assert_eq!(monitor.started_events().len(), 2);
    assert!(wait_until(Duration::from_secs(2), || hits.load(Ordering::SeqCst) == 1));
    thread::sleep(Duration::from_millis(50));
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    shutdown(&monitor);
}

#[test]
fn wait_for_returns_event_started_after_the_call() {
    let (feed, monitor) = running_monitor();
    let monitor = Arc::new(monitor);

    let waiter = {
        let monitor = Arc::clone(&monitor);
        thread::spawn(move || {
            let started = Instant::now();
            let found = monitor.wait_for("Checkout", Duration::from_secs(5));
            (found, started.elapsed())
        })
    };

    thread::sleep(Duration::from_millis(100));
    feed.start(screen("Cart")).unwrap();
    let checkout = screen("Checkout");
    feed.start(checkout.clone()).unwrap();

    let (found, elapsed) = waiter.join().unwrap();
    let expected: EventRef = checkout;
    assert!(same_instance(&found.unwrap(), &expected));
    assert!(elapsed < Duration::from_secs(5));

    shutdown(&monitor);
}

#[test]
fn wait_for_fast_path_returns_current_event() {
    let (feed, monitor) = running_monitor();
    let home = screen("Home");
    feed.start(home.clone()).unwrap();
    assert!(wait_until(Duration::from_secs(2), || monitor.most_recently_started().is_some()));

    let started = Instant::now();
    let found = monitor.wait_for("Home", Duration::from_secs(5)).unwrap();
    assert!(started.elapsed() < Duration::from_secs(1));
    let expected: EventRef = home;
    assert!(same_instance(&found, &expected));

    shutdown(&monitor);
}

#[test]
fn wait_for_times_out_no_earlier_than_requested() {
    let (feed, monitor) = running_monitor();
    feed.start(screen("Home")).unwrap();

    let timeout = Duration::from_millis(200);
    let started = Instant::now();
    assert!(monitor.wait_for("Never", timeout).is_none());
    let elapsed = started.elapsed();
    assert!(elapsed >= timeout, "returned after {elapsed:?}");
    assert!(elapsed < Duration::from_secs(2), "returned after {elapsed:?}");

    shutdown(&monitor);
}

#[test]
fn most_recent_tracks_finishing_events() {
    let (feed, monitor) = running_monitor();
    let first = screen("First");
    let second = screen("Second");
    feed.start(first.clone()).unwrap();
    feed.start(second.clone()).unwrap();
    assert!(wait_until(Duration::from_secs(2), || monitor.started_events().len() == 2));

    assert_eq!(monitor.most_recently_started().unwrap().kind().as_str(), "Second");

    second.finish();
    assert_eq!(monitor.most_recently_started().unwrap().kind().as_str(), "First");

    first.finish();
    assert!(monitor.most_recently_started().is_none());
    assert!(monitor.started_events().is_empty());

    shutdown(&monitor);
}

#[test]
fn clear_forgets_history_and_listeners() {
    let (feed, monitor) = running_monitor();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    monitor.on_start("Settings", move |event: &EventRef| {
        sink.lock().unwrap().push(event.kind());
    });

    feed.start(screen("Settings")).unwrap();
    assert!(wait_until(Duration::from_secs(2), || seen.lock().unwrap().len() == 1));

    monitor.clear();
    assert!(monitor.started_events().is_empty());

    let after = screen("Settings");
    feed.start(after).unwrap();
    assert!(wait_until(Duration::from_secs(2), || monitor.started_events().len() == 1));
    thread::sleep(Duration::from_millis(50));
    assert_eq!(seen.lock().unwrap().len(), 1);

    shutdown(&monitor);
}

#[test]
fn stop_terminates_within_one_poll_and_records_nothing_after() {
    let (feed, monitor) = running_monitor();
    feed.start(screen("Before")).unwrap();
    assert!(wait_until(Duration::from_secs(2), || monitor.started_events().len() == 1));

    let started = Instant::now();
    monitor.stop();
    monitor.join().unwrap();
    assert!(started.elapsed() < Duration::from_millis(50) + Duration::from_secs(1));
    assert_eq!(monitor.state(), MonitorState::Stopped);

    // The source is gone with the producer; feeding now fails or is ignored.
    let _ = feed.start(screen("After"));
    thread::sleep(Duration::from_millis(100));
    let kinds: Vec<String> = monitor
        .started_events()
        .iter()
        .map(|r| r.event().kind().to_string())
        .collect();
    assert_eq!(kinds, vec!["Before"]);
}

#[test]
fn many_waiters_for_one_kind_all_wake() {
    let (feed, monitor) = running_monitor();
    let monitor = Arc::new(monitor);

    let waiters: Vec<_> = (0..4)
        .map(|_| {
            let monitor = Arc::clone(&monitor);
            thread::spawn(move || monitor.wait_for("Profile", Duration::from_secs(5)))
        })
        .collect();

    thread::sleep(Duration::from_millis(100));
    let profile = screen("Profile");
    feed.start(profile.clone()).unwrap();

    let expected: EventRef = profile;
    for waiter in waiters {
        let found = waiter.join().unwrap().unwrap();
        assert!(same_instance(&found, &expected));
    }

    shutdown(&monitor);
}
