//! Scenario S2: a thread that sleeps must not accumulate quanta until the
//! quantum it asked to wake at actually arrives.

use std::sync::Mutex;

use serial_test::serial;

static LOG: Mutex<Vec<String>> = Mutex::new(Vec::new());

fn sleeper() {
    let tid = uthreads::get_tid();
    LOG.lock().unwrap().push(format!("start q={}", uthreads::get_total_quantums()));
    uthreads::sleep(2);
    LOG.lock().unwrap().push(format!("awake q={}", uthreads::get_total_quantums()));
    uthreads::terminate(tid);
}

fn parse_quantum(line: &str) -> i64 {
    line.rsplit('=').next().unwrap().parse().unwrap()
}

#[test]
#[serial]
fn s2_sleeping_thread_wakes_after_its_requested_quanta() {
    assert_eq!(uthreads::init(5_000), 0);

    let a = uthreads::spawn(sleeper);
    assert_eq!(a, 1);

    // Wait for A to have run at least once (and therefore be asleep).
    while LOG.lock().unwrap().is_empty() {}
    let wake_at = parse_quantum(&LOG.lock().unwrap()[0]) + 2;

    while uthreads::get_total_quantums() < wake_at {
        assert_eq!(uthreads::get_quantums(a), 1, "a sleeping thread must not accrue quanta");
    }

    while LOG.lock().unwrap().len() < 2 {}
    assert!(LOG.lock().unwrap()[1].starts_with("awake"));

    uthreads::terminate(0);
}
