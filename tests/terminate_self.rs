//! Scenario S5: a thread that terminates itself disappears from `threads`
//! and control lands on a different thread.

use std::sync::Mutex;

use serial_test::serial;

static DONE: Mutex<bool> = Mutex::new(false);

fn self_terminator() {
    let tid = uthreads::get_tid();
    *DONE.lock().unwrap() = true;
    uthreads::terminate(tid);
}

#[test]
#[serial]
fn s5_self_termination_removes_the_tcb_and_hands_control_elsewhere() {
    assert_eq!(uthreads::init(5_000), 0);

    let a = uthreads::spawn(self_terminator);
    assert_eq!(a, 1);

    while !*DONE.lock().unwrap() {}

    assert_eq!(uthreads::get_quantums(a), -1, "a terminated thread's id must no longer resolve");
    assert_eq!(uthreads::get_tid(), 0, "control must have returned to the main thread");

    uthreads::terminate(0);
}
