//! End-to-end reproduction of the three-thread round-robin scenario: main
//! waits for its own third quantum, spawns two children that run to their
//! fifth quantum and self-terminate, and the whole run is checked against
//! the exact interleaving a strict FIFO scheduler must produce.
//!
//! Every assertion below runs on the main thread only. Spawned threads only
//! log and terminate themselves: panicking on a synthesized stack would
//! have to unwind through a hand-forged `sigsetjmp` frame, which `cargo
//! test`'s forced `panic = "unwind"` profile makes unsound, so child bodies
//! never call `assert!`.

use std::sync::Mutex;

use serial_test::serial;

static LOG: Mutex<Vec<String>> = Mutex::new(Vec::new());

fn child(label: &'static str) {
    let tid = uthreads::get_tid();
    let mut last = 0;
    loop {
        let q = uthreads::get_quantums(tid);
        if q != last {
            last = q;
            LOG.lock().unwrap().push(format!("{label}={q}"));
            if q >= 5 {
                break;
            }
        }
    }
    uthreads::terminate(tid);
}

fn f_worker() {
    child("f");
}

fn g_worker() {
    child("g");
}

#[test]
#[serial]
fn s1_three_thread_round_robin() {
    assert_eq!(uthreads::init(5_000), 0);

    let mut spawned = false;
    let mut last_main = 0;
    loop {
        let m = uthreads::get_quantums(0);
        if m != last_main {
            last_main = m;
            LOG.lock().unwrap().push(format!("m={m}"));
        }
        if m == 3 && !spawned {
            spawned = true;
            let f = uthreads::spawn(f_worker);
            let g = uthreads::spawn(g_worker);
            assert_eq!((f, g), (1, 2));
        }
        if m >= 10 {
            break;
        }
    }

    let expected: Vec<String> = [
        "m=1", "m=2", "m=3", "f=1", "g=1", "m=4", "f=2", "g=2", "m=5", "f=3", "g=3", "m=6", "f=4",
        "g=4", "m=7", "f=5", "g=5", "m=8", "m=9", "m=10",
    ]
    .into_iter()
    .map(String::from)
    .collect();

    assert_eq!(*LOG.lock().unwrap(), expected);
    assert_eq!(uthreads::get_total_quantums(), 20);

    uthreads::terminate(0);
}
