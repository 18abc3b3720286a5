//! Boundary behavior from spec §8: `spawn` succeeds up to `MAX_THREAD_NUM`
//! live threads (id 0 included) and fails exactly one past it.

use serial_test::serial;

const MAX_THREAD_NUM: usize = 100;

#[test]
#[serial]
fn spawn_succeeds_up_to_the_cap_then_fails() {
    assert_eq!(uthreads::init(5_000), 0);

    for expected_id in 1..MAX_THREAD_NUM {
        let id = uthreads::spawn(|| loop {});
        assert_eq!(id as usize, expected_id);
    }

    assert_eq!(uthreads::spawn(|| loop {}), -1, "MAX_THREAD_NUM must be enforced");

    uthreads::terminate(0);
}
