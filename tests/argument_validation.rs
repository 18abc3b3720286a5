//! Plain argument-validation paths that never need a context switch
//! (spec §7's "invalid argument" row).

use serial_test::serial;

#[test]
#[serial]
fn argument_validation_never_touches_scheduling_state() {
    assert_eq!(uthreads::init(0), -1, "a non-positive quantum must be rejected");
    assert_eq!(uthreads::init(-5), -1);

    assert_eq!(uthreads::init(5_000), 0);

    assert_eq!(uthreads::block(0), -1, "blocking the main thread is not permitted");
    assert_eq!(uthreads::sleep(1), -1, "the main thread cannot sleep");
    assert_eq!(uthreads::get_quantums(42), -1, "an unspawned id has no quanta to report");
    assert_eq!(uthreads::terminate(-1), -1, "a negative id is never valid");
    assert_eq!(uthreads::resume(99), -1, "resuming an unspawned id fails");

    uthreads::terminate(0);
}
