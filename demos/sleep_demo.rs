//! A thread that sleeps mid-run, and one that gets blocked and later
//! resumed by the main thread.

fn sleeper() {
    let tid = uthreads::get_tid();
    println!("thread {tid} sleeping for 5 quanta at quantum {}", uthreads::get_total_quantums());
    uthreads::sleep(5);
    println!("thread {tid} woke up at quantum {}", uthreads::get_total_quantums());
    uthreads::terminate(tid);
}

fn patient() {
    let tid = uthreads::get_tid();
    loop {
        println!("thread {tid} still runnable at quantum {}", uthreads::get_total_quantums());
        let mut counter: u64 = 0;
        while counter < 50_000_000 {
            counter = counter.wrapping_add(1);
        }
    }
}

fn main() {
    env_logger::init();

    if uthreads::init(100_000) != 0 {
        eprintln!("failed to initialize the thread library");
        std::process::exit(1);
    }

    let sleepy = uthreads::spawn(sleeper);
    let blocked = uthreads::spawn(patient);

    while uthreads::get_total_quantums() < 3 {
        std::thread::yield_now();
    }
    println!("main blocking thread {blocked}");
    uthreads::block(blocked);

    while uthreads::get_quantums(sleepy) < 1 {
        std::thread::yield_now();
    }

    while uthreads::get_total_quantums() < 20 {
        std::thread::yield_now();
    }
    println!("main resuming thread {blocked}");
    uthreads::resume(blocked);

    while uthreads::get_total_quantums() < 25 {
        std::thread::yield_now();
    }

    uthreads::terminate(0);
}
