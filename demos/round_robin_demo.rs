//! Three threads round-robining on a short quantum, demonstrating
//! preemption without any thread ever yielding voluntarily.

fn worker() {
    let tid = uthreads::get_tid();
    for _ in 0..3 {
        println!("thread {tid} running at quantum {}", uthreads::get_total_quantums());
        // Busy-spin through the rest of this quantum and into the next few;
        // the quantum signal preempts this loop without any cooperation.
        let mut counter: u64 = 0;
        while counter < 50_000_000 {
            counter = counter.wrapping_add(1);
        }
    }
    uthreads::terminate(tid);
}

fn main() {
    env_logger::init();

    if uthreads::init(100_000) != 0 {
        eprintln!("failed to initialize the thread library");
        std::process::exit(1);
    }

    let f = uthreads::spawn(worker);
    let g = uthreads::spawn(worker);
    println!("main spawned threads {f} and {g}");

    while uthreads::get_total_quantums() < 30 {
        std::thread::yield_now();
    }

    uthreads::terminate(0);
}
