use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::sleep,
    time::{Duration, Instant},
};

pub mod external_prog;
pub mod operator;
pub mod webdriver;

pub fn artifact_name(tag: &str, stamp: &str, ext: &str) -> String {
    format!("{}_{}.{}", tag, stamp, ext)
}

/// Flag raised by SIGINT. The run checks it between phases and winds down cleanly.
pub fn interrupt_flag() -> anyhow::Result<Arc<AtomicBool>> {
    let stop = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&stop))?;
    Ok(stop)
}

/// Sleeps for `dur` in short slices. Returns `false` if `stop` was raised meanwhile.
pub fn sleep_unless_stopped(stop: &AtomicBool, dur: Duration) -> bool {
    let deadline = Instant::now() + dur;
    loop {
        if stop.load(Ordering::Relaxed) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        sleep((deadline - now).min(Duration::from_millis(200)));
    }
}
