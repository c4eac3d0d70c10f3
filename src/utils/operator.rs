//! The human in the loop: login windows, cache clearing, press-ENTER checkpoints.

use std::{
    io::{self, BufRead},
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, RecvTimeoutError},
        Arc,
    },
    time::{Duration, Instant},
};

use crossterm::{
    cursor::MoveToColumn,
    execute,
    style::Print,
    terminal::{Clear, ClearType},
};

use super::sleep_unless_stopped;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    TimedOut,
    Interrupted,
}

pub trait Operator {
    /// Shows a block of instructions.
    fn announce(&mut self, lines: &[&str]);

    /// Waits a fixed time while showing the remaining seconds. `false` when interrupted.
    fn countdown(&mut self, total: Duration) -> bool;

    /// Blocks until the operator confirms, the timeout runs out, or the run is interrupted.
    fn confirm(&mut self, prompt: &str, timeout: Duration) -> Confirmation;
}

pub struct ConsoleOperator {
    stop: Arc<AtomicBool>,
    lines: Option<Receiver<String>>,
}

impl ConsoleOperator {
    pub fn new(stop: Arc<AtomicBool>) -> Self {
        ConsoleOperator { stop, lines: None }
    }

    /// Reads confirmations from `lines` instead of stdin.
    #[cfg(test)]
    pub fn with_lines(stop: Arc<AtomicBool>, lines: Receiver<String>) -> Self {
        ConsoleOperator {
            stop,
            lines: Some(lines),
        }
    }

    fn lines(&mut self) -> &Receiver<String> {
        self.lines.get_or_insert_with(|| {
            let (tx, rx) = mpsc::channel();
            _ = std::thread::Builder::new()
                .name("stdin".into())
                .spawn(move || {
                    for line in io::stdin().lock().lines() {
                        let Ok(line) = line else { break };
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                });
            rx
        })
    }
}

impl Operator for ConsoleOperator {
    fn announce(&mut self, lines: &[&str]) {
        println!("{}", "=".repeat(60));
        for line in lines {
            println!("   {}", line);
        }
        println!("{}", "=".repeat(60));
    }

    fn countdown(&mut self, total: Duration) -> bool {
        let mut stdout = io::stdout();
        let mut left = total.as_secs();
        while left > 0 {
            if left % 10 == 0 {
                _ = execute!(
                    stdout,
                    MoveToColumn(0),
                    Clear(ClearType::CurrentLine),
                    Print(format!("   waiting {}s...", left))
                );
            }
            if !sleep_unless_stopped(&self.stop, Duration::from_secs(1)) {
                println!();
                return false;
            }
            left -= 1;
        }
        println!();
        true
    }

    fn confirm(&mut self, prompt: &str, timeout: Duration) -> Confirmation {
        let stop = Arc::clone(&self.stop);
        let lines = self.lines();

        // whatever was typed before the prompt does not count
        while lines.try_recv().is_ok() {}

        println!("   {} (press ENTER)", prompt);
        let start = Instant::now();
        loop {
            if stop.load(Ordering::Relaxed) {
                return Confirmation::Interrupted;
            }
            let left = timeout.saturating_sub(start.elapsed());
            if left.is_zero() {
                return Confirmation::TimedOut;
            }

            match lines.recv_timeout(left.min(Duration::from_millis(200))) {
                Ok(_) => return Confirmation::Confirmed,
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    warn!("console input closed, nobody can confirm");
                    return Confirmation::TimedOut;
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::thread;

    use super::*;

    #[test]
    fn confirms_on_enter() {
        let (tx, rx) = mpsc::channel();
        let mut op = ConsoleOperator::with_lines(Arc::new(AtomicBool::new(false)), rx);

        let typist = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            tx.send(String::new()).unwrap();
            tx
        });
        assert_eq!(op.confirm("ready?", Duration::from_secs(5)), Confirmation::Confirmed);
        drop(typist.join().unwrap());
    }

    #[test]
    fn stale_input_is_ignored() {
        let (tx, rx) = mpsc::channel();
        let mut op = ConsoleOperator::with_lines(Arc::new(AtomicBool::new(false)), rx);
        tx.send(String::from("typed too early")).unwrap();

        assert_eq!(op.confirm("ready?", Duration::from_millis(300)), Confirmation::TimedOut);
        drop(tx);
    }

    #[test]
    fn times_out() {
        let (_tx, rx) = mpsc::channel::<String>();
        let mut op = ConsoleOperator::with_lines(Arc::new(AtomicBool::new(false)), rx);
        let start = Instant::now();
        assert_eq!(op.confirm("ready?", Duration::from_millis(250)), Confirmation::TimedOut);
        assert!(start.elapsed() >= Duration::from_millis(250));
    }

    #[test]
    fn closed_input_cannot_confirm() {
        let (tx, rx) = mpsc::channel::<String>();
        drop(tx);
        let mut op = ConsoleOperator::with_lines(Arc::new(AtomicBool::new(false)), rx);
        assert_eq!(op.confirm("ready?", Duration::from_secs(60)), Confirmation::TimedOut);
    }

    #[test]
    fn interrupt_wins() {
        let (_tx, rx) = mpsc::channel::<String>();
        let mut op = ConsoleOperator::with_lines(Arc::new(AtomicBool::new(true)), rx);
        assert_eq!(op.confirm("ready?", Duration::from_secs(60)), Confirmation::Interrupted);
        assert!(!op.countdown(Duration::from_secs(60)));
    }
}
