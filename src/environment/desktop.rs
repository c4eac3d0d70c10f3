use std::time::Duration;

use anyhow::anyhow;
use rand::RngCore;

use super::{ContentSource, Environment};
use crate::{
    config::CheckpointFallback,
    failure::{Failure, FailureExt},
    utils::{
        external_prog::run_applescript,
        operator::{Confirmation, Operator},
    },
};

/// Sends commands to a native media application.
pub trait AppControl {
    fn command(&mut self, cmd: &str) -> anyhow::Result<()>;
}

pub struct AppleScript {
    app: String,
}

impl AppleScript {
    pub fn new(app: &str) -> Self {
        AppleScript { app: app.to_owned() }
    }
}

impl AppControl for AppleScript {
    fn command(&mut self, cmd: &str) -> anyhow::Result<()> {
        run_applescript(&self.app, cmd)
    }
}

/// Desktop player with a primed queue. The cache has no scripting interface,
/// so clearing it is the operator's job and every trial waits for them.
pub struct MusicApp<C: AppControl> {
    control: C,
    operator: Box<dyn Operator>,
    checkpoint_timeout: Duration,
    fallback: CheckpointFallback,
}

impl<C: AppControl> MusicApp<C> {
    pub fn new(
        control: C,
        operator: Box<dyn Operator>,
        checkpoint_timeout: Duration,
        fallback: CheckpointFallback,
    ) -> Self {
        MusicApp {
            control,
            operator,
            checkpoint_timeout,
            fallback,
        }
    }
}

impl<C: AppControl> Environment for MusicApp<C> {
    fn invalidate_cache(&mut self) -> Result<(), Failure> {
        // stop first so the cache does not fill up again while the operator works
        self.pause();

        self.operator.announce(&[
            "PAUSED FOR MANUAL CACHE CLEAR",
            "1. Go to Finder/Terminal and clear the media cache.",
            "2. Make sure the Music app is still open.",
        ]);
        match self.operator.confirm("Ready to capture?", self.checkpoint_timeout) {
            Confirmation::Confirmed | Confirmation::Interrupted => Ok(()),
            Confirmation::TimedOut => match self.fallback {
                CheckpointFallback::Proceed => {
                    warn!(
                        "nobody confirmed the cache clear within {:?}, capturing anyway",
                        self.checkpoint_timeout
                    );
                    Ok(())
                }
                CheckpointFallback::Abort => Err(anyhow!(
                    "cache clear checkpoint not confirmed within {:?}",
                    self.checkpoint_timeout
                ))
                .fatal(),
            },
        }
    }

    fn advance_to_next_item(
        &mut self,
        _source: &ContentSource,
        _rng: &mut dyn RngCore,
    ) -> Result<Option<String>, Failure> {
        info!("skipping to next track");
        self.control.command("play next track").recoverable()?;
        Ok(None)
    }

    fn pause(&mut self) {
        _ = self
            .control
            .command("pause")
            .inspect_err(|e| warn!("failed to pause playback: {:#}", e));
    }

    fn release(&mut self) {}
}

#[cfg(test)]
mod test {
    use std::{cell::RefCell, rc::Rc};

    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    #[derive(Default, Clone)]
    struct Recorder {
        log: Rc<RefCell<Vec<String>>>,
        fail: bool,
    }

    impl AppControl for Recorder {
        fn command(&mut self, cmd: &str) -> anyhow::Result<()> {
            self.log.borrow_mut().push(cmd.to_owned());
            if self.fail {
                Err(anyhow!("Music is not running"))
            } else {
                Ok(())
            }
        }
    }

    struct ScriptedOperator(Confirmation);

    impl Operator for ScriptedOperator {
        fn announce(&mut self, _lines: &[&str]) {}
        fn countdown(&mut self, _total: Duration) -> bool {
            true
        }
        fn confirm(&mut self, _prompt: &str, _timeout: Duration) -> Confirmation {
            self.0
        }
    }

    fn app(answer: Confirmation, fallback: CheckpointFallback, control: Recorder) -> MusicApp<Recorder> {
        MusicApp::new(
            control,
            Box::new(ScriptedOperator(answer)),
            Duration::from_secs(1),
            fallback,
        )
    }

    #[test]
    fn pauses_before_checkpoint() {
        let control = Recorder::default();
        let mut env = app(Confirmation::Confirmed, CheckpointFallback::Abort, control.clone());
        env.invalidate_cache().unwrap();
        assert_eq!(*control.log.borrow(), vec!["pause"]);
    }

    #[test]
    fn unanswered_checkpoint_follows_fallback() {
        let mut env = app(Confirmation::TimedOut, CheckpointFallback::Abort, Recorder::default());
        assert!(env.invalidate_cache().unwrap_err().is_fatal());

        let mut env = app(Confirmation::TimedOut, CheckpointFallback::Proceed, Recorder::default());
        assert!(env.invalidate_cache().is_ok());
    }

    #[test]
    fn pause_failure_is_swallowed() {
        let control = Recorder {
            fail: true,
            ..Default::default()
        };
        let mut env = app(Confirmation::Confirmed, CheckpointFallback::Abort, control);
        assert!(env.invalidate_cache().is_ok());
    }

    #[test]
    fn next_track_comes_from_the_queue() {
        let control = Recorder::default();
        let mut env = app(Confirmation::Confirmed, CheckpointFallback::Abort, control.clone());
        let mut rng = StdRng::seed_from_u64(0);

        assert_eq!(env.advance_to_next_item(&ContentSource::Queue, &mut rng).unwrap(), None);
        assert_eq!(*control.log.borrow(), vec!["play next track"]);
    }

    #[test]
    fn failed_skip_loses_the_trial() {
        let control = Recorder {
            fail: true,
            ..Default::default()
        };
        let mut env = app(Confirmation::Confirmed, CheckpointFallback::Abort, control);
        let mut rng = StdRng::seed_from_u64(0);
        let err = env.advance_to_next_item(&ContentSource::Queue, &mut rng).unwrap_err();
        assert!(!err.is_fatal());
    }
}
