use std::{env, time::Duration};

use anyhow::{bail, Context};
use subprocess::{unix::PopenExt, Exec, ExitStatus, Popen, PopenConfig, Redirection};

/// `tell application "<app>" to <command>`
pub fn applescript_line(app: &str, command: &str) -> String {
    format!("tell application \"{}\" to {}", app, command)
}

pub fn run_applescript(app: &str, command: &str) -> anyhow::Result<()> {
    let line = applescript_line(app, command);
    debug!("osascript -e '{}'", line);

    let out = Exec::cmd("osascript")
        .arg("-e")
        .arg(&line)
        .stdout(Redirection::Pipe)
        .stderr(Redirection::Pipe)
        .capture()
        .context("failed to run osascript")?;

    if !out.success() {
        bail!(
            "osascript exited with {:?}: {}",
            out.exit_status,
            out.stderr_str().trim()
        );
    }
    Ok(())
}

/// Raw capture needs root. Re-runs this very command under sudo and exits with its status.
pub fn ensure_root() -> anyhow::Result<()> {
    if nix::unistd::geteuid().is_root() {
        return Ok(());
    }

    info!("Need root privileges. Relaunching with sudo...");
    let exe = env::current_exe().context("cannot locate own executable")?;
    let args: Vec<_> = env::args_os().skip(1).collect();
    let status = Exec::cmd("sudo")
        .arg(exe)
        .args(&args)
        .join()
        .context("failed to run sudo")?;

    let code = match status {
        ExitStatus::Exited(code) => code as i32,
        _ => 1,
    };
    std::process::exit(code);
}

/// A helper process we started and have to shut down again.
pub struct RunningProgram {
    name: String,
    popen: Popen,
}

impl RunningProgram {
    pub fn spawn(argv: &[&str]) -> anyhow::Result<RunningProgram> {
        let name = argv.first().context("empty command line")?.to_string();
        info!("starting {}", name);

        let popen = Popen::create(argv, PopenConfig::default())
            .with_context(|| format!("failed to start {}", name))?;

        Ok(RunningProgram { name, popen })
    }

    pub fn is_running(&mut self) -> bool {
        self.popen.poll().is_none()
    }

    pub fn stop(mut self) -> anyhow::Result<()> {
        if !self.is_running() {
            warn!("{} exited before we stopped it ({:?})", self.name, self.popen.exit_status());
            return Ok(());
        }

        _ = self.popen.send_signal(libc::SIGINT);
        let status = self
            .popen
            .wait_timeout(Duration::from_secs(2))
            .transpose()
            .unwrap_or_else(|| {
                _ = self.popen.kill();
                self.popen.wait()
            })
            .with_context(|| format!("failed to stop {}", self.name))?;
        debug!("{} stopped with {:?}", self.name, status);
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn applescript_command_line() {
        assert_eq!(
            applescript_line("Music", "play next track"),
            "tell application \"Music\" to play next track"
        );
    }

    #[test]
    fn spawned_program_can_be_stopped() {
        let mut prog = RunningProgram::spawn(&["sleep", "30"]).unwrap();
        assert!(prog.is_running());
        prog.stop().unwrap();
    }
}
