use std::process::Child;
use std::process::ChildStdin;
use std::process::Command;
use std::process::Stdio;

use anyhow::Context;
use anyhow::Result;
use tracing::info;
use tracing::warn;

use super::DisplaySurface;
use super::render;
use super::render_title;
use crate::channel::DisplayEvent;

/// Feeds answers to a viewer process over its stdin, e.g. `zenity --text-info --auto-scroll`.
/// The surface is closed once the user quits the viewer.
pub struct ViewerSurface {
    command: Vec<String>,
    styled: bool,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
}

impl ViewerSurface {
    pub fn new(command: Vec<String>, styled: bool) -> Self {
        ViewerSurface {
            command,
            styled,
            child: None,
            stdin: None,
        }
    }
}

impl DisplaySurface for ViewerSurface {
    fn start(&mut self) -> Result<()> {
        let (program, args) = self.command.split_first().context("viewer command is empty")?;
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to start viewer, command={:?}", self.command))?;
        info!("viewer started, pid={}", child.id());

        let mut stdin = child.stdin.take().context("viewer stdin is not piped")?;
        self.child = Some(child);
        render_title(&mut stdin, self.styled)?;
        self.stdin = Some(stdin);
        Ok(())
    }

    fn push_events(&mut self, events: &[DisplayEvent]) -> Result<()> {
        let stdin = self.stdin.as_mut().context("viewer is not running")?;
        render(stdin, events, self.styled).context("failed to write to viewer")?;
        Ok(())
    }

    fn is_closed(&mut self) -> bool {
        let Some(child) = self.child.as_mut() else {
            return true;
        };
        match child.try_wait() {
            Ok(None) => false,
            Ok(Some(status)) => {
                info!("viewer exited, status={status}");
                true
            }
            Err(err) => {
                warn!("failed to check viewer, error={err:?}");
                true
            }
        }
    }

    fn teardown(&mut self) {
        // closing stdin lets well behaved viewers exit on their own
        self.stdin = None;
        if let Some(mut child) = self.child.take() {
            if let Ok(None) = child.try_wait() {
                let _ = child.kill();
            }
            let _ = child.wait();
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::thread;
    use std::time::Duration;
    use std::time::Instant;

    use super::*;

    fn command(args: &[&str]) -> Vec<String> {
        args.iter().map(|arg| arg.to_string()).collect()
    }

    #[test]
    fn empty_command_fails_to_start() {
        let mut surface = ViewerSurface::new(vec![], false);
        assert!(surface.start().is_err());
        assert!(surface.is_closed());
    }

    #[test]
    fn running_viewer_accepts_events() {
        let mut surface = ViewerSurface::new(command(&["sh", "-c", "cat > /dev/null"]), false);
        surface.start().unwrap();

        surface
            .push_events(&[DisplayEvent::Text("hello".to_string()), DisplayEvent::EndOfStream])
            .unwrap();
        assert!(!surface.is_closed());

        surface.teardown();
        assert!(surface.is_closed());
    }

    #[test]
    fn exited_viewer_is_closed() {
        let mut surface = ViewerSurface::new(command(&["sh", "-c", "sleep 0.2"]), false);
        surface.start().unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while !surface.is_closed() {
            assert!(Instant::now() < deadline, "viewer did not exit");
            thread::sleep(Duration::from_millis(10));
        }
        surface.teardown();
    }
}
