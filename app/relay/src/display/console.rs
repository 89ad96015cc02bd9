use std::io;
use std::io::Stdout;
use std::io::Write;

use anyhow::Result;
use crossterm::queue;
use crossterm::style::ResetColor;

use super::DisplaySurface;
use super::render;
use super::render_title;
use crate::channel::DisplayEvent;

/// Prints answers to the terminal the relay runs in. Nobody can close it.
pub struct ConsoleSurface {
    out: Stdout,
}

impl ConsoleSurface {
    pub fn new() -> Self {
        ConsoleSurface { out: io::stdout() }
    }
}

impl DisplaySurface for ConsoleSurface {
    fn start(&mut self) -> Result<()> {
        render_title(&mut self.out.lock(), true)?;
        Ok(())
    }

    fn push_events(&mut self, events: &[DisplayEvent]) -> Result<()> {
        render(&mut self.out.lock(), events, true)?;
        Ok(())
    }

    fn is_closed(&mut self) -> bool {
        false
    }

    fn teardown(&mut self) {
        let mut out = self.out.lock();
        let _ = queue!(out, ResetColor);
        let _ = out.flush();
    }
}
