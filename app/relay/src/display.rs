use std::io;
use std::io::Write;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::Context;
use anyhow::Result;
use crossterm::queue;
use crossterm::style::Attribute;
use crossterm::style::Color;
use crossterm::style::Print;
use crossterm::style::ResetColor;
use crossterm::style::SetAttribute;
use crossterm::style::SetForegroundColor;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::channel::DisplayEvent;
use crate::channel::MessageReceiver;
use crate::config::DisplayConfig;

pub mod console;
pub mod viewer;

use self::console::ConsoleSurface;
use self::viewer::ViewerSurface;

const TITLE: &str = "Assistant Response:";

/// Something the user watches answers on. Driven from the display thread only.
pub trait DisplaySurface: Send {
    fn start(&mut self) -> Result<()>;

    fn push_events(&mut self, events: &[DisplayEvent]) -> Result<()>;

    /// True once the user has closed the surface.
    fn is_closed(&mut self) -> bool;

    fn teardown(&mut self);
}

pub type SurfaceFactory = Arc<dyn Fn() -> Result<Box<dyn DisplaySurface>> + Send + Sync>;

pub fn surface_factory(config: &DisplayConfig) -> SurfaceFactory {
    match config.viewer.clone() {
        Some(viewer) => Arc::new(move || {
            let surface: Box<dyn DisplaySurface> = Box::new(ViewerSurface::new(viewer.command.clone(), viewer.styled));
            Ok(surface)
        }),
        None => Arc::new(|| {
            let surface: Box<dyn DisplaySurface> = Box::new(ConsoleSurface::new());
            Ok(surface)
        }),
    }
}

/// Owns the surface lifecycle: at most one surface, each on its own polling thread, started on demand.
pub struct DisplayController {
    receiver: Arc<Mutex<MessageReceiver>>,
    factory: SurfaceFactory,
    poll_interval: Duration,
    active: Mutex<Option<JoinHandle<()>>>,
}

impl DisplayController {
    pub fn new(receiver: MessageReceiver, factory: SurfaceFactory, poll_interval: Duration) -> Self {
        DisplayController {
            receiver: Arc::new(Mutex::new(receiver)),
            factory,
            poll_interval,
            active: Mutex::new(None),
        }
    }

    #[cfg(test)]
    pub fn is_active(&self) -> bool {
        lock(&self.active).as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Starts a surface unless one is running; returns whether a new one was started.
    pub fn ensure_active(&self) -> Result<bool> {
        let mut active = lock(&self.active);
        if active.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return Ok(false);
        }
        if let Some(finished) = active.take() {
            if finished.join().is_err() {
                warn!("previous display thread panicked");
            }
        }

        let factory = Arc::clone(&self.factory);
        let receiver = Arc::clone(&self.receiver);
        let poll_interval = self.poll_interval;
        let handle = thread::Builder::new()
            .name("display".to_string())
            .spawn(move || poll_surface(factory, receiver, poll_interval))
            .context("failed to start display thread")?;
        *active = Some(handle);
        Ok(true)
    }
}

fn poll_surface(factory: SurfaceFactory, receiver: Arc<Mutex<MessageReceiver>>, poll_interval: Duration) {
    let mut surface = match factory() {
        Ok(surface) => surface,
        Err(err) => {
            error!("failed to create display surface, error={err:?}");
            return;
        }
    };
    if let Err(err) = surface.start() {
        error!("failed to start display surface, error={err:?}");
        surface.teardown();
        return;
    }
    info!("display surface started");

    while !surface.is_closed() {
        let batch = next_batch(&mut lock(&receiver));
        if !batch.is_empty() {
            if let Err(err) = surface.push_events(&batch) {
                warn!("display surface stopped rendering, error={err:?}");
                lock(&receiver).requeue(batch);
                break;
            }
            if batch.last() == Some(&DisplayEvent::EndOfStream) {
                info!("stream completed");
            }
        }
        thread::sleep(poll_interval);
    }

    surface.teardown();
    info!("display surface closed");
}

/// One polling pass: everything queued right now, cut right after an end of stream.
fn next_batch(receiver: &mut MessageReceiver) -> Vec<DisplayEvent> {
    let available = receiver.len();
    let mut batch = Vec::with_capacity(available);
    while batch.len() < available {
        match receiver.try_next() {
            Some(DisplayEvent::EndOfStream) => {
                batch.push(DisplayEvent::EndOfStream);
                break;
            }
            Some(event) => batch.push(event),
            None => break,
        }
    }
    batch
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub fn render_title(out: &mut impl Write, styled: bool) -> io::Result<()> {
    if styled {
        queue!(out, SetAttribute(Attribute::Bold), Print(TITLE), SetAttribute(Attribute::Reset), Print("\n\n"))?;
    } else {
        queue!(out, Print(TITLE), Print("\n\n"))?;
    }
    out.flush()
}

pub fn render(out: &mut impl Write, events: &[DisplayEvent], styled: bool) -> io::Result<()> {
    for event in events {
        match event {
            DisplayEvent::Text(text) => queue!(out, Print(text))?,
            DisplayEvent::Separator(text) => highlight(out, Color::Yellow, text, styled)?,
            DisplayEvent::Error(text) => highlight(out, Color::Red, &format!("\nERROR: {text}\n"), styled)?,
            DisplayEvent::EndOfStream => {}
        }
    }
    out.flush()
}

fn highlight(out: &mut impl Write, color: Color, text: &str, styled: bool) -> io::Result<()> {
    if styled {
        queue!(out, SetForegroundColor(color), Print(text), ResetColor)
    } else {
        queue!(out, Print(text))
    }
}
