use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::Instant;

use anyhow::Result;
use anyhow::anyhow;
use anyhow::bail;
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use openai::assistant::RunEvent;
use tokio::sync::Notify;

use crate::channel::DisplayEvent;
use crate::completion::AnswerStream;
use crate::completion::CompletionService;
use crate::completion::FollowUpStream;
use crate::display::DisplaySurface;
use crate::display::SurfaceFactory;
use crate::platform::Messenger;
use crate::request::Originator;

/// Replays canned streams. `Err` items fail the stream at that point.
#[derive(Default)]
pub struct ScriptedService {
    pub answer: Vec<Result<RunEvent, String>>,
    pub answer_open_error: Option<String>,
    pub follow_up: Vec<Result<String, String>>,
    pub follow_up_open_error: Option<String>,
    // answer() waits for a notification before opening the stream
    pub hold: Option<Arc<Notify>>,
    pub answer_calls: Mutex<Vec<String>>,
    pub follow_up_calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedService {
    pub fn answer_calls(&self) -> Vec<String> {
        self.answer_calls.lock().unwrap().clone()
    }

    pub fn follow_up_calls(&self) -> Vec<(String, String)> {
        self.follow_up_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for ScriptedService {
    async fn answer(&self, message: &str) -> Result<AnswerStream> {
        self.answer_calls.lock().unwrap().push(message.to_string());
        if let Some(hold) = &self.hold {
            hold.notified().await;
        }
        if let Some(error) = &self.answer_open_error {
            bail!("{error}");
        }
        let events: Vec<Result<RunEvent>> = self
            .answer
            .iter()
            .cloned()
            .map(|event| event.map_err(|error| anyhow!(error)))
            .collect();
        Ok(stream::iter(events).boxed())
    }

    async fn follow_up(&self, question: &str, answer: &str) -> Result<FollowUpStream> {
        self.follow_up_calls
            .lock()
            .unwrap()
            .push((question.to_string(), answer.to_string()));
        if let Some(error) = &self.follow_up_open_error {
            bail!("{error}");
        }
        let tokens: Vec<Result<String>> = self
            .follow_up
            .iter()
            .cloned()
            .map(|token| token.map_err(|error| anyhow!(error)))
            .collect();
        Ok(stream::iter(tokens).boxed())
    }
}

pub fn completed_answer(deltas: &[&str]) -> Vec<Result<RunEvent, String>> {
    deltas
        .iter()
        .map(|delta| Ok(RunEvent::Delta(delta.to_string())))
        .chain([Ok(RunEvent::MessageCompleted)])
        .collect()
}

#[derive(Default)]
pub struct RecordingMessenger {
    pub replies: Mutex<Vec<(Originator, String)>>,
    pub failing_chat: Option<i64>,
}

impl RecordingMessenger {
    pub fn replies(&self) -> Vec<(Originator, String)> {
        self.replies.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.replies().into_iter().map(|(_, text)| text).collect()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn reply(&self, originator: &Originator, text: &str) -> Result<()> {
        if self.failing_chat == Some(originator.chat_id) {
            bail!("chat not found, chat_id={}", originator.chat_id);
        }
        self.replies.lock().unwrap().push((*originator, text.to_string()));
        Ok(())
    }
}

/// Hands out surfaces that record what they are given.
#[derive(Clone, Default)]
pub struct RecordingDisplay {
    surfaces: Arc<Mutex<Vec<SurfaceProbe>>>,
    fail_next: Arc<AtomicBool>,
}

#[derive(Clone, Default)]
pub struct SurfaceProbe {
    events: Arc<Mutex<Vec<DisplayEvent>>>,
    closed: Arc<AtomicBool>,
    torn_down: Arc<AtomicBool>,
}

struct RecordingSurface {
    probe: SurfaceProbe,
    fail_push: bool,
}

impl RecordingDisplay {
    pub fn factory(&self) -> SurfaceFactory {
        let display = self.clone();
        Arc::new(move || {
            let probe = SurfaceProbe::default();
            display.surfaces.lock().unwrap().push(probe.clone());
            let surface: Box<dyn DisplaySurface> = Box::new(RecordingSurface {
                probe,
                fail_push: display.fail_next.swap(false, Ordering::SeqCst),
            });
            Ok(surface)
        })
    }

    /// The next surface rejects its first batch as if the user closed it mid-push.
    pub fn fail_next_surface(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn surface_count(&self) -> usize {
        self.surfaces.lock().unwrap().len()
    }

    pub fn surface(&self, index: usize) -> SurfaceProbe {
        self.surfaces.lock().unwrap()[index].clone()
    }

    /// Events rendered by all surfaces so far, oldest surface first.
    pub fn events(&self) -> Vec<DisplayEvent> {
        let surfaces = self.surfaces.lock().unwrap().clone();
        surfaces.iter().flat_map(SurfaceProbe::events).collect()
    }
}

impl SurfaceProbe {
    pub fn events(&self) -> Vec<DisplayEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }
}

impl DisplaySurface for RecordingSurface {
    fn start(&mut self) -> Result<()> {
        Ok(())
    }

    fn push_events(&mut self, events: &[DisplayEvent]) -> Result<()> {
        if self.fail_push {
            self.probe.close();
            bail!("surface closed");
        }
        self.probe.events.lock().unwrap().extend_from_slice(events);
        Ok(())
    }

    fn is_closed(&mut self) -> bool {
        self.probe.closed.load(Ordering::SeqCst)
    }

    fn teardown(&mut self) {
        self.probe.torn_down.store(true, Ordering::SeqCst);
    }
}

pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not met within 5s");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
