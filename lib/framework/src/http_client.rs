use std::io;
use std::pin::Pin;
use std::result::Result;
use std::sync::LazyLock;
use std::time::Duration;

use bytes::Bytes;
use futures::AsyncBufReadExt;
use futures::Stream;
use futures::StreamExt;
use futures::TryStreamExt;
use futures::io::Lines;
use futures::stream::IntoAsyncRead;
use futures::stream::MapErr;

// streaming responses stay open as long as the server keeps writing, so only connecting is time limited
pub static HTTP_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(30))
        .pool_idle_timeout(Duration::from_secs(300))
        .connection_verbose(false)
        .build()
        .expect("failed to build http client")
});

type BytesResult = Result<Bytes, reqwest::Error>;
pub trait ResponseExt {
    fn lines(
        self,
    ) -> Lines<IntoAsyncRead<MapErr<impl Stream<Item = BytesResult>, impl FnMut(reqwest::Error) -> io::Error>>>;

    fn events(self) -> EventSource;
}

impl ResponseExt for reqwest::Response {
    fn lines(
        self,
    ) -> Lines<IntoAsyncRead<MapErr<impl Stream<Item = BytesResult>, impl FnMut(reqwest::Error) -> io::Error>>> {
        self.bytes_stream().map_err(io::Error::other).into_async_read().lines()
    }

    fn events(self) -> EventSource {
        EventSource::new(self.lines())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerSentEvent {
    pub event: Option<String>,
    pub data: String,
}

/// Reads `text/event-stream` bodies, one event per blank-line terminated block.
pub struct EventSource {
    lines: Pin<Box<dyn Stream<Item = io::Result<String>> + Send>>,
}

impl EventSource {
    pub fn new(lines: impl Stream<Item = io::Result<String>> + Send + 'static) -> Self {
        EventSource { lines: Box::pin(lines) }
    }

    pub async fn next(&mut self) -> Option<io::Result<ServerSentEvent>> {
        let mut event: Option<String> = None;
        let mut data: Option<String> = None;

        while let Some(line) = self.lines.next().await {
            let line = match line {
                Ok(line) => line,
                Err(err) => return Some(Err(err)),
            };

            if line.is_empty() {
                if let Some(data) = data.take() {
                    return Some(Ok(ServerSentEvent { event: event.take(), data }));
                }
                event = None;
                continue;
            }

            if let Some(value) = line.strip_prefix("event:") {
                event = Some(value.trim_start().to_string());
            } else if let Some(value) = line.strip_prefix("data:") {
                let value = value.strip_prefix(' ').unwrap_or(value);
                match data.as_mut() {
                    Some(data) => {
                        data.push('\n');
                        data.push_str(value);
                    }
                    None => data = Some(value.to_string()),
                }
            }
            // comments (":") and id/retry fields are not used by any api we call
        }

        data.map(|data| Ok(ServerSentEvent { event, data }))
    }
}
