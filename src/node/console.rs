//! # Console Node
//!
//! Tail of the chain. Shows every message that reaches it, one at a time,
//! under a `Filter:` status line, and optionally mirrors the traffic to a
//! JSONL file. Four filter keys switch the filter at runtime; on a host,
//! key numbers typed on stdin stand in for them.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{info, warn};

use super::{Fabric, Links, NodeHandle};
use crate::config::{Config, CONSOLE_SHOW_ALL};
use crate::display::{Display, Renderer, Screen};
use crate::error::Result;
use crate::msg::protocol::{Message, MessageKind};
use crate::msg::LossyReceiver;
use crate::telemetry::TrafficLog;

/// Filter selected by each console key, in key order
pub const FILTER_KEYS: [&str; 4] = ["RADriverCmd", "RADriver", "Handset", CONSOLE_SHOW_ALL];

/// Filter for a key number, `0` to `3`
pub fn filter_for_key(name: &str) -> Option<&'static str> {
    name.parse::<usize>().ok().and_then(|i| FILTER_KEYS.get(i).copied())
}

/// Multi-line body for a message: its kind, then one line per field
pub fn describe(message: &Message) -> String {
    let fields = match message {
        Message::Foo { name } => format!("Name: {}", name),
        Message::Handset { keys } => format!("Keys: {}", keys.join(" ")),
        Message::RaDriver(ra) => format!(
            "Tracking: {}\nDirection: {}\nPosition: {}",
            ra.tracking, ra.direction, ra.position
        ),
        Message::RaDriverCmd { cmd, args } => format!("Cmd: {}\nArgs: {}", cmd, args.join(",")),
    };
    format!("Kind: {}\n{}", message.kind(), fields)
}

/// The console screen and its filter
#[derive(Debug)]
pub struct ConsoleView<D> {
    filter: String,
    screen: Screen<D>,
    traffic_log: Option<TrafficLog>,
}

impl<D: Display> ConsoleView<D> {
    pub fn new(filter: impl Into<String>, mut screen: Screen<D>) -> Self {
        let filter = filter.into();
        screen.set_status(format!("Filter: {}", filter));
        Self {
            filter,
            screen,
            traffic_log: None,
        }
    }

    pub fn with_traffic_log(mut self, log: TrafficLog) -> Self {
        self.traffic_log = Some(log);
        self
    }

    pub fn screen(&self) -> &Screen<D> {
        &self.screen
    }

    pub fn traffic_log(&self) -> Option<&TrafficLog> {
        self.traffic_log.as_ref()
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Switch the filter, clear the body and redraw
    pub fn set_filter(&mut self, filter: impl Into<String>) {
        self.filter = filter.into();
        self.screen.set_status(format!("Filter: {}", self.filter));
        self.screen.set_body("");
        if let Err(e) = self.screen.refresh() {
            warn!("Console redraw failed: {}", e);
        }
    }

    fn matches(&self, body: &str) -> bool {
        self.filter == CONSOLE_SHOW_ALL || body.contains(&self.filter)
    }

    /// Log and maybe show one message; `true` if it was shown
    pub fn on_message(&mut self, message: &Message) -> bool {
        if let Some(log) = self.traffic_log.as_mut() {
            if let Err(e) = log.append(message) {
                warn!("Traffic log write failed: {}", e);
            }
        }

        let body = describe(message);
        if !self.matches(&body) {
            return false;
        }

        self.screen.set_body(body);
        match self.screen.refresh() {
            Ok(_) => info!("\n{}", self.screen.text()),
            Err(e) => warn!("Console redraw failed: {}", e),
        }
        true
    }
}

async fn forward(mut queue: LossyReceiver<Message>, merged: mpsc::Sender<Message>) {
    while let Some(message) = queue.recv().await {
        if merged.send(message).await.is_err() {
            return;
        }
    }
}

/// Host stand-in for the filter keys: each input line holds key numbers
///
/// Unknown keys are logged and skipped.
pub async fn feed_filter_keys<R>(reader: R, filters: mpsc::Sender<&'static str>)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => return,
            Err(e) => {
                warn!("Filter key input failed: {}", e);
                return;
            }
        };

        for name in line.split_whitespace() {
            match filter_for_key(name) {
                Some(filter) => {
                    info!("Filter key {} - {}", name, filter);
                    if filters.send(filter).await.is_err() {
                        return;
                    }
                }
                None => warn!("Unknown filter key {:?}", name),
            }
        }
    }
}

/// Start the console node
///
/// # Errors
///
/// Returns `Io` if the configured traffic log cannot be opened.
pub fn spawn<R, D>(config: &Config, links: Links, filter_input: R, display: D) -> Result<NodeHandle>
where
    R: AsyncBufRead + Send + Unpin + 'static,
    D: Display + 'static,
{
    let renderer = Renderer::new(display, config.console.rows, config.console.cols);
    let mut view = ConsoleView::new(config.console.filter.clone(), Screen::new(renderer));
    if let Some(path) = &config.console.traffic_log {
        view = view.with_traffic_log(TrafficLog::open(path)?);
    }

    let capacity = config.fabric.queue_capacity;
    let mut fabric = Fabric::new(links, config.serial.frame_timeout());
    let queues: Vec<_> = MessageKind::ALL
        .into_iter()
        .map(|kind| fabric.subscribe(kind, capacity))
        .collect();

    let mut tasks = Vec::new();
    let broker = fabric.start(&mut tasks);

    let (merged_tx, mut merged) = mpsc::channel(capacity);
    for queue in queues {
        tasks.push(tokio::spawn(forward(queue, merged_tx.clone())));
    }
    drop(merged_tx);

    let (filter_tx, mut filters) = mpsc::channel(FILTER_KEYS.len());
    tasks.push(tokio::spawn(feed_filter_keys(filter_input, filter_tx)));

    tasks.push(tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(filter) = filters.recv() => view.set_filter(filter),
                message = merged.recv() => match message {
                    Some(message) => {
                        view.on_message(&message);
                    }
                    None => break,
                },
            }
        }
    }));

    info!("Console node started, filter {:?}", config.console.filter);
    Ok(NodeHandle::new(broker, tasks))
}
