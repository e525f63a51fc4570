//! # Node Assembly
//!
//! Wires a node's links into a [`Broker`], registers its consumer queues
//! and spawns one task per link reader. The per-node modules add their own
//! tasks on top.
//!
//! Startup order matters: every queue must be registered before the
//! readers start, because the broker is shared read-only afterwards.

pub mod console;
pub mod handset;
pub mod ra_driver;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::Poll;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::SerialConfig;
use crate::error::Result;
use crate::msg::protocol::{Message, MessageKind};
use crate::msg::{Broker, LossyReceiver};
use crate::serial::{LinkSide, SerialLink, SerialPortIO, StreamPort};

type LinkReader = Box<dyn AsyncRead + Send + Unpin>;

/// Both halves of one link
pub struct LinkEnd {
    reader: LinkReader,
    writer: Box<dyn SerialPortIO>,
}

impl std::fmt::Debug for LinkEnd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkEnd").finish_non_exhaustive()
    }
}

impl LinkEnd {
    pub fn new<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: SerialPortIO + 'static,
    {
        Self {
            reader: Box::new(reader),
            writer: Box::new(writer),
        }
    }

    pub fn from_serial(link: SerialLink) -> Self {
        Self::new(link.reader, link.writer)
    }

    /// A bidirectional in-process stream, e.g. one end of `tokio::io::duplex`
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        Self::new(reader, StreamPort::new(writer))
    }
}

/// A node's upstream and downstream links; either may be absent
#[derive(Debug, Default)]
pub struct Links {
    pub upstream: Option<LinkEnd>,
    pub downstream: Option<LinkEnd>,
}

impl Links {
    pub fn new(upstream: Option<LinkEnd>, downstream: Option<LinkEnd>) -> Self {
        Self { upstream, downstream }
    }

    /// Open the UARTs named in the configuration
    ///
    /// # Errors
    ///
    /// Returns `SerialPortNotFound` if a configured device cannot be opened.
    pub fn open(config: &SerialConfig) -> Result<Self> {
        let open = |path: &Option<String>| -> Result<Option<LinkEnd>> {
            path.as_deref()
                .map(|p| SerialLink::open(p, config.baud_rate).map(LinkEnd::from_serial))
                .transpose()
        };

        Ok(Self {
            upstream: open(&config.upstream)?,
            downstream: open(&config.downstream)?,
        })
    }
}

/// A broker still accepting subscriptions, plus the readers it will run
pub struct Fabric {
    broker: Broker,
    readers: Vec<(LinkSide, LinkReader)>,
}

impl Fabric {
    pub fn new(links: Links, frame_timeout: Duration) -> Self {
        let mut readers: Vec<(LinkSide, LinkReader)> = Vec::with_capacity(2);
        let mut split = |side: LinkSide, end: Option<LinkEnd>| {
            end.map(|LinkEnd { reader, writer }| {
                readers.push((side, reader));
                writer
            })
        };

        let upstream = split(LinkSide::Upstream, links.upstream);
        let downstream = split(LinkSide::Downstream, links.downstream);

        Self {
            broker: Broker::new(upstream, downstream, frame_timeout),
            readers,
        }
    }

    pub fn subscribe(&mut self, kind: MessageKind, capacity: usize) -> LossyReceiver<Message> {
        self.broker.subscribe(kind, capacity)
    }

    /// Freeze the subscriptions and spawn a reader task per link
    pub fn start(self, tasks: &mut Vec<JoinHandle<()>>) -> Arc<Broker> {
        let broker = Arc::new(self.broker);

        for (side, reader) in self.readers {
            let broker = Arc::clone(&broker);
            tasks.push(tokio::spawn(async move {
                broker.run_reader(side, reader).await;
            }));
        }

        broker
    }
}

/// Handle to a running node's tasks
#[derive(Debug)]
pub struct NodeHandle {
    broker: Arc<Broker>,
    tasks: Vec<JoinHandle<()>>,
}

impl NodeHandle {
    pub fn new(broker: Arc<Broker>, tasks: Vec<JoinHandle<()>>) -> Self {
        Self { broker, tasks }
    }

    pub fn broker(&self) -> &Arc<Broker> {
        &self.broker
    }

    /// Resolve once any task exits; node tasks run forever otherwise
    pub async fn any_finished(&mut self) {
        let (index, result) = std::future::poll_fn(|cx| {
            for (index, task) in self.tasks.iter_mut().enumerate() {
                if let Poll::Ready(result) = Pin::new(task).poll(cx) {
                    return Poll::Ready((index, result));
                }
            }
            Poll::Pending
        })
        .await;

        self.tasks.remove(index);
        if let Err(e) = result {
            warn!("Node task failed: {}", e);
        }
    }

    /// Run until Ctrl+C, then abort every task
    ///
    /// Tasks that end on their own (a closed link, exhausted key input)
    /// are logged; the rest keep running.
    pub async fn run_until_ctrl_c(mut self) -> Result<()> {
        info!("Press Ctrl+C to exit");

        loop {
            tokio::select! {
                _ = self.any_finished() => {}

                result = tokio::signal::ctrl_c() => {
                    result?;
                    info!("Received Ctrl+C, shutting down...");
                    break;
                }
            }
        }

        self.shutdown();
        Ok(())
    }

    /// Abort every task
    pub fn shutdown(self) {
        info!("Stopping {} node tasks", self.tasks.len());
        for task in &self.tasks {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::msg::decoder::DEFAULT_FRAME_TIMEOUT;

    #[tokio::test]
    async fn test_three_fabrics_in_a_line() {
        // head <-> middle <-> tail
        let (head_down, middle_up) = tokio::io::duplex(1024);
        let (middle_down, tail_up) = tokio::io::duplex(1024);

        let head = Fabric::new(Links::new(None, Some(LinkEnd::from_stream(head_down))), DEFAULT_FRAME_TIMEOUT);
        let mut middle = Fabric::new(
            Links::new(Some(LinkEnd::from_stream(middle_up)), Some(LinkEnd::from_stream(middle_down))),
            DEFAULT_FRAME_TIMEOUT,
        );
        let mut tail = Fabric::new(Links::new(Some(LinkEnd::from_stream(tail_up)), None), DEFAULT_FRAME_TIMEOUT);

        let mut middle_foo = middle.subscribe(MessageKind::Foo, 4);
        let mut tail_foo = tail.subscribe(MessageKind::Foo, 4);

        let mut tasks = Vec::new();
        let head = head.start(&mut tasks);
        let _middle = middle.start(&mut tasks);
        let _tail = tail.start(&mut tasks);

        let hello = Message::Foo { name: "hello".into() };
        head.publish(&hello).await.unwrap();

        assert_eq!(middle_foo.recv().await, Some(hello.clone()));
        assert_eq!(tail_foo.recv().await, Some(hello));

        NodeHandle::new(head, tasks).shutdown();
    }

    #[test]
    fn test_no_links_no_readers() {
        let fabric = Fabric::new(Links::default(), DEFAULT_FRAME_TIMEOUT);
        assert!(fabric.readers.is_empty());
        assert!(!fabric.broker.has_link(LinkSide::Upstream));
    }
}
