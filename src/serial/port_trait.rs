//! Trait abstraction for the writing half of a serial link

use async_trait::async_trait;
use std::io;
use tokio::io::{AsyncWrite, AsyncWriteExt, WriteHalf};

/// Trait for serial port write operations
#[async_trait]
pub trait SerialPortIO: Send {
    /// Write all data to the port
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Flush the output buffer
    async fn flush(&mut self) -> io::Result<()>;
}

/// Writing half of a `tokio_serial::SerialStream`
pub struct TokioSerialPort {
    port: WriteHalf<tokio_serial::SerialStream>,
}

impl TokioSerialPort {
    pub fn new(port: WriteHalf<tokio_serial::SerialStream>) -> Self {
        Self { port }
    }
}

#[async_trait]
impl SerialPortIO for TokioSerialPort {
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.port.write_all(data).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        self.port.flush().await
    }
}

/// Any async writer used as a link, e.g. one end of a `tokio::io::duplex`
/// pipe when nodes are wired together in-process
pub struct StreamPort<W> {
    writer: W,
}

impl<W> StreamPort<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> SerialPortIO for StreamPort<W> {
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.writer.write_all(data).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        self.writer.flush().await
    }
}


#[cfg(test)]
mod tests {
    use super::mocks::MockSerialPort;
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_mock_records_writes() {
        let mock = MockSerialPort::new();
        let mut port: Box<dyn SerialPortIO> = Box::new(mock.clone());

        port.write_all(b"^Foo|a~").await.unwrap();
        port.write_all(b"\n").await.unwrap();
        port.flush().await.unwrap();

        assert_eq!(mock.get_written_data().len(), 2);
        assert_eq!(mock.get_written_bytes(), b"^Foo|a~\n");
    }

    #[tokio::test]
    async fn test_mock_reports_errors() {
        let mut mock = MockSerialPort::new();
        mock.set_write_error(io::ErrorKind::BrokenPipe);
        let err = mock.write_all(b"x").await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);

        mock.set_flush_error(io::ErrorKind::TimedOut);
        assert!(mock.flush().await.is_err());
    }

    #[tokio::test]
    async fn test_stream_port_writes_through() {
        let (tx, mut rx) = tokio::io::duplex(32);
        let mut port = StreamPort::new(tx);
        port.write_all(b"^Foo|b~").await.unwrap();
        port.flush().await.unwrap();

        let mut buf = [0u8; 7];
        rx.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"^Foo|b~");
    }
}
