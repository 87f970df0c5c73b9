//! Publish/subscribe.
//!
//! Subscribing flips a connection into a mode where normal commands are
//! refused, so a [`Subscriber`] owns a dedicated connection. The socket is
//! split: a background task decodes incoming frames into [`Message`]s while
//! the subscriber half issues subscribe/unsubscribe commands. Publishing
//! needs no special mode and goes through
//! [`Client::publish`](crate::Client::publish).

use crate::commands::Command;
use crate::connection::Connection;
use bytes::{Buf, Bytes, BytesMut};
use futures_util::Stream;
use redwire_core::{ConnectionConfig, Error, NodeAddr, ProtocolVersion, Result, ToArg, Value};
use std::io::Cursor;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::debug;

/// A message delivered to a subscribed channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Channel the message arrived on.
    pub channel: String,
    /// Raw payload.
    pub payload: Bytes,
    /// The pattern that matched, for pattern subscriptions.
    pub pattern: Option<String>,
}

/// A dedicated subscription connection.
pub struct Subscriber {
    writer: OwnedWriteHalf,
    messages: mpsc::UnboundedReceiver<Result<Message>>,
    reader: JoinHandle<()>,
    operation_timeout: Duration,
}

impl Subscriber {
    pub(crate) async fn connect(addr: &NodeAddr, config: &ConnectionConfig) -> Result<Self> {
        let conn = Connection::connect(addr, config).await?;
        let (stream, buf, protocol) = conn.into_parts();
        let (read_half, writer) = stream.into_split();

        let (tx, messages) = mpsc::unbounded_channel();
        let reader = tokio::spawn(read_loop(read_half, buf, protocol, tx));

        Ok(Self {
            writer,
            messages,
            reader,
            operation_timeout: config.operation_timeout,
        })
    }

    async fn send(&mut self, command: &Command) -> Result<()> {
        let mut buf = BytesMut::new();
        command.encode_into(&mut buf);
        timeout(self.operation_timeout, self.writer.write_all(&buf))
            .await
            .map_err(|_| Error::Timeout)?
            .map_err(Error::Io)
    }

    /// Subscribe to channels.
    pub async fn subscribe<C: ToArg>(&mut self, channels: &[C]) -> Result<()> {
        let cmd = channels
            .iter()
            .fold(Command::new("SUBSCRIBE"), |cmd, c| cmd.arg(c));
        self.send(&cmd).await
    }

    /// Unsubscribe from channels; an empty slice unsubscribes from all.
    pub async fn unsubscribe<C: ToArg>(&mut self, channels: &[C]) -> Result<()> {
        let cmd = channels
            .iter()
            .fold(Command::new("UNSUBSCRIBE"), |cmd, c| cmd.arg(c));
        self.send(&cmd).await
    }

    /// Subscribe to glob patterns.
    pub async fn psubscribe<P: ToArg>(&mut self, patterns: &[P]) -> Result<()> {
        let cmd = patterns
            .iter()
            .fold(Command::new("PSUBSCRIBE"), |cmd, p| cmd.arg(p));
        self.send(&cmd).await
    }

    /// Unsubscribe from glob patterns; an empty slice unsubscribes from all.
    pub async fn punsubscribe<P: ToArg>(&mut self, patterns: &[P]) -> Result<()> {
        let cmd = patterns
            .iter()
            .fold(Command::new("PUNSUBSCRIBE"), |cmd, p| cmd.arg(p));
        self.send(&cmd).await
    }

    /// Wait for the next message. `Ok(None)` means the connection closed.
    pub async fn next_message(&mut self) -> Result<Option<Message>> {
        match self.messages.recv().await {
            Some(Ok(message)) => Ok(Some(message)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }
}

impl Drop for Subscriber {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

impl Stream for Subscriber {
    type Item = Result<Message>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().messages.poll_recv(cx)
    }
}

async fn read_loop(
    mut read_half: OwnedReadHalf,
    mut buf: BytesMut,
    protocol: ProtocolVersion,
    tx: mpsc::UnboundedSender<Result<Message>>,
) {
    loop {
        let frame = loop {
            let mut cursor = Cursor::new(&buf[..]);
            match crate::protocol::decode(protocol, &mut cursor) {
                Ok(Some(frame)) => {
                    let consumed = cursor.position() as usize;
                    buf.advance(consumed);
                    break frame;
                }
                Ok(None) => {}
                Err(e) => {
                    let _ = tx.send(Err(e));
                    return;
                }
            }

            match read_half.read_buf(&mut buf).await {
                Ok(0) => return,
                Ok(_) => {}
                Err(e) => {
                    let _ = tx.send(Err(Error::Io(e)));
                    return;
                }
            }
        };

        match interpret_frame(frame) {
            Ok(Some(message)) => {
                if tx.send(Ok(message)).is_err() {
                    return;
                }
            }
            Ok(None) => {}
            Err(e) => {
                let _ = tx.send(Err(e));
                return;
            }
        }
    }
}

/// Turn a subscription frame into a message, or `None` for acknowledgements.
fn interpret_frame(frame: Value) -> Result<Option<Message>> {
    let items = match frame {
        Value::Push(items) | Value::Array(items) => items,
        Value::Error(msg) => return Err(Error::from_error_reply(&msg)),
        other => {
            return Err(Error::Protocol(format!(
                "unexpected {} frame on a subscription connection",
                other.kind()
            )))
        }
    };

    let mut items = items.into_iter();
    let kind = match items.next() {
        Some(kind) => kind.into_string()?,
        None => return Err(Error::Protocol("empty subscription frame".to_string())),
    };

    match kind.as_str() {
        "message" => {
            let (Some(channel), Some(payload)) = (items.next(), items.next()) else {
                return Err(Error::Protocol("truncated message frame".to_string()));
            };
            Ok(Some(Message {
                channel: channel.into_string()?,
                payload: payload.as_bytes()?,
                pattern: None,
            }))
        }
        "pmessage" => {
            let (Some(pattern), Some(channel), Some(payload)) =
                (items.next(), items.next(), items.next())
            else {
                return Err(Error::Protocol("truncated pmessage frame".to_string()));
            };
            Ok(Some(Message {
                channel: channel.into_string()?,
                payload: payload.as_bytes()?,
                pattern: Some(pattern.into_string()?),
            }))
        }
        "subscribe" | "unsubscribe" | "psubscribe" | "punsubscribe" | "pong" => {
            debug!(kind = %kind, "subscription acknowledgement");
            Ok(None)
        }
        other => Err(Error::Protocol(format!(
            "unknown subscription frame kind {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_frames_become_messages() {
        let frame = Value::Array(vec![
            Value::from("message"),
            Value::from("news"),
            Value::from("hello"),
        ]);
        let message = interpret_frame(frame).unwrap().unwrap();
        assert_eq!(message.channel, "news");
        assert_eq!(&message.payload[..], b"hello");
        assert_eq!(message.pattern, None);
    }

    #[test]
    fn pmessage_frames_carry_their_pattern() {
        let frame = Value::Push(vec![
            Value::from("pmessage"),
            Value::from("news.*"),
            Value::from("news.tech"),
            Value::from("body"),
        ]);
        let message = interpret_frame(frame).unwrap().unwrap();
        assert_eq!(message.channel, "news.tech");
        assert_eq!(message.pattern.as_deref(), Some("news.*"));
    }

    #[test]
    fn acknowledgements_are_swallowed() {
        let frame = Value::Array(vec![
            Value::from("subscribe"),
            Value::from("news"),
            Value::Int(1),
        ]);
        assert_eq!(interpret_frame(frame).unwrap(), None);
    }

    #[test]
    fn error_frames_are_translated() {
        let frame = Value::Error("ERR can't do that".to_string());
        assert!(interpret_frame(frame).is_err());
    }
}
