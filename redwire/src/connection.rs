//! A single connection to a server: handshake, frame IO and the three
//! conversation shapes the client needs.
//!
//! Every exchange here is synchronous with respect to the socket: one task
//! owns the connection at a time (the pool layer guarantees it). Batches and
//! transactions are written as a single buffer and their replies read back in
//! order, so a whole MULTI/EXEC conversation costs one round trip and can
//! never interleave with another caller's commands.

use crate::commands::Command;
use crate::protocol;
use bytes::{Buf, BytesMut};
use redwire_core::{
    ConnectionConfig, Error, NodeAddr, ProtocolVersion, Result, Value,
};
use std::io::Cursor;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, warn};

/// What kind of deployment the endpoint turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopologyKind {
    /// A single server.
    Standalone,
    /// A cluster node.
    Cluster,
}

/// One established, authenticated connection.
pub struct Connection {
    stream: TcpStream,
    read_buf: BytesMut,
    protocol: ProtocolVersion,
    operation_timeout: Duration,
}

impl Connection {
    /// Connect to `addr` and run the handshake: protocol negotiation,
    /// authentication and database selection, per the configuration.
    pub async fn connect(addr: &NodeAddr, config: &ConnectionConfig) -> Result<Self> {
        debug!(%addr, "connecting");

        let stream = timeout(
            config.connect_timeout,
            TcpStream::connect((addr.host.as_str(), addr.port)),
        )
        .await
        .map_err(|_| Error::Timeout)?
        .map_err(|e| Error::Connection(format!("failed to connect to {addr}: {e}")))?;

        stream.set_nodelay(true)?;
        if let Some(interval) = config.tcp_keepalive {
            let sock = socket2::SockRef::from(&stream);
            let keepalive = socket2::TcpKeepalive::new().with_time(interval);
            sock.set_tcp_keepalive(&keepalive)
                .map_err(|e| Error::Connection(format!("failed to set keepalive: {e}")))?;
        }

        let mut conn = Self {
            stream,
            read_buf: BytesMut::with_capacity(8 * 1024),
            protocol: ProtocolVersion::Resp2,
            operation_timeout: config.operation_timeout,
        };
        conn.handshake(config).await?;
        Ok(conn)
    }

    /// The protocol version this connection settled on.
    #[must_use]
    pub fn protocol(&self) -> ProtocolVersion {
        self.protocol
    }

    async fn handshake(&mut self, config: &ConnectionConfig) -> Result<()> {
        if config.protocol == ProtocolVersion::Resp3 {
            self.negotiate_resp3(config.password.as_deref()).await?;
        } else if let Some(password) = config.password.as_deref() {
            self.authenticate(password).await?;
        }

        if config.database != 0 {
            let reply = self
                .call(&Command::new("SELECT").arg(config.database))
                .await?;
            reply.as_bool().map_err(|_| {
                Error::Connection(format!("unexpected SELECT reply: {reply:?}"))
            })?;
        }
        Ok(())
    }

    /// Try HELLO 3; on rejection stay on RESP2 and authenticate the old way.
    async fn negotiate_resp3(&mut self, password: Option<&str>) -> Result<()> {
        let mut hello = Command::new("HELLO").arg(3);
        if let Some(password) = password {
            hello = hello.arg("AUTH").arg("default").arg(password);
        }

        // The acceptance reply is a RESP3 map, so decode the exchange as
        // RESP3 regardless; it is a superset and also parses the rejection.
        self.protocol = ProtocolVersion::Resp3;
        match self.call(&hello).await {
            Ok(_) => {
                debug!("negotiated RESP3");
                Ok(())
            }
            Err(Error::Server(e)) => {
                debug!(error = %e, "HELLO rejected, staying on RESP2");
                self.protocol = ProtocolVersion::Resp2;
                if let Some(password) = password {
                    self.authenticate(password).await?;
                }
                Ok(())
            }
            Err(other) => Err(other),
        }
    }

    async fn authenticate(&mut self, password: &str) -> Result<()> {
        match self.call(&Command::new("AUTH").arg(password)).await {
            Ok(Value::Simple(ref s)) if s == "OK" => Ok(()),
            Ok(other) => Err(Error::Auth(format!("unexpected AUTH reply: {other:?}"))),
            Err(Error::Server(e)) => Err(Error::Auth(e.message)),
            Err(other) => Err(other),
        }
    }

    /// Execute one command and translate its reply.
    pub async fn call(&mut self, command: &Command) -> Result<Value> {
        let mut buf = BytesMut::new();
        command.encode_into(&mut buf);
        self.write_all(&buf).await?;
        let reply = self.read_reply().await?;
        reply_to_result(reply)
    }

    /// Execute one command preceded by ASKING, in a single round trip.
    ///
    /// Both frames must travel on the same connection for the redirect
    /// target to honor the request; running them as separate pool calls
    /// would not guarantee that.
    pub async fn call_asking(&mut self, command: &Command) -> Result<Value> {
        let mut buf = BytesMut::new();
        Command::new("ASKING").encode_into(&mut buf);
        command.encode_into(&mut buf);
        self.write_all(&buf).await?;

        let asking = reply_to_result(self.read_reply().await?);
        let reply = self.read_reply().await?;
        asking?;
        reply_to_result(reply)
    }

    /// Execute a batch: write every frame, then read every reply, in order.
    ///
    /// Transport failures fail the whole batch; a server error reply only
    /// fails its own slot.
    pub async fn call_batch(&mut self, commands: &[Command]) -> Result<Vec<Result<Value>>> {
        if commands.is_empty() {
            return Ok(Vec::new());
        }

        let mut buf = BytesMut::new();
        for command in commands {
            command.encode_into(&mut buf);
        }
        self.write_all(&buf).await?;

        let mut results = Vec::with_capacity(commands.len());
        for _ in commands {
            let reply = self.read_reply().await?;
            results.push(reply_to_result(reply));
        }
        Ok(results)
    }

    /// Run a whole optimistic transaction in one round trip:
    /// `WATCH* MULTI <queued commands> EXEC`.
    ///
    /// Returns one result per queued command. An EXEC nil reply (a watched
    /// key changed) surfaces as [`Error::TransactionAborted`]; a command the
    /// server refused to queue surfaces as that command's translated error.
    pub async fn call_transaction(
        &mut self,
        watch: &[bytes::Bytes],
        commands: &[Command],
    ) -> Result<Vec<Result<Value>>> {
        let mut buf = BytesMut::new();
        if !watch.is_empty() {
            let watch_cmd = watch
                .iter()
                .fold(Command::new("WATCH"), |cmd, key| cmd.arg(key));
            watch_cmd.encode_into(&mut buf);
        }
        Command::new("MULTI").encode_into(&mut buf);
        for command in commands {
            command.encode_into(&mut buf);
        }
        Command::new("EXEC").encode_into(&mut buf);
        self.write_all(&buf).await?;

        if !watch.is_empty() {
            reply_to_result(self.read_reply().await?)
                .map_err(|e| Error::Protocol(format!("WATCH failed: {e}")))?;
        }
        reply_to_result(self.read_reply().await?)
            .map_err(|e| Error::Protocol(format!("MULTI failed: {e}")))?;

        // Queue acknowledgements. A rejection here does not stop the
        // conversation; the server answers the eventual EXEC with EXECABORT.
        let mut queue_error = None;
        for _ in commands {
            match reply_to_result(self.read_reply().await?) {
                Ok(Value::Simple(ref s)) if s == "QUEUED" => {}
                Ok(other) => {
                    return Err(Error::Protocol(format!(
                        "expected QUEUED acknowledgement, got {other:?}"
                    )))
                }
                Err(e) => {
                    if queue_error.is_none() {
                        queue_error = Some(e);
                    }
                }
            }
        }

        let exec = self.read_reply().await?;
        if let Some(e) = queue_error {
            // Consume the EXECABORT reply but report the root cause.
            return Err(e);
        }

        match exec {
            Value::Nil => Err(Error::TransactionAborted),
            Value::Array(items) => Ok(items.into_iter().map(reply_to_result).collect()),
            Value::Error(msg) => Err(Error::from_error_reply(&msg)),
            other => Err(Error::Protocol(format!(
                "unexpected EXEC reply: {other:?}"
            ))),
        }
    }

    /// Probe whether the endpoint is a cluster node.
    pub async fn probe_topology(&mut self) -> Result<TopologyKind> {
        match self.call(&Command::new("CLUSTER").arg("INFO")).await {
            Ok(reply) => {
                let info = reply.into_string().unwrap_or_default();
                if info.contains("cluster_enabled:1") {
                    debug!("endpoint reports cluster mode");
                    Ok(TopologyKind::Cluster)
                } else {
                    Ok(TopologyKind::Standalone)
                }
            }
            Err(Error::Server(e)) => {
                debug!(error = %e, "CLUSTER INFO rejected, assuming standalone");
                Ok(TopologyKind::Standalone)
            }
            Err(e) if e.is_connection_fatal() => Err(e),
            Err(e) => {
                warn!(error = %e, "topology probe failed, assuming standalone");
                Ok(TopologyKind::Standalone)
            }
        }
    }

    /// Hand the raw socket and any buffered bytes to a specialised owner
    /// (the pub/sub subscriber).
    pub(crate) fn into_parts(self) -> (TcpStream, BytesMut, ProtocolVersion) {
        (self.stream, self.read_buf, self.protocol)
    }

    async fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        timeout(self.operation_timeout, self.stream.write_all(buf))
            .await
            .map_err(|_| Error::Timeout)?
            .map_err(Error::Io)
    }

    /// Read the next reply frame, skipping out-of-band push frames.
    async fn read_reply(&mut self) -> Result<Value> {
        loop {
            let mut cursor = Cursor::new(&self.read_buf[..]);
            if let Some(value) = protocol::decode(self.protocol, &mut cursor)? {
                let consumed = cursor.position() as usize;
                self.read_buf.advance(consumed);
                if let Value::Push(items) = value {
                    debug!(frames = items.len(), "ignoring push frame on command connection");
                    continue;
                }
                return Ok(value);
            }

            let n = timeout(self.operation_timeout, self.stream.read_buf(&mut self.read_buf))
                .await
                .map_err(|_| Error::Timeout)?
                .map_err(Error::Io)?;
            if n == 0 {
                return Err(Error::Connection("server closed the connection".to_string()));
            }
        }
    }
}

/// Translate an error frame into the error hierarchy; pass others through.
pub(crate) fn reply_to_result(reply: Value) -> Result<Value> {
    match reply {
        Value::Error(msg) => Err(Error::from_error_reply(&msg)),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn error_frames_are_translated() {
        let err = reply_to_result(Value::Error("MOVED 1 h:2".to_string())).unwrap_err();
        assert!(err.is_redirect());

        let ok = reply_to_result(Value::Bulk(Bytes::from_static(b"x"))).unwrap();
        assert_eq!(ok, Value::Bulk(Bytes::from_static(b"x")));
    }
}
