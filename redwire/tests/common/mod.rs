//! In-process RESP servers for integration tests.
//!
//! Two flavours:
//!
//! - [`MockRedis`]: a tiny command-dispatching server with a shared store,
//!   enough of the command set for the client surface under test, including
//!   MULTI/EXEC queueing. Accepts any number of connections.
//! - [`canned_server`]: reads a fixed number of commands off one connection
//!   and answers with a pre-baked byte script, for conversations whose
//!   replies must be forced (aborted transactions, redirects).

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

type Store = Arc<Mutex<HashMap<String, String>>>;

/// A dispatching mock server.
pub struct MockRedis {
    port: u16,
    store: Store,
}

impl MockRedis {
    /// Bind on an ephemeral port and start accepting connections.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let store: Store = Arc::new(Mutex::new(HashMap::new()));

        let accept_store = Arc::clone(&store);
        tokio::spawn(async move {
            loop {
                let Ok((socket, _)) = listener.accept().await else {
                    return;
                };
                tokio::spawn(serve(socket, Arc::clone(&accept_store)));
            }
        });

        Self { port, store }
    }

    /// Connection URL for the client.
    pub fn url(&self) -> String {
        format!("redis://127.0.0.1:{}", self.port)
    }

    /// Peek at the backing store.
    pub async fn value(&self, key: &str) -> Option<String> {
        self.store.lock().await.get(key).cloned()
    }
}

async fn serve(mut socket: TcpStream, store: Store) {
    let mut buf = Vec::new();
    let mut in_multi = false;
    let mut queued: Vec<Vec<String>> = Vec::new();

    loop {
        while let Some((command, consumed)) = parse_command(&buf) {
            buf.drain(..consumed);
            let reply = if in_multi {
                match command[0].to_ascii_uppercase().as_str() {
                    "EXEC" => {
                        in_multi = false;
                        let mut replies = Vec::new();
                        for queued_command in queued.drain(..) {
                            replies.push(apply(&queued_command, &store).await);
                        }
                        Reply::Array(replies)
                    }
                    "DISCARD" => {
                        in_multi = false;
                        queued.clear();
                        Reply::ok()
                    }
                    "WATCH" => Reply::Error("ERR WATCH inside MULTI is not allowed".to_string()),
                    _ => {
                        queued.push(command);
                        Reply::Simple("QUEUED".to_string())
                    }
                }
            } else {
                match command[0].to_ascii_uppercase().as_str() {
                    "MULTI" => {
                        in_multi = true;
                        queued.clear();
                        Reply::ok()
                    }
                    "EXEC" => Reply::Error("ERR EXEC without MULTI".to_string()),
                    "WATCH" | "UNWATCH" => Reply::ok(),
                    _ => apply(&command, &store).await,
                }
            };

            if socket.write_all(&reply.encode()).await.is_err() {
                return;
            }
        }

        let mut chunk = [0u8; 4096];
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
}

async fn apply(command: &[String], store: &Store) -> Reply {
    let name = command[0].to_ascii_uppercase();
    let mut store = store.lock().await;

    match name.as_str() {
        "PING" => Reply::Simple("PONG".to_string()),
        "ECHO" => Reply::Bulk(command[1].clone()),
        "AUTH" | "SELECT" | "RESET" => Reply::ok(),
        "HELLO" => Reply::Error("ERR unknown command 'HELLO'".to_string()),
        "CLUSTER" => Reply::Error("ERR This instance has cluster support disabled".to_string()),
        "GET" => match store.get(&command[1]) {
            Some(value) => Reply::Bulk(value.clone()),
            None => Reply::Nil,
        },
        "SET" => {
            store.insert(command[1].clone(), command[2].clone());
            Reply::ok()
        }
        "DEL" | "UNLINK" => {
            let mut removed = 0;
            for key in &command[1..] {
                if store.remove(key).is_some() {
                    removed += 1;
                }
            }
            Reply::Int(removed)
        }
        "EXISTS" => {
            let found = command[1..]
                .iter()
                .filter(|key| store.contains_key(*key))
                .count();
            Reply::Int(found as i64)
        }
        "INCR" | "INCRBY" | "DECR" | "DECRBY" => {
            let delta = match name.as_str() {
                "INCR" => 1,
                "DECR" => -1,
                "INCRBY" => command[2].parse::<i64>().unwrap_or(0),
                _ => -command[2].parse::<i64>().unwrap_or(0),
            };
            let current = store.get(&command[1]).cloned().unwrap_or_else(|| "0".to_string());
            match current.parse::<i64>() {
                Ok(n) => {
                    let next = n + delta;
                    store.insert(command[1].clone(), next.to_string());
                    Reply::Int(next)
                }
                Err(_) => {
                    Reply::Error("ERR value is not an integer or out of range".to_string())
                }
            }
        }
        "MGET" => Reply::Array(
            command[1..]
                .iter()
                .map(|key| match store.get(key) {
                    Some(value) => Reply::Bulk(value.clone()),
                    None => Reply::Nil,
                })
                .collect(),
        ),
        "TTL" => {
            if store.contains_key(&command[1]) {
                Reply::Int(-1)
            } else {
                Reply::Int(-2)
            }
        }
        "EXPIRE" => Reply::Int(i64::from(store.contains_key(&command[1]))),
        "PUBLISH" => Reply::Int(0),
        "EVALSHA" => Reply::Error("NOSCRIPT No matching script. Please use EVAL.".to_string()),
        "EVAL" => Reply::Int(1),
        "SCRIPT" => match command[1].to_ascii_uppercase().as_str() {
            "LOAD" => Reply::Bulk("0123456789012345678901234567890123456789".to_string()),
            "EXISTS" => Reply::Array(command[2..].iter().map(|_| Reply::Int(0)).collect()),
            _ => Reply::ok(),
        },
        other => Reply::Error(format!("ERR unknown command '{other}'")),
    }
}

/// Minimal reply model, encoded as RESP2.
pub enum Reply {
    Simple(String),
    Error(String),
    Int(i64),
    Bulk(String),
    Nil,
    Array(Vec<Reply>),
}

impl Reply {
    fn ok() -> Self {
        Reply::Simple("OK".to_string())
    }

    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode_into(&mut out);
        out
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            Reply::Simple(s) => {
                out.extend_from_slice(format!("+{s}\r\n").as_bytes());
            }
            Reply::Error(s) => {
                out.extend_from_slice(format!("-{s}\r\n").as_bytes());
            }
            Reply::Int(n) => {
                out.extend_from_slice(format!(":{n}\r\n").as_bytes());
            }
            Reply::Bulk(s) => {
                out.extend_from_slice(format!("${}\r\n{s}\r\n", s.len()).as_bytes());
            }
            Reply::Nil => out.extend_from_slice(b"$-1\r\n"),
            Reply::Array(items) => {
                out.extend_from_slice(format!("*{}\r\n", items.len()).as_bytes());
                for item in items {
                    item.encode_into(out);
                }
            }
        }
    }
}

/// Parse one complete inline command (`*n` of bulk strings). Returns the
/// argument vector and the bytes consumed.
pub fn parse_command(buf: &[u8]) -> Option<(Vec<String>, usize)> {
    let mut pos = 0;
    let count = parse_header(buf, &mut pos, b'*')?;
    let mut parts = Vec::with_capacity(count);
    for _ in 0..count {
        let len = parse_header(buf, &mut pos, b'$')?;
        if buf.len() < pos + len + 2 {
            return None;
        }
        parts.push(String::from_utf8_lossy(&buf[pos..pos + len]).into_owned());
        pos += len + 2;
    }
    Some((parts, pos))
}

fn parse_header(buf: &[u8], pos: &mut usize, marker: u8) -> Option<usize> {
    if buf.len() <= *pos || buf[*pos] != marker {
        return None;
    }
    let line_start = *pos + 1;
    let rel = buf[line_start..].windows(2).position(|w| w == b"\r\n")?;
    let value = std::str::from_utf8(&buf[line_start..line_start + rel])
        .ok()?
        .parse::<usize>()
        .ok()?;
    *pos = line_start + rel + 2;
    Some(value)
}

/// Serve exactly one connection: read `expected_commands` commands, then
/// write `replies` verbatim and drain until the peer hangs up. Returns the
/// port the server listens on.
pub async fn canned_server(expected_commands: usize, replies: &'static [u8]) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };

        let mut buf = Vec::new();
        let mut seen = 0;
        while seen < expected_commands {
            while let Some((_, consumed)) = parse_command(&buf) {
                buf.drain(..consumed);
                seen += 1;
            }
            if seen >= expected_commands {
                break;
            }
            let mut chunk = [0u8; 4096];
            match socket.read(&mut chunk).await {
                Ok(0) | Err(_) => return,
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
            }
        }

        if socket.write_all(replies).await.is_err() {
            return;
        }
        let mut sink = [0u8; 1024];
        while matches!(socket.read(&mut sink).await, Ok(n) if n > 0) {}
    });

    port
}
