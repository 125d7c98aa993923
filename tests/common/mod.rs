//! Shared fixtures: a canned-JSON HTTP stub and a scripted `eix`.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// What the stub answers for one request.
pub struct Reply {
    pub delay: Duration,
    /// `None` answers 404.
    pub body: Option<String>,
}

impl Reply {
    pub fn json(body: impl Into<String>) -> Self {
        Self {
            delay: Duration::ZERO,
            body: Some(body.into()),
        }
    }

    pub fn not_found() -> Self {
        Self {
            delay: Duration::ZERO,
            body: None,
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

type Handler = Arc<dyn Fn(usize, &str) -> Reply + Send + Sync>;

/// Serve `handler` on an ephemeral port. Returns the base API URL.
///
/// The handler gets the zero-based request index and the request target
/// (path plus query string).
pub async fn serve(handler: impl Fn(usize, &str) -> Reply + Send + Sync + 'static) -> String {
    let handler: Handler = Arc::new(handler);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    let requests = Arc::new(AtomicUsize::new(0));

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let handler = Arc::clone(&handler);
            let requests = Arc::clone(&requests);
            tokio::spawn(respond(socket, handler, requests));
        }
    });

    format!("http://{addr}/api/v1/")
}

async fn respond(mut socket: TcpStream, handler: Handler, requests: Arc<AtomicUsize>) {
    let Some(target) = read_target(&mut socket).await else {
        return;
    };
    let index = requests.fetch_add(1, Ordering::SeqCst);
    let reply = handler(index, &target);
    tokio::time::sleep(reply.delay).await;

    let (status, body) = match reply.body {
        Some(body) => ("200 OK", body),
        None => ("404 Not Found", String::new()),
    };
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

async fn read_target(socket: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let head = String::from_utf8_lossy(&buf);
    let request_line = head.lines().next()?;
    request_line.split_whitespace().nth(1).map(str::to_string)
}

/// Write an executable `eix` stand-in that answers from a `case` table.
///
/// Each arm is `(package, shell body)`, e.g. `("dev-python/foo", "echo dev-python/foo-1.0")`.
/// Unlisted packages print nothing.
#[cfg(unix)]
pub fn fake_eix(dir: &Path, arms: &[(&str, &str)]) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let mut script = String::from("#!/bin/sh\ncase \"$4\" in\n");
    for (pkg, body) in arms {
        script.push_str(&format!("  {pkg}) {body} ;;\n"));
    }
    script.push_str("  *) echo '' ;;\nesac\n");

    let path = dir.join("eix");
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}
