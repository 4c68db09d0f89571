//! Unix socket server
//!
//! Connections are served concurrently; requests on one connection are handled
//! in order, one response line per request line. Request lines are capped at
//! [`MAX_LINE_SIZE`] bytes and at most [`MAX_CONNECTIONS`] clients are served at
//! once; both limits are answered with an error reply before the connection is
//! closed.

use crate::error::TransportError;
use crate::BoxFuture;
use log::{debug, error, info, warn};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Semaphore;

/// Maximum request line length in bytes, newline excluded (1 MiB)
pub const MAX_LINE_SIZE: usize = 1024 * 1024;

/// Maximum number of concurrently served connections
pub const MAX_CONNECTIONS: usize = 100;

/// Turns one request line into one response line
pub trait Handler: Send + Sync + 'static {
    fn handle<'a>(&'a self, line: &'a str) -> BoxFuture<'a, String>;

    /// Response line reporting a transport failure in the handler's reply format
    fn error_reply(&self, message: &str) -> String;
}

/// A bound Unix socket listener that removes its socket file when done
pub struct SocketServer {
    listener: UnixListener,
    path: PathBuf,
    max_line: usize,
    max_connections: usize,
}

impl SocketServer {
    /// Bind to `path`, replacing a stale socket left by an earlier run
    pub fn bind(path: impl AsRef<Path>) -> Result<Self, TransportError> {
        let path = path.as_ref().to_path_buf();
        if path.as_os_str().is_empty() {
            return Err(TransportError::SocketPath("socket path is empty".to_string()));
        }

        Self::cleanup_socket(&path)?;
        let listener = UnixListener::bind(&path).map_err(|e| {
            TransportError::SocketPath(format!("failed to bind {}: {}", path.display(), e))
        })?;
        info!("Listening on {}", path.display());

        Ok(Self {
            listener,
            path,
            max_line: MAX_LINE_SIZE,
            max_connections: MAX_CONNECTIONS,
        })
    }

    /// Override the line length and connection limits
    pub fn with_limits(mut self, max_line: usize, max_connections: usize) -> Self {
        self.max_line = max_line;
        self.max_connections = max_connections;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove a stale socket file if one exists; refuse to touch anything else
    fn cleanup_socket(path: &Path) -> Result<(), TransportError> {
        use std::os::unix::fs::FileTypeExt;

        let metadata = match std::fs::symlink_metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        if !metadata.file_type().is_socket() {
            return Err(TransportError::SocketPath(format!(
                "{} exists but is not a socket",
                path.display()
            )));
        }

        std::fs::remove_file(path)?;
        debug!("Removed stale socket file {}", path.display());
        Ok(())
    }

    /// Accept connections until `shutdown` resolves, then remove the socket file
    pub async fn serve<H, S>(self, handler: Arc<H>, shutdown: S) -> Result<(), TransportError>
    where
        H: Handler,
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let connections = Arc::new(Semaphore::new(self.max_connections));

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, no longer accepting connections");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, _)) => {
                        let handler = Arc::clone(&handler);
                        let max_line = self.max_line;
                        let Ok(permit) = Arc::clone(&connections).try_acquire_owned() else {
                            let limit = TransportError::TooManyConnections {
                                max: self.max_connections,
                            };
                            warn!("Rejecting connection: {}", limit);
                            tokio::spawn(async move {
                                let (_, mut writer) = stream.into_split();
                                let reply = handler.error_reply(&limit.to_string());
                                if let Err(e) = write_line(&mut writer, reply).await {
                                    debug!("Failed to send rejection: {}", e);
                                }
                            });
                            continue;
                        };
                        tokio::spawn(async move {
                            let _permit = permit;
                            if let Err(e) = serve_connection(stream, handler, max_line).await {
                                warn!("Connection closed with error: {}", e);
                            }
                        });
                    }
                    Err(e) => error!("Failed to accept connection: {}", e),
                },
            }
        }

        Ok(())
    }

    fn cleanup(&self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove socket {}: {}", self.path.display(), e);
            }
        } else {
            info!("Removed socket file {}", self.path.display());
        }
    }
}

impl Drop for SocketServer {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Future that resolves on the first SIGINT or SIGTERM
///
/// Installs the process-wide signal handler, so it can be called only once.
pub fn shutdown_signal() -> Result<impl Future<Output = ()> + Send, TransportError> {
    let (sender, mut receiver) = tokio::sync::mpsc::unbounded_channel();
    ctrlc::set_handler(move || {
        info!("Received termination signal, shutting down gracefully...");
        if let Err(e) = sender.send(()) {
            error!("Failed to send shutdown signal: {}", e);
        }
    })?;

    Ok(async move {
        receiver.recv().await;
    })
}

async fn serve_connection<H: Handler>(
    stream: UnixStream,
    handler: Arc<H>,
    max_line: usize,
) -> Result<(), TransportError> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    // One extra byte for the newline
    let limit = u64::try_from(max_line).unwrap_or(u64::MAX).saturating_add(1);

    loop {
        buf.clear();
        let read = (&mut reader).take(limit).read_until(b'\n', &mut buf).await?;
        if read == 0 {
            break;
        }

        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        } else if buf.len() > max_line {
            // The rest of the line is still unread, so the stream cannot be resynced
            let err = TransportError::LineTooLong { max: max_line };
            warn!("Closing connection: {}", err);
            write_line(&mut writer, handler.error_reply(&err.to_string())).await?;
            return Ok(());
        }

        let response = match std::str::from_utf8(&buf) {
            Ok(line) if line.trim().is_empty() => continue,
            Ok(line) => handler.handle(line).await,
            Err(e) => handler.error_reply(&format!("request is not valid UTF-8: {}", e)),
        };
        write_line(&mut writer, response).await?;
    }

    debug!("Connection closed by peer");
    Ok(())
}

async fn write_line(writer: &mut OwnedWriteHalf, mut line: String) -> Result<(), TransportError> {
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::sync::oneshot;

    /// Echoes the request line in upper case
    struct Upper;

    impl Handler for Upper {
        fn handle<'a>(&'a self, line: &'a str) -> BoxFuture<'a, String> {
            Box::pin(async move { line.to_uppercase() })
        }

        fn error_reply(&self, message: &str) -> String {
            format!("ERROR {}", message)
        }
    }

    async fn roundtrip(path: &Path, lines: &[&str]) -> Vec<String> {
        let stream = UnixStream::connect(path).await.unwrap();
        let (reader, mut writer) = stream.into_split();
        let mut replies = BufReader::new(reader).lines();

        let mut out = Vec::new();
        for line in lines {
            writer.write_all(format!("{}\n", line).as_bytes()).await.unwrap();
            out.push(replies.next_line().await.unwrap().unwrap());
        }
        out
    }

    #[tokio::test]
    async fn test_serves_lines_and_cleans_up() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("plugin.sock");

        let server = SocketServer::bind(&path).unwrap();
        assert_eq!(server.path(), path);
        let (stop, stopped) = oneshot::channel::<()>();
        let task = tokio::spawn(server.serve(Arc::new(Upper), async move {
            let _ = stopped.await;
        }));

        let replies = roundtrip(&path, &["ping", "pong"]).await;
        assert_eq!(replies, vec!["PING", "PONG"]);

        stop.send(()).unwrap();
        task.await.unwrap().unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_concurrent_connections() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("plugin.sock");

        let server = SocketServer::bind(&path).unwrap();
        let (stop, stopped) = oneshot::channel::<()>();
        let task = tokio::spawn(server.serve(Arc::new(Upper), async move {
            let _ = stopped.await;
        }));

        let (a, b) = tokio::join!(roundtrip(&path, &["a"]), roundtrip(&path, &["b"]));
        assert_eq!(a, vec!["A"]);
        assert_eq!(b, vec!["B"]);

        stop.send(()).unwrap();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_oversized_line_gets_error_and_close() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("plugin.sock");

        let server = SocketServer::bind(&path).unwrap().with_limits(16, 4);
        let (stop, stopped) = oneshot::channel::<()>();
        let task = tokio::spawn(server.serve(Arc::new(Upper), async move {
            let _ = stopped.await;
        }));

        // A line of exactly the limit is still served
        let replies = roundtrip(&path, &["abcdefghijklmnop"]).await;
        assert_eq!(replies, vec!["ABCDEFGHIJKLMNOP"]);

        let stream = UnixStream::connect(&path).await.unwrap();
        let (reader, mut writer) = stream.into_split();
        let mut replies = BufReader::new(reader).lines();
        writer.write_all(&[b'a'; 17]).await.unwrap();

        let reply = replies.next_line().await.unwrap().unwrap();
        assert_eq!(reply, "ERROR Request line exceeds 16 bytes");
        assert!(replies.next_line().await.unwrap().is_none());

        stop.send(()).unwrap();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_connection_limit_rejects_extra_clients() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("plugin.sock");

        let server = SocketServer::bind(&path).unwrap().with_limits(MAX_LINE_SIZE, 1);
        let (stop, stopped) = oneshot::channel::<()>();
        let task = tokio::spawn(server.serve(Arc::new(Upper), async move {
            let _ = stopped.await;
        }));

        // Hold the only slot open
        let first = UnixStream::connect(&path).await.unwrap();
        let (first_reader, mut first_writer) = first.into_split();
        let mut first_replies = BufReader::new(first_reader).lines();
        first_writer.write_all(b"hold\n").await.unwrap();
        assert_eq!(first_replies.next_line().await.unwrap().unwrap(), "HOLD");

        let second = UnixStream::connect(&path).await.unwrap();
        let mut second_replies = BufReader::new(second).lines();
        assert_eq!(
            second_replies.next_line().await.unwrap().unwrap(),
            "ERROR Too many connections (max 1)"
        );
        assert!(second_replies.next_line().await.unwrap().is_none());

        stop.send(()).unwrap();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_invalid_utf8_gets_error_reply() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("plugin.sock");

        let server = SocketServer::bind(&path).unwrap();
        let (stop, stopped) = oneshot::channel::<()>();
        let task = tokio::spawn(server.serve(Arc::new(Upper), async move {
            let _ = stopped.await;
        }));

        let stream = UnixStream::connect(&path).await.unwrap();
        let (reader, mut writer) = stream.into_split();
        let mut replies = BufReader::new(reader).lines();
        writer.write_all(b"\xff\xfe\nok\n").await.unwrap();

        let reply = replies.next_line().await.unwrap().unwrap();
        assert!(reply.starts_with("ERROR request is not valid UTF-8"));
        assert_eq!(replies.next_line().await.unwrap().unwrap(), "OK");

        stop.send(()).unwrap();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_bind_replaces_stale_socket() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("plugin.sock");

        let first = SocketServer::bind(&path).unwrap();
        // Leave the socket file behind
        std::mem::forget(first);
        assert!(path.exists());

        let second = SocketServer::bind(&path).unwrap();
        assert!(second.path().exists());
    }

    #[tokio::test]
    async fn test_bind_refuses_regular_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("not-a-socket");
        std::fs::write(&path, "keep me").unwrap();

        let err = SocketServer::bind(&path).err().unwrap();
        assert!(matches!(err, TransportError::SocketPath(_)));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "keep me");
    }

    #[tokio::test]
    async fn test_bind_rejects_empty_path() {
        assert!(matches!(
            SocketServer::bind(""),
            Err(TransportError::SocketPath(_))
        ));
    }
}
