// Local HTTP fixture for download tests: serves one in-memory resource with
// byte-range support and injectable faults, so tests control exactly what the
// probe and the ranged GETs see.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    None,
    /// Range responses starting at this offset declare one byte more than the
    /// requested segment length.
    WrongLengthAt(u64),
    /// The metadata probe response carries no content-length.
    NoContentLength,
    /// Range responses starting at this offset declare the correct length but
    /// close the connection halfway through the body.
    TruncateBodyAt(u64),
    /// Range responses are written in pieces with pauses, keeping fetch tasks
    /// alive long enough to observe them running.
    Throttle,
}

pub struct TestServer {
    addr: std::net::SocketAddr,
    handle: tokio::task::JoinHandle<()>,
    ranged_gets: Arc<std::sync::atomic::AtomicUsize>,
}

impl TestServer {
    pub async fn spawn(data: Vec<u8>, fault: Fault) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let data = Arc::new(data);
        let ranged_gets = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = Arc::clone(&ranged_gets);

        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let data = Arc::clone(&data);
                let counter = Arc::clone(&counter);
                tokio::spawn(async move {
                    serve_connection(stream, data, fault, counter).await;
                });
            }
        });

        TestServer {
            addr,
            handle,
            ranged_gets,
        }
    }

    pub fn url(&self, file_name: &str) -> String {
        format!("http://{}/{}", self.addr, file_name)
    }

    /// Number of ranged GET requests served so far.
    pub fn ranged_gets(&self) -> usize {
        self.ranged_gets.load(std::sync::atomic::Ordering::SeqCst)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve_connection(
    mut stream: TcpStream,
    data: Arc<Vec<u8>>,
    fault: Fault,
    ranged_gets: Arc<std::sync::atomic::AtomicUsize>,
) {
    let Some(request) = read_request(&mut stream).await else {
        return;
    };
    let method = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().next())
        .unwrap_or("")
        .to_string();
    let range = parse_range_header(&request);

    match (method.as_str(), range) {
        ("HEAD", _) => {
            let response = if fault == Fault::NoContentLength {
                "HTTP/1.1 200 OK\r\nAccept-Ranges: bytes\r\nConnection: close\r\n\r\n".to_string()
            } else {
                format!(
                    "HTTP/1.1 200 OK\r\nAccept-Ranges: bytes\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    data.len()
                )
            };
            let _ = stream.write_all(response.as_bytes()).await;
        }
        ("GET", Some((start, end))) => {
            ranged_gets.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            let body = &data[start as usize..=end as usize];
            let declared = match fault {
                Fault::WrongLengthAt(offset) if offset == start => body.len() as u64 + 1,
                _ => body.len() as u64,
            };
            let header = format!(
                "HTTP/1.1 206 Partial Content\r\nContent-Range: bytes {}-{}/{}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                start,
                end,
                data.len(),
                declared
            );
            let _ = stream.write_all(header.as_bytes()).await;
            match fault {
                Fault::TruncateBodyAt(offset) if offset == start => {
                    // Correct declared length, half the bytes, then close.
                    let _ = stream.write_all(&body[..body.len() / 2]).await;
                }
                _ => write_body(&mut stream, body, fault).await,
            }
        }
        ("GET", None) => {
            let header = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                data.len()
            );
            let _ = stream.write_all(header.as_bytes()).await;
            let _ = stream.write_all(&data).await;
        }
        _ => {
            let _ = stream
                .write_all(b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                .await;
        }
    }
    let _ = stream.flush().await;
}

async fn write_body(stream: &mut TcpStream, body: &[u8], fault: Fault) {
    if fault == Fault::Throttle && !body.is_empty() {
        let piece = (body.len() / 4).max(1);
        for chunk in body.chunks(piece) {
            if stream.write_all(chunk).await.is_err() {
                return;
            }
            let _ = stream.flush().await;
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    } else {
        let _ = stream.write_all(body).await;
    }
}

async fn read_request(stream: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.windows(4).any(|w| w == b"\r\n\r\n") {
            return Some(String::from_utf8_lossy(&buf).into_owned());
        }
    }
}

/// Parses `Range: bytes=a-b` (inclusive offsets) from a raw request.
fn parse_range_header(request: &str) -> Option<(u64, u64)> {
    let value = request.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if name.trim().eq_ignore_ascii_case("range") {
            Some(value.trim().to_string())
        } else {
            None
        }
    })?;
    let spec = value.strip_prefix("bytes=")?;
    let (start, end) = spec.split_once('-')?;
    Some((start.parse().ok()?, end.parse().ok()?))
}
