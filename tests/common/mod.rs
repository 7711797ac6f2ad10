//! Shared test doubles: scripted transport, log capture and a local HTTP stub

#![allow(dead_code)]

use apod_downloader::fetcher::{
    ApodTransport, FetcherError, FetcherResult, RetryErrorType, UpstreamResponse,
};
use apod_downloader::Record;
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::StatusCode;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Body the upstream would send for `date`
pub fn apod_body(date: &str) -> String {
    json!({
        "date": date,
        "title": format!("Picture of {date}"),
        "explanation": "A scripted entry.",
        "media_type": "image",
        "url": format!("https://apod.nasa.gov/apod/image/{date}.jpg"),
        "service_version": "v1"
    })
    .to_string()
}

pub fn apod_record(date: &str) -> Record {
    serde_json::from_str(&apod_body(date)).unwrap()
}

/// One scripted transport outcome
#[derive(Debug, Clone)]
pub enum Reply {
    Respond(UpstreamResponse),
    NetworkError,
}

impl Reply {
    pub fn ok(date: &str) -> Self {
        Reply::Respond(UpstreamResponse::new(StatusCode::OK, apod_body(date)))
    }

    pub fn status(code: u16) -> Self {
        Reply::Respond(UpstreamResponse::new(
            StatusCode::from_u16(code).unwrap(),
            r#"{"code":0,"msg":"scripted"}"#,
        ))
    }

    pub fn too_many_requests() -> Self {
        Reply::status(429)
    }

    /// 200 with `X-RateLimit-Remaining: 0`
    pub fn quota_exhausted(date: &str, retry_after: Option<u64>) -> Self {
        let mut response = UpstreamResponse::new(StatusCode::OK, apod_body(date)).with_remaining(0);
        if let Some(secs) = retry_after {
            response = response.with_retry_after(Duration::from_secs(secs));
        }
        Reply::Respond(response)
    }

    pub fn body(body: &str) -> Self {
        Reply::Respond(UpstreamResponse::new(StatusCode::OK, body))
    }
}

/// In-memory [`ApodTransport`].
///
/// Each date has a queue of replies; the last reply in a queue repeats once
/// the others are used up. Dates without a script answer with a normal entry.
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, date: &str, replies: Vec<Reply>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(date.to_string(), replies.into());
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, date: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|d| *d == date).count()
    }

    fn next_reply(&self, date: &str) -> Reply {
        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(date) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) if queue.len() == 1 => queue.front().cloned().unwrap(),
            _ => Reply::ok(date),
        }
    }
}

#[async_trait]
impl ApodTransport for ScriptedTransport {
    async fn get_date(&self, date: &str) -> FetcherResult<UpstreamResponse> {
        self.calls.lock().unwrap().push(date.to_string());
        match self.next_reply(date) {
            Reply::Respond(response) => Ok(response),
            Reply::NetworkError => Err(FetcherError::Network {
                kind: RetryErrorType::NetworkOffline,
                message: "connection refused".to_string(),
            }),
        }
    }

    fn base_url(&self) -> &str {
        "scripted://apod"
    }
}

/// Captures formatted tracing output for assertions.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route this thread's tracing output into the capture until the guard drops.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .without_time()
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.contents().contains(needle)
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Canned HTTP response for [`StubServer`]
#[derive(Debug, Clone)]
pub struct StubResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl StubResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    fn render(&self) -> String {
        let reason = StatusCode::from_u16(self.status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown");
        let mut out = format!("HTTP/1.1 {} {}\r\n", self.status, reason);
        out.push_str("Content-Type: application/json\r\n");
        out.push_str(&format!("Content-Length: {}\r\n", self.body.len()));
        out.push_str("Connection: close\r\n");
        for (name, value) in &self.headers {
            out.push_str(&format!("{name}: {value}\r\n"));
        }
        out.push_str("\r\n");
        out.push_str(&self.body);
        out
    }
}

/// Minimal HTTP/1.1 server answering requests from a script.
///
/// Responses are served in order; the last one repeats. Request lines are
/// recorded for inspection.
pub struct StubServer {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<String>>>,
}

impl StubServer {
    pub async fn start(responses: Vec<StubResponse>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let queue = Arc::new(Mutex::new(VecDeque::from(responses)));

        let recorded = requests.clone();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };

                let mut buffer = Vec::new();
                let mut chunk = [0u8; 1024];
                loop {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            buffer.extend_from_slice(&chunk[..n]);
                            if buffer.windows(4).any(|w| w == b"\r\n\r\n") {
                                break;
                            }
                        }
                    }
                }

                let request = String::from_utf8_lossy(&buffer);
                let request_line = request.lines().next().unwrap_or_default().to_string();
                recorded.lock().unwrap().push(request_line);

                let response = {
                    let mut queue = queue.lock().unwrap();
                    if queue.len() > 1 {
                        queue.pop_front()
                    } else {
                        queue.front().cloned()
                    }
                };
                if let Some(response) = response {
                    let _ = socket.write_all(response.render().as_bytes()).await;
                    let _ = socket.shutdown().await;
                }
            }
        });

        Self { addr, requests }
    }

    pub fn url(&self) -> String {
        format!("http://{}/planetary/apod", self.addr)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

/// Address nothing is listening on
pub async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/planetary/apod")
}

/// Server that accepts connections and never answers
pub async fn silent_server_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    format!("http://{addr}/planetary/apod")
}
