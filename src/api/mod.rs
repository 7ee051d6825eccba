//! HTTP transport for the scoring pipeline.
//!
//! One thread per accepted connection; the pipeline serializes frames per camera.
//!
//! - `POST /frames`: submit a frame, respond with a detection result or error event
//! - `GET /status`: capability status
//! - `GET /health`: liveness plus model availability

use crate::pipeline::{FrameOutcome, FrameSubmission, Pipeline};
use anyhow::{anyhow, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

const MAX_HEADER_BYTES: usize = 8192;
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;
const READ_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub addr: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:5000".to_string(),
        }
    }
}

#[derive(Debug)]
pub struct ApiHandle {
    pub addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl ApiHandle {
    pub fn stop(mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            join.join()
                .map_err(|_| anyhow!("api server thread panicked"))?;
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    object_detector_loaded: bool,
    action_recognizer_loaded: bool,
}

pub struct ApiServer {
    cfg: ApiConfig,
    pipeline: Arc<Pipeline>,
}

impl ApiServer {
    pub fn new(cfg: ApiConfig, pipeline: Arc<Pipeline>) -> Self {
        Self { cfg, pipeline }
    }

    pub fn spawn(self) -> Result<ApiHandle> {
        let configured_addr: SocketAddr = self.cfg.addr.parse()?;
        let listener = TcpListener::bind(configured_addr)?;
        let addr = listener.local_addr()?;
        listener.set_nonblocking(true)?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_thread = shutdown.clone();
        let pipeline = self.pipeline;
        let join = std::thread::spawn(move || {
            if let Err(err) = run_api(listener, pipeline, shutdown_thread) {
                log::error!("scoring api stopped: {}", err);
            }
        });

        Ok(ApiHandle {
            addr,
            shutdown,
            join: Some(join),
        })
    }
}

fn run_api(
    listener: TcpListener,
    pipeline: Arc<Pipeline>,
    shutdown: Arc<AtomicBool>,
) -> Result<()> {
    loop {
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        match listener.accept() {
            Ok((stream, peer)) => {
                let pipeline = pipeline.clone();
                std::thread::spawn(move || {
                    if let Err(err) = handle_connection(stream, &pipeline) {
                        log::warn!("request from {} rejected: {}", peer, err);
                    }
                });
            }
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(Duration::from_millis(20));
                continue;
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

fn handle_connection(mut stream: TcpStream, pipeline: &Pipeline) -> Result<()> {
    stream.set_nonblocking(false)?;
    let request = match read_request(&mut stream) {
        Ok(request) => request,
        Err(err) => {
            let body = error_body(&err.to_string())?;
            write_json_response(&mut stream, 400, &body)?;
            return Err(err);
        }
    };

    match (request.method.as_str(), request.path.as_str()) {
        ("OPTIONS", _) => write_response(&mut stream, 204, "text/plain", b""),
        ("GET", "/health") => {
            let status = pipeline.capabilities();
            let body = serde_json::to_vec(&HealthResponse {
                status: "healthy",
                object_detector_loaded: status.object_detector,
                action_recognizer_loaded: status.action_recognizer,
            })?;
            write_json_response(&mut stream, 200, &body)
        }
        ("GET", "/status") => {
            let body = serde_json::to_vec(&pipeline.capabilities())?;
            write_json_response(&mut stream, 200, &body)
        }
        ("POST", "/frames") => {
            let submission: FrameSubmission = match serde_json::from_slice(&request.body) {
                Ok(submission) => submission,
                Err(err) => {
                    let body = error_body(&format!("invalid frame submission: {}", err))?;
                    return write_json_response(&mut stream, 400, &body);
                }
            };
            let outcome = pipeline.submit(&submission);
            let body = serde_json::to_vec(&outcome)?;
            write_json_response(&mut stream, 200, &body)
        }
        (_, "/health" | "/status" | "/frames") => {
            write_json_response(&mut stream, 405, br#"{"error":"method_not_allowed"}"#)
        }
        _ => write_json_response(&mut stream, 404, br#"{"error":"not_found"}"#),
    }
}

fn error_body(message: &str) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(&FrameOutcome::Error {
        message: message.to_string(),
    })?)
}

fn read_request(stream: &mut TcpStream) -> Result<HttpRequest> {
    stream.set_read_timeout(Some(READ_TIMEOUT))?;
    let mut buf = [0u8; 4096];
    let mut data = Vec::new();
    let header_end = loop {
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        if data.len() > MAX_HEADER_BYTES {
            return Err(anyhow!("request headers too large"));
        }
        let n = stream.read(&mut buf)?;
        if n == 0 {
            return Err(anyhow!("connection closed before headers completed"));
        }
        data.extend_from_slice(&buf[..n]);
    };

    let text = String::from_utf8_lossy(&data[..header_end]);
    let mut lines = text.split("\r\n");
    let request_line = lines.next().ok_or_else(|| anyhow!("empty request"))?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().ok_or_else(|| anyhow!("missing method"))?;
    let raw_path = parts.next().ok_or_else(|| anyhow!("missing path"))?;
    let mut headers = HashMap::new();
    for line in lines {
        if let Some((k, v)) = line.split_once(':') {
            headers.insert(k.trim().to_lowercase(), v.trim().to_string());
        }
    }

    let content_length = match headers.get("content-length") {
        Some(value) => value
            .parse::<usize>()
            .map_err(|_| anyhow!("invalid content-length"))?,
        None => 0,
    };
    if content_length > MAX_BODY_BYTES {
        return Err(anyhow!("request body too large"));
    }

    let mut body = data[header_end + 4..].to_vec();
    if body.len() < content_length {
        let already = body.len();
        body.resize(content_length, 0);
        stream.read_exact(&mut body[already..])?;
    }
    body.truncate(content_length);

    let path = raw_path.split('?').next().unwrap_or(raw_path).to_string();
    Ok(HttpRequest {
        method: method.to_string(),
        path,
        body,
    })
}

fn write_json_response(stream: &mut TcpStream, status: u16, body: &[u8]) -> Result<()> {
    write_response(stream, status, "application/json", body)
}

fn write_response(
    stream: &mut TcpStream,
    status: u16,
    content_type: &str,
    body: &[u8],
) -> Result<()> {
    let status_line = match status {
        200 => "HTTP/1.1 200 OK",
        204 => "HTTP/1.1 204 No Content",
        400 => "HTTP/1.1 400 Bad Request",
        404 => "HTTP/1.1 404 Not Found",
        405 => "HTTP/1.1 405 Method Not Allowed",
        _ => "HTTP/1.1 500 Internal Server Error",
    };
    let header = format!(
        "{status_line}\r\nContent-Type: {content_type}\r\nContent-Length: {len}\r\nCache-Control: no-store\r\nAccess-Control-Allow-Origin: *\r\nAccess-Control-Allow-Headers: Content-Type\r\nAccess-Control-Allow-Methods: GET, POST, OPTIONS\r\nConnection: close\r\n\r\n",
        status_line = status_line,
        content_type = content_type,
        len = body.len()
    );
    stream.write_all(header.as_bytes())?;
    stream.write_all(body)?;
    stream.flush()?;
    Ok(())
}

#[derive(Debug)]
struct HttpRequest {
    method: String,
    path: String,
    body: Vec<u8>,
}
