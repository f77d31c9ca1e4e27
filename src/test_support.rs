//! Local HTTP fixture shared by the module tests.

use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

pub struct Reply {
    pub status: u16,
    pub body: Vec<u8>,
    pub content_type: &'static str,
}

impl Reply {
    pub fn html(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into().into_bytes(),
            content_type: "text/html; charset=utf-8",
        }
    }

    pub fn text(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into().into_bytes(),
            content_type: "text/plain; charset=utf-8",
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: b"error".to_vec(),
            content_type: "text/plain",
        }
    }
}

pub struct TestServer {
    pub base_url: String,
    hits: Arc<Mutex<HashMap<String, usize>>>,
    shutdown_tx: mpsc::Sender<()>,
    handle: Option<thread::JoinHandle<()>>,
}

impl TestServer {
    /// Number of requests received for `path` (path plus query, as sent).
    pub fn hits(&self, path: &str) -> usize {
        self.hits
            .lock()
            .expect("hits lock")
            .get(path)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_hits(&self) -> usize {
        self.hits.lock().expect("hits lock").values().sum()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Serves `handler(path, previous_hits_for_path)` until the server is dropped.
pub fn spawn_server<F>(handler: F) -> TestServer
where
    F: Fn(&str, usize) -> Reply + Send + 'static,
{
    let server = tiny_http::Server::http("127.0.0.1:0").expect("start tiny_http server");
    let base_url = format!("http://{}", server.server_addr());
    let hits: Arc<Mutex<HashMap<String, usize>>> = Arc::default();
    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

    let server_hits = Arc::clone(&hits);
    let handle = thread::spawn(move || {
        loop {
            if shutdown_rx.try_recv().is_ok() {
                break;
            }
            let request = match server.recv_timeout(Duration::from_millis(20)) {
                Ok(Some(req)) => req,
                Ok(None) => continue,
                Err(_) => break,
            };

            let url = request.url().to_string();
            let previous = {
                let mut hits = server_hits.lock().expect("hits lock");
                let count = hits.entry(url.clone()).or_insert(0);
                let previous = *count;
                *count += 1;
                previous
            };

            let reply = handler(&url, previous);
            let header =
                tiny_http::Header::from_bytes(&b"Content-Type"[..], reply.content_type.as_bytes())
                    .expect("content-type header");
            let response = tiny_http::Response::from_data(reply.body)
                .with_status_code(reply.status)
                .with_header(header);
            let _ = request.respond(response);
        }
    });

    TestServer {
        base_url,
        hits,
        shutdown_tx,
        handle: Some(handle),
    }
}
