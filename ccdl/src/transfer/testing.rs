//! Scripted transport for unit tests.

use std::collections::HashMap;
use std::io::{self, Cursor, Read};
use std::sync::Mutex;

use super::headers::HeaderSet;
use super::http::{Transport, TransportError, TransportResponse};

#[derive(Debug, Clone, Default)]
struct Route {
    body: Vec<u8>,
    declared: Option<u64>,
    transient_failures: u32,
    get_failures: u32,
    broken_bodies: u32,
    always_fail: bool,
}

/// Body that yields half its bytes, then a connection reset.
struct BrokenBody {
    inner: Cursor<Vec<u8>>,
}

impl Read for BrokenBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            ));
        }
        Ok(n)
    }
}

/// In-memory transport serving canned bodies by exact URL.
///
/// Unknown URLs fail with a fatal error.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, Route>>,
    gets: Mutex<Vec<String>>,
    heads: Mutex<Vec<String>>,
    headers_seen: Mutex<Vec<(String, HeaderSet)>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` with an accurate content length.
    pub fn serve(&self, url: &str, body: Vec<u8>) {
        let declared = Some(body.len() as u64);
        self.routes.lock().unwrap().insert(
            url.to_string(),
            Route {
                body,
                declared,
                ..Default::default()
            },
        );
    }

    /// Serve `body` while declaring `declared` bytes.
    pub fn serve_truncated(&self, url: &str, body: Vec<u8>, declared: u64) {
        self.routes.lock().unwrap().insert(
            url.to_string(),
            Route {
                body,
                declared: Some(declared),
                ..Default::default()
            },
        );
    }

    /// Fail the next `count` requests to `url` with a transient error.
    pub fn fail_next(&self, url: &str, count: u32) {
        self.routes
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .transient_failures = count;
    }

    /// Fail the next `count` GET requests to `url` with a transient error.
    /// HEAD requests still succeed.
    pub fn fail_next_get(&self, url: &str, count: u32) {
        self.routes
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .get_failures = count;
    }

    /// Cut the body of the next `count` GET responses for `url` off halfway
    /// with a read error.
    pub fn break_body_next(&self, url: &str, count: u32) {
        self.routes
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .broken_bodies = count;
    }

    /// Fail every request to `url` with a transient error.
    pub fn fail_always(&self, url: &str) {
        self.routes
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .always_fail = true;
    }

    pub fn get_count(&self, url: &str) -> usize {
        self.gets.lock().unwrap().iter().filter(|u| *u == url).count()
    }

    pub fn head_count(&self, url: &str) -> usize {
        self.heads.lock().unwrap().iter().filter(|u| *u == url).count()
    }

    pub fn total_requests(&self) -> usize {
        self.gets.lock().unwrap().len() + self.heads.lock().unwrap().len()
    }

    /// Headers sent with the most recent request to `url`.
    pub fn last_headers(&self, url: &str) -> Option<HeaderSet> {
        self.headers_seen
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(u, _)| u == url)
            .map(|(_, h)| h.clone())
    }

    fn route(&self, url: &str, headers: &HeaderSet) -> Result<Route, TransportError> {
        self.headers_seen
            .lock()
            .unwrap()
            .push((url.to_string(), headers.clone()));

        let mut routes = self.routes.lock().unwrap();
        let route = routes
            .get_mut(url)
            .ok_or_else(|| TransportError::Fatal(format!("no route for {}", url)))?;

        if route.always_fail {
            return Err(TransportError::Transient("connection refused".to_string()));
        }
        if route.transient_failures > 0 {
            route.transient_failures -= 1;
            return Err(TransportError::Transient("timed out".to_string()));
        }
        Ok(route.clone())
    }
}

impl Transport for ScriptedTransport {
    fn head(&self, url: &str, headers: &HeaderSet) -> Result<Option<u64>, TransportError> {
        self.heads.lock().unwrap().push(url.to_string());
        self.route(url, headers).map(|r| r.declared)
    }

    fn get(&self, url: &str, headers: &HeaderSet) -> Result<TransportResponse, TransportError> {
        self.gets.lock().unwrap().push(url.to_string());
        let route = self.route(url, headers)?;

        let mut routes = self.routes.lock().unwrap();
        let stored = routes
            .get_mut(url)
            .ok_or_else(|| TransportError::Fatal(format!("no route for {}", url)))?;
        if stored.get_failures > 0 {
            stored.get_failures -= 1;
            return Err(TransportError::Transient("connection refused".to_string()));
        }
        let body: Box<dyn Read + Send> = if stored.broken_bodies > 0 {
            stored.broken_bodies -= 1;
            let half = route.body.len() / 2;
            Box::new(BrokenBody {
                inner: Cursor::new(route.body[..half].to_vec()),
            })
        } else {
            Box::new(Cursor::new(route.body))
        };

        Ok(TransportResponse {
            status: 200,
            content_length: route.declared,
            body,
        })
    }
}
