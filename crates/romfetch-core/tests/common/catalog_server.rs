//! Minimal HTTP/1.1 server standing in for the catalog site in integration tests.
//!
//! `GET /?device=<name>` answers with the configured HTML page for that device
//! (or a page without builds), `GET /files/<name>` serves archive bodies. Every
//! request line is recorded so tests can assert what was fetched.
//!
//! Stalled routes send part of a response, run a hook (typically raising an
//! interrupt flag) and then hold the connection open until the client hangs up.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Called by a stalled route once the partial response is on the wire.
pub type Hook = Arc<dyn Fn() + Send + Sync>;

/// Upper bound on how long a stalled route keeps the connection open.
const STALL_LIMIT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct Routes {
    /// device -> catalog HTML
    pub pages: HashMap<String, String>,
    /// request path (e.g. "/files/rom.zip") -> body
    pub files: HashMap<String, Vec<u8>>,
    /// Status for every catalog request; anything but 200 sends an empty body.
    pub catalog_status: u16,
    /// request path -> (body, hook); half the body is sent before the stall.
    pub stalled_files: HashMap<String, (Vec<u8>, Hook)>,
    /// When set, catalog requests stall before any byte of the response.
    pub catalog_stall: Option<Hook>,
}

impl Default for Routes {
    fn default() -> Self {
        Self {
            pages: HashMap::new(),
            files: HashMap::new(),
            catalog_status: 200,
            stalled_files: HashMap::new(),
            catalog_stall: None,
        }
    }
}

impl Routes {
    pub fn page(mut self, device: &str, html: String) -> Self {
        self.pages.insert(device.to_string(), html);
        self
    }

    pub fn file(mut self, name: &str, body: Vec<u8>) -> Self {
        self.files.insert(format!("/files/{}", name), body);
        self
    }

    pub fn stalled_file(mut self, name: &str, body: Vec<u8>, hook: Hook) -> Self {
        self.stalled_files
            .insert(format!("/files/{}", name), (body, hook));
        self
    }

    pub fn stalled_catalog(mut self, hook: Hook) -> Self {
        self.catalog_stall = Some(hook);
        self
    }
}

pub struct CatalogServer {
    /// e.g. "http://127.0.0.1:12345/"
    pub base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl CatalogServer {
    pub fn file_url(&self, name: &str) -> String {
        format!("{}files/{}", self.base_url, name)
    }

    /// Request targets seen so far, e.g. `/?device=bacon`, `/files/rom.zip`.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn file_requests(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter(|r| r.starts_with("/files/"))
            .collect()
    }
}

/// HTML for a catalog page listing `(archive href, md5)` rows, newest first.
pub fn catalog_page(rows: &[(&str, &str)]) -> String {
    let mut html = String::from(
        "<html><head><title>Downloads</title></head><body>\n<a href=\"/\">home</a>\n<table>\n",
    );
    for (href, md5) in rows {
        html.push_str(&format!(
            "<tr><td><a href=\"{href}\">{href}</a></td>\
             <td><small class=\"md5\">md5: {md5}</small></td>\
             <td><a href=\"{href}.md5sum\">md5sum</a></td></tr>\n"
        ));
    }
    html.push_str("</table></body></html>\n");
    html
}

/// Starts the server on an ephemeral port. It runs until the process exits.
pub fn start(routes: Routes) -> CatalogServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let routes = Arc::new(routes);
    let requests = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&requests);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let routes = Arc::clone(&routes);
            let log = Arc::clone(&log);
            thread::spawn(move || handle(stream, &routes, &log));
        }
    });
    CatalogServer {
        base_url: format!("http://127.0.0.1:{}/", port),
        requests,
    }
}

fn handle(mut stream: TcpStream, routes: &Routes, log: &Mutex<Vec<String>>) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let request = String::from_utf8_lossy(&buf[..n]);
    let target = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();
    log.lock().unwrap().push(target.clone());

    let (path, query) = target.split_once('?').unwrap_or((target.as_str(), ""));
    if path == "/" {
        if let Some(hook) = &routes.catalog_stall {
            hook();
            if wait_for_hangup(&mut stream) {
                return;
            }
        }
        if routes.catalog_status != 200 {
            respond(&mut stream, routes.catalog_status, "text/html", b"");
            return;
        }
        let device = url::form_urlencoded::parse(query.as_bytes())
            .find(|(k, _)| k == "device")
            .map(|(_, v)| v.into_owned())
            .unwrap_or_default();
        let html = routes
            .pages
            .get(&device)
            .cloned()
            .unwrap_or_else(|| catalog_page(&[]));
        respond(&mut stream, 200, "text/html", html.as_bytes());
        return;
    }
    if let Some((body, hook)) = routes.stalled_files.get(path) {
        let (head, tail) = body.split_at(body.len() / 2);
        let _ = stream.write_all(header(200, "application/zip", body.len()).as_bytes());
        let _ = stream.write_all(head);
        let _ = stream.flush();
        hook();
        if !wait_for_hangup(&mut stream) {
            let _ = stream.write_all(tail);
        }
        return;
    }
    match routes.files.get(path) {
        Some(body) => respond(&mut stream, 200, "application/zip", body),
        None => respond(&mut stream, 404, "text/plain", b"not found"),
    }
}

fn respond(stream: &mut TcpStream, status: u16, content_type: &str, body: &[u8]) {
    let _ = stream.write_all(header(status, content_type, body.len()).as_bytes());
    let _ = stream.write_all(body);
    let _ = stream.flush();
}

fn header(status: u16, content_type: &str, len: usize) -> String {
    let reason = match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Status",
    };
    format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status, reason, content_type, len
    )
}

/// Holds the connection until the client closes it (true) or `STALL_LIMIT`
/// passes (false).
fn wait_for_hangup(stream: &mut TcpStream) -> bool {
    let _ = stream.set_read_timeout(Some(Duration::from_millis(100)));
    let started = Instant::now();
    let mut byte = [0u8; 1];
    while started.elapsed() < STALL_LIMIT {
        match stream.read(&mut byte) {
            Ok(0) => return true,
            Ok(_) => {}
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut => {}
            Err(_) => return true,
        }
    }
    false
}
