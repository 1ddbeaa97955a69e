use std::io::Read;
use std::sync::Arc;
use std::thread;

use anyhow::{anyhow, Result};
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tiny_http::{Header, Method, Request, Response};

use crate::config::Config;
use crate::error::BridgeError;
use crate::executor::{CommandPolicy, Executor};
use crate::handlers::{AutocompleteRequest, Bridge, ExecuteRequest, ExecuteResponse};
use crate::platform::Platform;

const MAX_BODY: u64 = 1 << 20;

pub struct Server {
    config: Config,
    bridge: Arc<Bridge>,
}

impl Server {
    pub fn new(config: Config) -> Self {
        let platform = Platform::detect();
        let executor = Executor::new(platform, config.timeout);
        let policy = CommandPolicy::new(config.allow_list.clone());
        Server { bridge: Arc::new(Bridge::new(platform, executor, policy)), config }
    }

    pub fn run(self) -> Result<()> {
        let addr = self.config.addr();
        let http = tiny_http::Server::http(&addr).map_err(|e| anyhow!("failed to bind {}: {}", addr, e))?;
        info!("termbridge listening on http://{}", addr);
        info!("command timeout {}s, allow-list: {}", self.config.timeout.as_secs(),
            self.config.allow_list.as_ref().map(|l| l.join(",")).unwrap_or_else(|| "off".to_string()));
        // one thread per request: handlers block on the shell
        for request in http.incoming_requests() {
            let bridge = Arc::clone(&self.bridge);
            thread::spawn(move || handle(&bridge, request));
        }
        Ok(())
    }
}

fn handle(bridge: &Bridge, mut request: Request) {
    let method = request.method().clone();
    let path = request.url().split('?').next().unwrap_or("").to_string();
    let (status, body) = match read_body(&mut request) {
        Ok(body) => route(bridge, &method, &path, &body),
        Err(e) => bad_request(&path, &e),
    };
    debug!("{} {} -> {}", method, path, status);
    let mut resp = Response::from_string(body).with_status_code(status);
    if let Ok(h) = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]) {
        resp = resp.with_header(h);
    }
    if let Err(e) = request.respond(resp) {
        warn!("failed to send response for {}: {}", path, e);
    }
}

fn read_body(request: &mut Request) -> Result<String, BridgeError> {
    let mut body = String::new();
    request.as_reader().take(MAX_BODY).read_to_string(&mut body)
        .map_err(|e| BridgeError::BadRequest(e.to_string()))?;
    Ok(body)
}

/// Dispatch one request by method and path. Returns status and JSON body.
pub fn route(bridge: &Bridge, method: &Method, path: &str, body: &str) -> (u16, String) {
    match (path, method) {
        ("/api/execute", Method::Post) => match parse::<ExecuteRequest>(body) {
            Ok(req) => {
                let (status, resp) = bridge.execute(req);
                (status, to_json(&resp))
            }
            Err(e) => bad_request(path, &e),
        },
        ("/api/autocomplete", Method::Post) => match parse::<AutocompleteRequest>(body) {
            Ok(req) => (200, to_json(&bridge.autocomplete(req))),
            Err(e) => bad_request(path, &e),
        },
        ("/api/execute", _) | ("/api/autocomplete", _) => (405, json!({"error": "method not allowed"}).to_string()),
        _ => (404, json!({"error": "not found"}).to_string()),
    }
}

fn parse<T: DeserializeOwned + Default>(body: &str) -> Result<T, BridgeError> {
    if body.trim().is_empty() {
        return Ok(T::default());
    }
    serde_json::from_str(body).map_err(|e| BridgeError::BadRequest(e.to_string()))
}

fn bad_request(path: &str, e: &BridgeError) -> (u16, String) {
    let body = if path == "/api/execute" {
        to_json(&ExecuteResponse::from_error(e, None))
    } else {
        json!({"error": e.to_string()}).to_string()
    };
    (e.status(), body)
}

fn to_json<T: Serialize>(v: &T) -> String { serde_json::to_string(v).unwrap_or_else(|_| "{}".to_string()) }
