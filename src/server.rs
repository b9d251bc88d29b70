//! HTTP front end.
//!
//! Routes:
//! - `GET /?camera=N&res=WxH&flip=1&light=1`: annotated snapshot
//! - `GET /old?res=WxH`: annotated snapshot from camera 0, nothing else
//! - `GET /health`: liveness, touches no hardware
//!
//! Each request is served on its own thread; the coordinator's hardware
//! lock is what serializes them.

use std::sync::Arc;
use std::thread;
use tiny_http::{Header, Method, Request, Response, Server};

use crate::coordinator::CaptureCoordinator;
use crate::error::CaptureError;
use crate::light::Light;
use crate::request::{parse_flag, parse_resolution, CaptureRequest, DEFAULT_RESOLUTION};
use crate::traits::CameraProvider;

/// Body of a 400 for a resolution that does not parse.
pub const INVALID_RESOLUTION_MESSAGE: &str = "Invalid resolution format. Use ?res=WIDTHxHEIGHT";

const LEGACY_CAMERA: u32 = 0;
const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Values used for query parameters a request leaves out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestDefaults {
    /// Camera for `/` without `camera`.
    pub camera_index: u32,
    /// Width without `res`.
    pub width: u32,
    /// Height without `res`.
    pub height: u32,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            camera_index: 0,
            width: DEFAULT_RESOLUTION.0,
            height: DEFAULT_RESOLUTION.1,
        }
    }
}

/// A response before it is handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// HTTP status code.
    pub status: u16,
    /// `Content-Type` header value.
    pub content_type: &'static str,
    /// Response body.
    pub body: Vec<u8>,
}

impl Reply {
    fn text<S: Into<String>>(status: u16, text: S) -> Self {
        Self {
            status,
            content_type: TEXT_PLAIN,
            body: text.into().into_bytes(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Snapshot,
    Legacy,
    Health,
}

impl Route {
    fn from_path(path: &str) -> Option<Self> {
        match path {
            "/" | "" => Some(Self::Snapshot),
            "/old" => Some(Self::Legacy),
            "/health" => Some(Self::Health),
            _ => None,
        }
    }
}

/// Decoded query string. Lookups return the first occurrence of a key.
#[derive(Debug, Default)]
struct Query(Vec<(String, String)>);

impl Query {
    fn parse(query: &str) -> Self {
        Self(form_urlencoded::parse(query.as_bytes()).into_owned().collect())
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value.as_str())
    }
}

fn resolution(
    value: Option<&str>,
    defaults: &RequestDefaults,
) -> Result<(u32, u32), CaptureError> {
    value.map_or(Ok((defaults.width, defaults.height)), |text| {
        parse_resolution(text)
            .map_err(|_| CaptureError::InvalidParameters(INVALID_RESOLUTION_MESSAGE.to_owned()))
    })
}

/// Build the request for `/`.
fn snapshot_request(
    query: &Query,
    defaults: &RequestDefaults,
) -> Result<CaptureRequest, CaptureError> {
    let res = query.get("res").or_else(|| query.get("resolution"));
    let (width, height) = resolution(res, defaults)?;
    let camera_index = match query.get("camera") {
        None => defaults.camera_index,
        Some(text) => text.trim().parse().map_err(|_| {
            CaptureError::InvalidParameters(format!("Invalid camera index {text:?}"))
        })?,
    };

    Ok(CaptureRequest::new(camera_index, width, height)
        .with_annotate(true)
        .with_flip(parse_flag(query.get("flip")))
        .with_light(parse_flag(query.get("light"))))
}

/// Build the request for `/old`: resolution only, everything else fixed.
fn legacy_request(
    query: &Query,
    defaults: &RequestDefaults,
) -> Result<CaptureRequest, CaptureError> {
    let (width, height) = resolution(query.get("res"), defaults)?;
    Ok(CaptureRequest::new(LEGACY_CAMERA, width, height).with_annotate(true))
}

/// Status code a failed capture is reported with.
pub const fn status_for(err: &CaptureError) -> u16 {
    match err {
        CaptureError::InvalidParameters(_) => 400,
        CaptureError::HardwareBusy(_) => 503,
        CaptureError::DeviceReadFailed(_)
        | CaptureError::LightControlFailed(_)
        | CaptureError::EncodeFailed(_) => 500,
    }
}

fn error_reply(err: &CaptureError) -> Reply {
    let status = status_for(err);
    match err {
        CaptureError::InvalidParameters(message) => Reply::text(status, message.as_str()),
        _ => Reply::text(status, format!("Failed to capture image: {err}")),
    }
}

/// Answer one request. Pure apart from the capture itself.
pub fn respond<P: CameraProvider, L: Light>(
    coordinator: &CaptureCoordinator<P, L>,
    method: &Method,
    url: &str,
    defaults: &RequestDefaults,
) -> Reply {
    let (path, query) = url.split_once('?').unwrap_or((url, ""));
    let Some(route) = Route::from_path(path) else {
        return Reply::text(404, "Not Found");
    };
    if *method != Method::Get {
        return Reply::text(405, "Method Not Allowed");
    }

    let query = Query::parse(query);
    let request = match route {
        Route::Health => return Reply::text(200, "ok"),
        Route::Snapshot => snapshot_request(&query, defaults),
        Route::Legacy => legacy_request(&query, defaults),
    };

    match request.and_then(|request| coordinator.capture(&request)) {
        Ok(image) => Reply {
            status: 200,
            content_type: image.mime_type,
            body: image.bytes,
        },
        Err(err) => {
            if status_for(&err) >= 500 {
                log::error!("{url}: {err}");
            } else {
                log::warn!("{url}: {err}");
            }
            error_reply(&err)
        }
    }
}

fn handle<P: CameraProvider, L: Light>(
    coordinator: &CaptureCoordinator<P, L>,
    request: Request,
    defaults: &RequestDefaults,
) {
    let method = request.method().clone();
    let url = request.url().to_owned();
    let reply = respond(coordinator, &method, &url, defaults);
    log::info!(
        "{} {method} {url} -> {} ({} bytes)",
        request
            .remote_addr()
            .map_or_else(|| "-".to_owned(), ToString::to_string),
        reply.status,
        reply.body.len()
    );

    let mut response = Response::from_data(reply.body).with_status_code(reply.status);
    match Header::from_bytes(&b"Content-Type"[..], reply.content_type.as_bytes()) {
        Ok(header) => response.add_header(header),
        Err(()) => log::warn!("invalid content type {:?}", reply.content_type),
    }
    if let Err(err) = request.respond(response) {
        log::warn!("failed to send response for {url}: {err}");
    }
}

/// Serve requests until the listener shuts down, one thread per request.
pub fn serve<P, L>(
    server: &Server,
    coordinator: &Arc<CaptureCoordinator<P, L>>,
    defaults: RequestDefaults,
) where
    P: CameraProvider + Send + 'static,
    L: Light + Send + 'static,
{
    for request in server.incoming_requests() {
        let coordinator = Arc::clone(coordinator);
        thread::spawn(move || handle(&coordinator, request, &defaults));
    }
}
