// Pattern-generation service boundary.
//
// Request:  {"args": [[[x, y, z], ...], ...]}   one point list per side, cyclic order
// Response: [{"faces": [[i, ...]], "verts": [[x, y, z]], "sides": [[i, ...]]}, ...]
//
// `HttpTransport` posts to the configured backend with ureq. Hosts with
// their own networking plug in any other `Transport`, closures included.

use std::time::Duration;

use glam::Vec3;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::config::AutofillOptions;
use super::error::ServiceError;
use super::pattern::ExpandedPattern;

/// Source of candidate fills for an ordered boundary.
pub trait PatternService {
    fn expanded_patterns(&mut self, sides: &[Vec<Vec3>]) -> Result<Vec<ExpandedPattern>, ServiceError>;
}

/// Blocking request/response to the backend.
pub trait Transport {
    fn post(&mut self, path: &str, body: &str) -> Result<String, ServiceError>;
}

impl<F> Transport for F
where
    F: FnMut(&str, &str) -> Result<String, ServiceError>,
{
    fn post(&mut self, path: &str, body: &str) -> Result<String, ServiceError> {
        self(path, body)
    }
}

// ============================================================================
// WIRE FORMAT
// ============================================================================

#[derive(Serialize)]
struct Request {
    args: Vec<Vec<[f32; 3]>>,
}

/// One candidate as it appears on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireVariant {
    pub faces: Vec<Vec<usize>>,
    pub verts: Vec<[f32; 3]>,
    pub sides: Vec<Vec<usize>>,
}

impl From<WireVariant> for ExpandedPattern {
    fn from(w: WireVariant) -> Self {
        ExpandedPattern::new(w.faces, w.verts.into_iter().map(Vec3::from).collect(), w.sides)
    }
}

pub fn encode_request(sides: &[Vec<Vec3>]) -> Result<String, ServiceError> {
    let request = Request {
        args: sides.iter().map(|s| s.iter().map(|p| p.to_array()).collect()).collect(),
    };
    Ok(serde_json::to_string(&request)?)
}

/// An empty body counts as "no candidates".
pub fn decode_response(body: &str) -> Result<Vec<ExpandedPattern>, ServiceError> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    let wire: Vec<WireVariant> = serde_json::from_str(body)?;
    Ok(wire.into_iter().map(ExpandedPattern::from).collect())
}

// ============================================================================
// HTTP
// ============================================================================

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Blocking JSON POSTs against one base URL.
pub struct HttpTransport {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent: ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build(),
        }
    }
}

impl Transport for HttpTransport {
    /// Refused connections, timeouts and non-2xx replies all come back as
    /// `ServiceError::Unavailable`.
    fn post(&mut self, path: &str, body: &str) -> Result<String, ServiceError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .agent
            .post(&url)
            .set("Content-Type", "application/json")
            .send_string(body)
            .map_err(|err| ServiceError::Unavailable(format!("{url}: {err}")))?;
        response
            .into_string()
            .map_err(|err| ServiceError::Unavailable(format!("{url}: {err}")))
    }
}

// ============================================================================
// JSON SERVICE
// ============================================================================

/// `PatternService` speaking the JSON protocol over any `Transport`.
pub struct JsonPatternService<T> {
    transport: T,
    path: String,
}

impl<T: Transport> JsonPatternService<T> {
    pub fn new(transport: T, options: &AutofillOptions) -> Self {
        Self { transport, path: options.patterns_path.clone() }
    }

}

impl JsonPatternService<HttpTransport> {
    /// Speak to the backend named in `options` over HTTP.
    pub fn connect(options: &AutofillOptions) -> Self {
        info!("pattern backend at {}", options.patterns_url());
        Self::new(HttpTransport::new(&options.backend_url), options)
    }
}

impl<T: Transport> PatternService for JsonPatternService<T> {
    fn expanded_patterns(&mut self, sides: &[Vec<Vec3>]) -> Result<Vec<ExpandedPattern>, ServiceError> {
        let body = encode_request(sides)?;
        debug!("POST {} ({} sides, {} bytes)", self.path, sides.len(), body.len());
        let response = self.transport.post(&self.path, &body)?;
        decode_response(&response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_wraps_sides_in_args() {
        let body = encode_request(&[vec![Vec3::ZERO, Vec3::X]]).unwrap();
        assert_eq!(body, r#"{"args":[[[0.0,0.0,0.0],[1.0,0.0,0.0]]]}"#);
    }

    #[test]
    fn response_decodes_into_patterns() {
        let body = r#"[{"faces": [[0, 1, 2, 3]], "verts": [[0,0,0],[1,0,0],[1,1,0],[0,1,0]], "sides": [[0, 1], [1, 2]]}]"#;
        let patterns = decode_response(body).unwrap();
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].faces, vec![vec![0, 1, 2, 3]]);
        assert_eq!(patterns[0].verts[2], Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(patterns[0].side_mapping, vec![vec![0, 1], vec![1, 2]]);
    }

    #[test]
    fn empty_and_malformed_bodies() {
        assert!(decode_response("  ").unwrap().is_empty());
        assert!(matches!(decode_response("{not json"), Err(ServiceError::Json(_))));
    }

    #[test]
    fn service_posts_to_configured_path() {
        let options = AutofillOptions::new();
        let mut seen = Vec::new();
        let transport = |path: &str, body: &str| {
            seen.push((path.to_string(), body.to_string()));
            Ok::<_, ServiceError>("[]".to_string())
        };
        let mut service = JsonPatternService::new(transport, &options);
        assert!(service.expanded_patterns(&[vec![Vec3::ZERO]]).unwrap().is_empty());
        drop(service);
        assert_eq!(seen[0].0, "/get_expanded_patterns");
    }
}
