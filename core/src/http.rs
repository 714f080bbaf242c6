//! Request and response types.
//!
//! # Design
//! `Request` is what callers describe: a method, a target URI and optional
//! string parameters. `Request::to_http` turns it into an `HttpRequest`, the
//! plain-data form a `Transport` puts on the wire, with the query string or
//! form body already encoded. `HttpResponse` keeps its body as an unread
//! stream so a non-2xx answer costs no body transfer.

use std::collections::HashMap;
use std::fmt;
use std::io::Read;

use url::{form_urlencoded, Url};

use crate::config::CHARSET;
use crate::error::TransportError;

/// Query or form parameters. Absent means no query string / no body.
pub type Params = HashMap<String, String>;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A GET or POST request as described by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: HttpMethod,
    uri: String,
    params: Option<Params>,
}

impl Request {
    /// GET `uri`, appending `params` to its query string.
    pub fn get(uri: &str, params: Option<&Params>) -> Self {
        Self {
            method: HttpMethod::Get,
            uri: uri.to_string(),
            params: params.cloned(),
        }
    }

    /// POST `params` to `uri` as a URL-encoded form.
    pub fn post(uri: &str, params: Option<&Params>) -> Self {
        Self {
            method: HttpMethod::Post,
            uri: uri.to_string(),
            params: params.cloned(),
        }
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Encode into the wire-level request, advertising gzip support.
    pub fn to_http(&self) -> Result<HttpRequest, TransportError> {
        let mut url = Url::parse(&self.uri).map_err(|source| TransportError::InvalidUri {
            uri: self.uri.clone(),
            source,
        })?;
        let mut headers = vec![(ACCEPT_ENCODING.to_string(), "gzip".to_string())];
        let mut body = None;

        match (self.method, &self.params) {
            (HttpMethod::Get, Some(params)) if !params.is_empty() => {
                url.query_pairs_mut().extend_pairs(params.iter());
            }
            (HttpMethod::Post, Some(params)) => {
                let encoded = form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(params.iter())
                    .finish();
                headers.push((CONTENT_TYPE.to_string(), form_content_type()));
                body = Some(encoded.into_bytes());
            }
            _ => {}
        }

        Ok(HttpRequest {
            method: self.method,
            url: url.into(),
            headers,
            body,
        })
    }
}

pub const ACCEPT_ENCODING: &str = "accept-encoding";
pub const CONTENT_ENCODING: &str = "content-encoding";
pub const CONTENT_TYPE: &str = "content-type";

fn form_content_type() -> String {
    format!("application/x-www-form-urlencoded; charset={CHARSET}")
}

/// An HTTP request described as plain data, ready for a `Transport`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// First header value named `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// A received response head plus its not-yet-read body.
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Box<dyn Read>,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Whether the body is gzip-encoded.
    pub fn is_gzip(&self) -> bool {
        self.header(CONTENT_ENCODING)
            .map(|v| v.split(',').any(|enc| enc.trim().eq_ignore_ascii_case("gzip")))
            .unwrap_or(false)
    }
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}
