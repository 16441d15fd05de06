use serde_json::Value;
use std::fmt::{self, Display, Formatter};

/// The HTTP methods the backend understands.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Display for Method {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        };

        f.write_str(name)
    }
}

/// A single unit of work for the [`ApiClient`](crate::ApiClient).
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    /// The fixed route, e.g. `/auth/users`.
    pub path: String,
    /// Values appended to the route as escaped path segments.
    pub segments: Vec<String>,
    pub method: Method,
    pub body: Option<Value>,
    /// Extra headers, these take precedence over the client's defaults.
    pub headers: Vec<(String, String)>,
}

impl Endpoint {
    pub fn new<P: Into<String>>(method: Method, path: P) -> Self {
        Endpoint {
            path: path.into(),
            segments: Vec::new(),
            method,
            body: None,
            headers: Vec::new(),
        }
    }

    pub fn get<P: Into<String>>(path: P) -> Self {
        Endpoint::new(Method::Get, path)
    }

    pub fn post<P: Into<String>>(path: P) -> Self {
        Endpoint::new(Method::Post, path)
    }

    pub fn put<P: Into<String>>(path: P) -> Self {
        Endpoint::new(Method::Put, path)
    }

    pub fn delete<P: Into<String>>(path: P) -> Self {
        Endpoint::new(Method::Delete, path)
    }

    /// Append a caller-supplied value (a username, a room ID) to the route.
    pub fn with_segment<S: Into<String>>(mut self, segment: S) -> Self {
        self.segments.push(segment.into());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header<K, V>(mut self, name: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.headers.push((name.into(), value.into()));
        self
    }
}
