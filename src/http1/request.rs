//! The parsed HTTP/1.1 request.

/// Header fields in receive order.
///
/// A repeated name overwrites the earlier value in place, so the last
/// occurrence wins and the position of the first one is kept. Order is only
/// meaningful for logging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field, replacing any earlier value stored under the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Exact-name lookup.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Case-insensitive lookup.
    pub fn get_ignore_case(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One HTTP/1.1 request, owned by the connection that read it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Http1Request {
    pub method: String,
    /// Request path. Never empty; `/` has already become `/index.html`.
    pub target: String,
    pub protocol_version: String,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl Http1Request {
    /// Log the request the way it was received.
    pub fn display(&self) {
        tracing::debug!(
            method = %self.method,
            target = %self.target,
            protocol = %self.protocol_version,
            "| request"
        );
        for (name, value) in self.headers.iter() {
            tracing::debug!("| {}: {}", name, value);
        }
        if self.body.is_empty() {
            tracing::debug!("| <empty body>");
        } else {
            tracing::debug!(bytes = self.body.len(), "| <body>");
            tracing::debug!("| {}", String::from_utf8_lossy(&self.body));
        }
    }
}

/// Map the wire target to the stored one.
pub fn resolve_target(target: &str) -> String {
    if target == "/" {
        "/index.html".to_string()
    } else {
        target.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_becomes_index() {
        assert_eq!(resolve_target("/"), "/index.html");
        assert_eq!(resolve_target("/foo.css"), "/foo.css");
        assert_eq!(resolve_target("/dir/"), "/dir/");
    }

    #[test]
    fn duplicate_header_overwrites_in_place() {
        let mut headers = Headers::new();
        headers.insert("Accept", "text/html");
        headers.insert("Host", "example.com");
        headers.insert("Accept", "text/css");

        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get("Accept"), Some("text/css"));
        let names: Vec<_> = headers.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["Accept", "Host"]);
    }

    #[test]
    fn names_keep_their_case() {
        let mut headers = Headers::new();
        headers.insert("content-length", "3");
        headers.insert("Content-Length", "5");

        assert_eq!(headers.len(), 2);
        assert_eq!(headers.get("content-length"), Some("3"));
        assert_eq!(headers.get_ignore_case("CONTENT-LENGTH"), Some("5"));
    }
}
