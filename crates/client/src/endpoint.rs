//! Path resolution against the API base URL.
//!
//! Every API path lives under the `APP/` namespace. Callers may spell a
//! path with or without the namespace and with or without a leading slash;
//! [`Endpoint::resolve`] places the namespace exactly once.

const NAMESPACE: &str = "APP";

/// The API origin, always stored with a trailing `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    base: String,
}

impl Endpoint {
    pub fn new(base_url: &str) -> Self {
        let mut base = base_url.trim().to_owned();
        if !base.ends_with('/') {
            base.push('/');
        }
        Self { base }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Resolve an API path fragment to an absolute URL.
    ///
    /// `"/APP/Foo"`, `"APP/Foo"`, `"/Foo"` and `"Foo"` all resolve to
    /// `<base>APP/Foo`.
    pub fn resolve(&self, path: &str) -> String {
        if let Some(rest) = path.strip_prefix('/') {
            if rest.starts_with("APP/") {
                format!("{}{rest}", self.base)
            } else {
                format!("{}{NAMESPACE}{path}", self.base)
            }
        } else if path.starts_with("APP/") {
            format!("{}{path}", self.base)
        } else {
            format!("{}{NAMESPACE}/{path}", self.base)
        }
    }

    /// Join a path outside the API namespace (OAuth endpoints and pages).
    pub fn page(&self, path: &str) -> String {
        format!("{}{}", self.base, path.trim_start_matches('/'))
    }

    /// Strip the base from an absolute URL produced by this endpoint.
    pub fn fragment_of<'a>(&self, url: &'a str) -> Option<&'a str> {
        url.strip_prefix(self.base.as_str())
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::new("https://www.plurk.com/")
    }
}
