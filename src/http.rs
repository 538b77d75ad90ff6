//! Proxy-aware HTTP client used for all platform traffic.
//!
//! Redirects are followed manually so cookie accumulation and the
//! method-downgrade rules stay under our control, and so the proxy policy
//! can be applied per request rather than per client.

use crate::accounts::ProxyEndpoint;
use crate::error::{MintError, Result};
use reqwest::redirect::Policy;
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;

/// Outcome of a single HTTP exchange
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
    /// Best-effort parsed body, None when the body is not JSON
    pub json: Option<Value>,
    pub set_cookies: Vec<String>,
    pub location: Option<String>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One request to perform
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub cookie: Option<String>,
    /// JSON body, sent unless `form` is set
    pub body: Option<Value>,
    /// Form-encoded body, takes precedence over `body`
    pub form: Option<Vec<(String, String)>>,
    pub follow_redirects: bool,
    pub max_redirects: usize,
}

impl HttpRequest {
    pub fn get(url: &str) -> Self {
        Self {
            url: url.to_string(),
            method: Method::GET,
            headers: Vec::new(),
            cookie: None,
            body: None,
            form: None,
            follow_redirects: false,
            max_redirects: 5,
        }
    }

    pub fn post_json(url: &str, body: Value) -> Self {
        Self {
            url: url.to_string(),
            method: Method::POST,
            headers: Vec::new(),
            cookie: None,
            body: Some(body),
            form: None,
            follow_redirects: false,
            max_redirects: 5,
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_bearer(self, token: &str) -> Self {
        self.with_header("Authorization", &format!("Bearer {}", token))
    }

    pub fn with_redirects(mut self, max: usize) -> Self {
        self.follow_redirects = true;
        self.max_redirects = max;
        self
    }
}

/// HTTP substrate with optional per-request proxying and a hard timeout
#[derive(Debug, Clone)]
pub struct ProxiedHttpClient {
    timeout: Duration,
    proxy_plain_http: bool,
}

impl ProxiedHttpClient {
    pub fn new(timeout: Duration, proxy_plain_http: bool) -> Self {
        Self {
            timeout,
            proxy_plain_http,
        }
    }

    /// Perform one request, following redirects if asked to.
    pub async fn request(
        &self,
        req: HttpRequest,
        proxy: Option<&ProxyEndpoint>,
    ) -> Result<HttpResponse> {
        let mut url = req.url.clone();
        let mut method = req.method.clone();
        let mut body = req.body.clone();
        let mut form = req.form.clone();
        let mut cookie = req.cookie.clone();
        let mut hops = 0;

        loop {
            let response = self
                .send_once(&url, &method, &req.headers, cookie.as_deref(), body.as_ref(), form.as_deref(), proxy)
                .await?;

            if !response.set_cookies.is_empty() {
                cookie = merge_cookies(cookie.as_deref(), &response.set_cookies);
            }

            let redirect_target = if req.follow_redirects && is_redirect(response.status) {
                response.location.clone()
            } else {
                None
            };

            match redirect_target {
                Some(location) if hops < req.max_redirects => {
                    hops += 1;
                    url = resolve_location(&url, &location)?;
                    if downgrades_to_get(response.status) {
                        method = Method::GET;
                        body = None;
                        form = None;
                    }
                }
                _ => return Ok(response),
            }
        }
    }

    async fn send_once(
        &self,
        url: &str,
        method: &Method,
        headers: &[(String, String)],
        cookie: Option<&str>,
        body: Option<&Value>,
        form: Option<&[(String, String)]>,
        proxy: Option<&ProxyEndpoint>,
    ) -> Result<HttpResponse> {
        let client = self.build_client(url, proxy)?;

        let mut builder = client.request(method.clone(), url);
        for (name, value) in headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(cookie) = cookie {
            builder = builder.header("Cookie", cookie);
        }
        if let Some(form) = form {
            builder = builder.form(form);
        } else if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                MintError::RequestTimeout(self.timeout.as_millis() as u64)
            } else {
                MintError::Http(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let header_pairs: Vec<(String, String)> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let set_cookies: Vec<String> = response
            .headers()
            .get_all("set-cookie")
            .iter()
            .filter_map(|v| v.to_str().ok().map(String::from))
            .collect();
        let location = response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                MintError::RequestTimeout(self.timeout.as_millis() as u64)
            } else {
                MintError::Http(e.to_string())
            }
        })?;
        let json = serde_json::from_str(&body).ok();

        Ok(HttpResponse {
            status,
            headers: header_pairs,
            body,
            json,
            set_cookies,
            location,
        })
    }

    fn build_client(&self, url: &str, proxy: Option<&ProxyEndpoint>) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .redirect(Policy::none());

        if let Some(endpoint) = proxy {
            let secure = url.starts_with("https:");
            if secure || self.proxy_plain_http {
                let proxy = reqwest::Proxy::all(&endpoint.url)
                    .map_err(|e| MintError::Proxy(e.to_string()))?;
                builder = builder.proxy(proxy);
            }
        }

        builder
            .build()
            .map_err(|e| MintError::Http(e.to_string()))
    }
}

/// 3xx statuses the client will follow
fn is_redirect(status: u16) -> bool {
    matches!(status, 301 | 302 | 303 | 307 | 308)
}

/// Statuses that rewrite the next hop to a bodyless GET
fn downgrades_to_get(status: u16) -> bool {
    matches!(status, 301 | 302 | 303)
}

/// Resolve a Location header against the current URL
fn resolve_location(current: &str, location: &str) -> Result<String> {
    if location.starts_with("http://") || location.starts_with("https://") {
        return Ok(location.to_string());
    }
    let base = reqwest::Url::parse(current)
        .map_err(|e| MintError::Http(format!("bad redirect base {}: {}", current, e)))?;
    let joined = base
        .join(location)
        .map_err(|e| MintError::Http(format!("bad redirect target {}: {}", location, e)))?;
    Ok(joined.to_string())
}

/// Merge Set-Cookie values into an existing cookie header, newest wins per name
fn merge_cookies(existing: Option<&str>, set_cookies: &[String]) -> Option<String> {
    let mut pairs: Vec<(String, String)> = Vec::new();

    let mut upsert = |name: &str, value: &str| {
        if let Some(entry) = pairs.iter_mut().find(|(n, _)| n == name) {
            entry.1 = value.to_string();
        } else {
            pairs.push((name.to_string(), value.to_string()));
        }
    };

    if let Some(existing) = existing {
        for part in existing.split(';') {
            if let Some((name, value)) = part.trim().split_once('=') {
                upsert(name.trim(), value.trim());
            }
        }
    }

    for set_cookie in set_cookies {
        // only the leading name=value pair matters, attributes are dropped
        if let Some(first) = set_cookie.split(';').next() {
            if let Some((name, value)) = first.trim().split_once('=') {
                upsert(name.trim(), value.trim());
            }
        }
    }

    if pairs.is_empty() {
        None
    } else {
        Some(
            pairs
                .iter()
                .map(|(n, v)| format!("{}={}", n, v))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_classification() {
        assert!(is_redirect(301));
        assert!(is_redirect(302));
        assert!(is_redirect(303));
        assert!(is_redirect(307));
        assert!(is_redirect(308));
        assert!(!is_redirect(200));
        assert!(!is_redirect(404));
    }

    #[test]
    fn test_method_downgrade_rules() {
        // 301/302/303 become GET and drop the body, 307/308 preserve
        assert!(downgrades_to_get(301));
        assert!(downgrades_to_get(302));
        assert!(downgrades_to_get(303));
        assert!(!downgrades_to_get(307));
        assert!(!downgrades_to_get(308));
    }

    #[test]
    fn test_resolve_absolute_location() {
        let next = resolve_location("https://a.example/x", "https://b.example/y").unwrap();
        assert_eq!(next, "https://b.example/y");
    }

    #[test]
    fn test_resolve_relative_location() {
        let next = resolve_location("https://a.example/api/v1/posts", "/login").unwrap();
        assert_eq!(next, "https://a.example/login");
    }

    #[test]
    fn test_merge_cookies_from_empty() {
        let merged = merge_cookies(None, &["session=abc; Path=/; HttpOnly".to_string()]);
        assert_eq!(merged.as_deref(), Some("session=abc"));
    }

    #[test]
    fn test_merge_cookies_overrides_by_name() {
        let merged = merge_cookies(
            Some("session=old; theme=dark"),
            &["session=new; Path=/".to_string()],
        );
        assert_eq!(merged.as_deref(), Some("session=new; theme=dark"));
    }

    #[test]
    fn test_merge_cookies_accumulates_names() {
        let merged = merge_cookies(
            Some("a=1"),
            &["b=2; Secure".to_string(), "c=3".to_string()],
        );
        assert_eq!(merged.as_deref(), Some("a=1; b=2; c=3"));
    }

    #[test]
    fn test_request_builders() {
        let req = HttpRequest::get("https://example.com")
            .with_bearer("key-123")
            .with_redirects(3);
        assert_eq!(req.method, Method::GET);
        assert!(req.follow_redirects);
        assert_eq!(req.max_redirects, 3);
        assert_eq!(
            req.headers[0],
            ("Authorization".to_string(), "Bearer key-123".to_string())
        );
    }
}
