//! Cookie header parsing and `Set-Cookie` construction

use axum::http::{header, HeaderMap, HeaderValue};

/// Value of cookie `name` from the request's `Cookie` headers
pub fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Builder for a `Set-Cookie` header value
#[derive(Debug, Clone)]
pub struct SetCookie {
    name: String,
    value: String,
    max_age: Option<i64>,
    path: String,
    http_only: bool,
}

impl SetCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            max_age: None,
            path: "/".to_string(),
            http_only: true,
        }
    }

    /// Cookie that deletes `name` in the browser
    pub fn expire(name: impl Into<String>) -> Self {
        Self::new(name, "").max_age(0)
    }

    pub fn max_age(mut self, seconds: i64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    pub fn to_header_string(&self) -> String {
        let mut cookie = format!("{}={}; Path={}; SameSite=Lax", self.name, self.value, self.path);
        if let Some(max_age) = self.max_age {
            cookie.push_str(&format!("; Max-Age={}", max_age));
        }
        if self.http_only {
            cookie.push_str("; HttpOnly");
        }
        cookie
    }

    /// `None` when the name or value contains bytes not allowed in a header
    pub fn to_header_value(&self) -> Option<HeaderValue> {
        HeaderValue::from_str(&self.to_header_string()).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_cookie_among_several() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; stacks_ops_session=abc123; other=1"),
        );
        assert_eq!(
            get_cookie(&headers, "stacks_ops_session").as_deref(),
            Some("abc123")
        );
        assert!(get_cookie(&headers, "missing").is_none());
    }

    #[test]
    fn test_get_cookie_across_multiple_headers() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("a=1"));
        headers.append(header::COOKIE, HeaderValue::from_static("b=2"));
        assert_eq!(get_cookie(&headers, "b").as_deref(), Some("2"));
    }

    #[test]
    fn test_empty_cookie_value_is_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("a="));
        assert!(get_cookie(&headers, "a").is_none());
    }

    #[test]
    fn test_set_cookie_format() {
        let cookie = SetCookie::new("id", "xyz").max_age(120).to_header_string();
        assert_eq!(cookie, "id=xyz; Path=/; SameSite=Lax; Max-Age=120; HttpOnly");

        let expired = SetCookie::expire("id").to_header_string();
        assert!(expired.starts_with("id=;"));
        assert!(expired.contains("Max-Age=0"));
    }
}
