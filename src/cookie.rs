// Session cookies and their flat-file persistence.
//
// The store is re-read from disk on every authenticated call and fully
// overwritten on every successful login; cookies are never merged. Only a
// single process is expected to write the file at a time: two processes
// racing on the same path is not guarded against.

use crate::error::{ApiError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub secure: bool,
    #[serde(default, rename = "httpOnly")]
    pub http_only: bool,
}

impl Cookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Cookie {
            name: name.into(),
            value: value.into(),
            ..Default::default()
        }
    }
}

/// Parse one `Set-Cookie` header value.
///
/// The first `;`-separated segment must be `name=value`; `HttpOnly`,
/// `Secure`, `Path=` and `Domain=` are recognised in any case and any
/// other attribute is ignored. Returns `None` when the first segment is
/// not a name/value pair.
pub fn parse_set_cookie(raw: &str) -> Option<Cookie> {
    let mut parts = raw.split(';');
    let (name, value) = parts.next()?.trim().split_once('=')?;

    let mut cookie = Cookie::new(name, value);
    for part in parts {
        let part = part.trim();
        let lower = part.to_ascii_lowercase();
        if lower == "httponly" {
            cookie.http_only = true;
        } else if lower == "secure" {
            cookie.secure = true;
        } else if let Some(path) = lower.strip_prefix("path=") {
            cookie.path = path.to_string();
        } else if let Some(domain) = lower.strip_prefix("domain=") {
            cookie.domain = domain.to_string();
        }
    }
    Some(cookie)
}

/// Parse a cookie string copied from a browser, e.g.
/// `Cookie: a=1; XSRF-TOKEN=abc`. Segments without `=` are skipped.
pub fn parse_cookie_string(raw: &str) -> Vec<Cookie> {
    let raw = raw.trim();
    let raw = match raw.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("cookie:") => &raw[7..],
        _ => raw,
    };

    raw.split(';')
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some(Cookie::new(name, value.trim()))
        })
        .collect()
}

/// Render cookies as a `Cookie` request header value.
pub fn header_value(cookies: &[Cookie]) -> String {
    cookies
        .iter()
        .map(|c| format!("{}={}", c.name, c.value))
        .collect::<Vec<_>>()
        .join("; ")
}

/// JSON file holding the current cookie set.
#[derive(Debug, Clone)]
pub struct CookieStore {
    path: PathBuf,
}

impl CookieStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CookieStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Vec<Cookie>> {
        let data = fs::read_to_string(&self.path)
            .map_err(|e| ApiError::NotAuthenticated(format!("{}: {}", self.path.display(), e)))?;
        serde_json::from_str(&data).map_err(|e| ApiError::CorruptState(e.to_string()))
    }

    /// Like `load`, but treats a missing or unreadable file as "no session".
    /// A corrupt file is still an error.
    pub fn load_optional(&self) -> Result<Vec<Cookie>> {
        match self.load() {
            Ok(cookies) => Ok(cookies),
            Err(ApiError::NotAuthenticated(_)) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    /// Replace the stored cookie set. The content is written to a sibling
    /// temporary file first and renamed into place.
    pub fn save(&self, cookies: &[Cookie]) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| {
                ApiError::PersistenceError(format!("create {}: {}", dir.display(), e))
            })?;
        }

        let data = serde_json::to_string_pretty(cookies)
            .map_err(|e| ApiError::PersistenceError(e.to_string()))?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, data)
            .map_err(|e| ApiError::PersistenceError(format!("{}: {}", tmp.display(), e)))?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            ApiError::PersistenceError(format!("{}: {}", self.path.display(), e))
        })?;

        tracing::info!(count = cookies.len(), path = %self.path.display(), "cookies saved");
        Ok(())
    }
}
