// GitHub OAuth session flow and the user profile lookup.

use crate::api::ApiClient;
use crate::cookie::{self, Cookie, CookieStore};
use crate::error::{ApiError, Result};
use crate::models::UserProfile;
use std::process::Command;

const AUTH_PATH: &str = "/user/auth/github";
const USER_PATH: &str = "/user";

/// Pull the `code` query value out of a pasted callback URL. Returns an
/// empty string when the URL carries no code.
pub fn extract_code(callback_url: &str) -> String {
    const PREFIX: &str = "code=";
    match callback_url.find(PREFIX) {
        Some(idx) => {
            let rest = &callback_url[idx + PREFIX.len()..];
            rest.split('&').next().unwrap_or_default().to_string()
        }
        None => String::new(),
    }
}

/// Try to open `url` in the default browser.
pub fn open_browser(url: &str) -> std::io::Result<()> {
    let mut cmd = if cfg!(target_os = "windows") {
        let mut c = Command::new("rundll32");
        c.args(["url.dll,FileProtocolHandler", url]);
        c
    } else if cfg!(target_os = "macos") {
        let mut c = Command::new("open");
        c.arg(url);
        c
    } else {
        let mut c = Command::new("xdg-open");
        c.arg(url);
        c
    };
    cmd.spawn().map(|_| ())
}

pub struct AuthService {
    api: ApiClient,
    store: CookieStore,
}

impl AuthService {
    pub fn new(api: ApiClient, store: CookieStore) -> Self {
        AuthService { api, store }
    }

    /// Ask the API where to send the user for GitHub authorization.
    pub fn authorization_url(&self) -> Result<String> {
        let resp = self.api.get(&self.api.url(AUTH_PATH), &[])?;
        let location = resp
            .header("location")
            .map(str::to_string)
            .ok_or_else(|| ApiError::remote(resp.status, "no redirect location in response"))?;

        if !location.contains("client_id") {
            return Err(ApiError::DecodeError(format!(
                "authorization URL is incomplete: {}",
                location
            )));
        }
        Ok(location)
    }

    /// Trade an authorization code for session cookies and persist them,
    /// replacing whatever session was stored before.
    pub fn exchange_code(&self, code: &str) -> Result<Vec<Cookie>> {
        let url = format!("{}?code={}", self.api.url(AUTH_PATH), code);
        let resp = self.api.get(&url, &[])?;

        let headers = resp.set_cookie_headers();
        let mut cookies = Vec::with_capacity(headers.len());
        for raw in headers {
            match cookie::parse_set_cookie(raw) {
                Some(c) => cookies.push(c),
                None => tracing::debug!("skipping malformed Set-Cookie header: {}", raw),
            }
        }

        if cookies.is_empty() {
            return Err(resp
                .error_for_status()
                .err()
                .unwrap_or_else(|| ApiError::remote(200, "no cookies returned by the server")));
        }

        self.store.save(&cookies)?;
        Ok(cookies)
    }

    /// Persist a cookie string copied from a logged-in browser session.
    pub fn accept_cookie_string(&self, pasted: &str) -> Result<Vec<Cookie>> {
        let cookies = cookie::parse_cookie_string(pasted);
        if cookies.is_empty() {
            return Err(ApiError::DecodeError(
                "no name=value pairs found in pasted cookie".to_string(),
            ));
        }
        self.store.save(&cookies)?;
        Ok(cookies)
    }

    pub fn user_profile(&self) -> Result<UserProfile> {
        let cookies = self.store.load()?;
        self.api
            .get(&self.api.url(USER_PATH), &cookies)?
            .error_for_status()?
            .json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_code_up_to_next_parameter() {
        assert_eq!(
            extract_code("https://x/callback?code=abc123&state=xyz"),
            "abc123"
        );
    }

    #[test]
    fn extracts_code_at_end_of_url() {
        assert_eq!(extract_code("https://x/callback?state=s&code=zz9"), "zz9");
    }

    #[test]
    fn missing_code_yields_empty() {
        assert_eq!(extract_code("https://x/callback?state=xyz"), "");
        assert_eq!(extract_code(""), "");
    }
}
