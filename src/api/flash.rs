//! One-request flash data, carried in a cookie across the redirect that
//! follows every form submission.

use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const FLASH_COOKIE: &str = "gymdesk_flash";

/// Payload shown (and cleared) on the next page load: a success message,
/// field errors, and values handed to the next form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Flash {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub errors: HashMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub data: HashMap<String, String>,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn error(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = HashMap::new();
        errors.insert(field.into(), vec![message.into()]);
        Self {
            errors,
            ..Self::default()
        }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.success.is_none() && self.errors.is_empty() && self.data.is_empty()
    }
}

fn encode(flash: &Flash) -> String {
    URL_SAFE_NO_PAD.encode(serde_json::to_vec(flash).unwrap_or_default())
}

fn decode(raw: &str) -> Option<Flash> {
    let bytes = URL_SAFE_NO_PAD.decode(raw).ok()?;
    serde_json::from_slice(&bytes).ok()
}

pub fn cookie(flash: &Flash) -> Cookie<'static> {
    Cookie::build((FLASH_COOKIE, encode(flash)))
        .path("/")
        .http_only(true)
        .build()
}

fn removal_cookie() -> Cookie<'static> {
    Cookie::build((FLASH_COOKIE, "")).path("/").build()
}

/// Redirect to `target` with `flash` set for the next request.
pub fn redirect(target: &str, flash: Flash) -> Response {
    let jar = CookieJar::new().add(cookie(&flash));
    (jar, Redirect::to(target)).into_response()
}

/// Read and clear the pending flash, if any.
pub fn take(jar: CookieJar) -> (CookieJar, Flash) {
    match jar.get(FLASH_COOKIE).and_then(|c| decode(c.value())) {
        Some(flash) => (jar.remove(removal_cookie()), flash),
        None => (jar, Flash::default()),
    }
}
