//! One-shot messages carried to the next rendered page in a cookie.

use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use url::form_urlencoded;

use crate::auth::cookie_value;

pub const COOKIE: &str = "halteres_flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Success,
    Error,
}

impl Level {
    fn as_str(self) -> &'static str {
        match self {
            Level::Success => "success",
            Level::Error => "error",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "success" => Some(Level::Success),
            "error" => Some(Level::Error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub level: Level,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: Level::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            message: message.into(),
        }
    }

    /// CSS class for the message box.
    pub fn class(&self) -> &'static str {
        self.level.as_str()
    }

    fn encode(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .append_pair("level", self.level.as_str())
            .append_pair("msg", &self.message)
            .finish()
    }

    fn decode(raw: &str) -> Option<Self> {
        let mut level = None;
        let mut message = None;
        for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
            match key.as_ref() {
                "level" => level = Level::parse(&value),
                "msg" => message = Some(value.into_owned()),
                _ => {}
            }
        }
        Some(Flash {
            level: level?,
            message: message?,
        })
    }

    /// Read the pending message, if any. A malformed cookie is ignored.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        cookie_value(headers, COOKIE)
            .filter(|raw| !raw.is_empty())
            .and_then(Flash::decode)
    }
}

pub fn set_cookie(flash: &Flash) -> String {
    format!("{}={}; HttpOnly; SameSite=Strict; Path=/", COOKIE, flash.encode())
}

pub fn clear_cookie() -> String {
    format!("{}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0", COOKIE)
}

/// 303 to `to`, queueing `flash` for the page that follows.
pub fn redirect(to: &str, flash: Flash) -> Response {
    (
        StatusCode::SEE_OTHER,
        [
            (header::LOCATION, to.to_string()),
            (header::SET_COOKIE, set_cookie(&flash)),
        ],
    )
        .into_response()
}
