pub mod blame;
pub mod config;
pub mod error;
pub mod heatmap;
pub mod session;

#[cfg(not(target_arch = "wasm32"))]
pub mod controller;
#[cfg(not(target_arch = "wasm32"))]
pub mod debounce;
#[cfg(not(target_arch = "wasm32"))]
pub mod git;

use std::sync::Mutex;
use std::sync::OnceLock;

use serde::Serialize;
use wasm_bindgen::prelude::*;

use config::HeatConfig;
use error::BlameError;
use heatmap::Theme;
use session::BlameSession;

// ---------------------------------------------------------------------------
// Session storage shared across WASM calls.
// ---------------------------------------------------------------------------

/// The extension host talks to a single session: one enabled flag, one
/// theme, and one attribution cache keyed by file path.
fn session_store() -> &'static Mutex<BlameSession> {
    static STORE: OnceLock<Mutex<BlameSession>> = OnceLock::new();
    STORE.get_or_init(|| Mutex::new(BlameSession::default()))
}

// ---------------------------------------------------------------------------
// JSON helpers.
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ErrorResult {
    error: String,
}

fn json_error(msg: &str) -> String {
    serde_json::to_string(&ErrorResult {
        error: msg.to_string(),
    })
    .unwrap_or_else(|_| format!("{{\"error\":\"{}\"}}", msg))
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| json_error(&format!("Serialization error: {}", e)))
}

/// Run `f` against the global session, or return a JSON error if the lock
/// is poisoned.
fn with_session<F>(f: F) -> String
where
    F: FnOnce(&mut BlameSession) -> String,
{
    match session_store().lock() {
        Ok(mut session) => f(&mut session),
        Err(_) => json_error("Failed to acquire session lock"),
    }
}

// ---------------------------------------------------------------------------
// WASM-exported functions
// ---------------------------------------------------------------------------

/// Parse raw `git blame --incremental` output.
///
/// Returns: JSON `{ commits, lines }` attribution table.
#[wasm_bindgen]
pub fn parse_blame(raw_blame: &[u8]) -> String {
    to_json(&blame::parse_blame_bytes(raw_blame))
}

/// Parse blame output and render it in one step, without touching the cache.
///
/// Returns: JSON array with one render instruction per line.
#[wasm_bindgen]
pub fn compute_heat_map(raw_blame: &[u8], total_lines: u32, is_dark: bool) -> String {
    let table = blame::parse_blame_bytes_limited(raw_blame, total_lines as usize);
    with_session(|session| {
        let render = heatmap::compute_render(
            &table,
            total_lines as usize,
            Theme::from_dark(is_dark),
            session.config(),
        );
        to_json(&render)
    })
}

/// Replace the session configuration with `config_json` (missing fields
/// take their defaults).
///
/// Returns: the effective configuration as JSON, or `{ error }`.
#[wasm_bindgen]
pub fn configure(config_json: &str) -> String {
    match HeatConfig::from_json(config_json) {
        Ok(config) => with_session(|session| {
            session.set_config(config);
            to_json(session.config())
        }),
        Err(e) => json_error(&e.to_string()),
    }
}

/// Flip blame on/off. Returns the new state.
#[wasm_bindgen]
pub fn toggle() -> bool {
    match session_store().lock() {
        Ok(mut session) => session.toggle(),
        Err(_) => false,
    }
}

/// Switch the color scheme used by subsequent renders.
#[wasm_bindgen]
pub fn update_theme(is_dark: bool) {
    if let Ok(mut session) = session_store().lock() {
        session.update_theme(is_dark);
    }
}

/// Register a blame request for `path` at document `version`.
///
/// Call on every document change, before spawning git; any earlier request
/// for the same path becomes stale. Returns false when blame is disabled and
/// git should not run (the version is still recorded, so a cached table for
/// an older version is not redrawn when blame is turned back on).
#[wasm_bindgen]
pub fn begin_blame(path: &str, version: u32) -> bool {
    match session_store().lock() {
        Ok(mut session) => {
            session.begin_request(path, u64::from(version));
            session.is_enabled()
        }
        Err(_) => false,
    }
}

/// Hand back git's stdout for the request started with `begin_blame`.
///
/// Returns: JSON `{ status: "applied" | "cleared" | "stale" | "disabled",
/// instructions? }`.
#[wasm_bindgen]
pub fn complete_blame(path: &str, version: u32, raw_blame: &[u8], total_lines: u32) -> String {
    let stdout = String::from_utf8_lossy(raw_blame).into_owned();
    finish(path, version, Ok(stdout), total_lines)
}

/// Report that git could not be run or exited with an error.
///
/// Returns: the same JSON shape as `complete_blame`.
#[wasm_bindgen]
pub fn fail_blame(path: &str, version: u32, message: &str, total_lines: u32) -> String {
    let err = BlameError::GitFailed {
        code: None,
        stderr: message.to_string(),
    };
    finish(path, version, Err(err), total_lines)
}

fn finish(path: &str, version: u32, result: Result<String, BlameError>, total_lines: u32) -> String {
    with_session(|session| {
        let ticket = session::BlameTicket {
            path: path.to_string(),
            version: u64::from(version),
        };
        to_json(&session.complete_request(&ticket, result, total_lines as usize))
    })
}

/// Render the cached blame of `path` (e.g. after a theme change).
///
/// Returns: JSON array of render instructions; empty when disabled.
#[wasm_bindgen]
pub fn render_cached(path: &str, total_lines: u32) -> String {
    with_session(|session| to_json(&session.render(path, total_lines as usize)))
}

/// Drop the cache for a closed document.
#[wasm_bindgen]
pub fn forget_file(path: &str) {
    if let Ok(mut session) = session_store().lock() {
        session.forget(path);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
