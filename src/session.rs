//! Host-side blame state shared by the WASM surface and the native controller.
//!
//! The session never runs git itself. The host asks for a [`BlameTicket`]
//! before starting a blame, runs it however it can, and hands the result
//! back; results for anything but the newest ticket of a file are dropped.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, warn};

use crate::blame::{parse_blame_limited, AttributionTable};
use crate::config::HeatConfig;
use crate::error::BlameError;
use crate::heatmap::{compute_render, placeholder_render, RenderInstruction, Theme};

/// Identifies one blame request: the file and the document version the
/// buffer content was taken from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlameTicket {
    pub path: String,
    pub version: u64,
}

/// Result of handing a finished blame back to the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "instructions", rename_all = "camelCase")]
pub enum UpdateOutcome {
    /// Blame was cached; draw these.
    Applied(Vec<RenderInstruction>),
    /// Blame failed; cache was cleared and every line is a placeholder.
    Cleared(Vec<RenderInstruction>),
    /// A newer request exists for the file; nothing changed.
    Stale,
    /// Blame is toggled off; nothing should be drawn.
    Disabled,
}

#[derive(Debug)]
struct CachedBlame {
    version: u64,
    total_lines: usize,
    table: AttributionTable,
}

#[derive(Debug)]
pub struct BlameSession {
    config: HeatConfig,
    enabled: bool,
    theme: Theme,
    cache: HashMap<String, CachedBlame>,
    latest: HashMap<String, u64>,
}

impl Default for BlameSession {
    fn default() -> Self {
        Self::new(HeatConfig::default())
    }
}

impl BlameSession {
    pub fn new(config: HeatConfig) -> Self {
        BlameSession {
            config,
            enabled: true,
            theme: Theme::Dark,
            cache: HashMap::new(),
            latest: HashMap::new(),
        }
    }

    pub fn config(&self) -> &HeatConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: HeatConfig) {
        self.config = config;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Flip the enabled flag, returning the new state.
    ///
    /// Cached tables survive a toggle so turning blame back on can redraw
    /// immediately.
    pub fn toggle(&mut self) -> bool {
        self.enabled = !self.enabled;
        debug!(enabled = self.enabled, "Blame toggled");
        self.enabled
    }

    /// Affects renders computed after this call only.
    pub fn update_theme(&mut self, is_dark: bool) {
        self.theme = Theme::from_dark(is_dark);
    }

    /// Register a new request for `path`, superseding any in flight.
    pub fn begin_request(&mut self, path: &str, version: u64) -> BlameTicket {
        self.latest.insert(path.to_string(), version);
        BlameTicket {
            path: path.to_string(),
            version,
        }
    }

    pub fn is_current(&self, ticket: &BlameTicket) -> bool {
        self.latest.get(&ticket.path) == Some(&ticket.version)
    }

    /// Hand back the outcome of the blame issued for `ticket`.
    ///
    /// `result` is the raw `git blame --incremental` stdout, or the error
    /// that prevented getting it.
    pub fn complete_request(
        &mut self,
        ticket: &BlameTicket,
        result: Result<String, BlameError>,
        total_lines: usize,
    ) -> UpdateOutcome {
        if !self.is_current(ticket) {
            debug!(path = %ticket.path, version = ticket.version, "Discarding stale blame");
            return UpdateOutcome::Stale;
        }

        match result {
            Ok(stdout) => {
                let table = parse_blame_limited(&stdout, total_lines);
                debug!(
                    path = %ticket.path,
                    version = ticket.version,
                    lines = table.len(),
                    "Blame parsed"
                );
                self.cache.insert(
                    ticket.path.clone(),
                    CachedBlame {
                        version: ticket.version,
                        total_lines,
                        table,
                    },
                );
                if !self.enabled {
                    return UpdateOutcome::Disabled;
                }
                UpdateOutcome::Applied(self.render(&ticket.path, total_lines))
            }
            Err(e) => {
                warn!(path = %ticket.path, "Blame unavailable: {}", e);
                self.cache.remove(&ticket.path);
                if !self.enabled {
                    return UpdateOutcome::Disabled;
                }
                UpdateOutcome::Cleared(placeholder_render(total_lines, &self.config))
            }
        }
    }

    /// Render the cached table for `path`.
    ///
    /// Returns an empty list when blame is disabled (the host clears its
    /// decorations) and placeholders when nothing current is cached.
    pub fn render(&self, path: &str, total_lines: usize) -> Vec<RenderInstruction> {
        if !self.enabled {
            return Vec::new();
        }
        match self.cache.get(path) {
            Some(cached) if self.is_cache_current(path) => {
                compute_render(&cached.table, total_lines, self.theme, &self.config)
            }
            _ => placeholder_render(total_lines, &self.config),
        }
    }

    /// True when the cached table was blamed from the newest registered
    /// version of `path`.
    pub fn is_cache_current(&self, path: &str) -> bool {
        match (self.cache.get(path), self.latest.get(path)) {
            (Some(cached), Some(&latest)) => cached.version == latest,
            _ => false,
        }
    }

    /// Re-render every cached file at its last known line count.
    ///
    /// Files edited since their table was blamed are skipped; their
    /// pending request will draw them.
    pub fn redraw_all(&self) -> Vec<(String, Vec<RenderInstruction>)> {
        self.cache
            .iter()
            .filter(|(path, _)| self.is_cache_current(path))
            .map(|(path, cached)| (path.clone(), self.render(path, cached.total_lines)))
            .collect()
    }

    pub fn cached_table(&self, path: &str) -> Option<&AttributionTable> {
        self.cache.get(path).map(|c| &c.table)
    }

    pub fn cached_version(&self, path: &str) -> Option<u64> {
        self.cache.get(path).map(|c| c.version)
    }

    /// Paths with a registered request, whether or not blame succeeded.
    pub fn tracked_paths(&self) -> Vec<String> {
        self.latest.keys().cloned().collect()
    }

    /// Drop everything known about `path` (document closed).
    ///
    /// Any request still in flight for it becomes stale.
    pub fn forget(&mut self, path: &str) {
        self.cache.remove(path);
        self.latest.remove(path);
    }
}
