//! Native host adapter: debounced blame refreshes driving a render sink.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, info};

use crate::config::HeatConfig;
use crate::debounce::Debouncer;
use crate::error::BlameError;
use crate::git::BlameSource;
use crate::heatmap::RenderInstruction;
use crate::session::{BlameSession, UpdateOutcome};

/// Receives gutter decorations for a document.
pub trait RenderSink: Send + Sync + 'static {
    /// Replace the decorations of `path` with one instruction per line.
    fn apply(&self, path: &str, instructions: Vec<RenderInstruction>);
    /// Remove all decorations of `path`.
    fn clear(&self, path: &str);
}

/// The state of an open document at one point in time.
#[derive(Debug, Clone)]
pub struct DocumentSnapshot {
    pub path: PathBuf,
    /// Monotonic per document; bumped by the host on every edit.
    pub version: u64,
    pub text: String,
}

impl DocumentSnapshot {
    /// Line count as an editor sees it: a trailing newline opens an empty
    /// last line.
    pub fn line_count(&self) -> usize {
        self.text.split('\n').count()
    }

    fn key(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}

/// Ties together the session, a blame source and a render sink.
///
/// All methods must be called from within a tokio runtime.
pub struct BlameController<S, R> {
    session: Arc<Mutex<BlameSession>>,
    source: Arc<S>,
    sink: Arc<R>,
    debouncer: Debouncer<String>,
    /// Newest snapshot per open document, for re-blaming after a toggle.
    snapshots: Mutex<HashMap<String, DocumentSnapshot>>,
}

impl<S, R> BlameController<S, R>
where
    S: BlameSource + 'static,
    R: RenderSink,
{
    pub fn new(config: HeatConfig, source: S, sink: R) -> Self {
        let debouncer = Debouncer::new(Duration::from_millis(config.debounce_ms));
        BlameController {
            session: Arc::new(Mutex::new(BlameSession::new(config))),
            source: Arc::new(source),
            sink: Arc::new(sink),
            debouncer,
            snapshots: Mutex::new(HashMap::new()),
        }
    }

    fn session(&self) -> MutexGuard<'_, BlameSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshots(&self) -> MutexGuard<'_, HashMap<String, DocumentSnapshot>> {
        self.snapshots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Flip blame on or off.
    ///
    /// Turning off clears every tracked document. Turning on redraws the
    /// documents whose cached blame is still current and re-blames the
    /// ones edited since.
    pub fn toggle(&self) -> bool {
        let enabled = self.session().toggle();
        info!(enabled, "Blame gutter toggled");

        if !enabled {
            self.debouncer.cancel_all();
            let paths = self.session().tracked_paths();
            for path in paths {
                self.sink.clear(&path);
            }
            return enabled;
        }

        let (redraw, outdated) = {
            let session = self.session();
            let outdated: Vec<DocumentSnapshot> = self
                .snapshots()
                .iter()
                .filter(|(path, _)| !session.is_cache_current(path))
                .map(|(_, doc)| doc.clone())
                .collect();
            (session.redraw_all(), outdated)
        };
        for (path, instructions) in redraw {
            self.sink.apply(&path, instructions);
        }
        for doc in outdated {
            self.update(doc);
        }
        enabled
    }

    /// Switch the color scheme and redraw cached documents with it.
    ///
    /// Documents with a blame still pending are left alone; the pending
    /// result is drawn in the new theme.
    pub fn update_theme(&self, is_dark: bool) {
        let (enabled, redraw) = {
            let mut session = self.session();
            session.update_theme(is_dark);
            (session.is_enabled(), session.redraw_all())
        };
        if !enabled {
            return;
        }
        for (path, instructions) in redraw {
            self.sink.apply(&path, instructions);
        }
    }

    /// Schedule a blame of `doc`, superseding any pending or in-flight
    /// request for the same file.
    pub fn update(&self, doc: DocumentSnapshot) {
        let key = doc.key();
        self.snapshots().insert(key.clone(), doc.clone());
        let ticket = {
            let mut session = self.session();
            // The version is recorded even while disabled so the cache is
            // known to be outdated when blame is turned back on.
            let ticket = session.begin_request(&key, doc.version);
            if !session.is_enabled() {
                return;
            }
            ticket
        };
        debug!(path = %key, version = doc.version, "Blame scheduled");

        let session = self.session.clone();
        let source = self.source.clone();
        let sink = self.sink.clone();
        self.debouncer.schedule(key, async move {
            let total_lines = doc.line_count();
            let DocumentSnapshot { path, text, .. } = doc;
            let result = tokio::task::spawn_blocking(move || source.blame(&path, &text))
                .await
                .unwrap_or_else(|e| Err(BlameError::Io(std::io::Error::other(e))));

            let outcome = session
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .complete_request(&ticket, result, total_lines);

            match outcome {
                UpdateOutcome::Applied(instructions) | UpdateOutcome::Cleared(instructions) => {
                    sink.apply(&ticket.path, instructions);
                }
                UpdateOutcome::Stale | UpdateOutcome::Disabled => {}
            }
        });
    }

    /// Forget a closed document.
    pub fn close(&self, path: &str) {
        self.debouncer.cancel(&path.to_string());
        self.snapshots().remove(path);
        self.session().forget(path);
        self.sink.clear(path);
    }

    /// Current render of `path` from the cache, without running git.
    pub fn render(&self, path: &str, total_lines: usize) -> Vec<RenderInstruction> {
        self.session().render(path, total_lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const SHA_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

    /// Attributes every line of the buffer to one commit by `author`.
    struct FakeGit {
        calls: AtomicUsize,
        fail: bool,
    }

    impl FakeGit {
        fn new(fail: bool) -> Self {
            FakeGit {
                calls: AtomicUsize::new(0),
                fail,
            }
        }
    }

    impl BlameSource for Arc<FakeGit> {
        fn blame(&self, _path: &Path, contents: &str) -> crate::error::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(BlameError::GitFailed {
                    code: Some(128),
                    stderr: "fatal: not a git repository".to_string(),
                });
            }
            let lines = contents.lines().count();
            Ok(format!(
                "{} 1 1 {}\nauthor {}\nauthor-time 1000\n",
                SHA_A,
                lines,
                contents.lines().next().unwrap_or("")
            ))
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        applied: Mutex<HashMap<String, Vec<RenderInstruction>>>,
        applies: AtomicUsize,
        clears: AtomicUsize,
    }

    impl RenderSink for Arc<RecordingSink> {
        fn apply(&self, path: &str, instructions: Vec<RenderInstruction>) {
            self.applies.fetch_add(1, Ordering::SeqCst);
            self.applied.lock().unwrap().insert(path.to_string(), instructions);
        }

        fn clear(&self, path: &str) {
            self.clears.fetch_add(1, Ordering::SeqCst);
            self.applied.lock().unwrap().remove(path);
        }
    }

    fn config() -> HeatConfig {
        HeatConfig {
            debounce_ms: 20,
            ..HeatConfig::default()
        }
    }

    fn doc(version: u64, text: &str) -> DocumentSnapshot {
        DocumentSnapshot {
            path: PathBuf::from("/repo/notes.txt"),
            version,
            text: text.to_string(),
        }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    #[test]
    fn test_line_count() {
        assert_eq!(doc(1, "").line_count(), 1);
        assert_eq!(doc(1, "a\nb").line_count(), 2);
        assert_eq!(doc(1, "a\nb\n").line_count(), 3);
    }

    #[tokio::test]
    async fn test_rapid_updates_run_git_once() {
        let git = Arc::new(FakeGit::new(false));
        let sink = Arc::new(RecordingSink::default());
        let controller = BlameController::new(config(), git.clone(), sink.clone());

        controller.update(doc(1, "Ann\n"));
        controller.update(doc(2, "Ben\n"));
        controller.update(doc(3, "Cat\nsecond\n"));
        settle().await;

        assert_eq!(git.calls.load(Ordering::SeqCst), 1);
        let applied = sink.applied.lock().unwrap();
        let render = &applied["/repo/notes.txt"];
        assert_eq!(render.len(), 3);
        assert!(render[0].text().contains("Cat"));
        assert!(render[2].is_placeholder());
    }

    #[tokio::test]
    async fn test_failure_renders_placeholders() {
        let git = Arc::new(FakeGit::new(true));
        let sink = Arc::new(RecordingSink::default());
        let controller = BlameController::new(config(), git.clone(), sink.clone());

        controller.update(doc(1, "a\nb"));
        settle().await;

        let applied = sink.applied.lock().unwrap();
        let render = &applied["/repo/notes.txt"];
        assert_eq!(render.len(), 2);
        assert!(render.iter().all(RenderInstruction::is_placeholder));
    }

    #[tokio::test]
    async fn test_toggle_clears_and_restores() {
        let git = Arc::new(FakeGit::new(false));
        let sink = Arc::new(RecordingSink::default());
        let controller = BlameController::new(config(), git.clone(), sink.clone());

        controller.update(doc(1, "Ann\n"));
        settle().await;
        assert_eq!(sink.applies.load(Ordering::SeqCst), 1);

        assert!(!controller.toggle());
        assert_eq!(sink.clears.load(Ordering::SeqCst), 1);
        assert!(sink.applied.lock().unwrap().is_empty());

        // edits while disabled wait for blame to come back on
        controller.update(doc(2, "Ben\nb\n"));
        settle().await;
        assert_eq!(git.calls.load(Ordering::SeqCst), 1);

        assert!(controller.toggle());
        assert!(sink.applied.lock().unwrap().is_empty());
        settle().await;
        assert_eq!(git.calls.load(Ordering::SeqCst), 2);
        let applied = sink.applied.lock().unwrap();
        let render = &applied["/repo/notes.txt"];
        assert_eq!(render.len(), 3);
        assert!(render[0].text().contains("Ben"));
    }

    #[tokio::test]
    async fn test_toggle_restores_unchanged_document() {
        let git = Arc::new(FakeGit::new(false));
        let sink = Arc::new(RecordingSink::default());
        let controller = BlameController::new(config(), git.clone(), sink.clone());

        controller.update(doc(1, "Ann\n"));
        settle().await;
        assert!(!controller.toggle());
        assert!(controller.toggle());

        assert!(sink.applied.lock().unwrap()["/repo/notes.txt"][0].text().contains("Ann"));
        settle().await;
        assert_eq!(git.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_theme_change_redraws() {
        let git = Arc::new(FakeGit::new(false));
        let sink = Arc::new(RecordingSink::default());
        let controller = BlameController::new(config(), git.clone(), sink.clone());

        controller.update(doc(1, "Ann\n"));
        settle().await;
        let dark = sink.applied.lock().unwrap()["/repo/notes.txt"].clone();

        controller.update_theme(false);
        let light = sink.applied.lock().unwrap()["/repo/notes.txt"].clone();
        assert_eq!(sink.applies.load(Ordering::SeqCst), 2);
        assert_ne!(dark, light);
        assert_eq!(controller.render("/repo/notes.txt", 2), light);
    }

    #[tokio::test]
    async fn test_theme_change_skips_edited_document() {
        let git = Arc::new(FakeGit::new(false));
        let sink = Arc::new(RecordingSink::default());
        let controller = BlameController::new(config(), git.clone(), sink.clone());

        controller.update(doc(1, "Ann\n"));
        settle().await;
        controller.update(doc(2, "Ben\nb\nc\nd\ne"));
        controller.update_theme(false);
        assert_eq!(sink.applies.load(Ordering::SeqCst), 1);

        settle().await;
        assert_eq!(sink.applies.load(Ordering::SeqCst), 2);
        let render = sink.applied.lock().unwrap()["/repo/notes.txt"].clone();
        assert_eq!(render.len(), 5);
        assert!(render[0].text().contains("Ben"));
        assert_eq!(controller.render("/repo/notes.txt", 5), render);
    }

    #[tokio::test]
    async fn test_close_cancels_pending() {
        let git = Arc::new(FakeGit::new(false));
        let sink = Arc::new(RecordingSink::default());
        let controller = BlameController::new(config(), git.clone(), sink.clone());

        controller.update(doc(1, "Ann\n"));
        controller.close("/repo/notes.txt");
        settle().await;

        assert_eq!(git.calls.load(Ordering::SeqCst), 0);
        assert_eq!(sink.applies.load(Ordering::SeqCst), 0);
        assert_eq!(sink.clears.load(Ordering::SeqCst), 1);
    }
}
