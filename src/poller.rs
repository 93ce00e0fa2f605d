//! # AI Content Pollers
//!
//! While a track plays, two background workers keep the screen fresh: one
//! asks the language model for a motivational quote, the other for a couple
//! of lines of lyrics. Both loop until their session's [`CancelToken`] is
//! cancelled.
//!
//! ## Cancellation
//!
//! Cancellation is cooperative. A poller checks its token before each
//! request, between every sleep increment and immediately before
//! publishing. Publishing and cancelling take the same lock, so once
//! [`CancelToken::cancel`] returns the poller can no longer emit anything.
//! An HTTP call that is already in flight is not interrupted; it only
//! delays the worker's exit.
//!
//! ## Lifecycle
//!
//! [`PollerPool`] owns every worker. Starting a new session cancels the
//! previous one first so superseded pollers cannot overwrite the new mood's
//! content.

use crate::events::{Publisher, SessionId, UiEvent};
use crate::llm::{CompletionRequest, LanguageModel};
use crate::mood::Mood;
use log::{debug, error, info, warn};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const TEMPERATURE: f32 = 0.8;

/// Shared flag telling a session's workers to wind down.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<Mutex<bool>>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        *self.cancelled.lock().unwrap_or_else(PoisonError::into_inner) = true;
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` only if not cancelled, holding off [`CancelToken::cancel`]
    /// until it returns. Returns whether `f` ran.
    pub fn run_if_live(&self, f: impl FnOnce()) -> bool {
        let cancelled = self.cancelled.lock().unwrap_or_else(PoisonError::into_inner);
        if *cancelled {
            return false;
        }
        f();
        true
    }

    /// Sleep for `total` in `step` slices, checking between slices.
    /// Returns `false` as soon as cancellation is observed.
    pub fn sleep(&self, total: Duration, step: Duration) -> bool {
        let step = step.max(Duration::from_millis(1));
        let deadline = Instant::now() + total;
        loop {
            if self.is_cancelled() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep(step.min(deadline - now));
        }
    }
}

/// What a poller produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Quote,
    Lyrics,
}

impl ContentKind {
    pub const ALL: [ContentKind; 2] = [ContentKind::Quote, ContentKind::Lyrics];

    /// Prompt for one cycle. Quotes get a system preamble, lyrics do not.
    #[must_use]
    pub fn request(self, mood: Mood) -> CompletionRequest {
        match self {
            ContentKind::Quote => CompletionRequest::new(50, TEMPERATURE)
                .system("You are a kind and motivational assistant.")
                .user(format!(
                    "Give me a short motivational or comforting quote for someone who is feeling {mood}."
                )),
            ContentKind::Lyrics => CompletionRequest::new(60, TEMPERATURE).user(format!(
                "Write 2 lines of original song lyrics for someone feeling {mood}."
            )),
        }
    }

    /// Shown when a request fails.
    #[must_use]
    pub fn fallback(self) -> &'static str {
        match self {
            ContentKind::Quote => "Couldn't fetch quote.",
            ContentKind::Lyrics => "Failed to fetch lyrics.",
        }
    }

    /// Shown while nothing is playing.
    #[must_use]
    pub fn placeholder(self) -> &'static str {
        match self {
            ContentKind::Quote => "Your motivational quote will appear here",
            ContentKind::Lyrics => "Your mood-based lyrics will appear here",
        }
    }

    #[must_use]
    pub fn icon(self) -> &'static str {
        match self {
            ContentKind::Quote => "💡",
            ContentKind::Lyrics => "🎶",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentKind::Quote => f.write_str("quote"),
            ContentKind::Lyrics => f.write_str("lyrics"),
        }
    }
}

/// Result of one poll; the presentation layer decides how to render it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentOutcome {
    Generated(String),
    Fallback {
        message: &'static str,
        reason: String,
    },
}

impl ContentOutcome {
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            ContentOutcome::Generated(text) => text,
            ContentOutcome::Fallback { message, .. } => message,
        }
    }
}

/// Cadence of the polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerSettings {
    /// Pause between the end of one request and the start of the next.
    pub interval: Duration,
    /// Granularity at which the pause checks for cancellation.
    pub increment: Duration,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(2500),
            increment: Duration::from_millis(500),
        }
    }
}

/// One request for `kind`, failures folded into a fallback.
#[must_use]
pub fn fetch_content(kind: ContentKind, mood: Mood, llm: &dyn LanguageModel) -> ContentOutcome {
    match llm.complete(&kind.request(mood)) {
        Ok(text) => ContentOutcome::Generated(text),
        Err(e) => {
            warn!("{kind} generation failed: {e}");
            ContentOutcome::Fallback {
                message: kind.fallback(),
                reason: e.to_string(),
            }
        }
    }
}

/// Poll until `token` is cancelled. Returns how many results were published.
pub fn run_poller(
    kind: ContentKind,
    mood: Mood,
    session: SessionId,
    llm: &dyn LanguageModel,
    token: &CancelToken,
    publisher: &Publisher,
    settings: &PollerSettings,
) -> usize {
    debug!("{kind} poller for session {session} ({mood}) started");
    let mut published = 0;

    while !token.is_cancelled() {
        let outcome = fetch_content(kind, mood, llm);

        let sent = token.run_if_live(|| {
            publisher.publish(UiEvent::Content {
                session,
                kind,
                outcome,
            });
        });
        if !sent {
            debug!("{kind} result for session {session} dropped after cancel");
            break;
        }
        published += 1;

        if !token.sleep(settings.interval, settings.increment) {
            break;
        }
    }

    debug!("{kind} poller for session {session} exited after {published} updates");
    published
}

struct ActiveSession {
    id: SessionId,
    mood: Mood,
    token: CancelToken,
    handles: Vec<JoinHandle<usize>>,
}

/// Owns the poller threads of the current session and any still winding
/// down from earlier ones.
pub struct PollerPool {
    llm: Arc<dyn LanguageModel>,
    publisher: Publisher,
    settings: PollerSettings,
    active: Option<ActiveSession>,
    retired: Vec<JoinHandle<usize>>,
    last_session: SessionId,
}

impl PollerPool {
    pub fn new(llm: Arc<dyn LanguageModel>, publisher: Publisher, settings: PollerSettings) -> Self {
        Self {
            llm,
            publisher,
            settings,
            active: None,
            retired: Vec::new(),
            last_session: 0,
        }
    }

    /// Cancel the current session and start quote and lyrics pollers for
    /// `mood` under a fresh token.
    pub fn start(&mut self, mood: Mood) -> SessionId {
        self.cancel_all();

        self.last_session += 1;
        let id = self.last_session;
        let token = CancelToken::new();
        let mut handles = Vec::with_capacity(ContentKind::ALL.len());

        for kind in ContentKind::ALL {
            let llm = Arc::clone(&self.llm);
            let publisher = self.publisher.clone();
            let worker_token = token.clone();
            let settings = self.settings;

            let spawned = thread::Builder::new()
                .name(format!("{kind}-poller-{id}"))
                .spawn(move || {
                    run_poller(
                        kind,
                        mood,
                        id,
                        llm.as_ref(),
                        &worker_token,
                        &publisher,
                        &settings,
                    )
                });

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => error!("Failed to spawn {kind} poller: {e}"),
            }
        }

        info!("Session {id}: {} pollers for '{mood}'", handles.len());
        self.active = Some(ActiveSession {
            id,
            mood,
            token,
            handles,
        });
        id
    }

    /// Cancel the current session without waiting for its threads.
    /// Returns whether a session was active.
    pub fn cancel_all(&mut self) -> bool {
        self.reap();
        match self.active.take() {
            Some(session) => {
                session.token.cancel();
                debug!("Session {} cancelled", session.id);
                self.retired.extend(session.handles);
                true
            }
            None => false,
        }
    }

    /// Cancel everything and wait for every worker to exit.
    pub fn join(&mut self) {
        self.cancel_all();
        for handle in self.retired.drain(..) {
            if handle.join().is_err() {
                error!("A poller thread panicked");
            }
        }
    }

    #[must_use]
    pub fn current(&self) -> Option<(SessionId, Mood)> {
        self.active.as_ref().map(|s| (s.id, s.mood))
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    fn reap(&mut self) {
        let (done, pending): (Vec<_>, Vec<_>) =
            self.retired.drain(..).partition(JoinHandle::is_finished);
        for handle in done {
            let _ = handle.join();
        }
        self.retired = pending;
    }
}

impl Drop for PollerPool {
    fn drop(&mut self) {
        // Detach rather than block on a slow request during teardown.
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc::Receiver;

    struct EchoModel {
        calls: AtomicUsize,
    }

    impl LanguageModel for EchoModel {
        fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let prompt = &request.messages.last().unwrap().content;
            Ok(format!("#{n} {prompt}"))
        }
    }

    struct DownModel;

    impl LanguageModel for DownModel {
        fn complete(&self, _request: &CompletionRequest) -> Result<String, LlmError> {
            Err(LlmError::Transport("connection refused".to_string()))
        }
    }

    fn fast_settings() -> PollerSettings {
        PollerSettings {
            interval: Duration::from_millis(20),
            increment: Duration::from_millis(5),
        }
    }

    fn drain(rx: &Receiver<UiEvent>) -> Vec<UiEvent> {
        rx.try_iter().collect()
    }

    #[test]
    fn test_quote_request_shape() {
        let request = ContentKind::Quote.request(Mood::Sad);
        assert_eq!(request.max_tokens, 50);
        assert_eq!(request.messages.len(), 2);
        assert!(request.messages[1].content.ends_with("feeling sad."));

        let request = ContentKind::Lyrics.request(Mood::Calm);
        assert_eq!(request.max_tokens, 60);
        assert_eq!(request.messages.len(), 1);
        assert!(request.messages[0].content.contains("feeling calm"));
        assert!((request.temperature - 0.8).abs() < f32::EPSILON);
    }

    #[test]
    fn test_fetch_content_falls_back() {
        let outcome = fetch_content(ContentKind::Lyrics, Mood::Happy, &DownModel);
        assert_eq!(outcome.text(), "Failed to fetch lyrics.");
        match outcome {
            ContentOutcome::Fallback { reason, .. } => assert!(reason.contains("refused")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_token_sleep_returns_early() {
        let token = CancelToken::new();
        let sleeper = token.clone();
        let handle = thread::spawn(move || {
            let start = Instant::now();
            let completed = sleeper.sleep(Duration::from_secs(10), Duration::from_millis(10));
            (completed, start.elapsed())
        });
        thread::sleep(Duration::from_millis(30));
        token.cancel();
        let (completed, elapsed) = handle.join().unwrap();
        assert!(!completed);
        assert!(elapsed < Duration::from_secs(2));
    }

    #[test]
    fn test_run_if_live_respects_cancel() {
        let token = CancelToken::new();
        assert!(token.run_if_live(|| {}));
        token.cancel();
        let mut ran = false;
        assert!(!token.run_if_live(|| ran = true));
        assert!(!ran);
    }

    #[test]
    fn test_pre_cancelled_poller_publishes_nothing() {
        let (publisher, rx) = Publisher::channel();
        let token = CancelToken::new();
        token.cancel();
        let model = EchoModel { calls: AtomicUsize::new(0) };
        let published = run_poller(
            ContentKind::Quote,
            Mood::Happy,
            1,
            &model,
            &token,
            &publisher,
            &fast_settings(),
        );
        assert_eq!(published, 0);
        assert!(drain(&rx).is_empty());
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_pool_publishes_both_kinds_then_goes_quiet() {
        let (publisher, rx) = Publisher::channel();
        let model = Arc::new(EchoModel { calls: AtomicUsize::new(0) });
        let mut pool = PollerPool::new(model, publisher, fast_settings());

        let session = pool.start(Mood::Energetic);
        assert_eq!(pool.current(), Some((session, Mood::Energetic)));
        thread::sleep(Duration::from_millis(100));
        pool.join();
        assert!(!pool.is_active());

        let events = drain(&rx);
        let kinds: Vec<ContentKind> = events
            .iter()
            .filter_map(|e| match e {
                UiEvent::Content { kind, session: s, .. } if *s == session => Some(*kind),
                _ => None,
            })
            .collect();
        assert!(kinds.contains(&ContentKind::Quote));
        assert!(kinds.contains(&ContentKind::Lyrics));

        thread::sleep(Duration::from_millis(60));
        assert!(drain(&rx).is_empty(), "poller published after join");
    }

    #[test]
    fn test_new_session_supersedes_old() {
        let (publisher, rx) = Publisher::channel();
        let model = Arc::new(EchoModel { calls: AtomicUsize::new(0) });
        let mut pool = PollerPool::new(model, publisher, fast_settings());

        let first = pool.start(Mood::Sad);
        thread::sleep(Duration::from_millis(40));
        let second = pool.start(Mood::Happy);
        assert_ne!(first, second);

        // Anything published after the switch belongs to the new session.
        drain(&rx);
        thread::sleep(Duration::from_millis(60));
        pool.join();
        for event in drain(&rx) {
            if let UiEvent::Content { session, .. } = event {
                assert_eq!(session, second);
            }
        }
    }

    #[test]
    fn test_failures_keep_polling_on_schedule() {
        let (publisher, rx) = Publisher::channel();
        let mut pool = PollerPool::new(Arc::new(DownModel), publisher, fast_settings());
        pool.start(Mood::Angry);
        thread::sleep(Duration::from_millis(120));
        pool.join();

        let fallbacks = drain(&rx)
            .into_iter()
            .filter(|e| {
                matches!(
                    e,
                    UiEvent::Content {
                        outcome: ContentOutcome::Fallback { .. },
                        ..
                    }
                )
            })
            .count();
        assert!(fallbacks >= 4, "only {fallbacks} fallbacks");
    }
}
