//! Progress-callback trait for per-slide enhancement events.
//!
//! Inject an [`Arc<dyn StudyProgressCallback>`] via
//! [`crate::config::StudyConfigBuilder::progress_callback`] to receive events
//! as the pipeline works through a deck. The CLI uses it to drive a terminal
//! progress bar; a web front-end could forward the same events to a
//! processing-steps indicator.
//!
//! # Example
//!
//! ```rust
//! use lecslide::{StudyConfig, StudyProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct Counter(AtomicUsize);
//!
//! impl StudyProgressCallback for Counter {
//!     fn on_slide_complete(&self, _slide: usize, _total: usize, _questions: usize) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = StudyConfig::builder()
//!     .progress_callback(Arc::new(Counter(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the study pipeline as it enhances each slide.
///
/// All methods default to no-ops. Slides are enhanced concurrently, so
/// `on_slide_*` may be called from several tasks at once; implementations
/// must synchronise any shared state.
pub trait StudyProgressCallback: Send + Sync {
    /// Called once after extraction, before any slide is enhanced.
    fn on_study_start(&self, total_slides: usize) {
        let _ = total_slides;
    }

    /// Called just before the four generation requests for a slide are sent.
    ///
    /// `slide_num` is 1-indexed.
    fn on_slide_start(&self, slide_num: usize, total_slides: usize) {
        let _ = (slide_num, total_slides);
    }

    /// Called when a slide has all four artefacts.
    fn on_slide_complete(&self, slide_num: usize, total_slides: usize, question_count: usize) {
        let _ = (slide_num, total_slides, question_count);
    }

    /// Called when any of the slide's requests failed.
    fn on_slide_error(&self, slide_num: usize, total_slides: usize, error: &str) {
        let _ = (slide_num, total_slides, error);
    }

    /// Called once when the pipeline stops, successful or not.
    fn on_study_complete(&self, total_slides: usize, success_count: usize) {
        let _ = (total_slides, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl StudyProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::StudyConfig`].
pub type ProgressCallback = Arc<dyn StudyProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        finished: AtomicUsize,
    }

    impl StudyProgressCallback for TrackingCallback {
        fn on_slide_start(&self, _slide_num: usize, _total: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_slide_complete(&self, _slide_num: usize, _total: usize, _questions: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_slide_error(&self, _slide_num: usize, _total: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_study_complete(&self, _total: usize, success_count: usize) {
            self.finished.store(success_count, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_study_start(2);
        cb.on_slide_start(1, 2);
        cb.on_slide_complete(1, 2, 2);
        cb.on_slide_error(2, 2, "boom");
        cb.on_study_complete(2, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_slide_start(1, 2);
        tracker.on_slide_complete(1, 2, 2);
        tracker.on_slide_start(2, 2);
        tracker.on_slide_error(2, 2, "summary failed");
        tracker.on_study_complete(2, 1);

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.finished.load(Ordering::SeqCst), 1);
    }
}
