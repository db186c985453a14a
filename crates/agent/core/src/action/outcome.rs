//! Bounded polling of the event feed for outcome phrases.

use std::time::Duration;

use tokio::time::{Instant, sleep};

use crate::config::OutcomePatterns;
use crate::env::EventFeed;

/// Result of one classification window.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Success { pattern: String },
    Failure { pattern: String },
    /// Nothing recognisable arrived before the window closed.
    Timeout,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Phrase that produced the verdict, if any.
    pub fn pattern(&self) -> Option<&str> {
        match self {
            Self::Success { pattern } | Self::Failure { pattern } => Some(pattern),
            Self::Timeout => None,
        }
    }
}

fn first_match<F: EventFeed + ?Sized>(feed: &F, patterns: &[String]) -> Option<String> {
    patterns.iter().find(|p| feed.search(p)).cloned()
}

/// Polls `feed` every `poll_interval` until a phrase matches or `window` elapses.
///
/// The first check happens immediately. Success phrases are checked before
/// failure phrases on every poll.
pub async fn classify<F: EventFeed + ?Sized>(
    feed: &F,
    success: &[String],
    failure: &[String],
    window: Duration,
    poll_interval: Duration,
) -> Outcome {
    let deadline = Instant::now() + window;
    loop {
        if let Some(pattern) = first_match(feed, success) {
            return Outcome::Success { pattern };
        }
        if let Some(pattern) = first_match(feed, failure) {
            return Outcome::Failure { pattern };
        }

        let now = Instant::now();
        if now >= deadline {
            return Outcome::Timeout;
        }
        sleep(poll_interval.min(deadline - now)).await;
    }
}

/// [`classify`] bound to one profile's phrases and poll cadence.
#[derive(Clone, Debug)]
pub struct OutcomeClassifier {
    success: Vec<String>,
    failure: Vec<String>,
    poll_interval: Duration,
}

impl OutcomeClassifier {
    pub fn new(patterns: &OutcomePatterns, poll_interval: Duration) -> Self {
        Self {
            success: patterns.success.clone(),
            failure: patterns.all_failures(),
            poll_interval,
        }
    }

    pub async fn classify<F: EventFeed + ?Sized>(&self, feed: &F, window: Duration) -> Outcome {
        classify(feed, &self.success, &self.failure, window, self.poll_interval).await
    }
}
