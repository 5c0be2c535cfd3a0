//! First-acceptable-wins evaluation of extraction stages.

use std::time::Duration;

use futures::future::BoxFuture;

use crate::error::ScraperError;
use crate::text::{char_len, normalize_whitespace};

/// What one strategy produced: candidate text plus the HTML it came from.
#[derive(Debug, Clone, Default)]
pub struct StageOutput {
    pub text: String,
    pub html: Option<String>,
}

/// One strategy in the chain, bounded by its own timeout and accepted only
/// when its normalized text reaches `min_chars`.
pub struct Stage<'a> {
    pub name: &'static str,
    pub timeout: Duration,
    pub min_chars: usize,
    pub run: BoxFuture<'a, Result<StageOutput, ScraperError>>,
}

impl<'a> Stage<'a> {
    pub fn new(
        name: &'static str,
        timeout: Duration,
        min_chars: usize,
        run: BoxFuture<'a, Result<StageOutput, ScraperError>>,
    ) -> Self {
        Self {
            name,
            timeout,
            min_chars,
            run,
        }
    }
}

#[derive(Debug, Default)]
pub struct ChainOutcome {
    /// Winning stage name and its normalized text.
    pub accepted: Option<(&'static str, String)>,
    /// Most recent HTML any stage produced, accepted or not.
    pub last_html: Option<String>,
}

/// Runs `stages` in order and stops at the first whose output is acceptable.
///
/// Terminal failures (timeouts, blocks, bad statuses, render errors) and
/// too-short output both count as a stage failure; they are logged
/// differently.
pub async fn first_acceptable(url: &str, stages: Vec<Stage<'_>>) -> ChainOutcome {
    let mut outcome = ChainOutcome::default();

    for stage in stages {
        let result = match tokio::time::timeout(stage.timeout, stage.run).await {
            Ok(result) => result,
            Err(_) => Err(ScraperError::Timeout {
                stage: stage.name,
                secs: stage.timeout.as_secs(),
            }),
        };

        let output = match result {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(url, stage = stage.name, error = %e, "extraction stage failed");
                continue;
            }
        };

        if output.html.is_some() {
            outcome.last_html = output.html;
        }
        let text = normalize_whitespace(&output.text);
        let len = char_len(&text);
        if len >= stage.min_chars {
            tracing::debug!(url, stage = stage.name, len, "extraction stage accepted");
            outcome.accepted = Some((stage.name, text));
            return outcome;
        }

        let short = ScraperError::InsufficientContent {
            stage: stage.name,
            len,
            min: stage.min_chars,
        };
        tracing::debug!(url, stage = stage.name, error = %short, "extraction stage too short");
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn ok_stage(name: &'static str, min: usize, text: &str) -> Stage<'static> {
        let text = text.to_string();
        Stage::new(
            name,
            Duration::from_secs(1),
            min,
            async move {
                Ok(StageOutput {
                    html: Some(format!("<p>{text}</p>")),
                    text,
                })
            }
            .boxed(),
        )
    }

    #[tokio::test]
    async fn first_long_enough_stage_wins() {
        let outcome = first_acceptable(
            "https://example.com",
            vec![ok_stage("short", 10, "tiny"), ok_stage("long", 10, "long enough text")],
        )
        .await;
        assert_eq!(outcome.accepted, Some(("long", "long enough text".to_string())));
    }

    #[tokio::test]
    async fn later_stages_do_not_run_after_acceptance() {
        let calls = AtomicU32::new(0);
        let counted = async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(StageOutput::default())
        }
        .boxed();
        let outcome = first_acceptable(
            "https://example.com",
            vec![
                ok_stage("first", 1, "ok"),
                Stage::new("second", Duration::from_secs(1), 1, counted),
            ],
        )
        .await;
        assert_eq!(outcome.accepted.map(|(name, _)| name), Some("first"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn errors_and_timeouts_fall_through() {
        let failing = async { Err(ScraperError::Browser("crashed".into())) }.boxed();
        let hanging = async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(StageOutput::default())
        }
        .boxed();
        let outcome = first_acceptable(
            "https://example.com",
            vec![
                Stage::new("failing", Duration::from_secs(1), 1, failing),
                Stage::new("hanging", Duration::from_millis(10), 1, hanging),
                ok_stage("last", 1, "fine"),
            ],
        )
        .await;
        assert_eq!(outcome.accepted.map(|(name, _)| name), Some("last"));
    }

    #[tokio::test]
    async fn all_failing_keeps_last_html() {
        let outcome = first_acceptable(
            "https://example.com",
            vec![ok_stage("a", 100, "one"), ok_stage("b", 100, "two")],
        )
        .await;
        assert!(outcome.accepted.is_none());
        assert_eq!(outcome.last_html.as_deref(), Some("<p>two</p>"));
    }

    #[tokio::test]
    async fn acceptance_counts_normalized_characters() {
        let outcome = first_acceptable(
            "https://example.com",
            vec![ok_stage("spaces", 5, "  a     b  ")],
        )
        .await;
        assert!(outcome.accepted.is_none());
    }
}
