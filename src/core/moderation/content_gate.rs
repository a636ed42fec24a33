// Content gate - holds intercepted content back until a verdict exists.
//
// Lifecycle of one event:
//
//   Captured -> Suspended -> Analyzing -> Resolved { Accepted | Blocked }
//
// `intercept` runs on the governing loop: it copies the original text,
// hides the content, and spawns the analysis task. The task owns the pending
// content until it sends it back through the completion channel. The
// governing loop then calls `resolve`, which consumes the completion, so an
// event can only ever be resolved once.

use super::action_dispatcher::{ActionDispatcher, ActionSurface, DispatchOutcome};
use super::classifier::ClassifierError;
use super::moderation_models::{Actor, ContentKind, FailPolicy, ModerationVerdict, Rule};
use super::moderation_service::{ModerationService, ModerationSnapshot};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

// ============================================================================
// HOST CAPABILITY (PORT)
// ============================================================================

/// A content-producing host event, seen through the operations the gate needs.
///
/// Implementations hold the content-specific payload (chat line, book pages,
/// sign lines) and know how to show, hide and rewrite it in the host.
pub trait InterceptedContent: Send + 'static {
    fn kind(&self) -> ContentKind;

    fn actor(&self) -> &Actor;

    /// The text sent to the classifier. Must not change after interception.
    fn original_text(&self) -> String;

    /// Hide the content (placeholder or held-back propagation).
    fn suppress(&mut self);

    /// Restore the original content exactly and let it propagate.
    fn commit(&mut self);

    /// Replace the content with this kind's blocked placeholder.
    fn block(&mut self);

    /// Cancel the host's default handling of the event.
    fn cancel(&mut self);
}

// ============================================================================
// STATE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Accepted,
    Blocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Captured,
    Suspended,
    Analyzing,
    Resolved(Resolution),
}

/// Intercepted content plus the verbatim copy that gets classified.
pub struct PendingContent {
    content: Box<dyn InterceptedContent>,
    sample: String,
    state: GateState,
    captured_at: DateTime<Utc>,
}

impl PendingContent {
    fn capture(content: Box<dyn InterceptedContent>) -> Self {
        let sample = content.original_text();
        Self {
            content,
            sample,
            state: GateState::Captured,
            captured_at: Utc::now(),
        }
    }

    fn suspend(&mut self) {
        debug_assert_eq!(self.state, GateState::Captured);
        self.content.suppress();
        self.state = GateState::Suspended;
    }

    #[cfg(test)]
    pub fn state(&self) -> GateState {
        self.state
    }

    #[cfg(test)]
    pub fn sample(&self) -> &str {
        &self.sample
    }
}

/// An analysis task's result, waiting to be applied on the governing loop.
pub struct CompletedAnalysis {
    pending: PendingContent,
    snapshot: Arc<ModerationSnapshot>,
    outcome: Result<ModerationVerdict, ClassifierError>,
}

/// What `resolve` did with one event.
#[derive(Debug, Clone, PartialEq)]
pub struct GateReport {
    pub kind: ContentKind,
    pub actor: Actor,
    pub resolution: Resolution,
    /// Name of the rule that was applied, if any
    pub rule: Option<String>,
    pub dispatched: Option<DispatchOutcome>,
}

// ============================================================================
// GATE
// ============================================================================

pub struct ContentGate<A: ActionSurface> {
    moderation: Arc<ModerationService>,
    dispatcher: ActionDispatcher<A>,
    completed_tx: mpsc::UnboundedSender<CompletedAnalysis>,
    completed_rx: mpsc::UnboundedReceiver<CompletedAnalysis>,
    in_flight: usize,
}

impl<A: ActionSurface> ContentGate<A> {
    pub fn new(moderation: Arc<ModerationService>, dispatcher: ActionDispatcher<A>) -> Self {
        let (completed_tx, completed_rx) = mpsc::unbounded_channel();
        Self {
            moderation,
            dispatcher,
            completed_tx,
            completed_rx,
            in_flight: 0,
        }
    }

    /// Number of events whose analysis has not been resolved yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Capture and suspend `content`, then classify it off the governing loop.
    ///
    /// The snapshot is taken here, so a reload after this point does not
    /// change how this event is judged.
    pub async fn intercept(&mut self, content: Box<dyn InterceptedContent>) {
        let mut pending = PendingContent::capture(content);
        pending.suspend();

        let snapshot = self.moderation.snapshot().await;
        pending.state = GateState::Analyzing;
        self.in_flight += 1;

        tracing::debug!(
            kind = %pending.content.kind(),
            actor = %pending.content.actor(),
            chars = pending.sample.chars().count(),
            "Content suspended for analysis"
        );

        let tx = self.completed_tx.clone();
        tokio::spawn(async move {
            let sample = pending.sample.clone();
            let analysis = Arc::clone(&snapshot);

            // A panicking classifier must still hand the content back
            let outcome = match tokio::spawn(async move { analysis.analyze(&sample).await }).await {
                Ok(outcome) => outcome,
                Err(e) => Err(ClassifierError::Aborted(e.to_string())),
            };

            let completed = CompletedAnalysis {
                pending,
                snapshot,
                outcome,
            };
            if tx.send(completed).is_err() {
                tracing::debug!("Governing loop is gone, dropping analysis result");
            }
        });
    }

    /// Wait for the next finished analysis.
    pub async fn next_completed(&mut self) -> Option<CompletedAnalysis> {
        self.completed_rx.recv().await
    }

    /// Apply a finished analysis: accept or block the content, dispatch the
    /// rule's action if one triggered. Governing loop only.
    pub fn resolve(&mut self, completed: CompletedAnalysis) -> GateReport {
        let CompletedAnalysis {
            mut pending,
            snapshot,
            outcome,
        } = completed;
        self.in_flight = self.in_flight.saturating_sub(1);

        let kind = pending.content.kind();
        let actor = pending.content.actor().clone();

        let mut failure = None;
        let (resolution, applied) = match outcome {
            Ok(ModerationVerdict::NoViolation) => {
                pending.content.commit();
                (Resolution::Accepted, None)
            }
            Ok(ModerationVerdict::Violation(rule)) => {
                let outcome = self.block(&mut pending, &rule);
                (Resolution::Blocked, Some((rule.name, outcome)))
            }
            Err(e) => {
                failure = Some(e);
                match snapshot.settings.fail_policy {
                    FailPolicy::Open => {
                        pending.content.commit();
                        (Resolution::Accepted, None)
                    }
                    FailPolicy::Closed => {
                        let fallback = &snapshot.settings.fallback_rule;
                        let outcome = self.block(&mut pending, fallback);
                        (Resolution::Blocked, Some((fallback.name.clone(), outcome)))
                    }
                }
            }
        };

        pending.state = GateState::Resolved(resolution);
        let latency_ms = (Utc::now() - pending.captured_at).num_milliseconds();

        // One line per event; classifier failures are reported on it
        match &failure {
            Some(e) => tracing::warn!(
                kind = %kind,
                actor = %actor,
                resolution = ?resolution,
                fail_policy = %snapshot.settings.fail_policy,
                error = %e,
                latency_ms,
                "Classifier failed, content resolved by fail policy"
            ),
            None => tracing::info!(
                kind = %kind,
                actor = %actor,
                resolution = ?resolution,
                rule = applied.as_ref().map(|(rule, _)| rule.as_str()).unwrap_or("-"),
                latency_ms,
                "Content resolved"
            ),
        }

        let (rule, dispatched) = match applied {
            Some((rule, outcome)) => (Some(rule), Some(outcome)),
            None => (None, None),
        };

        GateReport {
            kind,
            actor,
            resolution,
            rule,
            dispatched,
        }
    }

    /// Resolve what is still in flight, for at most `grace`. Returns how
    /// many analyses were abandoned.
    pub async fn drain(&mut self, grace: Duration) -> usize {
        let deadline = tokio::time::Instant::now() + grace;

        while self.in_flight > 0 {
            match tokio::time::timeout_at(deadline, self.completed_rx.recv()).await {
                Ok(Some(completed)) => {
                    self.resolve(completed);
                }
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(
                        abandoned = self.in_flight,
                        "Shutdown grace period expired, abandoning pending analyses"
                    );
                    break;
                }
            }
        }

        self.in_flight
    }

    fn block(&self, pending: &mut PendingContent, rule: &Rule) -> DispatchOutcome {
        pending.content.block();
        let actor = pending.content.actor().clone();
        self.dispatcher
            .dispatch(&actor, rule, pending.content.as_mut())
    }
}
