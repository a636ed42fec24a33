// Action dispatcher - applies a triggered rule's consequence to the actor.
//
// Runs on the governing loop only: kicking, banning and console commands
// mutate server state and must not race other game-state changes. Nothing
// here can be undone, so the gate calls it once the verdict is final.

use super::content_gate::InterceptedContent;
use super::moderation_models::{Actor, Rule, RuleAction};
use std::sync::Arc;

// ============================================================================
// ACTION SURFACE (PORT)
// ============================================================================

/// Privileged primitives the host exposes for carrying out consequences.
pub trait ActionSurface: Send + Sync {
    /// Forcibly disconnect the actor with `reason`.
    fn disconnect(&self, actor: &Actor, reason: &str);

    /// Send the actor a private notification.
    fn notify(&self, actor: &Actor, message: &str);

    /// Run a command with console privileges.
    fn execute_command(&self, command: &str);
}

impl<S: ActionSurface + ?Sized> ActionSurface for Arc<S> {
    fn disconnect(&self, actor: &Actor, reason: &str) {
        (**self).disconnect(actor, reason)
    }

    fn notify(&self, actor: &Actor, message: &str) {
        (**self).notify(actor, message)
    }

    fn execute_command(&self, command: &str) {
        (**self).execute_command(command)
    }
}

/// What the dispatcher did. Used for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Kicked,
    Banned,
    Warned,
    CommandExecuted(String),
    /// `command` action with an empty template
    CommandSkipped,
    /// The rule's action name was not recognized
    Misconfigured(String),
}

// ============================================================================
// DISPATCHER
// ============================================================================

pub struct ActionDispatcher<A: ActionSurface> {
    surface: A,
}

impl<A: ActionSurface> ActionDispatcher<A> {
    pub fn new(surface: A) -> Self {
        Self { surface }
    }

    /// Apply `rule`'s consequence to `actor` and cancel the originating event.
    ///
    /// The event is cancelled for every action, including unrecognized ones:
    /// by the time we get here the content has been blocked and must stay so.
    pub fn dispatch(
        &self,
        actor: &Actor,
        rule: &Rule,
        event: &mut dyn InterceptedContent,
    ) -> DispatchOutcome {
        let message = rule.render_message();

        let outcome = match &rule.action {
            RuleAction::Kick => {
                self.surface.disconnect(actor, &message);
                DispatchOutcome::Kicked
            }
            RuleAction::Ban => {
                self.surface
                    .execute_command(&format!("ban {} {}", actor.name, message));
                DispatchOutcome::Banned
            }
            RuleAction::Warn => {
                self.surface
                    .notify(actor, &format!("Warning: {}", message));
                DispatchOutcome::Warned
            }
            RuleAction::Command => match rule.render_command(&actor.name) {
                Some(command) => {
                    self.surface.execute_command(&command);
                    DispatchOutcome::CommandExecuted(command)
                }
                None => DispatchOutcome::CommandSkipped,
            },
            RuleAction::Unrecognized(raw) => {
                tracing::error!(
                    rule = %rule.name,
                    action = %raw,
                    "Rule has an unknown action, check the moderation config"
                );
                self.surface
                    .notify(actor, &format!("Error: unknown moderation action {}", raw));
                DispatchOutcome::Misconfigured(raw.clone())
            }
        };

        event.cancel();

        tracing::info!(
            actor = %actor,
            rule = %rule.name,
            outcome = ?outcome,
            "Moderation action dispatched"
        );

        outcome
    }
}
