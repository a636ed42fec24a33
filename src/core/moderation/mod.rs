// Core moderation module - the decision pipeline.
//
// - `moderation_models` - rules, verdicts and other pure domain types
// - `evaluator` - first-match rule selection
// - `classifier` - classifier port, prompt rendering and payload decoding
// - `action_dispatcher` - applies a rule's consequence to the actor
// - `content_gate` - suspends content while it is analyzed, then resolves it
// - `moderation_service` - live snapshot and reload

pub mod action_dispatcher;
pub mod classifier;
pub mod content_gate;
pub mod evaluator;
pub mod moderation_models;
pub mod moderation_service;

pub use action_dispatcher::{ActionDispatcher, ActionSurface};
pub use classifier::{Classifier, ClassifierError};
pub use content_gate::{ContentGate, GateReport, InterceptedContent, Resolution};
pub use moderation_models::*;
pub use moderation_service::{
    ConfigError, ModerationConfigSource, ModerationService, ModerationSnapshot,
};
