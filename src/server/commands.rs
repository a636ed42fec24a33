// Operator commands.

use crate::core::moderation::{
    ActionSurface, ContentGate, ModerationConfigSource, ModerationService,
};

pub const RELOAD_ACK: &str = "[AIModerator] Config reloaded!";

/// /aimreload - reload rules and credential from the config source.
///
/// Always acknowledges. A failed reload is logged by the service and the
/// previous rules stay live.
pub async fn aimreload<S>(service: &ModerationService, source: &S) -> String
where
    S: ModerationConfigSource + ?Sized,
{
    tracing::info!("Reload requested by operator");
    let _ = service.reload(source).await;
    RELOAD_ACK.to_string()
}

/// /aimstatus - live rules, fail policy and pending analyses.
pub async fn aimstatus<A: ActionSurface>(
    service: &ModerationService,
    gate: &ContentGate<A>,
) -> String {
    let snapshot = service.snapshot().await;

    let rules = if snapshot.rules.is_empty() {
        "none".to_string()
    } else {
        snapshot
            .rules
            .iter()
            .map(|rule| format!("{} (>= {:.2}, {})", rule.name, rule.threshold, rule.action))
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!(
        "[AIModerator] {} rule(s): {} | {} | {} in flight | loaded {}",
        snapshot.rules.len(),
        rules,
        snapshot.settings.fail_policy,
        gate.in_flight(),
        snapshot.loaded_at.format("%Y-%m-%d %H:%M:%S UTC")
    )
}
