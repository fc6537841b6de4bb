// classify.rs — Dry-run classification: intent, preflight and tier as JSON.
//
// Uses the keyword-only classifier so the result is deterministic and no
// external validator is contacted.

use serde_json::{json, Value};
use warden_intent::{IntentClassifier, Principals};
use warden_policy::{extract_file_paths, resolve_tier, TierInputs};
use warden_router::preflight::preflight;
use warden_router::RouterConfig;

pub fn execute(
    config: &RouterConfig,
    message: &str,
    sender: &str,
    channel: &str,
) -> anyhow::Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    let report = rt.block_on(classify(config, message, sender, channel));
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

pub async fn classify(config: &RouterConfig, message: &str, sender: &str, channel: &str) -> Value {
    let classifier = IntentClassifier::keyword_only(
        Principals::new(config.authorized_principals.iter().cloned()),
        config.classifier_settings(),
    );
    let mut intent = classifier.classify(message, sender, channel).await;

    let permission_available = config.permission_policy.is_some();
    let preflight = preflight(
        &mut intent,
        permission_available,
        config.execution.endpoint.is_some(),
    );

    let target_files = extract_file_paths(intent.raw_message());
    let tier = resolve_tier(&TierInputs {
        category: intent.category(),
        is_authorized_principal: intent.is_authorized_principal(),
        message: intent.raw_message(),
        target_files: &target_files,
        permission_backend_available: permission_available,
    });

    json!({
        "intent": intent,
        "preflight": preflight,
        "targetFiles": target_files,
        "tier": tier.as_str(),
    })
}
