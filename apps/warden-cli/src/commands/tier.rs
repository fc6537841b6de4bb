// tier.rs — Resolve the autonomy tier for an explicit category.

use anyhow::Context;
use warden_intent::{IntentCategory, Principals};
use warden_policy::{extract_file_paths, resolve_tier, AutonomyTier, TierInputs};
use warden_router::RouterConfig;

pub fn execute(
    config: &RouterConfig,
    message: &str,
    category: &str,
    sender: &str,
) -> anyhow::Result<()> {
    let category = parse_category(category)?;
    let tier = tier_for(config, message, category, sender);
    println!(
        "{} (category: {}, sender: {}, elevated: {})",
        tier.as_str(),
        category.as_str(),
        sender,
        tier.is_elevated()
    );
    Ok(())
}

pub fn parse_category(name: &str) -> anyhow::Result<IntentCategory> {
    let name = name.trim().to_ascii_lowercase();
    IntentCategory::ALL
        .into_iter()
        .find(|c| c.as_str() == name)
        .with_context(|| {
            let known: Vec<&str> = IntentCategory::ALL.iter().map(|c| c.as_str()).collect();
            format!("unknown category '{}' (expected one of: {})", name, known.join(", "))
        })
}

pub fn tier_for(
    config: &RouterConfig,
    message: &str,
    category: IntentCategory,
    sender: &str,
) -> AutonomyTier {
    let principals = Principals::new(config.authorized_principals.iter().cloned());
    let target_files = extract_file_paths(message);
    resolve_tier(&TierInputs {
        category,
        is_authorized_principal: principals.is_authorized(sender),
        message,
        target_files: &target_files,
        permission_backend_available: config.permission_policy.is_some(),
    })
}
