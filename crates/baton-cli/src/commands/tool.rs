//! `baton tool`: invoke a tool call by hand.

use baton_core::models::Caller;

use super::{print_json, Context};

pub async fn run(
    ctx: &Context,
    name: &str,
    agent: &str,
    model: Option<&str>,
    args: &str,
) -> Result<(), String> {
    let args: serde_json::Value =
        serde_json::from_str(args).map_err(|e| format!("Invalid JSON args: {}", e))?;
    // The runner exports an empty BATON_MODEL when the agent has no variant.
    let caller = match model.filter(|m| !m.trim().is_empty()) {
        Some(model) => Caller::with_model(agent, model),
        None => Caller::new(agent),
    };

    let tools = ctx.tools().await?;
    let result = tools
        .dispatch(&caller, name, args)
        .await
        .map_err(|e| e.to_string())?;
    let value = serde_json::to_value(&result).map_err(|e| e.to_string())?;
    print_json(&value);
    Ok(())
}
