//! `baton status`: print the workflow state document.

use super::{print_json, Context};

pub async fn run(ctx: &Context) -> Result<(), String> {
    let state = ctx
        .engine
        .state_store
        .snapshot(&ctx.workspace)
        .await
        .map_err(|e| e.to_string())?;
    let value = serde_json::to_value(&state).map_err(|e| e.to_string())?;
    print_json(&value);
    Ok(())
}
