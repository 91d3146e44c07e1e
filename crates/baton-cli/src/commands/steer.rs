//! `baton steer` / `baton answer`: talk to the workflow as the Human Partner.

use super::{print_json, Context};

pub async fn run(ctx: &Context, message: &str, to: Option<&str>) -> Result<(), String> {
    let tools = ctx.tools().await?;
    if let Some(to) = to {
        if !tools.known_agents().contains(baton_core::models::bare_name(to)) {
            return Err(format!("Unknown agent '{}'", to));
        }
    }
    let result = tools
        .post_human_message(message, to)
        .await
        .map_err(|e| e.to_string())?;
    finish(result)
}

pub async fn answer(ctx: &Context, answers: &[String]) -> Result<(), String> {
    let tools = ctx.tools().await?;
    let result = tools
        .answer_question(answers)
        .await
        .map_err(|e| e.to_string())?;
    finish(result)
}

fn finish(result: baton_core::ToolResult) -> Result<(), String> {
    if result.success {
        print_json(&result.data.unwrap_or_default());
        Ok(())
    } else {
        Err(result.error.unwrap_or_else(|| "Unknown error".to_string()))
    }
}
