//! `baton run`: drive the workflow once.

use baton_core::orchestration::{Workflow, WorkflowOutcome};

use super::Context;

pub async fn run(ctx: &Context, interactive: bool) -> Result<(), String> {
    let mut conductor = ctx.conductor();
    if interactive {
        conductor = conductor.with_interactive(true);
    }

    let outcome = conductor
        .run_to_completion()
        .await
        .map_err(|e| e.to_string())?;

    match outcome {
        WorkflowOutcome::Complete => {
            println!("Workflow complete.");
            Ok(())
        }
        WorkflowOutcome::WaitingForHuman => {
            let state = ctx
                .engine
                .state_store
                .load(&ctx.workspace)
                .await
                .map_err(|e| e.to_string())?;
            println!("Waiting for the human: {}", state.human_message);
            println!("Answer with `baton answer <choice>...`.");
            Ok(())
        }
        WorkflowOutcome::HandoffLimit => Err(format!(
            "Stopped after {} turns without completing",
            ctx.engine.config.max_handoffs
        )),
        WorkflowOutcome::Cancelled => Err("Cancelled".to_string()),
    }
}
