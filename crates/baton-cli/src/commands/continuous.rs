//! `baton continuous`: keep re-running the workflow until Ctrl-C.

use std::sync::Arc;

use baton_core::workflow::ContinuousLoop;
use tokio_util::sync::CancellationToken;

use super::Context;

pub async fn run(ctx: &Context) -> Result<(), String> {
    let cancel = CancellationToken::new();
    let conductor = ctx.conductor().with_cancellation(cancel.clone());

    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("[Continuous] Ctrl-C received, stopping");
            on_ctrl_c.cancel();
        }
    });

    let looper = ContinuousLoop::new(
        ctx.engine.clone(),
        &ctx.workspace,
        &ctx.goal_path,
        Arc::new(conductor),
        cancel,
    );
    looper.run().await.map_err(|e| e.to_string())?;
    println!("Continuous mode stopped.");
    Ok(())
}
