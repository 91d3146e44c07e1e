//! `baton dag`: print the normalized flow.

use super::Context;

pub async fn run(ctx: &Context) -> Result<(), String> {
    let (_, _, dag) = ctx
        .conductor()
        .load_dag()
        .await
        .map_err(|e| e.to_string())?;
    print!("{}", dag.to_dot());
    Ok(())
}
