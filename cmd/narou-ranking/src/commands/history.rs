use clap::Args;
use serde_json::Value;

use crate::app::App;

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Work identifier, e.g. N1234AB.
    pub ncode: String,
}

pub async fn run(app: &App, args: HistoryArgs) -> anyhow::Result<Value> {
    let history = app.history_service().history(&args.ncode).await?;
    if history.is_empty() {
        tracing::info!(ncode = %args.ncode, "no ranking appearances");
    }
    Ok(serde_json::to_value(history)?)
}
