//! Lambda entry point for translation job state-change events

use doctrans_common::logging::{init_logging, LogConfig};
use doctrans_pipeline::{handlers, PipelineContext};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_logging(&LogConfig::from_env()?)?;

    let ctx = PipelineContext::from_env().await?;
    info!("Completion handler ready");

    // Taken as raw JSON so a malformed event becomes an error result.
    run(service_fn(|event: LambdaEvent<serde_json::Value>| {
        let ctx = &ctx;
        async move {
            Ok::<_, Error>(handlers::handle_job_state_change(ctx, event.payload).await)
        }
    }))
    .await
}
