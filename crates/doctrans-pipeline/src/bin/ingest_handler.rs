//! Lambda entry point for S3 object-created notifications

use aws_lambda_events::event::s3::S3Event;
use doctrans_common::logging::{init_logging, LogConfig};
use doctrans_pipeline::{handlers, PipelineContext};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_logging(&LogConfig::from_env()?)?;

    let ctx = PipelineContext::from_env().await?;
    info!("Ingestion handler ready");

    run(service_fn(|event: LambdaEvent<S3Event>| {
        let ctx = &ctx;
        async move {
            Ok::<_, Error>(handlers::handle_object_created(ctx, event.payload).await)
        }
    }))
    .await
}
