use aws_lambda_events::event::sns::SnsEvent;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use user_accounts::{config::MailerConfig, logging, mailer::Dispatcher};

#[tokio::main]
async fn main() -> Result<(), Error> {
    logging::init_lambda("user_accounts=info,verification_mailer=info");

    let config = MailerConfig::from_env()?;
    let dispatcher = Dispatcher::from_config(config).await;
    let dispatcher = &dispatcher;

    run(service_fn(move |event: LambdaEvent<SnsEvent>| async move {
        dispatcher.handle_event(event.payload).await.map_err(|e| {
            tracing::error!(error = %e, "verification email not sent");
            Error::from(e)
        })
    }))
    .await
}
