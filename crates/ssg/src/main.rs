use std::sync::Arc;

use tracing::info;

use ssg_core::{chat::correlator::Correlator, config::Config};
use ssg_slack::{SlackBackend, SlackConfig};

#[tokio::main]
async fn main() -> Result<(), ssg_core::Error> {
    ssg_core::logging::init("ssg")?;

    let cfg = Arc::new(Config::load()?);
    info!(
        responder = %cfg.bot_user_id,
        poll_interval = ?cfg.poll_interval,
        reply_timeout = ?cfg.reply_timeout,
        "configuration loaded"
    );

    let backend = Arc::new(SlackBackend::new(SlackConfig::from(cfg.as_ref()))?);
    let correlator =
        Arc::new(Correlator::new(backend).with_in_progress_suffix(cfg.typing_suffix.clone()));
    info!(
        in_progress_suffix = correlator.in_progress_suffix(),
        "correlator ready"
    );

    ssg_web::serve(cfg, correlator)
        .await
        .map_err(|e| ssg_core::Error::External(format!("web server failed: {e:#}")))?;

    Ok(())
}
