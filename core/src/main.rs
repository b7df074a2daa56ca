mod dispatch;
mod routes;

use std::{sync::Arc, time::Duration};

use actix_web::{App, HttpServer, web};
use admin::AdminService;
use common::env_config::Config;
use dispatch::Dispatcher;
use intake::IntakeService;
use reminder::{LogNotifier, Notifier, WebhookNotifier};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // get env vars
    let config = Config::from_env();
    let config_data = config.clone();

    // init logger
    if config.console_logging_enabled {
        logger::setup(&config.log_file, !config.is_production()).expect("Failed to set up logger");
    }

    // init db connection
    let pool = db::setup(&config.database_url)
        .await
        .expect("Failed to set up database");

    let dispatcher = Arc::new(Dispatcher::new(
        AdminService::new(pool.clone(), &config.admin),
        IntakeService::new(pool.clone(), config.pricing.clone(), config.prompts.clone()),
    ));

    // unsolicited messages go through the bounded outbound queue
    let sink: Arc<dyn Notifier> = match &config.delivery.outbound_webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(url, config.gateway_secret.clone())),
        None => {
            log::warn!("OUTBOUND_WEBHOOK_URL is not set, reminders will only be logged");
            Arc::new(LogNotifier)
        }
    };
    let (queue, _worker) = reminder::outbound_queue(config.delivery.queue_capacity, sink);
    reminder::spawn_scheduler(
        pool.clone(),
        Arc::new(queue),
        Duration::from_secs(config.delivery.reminder_first_delay_secs),
        Duration::from_secs(config.delivery.reminder_interval_secs),
        reminder::display_offset(config.delivery.display_utc_offset_minutes),
    );

    if config.gateway_secret.is_none() {
        log::warn!("GATEWAY_SECRET is not set, the event webhook is open");
    }
    log::info!(
        "Listening on {}:{} ({})",
        config.server_host,
        config.server_port,
        config.environment
    );

    // one budget shared by every worker
    let event_limiter = limiter::global_middleware(config.requests_per_second);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(dispatcher.clone()))
            .wrap(guard::middleware(config_data.gateway_secret.clone())) // 3rd
            .wrap(logger::middleware()) // 2nd
            .wrap(event_limiter.clone()) // 1st
            .service(routes::mount_api())
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .workers(config.num_workers)
    .run()
    .await
}
