use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use fixcal::config::Config;
use fixcal::model::*;
use fixcal::source::{CalendarSource, HttpSource, InMemorySource};
use fixcal::{Calendar, CalendarKey};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    fixcal::observability::init(config.metrics_port)?;

    let key = CalendarKey {
        fixer: config.fixer.clone(),
        requester: config.requester.clone(),
        selected_day: config
            .date
            .unwrap_or_else(|| chrono::Local::now().date_naive()),
    };

    info!("fixcal: fixer {} on {}", key.fixer, key.selected_day);
    match &config.api_url {
        Some(url) => {
            info!("  backend: {url}");
            let source = HttpSource::new(url, config.http_timeout)?;
            run(Arc::new(source), key, config.poll_interval).await
        }
        None => {
            warn!("FIXCAL_API_URL not set, using an empty in-memory source");
            run(Arc::new(InMemorySource::new()), key, config.poll_interval).await
        }
    }
}

async fn run<S: CalendarSource>(
    source: Arc<S>,
    key: CalendarKey,
    poll: Option<Duration>,
) -> Result<(), Box<dyn std::error::Error>> {
    let calendar = Calendar::new(source);
    calendar.mount(key);
    calendar.wait_settled().await;
    print_day(&calendar);

    let Some(period) = poll else { return Ok(()) };
    calendar.start_polling(period);

    #[cfg(unix)]
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    let shutdown = async {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        {
            tokio::select! {
                _ = ctrl_c => {}
                _ = sigterm.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            ctrl_c.await.ok();
        }
    };
    tokio::pin!(shutdown);

    let mut day_rx = calendar.subscribe_day();
    let mut ledger_rx = calendar.subscribe_ledger();
    loop {
        tokio::select! {
            changed = day_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            changed = ledger_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = &mut shutdown => {
                info!("shutdown signal received");
                break;
            }
        }
        if !calendar.loading() {
            print_day(&calendar);
        }
    }

    calendar.stop_polling();
    info!("fixcal stopped");
    Ok(())
}

fn print_day<S: CalendarSource>(calendar: &Calendar<S>) {
    let Some(key) = calendar.key() else { return };
    let day = key.selected_day;
    let requester = key.requester.as_deref().unwrap_or("");
    let detail = calendar.day_view();

    for error in calendar.errors() {
        warn!("{error}");
    }
    println!("{} ({})", day, day.format("%A"));
    for hour in 0..fixcal::limits::HOURS_PER_DAY {
        let state = match calendar.slot_state(day, hour, requester) {
            SlotState::Disabled => "disabled".to_string(),
            SlotState::Free => "free".to_string(),
            SlotState::BookedByMe => "booked (mine)".to_string(),
            SlotState::BookedByOther => "booked".to_string(),
            SlotState::Cancelled(by) => format!("cancelled ({by:?})"),
        };
        let locked = key.requester.is_some() && detail.is_disabled(day, hour);
        println!(
            "  {hour:02}:00  {state:<24}{}",
            if locked { "locked" } else { "" }
        );
    }
}
