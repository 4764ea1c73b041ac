use std::{io, sync::Arc};

use anyhow::Context;

use evcal::{
    calendar::Calendar,
    cli::Session,
    config::AppConfig,
    history::{ActivityLog, HistorySink},
    logging::init_logging,
    runtime::{
        dispatcher::{ConsoleSink, NotificationSink, spawn_dispatcher},
        scheduler::{Scheduler, SystemClock},
    },
};

fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env();
    let _logger = init_logging(&config.log_level, &config.log_dir)?;

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    let entered = runtime.enter();

    let (calendar_store, history_store) = config.open_stores().context("failed to open storage")?;
    let history = ActivityLog::open(history_store)
        .context("failed to load history")?
        .shared();

    let scheduler = Scheduler::new(runtime.handle().clone(), Arc::new(SystemClock));
    let (mut calendar, notifications) = Calendar::with_config(calendar_store, scheduler, config.calendar());

    let sinks: Vec<Box<dyn NotificationSink>> = vec![
        Box::new(ConsoleSink::stdout()),
        Box::new(HistorySink::new(Arc::clone(&history))),
    ];
    let dispatcher = spawn_dispatcher(notifications, sinks);

    if let Err(err) = calendar.load() {
        log::error!("loading calendar from {} failed: {err}", calendar.store_name());
        return Err(err).context("failed to load calendar");
    }

    println!("Type a command, or 'help' for the list of commands");
    let mut session = Session::new(calendar, history);
    let outcome = session.run(io::stdin().lock(), &mut io::stdout());
    if let Err(err) = &outcome {
        log::error!("console input failed: {err}");
    }

    let calendar = session.into_calendar();
    let store_name = calendar.store_name();
    if let Err(err) = calendar.close() {
        log::error!("saving calendar to {store_name} failed: {err}");
        eprintln!("Error: {err}");
    }

    drop(entered);
    let stats = runtime.block_on(dispatcher).context("notification dispatcher failed")?;
    println!("Notification channel closed");
    log::info!(
        target: "system",
        "app is closed after {} notifications ({} sink failures)",
        stats.received,
        stats.sink_failures
    );
    outcome.context("console input failed")
}
