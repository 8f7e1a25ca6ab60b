use cashback_tracker::{
    config::{self, settings::load_config_or_default},
    core::{
        analytics::{card_performance, generate_optimization_suggestions, get_dashboard_stats, spending_trend},
        budget::{budget_alerts, check_budgets, load_budgets},
        cycle::{resolve_cycle, today},
        cycle_reset::check_cycle_reset,
        recurring::run_due_recurring,
        report::{format_dashboard_stats, format_summary},
        settings::effective_settings,
        summary::get_cashback_summary,
        transaction::get_all_transactions,
    },
    errors::Result,
    notifications::{NotificationScheduler, NotificationService, TracingNotifier},
};
use dotenvy::dotenv;
use std::{env, sync::Arc};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, non-fatal since env vars can be set externally
    dotenv().ok();

    // 3. Load the application configuration
    let config_path = env::var("CASHBACK_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let app_config = load_config_or_default(&config_path)
        .inspect_err(|e| error!("Failed to load configuration from {}: {}", config_path, e))?;
    info!(
        "Loaded configuration with {} cards",
        app_config.catalog.cards().len()
    );

    // 4. Initialize database
    let db = config::database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    config::database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    let settings = effective_settings(&db, &app_config.settings).await?;
    let today = today();

    // 5. Record recurring transactions that came due while the daemon was down
    run_due_recurring(&db, &app_config.catalog, &settings, today).await?;

    // 6. Log the current cycle for every card
    let transactions = get_all_transactions(&db).await?;
    let cycle = resolve_cycle(
        settings.default_cycle,
        today,
        None,
        None,
        settings.statement_anchor_day,
    );
    info!("Current cycle: {}", cycle.label);

    for card in app_config.catalog.cards() {
        let summary = get_cashback_summary(&app_config.catalog, &transactions, &card.id, &cycle)?;
        info!(
            "\n{}",
            format_summary(
                &summary,
                &app_config.catalog,
                &settings.currency,
                settings.notifications.cap_warning_threshold
            )
        );
        let performance = card_performance(&summary);
        info!(
            "{}: effective rate {:.2}%, cap utilization {:.0}%",
            card.name, performance.rate, performance.utilization
        );
    }
    let stats = get_dashboard_stats(&transactions, &cycle, today);
    info!("{}", format_dashboard_stats(&stats, &settings.currency));

    let trend = spending_trend(&transactions, today);
    info!(
        "This week {:.2} vs last week {:.2} ({:+.1}%)",
        trend.this_week, trend.last_week, trend.change
    );

    let budgets = load_budgets(&db).await?;
    let statuses = check_budgets(
        &app_config.catalog,
        &budgets,
        &transactions,
        today,
        settings.statement_anchor_day,
    );
    for alert in budget_alerts(&statuses) {
        warn!("{}", alert);
    }

    let in_cycle: Vec<_> = transactions
        .into_iter()
        .filter(|t| cycle.contains(t.date))
        .collect();
    for suggestion in generate_optimization_suggestions(&app_config.catalog, &in_cycle, &settings.currency) {
        info!("[{:?}] {}: {}", suggestion.priority, suggestion.title, suggestion.description);
    }

    // 7. Notifications
    let service = Arc::new(NotificationService::new(
        TracingNotifier,
        settings.notifications.clone(),
        settings.currency.clone(),
    ));

    if check_cycle_reset(&db, &settings, today).await?.is_some() {
        service.cycle_reset();
    }

    let mut scheduler = NotificationScheduler::new(Arc::clone(&service), settings.reminders.clone());
    if let Err(e) = scheduler.start() {
        warn!("Reminder scheduler not started: {}", e);
    }

    // 8. Run until interrupted
    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    scheduler.stop();
    db.close().await?;

    Ok(())
}
