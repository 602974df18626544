// --- File: crates/services/meetsync_backend/src/app_state.rs ---
//! Wires configuration into the store, the collaborators and the engines.

use meetsync_common::{
    CalendarProvider, MeetSyncError, MemoryStore, Notifier, RetryPolicy, Store,
};
use meetsync_config::AppConfig;
use meetsync_scheduler::gcal::{create_calendar_hub, GoogleCalendarProvider};
use meetsync_scheduler::notifier::{LogNotifier, ResendNotifier, UnavailableCalendarProvider};
use meetsync_scheduler::{
    BookingEngine, CalendarSynchronizer, MeetingState, ProposalIssuer, SlotGenerator,
    TokenSigner, WorkingHoursRules,
};
use std::sync::Arc;
use tracing::{info, warn};

const DEFAULT_CALENDAR_ID: &str = "primary";

/// Application state shared by every route.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub meetings: Arc<MeetingState>,
    #[cfg(feature = "database")]
    pub db: Option<meetsync_db::DbClient>,
}

impl AppState {
    pub async fn build(config: Arc<AppConfig>) -> Result<Self, MeetSyncError> {
        #[cfg(feature = "database")]
        let (store, db) = build_store(&config).await?;
        #[cfg(not(feature = "database"))]
        let store = build_store(&config)?;

        let rules = WorkingHoursRules::from_config(&config.working_hours).map_err(|e| {
            MeetSyncError::ConfigError(format!("invalid working_hours configuration: {e}"))
        })?;
        let retry = RetryPolicy::from_config(&config.retry);
        let calendar_id = config
            .gcal
            .as_ref()
            .and_then(|g| g.calendar_id.clone())
            .unwrap_or_else(|| DEFAULT_CALENDAR_ID.to_string());

        let provider = build_provider(&config).await?;
        let notifier: Arc<dyn Notifier> = match (&config.notifier, config.use_notifier) {
            (Some(notifier_config), true) => {
                info!(from = %notifier_config.from_address, "E-mail notifications enabled");
                Arc::new(ResendNotifier::new(notifier_config, rules.time_zone))
            }
            _ => {
                info!("E-mail notifications are logged only");
                Arc::new(LogNotifier)
            }
        };
        let signer = Arc::new(
            TokenSigner::new(&config.proposals.token_secret).map_err(|e| {
                MeetSyncError::ConfigError(format!("invalid proposals.token_secret: {e}"))
            })?,
        );

        let proposals = Arc::new(ProposalIssuer::new(
            store.clone(),
            notifier.clone(),
            signer,
            config.proposals.booking_base_url.clone(),
            rules.time_zone,
        ));
        let bookings = Arc::new(BookingEngine::new(
            store.clone(),
            provider.clone(),
            notifier,
            proposals.clone(),
            retry.clone(),
            &calendar_id,
        ));
        let generator = Arc::new(SlotGenerator::new(
            store.clone(),
            provider.clone(),
            retry.clone(),
            rules,
            calendar_id,
            config.working_hours.default_capacity,
            config.working_hours.advance_days,
        ));
        let synchronizer = Arc::new(CalendarSynchronizer::new(
            store.clone(),
            provider,
            generator.clone(),
            retry,
            config.sync.stale_booking_minutes,
        ));

        Ok(Self {
            meetings: Arc::new(MeetingState {
                config: config.clone(),
                store,
                proposals,
                bookings,
                generator,
                synchronizer,
            }),
            config,
            #[cfg(feature = "database")]
            db,
        })
    }
}

#[cfg(feature = "database")]
async fn build_store(
    config: &AppConfig,
) -> Result<(Arc<dyn Store>, Option<meetsync_db::DbClient>), MeetSyncError> {
    use meetsync_common::log_result;
    use meetsync_db::{DbClient, SqlStore};

    if config.database.is_none() {
        warn!("No database configured, bookings are kept in memory only");
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        return Ok((store, None));
    }
    let client = log_result(
        DbClient::new(config).await,
        "Database connection established",
        "Database connection failed",
    )
    .map_err(|e| MeetSyncError::DatabaseError(format!("cannot connect to database: {e}")))?;
    let sql_store = SqlStore::new(client.clone());
    sql_store
        .init_schema()
        .await
        .map_err(|e| MeetSyncError::DatabaseError(format!("cannot initialise schema: {e}")))?;
    let store: Arc<dyn Store> = Arc::new(sql_store);
    Ok((store, Some(client)))
}

#[cfg(not(feature = "database"))]
fn build_store(_config: &AppConfig) -> Result<Arc<dyn Store>, MeetSyncError> {
    warn!("Built without database support, bookings are kept in memory only");
    Ok(Arc::new(MemoryStore::new()))
}

async fn build_provider(config: &AppConfig) -> Result<Arc<dyn CalendarProvider>, MeetSyncError> {
    match (&config.gcal, config.use_gcal) {
        (Some(gcal), true) => {
            let hub = create_calendar_hub(gcal).await.map_err(|e| {
                MeetSyncError::ExternalServiceError {
                    service_name: "Google Calendar".to_string(),
                    message: e.to_string(),
                }
            })?;
            info!("Google Calendar provider enabled");
            Ok(Arc::new(GoogleCalendarProvider::new(Arc::new(hub))))
        }
        _ => {
            warn!("No calendar configured: generation runs degraded and bookings will fail");
            Ok(Arc::new(UnavailableCalendarProvider))
        }
    }
}
