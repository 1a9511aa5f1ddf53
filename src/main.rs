use std::sync::Arc;

use barbershop_api::{config::ApiConfig, init_tracing, start_server, ApiState};
use barbershop_calendar::{config::CalendarConfig, CalendarClient, GoogleCalendar};
use barbershop_db::{create_pool, schema::initialize_database};
use color_eyre::eyre::Result;
use dotenv::dotenv;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Load environment variables
    dotenv().ok();

    // Load configuration
    let config = ApiConfig::from_env()?;
    init_tracing(config.log_level)?;
    info!("Starting barbershop booking service");

    // Create database connection pool
    let db_pool = create_pool(&config.database_url).await?;

    // Initialize database schema
    initialize_database(&db_pool).await?;

    // Calendar sync is optional
    let calendar: Option<Arc<dyn CalendarClient>> = match CalendarConfig::from_env()? {
        Some(calendar_config) => Some(Arc::new(GoogleCalendar::from_config(calendar_config)?)),
        None => {
            warn!("CALENDAR_ID is not set, appointments will not be synced to a calendar");
            None
        }
    };

    // Start API server
    let state = Arc::new(ApiState::new(config, db_pool, calendar)?);
    start_server(state).await?;

    Ok(())
}
