use std::sync::Arc;
use std::time::Duration;

use crate::auth::{AuthService, JwtService};
use crate::core::{BackgroundTasks, Config};
use crate::db::DbService;
use crate::inventory::InventoryService;
use crate::orders::OrderService;
use crate::utils::AppError;

/// Shared application state: configuration, the database service and the
/// JWT service. Handlers construct the domain services from it per request;
/// the services are thin wrappers around pool clones, so that is cheap.
#[derive(Clone, Debug)]
pub struct ServerState {
    pub config: Config,
    pub db: DbService,
    pub jwt_service: Arc<JwtService>,
}

impl ServerState {
    /// Open the database, run migrations and assemble the state
    pub async fn initialize(config: &Config) -> Result<Self, AppError> {
        let db = DbService::open(&config.database_path).await?;
        let jwt_service = Arc::new(JwtService::with_config(config.jwt.clone()));

        Ok(Self {
            config: config.clone(),
            db,
            jwt_service,
        })
    }

    /// In-memory state for tests
    #[cfg(test)]
    pub async fn for_tests() -> Result<Self, AppError> {
        let db = DbService::open_in_memory().await?;
        let config = Config::from_env();
        let jwt_service = Arc::new(JwtService::with_config(config.jwt.clone()));
        Ok(Self {
            config,
            db,
            jwt_service,
        })
    }

    pub fn order_service(&self) -> OrderService {
        OrderService::new(self.db.clone())
    }

    pub fn inventory_service(&self) -> InventoryService {
        InventoryService::new(self.db.clone())
    }

    pub fn auth_service(&self) -> AuthService {
        AuthService::new(self.db.clone(), self.jwt_service.clone())
    }

    /// Register the periodic jobs: the unpaid-order expiry sweep and the
    /// reset-token purge
    pub fn start_background_tasks(&self) -> BackgroundTasks {
        let mut tasks = BackgroundTasks::new();

        let orders = self.order_service();
        tasks.spawn_periodic(
            "expiry_sweep",
            Duration::from_secs(self.config.expiry_sweep_interval_secs),
            move || {
                let orders = orders.clone();
                async move {
                    if let Err(e) = orders.cancel_expired_orders().await {
                        tracing::error!(error = %e, "Expiry sweep failed");
                    }
                }
            },
        );

        let accounts = self.auth_service();
        tasks.spawn_periodic(
            "token_cleanup",
            Duration::from_secs(self.config.token_cleanup_interval_secs),
            move || {
                let accounts = accounts.clone();
                async move {
                    if let Err(e) = accounts.cleanup_reset_tokens().await {
                        tracing::error!(error = %e, "Reset-token cleanup failed");
                    }
                }
            },
        );

        tracing::info!(count = tasks.len(), "Background tasks started");
        tasks
    }
}
