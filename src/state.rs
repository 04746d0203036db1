use std::sync::Arc;
use tokio::sync::broadcast;

use crate::clients::email::EmailClient;
use crate::config::Config;
use crate::db::Store;
use crate::domain::events::DomainEvent;
use crate::security::AuthLimiters;
use crate::services::audit::AuditService;
use crate::services::auth_service::AuthService;
use crate::services::auth_service_impl::SeaOrmAuthService;
use crate::services::followups::FollowupService;

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub event_bus: broadcast::Sender<DomainEvent>,

    pub email: Arc<EmailClient>,

    /// One independent sliding-window limiter per sensitive auth route.
    pub limiters: Arc<AuthLimiters>,

    pub auth_service: Arc<dyn AuthService>,

    pub audit: Arc<AuditService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let (event_bus, _) = broadcast::channel(config.general.event_bus_buffer_size);
        Self::with_event_bus(config, event_bus).await
    }

    pub async fn with_event_bus(
        config: Config,
        event_bus: broadcast::Sender<DomainEvent>,
    ) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        let config = Arc::new(config);
        let email = Arc::new(EmailClient::new(config.email.clone()));
        let limiters = Arc::new(AuthLimiters::new(&config.rate_limits));

        let auth_service = Arc::new(SeaOrmAuthService::new(
            store.clone(),
            config.clone(),
            event_bus.clone(),
        )) as Arc<dyn AuthService>;

        let audit = Arc::new(AuditService::new(store.clone()));

        let followups = Arc::new(FollowupService::new(
            store.clone(),
            email.clone(),
            event_bus.clone(),
        ));
        followups.start_listener();

        Ok(Self {
            config,
            store,
            event_bus,
            email,
            limiters,
            auth_service,
            audit,
        })
    }
}
