//! WebOrderService - 网络订单同步入口
//!
//! ```text
//! start_listening
//!   ├─ load credentials (structural check)
//!   ├─ connect
//!   ├─ connection test (one snapshot)
//!   ├─ listen ──► ChangeListener task ──mpsc──► IngestionPipeline task
//!   └─ history cache + deletion coordinator for this connection
//! ```
//!
//! Startup failures are returned and logged once; there is no retry. The
//! floor service keeps working without a connection. If the remote ends the
//! change stream, the next `start_listening` replaces the dead connection.
//! A `stop` that lands while a start is in flight cancels that start.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use shared::models::Order;
use tokio::sync::{broadcast, mpsc};

use super::cache::{OrderHistory, OrderHistoryCache};
use super::deletion::DeletionCoordinator;
use super::ingestion::IngestionPipeline;
use super::listener::ChangeListener;
use super::notifier::OrderNotifier;
use crate::core::{BackgroundTasks, Config, OwnerDispatcher, TaskKind};
use crate::floor::FloorService;
use crate::remote::{ConnectionSettings, DocumentStore, StoreConnector, load_credentials};
use crate::utils::{AppError, AppResult};

/// Everything tied to one live connection
struct Connection {
    project_id: String,
    store: Arc<dyn DocumentStore>,
    cache: Arc<OrderHistoryCache>,
    deletion: DeletionCoordinator,
}

#[derive(Default)]
struct ServiceState {
    connection: Option<Arc<Connection>>,
    tasks: Option<BackgroundTasks>,
    starting: bool,
    stop_requested: bool,
}

impl ServiceState {
    fn tasks_alive(&self) -> bool {
        self.tasks
            .as_ref()
            .is_some_and(|tasks| tasks.finished_count() == 0)
    }
}

pub struct WebOrderService {
    config: Config,
    floor: OwnerDispatcher<FloorService>,
    connector: Arc<dyn StoreConnector>,
    notifier: Arc<dyn OrderNotifier>,
    events: broadcast::Sender<Order>,
    state: Mutex<ServiceState>,
}

impl std::fmt::Debug for WebOrderService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebOrderService")
            .field("collection", &self.config.collection)
            .field("listening", &self.is_listening())
            .finish()
    }
}

impl WebOrderService {
    pub fn new(
        config: Config,
        floor: OwnerDispatcher<FloorService>,
        connector: Arc<dyn StoreConnector>,
        notifier: Arc<dyn OrderNotifier>,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_channel_capacity.max(1));
        Self {
            config,
            floor,
            connector,
            notifier,
            events,
            state: Mutex::new(ServiceState::default()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Handle to the floor service this instance commits into
    pub fn floor(&self) -> &OwnerDispatcher<FloorService> {
        &self.floor
    }

    /// Receive every committed web order
    pub fn subscribe_new_orders(&self) -> broadcast::Receiver<Order> {
        self.events.subscribe()
    }

    /// Connected and both background tasks still running
    pub fn is_listening(&self) -> bool {
        let state = self.state.lock();
        state.connection.is_some() && state.tasks_alive()
    }

    /// Project id of the live connection
    pub fn connected_project(&self) -> Option<String> {
        self.state
            .lock()
            .connection
            .as_ref()
            .map(|c| c.project_id.clone())
    }

    /// [`start_listening`](Self::start_listening) with the configured project
    /// and credentials
    pub async fn start_from_config(&self) -> AppResult<()> {
        self.config.validate()?;
        let project_id = self.config.project_id.clone();
        let credentials_path = self.config.credentials_path.clone();
        self.start_listening(&project_id, &credentials_path).await
    }

    /// Connect and start forwarding new remote orders into the floor
    ///
    /// Documents already present are not ingested. A connection whose
    /// stream has ended is torn down first.
    pub async fn start_listening(
        &self,
        project_id: &str,
        credentials_path: impl AsRef<Path>,
    ) -> AppResult<()> {
        let (stale_connection, stale_tasks) = {
            let mut state = self.state.lock();
            if state.starting || (state.connection.is_some() && state.tasks_alive()) {
                return Err(AppError::AlreadyListening);
            }
            state.starting = true;
            state.stop_requested = false;
            (state.connection.take(), state.tasks.take())
        };
        if stale_connection.is_some() {
            tracing::warn!("Replacing web order connection whose change stream ended");
        }
        Self::teardown(stale_connection, stale_tasks).await;

        let result = self.connect(project_id, credentials_path.as_ref()).await;

        let (connection, tasks) = {
            let mut state = self.state.lock();
            state.starting = false;
            let cancelled = std::mem::take(&mut state.stop_requested);
            match result {
                Ok((connection, tasks)) if !cancelled => {
                    tracing::info!(
                        project_id = %connection.project_id,
                        collection = %self.config.collection,
                        "Listening for web orders"
                    );
                    state.connection = Some(connection);
                    state.tasks = Some(tasks);
                    return Ok(());
                }
                Ok(started) => started,
                Err(e) => {
                    tracing::error!(category = ?e.category(), error = %e, "Web order listener not started");
                    return Err(e);
                }
            }
        };
        tasks.shutdown().await;
        tracing::info!(project_id = %connection.project_id, "Web order listener start cancelled by stop");
        Err(AppError::StartCancelled)
    }

    async fn connect(
        &self,
        project_id: &str,
        credentials_path: &Path,
    ) -> AppResult<(Arc<Connection>, BackgroundTasks)> {
        let project_id = project_id.trim();
        if project_id.is_empty() {
            return Err(AppError::config("project id is empty"));
        }
        let credentials = load_credentials(credentials_path).await?;
        if let Some(declared) = credentials.project_id()
            && declared != project_id
        {
            tracing::warn!(declared, project_id, "Credentials belong to a different project");
        }

        let settings = ConnectionSettings {
            project_id: project_id.to_string(),
            database_id: self.config.database_id.clone(),
            credentials,
        };
        let store = self.connector.connect(&settings).await?;

        let collection = self.config.collection.as_str();
        let existing = store.snapshot(collection).await?;
        tracing::info!(existing = existing.len(), "Connection test passed");

        let subscription = store.listen(collection).await?;

        let cache = Arc::new(OrderHistoryCache::new(Arc::clone(&store), collection));
        let deletion = DeletionCoordinator::new(Arc::clone(&store), collection, Arc::clone(&cache));
        let pipeline = IngestionPipeline::new(
            self.floor.clone(),
            Arc::clone(&cache),
            Arc::clone(&self.notifier),
            self.events.clone(),
            self.config.takeaway_capacity,
        );

        let (doc_tx, doc_rx) = mpsc::channel(self.config.event_channel_capacity.max(1));
        let mut tasks = BackgroundTasks::new();
        let token = tasks.shutdown_token();
        tasks.spawn(
            "change_listener",
            TaskKind::Listener,
            ChangeListener::new().run(subscription, doc_tx, token.clone()),
        );
        tasks.spawn("order_ingestion", TaskKind::Worker, pipeline.run(doc_rx, token));

        let connection = Arc::new(Connection {
            project_id: settings.project_id,
            store,
            cache,
            deletion,
        });
        Ok((connection, tasks))
    }

    fn connection(&self) -> AppResult<Arc<Connection>> {
        self.state
            .lock()
            .connection
            .clone()
            .ok_or(AppError::NotConnected)
    }

    /// Every remote order, most recent first
    pub async fn get_all_orders(&self) -> AppResult<OrderHistory> {
        let connection = self.connection()?;
        connection.cache.get_all().await
    }

    /// Force the next [`get_all_orders`](Self::get_all_orders) to refetch
    pub fn invalidate_cache(&self) -> AppResult<()> {
        self.connection()?.cache.invalidate();
        Ok(())
    }

    /// Delete remote order documents by id
    pub async fn delete_orders<I, S>(&self, ids: I) -> AppResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let connection = self.connection()?;
        connection.deletion.delete(ids).await
    }

    /// Number of documents currently in the remote collection
    pub async fn remote_count(&self) -> AppResult<usize> {
        let connection = self.connection()?;
        Ok(connection
            .store
            .snapshot(&self.config.collection)
            .await?
            .len())
    }

    /// Stop listening and drop the connection; returns whether a listener
    /// was running or starting
    ///
    /// A start still in flight is cancelled once it finishes connecting, and
    /// returns [`AppError::StartCancelled`]. Orders already committed stay in
    /// the floor service.
    pub async fn stop(&self) -> bool {
        let (connection, tasks) = {
            let mut state = self.state.lock();
            if state.starting {
                state.stop_requested = true;
                tracing::info!("Stop requested while the web order listener is starting");
                return true;
            }
            (state.connection.take(), state.tasks.take())
        };
        Self::teardown(connection, tasks).await
    }

    async fn teardown(connection: Option<Arc<Connection>>, tasks: Option<BackgroundTasks>) -> bool {
        if let Some(tasks) = tasks {
            tasks.shutdown().await;
        }
        match connection {
            Some(connection) => {
                tracing::info!(project_id = %connection.project_id, "Web order listener stopped");
                true
            }
            None => false,
        }
    }
}
