use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use redis::Client;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, OnceCell};
use tokio::task::JoinHandle;

use crate::error::AppError;
use crate::error::AppResult;
use crate::models::{Identity, Limit};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Recommendations {
        user_id: Option<String>,
        session_id: Option<String>,
        limit: usize,
    },
}

impl CacheKey {
    pub fn recommendations(identity: &Identity, limit: Limit) -> Self {
        CacheKey::Recommendations {
            user_id: identity.user_id().map(str::to_string),
            session_id: identity.session_id().map(str::to_string),
            limit: limit.get(),
        }
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Recommendations {
                user_id,
                session_id,
                limit,
            } => write!(
                f,
                "reco:u={}:s={}:l={}",
                user_id.as_deref().unwrap_or(""),
                session_id.as_deref().unwrap_or(""),
                limit
            ),
        }
    }
}

/// Creates a Redis client for caching
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Message for asynchronous cache writes
struct CacheWriteMessage {
    key: String,
    value: String,
    ttl: u64,
}

/// Shared Redis connection, established on first use.
///
/// `ConnectionManager` reconnects on its own after a dropped link; the cell
/// only retries the initial connect, so a Redis that is down at start-up does
/// not stop the service from booting.
#[derive(Clone)]
struct Connection {
    client: Client,
    manager: Arc<OnceCell<ConnectionManager>>,
}

impl Connection {
    async fn get(&self) -> AppResult<ConnectionManager> {
        let manager = self
            .manager
            .get_or_try_init(|| ConnectionManager::new(self.client.clone()))
            .await?;
        Ok(manager.clone())
    }
}

/// Short-lived Redis cache for recommendation lists
#[derive(Clone)]
pub struct Cache {
    connection: Connection,
    write_tx: mpsc::UnboundedSender<CacheWriteMessage>,
    ttl: u64,
}

/// Handle for gracefully shutting down the cache writer
pub struct CacheWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl CacheWriterHandle {
    /// Signals the writer task to flush pending writes and waits for it to stop
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Cache writer shutdown signal sent");

        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Cache writer task failed");
        }
    }
}

impl Cache {
    /// Creates a new Cache whose entries expire after `ttl` seconds.
    ///
    /// Writes are handed to a background task so a cache store never delays
    /// a response. Each background write is abandoned after `write_timeout`.
    pub fn new(
        redis_client: Client,
        ttl: u64,
        write_timeout: Duration,
    ) -> (Self, CacheWriterHandle) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let connection = Connection {
            client: redis_client,
            manager: Arc::new(OnceCell::new()),
        };

        let writer_connection = connection.clone();
        let task = tokio::spawn(async move {
            Self::cache_writer_task(writer_connection, write_timeout, write_rx, shutdown_rx).await;
        });

        let cache = Self {
            connection,
            write_tx,
            ttl,
        };

        (cache, CacheWriterHandle { shutdown_tx, task })
    }

    async fn cache_writer_task(
        connection: Connection,
        write_timeout: Duration,
        mut write_rx: mpsc::UnboundedReceiver<CacheWriteMessage>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!("Cache writer task started");

        loop {
            tokio::select! {
                Some(msg) = write_rx.recv() => {
                    if let Err(e) = Self::write_to_redis(&connection, write_timeout, msg).await {
                        tracing::warn!(error = %e, "Failed to write to Redis cache");
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("Cache writer shutting down, flushing remaining writes");

                    // Every Cache clone holds a sender, so drain only what is queued now.
                    write_rx.close();
                    while let Some(msg) = write_rx.recv().await {
                        let result = Self::write_to_redis(&connection, write_timeout, msg).await;
                        if let Err(e) = result {
                            tracing::warn!(error = %e, "Failed to flush cache write during shutdown");
                        }
                    }

                    tracing::info!("Cache writer task stopped");
                    break;
                }
            }
        }
    }

    async fn write_to_redis(
        connection: &Connection,
        write_timeout: Duration,
        msg: CacheWriteMessage,
    ) -> AppResult<()> {
        let write = async {
            let mut conn = connection.get().await?;
            let _: () = conn.set_ex(msg.key, msg.value, msg.ttl).await?;
            Ok::<(), AppError>(())
        };

        tokio::time::timeout(write_timeout, write)
            .await
            .map_err(|_| {
                AppError::Internal(format!("Cache write timed out after {:?}", write_timeout))
            })?
    }

    /// Retrieves a cached value, `None` on a miss
    pub async fn get_from_cache<T: serde::de::DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> AppResult<Option<T>> {
        let mut conn = self.connection.get().await?;
        let cached: Option<String> = conn.get(key.to_string()).await?;

        match cached {
            Some(json) => {
                let data = serde_json::from_str(&json).map_err(|e| {
                    AppError::Internal(format!("Cache deserialization error: {}", e))
                })?;
                Ok(Some(data))
            }
            None => Ok(None),
        }
    }

    /// Queues a value for storage without waiting for Redis
    pub fn set_in_background<T: serde::Serialize>(&self, key: &CacheKey, value: &T) {
        let json = match serde_json::to_string(value) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Cache serialization error");
                return;
            }
        };

        let msg = CacheWriteMessage {
            key: key.to_string(),
            value: json,
            ttl: self.ttl,
        };

        if let Err(e) = self.write_tx.send(msg) {
            tracing::error!(error = %e, "Failed to send cache write message");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    /// Accepts TCP connections and never answers, like a wedged Redis
    async fn unresponsive_redis() -> Client {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        Client::open(format!("redis://{}", addr)).unwrap()
    }

    #[test]
    fn test_cache_key_display_user_and_session() {
        let identity = Identity::new(Some("u-1".to_string()), Some("s-9".to_string()));
        let key = CacheKey::recommendations(&identity, Limit::new(4).unwrap());
        assert_eq!(key.to_string(), "reco:u=u-1:s=s-9:l=4");
    }

    #[test]
    fn test_cache_key_display_session_only() {
        let identity = Identity::new(None, Some("s-9".to_string()));
        let key = CacheKey::recommendations(&identity, Limit::default());
        assert_eq!(key.to_string(), "reco:u=:s=s-9:l=6");
    }

    #[test]
    fn test_cache_key_distinguishes_user_from_session() {
        let as_user = CacheKey::recommendations(
            &Identity::new(Some("abc".to_string()), None),
            Limit::default(),
        );
        let as_session = CacheKey::recommendations(
            &Identity::new(None, Some("abc".to_string())),
            Limit::default(),
        );
        assert_ne!(as_user.to_string(), as_session.to_string());
    }

    #[test]
    fn test_cache_key_blank_identity_matches_anonymous() {
        let blank = CacheKey::recommendations(
            &Identity::new(Some(String::new()), Some(" ".to_string())),
            Limit::default(),
        );
        let anonymous = CacheKey::recommendations(&Identity::anonymous(), Limit::default());
        assert_eq!(blank, anonymous);
    }

    #[tokio::test]
    #[ignore = "requires a running Redis"]
    async fn test_set_in_background_writes_to_cache() {
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());

        let client = create_redis_client(&redis_url).unwrap();
        let (cache, handle) = Cache::new(client.clone(), 30, Duration::from_secs(1));

        let key = CacheKey::recommendations(
            &Identity::new(None, Some("cache-test-session".to_string())),
            Limit::default(),
        );
        let value = vec!["item1".to_string(), "item2".to_string()];

        cache.set_in_background(&key, &value);
        handle.shutdown().await;

        let retrieved: Option<Vec<String>> = cache.get_from_cache(&key).await.unwrap();
        assert_eq!(retrieved, Some(value));

        let mut conn = client.get_multiplexed_async_connection().await.unwrap();
        let _: () = conn.del(key.to_string()).await.unwrap();
    }

    #[tokio::test]
    async fn test_read_from_unresponsive_redis_can_be_abandoned() {
        let (cache, _handle) = Cache::new(unresponsive_redis().await, 5, Duration::from_millis(50));
        let key = CacheKey::recommendations(&Identity::anonymous(), Limit::default());

        let read = tokio::time::timeout(
            Duration::from_millis(100),
            cache.get_from_cache::<Vec<String>>(&key),
        )
        .await;

        assert!(read.is_err());
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_pending_writes() {
        let write_timeout = Duration::from_millis(200);
        let (cache, handle) = Cache::new(unresponsive_redis().await, 5, write_timeout);
        let key = CacheKey::recommendations(&Identity::anonymous(), Limit::default());

        cache.set_in_background(&key, &vec!["queued".to_string()]);

        let started = Instant::now();
        tokio::time::timeout(Duration::from_secs(3), handle.shutdown())
            .await
            .expect("writer flush is bounded by the write timeout");

        assert!(started.elapsed() >= Duration::from_millis(100));
    }
}
