//! Thread manager for multi-thread orchestration.
//!
//! Routes inputs to per-thread turn loops and funnels their outputs into a
//! single receiver. Threads are created lazily on first message.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info};

use super::store::ThreadStore;
use super::turn_loop::TurnLoop;
use super::types::{ThreadId, ThreadInput, ThreadOutput};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::provider::{GenAiClient, ModelClient};

const SYSTEM_PROMPT: &str = "\
You are a helpful assistant. When tools are available, use them to answer \
the user's question instead of guessing; when none are relevant, answer \
directly from your own knowledge. Report tool failures honestly, including \
when the user declines a tool, and never fabricate a tool result.";

/// Receiver for all thread outputs (thread_id, output)
pub type OutputReceiver = mpsc::Receiver<(ThreadId, ThreadOutput)>;

pub struct ThreadManager {
    config: Arc<Config>,
    threads: Arc<RwLock<HashMap<ThreadId, mpsc::Sender<ThreadInput>>>>,
    output_tx: mpsc::Sender<(ThreadId, ThreadOutput)>,
    chat_client: Arc<dyn ModelClient>,
    classifier_client: Arc<dyn ModelClient>,
}

impl ThreadManager {
    /// Create a manager with genai-backed clients built from the config.
    ///
    /// The classifier gets its own client pinned to temperature 0.0 so tool
    /// selection stays as deterministic as the provider allows.
    pub fn new(config: Config) -> (Self, OutputReceiver) {
        let chat_client =
            Arc::new(GenAiClient::new(&config.provider).with_system_prompt(SYSTEM_PROMPT));
        let classifier_client = Arc::new(GenAiClient::new(&config.provider).with_temperature(0.0));
        Self::with_clients(config, chat_client, classifier_client)
    }

    /// Create a manager with explicit model clients (tests script these)
    pub fn with_clients(
        config: Config,
        chat_client: Arc<dyn ModelClient>,
        classifier_client: Arc<dyn ModelClient>,
    ) -> (Self, OutputReceiver) {
        let (output_tx, output_rx) = mpsc::channel(256);

        let manager = Self {
            config: Arc::new(config),
            threads: Arc::new(RwLock::new(HashMap::new())),
            output_tx,
            chat_client,
            classifier_client,
        };

        (manager, output_rx)
    }

    /// Push an input to a thread, creating the thread if needed
    pub async fn push(&self, thread_id: &str, input: ThreadInput) -> Result<()> {
        let tx = {
            let threads = self.threads.read().await;
            threads.get(thread_id).cloned()
        };

        let tx = match tx {
            Some(tx) => tx,
            None => self.create_thread(thread_id).await?,
        };

        tx.send(input)
            .await
            .map_err(|e| Error::Turn(format!("Failed to send input: {}", e)))
    }

    async fn create_thread(&self, thread_id: &str) -> Result<mpsc::Sender<ThreadInput>> {
        let thread_id = thread_id.to_string();
        info!(thread = %thread_id, "Creating thread");

        let (input_tx, input_rx) = mpsc::channel(256);

        let turn_loop = TurnLoop::new(
            thread_id.clone(),
            input_rx,
            self.output_tx.clone(),
            &self.config,
            self.chat_client.clone(),
            self.classifier_client.clone(),
        )?;

        let tid = thread_id.clone();
        tokio::spawn(async move {
            turn_loop.run().await;
            debug!(thread = %tid, "Turn loop task finished");
        });

        {
            let mut threads = self.threads.write().await;
            threads.insert(thread_id.clone(), input_tx.clone());
        }

        let _ = self
            .output_tx
            .send((thread_id, ThreadOutput::ready()))
            .await;

        Ok(input_tx)
    }

    /// Thread ids persisted on disk, most recently updated first
    pub fn persisted_threads(&self) -> Result<Vec<ThreadId>> {
        ThreadStore::new(self.config.threads_dir()).list()
    }

    /// Currently running thread ids
    pub async fn active_threads(&self) -> Vec<ThreadId> {
        let threads = self.threads.read().await;
        threads.keys().cloned().collect()
    }

    pub async fn has_thread(&self, thread_id: &str) -> bool {
        let threads = self.threads.read().await;
        threads.contains_key(thread_id)
    }

    /// Stop a thread by dropping its input sender; the turn loop exits when
    /// its channel drains
    pub async fn stop_thread(&self, thread_id: &str) {
        let mut threads = self.threads.write().await;
        if threads.remove(thread_id).is_some() {
            info!(thread = %thread_id, "Stopped thread");
        }
    }

    pub async fn stop_all(&self) {
        let mut threads = self.threads.write().await;
        threads.clear();
    }

    pub async fn thread_count(&self) -> usize {
        let threads = self.threads.read().await;
        threads.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.data_dir = Some(dir.keep());
        config
    }

    #[tokio::test]
    async fn manager_starts_empty() {
        let (manager, _output_rx) = ThreadManager::new(test_config());
        assert_eq!(manager.thread_count().await, 0);
        assert!(manager.active_threads().await.is_empty());
    }

    #[tokio::test]
    async fn stop_nonexistent_thread_is_noop() {
        let (manager, _output_rx) = ThreadManager::new(test_config());
        manager.stop_thread("nope").await;
        assert!(!manager.has_thread("nope").await);
    }
}
