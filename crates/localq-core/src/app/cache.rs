//! RegistryCache - resolved root ごとに Registry を一つだけ持つ
//!
//! 同じ root を複数回 open しても同じ `Arc<Registry>` が返るので、
//! プロセス内の producer と consumer が登録状態を共有できます。
//! プロセス全体のグローバル変数ではなく、呼び出し側が所有する値です。

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use super::registry::Registry;
use crate::config::QueueConfig;
use crate::error::Result;
use crate::path::QueuePath;
use crate::ports::FileSystem;

#[derive(Debug, Default)]
pub struct RegistryCache {
    registries: Mutex<HashMap<PathBuf, Arc<Registry>>>,
}

impl RegistryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry for the resolved form of `config.root`, created on first use.
    ///
    /// On a hit `config` and `fs` are ignored; the registry keeps whatever it
    /// was first opened with.
    pub async fn open(&self, config: QueueConfig, fs: Arc<dyn FileSystem>) -> Result<Arc<Registry>> {
        let key = QueuePath::new(&config.root, Arc::clone(&fs), config.dir_mode)
            .resolve()?
            .to_path_buf();

        // held across open() so two callers cannot both create the same root
        let mut registries = self.registries.lock().await;
        if let Some(registry) = registries.get(&key) {
            debug!(root = %key.display(), "registry cache hit");
            return Ok(Arc::clone(registry));
        }
        let registry = Arc::new(Registry::open(config, fs).await?);
        registries.insert(key, Arc::clone(&registry));
        Ok(registry)
    }

    pub async fn len(&self) -> usize {
        self.registries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.registries.lock().await.is_empty()
    }
}
