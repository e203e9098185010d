//! # 临时对象 URL 模块
//!
//! ## 设计思路
//!
//! 文件取色需要先拿到一个指向文件字节的临时引用，再复用 URL 取色链路。
//! `ObjectUrl` 采用 RAII 模式：创建时在 `BlobRegistry` 中登记字节，
//! `Drop` 时自动撤销，成功、失败、提前返回乃至 panic 展开都会释放。
//!
//! ## 实现思路
//!
//! - 注册表为 `Mutex<HashMap<String, Bytes>>`，`Bytes` 克隆只增加引用计数。
//! - URL 形如 `blob:colorwave/<序号>`，序号由 `AtomicU64` 分配，保证并发调用互不冲突。
//! - 撤销时即使锁已中毒也继续清理，避免条目泄漏。

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;

pub(crate) const BLOB_URL_PREFIX: &str = "blob:colorwave/";

/// 临时 blob 字节注册表。
#[derive(Default)]
pub(crate) struct BlobRegistry {
    entries: Mutex<HashMap<String, Bytes>>,
    next_id: AtomicU64,
}

impl BlobRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Bytes>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 登记字节并返回作用域守卫。
    pub(crate) fn create_object_url(registry: &Arc<Self>, bytes: Bytes) -> ObjectUrl {
        let id = registry.next_id.fetch_add(1, Ordering::SeqCst);
        let url = format!("{}{}", BLOB_URL_PREFIX, id);

        registry.lock().insert(url.clone(), bytes);
        log::debug!("🔗 创建临时对象 URL: {}", url);

        ObjectUrl {
            url,
            registry: Arc::clone(registry),
        }
    }

    /// 按 URL 取回字节；已撤销或不存在时返回 `None`。
    pub(crate) fn resolve(&self, url: &str) -> Option<Bytes> {
        self.lock().get(url).cloned()
    }

    /// 当前存活的临时 URL 数量。
    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    fn revoke(&self, url: &str) {
        if self.lock().remove(url).is_some() {
            log::debug!("🧹 已撤销临时对象 URL: {}", url);
        }
    }
}

/// 临时对象 URL 的 RAII 守卫。
///
/// ```rust,ignore
/// let object_url = BlobRegistry::create_object_url(&registry, file.bytes().clone());
/// extractor.extract_from_url(object_url.as_str()).await?;
/// // 离开作用域即撤销，无论上面是否返回错误
/// ```
pub(crate) struct ObjectUrl {
    url: String,
    registry: Arc<BlobRegistry>,
}

impl ObjectUrl {
    pub(crate) fn as_str(&self) -> &str {
        &self.url
    }
}

impl Drop for ObjectUrl {
    fn drop(&mut self) {
        self.registry.revoke(&self.url);
    }
}
