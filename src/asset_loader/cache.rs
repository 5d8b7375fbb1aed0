//! # 图片缓存与跳过集合
//!
//! ## 设计思路
//!
//! - 缓存：资源键 → 已校验图片，首次成功解码时写入，只有 `clear` 会清除。
//! - 跳过集合：完整流水线已拒绝的资源键，保证每个键最多一次失败日志、一次完整尝试。
//! - 同一个键不会同时出现在两者中。
//!
//! ## 实现思路
//!
//! 主键始终是原始资源键。诊断日志里会出现 `key[PNG]` 这类装饰写法，
//! `get` 遇到已知装饰后缀时会剥掉后缀再查一次，两种写法都能命中。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::strategy::ImageOrigin;

/// `get` 可以识别并剥离的装饰后缀。
pub const KNOWN_DECORATIONS: [&str; 8] = [
    "[Standard]",
    "[Sniffed]",
    "[PNG]",
    "[JPEG]",
    "[GIF]",
    "[BMP]",
    "[Container]",
    "[Extracted]",
];

/// 带装饰的诊断键，例如 `images/3[Container]`。
pub fn decorate(key: &str, origin: &ImageOrigin) -> String {
    format!("{}[{}]", key, origin.decoration())
}

fn strip_decoration(key: &str) -> Option<&str> {
    KNOWN_DECORATIONS
        .iter()
        .find_map(|suffix| key.strip_suffix(suffix))
}

/// 缓存条目。
#[derive(Debug)]
pub struct CacheEntry<I> {
    pub image: Arc<I>,
    pub origin: ImageOrigin,
}

/// 图片缓存 + 跳过集合。
#[derive(Debug)]
pub struct ImageCache<I> {
    entries: HashMap<String, CacheEntry<I>>,
    skipped: HashSet<String>,
}

impl<I> Default for ImageCache<I> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            skipped: HashSet::new(),
        }
    }
}

impl<I> ImageCache<I> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 查缓存，兼容装饰键。
    pub fn get(&self, key: &str) -> Option<&CacheEntry<I>> {
        self.entries
            .get(key)
            .or_else(|| strip_decoration(key).and_then(|base| self.entries.get(base)))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// 写入缓存，同时移出跳过集合。返回共享句柄。
    pub fn insert(&mut self, key: &str, image: I, origin: ImageOrigin) -> Arc<I> {
        let image = Arc::new(image);
        self.skipped.remove(key);
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                image: Arc::clone(&image),
                origin,
            },
        );
        image
    }

    /// 记入跳过集合。已缓存的键不会被记入；返回是否为首次记入。
    pub fn skip(&mut self, key: &str) -> bool {
        if self.entries.contains_key(key) {
            return false;
        }
        self.skipped.insert(key.to_string())
    }

    pub fn is_skipped(&self, key: &str) -> bool {
        self.skipped.contains(key)
    }

    /// 清空缓存与跳过集合，返回清除前的缓存条目数。
    pub fn clear(&mut self) -> usize {
        let size = self.entries.len();
        self.entries.clear();
        self.skipped.clear();
        size
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn skipped_len(&self) -> usize {
        self.skipped.len()
    }
}
