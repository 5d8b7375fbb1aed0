//! # 核心编排模块
//!
//! ## 设计思路
//!
//! `AssetLoader` 只负责流程编排与缓存状态，不关心字节从哪里来、怎么解码。
//! 单次 `load` 的链路固定为：
//! 1. 查缓存，命中直接返回
//! 2. 查跳过集合，命中直接返回 `None`
//! 3. 向数据源取字节；不存在时什么都不记录
//! 4. 按 `PIPELINE` 顺序尝试各策略，首个成功者写入缓存
//! 5. 全部失败则记入跳过集合，并输出唯一一条失败日志
//!
//! ## 实现思路
//!
//! - 单线程同步模型：`load` / `clear` / `preload` 取 `&mut self`，由借用规则保证唯一写者。
//!   多线程宿主需要自行加锁。
//! - 输入字节以 `Bytes` 在策略之间只读共享。
//! - 记录 `fetch/decode/total` 耗时，便于排查慢资源。

use bytes::Bytes;
use std::sync::Arc;
use std::time::Instant;

use super::cache::{decorate, ImageCache};
use super::decoder::{ImageCrateDecoder, ImageCrateSink, ImageHandle, PixelSink, RasterDecoder};
use super::source::ByteSource;
use super::strategy::{Decoded, ImageOrigin, Pipeline, PIPELINE};
use super::{LoaderConfig, LoaderError};

/// 日志中展示的前缀字节数。
const HEX_PREVIEW_BYTES: usize = 16;

/// 预加载统计。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PreloadSummary {
    pub loaded: usize,
    pub skipped: usize,
    pub cached: usize,
}

/// 资源加载器。
pub struct AssetLoader<P, D = ImageCrateDecoder, S = ImageCrateSink>
where
    D: RasterDecoder,
{
    source: P,
    decoder: D,
    sink: S,
    config: LoaderConfig,
    cache: ImageCache<D::Image>,
}

impl<P: ByteSource> AssetLoader<P> {
    /// 使用基于 `image` crate 的默认解码器与接收端。
    ///
    /// # 示例
    /// ```rust
    /// use greenfarm_assets::asset_loader::{AssetLoader, LoaderConfig, MemorySource};
    ///
    /// let mut loader = AssetLoader::new(MemorySource::new(), LoaderConfig::default());
    /// assert!(loader.load("missing").is_none());
    /// assert_eq!(loader.size(), 0);
    /// ```
    pub fn new(source: P, config: LoaderConfig) -> Self {
        let decoder = ImageCrateDecoder::new(config.max_decoded_pixels);
        Self::with_collaborators(source, decoder, ImageCrateSink, config)
    }
}

impl<P, D, S> AssetLoader<P, D, S>
where
    P: ByteSource,
    D: RasterDecoder,
    S: PixelSink<Image = D::Image>,
{
    pub fn with_collaborators(source: P, decoder: D, sink: S, config: LoaderConfig) -> Self {
        Self {
            source,
            decoder,
            sink,
            config,
            cache: ImageCache::new(),
        }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn source(&self) -> &P {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut P {
        &mut self.source
    }

    /// 只查缓存，不触发解码。
    pub fn get(&self, key: &str) -> Option<Arc<D::Image>> {
        self.cache.get(key).map(|entry| Arc::clone(&entry.image))
    }

    /// 缓存条目的来源信息。
    pub fn origin(&self, key: &str) -> Option<ImageOrigin> {
        self.cache.get(key).map(|entry| entry.origin)
    }

    pub fn size(&self) -> usize {
        self.cache.len()
    }

    pub fn is_skipped(&self, key: &str) -> bool {
        self.cache.is_skipped(key)
    }

    pub fn skipped_len(&self) -> usize {
        self.cache.skipped_len()
    }

    /// 清空缓存与跳过集合，下一次 `load` 会重新走完整流水线。
    pub fn clear(&mut self) -> usize {
        let size = self.cache.clear();
        log::info!("🧹 已清除 {} 张缓存图片与跳过列表", size);
        size
    }

    /// 加载主入口：返回已校验的图片，或 `None`。
    pub fn load(&mut self, key: &str) -> Option<Arc<D::Image>> {
        if let Some(entry) = self.cache.get(key) {
            log::trace!("使用缓存图片：{}", key);
            return Some(Arc::clone(&entry.image));
        }

        if self.cache.is_skipped(key) {
            return None;
        }

        let total_start = Instant::now();
        let blob = match self.source.fetch(key) {
            Ok(Some(blob)) => blob,
            Ok(None) => {
                if self.config.debug_mode {
                    log::debug!("资源不存在：{}", key);
                }
                return None;
            }
            Err(err) => {
                log::warn!("⚠️ 读取资源失败 - {}：{}", key, err);
                return None;
            }
        };
        let fetch_elapsed = total_start.elapsed();

        let decode_start = Instant::now();
        match self.run_pipeline(key, &blob) {
            Ok(Decoded { image, origin }) => {
                if self.config.debug_mode {
                    log::info!(
                        "✅ 已加载图片 {} - S{} {}x{} fetch={}ms decode={}ms total={}ms",
                        decorate(key, &origin),
                        origin.strategy.ordinal(),
                        image.width(),
                        image.height(),
                        fetch_elapsed.as_millis(),
                        decode_start.elapsed().as_millis(),
                        total_start.elapsed().as_millis()
                    );
                }
                Some(self.cache.insert(key, image, origin))
            }
            Err(err) => {
                if self.cache.skip(key) {
                    log::info!(
                        "🚫 跳过非图片资源：{}（{} 字节，前缀：{}，推测类型：{}，最后错误：{}）",
                        key,
                        blob.len(),
                        hex_preview(&blob),
                        guess_kind(&blob),
                        err
                    );
                }
                None
            }
        }
    }

    /// 对一段字节执行完整流水线，不读写缓存。
    pub fn decode_blob(&self, blob: &[u8]) -> Result<Decoded<D::Image>, LoaderError> {
        self.run_pipeline("<blob>", blob)
    }

    fn run_pipeline(&self, key: &str, blob: &[u8]) -> Result<Decoded<D::Image>, LoaderError> {
        let pipeline = Pipeline {
            decoder: &self.decoder,
            sink: &self.sink,
            config: &self.config,
        };

        let mut last_error = LoaderError::DecoderRejected("没有可用策略".to_string());
        for strategy in PIPELINE {
            match pipeline.run(strategy, blob) {
                Ok(decoded) => return Ok(decoded),
                Err(err) => {
                    if self.config.debug_mode {
                        log::debug!(
                            "S{} {} 未命中 {}：{}",
                            strategy.ordinal(),
                            strategy.name(),
                            key,
                            err
                        );
                    }
                    last_error = err;
                }
            }
        }
        Err(last_error)
    }

    /// 加载编号资源；编号键失败后依次尝试配置中的扩展名。
    pub fn load_by_number(&mut self, number: u32) -> Option<Arc<D::Image>> {
        if let Some(image) = self.get_by_number(number) {
            return Some(image);
        }

        let base = self.config.numbered_key(number);
        if let Some(image) = self.load(&base) {
            return Some(image);
        }

        let candidates: Vec<String> = self
            .config
            .fallback_extensions
            .iter()
            .map(|ext| format!("{}{}", base, ext))
            .collect();

        let found = candidates.iter().find_map(|key| self.load(key));
        if found.is_none() && self.config.debug_mode {
            log::debug!(
                "编号资源 #{} 无法加载（已尝试扩展名：{}）",
                number,
                candidates.join(", ")
            );
        }
        found
    }

    /// 按编号查缓存，覆盖无扩展名与所有回退扩展名。
    pub fn get_by_number(&self, number: u32) -> Option<Arc<D::Image>> {
        let base = self.config.numbered_key(number);
        self.get(&base).or_else(|| {
            self.config
                .fallback_extensions
                .iter()
                .find_map(|ext| self.get(&format!("{}{}", base, ext)))
        })
    }

    /// 预加载配置中的固定资源与编号资源。失败的键与按需加载一样记入跳过集合。
    pub fn preload(&mut self) -> PreloadSummary {
        log::info!("📦 开始预加载常用资源");
        let mut summary = PreloadSummary::default();

        let keys = self.config.preload_keys.clone();
        for key in &keys {
            if self.load(key).is_some() {
                summary.loaded += 1;
            } else {
                log::warn!("⚠️ 预加载失败：{}", key);
                summary.skipped += 1;
            }
        }

        for number in 0..self.config.numbered_preload_count {
            if self.load_by_number(number).is_some() {
                summary.loaded += 1;
            } else {
                summary.skipped += 1;
            }
        }

        summary.cached = self.size();
        log::info!(
            "📦 预加载完成：加载 {}，跳过 {}，缓存共 {}",
            summary.loaded,
            summary.skipped,
            summary.cached
        );
        summary
    }
}

fn hex_preview(blob: &Bytes) -> String {
    blob.iter()
        .take(HEX_PREVIEW_BYTES)
        .map(|byte| format!("{:02X}", byte))
        .collect::<Vec<_>>()
        .join(" ")
}

/// 借助 `infer` 描述被拒绝的字节到底是什么，例如音频或压缩包。
fn guess_kind(blob: &Bytes) -> &'static str {
    infer::get(blob).map(|kind| kind.mime_type()).unwrap_or("未知")
}
