//! # 旧版资源加载模块（asset_loader）
//!
//! ## 设计思路
//!
//! 旧版游戏的资源包混杂了多种存储方式：标准 PNG/JPEG/GIF/BMP、带填充头的图片、
//! 索引表容器里的原始像素，以及大量根本不是图片的数据（音频、文本、脚本）。
//! 该模块把“按资源键取图片”拆成若干职责单一的子模块：
//!
//! - `source`：资源键 → 字节
//! - `signature`：魔数识别、内嵌签名扫描
//! - `container`：索引表容器解析
//! - `pixels`：尺寸推断、原始 ARGB/RGB 像素解释
//! - `decoder`：图片句柄 / 解码器 / 像素接收端接口及 `image` crate 默认实现
//! - `strategy`：S1 ~ S4 策略（S5 只经由 S3 调用）
//! - `cache`：图片缓存与跳过集合
//! - `handler`：`AssetLoader` 编排
//! - `config/error`：配置、错误
//!
//! ## 调用链
//!
//! ```text
//! AssetLoader::load(key)
//!    ├─ cache 命中 → 返回
//!    ├─ 跳过集合命中 → None
//!    ├─ ByteSource::fetch(key)（不存在 → None，不记录）
//!    ├─ S1 standard → S2 magic-sniff → S3 container(S5) → S4 embedded
//!    └─ 成功写缓存 / 失败记跳过 + 一条日志
//! ```
//!
//! ## 实现思路
//!
//! 对外只暴露类型与纯函数，`Pipeline` 保持 crate 内部可见。
//! 解码器与接收端都是泛型参数，测试可以注入计数或假实现。

mod cache;
mod config;
mod container;
mod decoder;
mod error;
mod handler;
mod pixels;
mod signature;
mod source;
mod strategy;

pub use cache::{decorate, CacheEntry, ImageCache, KNOWN_DECORATIONS};
pub use config::LoaderConfig;
pub use container::{
    looks_like_container, looks_like_container_with_limit, IndexTable, SectionSlice, MAX_SECTIONS,
};
pub use decoder::{
    validate_handle, ImageCrateDecoder, ImageCrateSink, ImageHandle, PixelSink, RasterDecoder,
    DEFAULT_MAX_DECODED_PIXELS,
};
pub use error::LoaderError;
pub use handler::{AssetLoader, PreloadSummary};
pub use pixels::{
    infer_dimensions, infer_dims, DimensionRule, Dimensions, ParsedPixels, PixelBuffer,
    PixelLayout, ASPECT_RATIOS,
};
pub use signature::{
    find_embedded, find_embedded_with, sniff, sniff_at, FormatTag, EMBEDDED_PROBE_OFFSETS,
    EMBEDDED_SCAN_WINDOW,
};
pub use source::{ByteSource, DirectorySource, MemorySource};
pub use strategy::{Decoded, ImageOrigin, Strategy, PIPELINE};
