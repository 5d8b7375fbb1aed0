//! # 绿色农场旧版资源加载器 — 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │            宿主（游戏渲染层 / asset-probe 诊断工具）       │
//! │                                                          │
//! │        AssetLoader::load(key) → Option<Arc<Image>>       │
//! └───────┼──────────────────────────────────────────────────┘
//!         ↕
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↕            asset_loader                          │
//! │                                                          │
//! │  ┌─ source ───── ByteSource（目录 / 内存）               │
//! │  ├─ strategy ─── S1 标准 → S2 魔数 → S3 容器 → S4 内嵌    │
//! │  │   ├─ signature   魔数识别、内嵌签名扫描                │
//! │  │   ├─ container   索引表容器                            │
//! │  │   └─ pixels      S5 原始像素、尺寸推断                 │
//! │  ├─ decoder ──── image crate 解码器 / 像素接收端          │
//! │  └─ cache ────── 图片缓存 + 跳过集合                      │
//! │                                                          │
//! │  error ───────── AppError（诊断工具的统一错误类型）       │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`asset_loader`] | 多策略图片加载、缓存、跳过集合、预加载 |
//! | [`error`] | 统一错误类型 `AppError`，诊断工具的返回类型 |

pub mod asset_loader;
pub mod error;

pub use asset_loader::{AssetLoader, LoaderConfig, LoaderError};
pub use error::AppError;
