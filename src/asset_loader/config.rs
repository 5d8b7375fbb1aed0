//! # 配置模块
//!
//! ## 设计思路
//!
//! 所有可调常量集中在 `LoaderConfig`。`Default` 即旧版行为所用的常量，
//! 宿主只需在需要时覆盖个别字段。
//!
//! ## 实现思路
//!
//! - 通过 `serde` 支持 JSON 配置文件，缺省字段回落到默认值。
//! - `validate` 在加载后拒绝明显不合理的组合。

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::container::MAX_SECTIONS;
use super::decoder::DEFAULT_MAX_DECODED_PIXELS;
use super::signature::{EMBEDDED_PROBE_OFFSETS, EMBEDDED_SCAN_WINDOW};
use super::LoaderError;

/// 资源加载配置。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// 是否输出逐策略的诊断日志。
    pub debug_mode: bool,
    /// 单张图片允许的最大像素数（`width * height`）。
    pub max_decoded_pixels: u64,
    /// 目录数据源允许读取的最大文件体积（字节）。
    pub max_blob_size: u64,
    /// 内嵌签名逐字节扫描窗口。
    pub embedded_scan_window: usize,
    /// 扫描窗口之外的抽样探测偏移。
    pub embedded_probe_offsets: Vec<usize>,
    /// 索引表容器的段数上限。
    pub max_sections: usize,
    /// 启动时预加载的资源键。
    pub preload_keys: Vec<String>,
    /// 编号资源的键前缀，例如 `images/` + `3`。
    pub numbered_key_prefix: String,
    /// 预加载编号资源 `0..numbered_preload_count`。
    pub numbered_preload_count: u32,
    /// 编号资源加载失败后依次尝试的扩展名。
    pub fallback_extensions: Vec<String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            debug_mode: true,
            max_decoded_pixels: DEFAULT_MAX_DECODED_PIXELS,
            max_blob_size: 50 * 1024 * 1024,
            embedded_scan_window: EMBEDDED_SCAN_WINDOW,
            embedded_probe_offsets: EMBEDDED_PROBE_OFFSETS.to_vec(),
            max_sections: MAX_SECTIONS,
            preload_keys: vec!["images/icon.png".to_string()],
            numbered_key_prefix: "images/".to_string(),
            numbered_preload_count: 20,
            fallback_extensions: [".png", ".jpg", ".jpeg", ".gif", ".bmp"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

impl LoaderConfig {
    /// 从 JSON 文本解析配置。
    pub fn from_json_str(text: &str) -> Result<Self, LoaderError> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| LoaderError::Config(format!("解析配置失败：{}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// 从 JSON 文件加载配置。
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, LoaderError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            LoaderError::Config(format!("无法读取配置文件 {}：{}", path.display(), e))
        })?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), LoaderError> {
        if self.max_decoded_pixels == 0 {
            return Err(LoaderError::Config("max_decoded_pixels 不能为 0".to_string()));
        }
        if self.max_sections > usize::from(u16::MAX) {
            return Err(LoaderError::Config(format!(
                "max_sections 不能超过 {}",
                u16::MAX
            )));
        }
        if self.fallback_extensions.iter().any(|ext| !ext.starts_with('.')) {
            return Err(LoaderError::Config("fallback_extensions 必须以 '.' 开头".to_string()));
        }
        Ok(())
    }

    /// 编号资源对应的资源键。
    pub fn numbered_key(&self, number: u32) -> String {
        format!("{}{}", self.numbered_key_prefix, number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_legacy_constants() {
        let config = LoaderConfig::default();
        assert_eq!(config.embedded_scan_window, 1024);
        assert_eq!(
            config.embedded_probe_offsets,
            vec![100, 500, 1000, 2000, 5000, 10000, 20000, 50000]
        );
        assert_eq!(config.max_sections, 10_000);
        assert_eq!(config.numbered_preload_count, 20);
        assert_eq!(config.numbered_key(7), "images/7");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            LoaderConfig::from_json_str(r#"{ "debug_mode": false, "numbered_preload_count": 3 }"#)
                .expect("partial config should parse");

        assert!(!config.debug_mode);
        assert_eq!(config.numbered_preload_count, 3);
        assert_eq!(config.max_sections, MAX_SECTIONS);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            LoaderConfig::from_json_str(r#"{ "max_decoded_pixels": 0 }"#),
            Err(LoaderError::Config(_))
        ));
        assert!(matches!(
            LoaderConfig::from_json_str(r#"{ "fallback_extensions": ["png"] }"#),
            Err(LoaderError::Config(_))
        ));
        assert!(LoaderConfig::from_json_str("not json").is_err());
    }

    #[test]
    fn missing_file_is_config_error() {
        assert!(matches!(
            LoaderConfig::from_json_file("/definitely/not/here.json"),
            Err(LoaderError::Config(_))
        ));
    }
}
