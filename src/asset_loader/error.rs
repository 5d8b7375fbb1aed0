//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 加载链路中的所有失败都归入 `LoaderError`。各策略在本地捕获错误并继续尝试下一个策略，
//! 因此这些错误不会从 `load` 中逃逸，只用于诊断日志与单元测试的分支匹配。

/// 资源加载统一错误类型。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoaderError {
    #[error("资源不存在：{0}")]
    Absent(String),

    #[error("读取错误：{0}")]
    Io(String),

    #[error("容器格式错误：{0}")]
    MalformedContainer(String),

    #[error("解码器拒绝：{0}")]
    DecoderRejected(String),

    #[error("尺寸不合理：{0}")]
    DimensionsImplausible(String),

    #[error("像素接收失败：{0}")]
    SinkFailure(String),

    #[error("配置错误：{0}")]
    Config(String),
}

impl LoaderError {
    /// 提供方报告“不存在”或读取失败，都不应写入跳过集合。
    pub fn is_absence(&self) -> bool {
        matches!(self, Self::Absent(_) | Self::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absence_covers_missing_and_io_only() {
        assert!(LoaderError::Absent("a".into()).is_absence());
        assert!(LoaderError::Io("denied".into()).is_absence());
        assert!(!LoaderError::DecoderRejected("bad".into()).is_absence());
        assert!(!LoaderError::MalformedContainer("bad".into()).is_absence());
    }

    #[test]
    fn message_keeps_detail() {
        let text = LoaderError::SinkFailure("4x4".into()).to_string();
        assert!(text.contains("4x4"));
    }
}
