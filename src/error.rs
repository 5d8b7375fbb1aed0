//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 加载流水线内部只使用 `LoaderError`，且“失败”最终折叠为 `None`。
//! 真正需要向调用方报错的只有外层入口（配置文件、命令行参数、文件系统），
//! 这里定义 `AppError` 统一这些情况。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `LoaderError` 与 `std::io::Error` 提供 `From` 转换，入口处直接 `?`。

use crate::asset_loader::LoaderError;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 资源加载或配置错误
    #[error("{0}")]
    Loader(#[from] LoaderError),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),

    /// 命令行参数不合法
    #[error("参数错误: {0}")]
    Usage(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loader_error_converts_transparently() {
        let err: AppError = LoaderError::Config("bad".to_string()).into();
        assert!(matches!(err, AppError::Loader(LoaderError::Config(_))));
        assert_eq!(err.to_string(), LoaderError::Config("bad".to_string()).to_string());
    }

    #[test]
    fn io_error_has_prefix() {
        let err: AppError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(err.to_string().starts_with("文件系统错误"));
    }
}
