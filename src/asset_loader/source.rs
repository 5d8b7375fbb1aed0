//! # 数据源模块
//!
//! ## 设计思路
//!
//! 旧版通过进程级的类路径资源查找字节。这里把数据源建模为构造时注入的值，
//! 测试可以直接塞入内存字节，宿主可以换成自己的打包格式。
//!
//! - `ByteSource`：资源键 → 完整字节或“不存在”
//! - `DirectorySource`：以某个目录为根的文件系统数据源
//! - `MemorySource`：内存映射，主要用于测试

use bytes::Bytes;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use super::LoaderError;

/// 资源字节提供方。
///
/// 要求幂等；允许阻塞；必须一次返回完整字节，不做流式读取。
pub trait ByteSource {
    /// `Ok(None)` 表示资源不存在。
    fn fetch(&self, key: &str) -> Result<Option<Bytes>, LoaderError>;
}

impl<T: ByteSource + ?Sized> ByteSource for &T {
    fn fetch(&self, key: &str) -> Result<Option<Bytes>, LoaderError> {
        (**self).fetch(key)
    }
}

impl<T: ByteSource + ?Sized> ByteSource for Box<T> {
    fn fetch(&self, key: &str) -> Result<Option<Bytes>, LoaderError> {
        (**self).fetch(key)
    }
}

/// 以目录为根的数据源。资源键按相对路径解析，前导 `/` 会被忽略。
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
    max_file_size: u64,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>, max_file_size: u64) -> Self {
        Self {
            root: root.into(),
            max_file_size,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 把资源键解析为根目录下的路径，拒绝 `..` 等越出根目录的写法。
    fn resolve(&self, key: &str) -> Option<PathBuf> {
        let relative = Path::new(key.trim_start_matches('/'));
        let mut resolved = self.root.clone();

        for component in relative.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                _ => return None,
            }
        }

        (resolved != self.root).then_some(resolved)
    }
}

impl ByteSource for DirectorySource {
    fn fetch(&self, key: &str) -> Result<Option<Bytes>, LoaderError> {
        let Some(path) = self.resolve(key) else {
            log::warn!("⚠️ 资源键越出根目录，已忽略：{}", key);
            return Ok(None);
        };

        if !path.is_file() {
            return Ok(None);
        }

        let metadata = std::fs::metadata(&path)
            .map_err(|e| LoaderError::Io(format!("无法读取文件信息 {}：{}", path.display(), e)))?;

        if metadata.len() > self.max_file_size {
            return Err(LoaderError::Io(format!(
                "文件过大：{:.2} MB（限制：{:.2} MB）",
                metadata.len() as f64 / 1024.0 / 1024.0,
                self.max_file_size as f64 / 1024.0 / 1024.0
            )));
        }

        std::fs::read(&path)
            .map(|data| Some(Bytes::from(data)))
            .map_err(|e| LoaderError::Io(format!("无法读取资源文件 {}：{}", path.display(), e)))
    }
}

/// 内存数据源。
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    blobs: HashMap<String, Bytes>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// 链式插入，便于测试构造。
    pub fn with(mut self, key: impl Into<String>, data: impl Into<Bytes>) -> Self {
        self.insert(key, data);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, data: impl Into<Bytes>) {
        self.blobs.insert(key.into(), data.into());
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

impl ByteSource for MemorySource {
    fn fetch(&self, key: &str) -> Result<Option<Bytes>, LoaderError> {
        Ok(self.blobs.get(key).cloned())
    }
}
