//! # 解码器与像素接收端模块
//!
//! ## 设计思路
//!
//! 加载流水线只依赖三个接口：图片句柄（`ImageHandle`）、标准格式解码器（`RasterDecoder`）
//! 与原始像素接收端（`PixelSink`）。默认实现基于 `image` crate，测试或宿主可替换。
//!
//! ## 实现思路
//!
//! - `ImageCrateDecoder` 先只读头部拿到宽高，按像素上限快速拒绝，再完整解码。
//! - 有格式提示时强制使用该格式，否则由 `image` crate 自行猜测。
//! - `ImageCrateSink` 把 ARGB 字序展开成 RGBA8 / RGB8 缓冲。

use image::{DynamicImage, GenericImageView, ImageBuffer, ImageReader, Rgb, Rgba};
use std::io::Cursor;

use super::{FormatTag, LoaderError, PixelBuffer};

/// 默认解码像素上限（`width * height`）。
pub const DEFAULT_MAX_DECODED_PIXELS: u64 = 40_000_000;

/// 可显示的图片句柄。
pub trait ImageHandle {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// 解码器的错误标记。
    fn is_error(&self) -> bool {
        false
    }
}

impl ImageHandle for DynamicImage {
    fn width(&self) -> u32 {
        GenericImageView::width(self)
    }

    fn height(&self) -> u32 {
        GenericImageView::height(self)
    }
}

/// 标准容器格式（PNG/JPEG/GIF/BMP）解码器。
pub trait RasterDecoder {
    type Image: ImageHandle;

    fn decode(&self, bytes: &[u8], hint: Option<FormatTag>) -> Result<Self::Image, LoaderError>;
}

/// 原始像素接收端。
pub trait PixelSink {
    type Image: ImageHandle;

    fn from_pixels(
        &self,
        buffer: &PixelBuffer,
        has_alpha: bool,
    ) -> Result<Self::Image, LoaderError>;
}

/// 校验候选句柄：无错误标记、宽高至少为 1、像素数不溢出且不超过上限。
pub fn validate_handle<I: ImageHandle>(image: &I, max_pixels: u64) -> Result<(), LoaderError> {
    if image.is_error() {
        return Err(LoaderError::DecoderRejected("句柄带有错误标记".to_string()));
    }

    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0 {
        return Err(LoaderError::DimensionsImplausible(format!(
            "无效尺寸 {}x{}",
            width, height
        )));
    }

    let pixels = (width as u64)
        .checked_mul(height as u64)
        .ok_or_else(|| LoaderError::DimensionsImplausible("图片像素数溢出".to_string()))?;

    if pixels > max_pixels {
        return Err(LoaderError::DimensionsImplausible(format!(
            "图片像素过大：{} 像素（限制：{} 像素）",
            pixels, max_pixels
        )));
    }

    Ok(())
}

/// 基于 `image` crate 的默认解码器。
#[derive(Debug, Clone)]
pub struct ImageCrateDecoder {
    max_decoded_pixels: u64,
}

impl Default for ImageCrateDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DECODED_PIXELS)
    }
}

impl ImageCrateDecoder {
    pub fn new(max_decoded_pixels: u64) -> Self {
        Self { max_decoded_pixels }
    }

    fn reader(
        bytes: &[u8],
        hint: Option<FormatTag>,
    ) -> Result<ImageReader<Cursor<&[u8]>>, LoaderError> {
        let cursor = Cursor::new(bytes);
        match hint {
            Some(tag) => Ok(ImageReader::with_format(cursor, tag.as_image_format())),
            None => ImageReader::new(cursor)
                .with_guessed_format()
                .map_err(|e| LoaderError::DecoderRejected(format!("无法识别图片格式：{}", e))),
        }
    }

    /// 只读头部获取宽高，用于完整解码前的像素上限检查。
    fn inspect_dimensions(
        bytes: &[u8],
        hint: Option<FormatTag>,
    ) -> Result<(u32, u32), LoaderError> {
        Self::reader(bytes, hint)?
            .into_dimensions()
            .map_err(|e| LoaderError::DecoderRejected(format!("无法读取图片尺寸：{}", e)))
    }
}

impl RasterDecoder for ImageCrateDecoder {
    type Image = DynamicImage;

    fn decode(&self, bytes: &[u8], hint: Option<FormatTag>) -> Result<DynamicImage, LoaderError> {
        if bytes.is_empty() {
            return Err(LoaderError::DecoderRejected("图片内容为空".to_string()));
        }

        let (width, height) = Self::inspect_dimensions(bytes, hint)?;
        let pixels = (width as u64) * (height as u64);
        if pixels > self.max_decoded_pixels {
            return Err(LoaderError::DimensionsImplausible(format!(
                "图片像素过大：{} 像素（限制：{} 像素）",
                pixels, self.max_decoded_pixels
            )));
        }

        let reader = Self::reader(bytes, hint)?;
        if reader.format().is_none() {
            return Err(LoaderError::DecoderRejected("无法识别图片格式".to_string()));
        }

        reader
            .decode()
            .map_err(|e| LoaderError::DecoderRejected(format!("图片解码失败：{}", e)))
    }
}

/// 把 ARGB 像素缓冲转换为 `DynamicImage` 的默认接收端。
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCrateSink;

impl PixelSink for ImageCrateSink {
    type Image = DynamicImage;

    fn from_pixels(
        &self,
        buffer: &PixelBuffer,
        has_alpha: bool,
    ) -> Result<DynamicImage, LoaderError> {
        let (width, height) = (buffer.width(), buffer.height());
        let words = buffer.pixels();

        let image = if has_alpha {
            let raw = words
                .iter()
                .flat_map(|&argb| {
                    let [a, r, g, b] = argb.to_be_bytes();
                    [r, g, b, a]
                })
                .collect();
            ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(width, height, raw)
                .map(DynamicImage::ImageRgba8)
        } else {
            let raw = words
                .iter()
                .flat_map(|&argb| {
                    let [_, r, g, b] = argb.to_be_bytes();
                    [r, g, b]
                })
                .collect();
            ImageBuffer::<Rgb<u8>, Vec<u8>>::from_raw(width, height, raw)
                .map(DynamicImage::ImageRgb8)
        };

        image.ok_or_else(|| {
            LoaderError::SinkFailure(format!(
                "像素缓冲长度 {} 与 {}x{} 不符",
                words.len(),
                width,
                height
            ))
        })
    }
}
