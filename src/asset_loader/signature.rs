//! # 文件签名模块
//!
//! ## 设计思路
//!
//! 魔数表是格式识别的唯一依据，嗅探（S2）与内嵌签名搜索（S4）共用同一张表。
//!
//! ## 实现思路
//!
//! - `sniff`：只比较偏移 0 处的签名，按 PNG → JPEG → GIF → BMP 顺序返回首个命中。
//! - `find_embedded`：先逐字节扫描前 1KB，再探测一组固定偏移。
//! - GIF / BMP 签名只有 2~6 字节，随机数据中极易撞上，内嵌搜索只认 PNG / JPEG。

use image::ImageFormat;

const PNG_SIGNATURE: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_SIGNATURE: &[u8] = &[0xFF, 0xD8, 0xFF];
const GIF87A_SIGNATURE: &[u8] = b"GIF87a";
const GIF89A_SIGNATURE: &[u8] = b"GIF89a";
const BMP_SIGNATURE: &[u8] = b"BM";

/// 偏移 0 处的签名表，顺序即匹配优先级。
const SIGNATURES: [(FormatTag, &[u8]); 5] = [
    (FormatTag::Png, PNG_SIGNATURE),
    (FormatTag::Jpeg, JPEG_SIGNATURE),
    (FormatTag::Gif, GIF87A_SIGNATURE),
    (FormatTag::Gif, GIF89A_SIGNATURE),
    (FormatTag::Bmp, BMP_SIGNATURE),
];

/// 内嵌签名逐字节扫描窗口（字节）。
pub const EMBEDDED_SCAN_WINDOW: usize = 1024;

/// 扫描窗口之外的抽样探测偏移。
pub const EMBEDDED_PROBE_OFFSETS: [usize; 8] = [100, 500, 1000, 2000, 5000, 10000, 20000, 50000];

/// 扫描与探测都要求偏移之后至少还剩一个完整 PNG 签名的长度。
const EMBEDDED_TAIL_GUARD: usize = PNG_SIGNATURE.len();

/// 可识别的标准图片格式。未知格式以 `None` 表示。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatTag {
    Png,
    Jpeg,
    Gif,
    Bmp,
}

impl FormatTag {
    /// 诊断日志与缓存键装饰使用的名称。
    pub fn label(self) -> &'static str {
        match self {
            Self::Png => "PNG",
            Self::Jpeg => "JPEG",
            Self::Gif => "GIF",
            Self::Bmp => "BMP",
        }
    }

    /// 作为解码提示传给 `image` crate。
    pub fn as_image_format(self) -> ImageFormat {
        match self {
            Self::Png => ImageFormat::Png,
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Gif => ImageFormat::Gif,
            Self::Bmp => ImageFormat::Bmp,
        }
    }
}

/// 按偏移 0 处的魔数识别格式。
pub fn sniff(bytes: &[u8]) -> Option<FormatTag> {
    SIGNATURES
        .iter()
        .find(|(_, signature)| bytes.starts_with(signature))
        .map(|(tag, _)| *tag)
}

/// 识别任意偏移处的格式，只认 PNG / JPEG。
pub fn sniff_at(bytes: &[u8], offset: usize) -> Option<FormatTag> {
    let tail = bytes.get(offset..)?;

    if tail.starts_with(PNG_SIGNATURE) {
        Some(FormatTag::Png)
    } else if tail.starts_with(JPEG_SIGNATURE) {
        Some(FormatTag::Jpeg)
    } else {
        None
    }
}

/// 使用默认扫描窗口与探测偏移查找内嵌的 PNG / JPEG 签名。
pub fn find_embedded(bytes: &[u8]) -> Option<usize> {
    find_embedded_with(bytes, EMBEDDED_SCAN_WINDOW, &EMBEDDED_PROBE_OFFSETS)
}

/// 查找内嵌签名。
///
/// 先扫描 `[0, min(scan_window, len - 8))`，未命中再按顺序探测 `probe_offsets`
/// 中位于 `[0, len - 8)` 的偏移。返回首个命中的偏移。
pub fn find_embedded_with(
    bytes: &[u8],
    scan_window: usize,
    probe_offsets: &[usize],
) -> Option<usize> {
    let in_range = bytes.len().saturating_sub(EMBEDDED_TAIL_GUARD);
    let scan_limit = in_range.min(scan_window);

    (0..scan_limit)
        .find(|&offset| sniff_at(bytes, offset).is_some())
        .or_else(|| {
            probe_offsets
                .iter()
                .copied()
                .filter(|&offset| offset < in_range)
                .find(|&offset| sniff_at(bytes, offset).is_some())
        })
}
