//! # 原始像素解析模块
//!
//! ## 设计思路
//!
//! 容器中的段通常是没有任何头部的 ARGB / RGB 像素流，宽高只能从字节数反推。
//!
//! ## 实现思路
//!
//! 1. 字节数能被 4 整除时按 ARGB 解释，能被 3 整除时按 RGB 解释。
//! 2. 对像素数调用 `infer_dims` 推断宽高。
//! 3. 两种解释都可用时，由完全平方规则得出宽高的一方优先；同级时 ARGB 优先。
//! 4. 推断出的 `宽 * 高 * 每像素字节` 必须不超过输入长度，否则判定尺寸不合理。
//!
//! ## 已知怪癖
//!
//! 比例规则计算 `s = P / (a*b)` 后直接返回 `(a*s, b*s)`，只有 `s == 1` 时乘积才等于 `P`。
//! `(1, 1)` 比例永远整除，所以因子枚举规则实际上不可达。这与旧版行为完全一致，
//! 任何修正都属于破坏性变更，暂不处理。

use super::LoaderError;

/// 比例规则的尝试顺序。
pub const ASPECT_RATIOS: [(usize, usize); 5] = [(16, 9), (4, 3), (3, 2), (2, 1), (1, 1)];

/// 宽高由哪条规则推断得出。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimensionRule {
    Square,
    Ratio,
    Factor,
}

/// 像素流的字节布局。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelLayout {
    /// 每像素 4 字节：A, R, G, B。
    Argb,
    /// 每像素 3 字节：R, G, B，alpha 固定为 0xFF。
    Rgb,
}

impl PixelLayout {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Argb => 4,
            Self::Rgb => 3,
        }
    }

    pub fn has_alpha(self) -> bool {
        matches!(self, Self::Argb)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Argb => "ARGB",
            Self::Rgb => "RGB",
        }
    }

    fn pack(self, chunk: &[u8]) -> u32 {
        match self {
            Self::Argb => u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]),
            Self::Rgb => u32::from_be_bytes([0xFF, chunk[0], chunk[1], chunk[2]]),
        }
    }
}

/// 推断结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: usize,
    pub height: usize,
    pub rule: DimensionRule,
}

fn integer_sqrt(value: usize) -> usize {
    if value < 2 {
        return value;
    }

    let mut root = (value as f64).sqrt() as usize;
    while root.saturating_mul(root) > value {
        root -= 1;
    }
    while (root + 1).saturating_mul(root + 1) <= value {
        root += 1;
    }
    root
}

/// 由像素数推断宽高，附带命中的规则。
pub fn infer_dimensions(pixel_count: usize) -> Option<Dimensions> {
    if pixel_count == 0 {
        return None;
    }

    let root = integer_sqrt(pixel_count);
    if root * root == pixel_count {
        return Some(Dimensions {
            width: root,
            height: root,
            rule: DimensionRule::Square,
        });
    }

    for (a, b) in ASPECT_RATIOS {
        let unit = a * b;
        if pixel_count % unit == 0 {
            let scale = pixel_count / unit;
            return Some(Dimensions {
                width: a.checked_mul(scale)?,
                height: b.checked_mul(scale)?,
                rule: DimensionRule::Ratio,
            });
        }
    }

    (1..=root)
        .find(|w| pixel_count % w == 0)
        .map(|w| Dimensions {
            width: w,
            height: pixel_count / w,
            rule: DimensionRule::Factor,
        })
}

/// 由像素数推断 `(宽, 高)`。
pub fn infer_dims(pixel_count: usize) -> Option<(usize, usize)> {
    infer_dimensions(pixel_count).map(|dims| (dims.width, dims.height))
}

/// 紧密排列、行优先、左上角为原点的 ARGB 像素缓冲。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    pixels: Vec<u32>,
    width: u32,
    height: u32,
}

/// 自动解析的结果：像素、采用的布局以及宽高来源。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPixels {
    pub buffer: PixelBuffer,
    pub layout: PixelLayout,
    pub rule: DimensionRule,
}

impl PixelBuffer {
    /// 直接由像素数组构造，要求 `pixels.len() == width * height` 且宽高为正。
    pub fn new(pixels: Vec<u32>, width: u32, height: u32) -> Result<Self, LoaderError> {
        let expected = (width as u64).checked_mul(height as u64);
        if width == 0 || height == 0 || expected != Some(pixels.len() as u64) {
            return Err(LoaderError::DimensionsImplausible(format!(
                "{}x{} 与像素数 {} 不符",
                width,
                height,
                pixels.len()
            )));
        }

        Ok(Self {
            pixels,
            width,
            height,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// 按给定宽高与布局解包，要求数据至少覆盖 `宽 * 高` 个像素。
    fn unpack(
        data: &[u8],
        width: usize,
        height: usize,
        layout: PixelLayout,
    ) -> Result<Self, LoaderError> {
        let pixel_count = width.checked_mul(height);
        let needed = pixel_count.and_then(|count| count.checked_mul(layout.bytes_per_pixel()));

        let (Some(pixel_count), Some(needed)) = (pixel_count, needed) else {
            return Err(LoaderError::DimensionsImplausible(format!(
                "{}x{} 像素数溢出",
                width, height
            )));
        };

        if pixel_count == 0 || needed > data.len() {
            return Err(LoaderError::DimensionsImplausible(format!(
                "{}x{} {} 需要 {} 字节，实际 {} 字节",
                width,
                height,
                layout.label(),
                needed,
                data.len()
            )));
        }

        let (Ok(w), Ok(h)) = (u32::try_from(width), u32::try_from(height)) else {
            return Err(LoaderError::DimensionsImplausible(format!(
                "{}x{} 超出 u32 范围",
                width, height
            )));
        };

        let pixels = data[..needed]
            .chunks_exact(layout.bytes_per_pixel())
            .map(|chunk| layout.pack(chunk))
            .collect();

        Self::new(pixels, w, h)
    }

    /// 按已知宽高解析 ARGB；数据不足 4 字节/像素但够 3 字节/像素时回退为 RGB。
    pub fn parse_argb_exact(
        data: &[u8],
        width: usize,
        height: usize,
    ) -> Result<(Self, PixelLayout), LoaderError> {
        match Self::unpack(data, width, height, PixelLayout::Argb) {
            Ok(buffer) => Ok((buffer, PixelLayout::Argb)),
            Err(_) => Self::parse_rgb_exact(data, width, height)
                .map(|buffer| (buffer, PixelLayout::Rgb)),
        }
    }

    /// 按已知宽高解析 RGB。
    pub fn parse_rgb_exact(data: &[u8], width: usize, height: usize) -> Result<Self, LoaderError> {
        Self::unpack(data, width, height, PixelLayout::Rgb)
    }

    /// 以指定布局推断宽高并解析。字节数必须是每像素字节数的整数倍。
    pub fn parse_with_layout(
        data: &[u8],
        layout: PixelLayout,
    ) -> Result<(Self, DimensionRule), LoaderError> {
        let bpp = layout.bytes_per_pixel();
        if data.is_empty() || data.len() % bpp != 0 {
            return Err(LoaderError::DimensionsImplausible(format!(
                "{} 字节不能按 {} 解释",
                data.len(),
                layout.label()
            )));
        }

        let dims = infer_dimensions(data.len() / bpp).ok_or_else(|| {
            LoaderError::DimensionsImplausible(format!("{} 字节无法推断宽高", data.len()))
        })?;

        Self::unpack(data, dims.width, dims.height, layout).map(|buffer| (buffer, dims.rule))
    }

    /// 自动选择 ARGB / RGB 并推断宽高，返回排名第一的解释。
    ///
    /// `max_pixels` 之外的结果视为尺寸不合理。
    pub fn parse_auto(data: &[u8], max_pixels: u64) -> Result<ParsedPixels, LoaderError> {
        Self::parse_candidates(data, max_pixels)
            .map(|candidates| candidates.into_iter().next())?
            .ok_or_else(|| {
                LoaderError::DimensionsImplausible(format!("{} 字节无法解析为像素", data.len()))
            })
    }

    /// 按优先级列出所有可用解释：完全平方在前，比例规则在后；同级时 ARGB 在前。
    ///
    /// 成功时至少包含一项。调用方可在首选解释被接收端拒绝后继续尝试后续项。
    pub fn parse_candidates(
        data: &[u8],
        max_pixels: u64,
    ) -> Result<Vec<ParsedPixels>, LoaderError> {
        let mut squares = Vec::new();
        let mut others = Vec::new();
        let mut last_error = None;

        for layout in [PixelLayout::Argb, PixelLayout::Rgb] {
            let parsed = Self::parse_with_layout(data, layout).and_then(|(buffer, rule)| {
                let pixels = buffer.pixels.len() as u64;
                if pixels > max_pixels {
                    return Err(LoaderError::DimensionsImplausible(format!(
                        "{} 像素超过上限 {}",
                        pixels, max_pixels
                    )));
                }
                Ok(ParsedPixels {
                    buffer,
                    layout,
                    rule,
                })
            });

            match parsed {
                Ok(parsed) if parsed.rule == DimensionRule::Square => squares.push(parsed),
                Ok(parsed) => others.push(parsed),
                Err(err) => last_error = Some(err),
            }
        }

        squares.append(&mut others);
        if squares.is_empty() {
            return Err(last_error.unwrap_or_else(|| {
                LoaderError::DimensionsImplausible(format!("{} 字节无法解析为像素", data.len()))
            }));
        }
        Ok(squares)
    }
}
