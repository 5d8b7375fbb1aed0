//! # 解码策略模块
//!
//! ## 设计思路
//!
//! 加载链路是固定顺序的策略列表，每个策略相互独立、失败互不影响：
//!
//! ```text
//! S1 Standard     整块字节交给解码器
//! S2 MagicSniff   偏移 0 处识别出签名后，带格式提示再解码
//! S3 Container    索引表容器，逐段交给 S5
//! S4 Embedded     在非零偏移处找到 PNG/JPEG 签名，截取尾部解码
//! S5 RawPixels    推断宽高，按 ARGB/RGB 解释原始像素（只经由 S3 调用）
//! ```
//!
//! ## 实现思路
//!
//! `Strategy` 枚举 + `match` 分发，驱动方按 `PIPELINE` 顺序迭代。
//! 每个策略内部完成句柄校验，只返回“已校验的图片”或一个 `LoaderError`。

use super::container::IndexTable;
use super::decoder::{validate_handle, ImageHandle, PixelSink, RasterDecoder};
use super::pixels::{ParsedPixels, PixelBuffer, PixelLayout};
use super::signature::{find_embedded_with, sniff, sniff_at, FormatTag};
use super::{LoaderConfig, LoaderError};

/// 顶层策略。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    Standard,
    MagicSniff,
    Container,
    Embedded,
}

/// 驱动方的固定尝试顺序。
pub const PIPELINE: [Strategy; 4] = [
    Strategy::Standard,
    Strategy::MagicSniff,
    Strategy::Container,
    Strategy::Embedded,
];

impl Strategy {
    /// 策略编号，S1 ~ S4。
    pub fn ordinal(self) -> u8 {
        match self {
            Self::Standard => 1,
            Self::MagicSniff => 2,
            Self::Container => 3,
            Self::Embedded => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::MagicSniff => "magic-sniff",
            Self::Container => "container",
            Self::Embedded => "embedded",
        }
    }
}

/// 缓存条目的来源信息，仅用于诊断。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageOrigin {
    pub strategy: Strategy,
    /// 解码时使用的格式（S2 / S4）。
    pub format: Option<FormatTag>,
    /// 内嵌签名所在偏移（S4）。
    pub offset: Option<usize>,
    /// 命中的容器段序号（S3）。
    pub section: Option<usize>,
    /// 原始像素布局（S3）。
    pub layout: Option<PixelLayout>,
    /// 产生该图片的字节段长度。
    pub source_len: usize,
}

impl ImageOrigin {
    fn new(strategy: Strategy, source_len: usize) -> Self {
        Self {
            strategy,
            format: None,
            offset: None,
            section: None,
            layout: None,
            source_len,
        }
    }

    /// 诊断用的键装饰，例如 `PNG`、`Container`。
    pub fn decoration(&self) -> &'static str {
        match (self.strategy, self.format) {
            (Strategy::Standard, _) => "Standard",
            (Strategy::MagicSniff, Some(tag)) => tag.label(),
            (Strategy::MagicSniff, None) => "Sniffed",
            (Strategy::Container, _) => "Container",
            (Strategy::Embedded, _) => "Extracted",
        }
    }
}

/// 已校验的候选图片。
#[derive(Debug)]
pub struct Decoded<I> {
    pub image: I,
    pub origin: ImageOrigin,
}

/// 单次加载内共享的策略上下文。不持有也不修改输入字节。
pub(crate) struct Pipeline<'a, D, S> {
    pub(crate) decoder: &'a D,
    pub(crate) sink: &'a S,
    pub(crate) config: &'a LoaderConfig,
}

impl<D, S> Pipeline<'_, D, S>
where
    D: RasterDecoder,
    S: PixelSink<Image = D::Image>,
{
    pub(crate) fn run(
        &self,
        strategy: Strategy,
        blob: &[u8],
    ) -> Result<Decoded<D::Image>, LoaderError> {
        match strategy {
            Strategy::Standard => self.standard(blob),
            Strategy::MagicSniff => self.magic_sniff(blob),
            Strategy::Container => self.container(blob),
            Strategy::Embedded => self.embedded(blob),
        }
    }

    fn decode_validated(
        &self,
        bytes: &[u8],
        hint: Option<FormatTag>,
    ) -> Result<D::Image, LoaderError> {
        let image = self.decoder.decode(bytes, hint)?;
        validate_handle(&image, self.config.max_decoded_pixels)?;
        Ok(image)
    }

    /// S1：不带提示的整块解码。
    fn standard(&self, blob: &[u8]) -> Result<Decoded<D::Image>, LoaderError> {
        let image = self.decode_validated(blob, None)?;
        Ok(Decoded {
            image,
            origin: ImageOrigin::new(Strategy::Standard, blob.len()),
        })
    }

    /// S2：按偏移 0 的签名带提示解码。
    fn magic_sniff(&self, blob: &[u8]) -> Result<Decoded<D::Image>, LoaderError> {
        let format = sniff(blob)
            .ok_or_else(|| LoaderError::DecoderRejected("偏移 0 处没有已知签名".to_string()))?;

        let image = self.decode_validated(blob, Some(format))?;
        Ok(Decoded {
            image,
            origin: ImageOrigin {
                format: Some(format),
                ..ImageOrigin::new(Strategy::MagicSniff, blob.len())
            },
        })
    }

    /// S3：逐段尝试原始像素，首个成功的段胜出。
    fn container(&self, blob: &[u8]) -> Result<Decoded<D::Image>, LoaderError> {
        let table = IndexTable::parse_with_limit(blob, self.config.max_sections)?;
        let mut last_error = None;

        for (index, slice) in table.sections(blob.len()) {
            match self.raw_pixels(&blob[slice.range()]) {
                Ok((image, layout)) => {
                    return Ok(Decoded {
                        image,
                        origin: ImageOrigin {
                            section: Some(index),
                            layout: Some(layout),
                            ..ImageOrigin::new(Strategy::Container, slice.len)
                        },
                    });
                }
                Err(err) => last_error = Some(err),
            }
        }

        Err(match last_error {
            Some(err) => err,
            None => LoaderError::MalformedContainer(format!(
                "{} 个段中没有可用段",
                table.section_count()
            )),
        })
    }

    /// S4：截取内嵌签名之后的字节解码。
    fn embedded(&self, blob: &[u8]) -> Result<Decoded<D::Image>, LoaderError> {
        let offset = find_embedded_with(
            blob,
            self.config.embedded_scan_window,
            &self.config.embedded_probe_offsets,
        )
        .ok_or_else(|| LoaderError::DecoderRejected("未找到内嵌的 PNG/JPEG 签名".to_string()))?;

        let format = sniff_at(blob, offset);
        let tail = &blob[offset..];
        let image = self.decode_validated(tail, format)?;

        Ok(Decoded {
            image,
            origin: ImageOrigin {
                format,
                offset: Some(offset),
                ..ImageOrigin::new(Strategy::Embedded, tail.len())
            },
        })
    }

    /// S5：把一段字节解释为原始像素并交给接收端。
    ///
    /// 首选解释被接收端拒绝时，继续尝试排名靠后的解释。
    pub(crate) fn raw_pixels(&self, data: &[u8]) -> Result<(D::Image, PixelLayout), LoaderError> {
        let candidates = PixelBuffer::parse_candidates(data, self.config.max_decoded_pixels)?;
        let mut last_error = None;

        for parsed in candidates {
            match self.accept_pixels(&parsed) {
                Ok(image) => return Ok((image, parsed.layout)),
                Err(err) => last_error = Some(err),
            }
        }

        Err(last_error.unwrap_or_else(|| {
            LoaderError::DimensionsImplausible(format!("{} 字节无法解析为像素", data.len()))
        }))
    }

    fn accept_pixels(&self, parsed: &ParsedPixels) -> Result<D::Image, LoaderError> {
        let (width, height) = (parsed.buffer.width(), parsed.buffer.height());

        let image = self.sink.from_pixels(&parsed.buffer, parsed.layout.has_alpha())?;
        validate_handle(&image, self.config.max_decoded_pixels)?;

        if image.width() != width || image.height() != height {
            return Err(LoaderError::SinkFailure(format!(
                "接收端返回 {}x{}，期望 {}x{}",
                image.width(),
                image.height(),
                width,
                height
            )));
        }

        Ok(image)
    }
}
