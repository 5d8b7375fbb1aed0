//! # 索引表容器解析模块
//!
//! ## 设计思路
//!
//! 原手机版把多段原始像素数据打包进一个带索引表的容器。布局全部为小端序：
//!
//! ```text
//! offset 0:            u16 N            段数
//! offset 2 + 4*i:      u32 off[i]       i ∈ [0, N]，off[N] 为结束哨兵
//! offset 2 + 4*(N+1):  payload          各段首尾相接
//! ```
//!
//! 第 `i` 段在文件中的范围是 `[header + off[i], header + off[i+1])`，
//! 其中 `header = 2 + 4*(N+1)`，即偏移量相对 payload 起点。
//!
//! ## 实现思路
//!
//! - `looks_like_container`：廉价的结构识别，只看段数、表长与 `off[0]`。
//! - `IndexTable::parse`：读完整张偏移表，任一偏移越过文件末尾即判定为畸形容器。
//! - 单段长度为负、为空或越界只跳过该段，不影响其他段。

use super::LoaderError;

/// 段数上限，超过即视为随机数据。
pub const MAX_SECTIONS: usize = 10_000;

const COUNT_FIELD_LEN: usize = 2;
const OFFSET_FIELD_LEN: usize = 4;
const MIN_CONTAINER_LEN: usize = COUNT_FIELD_LEN + OFFSET_FIELD_LEN;

/// 容器内某一段在原始字节中的位置。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionSlice {
    pub start: usize,
    pub len: usize,
}

impl SectionSlice {
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.end()
    }
}

/// 已校验的偏移表。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexTable {
    offsets: Vec<u32>,
}

fn read_u16_le(data: &[u8], offset: usize) -> Option<u16> {
    let raw = data.get(offset..offset.checked_add(2)?)?;
    Some(u16::from_le_bytes([raw[0], raw[1]]))
}

fn read_u32_le(data: &[u8], offset: usize) -> Option<u32> {
    let raw = data.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
}

/// 索引表（含结束哨兵）占用的头部长度。
fn header_len_for(count: usize) -> usize {
    COUNT_FIELD_LEN + OFFSET_FIELD_LEN * (count + 1)
}

fn offset_in_file(offset: u32, blob_len: usize) -> bool {
    u64::from(offset) <= blob_len as u64
}

/// 结构识别：数据是否像索引表容器。
pub fn looks_like_container(blob: &[u8]) -> bool {
    looks_like_container_with_limit(blob, MAX_SECTIONS)
}

pub fn looks_like_container_with_limit(blob: &[u8], max_sections: usize) -> bool {
    if blob.len() < MIN_CONTAINER_LEN {
        return false;
    }

    let Some(count) = read_u16_le(blob, 0).map(usize::from) else {
        return false;
    };
    if count > max_sections || blob.len() < header_len_for(count) {
        return false;
    }

    read_u32_le(blob, COUNT_FIELD_LEN).is_some_and(|first| offset_in_file(first, blob.len()))
}

impl IndexTable {
    /// 使用默认段数上限解析。
    pub fn parse(blob: &[u8]) -> Result<Self, LoaderError> {
        Self::parse_with_limit(blob, MAX_SECTIONS)
    }

    pub fn parse_with_limit(blob: &[u8], max_sections: usize) -> Result<Self, LoaderError> {
        if !looks_like_container_with_limit(blob, max_sections) {
            return Err(LoaderError::MalformedContainer(format!(
                "不是索引表容器（{} 字节）",
                blob.len()
            )));
        }

        let count = read_u16_le(blob, 0).map(usize::from).unwrap_or_default();
        let mut offsets = Vec::with_capacity(count + 1);

        for index in 0..=count {
            let position = COUNT_FIELD_LEN + OFFSET_FIELD_LEN * index;
            let offset = read_u32_le(blob, position).ok_or_else(|| {
                LoaderError::MalformedContainer(format!("偏移表在第 {} 项处截断", index))
            })?;

            if !offset_in_file(offset, blob.len()) {
                return Err(LoaderError::MalformedContainer(format!(
                    "第 {} 项偏移 {} 超出文件长度 {}",
                    index,
                    offset,
                    blob.len()
                )));
            }
            offsets.push(offset);
        }

        Ok(Self { offsets })
    }

    /// 段数 `N`（不含结束哨兵）。
    pub fn section_count(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    /// 原始偏移表，长度为 `N + 1`。
    pub fn offsets(&self) -> &[u32] {
        &self.offsets
    }

    pub fn header_len(&self) -> usize {
        header_len_for(self.section_count())
    }

    /// 第 `index` 段在文件中的位置。
    ///
    /// 长度为负、为空或越过文件末尾的段返回 `None`。
    pub fn section(&self, index: usize, blob_len: usize) -> Option<SectionSlice> {
        if index >= self.section_count() {
            return None;
        }

        let begin = usize::try_from(self.offsets[index]).ok()?;
        let end = usize::try_from(self.offsets[index + 1]).ok()?;
        if end <= begin {
            return None;
        }

        let start = self.header_len().checked_add(begin)?;
        let stop = self.header_len().checked_add(end)?;
        if stop > blob_len {
            return None;
        }

        Some(SectionSlice {
            start,
            len: stop - start,
        })
    }

    /// 按升序遍历所有可用段，无效段被跳过。
    pub fn sections(&self, blob_len: usize) -> impl Iterator<Item = (usize, SectionSlice)> + '_ {
        (0..self.section_count())
            .filter_map(move |index| self.section(index, blob_len).map(|slice| (index, slice)))
    }

    /// 直接取第 `index` 段的字节视图。
    pub fn section_bytes<'a>(&self, blob: &'a [u8], index: usize) -> Option<&'a [u8]> {
        self.section(index, blob.len()).map(|slice| &blob[slice.range()])
    }
}
