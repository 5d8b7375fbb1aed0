// End-to-end loader behaviour over in-memory assets
use bytes::Bytes;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb, Rgba};
use std::cell::Cell;
use std::io::Cursor;

use greenfarm_assets::asset_loader::{
    AssetLoader, ByteSource, FormatTag, ImageCrateDecoder, ImageCrateSink, LoaderConfig,
    LoaderError, MemorySource, PixelBuffer, PixelLayout, PixelSink, RasterDecoder, Strategy,
};

/// Counts every `fetch` so tests can assert how often the provider is touched.
struct CountingSource {
    inner: MemorySource,
    calls: Cell<usize>,
}

impl CountingSource {
    fn new(inner: MemorySource) -> Self {
        Self {
            inner,
            calls: Cell::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl ByteSource for CountingSource {
    fn fetch(&self, key: &str) -> Result<Option<Bytes>, LoaderError> {
        self.calls.set(self.calls.get() + 1);
        self.inner.fetch(key)
    }
}

/// Decoder that only works when the caller names the format.
struct HintOnlyDecoder(ImageCrateDecoder);

impl RasterDecoder for HintOnlyDecoder {
    type Image = DynamicImage;

    fn decode(&self, bytes: &[u8], hint: Option<FormatTag>) -> Result<DynamicImage, LoaderError> {
        match hint {
            Some(_) => self.0.decode(bytes, hint),
            None => Err(LoaderError::DecoderRejected("format hint required".to_string())),
        }
    }
}

/// Sink that rejects its first buffer and accepts the rest.
#[derive(Default)]
struct FailFirstSink {
    calls: Cell<usize>,
}

impl PixelSink for FailFirstSink {
    type Image = DynamicImage;

    fn from_pixels(
        &self,
        buffer: &PixelBuffer,
        has_alpha: bool,
    ) -> Result<DynamicImage, LoaderError> {
        let call = self.calls.get();
        self.calls.set(call + 1);
        if call == 0 {
            return Err(LoaderError::SinkFailure("first buffer rejected".to_string()));
        }
        ImageCrateSink.from_pixels(buffer, has_alpha)
    }
}

/// Sink that rejects everything.
struct RejectingSink;

impl PixelSink for RejectingSink {
    type Image = DynamicImage;

    fn from_pixels(&self, _: &PixelBuffer, _: bool) -> Result<DynamicImage, LoaderError> {
        Err(LoaderError::SinkFailure("rejected".to_string()))
    }
}

fn red_png(width: u32, height: u32) -> Vec<u8> {
    let img = ImageBuffer::from_pixel(width, height, Rgba([255u8, 0, 0, 255]));
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_to(&mut cursor, ImageFormat::Png)
        .expect("failed to encode png");
    cursor.into_inner()
}

fn small_jpeg() -> Vec<u8> {
    let img = ImageBuffer::from_fn(8, 8, |x, y| Rgb([(x * 30) as u8, (y * 30) as u8, 128u8]));
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut cursor, ImageFormat::Jpeg)
        .expect("failed to encode jpeg");
    cursor.into_inner()
}

/// 4x4 RGB gradient, 48 bytes.
fn rgb_4x4() -> Vec<u8> {
    (0..16u8).flat_map(|i| [i * 16, 255 - i * 16, i]).collect()
}

fn container(sections: &[&[u8]]) -> Vec<u8> {
    let mut blob = Vec::new();
    blob.extend_from_slice(&(sections.len() as u16).to_le_bytes());

    let mut offset = 0u32;
    blob.extend_from_slice(&offset.to_le_bytes());
    for section in sections {
        offset += section.len() as u32;
        blob.extend_from_slice(&offset.to_le_bytes());
    }
    for section in sections {
        blob.extend_from_slice(section);
    }
    blob
}

fn loader_with(blobs: &[(&str, Vec<u8>)]) -> AssetLoader<CountingSource> {
    let mut memory = MemorySource::new();
    for (key, data) in blobs {
        memory.insert(*key, data.clone());
    }
    AssetLoader::new(CountingSource::new(memory), LoaderConfig::default())
}

#[test]
fn png_direct() {
    let mut loader = loader_with(&[("a", red_png(2, 2))]);

    let image = loader.load("a").expect("plain png loads");
    assert_eq!((image.width(), image.height()), (2, 2));
    assert_eq!(loader.size(), 1);
    assert_eq!(loader.origin("a").map(|o| o.strategy), Some(Strategy::Standard));
}

#[test]
fn hidden_png_behind_zero_padding() {
    let mut blob = vec![0u8; 128];
    blob.extend_from_slice(&red_png(2, 2));
    let mut loader = loader_with(&[("hidden", blob)]);

    let image = loader.load("hidden").expect("embedded png loads");
    assert_eq!((image.width(), image.height()), (2, 2));

    let origin = loader.origin("hidden").expect("origin recorded");
    assert_eq!(origin.strategy, Strategy::Embedded);
    assert_eq!(origin.offset, Some(128));
    assert!(loader.get("hidden[Extracted]").is_some());
}

#[test]
fn container_with_single_rgb_section() {
    let data = rgb_4x4();
    let blob = container(&[&data]);
    assert_eq!(&blob[..10], &[0x01, 0x00, 0, 0, 0, 0, 0x30, 0, 0, 0]);

    let mut loader = loader_with(&[("images/3", blob)]);
    let image = loader.load("images/3").expect("container section loads");
    assert_eq!((image.width(), image.height()), (4, 4));

    let origin = loader.origin("images/3").expect("origin recorded");
    assert_eq!(origin.strategy, Strategy::Container);
    assert_eq!(origin.section, Some(0));
    assert_eq!(origin.layout, Some(PixelLayout::Rgb));
}

#[test]
fn random_garbage_is_skipped_once() {
    let mut loader = loader_with(&[("noise", vec![0xAAu8; 100])]);

    assert!(loader.load("noise").is_none());
    assert!(loader.is_skipped("noise"));
    assert_eq!(loader.source().calls(), 1);

    assert!(loader.load("noise").is_none());
    assert!(loader.load("noise").is_none());
    assert_eq!(loader.source().calls(), 1);
    assert_eq!(loader.size(), 0);
    assert_eq!(loader.skipped_len(), 1);
}

#[test]
fn jpeg_with_trailing_byte() {
    let mut blob = small_jpeg();
    blob.push(0x42);
    let mut loader = loader_with(&[("photo", blob)]);

    let image = loader.load("photo").expect("jpeg with trailing byte loads");
    assert_eq!((image.width(), image.height()), (8, 8));
}

#[test]
fn container_first_section_junk_second_image() {
    let junk = [1u8, 2, 3, 4, 5, 6, 7];
    let data = rgb_4x4();
    let blob = container(&[&junk, &data]);
    let mut loader = loader_with(&[("images/9", blob)]);

    let image = loader.load("images/9").expect("second section loads");
    assert_eq!((image.width(), image.height()), (4, 4));
    assert_eq!(loader.origin("images/9").and_then(|o| o.section), Some(1));
}

#[test]
fn successful_load_fetches_once() {
    let mut loader = loader_with(&[("a", red_png(3, 3))]);

    let first = loader.load("a").expect("first load");
    let second = loader.load("a").expect("second load");
    assert!(std::sync::Arc::ptr_eq(&first, &second));
    assert_eq!(loader.source().calls(), 1);
}

#[test]
fn absent_keys_are_retried() {
    let mut loader = loader_with(&[]);

    assert!(loader.load("missing").is_none());
    assert!(loader.load("missing").is_none());
    assert!(!loader.is_skipped("missing"));
    assert_eq!(loader.source().calls(), 2);
}

#[test]
fn clear_forgets_cache_and_skip_set() {
    let mut loader = loader_with(&[("a", red_png(2, 2)), ("noise", vec![0xAAu8; 100])]);

    assert!(loader.load("a").is_some());
    assert!(loader.load("noise").is_none());
    assert_eq!(loader.clear(), 1);

    assert_eq!(loader.size(), 0);
    assert!(!loader.is_skipped("noise"));
    assert!(loader.get("a").is_none());

    assert!(loader.load("a").is_some());
    assert!(loader.load("noise").is_none());
    assert_eq!(loader.source().calls(), 4);
}

#[test]
fn get_never_loads() {
    let mut loader = loader_with(&[("a", red_png(2, 2))]);

    assert!(loader.get("a").is_none());
    assert_eq!(loader.source().calls(), 0);

    loader.load("a");
    assert!(loader.get("a").is_some());
    assert!(loader.get("a[Standard]").is_some());
    assert!(loader.get("a[PNG]").is_some());
    assert!(loader.get("b").is_none());
}

#[test]
fn raw_argb_container_section_keeps_alpha() {
    // 64 bytes: 16 ARGB pixels, not divisible by 3
    let data: Vec<u8> = (0..16u8).flat_map(|i| [0x80, i, i, i]).collect();
    let blob = container(&[&data]);
    let mut loader = loader_with(&[("argb", blob)]);

    let image = loader.load("argb").expect("argb section loads");
    assert_eq!((image.width(), image.height()), (4, 4));
    assert_eq!(loader.origin("argb").and_then(|o| o.layout), Some(PixelLayout::Argb));
    assert_eq!(image.to_rgba8().get_pixel(1, 0).0, [1, 1, 1, 0x80]);
}

#[test]
fn numbered_assets_and_preload() {
    let config = LoaderConfig {
        numbered_preload_count: 4,
        preload_keys: vec!["images/icon.png".to_string(), "images/missing.png".to_string()],
        ..LoaderConfig::default()
    };
    let memory = MemorySource::new()
        .with("images/icon.png", red_png(4, 4))
        .with("images/0", red_png(1, 1))
        .with("images/1.jpg", small_jpeg())
        .with("images/2", container(&[&rgb_4x4()]));
    let mut loader = AssetLoader::new(memory, config);

    let summary = loader.preload();
    assert_eq!(summary.loaded, 4);
    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.cached, 4);

    assert!(loader.get_by_number(1).is_some());
    assert!(loader.get("images/1.jpg").is_some());
    assert!(loader.get_by_number(3).is_none());
}

#[test]
fn magic_sniff_recovers_blob_standard_decode_rejects() {
    let memory = MemorySource::new().with("bmp", red_png(3, 3));
    let mut loader = AssetLoader::with_collaborators(
        memory,
        HintOnlyDecoder(ImageCrateDecoder::default()),
        ImageCrateSink,
        LoaderConfig::default(),
    );

    let image = loader.load("bmp").expect("hinted decode succeeds");
    assert_eq!((image.width(), image.height()), (3, 3));

    let origin = loader.origin("bmp").expect("origin recorded");
    assert_eq!(origin.strategy, Strategy::MagicSniff);
    assert_eq!(origin.format, Some(FormatTag::Png));
    assert!(loader.get("bmp[PNG]").is_some());
}

#[test]
fn container_moves_on_when_sink_rejects_a_section() {
    // 16 bytes has a single reading (ARGB 2x2), so the first rejection ends section 0.
    let first = [0x10u8; 16];
    let second = rgb_4x4();
    let memory = MemorySource::new().with("c", container(&[&first, &second]));
    let mut loader = AssetLoader::with_collaborators(
        memory,
        ImageCrateDecoder::default(),
        FailFirstSink::default(),
        LoaderConfig::default(),
    );

    let image = loader.load("c").expect("second section loads");
    assert_eq!((image.width(), image.height()), (4, 4));

    let origin = loader.origin("c").expect("origin recorded");
    assert_eq!(origin.strategy, Strategy::Container);
    assert_eq!(origin.section, Some(1));
    assert_eq!(origin.layout, Some(PixelLayout::Rgb));
}

#[test]
fn sink_failure_on_every_section_skips_key() {
    let data = rgb_4x4();
    let memory = MemorySource::new().with("c", container(&[&data, &data]));
    let mut loader = AssetLoader::with_collaborators(
        memory,
        ImageCrateDecoder::default(),
        RejectingSink,
        LoaderConfig::default(),
    );

    assert!(loader.load("c").is_none());
    assert!(loader.is_skipped("c"));
    assert!(loader.decode_blob(&container(&[&data])).is_err());
}
