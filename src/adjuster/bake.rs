//! 画角調整結果の画像化
//!
//! 表示サイズ上のドラッグ量を元画像サイズへ拡大し、
//! 元画像と同じサイズのキャンバスに描き直してJPEGにする。

use crate::error::{AovError, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::{imageops, DynamicImage, Rgba, RgbaImage};

/// キャンバスの背景色 `#ECF3F9`
pub const CANVAS_FILL: Rgba<u8> = Rgba([0xEC, 0xF3, 0xF9, 0xFF]);

pub const DEFAULT_JPEG_QUALITY: u8 = 92;

const JPEG_DATA_URL_PREFIX: &str = "data:image/jpeg;base64,";

/// 表示上のサイズ（CSSピクセル、小数あり）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderedSize {
    pub width: f64,
    pub height: f64,
}

impl RenderedSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

/// ドラッグ量（表示座標）
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Offset {
    pub x: f64,
    pub y: f64,
}

impl Offset {
    pub const ZERO: Offset = Offset { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

/// エンコード済み画像（JPEGのData URL）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    data_url: String,
}

impl EncodedImage {
    pub fn from_jpeg_bytes(bytes: &[u8]) -> Self {
        Self {
            data_url: format!("{}{}", JPEG_DATA_URL_PREFIX, STANDARD.encode(bytes)),
        }
    }

    pub fn data_url(&self) -> &str {
        &self.data_url
    }

    /// Base64部分のみ（APIに送る形式）
    pub fn base64(&self) -> &str {
        extract_base64_from_data_url(&self.data_url).unwrap_or_default()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(STANDARD.decode(self.base64())?)
    }

    pub fn decode(&self) -> Result<DynamicImage> {
        Ok(image::load_from_memory(&self.to_bytes()?)?)
    }

    pub fn into_data_url(self) -> String {
        self.data_url
    }
}

/// 画像化の境界
pub trait Baker {
    fn bake(
        &self,
        source: &DynamicImage,
        natural: (u32, u32),
        rendered: RenderedSize,
        offset: Offset,
    ) -> Result<EncodedImage>;
}

/// 表示座標のオフセットを元画像の座標へ変換（四捨五入）
pub fn scale_offset(offset: Offset, natural: (u32, u32), rendered: RenderedSize) -> (i64, i64) {
    let scale_x = natural.0 as f64 / rendered.width;
    let scale_y = natural.1 as f64 / rendered.height;
    (
        (offset.x * scale_x).round() as i64,
        (offset.y * scale_y).round() as i64,
    )
}

/// `image` クレートによるJPEG出力
#[derive(Debug, Clone, Copy)]
pub struct JpegBaker {
    quality: u8,
}

impl JpegBaker {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }
}

impl Default for JpegBaker {
    fn default() -> Self {
        Self::new(DEFAULT_JPEG_QUALITY)
    }
}

impl Baker for JpegBaker {
    fn bake(
        &self,
        source: &DynamicImage,
        natural: (u32, u32),
        rendered: RenderedSize,
        offset: Offset,
    ) -> Result<EncodedImage> {
        let (width, height) = natural;
        if width == 0 || height == 0 {
            return Err(AovError::InvalidState("画像サイズが0です".into()));
        }
        if rendered.is_empty() {
            return Err(AovError::InvalidState("画像が表示されていません".into()));
        }

        let mut canvas = RgbaImage::from_pixel(width, height, CANVAS_FILL);

        // 元画像はキャンバスと同じサイズで描画する
        let top = if source.width() == width && source.height() == height {
            source.to_rgba8()
        } else {
            imageops::resize(&source.to_rgba8(), width, height, imageops::FilterType::Triangle)
        };

        let (x, y) = scale_offset(offset, natural, rendered);
        imageops::overlay(&mut canvas, &top, x, y);

        // JPEGはアルファなし
        let rgb = DynamicImage::ImageRgba8(canvas).to_rgb8();
        let mut bytes = Vec::new();
        rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut bytes, self.quality))?;

        Ok(EncodedImage::from_jpeg_bytes(&bytes))
    }
}

/// Data URLからBase64部分を取り出す
pub fn extract_base64_from_data_url(data_url: &str) -> Option<&str> {
    data_url.split(',').nth(1)
}

/// Base64文字列（Data URL可）から画像を読み込む
pub fn decode_image(data: &str) -> Result<DynamicImage> {
    let encoded = if data.starts_with("data:") {
        extract_base64_from_data_url(data)
            .ok_or_else(|| AovError::ImageLoad("Data URLにデータがありません".into()))?
    } else {
        data
    };

    let bytes = STANDARD.decode(encoded.trim())?;
    Ok(image::load_from_memory(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn red_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([255, 0, 0, 255])))
    }

    fn close(a: Rgb<u8>, b: [u8; 3]) -> bool {
        a.0.iter()
            .zip(b.iter())
            .all(|(x, y)| (*x as i16 - *y as i16).abs() <= 12)
    }

    #[test]
    fn test_scale_offset() {
        // 表示 200x100、元画像 800x400 → 4倍
        let scaled = scale_offset(Offset::new(10.0, -5.0), (800, 400), RenderedSize::new(200.0, 100.0));
        assert_eq!(scaled, (40, -20));

        // 軸ごとに倍率が異なる
        let scaled = scale_offset(Offset::new(3.0, 3.0), (300, 100), RenderedSize::new(100.0, 100.0));
        assert_eq!(scaled, (9, 3));

        // 端数は四捨五入
        let scaled = scale_offset(Offset::new(1.3, 0.0), (3, 1), RenderedSize::new(2.0, 1.0));
        assert_eq!(scaled, (2, 0));
    }

    #[test]
    fn test_bake_keeps_natural_size() {
        let baker = JpegBaker::default();
        let source = red_image(64, 48);
        let baked = baker
            .bake(&source, (64, 48), RenderedSize::new(32.0, 24.0), Offset::new(4.0, 0.0))
            .unwrap();

        assert!(baked.data_url().starts_with("data:image/jpeg;base64,"));
        let decoded = baked.decode().unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 48));
    }

    #[test]
    fn test_bake_fills_uncovered_area() {
        let baker = JpegBaker::new(100);
        let source = red_image(64, 64);
        // 表示 32px で 8px 右へ → 元画像で 16px
        let baked = baker
            .bake(&source, (64, 64), RenderedSize::new(32.0, 32.0), Offset::new(8.0, 0.0))
            .unwrap();
        let decoded = baked.decode().unwrap().to_rgb8();

        assert!(close(*decoded.get_pixel(2, 32), [0xEC, 0xF3, 0xF9]));
        assert!(close(*decoded.get_pixel(40, 32), [255, 0, 0]));
    }

    #[test]
    fn test_bake_is_deterministic() {
        let baker = JpegBaker::default();
        let source = red_image(40, 30);
        let bake = || {
            baker
                .bake(&source, (40, 30), RenderedSize::new(20.0, 15.0), Offset::new(-3.5, 2.25))
                .unwrap()
        };
        assert_eq!(bake(), bake());
    }

    #[test]
    fn test_bake_requires_rendered_size() {
        let baker = JpegBaker::default();
        let err = baker
            .bake(&red_image(4, 4), (4, 4), RenderedSize::new(0.0, 4.0), Offset::ZERO)
            .unwrap_err();
        assert!(matches!(err, AovError::InvalidState(_)));
    }

    #[test]
    fn test_extract_base64_from_data_url() {
        assert_eq!(extract_base64_from_data_url("data:image/jpeg;base64,/9j/4AAQ"), Some("/9j/4AAQ"));
        assert_eq!(extract_base64_from_data_url("invalid"), None);
    }

    #[test]
    fn test_decode_image_from_plain_base64() {
        let baked = JpegBaker::default()
            .bake(&red_image(8, 8), (8, 8), RenderedSize::new(8.0, 8.0), Offset::ZERO)
            .unwrap();
        let image = decode_image(baked.base64()).unwrap();
        assert_eq!(image.width(), 8);

        let image = decode_image(baked.data_url()).unwrap();
        assert_eq!(image.height(), 8);

        assert!(decode_image("data:image/jpeg;base64").is_err());
    }
}
