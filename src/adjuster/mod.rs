//! 画角調整
//!
//! 申請画像を上下左右に表示サイズの1/4までドラッグし、
//! その位置で描き直した画像を参照画像の候補にする。
//!
//! - 範囲は読み込み時と表示サイズ変更時に計算し、現在位置は新しい範囲に収める
//! - 読み込み前はドラッグしても何も起きない
//! - 調整モードに入るとグリッド線を強制表示し、元の表示状態を覚えておく
//! - 確定せずに調整モードを抜けたらグリッド線の表示状態を戻す

mod bake;

pub use bake::{
    decode_image, extract_base64_from_data_url, scale_offset, Baker, EncodedImage, JpegBaker,
    Offset, RenderedSize, CANVAS_FILL, DEFAULT_JPEG_QUALITY,
};

use crate::error::{AovError, Result};
use crate::store::GridLine;
use image::DynamicImage;
use tracing::debug;

/// ドラッグ可能範囲（表示座標）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl Bounds {
    /// 表示サイズの ±1/4
    pub fn for_rendered(rendered: RenderedSize) -> Self {
        Self {
            left: -rendered.width / 4.0,
            right: rendered.width / 4.0,
            top: -rendered.height / 4.0,
            bottom: rendered.height / 4.0,
        }
    }

    pub fn clamp(&self, offset: Offset) -> Offset {
        Offset {
            x: offset.x.min(self.right).max(self.left),
            y: offset.y.min(self.bottom).max(self.top),
        }
    }

    pub fn contains(&self, offset: Offset) -> bool {
        (self.left..=self.right).contains(&offset.x) && (self.top..=self.bottom).contains(&offset.y)
    }
}

struct LoadedImage {
    image: DynamicImage,
    natural: (u32, u32),
    rendered: RenderedSize,
    bounds: Bounds,
}

pub struct ImageAdjuster<B: Baker = JpegBaker> {
    baker: B,
    loaded: Option<LoadedImage>,
    position: Offset,
    adjusting: bool,
    /// 調整モードに入る前のグリッド線表示
    saved_grid_visibility: Option<bool>,
    baked: Option<EncodedImage>,
}

impl Default for ImageAdjuster<JpegBaker> {
    fn default() -> Self {
        Self::new(JpegBaker::default())
    }
}

impl<B: Baker> ImageAdjuster<B> {
    pub fn new(baker: B) -> Self {
        Self {
            baker,
            loaded: None,
            position: Offset::ZERO,
            adjusting: false,
            saved_grid_visibility: None,
            baked: None,
        }
    }

    /// 画像の読み込み完了（表示サイズとともに）
    pub fn load(&mut self, image: DynamicImage, rendered: RenderedSize) {
        let natural = (image.width(), image.height());
        let bounds = Bounds::for_rendered(rendered);
        self.loaded = Some(LoadedImage {
            image,
            natural,
            rendered,
            bounds,
        });
        self.position = bounds.clamp(self.position);
        self.baked = None;
    }

    /// 読み込み失敗・画像の差し替え
    pub fn unload(&mut self) {
        self.loaded = None;
        self.baked = None;
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    /// 表示サイズの変更（範囲を再計算して現在位置を収める）
    pub fn resize(&mut self, rendered: RenderedSize) -> Result<()> {
        let Some(loaded) = self.loaded.as_mut() else {
            return Ok(());
        };
        let scale_changed = loaded.rendered != rendered;
        loaded.rendered = rendered;
        loaded.bounds = Bounds::for_rendered(rendered);

        let clamped = loaded.bounds.clamp(self.position);
        debug!(?clamped, scale_changed, "bounds recalculated");
        let moved = clamped != self.position;
        self.position = clamped;
        // 画像化済みの結果は表示倍率に依存するので作り直す
        if self.baked.is_some() && (moved || scale_changed) {
            self.bake_current()?;
        }
        Ok(())
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.loaded.as_ref().map(|l| l.bounds)
    }

    pub fn position(&self) -> Offset {
        self.position
    }

    pub fn is_adjusting(&self) -> bool {
        self.adjusting
    }

    /// ドラッグ中の移動（範囲外は範囲内に収める）
    ///
    /// 調整モード外または画像未読み込みなら false を返して何もしない。
    pub fn drag_to(&mut self, offset: Offset) -> bool {
        if !self.adjusting {
            return false;
        }
        let Some(loaded) = self.loaded.as_ref() else {
            return false;
        };
        self.position = loaded.bounds.clamp(offset);
        true
    }

    pub fn drag_by(&mut self, dx: f64, dy: f64) -> bool {
        let target = Offset::new(self.position.x + dx, self.position.y + dy);
        self.drag_to(target)
    }

    /// ドラッグ終了（現在位置で画像化）
    pub fn end_drag(&mut self) -> Result<()> {
        if !self.adjusting || self.loaded.is_none() {
            return Ok(());
        }
        self.bake_current()
    }

    fn bake_current(&mut self) -> Result<()> {
        let loaded = self
            .loaded
            .as_ref()
            .ok_or_else(|| AovError::InvalidState("画像が読み込まれていません".into()))?;
        let baked = self
            .baker
            .bake(&loaded.image, loaded.natural, loaded.rendered, self.position)?;
        self.baked = Some(baked);
        Ok(())
    }

    pub fn baked(&self) -> Option<&EncodedImage> {
        self.baked.as_ref()
    }

    /// 調整モードの切り替え（位置はリセット）
    pub fn toggle_adjustment(&mut self, grid: &mut GridLine) {
        self.position = Offset::ZERO;
        self.baked = None;

        if self.adjusting {
            self.adjusting = false;
            if let Some(visibility) = self.saved_grid_visibility.take() {
                grid.visibility = visibility;
            }
        } else {
            self.adjusting = true;
            self.saved_grid_visibility = Some(grid.visibility);
            grid.visibility = true;
        }
    }

    /// 移動していて画像化済みなら確定できる
    pub fn can_confirm(&self) -> bool {
        self.adjusting && !self.position.is_zero() && self.baked.is_some()
    }

    /// 確定して調整モードを抜ける（グリッド線は表示したまま）
    pub fn confirm(&mut self) -> Result<EncodedImage> {
        if !self.can_confirm() {
            return Err(AovError::InvalidState("画角が調整されていません".into()));
        }
        let baked = self
            .baked
            .take()
            .ok_or_else(|| AovError::InvalidState("画角が調整されていません".into()))?;

        self.adjusting = false;
        self.saved_grid_visibility = None;
        self.position = Offset::ZERO;
        Ok(baked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([10, 200, 30, 255])))
    }

    fn grid(visibility: bool) -> GridLine {
        GridLine {
            visibility,
            ..GridLine::default()
        }
    }

    #[test]
    fn test_bounds_quarter_of_rendered() {
        let bounds = Bounds::for_rendered(RenderedSize::new(400.0, 300.0));
        assert_eq!(bounds.left, -100.0);
        assert_eq!(bounds.right, 100.0);
        assert_eq!(bounds.top, -75.0);
        assert_eq!(bounds.bottom, 75.0);

        let clamped = bounds.clamp(Offset::new(150.0, -80.0));
        assert_eq!(clamped, Offset::new(100.0, -75.0));
    }

    #[test]
    fn test_drag_inert_until_loaded() {
        let mut adjuster: ImageAdjuster = ImageAdjuster::default();
        let mut grid = grid(false);
        adjuster.toggle_adjustment(&mut grid);

        assert!(adjuster.bounds().is_none());
        assert!(!adjuster.drag_to(Offset::new(5.0, 5.0)));
        assert_eq!(adjuster.position(), Offset::ZERO);
        adjuster.end_drag().unwrap();
        assert!(adjuster.baked().is_none());
    }

    #[test]
    fn test_drag_inert_outside_adjustment_mode() {
        let mut adjuster: ImageAdjuster = ImageAdjuster::default();
        adjuster.load(image(80, 60), RenderedSize::new(80.0, 60.0));
        assert!(!adjuster.drag_to(Offset::new(5.0, 5.0)));
    }

    #[test]
    fn test_resize_reclamps_position() {
        let mut adjuster: ImageAdjuster = ImageAdjuster::default();
        let mut grid = grid(false);
        adjuster.load(image(800, 600), RenderedSize::new(400.0, 300.0));
        adjuster.toggle_adjustment(&mut grid);

        assert!(adjuster.drag_to(Offset::new(90.0, -70.0)));
        adjuster.end_drag().unwrap();

        adjuster.resize(RenderedSize::new(200.0, 150.0)).unwrap();
        let bounds = adjuster.bounds().unwrap();
        assert!(bounds.contains(adjuster.position()));
        assert_eq!(adjuster.position(), Offset::new(50.0, -37.5));
        // 画像化済みなら新しい位置で作り直す
        assert!(adjuster.can_confirm());
    }

    /// 元画像座標のオフセットだけを記録する
    struct OffsetBaker;

    impl Baker for OffsetBaker {
        fn bake(
            &self,
            _source: &DynamicImage,
            natural: (u32, u32),
            rendered: RenderedSize,
            offset: Offset,
        ) -> Result<EncodedImage> {
            let (x, y) = scale_offset(offset, natural, rendered);
            Ok(EncodedImage::from_jpeg_bytes(format!("{},{}", x, y).as_bytes()))
        }
    }

    fn baked_offset(adjuster: &ImageAdjuster<OffsetBaker>) -> String {
        String::from_utf8(adjuster.baked().unwrap().to_bytes().unwrap()).unwrap()
    }

    #[test]
    fn test_resize_rebakes_when_scale_changes() {
        let mut adjuster = ImageAdjuster::new(OffsetBaker);
        let mut grid = grid(false);
        adjuster.load(image(400, 400), RenderedSize::new(100.0, 100.0));
        adjuster.toggle_adjustment(&mut grid);

        adjuster.drag_to(Offset::new(10.0, 0.0));
        adjuster.end_drag().unwrap();
        assert_eq!(baked_offset(&adjuster), "40,0");

        // 位置は範囲内のままでも倍率が変われば作り直す
        adjuster.resize(RenderedSize::new(200.0, 200.0)).unwrap();
        assert_eq!(adjuster.position(), Offset::new(10.0, 0.0));
        assert_eq!(baked_offset(&adjuster), "20,0");
    }

    #[test]
    fn test_resize_before_drag_end_does_not_bake() {
        let mut adjuster = ImageAdjuster::new(OffsetBaker);
        let mut grid = grid(false);
        adjuster.load(image(400, 400), RenderedSize::new(100.0, 100.0));
        adjuster.toggle_adjustment(&mut grid);
        adjuster.drag_to(Offset::new(10.0, 0.0));

        adjuster.resize(RenderedSize::new(200.0, 200.0)).unwrap();
        assert!(adjuster.baked().is_none());
    }

    #[test]
    fn test_toggle_forces_and_restores_grid() {
        let mut adjuster: ImageAdjuster = ImageAdjuster::default();
        let mut grid = grid(false);

        adjuster.toggle_adjustment(&mut grid);
        assert!(adjuster.is_adjusting());
        assert!(grid.visibility);

        adjuster.toggle_adjustment(&mut grid);
        assert!(!adjuster.is_adjusting());
        assert!(!grid.visibility);
    }

    #[test]
    fn test_toggle_resets_position() {
        let mut adjuster: ImageAdjuster = ImageAdjuster::default();
        let mut grid = grid(true);
        adjuster.load(image(100, 100), RenderedSize::new(100.0, 100.0));
        adjuster.toggle_adjustment(&mut grid);
        adjuster.drag_to(Offset::new(10.0, 10.0));

        adjuster.toggle_adjustment(&mut grid);
        assert_eq!(adjuster.position(), Offset::ZERO);
        assert!(grid.visibility);
    }

    #[test]
    fn test_zero_offset_cannot_confirm() {
        let mut adjuster: ImageAdjuster = ImageAdjuster::default();
        let mut grid = grid(false);
        adjuster.load(image(100, 100), RenderedSize::new(100.0, 100.0));
        adjuster.toggle_adjustment(&mut grid);

        adjuster.drag_to(Offset::ZERO);
        adjuster.end_drag().unwrap();
        assert!(!adjuster.can_confirm());
        assert!(adjuster.confirm().is_err());
    }

    #[test]
    fn test_confirm_returns_baked_image() {
        let mut adjuster: ImageAdjuster = ImageAdjuster::default();
        let mut grid = grid(false);
        adjuster.load(image(120, 80), RenderedSize::new(60.0, 40.0));
        adjuster.toggle_adjustment(&mut grid);

        adjuster.drag_by(6.0, 0.0);
        adjuster.drag_by(0.0, -4.0);
        assert_eq!(adjuster.position(), Offset::new(6.0, -4.0));
        // ドラッグ終了まで確定不可
        assert!(!adjuster.can_confirm());
        adjuster.end_drag().unwrap();

        let baked = adjuster.confirm().unwrap();
        let decoded = baked.decode().unwrap();
        assert_eq!((decoded.width(), decoded.height()), (120, 80));
        assert!(!adjuster.is_adjusting());
        // 確定時はグリッド線を戻さない
        assert!(grid.visibility);
    }
}
