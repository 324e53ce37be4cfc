use crate::config::RenderConfig;
use crate::error::{DancecamError, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_text_mut, text_size};
use rusttype::{Font, Scale};
use std::fs;
use tracing::{debug, warn};

/// Draws a "Frame: i/N" label in the top-left corner of each frame
pub struct FrameLabeler {
    font: Font<'static>,
    scale: Scale,
}

impl FrameLabeler {
    /// Load the configured font
    pub fn load(config: &RenderConfig) -> Result<Self> {
        let font_data = fs::read(&config.font_path).map_err(|e| {
            DancecamError::component(
                "frame_labeler",
                &format!("Failed to read font file '{}': {}", config.font_path, e),
            )
        })?;

        let font = Font::try_from_vec(font_data).ok_or_else(|| {
            DancecamError::component(
                "frame_labeler",
                &format!("Failed to parse font file '{}'", config.font_path),
            )
        })?;

        debug!(
            "Loaded label font {} (size {})",
            config.font_path, config.font_size
        );

        Ok(Self {
            font,
            scale: Scale::uniform(config.font_size),
        })
    }

    /// Labeler for the configuration, or `None` when labelling is off or the font is unusable
    pub fn from_config(config: &RenderConfig) -> Option<Self> {
        if !config.frame_label {
            return None;
        }

        match Self::load(config) {
            Ok(labeler) => Some(labeler),
            Err(e) => {
                warn!("Frame labels disabled: {}", e);
                None
            }
        }
    }

    /// Label text for a zero-based frame index
    pub fn label_text(index: u64, total: Option<u64>) -> String {
        match total {
            Some(total) => format!("Frame: {}/{}", index + 1, total),
            None => format!("Frame: {}/?", index + 1),
        }
    }

    pub fn draw(&self, image: &mut RgbImage, index: u64, total: Option<u64>) {
        let text = Self::label_text(index, total);

        let x: u32 = 10;
        let y: u32 = 5;
        let (text_width, text_height) = text_size(self.scale, &self.font, &text);

        // Darken the area behind the text
        for dy in 0..(text_height.max(0) as u32 + 6) {
            for dx in 0..(text_width.max(0) as u32 + 10) {
                let px = x.saturating_sub(5) + dx;
                let py = y.saturating_sub(3) + dy;
                if px < image.width() && py < image.height() {
                    let pixel = image.get_pixel(px, py);
                    image.put_pixel(px, py, Rgb([pixel[0] / 3, pixel[1] / 3, pixel[2] / 3]));
                }
            }
        }

        draw_text_mut(
            image,
            Rgb([255, 255, 255]),
            x as i32,
            y as i32,
            self.scale,
            &self.font,
            &text,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_text() {
        assert_eq!(FrameLabeler::label_text(0, Some(15)), "Frame: 1/15");
        assert_eq!(FrameLabeler::label_text(9, None), "Frame: 10/?");
    }

    #[test]
    fn test_disabled_or_missing_font() {
        let mut config = RenderConfig::default();
        config.frame_label = false;
        assert!(FrameLabeler::from_config(&config).is_none());

        config.frame_label = true;
        config.font_path = "/nonexistent/font.ttf".to_string();
        assert!(FrameLabeler::from_config(&config).is_none());
        assert!(matches!(
            FrameLabeler::load(&config),
            Err(DancecamError::Component { .. })
        ));
    }

    #[test]
    fn test_unparseable_font() {
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(file.path(), b"not a font").unwrap();

        let mut config = RenderConfig::default();
        config.font_path = file.path().display().to_string();
        assert!(matches!(
            FrameLabeler::load(&config),
            Err(DancecamError::Component { .. })
        ));
    }

    fn system_font() -> Option<RenderConfig> {
        let candidates = [
            RenderConfig::default().font_path,
            "/usr/share/fonts/TTF/DejaVuSans.ttf".to_string(),
            "/usr/share/fonts/dejavu/DejaVuSans.ttf".to_string(),
            "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf".to_string(),
        ];
        candidates.into_iter().find_map(|font_path| {
            let config = RenderConfig {
                font_path,
                ..RenderConfig::default()
            };
            FrameLabeler::load(&config).ok().map(|_| config)
        })
    }

    #[test]
    fn test_draw_label() {
        let Some(config) = system_font() else {
            return;
        };
        let labeler = FrameLabeler::load(&config).unwrap();

        let background = Rgb([90, 120, 150]);
        let mut image = RgbImage::from_pixel(160, 80, background);
        labeler.draw(&mut image, 4, Some(12));

        // Box behind the text is darkened, the rest of the frame is untouched
        assert_eq!(*image.get_pixel(5, 2), Rgb([30, 40, 50]));
        assert_eq!(*image.get_pixel(159, 79), background);
        // Glyph pixels sit between the darkened box and white
        assert!(image.pixels().any(|p| p[0] > 30 && p[0] != 90));

        // Frames smaller than the label are clipped, not overrun
        let mut tiny = RgbImage::from_pixel(6, 4, background);
        labeler.draw(&mut tiny, 0, None);
        assert_eq!(tiny.dimensions(), (6, 4));
    }
}
