use crate::config::RenderConfig;
use crate::pose::{Keypoint, KeypointFrame, Skeleton};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use std::sync::Arc;
use tracing::trace;

/// Draws detected joints and bones onto frame images
#[derive(Debug, Clone)]
pub struct SkeletonRenderer {
    skeleton: Arc<Skeleton>,
    landmark_color: Rgb<u8>,
    connection_color: Rgb<u8>,
    thickness: u32,
    landmark_radius: u32,
}

impl SkeletonRenderer {
    pub fn new(skeleton: Arc<Skeleton>, config: &RenderConfig) -> Self {
        Self {
            skeleton,
            landmark_color: Rgb(config.landmark_color),
            connection_color: Rgb(config.connection_color),
            thickness: config.thickness.max(1),
            landmark_radius: config.landmark_radius,
        }
    }

    /// Draw the skeleton of `keypoints` into `image`. Undetected frames are left untouched.
    pub fn render(&self, image: &mut RgbImage, keypoints: &KeypointFrame) {
        if !keypoints.pose_detected() {
            return;
        }

        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return;
        }

        let mut bones = 0usize;
        for (from, to) in self.skeleton.connections() {
            let (Some(a), Some(b)) = (keypoints.get(*from), keypoints.get(*to)) else {
                continue;
            };
            let (Some(start), Some(end)) = (
                to_pixel(a, width, height),
                to_pixel(b, width, height),
            ) else {
                continue;
            };
            self.draw_bone(image, start, end);
            bones += 1;
        }

        let mut markers = 0usize;
        for (_, keypoint) in keypoints.joints() {
            if let Some((x, y)) = to_pixel(keypoint, width, height) {
                draw_filled_circle_mut(
                    image,
                    (x.round() as i32, y.round() as i32),
                    self.landmark_radius as i32,
                    self.landmark_color,
                );
                markers += 1;
            }
        }

        trace!(
            "Rendered frame {}: {} markers, {} bones",
            keypoints.index(),
            markers,
            bones
        );
    }

    fn draw_bone(&self, image: &mut RgbImage, start: (f32, f32), end: (f32, f32)) {
        let (dx, dy) = (end.0 - start.0, end.1 - start.1);
        let length = (dx * dx + dy * dy).sqrt();

        if self.thickness == 1 || length < f32::EPSILON {
            draw_line_segment_mut(image, start, end, self.connection_color);
            return;
        }

        // Parallel strokes spread along the segment normal
        let (nx, ny) = (-dy / length, dx / length);
        let half = (self.thickness - 1) as f32 / 2.0;
        for step in 0..self.thickness {
            let offset = step as f32 - half;
            draw_line_segment_mut(
                image,
                (start.0 + nx * offset, start.1 + ny * offset),
                (end.0 + nx * offset, end.1 + ny * offset),
                self.connection_color,
            );
        }
    }
}

/// Map normalized coordinates to pixel space; landmarks outside the frame are not drawn
fn to_pixel(keypoint: &Keypoint, width: u32, height: u32) -> Option<(f32, f32)> {
    if !(0.0..=1.0).contains(&keypoint.x) || !(0.0..=1.0).contains(&keypoint.y) {
        return None;
    }
    let x = (keypoint.x * width as f64).min(width as f64 - 1.0);
    let y = (keypoint.y * height as f64).min(height as f64 - 1.0);
    Some((x as f32, y as f32))
}
