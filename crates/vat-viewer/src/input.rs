//! Pointer input translation from window to frame coordinates

use eframe::egui::{self, Pos2, Rect, Vec2};
use vat_core::PointerEvent;

/// Maps window coordinates inside the painted image to frame pixels
#[derive(Clone, Copy, Debug)]
pub struct CoordinateMapper {
    pub viewer_rect: Rect,
    pub frame_size: Vec2,
}

impl CoordinateMapper {
    pub fn new(viewer_rect: Rect, frame_size: Vec2) -> Self {
        Self {
            viewer_rect,
            frame_size,
        }
    }

    /// Map window coordinates to frame coordinates, clamped to the frame
    pub fn map_to_frame(&self, local: Pos2) -> (u16, u16) {
        let relative = local - self.viewer_rect.min;
        let scale_x = self.frame_size.x / self.viewer_rect.width().max(1.0);
        let scale_y = self.frame_size.y / self.viewer_rect.height().max(1.0);

        let max_x = (self.frame_size.x - 1.0).clamp(0.0, u16::MAX as f32);
        let max_y = (self.frame_size.y - 1.0).clamp(0.0, u16::MAX as f32);
        let frame_x = (relative.x * scale_x).floor().clamp(0.0, max_x);
        let frame_y = (relative.y * scale_y).floor().clamp(0.0, max_y);

        (frame_x as u16, frame_y as u16)
    }

    /// Check if point is within the painted image
    pub fn contains(&self, point: Pos2) -> bool {
        self.viewer_rect.contains(point)
    }

    /// Translate an egui event into a pointer event.
    ///
    /// Presses and moves only count inside the image; a primary release
    /// anywhere ends the drag so it cannot get stuck.
    pub fn translate(&self, event: &egui::Event) -> Option<PointerEvent> {
        match event {
            egui::Event::PointerMoved(pos) if self.contains(*pos) => {
                let (x, y) = self.map_to_frame(*pos);
                Some(PointerEvent::moved(x, y))
            }
            egui::Event::PointerButton {
                pos,
                button: egui::PointerButton::Primary,
                pressed,
                ..
            } => {
                let (x, y) = self.map_to_frame(*pos);
                if *pressed {
                    self.contains(*pos).then(|| PointerEvent::button_down(x, y))
                } else {
                    Some(PointerEvent::button_up(x, y))
                }
            }
            _ => None,
        }
    }
}
