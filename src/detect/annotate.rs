use image::{Rgb, RgbImage};

use crate::detect::result::{Entity, EntityKind};
use crate::frame::Frame;
use crate::Side;

const RED: Rgb<u8> = Rgb([220, 38, 38]);
const BLUE: Rgb<u8> = Rgb([37, 99, 235]);
const NEUTRAL: Rgb<u8> = Rgb([250, 204, 21]);

const PLAYER_THICKNESS: u32 = 3;
const STICK_THICKNESS: u32 = 2;

/// Copy of `frame` with one outline per entity, colored by side.
pub(crate) fn annotate(frame: &Frame, entities: &[Entity]) -> Frame {
    if entities.is_empty() {
        return frame.clone();
    }
    let mut canvas = frame.image().clone();
    for entity in entities {
        let color = match entity.side {
            Side::Red => RED,
            Side::Blue => BLUE,
            Side::Unknown => NEUTRAL,
        };
        let thickness = match entity.kind {
            EntityKind::Player => PLAYER_THICKNESS,
            EntityKind::Stick => STICK_THICKNESS,
        };
        draw_outline(&mut canvas, entity, color, thickness);
    }
    Frame::from_image(canvas)
}

fn draw_outline(canvas: &mut RgbImage, entity: &Entity, color: Rgb<u8>, thickness: u32) {
    let (width, height) = canvas.dimensions();
    if width == 0 || height == 0 {
        return;
    }
    let x0 = clamp_coord(entity.bbox.xmin, width);
    let y0 = clamp_coord(entity.bbox.ymin, height);
    let x1 = clamp_coord(entity.bbox.xmax, width);
    let y1 = clamp_coord(entity.bbox.ymax, height);

    for t in 0..thickness {
        let top = (y0 + t).min(y1);
        let bottom = y1.saturating_sub(t).max(y0);
        let left = (x0 + t).min(x1);
        let right = x1.saturating_sub(t).max(x0);
        for x in x0..=x1 {
            canvas.put_pixel(x, top, color);
            canvas.put_pixel(x, bottom, color);
        }
        for y in y0..=y1 {
            canvas.put_pixel(left, y, color);
            canvas.put_pixel(right, y, color);
        }
    }
}

fn clamp_coord(value: f32, limit: u32) -> u32 {
    if !value.is_finite() {
        return 0;
    }
    value.round().clamp(0.0, (limit - 1) as f32) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BoundingBox;

    #[test]
    fn annotation_draws_on_a_copy() {
        let frame = Frame::filled(20, 20, [0, 0, 0]);
        let entity = Entity::new(
            BoundingBox::new(2.0, 2.0, 10.0, 10.0),
            EntityKind::Stick,
            Side::Red,
            0.9,
        );
        let annotated = annotate(&frame, &[entity]);

        assert!(!annotated.same_buffer(&frame));
        assert_eq!(annotated.image().get_pixel(2, 2), &RED);
        assert_eq!(annotated.image().get_pixel(6, 6), &Rgb([0, 0, 0]));
        assert_eq!(frame.image().get_pixel(2, 2), &Rgb([0, 0, 0]));
    }

    #[test]
    fn out_of_frame_boxes_are_clamped() {
        let frame = Frame::filled(8, 8, [0, 0, 0]);
        let entity = Entity::new(
            BoundingBox::new(-5.0, -5.0, 50.0, 50.0),
            EntityKind::Player,
            Side::Blue,
            0.9,
        );
        let annotated = annotate(&frame, &[entity]);
        assert_eq!(annotated.image().get_pixel(7, 7), &BLUE);
    }

    #[test]
    fn nothing_to_draw_passes_frame_through() {
        let frame = Frame::filled(4, 4, [1, 1, 1]);
        assert!(annotate(&frame, &[]).same_buffer(&frame));
    }
}
