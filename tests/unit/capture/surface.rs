use super::*;
use crate::capture::cropper::ink_bounds;

fn surface() -> StrokeCaptureSurface {
    let mut s = StrokeCaptureSurface::mounted(Canvas::new(200, 80).unwrap(), PenStyle::default());
    s.bind("sig").unwrap();
    s
}

#[test]
fn unmounted_surface_cannot_bind() {
    let mut s = StrokeCaptureSurface::new(PenStyle::default());
    assert!(!s.is_mounted());
    assert!(matches!(
        s.bind("sig"),
        Err(FieldinkError::SurfaceNeverMounted)
    ));
    assert!(s.mount(0, 10).is_err());
    s.mount(10, 10).unwrap();
    s.bind("sig").unwrap();
    assert_eq!(s.owner(), Some("sig"));
}

#[test]
fn stroke_draws_ink_within_segment_bounds() {
    let mut s = surface();
    s.pointer_down(Point::new(20.0, 40.0));
    s.pointer_move(Point::new(120.0, 40.0));
    assert!(s.pointer_up());
    assert_eq!(s.stroke_count(), 1);
    assert!(!s.is_empty());

    let b = ink_bounds(s.raster().unwrap()).unwrap();
    assert!(b.min_x >= 18 && b.max_x <= 122, "{b:?}");
    assert!(b.min_y >= 38 && b.max_y <= 42, "{b:?}");
}

#[test]
fn tap_leaves_a_dot() {
    let mut s = surface();
    s.pointer_down(Point::new(50.0, 50.0));
    assert!(s.pointer_up());
    assert!(ink_bounds(s.raster().unwrap()).is_some());
}

#[test]
fn off_canvas_stroke_leaves_buffer_empty() {
    let mut s = surface();
    s.pointer_down(Point::new(-50.0, -50.0));
    s.pointer_move(Point::new(-10.0, -40.0));
    assert!(!s.pointer_up());
    assert!(s.is_empty());
}

#[test]
fn move_without_down_is_ignored() {
    let mut s = surface();
    s.pointer_move(Point::new(10.0, 10.0));
    assert!(!s.pointer_up());
    assert!(s.is_empty());
}

#[test]
fn rebinding_clears_previous_owner_ink() {
    let mut s = surface();
    s.pointer_down(Point::new(10.0, 10.0));
    s.pointer_up();
    assert!(!s.is_empty());

    s.bind("other").unwrap();
    assert!(s.is_empty());
    assert_eq!(s.stroke_count(), 0);
    assert!(ink_bounds(s.raster().unwrap()).is_none());
}

#[test]
fn unbound_surface_ignores_pointer_events() {
    let mut s = StrokeCaptureSurface::mounted(Canvas::new(20, 20).unwrap(), PenStyle::default());
    s.pointer_down(Point::new(5.0, 5.0));
    assert!(!s.pointer_up());
    assert!(s.is_empty());
}

#[test]
fn far_off_stroke_is_clipped_to_the_buffer() {
    let mut s = surface();
    s.pointer_down(Point::new(10.0, 40.0));
    s.pointer_move(Point::new(1e12, 40.0));
    assert!(s.pointer_up());

    let b = ink_bounds(s.raster().unwrap()).unwrap();
    assert!(b.min_x <= 10 && b.max_x == 199, "{b:?}");
    assert!(b.min_y >= 38 && b.max_y <= 42, "{b:?}");

    // A long segment that never crosses the buffer stamps nothing.
    s.clear();
    s.pointer_down(Point::new(-1e12, -20.0));
    s.pointer_move(Point::new(1e12, -20.0));
    assert!(!s.pointer_up());
    assert!(s.is_empty());
}

#[test]
fn segment_clipping_keeps_inside_part() {
    let r = Rect::new(0.0, 0.0, 10.0, 10.0);
    let (a, b) = clip_segment(Point::new(-10.0, 5.0), Point::new(20.0, 5.0), r).unwrap();
    assert!(a.distance(Point::new(0.0, 5.0)) < 1e-9, "{a:?}");
    assert!(b.distance(Point::new(10.0, 5.0)) < 1e-9, "{b:?}");
    assert!(clip_segment(Point::new(-5.0, -5.0), Point::new(-1.0, 20.0), r).is_none());
    assert!(clip_segment(Point::new(f64::NAN, 0.0), Point::new(1.0, 1.0), r).is_none());
    let inside = (Point::new(1.0, 1.0), Point::new(2.0, 3.0));
    assert_eq!(clip_segment(inside.0, inside.1, r), Some(inside));
}
