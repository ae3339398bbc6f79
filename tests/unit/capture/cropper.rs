use super::*;

const INK: image::Rgba<u8> = image::Rgba([20, 20, 30, 255]);

fn fill(img: &mut image::RgbaImage, x0: u32, y0: u32, w: u32, h: u32) {
    for y in y0..y0 + h {
        for x in x0..x0 + w {
            img.put_pixel(x, y, INK);
        }
    }
}

#[test]
fn empty_raster_is_rejected() {
    let img = image::RgbaImage::new(64, 32);
    assert_eq!(ink_bounds(&img), None);
    assert!(matches!(
        crop_to_ink(&img),
        Err(FieldinkError::EmptyStrokeCommit)
    ));
    assert!(crop_to_artifact(&img).is_err());
}

#[test]
fn single_pixel_yields_padded_square() {
    let mut img = image::RgbaImage::new(50, 50);
    img.put_pixel(17, 33, INK);

    let out = crop_to_ink(&img).unwrap();
    assert_eq!(out.dimensions(), (1 + 2 * PAD, 1 + 2 * PAD));
    assert_eq!(*out.get_pixel(PAD, PAD), INK);
    let opaque = out.pixels().filter(|p| p.0[3] != 0).count();
    assert_eq!(opaque, 1);
}

#[test]
fn stroke_extent_is_independent_of_canvas_size() {
    for (cw, ch, x0, y0) in [(100, 40, 0, 0), (400, 300, 123, 77), (40, 10, 0, 0)] {
        let mut img = image::RgbaImage::new(cw, ch);
        fill(&mut img, x0, y0, 40, 10);

        let artifact = crop_to_artifact(&img).unwrap();
        assert_eq!(
            (artifact.width(), artifact.height()),
            (40 + 2 * PAD, 10 + 2 * PAD)
        );

        let out = artifact.decode_rgba().unwrap();
        for (x, y, px) in out.enumerate_pixels() {
            let inside = (PAD..PAD + 40).contains(&x) && (PAD..PAD + 10).contains(&y);
            assert_eq!(px.0[3] != 0, inside, "pixel ({x},{y})");
        }
    }
}

#[test]
fn partially_transparent_ink_counts() {
    let mut img = image::RgbaImage::new(8, 8);
    img.put_pixel(2, 3, image::Rgba([0, 0, 0, 1]));
    img.put_pixel(5, 6, image::Rgba([0, 0, 0, 200]));

    let b = ink_bounds(&img).unwrap();
    assert_eq!(
        b,
        InkBounds {
            min_x: 2,
            min_y: 3,
            max_x: 5,
            max_y: 6
        }
    );
    assert_eq!((b.width(), b.height()), (4, 4));
}
