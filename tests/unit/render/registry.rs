use super::*;

fn artifact(w: u32, h: u32) -> ImageArtifact {
    let mut img = image::RgbaImage::new(w, h);
    img.put_pixel(0, 0, image::Rgba([0, 0, 0, 255]));
    ImageArtifact::encode_png(&img).unwrap()
}

fn geometry() -> FieldGeometry {
    FieldGeometry {
        page: 1,
        rect: Rect::new(100.0, 200.0, 300.0, 250.0),
    }
}

#[test]
fn text_field_with_image_value_draws_centered_image() {
    let registry = RendererRegistry::with_defaults();
    let value = FieldValue::Image(artifact(20, 10));

    let Drawable::Image { rect, image } = registry.render(FieldType::Text, &value, &geometry())
    else {
        panic!("expected an image drawable");
    };
    assert_eq!(rect, Rect::new(150.0, 200.0, 250.0, 250.0));
    assert_eq!((image.width(), image.height()), (20, 10));
}

#[test]
fn text_field_with_text_value_draws_text() {
    let registry = RendererRegistry::with_defaults();
    let d = registry.render(
        FieldType::Text,
        &FieldValue::Text("Jane Doe".to_string()),
        &geometry(),
    );
    assert_eq!(
        d,
        Drawable::Text {
            rect: geometry().rect,
            content: "Jane Doe".to_string()
        }
    );
}

#[test]
fn unknown_and_unregistered_types_draw_nothing() {
    let mut registry = RendererRegistry::with_defaults();
    let value = FieldValue::Text("x".to_string());
    assert_eq!(
        registry.render(FieldType::Unknown, &value, &geometry()),
        Drawable::Nothing
    );

    assert!(registry.unregister(FieldType::Barcode));
    assert!(!registry.has(FieldType::Barcode));
    assert_eq!(
        registry.render(FieldType::Barcode, &value, &geometry()),
        Drawable::Nothing
    );
}

#[test]
fn signature_without_renderer_falls_back_to_centered_image() {
    let registry = RendererRegistry::empty();
    assert!(!registry.has(FieldType::Signature));

    let value = FieldValue::Image(artifact(40, 10));
    let d = registry.render(FieldType::Signature, &value, &geometry());
    assert!(matches!(d, Drawable::Image { rect, .. } if rect == geometry().rect));

    // A text value has nothing to place.
    let d = registry.render(
        FieldType::Signature,
        &FieldValue::Text("n/a".to_string()),
        &geometry(),
    );
    assert_eq!(d, Drawable::Nothing);
}

#[test]
fn registered_renderer_overrides_defaults() {
    let mut registry = RendererRegistry::empty();
    registry.register(FieldType::Signature, |_, g: &FieldGeometry| Drawable::Shape {
        rect: g.rect,
        rgba: [255, 0, 0, 255],
    });
    let d = registry.render(
        FieldType::Signature,
        &FieldValue::Image(artifact(4, 4)),
        &geometry(),
    );
    assert!(matches!(d, Drawable::Shape { rgba: [255, 0, 0, 255], .. }));
}

#[test]
fn text_fallback_uses_registered_image_renderer() {
    let mut registry = RendererRegistry::empty();
    registry.register(FieldType::Image, |_, _: &FieldGeometry| Drawable::Barcode {
        rect: Rect::ZERO,
        data: "custom".to_string(),
    });
    let d = registry.render(FieldType::Text, &FieldValue::Image(artifact(4, 4)), &geometry());
    assert!(matches!(d, Drawable::Barcode { ref data, .. } if data == "custom"));
}

#[test]
fn shape_color_parses_hex() {
    assert_eq!(parse_hex_rgba("#ff8000"), Some([255, 128, 0, 255]));
    assert_eq!(parse_hex_rgba("#ff800080"), Some([255, 128, 0, 128]));
    assert_eq!(parse_hex_rgba("red"), None);
    let d = render_shape(&FieldValue::Text(String::new()), &geometry());
    assert!(matches!(d, Drawable::Shape { rgba: [0, 0, 0, 255], .. }));
}

#[test]
fn text_field_with_gif_value_draws_image_not_text() {
    let registry = RendererRegistry::with_defaults();
    let value = FieldValue::ingest(
        "data:image/gif;base64,R0lGODlhAQABAIAAAAAAAP///yH5BAEAAAAALAAAAAABAAEAAAIBRAA7",
    );
    let d = registry.render(FieldType::Text, &value, &geometry());
    // 1x1 image in a 200x50 slot: a 50x50 square centered horizontally.
    assert_eq!(
        d,
        Drawable::Image {
            rect: Rect::new(175.0, 200.0, 225.0, 250.0),
            image: value.as_image().unwrap().clone(),
        }
    );
}
