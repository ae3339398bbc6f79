use super::*;

fn dot_raster() -> image::RgbaImage {
    let mut img = image::RgbaImage::new(3, 2);
    img.put_pixel(1, 1, image::Rgba([10, 20, 30, 255]));
    img
}

#[test]
fn encode_png_keeps_dimensions_and_transparency() {
    let artifact = ImageArtifact::encode_png(&dot_raster()).unwrap();
    assert_eq!(artifact.mime_type(), "image/png");
    assert_eq!((artifact.width(), artifact.height()), (3, 2));

    let decoded = artifact.decode_rgba().unwrap();
    assert_eq!(decoded.get_pixel(0, 0).0[3], 0);
    assert_eq!(decoded.get_pixel(1, 1).0, [10, 20, 30, 255]);
}

#[test]
fn data_uri_carries_mime_and_payload() {
    let artifact = ImageArtifact::encode_png(&dot_raster()).unwrap();
    let uri = artifact.to_data_uri();
    assert!(uri.starts_with("data:image/png;base64,"));
    assert!(is_image_payload(&uri));

    let back = ImageArtifact::from_data_uri(&uri).unwrap();
    assert_eq!(back, artifact);
}

#[test]
fn from_data_uri_rejects_non_images() {
    assert!(ImageArtifact::from_data_uri("hello").is_err());
    assert!(ImageArtifact::from_data_uri("data:text/plain;base64,aGk=").is_err());
    assert!(ImageArtifact::from_data_uri("data:image/png,raw").is_err());
    assert!(ImageArtifact::from_data_uri("data:image/png;base64,!!!").is_err());
    // Valid base64 that is not an image.
    assert!(ImageArtifact::from_data_uri("data:image/png;base64,aGVsbG8=").is_err());
}

#[test]
fn encode_rejects_empty_raster() {
    let empty = image::RgbaImage::new(0, 0);
    assert!(matches!(
        ImageArtifact::encode_png(&empty),
        Err(FieldinkError::Encode(_))
    ));
}

#[test]
fn serde_uses_data_uri_string() {
    let artifact = ImageArtifact::encode_png(&dot_raster()).unwrap();
    let json = serde_json::to_string(&artifact).unwrap();
    assert!(json.starts_with("\"data:image/png;base64,"));
    let back: ImageArtifact = serde_json::from_str(&json).unwrap();
    assert_eq!(back.width(), 3);
}
