use super::*;

#[test]
fn layer_json_uses_model_field_names() {
    let layer = Layer::new(
        "Sky",
        "Clear blue sky",
        LayerCategory::Shape,
        BoundingBox::new(0.0, 0.0, 1.0, 0.3),
    );
    let v = serde_json::to_value(&layer).unwrap();
    assert_eq!(v["type"], "shape");
    assert_eq!(v["boundingBox"]["height"], 0.3);
    assert!(v.get("category").is_none());

    let back: Layer = serde_json::from_value(v).unwrap();
    assert_eq!(back, layer);
}

#[test]
fn category_rejects_values_outside_the_enumeration() {
    let err = serde_json::from_str::<LayerCategory>("\"background\"");
    assert!(err.is_err());
    assert_eq!(
        serde_json::from_str::<LayerCategory>("\"text\"").unwrap(),
        LayerCategory::Text
    );
}

#[test]
fn tags_are_upper_case() {
    let tags: Vec<_> = LayerCategory::ALL.iter().map(|c| c.tag()).collect();
    assert_eq!(tags, vec!["IMAGE", "SHAPE", "TEXT"]);
}

#[test]
fn within_unit_detects_overflow() {
    assert!(BoundingBox::new(0.1, 0.1, 0.9, 0.9).is_within_unit());
    assert!(!BoundingBox::new(0.5, 0.0, 0.6, 0.1).is_within_unit());
    assert!(!BoundingBox::new(-0.1, 0.0, 0.5, 0.1).is_within_unit());
}

#[test]
fn text_colors_only_for_text_layers() {
    let bbox = BoundingBox::new(0.1, 0.1, 0.2, 0.1);
    let text = Layer::new("Title", "'Hello' in #FFFFFF", LayerCategory::Text, bbox);
    let shape = Layer::new("Badge", "Circle filled #FFFFFF", LayerCategory::Shape, bbox);
    assert_eq!(text.text_colors().len(), 1);
    assert!(shape.text_colors().is_empty());
}
