use std::io::Cursor;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;

use super::*;
use crate::document::assemble::RenderedKind;
use crate::remote::mock::MockModelClient;
use crate::remote::wire::GenerateContentResponse;

const ANALYSIS: &str = "analysis-model";
const EXTRACTION: &str = "extraction-model";

const LAYERS_JSON: &str = r##"[
  {"name":"Background","description":"blue sky","type":"image",
   "boundingBox":{"x":0,"y":0,"width":1,"height":1}},
  {"name":"Title","description":"\"Hello\" in #FF0000","type":"text",
   "boundingBox":{"x":0.1,"y":0,"width":0.8,"height":0.25}},
  {"name":"Logo","description":"round logo","type":"image",
   "boundingBox":{"x":0.5,"y":0.5,"width":0.25,"height":0.25}}
]"##;

fn png(width: u32, height: u32, px: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba(px));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn source() -> SourceImage {
    SourceImage::sniffed(png(8, 8, [0, 0, 255, 255])).unwrap()
}

fn scripted() -> MockModelClient {
    let cutout = png(2, 2, [255, 255, 255, 255]);
    MockModelClient::new(move |model, _| match model {
        ANALYSIS => Ok(GenerateContentResponse::from_text(LAYERS_JSON)),
        _ => Ok(GenerateContentResponse::from_inline_image("image/png", &cutout)),
    })
}

fn session(client: MockModelClient) -> Session<MockModelClient> {
    Session::with_models(client, ANALYSIS, EXTRACTION, source())
}

#[test]
fn sniffed_source_reports_png() {
    assert_eq!(source().mime_type, "image/png");
    assert!(SourceImage::sniffed(vec![1u8, 2, 3]).is_err());
}

#[test]
fn analyze_stores_layers_in_model_order() {
    let s = session(scripted());
    assert!(s.layers().is_none());
    let layers = s.analyze().unwrap();
    let names: Vec<&str> = layers.iter().map(|l| l.name.as_str()).collect();
    assert_eq!(names, vec!["Background", "Title", "Logo"]);
    assert_eq!(s.layers().unwrap().len(), 3);
    assert_eq!(s.client().models_called(), vec![ANALYSIS.to_owned()]);
}

#[test]
fn second_extract_is_served_from_cache() {
    let s = session(scripted());
    s.analyze().unwrap();

    let first = s.extract(2).unwrap();
    assert_eq!(s.client().call_count(), 2);
    assert_eq!(s.extraction_status(2), ExtractionStatus::Extracted);

    let second = s.extract(2).unwrap();
    assert_eq!(s.client().call_count(), 2);
    assert_eq!(first, second);
    assert_eq!(s.cached(2), Some(first));
}

#[test]
fn extract_requires_analysis_and_a_valid_index() {
    let s = session(scripted());
    assert!(matches!(s.extract(0), Err(LayercraftError::Validation(_))));
    s.analyze().unwrap();
    let err = s.extract(3).unwrap_err();
    assert!(err.to_string().contains("out of range"));
    assert_eq!(s.client().call_count(), 1);
}

#[test]
fn failed_extraction_can_be_retried() {
    let attempts = AtomicUsize::new(0);
    let cutout = png(2, 2, [9, 9, 9, 255]);
    let client = MockModelClient::new(move |model, _| {
        if model == ANALYSIS {
            return Ok(GenerateContentResponse::from_text(LAYERS_JSON));
        }
        if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(LayercraftError::remote_service("503 unavailable"));
        }
        Ok(GenerateContentResponse::from_inline_image("image/png", &cutout))
    });
    let s = session(client);
    s.analyze().unwrap();

    assert!(matches!(s.extract(0), Err(LayercraftError::RemoteService(_))));
    assert_eq!(s.extraction_status(0), ExtractionStatus::NotExtracted);
    assert!(s.extract(0).is_ok());
    assert_eq!(s.extraction_status(0), ExtractionStatus::Extracted);
}

#[test]
fn failed_analysis_returns_to_pre_analysis_state() {
    let calls = AtomicUsize::new(0);
    let cutout = png(2, 2, [9, 9, 9, 255]);
    let client = MockModelClient::new(move |model, _| {
        if model != ANALYSIS {
            return Ok(GenerateContentResponse::from_inline_image("image/png", &cutout));
        }
        if calls.fetch_add(1, Ordering::SeqCst) == 0 {
            Ok(GenerateContentResponse::from_text(LAYERS_JSON))
        } else {
            Ok(GenerateContentResponse::from_text(r#"[{"name":"Partial"}]"#))
        }
    });
    let s = session(client);
    s.analyze().unwrap();
    s.extract(0).unwrap();

    assert!(matches!(s.analyze(), Err(LayercraftError::SchemaViolation(_))));
    assert!(s.layers().is_none());
    assert_eq!(s.extraction_status(0), ExtractionStatus::NotExtracted);
    assert!(s.export(&AssembleOpts::default()).is_err());
}

#[test]
fn extract_many_keeps_request_order_and_isolates_failures() {
    let s = session(scripted());
    s.analyze().unwrap();

    let results = s.extract_many(&[2, 7, 0], Some(2)).unwrap();
    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(results[1].is_err());
    assert!(results[2].is_ok());
    assert_eq!(s.extraction_status(0), ExtractionStatus::Extracted);
    assert_eq!(s.extraction_status(1), ExtractionStatus::NotExtracted);
    assert_eq!(s.extraction_status(2), ExtractionStatus::Extracted);
}

#[test]
fn extract_many_rejects_duplicates_and_zero_threads() {
    let s = session(scripted());
    s.analyze().unwrap();
    assert!(s.extract_many(&[1, 1], None).is_err());
    assert!(s.extract_many(&[1], Some(0)).is_err());
    assert_eq!(s.client().call_count(), 1);
}

#[test]
fn extract_images_only_touches_image_layers() {
    let s = session(scripted());
    s.analyze().unwrap();
    let done = s.extract_images(None).unwrap();
    let indices: Vec<usize> = done.iter().map(|(i, _)| *i).collect();
    assert_eq!(indices, vec![0, 2]);
    assert!(done.iter().all(|(_, r)| r.is_ok()));
    assert_eq!(s.extraction_status(1), ExtractionStatus::NotExtracted);

    // Nothing left to do on a second pass.
    assert!(s.extract_images(None).unwrap().is_empty());
    assert_eq!(s.client().call_count(), 3);
}

#[test]
fn export_uses_cached_cutouts_and_leaves_state_alone() {
    let s = session(scripted());
    s.analyze().unwrap();
    s.extract(2).unwrap();

    let doc = s.export(&AssembleOpts::default()).unwrap();
    assert_eq!(&doc.bytes[0..4], b"8BPS");
    let kinds: Vec<RenderedKind> = doc.layers.iter().map(|l| l.kind).collect();
    assert_eq!(
        kinds,
        vec![
            RenderedKind::Cutout,
            RenderedKind::Guide(LayerCategory::Text),
            RenderedKind::Guide(LayerCategory::Image),
            RenderedKind::Source,
        ]
    );
    assert_eq!(s.layers().unwrap().len(), 3);
    assert_eq!(s.extraction_status(2), ExtractionStatus::Extracted);
}

#[test]
fn reset_during_extraction_discards_the_late_response() {
    let (started_tx, started_rx) = mpsc::channel::<()>();
    let (go_tx, go_rx) = mpsc::channel::<()>();
    let started_tx = Mutex::new(started_tx);
    let go_rx = Mutex::new(go_rx);
    let cutout = png(2, 2, [1, 2, 3, 255]);
    let client = MockModelClient::new(move |model, _| {
        if model == ANALYSIS {
            return Ok(GenerateContentResponse::from_text(LAYERS_JSON));
        }
        started_tx.lock().unwrap().send(()).unwrap();
        go_rx.lock().unwrap().recv().unwrap();
        Ok(GenerateContentResponse::from_inline_image("image/png", &cutout))
    });
    let s = session(client);
    s.analyze().unwrap();

    std::thread::scope(|scope| {
        let worker = scope.spawn(|| s.extract(0));
        started_rx.recv().unwrap();

        assert_eq!(s.extraction_status(0), ExtractionStatus::Extracting);
        let err = s.export(&AssembleOpts::default()).unwrap_err();
        assert!(err.to_string().contains("in flight"));

        s.reset();
        go_tx.send(()).unwrap();
        let result = worker.join().unwrap();
        assert!(result.unwrap_err().to_string().contains("discarded"));
    });

    assert!(s.layers().is_none());
    assert_eq!(s.extraction_status(0), ExtractionStatus::NotExtracted);
}

#[test]
fn reset_waits_for_layer_readers_before_invalidating_tickets() {
    let s = session(scripted());
    s.analyze().unwrap();
    s.extract(0).unwrap();

    std::thread::scope(|scope| {
        // A reader pairing layers with the cache holds the guard, as `extract` does while it
        // looks up the layer and claims its slot.
        let guard = s.read_layers();
        let resetter = scope.spawn(|| s.reset());

        std::thread::sleep(std::time::Duration::from_millis(50));
        assert_eq!(s.extraction_status(0), ExtractionStatus::Extracted);
        assert!(guard.is_some());

        drop(guard);
        resetter.join().unwrap();
    });

    assert!(s.layers().is_none());
    assert_eq!(s.extraction_status(0), ExtractionStatus::NotExtracted);
}

#[test]
fn ticket_claimed_before_reanalysis_cannot_fill_the_new_layer_set() {
    let s = session(scripted());
    s.analyze().unwrap();

    let BeginExtraction::Started(ticket) = s.cache.begin(0).unwrap() else {
        panic!("expected a fresh ticket");
    };
    s.analyze().unwrap();

    assert!(!ticket.complete(ExtractedImage::new("image/png", png(1, 1, [0, 0, 0, 255]))));
    assert_eq!(s.extraction_status(0), ExtractionStatus::NotExtracted);
}
