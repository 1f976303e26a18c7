use std::io::Cursor;
use std::path::PathBuf;

use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use meter_reader::{
    CapturedImage, Config, FixtureRecognizer, LastKnownReading, MeterProfile, MeterReader,
    Orientation, render_report, settings,
};

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/scenario.json")
}

fn meter_photo() -> Vec<u8> {
    let img = RgbaImage::from_fn(240, 120, |_, y| {
        if (40..80).contains(&y) {
            Rgba([20, 20, 20, 255])
        } else {
            Rgba([240, 240, 230, 255])
        }
    });
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

async fn report_for(last: Option<f64>) -> String {
    let settings = settings::load_settings(None).unwrap();
    let recognizer = FixtureRecognizer::load(&fixture_path()).unwrap();
    let reader = MeterReader::new(recognizer, settings);
    let profile = MeterProfile::new("meter-7", 6, false).unwrap();
    let last = last.map(LastKnownReading::new);
    let capture = CapturedImage::new(meter_photo(), Orientation::Up);
    let result = reader.recognize(capture, &profile, last.as_ref()).await;
    render_report(&result, &profile)
}

#[tokio::test]
async fn report_without_history() {
    let report = report_for(None).await;
    insta::assert_snapshot!(report);
}

#[tokio::test]
async fn report_with_history() {
    let report = report_for(Some(100_000.0)).await;
    insta::assert_snapshot!(report);
}

#[tokio::test]
async fn report_with_implausible_history() {
    let report = report_for(Some(900_000.0)).await;
    insta::assert_snapshot!(report);
}

#[tokio::test]
async fn accept_best_prints_submission() {
    let dir = tempfile::tempdir().unwrap();
    let image = dir.path().join("meter.png");
    std::fs::write(&image, meter_photo()).unwrap();

    let output = meter_reader::run(Config {
        images: vec![image],
        meter_id: "meter-7".to_string(),
        digits: 6,
        last: Some(100_000.0),
        fixture: Some(fixture_path()),
        accept: Some("best".to_string()),
        ..Config::default()
    })
    .await
    .unwrap();

    let reading: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(reading["meter_id"], "meter-7");
    assert_eq!(reading["value"], "123456");
    assert_eq!(reading["source"], "best");
    assert_eq!(reading["implausible_fallback"], false);
    assert_eq!(reading["image_hash"].as_str().unwrap().len(), 32);
}

#[tokio::test]
async fn consensus_over_repeated_frames() {
    let dir = tempfile::tempdir().unwrap();
    let mut images = Vec::new();
    for index in 0..4 {
        let path = dir.path().join(format!("frame-{index}.png"));
        std::fs::write(&path, meter_photo()).unwrap();
        images.push(path);
    }

    let output = meter_reader::run(Config {
        images,
        meter_id: "meter-7".to_string(),
        digits: 6,
        fixture: Some(fixture_path()),
        consensus: true,
        ..Config::default()
    })
    .await
    .unwrap();

    assert_eq!(output, "consensus: 123456 after 3 frame(s)");
}
