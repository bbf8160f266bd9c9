//! End-to-end batch tests
//!
//! These tests run whole batches against generated sheets, with a scripted
//! label provider standing in for the OCR engine.

use image::{Rgba, RgbaImage};
use spritesplit::index::SpriteIndex;
use spritesplit::matcher::Evidence;
use spritesplit::ocr::{Label, LabelExtractor, LabelProvider, NoOcr, OcrError};
use spritesplit::pipeline::{run_batch, BatchError, BatchInputs, BatchOptions, BatchReport};
use spritesplit::progress::NullProgress;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Returns the same words for every image.
struct Scripted(Vec<Label>);

impl LabelProvider for Scripted {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn labels(&self, _image: &Path) -> Result<Vec<Label>, OcrError> {
        Ok(self.0.clone())
    }
}

fn fill(img: &mut RgbaImage, x0: u32, y0: u32, w: u32, h: u32) {
    for y in y0..y0 + h {
        for x in x0..x0 + w {
            img.put_pixel(x, y, Rgba([90, 160, 220, 255]));
        }
    }
}

/// Sheet with three sprites on one row:
/// a 40x20 bed at (10,10), a 20x40 lamp at (150,10), a 30x30 chair at (300,10).
fn three_item_sheet() -> RgbaImage {
    let mut sheet = RgbaImage::new(400, 200);
    fill(&mut sheet, 10, 10, 40, 20);
    fill(&mut sheet, 150, 10, 20, 40);
    fill(&mut sheet, 300, 10, 30, 30);
    sheet
}

fn write_batch(root: &Path, batch: &str, prompt: &str, sheet: &RgbaImage) -> BatchInputs {
    let dir = root.join("ingredient").join(batch);
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("prompt.txt"), prompt).unwrap();
    RgbaImage::from_pixel(16, 16, Rgba([255, 255, 255, 255])).save(dir.join("origin.png")).unwrap();
    sheet.save(dir.join("renew.png")).unwrap();

    BatchInputs {
        prompt: dir.join("prompt.txt"),
        origin: dir.join("origin.png"),
        renew: dir.join("renew.png"),
        output: root.join("assets"),
    }
}

fn run_with(
    inputs: &BatchInputs,
    provider: Box<dyn LabelProvider>,
) -> Result<BatchReport, BatchError> {
    let extractor = LabelExtractor::new(provider, 0.3);
    run_batch(inputs, &BatchOptions::default(), &extractor, &NullProgress::new())
}

fn files(report: &BatchReport) -> Vec<&str> {
    report.new_files().collect()
}

const PROMPT: &str = "Items for this sheet:\n1. Hospital Bed\n2. Lamp (tall)\n3. Office Chair\n";

fn hospital_labels() -> Vec<Label> {
    vec![
        Label::new("Hospital", 20, 60, 0.9),
        Label::new("Beds", 55, 62, 0.8),
        Label::new("Lamp", 160, 80, 0.95),
        Label::new("~", 300, 150, 0.1),
    ]
}

#[test]
fn test_ocr_names_with_prompt_fallback() {
    let temp = TempDir::new().unwrap();
    let inputs = write_batch(temp.path(), "batch1", PROMPT, &three_item_sheet());

    let report = run_with(&inputs, Box::new(Scripted(hospital_labels()))).unwrap();

    assert_eq!(report.batch, "batch1");
    assert_eq!(report.backend, "scripted");
    // "Hospital" + "Beds" merge; the low-confidence "~" is dropped
    assert_eq!(report.labels, 2);
    assert_eq!(
        files(&report),
        vec!["hospitalbed_1_64x32.png", "lamp_1_32x64.png", "officechair_1_32x32.png"]
    );

    let evidence: Vec<&Evidence> = report.saved.iter().map(|s| &s.evidence).collect();
    assert_eq!(evidence[0], &Evidence::Ocr("Hospital Beds".to_string()));
    assert_eq!(evidence[1], &Evidence::Ocr("Lamp".to_string()));
    assert_eq!(evidence[2], &Evidence::Fallback);

    for file in files(&report) {
        assert!(inputs.output.join(file).exists(), "{} should be written", file);
    }
}

#[test]
fn test_written_sprite_is_centered_on_canvas() {
    let temp = TempDir::new().unwrap();
    let inputs = write_batch(temp.path(), "batch1", PROMPT, &three_item_sheet());
    run_with(&inputs, Box::new(NoOcr)).unwrap();

    let img = image::open(inputs.output.join("officechair_1_32x32.png")).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (32, 32));
    // 30x30 sprite padded by one pixel on each side
    assert_eq!(img.get_pixel(0, 0).0[3], 0);
    assert_eq!(img.get_pixel(1, 1).0[3], 255);
    assert_eq!(img.get_pixel(30, 30).0[3], 255);
    assert_eq!(img.get_pixel(31, 31).0[3], 0);
}

#[test]
fn test_ocr_text_outside_prompt_is_used_verbatim() {
    let temp = TempDir::new().unwrap();
    let inputs = write_batch(temp.path(), "batch1", PROMPT, &three_item_sheet());

    let labels = vec![Label::new("Sofas", 30, 60, 0.9)];
    let report = run_with(&inputs, Box::new(Scripted(labels))).unwrap();

    let names: Vec<&str> = report.saved.iter().map(|s| s.name.as_str()).collect();
    // The sofa claims nothing, so the remaining sprites take the whole prompt in order
    assert_eq!(names, vec!["sofa", "hospitalbed", "lamp"]);
}

#[test]
fn test_labels_out_of_range_are_ignored() {
    let temp = TempDir::new().unwrap();
    let inputs = write_batch(temp.path(), "batch1", PROMPT, &three_item_sheet());

    let labels = vec![Label::new("Lamp", 390, 195, 0.9)];
    let report = run_with(&inputs, Box::new(Scripted(labels))).unwrap();

    // (390,195) is within 200px of the chair only
    let names: Vec<&str> = report.saved.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["hospitalbed", "officechair", "lamp"]);
    assert_eq!(report.saved[2].evidence, Evidence::Ocr("Lamp".to_string()));
}

#[test]
fn test_no_labels_more_sprites_than_names() {
    let temp = TempDir::new().unwrap();
    let inputs = write_batch(temp.path(), "batch1", "- Bed\n", &three_item_sheet());

    let report = run_with(&inputs, Box::new(NoOcr)).unwrap();

    assert_eq!(report.backend, "none");
    assert_eq!(
        files(&report),
        vec!["bed_1_64x32.png", "unknown2_1_32x64.png", "unknown3_1_32x32.png"]
    );
    assert_eq!(report.saved[1].evidence, Evidence::NoPrompt);
}

#[test]
fn test_repeated_batch_appends() {
    let temp = TempDir::new().unwrap();
    let first = write_batch(temp.path(), "batch1", PROMPT, &three_item_sheet());
    let second = write_batch(temp.path(), "batch2", PROMPT, &three_item_sheet());

    run_with(&first, Box::new(NoOcr)).unwrap();
    let report = run_with(&second, Box::new(NoOcr)).unwrap();

    assert_eq!(
        files(&report),
        vec!["hospitalbed_2_64x32.png", "lamp_2_32x64.png", "officechair_2_32x32.png"]
    );
    assert_eq!(report.total_files, 6);

    let index = SpriteIndex::load(&report.index_path).unwrap().unwrap();
    assert_eq!(index.count("hospitalbed"), 2);
    assert_eq!(index.count("lamp"), 2);
    assert_eq!(index.meta.total_sprites, 6);
    assert!(index.files.contains("lamp_1_32x64.png"));
    assert!(index.files.contains("lamp_2_32x64.png"));

    let batches: Vec<&str> = index.meta.sources.iter().map(|s| s.batch.as_str()).collect();
    assert_eq!(batches, vec!["batch1", "batch2"]);
    assert!(index.verify().is_empty());
}

#[test]
fn test_same_name_twice_in_one_batch() {
    let temp = TempDir::new().unwrap();
    let prompt = "1. Crate\n2. Crates\n3. crate\n";
    let inputs = write_batch(temp.path(), "batch1", prompt, &three_item_sheet());

    let report = run_with(&inputs, Box::new(NoOcr)).unwrap();
    assert_eq!(
        files(&report),
        vec!["crate_1_64x32.png", "crate_2_32x64.png", "crate_3_32x32.png"]
    );
}

#[test]
fn test_opaque_sheet_yields_empty_batch() {
    let temp = TempDir::new().unwrap();
    let sheet = RgbaImage::from_pixel(64, 64, Rgba([10, 10, 10, 255]));
    let inputs = write_batch(temp.path(), "batch1", PROMPT, &sheet);

    let report = run_with(&inputs, Box::new(NoOcr)).unwrap();
    assert!(report.saved.is_empty());

    let index = SpriteIndex::load(&report.index_path).unwrap().unwrap();
    assert_eq!(index.meta.sources.len(), 1);
    assert_eq!(index.meta.sources[0].sprites, 0);
}

#[test]
fn test_custom_index_file() {
    let temp = TempDir::new().unwrap();
    let inputs = write_batch(temp.path(), "batch1", PROMPT, &three_item_sheet());

    let options = BatchOptions { index_file: "catalog.json".to_string(), ..Default::default() };
    let extractor = LabelExtractor::new(Box::new(NoOcr), 0.3);
    let report = run_batch(&inputs, &options, &extractor, &NullProgress::new()).unwrap();

    assert_eq!(report.index_path, inputs.output.join("catalog.json"));
    assert!(report.index_path.exists());
    assert!(!inputs.output.join("sprite_index.json").exists());
}

#[test]
fn test_missing_prompt_is_fatal() {
    let temp = TempDir::new().unwrap();
    let mut inputs = write_batch(temp.path(), "batch1", PROMPT, &three_item_sheet());
    inputs.prompt = temp.path().join("nope.txt");

    let err = run_with(&inputs, Box::new(NoOcr)).unwrap_err();
    assert!(matches!(err, BatchError::MissingInput { kind: "Prompt", .. }));
    assert!(!inputs.output.exists());
}
