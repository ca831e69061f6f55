//! End-to-end tests on synthetic sprite sheets.
//!
//! Sheets are built at 1/16 scale: 16 px face tiles stand in for 256 px ones
//! and 10 rows of padding for 150.

use image::{Rgb, RgbImage};
use sprite_faces::{
    annotate_sheets, load_sheets, save_sheets, AnalyzerConfig, BatchOptions, Error, LayoutKind,
    SheetAnalyzer, SheetAnalyzerBuilder, SheetDescriptor, SheetGeometry, SheetOutcome,
};
use std::path::PathBuf;

const DIM: u32 = 16;
const PADDING: u32 = 10;

const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
/// Face tiles.
const FACE: Rgb<u8> = Rgb([200, 0, 0]);
/// Body artwork. Its correlation with `FACE` is 200 / sqrt(200² + 100²),
/// about 0.894: below the face threshold, above the face-on-body threshold.
const BODY: Rgb<u8> = Rgb([200, 100, 0]);

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn scaled_analyzer() -> SheetAnalyzer {
    SheetAnalyzerBuilder::new()
        .min_face_dimension(DIM)
        .padding_top(PADDING)
        .build()
        .expect("valid configuration")
}

/// Build a sheet from a grid of `DIM`-sized cells, top row first.
fn sheet(cells: &[&[Rgb<u8>]]) -> RgbImage {
    let rows = cells.len() as u32;
    let cols = cells[0].len() as u32;
    RgbImage::from_fn(cols * DIM, rows * DIM, |x, y| {
        cells[(y / DIM) as usize][(x / DIM) as usize]
    })
}

/// Body on top, two identical faces bottom-left and bottom-center.
fn body_with_face_row() -> RgbImage {
    sheet(&[&[BODY, BODY, BODY], &[FACE, FACE, BLACK]])
}

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("sprite_faces_{}", name));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn face_row_below_body() {
    init_logging();
    let geometry = scaled_analyzer().analyze(&body_with_face_row());

    assert_eq!(geometry.layout, LayoutKind::Normal);
    assert_eq!(geometry.face_dimension, Some(DIM));
    assert_eq!(geometry.body_height, DIM);
    assert_eq!(geometry.body_width, 3 * DIM);
    assert_eq!(geometry.reference_face_x, Some(0));
    assert_eq!(geometry.reference_face_y, Some(0));
    assert_eq!(geometry.dialog_offset_x, Some(0));
    assert!(geometry.certainty > 0.9, "certainty {}", geometry.certainty);
    assert!(geometry.certainty <= 1.0);
}

#[test]
fn two_face_rows_below_body() {
    init_logging();
    let img = sheet(&[
        &[BODY, BODY, BODY],
        &[FACE, BLACK, BLACK],
        &[FACE, FACE, BLACK],
    ]);
    let geometry = scaled_analyzer().analyze(&img);

    assert_eq!(geometry.layout, LayoutKind::Normal);
    assert_eq!(geometry.face_dimension, Some(DIM));
    assert_eq!(geometry.body_height, DIM);
    assert!(geometry.body_height < img.height());
}

#[test]
fn face_only_sheet_spans_the_full_height() {
    init_logging();
    // Every strip of the left column is a face, so no body edge is found.
    let img = RgbImage::from_pixel(3 * DIM, 3 * DIM, FACE);
    let geometry = scaled_analyzer().analyze(&img);

    assert_eq!(geometry.layout, LayoutKind::Normal);
    assert_eq!(geometry.face_dimension, Some(DIM));
    assert_eq!(geometry.body_height, 3 * DIM);
    assert_eq!(geometry.body_width, 3 * DIM);
    assert_eq!(geometry.reference_face_x, Some(0));
    assert_eq!(geometry.reference_face_y, Some(0));
    assert!((geometry.certainty - 1.0).abs() < 1e-9, "certainty {}", geometry.certainty);
}

#[test]
fn all_black_sheet_is_full_body() {
    init_logging();
    let img = RgbImage::new(512, 512);
    let geometry = SheetAnalyzer::default().analyze(&img);

    assert_eq!(geometry, SheetGeometry::full_body(512, 512));
}

#[test]
fn sheets_below_two_tiles_are_full_body() {
    init_logging();
    // 31 px wide: two 16 px tiles never fit side by side.
    let img = RgbImage::from_fn(31, 64, |x, _| if x < 16 { FACE } else { BODY });
    let geometry = scaled_analyzer().analyze(&img);

    assert_eq!(geometry.layout, LayoutKind::FullBody);
    assert_eq!(geometry.certainty, 0.0);
    assert_eq!(geometry.body_height, 64);
    assert_eq!(geometry.body_width, 31);
}

#[test]
fn dissimilar_bottom_tiles_are_full_body() {
    init_logging();
    let img = sheet(&[&[BODY, BODY, BODY], &[FACE, Rgb([0, 0, 200]), BLACK]]);
    let geometry = scaled_analyzer().analyze(&img);

    assert_eq!(geometry.layout, LayoutKind::FullBody);
    assert_eq!(geometry.body_height, 2 * DIM);
}

#[test]
fn analyze_path_matches_in_memory_analysis() {
    init_logging();
    let dir = temp_dir("analyze_path");
    let path = dir.join("sheet.png");
    let img = body_with_face_row();
    img.save(&path).unwrap();

    let analyzer = scaled_analyzer();
    assert_eq!(analyzer.analyze_path(&path).unwrap(), analyzer.analyze(&img));

    std::fs::remove_dir_all(dir).ok();
}

#[test]
fn batch_annotation_is_idempotent() {
    init_logging();
    let dir = temp_dir("batch_idempotent");
    body_with_face_row().save(dir.join("faces.png")).unwrap();
    RgbImage::new(48, 48).save(dir.join("black.png")).unwrap();

    let data = dir.join("sheets.json");
    std::fs::write(
        &data,
        r#"[{"path":"faces.png","description":"Stage 1","approved":0},{"path":"black.png"}]"#,
    )
    .unwrap();

    let analyzer = scaled_analyzer();
    let options = BatchOptions {
        base_dir: Some(dir.clone()),
        ..BatchOptions::default()
    };

    let mut sheets = load_sheets(&data).unwrap();
    let outcomes = annotate_sheets(&analyzer, &mut sheets, &options).unwrap();
    save_sheets(&data, &sheets, false).unwrap();
    let first = std::fs::read_to_string(&data).unwrap();

    assert!(matches!(&outcomes[0], SheetOutcome::Annotated(g) if g.layout == LayoutKind::Normal));
    assert!(matches!(&outcomes[1], SheetOutcome::Annotated(g) if g.layout == LayoutKind::FullBody));
    assert!(sheets[0].has_expressions());
    assert!(!sheets[1].has_expressions());
    assert_eq!(sheets[0].fields["description"], "Stage 1");
    assert_eq!(sheets[0].fields["eWidth"], 16);
    assert_eq!(sheets[1].fields["specialFormat"], 1);

    let mut again = load_sheets(&data).unwrap();
    annotate_sheets(&analyzer, &mut again, &options).unwrap();
    save_sheets(&data, &again, false).unwrap();
    let second = std::fs::read_to_string(&data).unwrap();

    assert_eq!(first, second);
    std::fs::remove_dir_all(dir).ok();
}

#[test]
fn parallel_batches_match_sequential_ones() {
    init_logging();
    let dir = temp_dir("batch_parallel");
    let images = [
        body_with_face_row(),
        sheet(&[&[BODY, BODY, BODY], &[FACE, BLACK, BLACK], &[FACE, FACE, BLACK]]),
        RgbImage::from_pixel(40, 40, BODY),
        RgbImage::new(64, 64),
    ];
    let mut sheets = Vec::new();
    for (i, img) in images.iter().enumerate() {
        let path = dir.join(format!("sheet{}.png", i));
        img.save(&path).unwrap();
        sheets.push(SheetDescriptor::new(path));
    }

    let analyzer = scaled_analyzer();
    let mut sequential = sheets.clone();
    annotate_sheets(&analyzer, &mut sequential, &BatchOptions::default()).unwrap();

    let mut parallel = sheets;
    let options = BatchOptions {
        jobs: 3,
        ..BatchOptions::default()
    };
    annotate_sheets(&analyzer, &mut parallel, &options).unwrap();

    assert_eq!(sequential, parallel);
    std::fs::remove_dir_all(dir).ok();
}

#[test]
fn unreadable_images_abort_the_batch() {
    init_logging();
    let dir = temp_dir("batch_decode_error");
    let good = dir.join("good.png");
    body_with_face_row().save(&good).unwrap();
    let broken = dir.join("broken.png");
    std::fs::write(&broken, b"not an image").unwrap();

    let mut sheets = vec![SheetDescriptor::new(good), SheetDescriptor::new(broken.clone())];
    let result = annotate_sheets(&scaled_analyzer(), &mut sheets, &BatchOptions::default());

    match result {
        Err(Error::Decode { path, .. }) => assert_eq!(path, broken),
        other => panic!("expected decode error, got {:?}", other),
    }
    std::fs::remove_dir_all(dir).ok();
}

#[test]
fn config_file_drives_the_analyzer() {
    init_logging();
    let dir = temp_dir("config_file");
    let path = dir.join("config.json");
    std::fs::write(&path, r#"{ "minFaceDimension": 16, "paddingTop": 10 }"#).unwrap();

    let config = AnalyzerConfig::load(&path).unwrap();
    let analyzer = SheetAnalyzerBuilder::new().config(config).build().unwrap();
    assert_eq!(
        analyzer.analyze(&body_with_face_row()),
        scaled_analyzer().analyze(&body_with_face_row())
    );
    std::fs::remove_dir_all(dir).ok();
}
