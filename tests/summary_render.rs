use ccx_rs::summary::{self, SummaryData};
use chrono::{TimeZone, Utc};
use std::fs;
use tempfile::tempdir;

const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

fn sample() -> SummaryData {
    SummaryData {
        total_countries: 250,
        last_refreshed_at: Some(Utc.with_ymd_and_hms(2025, 10, 22, 14, 5, 9).unwrap()),
        top: vec![
            ("United States of America".into(), 4.96e14),
            ("China".into(), 3.3e13),
            ("India".into(), 2.9e12),
            ("United Kingdom of Great Britain and Northern Ireland".into(), 1.1e11),
            ("Germany".into(), 9.8e10),
        ],
    }
}

#[test]
fn renders_png_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cache").join("summary.png");
    summary::render_summary(&sample(), &path, None).unwrap();

    let bytes = fs::read(&path).expect("image created");
    assert!(bytes.len() > PNG_MAGIC.len());
    assert_eq!(bytes[..8], PNG_MAGIC);
    assert!(
        !dir.path().join("cache").join("summary.tmp.png").exists(),
        "temporary file is moved into place"
    );
}

#[test]
fn renders_empty_cache() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("summary.png");
    let data = SummaryData {
        total_countries: 0,
        last_refreshed_at: None,
        top: vec![],
    };
    summary::render_summary(&data, &path, None).unwrap();
    assert_eq!(fs::read(&path).unwrap()[..8], PNG_MAGIC);
}

#[test]
fn rerender_replaces_previous_image() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("summary.png");
    summary::render_summary(&sample(), &path, None).unwrap();
    let mut data = sample();
    data.top.truncate(1);
    summary::render_summary(&data, &path, None).unwrap();
    assert_eq!(fs::read(&path).unwrap()[..8], PNG_MAGIC);
}

#[test]
fn text_lines_match_report_layout() {
    let lines: Vec<String> = summary::layout_lines(&sample())
        .into_iter()
        .map(|l| l.3)
        .collect();
    assert_eq!(lines[0], "Country Summary Report");
    assert_eq!(lines[1], "Total Countries: 250");
    assert_eq!(lines[2], "Last Refreshed: 2025-10-22 14:05:09 UTC");
    assert_eq!(lines[3], "Top 5 Countries by Estimated GDP:");
    assert_eq!(lines[5], "2. China - $33,000,000,000,000.00");
    assert!(lines[7].starts_with("4. United Kingdom"));
    assert_eq!(lines.len(), 9);
}
