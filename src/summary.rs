//! Summary image: a fixed-layout 800×600 PNG with the row count, the last
//! refresh time and the five largest GDP estimates.
//!
//! Text goes through the `ab_glyph` path, which does not discover OS fonts, so a
//! TTF file is registered once at runtime. Without a usable font the image is
//! still written, with the GDP bars only.

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use num_format::{Locale, ToFormattedString};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::{FontStyle, register_font};
use plotters_bitmap::BitMapBackend;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const WIDTH: u32 = 800;
pub const HEIGHT: u32 = 600;
pub const TOP_N: usize = 5;

pub const DEFAULT_FONT_PATH: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf";

const FALLBACK_FONTS: [&str; 3] = [
    DEFAULT_FONT_PATH,
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
];

const FONT_FAMILY: &str = "sans-serif";

/// Bar colors, Office chart palette order.
const PALETTE: [RGBColor; 5] = [
    RGBColor(68, 114, 196),
    RGBColor(237, 125, 49),
    RGBColor(165, 165, 165),
    RGBColor(255, 192, 0),
    RGBColor(91, 155, 213),
];

/// What the image shows.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryData {
    pub total_countries: u64,
    pub last_refreshed_at: Option<DateTime<Utc>>,
    /// `(name, estimated_gdp)`, highest first.
    pub top: Vec<(String, f64)>,
}

static FONT_READY: OnceLock<bool> = OnceLock::new();

/// Register a TTF for the `sans-serif` family. Only the first call does work;
/// later calls report the outcome of that first attempt.
pub fn ensure_font(preferred: Option<&Path>) -> bool {
    *FONT_READY.get_or_init(|| {
        let candidates = preferred
            .map(Path::to_path_buf)
            .into_iter()
            .chain(FALLBACK_FONTS.iter().map(PathBuf::from));
        for path in candidates {
            let bytes = match std::fs::read(&path) {
                Ok(b) => b,
                Err(e) => {
                    log::debug!("font {} not readable: {e}", path.display());
                    continue;
                }
            };
            // register_font wants 'static data; the font lives for the whole process.
            let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
            if register_font(FONT_FAMILY, FontStyle::Normal, bytes).is_ok() {
                log::info!("using font {}", path.display());
                return true;
            }
            log::warn!("{} is not a usable TTF font", path.display());
        }
        log::warn!("no usable font found; summary image will be rendered without text");
        false
    })
}

/// `$1,234,567.89`; non-finite values render as `N/A`.
pub fn format_money(v: f64) -> String {
    if !v.is_finite() {
        return "N/A".to_string();
    }
    let cents = (v.abs() * 100.0).round() as u128;
    let sign = if v < 0.0 && cents > 0 { "-" } else { "" };
    format!(
        "{sign}${}.{:02}",
        (cents / 100).to_formatted_string(&Locale::en),
        cents % 100
    )
}

/// Heuristic pixel width; plotters has no text measuring on this path.
fn estimate_text_width_px(text: &str, font_px: u32) -> u32 {
    ((text.chars().count() as f32) * (font_px as f32) * 0.60).ceil() as u32
}

/// Truncate to fit `max_px`, ending with a single ellipsis if anything was cut.
pub fn truncate_to_width(text: &str, font_px: u32, max_px: u32) -> String {
    if estimate_text_width_px(text, font_px) <= max_px {
        return text.to_string();
    }
    let mut out = String::new();
    for ch in text.chars() {
        out.push(ch);
        if estimate_text_width_px(&out, font_px) + estimate_text_width_px("…", font_px) > max_px {
            out.pop();
            break;
        }
    }
    out.push('…');
    out
}

/// Lines of text in drawing order, `(x, y, font_px, text)`.
pub fn layout_lines(data: &SummaryData) -> Vec<(i32, i32, u32, String)> {
    let mut lines = vec![
        (50, 30, 32, "Country Summary Report".to_string()),
        (
            50,
            100,
            20,
            format!("Total Countries: {}", data.total_countries),
        ),
    ];
    if let Some(ts) = data.last_refreshed_at {
        lines.push((
            50,
            140,
            16,
            format!("Last Refreshed: {}", ts.format("%Y-%m-%d %H:%M:%S UTC")),
        ));
    }
    lines.push((50, 200, 20, "Top 5 Countries by Estimated GDP:".to_string()));

    let max_px = WIDTH - 70 - 20;
    for (idx, (name, gdp)) in data.top.iter().take(TOP_N).enumerate() {
        let text = format!("{}. {} - {}", idx + 1, name, format_money(*gdp));
        lines.push((
            70,
            240 + 40 * idx as i32,
            16,
            truncate_to_width(&text, 16, max_px),
        ));
    }
    lines
}

/// Render the summary PNG to `out_path`. The file is written next to the
/// destination first and renamed into place, so readers never see a partial image.
pub fn render_summary<P: AsRef<Path>>(
    data: &SummaryData,
    out_path: P,
    font_path: Option<&Path>,
) -> Result<()> {
    let out_path = out_path.as_ref();
    if let Some(parent) = out_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create image directory {}", parent.display()))?;
    }
    let with_text = ensure_font(font_path);

    // Keep a .png extension so the backend picks the right encoder.
    let tmp_path = out_path.with_extension("tmp.png");
    {
        let root = BitMapBackend::new(&tmp_path, (WIDTH, HEIGHT)).into_drawing_area();
        draw_summary(&root, data, with_text)?;
        root.present().map_err(|e| anyhow!("{:?}", e))?;
    }
    std::fs::rename(&tmp_path, out_path)
        .with_context(|| format!("move summary image to {}", out_path.display()))?;
    Ok(())
}

fn draw_summary<DB>(root: &DrawingArea<DB, Shift>, data: &SummaryData, with_text: bool) -> Result<()>
where
    DB: DrawingBackend,
{
    root.fill(&WHITE).map_err(|e| anyhow!("{:?}", e))?;

    if with_text {
        for (x, y, px, text) in layout_lines(data) {
            let style = (FONT_FAMILY, px as f64).into_font().color(&BLACK);
            root.draw_text(&text, &style, (x, y))
                .map_err(|e| anyhow!("{:?}", e))?;
        }
    }

    // One bar per entry, under its text line, scaled to the largest estimate.
    let max_gdp = data
        .top
        .iter()
        .map(|(_, g)| *g)
        .filter(|g| g.is_finite())
        .fold(0.0_f64, f64::max);
    if max_gdp > 0.0 {
        let full_px = (WIDTH - 70 - 40) as f64;
        for (idx, (_, gdp)) in data.top.iter().take(TOP_N).enumerate() {
            if !gdp.is_finite() || *gdp <= 0.0 {
                continue;
            }
            let y = 240 + 40 * idx as i32 + 22;
            let w = ((gdp / max_gdp) * full_px).round().max(1.0) as i32;
            root.draw(&Rectangle::new(
                [(70, y), (70 + w, y + 8)],
                PALETTE[idx % PALETTE.len()].filled(),
            ))
            .map_err(|e| anyhow!("{:?}", e))?;
        }
    }
    Ok(())
}
