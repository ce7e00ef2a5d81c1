//! Fixed A4 page layout, computed before any PDF bytes are written.
//!
//! Coordinates are millimetres from the top-left corner; text `y` is the
//! baseline. Layout is a pure function of its inputs.

use crate::format::{format_amount, format_money, format_rate, truncate_label};
use crate::models::{Budget, CartLine};

use super::fonts::{PT_TO_MM, text_width};
use super::{FOOTNOTE, RESOURCE_LABEL_MAX, ReportOptions};

pub const PAGE_WIDTH: f32 = 210.0;
pub const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 10.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;
/// Horizontal padding inside a cell
const CELL_PADDING: f32 = 1.0;
/// Content below this line moves to the next page
const BREAK_Y: f32 = PAGE_HEIGHT - 15.0;

const BANNER_HEIGHT: f32 = 40.0;
const CONTENT_TOP: f32 = 55.0;
const SUMMARY_BOX_HEIGHT: f32 = 35.0;
const HEADER_ROW_HEIGHT: f32 = 10.0;
const ROW_HEIGHT: f32 = 8.0;
const FOOTNOTE_LINE_HEIGHT: f32 = 5.0;

const NAVY: Rgb = Rgb(44, 62, 80);
const SLATE: Rgb = Rgb(52, 73, 94);
const WHITE: Rgb = Rgb(255, 255, 255);
const BLACK: Rgb = Rgb(0, 0, 0);
const GREY: Rgb = Rgb(100, 100, 100);
const FOOTER_GREY: Rgb = Rgb(128, 128, 128);
const RULE: Rgb = Rgb(200, 200, 200);
const SUMMARY_FILL: Rgb = Rgb(240, 242, 245);
const ROW_SHADE: Rgb = Rgb(245, 245, 245);
const GREEN: Rgb = Rgb(39, 174, 96);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontStyle {
    Regular,
    Bold,
    Italic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Font {
    style: FontStyle,
    size: f32,
    color: Rgb,
}

const fn font(style: FontStyle, size: f32, color: Rgb) -> Font {
    Font { style, size, color }
}

/// A single drawing instruction
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Rect {
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        fill: Option<Rgb>,
        stroke: Option<Rgb>,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        color: Rgb,
    },
    Text {
        x: f32,
        y: f32,
        text: String,
        style: FontStyle,
        size: f32,
        color: Rgb,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub ops: Vec<DrawOp>,
}

impl Page {
    /// Text runs on this page, in drawing order
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.ops.iter().filter_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportLayout {
    pub pages: Vec<Page>,
}

impl ReportLayout {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Table columns: header, width, alignment
const COLUMNS: [(&str, f32, Align); 5] = [
    ("Provider", 30.0, Align::Center),
    ("Type", 35.0, Align::Center),
    ("Resource", 75.0, Align::Left),
    ("Qty", 20.0, Align::Center),
    ("Total USD", 30.0, Align::Right),
];

struct Composer<'a> {
    options: &'a ReportOptions,
    finished: Vec<Page>,
    current: Page,
    y: f32,
}

impl<'a> Composer<'a> {
    fn new(options: &'a ReportOptions) -> Self {
        let mut composer = Self {
            options,
            finished: Vec::new(),
            current: Page::default(),
            y: CONTENT_TOP,
        };
        composer.draw_header();
        composer
    }

    fn new_page(&mut self) {
        let done = std::mem::take(&mut self.current);
        self.finished.push(done);
        self.draw_header();
        self.y = CONTENT_TOP;
    }

    fn fits(&self, height: f32) -> bool {
        self.y + height <= BREAK_Y
    }

    fn push(&mut self, op: DrawOp) {
        self.current.ops.push(op);
    }

    #[allow(clippy::too_many_arguments)]
    fn cell(
        &mut self,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        text: &str,
        font: Font,
        align: Align,
    ) {
        if text.is_empty() {
            return;
        }
        let width = text_width(text, font.style, font.size);
        let text_x = match align {
            Align::Left => x + CELL_PADDING,
            Align::Center => x + (w - width) / 2.0,
            Align::Right => x + w - CELL_PADDING - width,
        };
        let baseline = y + h / 2.0 + 0.3 * font.size * PT_TO_MM;
        self.push(DrawOp::Text {
            x: text_x,
            y: baseline,
            text: text.to_string(),
            style: font.style,
            size: font.size,
            color: font.color,
        });
    }

    fn draw_header(&mut self) {
        self.push(DrawOp::Rect {
            x: 0.0,
            y: 0.0,
            w: PAGE_WIDTH,
            h: BANNER_HEIGHT,
            fill: Some(NAVY),
            stroke: None,
        });
        let title = self.options.title.clone();
        self.cell(
            MARGIN,
            10.0,
            CONTENT_WIDTH,
            20.0,
            &title,
            font(FontStyle::Bold, 20.0, WHITE),
            Align::Center,
        );
        let stamp = format!(
            "Generated on {}",
            self.options.generated_at.format("%d/%m/%Y at %H:%M")
        );
        self.cell(
            MARGIN,
            30.0,
            CONTENT_WIDTH,
            5.0,
            &stamp,
            font(FontStyle::Italic, 10.0, WHITE),
            Align::Center,
        );
    }

    fn heading(&mut self, text: &str) {
        self.cell(
            MARGIN,
            self.y,
            CONTENT_WIDTH,
            10.0,
            text,
            font(FontStyle::Bold, 14.0, NAVY),
            Align::Left,
        );
        self.y += 10.0;
    }

    fn summary(&mut self, budget: &Budget) {
        self.heading("Executive Summary");

        let top = self.y;
        self.push(DrawOp::Rect {
            x: MARGIN,
            y: top,
            w: CONTENT_WIDTH,
            h: SUMMARY_BOX_HEIGHT,
            fill: Some(SUMMARY_FILL),
            stroke: Some(RULE),
        });

        let half = CONTENT_WIDTH / 2.0;
        let label = font(FontStyle::Regular, 11.0, GREY);
        let figure = font(FontStyle::Bold, 18.0, GREEN);
        let code = self.options.currency_code.clone();
        let symbol = self.options.currency_symbol.clone();

        self.cell(MARGIN, top + 5.0, half, 8.0, "Monthly Investment (USD)", label, Align::Center);
        let local_label = format!(
            "Monthly Estimate ({code}) - rate {}",
            format_rate(budget.exchange_rate)
        );
        self.cell(MARGIN + half, top + 5.0, half, 8.0, &local_label, label, Align::Center);

        let usd = format_money("$", budget.total_usd);
        let local = format_money(&symbol, budget.total_local);
        self.cell(MARGIN, top + 13.0, half, 12.0, &usd, figure, Align::Center);
        self.cell(MARGIN + half, top + 13.0, half, 12.0, &local, figure, Align::Center);

        if self.options.show_safe_budget {
            let safe = format!(
                "Safe budget with {}% margin: {}",
                budget.safety_margin_percent(),
                format_money(&symbol, budget.total_local_safe)
            );
            self.cell(
                MARGIN,
                top + 26.0,
                CONTENT_WIDTH,
                6.0,
                &safe,
                font(FontStyle::Italic, 9.0, GREY),
                Align::Center,
            );
        }

        self.y = top + SUMMARY_BOX_HEIGHT + 10.0;
    }

    fn table_header(&mut self) {
        let y = self.y;
        self.push(DrawOp::Rect {
            x: MARGIN,
            y,
            w: CONTENT_WIDTH,
            h: HEADER_ROW_HEIGHT,
            fill: Some(SLATE),
            stroke: None,
        });
        let mut x = MARGIN;
        for (title, width, _) in COLUMNS {
            self.cell(
                x,
                y,
                width,
                HEADER_ROW_HEIGHT,
                title,
                font(FontStyle::Bold, 10.0, WHITE),
                Align::Center,
            );
            x += width;
        }
        self.y += HEADER_ROW_HEIGHT;
    }

    fn table(&mut self, lines: &[CartLine]) {
        self.heading("Infrastructure Breakdown");
        self.table_header();

        for (index, line) in lines.iter().enumerate() {
            if !self.fits(ROW_HEIGHT) {
                self.new_page();
                self.table_header();
            }
            self.row(index, line);
        }
    }

    fn row(&mut self, index: usize, line: &CartLine) {
        let y = self.y;
        if index % 2 == 1 {
            self.push(DrawOp::Rect {
                x: MARGIN,
                y,
                w: CONTENT_WIDTH,
                h: ROW_HEIGHT,
                fill: Some(ROW_SHADE),
                stroke: None,
            });
        }
        self.push(DrawOp::Line {
            x1: MARGIN,
            y1: y + ROW_HEIGHT,
            x2: MARGIN + CONTENT_WIDTH,
            y2: y + ROW_HEIGHT,
            color: RULE,
        });

        let values = [
            line.provider.clone(),
            line.service_type.clone(),
            truncate_label(&line.resource_name, RESOURCE_LABEL_MAX),
            line.quantity.to_string(),
            format_amount(line.total_usd),
        ];
        let body = font(FontStyle::Regular, 9.0, BLACK);
        let mut x = MARGIN;
        for ((_, width, align), value) in COLUMNS.iter().zip(values.iter()) {
            self.cell(x, y, *width, ROW_HEIGHT, value, body, *align);
            x += width;
        }
        self.y += ROW_HEIGHT;
    }

    fn footnote(&mut self) {
        self.y += 10.0;
        let note = font(FontStyle::Italic, 8.0, GREY);
        let max_width = CONTENT_WIDTH - 2.0 * CELL_PADDING;
        for text in wrap(FOOTNOTE, note, max_width) {
            if !self.fits(FOOTNOTE_LINE_HEIGHT) {
                self.new_page();
            }
            self.cell(
                MARGIN,
                self.y,
                CONTENT_WIDTH,
                FOOTNOTE_LINE_HEIGHT,
                &text,
                note,
                Align::Left,
            );
            self.y += FOOTNOTE_LINE_HEIGHT;
        }
    }

    /// Close the last page and stamp every footer with the final page count
    fn finish(mut self) -> ReportLayout {
        let last = std::mem::take(&mut self.current);
        self.finished.push(last);

        let total = self.finished.len();
        let brand = self.options.brand.clone();
        let footer = font(FontStyle::Italic, 8.0, FOOTER_GREY);
        let mut pages = std::mem::take(&mut self.finished);
        for (index, page) in pages.iter_mut().enumerate() {
            self.current = std::mem::take(page);
            let text = format!("{brand} | Page {}/{total}", index + 1);
            self.cell(MARGIN, BREAK_Y, CONTENT_WIDTH, 10.0, &text, footer, Align::Center);
            *page = std::mem::take(&mut self.current);
        }

        ReportLayout { pages }
    }
}

/// Greedy word wrap to `max_width` millimetres
fn wrap(text: &str, font: Font, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if !current.is_empty() && text_width(&candidate, font.style, font.size) > max_width {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Lay out the full report: summary, itemised table, footnote, footers
pub fn compose(lines: &[CartLine], budget: &Budget, options: &ReportOptions) -> ReportLayout {
    let mut composer = Composer::new(options);
    composer.summary(budget);
    composer.table(lines);
    composer.footnote();
    composer.finish()
}
