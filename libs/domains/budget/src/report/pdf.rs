//! Encode a [`ReportLayout`] as a PDF document using the base-14 Helvetica faces.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, dictionary};

use crate::error::{BudgetError, BudgetResult};

use super::fonts::encode_win_ansi;
use super::layout::{DrawOp, FontStyle, PAGE_HEIGHT, PAGE_WIDTH, Page, ReportLayout, Rgb};

/// Millimetres to PDF points
const MM_TO_PT: f32 = 72.0 / 25.4;
const RULE_WIDTH_PT: f32 = 0.2 * MM_TO_PT;

fn font_resource(style: FontStyle) -> &'static str {
    match style {
        FontStyle::Regular => "F1",
        FontStyle::Bold => "F2",
        FontStyle::Italic => "F3",
    }
}

fn pt(mm: f32) -> Object {
    (mm * MM_TO_PT).into()
}

/// Flip a top-down millimetre y into bottom-up points
fn pt_y(mm: f32) -> Object {
    ((PAGE_HEIGHT - mm) * MM_TO_PT).into()
}

fn color(op: &str, Rgb(r, g, b): Rgb) -> Operation {
    let channel = |c: u8| -> Object { (f32::from(c) / 255.0).into() };
    Operation::new(op, vec![channel(r), channel(g), channel(b)])
}

fn page_operations(page: &Page) -> Vec<Operation> {
    let mut ops = vec![Operation::new("w", vec![RULE_WIDTH_PT.into()])];

    for op in &page.ops {
        match op {
            DrawOp::Rect {
                x,
                y,
                w,
                h,
                fill,
                stroke,
            } => {
                let paint = match (fill, stroke) {
                    (Some(_), Some(_)) => "B",
                    (Some(_), None) => "f",
                    (None, Some(_)) => "S",
                    (None, None) => continue,
                };
                if let Some(fill) = fill {
                    ops.push(color("rg", *fill));
                }
                if let Some(stroke) = stroke {
                    ops.push(color("RG", *stroke));
                }
                ops.push(Operation::new(
                    "re",
                    vec![pt(*x), pt_y(y + h), pt(*w), pt(*h)],
                ));
                ops.push(Operation::new(paint, vec![]));
            }
            DrawOp::Line {
                x1,
                y1,
                x2,
                y2,
                color: stroke,
            } => {
                ops.push(color("RG", *stroke));
                ops.push(Operation::new("m", vec![pt(*x1), pt_y(*y1)]));
                ops.push(Operation::new("l", vec![pt(*x2), pt_y(*y2)]));
                ops.push(Operation::new("S", vec![]));
            }
            DrawOp::Text {
                x,
                y,
                text,
                style,
                size,
                color: fill,
            } => {
                ops.push(Operation::new("BT", vec![]));
                ops.push(Operation::new(
                    "Tf",
                    vec![font_resource(*style).into(), (*size).into()],
                ));
                ops.push(color("rg", *fill));
                ops.push(Operation::new("Td", vec![pt(*x), pt_y(*y)]));
                ops.push(Operation::new(
                    "Tj",
                    vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
                ));
                ops.push(Operation::new("ET", vec![]));
            }
        }
    }

    ops
}

fn base_font(doc: &mut Document, name: &str) -> ObjectId {
    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => name,
        "Encoding" => "WinAnsiEncoding",
    })
}

/// Serialize the layout. Output depends only on the layout and title, so
/// identical inputs yield identical bytes.
pub fn encode(layout: &ReportLayout, title: &str) -> BudgetResult<Vec<u8>> {
    let mut doc = Document::with_version("1.4");
    let pages_id = doc.new_object_id();

    let regular = base_font(&mut doc, "Helvetica");
    let bold = base_font(&mut doc, "Helvetica-Bold");
    let italic = base_font(&mut doc, "Helvetica-Oblique");
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular,
            "F2" => bold,
            "F3" => italic,
        },
    });

    let mut kids = Vec::with_capacity(layout.page_count());
    for page in &layout.pages {
        let content = Content {
            operations: page_operations(page),
        };
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::from(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                (PAGE_WIDTH * MM_TO_PT).into(),
                (PAGE_HEIGHT * MM_TO_PT).into(),
            ],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::String(encode_win_ansi(title), StringFormat::Literal),
        "Producer" => Object::string_literal("budget-planner"),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| BudgetError::Render(format!("cannot write PDF: {e}")))?;
    Ok(bytes)
}
