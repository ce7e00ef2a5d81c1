//! Metrics for the standard Type 1 Helvetica faces, used to align text in cells.

use super::layout::FontStyle;

/// Points to millimetres
pub const PT_TO_MM: f32 = 25.4 / 72.0;

/// Glyph widths (1/1000 em) for ASCII 32..=126
#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// WinAnsiEncoding's 0x80..=0x9F block: character, code, regular and bold width
#[rustfmt::skip]
static WIN_ANSI_EXTRAS: [(char, u8, u16, u16); 27] = [
    ('€', 0x80, 556, 556), ('‚', 0x82, 222, 278), ('ƒ', 0x83, 556, 556),
    ('„', 0x84, 333, 500), ('…', 0x85, 1000, 1000), ('†', 0x86, 556, 556),
    ('‡', 0x87, 556, 556), ('ˆ', 0x88, 333, 333), ('‰', 0x89, 1000, 1000),
    ('Š', 0x8A, 667, 667), ('‹', 0x8B, 333, 333), ('Œ', 0x8C, 1000, 1000),
    ('Ž', 0x8E, 611, 611), ('‘', 0x91, 222, 278), ('’', 0x92, 222, 278),
    ('“', 0x93, 333, 500), ('”', 0x94, 333, 500), ('•', 0x95, 350, 350),
    ('–', 0x96, 556, 556), ('—', 0x97, 1000, 1000), ('˜', 0x98, 333, 333),
    ('™', 0x99, 1000, 1000), ('š', 0x9A, 500, 556), ('›', 0x9B, 333, 333),
    ('œ', 0x9C, 944, 944), ('ž', 0x9E, 500, 500), ('Ÿ', 0x9F, 667, 667),
];

/// Width used for anything without a metric above
const DEFAULT_WIDTH: u16 = 556;

fn win_ansi_extra(ch: char) -> Option<&'static (char, u8, u16, u16)> {
    WIN_ANSI_EXTRAS.iter().find(|extra| extra.0 == ch)
}

fn glyph_width(ch: char, style: FontStyle) -> u16 {
    let table = match style {
        FontStyle::Bold => &HELVETICA_BOLD,
        // Oblique shares the upright metrics
        FontStyle::Regular | FontStyle::Italic => &HELVETICA,
    };
    match (u32::from(ch), win_ansi_extra(ch)) {
        (code @ 32..=126, _) => table[(code - 32) as usize],
        (_, Some(&(_, _, regular, bold))) => match style {
            FontStyle::Bold => bold,
            FontStyle::Regular | FontStyle::Italic => regular,
        },
        _ => DEFAULT_WIDTH,
    }
}

/// Rendered width of `text` in millimetres
pub fn text_width(text: &str, style: FontStyle, size_pt: f32) -> f32 {
    let units: u32 = text.chars().map(|ch| u32::from(glyph_width(ch, style))).sum();
    units as f32 * size_pt / 1000.0 * PT_TO_MM
}

/// WinAnsi byte for `ch`, if the encoding has one
fn win_ansi_byte(ch: char) -> Option<u8> {
    match u32::from(ch) {
        code @ (0x00..=0x7F | 0xA0..=0xFF) => u8::try_from(code).ok(),
        _ => win_ansi_extra(ch).map(|&(_, code, _, _)| code),
    }
}

/// Encode for a WinAnsi font; unmapped characters become `?`
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| win_ansi_byte(ch).unwrap_or(b'?'))
        .collect()
}
