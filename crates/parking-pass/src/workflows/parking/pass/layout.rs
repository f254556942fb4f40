//! Page geometry and text metrics for the pass document. All units are PDF points.

/// US Letter.
pub const PAGE_WIDTH: f32 = 612.0;
pub const PAGE_HEIGHT: f32 = 792.0;

pub const BORDER_WIDTH: f32 = 350.0;
pub const BORDER_HEIGHT: f32 = 400.0;
pub const BORDER_STROKE: f32 = 1.5;

pub const BARCODE_SIZE: f32 = 80.0;
/// Gap between the top edge of the border and the top of the barcode.
pub const BARCODE_TOP_MARGIN: f32 = 20.0;
/// Gap between the bottom of the barcode and the first baseline.
pub const TEXT_TOP_MARGIN: f32 = 25.0;
pub const LINE_SPACING: f32 = 25.0;

const FALLBACK_WIDTH: u16 = 556;

/// Standard Type 1 fonts every PDF viewer ships.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassFont {
    Regular,
    Bold,
}

impl PassFont {
    pub const fn base_font(self) -> &'static str {
        match self {
            PassFont::Regular => "Helvetica",
            PassFont::Bold => "Helvetica-Bold",
        }
    }

    /// Name under which the font is registered in the page resources.
    pub const fn resource_name(self) -> &'static str {
        match self {
            PassFont::Regular => "F1",
            PassFont::Bold => "F2",
        }
    }

    fn widths(self) -> &'static [u16; 95] {
        match self {
            PassFont::Regular => &HELVETICA_WIDTHS,
            PassFont::Bold => &HELVETICA_BOLD_WIDTHS,
        }
    }

    /// Advance width of `ch` in thousandths of an em.
    ///
    /// Characters outside WinAnsi are printed as `?` and measured that way.
    pub fn glyph_width(self, ch: char) -> u16 {
        match ch as u32 {
            code @ 32..=126 => self.widths()[(code - 32) as usize],
            0xA0..=0xFF => self.latin1_width(ch),
            _ => self.glyph_width('?'),
        }
    }

    /// Accented letters share the advance of their base letter, except where the AFM differs.
    fn latin1_width(self, ch: char) -> u16 {
        let base = match ch {
            '\u{A0}' => ' ',
            'À'..='Å' => 'A',
            'Ç' => 'C',
            'È'..='Ë' => 'E',
            'Ì'..='Ï' => 'I',
            'Ð' => 'D',
            'Ñ' => 'N',
            'Ò'..='Ö' | 'Ø' => 'O',
            'Ù'..='Ü' => 'U',
            'Ý' => 'Y',
            'Þ' => 'P',
            'à'..='å' => 'a',
            'ç' => 'c',
            'è'..='ë' => 'e',
            'ð' => 'o',
            'ñ' => 'n',
            'ò'..='ö' => 'o',
            'ù'..='ü' => 'u',
            'ý' | 'ÿ' => 'y',
            'þ' => 'p',
            'ì'..='ï' => return 278,
            'ø' | 'ß' => return 611,
            'Æ' => return 1000,
            'æ' => return 889,
            '×' | '÷' => return 584,
            _ => return FALLBACK_WIDTH,
        };
        self.glyph_width(base)
    }

    pub fn text_width(self, text: &str, size: f32) -> f32 {
        let units: u32 = text.chars().map(|ch| u32::from(self.glyph_width(ch))).sum();
        units as f32 * size / 1000.0
    }
}

/// A line of text before placement.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLine {
    pub text: String,
    pub font: PassFont,
    pub size: f32,
}

impl TextLine {
    pub fn new(text: impl Into<String>, font: PassFont, size: f32) -> Self {
        Self {
            text: text.into(),
            font,
            size,
        }
    }
}

/// A line positioned at its baseline origin.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub line: TextLine,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn top(&self) -> f32 {
        self.y + self.height
    }

    pub fn center_x(&self) -> f32 {
        self.x + self.width / 2.0
    }
}

/// Resolved positions of every element on the page.
#[derive(Debug, Clone, PartialEq)]
pub struct PassLayout {
    pub border: Rect,
    pub barcode: Rect,
    pub lines: Vec<PlacedLine>,
}

impl PassLayout {
    /// Border centered on the page, barcode centered near its top, lines centered below.
    pub fn arrange(lines: Vec<TextLine>) -> Self {
        let border = Rect {
            x: (PAGE_WIDTH - BORDER_WIDTH) / 2.0,
            y: (PAGE_HEIGHT - BORDER_HEIGHT) / 2.0,
            width: BORDER_WIDTH,
            height: BORDER_HEIGHT,
        };
        let barcode = Rect {
            x: border.center_x() - BARCODE_SIZE / 2.0,
            y: border.top() - BARCODE_TOP_MARGIN - BARCODE_SIZE,
            width: BARCODE_SIZE,
            height: BARCODE_SIZE,
        };

        let mut baseline = barcode.y - TEXT_TOP_MARGIN;
        let lines = lines
            .into_iter()
            .map(|line| {
                let x = border.center_x() - line.font.text_width(&line.text, line.size) / 2.0;
                let placed = PlacedLine { line, x, y: baseline };
                baseline -= LINE_SPACING;
                placed
            })
            .collect();

        Self {
            border,
            barcode,
            lines,
        }
    }
}

// Helvetica AFM advance widths for codes 32..=126.
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

// Helvetica-Bold AFM advance widths for codes 32..=126.
#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];
