//! Watermark PDF creation using lopdf
//!
//! A watermark PDF is a single page holding nothing but the stamped text.
//! It is later flattened onto every page of a target document by
//! [`overlay_watermark`](super::merge::overlay_watermark).

use std::fs;
use std::path::Path;
use std::str::FromStr;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, StringFormat, Stream};
use tracing::debug;

use crate::error::{Error, Result};
use crate::layout::{place_text, Length, PageDimensions, Position};
use crate::pdf::metadata::set_document_info;

/// Resource name of the watermark font
const FONT_NAME: &str = "F1";

/// An RGB color with components in `0.0..=1.0`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0.0, g: 0.0, b: 0.0 };
    pub const RED: Rgb = Rgb { r: 1.0, g: 0.0, b: 0.0 };
    pub const GRAY: Rgb = Rgb { r: 0.5, g: 0.5, b: 0.5 };
    pub const BLUE: Rgb = Rgb { r: 0.0, g: 0.0, b: 1.0 };
}

impl FromStr for Rgb {
    type Err = Error;

    /// Parse `#rrggbb` or one of `black`, `red`, `gray`/`grey`, `blue`
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "black" => return Ok(Rgb::BLACK),
            "red" => return Ok(Rgb::RED),
            "gray" | "grey" => return Ok(Rgb::GRAY),
            "blue" => return Ok(Rgb::BLUE),
            _ => {}
        }

        let hex = s
            .strip_prefix('#')
            .filter(|h| h.len() == 6 && h.is_ascii())
            .ok_or_else(|| Error::InvalidStyle(format!("unknown color '{}'", s)))?;

        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16)
                .map(|v| v as f32 / 255.0)
                .map_err(|_| Error::InvalidStyle(format!("unknown color '{}'", s)))
        };

        Ok(Rgb {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }
}

/// How one stamp of text looks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatermarkStyle {
    /// Font size in points
    pub font_size: f32,
    /// Fill color
    pub color: Rgb,
    /// Fill opacity, 0 (invisible) to 1 (opaque)
    pub opacity: f32,
}

impl WatermarkStyle {
    /// Near-transparent black, for the diagonal center stamp
    pub fn diagonal() -> Self {
        Self {
            font_size: 36.0,
            color: Rgb::BLACK,
            opacity: 0.1,
        }
    }

    /// Opaque red, for header and footer stamps
    pub fn edge() -> Self {
        Self {
            font_size: 36.0,
            color: Rgb::RED,
            opacity: 1.0,
        }
    }

    /// Default style for a position
    pub fn for_position(position: Position) -> Self {
        match position {
            Position::Center => Self::diagonal(),
            Position::Header | Position::Footer => Self::edge(),
        }
    }

    fn validate(&self) -> Result<()> {
        if !(self.font_size.is_finite() && self.font_size > 0.0) {
            return Err(Error::InvalidStyle(format!(
                "font size must be positive, got {}",
                self.font_size
            )));
        }
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(Error::InvalidStyle(format!(
                "opacity must be between 0 and 1, got {}",
                self.opacity
            )));
        }
        Ok(())
    }
}

/// User overrides applied on top of every stamp's default style
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StyleOverrides {
    pub font_size: Option<f32>,
    pub color: Option<Rgb>,
    pub opacity: Option<f32>,
}

impl StyleOverrides {
    fn apply(&self, style: WatermarkStyle) -> WatermarkStyle {
        WatermarkStyle {
            font_size: self.font_size.unwrap_or(style.font_size),
            color: self.color.unwrap_or(style.color),
            opacity: self.opacity.unwrap_or(style.opacity),
        }
    }
}

/// One piece of text drawn at one position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stamp {
    pub position: Position,
    pub style: WatermarkStyle,
}

/// Options for creating a watermark PDF
#[derive(Debug, Clone)]
pub struct WatermarkOptions {
    /// Text drawn by every stamp
    pub text: String,
    /// Stamps in drawing order
    pub stamps: Vec<Stamp>,
    /// Size of the watermark page
    pub page: PageDimensions,
    /// Baseline distance of header/footer text from the page edge
    pub edge_margin: Length,
}

impl WatermarkOptions {
    /// A single stamp at `position` with that position's default style
    pub fn single(text: impl Into<String>, position: Position) -> Self {
        Self {
            text: text.into(),
            stamps: vec![Stamp {
                position,
                style: WatermarkStyle::for_position(position),
            }],
            page: PageDimensions::letter(),
            edge_margin: Length::from_pt(40.0),
        }
    }

    /// Header and footer in red, plus the diagonal stamp if `include_center`
    pub fn banner(text: impl Into<String>, include_center: bool) -> Self {
        let edge = WatermarkStyle {
            font_size: 28.0,
            ..WatermarkStyle::edge()
        };
        let mut stamps = vec![
            Stamp { position: Position::Header, style: edge },
            Stamp { position: Position::Footer, style: edge },
        ];
        if include_center {
            stamps.push(Stamp {
                position: Position::Center,
                style: WatermarkStyle::diagonal(),
            });
        }

        Self {
            text: text.into(),
            stamps,
            page: PageDimensions::letter(),
            edge_margin: Length::from_pt(40.0),
        }
    }

    /// Apply user overrides to every stamp
    pub fn with_overrides(mut self, overrides: &StyleOverrides) -> Self {
        for stamp in &mut self.stamps {
            stamp.style = overrides.apply(stamp.style);
        }
        self
    }

    /// Use a different page size
    pub fn with_page(mut self, page: PageDimensions) -> Self {
        self.page = page;
        self
    }

    /// Check that there is something to draw and every style is usable
    pub fn validate(&self) -> Result<()> {
        if self.stamps.is_empty() {
            return Err(Error::General("Watermark has no stamps".to_string()));
        }
        for stamp in &self.stamps {
            stamp.style.validate()?;
        }
        Ok(())
    }
}

/// Create a one-page watermark PDF
///
/// Every stamp is drawn in Helvetica-Bold, horizontally centered for header
/// and footer stamps and centered on the page middle (rotated 45°) for the
/// center stamp. Opacity goes through a per-stamp ExtGState.
///
/// # Example
///
/// ```no_run
/// use pdf_stamp::layout::Position;
/// use pdf_stamp::pdf::{create_watermark_pdf, WatermarkOptions};
/// use std::path::Path;
///
/// let options = WatermarkOptions::single("DRAFT", Position::Center);
/// create_watermark_pdf(Path::new("watermark.pdf"), &options)
///     .expect("Failed to create watermark");
/// ```
pub fn create_watermark_pdf(output: &Path, options: &WatermarkOptions) -> Result<()> {
    options.validate()?;

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(Object::Dictionary(helvetica_bold_font()));

    let text = encode_win_ansi(&options.text);
    let mut operations = Vec::new();
    let mut graphics_states = Dictionary::new();

    for (i, stamp) in options.stamps.iter().enumerate() {
        let gs_name = format!("GS{}", i);
        graphics_states.set(gs_name.as_str(), Object::Dictionary(opacity_state(stamp.style.opacity)));

        let width = Length::from_pt(text_width(&text, stamp.style.font_size) as f64);
        let placement = place_text(stamp.position, &options.page, width, options.edge_margin);
        debug!(position = %stamp.position, ?placement, "placing watermark stamp");

        let Rgb { r, g, b } = stamp.style.color;
        let matrix: Vec<Object> = placement
            .text_matrix()
            .iter()
            .map(|v| Object::Real(*v as f32))
            .collect();

        operations.extend([
            Operation::new("q", vec![]),
            Operation::new("gs", vec![Object::Name(gs_name.into_bytes())]),
            Operation::new("rg", vec![Object::Real(r), Object::Real(g), Object::Real(b)]),
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![
                    Object::Name(FONT_NAME.as_bytes().to_vec()),
                    Object::Real(stamp.style.font_size),
                ],
            ),
            Operation::new("Tm", matrix),
            Operation::new(
                "Tj",
                vec![Object::String(text.clone(), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
            Operation::new("Q", vec![]),
        ]);
    }

    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content.encode()?));

    let mut fonts = Dictionary::new();
    fonts.set(FONT_NAME, Object::Reference(font_id));
    let mut resources = Dictionary::new();
    resources.set("Font", Object::Dictionary(fonts));
    resources.set("ExtGState", Object::Dictionary(graphics_states));

    let mut page = Dictionary::new();
    page.set("Type", Object::Name(b"Page".to_vec()));
    page.set("Parent", Object::Reference(pages_id));
    page.set("MediaBox", media_box(&options.page));
    page.set("Contents", Object::Reference(content_id));
    page.set("Resources", Object::Dictionary(resources));
    let page_id = doc.add_object(Object::Dictionary(page));

    let mut pages = Dictionary::new();
    pages.set("Type", Object::Name(b"Pages".to_vec()));
    pages.set("Kids", Object::Array(vec![Object::Reference(page_id)]));
    pages.set("Count", Object::Integer(1));
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = doc.add_object(Object::Dictionary(catalog));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    set_document_info(&mut doc, Some(options.text.as_str()));

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    doc.compress();
    doc.save(output)?;

    Ok(())
}

fn media_box(page: &PageDimensions) -> Object {
    Object::Array(vec![
        Object::Integer(0),
        Object::Integer(0),
        Object::Real(page.width.pt() as f32),
        Object::Real(page.height.pt() as f32),
    ])
}

/// Helvetica-Bold is one of the 14 standard PDF fonts, so nothing is embedded
fn helvetica_bold_font() -> Dictionary {
    let mut font = Dictionary::new();
    font.set("Type", Object::Name(b"Font".to_vec()));
    font.set("Subtype", Object::Name(b"Type1".to_vec()));
    font.set("BaseFont", Object::Name(b"Helvetica-Bold".to_vec()));
    font.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
    font
}

fn opacity_state(opacity: f32) -> Dictionary {
    let mut state = Dictionary::new();
    state.set("Type", Object::Name(b"ExtGState".to_vec()));
    state.set("ca", Object::Real(opacity));
    state.set("CA", Object::Real(opacity));
    state
}

/// Encode text as single-byte WinAnsi (Latin-1 subset); anything else becomes `?`
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c as u32 {
            code @ (0x20..=0x7e | 0xa0..=0xff) => code as u8,
            _ => b'?',
        })
        .collect()
}

/// Width of WinAnsi-encoded text in points
fn text_width(text: &[u8], font_size: f32) -> f32 {
    let units: u32 = text.iter().map(|&c| glyph_width(c)).sum();
    units as f32 * font_size / 1000.0
}

/// Helvetica-Bold advance widths in 1/1000 em (ASCII from the AFM)
fn glyph_width(c: u8) -> u32 {
    const ASCII_WIDTHS: [u16; 95] = [
        278, 333, 474, 556, 556, 889, 722, 238, 333, 333, // space ! " # $ % & ' ( )
        389, 584, 278, 333, 278, 278, 556, 556, 556, 556, // * + , - . / 0 1 2 3
        556, 556, 556, 556, 556, 556, 333, 333, 584, 584, // 4 5 6 7 8 9 : ; < =
        584, 611, 975, 722, 722, 722, 722, 667, 611, 778, // > ? @ A B C D E F G
        722, 278, 556, 722, 611, 833, 722, 778, 667, 778, // H I J K L M N O P Q
        722, 667, 611, 722, 667, 944, 667, 667, 611, 333, // R S T U V W X Y Z [
        278, 333, 584, 556, 333, 556, 611, 556, 611, 556, // \ ] ^ _ ` a b c d e
        333, 611, 611, 278, 278, 556, 278, 889, 611, 611, // f g h i j k l m n o
        611, 611, 389, 556, 333, 611, 556, 778, 556, 556, // p q r s t u v w x y
        500, 389, 280, 389, 584, // z { | } ~
    ];

    match c {
        0x20..=0x7e => ASCII_WIDTHS[(c - 0x20) as usize] as u32,
        // Latin-1 letters are close enough to the average lowercase width
        _ => 556,
    }
}
