//! Page layout calculations for watermark text

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Simple length type in millimeters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Length(pub f64);

impl Length {
    /// Create a length from millimeters
    pub fn from_mm(mm: f64) -> Self {
        Length(mm)
    }

    /// Create a length from inches
    pub fn from_inches(inches: f64) -> Self {
        Length(inches * 25.4)
    }

    /// Create a length from points (1/72 inch)
    pub fn from_pt(pt: f64) -> Self {
        Length(pt * 25.4 / 72.0)
    }

    /// Get the value in millimeters
    pub fn mm(&self) -> f64 {
        self.0
    }

    /// Get the value in points (1/72 inch)
    pub fn pt(&self) -> f64 {
        self.0 * 72.0 / 25.4
    }
}

/// Page dimensions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageDimensions {
    pub width: Length,
    pub height: Length,
}

impl PageDimensions {
    /// US Letter size (8.5" × 11")
    pub fn letter() -> Self {
        Self {
            width: Length::from_mm(215.9),
            height: Length::from_mm(279.4),
        }
    }

    /// A4 size (210mm × 297mm)
    pub fn a4() -> Self {
        Self {
            width: Length::from_mm(210.0),
            height: Length::from_mm(297.0),
        }
    }
}

impl Default for PageDimensions {
    fn default() -> Self {
        Self::letter()
    }
}

/// Where a watermark stamp sits on the page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// Diagonal across the page center
    Center,
    /// Horizontally centered near the top edge
    Header,
    /// Horizontally centered near the bottom edge
    Footer,
}

impl FromStr for Position {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "center" => Ok(Position::Center),
            "header" => Ok(Position::Header),
            "footer" => Ok(Position::Footer),
            other => Err(Error::InvalidPosition(other.to_string())),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Position::Center => "center",
            Position::Header => "header",
            Position::Footer => "footer",
        };
        f.write_str(name)
    }
}

/// Text matrix for one line of watermark text, in points
///
/// `(x, y)` is the start of the baseline; the text runs along `angle_deg`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub angle_deg: f64,
}

impl Placement {
    /// PDF text matrix `[a b c d e f]` for this placement
    pub fn text_matrix(&self) -> [f64; 6] {
        let (sin, cos) = self.angle_deg.to_radians().sin_cos();
        [cos, sin, -sin, cos, self.x, self.y]
    }
}

/// Angle of the diagonal center stamp
pub const DIAGONAL_ANGLE_DEG: f64 = 45.0;

/// Place a line of text of the given width so that it is centered for `position`
///
/// The coordinate system has origin at bottom-left of the page.
pub fn place_text(
    position: Position,
    page: &PageDimensions,
    text_width: Length,
    edge_margin: Length,
) -> Placement {
    let width = page.width.pt();
    let height = page.height.pt();
    let half_text = text_width.pt() / 2.0;

    match position {
        Position::Center => {
            // Walk back half the text width along the rotated baseline
            let (sin, cos) = DIAGONAL_ANGLE_DEG.to_radians().sin_cos();
            Placement {
                x: width / 2.0 - half_text * cos,
                y: height / 2.0 - half_text * sin,
                angle_deg: DIAGONAL_ANGLE_DEG,
            }
        }
        Position::Header => Placement {
            x: width / 2.0 - half_text,
            y: height - edge_margin.pt(),
            angle_deg: 0.0,
        },
        Position::Footer => Placement {
            x: width / 2.0 - half_text,
            y: edge_margin.pt(),
            angle_deg: 0.0,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_conversions() {
        let len = Length::from_inches(1.0);
        assert!((len.mm() - 25.4).abs() < 0.01);
        assert!((len.pt() - 72.0).abs() < 0.01);
        assert!((Length::from_pt(40.0).pt() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_letter_size() {
        let letter = PageDimensions::letter();
        assert!((letter.width.pt() - 612.0).abs() < 0.01);
        assert!((letter.height.pt() - 792.0).abs() < 0.01);
    }

    #[test]
    fn test_parse_position() {
        assert_eq!("center".parse::<Position>().unwrap(), Position::Center);
        assert_eq!("header".parse::<Position>().unwrap(), Position::Header);
        assert_eq!("footer".parse::<Position>().unwrap(), Position::Footer);

        let err = "diagonal".parse::<Position>().unwrap_err();
        assert!(matches!(err, Error::InvalidPosition(ref p) if p == "diagonal"));
        // Matching is exact
        assert!("Center".parse::<Position>().is_err());
    }

    #[test]
    fn test_header_and_footer_mirror() {
        let page = PageDimensions::letter();
        let margin = Length::from_pt(40.0);
        let text = Length::from_pt(100.0);

        let header = place_text(Position::Header, &page, text, margin);
        let footer = place_text(Position::Footer, &page, text, margin);

        assert!((header.x - 256.0).abs() < 0.01);
        assert!((footer.x - header.x).abs() < 1e-9);
        assert!((header.y - 752.0).abs() < 0.01);
        assert!((footer.y - 40.0).abs() < 0.01);
        assert_eq!(header.text_matrix()[..4], [1.0, 0.0, -0.0, 1.0]);
    }

    #[test]
    fn test_center_is_diagonal_through_page_center() {
        let page = PageDimensions::letter();
        let text = Length::from_pt(200.0);
        let placement = place_text(Position::Center, &page, text, Length::from_pt(40.0));

        assert_eq!(placement.angle_deg, DIAGONAL_ANGLE_DEG);

        // Midpoint of the baseline lands on the page center
        let [a, b, _, _, e, f] = placement.text_matrix();
        let mid_x = e + a * 100.0;
        let mid_y = f + b * 100.0;
        assert!((mid_x - 306.0).abs() < 0.01);
        assert!((mid_y - 396.0).abs() < 0.01);
    }
}
