use super::image_line::LcdImageLine;

/// A complete frame: `height` lines of `width` pixels.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LcdImage {
    width: usize,
    height: usize,
    lines: Vec<LcdImageLine>,
}

impl LcdImage {
    pub fn new(width: usize, height: usize, lines: Vec<LcdImageLine>) -> Self {
        assert!(width > 0 && width % 32 == 0, "invalid image width {width}");
        assert!(height > 0, "image height must be positive");
        assert_eq!(lines.len(), height, "image needs exactly one line per row");
        assert!(
            lines.iter().all(|line| line.size() == width),
            "every line must be {width} pixels wide"
        );
        Self {
            width,
            height,
            lines,
        }
    }

    /// An image whose pixels are all colour 0.
    pub fn blank(width: usize, height: usize) -> Self {
        Self::new(width, height, vec![LcdImageLine::blank(width); height])
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn line(&self, y: usize) -> &LcdImageLine {
        &self.lines[y]
    }

    pub fn lines(&self) -> &[LcdImageLine] {
        &self.lines
    }

    /// Colour index (0..=3) of the pixel at `(x, y)`.
    pub fn get(&self, x: usize, y: usize) -> u8 {
        assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of range");
        self.lines[y].color(x)
    }
}

/// Single-use builder; rows not set stay blank.
#[derive(Debug)]
pub struct Builder {
    width: usize,
    lines: Vec<LcdImageLine>,
}

impl Builder {
    pub fn new(width: usize, height: usize) -> Self {
        assert!(height > 0, "image height must be positive");
        Self {
            width,
            lines: vec![LcdImageLine::blank(width); height],
        }
    }

    pub fn set_line(&mut self, index: usize, line: LcdImageLine) -> &mut Self {
        assert!(
            index < self.lines.len(),
            "line index {index} out of range for height {}",
            self.lines.len()
        );
        assert_eq!(line.size(), self.width, "line width does not match image");
        self.lines[index] = line;
        self
    }

    pub fn build(self) -> LcdImage {
        let height = self.lines.len();
        LcdImage::new(self.width, height, self.lines)
    }
}
