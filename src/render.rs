/// Styled drawing of an encoded module matrix.
///
/// The encoder hands over a square matrix of dark/light modules; this module lays it
/// out on a canvas and draws it as a raster image, an SVG document or terminal block
/// characters. Data modules follow the dot style, the three finder patterns follow
/// the corner styles, and an optional logo is centered on top.
use image::imageops::{self, FilterType};
use image::{ImageBuffer, Rgba, RgbaImage};

use crate::error::RenderError;
use crate::options::{Background, CornerStyle, DotStyle, RenderOptions};

/// Side of a finder pattern, in modules.
const FINDER: usize = 7;

/// Largest canvas side accepted, in pixels.
pub const MAX_CANVAS_SIDE: u32 = 4096;

/// Square grid of modules, `true` meaning dark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleMatrix {
    count: usize,
    dark: Vec<bool>,
}

impl ModuleMatrix {
    pub fn new(count: usize, dark: Vec<bool>) -> ModuleMatrix {
        assert_eq!(dark.len(), count * count, "matrix must be square");
        ModuleMatrix { count, dark }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Returns the module at `(x, y)`; anything outside the grid is light.
    pub fn is_dark(&self, x: i64, y: i64) -> bool {
        let n = self.count as i64;
        (0..n).contains(&x) && (0..n).contains(&y) && self.dark[(y * n + x) as usize]
    }

    /// Top-left module coordinates of the three finder patterns.
    pub fn finder_origins(&self) -> [(usize, usize); 3] {
        let far = self.count.saturating_sub(FINDER);
        [(0, 0), (far, 0), (0, far)]
    }

    pub fn in_finder(&self, x: usize, y: usize) -> bool {
        self.finder_origins()
            .iter()
            .any(|&(fx, fy)| (fx..fx + FINDER).contains(&x) && (fy..fy + FINDER).contains(&y))
    }
}

/// Where the symbol lands on the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    pub cell: u32,
    pub origin_x: u32,
    pub origin_y: u32,
    pub count: usize,
    /// Logo rectangle `(x, y, width, height)` in canvas pixels.
    pub logo: Option<(u32, u32, u32, u32)>,
}

impl Layout {
    /// Places a `count` x `count` matrix on the canvas described by `options`.
    ///
    /// # Errors
    ///
    /// [`RenderError::CanvasTooLarge`] when either side exceeds [`MAX_CANVAS_SIDE`], and
    /// [`RenderError::CanvasTooSmall`] when the margins leave less than one pixel per
    /// module.
    pub fn compute(options: &RenderOptions, count: usize) -> Result<Layout, RenderError> {
        if options.width > MAX_CANVAS_SIDE || options.height > MAX_CANVAS_SIDE {
            return Err(RenderError::CanvasTooLarge {
                width: options.width,
                height: options.height,
                max: MAX_CANVAS_SIDE,
            });
        }
        let too_small = || RenderError::CanvasTooSmall {
            width: options.width,
            height: options.height,
            margin: options.margin,
            modules: count,
        };
        let available = options
            .width
            .min(options.height)
            .checked_sub(options.margin.saturating_mul(2))
            .ok_or_else(too_small)?;
        let cell = available / count.max(1) as u32;
        if cell == 0 {
            return Err(too_small());
        }

        let side = cell * count as u32;
        let origin_x = (options.width - side) / 2;
        let origin_y = (options.height - side) / 2;

        let logo = options.logo.as_ref().map(|logo| {
            let max_side = (side as f32 * options.image_options.image_size).floor().max(1.0);
            let scale = max_side / logo.width().max(logo.height()) as f32;
            let w = ((logo.width() as f32 * scale).round() as u32).max(1);
            let h = ((logo.height() as f32 * scale).round() as u32).max(1);
            (
                origin_x + side.saturating_sub(w) / 2,
                origin_y + side.saturating_sub(h) / 2,
                w,
                h,
            )
        });

        Ok(Layout {
            cell,
            origin_x,
            origin_y,
            count,
            logo,
        })
    }

    /// Pixel origin of module `(x, y)`.
    fn cell_origin(&self, x: usize, y: usize) -> (f32, f32) {
        (
            (self.origin_x + x as u32 * self.cell) as f32,
            (self.origin_y + y as u32 * self.cell) as f32,
        )
    }

    /// Whether module `(x, y)` sits under the logo or its clear space.
    fn hidden_by_logo(&self, options: &RenderOptions, x: usize, y: usize) -> bool {
        let Some((lx, ly, lw, lh)) = self.logo else {
            return false;
        };
        if !options.image_options.hide_background_dots {
            return false;
        }
        let pad = options.image_options.margin as f32;
        let (cx, cy) = self.cell_origin(x, y);
        let cell = self.cell as f32;
        cx + cell > lx as f32 - pad
            && cx < (lx + lw) as f32 + pad
            && cy + cell > ly as f32 - pad
            && cy < (ly + lh) as f32 + pad
    }
}

/// A rectangle with independent corner radii, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
struct RoundedRect {
    x: f32,
    y: f32,
    w: f32,
    h: f32,
    /// top-left, top-right, bottom-right, bottom-left
    radii: [f32; 4],
}

impl RoundedRect {
    fn uniform(x: f32, y: f32, side: f32, radius: f32) -> RoundedRect {
        RoundedRect {
            x,
            y,
            w: side,
            h: side,
            radii: [radius; 4],
        }
    }

    fn contains(&self, px: f32, py: f32) -> bool {
        let (x0, y0, x1, y1) = (self.x, self.y, self.x + self.w, self.y + self.h);
        if px < x0 || py < y0 || px >= x1 || py >= y1 {
            return false;
        }
        let [tl, tr, br, bl] = self.radii;
        let corners = [
            (px < x0 + tl && py < y0 + tl, x0 + tl, y0 + tl, tl),
            (px > x1 - tr && py < y0 + tr, x1 - tr, y0 + tr, tr),
            (px > x1 - br && py > y1 - br, x1 - br, y1 - br, br),
            (px < x0 + bl && py > y1 - bl, x0 + bl, y1 - bl, bl),
        ];
        corners.iter().all(|&(inside_corner, cx, cy, r)| {
            !inside_corner || (px - cx).powi(2) + (py - cy).powi(2) <= r * r
        })
    }

    fn svg_path(&self) -> String {
        let (x0, y0, x1, y1) = (self.x, self.y, self.x + self.w, self.y + self.h);
        let [tl, tr, br, bl] = self.radii;
        let mut d = format!("M{},{}H{}", x0 + tl, y0, x1 - tr);
        if tr > 0.0 {
            d += &format!("A{tr},{tr} 0 0 1 {},{}", x1, y0 + tr);
        }
        d += &format!("V{}", y1 - br);
        if br > 0.0 {
            d += &format!("A{br},{br} 0 0 1 {},{}", x1 - br, y1);
        }
        d += &format!("H{}", x0 + bl);
        if bl > 0.0 {
            d += &format!("A{bl},{bl} 0 0 1 {},{}", x0, y1 - bl);
        }
        d += &format!("V{}", y0 + tl);
        if tl > 0.0 {
            d += &format!("A{tl},{tl} 0 0 1 {},{}", x0 + tl, y0);
        }
        d.push('Z');
        d
    }
}

/// Corner radii of one data module as fractions of the cell side.
fn dot_radii(style: DotStyle, matrix: &ModuleMatrix, x: usize, y: usize) -> [f32; 4] {
    let (x, y) = (x as i64, y as i64);
    let left = matrix.is_dark(x - 1, y);
    let right = matrix.is_dark(x + 1, y);
    let top = matrix.is_dark(x, y - 1);
    let bottom = matrix.is_dark(x, y + 1);
    let round = |free: bool| if free { 0.5 } else { 0.0 };

    match style {
        DotStyle::Square => [0.0; 4],
        DotStyle::Dots => [0.5; 4],
        DotStyle::Rounded => [
            round(!left && !top),
            round(!top && !right),
            round(!right && !bottom),
            round(!bottom && !left),
        ],
        DotStyle::ClassyRounded => [
            round(!left && !top),
            0.0,
            round(!right && !bottom),
            0.0,
        ],
    }
}

/// Radii, in cells, of (outer ring, ring hole) for a corner square style.
fn corner_square_radii(style: CornerStyle) -> (f32, f32) {
    match style {
        CornerStyle::Square => (0.0, 0.0),
        CornerStyle::ExtraRounded => (2.5, 1.5),
        CornerStyle::Dot => (3.5, 2.5),
    }
}

/// Radius, in cells, of the 3x3 center of a finder pattern.
fn corner_dot_radius(style: CornerStyle) -> f32 {
    match style {
        CornerStyle::Square => 0.0,
        CornerStyle::ExtraRounded => 1.0,
        CornerStyle::Dot => 1.5,
    }
}

/// Every shape to fill, tagged with whether it is a ring (outer minus inner).
enum Shape {
    Solid(RoundedRect),
    Ring(RoundedRect, RoundedRect),
}

impl Shape {
    fn contains(&self, px: f32, py: f32) -> bool {
        match self {
            Shape::Solid(rect) => rect.contains(px, py),
            Shape::Ring(outer, inner) => outer.contains(px, py) && !inner.contains(px, py),
        }
    }

    fn bounds(&self) -> (f32, f32, f32, f32) {
        let rect = match self {
            Shape::Solid(rect) | Shape::Ring(rect, _) => rect,
        };
        (rect.x, rect.y, rect.w, rect.h)
    }
}

fn shapes(matrix: &ModuleMatrix, layout: &Layout, options: &RenderOptions) -> Vec<Shape> {
    let cell = layout.cell as f32;
    let mut out = Vec::new();

    for &(fx, fy) in matrix.finder_origins().iter() {
        let (x, y) = layout.cell_origin(fx, fy);
        let (outer_r, inner_r) = corner_square_radii(options.corner_square_style);
        out.push(Shape::Ring(
            RoundedRect::uniform(x, y, 7.0 * cell, outer_r * cell),
            RoundedRect::uniform(x + cell, y + cell, 5.0 * cell, inner_r * cell),
        ));
        out.push(Shape::Solid(RoundedRect::uniform(
            x + 2.0 * cell,
            y + 2.0 * cell,
            3.0 * cell,
            corner_dot_radius(options.corner_dot_style) * cell,
        )));
    }

    for y in 0..matrix.count() {
        for x in 0..matrix.count() {
            if !matrix.is_dark(x as i64, y as i64)
                || matrix.in_finder(x, y)
                || layout.hidden_by_logo(options, x, y)
            {
                continue;
            }
            let (px, py) = layout.cell_origin(x, y);
            let radii = dot_radii(options.dot_style, matrix, x, y).map(|r| r * cell);
            out.push(Shape::Solid(RoundedRect {
                x: px,
                y: py,
                w: cell,
                h: cell,
                radii,
            }));
        }
    }
    out
}

/// Draws the symbol onto a `width` x `height` RGBA canvas.
pub fn draw_image(matrix: &ModuleMatrix, layout: &Layout, options: &RenderOptions) -> RgbaImage {
    let mut canvas: RgbaImage =
        ImageBuffer::from_pixel(options.width, options.height, Rgba(options.background.rgba()));
    let ink = Rgba(options.foreground.rgba(255));

    for shape in shapes(matrix, layout, options) {
        let (x, y, w, h) = shape.bounds();
        let (x0, y0) = (x.floor() as u32, y.floor() as u32);
        let x1 = ((x + w).ceil() as u32).min(options.width);
        let y1 = ((y + h).ceil() as u32).min(options.height);
        for py in y0..y1 {
            for px in x0..x1 {
                if shape.contains(px as f32 + 0.5, py as f32 + 0.5) {
                    canvas.put_pixel(px, py, ink);
                }
            }
        }
    }

    if let (Some(logo), Some((lx, ly, lw, lh))) = (options.logo.as_ref(), layout.logo) {
        let scaled = imageops::resize(logo.image(), lw, lh, FilterType::Lanczos3);
        imageops::overlay(&mut canvas, &scaled, lx as i64, ly as i64);
    }
    canvas
}

/// Returns a string of SVG code for the styled symbol. Always uses Unix newlines.
pub fn draw_svg(matrix: &ModuleMatrix, layout: &Layout, options: &RenderOptions) -> String {
    let mut result = String::new();
    result += "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";
    result += &format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" version=\"1.1\" width=\"{0}\" height=\"{1}\" viewBox=\"0 0 {0} {1}\" stroke=\"none\">\n",
        options.width, options.height
    );
    if let Background::Color(color) = options.background {
        result += &format!("\t<rect width=\"100%\" height=\"100%\" fill=\"{color}\"/>\n");
    }

    let mut paths = String::new();
    for shape in shapes(matrix, layout, options) {
        match shape {
            Shape::Solid(rect) => paths += &rect.svg_path(),
            Shape::Ring(outer, inner) => {
                paths += &outer.svg_path();
                paths += &inner.svg_path();
            }
        }
    }
    result += &format!(
        "\t<path d=\"{paths}\" fill=\"{}\" fill-rule=\"evenodd\"/>\n",
        options.foreground
    );

    if let (Some(logo), Some((lx, ly, lw, lh))) = (options.logo.as_ref(), layout.logo) {
        result += &format!(
            "\t<image x=\"{lx}\" y=\"{ly}\" width=\"{lw}\" height=\"{lh}\" href=\"{}\"/>\n",
            logo.data_url()
        );
    }
    result += "</svg>\n";
    result
}

/// Renders the bare matrix as block characters with a four module border.
pub fn draw_terminal(matrix: &ModuleMatrix) -> String {
    let border: i64 = 4;
    let size = matrix.count() as i64;
    let mut out = String::new();
    for y in -border..size + border {
        for x in -border..size + border {
            let c = if matrix.is_dark(x, y) { '█' } else { ' ' };
            out.push(c);
            out.push(c);
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Color;

    /// 21x21 matrix with only the three finder rings and centers set.
    fn finder_only() -> ModuleMatrix {
        let n = 21;
        let mut dark = vec![false; n * n];
        for &(fx, fy) in &[(0usize, 0usize), (14, 0), (0, 14)] {
            for dy in 0..7 {
                for dx in 0..7 {
                    let ring = dx == 0 || dy == 0 || dx == 6 || dy == 6;
                    let center = (2..5).contains(&dx) && (2..5).contains(&dy);
                    dark[(fy + dy) * n + fx + dx] = ring || center;
                }
            }
        }
        dark[10 * n + 10] = true;
        ModuleMatrix::new(n, dark)
    }

    fn options(size: u32, margin: u32) -> RenderOptions {
        RenderOptions {
            width: size,
            height: size,
            margin,
            data: "x".into(),
            ..RenderOptions::default()
        }
    }

    #[test]
    fn test_layout_centers_symbol() {
        let layout = Layout::compute(&options(100, 4), 21).unwrap();
        assert_eq!(layout.cell, 4);
        assert_eq!((layout.origin_x, layout.origin_y), (8, 8));
    }

    #[test]
    fn test_layout_too_small() {
        assert!(matches!(
            Layout::compute(&options(20, 0), 21),
            Err(RenderError::CanvasTooSmall { .. })
        ));
        assert!(Layout::compute(&options(30, 20), 21).is_err());
    }

    #[test]
    fn test_layout_too_large() {
        assert!(Layout::compute(&options(MAX_CANVAS_SIDE, 4), 21).is_ok());
        assert_eq!(
            Layout::compute(&options(u32::MAX, 4), 21),
            Err(RenderError::CanvasTooLarge {
                width: u32::MAX,
                height: u32::MAX,
                max: MAX_CANVAS_SIDE,
            })
        );
    }

    #[test]
    fn test_rounded_rect_corners() {
        let rect = RoundedRect::uniform(0.0, 0.0, 10.0, 5.0);
        assert!(rect.contains(5.0, 5.0));
        assert!(!rect.contains(0.5, 0.5));
        assert!(!rect.contains(9.5, 9.5));
        let square = RoundedRect::uniform(0.0, 0.0, 10.0, 0.0);
        assert!(square.contains(0.5, 0.5));
        assert!(!square.contains(10.0, 5.0));
    }

    #[test]
    fn test_rounded_dot_radii_follow_neighbors() {
        let matrix = finder_only();
        assert_eq!(dot_radii(DotStyle::Rounded, &matrix, 10, 10), [0.5; 4]);
        // Top-left corner of the ring has neighbors to the right and below.
        assert_eq!(
            dot_radii(DotStyle::Rounded, &matrix, 0, 0),
            [0.5, 0.0, 0.0, 0.0]
        );
        assert_eq!(
            dot_radii(DotStyle::ClassyRounded, &matrix, 10, 10),
            [0.5, 0.0, 0.5, 0.0]
        );
    }

    #[test]
    fn test_draw_image_colors() {
        let matrix = finder_only();
        let opts = RenderOptions {
            foreground: Color { r: 10, g: 20, b: 30 },
            ..options(100, 4)
        };
        let layout = Layout::compute(&opts, matrix.count()).unwrap();
        let img = draw_image(&matrix, &layout, &opts);
        assert_eq!(img.dimensions(), (100, 100));
        assert_eq!(img.get_pixel(0, 0).0, [255, 255, 255, 255]);
        // First module of the top-left finder ring.
        assert_eq!(img.get_pixel(9, 9).0, [10, 20, 30, 255]);
    }

    #[test]
    fn test_transparent_background() {
        let matrix = finder_only();
        let opts = RenderOptions {
            background: Background::Transparent,
            ..options(100, 4)
        };
        let layout = Layout::compute(&opts, matrix.count()).unwrap();
        let img = draw_image(&matrix, &layout, &opts);
        assert_eq!(img.get_pixel(0, 0).0[3], 0);
    }

    #[test]
    fn test_svg_document() {
        let matrix = finder_only();
        let opts = options(100, 4);
        let layout = Layout::compute(&opts, matrix.count()).unwrap();
        let svg = draw_svg(&matrix, &layout, &opts);
        assert!(svg.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(svg.contains("fill=\"#ffffff\""));
        assert!(svg.contains("fill=\"#000000\" fill-rule=\"evenodd\""));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn test_terminal_dimensions() {
        let text = draw_terminal(&finder_only());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 29);
        assert_eq!(lines[0].chars().count(), 58);
    }
}
