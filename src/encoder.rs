/// The encoder boundary.
///
/// An [`Encoder`] builds a [`Symbol`] (one renderable QR configuration) from
/// [`RenderOptions`]. The module matrix is fixed at creation, since payload and error
/// correction level decide the symbol structure; every other option can be patched
/// on a live symbol through [`Symbol::update`].
///
/// [`StyledEncoder`] is the production implementation: the `qrcode` crate does the
/// encoding and [`crate::render`] does the drawing.
use image::RgbaImage;
use qrcode::QrCode;
use tracing::debug;

use crate::error::RenderError;
use crate::options::RenderOptions;
use crate::render::{self, Layout, ModuleMatrix};

/// Factory for encoder instances.
pub trait Encoder {
    type Symbol: Symbol;

    fn create(&self, options: &RenderOptions) -> Result<Self::Symbol, RenderError>;
}

/// One live encoder instance.
pub trait Symbol {
    /// Applies the styling parts of `options` without re-encoding.
    fn update(&mut self, options: &RenderOptions) -> Result<(), RenderError>;

    /// Side of the symbol in modules.
    fn module_count(&self) -> usize;

    /// The raster surface, used by PNG/JPEG/PDF export.
    fn to_image(&self) -> RgbaImage;

    fn to_svg(&self) -> String;

    /// Block character rendering for terminals.
    fn to_terminal(&self) -> String;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StyledEncoder;

impl Encoder for StyledEncoder {
    type Symbol = StyledSymbol;

    fn create(&self, options: &RenderOptions) -> Result<StyledSymbol, RenderError> {
        if options.data.is_empty() {
            return Err(RenderError::EmptyPayload);
        }
        let code = QrCode::with_error_correction_level(
            options.data.as_bytes(),
            options.error_correction.to_ec_level(),
        )
        .map_err(|e| RenderError::Encode(e.to_string()))?;

        let count = code.width();
        let dark = code
            .to_colors()
            .into_iter()
            .map(|color| color == qrcode::Color::Dark)
            .collect();
        let matrix = ModuleMatrix::new(count, dark);
        let layout = Layout::compute(options, count)?;

        debug!(
            modules = count,
            level = %options.error_correction,
            cell = layout.cell,
            "encoder instance created"
        );
        Ok(StyledSymbol {
            matrix,
            layout,
            options: options.clone(),
        })
    }
}

/// An encoded symbol together with the styling it is drawn with.
#[derive(Debug, Clone)]
pub struct StyledSymbol {
    matrix: ModuleMatrix,
    layout: Layout,
    options: RenderOptions,
}

impl StyledSymbol {
    pub fn matrix(&self) -> &ModuleMatrix {
        &self.matrix
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }
}

impl Symbol for StyledSymbol {
    fn update(&mut self, options: &RenderOptions) -> Result<(), RenderError> {
        let layout = Layout::compute(options, self.matrix.count())?;
        let (data, level) = (
            self.options.data.clone(),
            self.options.error_correction,
        );
        self.options = RenderOptions {
            data,
            error_correction: level,
            ..options.clone()
        };
        self.layout = layout;
        Ok(())
    }

    fn module_count(&self) -> usize {
        self.matrix.count()
    }

    fn to_image(&self) -> RgbaImage {
        render::draw_image(&self.matrix, &self.layout, &self.options)
    }

    fn to_svg(&self) -> String {
        render::draw_svg(&self.matrix, &self.layout, &self.options)
    }

    fn to_terminal(&self) -> String {
        render::draw_terminal(&self.matrix)
    }
}
