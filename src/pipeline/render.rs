//! PDF rasterisation: render the first page of each compiled snippet.
//!
//! Each snippet document fits on one page, so only page 1 is rendered. The
//! page is scaled by `dpi / 72` (PDF user space is 72 units per inch), then
//! cropped by [`crate::pipeline::crop`] and saved as a PNG next to its PDF.
//!
//! ## Which pdfium?
//!
//! `pdfium-render` binds to a shared library at runtime. Lookup order:
//! explicit config path, `PDFIUM_LIB_PATH`, the current directory, then the
//! system library. Failing to bind at all is fatal; a single unreadable PDF
//! only fails its own snippet.

use crate::error::{SnippetError, TexImgError};
use crate::output::{SnippetRecord, SnippetStatus};
use crate::pipeline::crop::{self, CropSettings};
use image::{DynamicImage, ImageFormat};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Renders the first page of a PDF into an image.
pub trait PageRasterizer: Send + Sync {
    /// Rasterise page 1 of `pdf_path` at `dpi`.
    ///
    /// Return [`TexImgError::PdfiumBindingFailed`] only when no PDF could
    /// ever be rendered; any other error fails just this snippet.
    fn rasterize_first_page(&self, pdf_path: &Path, dpi: u32) -> Result<DynamicImage, TexImgError>;
}

/// [`PageRasterizer`] backed by pdfium-render.
#[derive(Debug, Clone, Default)]
pub struct PdfiumRasterizer {
    library_path: Option<PathBuf>,
}

impl PdfiumRasterizer {
    pub fn new(library_path: Option<PathBuf>) -> Self {
        Self { library_path }
    }

    fn bind(&self) -> Result<Pdfium, TexImgError> {
        let explicit = self
            .library_path
            .clone()
            .or_else(|| std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from));

        let bindings = match explicit {
            Some(path) => {
                let lib = if path.is_dir() {
                    PathBuf::from(Pdfium::pdfium_platform_library_name_at_path(&path))
                } else {
                    path
                };
                debug!("Binding pdfium from {}", lib.display());
                Pdfium::bind_to_library(&lib)
            }
            None => Pdfium::bind_to_library(&Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library()),
        }
        .map_err(|e| TexImgError::PdfiumBindingFailed(format!("{:?}", e)))?;

        Ok(Pdfium::new(bindings))
    }
}

impl PageRasterizer for PdfiumRasterizer {
    fn rasterize_first_page(&self, pdf_path: &Path, dpi: u32) -> Result<DynamicImage, TexImgError> {
        let pdfium = self.bind()?;

        let document = pdfium
            .load_pdf_from_file(pdf_path, None)
            .map_err(|e| TexImgError::CorruptPdf {
                path: pdf_path.to_path_buf(),
                detail: format!("{:?}", e),
            })?;

        let page = document
            .pages()
            .get(0)
            .map_err(|e| TexImgError::RasterisationFailed {
                path: pdf_path.to_path_buf(),
                detail: format!("{:?}", e),
            })?;

        let render_config = PdfRenderConfig::new().scale_page_by_factor(dpi as f32 / 72.0);
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| TexImgError::RasterisationFailed {
                path: pdf_path.to_path_buf(),
                detail: format!("{:?}", e),
            })?;

        let image = bitmap.as_image();
        debug!(
            "Rendered {} → {}x{} px",
            pdf_path.display(),
            image.width(),
            image.height()
        );
        Ok(image)
    }
}

/// Rasterise, crop and save one compiled snippet. Records in any other state
/// pass through.
///
/// Only a pdfium binding failure is returned as `Err`.
pub fn render_snippet(
    rasterizer: &dyn PageRasterizer,
    record: SnippetRecord,
    dpi: u32,
    crop_settings: &CropSettings,
) -> Result<SnippetRecord, TexImgError> {
    let SnippetStatus::Compiled { pdf_path } = &record.status else {
        return Ok(record);
    };
    let pdf_path = pdf_path.clone();
    let ordinal = record.ordinal;

    let image = match rasterizer.rasterize_first_page(&pdf_path, dpi) {
        Ok(image) => image,
        Err(e @ TexImgError::PdfiumBindingFailed(_)) => return Err(e),
        Err(e) => {
            warn!("Snippet {}: {}", ordinal, e);
            return Ok(record.with_status(SnippetStatus::Failed {
                error: SnippetError::RasterisationFailed {
                    ordinal,
                    detail: e.to_string(),
                },
            }));
        }
    };

    let cropped = crop::trim(&image, crop_settings);
    let image_path = pdf_path.with_extension("png");

    if let Err(e) = cropped.save_with_format(&image_path, ImageFormat::Png) {
        warn!("Snippet {}: failed to save {}: {}", ordinal, image_path.display(), e);
        return Ok(record.with_status(SnippetStatus::Failed {
            error: SnippetError::ImageWriteFailed {
                ordinal,
                path: image_path,
                detail: e.to_string(),
            },
        }));
    }

    info!(
        "Snippet {}: saved {} ({}x{} px)",
        ordinal,
        image_path.display(),
        cropped.width(),
        cropped.height()
    );
    Ok(record.with_status(SnippetStatus::Rasterized { image_path }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    struct FixedPage;

    impl PageRasterizer for FixedPage {
        fn rasterize_first_page(&self, _pdf: &Path, _dpi: u32) -> Result<DynamicImage, TexImgError> {
            let mut img = RgbaImage::from_pixel(300, 300, Rgba([255, 255, 255, 255]));
            for y in 140..160 {
                for x in 120..180 {
                    img.put_pixel(x, y, Rgba([0, 0, 0, 255]));
                }
            }
            Ok(DynamicImage::ImageRgba8(img))
        }
    }

    struct Failing(fn(&Path) -> TexImgError);

    impl PageRasterizer for Failing {
        fn rasterize_first_page(&self, pdf: &Path, _dpi: u32) -> Result<DynamicImage, TexImgError> {
            Err((self.0)(pdf))
        }
    }

    fn compiled(dir: &Path) -> SnippetRecord {
        SnippetRecord {
            ordinal: 1,
            source: "x".into(),
            tex_path: dir.join("tex_snip_1.tex"),
            status: SnippetStatus::Compiled {
                pdf_path: dir.join("tex_snip_1.pdf"),
            },
        }
    }

    #[test]
    fn saves_cropped_png_next_to_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let r = render_snippet(&FixedPage, compiled(dir.path()), 300, &CropSettings::default())
            .unwrap();

        let expected = dir.path().join("tex_snip_1.png");
        assert_eq!(r.image_path(), Some(&expected));
        let saved = image::open(&expected).unwrap();
        assert_eq!((saved.width(), saved.height()), (160, 120));
    }

    #[test]
    fn corrupt_pdf_fails_only_this_snippet() {
        let dir = tempfile::tempdir().unwrap();
        let rasterizer = Failing(|p| TexImgError::CorruptPdf {
            path: p.to_path_buf(),
            detail: "bad xref".into(),
        });
        let r = render_snippet(&rasterizer, compiled(dir.path()), 300, &CropSettings::default())
            .unwrap();
        assert!(matches!(
            r.error(),
            Some(SnippetError::RasterisationFailed { ordinal: 1, detail }) if detail.contains("bad xref")
        ));
    }

    #[test]
    fn binding_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let rasterizer = Failing(|_| TexImgError::PdfiumBindingFailed("no lib".into()));
        let err = render_snippet(&rasterizer, compiled(dir.path()), 300, &CropSettings::default())
            .unwrap_err();
        assert!(matches!(err, TexImgError::PdfiumBindingFailed(_)));
    }

    #[test]
    fn non_compiled_records_pass_through() {
        let record = SnippetRecord {
            ordinal: 0,
            source: String::new(),
            tex_path: PathBuf::from("fig/tex_snip_0.tex"),
            status: SnippetStatus::Pending,
        };
        let out = render_snippet(&FixedPage, record.clone(), 300, &CropSettings::default()).unwrap();
        assert_eq!(out, record);
    }

    #[test]
    fn missing_pdfium_library_reports_binding_failure() {
        let rasterizer = PdfiumRasterizer::new(Some(PathBuf::from("/definitely/not/libpdfium.so")));
        let err = rasterizer
            .rasterize_first_page(Path::new("whatever.pdf"), 300)
            .unwrap_err();
        assert!(matches!(err, TexImgError::PdfiumBindingFailed(_)));
    }
}
