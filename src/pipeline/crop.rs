//! Bounding-box cropping of rendered snippet pages.
//!
//! A rendered snippet is a full page with a small island of ink. The
//! background colour is taken from the top-left pixel; every pixel whose
//! doubled per-channel difference from it exceeds the noise bias counts as
//! content. The content box is padded by a fixed margin and clipped to the
//! page.

use image::{DynamicImage, GenericImageView};

/// Cropping parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropSettings {
    /// Padding added on all four sides of the content box, in pixels.
    pub margin: u32,
    /// Subtracted from the doubled difference; differences of
    /// `noise_bias / 2` or less are treated as background.
    pub noise_bias: u8,
}

impl Default for CropSettings {
    fn default() -> Self {
        Self {
            margin: 50,
            noise_bias: 50,
        }
    }
}

/// Pixel rectangle; `right` and `bottom` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl BoundingBox {
    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }

    /// Grow by `margin` on every side without leaving a `width × height` image.
    pub fn expand_within(&self, margin: u32, width: u32, height: u32) -> Self {
        Self {
            left: self.left.saturating_sub(margin),
            top: self.top.saturating_sub(margin),
            right: self.right.saturating_add(margin).min(width),
            bottom: self.bottom.saturating_add(margin).min(height),
        }
    }
}

/// Whether a single channel differs enough from the background to be ink.
fn is_content(channel: u8, background: u8, noise_bias: u8) -> bool {
    let diff = channel.abs_diff(background) as u16;
    let boosted = (diff * 2).min(255);
    boosted > noise_bias as u16
}

/// Bounding box of everything that is not background, or `None` for a
/// uniform image.
pub fn content_bbox(image: &DynamicImage, noise_bias: u8) -> Option<BoundingBox> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return None;
    }

    let rgba = image.to_rgba8();
    let background = rgba.get_pixel(0, 0).0;
    let mut bbox: Option<BoundingBox> = None;

    for (x, y, pixel) in rgba.enumerate_pixels() {
        let ink = pixel
            .0
            .iter()
            .zip(background.iter())
            .any(|(&c, &bg)| is_content(c, bg, noise_bias));
        if !ink {
            continue;
        }
        bbox = Some(match bbox {
            None => BoundingBox {
                left: x,
                top: y,
                right: x + 1,
                bottom: y + 1,
            },
            Some(b) => BoundingBox {
                left: b.left.min(x),
                top: b.top.min(y),
                right: b.right.max(x + 1),
                bottom: b.bottom.max(y + 1),
            },
        });
    }

    bbox
}

/// Crop `image` to its content plus margin. Uniform images come back whole.
pub fn trim(image: &DynamicImage, settings: &CropSettings) -> DynamicImage {
    match content_bbox(image, settings.noise_bias) {
        Some(bbox) => {
            let b = bbox.expand_within(settings.margin, image.width(), image.height());
            image.crop_imm(b.left, b.top, b.width(), b.height())
        }
        None => image.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

    /// White page with a black rectangle covering `x0..x1` × `y0..y1`.
    fn page_with_rect(w: u32, h: u32, x0: u32, y0: u32, x1: u32, y1: u32) -> DynamicImage {
        let mut img = RgbaImage::from_pixel(w, h, WHITE);
        for y in y0..y1 {
            for x in x0..x1 {
                img.put_pixel(x, y, BLACK);
            }
        }
        DynamicImage::ImageRgba8(img)
    }

    #[test]
    fn centred_rectangle_gets_fifty_pixel_margin() {
        let img = page_with_rect(400, 300, 150, 100, 250, 200);
        assert_eq!(
            content_bbox(&img, 50),
            Some(BoundingBox {
                left: 150,
                top: 100,
                right: 250,
                bottom: 200
            })
        );

        let cropped = trim(&img, &CropSettings::default());
        assert_eq!(cropped.dimensions(), (200, 200));
        // The margin is background; the rectangle starts 50 px in.
        assert_eq!(cropped.to_rgba8().get_pixel(49, 49), &WHITE);
        assert_eq!(cropped.to_rgba8().get_pixel(50, 50), &BLACK);
    }

    #[test]
    fn margin_is_clipped_at_image_edges() {
        let img = page_with_rect(200, 100, 10, 5, 190, 95);
        let cropped = trim(&img, &CropSettings::default());
        assert_eq!(cropped.dimensions(), (200, 100));

        let b = BoundingBox {
            left: 10,
            top: 5,
            right: 190,
            bottom: 95,
        }
        .expand_within(50, 200, 100);
        assert_eq!((b.left, b.top, b.right, b.bottom), (0, 0, 200, 100));
    }

    #[test]
    fn uniform_image_is_not_cropped() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(64, 32, WHITE));
        assert_eq!(content_bbox(&img, 50), None);
        assert_eq!(trim(&img, &CropSettings::default()).dimensions(), (64, 32));
    }

    #[test]
    fn faint_noise_below_bias_is_ignored() {
        let mut img = RgbaImage::from_pixel(100, 100, WHITE);
        // Difference 20 → boosted 40, below the bias of 50.
        img.put_pixel(5, 5, Rgba([235, 235, 235, 255]));
        // Difference 30 → boosted 60, counts as ink.
        img.put_pixel(60, 70, Rgba([225, 255, 255, 255]));
        let bbox = content_bbox(&DynamicImage::ImageRgba8(img), 50).unwrap();
        assert_eq!(
            bbox,
            BoundingBox {
                left: 60,
                top: 70,
                right: 61,
                bottom: 71
            }
        );
    }

    #[test]
    fn background_comes_from_top_left_pixel() {
        // Dark page with a light mark: the mark is the content.
        let mut img = RgbaImage::from_pixel(50, 50, BLACK);
        img.put_pixel(20, 30, WHITE);
        let bbox = content_bbox(&DynamicImage::ImageRgba8(img), 50).unwrap();
        assert_eq!((bbox.left, bbox.top), (20, 30));
        assert_eq!((bbox.width(), bbox.height()), (1, 1));
    }

    #[test]
    fn zero_margin_crops_tightly() {
        let img = page_with_rect(100, 100, 40, 30, 60, 35);
        let cropped = trim(
            &img,
            &CropSettings {
                margin: 0,
                noise_bias: 50,
            },
        );
        assert_eq!(cropped.dimensions(), (20, 5));
    }
}
