//! Pixel formats and capture format negotiation.
//!
//! The negotiator takes whatever the caller asks for and returns the closest
//! format the device can actually produce: dimensions aligned to the chroma
//! subsampling and clamped to the device limits, with per-plane stride and
//! size computed from the bits-per-pixel of each plane.
//!
//! Chroma subsampling applies to the secondary planes only; the first plane
//! always covers the full resolution.

use serde::{Deserialize, Serialize};

/// Widest frame the capture interface supports.
pub const MAX_WIDTH: u32 = 4096;
/// Tallest frame the capture interface supports.
pub const MAX_HEIGHT: u32 = 4096;

/// Pixel layouts the capture interface can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    /// 8-bit greyscale, single plane.
    Gray8,
    /// Packed YUV 4:2:2, single plane, 16 bits per pixel.
    Yuyv,
    /// Packed RGB 5:6:5, single plane, 16 bits per pixel.
    Rgb565,
    /// YUV 4:2:0, luma plane plus interleaved chroma plane.
    Nv12,
    /// YUV 4:2:0, three separate planes.
    Yuv420Planar,
}

/// Static description of a pixel format.
struct FormatInfo {
    num_planes: usize,
    bpp: [u32; 3],
    hsub: u32,
    vsub: u32,
    /// Code programmed into the input-format field of the config register.
    input: u32,
    /// Code programmed into the output-format field of the config register.
    output: u32,
}

static GRAY8: FormatInfo = FormatInfo {
    num_planes: 1,
    bpp: [8, 0, 0],
    hsub: 1,
    vsub: 1,
    input: 0,
    output: 0,
};

static YUYV: FormatInfo = FormatInfo {
    num_planes: 1,
    bpp: [16, 0, 0],
    hsub: 2,
    vsub: 1,
    input: 1,
    output: 0,
};

static RGB565: FormatInfo = FormatInfo {
    num_planes: 1,
    bpp: [16, 0, 0],
    hsub: 1,
    vsub: 1,
    input: 2,
    output: 0,
};

static NV12: FormatInfo = FormatInfo {
    num_planes: 2,
    bpp: [8, 16, 0],
    hsub: 2,
    vsub: 2,
    input: 1,
    output: 3,
};

static YUV420_PLANAR: FormatInfo = FormatInfo {
    num_planes: 3,
    bpp: [8, 8, 8],
    hsub: 2,
    vsub: 2,
    input: 1,
    output: 2,
};

impl PixelFormat {
    fn info(self) -> &'static FormatInfo {
        match self {
            Self::Gray8 => &GRAY8,
            Self::Yuyv => &YUYV,
            Self::Rgb565 => &RGB565,
            Self::Nv12 => &NV12,
            Self::Yuv420Planar => &YUV420_PLANAR,
        }
    }

    /// Number of memory planes this format occupies.
    #[must_use]
    pub fn num_planes(self) -> usize {
        self.info().num_planes
    }

    /// Code for the input-format field of the config register.
    #[must_use]
    pub fn hw_input_code(self) -> u32 {
        self.info().input
    }

    /// Code for the output-format field of the config register.
    #[must_use]
    pub fn hw_output_code(self) -> u32 {
        self.info().output
    }
}

/// Resolution and layout requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageFormat {
    /// Requested width in pixels.
    pub width: u32,
    /// Requested height in pixels.
    pub height: u32,
    /// Requested pixel layout.
    pub pixel_format: PixelFormat,
}

/// Per-plane layout produced by negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneFormat {
    /// Bytes per line of this plane.
    pub stride: u32,
    /// Total bytes of this plane.
    pub size: u32,
}

/// The format the hardware will actually produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiatedFormat {
    /// Accepted width in pixels.
    pub width: u32,
    /// Accepted height in pixels.
    pub height: u32,
    /// Accepted pixel layout.
    pub pixel_format: PixelFormat,
    /// One entry per plane, in plane order.
    pub planes: Vec<PlaneFormat>,
}

impl NegotiatedFormat {
    /// Total bytes of a frame across all planes.
    #[must_use]
    pub fn frame_size(&self) -> usize {
        self.planes.iter().map(|p| p.size as usize).sum()
    }
}

fn align_up(value: u32, align: u32) -> u32 {
    value.div_ceil(align) * align
}

/// Negotiate the closest format the device supports.
///
/// Width and height are aligned up to the format's subsampling factors and
/// clamped to the device limits; per-plane stride and size follow from the
/// plane's bits-per-pixel, with chroma subsampling applied to secondary
/// planes only.
#[must_use]
pub fn try_format(requested: ImageFormat) -> NegotiatedFormat {
    let info = requested.pixel_format.info();

    // Align the dimensions on the subsampling, then clamp.
    let width = align_up(requested.width, info.hsub).clamp(info.hsub, MAX_WIDTH);
    let height = align_up(requested.height, info.vsub).clamp(info.vsub, MAX_HEIGHT);

    let planes = (0..info.num_planes)
        .map(|plane| {
            let hsub = if plane > 0 { info.hsub } else { 1 };
            let vsub = if plane > 0 { info.vsub } else { 1 };
            let stride = width / hsub * info.bpp[plane] / 8;
            PlaneFormat {
                stride,
                size: stride * (height / vsub),
            }
        })
        .collect();

    NegotiatedFormat {
        width,
        height,
        pixel_format: requested.pixel_format,
        planes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_plane_layout() {
        let fmt = try_format(ImageFormat {
            width: 640,
            height: 480,
            pixel_format: PixelFormat::Gray8,
        });

        assert_eq!(fmt.width, 640);
        assert_eq!(fmt.height, 480);
        assert_eq!(fmt.planes.len(), 1);
        assert_eq!(fmt.planes[0].stride, 640);
        assert_eq!(fmt.planes[0].size, 640 * 480);
    }

    #[test]
    fn test_yuv420_planar_layout() {
        let fmt = try_format(ImageFormat {
            width: 640,
            height: 480,
            pixel_format: PixelFormat::Yuv420Planar,
        });

        assert_eq!(fmt.planes.len(), 3);
        // Full-resolution luma plane.
        assert_eq!(fmt.planes[0].stride, 640);
        assert_eq!(fmt.planes[0].size, 640 * 480);
        // Chroma planes subsampled 2x2.
        assert_eq!(fmt.planes[1].stride, 320);
        assert_eq!(fmt.planes[1].size, 320 * 240);
        assert_eq!(fmt.planes[2], fmt.planes[1]);
        assert_eq!(fmt.frame_size(), 640 * 480 * 3 / 2);
    }

    #[test]
    fn test_nv12_layout() {
        let fmt = try_format(ImageFormat {
            width: 640,
            height: 480,
            pixel_format: PixelFormat::Nv12,
        });

        assert_eq!(fmt.planes.len(), 2);
        assert_eq!(fmt.planes[0].stride, 640);
        // Interleaved chroma: half the lines at full stride.
        assert_eq!(fmt.planes[1].stride, 640);
        assert_eq!(fmt.planes[1].size, 640 * 240);
    }

    #[test]
    fn test_odd_dimensions_aligned_to_subsampling() {
        let fmt = try_format(ImageFormat {
            width: 641,
            height: 479,
            pixel_format: PixelFormat::Nv12,
        });

        assert_eq!(fmt.width, 642);
        assert_eq!(fmt.height, 480);
    }

    #[test]
    fn test_dimensions_clamped_to_device_limits() {
        let fmt = try_format(ImageFormat {
            width: 100_000,
            height: 0,
            pixel_format: PixelFormat::Yuyv,
        });

        assert_eq!(fmt.width, MAX_WIDTH);
        // Zero height is raised to the subsampling minimum.
        assert_eq!(fmt.height, 1);
    }

    #[test]
    fn test_pixel_format_serde_names() {
        let json = serde_json::to_string(&PixelFormat::Yuv420Planar).unwrap();
        assert_eq!(json, "\"yuv420_planar\"");

        let fmt: PixelFormat = serde_json::from_str("\"nv12\"").unwrap();
        assert_eq!(fmt, PixelFormat::Nv12);
    }
}
