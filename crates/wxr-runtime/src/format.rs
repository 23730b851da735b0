//! Swapchain pixel formats and their native encodings.
//!
//! Applications name formats with native values: DXGI enums on the Direct3D backends and
//! sized internal formats on OpenGL. Direct3D images are allocated in the typeless member
//! of the format family so both linear and sRGB views of the same memory stay possible.

use half::f16;

use crate::backend::BackendKind;
use crate::swapchain::SwapchainUsage;

/// Formats an application may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    Rgba8Srgb,
    Rgba8Unorm,
    Bgra8Srgb,
    Bgra8Unorm,
    Rgba16Float,
    Rgba32Float,
    Rgb10A2Unorm,
    D32FloatS8X24,
    D32Float,
    D24UnormS8,
    D16Unorm,
}

/// Format the backing memory is allocated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageFormat {
    Typed(PixelFormat),
    Rgba8Typeless,
    Bgra8Typeless,
    Rgba16Typeless,
    Rgba32Typeless,
    Rgb10A2Typeless,
    R32Typeless,
    R32G8X24Typeless,
    R24G8Typeless,
    R16Typeless,
}

const DXGI_FORMATS: &[PixelFormat] = &[
    PixelFormat::Rgba8Srgb,
    PixelFormat::Rgba8Unorm,
    PixelFormat::Bgra8Srgb,
    PixelFormat::Bgra8Unorm,
    PixelFormat::Rgba16Float,
    PixelFormat::Rgba32Float,
    PixelFormat::Rgb10A2Unorm,
    PixelFormat::D32FloatS8X24,
    PixelFormat::D32Float,
    PixelFormat::D24UnormS8,
    PixelFormat::D16Unorm,
];

const GL_FORMATS: &[PixelFormat] = &[
    PixelFormat::Rgba8Srgb,
    PixelFormat::Rgba8Unorm,
    PixelFormat::Rgba16Float,
    PixelFormat::Rgba32Float,
    PixelFormat::Rgb10A2Unorm,
    PixelFormat::D32Float,
    PixelFormat::D24UnormS8,
    PixelFormat::D16Unorm,
];

/// Formats offered by `xrEnumerateSwapchainFormats`, most preferred first.
pub fn supported_formats(kind: BackendKind) -> &'static [PixelFormat] {
    match kind {
        BackendKind::D3D11 | BackendKind::D3D12 => DXGI_FORMATS,
        BackendKind::OpenGl => GL_FORMATS,
    }
}

impl PixelFormat {
    pub fn from_dxgi(raw: i64) -> Option<Self> {
        Some(match raw {
            29 => Self::Rgba8Srgb,
            28 => Self::Rgba8Unorm,
            91 => Self::Bgra8Srgb,
            87 => Self::Bgra8Unorm,
            10 => Self::Rgba16Float,
            2 => Self::Rgba32Float,
            24 => Self::Rgb10A2Unorm,
            20 => Self::D32FloatS8X24,
            40 => Self::D32Float,
            45 => Self::D24UnormS8,
            55 => Self::D16Unorm,
            _ => return None,
        })
    }

    pub fn from_gl(raw: i64) -> Option<Self> {
        Some(match raw {
            0x8C43 => Self::Rgba8Srgb,
            0x8058 => Self::Rgba8Unorm,
            0x881A => Self::Rgba16Float,
            0x8814 => Self::Rgba32Float,
            0x8059 => Self::Rgb10A2Unorm,
            0x8CAC => Self::D32Float,
            0x88F0 => Self::D24UnormS8,
            0x81A5 => Self::D16Unorm,
            _ => return None,
        })
    }

    /// Resolve a native format value for the given backend. Formats the backend does
    /// not offer are rejected even if the value is known to the other backend family.
    pub fn from_native(kind: BackendKind, raw: i64) -> Option<Self> {
        let format = match kind {
            BackendKind::D3D11 | BackendKind::D3D12 => Self::from_dxgi(raw)?,
            BackendKind::OpenGl => Self::from_gl(raw)?,
        };
        supported_formats(kind).contains(&format).then_some(format)
    }

    pub fn dxgi(self) -> i64 {
        match self {
            Self::Rgba8Srgb => 29,
            Self::Rgba8Unorm => 28,
            Self::Bgra8Srgb => 91,
            Self::Bgra8Unorm => 87,
            Self::Rgba16Float => 10,
            Self::Rgba32Float => 2,
            Self::Rgb10A2Unorm => 24,
            Self::D32FloatS8X24 => 20,
            Self::D32Float => 40,
            Self::D24UnormS8 => 45,
            Self::D16Unorm => 55,
        }
    }

    pub fn gl(self) -> Option<i64> {
        Some(match self {
            Self::Rgba8Srgb => 0x8C43,
            Self::Rgba8Unorm => 0x8058,
            Self::Rgba16Float => 0x881A,
            Self::Rgba32Float => 0x8814,
            Self::Rgb10A2Unorm => 0x8059,
            Self::D32Float => 0x8CAC,
            Self::D24UnormS8 => 0x88F0,
            Self::D16Unorm => 0x81A5,
            Self::Bgra8Srgb | Self::Bgra8Unorm | Self::D32FloatS8X24 => return None,
        })
    }

    pub fn native(self, kind: BackendKind) -> i64 {
        match kind {
            BackendKind::D3D11 | BackendKind::D3D12 => self.dxgi(),
            BackendKind::OpenGl => self.gl().unwrap_or_default(),
        }
    }

    pub fn is_depth(self) -> bool {
        matches!(
            self,
            Self::D32FloatS8X24 | Self::D32Float | Self::D24UnormS8 | Self::D16Unorm
        )
    }

    pub fn is_srgb(self) -> bool {
        matches!(self, Self::Rgba8Srgb | Self::Bgra8Srgb)
    }

    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgba8Srgb
            | Self::Rgba8Unorm
            | Self::Bgra8Srgb
            | Self::Bgra8Unorm
            | Self::Rgb10A2Unorm
            | Self::D32Float
            | Self::D24UnormS8 => 4,
            Self::Rgba16Float | Self::D32FloatS8X24 => 8,
            Self::Rgba32Float => 16,
            Self::D16Unorm => 2,
        }
    }

    pub fn typeless(self) -> StorageFormat {
        match self {
            Self::Rgba8Srgb | Self::Rgba8Unorm => StorageFormat::Rgba8Typeless,
            Self::Bgra8Srgb | Self::Bgra8Unorm => StorageFormat::Bgra8Typeless,
            Self::Rgba16Float => StorageFormat::Rgba16Typeless,
            Self::Rgba32Float => StorageFormat::Rgba32Typeless,
            Self::Rgb10A2Unorm => StorageFormat::Rgb10A2Typeless,
            Self::D32Float => StorageFormat::R32Typeless,
            Self::D32FloatS8X24 => StorageFormat::R32G8X24Typeless,
            Self::D24UnormS8 => StorageFormat::R24G8Typeless,
            Self::D16Unorm => StorageFormat::R16Typeless,
        }
    }

    /// Decode one texel of this view format into an 8-bit RGBA display value.
    ///
    /// 8-bit views pass through unchanged; the preview carries the same encoding as the
    /// submitted view. Float and 10-bit formats are clamped and quantized.
    pub fn decode_rgba8(self, texel: &[u8]) -> Option<[u8; 4]> {
        match self {
            Self::Rgba8Srgb | Self::Rgba8Unorm => Some([texel[0], texel[1], texel[2], texel[3]]),
            Self::Bgra8Srgb | Self::Bgra8Unorm => Some([texel[2], texel[1], texel[0], texel[3]]),
            Self::Rgba16Float => {
                let mut out = [0u8; 4];
                for (c, chunk) in out.iter_mut().zip(texel.chunks_exact(2)) {
                    let bits = u16::from_le_bytes([chunk[0], chunk[1]]);
                    *c = unorm8(f16::from_bits(bits).to_f32());
                }
                Some(out)
            }
            Self::Rgba32Float => {
                let mut out = [0u8; 4];
                for (c, chunk) in out.iter_mut().zip(texel.chunks_exact(4)) {
                    let value = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                    *c = unorm8(value);
                }
                Some(out)
            }
            Self::Rgb10A2Unorm => {
                let packed = u32::from_le_bytes([texel[0], texel[1], texel[2], texel[3]]);
                let ten = |shift: u32| (((packed >> shift) & 0x3ff) * 255 + 511) / 1023;
                let alpha = ((packed >> 30) & 0x3) * 85;
                Some([ten(0) as u8, ten(10) as u8, ten(20) as u8, alpha as u8])
            }
            Self::D32FloatS8X24 | Self::D32Float | Self::D24UnormS8 | Self::D16Unorm => None,
        }
    }

    /// Encode an 8-bit RGBA value in this format. Used to seed images.
    pub fn encode_rgba8(self, rgba: [u8; 4]) -> Vec<u8> {
        match self {
            Self::Rgba8Srgb | Self::Rgba8Unorm => rgba.to_vec(),
            Self::Bgra8Srgb | Self::Bgra8Unorm => vec![rgba[2], rgba[1], rgba[0], rgba[3]],
            Self::Rgba16Float => rgba
                .iter()
                .flat_map(|c| f16::from_f32(*c as f32 / 255.0).to_bits().to_le_bytes())
                .collect(),
            Self::Rgba32Float => rgba
                .iter()
                .flat_map(|c| (*c as f32 / 255.0).to_le_bytes())
                .collect(),
            Self::Rgb10A2Unorm => {
                let ten = |c: u8| (c as u32 * 1023 + 127) / 255;
                let packed = ten(rgba[0])
                    | (ten(rgba[1]) << 10)
                    | (ten(rgba[2]) << 20)
                    | (((rgba[3] as u32 + 42) / 85) << 30);
                packed.to_le_bytes().to_vec()
            }
            Self::D32FloatS8X24 | Self::D32Float | Self::D24UnormS8 | Self::D16Unorm => {
                vec![0; self.bytes_per_pixel()]
            }
        }
    }
}

impl StorageFormat {
    /// Allocation format for a requested format. Color is always typeless on Direct3D;
    /// depth only when it will be sampled. OpenGL has no typeless formats.
    pub fn for_allocation(kind: BackendKind, format: PixelFormat, usage: SwapchainUsage) -> Self {
        if kind == BackendKind::OpenGl {
            return Self::Typed(format);
        }
        if format.is_depth() && !usage.contains(SwapchainUsage::SAMPLED) {
            Self::Typed(format)
        } else {
            format.typeless()
        }
    }

    pub fn dxgi(self) -> i64 {
        match self {
            Self::Typed(format) => format.dxgi(),
            Self::Rgba8Typeless => 27,
            Self::Bgra8Typeless => 90,
            Self::Rgba16Typeless => 9,
            Self::Rgba32Typeless => 1,
            Self::Rgb10A2Typeless => 23,
            Self::R32Typeless => 39,
            Self::R32G8X24Typeless => 19,
            Self::R24G8Typeless => 44,
            Self::R16Typeless => 53,
        }
    }

    pub fn is_depth(self) -> bool {
        match self {
            Self::Typed(format) => format.is_depth(),
            Self::R32Typeless | Self::R32G8X24Typeless | Self::R24G8Typeless | Self::R16Typeless => {
                true
            }
            _ => false,
        }
    }

    pub fn is_typeless(self) -> bool {
        !matches!(self, Self::Typed(_))
    }

    /// Typed view used to sample this storage. `requested` is the swapchain's format and
    /// decides between the sRGB and linear members of the 8-bit families.
    pub fn typed_view(self, requested: PixelFormat) -> Option<PixelFormat> {
        let view = match self {
            Self::Typed(format) => format,
            Self::Rgba8Typeless if requested == PixelFormat::Rgba8Srgb => PixelFormat::Rgba8Srgb,
            Self::Rgba8Typeless => PixelFormat::Rgba8Unorm,
            Self::Bgra8Typeless if requested == PixelFormat::Bgra8Srgb => PixelFormat::Bgra8Srgb,
            Self::Bgra8Typeless => PixelFormat::Bgra8Unorm,
            Self::Rgba16Typeless => PixelFormat::Rgba16Float,
            Self::Rgba32Typeless => PixelFormat::Rgba32Float,
            Self::Rgb10A2Typeless => PixelFormat::Rgb10A2Unorm,
            Self::R32Typeless | Self::R32G8X24Typeless | Self::R24G8Typeless | Self::R16Typeless => {
                return None
            }
        };
        (!view.is_depth()).then_some(view)
    }
}

fn unorm8(value: f32) -> u8 {
    if value.is_nan() {
        return 0;
    }
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}
