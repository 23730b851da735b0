//! CPU-side image storage and the display-ready RGBA form read back from it.
//!
//! Only mip level 0 of each array layer is stored; it is the only level that is ever
//! displayed. Multisampled images keep `sample_count` samples per texel and are resolved
//! by averaging on read.

use crate::error::{XrError, XrResult};
use crate::format::{PixelFormat, StorageFormat};

/// Axis-aligned pixel region, already clamped to an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }
}

/// Top-down 8-bit RGBA pixels. Also the preview canvas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaImage {
    width: u32,
    height: u32,
    pixels: Vec<[u8; 4]>,
}

impl RgbaImage {
    pub fn new(width: u32, height: u32, fill: [u8; 4]) -> Self {
        Self {
            width,
            height,
            pixels: vec![fill; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[[u8; 4]] {
        &self.pixels
    }

    pub fn get(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[(y * self.width + x) as usize])
    }

    pub fn put(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x < self.width && y < self.height {
            self.pixels[(y * self.width + x) as usize] = rgba;
        }
    }

    pub fn fill(&mut self, rgba: [u8; 4]) {
        self.pixels.fill(rgba);
    }

    pub fn flip_vertical(&mut self) {
        let w = self.width as usize;
        let h = self.height as usize;
        for row in 0..h / 2 {
            let (top, bottom) = self.pixels.split_at_mut((h - 1 - row) * w);
            top[row * w..(row + 1) * w].swap_with_slice(&mut bottom[..w]);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDesc {
    /// Format the application asked for.
    pub format: PixelFormat,
    pub storage: StorageFormat,
    pub width: u32,
    pub height: u32,
    pub array_size: u32,
    pub mip_count: u32,
    pub sample_count: u32,
}

impl ImageDesc {
    pub fn texel_bytes(&self) -> usize {
        self.format.bytes_per_pixel()
    }

    pub fn layer_bytes(&self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)?
            .checked_mul(self.sample_count.max(1) as usize)?
            .checked_mul(self.texel_bytes())
    }

    pub fn total_bytes(&self) -> Option<usize> {
        self.layer_bytes()?.checked_mul(self.array_size.max(1) as usize)
    }
}

/// Backing memory for one swapchain image.
#[derive(Debug, Clone)]
pub struct Image {
    desc: ImageDesc,
    data: Vec<u8>,
}

impl Image {
    pub fn new(desc: ImageDesc) -> XrResult<Self> {
        if desc.width == 0 || desc.height == 0 {
            return Err(XrError::validation("image extent must be non-zero"));
        }
        let bytes = desc
            .total_bytes()
            .ok_or_else(|| XrError::runtime("image size overflows"))?;
        let mut data = Vec::new();
        data.try_reserve_exact(bytes)
            .map_err(|e| XrError::runtime(format!("image allocation of {bytes} bytes: {e}")))?;
        data.resize(bytes, 0);
        Ok(Self { desc, data })
    }

    pub fn desc(&self) -> &ImageDesc {
        &self.desc
    }

    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    fn offset(&self, layer: u32, x: u32, y: u32, sample: u32) -> usize {
        let d = &self.desc;
        let samples = d.sample_count.max(1) as usize;
        let texel = ((y as usize * d.width as usize + x as usize) * samples + sample as usize)
            * d.texel_bytes();
        layer as usize * d.layer_bytes().unwrap_or(0) + texel
    }

    fn check_layer(&self, layer: u32) -> XrResult<()> {
        if layer >= self.desc.array_size.max(1) {
            return Err(XrError::validation(format!(
                "array index {layer} out of range ({} layers)",
                self.desc.array_size
            )));
        }
        Ok(())
    }

    /// Write raw bytes for every sample of one texel.
    pub fn write_texel(&mut self, layer: u32, x: u32, y: u32, bytes: &[u8]) -> XrResult<()> {
        self.check_layer(layer)?;
        if x >= self.desc.width || y >= self.desc.height {
            return Err(XrError::validation("texel out of bounds"));
        }
        let n = self.desc.texel_bytes();
        if bytes.len() != n {
            return Err(XrError::validation(format!("expected {n} bytes per texel")));
        }
        for sample in 0..self.desc.sample_count.max(1) {
            let at = self.offset(layer, x, y, sample);
            self.data[at..at + n].copy_from_slice(bytes);
        }
        Ok(())
    }

    /// Write raw bytes for a single sample.
    pub fn write_sample(
        &mut self,
        layer: u32,
        x: u32,
        y: u32,
        sample: u32,
        bytes: &[u8],
    ) -> XrResult<()> {
        self.check_layer(layer)?;
        if x >= self.desc.width || y >= self.desc.height || sample >= self.desc.sample_count.max(1)
        {
            return Err(XrError::validation("sample out of bounds"));
        }
        let n = self.desc.texel_bytes();
        if bytes.len() != n {
            return Err(XrError::validation(format!("expected {n} bytes per texel")));
        }
        let at = self.offset(layer, x, y, sample);
        self.data[at..at + n].copy_from_slice(bytes);
        Ok(())
    }

    /// Fill one layer with a color encoded in the image's format.
    pub fn fill_rgba8(&mut self, layer: u32, rgba: [u8; 4]) -> XrResult<()> {
        self.check_layer(layer)?;
        let bytes = self.desc.format.encode_rgba8(rgba);
        let layer_bytes = self.desc.layer_bytes().unwrap_or(0);
        let start = layer as usize * layer_bytes;
        for texel in self.data[start..start + layer_bytes].chunks_exact_mut(bytes.len()) {
            texel.copy_from_slice(&bytes);
        }
        Ok(())
    }

    /// Read a region of one layer as top-down RGBA.
    ///
    /// Multisampled images are resolved over the whole extent; `region` is ignored for
    /// them. Rows are returned in storage order.
    pub fn read_rgba(&self, layer: u32, region: Option<PixelRect>) -> XrResult<RgbaImage> {
        self.check_layer(layer)?;
        let view = self
            .desc
            .storage
            .typed_view(self.desc.format)
            .ok_or_else(|| XrError::validation("depth images are not displayable"))?;
        let samples = self.desc.sample_count.max(1);
        let rect = match region {
            Some(rect) if samples == 1 => rect,
            _ => PixelRect::full(self.desc.width, self.desc.height),
        };
        if rect.x + rect.width > self.desc.width || rect.y + rect.height > self.desc.height {
            return Err(XrError::validation("read region exceeds image"));
        }

        let n = self.desc.texel_bytes();
        let mut out = RgbaImage::new(rect.width, rect.height, [0; 4]);
        for y in 0..rect.height {
            for x in 0..rect.width {
                let mut acc = [0u32; 4];
                for sample in 0..samples {
                    let at = self.offset(layer, rect.x + x, rect.y + y, sample);
                    let rgba = view
                        .decode_rgba8(&self.data[at..at + n])
                        .ok_or_else(|| XrError::validation("format is not displayable"))?;
                    for (a, c) in acc.iter_mut().zip(rgba) {
                        *a += c as u32;
                    }
                }
                let avg = acc.map(|a| ((a + samples / 2) / samples) as u8);
                out.put(x, y, avg);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(format: PixelFormat, width: u32, height: u32, samples: u32) -> ImageDesc {
        ImageDesc {
            format,
            storage: format.typeless(),
            width,
            height,
            array_size: 2,
            mip_count: 1,
            sample_count: samples,
        }
    }

    #[test]
    fn test_region_read() {
        let mut image = Image::new(desc(PixelFormat::Rgba8Unorm, 4, 4, 1)).unwrap();
        image.write_texel(0, 2, 1, &[9, 8, 7, 6]).unwrap();
        let region = image
            .read_rgba(
                0,
                Some(PixelRect {
                    x: 2,
                    y: 1,
                    width: 2,
                    height: 2,
                }),
            )
            .unwrap();
        assert_eq!((region.width(), region.height()), (2, 2));
        assert_eq!(region.get(0, 0), Some([9, 8, 7, 6]));
        assert_eq!(region.get(1, 1), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_layers_are_independent() {
        let mut image = Image::new(desc(PixelFormat::Rgba8Srgb, 2, 2, 1)).unwrap();
        image.fill_rgba8(1, [200, 0, 0, 255]).unwrap();
        assert_eq!(image.read_rgba(0, None).unwrap().get(0, 0), Some([0, 0, 0, 0]));
        assert_eq!(
            image.read_rgba(1, None).unwrap().get(1, 1),
            Some([200, 0, 0, 255])
        );
        assert!(image.read_rgba(2, None).is_err());
    }

    #[test]
    fn test_msaa_resolves_by_average() {
        let mut image = Image::new(desc(PixelFormat::Rgba8Unorm, 2, 2, 4)).unwrap();
        for sample in 0..4 {
            let v = if sample < 2 { 200 } else { 100 };
            image.write_sample(0, 0, 0, sample, &[v, 0, 0, 255]).unwrap();
        }
        // Region is ignored for multisampled reads.
        let resolved = image
            .read_rgba(0, Some(PixelRect::full(1, 1)))
            .unwrap();
        assert_eq!((resolved.width(), resolved.height()), (2, 2));
        assert_eq!(resolved.get(0, 0), Some([150, 0, 0, 255]));
    }

    #[test]
    fn test_depth_read_fails() {
        let mut d = desc(PixelFormat::D32Float, 2, 2, 1);
        d.storage = StorageFormat::Typed(PixelFormat::D32Float);
        let image = Image::new(d).unwrap();
        assert!(image.read_rgba(0, None).is_err());
    }

    #[test]
    fn test_flip_vertical() {
        let mut canvas = RgbaImage::new(1, 3, [0; 4]);
        canvas.put(0, 0, [1, 0, 0, 0]);
        canvas.put(0, 2, [3, 0, 0, 0]);
        canvas.flip_vertical();
        assert_eq!(canvas.get(0, 0), Some([3, 0, 0, 0]));
        assert_eq!(canvas.get(0, 2), Some([1, 0, 0, 0]));
    }

    #[test]
    fn test_unreservable_image_is_an_error() {
        let d = ImageDesc {
            array_size: 1,
            ..desc(PixelFormat::Rgba8Unorm, u32::MAX, 1 << 30, 1)
        };
        let err = Image::new(d).unwrap_err();
        assert!(matches!(err, XrError::Runtime(_)));
    }

    #[test]
    fn test_zero_extent_rejected() {
        assert!(Image::new(desc(PixelFormat::Rgba8Unorm, 0, 4, 1)).is_err());
    }
}
