#![allow(dead_code)]

//! Codestream-boundary concerns for the JPEG 2000 family container engine.
//!
//! This crate understands exactly one marker segment of the wavelet
//! codestream -- `SIZ`, the mandatory image-and-tile-size header that opens
//! every codestream -- because the container layer needs it to validate the
//! outer dimensions it is asked to wrap. Everything past `SIZ` is opaque to
//! the container and is handed, byte-for-byte, to an external [`Codec`].

use log::debug;
use thiserror::Error;

pub type MarkerSymbol = [u8; 2];

/// Start Of Codestream.
pub const MARKER_SYMBOL_SOC: MarkerSymbol = [0xFF, 0x4F];
/// Image and tile size (SIZ).
pub const MARKER_SYMBOL_SIZ: MarkerSymbol = [0xFF, 0x51];

#[derive(Debug, Error)]
pub enum JpcError {
    #[error("truncated codestream: {0}")]
    Truncated(String),
    #[error("codestream does not conform to the standard: {0}")]
    FileFormat(String),
    #[error("external codec failed: {0}")]
    DecodeFailed(String),
}

/// The `SIZ` marker segment: `Rsiz`, the reference grid and tile geometry,
/// and per-component precision/subsampling.
///
/// Fields are kept as the raw big-endian bytes the standard defines, with
/// typed accessors doing the `from_be_bytes` conversion on demand -- the
/// same layout the rest of this crate's marker segments use.
#[derive(Debug, Clone)]
pub struct ImageAndTileSizeMarkerSegment {
    offset: u64,
    length: u16,
    decoder_capabilities: [u8; 2],
    reference_grid_width: [u8; 4],
    reference_grid_height: [u8; 4],
    image_horizontal_offset: [u8; 4],
    image_vertical_offset: [u8; 4],
    reference_tile_width: [u8; 4],
    reference_tile_height: [u8; 4],
    tile_horizontal_offset: [u8; 4],
    tile_vertical_offset: [u8; 4],
    no_components: [u8; 2],
    precision: Vec<[u8; 1]>,
    horizontal_separation: Vec<[u8; 1]>,
    vertical_separation: Vec<[u8; 1]>,
}

impl ImageAndTileSizeMarkerSegment {
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn length(&self) -> u16 {
        self.length
    }

    pub fn decoder_capabilities(&self) -> u16 {
        u16::from_be_bytes(self.decoder_capabilities)
    }

    pub fn reference_grid_width(&self) -> u32 {
        u32::from_be_bytes(self.reference_grid_width)
    }

    pub fn reference_grid_height(&self) -> u32 {
        u32::from_be_bytes(self.reference_grid_height)
    }

    pub fn image_horizontal_offset(&self) -> u32 {
        u32::from_be_bytes(self.image_horizontal_offset)
    }

    pub fn image_vertical_offset(&self) -> u32 {
        u32::from_be_bytes(self.image_vertical_offset)
    }

    pub fn reference_tile_width(&self) -> u32 {
        u32::from_be_bytes(self.reference_tile_width)
    }

    pub fn reference_tile_height(&self) -> u32 {
        u32::from_be_bytes(self.reference_tile_height)
    }

    pub fn tile_horizontal_offset(&self) -> u32 {
        u32::from_be_bytes(self.tile_horizontal_offset)
    }

    pub fn tile_vertical_offset(&self) -> u32 {
        u32::from_be_bytes(self.tile_vertical_offset)
    }

    pub fn no_components(&self) -> u16 {
        u16::from_be_bytes(self.no_components)
    }

    pub fn precision(&self, component: usize) -> Option<u8> {
        self.precision.get(component).map(|ssiz| (ssiz[0] & 0x7f) + 1)
    }

    pub fn values_are_signed(&self, component: usize) -> Option<bool> {
        self.precision.get(component).map(|ssiz| ssiz[0] & 0x80 == 0x80)
    }

    pub fn horizontal_separation(&self, component: usize) -> Option<u8> {
        self.horizontal_separation.get(component).map(|xrsiz| xrsiz[0])
    }

    pub fn vertical_separation(&self, component: usize) -> Option<u8> {
        self.vertical_separation.get(component).map(|yrsiz| yrsiz[0])
    }

    /// Component dimensions, per the standard: `ceil(X / XRsiz)`, `ceil(Y / YRsiz)`.
    pub fn component_dimensions(&self, component: usize) -> Option<(u32, u32)> {
        let xr = self.horizontal_separation(component)? as u32;
        let yr = self.vertical_separation(component)? as u32;
        if xr == 0 || yr == 0 {
            return None;
        }
        let w = self.reference_grid_width();
        let h = self.reference_grid_height();
        Some((w.div_ceil(xr), h.div_ceil(yr)))
    }
}

fn read_u8(bytes: &[u8], offset: usize) -> Result<u8, JpcError> {
    bytes
        .get(offset)
        .copied()
        .ok_or_else(|| JpcError::Truncated(format!("expected byte at offset {offset}")))
}

fn read_u16(bytes: &[u8], offset: usize) -> Result<u16, JpcError> {
    let slice = bytes
        .get(offset..offset + 2)
        .ok_or_else(|| JpcError::Truncated(format!("expected u16 at offset {offset}")))?;
    Ok(u16::from_be_bytes([slice[0], slice[1]]))
}

fn read_u32(bytes: &[u8], offset: usize) -> Result<u32, JpcError> {
    let slice = bytes
        .get(offset..offset + 4)
        .ok_or_else(|| JpcError::Truncated(format!("expected u32 at offset {offset}")))?;
    Ok(u32::from_be_bytes([slice[0], slice[1], slice[2], slice[3]]))
}

/// Parses the `SIZ` marker segment starting at `bytes[0]` being the two
/// marker-code bytes `FF 51`, as found immediately after the codestream's
/// `SOC` marker.
pub fn decode_siz(bytes: &[u8], marker_offset: u64) -> Result<ImageAndTileSizeMarkerSegment, JpcError> {
    let marker = [read_u8(bytes, 0)?, read_u8(bytes, 1)?];
    if marker != MARKER_SYMBOL_SIZ {
        return Err(JpcError::FileFormat(format!(
            "expected SIZ marker {:02X?}, found {:02X?}",
            MARKER_SYMBOL_SIZ, marker
        )));
    }
    let length = read_u16(bytes, 2)?;
    let decoder_capabilities = read_u16(bytes, 4)?.to_be_bytes();
    let reference_grid_width = read_u32(bytes, 6)?.to_be_bytes();
    let reference_grid_height = read_u32(bytes, 10)?.to_be_bytes();
    let image_horizontal_offset = read_u32(bytes, 14)?.to_be_bytes();
    let image_vertical_offset = read_u32(bytes, 18)?.to_be_bytes();
    let reference_tile_width = read_u32(bytes, 22)?.to_be_bytes();
    let reference_tile_height = read_u32(bytes, 26)?.to_be_bytes();
    let tile_horizontal_offset = read_u32(bytes, 30)?.to_be_bytes();
    let tile_vertical_offset = read_u32(bytes, 34)?.to_be_bytes();
    let no_components = read_u16(bytes, 38)?;
    if !(1..=16384).contains(&no_components) {
        return Err(JpcError::FileFormat(format!(
            "Csiz out of range: {no_components}"
        )));
    }

    let mut precision = Vec::with_capacity(no_components as usize);
    let mut horizontal_separation = Vec::with_capacity(no_components as usize);
    let mut vertical_separation = Vec::with_capacity(no_components as usize);
    let mut cursor = 40;
    for _ in 0..no_components {
        precision.push([read_u8(bytes, cursor)?]);
        horizontal_separation.push([read_u8(bytes, cursor + 1)?]);
        vertical_separation.push([read_u8(bytes, cursor + 2)?]);
        cursor += 3;
    }

    debug!("parsed SIZ marker: {no_components} component(s)");

    Ok(ImageAndTileSizeMarkerSegment {
        offset: marker_offset,
        length,
        decoder_capabilities,
        reference_grid_width,
        reference_grid_height,
        image_horizontal_offset,
        image_vertical_offset,
        reference_tile_width,
        reference_tile_height,
        tile_horizontal_offset,
        tile_vertical_offset,
        no_components: no_components.to_be_bytes(),
        precision,
        horizontal_separation,
        vertical_separation,
    })
}

/// Scans a raw codestream (starting with `SOC`) for its `SIZ` marker segment
/// and parses it. Everything after `SIZ` is left untouched.
pub fn parse_image_info(codestream: &[u8]) -> Result<ImageAndTileSizeMarkerSegment, JpcError> {
    let soc = [read_u8(codestream, 0)?, read_u8(codestream, 1)?];
    if soc != MARKER_SYMBOL_SOC {
        return Err(JpcError::FileFormat(format!(
            "expected SOC marker {:02X?}, found {:02X?}",
            MARKER_SYMBOL_SOC, soc
        )));
    }
    decode_siz(&codestream[2..], 2)
}

/// A single image component's shape and sample format, as handed back by
/// (or supplied to) the external [`Codec`]. The container never owns pixel
/// samples -- only this metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentSummary {
    pub bit_depth: u8,
    pub signed: bool,
    pub subsampling_x: u8,
    pub subsampling_y: u8,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSummary {
    pub width: u32,
    pub height: u32,
    pub components: Vec<ComponentSummary>,
}

/// The wavelet codec collaborator. Implementations of this trait perform
/// the actual JPEG 2000 compression/decompression; this crate and `jp2`
/// only ever see codestream byte strings and [`ImageSummary`] values.
pub trait Codec {
    fn encode(&self, image: &ImageSummary, samples: &[u8]) -> Result<Vec<u8>, JpcError>;
    fn decode(&self, codestream: &[u8]) -> Result<(ImageSummary, Vec<u8>), JpcError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_siz_codestream() -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&MARKER_SYMBOL_SOC);
        bytes.extend_from_slice(&MARKER_SYMBOL_SIZ);
        bytes.extend_from_slice(&41u16.to_be_bytes()); // Lsiz
        bytes.extend_from_slice(&0u16.to_be_bytes()); // Rsiz
        bytes.extend_from_slice(&64u32.to_be_bytes()); // Xsiz
        bytes.extend_from_slice(&128u32.to_be_bytes()); // Ysiz
        bytes.extend_from_slice(&0u32.to_be_bytes()); // XOsiz
        bytes.extend_from_slice(&0u32.to_be_bytes()); // YOsiz
        bytes.extend_from_slice(&64u32.to_be_bytes()); // XTsiz
        bytes.extend_from_slice(&128u32.to_be_bytes()); // YTsiz
        bytes.extend_from_slice(&0u32.to_be_bytes()); // XTOsiz
        bytes.extend_from_slice(&0u32.to_be_bytes()); // YTOsiz
        bytes.extend_from_slice(&3u16.to_be_bytes()); // Csiz
        for _ in 0..3 {
            bytes.push(15); // Ssiz: unsigned, 16 bpc
            bytes.push(1); // XRsiz
            bytes.push(1); // YRsiz
        }
        bytes
    }

    #[test]
    fn parses_siz_dimensions_and_precision() {
        let codestream = sample_siz_codestream();
        let siz = parse_image_info(&codestream).expect("SIZ should parse");
        assert_eq!(siz.reference_grid_width(), 64);
        assert_eq!(siz.reference_grid_height(), 128);
        assert_eq!(siz.no_components(), 3);
        assert_eq!(siz.precision(0), Some(16));
        assert_eq!(siz.values_are_signed(0), Some(false));
        assert_eq!(siz.component_dimensions(0), Some((64, 128)));
    }

    #[test]
    fn rejects_missing_soc() {
        let mut codestream = sample_siz_codestream();
        codestream[0] = 0x00;
        assert!(parse_image_info(&codestream).is_err());
    }

    #[test]
    fn rejects_truncated_siz() {
        let codestream = sample_siz_codestream();
        let truncated = &codestream[..10];
        assert!(parse_image_info(truncated).is_err());
    }

    #[test]
    fn rejects_component_count_out_of_range() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&MARKER_SYMBOL_SOC);
        bytes.extend_from_slice(&MARKER_SYMBOL_SIZ);
        bytes.extend_from_slice(&38u16.to_be_bytes());
        bytes.extend_from_slice(&0u16.to_be_bytes());
        bytes.extend_from_slice(&1u32.to_be_bytes());
        bytes.extend_from_slice(&1u32.to_be_bytes());
        bytes.extend_from_slice(&0u32.to_be_bytes());
        bytes.extend_from_slice(&0u32.to_be_bytes());
        bytes.extend_from_slice(&1u32.to_be_bytes());
        bytes.extend_from_slice(&1u32.to_be_bytes());
        bytes.extend_from_slice(&0u32.to_be_bytes());
        bytes.extend_from_slice(&0u32.to_be_bytes());
        bytes.extend_from_slice(&0u16.to_be_bytes()); // Csiz = 0, invalid
        assert!(parse_image_info(&bytes).is_err());
    }
}
