//! Format detection and the top-level read/write pipelines for the JP2
//! family of box-based brands (JP2, JPH, JPX, JPM all share this layout for
//! their base image path; see §4.4).

use crate::boxes::codestream::ContiguousCodestreamBox;
use crate::boxes::header::{
    ColourSpecificationBox, HeaderSuperBox, ImageHeaderBox, ENUM_CS_GREYSCALE, ENUM_CS_SRGB,
};
use crate::boxes::signature::{FileTypeBox, SignatureBox};
use crate::boxes::{BOX_TYPE_CONTIGUOUS_CODESTREAM, BOX_TYPE_FILE_TYPE, BOX_TYPE_HEADER, JBox};
use crate::boxing::{BoxReader, BoxWriter};
use crate::error::Jp2Error;
use jpc::{parse_image_info, ImageAndTileSizeMarkerSegment};
use log::debug;

/// The container brand identified from a file's signature/`ftyp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Brand {
    J2k,
    Jp2,
    Jpx,
    Jpm,
    Jph,
    Mj2 { streaming: bool },
}

/// Detects the brand from a byte prefix, per §4.4's two-step rule.
pub fn detect_format(bytes: &[u8]) -> Result<Brand, Jp2Error> {
    if bytes.len() >= 2 && bytes[0..2] == [0xFF, 0x4F] {
        return Ok(Brand::J2k);
    }
    if bytes.len() < 12 {
        return Err(Jp2Error::Truncated(
            "need at least 12 bytes to read the JP2 signature box".to_string(),
        ));
    }
    SignatureBox::read(&bytes[8..12])?;

    let mut reader = BoxReader::new(&bytes[12..]);
    while let Some(info) = reader.read_next()? {
        if info.box_type == BOX_TYPE_FILE_TYPE {
            let ftyp = FileTypeBox::read(reader.extract_content(&info))?;
            return brand_from_ftyp(&ftyp.brand);
        }
    }
    Err(Jp2Error::FileFormat(
        "no ftyp box found after the JP2 signature".to_string(),
    ))
}

fn brand_from_ftyp(brand: &[u8; 4]) -> Result<Brand, Jp2Error> {
    match brand {
        b"jp2 " => Ok(Brand::Jp2),
        b"jpx " => Ok(Brand::Jpx),
        b"jpm " => Ok(Brand::Jpm),
        b"jph " => Ok(Brand::Jph),
        b"mjp2" => Ok(Brand::Mj2 { streaming: false }),
        b"mj2s" => Ok(Brand::Mj2 { streaming: true }),
        other => Err(Jp2Error::FileFormat(format!(
            "unrecognized ftyp brand: {:?}",
            String::from_utf8_lossy(other)
        ))),
    }
}

/// The result of reading a box-based brand: the raw codestream and the
/// image geometry parsed from its mandatory `SIZ` marker.
#[derive(Debug, Clone)]
pub struct ContainerImage {
    pub codestream: Vec<u8>,
    pub image_info: ImageAndTileSizeMarkerSegment,
    pub header: HeaderSuperBox,
}

/// Reads a box-based file (JP2/JPH/JPX/JPM), locating `jp2c` and parsing the
/// mandatory `SIZ` marker of its codestream. See §4.4 "Read pipeline".
pub fn read_container(bytes: &[u8]) -> Result<ContainerImage, Jp2Error> {
    debug!("read_container: {} bytes", bytes.len());
    if bytes.len() < 12 {
        return Err(Jp2Error::Truncated("file too short for JP2 signature".to_string()));
    }
    SignatureBox::read(&bytes[8..12])?;

    let mut header = None;
    let mut codestream = None;
    let mut reader = BoxReader::new(&bytes[12..]);
    while let Some(info) = reader.read_next()? {
        let content = reader.extract_content(&info);
        if info.box_type == BOX_TYPE_HEADER {
            header = Some(HeaderSuperBox::read(content)?);
        } else if info.box_type == BOX_TYPE_CONTIGUOUS_CODESTREAM {
            codestream = Some(ContiguousCodestreamBox::read(content)?.codestream);
            break;
        }
    }

    let header = header.ok_or_else(|| Jp2Error::FileFormat("jp2h not found".to_string()))?;
    let codestream = codestream.ok_or_else(|| Jp2Error::FileFormat("jp2c not found".to_string()))?;
    let image_info = parse_image_info(&codestream)?;

    Ok(ContainerImage {
        codestream,
        image_info,
        header,
    })
}

/// The minimal per-component description needed to assemble `ihdr`/`colr`
/// on write; callers derive this from their [`jpc::ImageSummary`].
pub struct ComponentDescriptor {
    pub bit_depth: u8,
    pub signed: bool,
}

/// Assembles a minimal box-based file: signature, `ftyp`, `jp2h{ihdr,
/// colr}`, `jp2c`. See §4.4 "Write pipeline". `bpcc` is added automatically
/// when component bit depths differ.
pub fn write_container(
    brand: Brand,
    height: u32,
    width: u32,
    components: &[ComponentDescriptor],
    codestream: &[u8],
) -> Result<Vec<u8>, Jp2Error> {
    debug!(
        "write_container: brand={:?} {}x{} {} component(s)",
        brand,
        width,
        height,
        components.len()
    );
    if components.is_empty() {
        return Err(Jp2Error::InvalidParameter(
            "at least one component is required".to_string(),
        ));
    }

    let (ftyp_brand, compatible): (crate::boxing::BoxType, Vec<crate::boxing::BoxType>) = match brand {
        Brand::Jp2 => (*b"jp2 ", vec![*b"jp2 "]),
        Brand::Jph => (*b"jph ", vec![*b"jph ", *b"jp2 "]),
        Brand::Jpx => (*b"jpx ", vec![*b"jpx "]),
        Brand::Jpm => (*b"jpm ", vec![*b"jpm "]),
        Brand::J2k | Brand::Mj2 { .. } => {
            return Err(Jp2Error::InvalidParameter(
                "write_container only assembles box-based still-image brands".to_string(),
            ))
        }
    };

    let bit_depth = components[0].bit_depth;
    let signed = components[0].signed;
    let ihdr = ImageHeaderBox::new(height, width, components.len() as u16, bit_depth, signed)?;

    let bits_per_component = if components.iter().any(|c| c.bit_depth != bit_depth || c.signed != signed) {
        Some(crate::boxes::header::BitsPerComponentBox::new(
            components.iter().map(|c| (c.bit_depth, c.signed)).collect(),
        )?)
    } else {
        None
    };

    let enum_cs = match components.len() {
        1 => ENUM_CS_GREYSCALE,
        _ => ENUM_CS_SRGB,
    };
    let colr = ColourSpecificationBox::enumerated(enum_cs, 0, 1)?;

    let jp2h = HeaderSuperBox {
        image_header: Some(ihdr),
        bits_per_component,
        colour_specifications: vec![colr],
        palette: None,
        component_mapping: None,
        channel_definition: None,
        unknown: Vec::new(),
    };

    let mut writer = BoxWriter::new();
    writer.write_box(SignatureBox::box_type(), &SignatureBox.write()?);
    writer.write_box(
        FileTypeBox::box_type(),
        &FileTypeBox {
            brand: ftyp_brand,
            minor_version: 0,
            compatible,
        }
        .write()?,
    );
    writer.write_box(HeaderSuperBox::box_type(), &jp2h.write()?);
    writer.write_box(
        ContiguousCodestreamBox::box_type(),
        &ContiguousCodestreamBox {
            codestream: codestream.to_vec(),
        }
        .write()?,
    );
    Ok(writer.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_codestream() -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&jpc::MARKER_SYMBOL_SOC);
        bytes.extend_from_slice(&jpc::MARKER_SYMBOL_SIZ);
        bytes.extend_from_slice(&41u16.to_be_bytes());
        bytes.extend_from_slice(&0u16.to_be_bytes());
        bytes.extend_from_slice(&64u32.to_be_bytes());
        bytes.extend_from_slice(&128u32.to_be_bytes());
        bytes.extend_from_slice(&0u32.to_be_bytes());
        bytes.extend_from_slice(&0u32.to_be_bytes());
        bytes.extend_from_slice(&64u32.to_be_bytes());
        bytes.extend_from_slice(&128u32.to_be_bytes());
        bytes.extend_from_slice(&0u32.to_be_bytes());
        bytes.extend_from_slice(&0u32.to_be_bytes());
        bytes.extend_from_slice(&3u16.to_be_bytes());
        for _ in 0..3 {
            bytes.push(7);
            bytes.push(1);
            bytes.push(1);
        }
        bytes
    }

    #[test]
    fn detects_raw_codestream() {
        assert_eq!(detect_format(&[0xFF, 0x4F, 0x00]).unwrap(), Brand::J2k);
    }

    #[test]
    fn round_trips_a_minimal_jp2_file() {
        let codestream = sample_codestream();
        let components = vec![
            ComponentDescriptor { bit_depth: 8, signed: false },
            ComponentDescriptor { bit_depth: 8, signed: false },
            ComponentDescriptor { bit_depth: 8, signed: false },
        ];
        let file = write_container(Brand::Jp2, 128, 64, &components, &codestream).unwrap();
        assert_eq!(detect_format(&file).unwrap(), Brand::Jp2);

        let image = read_container(&file).unwrap();
        assert_eq!(image.codestream, codestream);
        assert_eq!(image.image_info.reference_grid_width(), 64);
        assert_eq!(image.header.image_header.unwrap().num_components, 3);
    }

    #[test]
    fn write_container_adds_bpcc_when_bit_depths_differ() {
        let codestream = sample_codestream();
        let components = vec![
            ComponentDescriptor { bit_depth: 8, signed: false },
            ComponentDescriptor { bit_depth: 10, signed: false },
            ComponentDescriptor { bit_depth: 8, signed: false },
        ];
        let file = write_container(Brand::Jp2, 128, 64, &components, &codestream).unwrap();
        let image = read_container(&file).unwrap();
        assert!(image.header.bits_per_component.is_some());
    }
}
