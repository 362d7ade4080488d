use super::{
    JBox, RawBox, BOX_TYPE_BITS_PER_COMPONENT, BOX_TYPE_CHANNEL_DEFINITION,
    BOX_TYPE_COLOUR_SPECIFICATION, BOX_TYPE_COMPONENT_MAPPING, BOX_TYPE_HEADER,
    BOX_TYPE_IMAGE_HEADER, BOX_TYPE_PALETTE,
};
use crate::boxing::{BoxReader, BoxType, BoxWriter};
use crate::error::Jp2Error;

/// `ihdr` -- mandatory, fixed 14-byte payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageHeaderBox {
    pub height: u32,
    pub width: u32,
    pub num_components: u16,
    bits_per_component: u8,
    pub compression_type: u8,
    pub colourspace_unknown: u8,
    pub intellectual_property: u8,
}

impl ImageHeaderBox {
    pub fn new(
        height: u32,
        width: u32,
        num_components: u16,
        bit_depth: u8,
        signed: bool,
    ) -> Result<Self, Jp2Error> {
        if !(1..=38).contains(&bit_depth) {
            return Err(Jp2Error::InvalidParameter(format!(
                "bit depth {bit_depth} outside [1,38]"
            )));
        }
        let bits_per_component = (bit_depth - 1) | if signed { 0x80 } else { 0 };
        Ok(ImageHeaderBox {
            height,
            width,
            num_components,
            bits_per_component,
            compression_type: 7,
            colourspace_unknown: 0,
            intellectual_property: 0,
        })
    }

    pub fn bits_per_component(&self) -> u8 {
        (self.bits_per_component & 0x7f) + 1
    }

    pub fn values_are_signed(&self) -> bool {
        self.bits_per_component & 0x80 == 0x80
    }
}

impl JBox for ImageHeaderBox {
    fn box_type() -> BoxType {
        BOX_TYPE_IMAGE_HEADER
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        if content.len() != 14 {
            return Err(Jp2Error::FileFormat(format!(
                "ihdr payload must be 14 bytes, got {}",
                content.len()
            )));
        }
        let height = u32::from_be_bytes(content[0..4].try_into().unwrap());
        let width = u32::from_be_bytes(content[4..8].try_into().unwrap());
        let num_components = u16::from_be_bytes(content[8..10].try_into().unwrap());
        let bits_per_component = content[10];
        let compression_type = content[11];
        if compression_type != 7 {
            return Err(Jp2Error::FileFormat(format!(
                "ihdr compression type must be 7, got {compression_type}"
            )));
        }
        let colourspace_unknown = content[12];
        let intellectual_property = content[13];
        Ok(ImageHeaderBox {
            height,
            width,
            num_components,
            bits_per_component,
            compression_type,
            colourspace_unknown,
            intellectual_property,
        })
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        let mut out = Vec::with_capacity(14);
        out.extend_from_slice(&self.height.to_be_bytes());
        out.extend_from_slice(&self.width.to_be_bytes());
        out.extend_from_slice(&self.num_components.to_be_bytes());
        out.push(self.bits_per_component);
        out.push(self.compression_type);
        out.push(self.colourspace_unknown);
        out.push(self.intellectual_property);
        Ok(out)
    }
}

/// `bpcc` -- one byte per component, present iff component bit depths differ.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitsPerComponentBox {
    components: Vec<u8>,
}

impl BitsPerComponentBox {
    pub fn new(components: Vec<(u8, bool)>) -> Result<Self, Jp2Error> {
        if components.is_empty() || components.len() > 16384 {
            return Err(Jp2Error::InvalidParameter(
                "bpcc component count must be in [1, 16384]".to_string(),
            ));
        }
        let mut bytes = Vec::with_capacity(components.len());
        for (bit_depth, signed) in components {
            if !(1..=38).contains(&bit_depth) {
                return Err(Jp2Error::InvalidParameter(format!(
                    "bit depth {bit_depth} outside [1,38]"
                )));
            }
            bytes.push((bit_depth - 1) | if signed { 0x80 } else { 0 });
        }
        Ok(BitsPerComponentBox { components: bytes })
    }

    pub fn bit_depth(&self, component: usize) -> Option<u8> {
        self.components.get(component).map(|b| (b & 0x7f) + 1)
    }

    pub fn is_signed(&self, component: usize) -> Option<bool> {
        self.components.get(component).map(|b| b & 0x80 == 0x80)
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl JBox for BitsPerComponentBox {
    fn box_type() -> BoxType {
        BOX_TYPE_BITS_PER_COMPONENT
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        if content.is_empty() || content.len() > 16384 {
            return Err(Jp2Error::FileFormat(
                "bpcc payload length must be in [1, 16384]".to_string(),
            ));
        }
        Ok(BitsPerComponentBox {
            components: content.to_vec(),
        })
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        Ok(self.components.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColourSpecificationMethod {
    Enumerated,
    RestrictedIcc,
    AnyIcc,
    Vendor,
}

impl ColourSpecificationMethod {
    fn code(self) -> u8 {
        match self {
            ColourSpecificationMethod::Enumerated => 1,
            ColourSpecificationMethod::RestrictedIcc => 2,
            ColourSpecificationMethod::AnyIcc => 3,
            ColourSpecificationMethod::Vendor => 4,
        }
    }

    fn from_code(code: u8) -> Result<Self, Jp2Error> {
        match code {
            1 => Ok(ColourSpecificationMethod::Enumerated),
            2 => Ok(ColourSpecificationMethod::RestrictedIcc),
            3 => Ok(ColourSpecificationMethod::AnyIcc),
            4 => Ok(ColourSpecificationMethod::Vendor),
            other => Err(Jp2Error::FileFormat(format!(
                "colr method must be in {{1,2,3,4}}, got {other}"
            ))),
        }
    }
}

/// Closed set of enumerated colour spaces this engine knows how to emit.
pub const ENUM_CS_GREYSCALE: u32 = 17;
pub const ENUM_CS_SRGB: u32 = 16;
pub const ENUM_CS_YCBCR: u32 = 18;
pub const ENUM_CS_CMYK: u32 = 12;
pub const ENUM_CS_ESRGB: u32 = 20;
pub const ENUM_CS_ROMM_RGB: u32 = 21;

const KNOWN_ENUM_CS: [u32; 6] = [
    ENUM_CS_SRGB,
    ENUM_CS_GREYSCALE,
    ENUM_CS_YCBCR,
    ENUM_CS_CMYK,
    ENUM_CS_ESRGB,
    ENUM_CS_ROMM_RGB,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColourSpecificationBox {
    pub method: ColourSpecificationMethod,
    pub precedence: u8,
    pub approximation: u8,
    enumerated_cs: Option<u32>,
    profile: Option<Vec<u8>>,
}

impl ColourSpecificationBox {
    pub fn enumerated(enum_cs: u32, precedence: u8, approximation: u8) -> Result<Self, Jp2Error> {
        if !KNOWN_ENUM_CS.contains(&enum_cs) {
            return Err(Jp2Error::InvalidParameter(format!(
                "unrecognized enumerated colour space {enum_cs}"
            )));
        }
        Ok(ColourSpecificationBox {
            method: ColourSpecificationMethod::Enumerated,
            precedence,
            approximation,
            enumerated_cs: Some(enum_cs),
            profile: None,
        })
    }

    pub fn icc_profile(
        method: ColourSpecificationMethod,
        profile: Vec<u8>,
        precedence: u8,
        approximation: u8,
    ) -> Result<Self, Jp2Error> {
        if method == ColourSpecificationMethod::Enumerated {
            return Err(Jp2Error::InvalidParameter(
                "use ColourSpecificationBox::enumerated for method 1".to_string(),
            ));
        }
        icc::validate_profile_bytes(&profile)?;
        Ok(ColourSpecificationBox {
            method,
            precedence,
            approximation,
            enumerated_cs: None,
            profile: Some(profile),
        })
    }

    pub fn enumerated_colour_space(&self) -> Option<u32> {
        self.enumerated_cs
    }

    pub fn profile_bytes(&self) -> Option<&[u8]> {
        self.profile.as_deref()
    }
}

impl JBox for ColourSpecificationBox {
    fn box_type() -> BoxType {
        BOX_TYPE_COLOUR_SPECIFICATION
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        if content.len() < 3 {
            return Err(Jp2Error::Truncated("colr header is 3 bytes".to_string()));
        }
        let method = ColourSpecificationMethod::from_code(content[0])?;
        let precedence = content[1];
        let approximation = content[2];
        match method {
            ColourSpecificationMethod::Enumerated => {
                if content.len() != 7 {
                    return Err(Jp2Error::FileFormat(format!(
                        "enumerated colr payload must be 7 bytes, got {}",
                        content.len()
                    )));
                }
                let enum_cs = u32::from_be_bytes(content[3..7].try_into().unwrap());
                if !KNOWN_ENUM_CS.contains(&enum_cs) {
                    return Err(Jp2Error::FileFormat(format!(
                        "unrecognized enumerated colour space {enum_cs}"
                    )));
                }
                Ok(ColourSpecificationBox {
                    method,
                    precedence,
                    approximation,
                    enumerated_cs: Some(enum_cs),
                    profile: None,
                })
            }
            _ => {
                let profile = &content[3..];
                icc::validate_profile_bytes(profile)?;
                Ok(ColourSpecificationBox {
                    method,
                    precedence,
                    approximation,
                    enumerated_cs: None,
                    profile: Some(profile.to_vec()),
                })
            }
        }
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        let mut out = vec![self.method.code(), self.precedence, self.approximation];
        match self.method {
            ColourSpecificationMethod::Enumerated => {
                out.extend_from_slice(&self.enumerated_cs.unwrap().to_be_bytes());
            }
            _ => {
                out.extend_from_slice(self.profile.as_deref().unwrap_or_default());
            }
        }
        Ok(out)
    }
}

/// Per-component bit depth entry inside `pclr`.
fn bytes_for_bits(bits: u8) -> usize {
    (bits as usize).div_ceil(8)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteBox {
    component_bit_depths: Vec<u8>,
    /// `entries[entry_index][component_index]`.
    entries: Vec<Vec<u32>>,
}

impl PaletteBox {
    pub fn new(component_bit_depths: Vec<u8>, entries: Vec<Vec<u32>>) -> Result<Self, Jp2Error> {
        let num_entries = entries.len();
        if !(1..=1024).contains(&num_entries) {
            return Err(Jp2Error::InvalidParameter(
                "pclr entry count must be in [1, 1024]".to_string(),
            ));
        }
        let num_components = component_bit_depths.len();
        if !(1..=255).contains(&num_components) {
            return Err(Jp2Error::InvalidParameter(
                "pclr component count must be in [1, 255]".to_string(),
            ));
        }
        for bits in &component_bit_depths {
            if !(1..=38).contains(bits) {
                return Err(Jp2Error::InvalidParameter(format!(
                    "pclr bit depth {bits} outside [1,38]"
                )));
            }
        }
        for entry in &entries {
            if entry.len() != num_components {
                return Err(Jp2Error::InvalidParameter(
                    "pclr entry component count mismatch".to_string(),
                ));
            }
            for (value, bits) in entry.iter().zip(component_bit_depths.iter()) {
                let max = (1u64 << bits) - 1;
                if *value as u64 > max {
                    return Err(Jp2Error::InvalidParameter(format!(
                        "pclr value {value} exceeds bit depth {bits}"
                    )));
                }
            }
        }
        Ok(PaletteBox {
            component_bit_depths,
            entries,
        })
    }

    pub fn num_entries(&self) -> usize {
        self.entries.len()
    }

    pub fn num_components(&self) -> usize {
        self.component_bit_depths.len()
    }

    pub fn bit_depth(&self, component: usize) -> Option<u8> {
        self.component_bit_depths.get(component).copied()
    }

    pub fn value(&self, entry: usize, component: usize) -> Option<u32> {
        self.entries.get(entry)?.get(component).copied()
    }
}

impl JBox for PaletteBox {
    fn box_type() -> BoxType {
        BOX_TYPE_PALETTE
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        if content.len() < 3 {
            return Err(Jp2Error::Truncated("pclr header is 3 bytes".to_string()));
        }
        let num_entries = u16::from_be_bytes(content[0..2].try_into().unwrap()) as usize;
        let num_components = content[2] as usize;
        if !(1..=1024).contains(&num_entries) {
            return Err(Jp2Error::FileFormat(
                "pclr entry count must be in [1, 1024]".to_string(),
            ));
        }
        if !(1..=255).contains(&num_components) {
            return Err(Jp2Error::FileFormat(
                "pclr component count must be in [1, 255]".to_string(),
            ));
        }
        let mut cursor = 3;
        let mut component_bit_depths = Vec::with_capacity(num_components);
        for _ in 0..num_components {
            let raw = *content
                .get(cursor)
                .ok_or_else(|| Jp2Error::Truncated("pclr bit-depth table".to_string()))?;
            component_bit_depths.push((raw & 0x7f) + 1);
            cursor += 1;
        }

        let mut entries = Vec::with_capacity(num_entries);
        for _ in 0..num_entries {
            let mut entry = Vec::with_capacity(num_components);
            for &bits in &component_bit_depths {
                let width = bytes_for_bits(bits);
                let raw = content
                    .get(cursor..cursor + width)
                    .ok_or_else(|| Jp2Error::Truncated("pclr entry value".to_string()))?;
                let mut value: u32 = 0;
                for byte in raw {
                    value = (value << 8) | *byte as u32;
                }
                entry.push(value);
                cursor += width;
            }
            entries.push(entry);
        }

        PaletteBox::new(component_bit_depths, entries)
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        let per_entry_bytes: usize = self
            .component_bit_depths
            .iter()
            .map(|b| bytes_for_bits(*b))
            .sum();
        let mut out = Vec::with_capacity(3 + self.num_components() + self.num_entries() * per_entry_bytes);
        out.extend_from_slice(&(self.num_entries() as u16).to_be_bytes());
        out.push(self.num_components() as u8);
        for bits in &self.component_bit_depths {
            out.push(bits - 1);
        }
        for entry in &self.entries {
            for (value, bits) in entry.iter().zip(self.component_bit_depths.iter()) {
                let width = bytes_for_bits(*bits);
                let value_bytes = value.to_be_bytes();
                out.extend_from_slice(&value_bytes[4 - width..]);
            }
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentMapType {
    Direct,
    Palette,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentMapEntry {
    pub component: u16,
    pub map_type: ComponentMapType,
    pub palette_column: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentMappingBox {
    pub entries: Vec<ComponentMapEntry>,
}

impl JBox for ComponentMappingBox {
    fn box_type() -> BoxType {
        BOX_TYPE_COMPONENT_MAPPING
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        if content.len() % 4 != 0 {
            return Err(Jp2Error::FileFormat(
                "cmap payload length must be a multiple of 4".to_string(),
            ));
        }
        let entries = content
            .chunks_exact(4)
            .map(|chunk| {
                let component = u16::from_be_bytes([chunk[0], chunk[1]]);
                let map_type = match chunk[2] {
                    0 => Ok(ComponentMapType::Direct),
                    1 => Ok(ComponentMapType::Palette),
                    other => Err(Jp2Error::FileFormat(format!(
                        "cmap type must be 0 or 1, got {other}"
                    ))),
                }?;
                Ok(ComponentMapEntry {
                    component,
                    map_type,
                    palette_column: chunk[3],
                })
            })
            .collect::<Result<Vec<_>, Jp2Error>>()?;
        Ok(ComponentMappingBox { entries })
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        let mut out = Vec::with_capacity(self.entries.len() * 4);
        for entry in &self.entries {
            out.extend_from_slice(&entry.component.to_be_bytes());
            out.push(match entry.map_type {
                ComponentMapType::Direct => 0,
                ComponentMapType::Palette => 1,
            });
            out.push(entry.palette_column);
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelType {
    Colour,
    Opacity,
    PremultipliedOpacity,
    Unspecified,
}

impl ChannelType {
    fn code(self) -> u16 {
        match self {
            ChannelType::Colour => 0,
            ChannelType::Opacity => 1,
            ChannelType::PremultipliedOpacity => 2,
            ChannelType::Unspecified => 65535,
        }
    }

    fn from_code(code: u16) -> Result<Self, Jp2Error> {
        match code {
            0 => Ok(ChannelType::Colour),
            1 => Ok(ChannelType::Opacity),
            2 => Ok(ChannelType::PremultipliedOpacity),
            65535 => Ok(ChannelType::Unspecified),
            other => Err(Jp2Error::FileFormat(format!(
                "cdef channel type {other} is not one of {{0,1,2,65535}}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Channel {
    pub index: u16,
    pub channel_type: ChannelType,
    pub association: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelDefinitionBox {
    pub channels: Vec<Channel>,
}

impl JBox for ChannelDefinitionBox {
    fn box_type() -> BoxType {
        BOX_TYPE_CHANNEL_DEFINITION
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        if content.len() < 2 {
            return Err(Jp2Error::Truncated("cdef count field".to_string()));
        }
        let count = u16::from_be_bytes(content[0..2].try_into().unwrap()) as usize;
        let expected_len = 2 + 6 * count;
        if content.len() != expected_len {
            return Err(Jp2Error::FileFormat(format!(
                "cdef payload length must be 2 + 6N ({expected_len}), got {}",
                content.len()
            )));
        }
        let mut channels = Vec::with_capacity(count);
        let mut cursor = 2;
        for _ in 0..count {
            let index = u16::from_be_bytes(content[cursor..cursor + 2].try_into().unwrap());
            let channel_type =
                ChannelType::from_code(u16::from_be_bytes(content[cursor + 2..cursor + 4].try_into().unwrap()))?;
            let association = u16::from_be_bytes(content[cursor + 4..cursor + 6].try_into().unwrap());
            channels.push(Channel {
                index,
                channel_type,
                association,
            });
            cursor += 6;
        }
        Ok(ChannelDefinitionBox { channels })
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        let mut out = Vec::with_capacity(2 + 6 * self.channels.len());
        out.extend_from_slice(&(self.channels.len() as u16).to_be_bytes());
        for channel in &self.channels {
            out.extend_from_slice(&channel.index.to_be_bytes());
            out.extend_from_slice(&channel.channel_type.code().to_be_bytes());
            out.extend_from_slice(&channel.association.to_be_bytes());
        }
        Ok(out)
    }
}

/// `jp2h` -- the JP2 Header super-box. Always contains `ihdr`; the rest are
/// optional. Unknown children round-trip as [`RawBox`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HeaderSuperBox {
    pub image_header: Option<ImageHeaderBox>,
    pub bits_per_component: Option<BitsPerComponentBox>,
    pub colour_specifications: Vec<ColourSpecificationBox>,
    pub palette: Option<PaletteBox>,
    pub component_mapping: Option<ComponentMappingBox>,
    pub channel_definition: Option<ChannelDefinitionBox>,
    pub unknown: Vec<RawBox>,
}

impl JBox for HeaderSuperBox {
    fn box_type() -> BoxType {
        BOX_TYPE_HEADER
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        let mut out = HeaderSuperBox::default();
        let mut reader = BoxReader::new(content);
        while let Some(info) = reader.read_next()? {
            let child = reader.extract_content(&info);
            match info.box_type {
                t if t == BOX_TYPE_IMAGE_HEADER => {
                    out.image_header = Some(ImageHeaderBox::read(child)?);
                }
                t if t == BOX_TYPE_BITS_PER_COMPONENT => {
                    out.bits_per_component = Some(BitsPerComponentBox::read(child)?);
                }
                t if t == BOX_TYPE_COLOUR_SPECIFICATION => {
                    out.colour_specifications.push(ColourSpecificationBox::read(child)?);
                }
                t if t == BOX_TYPE_PALETTE => {
                    out.palette = Some(PaletteBox::read(child)?);
                }
                t if t == BOX_TYPE_COMPONENT_MAPPING => {
                    out.component_mapping = Some(ComponentMappingBox::read(child)?);
                }
                t if t == BOX_TYPE_CHANNEL_DEFINITION => {
                    out.channel_definition = Some(ChannelDefinitionBox::read(child)?);
                }
                other => {
                    out.unknown.push(RawBox::new(other, child.to_vec()));
                }
            }
        }
        if out.image_header.is_none() {
            return Err(Jp2Error::FileFormat("jp2h is missing ihdr".to_string()));
        }
        Ok(out)
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        let image_header = self
            .image_header
            .as_ref()
            .ok_or_else(|| Jp2Error::InvalidParameter("jp2h requires ihdr".to_string()))?;

        let mut writer = BoxWriter::new();
        writer.write_box(ImageHeaderBox::box_type(), &image_header.write()?);
        if let Some(bpcc) = &self.bits_per_component {
            writer.write_box(BitsPerComponentBox::box_type(), &bpcc.write()?);
        }
        for colr in &self.colour_specifications {
            writer.write_box(ColourSpecificationBox::box_type(), &colr.write()?);
        }
        if let Some(pclr) = &self.palette {
            writer.write_box(PaletteBox::box_type(), &pclr.write()?);
        }
        if let Some(cmap) = &self.component_mapping {
            writer.write_box(ComponentMappingBox::box_type(), &cmap.write()?);
        }
        if let Some(cdef) = &self.channel_definition {
            writer.write_box(ChannelDefinitionBox::box_type(), &cdef.write()?);
        }
        for raw in &self.unknown {
            writer.write_raw_box(raw.box_type, &raw.content);
        }
        Ok(writer.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ihdr_endianness_matches_literal_bytes() {
        let ihdr = ImageHeaderBox {
            height: 0x0506_0708,
            width: 0x0102_0304,
            num_components: 3,
            bits_per_component: 7,
            compression_type: 7,
            colourspace_unknown: 0,
            intellectual_property: 0,
        };
        let bytes = ihdr.write().unwrap();
        assert_eq!(
            &bytes[0..8],
            &[0x05, 0x06, 0x07, 0x08, 0x01, 0x02, 0x03, 0x04]
        );
    }

    #[test]
    fn ihdr_round_trips() {
        let ihdr = ImageHeaderBox::new(512, 512, 3, 8, false).unwrap();
        let content = ihdr.write().unwrap();
        assert_eq!(content.len(), 14);
        let read_back = ImageHeaderBox::read(&content).unwrap();
        assert_eq!(read_back, ihdr);
        assert_eq!(read_back.bits_per_component(), 8);
        assert!(!read_back.values_are_signed());
    }

    #[test]
    fn pclr_packs_ten_bit_entries_in_two_bytes() {
        let pclr = PaletteBox::new(vec![10, 10, 10], vec![vec![1000, 2, 3], vec![4, 5, 1023]]).unwrap();
        let content = pclr.write().unwrap();
        let per_entry = 3 * 2;
        assert_eq!(content.len(), 3 + 3 + 2 * per_entry);
        let read_back = PaletteBox::read(&content).unwrap();
        assert_eq!(read_back, pclr);
    }

    #[test]
    fn pclr_rejects_value_exceeding_bit_depth() {
        assert!(PaletteBox::new(vec![10], vec![vec![1 << 10]]).is_err());
    }

    #[test]
    fn jp2h_requires_ihdr_first_then_bpcc_then_colr() {
        let header = HeaderSuperBox {
            image_header: Some(ImageHeaderBox::new(4, 4, 1, 8, false).unwrap()),
            bits_per_component: Some(BitsPerComponentBox::new(vec![(8, false)]).unwrap()),
            colour_specifications: vec![ColourSpecificationBox::enumerated(ENUM_CS_GREYSCALE, 0, 1).unwrap()],
            ..Default::default()
        };
        let content = header.write().unwrap();
        let mut reader = BoxReader::new(&content);
        let first = reader.read_next().unwrap().unwrap();
        assert_eq!(first.box_type, BOX_TYPE_IMAGE_HEADER);
        let second = reader.read_next().unwrap().unwrap();
        assert_eq!(second.box_type, BOX_TYPE_BITS_PER_COMPONENT);
        let third = reader.read_next().unwrap().unwrap();
        assert_eq!(third.box_type, BOX_TYPE_COLOUR_SPECIFICATION);
    }

    #[test]
    fn jp2h_preserves_unknown_children() {
        let mut header = HeaderSuperBox {
            image_header: Some(ImageHeaderBox::new(4, 4, 1, 8, false).unwrap()),
            ..Default::default()
        };
        header.unknown.push(RawBox::new(*b"xxxx", vec![1, 2, 3]));
        let content = header.write().unwrap();
        let read_back = HeaderSuperBox::read(&content).unwrap();
        assert_eq!(read_back.unknown, vec![RawBox::new(*b"xxxx", vec![1, 2, 3])]);
    }
}
