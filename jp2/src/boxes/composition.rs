use super::header::ColourSpecificationBox;
use super::{
    RawBox, JBox, BOX_TYPE_CODESTREAM_REGISTRATION, BOX_TYPE_COLOUR_GROUP, BOX_TYPE_COMPOSITING_LAYER_HEADER,
    BOX_TYPE_COMPOSITION, BOX_TYPE_INSTRUCTION_SET, BOX_TYPE_OPACITY,
};
use crate::boxing::{BoxReader, BoxType, BoxWriter};
use crate::error::Jp2Error;

/// `inst` -- one animation frame: placement, lifetime, and persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstructionSetBox {
    pub persistent: bool,
    pub codestream_index: u16,
    pub horizontal_offset: i32,
    pub vertical_offset: i32,
    pub width: u32,
    pub height: u32,
    pub life: u32,
}

impl JBox for InstructionSetBox {
    fn box_type() -> BoxType {
        BOX_TYPE_INSTRUCTION_SET
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        if content.len() != 23 {
            return Err(Jp2Error::FileFormat(format!(
                "inst payload must be 23 bytes, got {}",
                content.len()
            )));
        }
        Ok(InstructionSetBox {
            persistent: content[0] & 0x01 != 0,
            codestream_index: u16::from_be_bytes(content[1..3].try_into().unwrap()),
            horizontal_offset: i32::from_be_bytes(content[3..7].try_into().unwrap()),
            vertical_offset: i32::from_be_bytes(content[7..11].try_into().unwrap()),
            width: u32::from_be_bytes(content[11..15].try_into().unwrap()),
            height: u32::from_be_bytes(content[15..19].try_into().unwrap()),
            life: u32::from_be_bytes(content[19..23].try_into().unwrap()),
        })
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        let mut out = Vec::with_capacity(23);
        out.push(if self.persistent { 1 } else { 0 });
        out.extend_from_slice(&self.codestream_index.to_be_bytes());
        out.extend_from_slice(&self.horizontal_offset.to_be_bytes());
        out.extend_from_slice(&self.vertical_offset.to_be_bytes());
        out.extend_from_slice(&self.width.to_be_bytes());
        out.extend_from_slice(&self.height.to_be_bytes());
        out.extend_from_slice(&self.life.to_be_bytes());
        Ok(out)
    }
}

/// `comp` -- the composition box: a canvas plus an ordered `inst` sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositionBox {
    pub canvas_height: u32,
    pub canvas_width: u32,
    pub loop_count: u16,
    pub instructions: Vec<InstructionSetBox>,
}

impl CompositionBox {
    pub fn instruction_count(&self) -> usize {
        self.instructions.len()
    }
}

impl JBox for CompositionBox {
    fn box_type() -> BoxType {
        BOX_TYPE_COMPOSITION
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        if content.len() < 10 {
            return Err(Jp2Error::Truncated("comp header is 10 bytes".to_string()));
        }
        let canvas_height = u32::from_be_bytes(content[0..4].try_into().unwrap());
        let canvas_width = u32::from_be_bytes(content[4..8].try_into().unwrap());
        let loop_count = u16::from_be_bytes(content[8..10].try_into().unwrap());
        let mut instructions = Vec::new();
        let mut reader = BoxReader::new(&content[10..]);
        while let Some(info) = reader.read_next()? {
            if info.box_type != BOX_TYPE_INSTRUCTION_SET {
                return Err(Jp2Error::FileFormat(
                    "comp only contains inst children".to_string(),
                ));
            }
            instructions.push(InstructionSetBox::read(reader.extract_content(&info))?);
        }
        Ok(CompositionBox {
            canvas_height,
            canvas_width,
            loop_count,
            instructions,
        })
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        let mut out = Vec::with_capacity(10);
        out.extend_from_slice(&self.canvas_height.to_be_bytes());
        out.extend_from_slice(&self.canvas_width.to_be_bytes());
        out.extend_from_slice(&self.loop_count.to_be_bytes());
        let mut writer = BoxWriter::new();
        for inst in &self.instructions {
            writer.write_box(InstructionSetBox::box_type(), &inst.write()?);
        }
        out.extend_from_slice(writer.bytes());
        Ok(out)
    }
}

/// `opct` -- opacity channel descriptor for a compositing layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpacityChannelType {
    None,
    ComponentBased,
    AuxiliaryCodestream(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpacityBox {
    pub channel_type: OpacityChannelType,
}

impl JBox for OpacityBox {
    fn box_type() -> BoxType {
        BOX_TYPE_OPACITY
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        let oc = *content
            .first()
            .ok_or_else(|| Jp2Error::Truncated("opct OC byte".to_string()))?;
        let channel_type = match oc {
            0 => OpacityChannelType::None,
            1 => OpacityChannelType::ComponentBased,
            2 => OpacityChannelType::AuxiliaryCodestream(content[1..].to_vec()),
            other => {
                return Err(Jp2Error::FileFormat(format!(
                    "opct OC must be 0, 1 or 2, got {other}"
                )))
            }
        };
        Ok(OpacityBox { channel_type })
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        Ok(match &self.channel_type {
            OpacityChannelType::None => vec![0],
            OpacityChannelType::ComponentBased => vec![1],
            OpacityChannelType::AuxiliaryCodestream(indices) => {
                let mut out = vec![2];
                out.extend_from_slice(indices);
                out
            }
        })
    }
}

/// `creg` -- codestream registration: the grid subsampling plus one
/// `(xr, yr, xo, yo)` placement per referenced codestream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodestreamRegistration {
    pub horizontal_separation: u16,
    pub vertical_separation: u16,
    pub horizontal_offset: u32,
    pub vertical_offset: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodestreamRegistrationBox {
    pub grid_horizontal_subsampling: u16,
    pub grid_vertical_subsampling: u16,
    pub registrations: Vec<CodestreamRegistration>,
}

impl JBox for CodestreamRegistrationBox {
    fn box_type() -> BoxType {
        BOX_TYPE_CODESTREAM_REGISTRATION
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        if content.len() < 4 || (content.len() - 4) % 12 != 0 {
            return Err(Jp2Error::FileFormat(
                "creg payload length must be 4 + 12N".to_string(),
            ));
        }
        let grid_horizontal_subsampling = u16::from_be_bytes(content[0..2].try_into().unwrap());
        let grid_vertical_subsampling = u16::from_be_bytes(content[2..4].try_into().unwrap());
        let registrations = content[4..]
            .chunks_exact(12)
            .map(|chunk| CodestreamRegistration {
                horizontal_separation: u16::from_be_bytes(chunk[0..2].try_into().unwrap()),
                vertical_separation: u16::from_be_bytes(chunk[2..4].try_into().unwrap()),
                horizontal_offset: u32::from_be_bytes(chunk[4..8].try_into().unwrap()),
                vertical_offset: u32::from_be_bytes(chunk[8..12].try_into().unwrap()),
            })
            .collect();
        Ok(CodestreamRegistrationBox {
            grid_horizontal_subsampling,
            grid_vertical_subsampling,
            registrations,
        })
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        let mut out = Vec::with_capacity(4 + self.registrations.len() * 12);
        out.extend_from_slice(&self.grid_horizontal_subsampling.to_be_bytes());
        out.extend_from_slice(&self.grid_vertical_subsampling.to_be_bytes());
        for r in &self.registrations {
            out.extend_from_slice(&r.horizontal_separation.to_be_bytes());
            out.extend_from_slice(&r.vertical_separation.to_be_bytes());
            out.extend_from_slice(&r.horizontal_offset.to_be_bytes());
            out.extend_from_slice(&r.vertical_offset.to_be_bytes());
        }
        Ok(out)
    }
}

/// `cgrp` -- alternate colour descriptions for a compositing layer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColourGroupBox {
    pub colours: Vec<ColourSpecificationBox>,
}

impl JBox for ColourGroupBox {
    fn box_type() -> BoxType {
        BOX_TYPE_COLOUR_GROUP
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        let mut colours = Vec::new();
        let mut reader = BoxReader::new(content);
        while let Some(info) = reader.read_next()? {
            if info.box_type == super::BOX_TYPE_COLOUR_SPECIFICATION {
                colours.push(ColourSpecificationBox::read(reader.extract_content(&info))?);
            }
        }
        Ok(ColourGroupBox { colours })
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        let mut writer = BoxWriter::new();
        for colour in &self.colours {
            writer.write_box(super::BOX_TYPE_COLOUR_SPECIFICATION, &colour.write()?);
        }
        Ok(writer.into_bytes())
    }
}

/// `jplh` -- Compositing Layer Header super-box.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompositingLayerHeaderBox {
    pub colour_group: Option<ColourGroupBox>,
    pub opacity: Option<OpacityBox>,
    pub unknown: Vec<RawBox>,
}

impl JBox for CompositingLayerHeaderBox {
    fn box_type() -> BoxType {
        BOX_TYPE_COMPOSITING_LAYER_HEADER
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        let mut out = CompositingLayerHeaderBox::default();
        let mut reader = BoxReader::new(content);
        while let Some(info) = reader.read_next()? {
            let child = reader.extract_content(&info);
            match info.box_type {
                t if t == BOX_TYPE_COLOUR_GROUP => out.colour_group = Some(ColourGroupBox::read(child)?),
                t if t == BOX_TYPE_OPACITY => out.opacity = Some(OpacityBox::read(child)?),
                other => out.unknown.push(RawBox::new(other, child.to_vec())),
            }
        }
        Ok(out)
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        let mut writer = BoxWriter::new();
        if let Some(cgrp) = &self.colour_group {
            writer.write_box(ColourGroupBox::box_type(), &cgrp.write()?);
        }
        if let Some(opct) = &self.opacity {
            writer.write_box(OpacityBox::box_type(), &opct.write()?);
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
    fn composition_box_round_trips_three_instructions() {
        let comp = CompositionBox {
            canvas_height: 600,
            canvas_width: 800,
            loop_count: 0,
            instructions: vec![
                InstructionSetBox {
                    persistent: false,
                    codestream_index: 0,
                    horizontal_offset: 0,
                    vertical_offset: 0,
                    width: 800,
                    height: 600,
                    life: 100,
                },
                InstructionSetBox {
                    persistent: false,
                    codestream_index: 1,
                    horizontal_offset: 0,
                    vertical_offset: 0,
                    width: 800,
                    height: 600,
                    life: 150,
                },
                InstructionSetBox {
                    persistent: false,
                    codestream_index: 2,
                    horizontal_offset: 0,
                    vertical_offset: 0,
                    width: 800,
                    height: 600,
                    life: 100,
                },
            ],
        };
        let content = comp.write().unwrap();
        let read_back = CompositionBox::read(&content).unwrap();
        assert_eq!(read_back.instruction_count(), 3);
        assert_eq!(read_back.canvas_width, 800);
        assert_eq!(read_back.canvas_height, 600);
        assert_eq!(
            read_back
                .instructions
                .iter()
                .map(|i| i.codestream_index)
                .collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }
}
