use super::{
    RawBox, JBox, BOX_TYPE_ASSOCIATION, BOX_TYPE_CROSS_REFERENCE, BOX_TYPE_DIGITAL_SIGNATURE,
    BOX_TYPE_INTELLECTUAL_PROPERTY, BOX_TYPE_LABEL, BOX_TYPE_NUMBER_LIST, BOX_TYPE_ROI_DESCRIPTION,
};
use crate::boxing::{BoxReader, BoxType, BoxWriter};
use crate::error::Jp2Error;

/// `dsig` -- Digital Signature. Opaque bytes, preserved but never validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigitalSignatureBox {
    pub signature: Vec<u8>,
}

impl JBox for DigitalSignatureBox {
    fn box_type() -> BoxType {
        BOX_TYPE_DIGITAL_SIGNATURE
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        Ok(DigitalSignatureBox {
            signature: content.to_vec(),
        })
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        Ok(self.signature.clone())
    }
}

/// `roid` -- ROI Description: one byte per region giving a region-id/shape
/// tag; round-tripped opaquely beyond that.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoiDescriptionBox {
    pub regions: Vec<u8>,
}

impl JBox for RoiDescriptionBox {
    fn box_type() -> BoxType {
        BOX_TYPE_ROI_DESCRIPTION
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        Ok(RoiDescriptionBox {
            regions: content.to_vec(),
        })
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        Ok(self.regions.clone())
    }
}

/// `jp2i` -- Intellectual Property association: an embedded XMP/IPR blob,
/// treated as an opaque byte string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntellectualPropertyBox {
    pub data: Vec<u8>,
}

impl JBox for IntellectualPropertyBox {
    fn box_type() -> BoxType {
        BOX_TYPE_INTELLECTUAL_PROPERTY
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        Ok(IntellectualPropertyBox {
            data: content.to_vec(),
        })
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        Ok(self.data.clone())
    }
}

/// `lbl ` -- Label: a UTF-8 string, not null-terminated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelBox {
    pub label: String,
}

impl JBox for LabelBox {
    fn box_type() -> BoxType {
        BOX_TYPE_LABEL
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        let label = String::from_utf8(content.to_vec())
            .map_err(|e| Jp2Error::FileFormat(format!("lbl  payload is not UTF-8: {e}")))?;
        Ok(LabelBox { label })
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        Ok(self.label.clone().into_bytes())
    }
}

/// The association kind encoded in the high bit of a `nlst` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberListAssociation {
    Codestream(u32),
    CompositingLayer(u32),
    Rendered,
}

const NLST_RENDERED: u32 = 0;
const NLST_COMPOSITING_LAYER_TAG: u32 = 1 << 24;

impl NumberListAssociation {
    fn encode(self) -> u32 {
        match self {
            NumberListAssociation::Rendered => NLST_RENDERED,
            NumberListAssociation::Codestream(index) => index,
            NumberListAssociation::CompositingLayer(index) => NLST_COMPOSITING_LAYER_TAG | index,
        }
    }

    fn decode(raw: u32) -> Self {
        if raw == NLST_RENDERED {
            NumberListAssociation::Rendered
        } else if raw & NLST_COMPOSITING_LAYER_TAG != 0 {
            NumberListAssociation::CompositingLayer(raw & !NLST_COMPOSITING_LAYER_TAG)
        } else {
            NumberListAssociation::Codestream(raw)
        }
    }
}

/// `nlst` -- Number List: a sequence of tagged associations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberListBox {
    pub associations: Vec<NumberListAssociation>,
}

impl JBox for NumberListBox {
    fn box_type() -> BoxType {
        BOX_TYPE_NUMBER_LIST
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        if content.len() % 4 != 0 {
            return Err(Jp2Error::FileFormat(
                "nlst payload must be a multiple of 4 bytes".to_string(),
            ));
        }
        let associations = content
            .chunks_exact(4)
            .map(|c| NumberListAssociation::decode(u32::from_be_bytes(c.try_into().unwrap())))
            .collect();
        Ok(NumberListBox { associations })
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        let mut out = Vec::with_capacity(self.associations.len() * 4);
        for assoc in &self.associations {
            out.extend_from_slice(&assoc.encode().to_be_bytes());
        }
        Ok(out)
    }
}

/// `cref` -- Cross-Reference: `(association_target, box_type)` pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrossReferenceEntry {
    pub association_target: u32,
    pub box_type: BoxType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossReferenceBox {
    pub entries: Vec<CrossReferenceEntry>,
}

impl JBox for CrossReferenceBox {
    fn box_type() -> BoxType {
        BOX_TYPE_CROSS_REFERENCE
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        if content.len() % 8 != 0 {
            return Err(Jp2Error::FileFormat(
                "cref payload must be a multiple of 8 bytes".to_string(),
            ));
        }
        let entries = content
            .chunks_exact(8)
            .map(|c| CrossReferenceEntry {
                association_target: u32::from_be_bytes(c[0..4].try_into().unwrap()),
                box_type: c[4..8].try_into().unwrap(),
            })
            .collect();
        Ok(CrossReferenceBox { entries })
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        let mut out = Vec::with_capacity(self.entries.len() * 8);
        for entry in &self.entries {
            out.extend_from_slice(&entry.association_target.to_be_bytes());
            out.extend_from_slice(&entry.box_type);
        }
        Ok(out)
    }
}

/// `asoc` -- Association super-box: optional `lbl ` first, then any mixture
/// of boxes (including nested `asoc`) grouped under that label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationBox {
    pub label: Option<LabelBox>,
    pub children: Vec<RawBox>,
}

impl JBox for AssociationBox {
    fn box_type() -> BoxType {
        BOX_TYPE_ASSOCIATION
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        let mut label = None;
        let mut children = Vec::new();
        let mut reader = BoxReader::new(content);
        while let Some(info) = reader.read_next()? {
            let child = reader.extract_content(&info);
            if info.box_type == BOX_TYPE_LABEL && label.is_none() && children.is_empty() {
                label = Some(LabelBox::read(child)?);
            } else {
                children.push(RawBox::new(info.box_type, child.to_vec()));
            }
        }
        Ok(AssociationBox { label, children })
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        let mut writer = BoxWriter::new();
        if let Some(label) = &self.label {
            writer.write_box(LabelBox::box_type(), &label.write()?);
        }
        for child in &self.children {
            writer.write_raw_box(child.box_type, &child.content);
        }
        Ok(writer.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_round_trips() {
        let lbl = LabelBox {
            label: "layer 0".to_string(),
        };
        let content = lbl.write().unwrap();
        assert_eq!(LabelBox::read(&content).unwrap(), lbl);
    }

    #[test]
    fn number_list_round_trips_all_association_kinds() {
        let nlst = NumberListBox {
            associations: vec![
                NumberListAssociation::Rendered,
                NumberListAssociation::Codestream(3),
                NumberListAssociation::CompositingLayer(2),
            ],
        };
        let content = nlst.write().unwrap();
        assert_eq!(NumberListBox::read(&content).unwrap(), nlst);
    }

    #[test]
    fn cross_reference_round_trips() {
        let cref_box = CrossReferenceBox {
            entries: vec![CrossReferenceEntry {
                association_target: 1,
                box_type: *b"jp2c",
            }],
        };
        let content = cref_box.write().unwrap();
        assert_eq!(CrossReferenceBox::read(&content).unwrap(), cref_box);
    }

    #[test]
    fn association_preserves_label_and_unknown_children() {
        let asoc = AssociationBox {
            label: Some(LabelBox {
                label: "frame".to_string(),
            }),
            children: vec![RawBox::new(*b"nlst", vec![0, 0, 0, 1])],
        };
        let content = asoc.write().unwrap();
        assert_eq!(AssociationBox::read(&content).unwrap(), asoc);
    }
}
