use super::{RawBox, JBox, BOX_TYPE_LAYOUT_OBJECT, BOX_TYPE_PAGE, BOX_TYPE_PAGE_COLLECTION};
use crate::boxing::{BoxReader, BoxType, BoxWriter};
use crate::error::Jp2Error;

/// `lobj` -- a JPM Layout Object: one codestream's placement on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutObjectBox {
    pub object_header_flags: u8,
    pub horizontal_offset: u32,
    pub vertical_offset: u32,
    pub width: u32,
    pub height: u32,
    pub codestream_index: u16,
}

impl JBox for LayoutObjectBox {
    fn box_type() -> BoxType {
        BOX_TYPE_LAYOUT_OBJECT
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        if content.len() != 19 {
            return Err(Jp2Error::FileFormat(format!(
                "lobj payload must be 19 bytes, got {}",
                content.len()
            )));
        }
        Ok(LayoutObjectBox {
            object_header_flags: content[0],
            horizontal_offset: u32::from_be_bytes(content[1..5].try_into().unwrap()),
            vertical_offset: u32::from_be_bytes(content[5..9].try_into().unwrap()),
            width: u32::from_be_bytes(content[9..13].try_into().unwrap()),
            height: u32::from_be_bytes(content[13..17].try_into().unwrap()),
            codestream_index: u16::from_be_bytes(content[17..19].try_into().unwrap()),
        })
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        let mut out = Vec::with_capacity(19);
        out.push(self.object_header_flags);
        out.extend_from_slice(&self.horizontal_offset.to_be_bytes());
        out.extend_from_slice(&self.vertical_offset.to_be_bytes());
        out.extend_from_slice(&self.width.to_be_bytes());
        out.extend_from_slice(&self.height.to_be_bytes());
        out.extend_from_slice(&self.codestream_index.to_be_bytes());
        Ok(out)
    }
}

/// `page` -- a JPM page: canvas dimensions plus one or more layout objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageBox {
    pub height: u32,
    pub width: u32,
    pub layout_objects: Vec<LayoutObjectBox>,
}

impl JBox for PageBox {
    fn box_type() -> BoxType {
        BOX_TYPE_PAGE
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        if content.len() < 8 {
            return Err(Jp2Error::Truncated("page header is 8 bytes".to_string()));
        }
        let height = u32::from_be_bytes(content[0..4].try_into().unwrap());
        let width = u32::from_be_bytes(content[4..8].try_into().unwrap());
        let mut layout_objects = Vec::new();
        let mut reader = BoxReader::new(&content[8..]);
        while let Some(info) = reader.read_next()? {
            if info.box_type != BOX_TYPE_LAYOUT_OBJECT {
                return Err(Jp2Error::FileFormat("page only contains lobj children".to_string()));
            }
            layout_objects.push(LayoutObjectBox::read(reader.extract_content(&info))?);
        }
        if layout_objects.is_empty() {
            return Err(Jp2Error::FileFormat("page must contain at least one lobj".to_string()));
        }
        Ok(PageBox {
            height,
            width,
            layout_objects,
        })
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        let mut out = Vec::with_capacity(8);
        out.extend_from_slice(&self.height.to_be_bytes());
        out.extend_from_slice(&self.width.to_be_bytes());
        let mut writer = BoxWriter::new();
        for lobj in &self.layout_objects {
            writer.write_box(LayoutObjectBox::box_type(), &lobj.write()?);
        }
        out.extend_from_slice(writer.bytes());
        Ok(out)
    }
}

/// `pcol` -- JPM Page Collection super-box: a sequence of pages.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageCollectionBox {
    pub pages: Vec<PageBox>,
    pub unknown: Vec<RawBox>,
}

impl JBox for PageCollectionBox {
    fn box_type() -> BoxType {
        BOX_TYPE_PAGE_COLLECTION
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        let mut pages = Vec::new();
        let mut unknown = Vec::new();
        let mut reader = BoxReader::new(content);
        while let Some(info) = reader.read_next()? {
            let child = reader.extract_content(&info);
            if info.box_type == BOX_TYPE_PAGE {
                pages.push(PageBox::read(child)?);
            } else {
                unknown.push(RawBox::new(info.box_type, child.to_vec()));
            }
        }
        Ok(PageCollectionBox { pages, unknown })
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        let mut writer = BoxWriter::new();
        for page in &self.pages {
            writer.write_box(PageBox::box_type(), &page.write()?);
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
    fn page_collection_round_trips() {
        let pcol = PageCollectionBox {
            pages: vec![PageBox {
                height: 1100,
                width: 850,
                layout_objects: vec![LayoutObjectBox {
                    object_header_flags: 0,
                    horizontal_offset: 0,
                    vertical_offset: 0,
                    width: 850,
                    height: 1100,
                    codestream_index: 0,
                }],
            }],
            unknown: Vec::new(),
        };
        let content = pcol.write().unwrap();
        assert_eq!(PageCollectionBox::read(&content).unwrap(), pcol);
    }
}
