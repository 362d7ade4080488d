use super::{
    RawBox, JBox, BOX_TYPE_DATA_ENTRY_URL, BOX_TYPE_UUID, BOX_TYPE_UUID_INFO, BOX_TYPE_UUID_LIST,
};
use crate::boxing::{BoxReader, BoxType, BoxWriter};
use crate::error::Jp2Error;

/// `uuid` -- a 16-byte UUID followed by opaque vendor-defined bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UuidBox {
    pub uuid: [u8; 16],
    pub data: Vec<u8>,
}

impl JBox for UuidBox {
    fn box_type() -> BoxType {
        BOX_TYPE_UUID
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        if content.len() < 16 {
            return Err(Jp2Error::Truncated("uuid payload shorter than 16 bytes".to_string()));
        }
        Ok(UuidBox {
            uuid: content[0..16].try_into().unwrap(),
            data: content[16..].to_vec(),
        })
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        let mut out = Vec::with_capacity(16 + self.data.len());
        out.extend_from_slice(&self.uuid);
        out.extend_from_slice(&self.data);
        Ok(out)
    }
}

/// `url ` -- Data Entry URL box. The location is a UTF-8 string; version
/// and flags are carried but unused by this engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataEntryUrlBox {
    pub version: u8,
    pub flags: [u8; 3],
    pub location: String,
}

impl JBox for DataEntryUrlBox {
    fn box_type() -> BoxType {
        BOX_TYPE_DATA_ENTRY_URL
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        if content.len() < 4 {
            return Err(Jp2Error::Truncated("url  header is 4 bytes".to_string()));
        }
        let location = String::from_utf8(content[4..].to_vec())
            .map_err(|e| Jp2Error::FileFormat(format!("url  location is not UTF-8: {e}")))?;
        Ok(DataEntryUrlBox {
            version: content[0],
            flags: [content[1], content[2], content[3]],
            location,
        })
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        let mut out = Vec::with_capacity(4 + self.location.len());
        out.push(self.version);
        out.extend_from_slice(&self.flags);
        out.extend_from_slice(self.location.as_bytes());
        Ok(out)
    }
}

/// `ulst` -- UUID List box: a count followed by that many 16-byte UUIDs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UuidListBox {
    pub uuids: Vec<[u8; 16]>,
}

impl JBox for UuidListBox {
    fn box_type() -> BoxType {
        BOX_TYPE_UUID_LIST
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        if content.len() < 2 {
            return Err(Jp2Error::Truncated("ulst count field".to_string()));
        }
        let count = u16::from_be_bytes(content[0..2].try_into().unwrap()) as usize;
        let expected = 2 + count * 16;
        if content.len() != expected {
            return Err(Jp2Error::FileFormat(format!(
                "ulst payload length must be {expected}, got {}",
                content.len()
            )));
        }
        let uuids = content[2..]
            .chunks_exact(16)
            .map(|chunk| chunk.try_into().unwrap())
            .collect();
        Ok(UuidListBox { uuids })
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        let mut out = Vec::with_capacity(2 + self.uuids.len() * 16);
        out.extend_from_slice(&(self.uuids.len() as u16).to_be_bytes());
        for uuid in &self.uuids {
            out.extend_from_slice(uuid);
        }
        Ok(out)
    }
}

/// `uinf` -- UUID Info super-box: `ulst` followed by a `url ` box pointing
/// at where fuller vendor data can be found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UuidInfoSuperBox {
    pub uuid_list: UuidListBox,
    pub data_entry_url: DataEntryUrlBox,
    pub unknown: Vec<RawBox>,
}

impl JBox for UuidInfoSuperBox {
    fn box_type() -> BoxType {
        BOX_TYPE_UUID_INFO
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        let mut uuid_list = None;
        let mut data_entry_url = None;
        let mut unknown = Vec::new();
        let mut reader = BoxReader::new(content);
        while let Some(info) = reader.read_next()? {
            let child = reader.extract_content(&info);
            match info.box_type {
                t if t == BOX_TYPE_UUID_LIST => uuid_list = Some(UuidListBox::read(child)?),
                t if t == BOX_TYPE_DATA_ENTRY_URL => data_entry_url = Some(DataEntryUrlBox::read(child)?),
                other => unknown.push(RawBox::new(other, child.to_vec())),
            }
        }
        Ok(UuidInfoSuperBox {
            uuid_list: uuid_list.ok_or_else(|| Jp2Error::FileFormat("uinf is missing ulst".to_string()))?,
            data_entry_url: data_entry_url
                .ok_or_else(|| Jp2Error::FileFormat("uinf is missing url ".to_string()))?,
            unknown,
        })
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        let mut writer = BoxWriter::new();
        writer.write_box(UuidListBox::box_type(), &self.uuid_list.write()?);
        writer.write_box(DataEntryUrlBox::box_type(), &self.data_entry_url.write()?);
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
    fn uuid_box_round_trips() {
        let uuid = UuidBox {
            uuid: [1; 16],
            data: vec![9, 9, 9],
        };
        let content = uuid.write().unwrap();
        assert_eq!(UuidBox::read(&content).unwrap(), uuid);
    }

    #[test]
    fn data_entry_url_round_trips_self_referencing() {
        let url = DataEntryUrlBox {
            version: 0,
            flags: [0, 0, 1],
            location: String::new(),
        };
        let content = url.write().unwrap();
        assert_eq!(DataEntryUrlBox::read(&content).unwrap(), url);
    }
}
