use super::{RawBox, JBox, BOX_TYPE_FRAGMENT_LIST, BOX_TYPE_FRAGMENT_TABLE};
use crate::boxing::{BoxReader, BoxType, BoxWriter};
use crate::error::Jp2Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fragment {
    pub offset: u64,
    pub length: u32,
}

/// `flst` -- Fragment List box. The offset width (`DR`, 4 or 8 bytes) is
/// chosen on write: 8 iff any offset exceeds `u32::MAX`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentListBox {
    pub fragments: Vec<Fragment>,
}

impl FragmentListBox {
    pub fn new(fragments: Vec<Fragment>) -> Result<Self, Jp2Error> {
        if fragments.len() > 65535 {
            return Err(Jp2Error::InvalidParameter(
                "flst fragment count must be <= 65535".to_string(),
            ));
        }
        Ok(FragmentListBox { fragments })
    }

    fn data_reference_size(&self) -> u8 {
        if self.fragments.iter().any(|f| f.offset > u32::MAX as u64) {
            8
        } else {
            4
        }
    }
}

impl JBox for FragmentListBox {
    fn box_type() -> BoxType {
        BOX_TYPE_FRAGMENT_LIST
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        if content.len() < 2 {
            return Err(Jp2Error::Truncated("flst count field".to_string()));
        }
        let count = u16::from_be_bytes(content[0..2].try_into().unwrap()) as usize;
        let remaining = &content[2..];
        let dr = match remaining.len().checked_div(count.max(1)) {
            Some(8) if count > 0 => 4,
            Some(12) if count > 0 => 8,
            _ if count == 0 => 4,
            _ => {
                return Err(Jp2Error::FileFormat(
                    "flst payload length does not match any valid DR".to_string(),
                ))
            }
        };
        let entry_size = dr as usize + 4;
        if remaining.len() != count * entry_size {
            return Err(Jp2Error::FileFormat(format!(
                "flst payload length mismatch for DR={dr}"
            )));
        }
        let mut fragments = Vec::with_capacity(count);
        let mut cursor = 0;
        for _ in 0..count {
            let offset = if dr == 8 {
                u64::from_be_bytes(remaining[cursor..cursor + 8].try_into().unwrap())
            } else {
                u32::from_be_bytes(remaining[cursor..cursor + 4].try_into().unwrap()) as u64
            };
            cursor += dr as usize;
            let length = u32::from_be_bytes(remaining[cursor..cursor + 4].try_into().unwrap());
            cursor += 4;
            fragments.push(Fragment { offset, length });
        }
        FragmentListBox::new(fragments)
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        let dr = self.data_reference_size();
        let mut out = Vec::with_capacity(2 + self.fragments.len() * (dr as usize + 4));
        out.extend_from_slice(&(self.fragments.len() as u16).to_be_bytes());
        for fragment in &self.fragments {
            if dr == 8 {
                out.extend_from_slice(&fragment.offset.to_be_bytes());
            } else {
                out.extend_from_slice(&(fragment.offset as u32).to_be_bytes());
            }
            out.extend_from_slice(&fragment.length.to_be_bytes());
        }
        Ok(out)
    }
}

/// `ftbl` -- Fragment Table super-box, wrapping a single `flst`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentTableBox {
    pub fragment_list: FragmentListBox,
    pub unknown: Vec<RawBox>,
}

impl JBox for FragmentTableBox {
    fn box_type() -> BoxType {
        BOX_TYPE_FRAGMENT_TABLE
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        let mut fragment_list = None;
        let mut unknown = Vec::new();
        let mut reader = BoxReader::new(content);
        while let Some(info) = reader.read_next()? {
            let child = reader.extract_content(&info);
            if info.box_type == BOX_TYPE_FRAGMENT_LIST {
                fragment_list = Some(FragmentListBox::read(child)?);
            } else {
                unknown.push(RawBox::new(info.box_type, child.to_vec()));
            }
        }
        Ok(FragmentTableBox {
            fragment_list: fragment_list
                .ok_or_else(|| Jp2Error::FileFormat("ftbl is missing flst".to_string()))?,
            unknown,
        })
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        let mut writer = BoxWriter::new();
        writer.write_box(FragmentListBox::box_type(), &self.fragment_list.write()?);
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
    fn flst_uses_dr4_when_all_offsets_fit() {
        let flst = FragmentListBox::new(vec![Fragment { offset: 100, length: 10 }]).unwrap();
        assert_eq!(flst.data_reference_size(), 4);
        let content = flst.write().unwrap();
        assert_eq!(content.len(), 2 + 8);
        assert_eq!(FragmentListBox::read(&content).unwrap(), flst);
    }

    #[test]
    fn flst_uses_dr8_when_an_offset_exceeds_u32_max() {
        let flst = FragmentListBox::new(vec![Fragment {
            offset: u32::MAX as u64 + 1,
            length: 10,
        }])
        .unwrap();
        assert_eq!(flst.data_reference_size(), 8);
        let content = flst.write().unwrap();
        assert_eq!(content.len(), 2 + 12);
        assert_eq!(FragmentListBox::read(&content).unwrap(), flst);
    }
}
