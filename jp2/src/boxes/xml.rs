use super::{JBox, BOX_TYPE_XML};
use crate::boxing::BoxType;
use crate::error::Jp2Error;

/// `xml ` -- a UTF-8 validated XML document, preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlBox {
    pub xml: String,
}

impl JBox for XmlBox {
    fn box_type() -> BoxType {
        BOX_TYPE_XML
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        let xml = String::from_utf8(content.to_vec())
            .map_err(|e| Jp2Error::FileFormat(format!("xml  payload is not UTF-8: {e}")))?;
        Ok(XmlBox { xml })
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        Ok(self.xml.clone().into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xml_round_trips() {
        let xml = XmlBox {
            xml: "<a/>".to_string(),
        };
        let content = xml.write().unwrap();
        assert_eq!(XmlBox::read(&content).unwrap(), xml);
    }

    #[test]
    fn xml_rejects_non_utf8() {
        assert!(XmlBox::read(&[0xff, 0xfe]).is_err());
    }
}
