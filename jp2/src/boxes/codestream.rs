use super::{JBox, BOX_TYPE_CONTIGUOUS_CODESTREAM};
use crate::boxing::BoxType;
use crate::error::Jp2Error;

/// `jp2c` -- the contiguous codestream box, holding the full codestream as
/// an owned buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContiguousCodestreamBox {
    pub codestream: Vec<u8>,
}

impl JBox for ContiguousCodestreamBox {
    fn box_type() -> BoxType {
        BOX_TYPE_CONTIGUOUS_CODESTREAM
    }

    fn read(content: &[u8]) -> Result<Self, Jp2Error> {
        Ok(ContiguousCodestreamBox {
            codestream: content.to_vec(),
        })
    }

    fn write(&self) -> Result<Vec<u8>, Jp2Error> {
        Ok(self.codestream.clone())
    }
}
