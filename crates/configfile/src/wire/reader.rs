//! Bounds-checked little-endian reader over a byte slice.

use crate::error::DecodeError;

pub(super) struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    pub(super) const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    pub(super) const fn offset(&self) -> usize {
        self.offset
    }

    pub(super) const fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.offset)
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8], DecodeError> {
        let bytes = self.bytes;
        let start = self.offset;
        match start.checked_add(count).and_then(|end| bytes.get(start..end)) {
            Some(slice) => {
                self.offset += count;
                Ok(slice)
            }
            None => Err(DecodeError::Truncated {
                offset: self.offset,
                needed: count.saturating_sub(self.remaining()),
            }),
        }
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let slice = self.take(N)?;
        let mut array = [0_u8; N];
        array.copy_from_slice(slice);
        Ok(array)
    }

    pub(super) fn read_u8(&mut self) -> Result<u8, DecodeError> {
        let [byte] = self.take_array::<1>()?;
        Ok(byte)
    }

    pub(super) fn read_bool(&mut self) -> Result<bool, DecodeError> {
        let offset = self.offset;
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            byte => Err(DecodeError::InvalidBoolean { byte, offset }),
        }
    }

    pub(super) fn read_len(&mut self) -> Result<usize, DecodeError> {
        let len = u32::from_le_bytes(self.take_array()?);
        // u32 always fits in usize on supported targets.
        Ok(usize::try_from(len).unwrap_or(usize::MAX))
    }

    pub(super) fn read_i32(&mut self) -> Result<i32, DecodeError> {
        Ok(i32::from_le_bytes(self.take_array()?))
    }

    pub(super) fn read_i64(&mut self) -> Result<i64, DecodeError> {
        Ok(i64::from_le_bytes(self.take_array()?))
    }

    pub(super) fn read_f64(&mut self) -> Result<f64, DecodeError> {
        Ok(f64::from_bits(u64::from_le_bytes(self.take_array()?)))
    }

    pub(super) fn read_string(&mut self) -> Result<String, DecodeError> {
        let len = self.read_len()?;
        let offset = self.offset;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidUtf8 { offset })
    }
}
