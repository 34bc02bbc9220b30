//! Order-dependent binary game-data stream.
//!
//! Save games and network resyncs write every field of every object in a
//! fixed order and read them back in exactly that order. There are no field
//! tags: a reader that disagrees with the writer about the layout fails with
//! [`StreamError`] or, worse, reads garbage. All integers are little-endian.

use crate::ids::{ObjectId, RoadId, ShipId, WareId};
use crate::point::MapPoint;

/// Errors raised while writing or reading a [`GameData`] stream.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StreamError {
    /// The reader ran past the end of the buffer.
    #[error("unexpected end of stream: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEnd {
        /// Bytes the read required.
        needed: usize,
        /// Bytes left in the buffer.
        remaining: usize,
    },

    /// A decoded value is outside the range of its field.
    #[error("invalid value {value} for field `{field}`")]
    InvalidValue {
        /// Name of the field being decoded.
        field: &'static str,
        /// The offending raw value.
        value: u32,
    },

    /// A container holds more elements than the length prefix can express.
    #[error("container of {len} elements exceeds the u32 length prefix")]
    TooLong {
        /// Number of elements in the container.
        len: usize,
    },
}

/// A growable byte buffer with a read cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameData {
    /// Encoded bytes.
    bytes: Vec<u8>,
    /// Offset of the next byte to read.
    cursor: usize,
}

/// A type that can be written to and read back from a [`GameData`] stream.
pub trait Persist: Sized {
    /// Append this value to the stream.
    fn persist(&self, out: &mut GameData) -> Result<(), StreamError>;

    /// Read a value written by [`Persist::persist`].
    fn restore(input: &mut GameData) -> Result<Self, StreamError>;
}

impl GameData {
    /// Create an empty stream for writing.
    pub const fn new() -> Self {
        Self {
            bytes: Vec::new(),
            cursor: 0,
        }
    }

    /// Wrap previously written bytes for reading.
    pub const fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes, cursor: 0 }
    }

    /// Borrow the encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the stream and return the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Number of bytes not yet read.
    pub const fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.cursor)
    }

    /// Whether every byte has been read.
    pub const fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    // -----------------------------------------------------------------------
    // Writing
    // -----------------------------------------------------------------------

    /// Append one byte.
    pub fn push_u8(&mut self, value: u8) {
        self.bytes.push(value);
    }

    /// Append a 16-bit integer.
    pub fn push_u16(&mut self, value: u16) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    /// Append a 32-bit integer.
    pub fn push_u32(&mut self, value: u32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    /// Append a 64-bit integer.
    pub fn push_u64(&mut self, value: u64) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    /// Append a boolean as one byte.
    pub fn push_bool(&mut self, value: bool) {
        self.push_u8(u8::from(value));
    }

    /// Append a raw byte block without a length prefix.
    pub fn push_raw(&mut self, block: &[u8]) {
        self.bytes.extend_from_slice(block);
    }

    /// Append a map point.
    pub fn push_point(&mut self, point: MapPoint) {
        self.push_u16(point.x);
        self.push_u16(point.y);
    }

    /// Append a container length prefix.
    pub fn push_len(&mut self, len: usize) -> Result<(), StreamError> {
        let prefix = u32::try_from(len).map_err(|_err| StreamError::TooLong { len })?;
        self.push_u32(prefix);
        Ok(())
    }

    /// Append an object reference.
    pub fn push_object(&mut self, id: ObjectId) {
        self.push_u32(id.into_inner());
    }

    /// Append an optional object reference (`0` encodes `None`).
    pub fn push_object_ref(&mut self, id: Option<ObjectId>) {
        self.push_u32(id.map_or(0, ObjectId::into_inner));
    }

    /// Append a road reference.
    pub fn push_road(&mut self, id: RoadId) {
        self.push_u32(id.into_inner());
    }

    /// Append a ware reference.
    pub fn push_ware(&mut self, id: WareId) {
        self.push_u32(id.into_inner());
    }

    /// Append a ship reference.
    pub fn push_ship(&mut self, id: ShipId) {
        self.push_u32(id.into_inner());
    }

    /// Append a length-prefixed list of object references.
    pub fn push_object_list(&mut self, ids: &[ObjectId]) -> Result<(), StreamError> {
        self.push_len(ids.len())?;
        for id in ids {
            self.push_object(*id);
        }
        Ok(())
    }

    /// Append a length-prefixed container of persistable objects.
    pub fn push_container<T: Persist>(&mut self, items: &[T]) -> Result<(), StreamError> {
        self.push_len(items.len())?;
        for item in items {
            item.persist(self)?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Reading
    // -----------------------------------------------------------------------

    /// Take the next `count` bytes.
    fn take(&mut self, count: usize) -> Result<&[u8], StreamError> {
        let remaining = self.remaining();
        let end = self
            .cursor
            .checked_add(count)
            .ok_or(StreamError::UnexpectedEnd {
                needed: count,
                remaining,
            })?;
        let slice = self
            .bytes
            .get(self.cursor..end)
            .ok_or(StreamError::UnexpectedEnd {
                needed: count,
                remaining,
            })?;
        self.cursor = end;
        Ok(slice)
    }

    /// Take the next `N` bytes as an array.
    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], StreamError> {
        let remaining = self.remaining();
        let slice = self.take(N)?;
        <[u8; N]>::try_from(slice).map_err(|_err| StreamError::UnexpectedEnd {
            needed: N,
            remaining,
        })
    }

    /// Read one byte.
    pub fn pop_u8(&mut self) -> Result<u8, StreamError> {
        let [value] = self.take_array::<1>()?;
        Ok(value)
    }

    /// Read a 16-bit integer.
    pub fn pop_u16(&mut self) -> Result<u16, StreamError> {
        Ok(u16::from_le_bytes(self.take_array()?))
    }

    /// Read a 32-bit integer.
    pub fn pop_u32(&mut self) -> Result<u32, StreamError> {
        Ok(u32::from_le_bytes(self.take_array()?))
    }

    /// Read a 64-bit integer.
    pub fn pop_u64(&mut self) -> Result<u64, StreamError> {
        Ok(u64::from_le_bytes(self.take_array()?))
    }

    /// Read a boolean. Any byte other than 0 or 1 is rejected.
    pub fn pop_bool(&mut self) -> Result<bool, StreamError> {
        match self.pop_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(StreamError::InvalidValue {
                field: "bool",
                value: u32::from(other),
            }),
        }
    }

    /// Read a raw byte block of known size.
    pub fn pop_raw(&mut self, count: usize) -> Result<Vec<u8>, StreamError> {
        Ok(self.take(count)?.to_vec())
    }

    /// Read a map point.
    pub fn pop_point(&mut self) -> Result<MapPoint, StreamError> {
        let x = self.pop_u16()?;
        let y = self.pop_u16()?;
        Ok(MapPoint::new(x, y))
    }

    /// Read a container length prefix.
    pub fn pop_len(&mut self) -> Result<usize, StreamError> {
        let raw = self.pop_u32()?;
        let len = usize::try_from(raw).map_err(|_err| StreamError::InvalidValue {
            field: "length",
            value: raw,
        })?;
        // Every element takes at least one byte, so a longer prefix is corrupt.
        if len > self.remaining() {
            return Err(StreamError::InvalidValue {
                field: "length",
                value: raw,
            });
        }
        Ok(len)
    }

    /// Read an object reference.
    pub fn pop_object(&mut self) -> Result<ObjectId, StreamError> {
        Ok(ObjectId::new(self.pop_u32()?))
    }

    /// Read an optional object reference.
    pub fn pop_object_ref(&mut self) -> Result<Option<ObjectId>, StreamError> {
        let raw = self.pop_u32()?;
        Ok((raw != 0).then_some(ObjectId::new(raw)))
    }

    /// Read a road reference.
    pub fn pop_road(&mut self) -> Result<RoadId, StreamError> {
        Ok(RoadId::new(self.pop_u32()?))
    }

    /// Read a ware reference.
    pub fn pop_ware(&mut self) -> Result<WareId, StreamError> {
        Ok(WareId::new(self.pop_u32()?))
    }

    /// Read a ship reference.
    pub fn pop_ship(&mut self) -> Result<ShipId, StreamError> {
        Ok(ShipId::new(self.pop_u32()?))
    }

    /// Read a length-prefixed list of object references.
    pub fn pop_object_list(&mut self) -> Result<Vec<ObjectId>, StreamError> {
        let len = self.pop_len()?;
        let mut ids = Vec::with_capacity(len);
        for _ in 0..len {
            ids.push(self.pop_object()?);
        }
        Ok(ids)
    }

    /// Read a length-prefixed container of persistable objects.
    pub fn pop_container<T: Persist>(&mut self) -> Result<Vec<T>, StreamError> {
        let len = self.pop_len()?;
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            items.push(T::restore(self)?);
        }
        Ok(items)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn fields_read_back_in_write_order() {
        let mut data = GameData::new();
        data.push_u8(7);
        data.push_u16(0x1234);
        data.push_u32(0xDEAD_BEEF);
        data.push_bool(true);
        data.push_point(MapPoint::new(3, 9));
        data.push_object_ref(None);

        let mut input = GameData::from_bytes(data.into_bytes());
        assert_eq!(input.pop_u8().unwrap(), 7);
        assert_eq!(input.pop_u16().unwrap(), 0x1234);
        assert_eq!(input.pop_u32().unwrap(), 0xDEAD_BEEF);
        assert!(input.pop_bool().unwrap());
        assert_eq!(input.pop_point().unwrap(), MapPoint::new(3, 9));
        assert_eq!(input.pop_object_ref().unwrap(), None);
        assert!(input.is_exhausted());
    }

    #[test]
    fn integers_are_little_endian() {
        let mut data = GameData::new();
        data.push_u16(0x0102);
        assert_eq!(data.as_bytes(), &[0x02, 0x01]);
    }

    #[test]
    fn reading_past_the_end_fails() {
        let mut input = GameData::from_bytes(vec![1, 2]);
        assert_eq!(
            input.pop_u32(),
            Err(StreamError::UnexpectedEnd {
                needed: 4,
                remaining: 2
            })
        );
    }

    #[test]
    fn corrupt_bool_is_rejected() {
        let mut input = GameData::from_bytes(vec![2]);
        assert!(matches!(
            input.pop_bool(),
            Err(StreamError::InvalidValue { field: "bool", .. })
        ));
    }

    #[test]
    fn oversized_length_prefix_is_rejected() {
        let mut data = GameData::new();
        data.push_u32(1000);
        let mut input = GameData::from_bytes(data.into_bytes());
        assert!(input.pop_object_list().is_err());
    }

    #[test]
    fn object_lists_keep_order() {
        let ids = [ObjectId::new(5), ObjectId::new(2), ObjectId::new(9)];
        let mut data = GameData::new();
        data.push_object_list(&ids).unwrap();
        let mut input = GameData::from_bytes(data.into_bytes());
        assert_eq!(input.pop_object_list().unwrap(), ids.to_vec());
    }
}
