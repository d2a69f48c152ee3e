use crate::error::{PetError, PetResult};
use crate::key::{BlackboardKey, BlackboardKeyManager};

/// A fixed-size value that can be stored in a blackboard slot.
///
/// Values are stored in native byte order. A slot may be larger than the
/// value read from it, in which case only the leading bytes are used.
pub trait SlotValue: Sized {
    const SIZE: usize;

    /// `bytes` is at least `SIZE` long.
    fn read_from(bytes: &[u8]) -> Self;

    /// `bytes` is at least `SIZE` long.
    fn write_to(self, bytes: &mut [u8]);
}

macro_rules! impl_slot_value {
    ($($ty:ty),*) => {
        $(
            impl SlotValue for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                fn read_from(bytes: &[u8]) -> Self {
                    let mut buf = [0u8; std::mem::size_of::<$ty>()];
                    buf.copy_from_slice(&bytes[..Self::SIZE]);
                    <$ty>::from_ne_bytes(buf)
                }

                fn write_to(self, bytes: &mut [u8]) {
                    bytes[..Self::SIZE].copy_from_slice(&self.to_ne_bytes());
                }
            }
        )*
    };
}

impl_slot_value!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

impl SlotValue for bool {
    const SIZE: usize = 1;

    fn read_from(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }

    fn write_to(self, bytes: &mut [u8]) {
        bytes[0] = self as u8;
    }
}

/// Per-agent scratch memory laid out from a [`BlackboardKeyManager`].
///
/// The layout is computed once and never changes: slot `i` starts right after
/// slot `i - 1`. Slots hold unspecified contents until a behavior writes
/// them, so behaviors keep their own "first use" convention.
#[derive(Debug, Clone)]
pub struct Blackboard {
    offsets: Vec<usize>,
    sizes: Vec<usize>,
    data: Vec<u8>,
}

impl Blackboard {
    pub fn new(keys: &BlackboardKeyManager) -> PetResult<Self> {
        let sizes = keys.key_sizes();
        let mut offsets = Vec::with_capacity(sizes.len());
        let mut total = 0usize;
        for size in &sizes {
            offsets.push(total);
            total = total.checked_add(*size).ok_or(PetError::OutOfMemory)?;
        }

        let mut data = Vec::new();
        data.try_reserve_exact(total)
            .map_err(|_| PetError::OutOfMemory)?;
        data.resize(total, 0);

        Ok(Self {
            offsets,
            sizes,
            data,
        })
    }

    pub fn key_count(&self) -> usize {
        self.offsets.len()
    }

    pub fn total_size(&self) -> usize {
        self.data.len()
    }

    pub fn offset_of(&self, key: BlackboardKey) -> Option<usize> {
        self.offsets.get(key.index()).copied()
    }

    pub fn size_of(&self, key: BlackboardKey) -> Option<usize> {
        self.sizes.get(key.index()).copied()
    }

    /// Raw bytes of one slot, or `None` if the key is not part of the layout.
    pub fn slot(&self, key: BlackboardKey) -> Option<&[u8]> {
        let (start, end) = self.range(key)?;
        self.data.get(start..end)
    }

    pub fn slot_mut(&mut self, key: BlackboardKey) -> Option<&mut [u8]> {
        let (start, end) = self.range(key)?;
        self.data.get_mut(start..end)
    }

    /// Reads the slot as a `T`. Fails if the slot is missing or too small.
    pub fn read<T: SlotValue>(&self, key: BlackboardKey) -> Option<T> {
        self.slot(key)
            .filter(|bytes| bytes.len() >= T::SIZE)
            .map(T::read_from)
    }

    pub fn write<T: SlotValue>(&mut self, key: BlackboardKey, value: T) -> PetResult<()> {
        match self.slot_mut(key) {
            Some(bytes) if bytes.len() >= T::SIZE => {
                value.write_to(bytes);
                Ok(())
            }
            _ => Err(PetError::InvalidArgument),
        }
    }

    fn range(&self, key: BlackboardKey) -> Option<(usize, usize)> {
        let start = self.offset_of(key)?;
        let end = start.checked_add(self.size_of(key)?)?;
        if end > self.data.len() {
            return None;
        }
        Some((start, end))
    }
}

#[cfg(test)]
mod test;
