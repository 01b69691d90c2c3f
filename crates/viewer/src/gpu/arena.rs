/// Bytes bound per draw. Large enough for every uniform block we ship.
pub const UNIFORM_SLOT_SIZE: u64 = 256;

pub fn align_up(value: u64, alignment: u64) -> u64 {
    if alignment == 0 {
        value
    } else {
        value.div_ceil(alignment) * alignment
    }
}

/// Per-frame snapshots of uniform blocks, one slot per draw, addressed with
/// dynamic offsets.
#[derive(Debug)]
pub struct UniformArena {
    bytes: Vec<u8>,
    stride: usize,
}

impl UniformArena {
    pub fn new(offset_alignment: u32) -> Self {
        Self {
            bytes: Vec::new(),
            stride: align_up(UNIFORM_SLOT_SIZE, offset_alignment as u64) as usize,
        }
    }

    /// Copy `block` into a fresh slot and return the slot's byte offset.
    pub fn push(&mut self, block: &[u8]) -> u32 {
        let offset = self.bytes.len();
        self.bytes.resize(offset + self.stride, 0);
        let n = block.len().min(UNIFORM_SLOT_SIZE as usize);
        self.bytes[offset..offset + n].copy_from_slice(&block[..n]);
        offset as u32
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
    }
}
