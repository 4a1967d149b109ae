// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! MSB-first bit packing for fixed-width and prefix codes.

/// Bytes needed to hold `count` values of `bits` bits each.
pub fn packed_len(bits: u8, count: usize) -> usize {
    (bits as usize * count + 7) / 8
}

#[derive(Debug, Default)]
pub struct BitWriter {
    bytes: Vec<u8>,
    free_bits: u8,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(bytes: usize) -> Self {
        Self { bytes: Vec::with_capacity(bytes), free_bits: 0 }
    }

    /// Appends the low `width` bits of `value`, most significant first.
    pub fn push(&mut self, value: u32, width: u8) {
        debug_assert!(width <= 32);
        let mut remaining = width;
        while remaining > 0 {
            if self.free_bits == 0 {
                self.bytes.push(0);
                self.free_bits = 8;
            }
            let take = remaining.min(self.free_bits);
            let shift = remaining - take;
            let chunk = ((value >> shift) & ((1u32 << take) - 1)) as u8;
            if let Some(last) = self.bytes.last_mut() {
                *last |= chunk << (self.free_bits - take);
            }
            remaining -= take;
            self.free_bits -= take;
        }
    }

    pub fn bit_len(&self) -> usize {
        self.bytes.len() * 8 - self.free_bits as usize
    }

    /// Trailing bits of the last byte are zero.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Reads `width` bits as an unsigned value, or `None` past the end.
    pub fn read(&mut self, width: u8) -> Option<u32> {
        let width = width as usize;
        if self.pos + width > self.data.len() * 8 {
            return None;
        }
        let mut value = 0u32;
        let mut remaining = width;
        while remaining > 0 {
            let byte = self.data[self.pos / 8];
            let avail = 8 - self.pos % 8;
            let take = remaining.min(avail);
            let chunk = (byte >> (avail - take)) & ((1u16 << take) - 1) as u8;
            value = (value << take) | chunk as u32;
            remaining -= take;
            self.pos += take;
        }
        Some(value)
    }

    pub fn read_bit(&mut self) -> Option<bool> {
        self.read(1).map(|b| b == 1)
    }

    pub fn position(&self) -> usize {
        self.pos
    }
}
