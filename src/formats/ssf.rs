use byteorder::{LittleEndian, WriteBytesExt};

use super::reader::BinaryReader;
use crate::error::Result;

const SLOT_COUNT: usize = 28;
/// 写出时在有效槽位之后追加的保留槽位
const PADDING_SLOTS: usize = 12;
const EMPTY: u32 = 0xFFFF_FFFF;

/// 音效集槽位，顺序即文件中的顺序
pub const SOUND_NAMES: [&str; SLOT_COUNT] = [
    "Battlecry 1",
    "Battlecry 2",
    "Battlecry 3",
    "Battlecry 4",
    "Battlecry 5",
    "Battlecry 6",
    "Selected 1",
    "Selected 2",
    "Selected 3",
    "Attack 1",
    "Attack 2",
    "Attack 3",
    "Pain 1",
    "Pain 2",
    "Low health",
    "Death",
    "Critical hit",
    "Target immune",
    "Place mine",
    "Disarm mine",
    "Stealth on",
    "Search",
    "Pick lock start",
    "Pick lock fail",
    "Pick lock done",
    "Leave party",
    "Rejoin party",
    "Poisoned",
];

/// 音效集 (SSF V1.1)，每个槽位保存一个字符串引用，-1 表示空
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ssf {
    pub slots: [i32; SLOT_COUNT],
}

impl Default for Ssf {
    fn default() -> Self {
        Self {
            slots: [-1; SLOT_COUNT],
        }
    }
}

impl Ssf {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = BinaryReader::new(data);
        reader.expect_magic(b"SSF V1.1", "SSF")?;
        let offset = reader.read_u32()? as usize;
        reader.seek(offset)?;

        let mut slots = [-1; SLOT_COUNT];
        for slot in slots.iter_mut() {
            let raw = reader.read_u32()?;
            *slot = if raw == EMPTY { -1 } else { raw as i32 };
        }
        Ok(Self { slots })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(12 + (SLOT_COUNT + PADDING_SLOTS) * 4);
        out.extend_from_slice(b"SSF V1.1");
        out.write_u32::<LittleEndian>(12)?;
        for slot in self.slots {
            out.write_u32::<LittleEndian>(if slot < 0 { EMPTY } else { slot as u32 })?;
        }
        for _ in 0..PADDING_SLOTS {
            out.write_u32::<LittleEndian>(EMPTY)?;
        }
        Ok(out)
    }

    pub fn sound_name(index: usize) -> Option<&'static str> {
        SOUND_NAMES.get(index).copied()
    }
}
