use byteorder::{LittleEndian, WriteBytesExt};

use super::reader::{BinaryReader, fixed_string_bytes};
use crate::error::{Error, Result};
use crate::utils::{decode_cp1252, encode_cp1252};

const HEADER_SIZE: usize = 20;
const ENTRY_SIZE: usize = 40;

const FLAG_TEXT: u32 = 0x1;
const FLAG_SOUND: u32 = 0x2;
const FLAG_SOUND_LENGTH: u32 = 0x4;

/// 字符串表 (TLK V3.0)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tlk {
    pub language: u32,
    pub entries: Vec<TlkEntry>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TlkEntry {
    pub text: String,
    /// 语音 resref，最长 16 字节
    pub sound: String,
    pub sound_length: f32,
}

impl TlkEntry {
    pub fn new(text: impl Into<String>, sound: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sound: sound.into(),
            sound_length: 0.0,
        }
    }

    /// 文本和语音都相同即视为同一条目
    pub fn same_content(&self, other: &TlkEntry) -> bool {
        self.text == other.text && self.sound.eq_ignore_ascii_case(&other.sound)
    }
}

impl Tlk {
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = BinaryReader::new(data);
        reader.expect_magic(b"TLK ", "TLK")?;
        reader.expect_magic(b"V3.0", "TLK")?;
        let language = reader.read_u32()?;
        let count = reader.read_u32()? as usize;
        let texts_offset = reader.read_u32()? as usize;

        let needed = count
            .checked_mul(ENTRY_SIZE)
            .and_then(|n| n.checked_add(HEADER_SIZE))
            .ok_or_else(|| Error::invalid("TLK", "条目数量溢出"))?;
        if needed > data.len() {
            return Err(Error::invalid(
                "TLK",
                format!("声明了 {count} 个条目，但文件只有 {} 字节", data.len()),
            ));
        }

        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            let flags = reader.read_u32()?;
            let sound = reader.read_fixed_string(16)?;
            // 音量与音高未使用
            reader.read_u32()?;
            reader.read_u32()?;
            let text_offset = reader.read_u32()? as usize;
            let text_length = reader.read_u32()? as usize;
            let sound_length = reader.read_f32()?;

            let text = if flags & FLAG_TEXT != 0 || text_length > 0 {
                let raw = reader.peek_at(texts_offset + text_offset, text_length)?;
                decode_cp1252(raw)
            } else {
                String::new()
            };

            entries.push(TlkEntry {
                text,
                sound: if flags & FLAG_SOUND != 0 { sound } else { String::new() },
                sound_length: if flags & FLAG_SOUND_LENGTH != 0 { sound_length } else { 0.0 },
            });
        }

        Ok(Self { language, entries })
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let texts_offset = HEADER_SIZE + self.entries.len() * ENTRY_SIZE;
        let mut out = Vec::with_capacity(texts_offset);
        out.extend_from_slice(b"TLK V3.0");
        out.write_u32::<LittleEndian>(self.language)?;
        out.write_u32::<LittleEndian>(self.entries.len() as u32)?;
        out.write_u32::<LittleEndian>(texts_offset as u32)?;

        let mut texts = Vec::new();
        for entry in &self.entries {
            let encoded = encode_cp1252(&entry.text);
            let mut flags = 0;
            if !entry.text.is_empty() {
                flags |= FLAG_TEXT;
            }
            if !entry.sound.is_empty() {
                flags |= FLAG_SOUND;
            }
            if entry.sound_length != 0.0 {
                flags |= FLAG_SOUND_LENGTH;
            }

            out.write_u32::<LittleEndian>(flags)?;
            out.extend(fixed_string_bytes(&entry.sound, 16));
            out.write_u32::<LittleEndian>(0)?;
            out.write_u32::<LittleEndian>(0)?;
            out.write_u32::<LittleEndian>(texts.len() as u32)?;
            out.write_u32::<LittleEndian>(encoded.len() as u32)?;
            out.write_f32::<LittleEndian>(entry.sound_length)?;
            texts.extend(encoded);
        }

        out.extend(texts);
        Ok(out)
    }
}
