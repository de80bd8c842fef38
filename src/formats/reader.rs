use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};
use crate::utils::decode_cp1252;

/// 对字节切片的有界随机访问读取器
///
/// 所有读取都会先检查是否超出声明的窗口 (ExceedCheck)，
/// 越界时返回 [`Error::OutOfBounds`] 而不是越界读取。
#[derive(Debug, Clone)]
pub struct BinaryReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BinaryReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// 在 `data` 中截取 `[offset, offset + size)` 作为新的窗口
    pub fn window(data: &'a [u8], offset: usize, size: usize) -> Result<Self> {
        let end = offset
            .checked_add(size)
            .filter(|end| *end <= data.len())
            .ok_or(Error::OutOfBounds {
                offset: offset as u64,
                len: size as u64,
                size: data.len() as u64,
            })?;
        Ok(Self::new(&data[offset..end]))
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(self.exceed(pos, 0));
        }
        self.pos = pos;
        Ok(())
    }

    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.read_bytes(len).map(|_| ())
    }

    fn exceed(&self, offset: usize, len: usize) -> Error {
        Error::OutOfBounds {
            offset: offset as u64,
            len: len as u64,
            size: self.data.len() as u64,
        }
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| self.exceed(self.pos, len))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// 读取 `[offset, offset + len)`，不移动当前位置
    pub fn peek_at(&self, offset: usize, len: usize) -> Result<&'a [u8]> {
        offset
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .map(|end| &self.data[offset..end])
            .ok_or_else(|| self.exceed(offset, len))
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.read_bytes(2)?))
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(LittleEndian::read_i16(self.read_bytes(2)?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.read_bytes(4)?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(LittleEndian::read_i32(self.read_bytes(4)?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(LittleEndian::read_u64(self.read_bytes(8)?))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(LittleEndian::read_i64(self.read_bytes(8)?))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(LittleEndian::read_f32(self.read_bytes(4)?))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(LittleEndian::read_f64(self.read_bytes(8)?))
    }

    /// 定长字符串，截断到第一个 NUL
    pub fn read_fixed_string(&mut self, len: usize) -> Result<String> {
        let raw = self.read_bytes(len)?;
        let end = raw.iter().position(|b| *b == 0).unwrap_or(raw.len());
        Ok(decode_cp1252(&raw[..end]))
    }

    /// 以 NUL 结尾的字符串
    pub fn read_terminated_string(&mut self) -> Result<String> {
        let rest = &self.data[self.pos..];
        let end = rest
            .iter()
            .position(|b| *b == 0)
            .ok_or_else(|| self.exceed(self.pos, rest.len() + 1))?;
        let text = decode_cp1252(&rest[..end]);
        self.pos += end + 1;
        Ok(text)
    }

    /// 校验文件头标识
    pub fn expect_magic(&mut self, magic: &[u8], format: &'static str) -> Result<()> {
        let found = self
            .read_bytes(magic.len())
            .map_err(|_| Error::invalid(format, "文件过短"))?;
        if found != magic {
            return Err(Error::invalid(
                format,
                format!("文件头不匹配: {:?}", String::from_utf8_lossy(found)),
            ));
        }
        Ok(())
    }
}

/// 将字符串写为定长的 NUL 填充字段
pub fn fixed_string_bytes(text: &str, len: usize) -> Vec<u8> {
    let mut out = crate::utils::encode_cp1252(text);
    out.resize(len, 0);
    out
}
