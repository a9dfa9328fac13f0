//! 固定ビット幅の整数配列
//!
//! 値は64ビットワードの境界をまたいで連続に詰め込まれます。

use rkyv::{Archive, Deserialize, Serialize};

use crate::errors::{InflectionError, Result};
use crate::utils::{FromU32, low_mask};

/// 固定ビット幅で詰め込まれた整数配列
#[derive(Debug, Default, Clone, Archive, Serialize, Deserialize)]
pub struct PackedArray {
    width: u8,
    len: u32,
    data: Vec<u64>,
}

#[inline(always)]
fn read_with<F>(width: u32, len: usize, idx: usize, word: F) -> Result<u64>
where
    F: Fn(usize) -> Option<u64>,
{
    if idx >= len {
        return Err(InflectionError::index_out_of_bounds("packed array", idx, len));
    }
    let pos = idx * width as usize;
    let (w, off) = (pos / 64, (pos % 64) as u32);
    let truncated = || InflectionError::invalid_state("packed array is truncated", format!("word {w}"));
    let mut value = word(w).ok_or_else(truncated)? >> off;
    if off + width > 64 {
        value |= word(w + 1).ok_or_else(truncated)? << (64 - off);
    }
    Ok(value & low_mask(width))
}

impl PackedArray {
    /// 値あたり`width`ビットの空の配列を作成します。
    ///
    /// # エラー
    ///
    /// `width`が1から64の範囲外の場合にエラーを返します。
    pub fn new(width: u32) -> Result<Self> {
        if !(1..=64).contains(&width) {
            return Err(InflectionError::invalid_argument(
                "width",
                format!("must be in 1..=64, got {width}"),
            ));
        }
        Ok(Self {
            width: width as u8,
            len: 0,
            data: vec![],
        })
    }

    /// 値を末尾に追加します。
    ///
    /// # エラー
    ///
    /// 値が幅に収まらない場合にエラーを返します。
    pub fn push(&mut self, value: u64) -> Result<()> {
        let width = u32::from(self.width);
        if value & !low_mask(width) != 0 {
            return Err(InflectionError::invalid_argument(
                "value",
                format!("{value} does not fit in {width} bits"),
            ));
        }
        let pos = usize::from_u32(self.len) * width as usize;
        let (w, off) = (pos / 64, (pos % 64) as u32);
        let needed = (pos + width as usize).div_ceil(64);
        self.data.resize(needed, 0);
        self.data[w] |= value << off;
        if off + width > 64 {
            self.data[w + 1] |= value >> (64 - off);
        }
        self.len = self.len.checked_add(1).ok_or_else(|| {
            InflectionError::invalid_argument("value", "packed array is full")
        })?;
        Ok(())
    }

    /// `idx`番目の値を読み出します。
    ///
    /// # エラー
    ///
    /// `idx`が範囲外の場合は[`InflectionError::IndexOutOfBounds`]を返します。
    #[inline(always)]
    pub fn read(&self, idx: usize) -> Result<u64> {
        read_with(u32::from(self.width), self.len(), idx, |w| self.data.get(w).copied())
    }

    /// 値の数を返します。
    #[inline(always)]
    pub fn len(&self) -> usize {
        usize::from_u32(self.len)
    }

    /// 値あたりのビット数を返します。
    #[inline(always)]
    pub fn width(&self) -> u32 {
        u32::from(self.width)
    }
}

impl ArchivedPackedArray {
    /// `idx`番目の値を読み出します（アーカイブ版）。
    #[inline(always)]
    pub fn read(&self, idx: usize) -> Result<u64> {
        read_with(u32::from(self.width), self.len(), idx, |w| {
            self.data.get(w).map(|v| v.to_native())
        })
    }

    /// 値の数を返します（アーカイブ版）。
    #[inline(always)]
    pub fn len(&self) -> usize {
        usize::from_u32(self.len.to_native())
    }

    /// 値あたりのビット数を返します（アーカイブ版）。
    #[inline(always)]
    pub fn width(&self) -> u32 {
        u32::from(self.width)
    }

    /// 幅とワード数が値の数と整合しているかどうかを返します。
    pub fn is_consistent(&self) -> bool {
        let width = self.width();
        (1..=64).contains(&width) && self.data.len() * 64 >= self.len() * width as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_read_across_words() {
        let mut a = PackedArray::new(13).unwrap();
        let values: Vec<u64> = (0..20).map(|i| (i * 421) % 8192).collect();
        for &v in &values {
            a.push(v).unwrap();
        }
        assert_eq!(a.len(), 20);
        // 20 * 13 bits
        assert_eq!(a.data.len(), 5);
        for (i, &v) in values.iter().enumerate() {
            assert_eq!(a.read(i).unwrap(), v);
        }
    }

    #[test]
    fn test_full_width() {
        let mut a = PackedArray::new(64).unwrap();
        a.push(u64::MAX).unwrap();
        a.push(7).unwrap();
        assert_eq!(a.read(0).unwrap(), u64::MAX);
        assert_eq!(a.read(1).unwrap(), 7);
    }

    #[test]
    fn test_read_out_of_range() {
        let mut a = PackedArray::new(3).unwrap();
        a.push(5).unwrap();
        assert!(matches!(
            a.read(1),
            Err(InflectionError::IndexOutOfBounds { index: 1, len: 1, .. })
        ));
    }

    #[test]
    fn test_value_too_wide() {
        let mut a = PackedArray::new(3).unwrap();
        assert!(a.push(8).is_err());
    }

    #[test]
    fn test_invalid_width() {
        assert!(PackedArray::new(0).is_err());
        assert!(PackedArray::new(65).is_err());
    }
}
