//! ユーティリティ関数と型変換トレイトを提供するモジュール
//!
//! 主に以下の機能を提供します：
//!
//! - `FromU32`: u32からの型変換トレイト
//! - 辞書ヘッダーで宣言されたビット幅によるビットフィールドの抽出
//! - CSV行の解析と引用符処理
//! - テスト用のマクロ

use csv_core::ReadFieldResult;

use crate::errors::{InflectionError, Result};

/// u32から他の型への変換を提供するトレイト
pub trait FromU32 {
    /// u32値から実装型を生成する
    fn from_u32(src: u32) -> Self;
}

#[cfg(any(target_pointer_width = "32", target_pointer_width = "64"))]
impl FromU32 for usize {
    #[inline(always)]
    fn from_u32(src: u32) -> Self {
        // Since the pointer width is guaranteed to be 32 or 64,
        // the following process always succeeds.
        unsafe { Self::try_from(src).unwrap_unchecked() }
    }
}

/// `len`ビット幅の下位ビットマスクを返します。
#[inline(always)]
pub const fn low_mask(len: u32) -> u64 {
    if len >= 64 { u64::MAX } else { (1 << len) - 1 }
}

/// `value`のビット位置`start`から`len`ビットを取り出します。
///
/// # エラー
///
/// `start + len`が64を超える場合はエラーを返します。
///
/// # 例
///
/// ```
/// # use inflection_rkyv::utils::extract_bits;
/// assert_eq!(extract_bits(0b1101_0110, 2, 4).unwrap(), 0b0101);
/// assert!(extract_bits(1, 60, 8).is_err());
/// ```
#[inline(always)]
pub fn extract_bits(value: u64, start: u32, len: u32) -> Result<u64> {
    if start + len > 64 {
        return Err(InflectionError::invalid_state(
            "bit field exceeds a 64-bit word",
            format!("start={start}, len={len}"),
        ));
    }
    if len == 0 {
        return Ok(0);
    }
    Ok((value >> start) & low_mask(len))
}

/// `max_value`を表現するのに必要なビット数を返します(最小1)。
///
/// # 例
///
/// ```
/// # use inflection_rkyv::utils::bit_width;
/// assert_eq!(bit_width(0), 1);
/// assert_eq!(bit_width(1), 1);
/// assert_eq!(bit_width(255), 8);
/// assert_eq!(bit_width(256), 9);
/// ```
#[inline(always)]
pub const fn bit_width(max_value: u64) -> u32 {
    if max_value == 0 {
        1
    } else {
        64 - max_value.leading_zeros()
    }
}

/// CSV形式の行を解析してフィールドのベクターに分割する
///
/// ダブルクォートで囲まれたフィールドや、フィールド内のカンマも正しく処理します。
///
/// # エラー
///
/// フィールドが大きすぎる場合、またはUTF-8として不正な場合にエラーを返します。
///
/// # 例
///
/// ```
/// # use inflection_rkyv::utils::parse_csv_row;
/// let fields = parse_csv_row("goose,singular").unwrap();
/// assert_eq!(fields, vec!["goose", "singular"]);
///
/// let fields_with_quote = parse_csv_row("they,\"person=third,number\"").unwrap();
/// assert_eq!(fields_with_quote, vec!["they", "person=third,number"]);
/// ```
pub fn parse_csv_row(row: &str) -> Result<Vec<String>> {
    let mut fields = vec![];
    let mut rdr = csv_core::Reader::new();
    let mut bytes = row.as_bytes();
    let mut output = [0; 4096];
    loop {
        let (result, nin, nout) = rdr.read_field(bytes, &mut output);
        let end = match result {
            ReadFieldResult::InputEmpty => true,
            ReadFieldResult::Field { record_end } => record_end,
            ReadFieldResult::End => true,
            ReadFieldResult::OutputFull => {
                return Err(InflectionError::invalid_format("csv", "Field too large"));
            }
        };
        fields.push(std::str::from_utf8(&output[..nout])?.to_string());
        if end {
            break;
        }
        bytes = &bytes[nin..];
    }
    Ok(fields)
}

#[cfg(test)]
/// 制約マップのリテラルを簡潔に記述するためのマクロ
///
/// キーと値のペアを`=>`演算子で指定し、カンマで区切って記述します。
///
/// ```ignore
/// let map = constraints! {
///     "person" => "second",
///     "number" => "",
/// };
/// ```
macro_rules! constraints {
    ( $($k:expr => $v:expr,)* ) => {
        {
            #[allow(unused_mut)]
            let mut m = $crate::matcher::ConstraintMap::new();
            $(
                m.insert($k.to_string(), $v.to_string());
            )*
            m
        }
    };
    ( $($k:expr => $v:expr),* ) => {
        constraints![$( $k => $v, )*]
    };
}

#[cfg(test)]
pub(crate) use constraints;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bits() {
        assert_eq!(extract_bits(u64::MAX, 0, 64).unwrap(), u64::MAX);
        assert_eq!(extract_bits(0xabcd, 4, 8).unwrap(), 0xbc);
        assert_eq!(extract_bits(0xabcd, 16, 0).unwrap(), 0);
        assert_eq!(extract_bits(1 << 63, 63, 1).unwrap(), 1);
    }

    #[test]
    fn test_extract_bits_overflow() {
        assert!(extract_bits(0, 1, 64).is_err());
        assert!(extract_bits(0, 64, 1).is_err());
    }

    #[test]
    fn test_bit_width() {
        assert_eq!(bit_width(2), 2);
        assert_eq!(bit_width(3), 2);
        assert_eq!(bit_width(4), 3);
        assert_eq!(bit_width(u64::MAX), 64);
    }

    #[test]
    fn test_parse_csv_row() {
        assert_eq!(
            &["geese", "plural"],
            parse_csv_row("geese,plural").unwrap().as_slice()
        );
    }

    #[test]
    fn test_parse_csv_row_with_quote() {
        assert_eq!(
            &["goose", "singular plural", "a,b"],
            parse_csv_row("goose,singular plural,\"a,b\"").unwrap().as_slice()
        );
    }
}
