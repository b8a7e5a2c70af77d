//! メモリパターン検索
//!
//! アドレス範囲または前回のヒット集合に対して、型付きの比較条件で値を
//! 走査します。浮動小数点の比較は固定の絶対イプシロン幅（±0.00001）を
//! 「等しい」とみなす窓として使います。意図的な許容誤差であり、ビット
//! 一致比較ではありません。大きな範囲の走査は長時間かかるため、
//! `SearchTask`でワーカースレッドに逃がせます。

use std::sync::Arc;
use std::thread;

use thiserror::Error;

use sumire_target::{AddressSpace, Machine};

/// 比較条件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchComparison {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
}

/// 検索対象の型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchKind {
    Unsigned8,
    Signed8,
    Unsigned16,
    Signed16,
    Unsigned32,
    Signed32,
    Unsigned64,
    Signed64,
    Float,
    Double,
    /// 16進テキストで与えるバイト列
    ByteSequence,
    /// UTF-8テキスト（バイト列として比較する）
    Text,
}

impl SearchKind {
    /// 固定幅スカラーのバイト数。可変長の種別はNone
    pub fn value_size(self) -> Option<u32> {
        match self {
            SearchKind::Unsigned8 | SearchKind::Signed8 => Some(1),
            SearchKind::Unsigned16 | SearchKind::Signed16 => Some(2),
            SearchKind::Unsigned32 | SearchKind::Signed32 | SearchKind::Float => Some(4),
            SearchKind::Unsigned64 | SearchKind::Signed64 | SearchKind::Double => Some(8),
            SearchKind::ByteSequence | SearchKind::Text => None,
        }
    }
}

/// 検索パラメータの拒否理由
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SearchError {
    #[error("Invalid search address range")]
    EmptyRange,
    #[error("Invalid search value")]
    InvalidValue,
    #[error("Value is larger than type")]
    ValueTooLarge,
    #[error("This comparison can only be used when filtering search results")]
    NotEqualsRequiresFilter,
    #[error("This comparison is not supported for variable-width searches")]
    InvalidBytesComparison,
    #[error("No existing search results to filter")]
    NoPriorResults,
    #[error("Search worker failed")]
    WorkerFailed,
}

/// パース済みの検索値
#[derive(Debug, Clone, PartialEq)]
pub enum SearchValue {
    Unsigned { value: u64, size: u32 },
    Signed { value: i64, size: u32 },
    Float(f32),
    Double(f64),
    Bytes(Vec<u8>),
}

/// 浮動小数点比較の許容幅
///
/// doubleの検索でもこのf32リテラル由来の値をそのまま使います。
const FLOAT_EPSILON: f32 = 0.00001;

/// 検索値テキストをパースする
///
/// 整数は10進または`0x`付き16進、型の幅を超える値は拒否します。バイト列は
/// 空白区切りの16進バイト、テキストはUTF-8バイト列になります。
pub fn parse_search_value(kind: SearchKind, text: &str) -> Result<SearchValue, SearchError> {
    let text = text.trim();
    match kind {
        SearchKind::Unsigned8 => parse_unsigned(text, u8::MAX as u64, 1),
        SearchKind::Signed8 => parse_signed(text, i8::MIN as i64, i8::MAX as i64, 1),
        SearchKind::Unsigned16 => parse_unsigned(text, u16::MAX as u64, 2),
        SearchKind::Signed16 => parse_signed(text, i16::MIN as i64, i16::MAX as i64, 2),
        SearchKind::Unsigned32 => parse_unsigned(text, u32::MAX as u64, 4),
        SearchKind::Signed32 => parse_signed(text, i32::MIN as i64, i32::MAX as i64, 4),
        SearchKind::Unsigned64 => parse_unsigned(text, u64::MAX, 8),
        SearchKind::Signed64 => parse_signed(text, i64::MIN, i64::MAX, 8),
        SearchKind::Float => text
            .parse::<f32>()
            .map(SearchValue::Float)
            .map_err(|_| SearchError::InvalidValue),
        SearchKind::Double => text
            .parse::<f64>()
            .map(SearchValue::Double)
            .map_err(|_| SearchError::InvalidValue),
        SearchKind::ByteSequence => {
            if text.is_empty() {
                return Err(SearchError::InvalidValue);
            }
            let mut bytes = Vec::new();
            for chunk in text.split_whitespace() {
                let byte =
                    u8::from_str_radix(chunk, 16).map_err(|_| SearchError::InvalidValue)?;
                bytes.push(byte);
            }
            Ok(SearchValue::Bytes(bytes))
        }
        SearchKind::Text => {
            if text.is_empty() {
                return Err(SearchError::InvalidValue);
            }
            Ok(SearchValue::Bytes(text.as_bytes().to_vec()))
        }
    }
}

fn parse_unsigned(text: &str, max: u64, size: u32) -> Result<SearchValue, SearchError> {
    let parsed = if let Some(digits) = text.strip_prefix("0x") {
        u64::from_str_radix(digits, 16)
    } else {
        text.parse()
    };
    let value = parsed.map_err(|_| SearchError::InvalidValue)?;
    if value > max {
        return Err(SearchError::ValueTooLarge);
    }
    Ok(SearchValue::Unsigned { value, size })
}

fn parse_signed(text: &str, min: i64, max: i64, size: u32) -> Result<SearchValue, SearchError> {
    let parsed = if let Some(digits) = text.strip_prefix("-0x") {
        i64::from_str_radix(digits, 16).map(|v| -v)
    } else if let Some(digits) = text.strip_prefix("0x") {
        i64::from_str_radix(digits, 16)
    } else {
        text.parse()
    };
    let value = parsed.map_err(|_| SearchError::InvalidValue)?;
    if value < min || value > max {
        return Err(SearchError::ValueTooLarge);
    }
    Ok(SearchValue::Signed { value, size })
}

/// 検索パラメータの組み合わせを検証する
///
/// 可変長の種別（バイト列・テキスト）は等値比較のみ、かつNotEqualsは
/// 絞り込み検索でしか使えません。
pub fn validate_search(
    kind: SearchKind,
    comparison: SearchComparison,
    is_filter: bool,
) -> Result<(), SearchError> {
    if kind.value_size().is_none() {
        match comparison {
            SearchComparison::Equals => {}
            SearchComparison::NotEquals => {
                if !is_filter {
                    return Err(SearchError::NotEqualsRequiresFilter);
                }
            }
            _ => return Err(SearchError::InvalidBytesComparison),
        }
    }
    Ok(())
}

/// アドレス範囲 [start, end) を走査する
///
/// スカラーは型サイズ刻みで進み、無効なアドレスは読み飛ばします。バイト列は
/// 1バイト刻みで進み、一致した位置からは一致長ぶん飛ばして重複ヒットを
/// 避けます（アドレスの有効性チェックは行いません）。
pub fn search_range(
    machine: &dyn Machine,
    space: AddressSpace,
    start: u32,
    end: u32,
    value: &SearchValue,
    comparison: SearchComparison,
) -> Vec<u32> {
    let mut hits = Vec::new();
    match value {
        SearchValue::Bytes(needle) => {
            let mut addr = start;
            while addr < end {
                let advance = if compare_bytes(machine, space, addr, needle, comparison) {
                    hits.push(addr);
                    needle.len() as u32
                } else {
                    1
                };
                // アドレス空間の上端に達したら終わり（ラップして再走査しない）
                let Some(next) = addr.checked_add(advance) else {
                    break;
                };
                addr = next;
            }
        }
        _ => {
            let step = scalar_size(value);
            let mut addr = start;
            while addr < end {
                if machine.is_valid_address(space, addr)
                    && compare_at(machine, space, addr, value, comparison)
                {
                    hits.push(addr);
                }
                let Some(next) = addr.checked_add(step) else {
                    break;
                };
                addr = next;
            }
        }
    }
    hits
}

/// 前回のヒット集合を絞り込む
///
/// 各ヒットを元のアドレスで再判定するだけで、走査カーソルの前進は
/// ありません。結果は入力の部分集合で、順序は保たれます。
pub fn filter_search(
    machine: &dyn Machine,
    space: AddressSpace,
    prior: &[u32],
    value: &SearchValue,
    comparison: SearchComparison,
) -> Vec<u32> {
    let mut hits = Vec::new();
    for &addr in prior {
        let matched = match value {
            SearchValue::Bytes(needle) => {
                compare_bytes(machine, space, addr, needle, comparison)
            }
            _ => {
                machine.is_valid_address(space, addr)
                    && compare_at(machine, space, addr, value, comparison)
            }
        };
        if matched {
            hits.push(addr);
        }
    }
    hits
}

fn scalar_size(value: &SearchValue) -> u32 {
    match value {
        SearchValue::Unsigned { size, .. } | SearchValue::Signed { size, .. } => *size,
        SearchValue::Float(_) => 4,
        SearchValue::Double(_) => 8,
        SearchValue::Bytes(bytes) => bytes.len() as u32,
    }
}

fn compare_at(
    machine: &dyn Machine,
    space: AddressSpace,
    addr: u32,
    value: &SearchValue,
    comparison: SearchComparison,
) -> bool {
    match value {
        SearchValue::Unsigned { value, size } => {
            let memory = match size {
                1 => machine.read8(space, addr) as u64,
                2 => machine.read16(space, addr) as u64,
                4 => machine.read32(space, addr) as u64,
                _ => machine.read64(space, addr),
            };
            compare_ordered(memory, *value, comparison)
        }
        SearchValue::Signed { value, size } => {
            let memory = match size {
                1 => machine.read8(space, addr) as i8 as i64,
                2 => machine.read16(space, addr) as i16 as i64,
                4 => machine.read32(space, addr) as i32 as i64,
                _ => machine.read64(space, addr) as i64,
            };
            compare_ordered(memory, *value, comparison)
        }
        SearchValue::Float(needle) => {
            let memory = f32::from_bits(machine.read32(space, addr));
            compare_float(memory as f64, *needle as f64, comparison)
        }
        SearchValue::Double(needle) => {
            let memory = f64::from_bits(machine.read64(space, addr));
            compare_float(memory, *needle, comparison)
        }
        SearchValue::Bytes(_) => false,
    }
}

fn compare_ordered<T: PartialOrd + PartialEq>(
    memory: T,
    needle: T,
    comparison: SearchComparison,
) -> bool {
    match comparison {
        SearchComparison::Equals => memory == needle,
        SearchComparison::NotEquals => memory != needle,
        SearchComparison::GreaterThan => memory > needle,
        SearchComparison::GreaterOrEqual => memory >= needle,
        SearchComparison::LessThan => memory < needle,
        SearchComparison::LessOrEqual => memory <= needle,
    }
}

/// イプシロン窓付きの浮動小数点比較
///
/// 窓の内側は「等しい」、順序比較は窓の外側でのみ成立します。以上・以下は
/// 窓内等値が成立した時点で真です。
fn compare_float(memory: f64, needle: f64, comparison: SearchComparison) -> bool {
    let epsilon = FLOAT_EPSILON as f64;
    let equal = (memory - needle).abs() < epsilon;
    match comparison {
        SearchComparison::Equals => equal,
        SearchComparison::NotEquals => !equal,
        SearchComparison::GreaterThan => !equal && memory > needle,
        SearchComparison::GreaterOrEqual => equal || memory > needle,
        SearchComparison::LessThan => !equal && memory < needle,
        SearchComparison::LessOrEqual => equal || memory < needle,
    }
}

/// バイト列比較
///
/// NotEqualsは「比較したバイトのどれかが異なる」で真になります。全バイト
/// 反転の意味でのEqualsの対称形ではない点に注意してください。アドレスの
/// 有効性チェックは行いません（無効領域は0として読まれます）。
fn compare_bytes(
    machine: &dyn Machine,
    space: AddressSpace,
    addr: u32,
    needle: &[u8],
    comparison: SearchComparison,
) -> bool {
    match comparison {
        SearchComparison::Equals => needle
            .iter()
            .enumerate()
            .all(|(i, &b)| machine.read8(space, addr.wrapping_add(i as u32)) == b),
        SearchComparison::NotEquals => needle
            .iter()
            .enumerate()
            .any(|(i, &b)| machine.read8(space, addr.wrapping_add(i as u32)) != b),
        _ => false,
    }
}

/// ワーカースレッドに逃がした検索
///
/// 結果が要らなくなったらタスクを破棄すればよく、結果は単に消費されない
/// だけです。途中キャンセルや部分結果の取り出しはありません。
pub struct SearchTask {
    handle: thread::JoinHandle<Vec<u32>>,
}

impl SearchTask {
    /// 範囲検索をワーカースレッドで開始する
    pub fn spawn_range(
        machine: Arc<dyn Machine>,
        space: AddressSpace,
        start: u32,
        end: u32,
        value: SearchValue,
        comparison: SearchComparison,
    ) -> Self {
        tracing::debug!(start, end, "spawning range search");
        let handle = thread::spawn(move || {
            search_range(machine.as_ref(), space, start, end, &value, comparison)
        });
        Self { handle }
    }

    /// 絞り込み検索をワーカースレッドで開始する
    pub fn spawn_filter(
        machine: Arc<dyn Machine>,
        space: AddressSpace,
        prior: Vec<u32>,
        value: SearchValue,
        comparison: SearchComparison,
    ) -> Self {
        tracing::debug!(prior = prior.len(), "spawning filter search");
        let handle = thread::spawn(move || {
            filter_search(machine.as_ref(), space, &prior, &value, comparison)
        });
        Self { handle }
    }

    /// 完了を待って結果を受け取る
    pub fn wait(self) -> Result<Vec<u32>, SearchError> {
        self.handle.join().map_err(|_| SearchError::WorkerFailed)
    }
}
