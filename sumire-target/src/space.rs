//! アドレス空間の定義

/// 検査対象のアドレス空間
///
/// レジスタ空間はアドレスではなくレジスタクラスと番号でインデックスします。
/// 異なる空間同士がエイリアスすることはありません。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressSpace {
    /// メインプロセッサの汎用レジスタ
    MainRegister,
    /// サブプロセッサの汎用レジスタ
    SubRegister,
    /// メインメモリ
    MainMemory,
    /// サブプロセッサ側のメモリ
    SubMemory,
}

impl AddressSpace {
    /// レジスタ空間かどうか
    pub fn is_register(self) -> bool {
        matches!(self, AddressSpace::MainRegister | AddressSpace::SubRegister)
    }

    /// この空間で保持されたポインタ値がデリファレンスされるメモリ空間
    ///
    /// レジスタ空間は同じプロセッサ側のメモリ空間に対応します。
    pub fn memory_counterpart(self) -> AddressSpace {
        match self {
            AddressSpace::MainRegister | AddressSpace::MainMemory => AddressSpace::MainMemory,
            AddressSpace::SubRegister | AddressSpace::SubMemory => AddressSpace::SubMemory,
        }
    }

    /// この空間を所有するプロセッサ
    pub fn processor(self) -> Processor {
        match self {
            AddressSpace::MainRegister | AddressSpace::MainMemory => Processor::Main,
            AddressSpace::SubRegister | AddressSpace::SubMemory => Processor::Sub,
        }
    }
}

/// プロセッサコンテキストの識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Processor {
    /// メインプロセッサ（デフォルトのコンテキスト）
    Main,
    /// サブプロセッサ
    Sub,
}

impl Processor {
    /// このプロセッサのレジスタ空間
    pub fn register_space(self) -> AddressSpace {
        match self {
            Processor::Main => AddressSpace::MainRegister,
            Processor::Sub => AddressSpace::SubRegister,
        }
    }

    /// このプロセッサのメモリ空間
    pub fn memory_space(self) -> AddressSpace {
        match self {
            Processor::Main => AddressSpace::MainMemory,
            Processor::Sub => AddressSpace::SubMemory,
        }
    }
}

/// レジスタクラス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterClass {
    /// 汎用レジスタ
    Gpr,
}

/// 1クラスあたりのレジスタ本数
///
/// この範囲外のインデックスへの読み取りは0を返し、書き込みは無視されます。
pub const REGISTER_COUNT: u32 = 32;

/// MIPS流の汎用レジスタ名
const GPR_NAMES: [&str; 32] = [
    "zero", "at", "v0", "v1", "a0", "a1", "a2", "a3",
    "t0", "t1", "t2", "t3", "t4", "t5", "t6", "t7",
    "s0", "s1", "s2", "s3", "s4", "s5", "s6", "s7",
    "t8", "t9", "k0", "k1", "gp", "sp", "fp", "ra",
];

/// レジスタ名を取得する
pub fn register_name(class: RegisterClass, index: u32) -> &'static str {
    match class {
        RegisterClass::Gpr => GPR_NAMES.get(index as usize).copied().unwrap_or(""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_counterpart() {
        assert_eq!(
            AddressSpace::MainRegister.memory_counterpart(),
            AddressSpace::MainMemory
        );
        assert_eq!(
            AddressSpace::SubRegister.memory_counterpart(),
            AddressSpace::SubMemory
        );
        assert_eq!(
            AddressSpace::MainMemory.memory_counterpart(),
            AddressSpace::MainMemory
        );
    }

    #[test]
    fn test_register_name() {
        assert_eq!(register_name(RegisterClass::Gpr, 0), "zero");
        assert_eq!(register_name(RegisterClass::Gpr, 29), "sp");
        assert_eq!(register_name(RegisterClass::Gpr, 31), "ra");
        // 範囲外は空文字列
        assert_eq!(register_name(RegisterClass::Gpr, 32), "");
    }
}
