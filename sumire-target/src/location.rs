//! 検査位置の抽象化
//!
//! レジスタとメモリのどちらに存在する値も同じ`Location`として扱い、
//! サイズ別の読み書きをマシンアクセスへディスパッチします。

use crate::machine::Machine;
use crate::space::{self, AddressSpace, RegisterClass, REGISTER_COUNT};

/// 検査対象の具体的な位置
///
/// `None`は位置情報を持たないことを表します。`None`の位置からは子ノードも
/// 表示可能な値も生成されません。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// 位置情報なし
    None,
    /// レジスタ（クラスと番号で指定）
    Register {
        space: AddressSpace,
        class: RegisterClass,
        index: u32,
    },
    /// メモリアドレス
    Memory { space: AddressSpace, address: u32 },
}

impl Location {
    /// レジスタ位置を作成する
    pub fn register(space: AddressSpace, class: RegisterClass, index: u32) -> Self {
        debug_assert!(space.is_register());
        Location::Register { space, class, index }
    }

    /// メモリ位置を作成する
    pub fn memory(space: AddressSpace, address: u32) -> Self {
        debug_assert!(!space.is_register());
        Location::Memory { space, address }
    }

    /// 位置情報を持つかどうか
    pub fn is_some(&self) -> bool {
        !matches!(self, Location::None)
    }

    /// 表示用の位置名を取得する
    ///
    /// レジスタはレジスタ名、メインメモリは8桁の16進アドレス、サブメモリは
    /// `SUB:`プレフィックス付きで表現します。
    pub fn name(&self) -> String {
        match *self {
            Location::Register { class, index, .. } => {
                space::register_name(class, index).to_string()
            }
            Location::Memory { space: AddressSpace::SubMemory, address } => {
                format!("SUB:{:08x}", address)
            }
            Location::Memory { address, .. } => format!("{:08x}", address),
            Location::None => String::new(),
        }
    }

    /// オフセットを加算した位置を返す
    ///
    /// メモリ位置に対してのみ定義され、それ以外は`None`を返します。
    pub fn add_offset(&self, offset: u32) -> Location {
        match *self {
            Location::Memory { space, address } => Location::Memory {
                space,
                address: address.wrapping_add(offset),
            },
            _ => Location::None,
        }
    }

    /// 指定アドレスのメモリ位置へ移動する
    ///
    /// レジスタ位置はレジスタ値をポインタとして解釈した先、すなわち同じ
    /// プロセッサ側のメモリ空間に移ります。
    pub fn create_address(&self, address: u32) -> Location {
        match *self {
            Location::Register { space, .. } => Location::Memory {
                space: space.memory_counterpart(),
                address,
            },
            Location::Memory { space, .. } => Location::Memory { space, address },
            Location::None => Location::None,
        }
    }

    /// この位置のポインタ値がデリファレンスされるメモリ空間
    pub fn pointer_space(&self) -> Option<AddressSpace> {
        match *self {
            Location::Register { space, .. } | Location::Memory { space, .. } => {
                Some(space.memory_counterpart())
            }
            Location::None => None,
        }
    }

    /// この位置が有効なアドレスを指しているか
    pub fn is_valid(&self, machine: &dyn Machine) -> bool {
        match *self {
            Location::Register { index, .. } => index < REGISTER_COUNT,
            Location::Memory { space, address } => machine.is_valid_address(space, address),
            Location::None => false,
        }
    }

    /// 8ビット読み取る
    pub fn read8(&self, machine: &dyn Machine) -> u8 {
        match *self {
            Location::Register { space, class, index } => {
                if index < REGISTER_COUNT {
                    machine.register(space.processor(), class, index) as u8
                } else {
                    0
                }
            }
            Location::Memory { space, address } => machine.read8(space, address),
            Location::None => 0,
        }
    }

    /// 16ビット読み取る
    pub fn read16(&self, machine: &dyn Machine) -> u16 {
        match *self {
            Location::Register { space, class, index } => {
                if index < REGISTER_COUNT {
                    machine.register(space.processor(), class, index) as u16
                } else {
                    0
                }
            }
            Location::Memory { space, address } => machine.read16(space, address),
            Location::None => 0,
        }
    }

    /// 32ビット読み取る
    pub fn read32(&self, machine: &dyn Machine) -> u32 {
        match *self {
            Location::Register { space, class, index } => {
                if index < REGISTER_COUNT {
                    machine.register(space.processor(), class, index) as u32
                } else {
                    0
                }
            }
            Location::Memory { space, address } => machine.read32(space, address),
            Location::None => 0,
        }
    }

    /// 64ビット読み取る
    pub fn read64(&self, machine: &dyn Machine) -> u64 {
        match *self {
            Location::Register { space, class, index } => {
                if index < REGISTER_COUNT {
                    machine.register(space.processor(), class, index) as u64
                } else {
                    0
                }
            }
            Location::Memory { space, address } => machine.read64(space, address),
            Location::None => 0,
        }
    }

    /// 128ビット読み取る
    pub fn read128(&self, machine: &dyn Machine) -> u128 {
        match *self {
            Location::Register { space, class, index } => {
                if index < REGISTER_COUNT {
                    machine.register(space.processor(), class, index)
                } else {
                    0
                }
            }
            Location::Memory { space, address } => machine.read128(space, address),
            Location::None => 0,
        }
    }

    /// 8ビット書き込む
    ///
    /// レジスタ位置への書き込みは、値をゼロ拡張してレジスタ全体を置き換えます。
    pub fn write8(&self, machine: &dyn Machine, value: u8) {
        match *self {
            Location::Register { space, class, index } => {
                if index < REGISTER_COUNT {
                    machine.set_register(space.processor(), class, index, value as u128);
                }
            }
            Location::Memory { space, address } => machine.write8(space, address, value),
            Location::None => {}
        }
    }

    /// 16ビット書き込む
    pub fn write16(&self, machine: &dyn Machine, value: u16) {
        match *self {
            Location::Register { space, class, index } => {
                if index < REGISTER_COUNT {
                    machine.set_register(space.processor(), class, index, value as u128);
                }
            }
            Location::Memory { space, address } => machine.write16(space, address, value),
            Location::None => {}
        }
    }

    /// 32ビット書き込む
    pub fn write32(&self, machine: &dyn Machine, value: u32) {
        match *self {
            Location::Register { space, class, index } => {
                if index < REGISTER_COUNT {
                    machine.set_register(space.processor(), class, index, value as u128);
                }
            }
            Location::Memory { space, address } => machine.write32(space, address, value),
            Location::None => {}
        }
    }

    /// 64ビット書き込む
    pub fn write64(&self, machine: &dyn Machine, value: u64) {
        match *self {
            Location::Register { space, class, index } => {
                if index < REGISTER_COUNT {
                    machine.set_register(space.processor(), class, index, value as u128);
                }
            }
            Location::Memory { space, address } => machine.write64(space, address, value),
            Location::None => {}
        }
    }

    /// 128ビット書き込む
    pub fn write128(&self, machine: &dyn Machine, value: u128) {
        match *self {
            Location::Register { space, class, index } => {
                if index < REGISTER_COUNT {
                    machine.set_register(space.processor(), class, index, value);
                }
            }
            Location::Memory { space, address } => machine.write128(space, address, value),
            Location::None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestMachine;

    #[test]
    fn test_add_offset() {
        let mem = Location::memory(AddressSpace::MainMemory, 0x1000);
        assert_eq!(
            mem.add_offset(0x10),
            Location::Memory {
                space: AddressSpace::MainMemory,
                address: 0x1010
            }
        );

        // レジスタ位置にオフセットは定義されない
        let reg = Location::register(AddressSpace::MainRegister, RegisterClass::Gpr, 4);
        assert_eq!(reg.add_offset(4), Location::None);
        assert_eq!(Location::None.add_offset(4), Location::None);
    }

    #[test]
    fn test_create_address() {
        let reg = Location::register(AddressSpace::SubRegister, RegisterClass::Gpr, 4);
        assert_eq!(
            reg.create_address(0x2000),
            Location::Memory {
                space: AddressSpace::SubMemory,
                address: 0x2000
            }
        );

        let mem = Location::memory(AddressSpace::MainMemory, 0x1000);
        assert_eq!(
            mem.create_address(0x3000),
            Location::Memory {
                space: AddressSpace::MainMemory,
                address: 0x3000
            }
        );

        assert_eq!(Location::None.create_address(0x3000), Location::None);
    }

    #[test]
    fn test_register_index_bounds() {
        let machine = TestMachine::new();

        // 範囲外のレジスタは0読み取り・書き込み無視
        let out_of_range = Location::register(AddressSpace::MainRegister, RegisterClass::Gpr, 32);
        out_of_range.write32(&machine, 0xdeadbeef);
        assert_eq!(out_of_range.read32(&machine), 0);

        let reg = Location::register(AddressSpace::MainRegister, RegisterClass::Gpr, 4);
        reg.write32(&machine, 0xdeadbeef);
        assert_eq!(reg.read32(&machine), 0xdeadbeef);
    }

    #[test]
    fn test_register_write_zero_extends() {
        let machine = TestMachine::new();
        let reg = Location::register(AddressSpace::MainRegister, RegisterClass::Gpr, 8);

        reg.write128(&machine, u128::MAX);
        reg.write8(&machine, 0x7f);
        // 上位バイトはクリアされる
        assert_eq!(reg.read128(&machine), 0x7f);
    }

    #[test]
    fn test_location_name() {
        let reg = Location::register(AddressSpace::MainRegister, RegisterClass::Gpr, 29);
        assert_eq!(reg.name(), "sp");

        let mem = Location::memory(AddressSpace::MainMemory, 0x1234);
        assert_eq!(mem.name(), "00001234");

        let sub = Location::memory(AddressSpace::SubMemory, 0x1234);
        assert_eq!(sub.name(), "SUB:00001234");
    }
}
