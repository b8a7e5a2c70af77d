//! テスト用のインメモリマシン
//!
//! 実際のエミュレーションコアの代わりに、フラットなメモリとレジスタファイル
//! だけを持つマシンを提供します。ワークスペース全体のテストから使用します。

use parking_lot::Mutex;

use crate::machine::{Machine, StackFrame};
use crate::space::{AddressSpace, Processor, RegisterClass, REGISTER_COUNT};

/// 1プロセッサ分の状態
struct ProcessorState {
    gpr: [u128; REGISTER_COUNT as usize],
    pc: u32,
    alive: bool,
    paused: bool,
    frames: Vec<StackFrame>,
    resume_count: u32,
}

impl ProcessorState {
    fn new() -> Self {
        Self {
            gpr: [0; REGISTER_COUNT as usize],
            pc: 0,
            alive: true,
            paused: true,
            frames: Vec::new(),
            resume_count: 0,
        }
    }
}

/// 1メモリ空間分のフラットな領域
struct MemoryRegion {
    base: u32,
    bytes: Vec<u8>,
}

impl MemoryRegion {
    fn new(base: u32, len: usize) -> Self {
        Self {
            base,
            bytes: vec![0; len],
        }
    }

    fn contains(&self, addr: u32, len: usize) -> bool {
        if addr < self.base {
            return false;
        }
        let offset = (addr - self.base) as usize;
        offset + len <= self.bytes.len()
    }

    fn read(&self, addr: u32, len: usize) -> u128 {
        if !self.contains(addr, len) {
            return 0;
        }
        let offset = (addr - self.base) as usize;
        let mut buf = [0u8; 16];
        buf[..len].copy_from_slice(&self.bytes[offset..offset + len]);
        u128::from_le_bytes(buf)
    }

    fn write(&mut self, addr: u32, len: usize, value: u128) {
        // 境界チェックしてから書く（部分書き込みはしない）
        if !self.contains(addr, len) {
            return;
        }
        let offset = (addr - self.base) as usize;
        self.bytes[offset..offset + len].copy_from_slice(&value.to_le_bytes()[..len]);
    }
}

struct TestMachineState {
    main: ProcessorState,
    sub: ProcessorState,
    main_memory: MemoryRegion,
    sub_memory: MemoryRegion,
    breakpoints: Vec<(Processor, u32)>,
    skip_first: Option<(Processor, u32)>,
}

/// テスト用マシン
///
/// メモリとレジスタの読み書き、ブレークポイントと再開要求の記録を行います。
/// `run_exclusive`はテストでは単一スレッドなのでその場で実行します。
pub struct TestMachine {
    state: Mutex<TestMachineState>,
}

impl TestMachine {
    /// 既定のメモリレイアウトでマシンを作成する
    ///
    /// メインメモリは`0x0000..0x10000`、サブメモリは`0x0000..0x1000`です。
    pub fn new() -> Self {
        Self::with_memory(0, 0x10000, 0, 0x1000)
    }

    /// メモリレイアウトを指定してマシンを作成する
    pub fn with_memory(main_base: u32, main_len: usize, sub_base: u32, sub_len: usize) -> Self {
        Self {
            state: Mutex::new(TestMachineState {
                main: ProcessorState::new(),
                sub: ProcessorState::new(),
                main_memory: MemoryRegion::new(main_base, main_len),
                sub_memory: MemoryRegion::new(sub_base, sub_len),
                breakpoints: Vec::new(),
                skip_first: None,
            }),
        }
    }

    /// プログラムカウンタを設定する
    pub fn set_pc(&self, proc: Processor, pc: u32) {
        let mut state = self.state.lock();
        Self::proc_mut(&mut state, proc).pc = pc;
    }

    /// プロセッサの生存状態を設定する
    pub fn set_alive(&self, proc: Processor, alive: bool) {
        let mut state = self.state.lock();
        Self::proc_mut(&mut state, proc).alive = alive;
    }

    /// プロセッサの停止状態を設定する
    pub fn set_paused(&self, proc: Processor, paused: bool) {
        let mut state = self.state.lock();
        Self::proc_mut(&mut state, proc).paused = paused;
    }

    /// コールスタックを設定する
    pub fn set_stack_frames(&self, proc: Processor, frames: Vec<StackFrame>) {
        let mut state = self.state.lock();
        Self::proc_mut(&mut state, proc).frames = frames;
    }

    /// 記録されたブレークポイントを取得する
    pub fn breakpoints(&self) -> Vec<(Processor, u32)> {
        self.state.lock().breakpoints.clone()
    }

    /// 記録されたスキップ指定を取得する
    pub fn skip_first(&self) -> Option<(Processor, u32)> {
        self.state.lock().skip_first
    }

    /// 再開要求の回数を取得する
    pub fn resume_count(&self, proc: Processor) -> u32 {
        let mut state = self.state.lock();
        Self::proc_mut(&mut state, proc).resume_count
    }

    fn proc_mut(state: &mut TestMachineState, proc: Processor) -> &mut ProcessorState {
        match proc {
            Processor::Main => &mut state.main,
            Processor::Sub => &mut state.sub,
        }
    }

    fn read(&self, space: AddressSpace, addr: u32, len: usize) -> u128 {
        let state = self.state.lock();
        match space {
            AddressSpace::MainMemory => state.main_memory.read(addr, len),
            AddressSpace::SubMemory => state.sub_memory.read(addr, len),
            // レジスタ空間へのアドレス読み取りは定義されない
            _ => 0,
        }
    }

    fn write(&self, space: AddressSpace, addr: u32, len: usize, value: u128) {
        let mut state = self.state.lock();
        match space {
            AddressSpace::MainMemory => state.main_memory.write(addr, len, value),
            AddressSpace::SubMemory => state.sub_memory.write(addr, len, value),
            _ => {}
        }
    }
}

impl Default for TestMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl Machine for TestMachine {
    fn read8(&self, space: AddressSpace, addr: u32) -> u8 {
        self.read(space, addr, 1) as u8
    }

    fn read16(&self, space: AddressSpace, addr: u32) -> u16 {
        self.read(space, addr, 2) as u16
    }

    fn read32(&self, space: AddressSpace, addr: u32) -> u32 {
        self.read(space, addr, 4) as u32
    }

    fn read64(&self, space: AddressSpace, addr: u32) -> u64 {
        self.read(space, addr, 8) as u64
    }

    fn read128(&self, space: AddressSpace, addr: u32) -> u128 {
        self.read(space, addr, 16)
    }

    fn write8(&self, space: AddressSpace, addr: u32, value: u8) {
        self.write(space, addr, 1, value as u128);
    }

    fn write16(&self, space: AddressSpace, addr: u32, value: u16) {
        self.write(space, addr, 2, value as u128);
    }

    fn write32(&self, space: AddressSpace, addr: u32, value: u32) {
        self.write(space, addr, 4, value as u128);
    }

    fn write64(&self, space: AddressSpace, addr: u32, value: u64) {
        self.write(space, addr, 8, value as u128);
    }

    fn write128(&self, space: AddressSpace, addr: u32, value: u128) {
        self.write(space, addr, 16, value);
    }

    fn is_valid_address(&self, space: AddressSpace, addr: u32) -> bool {
        let state = self.state.lock();
        match space {
            AddressSpace::MainMemory => state.main_memory.contains(addr, 1),
            AddressSpace::SubMemory => state.sub_memory.contains(addr, 1),
            _ => false,
        }
    }

    fn register(&self, proc: Processor, class: RegisterClass, index: u32) -> u128 {
        if index >= REGISTER_COUNT {
            return 0;
        }
        let mut state = self.state.lock();
        let RegisterClass::Gpr = class;
        Self::proc_mut(&mut state, proc).gpr[index as usize]
    }

    fn set_register(&self, proc: Processor, class: RegisterClass, index: u32, value: u128) {
        if index >= REGISTER_COUNT {
            return;
        }
        let mut state = self.state.lock();
        let RegisterClass::Gpr = class;
        Self::proc_mut(&mut state, proc).gpr[index as usize] = value;
    }

    fn pc(&self, proc: Processor) -> u32 {
        let mut state = self.state.lock();
        Self::proc_mut(&mut state, proc).pc
    }

    fn is_alive(&self, proc: Processor) -> bool {
        let mut state = self.state.lock();
        Self::proc_mut(&mut state, proc).alive
    }

    fn is_paused(&self, proc: Processor) -> bool {
        let mut state = self.state.lock();
        Self::proc_mut(&mut state, proc).paused
    }

    fn resume(&self, proc: Processor) {
        let mut state = self.state.lock();
        Self::proc_mut(&mut state, proc).resume_count += 1;
    }

    fn stack_frames(&self, proc: Processor) -> Vec<StackFrame> {
        let mut state = self.state.lock();
        Self::proc_mut(&mut state, proc).frames.clone()
    }

    fn add_oneshot_breakpoint(&self, proc: Processor, addr: u32) {
        self.state.lock().breakpoints.push((proc, addr));
    }

    fn set_skip_first(&self, proc: Processor, addr: u32) {
        self.state.lock().skip_first = Some((proc, addr));
    }

    fn run_exclusive(&self, _proc: Processor, f: &mut dyn FnMut()) {
        f();
    }
}
