//! マシンアクセスインターフェース

use crate::space::{AddressSpace, Processor, RegisterClass};

/// コールスタックの1フレーム
///
/// フレーム0が現在の関数、フレーム1が呼び出し元です。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackFrame {
    /// このフレームのプログラムカウンタ
    pub pc: u32,
    /// このフレームのスタックポインタ
    pub sp: u32,
}

/// エミュレートされたマシンへのデバッグアクセス
///
/// CPUコア本体はこのクレートの外にあり、この狭いインターフェース経由でのみ
/// 参照します。メモリ読み取りは無効なアドレスに対してエラーを発生させず、
/// 定義された値として0を返します。書き込みは境界チェックの後、無効であれば
/// 何もせずに破棄されます（隣接する有効なメモリを壊してはいけません）。
///
/// `read*`/`write*`/`is_valid_address`はメモリ空間に対してのみ意味を持ちます。
/// レジスタ空間を渡した場合は0読み取り／書き込み破棄として扱います。
pub trait Machine: Send + Sync {
    /// 8ビット読み取る
    fn read8(&self, space: AddressSpace, addr: u32) -> u8;

    /// 16ビット読み取る
    fn read16(&self, space: AddressSpace, addr: u32) -> u16;

    /// 32ビット読み取る
    fn read32(&self, space: AddressSpace, addr: u32) -> u32;

    /// 64ビット読み取る
    fn read64(&self, space: AddressSpace, addr: u32) -> u64;

    /// 128ビット読み取る
    fn read128(&self, space: AddressSpace, addr: u32) -> u128;

    /// 8ビット書き込む
    fn write8(&self, space: AddressSpace, addr: u32, value: u8);

    /// 16ビット書き込む
    fn write16(&self, space: AddressSpace, addr: u32, value: u16);

    /// 32ビット書き込む
    fn write32(&self, space: AddressSpace, addr: u32, value: u32);

    /// 64ビット書き込む
    fn write64(&self, space: AddressSpace, addr: u32, value: u64);

    /// 128ビット書き込む
    fn write128(&self, space: AddressSpace, addr: u32, value: u128);

    /// アドレスが有効なメモリ範囲内にあるか
    fn is_valid_address(&self, space: AddressSpace, addr: u32) -> bool;

    /// レジスタ値を取得する（ネイティブ幅は128ビット）
    ///
    /// インデックスが範囲外（32以上）の場合は0を返します。
    fn register(&self, proc: Processor, class: RegisterClass, index: u32) -> u128;

    /// レジスタ値を設定する
    ///
    /// インデックスが範囲外の場合は何もしません。
    fn set_register(&self, proc: Processor, class: RegisterClass, index: u32, value: u128);

    /// プログラムカウンタを取得する
    fn pc(&self, proc: Processor) -> u32;

    /// プロセッサが生きているか（ターゲットが実行中のマシンか）
    fn is_alive(&self, proc: Processor) -> bool;

    /// プロセッサが一時停止中か
    fn is_paused(&self, proc: Processor) -> bool;

    /// 一時停止中のプロセッサを再開する
    fn resume(&self, proc: Processor);

    /// 現在のコールスタックを列挙する
    fn stack_frames(&self, proc: Processor) -> Vec<StackFrame>;

    /// 一度ヒットしたら消えるブレークポイントを追加する
    fn add_oneshot_breakpoint(&self, proc: Processor, addr: u32);

    /// 指定アドレスのブレークポイントの初回ヒットをスキップさせる
    ///
    /// 現在のPCにブレークポイントが重なっている場合に、再開直後の再トリガを
    /// 防ぐために使います。
    fn set_skip_first(&self, proc: Processor, addr: u32);

    /// ターゲットが停止している間、排他的にクロージャを実行する
    ///
    /// ブレークポイント設置と再開のように、ターゲット実行スレッドの状態遷移と
    /// 交錯してはならない一連の操作をまとめて実行します。
    fn run_exclusive(&self, proc: Processor, f: &mut dyn FnMut());
}
