//! 命令デコード情報のインターフェース

use crate::machine::Machine;
use crate::space::Processor;

/// デコード済み命令の情報
///
/// 分岐遅延スロットを持つパイプラインを前提とした、ステップ実行の判断に
/// 必要な属性だけを公開します。実際のデコードは外部の命令デコーダが行います。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpcodeInfo {
    /// 分岐命令かどうか
    pub is_branch: bool,
    /// 条件分岐かどうか
    pub is_conditional: bool,
    /// 条件が成立しているか（現在のマシン状態で評価した結果）
    pub condition_met: bool,
    /// リンク付き分岐（関数呼び出し）かどうか
    pub is_linked_branch: bool,
    /// システムコールかどうか
    pub is_syscall: bool,
    /// 分岐先アドレス
    pub branch_target: u32,
}

/// 命令デコーダ
///
/// ステップ実行が現在のPCの命令を調べるために使います。
pub trait OpcodeDecoder {
    /// 指定アドレスの命令をデコードする
    fn opcode_info(&self, machine: &dyn Machine, proc: Processor, pc: u32) -> OpcodeInfo;
}
