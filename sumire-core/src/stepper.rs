//! 命令単位のステップ実行
//!
//! 遅延スロット付きパイプラインでは「次の命令」が単純にpc+4とは限りません。
//! 現在のPCにある命令のデコード結果から次に到達するアドレスを決定し、
//! そこにワンショットブレークポイントを置いてから再開します。ブレーク
//! ポイントの設置と再開は、ターゲット実行スレッドの状態遷移と交錯しない
//! よう排他区間の中でまとめて行います。

use sumire_target::{Machine, OpcodeDecoder, Processor};

/// ステップ実行の実施者
pub struct Stepper<'a> {
    machine: &'a dyn Machine,
    decoder: &'a dyn OpcodeDecoder,
    proc: Processor,
}

impl<'a> Stepper<'a> {
    /// 指定プロセッサに対するステッパを作成する
    pub fn new(machine: &'a dyn Machine, decoder: &'a dyn OpcodeDecoder, proc: Processor) -> Self {
        Self {
            machine,
            decoder,
            proc,
        }
    }

    /// ステップ実行が可能な状態か
    fn can_step(&self) -> bool {
        self.machine.is_alive(self.proc) && self.machine.is_paused(self.proc)
    }

    /// ブレークポイントを置いて再開する共通手順
    ///
    /// 現在のPCと重なったブレークポイントが再開直後に再トリガしないよう、
    /// 先にスキップ指定を入れます。
    fn arm_and_resume(&self, pc: u32, target: u32) {
        self.machine.set_skip_first(self.proc, pc);
        self.machine.add_oneshot_breakpoint(self.proc, target);
        self.machine.resume(self.proc);
    }

    /// 1命令ステップインする
    ///
    /// 分岐命令では実際に制御が移る側に止まります。条件不成立の条件分岐は
    /// 遅延スロットを飛び越えてpc+8、syscallは常に遷移先です。
    pub fn step_into(&self) {
        if !self.can_step() {
            return;
        }
        self.machine.run_exclusive(self.proc, &mut || {
            let pc = self.machine.pc(self.proc);
            let info = self.decoder.opcode_info(self.machine, self.proc, pc);

            let mut target = pc.wrapping_add(4);
            if info.is_branch {
                if !info.is_conditional || info.condition_met {
                    target = info.branch_target;
                } else {
                    target = pc.wrapping_add(8);
                }
            }
            if info.is_syscall {
                target = info.branch_target;
            }

            self.arm_and_resume(pc, target);
        });
    }

    /// 1命令ステップオーバーする
    ///
    /// リンク付きの無条件分岐（呼び出し）は呼び出し先に降りず、遅延スロット
    /// ごと飛び越えてpc+8に止まります。それ以外の分岐はステップインと同じ
    /// 判定です。
    pub fn step_over(&self) {
        if !self.can_step() {
            return;
        }
        self.machine.run_exclusive(self.proc, &mut || {
            let pc = self.machine.pc(self.proc);
            let info = self.decoder.opcode_info(self.machine, self.proc, pc);

            let mut target = pc.wrapping_add(4);
            if info.is_branch {
                if !info.is_conditional {
                    if info.is_linked_branch {
                        target = pc.wrapping_add(8);
                    } else {
                        target = info.branch_target;
                    }
                } else if info.condition_met {
                    target = info.branch_target;
                } else {
                    target = pc.wrapping_add(8);
                }
            }

            self.arm_and_resume(pc, target);
        });
    }

    /// 現在の関数から抜けるまで実行する
    ///
    /// 呼び出し元フレームが存在しない（スタック深さ2未満）場合は何もしません。
    pub fn step_out(&self) {
        if !self.can_step() {
            return;
        }
        let frames = self.machine.stack_frames(self.proc);
        let Some(caller) = frames.get(1) else {
            return;
        };
        let target = caller.pc;

        self.machine.run_exclusive(self.proc, &mut || {
            let pc = self.machine.pc(self.proc);
            self.arm_and_resume(pc, target);
        });
    }
}
