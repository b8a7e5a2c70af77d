//! デバッガファサード
//!
//! マシン、命令デコーダ、シンボルガーディアンを束ね、ステップ実行と
//! メモリ検索の入口を提供します。検索のヒット集合はここが所有し、
//! 絞り込み検索は直前の完了済み結果に対してのみ実行できます。

use std::sync::Arc;

use crate::search::{
    self, SearchComparison, SearchError, SearchKind, SearchTask,
};
use crate::stepper::Stepper;
use crate::Result;
use sumire_symbols::SymbolGuardian;
use sumire_target::{AddressSpace, Machine, OpcodeDecoder, Processor};

/// デバッガ本体
pub struct Debugger {
    machine: Arc<dyn Machine>,
    decoder: Arc<dyn OpcodeDecoder + Send + Sync>,
    guardian: Arc<SymbolGuardian>,
    search_results: Vec<u32>,
}

impl Debugger {
    /// デバッガを作成する
    pub fn new(
        machine: Arc<dyn Machine>,
        decoder: Arc<dyn OpcodeDecoder + Send + Sync>,
        guardian: Arc<SymbolGuardian>,
    ) -> Self {
        Self {
            machine,
            decoder,
            guardian,
            search_results: Vec::new(),
        }
    }

    /// マシンアクセス
    pub fn machine(&self) -> &Arc<dyn Machine> {
        &self.machine
    }

    /// シンボルガーディアン
    pub fn guardian(&self) -> &Arc<SymbolGuardian> {
        &self.guardian
    }

    /// 1命令ステップインする
    pub fn step_into(&self, proc: Processor) {
        Stepper::new(self.machine.as_ref(), self.decoder.as_ref(), proc).step_into();
    }

    /// 1命令ステップオーバーする
    pub fn step_over(&self, proc: Processor) {
        Stepper::new(self.machine.as_ref(), self.decoder.as_ref(), proc).step_over();
    }

    /// 現在の関数から抜けるまで実行する
    pub fn step_out(&self, proc: Processor) {
        Stepper::new(self.machine.as_ref(), self.decoder.as_ref(), proc).step_out();
    }

    /// 新規検索を実行し、ヒット数を返す
    ///
    /// 範囲と値を検証してからワーカースレッドで走査し、完了を待って結果を
    /// 差し替えます。
    pub fn new_search(
        &mut self,
        kind: SearchKind,
        comparison: SearchComparison,
        space: AddressSpace,
        start: u32,
        end: u32,
        text: &str,
    ) -> Result<usize> {
        if start >= end {
            return Err(SearchError::EmptyRange.into());
        }
        search::validate_search(kind, comparison, false)?;
        let value = search::parse_search_value(kind, text)?;

        let task =
            SearchTask::spawn_range(self.machine.clone(), space, start, end, value, comparison);
        self.search_results = task.wait()?;
        Ok(self.search_results.len())
    }

    /// 直前の結果を絞り込み、ヒット数を返す
    pub fn filter_search(
        &mut self,
        kind: SearchKind,
        comparison: SearchComparison,
        space: AddressSpace,
        text: &str,
    ) -> Result<usize> {
        if self.search_results.is_empty() {
            return Err(SearchError::NoPriorResults.into());
        }
        search::validate_search(kind, comparison, true)?;
        let value = search::parse_search_value(kind, text)?;

        let task = SearchTask::spawn_filter(
            self.machine.clone(),
            space,
            std::mem::take(&mut self.search_results),
            value,
            comparison,
        );
        self.search_results = task.wait()?;
        Ok(self.search_results.len())
    }

    /// 現在のヒット集合
    pub fn search_results(&self) -> &[u32] {
        &self.search_results
    }

    /// ヒット集合を破棄する
    pub fn clear_search_results(&mut self) {
        self.search_results.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sumire_target::testing::TestMachine;
    use sumire_target::OpcodeInfo;

    struct NopDecoder;

    impl OpcodeDecoder for NopDecoder {
        fn opcode_info(&self, _machine: &dyn Machine, _proc: Processor, _pc: u32) -> OpcodeInfo {
            OpcodeInfo::default()
        }
    }

    fn debugger_with_machine() -> (Debugger, Arc<TestMachine>) {
        let machine = Arc::new(TestMachine::new());
        let debugger = Debugger::new(
            machine.clone(),
            Arc::new(NopDecoder),
            Arc::new(SymbolGuardian::new()),
        );
        (debugger, machine)
    }

    #[test]
    fn test_search_then_filter() {
        let (mut debugger, machine) = debugger_with_machine();
        machine.write32(AddressSpace::MainMemory, 0x100, 5);
        machine.write32(AddressSpace::MainMemory, 0x104, 5);
        machine.write32(AddressSpace::MainMemory, 0x108, 5);

        let count = debugger
            .new_search(
                SearchKind::Unsigned32,
                SearchComparison::Equals,
                AddressSpace::MainMemory,
                0x100,
                0x10c,
                "5",
            )
            .unwrap();
        assert_eq!(count, 3);

        // 値を変えたアドレスだけがNotEqualsに残る
        machine.write32(AddressSpace::MainMemory, 0x104, 6);
        let count = debugger
            .filter_search(
                SearchKind::Unsigned32,
                SearchComparison::NotEquals,
                AddressSpace::MainMemory,
                "5",
            )
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(debugger.search_results(), &[0x104]);
    }

    #[test]
    fn test_filter_without_prior_results() {
        let (mut debugger, _machine) = debugger_with_machine();
        let err = debugger
            .filter_search(
                SearchKind::Unsigned32,
                SearchComparison::Equals,
                AddressSpace::MainMemory,
                "5",
            )
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<SearchError>(),
            Some(&SearchError::NoPriorResults)
        );
    }

    #[test]
    fn test_new_search_rejects_bad_range() {
        let (mut debugger, _machine) = debugger_with_machine();
        let err = debugger
            .new_search(
                SearchKind::Unsigned8,
                SearchComparison::Equals,
                AddressSpace::MainMemory,
                0x200,
                0x100,
                "1",
            )
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<SearchError>(),
            Some(&SearchError::EmptyRange)
        );
    }

    #[test]
    fn test_stepping_delegates_to_machine() {
        let (debugger, machine) = debugger_with_machine();
        machine.set_pc(Processor::Main, 0x1000);
        debugger.step_into(Processor::Main);
        assert_eq!(machine.breakpoints(), vec![(Processor::Main, 0x1004)]);
    }
}
