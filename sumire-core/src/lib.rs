//! Sumire コアエンジン
//!
//! エミュレートされたマシンに対するライブデバッガの中核機能を提供します。
//! 遅延スロット付きパイプラインを考慮した命令ステップ実行、シンボル型情報を
//! 投影した遅延展開メモリツリー、型付きメモリパターン検索、およびそれらを
//! まとめる`Debugger`ファサードです。CPUエミュレーション本体、UI、デバッグ
//! 情報のパースは範囲外で、`sumire-target`と`sumire-symbols`の
//! インターフェース越しに利用します。

pub mod node;
pub mod tree;
pub mod stepper;
pub mod search;
pub mod debugger;

pub use node::{InspectorNode, Liveness, NodeId};
pub use tree::{InspectorTree, Value};
pub use stepper::Stepper;
pub use search::{
    SearchComparison, SearchError, SearchKind, SearchTask, SearchValue,
};
pub use debugger::Debugger;

/// コアエンジンの結果型
pub type Result<T> = anyhow::Result<T>;
