//! メモリツリーのノード
//!
//! ツリーのノード本体と、ノードの生死判定の結果型。ノードはアリーナ
//! （`InspectorTree`）が所有し、親への参照はインデックスによる非所有の
//! 逆参照です。

use sumire_symbols::{NodeHandle, SymbolRef};
use sumire_target::Location;

/// アリーナ内のノードを指すインデックス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

/// スタック変数の生死
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// 現在のPCが生存区間内にある
    Alive,
    /// 生存区間の外にある（値は無意味）
    Dead,
    /// 生存区間が設定されていない
    Unknown,
}

/// メモリツリーの1ノード
///
/// 型ハンドルと位置の組で「どの型で、どこを見るか」を表します。子ノードは
/// 初回展開時にのみ生成され（fetch-once）、リセットされるまで作り直され
/// ません。
#[derive(Debug)]
pub struct InspectorNode {
    /// 表示名
    pub name: String,
    /// 型ハンドル。型のないノード（合成グループ）はNone
    pub type_handle: Option<NodeHandle>,
    /// 読み書き対象の位置
    pub location: Location,
    /// 子ノード（生成順）
    pub(crate) children: Vec<NodeId>,
    /// 子ノードを生成済みか
    pub(crate) children_fetched: bool,
    /// PCによる生存区間 [low, high)
    pub live_range: Option<(u32, u32)>,
    /// このノードの元になったシンボル（ステールネス判定用）
    pub symbol: Option<SymbolRef>,
    /// 親ノード（非所有の逆参照）
    pub(crate) parent: Option<NodeId>,
}

impl InspectorNode {
    /// 型も位置も持たない合成グループノードを作成する
    pub fn group(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_handle: None,
            location: Location::None,
            children: Vec::new(),
            children_fetched: false,
            live_range: None,
            symbol: None,
            parent: None,
        }
    }

    /// 型と位置を持つノードを作成する
    pub fn typed(name: impl Into<String>, type_handle: NodeHandle, location: Location) -> Self {
        Self {
            name: name.into(),
            type_handle: Some(type_handle),
            location,
            children: Vec::new(),
            children_fetched: false,
            live_range: None,
            symbol: None,
            parent: None,
        }
    }

    /// 生存区間を設定する
    pub fn with_live_range(mut self, low: u32, high: u32) -> Self {
        self.live_range = Some((low, high));
        self
    }

    /// 元シンボルを設定する
    pub fn with_symbol(mut self, symbol: SymbolRef) -> Self {
        self.symbol = Some(symbol);
        self
    }

    /// 子ノードのID列
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// 子ノードを生成済みか
    pub fn children_fetched(&self) -> bool {
        self.children_fetched
    }

    /// 親ノードのID
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
}
