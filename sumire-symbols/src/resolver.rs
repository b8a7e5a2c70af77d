//! 型名の物理型への解決
//!
//! TypeNameノード（typedef等の名前参照）を辿って、値の読み書きが
//! 可能な実体の型ノードに解決します。

use crate::ast::TypeNode;
use crate::database::{DataType, Handle, SymbolDatabase};

/// 名前参照を辿る回数の上限。循環したtypedefで無限ループしないため
const MAX_NAME_HOPS: u32 = 10;

/// 型ノードを物理型に解決する
///
/// TypeNameノードならば参照先のデータ型を引き、その実体がさらに
/// TypeNameならば繰り返し辿ります。戻り値の第2要素は最後に辿った
/// データ型のハンドルで、子ハンドルの所有元を実体側に付け替えるのに
/// 使います。名前参照でないノードはそのまま返します。
pub fn resolve_physical_type<'a>(
    node: &'a TypeNode,
    database: &'a SymbolDatabase,
) -> (&'a TypeNode, Option<Handle<DataType>>) {
    let mut current = node;
    let mut resolved_handle = None;

    for _ in 0..MAX_NAME_HOPS {
        let TypeNode::TypeName { data_type, .. } = current else {
            break;
        };
        let Some(data_type_symbol) = database.data_types.get(*data_type) else {
            break;
        };
        resolved_handle = Some(*data_type);
        current = &data_type_symbol.node;
    }

    (current, resolved_handle)
}
