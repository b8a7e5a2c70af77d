//! 型ノードへのハンドル
//!
//! 型ノードはデータベースの置き換えやシンボル削除でいつでも消えるため、
//! ツリー側は参照を直接保持せず、所有シンボルと子インデックスのパスで
//! 表したハンドルを持ち、読み取りロックの中で毎回解決し直します。

use std::sync::Arc;

use crate::ast::TypeNode;
use crate::database::{
    DataType, Function, GlobalVariable, Handle, LocalVariable, ParameterVariable, SymbolDatabase,
};

/// 型ノードを所有するシンボルへの参照
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolRef {
    DataType(Handle<DataType>),
    GlobalVariable(Handle<GlobalVariable>),
    LocalVariable(Handle<LocalVariable>),
    ParameterVariable(Handle<ParameterVariable>),
}

impl SymbolRef {
    /// シンボルのルート型ノードを引く
    pub fn root_node<'a>(&self, database: &'a SymbolDatabase) -> Option<&'a TypeNode> {
        match self {
            SymbolRef::DataType(handle) => database.data_types.get(*handle).map(|dt| &dt.node),
            SymbolRef::GlobalVariable(handle) => database
                .global_variables
                .get(*handle)
                .and_then(|gv| gv.node.as_ref()),
            SymbolRef::LocalVariable(handle) => {
                database.local_variables.get(*handle).map(|lv| &lv.node)
            }
            SymbolRef::ParameterVariable(handle) => {
                database.parameter_variables.get(*handle).map(|pv| &pv.node)
            }
        }
    }

    /// シンボルの所属関数ハンドル
    pub fn function(&self, database: &SymbolDatabase) -> Option<Handle<Function>> {
        match self {
            SymbolRef::LocalVariable(handle) => {
                database.local_variables.get(*handle).and_then(|lv| lv.function)
            }
            SymbolRef::ParameterVariable(handle) => database
                .parameter_variables
                .get(*handle)
                .and_then(|pv| pv.function),
            _ => None,
        }
    }
}

/// 型ノードの所有元
#[derive(Debug, Clone)]
pub enum NodeOwner {
    /// データベース内のシンボルが所有する
    Symbol(SymbolRef),
    /// ツリーノードが一時的に所有する（型の一時変更で作られる断片）
    ///
    /// 親ノードの一時型の内部を子ハンドルが指せるよう、ルートを
    /// Arcで共有します。
    Temporary(Arc<TypeNode>),
}

/// 型ノードへのハンドル
///
/// 所有元からのルートノードに、正準的な子インデックスのパスを適用して
/// 解決します。途中のシンボルやノードが消えていればNoneになります。
#[derive(Debug, Clone)]
pub struct NodeHandle {
    owner: NodeOwner,
    path: Vec<u32>,
}

impl NodeHandle {
    /// シンボルのルートノードを指すハンドルを作成する
    pub fn symbol_root(symbol: SymbolRef) -> Self {
        Self {
            owner: NodeOwner::Symbol(symbol),
            path: Vec::new(),
        }
    }

    /// 一時型断片のルートを指すハンドルを作成する
    pub fn temporary_root(node: Arc<TypeNode>) -> Self {
        Self {
            owner: NodeOwner::Temporary(node),
            path: Vec::new(),
        }
    }

    /// このハンドルの指すノードの index 番目の子を指すハンドルを作成する
    pub fn child(&self, index: u32) -> Self {
        let mut path = self.path.clone();
        path.push(index);
        Self {
            owner: self.owner.clone(),
            path,
        }
    }

    /// 同じ所有元のルートを指すハンドルを作成する
    pub fn root(&self) -> Self {
        Self {
            owner: self.owner.clone(),
            path: Vec::new(),
        }
    }

    /// 所有元
    pub fn owner(&self) -> &NodeOwner {
        &self.owner
    }

    /// 所有シンボル（一時断片はNone）
    pub fn symbol(&self) -> Option<SymbolRef> {
        match &self.owner {
            NodeOwner::Symbol(symbol) => Some(*symbol),
            NodeOwner::Temporary(_) => None,
        }
    }

    /// ハンドルを型ノードに解決する
    ///
    /// 読み取りロックを保持している間だけ有効な参照を返します。
    pub fn lookup<'a>(&'a self, database: &'a SymbolDatabase) -> Option<&'a TypeNode> {
        let mut node = match &self.owner {
            NodeOwner::Symbol(symbol) => symbol.root_node(database)?,
            NodeOwner::Temporary(root) => root.as_ref(),
        };
        for &index in &self.path {
            node = node.child(index)?;
        }
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BuiltinClass, Field};

    fn test_db() -> (SymbolDatabase, Handle<DataType>) {
        let mut db = SymbolDatabase::new();
        let dt = db.data_types.add(DataType {
            name: "Vec2".to_string(),
            node: TypeNode::StructOrUnion {
                name: "Vec2".to_string(),
                size_bytes: 8,
                base_classes: Vec::new(),
                fields: vec![
                    Field {
                        name: "x".to_string(),
                        offset_bytes: 0,
                        node: TypeNode::Builtin {
                            class: BuiltinClass::Float32,
                        },
                    },
                    Field {
                        name: "y".to_string(),
                        offset_bytes: 4,
                        node: TypeNode::Builtin {
                            class: BuiltinClass::Float32,
                        },
                    },
                ],
            },
        });
        (db, dt)
    }

    #[test]
    fn test_symbol_path_resolution() {
        let (db, dt) = test_db();
        let root = NodeHandle::symbol_root(SymbolRef::DataType(dt));
        assert!(matches!(
            root.lookup(&db),
            Some(TypeNode::StructOrUnion { .. })
        ));
        // 1番目の子 = フィールドy
        let y = root.child(1);
        assert!(matches!(
            y.lookup(&db),
            Some(TypeNode::Builtin {
                class: BuiltinClass::Float32
            })
        ));
        assert!(root.child(2).lookup(&db).is_none());
    }

    #[test]
    fn test_lookup_after_symbol_removed() {
        let (mut db, dt) = test_db();
        let handle = NodeHandle::symbol_root(SymbolRef::DataType(dt));
        db.data_types.remove(dt);
        assert!(handle.lookup(&db).is_none());
    }

    #[test]
    fn test_temporary_child_shares_root() {
        let db = SymbolDatabase::new();
        let root = Arc::new(TypeNode::Array {
            element_type: Box::new(TypeNode::Builtin {
                class: BuiltinClass::Signed16,
            }),
            element_count: 4,
        });
        let handle = NodeHandle::temporary_root(root);
        let element = handle.child(0);
        // 一時断片はデータベースと無関係に解決できる
        assert!(matches!(
            element.lookup(&db),
            Some(TypeNode::Builtin {
                class: BuiltinClass::Signed16
            })
        ));
        assert!(element.symbol().is_none());
    }
}
