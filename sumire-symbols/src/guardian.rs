//! シンボルデータベースの読み書きガード
//!
//! データベースはUIスレッドとデバッグ情報の読み込みスレッドの双方から
//! 触られるため、すべてのアクセスをRwLock越しのクロージャに限定します。
//! UI側の軽い問い合わせには、書き込み中ならすぐ諦められるtry_readを
//! 用意しています。

use parking_lot::RwLock;

use crate::database::SymbolDatabase;

/// シンボルデータベースを保護するガード
#[derive(Debug, Default)]
pub struct SymbolGuardian {
    database: RwLock<SymbolDatabase>,
}

impl SymbolGuardian {
    /// 空のデータベースを持つガードを作成する
    pub fn new() -> Self {
        Self::default()
    }

    /// 読み取りロックを取得してクロージャを実行する（ブロッキング）
    pub fn read<R>(&self, f: impl FnOnce(&SymbolDatabase) -> R) -> R {
        let guard = self.database.read();
        f(&guard)
    }

    /// 読み取りロックの取得を試みる
    ///
    /// 書き込み中ならクロージャを実行せずfalseを返します。
    pub fn try_read(&self, f: impl FnOnce(&SymbolDatabase)) -> bool {
        match self.database.try_read() {
            Some(guard) => {
                f(&guard);
                true
            }
            None => false,
        }
    }

    /// 書き込みロックを取得してクロージャを実行する（ブロッキング）
    pub fn read_write<R>(&self, f: impl FnOnce(&mut SymbolDatabase) -> R) -> R {
        let mut guard = self.database.write();
        f(&mut guard)
    }

    /// 書き込みロックが保持されているか
    pub fn is_busy(&self) -> bool {
        self.database.is_locked_exclusive()
    }

    /// データベース全体を置き換え、古いデータベースを返す
    pub fn swap(&self, new_database: SymbolDatabase) -> SymbolDatabase {
        tracing::debug!("swapping symbol database");
        let mut guard = self.database.write();
        std::mem::replace(&mut *guard, new_database)
    }

    /// 全シンボルを削除する。IDカウンタは保持される
    pub fn clear(&self) {
        self.read_write(|db| db.clear());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BuiltinClass, TypeNode};
    use crate::database::DataType;

    #[test]
    fn test_read_write_then_read() {
        let guardian = SymbolGuardian::new();
        let handle = guardian.read_write(|db| {
            db.data_types.add(DataType {
                name: "u32".to_string(),
                node: TypeNode::Builtin {
                    class: BuiltinClass::Unsigned32,
                },
            })
        });
        let name = guardian.read(|db| db.data_types.get(handle).map(|dt| dt.name.clone()));
        assert_eq!(name.as_deref(), Some("u32"));
    }

    #[test]
    fn test_try_read_fails_while_writing() {
        let guardian = SymbolGuardian::new();
        guardian.read_write(|_db| {
            // 書き込みロック保持中はtry_readが失敗する
            assert!(guardian.is_busy());
        });
        assert!(!guardian.is_busy());
        assert!(guardian.try_read(|_db| {}));
    }

    #[test]
    fn test_swap_returns_old_database() {
        let guardian = SymbolGuardian::new();
        guardian.read_write(|db| {
            db.data_types.add(DataType {
                name: "old".to_string(),
                node: TypeNode::Builtin {
                    class: BuiltinClass::Unsigned8,
                },
            });
        });
        let old = guardian.swap(SymbolDatabase::new());
        assert_eq!(old.data_types.len(), 1);
        assert!(guardian.read(|db| db.data_types.is_empty()));
    }
}
