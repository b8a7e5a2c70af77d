//! Sumire シンボルデータベース
//!
//! このクレートは、デバッグ情報から構築された型グラフとシンボルの保持、
//! およびそれらへの安全なアクセスを提供します。データベースはゲームの
//! 切り替えや再読み込みでいつでも置き換えられるため、読み書きは
//! `SymbolGuardian`経由で行い、型ノードへの参照は毎回ハンドルから
//! 解決し直します。デバッグ情報のパース（データベースの構築）自体は
//! このクレートの範囲外です。

pub mod ast;
pub mod database;
pub mod handle;
pub mod guardian;
pub mod resolver;
pub mod type_string;

pub use ast::{BaseClass, BuiltinClass, Field, TypeNode};
pub use database::{
    DataType, Function, GlobalVariable, Handle, LocalVariable, ParameterVariable, SourceFile,
    SymbolDatabase, SymbolList,
};
pub use handle::{NodeHandle, NodeOwner, SymbolRef};
pub use guardian::SymbolGuardian;
pub use resolver::resolve_physical_type;
pub use type_string::{parse_type_string, TypeStringError};

/// シンボル操作の結果型
pub type Result<T> = anyhow::Result<T>;
