//! シンボルデータベース
//!
//! 関数、グローバル変数、ローカル変数、データ型などのシンボルを保持します。
//! 各シンボルは単調増加するIDを持つハンドルで参照され、IDは削除後も
//! 再利用されないため、ハンドルの参照先が別のシンボルにすり替わることは
//! ありません。

use std::collections::BTreeMap;
use std::marker::PhantomData;

use sumire_target::{AddressSpace, Machine};

use crate::ast::TypeNode;

/// シンボルへの型付きハンドル
///
/// データベースの世代を跨いで保持できる弱参照です。参照先が削除済み、
/// あるいはデータベースが置き換わった後は、lookupがNoneを返します。
pub struct Handle<T> {
    id: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    fn new(id: u32) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    /// ハンドルのID値
    pub fn id(self) -> u32 {
        self.id
    }
}

// deriveはTにも境界を要求してしまうため手で実装する
impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Handle<T> {}

impl<T> std::hash::Hash for Handle<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T> std::fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Handle({})", self.id)
    }
}

/// 単一種類のシンボルを保持するリスト
///
/// IDは追加のたびに単調増加し、clear後も巻き戻しません。
#[derive(Debug)]
pub struct SymbolList<T> {
    symbols: BTreeMap<u32, T>,
    next_id: u32,
}

impl<T> Default for SymbolList<T> {
    fn default() -> Self {
        Self {
            symbols: BTreeMap::new(),
            next_id: 0,
        }
    }
}

impl<T> SymbolList<T> {
    /// シンボルを追加してハンドルを返す
    pub fn add(&mut self, symbol: T) -> Handle<T> {
        let id = self.next_id;
        self.next_id += 1;
        self.symbols.insert(id, symbol);
        Handle::new(id)
    }

    /// ハンドルからシンボルを引く
    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        self.symbols.get(&handle.id)
    }

    /// ハンドルからシンボルを可変参照で引く
    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        self.symbols.get_mut(&handle.id)
    }

    /// シンボルを削除する。そのIDは二度と使われない
    pub fn remove(&mut self, handle: Handle<T>) -> Option<T> {
        self.symbols.remove(&handle.id)
    }

    /// すべてのシンボルをID順に走査する
    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> {
        self.symbols.iter().map(|(&id, s)| (Handle::new(id), s))
    }

    /// シンボル数
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// 空かどうか
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// 全シンボルを削除する。next_idは保持する
    pub fn clear(&mut self) {
        self.symbols.clear();
    }
}

/// 名前付きデータ型（typedefや構造体定義の実体）
#[derive(Debug)]
pub struct DataType {
    /// 型名
    pub name: String,
    /// 型グラフのルートノード
    pub node: TypeNode,
}

/// ソースファイル
#[derive(Debug)]
pub struct SourceFile {
    /// ファイルパス
    pub path: String,
    /// このファイル由来の関数群がメモリ内容と一致しているか
    ///
    /// refresh_functions_matchで更新されるキャッシュです。
    pub functions_match: bool,
}

/// 関数シンボル
#[derive(Debug)]
pub struct Function {
    /// 関数名
    pub name: String,
    /// 先頭アドレス
    pub address: u32,
    /// サイズ（バイト）
    pub size: u32,
    /// ビルド時の関数本体のFNV-1aハッシュ。0ならハッシュ未登録
    pub original_hash: u32,
    /// 所属ソースファイル
    pub source_file: Option<Handle<SourceFile>>,
}

impl Function {
    /// 現在のメモリ内容がビルド時の本体と一致しているかを判定する
    ///
    /// ハッシュ未登録（0）の関数は常に一致扱いです。
    pub fn matches_memory(&self, machine: &dyn Machine) -> bool {
        if self.original_hash == 0 {
            return true;
        }

        // FNV-1a 32bit
        let mut hash: u32 = 0x811c9dc5;
        for i in 0..self.size {
            let byte = machine.read8(AddressSpace::MainMemory, self.address.wrapping_add(i));
            hash ^= byte as u32;
            hash = hash.wrapping_mul(0x01000193);
        }

        hash == self.original_hash
    }
}

/// グローバル変数シンボル
#[derive(Debug)]
pub struct GlobalVariable {
    /// 変数名
    pub name: String,
    /// 配置アドレス
    pub address: u32,
    /// 型ノード。型情報のない変数はNone
    pub node: Option<TypeNode>,
    /// 所属ソースファイル
    pub source_file: Option<Handle<SourceFile>>,
}

/// ローカル変数シンボル
#[derive(Debug)]
pub struct LocalVariable {
    /// 変数名
    pub name: String,
    /// 型ノード
    pub node: TypeNode,
    /// スタックポインタ相対オフセット
    pub stack_offset: i32,
    /// 生存区間 [low, high)。不明ならNone
    pub live_range: Option<(u32, u32)>,
    /// 所属関数
    pub function: Option<Handle<Function>>,
}

/// 引数シンボル
#[derive(Debug)]
pub struct ParameterVariable {
    /// 引数名
    pub name: String,
    /// 型ノード
    pub node: TypeNode,
    /// スタックポインタ相対オフセット
    pub stack_offset: i32,
    /// 所属関数
    pub function: Option<Handle<Function>>,
}

/// シンボルデータベース本体
///
/// 6種類のシンボルリストを保持します。通常は`SymbolGuardian`経由でのみ
/// アクセスします。
#[derive(Debug, Default)]
pub struct SymbolDatabase {
    pub data_types: SymbolList<DataType>,
    pub source_files: SymbolList<SourceFile>,
    pub functions: SymbolList<Function>,
    pub global_variables: SymbolList<GlobalVariable>,
    pub local_variables: SymbolList<LocalVariable>,
    pub parameter_variables: SymbolList<ParameterVariable>,
}

impl SymbolDatabase {
    /// 空のデータベースを作成する
    pub fn new() -> Self {
        Self::default()
    }

    /// 名前でデータ型を検索する
    pub fn lookup_data_type_by_name(&self, name: &str) -> Option<Handle<DataType>> {
        self.data_types
            .iter()
            .find(|(_, dt)| dt.name == name)
            .map(|(handle, _)| handle)
    }

    /// アドレスを含む関数を検索する
    pub fn function_containing_address(&self, address: u32) -> Option<Handle<Function>> {
        self.functions
            .iter()
            .find(|(_, f)| address >= f.address && address < f.address.wrapping_add(f.size))
            .map(|(handle, _)| handle)
    }

    /// 全シンボルを削除する。各リストのIDカウンタは保持する
    pub fn clear(&mut self) {
        self.data_types.clear();
        self.source_files.clear();
        self.functions.clear();
        self.global_variables.clear();
        self.local_variables.clear();
        self.parameter_variables.clear();
    }
}
