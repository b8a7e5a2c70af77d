//! 型付きメモリツリー
//!
//! シンボルの型グラフをライブメモリに投影する遅延展開ツリー。子ノードは
//! 初回展開時にのみ物理型から導出され、値の読み書きは物理型のビルトイン
//! 分類に応じたサイズで行います。型情報へのアクセスはすべてガーディアンの
//! ロック内で完結し、ロックを跨いで型ノードへの参照を保持しません。

use std::sync::Arc;

use sumire_symbols::{
    parse_type_string, resolve_physical_type, BuiltinClass, NodeHandle, SymbolDatabase,
    SymbolGuardian, SymbolRef, TypeNode, TypeStringError,
};
use sumire_target::{Location, Machine, Processor};

use crate::node::{InspectorNode, Liveness, NodeId};

/// スカラーノードから読み出した型付きの値
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Unsigned(u64),
    Signed(i64),
    Bool(bool),
    Float(f32),
    Double(f64),
    /// 列挙型の現在値（基底は32bit整数）
    Enum(i32),
    /// ポインタ値（32bitアドレス）
    Pointer(u32),
}

/// 子ノードの生成指示
struct ChildSpec {
    name: String,
    handle: NodeHandle,
    location: Location,
}

/// 型付きメモリツリー本体
///
/// ノードはアリーナで所有し、親子関係はインデックスで表します。ルートは
/// 型を持たない合成グループで、インスペクタが表示するシンボルごとの
/// ノードを`add_child`でぶら下げます。
#[derive(Debug)]
pub struct InspectorTree {
    nodes: Vec<Option<InspectorNode>>,
    free: Vec<u32>,
    root: NodeId,
}

impl Default for InspectorTree {
    fn default() -> Self {
        Self::new()
    }
}

impl InspectorTree {
    /// 空のルートのみを持つツリーを作成する
    pub fn new() -> Self {
        Self {
            nodes: vec![Some(InspectorNode::group(""))],
            free: Vec::new(),
            root: NodeId(0),
        }
    }

    /// ルートノードのID
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// ノードを参照する
    pub fn node(&self, id: NodeId) -> Option<&InspectorNode> {
        self.nodes.get(id.0 as usize).and_then(|n| n.as_ref())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut InspectorNode> {
        self.nodes.get_mut(id.0 as usize).and_then(|n| n.as_mut())
    }

    /// 子ノードを追加する
    pub fn add_child(&mut self, parent: NodeId, mut node: InspectorNode) -> NodeId {
        node.parent = Some(parent);
        let id = match self.free.pop() {
            Some(index) => {
                self.nodes[index as usize] = Some(node);
                NodeId(index)
            }
            None => {
                self.nodes.push(Some(node));
                NodeId((self.nodes.len() - 1) as u32)
            }
        };
        if let Some(parent_node) = self.node_mut(parent) {
            parent_node.children.push(id);
        }
        id
    }

    /// ノードが子を持ち得るか
    ///
    /// 型のないノードは既存の子の有無で決まります。データベースが書き込み中で
    /// ロックを取れない場合はtrueを返し、判定を実際の展開まで遅らせます。
    pub fn has_children(&self, id: NodeId, guardian: &SymbolGuardian) -> bool {
        let Some(node) = self.node(id) else {
            return false;
        };
        let Some(handle) = &node.type_handle else {
            return !node.children.is_empty();
        };

        let mut result = true;
        guardian.try_read(|db| {
            let Some(node_type) = handle.lookup(db) else {
                return;
            };
            let (physical, _) = resolve_physical_type(node_type, db);
            result = match physical {
                TypeNode::Array { element_count, .. } => *element_count > 0,
                TypeNode::PointerOrReference { .. } => true,
                TypeNode::StructOrUnion {
                    base_classes,
                    fields,
                    ..
                } => !base_classes.is_empty() || !fields.is_empty(),
                _ => false,
            };
        });
        result
    }

    /// 子ノードを生成する（初回のみ）
    ///
    /// 2回目以降の呼び出しは`reset_children`を挟まない限り何もしません。
    pub fn fetch_children(&mut self, id: NodeId, machine: &dyn Machine, guardian: &SymbolGuardian) {
        let Some(node) = self.node(id) else {
            return;
        };
        if node.children_fetched {
            return;
        }

        let specs = match node.type_handle.clone() {
            Some(handle) => {
                let location = node.location;
                guardian.read(|db| populate_children(db, &handle, location, machine))
            }
            None => Vec::new(),
        };

        for spec in specs {
            self.add_child(id, InspectorNode::typed(spec.name, spec.handle, spec.location));
        }
        if let Some(node) = self.node_mut(id) {
            node.children_fetched = true;
        }
    }

    /// スカラーノードの現在値を読む
    ///
    /// 物理型がビルトイン、列挙型、ポインタのいずれでもないノードはNoneです。
    pub fn read_value(
        &self,
        id: NodeId,
        machine: &dyn Machine,
        guardian: &SymbolGuardian,
    ) -> Option<Value> {
        let node = self.node(id)?;
        if !node.location.is_some() {
            return None;
        }
        let handle = node.type_handle.as_ref()?;
        let location = node.location;

        guardian.read(|db| {
            let node_type = handle.lookup(db)?;
            let (physical, _) = resolve_physical_type(node_type, db);
            raw_value(physical, location, machine)
        })
    }

    /// スカラーノードの現在値を表示用文字列にする
    pub fn format_value(
        &self,
        id: NodeId,
        machine: &dyn Machine,
        guardian: &SymbolGuardian,
    ) -> Option<String> {
        let node = self.node(id)?;
        if !node.location.is_some() {
            return None;
        }
        let handle = node.type_handle.as_ref()?;
        let location = node.location;

        guardian.read(|db| {
            let node_type = handle.lookup(db)?;
            let (physical, _) = resolve_physical_type(node_type, db);
            let value = raw_value(physical, location, machine)?;
            let text = match value {
                Value::Unsigned(v) => v.to_string(),
                Value::Signed(v) => v.to_string(),
                Value::Bool(v) => v.to_string(),
                Value::Float(v) => v.to_string(),
                Value::Double(v) => v.to_string(),
                Value::Enum(v) => physical
                    .enum_constant_name(v)
                    .map(str::to_string)
                    .unwrap_or_else(|| v.to_string()),
                Value::Pointer(v) => format!("0x{:08x}", v),
            };
            Some(text)
        })
    }

    /// テキスト入力された値をノードに書き込む
    ///
    /// パース失敗や幅の超過、書き込み不能な型の場合はfalseを返し、何も
    /// 書き込みません。
    pub fn write_value(
        &self,
        id: NodeId,
        text: &str,
        machine: &dyn Machine,
        guardian: &SymbolGuardian,
    ) -> bool {
        let Some(node) = self.node(id) else {
            return false;
        };
        if !node.location.is_some() {
            return false;
        }
        let Some(handle) = &node.type_handle else {
            return false;
        };
        let location = node.location;
        let text = text.trim();

        guardian.read(|db| {
            let Some(node_type) = handle.lookup(db) else {
                return false;
            };
            let (physical, _) = resolve_physical_type(node_type, db);
            match physical {
                TypeNode::Builtin { class } => write_builtin(*class, location, text, machine),
                TypeNode::Enum { constants } => {
                    // 定数リストへのインデックスで選択する
                    let Ok(index) = text.parse::<usize>() else {
                        return false;
                    };
                    let Some((value, _)) = constants.get(index) else {
                        return false;
                    };
                    location.write32(machine, *value as u32);
                    true
                }
                TypeNode::PointerOrReference { .. } => {
                    let digits = text.strip_prefix("0x").unwrap_or(text);
                    let Ok(address) = u32::from_str_radix(digits, 16) else {
                        return false;
                    };
                    location.write32(machine, address);
                    true
                }
                _ => false,
            }
        })
    }

    /// スタック変数の生死を判定する
    pub fn liveness(&self, id: NodeId, machine: &dyn Machine) -> Liveness {
        let Some(node) = self.node(id) else {
            return Liveness::Unknown;
        };
        let Some((low, high)) = node.live_range else {
            return Liveness::Unknown;
        };
        let pc = machine.pc(Processor::Main);
        if pc >= low && pc < high {
            Liveness::Alive
        } else {
            Liveness::Dead
        }
    }

    /// ノードの元シンボルが現在のメモリ内容と整合しているか
    ///
    /// 関数に紐づく変数はその関数のハッシュ照合、グローバル変数は所属
    /// ソースファイルのキャッシュ済みフラグで判定します。シンボルがない、
    /// またはロックを取れない場合は整合扱いです。
    pub fn symbol_matches_memory(
        &self,
        id: NodeId,
        machine: &dyn Machine,
        guardian: &SymbolGuardian,
    ) -> bool {
        let Some(node) = self.node(id) else {
            return true;
        };
        let Some(symbol) = node.symbol else {
            return true;
        };

        let mut result = true;
        guardian.try_read(|db| {
            result = match symbol {
                SymbolRef::GlobalVariable(handle) => db
                    .global_variables
                    .get(handle)
                    .and_then(|gv| gv.source_file)
                    .and_then(|sf| db.source_files.get(sf))
                    .map(|sf| sf.functions_match)
                    .unwrap_or(true),
                SymbolRef::LocalVariable(_) | SymbolRef::ParameterVariable(_) => {
                    match symbol.function(db).and_then(|f| db.functions.get(f)) {
                        Some(function) => function.matches_memory(machine),
                        None => true,
                    }
                }
                SymbolRef::DataType(_) => true,
            };
        });
        result
    }

    /// 子孫ノードをすべて破棄し、再展開可能な状態に戻す
    pub fn reset_children(&mut self, id: NodeId) {
        let children = match self.node(id) {
            Some(node) => node.children.clone(),
            None => return,
        };
        for child in children {
            self.remove_subtree(child);
        }
        if let Some(node) = self.node_mut(id) {
            node.children.clear();
            node.children_fetched = false;
        }
    }

    fn remove_subtree(&mut self, id: NodeId) {
        let children = match self.node(id) {
            Some(node) => node.children.clone(),
            None => return,
        };
        for child in children {
            self.remove_subtree(child);
        }
        self.nodes[id.0 as usize] = None;
        self.free.push(id.0);
    }

    /// ノードの型を一時的に変更する
    ///
    /// 型文字列のパースに成功した場合のみ、子ノードを破棄して型ハンドルを
    /// ノード所有の一時断片に付け替えます。失敗時は型も子もそのままです。
    pub fn change_type_temporarily(
        &mut self,
        id: NodeId,
        source: &str,
        guardian: &SymbolGuardian,
    ) -> Result<(), TypeStringError> {
        let parsed = guardian.read(|db| parse_type_string(source, db))?;
        self.reset_children(id);
        if let Some(node) = self.node_mut(id) {
            node.type_handle = Some(NodeHandle::temporary_root(Arc::new(parsed)));
        }
        Ok(())
    }
}

/// ハンドルを物理型に解決し、子ハンドルの基点も実体側に付け替える
fn resolve_handle<'a>(
    handle: &'a NodeHandle,
    db: &'a SymbolDatabase,
) -> Option<(&'a TypeNode, NodeHandle)> {
    let node = handle.lookup(db)?;
    let (physical, owner) = resolve_physical_type(node, db);
    let physical_handle = match owner {
        Some(data_type) => NodeHandle::symbol_root(SymbolRef::DataType(data_type)),
        None => handle.clone(),
    };
    Some((physical, physical_handle))
}

/// 物理型から子ノードの生成指示を導出する
///
/// 基底クラスは1段ネストさせず、そのフィールドをこのノードの子リストに
/// 直接継ぎ足します。位置がNoneになった子は捨てます。
fn populate_children(
    db: &SymbolDatabase,
    handle: &NodeHandle,
    location: Location,
    machine: &dyn Machine,
) -> Vec<ChildSpec> {
    let Some((physical, physical_handle)) = resolve_handle(handle, db) else {
        return Vec::new();
    };

    let mut children = Vec::new();
    match physical {
        TypeNode::Array {
            element_type,
            element_count,
        } => {
            let element_size = element_type.size_bytes();
            for i in 0..*element_count {
                let child_location = location.add_offset(i * element_size);
                if !child_location.is_some() {
                    continue;
                }
                children.push(ChildSpec {
                    name: format!("[{}]", i),
                    handle: physical_handle.child(0),
                    location: child_location,
                });
            }
        }
        TypeNode::PointerOrReference { .. } => {
            // 無効なアドレスは展開時に毎回チェックして弾く
            let address = location.read32(machine);
            let Some(space) = location.pointer_space() else {
                return children;
            };
            if !machine.is_valid_address(space, address) {
                return children;
            }
            let child_location = location.create_address(address);
            if child_location.is_some() {
                children.push(ChildSpec {
                    name: format!("*{:x}", address),
                    handle: physical_handle.child(0),
                    location: child_location,
                });
            }
        }
        TypeNode::StructOrUnion {
            base_classes,
            fields,
            ..
        } => {
            for (i, base) in base_classes.iter().enumerate() {
                let base_location = location.add_offset(base.offset_bytes);
                if !base_location.is_some() {
                    continue;
                }
                let base_handle = physical_handle.child(i as u32);
                children.extend(populate_children(db, &base_handle, base_location, machine));
            }
            for (i, field) in fields.iter().enumerate() {
                let field_location = location.add_offset(field.offset_bytes);
                if !field_location.is_some() {
                    continue;
                }
                let name = if field.name.is_empty() {
                    synthetic_field_name(&field.node)
                } else {
                    field.name.clone()
                };
                children.push(ChildSpec {
                    name,
                    handle: physical_handle.child((base_classes.len() + i) as u32),
                    location: field_location,
                });
            }
        }
        _ => {}
    }
    children
}

/// 無名フィールドに与える型由来の名前
fn synthetic_field_name(node: &TypeNode) -> String {
    match node {
        TypeNode::Builtin { class } => class.name().to_string(),
        TypeNode::Enum { .. } => "(enum)".to_string(),
        TypeNode::PointerOrReference { .. } => "(pointer)".to_string(),
        TypeNode::PointerToMember => "(pointer to member)".to_string(),
        TypeNode::Array { .. } => "(array)".to_string(),
        TypeNode::StructOrUnion { name, .. } if !name.is_empty() => format!("({})", name),
        TypeNode::StructOrUnion { .. } => "(anonymous)".to_string(),
        TypeNode::TypeName { .. } => "(type)".to_string(),
    }
}

/// 物理型に応じたサイズで値を読み出す
fn raw_value(physical: &TypeNode, location: Location, machine: &dyn Machine) -> Option<Value> {
    let value = match physical {
        TypeNode::Builtin { class } => match class {
            BuiltinClass::Unsigned8 | BuiltinClass::Unqualified8 => {
                Value::Unsigned(location.read8(machine) as u64)
            }
            BuiltinClass::Signed8 => Value::Signed(location.read8(machine) as i8 as i64),
            BuiltinClass::Bool8 => Value::Bool(location.read8(machine) != 0),
            BuiltinClass::Unsigned16 => Value::Unsigned(location.read16(machine) as u64),
            BuiltinClass::Signed16 => Value::Signed(location.read16(machine) as i16 as i64),
            BuiltinClass::Unsigned32 => Value::Unsigned(location.read32(machine) as u64),
            BuiltinClass::Signed32 => Value::Signed(location.read32(machine) as i32 as i64),
            BuiltinClass::Float32 => Value::Float(f32::from_bits(location.read32(machine))),
            BuiltinClass::Unsigned64 => Value::Unsigned(location.read64(machine)),
            BuiltinClass::Signed64 => Value::Signed(location.read64(machine) as i64),
            BuiltinClass::Float64 => Value::Double(f64::from_bits(location.read64(machine))),
        },
        TypeNode::Enum { .. } => Value::Enum(location.read32(machine) as i32),
        TypeNode::PointerOrReference { .. } => Value::Pointer(location.read32(machine)),
        _ => return None,
    };
    Some(value)
}

/// 10進または0xプレフィクス付き16進の符号なし整数をパースする
fn parse_unsigned(text: &str) -> Option<u64> {
    if let Some(digits) = text.strip_prefix("0x") {
        u64::from_str_radix(digits, 16).ok()
    } else {
        text.parse().ok()
    }
}

/// 10進または0xプレフィクス付き16進の符号あり整数をパースする
fn parse_signed(text: &str) -> Option<i64> {
    if let Some(digits) = text.strip_prefix("-0x") {
        i64::from_str_radix(digits, 16).ok().map(|v| -v)
    } else if let Some(digits) = text.strip_prefix("0x") {
        i64::from_str_radix(digits, 16).ok()
    } else {
        text.parse().ok()
    }
}

fn write_builtin(
    class: BuiltinClass,
    location: Location,
    text: &str,
    machine: &dyn Machine,
) -> bool {
    match class {
        BuiltinClass::Unsigned8 | BuiltinClass::Unqualified8 => match parse_unsigned(text) {
            Some(v) if v <= u8::MAX as u64 => {
                location.write8(machine, v as u8);
                true
            }
            _ => false,
        },
        BuiltinClass::Signed8 => match parse_signed(text) {
            Some(v) if v >= i8::MIN as i64 && v <= i8::MAX as i64 => {
                location.write8(machine, v as u8);
                true
            }
            _ => false,
        },
        BuiltinClass::Bool8 => match text {
            "true" | "1" => {
                location.write8(machine, 1);
                true
            }
            "false" | "0" => {
                location.write8(machine, 0);
                true
            }
            _ => false,
        },
        BuiltinClass::Unsigned16 => match parse_unsigned(text) {
            Some(v) if v <= u16::MAX as u64 => {
                location.write16(machine, v as u16);
                true
            }
            _ => false,
        },
        BuiltinClass::Signed16 => match parse_signed(text) {
            Some(v) if v >= i16::MIN as i64 && v <= i16::MAX as i64 => {
                location.write16(machine, v as u16);
                true
            }
            _ => false,
        },
        BuiltinClass::Unsigned32 => match parse_unsigned(text) {
            Some(v) if v <= u32::MAX as u64 => {
                location.write32(machine, v as u32);
                true
            }
            _ => false,
        },
        BuiltinClass::Signed32 => match parse_signed(text) {
            Some(v) if v >= i32::MIN as i64 && v <= i32::MAX as i64 => {
                location.write32(machine, v as u32);
                true
            }
            _ => false,
        },
        BuiltinClass::Float32 => match text.parse::<f32>() {
            Ok(v) => {
                location.write32(machine, v.to_bits());
                true
            }
            Err(_) => false,
        },
        BuiltinClass::Unsigned64 => match parse_unsigned(text) {
            Some(v) => {
                location.write64(machine, v);
                true
            }
            None => false,
        },
        BuiltinClass::Signed64 => match parse_signed(text) {
            Some(v) => {
                location.write64(machine, v as u64);
                true
            }
            None => false,
        },
        BuiltinClass::Float64 => match text.parse::<f64>() {
            Ok(v) => {
                location.write64(machine, v.to_bits());
                true
            }
            Err(_) => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sumire_symbols::{BaseClass, DataType, Field, GlobalVariable};
    use sumire_target::testing::TestMachine;
    use sumire_target::AddressSpace;

    fn builtin(class: BuiltinClass) -> TypeNode {
        TypeNode::Builtin { class }
    }

    /// グローバル変数1つをルート直下にぶら下げたツリーを作る
    fn tree_with_global(
        guardian: &SymbolGuardian,
        node: TypeNode,
        address: u32,
    ) -> (InspectorTree, NodeId) {
        let handle = guardian.read_write(|db| {
            db.global_variables.add(GlobalVariable {
                name: "g".to_string(),
                address,
                node: Some(node),
                source_file: None,
            })
        });
        let symbol = SymbolRef::GlobalVariable(handle);
        let mut tree = InspectorTree::new();
        let root = tree.root();
        let id = tree.add_child(
            root,
            InspectorNode::typed(
                "g",
                NodeHandle::symbol_root(symbol),
                Location::memory(AddressSpace::MainMemory, address),
            )
            .with_symbol(symbol),
        );
        (tree, id)
    }

    #[test]
    fn test_array_children_named_in_order() {
        let machine = TestMachine::new();
        let guardian = SymbolGuardian::new();
        let (mut tree, id) = tree_with_global(
            &guardian,
            TypeNode::Array {
                element_type: Box::new(builtin(BuiltinClass::Unsigned16)),
                element_count: 3,
            },
            0x100,
        );

        assert!(tree.has_children(id, &guardian));
        tree.fetch_children(id, &machine, &guardian);

        let children = tree.node(id).unwrap().children().to_vec();
        assert_eq!(children.len(), 3);
        for (i, child) in children.iter().enumerate() {
            let child = tree.node(*child).unwrap();
            assert_eq!(child.name, format!("[{}]", i));
            // 要素は要素サイズずつずれる
            assert_eq!(
                child.location,
                Location::memory(AddressSpace::MainMemory, 0x100 + i as u32 * 2)
            );
        }
    }

    #[test]
    fn test_fetch_children_is_fetch_once() {
        let machine = TestMachine::new();
        let guardian = SymbolGuardian::new();
        let (mut tree, id) = tree_with_global(
            &guardian,
            TypeNode::Array {
                element_type: Box::new(builtin(BuiltinClass::Unsigned8)),
                element_count: 2,
            },
            0x100,
        );

        tree.fetch_children(id, &machine, &guardian);
        let first = tree.node(id).unwrap().children().to_vec();
        tree.fetch_children(id, &machine, &guardian);
        assert_eq!(tree.node(id).unwrap().children(), first.as_slice());

        // リセット後は再展開できる
        tree.reset_children(id);
        assert!(!tree.node(id).unwrap().children_fetched());
        tree.fetch_children(id, &machine, &guardian);
        assert_eq!(tree.node(id).unwrap().children().len(), 2);
    }

    #[test]
    fn test_struct_splices_base_class_fields() {
        let machine = TestMachine::new();
        let guardian = SymbolGuardian::new();
        let base = TypeNode::StructOrUnion {
            name: "Base".to_string(),
            size_bytes: 4,
            base_classes: Vec::new(),
            fields: vec![Field {
                name: "base_field".to_string(),
                offset_bytes: 0,
                node: builtin(BuiltinClass::Unsigned32),
            }],
        };
        let derived = TypeNode::StructOrUnion {
            name: "Derived".to_string(),
            size_bytes: 8,
            base_classes: vec![BaseClass {
                offset_bytes: 0,
                node: base,
            }],
            fields: vec![Field {
                name: "own_field".to_string(),
                offset_bytes: 4,
                node: builtin(BuiltinClass::Unsigned32),
            }],
        };
        let (mut tree, id) = tree_with_global(&guardian, derived, 0x200);

        tree.fetch_children(id, &machine, &guardian);
        let names: Vec<String> = tree
            .node(id)
            .unwrap()
            .children()
            .iter()
            .map(|c| tree.node(*c).unwrap().name.clone())
            .collect();
        // 基底クラスのフィールドが1段ネストせずに先頭へ継ぎ足される
        assert_eq!(names, vec!["base_field", "own_field"]);

        let base_field = tree.node(id).unwrap().children()[0];
        assert_eq!(
            tree.node(base_field).unwrap().location,
            Location::memory(AddressSpace::MainMemory, 0x200)
        );
    }

    #[test]
    fn test_pointer_expansion_checks_validity() {
        let machine = TestMachine::new();
        let guardian = SymbolGuardian::new();
        let pointer = TypeNode::PointerOrReference {
            value_type: Box::new(builtin(BuiltinClass::Unsigned8)),
        };
        let (mut tree, id) = tree_with_global(&guardian, pointer, 0x100);

        // 無効なアドレスを指すポインタは子を作らない
        machine.write32(AddressSpace::MainMemory, 0x100, 0xdead_0000);
        assert!(tree.has_children(id, &guardian));
        tree.fetch_children(id, &machine, &guardian);
        assert!(tree.node(id).unwrap().children().is_empty());

        // 有効なアドレスなら1つだけ作る
        tree.reset_children(id);
        machine.write32(AddressSpace::MainMemory, 0x100, 0x200);
        tree.fetch_children(id, &machine, &guardian);
        let children = tree.node(id).unwrap().children().to_vec();
        assert_eq!(children.len(), 1);
        let child = tree.node(children[0]).unwrap();
        assert_eq!(child.name, "*200");
        assert_eq!(
            child.location,
            Location::memory(AddressSpace::MainMemory, 0x200)
        );
    }

    #[test]
    fn test_value_round_trip_u16() {
        let machine = TestMachine::new();
        let guardian = SymbolGuardian::new();
        let (tree, id) = tree_with_global(&guardian, builtin(BuiltinClass::Unsigned16), 0x100);

        assert!(tree.write_value(id, "54321", &machine, &guardian));
        assert_eq!(
            tree.read_value(id, &machine, &guardian),
            Some(Value::Unsigned(54321))
        );
        // 幅を超える値は拒否され、何も書かれない
        assert!(!tree.write_value(id, "70000", &machine, &guardian));
        assert_eq!(
            tree.read_value(id, &machine, &guardian),
            Some(Value::Unsigned(54321))
        );
    }

    #[test]
    fn test_enum_format_and_write() {
        let machine = TestMachine::new();
        let guardian = SymbolGuardian::new();
        let node = TypeNode::Enum {
            constants: vec![(0, "OFF".to_string()), (7, "ON".to_string())],
        };
        let (tree, id) = tree_with_global(&guardian, node, 0x100);

        // インデックス1を選ぶと定数値7が書かれる
        assert!(tree.write_value(id, "1", &machine, &guardian));
        assert_eq!(machine.read32(AddressSpace::MainMemory, 0x100), 7);
        assert_eq!(
            tree.format_value(id, &machine, &guardian).as_deref(),
            Some("ON")
        );

        machine.write32(AddressSpace::MainMemory, 0x100, 3);
        assert_eq!(
            tree.format_value(id, &machine, &guardian).as_deref(),
            Some("3")
        );
    }

    #[test]
    fn test_liveness_by_program_counter() {
        let machine = TestMachine::new();
        let guardian = SymbolGuardian::new();
        let (mut tree, _) = tree_with_global(&guardian, builtin(BuiltinClass::Unsigned8), 0x100);
        let root = tree.root();
        let id = tree.add_child(
            root,
            InspectorNode::typed(
                "local",
                NodeHandle::temporary_root(Arc::new(builtin(BuiltinClass::Unsigned8))),
                Location::memory(AddressSpace::MainMemory, 0x104),
            )
            .with_live_range(0x1000, 0x1010),
        );

        machine.set_pc(Processor::Main, 0x1008);
        assert_eq!(tree.liveness(id, &machine), Liveness::Alive);
        machine.set_pc(Processor::Main, 0x1010);
        assert_eq!(tree.liveness(id, &machine), Liveness::Dead);

        // 生存区間がなければUnknown
        let plain = tree.add_child(
            root,
            InspectorNode::typed(
                "g2",
                NodeHandle::temporary_root(Arc::new(builtin(BuiltinClass::Unsigned8))),
                Location::memory(AddressSpace::MainMemory, 0x108),
            ),
        );
        assert_eq!(tree.liveness(plain, &machine), Liveness::Unknown);
    }

    #[test]
    fn test_change_type_temporarily_parse_first() {
        let machine = TestMachine::new();
        let guardian = SymbolGuardian::new();
        let (mut tree, id) = tree_with_global(
            &guardian,
            TypeNode::Array {
                element_type: Box::new(builtin(BuiltinClass::Unsigned8)),
                element_count: 2,
            },
            0x100,
        );
        tree.fetch_children(id, &machine, &guardian);
        assert_eq!(tree.node(id).unwrap().children().len(), 2);

        // パース失敗なら型も子もそのまま
        assert!(tree
            .change_type_temporarily(id, "NoSuchType", &guardian)
            .is_err());
        assert_eq!(tree.node(id).unwrap().children().len(), 2);

        // 成功したら子は破棄され、新しい型で展開し直せる
        tree.change_type_temporarily(id, "u16[4]", &guardian).unwrap();
        assert!(tree.node(id).unwrap().children().is_empty());
        tree.fetch_children(id, &machine, &guardian);
        assert_eq!(tree.node(id).unwrap().children().len(), 4);
    }

    #[test]
    fn test_stale_handle_degrades_to_no_value() {
        let machine = TestMachine::new();
        let guardian = SymbolGuardian::new();
        let (mut tree, id) = tree_with_global(&guardian, builtin(BuiltinClass::Unsigned32), 0x100);

        assert!(tree.read_value(id, &machine, &guardian).is_some());
        // データベースが丸ごと入れ替わると古いハンドルは何も指さなくなる
        guardian.swap(SymbolDatabase::default());
        assert!(tree.read_value(id, &machine, &guardian).is_none());
        tree.fetch_children(id, &machine, &guardian);
        assert!(tree.node(id).unwrap().children().is_empty());
    }

    #[test]
    fn test_alias_resolution_repoints_child_handles() {
        let machine = TestMachine::new();
        let guardian = SymbolGuardian::new();
        // Alias -> struct Inner { u8 a; } の連鎖を作る
        let (inner, alias) = guardian.read_write(|db| {
            let inner = db.data_types.add(DataType {
                name: "Inner".to_string(),
                node: TypeNode::StructOrUnion {
                    name: "Inner".to_string(),
                    size_bytes: 1,
                    base_classes: Vec::new(),
                    fields: vec![Field {
                        name: "a".to_string(),
                        offset_bytes: 0,
                        node: builtin(BuiltinClass::Unsigned8),
                    }],
                },
            });
            let alias = db.data_types.add(DataType {
                name: "Alias".to_string(),
                node: TypeNode::TypeName {
                    data_type: inner,
                    size_bytes: 1,
                },
            });
            (inner, alias)
        });

        let mut tree = InspectorTree::new();
        let root = tree.root();
        let id = tree.add_child(
            root,
            InspectorNode::typed(
                "v",
                NodeHandle::symbol_root(SymbolRef::DataType(alias)),
                Location::memory(AddressSpace::MainMemory, 0x100),
            ),
        );
        tree.fetch_children(id, &machine, &guardian);
        let child = tree.node(id).unwrap().children()[0];
        // 子ハンドルはエイリアスではなく実体シンボルを基点にする
        assert_eq!(
            tree.node(child).unwrap().type_handle.as_ref().unwrap().symbol(),
            Some(SymbolRef::DataType(inner))
        );
    }
}
