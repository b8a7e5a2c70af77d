//! 型グラフのノード定義
//!
//! シンボルデータベースに保持される型情報のAST。各ノードはビルトイン型、
//! ポインタ、配列、構造体などを表し、メモリツリー側はこのグラフを辿って
//! 子ノードを生成します。

use crate::database::{DataType, Handle};

/// ビルトイン型の分類
///
/// 値の読み書きとフォーマットは、バイトサイズではなくこの分類で決まります。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinClass {
    /// 符号なし8bit整数
    Unsigned8,
    /// 符号あり8bit整数
    Signed8,
    /// 符号性未指定の8bit（charなど）。符号なしとして扱う
    Unqualified8,
    /// 8bit真偽値
    Bool8,
    /// 符号なし16bit整数
    Unsigned16,
    /// 符号あり16bit整数
    Signed16,
    /// 符号なし32bit整数
    Unsigned32,
    /// 符号あり32bit整数
    Signed32,
    /// 32bit浮動小数点数
    Float32,
    /// 符号なし64bit整数
    Unsigned64,
    /// 符号あり64bit整数
    Signed64,
    /// 64bit浮動小数点数
    Float64,
}

impl BuiltinClass {
    /// この分類の値が占めるバイト数
    pub fn size_bytes(self) -> u32 {
        match self {
            BuiltinClass::Unsigned8
            | BuiltinClass::Signed8
            | BuiltinClass::Unqualified8
            | BuiltinClass::Bool8 => 1,
            BuiltinClass::Unsigned16 | BuiltinClass::Signed16 => 2,
            BuiltinClass::Unsigned32 | BuiltinClass::Signed32 | BuiltinClass::Float32 => 4,
            BuiltinClass::Unsigned64 | BuiltinClass::Signed64 | BuiltinClass::Float64 => 8,
        }
    }

    /// 表示用の型名
    pub fn name(self) -> &'static str {
        match self {
            BuiltinClass::Unsigned8 => "u8",
            BuiltinClass::Signed8 => "s8",
            BuiltinClass::Unqualified8 => "char",
            BuiltinClass::Bool8 => "bool",
            BuiltinClass::Unsigned16 => "u16",
            BuiltinClass::Signed16 => "s16",
            BuiltinClass::Unsigned32 => "u32",
            BuiltinClass::Signed32 => "s32",
            BuiltinClass::Float32 => "f32",
            BuiltinClass::Unsigned64 => "u64",
            BuiltinClass::Signed64 => "s64",
            BuiltinClass::Float64 => "f64",
        }
    }
}

/// 構造体の基底クラス
#[derive(Debug, Clone, PartialEq)]
pub struct BaseClass {
    /// 構造体先頭からのオフセット（バイト）
    pub offset_bytes: u32,
    /// 基底クラスの型ノード
    pub node: TypeNode,
}

/// 構造体のフィールド
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// フィールド名
    pub name: String,
    /// 構造体先頭からのオフセット（バイト）
    pub offset_bytes: u32,
    /// フィールドの型ノード
    pub node: TypeNode,
}

/// 型グラフのノード
#[derive(Debug, Clone, PartialEq)]
pub enum TypeNode {
    /// ビルトイン型
    Builtin {
        class: BuiltinClass,
    },
    /// 列挙型（32bit整数として読み書きする）
    Enum {
        /// (値, 名前) の組
        constants: Vec<(i32, String)>,
    },
    /// ポインタまたは参照型
    PointerOrReference {
        value_type: Box<TypeNode>,
    },
    /// メンバへのポインタ型（子を持たない）
    PointerToMember,
    /// 配列型
    Array {
        element_type: Box<TypeNode>,
        element_count: u32,
    },
    /// 構造体またはunion型
    StructOrUnion {
        name: String,
        size_bytes: u32,
        base_classes: Vec<BaseClass>,
        fields: Vec<Field>,
    },
    /// 名前付き型への参照（typedef等）
    TypeName {
        data_type: Handle<DataType>,
        size_bytes: u32,
    },
}

impl TypeNode {
    /// このノードが表す型のバイトサイズ
    ///
    /// ポインタ類と列挙型は32bitマシン上で4バイト固定です。
    pub fn size_bytes(&self) -> u32 {
        match self {
            TypeNode::Builtin { class } => class.size_bytes(),
            TypeNode::Enum { .. } => 4,
            TypeNode::PointerOrReference { .. } => 4,
            TypeNode::PointerToMember => 4,
            TypeNode::Array {
                element_type,
                element_count,
            } => element_type.size_bytes() * element_count,
            TypeNode::StructOrUnion { size_bytes, .. } => *size_bytes,
            TypeNode::TypeName { size_bytes, .. } => *size_bytes,
        }
    }

    /// 子ノードの正準的な並びから index 番目を取得する
    ///
    /// ポインタは0番に参照先、配列は0番に要素型、構造体は基底クラスを
    /// 先に並べてからフィールドを続けます。この並びがノードハンドルの
    /// パス解決の基準になります。
    pub fn child(&self, index: u32) -> Option<&TypeNode> {
        match self {
            TypeNode::PointerOrReference { value_type } => {
                (index == 0).then(|| value_type.as_ref())
            }
            TypeNode::Array { element_type, .. } => (index == 0).then(|| element_type.as_ref()),
            TypeNode::StructOrUnion {
                base_classes,
                fields,
                ..
            } => {
                let index = index as usize;
                if index < base_classes.len() {
                    Some(&base_classes[index].node)
                } else {
                    fields.get(index - base_classes.len()).map(|f| &f.node)
                }
            }
            _ => None,
        }
    }

    /// 列挙型の定数値から名前を引く
    pub fn enum_constant_name(&self, value: i32) -> Option<&str> {
        match self {
            TypeNode::Enum { constants } => constants
                .iter()
                .find(|(v, _)| *v == value)
                .map(|(_, name)| name.as_str()),
            _ => None,
        }
    }
}
