//! 型文字列のパース
//!
//! ノードの型を一時的に変更する際にユーザが入力する型文字列、例えば
//! `u32`、`Vec2*`、`s16[8]`、`char*[4]` をパースして型ノードを組み立て
//! ます。基本名にポインタ`*`・参照`&`・配列`[n]`の接尾辞を左から順に
//! 適用し、後の接尾辞ほど外側になります。

use thiserror::Error;

use crate::ast::{BuiltinClass, TypeNode};
use crate::database::SymbolDatabase;

/// 型文字列パースのエラー
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeStringError {
    #[error("empty type string")]
    Empty,
    #[error("unknown type name: {0}")]
    UnknownType(String),
    #[error("invalid array length: {0}")]
    InvalidArrayLength(String),
    #[error("unexpected character in type string: {0}")]
    UnexpectedCharacter(char),
    #[error("unterminated array suffix")]
    UnterminatedArray,
}

/// ビルトイン型の綴りを引く
fn builtin_from_name(name: &str) -> Option<BuiltinClass> {
    let class = match name {
        "u8" => BuiltinClass::Unsigned8,
        "s8" => BuiltinClass::Signed8,
        "char" => BuiltinClass::Unqualified8,
        "bool" => BuiltinClass::Bool8,
        "u16" => BuiltinClass::Unsigned16,
        "s16" => BuiltinClass::Signed16,
        "u32" => BuiltinClass::Unsigned32,
        "s32" => BuiltinClass::Signed32,
        "f32" => BuiltinClass::Float32,
        "u64" => BuiltinClass::Unsigned64,
        "s64" => BuiltinClass::Signed64,
        "f64" => BuiltinClass::Float64,
        _ => return None,
    };
    Some(class)
}

/// 型文字列をパースして型ノードを組み立てる
///
/// ビルトインの綴りはデータベースを引かずに直接認識します。それ以外の
/// 名前はデータベースのデータ型から検索し、見つからなければエラーです。
pub fn parse_type_string(
    input: &str,
    database: &SymbolDatabase,
) -> Result<TypeNode, TypeStringError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(TypeStringError::Empty);
    }

    let mut chars = input.char_indices().peekable();

    // 基本名: 英数字とアンダースコアの並び
    let mut name_end = 0;
    while let Some(&(i, c)) = chars.peek() {
        if c.is_alphanumeric() || c == '_' {
            name_end = i + c.len_utf8();
            chars.next();
        } else {
            break;
        }
    }
    let name = &input[..name_end];
    if name.is_empty() {
        // 入力は非空なので必ず名前以外の先頭文字がある
        return match chars.next() {
            Some((_, c)) => Err(TypeStringError::UnexpectedCharacter(c)),
            None => Err(TypeStringError::Empty),
        };
    }

    let mut node = match builtin_from_name(name) {
        Some(class) => TypeNode::Builtin { class },
        None => {
            let handle = database
                .lookup_data_type_by_name(name)
                .ok_or_else(|| TypeStringError::UnknownType(name.to_string()))?;
            let size_bytes = database
                .data_types
                .get(handle)
                .map(|dt| dt.node.size_bytes())
                .unwrap_or(0);
            TypeNode::TypeName {
                data_type: handle,
                size_bytes,
            }
        }
    };

    // 接尾辞を左から適用する
    while let Some((_, c)) = chars.next() {
        match c {
            '*' | '&' => {
                node = TypeNode::PointerOrReference {
                    value_type: Box::new(node),
                };
            }
            '[' => {
                let mut digits = String::new();
                let mut terminated = false;
                for (_, c) in chars.by_ref() {
                    if c == ']' {
                        terminated = true;
                        break;
                    }
                    digits.push(c);
                }
                if !terminated {
                    return Err(TypeStringError::UnterminatedArray);
                }
                let count: u32 = digits
                    .trim()
                    .parse()
                    .map_err(|_| TypeStringError::InvalidArrayLength(digits.clone()))?;
                node = TypeNode::Array {
                    element_type: Box::new(node),
                    element_count: count,
                };
            }
            c if c.is_whitespace() => {}
            c => return Err(TypeStringError::UnexpectedCharacter(c)),
        }
    }

    Ok(node)
}
