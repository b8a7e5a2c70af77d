//! Sumire ターゲットマシンアクセス
//!
//! このクレートは、エミュレートされたマシンへのデバッグアクセスを提供します。
//! アドレス空間の定義、位置（レジスタ／メモリ）の抽象化、命令デコード情報の
//! インターフェースなどを行います。CPUコア本体は外部コンポーネントであり、
//! `Machine`トレイト経由でのみ参照します。

pub mod space;
pub mod machine;
pub mod location;
pub mod opcode;
pub mod testing;

pub use space::{AddressSpace, Processor, RegisterClass};
pub use machine::{Machine, StackFrame};
pub use location::Location;
pub use opcode::{OpcodeDecoder, OpcodeInfo};

/// ターゲットアクセスの結果型
pub type Result<T> = anyhow::Result<T>;
