mod argument;
mod parser;

pub use argument::{FuncArgs, KwArgs, PosArgs, PySetterValue};
pub use parser::{ArgParser, ParamDef, ParamKind};
