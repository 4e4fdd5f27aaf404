//! Binds call arguments to a declared signature: positional-only and
//! keyword-only windows, `*args`/`**kwargs` collectors, and defaults
//! written as source literals on individual parameters.

use super::argument::FuncArgs;
use crate::builtins::dict::PyDict;
use crate::builtins::tuple::PyTuple;
use crate::object::{PyObjectRef, PyPayload};
use crate::{Context, PyResult};
use itertools::Itertools;

/// How one parameter binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    PositionalOnly,
    PositionalOrKeyword,
    KeywordOnly,
    /// Collects trailing positionals into a tuple; closes off positional
    /// binding for every later parameter.
    VarPositional,
    /// Collects unmatched keywords into a dict.
    VarKeyword,
}

/// Declaration of one parameter in a definition table. `default` is a
/// source literal parsed when the parser is built.
#[derive(Debug, Clone, Copy)]
pub struct ParamDef {
    pub name: &'static str,
    pub kind: ParamKind,
    pub default: Option<&'static str>,
}

impl ParamDef {
    pub const fn positional(name: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::PositionalOrKeyword,
            default: None,
        }
    }

    pub const fn positional_only(name: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::PositionalOnly,
            default: None,
        }
    }

    pub const fn keyword_only(name: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::KeywordOnly,
            default: None,
        }
    }

    pub const fn var_positional(name: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::VarPositional,
            default: None,
        }
    }

    pub const fn var_keyword(name: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::VarKeyword,
            default: None,
        }
    }

    pub const fn with_default(mut self, literal: &'static str) -> Self {
        self.default = Some(literal);
        self
    }
}

struct ParamSlot {
    name: &'static str,
    kind: ParamKind,
    default: Option<PyObjectRef>,
}

/// A compiled signature. Built once per exposed method, used on every call.
pub struct ArgParser {
    fname: String,
    params: Box<[ParamSlot]>,
    /// Number of parameters bindable by position.
    pos_count: usize,
    posonly_count: usize,
    varargs: Option<usize>,
    varkw: Option<usize>,
}

impl ArgParser {
    pub fn new(fname: &str, defs: &[ParamDef], ctx: &Context) -> PyResult<Self> {
        let mut params = Vec::with_capacity(defs.len());
        let mut pos_count = 0;
        let mut posonly_count = 0;
        let mut varargs = None;
        let mut varkw = None;
        let mut positional_open = true;
        let mut kw_section = false;

        for (i, def) in defs.iter().enumerate() {
            match def.kind {
                ParamKind::PositionalOnly | ParamKind::PositionalOrKeyword => {
                    if !positional_open || kw_section {
                        return Err(ctx.new_type_error(format!(
                            "{fname}(): positional parameter '{}' after a collector",
                            def.name
                        )));
                    }
                    if def.kind == ParamKind::PositionalOnly {
                        if posonly_count != i {
                            return Err(ctx.new_type_error(format!(
                                "{fname}(): positional-only parameter '{}' out of order",
                                def.name
                            )));
                        }
                        posonly_count += 1;
                    }
                    pos_count += 1;
                }
                ParamKind::VarPositional => {
                    if varargs.is_some() || !positional_open {
                        return Err(ctx.new_type_error(format!(
                            "{fname}(): multiple positional collectors"
                        )));
                    }
                    varargs = Some(i);
                    positional_open = false;
                }
                ParamKind::KeywordOnly => {
                    kw_section = true;
                    positional_open = false;
                }
                ParamKind::VarKeyword => {
                    if varkw.is_some() {
                        return Err(ctx.new_type_error(format!(
                            "{fname}(): multiple keyword collectors"
                        )));
                    }
                    if i + 1 != defs.len() {
                        return Err(ctx.new_type_error(format!(
                            "{fname}(): keyword collector must be last"
                        )));
                    }
                    varkw = Some(i);
                }
            }
            let default = match def.default {
                Some(text) => Some(parse_literal(text, ctx)?),
                None => None,
            };
            params.push(ParamSlot {
                name: def.name,
                kind: def.kind,
                default,
            });
        }

        Ok(Self {
            fname: fname.to_owned(),
            params: params.into_boxed_slice(),
            pos_count,
            posonly_count,
            varargs,
            varkw,
        })
    }

    pub fn fname(&self) -> &str {
        &self.fname
    }

    /// Binds `args` to the signature, producing one value per declared
    /// parameter in declaration order.
    pub fn bind(&self, mut args: FuncArgs, ctx: &Context) -> PyResult<Vec<PyObjectRef>> {
        let n = self.params.len();
        let mut frame: Vec<Option<PyObjectRef>> = (0..n).map(|_| None).collect();
        let given = args.args.len();

        // Positional window.
        let take = given.min(self.pos_count);
        let mut positionals = std::mem::take(&mut args.args).into_iter();
        let mut slot = 0;
        for value in positionals.by_ref().take(take) {
            while !matches!(
                self.params[slot].kind,
                ParamKind::PositionalOnly | ParamKind::PositionalOrKeyword
            ) {
                slot += 1;
            }
            frame[slot] = Some(value);
            slot += 1;
        }
        let extra: Vec<PyObjectRef> = positionals.collect();
        if !extra.is_empty() {
            match self.varargs {
                Some(i) => {
                    frame[i] = Some(PyTuple::new(extra).into_ref().into_object());
                }
                None => {
                    return Err(ctx.new_type_error(format!(
                        "{}() takes {} positional argument{} but {} {} given",
                        self.fname,
                        self.pos_count,
                        if self.pos_count == 1 { "" } else { "s" },
                        given,
                        if given == 1 { "was" } else { "were" },
                    )));
                }
            }
        }

        // Keyword window.
        let mut posonly_violations = Vec::new();
        let mut kwdict: Option<Vec<(String, PyObjectRef)>> =
            self.varkw.map(|_| Vec::new());
        for (name, value) in args.kwargs.drain(..) {
            let found = self
                .params
                .iter()
                .position(|p| p.name == name.as_str());
            match found {
                Some(i)
                    if matches!(
                        self.params[i].kind,
                        ParamKind::PositionalOrKeyword | ParamKind::KeywordOnly
                    ) =>
                {
                    if frame[i].is_some() {
                        return Err(ctx.new_type_error(format!(
                            "{}() got multiple values for argument '{}'",
                            self.fname, name
                        )));
                    }
                    frame[i] = Some(value);
                }
                Some(i) if self.params[i].kind == ParamKind::PositionalOnly => {
                    // A positional-only name still lands in **kwargs when a
                    // collector is present.
                    match &mut kwdict {
                        Some(pairs) => pairs.push((name, value)),
                        None => posonly_violations.push(name),
                    }
                }
                _ => match &mut kwdict {
                    Some(pairs) => pairs.push((name, value)),
                    None => {
                        return Err(ctx.new_type_error(format!(
                            "{}() got an unexpected keyword argument '{}'",
                            self.fname, name
                        )));
                    }
                },
            }
        }
        if !posonly_violations.is_empty() {
            return Err(ctx.new_type_error(format!(
                "{}() got some positional-only arguments passed as keyword arguments: {}",
                self.fname,
                posonly_violations
                    .iter()
                    .map(|name| format!("'{name}'"))
                    .format(", ")
            )));
        }

        // Collectors and defaults.
        for (i, param) in self.params.iter().enumerate() {
            if frame[i].is_some() {
                continue;
            }
            frame[i] = Some(match param.kind {
                ParamKind::VarPositional => ctx.empty_tuple.clone().into_object(),
                ParamKind::VarKeyword => {
                    let dict = PyDict::default();
                    for (name, value) in kwdict.take().unwrap_or_default() {
                        dict.set_item(&name, value);
                    }
                    dict.into_ref().into_object()
                }
                _ => match &param.default {
                    Some(default) => default.clone(),
                    None => {
                        let kind = if param.kind == ParamKind::KeywordOnly {
                            "keyword-only"
                        } else {
                            "positional"
                        };
                        return Err(ctx.new_type_error(format!(
                            "{}() missing 1 required {} argument: '{}'",
                            self.fname, kind, param.name
                        )));
                    }
                },
            });
        }

        Ok(frame.into_iter().map(|v| v.unwrap()).collect())
    }
}

/// Parses the closed literal vocabulary allowed in parameter defaults.
fn parse_literal(text: &str, ctx: &Context) -> PyResult<PyObjectRef> {
    let trimmed = text.trim();
    let parsed = match trimmed {
        "None" => Some(ctx.none()),
        "True" => Some(ctx.new_bool(true)),
        "False" => Some(ctx.new_bool(false)),
        "()" => Some(ctx.empty_tuple.clone().into_object()),
        _ => {
            if (trimmed.starts_with('\'') && trimmed.ends_with('\'') && trimmed.len() >= 2)
                || (trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2)
            {
                let inner = &trimmed[1..trimmed.len() - 1];
                Some(ctx.new_str(inner).into_object())
            } else if let Ok(i) = trimmed.parse::<i64>() {
                Some(ctx.new_int(i))
            } else if let Ok(f) = trimmed.parse::<f64>() {
                Some(ctx.new_float(f).into_object())
            } else {
                None
            }
        }
    };
    parsed.ok_or_else(|| {
        ctx.new_value_error(format!("cannot parse default value {trimmed:?}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Context;
    use crate::builtins::pystr::PyStr;

    fn parser(ctx: &Context, defs: &[ParamDef]) -> ArgParser {
        ArgParser::new("f", defs, ctx).unwrap()
    }

    fn one_int(ctx: &Context, v: i64) -> FuncArgs {
        FuncArgs::from(vec![ctx.new_int(v)])
    }

    #[test]
    fn positional_only_and_keyword_only_with_default() {
        let ctx = Context::genesis();
        let defs = [
            ParamDef::positional_only("a"),
            ParamDef::keyword_only("b").with_default("None"),
        ];
        let p = parser(ctx, &defs);

        // f(1) -> a=1, b=None
        let frame = p.bind(one_int(ctx, 1), ctx).unwrap();
        assert!(frame[1].is(&ctx.none()));

        // f(1, b=2) -> a=1, b=2
        let args = FuncArgs::new(
            vec![ctx.new_int(1)],
            vec![("b".to_owned(), ctx.new_int(2))],
        );
        let frame = p.bind(args, ctx).unwrap();
        assert_eq!(
            crate::builtins::int::int_value(&frame[1]).unwrap(),
            2.into()
        );

        // f(1, 2) -> extra positional
        let err = p
            .bind(FuncArgs::from(vec![ctx.new_int(1), ctx.new_int(2)]), ctx)
            .unwrap_err();
        assert!(err.message().contains("positional argument"));

        // f(a=1) -> positional-only violated
        let args = FuncArgs::new(vec![], vec![("a".to_owned(), ctx.new_int(1))]);
        let err = p.bind(args, ctx).unwrap_err();
        assert!(err.message().contains("positional-only"));
    }

    #[test]
    fn collectors() {
        let ctx = Context::genesis();
        let defs = [
            ParamDef::positional("a"),
            ParamDef::var_positional("rest"),
            ParamDef::keyword_only("opt").with_default("'x'"),
            ParamDef::var_keyword("kw"),
        ];
        let p = parser(ctx, &defs);
        let args = FuncArgs::new(
            vec![ctx.new_int(1), ctx.new_int(2), ctx.new_int(3)],
            vec![("other".to_owned(), ctx.new_int(9))],
        );
        let frame = p.bind(args, ctx).unwrap();
        let rest = frame[1]
            .downcast_ref::<crate::builtins::tuple::PyTuple>()
            .unwrap();
        assert_eq!(rest.len(), 2);
        assert_eq!(frame[2].downcast_ref::<PyStr>().unwrap().as_str(), "x");
        let kw = frame[3]
            .downcast_ref::<crate::builtins::dict::PyDict>()
            .unwrap();
        assert!(kw.get_item("other").is_some());
    }

    #[test]
    fn missing_required_argument() {
        let ctx = Context::genesis();
        let p = parser(ctx, &[ParamDef::positional("a")]);
        let err = p.bind(FuncArgs::default(), ctx).unwrap_err();
        assert!(err.message().contains("missing 1 required positional"));
    }

    #[test]
    fn positional_after_collector_is_rejected() {
        let ctx = Context::genesis();
        let defs = [
            ParamDef::var_positional("rest"),
            ParamDef::positional("late"),
        ];
        assert!(ArgParser::new("f", &defs, ctx).is_err());
    }

    #[test]
    fn bad_default_literal_is_a_value_error() {
        let ctx = Context::genesis();
        let defs = [ParamDef::positional("a").with_default("{oops}")];
        let err = ArgParser::new("f", &defs, ctx).unwrap_err();
        assert!(err.typ().is(&ctx.exceptions.value_error));
    }
}
