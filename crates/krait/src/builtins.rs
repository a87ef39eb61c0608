use crate::{
    exceptions::{ExcType, RunResult},
    heap::Heap,
    io::PrintWriter,
    value::Value,
};

/// The builtin functions bound in the root environment.
///
/// Deliberately tiny: the language surface provides `len` and `print` plus
/// the `True`/`False`/`None` constants, which are plain root bindings rather
/// than builtins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Builtins {
    Len,
    Print,
}

impl Builtins {
    pub(crate) fn name(self) -> &'static str {
        match self {
            Self::Len => "len",
            Self::Print => "print",
        }
    }

    pub(crate) fn call(self, args: &[Value], heap: &mut Heap, print: &mut impl PrintWriter) -> RunResult<Value> {
        match self {
            Self::Len => {
                let [arg] = args else {
                    return Err(ExcType::type_error(format!(
                        "len() takes exactly one argument ({} given)",
                        args.len()
                    )));
                };
                match arg.py_len(heap) {
                    Some(len) => Ok(Value::Int(i64::try_from(len).unwrap_or(i64::MAX))),
                    None => Err(ExcType::type_error(format!(
                        "object of type '{}' has no len()",
                        arg.type_name(heap)
                    ))),
                }
            }
            Self::Print => {
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        print.stdout_push(' ');
                    }
                    print.stdout_write(&arg.py_str(heap));
                }
                print.stdout_push('\n');
                Ok(Value::None)
            }
        }
    }
}
