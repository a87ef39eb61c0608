use std::{borrow::Cow, cmp::Ordering, fmt::Write};

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{ToPrimitive, Zero};

use crate::{
    builtins::Builtins,
    exceptions::{ExcType, RunError, RunResult},
    expressions::{CmpOperator, Operator},
    heap::{Heap, HeapData, HeapId},
    types::Type,
};

/// Containers nested deeper than this print as `...` instead of recursing.
const MAX_REPR_DEPTH: usize = 16;

/// Primary value type representing runtime objects.
///
/// Small immediate values are stored inline; everything else lives in the
/// heap arena and is referenced via `Ref(HeapId)`. `Value` is `Copy`, so
/// aliasing a list or dict copies the handle and mutation through any alias
/// is visible through all of them.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// A builtin function (`len`, `print`).
    Builtin(Builtins),
    Ref(HeapId),
}

impl Value {
    pub(crate) fn ref_id(self) -> Option<HeapId> {
        match self {
            Self::Ref(id) => Some(id),
            _ => None,
        }
    }

    pub(crate) fn py_type(self, heap: &Heap) -> Type {
        match self {
            Self::None => Type::NoneType,
            Self::Bool(_) => Type::Bool,
            Self::Int(_) => Type::Int,
            Self::Float(_) => Type::Float,
            Self::Builtin(_) => Type::BuiltinFunction,
            Self::Ref(id) => match heap.get(id) {
                HeapData::Str(_) => Type::Str,
                HeapData::LongInt(_) => Type::Int,
                HeapData::List(_) => Type::List,
                HeapData::Tuple(_) => Type::Tuple,
                HeapData::Set(_) => Type::Set,
                HeapData::Dict(_) => Type::Dict,
                HeapData::Function(_) => Type::Function,
                HeapData::BoundMethod { .. } => Type::BoundMethod,
                HeapData::Class(_) => Type::Class,
                HeapData::Instance(_) => Type::Instance,
                HeapData::Exception(_) => Type::Exception,
                HeapData::Scope(_) => unreachable!("scope frames are not values"),
            },
        }
    }

    /// The type name used in diagnostics; instances report their class name.
    pub(crate) fn type_name(self, heap: &Heap) -> Cow<'static, str> {
        if let Self::Ref(id) = self {
            match heap.get(id) {
                HeapData::Instance(instance) => {
                    if let HeapData::Class(class) = heap.get(instance.class) {
                        return Cow::Owned(class.name.clone());
                    }
                }
                HeapData::Exception(exc) => return Cow::Owned(exc.exc_type.to_string()),
                _ => {}
            }
        }
        Cow::Borrowed(self.py_type(heap).name())
    }

    /// Truthiness: `False`, `None`, zero, and empty containers are falsy.
    pub(crate) fn py_truthy(self, heap: &Heap) -> bool {
        match self {
            Self::None => false,
            Self::Bool(b) => b,
            Self::Int(v) => v != 0,
            Self::Float(v) => v != 0.0,
            Self::Builtin(_) => true,
            Self::Ref(id) => match heap.get(id) {
                HeapData::Str(s) => !s.is_empty(),
                HeapData::LongInt(big) => !big.is_zero(),
                HeapData::List(items) | HeapData::Tuple(items) => !items.is_empty(),
                HeapData::Set(set) => set.len() != 0,
                HeapData::Dict(dict) => dict.len() != 0,
                _ => true,
            },
        }
    }

    /// Element count for sized containers; strings count characters.
    pub(crate) fn py_len(self, heap: &Heap) -> Option<usize> {
        match self {
            Self::Ref(id) => match heap.get(id) {
                HeapData::Str(s) => Some(s.chars().count()),
                HeapData::List(items) | HeapData::Tuple(items) => Some(items.len()),
                HeapData::Set(set) => Some(set.len()),
                HeapData::Dict(dict) => Some(dict.len()),
                _ => None,
            },
            _ => None,
        }
    }

    /// Structural equality; never errors across types.
    ///
    /// Numeric values compare by value across int/float/bool; any other
    /// cross-type pairing is simply unequal.
    pub(crate) fn py_eq(self, other: Self, heap: &Heap) -> bool {
        if let (Some(a), Some(b)) = (as_num(self, heap), as_num(other, heap)) {
            return num_eq(&a, &b);
        }
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Builtin(a), Self::Builtin(b)) => a == b,
            (Self::Ref(a), Self::Ref(b)) => {
                if a == b {
                    return true;
                }
                match (heap.get(a), heap.get(b)) {
                    (HeapData::Str(x), HeapData::Str(y)) => x == y,
                    (HeapData::List(x), HeapData::List(y)) | (HeapData::Tuple(x), HeapData::Tuple(y)) => {
                        x.len() == y.len() && x.iter().zip(y).all(|(l, r)| l.py_eq(*r, heap))
                    }
                    (HeapData::Set(x), HeapData::Set(y)) => {
                        x.len() == y.len() && x.keys().all(|key| y.contains(key))
                    }
                    (HeapData::Dict(x), HeapData::Dict(y)) => {
                        x.len() == y.len()
                            && x.iter().all(|(key, entry)| match y.get(key) {
                                Some(value) => entry.value.py_eq(value, heap),
                                None => false,
                            })
                    }
                    (HeapData::Exception(x), HeapData::Exception(y)) => x == y,
                    _ => false,
                }
            }
            _ => false,
        }
    }

    /// Renders the value as the interactive prompt would echo it.
    pub(crate) fn py_repr(self, heap: &Heap) -> String {
        let mut out = String::new();
        self.repr_fmt(heap, &mut out, 0);
        out
    }

    /// `str()`-style rendering: strings are unquoted, all else as `repr`.
    pub(crate) fn py_str(self, heap: &Heap) -> String {
        if let Self::Ref(id) = self
            && let HeapData::Str(s) = heap.get(id)
        {
            return s.clone();
        }
        self.py_repr(heap)
    }

    fn repr_fmt(self, heap: &Heap, out: &mut String, depth: usize) {
        if depth > MAX_REPR_DEPTH {
            out.push_str("...");
            return;
        }
        match self {
            Self::None => out.push_str("None"),
            Self::Bool(true) => out.push_str("True"),
            Self::Bool(false) => out.push_str("False"),
            Self::Int(v) => {
                let _ = write!(out, "{v}");
            }
            Self::Float(v) => out.push_str(&float_repr(v)),
            Self::Builtin(b) => {
                let _ = write!(out, "<built-in function {}>", b.name());
            }
            Self::Ref(id) => match heap.get(id) {
                HeapData::Str(s) => string_repr_fmt(s, out),
                HeapData::LongInt(big) => {
                    let _ = write!(out, "{big}");
                }
                HeapData::List(items) => {
                    out.push('[');
                    for (i, item) in items.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        item.repr_fmt(heap, out, depth + 1);
                    }
                    out.push(']');
                }
                HeapData::Tuple(items) => {
                    out.push('(');
                    for (i, item) in items.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        item.repr_fmt(heap, out, depth + 1);
                    }
                    if items.len() == 1 {
                        out.push(',');
                    }
                    out.push(')');
                }
                HeapData::Set(set) => {
                    if set.len() == 0 {
                        out.push_str("set()");
                        return;
                    }
                    out.push('{');
                    for (i, item) in set.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        item.repr_fmt(heap, out, depth + 1);
                    }
                    out.push('}');
                }
                HeapData::Dict(dict) => {
                    out.push('{');
                    for (i, (_, entry)) in dict.iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        entry.key.repr_fmt(heap, out, depth + 1);
                        out.push_str(": ");
                        entry.value.repr_fmt(heap, out, depth + 1);
                    }
                    out.push('}');
                }
                HeapData::Function(func) => {
                    let _ = write!(out, "<function {}>", func.name);
                }
                HeapData::BoundMethod { func, instance } => {
                    let func_name = match heap.get(*func) {
                        HeapData::Function(f) => f.name.as_str(),
                        _ => "?",
                    };
                    let class_name = match heap.get(*instance) {
                        HeapData::Instance(inst) => match heap.get(inst.class) {
                            HeapData::Class(class) => class.name.as_str(),
                            _ => "?",
                        },
                        _ => "?",
                    };
                    let _ = write!(out, "<bound method {class_name}.{func_name}>");
                }
                HeapData::Class(class) => {
                    let _ = write!(out, "<class '{}'>", class.name);
                }
                HeapData::Instance(instance) => {
                    let class_name = match heap.get(instance.class) {
                        HeapData::Class(class) => class.name.as_str(),
                        _ => "?",
                    };
                    let _ = write!(out, "<{class_name} object>");
                }
                HeapData::Exception(exc) => {
                    let _ = write!(out, "{exc}");
                }
                HeapData::Scope(_) => out.push_str("<scope>"),
            },
        }
    }
}

/// Formats a float the way the prompt echoes it: shortest round-trip form,
/// always with a fractional part or exponent.
fn float_repr(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_owned();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_owned();
    }
    ryu::Buffer::new().format(value).to_owned()
}

/// Strings always render single-quoted, re-escaping the recognized escapes.
fn string_repr_fmt(s: &str, out: &mut String) {
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out.push('\'');
}

/// A numeric operand: bools read as ints, big ints are cloned out of the
/// heap for the duration of the operation.
enum Num {
    Int(i64),
    Big(BigInt),
    Float(f64),
}

impl Num {
    fn is_float(&self) -> bool {
        matches!(self, Self::Float(_))
    }

    fn is_zero(&self) -> bool {
        match self {
            Self::Int(v) => *v == 0,
            Self::Big(big) => big.is_zero(),
            Self::Float(v) => *v == 0.0,
        }
    }

    fn to_f64(&self) -> f64 {
        match self {
            Self::Int(v) => *v as f64,
            Self::Big(big) => big.to_f64().unwrap_or(f64::NAN),
            Self::Float(v) => *v,
        }
    }

    fn into_big(self) -> BigInt {
        match self {
            Self::Int(v) => BigInt::from(v),
            Self::Big(big) => big,
            Self::Float(_) => unreachable!("float operand in integer path"),
        }
    }
}

fn as_num(value: Value, heap: &Heap) -> Option<Num> {
    match value {
        Value::Bool(b) => Some(Num::Int(i64::from(b))),
        Value::Int(v) => Some(Num::Int(v)),
        Value::Float(v) => Some(Num::Float(v)),
        Value::Ref(id) => match heap.get(id) {
            HeapData::LongInt(big) => Some(Num::Big(big.clone())),
            _ => None,
        },
        _ => None,
    }
}

/// An integer operand for the bitwise operators, which reject floats.
enum IntOperand {
    Small(i64),
    Big(BigInt),
}

impl IntOperand {
    fn into_big(self) -> BigInt {
        match self {
            Self::Small(v) => BigInt::from(v),
            Self::Big(big) => big,
        }
    }
}

fn as_int(value: Value, heap: &Heap) -> Option<IntOperand> {
    match value {
        Value::Bool(b) => Some(IntOperand::Small(i64::from(b))),
        Value::Int(v) => Some(IntOperand::Small(v)),
        Value::Ref(id) => match heap.get(id) {
            HeapData::LongInt(big) => Some(IntOperand::Big(big.clone())),
            _ => None,
        },
        _ => None,
    }
}

/// Normalizes a big integer back to the i64 immediate when it fits.
pub(crate) fn int_value(big: BigInt, heap: &mut Heap) -> Value {
    match big.to_i64() {
        Some(v) => Value::Int(v),
        None => Value::Ref(heap.allocate(HeapData::LongInt(big))),
    }
}

fn num_eq(a: &Num, b: &Num) -> bool {
    if a.is_float() || b.is_float() {
        return a.to_f64() == b.to_f64();
    }
    match (a, b) {
        (Num::Int(x), Num::Int(y)) => x == y,
        (Num::Int(x), Num::Big(y)) => BigInt::from(*x) == *y,
        (Num::Big(x), Num::Int(y)) => *x == BigInt::from(*y),
        (Num::Big(x), Num::Big(y)) => x == y,
        _ => unreachable!("float operands handled above"),
    }
}

fn num_cmp(a: &Num, b: &Num) -> Option<Ordering> {
    if a.is_float() || b.is_float() {
        return a.to_f64().partial_cmp(&b.to_f64());
    }
    match (a, b) {
        (Num::Int(x), Num::Int(y)) => Some(x.cmp(y)),
        (Num::Int(x), Num::Big(y)) => Some(BigInt::from(*x).cmp(y)),
        (Num::Big(x), Num::Int(y)) => Some(x.cmp(&BigInt::from(*y))),
        (Num::Big(x), Num::Big(y)) => Some(x.cmp(y)),
        _ => unreachable!("float operands handled above"),
    }
}

/// Evaluates an arithmetic or bitwise binary operator.
///
/// `+` also concatenates strings, and concatenates lists/tuples producing
/// the same kind. `/` is truthful division and always yields a float.
/// Integer arithmetic promotes to a heap big integer on i64 overflow.
pub(crate) fn binary_op(op: Operator, left: Value, right: Value, heap: &mut Heap) -> RunResult<Value> {
    match op {
        Operator::BitAnd | Operator::BitOr => {
            if let (Some(a), Some(b)) = (as_int(left, heap), as_int(right, heap)) {
                return Ok(match (a, b) {
                    (IntOperand::Small(x), IntOperand::Small(y)) => match op {
                        Operator::BitAnd => Value::Int(x & y),
                        _ => Value::Int(x | y),
                    },
                    (a, b) => {
                        let (x, y) = (a.into_big(), b.into_big());
                        let big = match op {
                            Operator::BitAnd => x & y,
                            _ => x | y,
                        };
                        int_value(big, heap)
                    }
                });
            }
        }
        Operator::Add => {
            if let (Value::Ref(l), Value::Ref(r)) = (left, right) {
                let joined = match (heap.get(l), heap.get(r)) {
                    (HeapData::Str(a), HeapData::Str(b)) => Some(HeapData::Str(format!("{a}{b}"))),
                    (HeapData::List(a), HeapData::List(b)) => {
                        let mut items = a.clone();
                        items.extend_from_slice(b);
                        Some(HeapData::List(items))
                    }
                    (HeapData::Tuple(a), HeapData::Tuple(b)) => {
                        let mut items = a.clone();
                        items.extend_from_slice(b);
                        Some(HeapData::Tuple(items))
                    }
                    _ => None,
                };
                if let Some(data) = joined {
                    return Ok(Value::Ref(heap.allocate(data)));
                }
            }
            if let (Some(a), Some(b)) = (as_num(left, heap), as_num(right, heap)) {
                return numeric_op(op, a, b, heap);
            }
        }
        _ => {
            if let (Some(a), Some(b)) = (as_num(left, heap), as_num(right, heap)) {
                return numeric_op(op, a, b, heap);
            }
        }
    }
    Err(op_type_error(op, left, right, heap))
}

fn op_type_error(op: Operator, left: Value, right: Value, heap: &Heap) -> RunError {
    ExcType::type_error(format!(
        "unsupported operand type(s) for {}: '{}' and '{}'",
        op.symbol(),
        left.type_name(heap),
        right.type_name(heap)
    ))
}

fn numeric_op(op: Operator, lhs: Num, rhs: Num, heap: &mut Heap) -> RunResult<Value> {
    match op {
        Operator::Div => {
            if rhs.is_zero() {
                return Err(ExcType::zero_division(if rhs.is_float() {
                    "float division by zero"
                } else {
                    "division by zero"
                }));
            }
            Ok(Value::Float(lhs.to_f64() / rhs.to_f64()))
        }
        Operator::Add | Operator::Sub | Operator::Mult => {
            if lhs.is_float() || rhs.is_float() {
                let (a, b) = (lhs.to_f64(), rhs.to_f64());
                let result = match op {
                    Operator::Add => a + b,
                    Operator::Sub => a - b,
                    _ => a * b,
                };
                return Ok(Value::Float(result));
            }
            if let (Num::Int(a), Num::Int(b)) = (&lhs, &rhs) {
                let result = match op {
                    Operator::Add => a.checked_add(*b),
                    Operator::Sub => a.checked_sub(*b),
                    _ => a.checked_mul(*b),
                };
                if let Some(v) = result {
                    return Ok(Value::Int(v));
                }
            }
            let (a, b) = (lhs.into_big(), rhs.into_big());
            let big = match op {
                Operator::Add => a + b,
                Operator::Sub => a - b,
                _ => a * b,
            };
            Ok(int_value(big, heap))
        }
        Operator::Mod => {
            if lhs.is_float() || rhs.is_float() {
                let (a, b) = (lhs.to_f64(), rhs.to_f64());
                if b == 0.0 {
                    return Err(ExcType::zero_division("float modulo"));
                }
                return Ok(Value::Float(a - b * (a / b).floor()));
            }
            if rhs.is_zero() {
                return Err(ExcType::zero_division("integer modulo by zero"));
            }
            // Floor modulo: the result takes the divisor's sign.
            match (&lhs, &rhs) {
                (Num::Int(a), Num::Int(b)) => Ok(Value::Int(a.mod_floor(b))),
                _ => {
                    let (a, b) = (lhs.into_big(), rhs.into_big());
                    Ok(int_value(a.mod_floor(&b), heap))
                }
            }
        }
        Operator::BitAnd | Operator::BitOr => unreachable!("bitwise operators dispatch through as_int"),
    }
}

/// Evaluates a comparison operator to a boolean.
///
/// Equality never errors across types; ordering is defined within numbers
/// and within strings only. `in` / `not in` parse but are unevaluated.
pub(crate) fn compare_op(op: CmpOperator, left: Value, right: Value, heap: &Heap) -> RunResult<bool> {
    match op {
        CmpOperator::Eq => Ok(left.py_eq(right, heap)),
        CmpOperator::NotEq => Ok(!left.py_eq(right, heap)),
        CmpOperator::In | CmpOperator::NotIn => Err(ExcType::unimplemented()),
        CmpOperator::Lt | CmpOperator::LtE | CmpOperator::Gt | CmpOperator::GtE => {
            let ordering = ord_values(op, left, right, heap)?;
            Ok(match ordering {
                None => false,
                Some(ordering) => match op {
                    CmpOperator::Lt => ordering == Ordering::Less,
                    CmpOperator::LtE => ordering != Ordering::Greater,
                    CmpOperator::Gt => ordering == Ordering::Greater,
                    _ => ordering != Ordering::Less,
                },
            })
        }
    }
}

fn ord_values(op: CmpOperator, left: Value, right: Value, heap: &Heap) -> RunResult<Option<Ordering>> {
    if let (Some(a), Some(b)) = (as_num(left, heap), as_num(right, heap)) {
        return Ok(num_cmp(&a, &b));
    }
    if let (Value::Ref(l), Value::Ref(r)) = (left, right)
        && let (HeapData::Str(a), HeapData::Str(b)) = (heap.get(l), heap.get(r))
    {
        return Ok(Some(a.cmp(b)));
    }
    Err(ExcType::type_error(format!(
        "'{}' not supported between instances of '{}' and '{}'",
        op.symbol(),
        left.type_name(heap),
        right.type_name(heap)
    )))
}

/// Unary `-`: negates a number, promoting on i64 overflow.
pub(crate) fn unary_minus(value: Value, heap: &mut Heap) -> RunResult<Value> {
    match as_num(value, heap) {
        Some(Num::Int(v)) => match v.checked_neg() {
            Some(negated) => Ok(Value::Int(negated)),
            None => Ok(int_value(-BigInt::from(v), heap)),
        },
        Some(Num::Float(v)) => Ok(Value::Float(-v)),
        Some(Num::Big(big)) => Ok(int_value(-big, heap)),
        None => Err(ExcType::type_error(format!(
            "bad operand type for unary -: '{}'",
            value.type_name(heap)
        ))),
    }
}

/// Unary `+`: numbers pass through; bools become ints.
pub(crate) fn unary_plus(value: Value, heap: &mut Heap) -> RunResult<Value> {
    match as_num(value, heap) {
        Some(Num::Int(v)) => Ok(Value::Int(v)),
        Some(Num::Float(v)) => Ok(Value::Float(v)),
        Some(Num::Big(big)) => Ok(int_value(big, heap)),
        None => Err(ExcType::type_error(format!(
            "bad operand type for unary +: '{}'",
            value.type_name(heap)
        ))),
    }
}

/// Unary `~`: `~x == -x - 1`; integers only.
pub(crate) fn unary_invert(value: Value, heap: &mut Heap) -> RunResult<Value> {
    match as_int(value, heap) {
        Some(IntOperand::Small(v)) => Ok(Value::Int(!v)),
        Some(IntOperand::Big(big)) => Ok(int_value(-big - BigInt::from(1), heap)),
        None => Err(ExcType::type_error(format!(
            "bad operand type for unary ~: '{}'",
            value.type_name(heap)
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn str_value(heap: &mut Heap, s: &str) -> Value {
        Value::Ref(heap.allocate(HeapData::Str(s.to_owned())))
    }

    #[test]
    fn repr_of_immediates() {
        let heap = Heap::new();
        assert_eq!(Value::None.py_repr(&heap), "None");
        assert_eq!(Value::Bool(true).py_repr(&heap), "True");
        assert_eq!(Value::Int(-5).py_repr(&heap), "-5");
        assert_eq!(Value::Float(3.0).py_repr(&heap), "3.0");
        assert_eq!(Value::Float(4.8).py_repr(&heap), "4.8");
    }

    #[test]
    fn repr_escapes_strings() {
        let mut heap = Heap::new();
        let s = str_value(&mut heap, "'\"\n");
        assert_eq!(s.py_repr(&heap), "'\\'\"\\n'");
    }

    #[test]
    fn repr_of_one_element_tuple_has_trailing_comma() {
        let mut heap = Heap::new();
        let t = Value::Ref(heap.allocate(HeapData::Tuple(vec![Value::Int(3)])));
        assert_eq!(t.py_repr(&heap), "(3,)");
    }

    #[test]
    fn equality_is_numeric_across_int_and_float() {
        let heap = Heap::new();
        assert!(Value::Int(3).py_eq(Value::Float(3.0), &heap));
        assert!(Value::Bool(true).py_eq(Value::Int(1), &heap));
        assert!(!Value::Int(3).py_eq(Value::None, &heap));
    }

    #[test]
    fn division_is_always_float() {
        let mut heap = Heap::new();
        let result = binary_op(Operator::Div, Value::Int(9), Value::Int(3), &mut heap).unwrap();
        assert_eq!(result.py_repr(&heap), "3.0");
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let mut heap = Heap::new();
        let err = binary_op(Operator::Div, Value::Int(1), Value::Int(0), &mut heap).unwrap_err();
        match err {
            RunError::Exc(exc) => {
                assert_eq!(exc.exc_type, ExcType::ZeroDivisionError);
                assert_eq!(exc.message.as_deref(), Some("division by zero"));
            }
            RunError::Raise(_) => panic!("expected a built-in exception"),
        }
    }

    #[test]
    fn integer_overflow_promotes_to_big() {
        let mut heap = Heap::new();
        let result = binary_op(Operator::Mult, Value::Int(i64::MAX), Value::Int(2), &mut heap).unwrap();
        assert_eq!(result.py_repr(&heap), "18446744073709551614");
    }

    #[test]
    fn modulo_takes_divisor_sign() {
        let mut heap = Heap::new();
        let result = binary_op(Operator::Mod, Value::Int(-7), Value::Int(3), &mut heap).unwrap();
        assert_eq!(result.py_repr(&heap), "2");
    }

    #[test]
    fn invert_is_minus_x_minus_one() {
        let mut heap = Heap::new();
        for x in [-6i64, 0, 5] {
            let inverted = unary_invert(Value::Int(x), &mut heap).unwrap();
            assert!(inverted.py_eq(Value::Int(-x - 1), &heap));
        }
    }

    #[test]
    fn ordering_across_types_is_an_error() {
        let mut heap = Heap::new();
        let s = str_value(&mut heap, "a");
        let err = compare_op(CmpOperator::Lt, Value::Int(1), s, &heap).unwrap_err();
        assert!(matches!(err, RunError::Exc(e) if e.exc_type == ExcType::TypeError));
    }

    #[test]
    fn string_concatenation_allocates_a_new_string() {
        let mut heap = Heap::new();
        let a = str_value(&mut heap, "Hallo, ");
        let b = str_value(&mut heap, "Welt");
        let joined = binary_op(Operator::Add, a, b, &mut heap).unwrap();
        assert_eq!(joined.py_repr(&heap), "'Hallo, Welt'");
    }
}
