use std::rc::Rc;

use indexmap::IndexMap;
use num_traits::{Signed, ToPrimitive};
use smallvec::SmallVec;

use crate::{
    exceptions::{ExcType, RunError, RunResult, SimpleException},
    expressions::{AugTarget, BoolOperator, ExceptHandler, Expr, ExprLoc, Literal, Node, UnpackTarget},
    function::Function,
    heap::{Heap, HeapData, HeapId},
    io::PrintWriter,
    namespace::{Scope, assign_name, lookup_name, unbind_name},
    types::{Class, Dict, DictKey, Instance, Set, lookup_class_attr},
    value::{Value, binary_op, compare_op, unary_invert, unary_minus, unary_plus},
};

/// Calls nested deeper than this raise `RuntimeError` instead of exhausting
/// the host stack.
const MAX_CALL_DEPTH: usize = 200;

/// The non-value result of executing a statement.
///
/// Every surrounding construct must propagate signals it does not recognize:
/// loops swallow `Break`/`Continue`, function calls swallow `Return`, and
/// raised exceptions travel on the error channel until an `except` matches.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Signal {
    Normal,
    Break,
    Continue,
    Return(Value),
}

/// The tree-walking evaluator.
///
/// Walks statements against a scope frame id, mutating the heap in place.
/// Single-threaded and synchronous; the only suspension point is the
/// implicit call stack.
pub(crate) struct Interp<'a, P: PrintWriter> {
    heap: &'a mut Heap,
    print: &'a mut P,
    /// The exception currently being handled, for bare `raise`.
    active_exception: Option<Value>,
    depth: usize,
}

impl<'a, P: PrintWriter> Interp<'a, P> {
    pub(crate) fn new(heap: &'a mut Heap, print: &'a mut P) -> Self {
        Self {
            heap,
            print,
            active_exception: None,
            depth: 0,
        }
    }

    pub(crate) fn exec_block(&mut self, nodes: &[Node], scope: HeapId) -> RunResult<Signal> {
        for node in nodes {
            match self.exec_node(node, scope)? {
                Signal::Normal => {}
                other => return Ok(other),
            }
        }
        Ok(Signal::Normal)
    }

    pub(crate) fn exec_node(&mut self, node: &Node, scope: HeapId) -> RunResult<Signal> {
        match node {
            Node::Pass => Ok(Signal::Normal),
            Node::Expr(expr) => {
                self.eval(expr, scope)?;
                Ok(Signal::Normal)
            }
            Node::Assign { targets, object } => {
                let value = self.eval(object, scope)?;
                for target in targets {
                    self.assign_target(target, value, scope)?;
                }
                Ok(Signal::Normal)
            }
            Node::OpAssign { target, op, object } => {
                match target {
                    AugTarget::Name(name) => {
                        let current = lookup_name(self.heap, scope, name).ok_or_else(|| ExcType::name_error(name))?;
                        let value = self.eval(object, scope)?;
                        let result = binary_op(*op, current, value, self.heap)?;
                        assign_name(self.heap, scope, name, result);
                    }
                    AugTarget::Attr { object: obj_expr, attr } => {
                        let obj = self.eval(obj_expr, scope)?;
                        let current = self.attr_get(obj, attr)?;
                        let value = self.eval(object, scope)?;
                        let result = binary_op(*op, current, value, self.heap)?;
                        self.attr_set(obj, attr, result)?;
                    }
                    AugTarget::Subscript { object: obj_expr, index } => {
                        let obj = self.eval(obj_expr, scope)?;
                        let idx = self.eval(index, scope)?;
                        let current = self.subscript_get(obj, idx)?;
                        let value = self.eval(object, scope)?;
                        let result = binary_op(*op, current, value, self.heap)?;
                        self.subscript_set(obj, idx, result)?;
                    }
                }
                Ok(Signal::Normal)
            }
            Node::Del { items } => {
                match items.as_slice() {
                    [single] => {
                        let Expr::Name(name) = &single.expr else {
                            return Err(ExcType::type_error("del() target must be a name"));
                        };
                        if !unbind_name(self.heap, scope, name) {
                            return Err(ExcType::name_error(name));
                        }
                    }
                    [container_expr, key_expr] => {
                        let container = self.eval(container_expr, scope)?;
                        let key = self.eval(key_expr, scope)?;
                        self.delete_item(container, key)?;
                    }
                    _ => return Err(ExcType::type_error("del() takes 1 or 2 arguments")),
                }
                Ok(Signal::Normal)
            }
            Node::If { test, body, or_else } => {
                let value = self.eval(test, scope)?;
                if value.py_truthy(self.heap) {
                    self.exec_block(body, scope)
                } else {
                    self.exec_block(or_else, scope)
                }
            }
            Node::While { test, body, or_else } => {
                loop {
                    let value = self.eval(test, scope)?;
                    if !value.py_truthy(self.heap) {
                        break;
                    }
                    match self.exec_block(body, scope)? {
                        Signal::Normal | Signal::Continue => {}
                        // A break ends the loop without running the else.
                        Signal::Break => return Ok(Signal::Normal),
                        ret @ Signal::Return(_) => return Ok(ret),
                    }
                }
                self.exec_block(or_else, scope)
            }
            Node::For {
                target,
                iter,
                body,
                or_else,
            } => {
                let iterable = self.eval(iter, scope)?;
                let items = self.iterate(iterable)?;
                for item in items {
                    self.assign_target(target, item, scope)?;
                    match self.exec_block(body, scope)? {
                        Signal::Normal | Signal::Continue => {}
                        Signal::Break => return Ok(Signal::Normal),
                        ret @ Signal::Return(_) => return Ok(ret),
                    }
                }
                self.exec_block(or_else, scope)
            }
            Node::Break => Ok(Signal::Break),
            Node::Continue => Ok(Signal::Continue),
            Node::Return(value) => {
                let result = match value {
                    Some(expr) => self.eval(expr, scope)?,
                    None => Value::None,
                };
                Ok(Signal::Return(result))
            }
            Node::FunctionDef(def) => {
                let mut params = Vec::with_capacity(def.params.len());
                for param in &def.params {
                    let default = match &param.default {
                        Some(expr) => Some(self.eval(expr, scope)?),
                        None => None,
                    };
                    params.push((param.name.clone(), default));
                }
                let func = Function {
                    name: def.name.clone(),
                    params,
                    body: Rc::clone(&def.body),
                    scope,
                };
                let id = self.heap.allocate(HeapData::Function(func));
                assign_name(self.heap, scope, &def.name, Value::Ref(id));
                Ok(Signal::Normal)
            }
            Node::ClassDef { name, base, body } => {
                let base_id = match base {
                    Some(expr) => {
                        let value = self.eval(expr, scope)?;
                        match value.ref_id() {
                            Some(id) if matches!(self.heap.get(id), HeapData::Class(_)) => Some(id),
                            _ => return Err(ExcType::type_error("class base must be a class")),
                        }
                    }
                    None => None,
                };
                // The class body runs in a fresh scope; its bindings become
                // the class attribute map.
                let class_scope = self.heap.allocate(HeapData::Scope(Scope::new_child(scope)));
                match self.exec_block(body, class_scope)? {
                    Signal::Normal => {}
                    _ => {
                        return Err(SimpleException::new_msg(ExcType::SyntaxError, "invalid statement in class body").into());
                    }
                }
                let vars = std::mem::take(&mut self.heap.scope_mut(class_scope).vars);
                let attrs: IndexMap<String, Value> = vars.into_iter().collect();
                let class_id = self.heap.allocate(HeapData::Class(Class {
                    name: name.clone(),
                    base: base_id,
                    attrs,
                }));
                assign_name(self.heap, scope, name, Value::Ref(class_id));
                Ok(Signal::Normal)
            }
            Node::Try {
                body,
                handlers,
                or_else,
                finally,
            } => {
                let mut outcome = match self.exec_block(body, scope) {
                    Err(err) => self.run_handlers(err, handlers, scope),
                    // The else clause runs iff the body completed normally.
                    Ok(Signal::Normal) => {
                        if or_else.is_empty() {
                            Ok(Signal::Normal)
                        } else {
                            self.exec_block(or_else, scope)
                        }
                    }
                    other => other,
                };
                if !finally.is_empty() {
                    // finally runs on every exit path; a non-normal outcome
                    // of the finally body replaces the pending one.
                    match self.exec_block(finally, scope) {
                        Ok(Signal::Normal) => {}
                        replacement => outcome = replacement,
                    }
                }
                outcome
            }
            Node::Raise(value) => match value {
                Some(expr) => {
                    let raised = self.eval(expr, scope)?;
                    Err(RunError::Raise(raised))
                }
                None => match self.active_exception {
                    Some(active) => Err(RunError::Raise(active)),
                    None => Err(SimpleException::new_msg(ExcType::RuntimeError, "No active exception to re-raise").into()),
                },
            },
            Node::Assert { test, msg } => {
                let value = self.eval(test, scope)?;
                if value.py_truthy(self.heap) {
                    return Ok(Signal::Normal);
                }
                match msg {
                    Some(expr) => {
                        let message = self.eval(expr, scope)?;
                        let text = message.py_str(self.heap);
                        Err(SimpleException::new_msg(ExcType::AssertionError, text).into())
                    }
                    None => Err(SimpleException::new(ExcType::AssertionError).into()),
                }
            }
            Node::Global { .. } => Err(ExcType::unimplemented()),
            Node::Import { modules } => {
                let (name, _) = modules.first().expect("import lists at least one module");
                Err(ExcType::module_not_found(name))
            }
            Node::ImportFrom { module, .. } => Err(ExcType::module_not_found(module)),
        }
    }

    pub(crate) fn eval(&mut self, expr: &ExprLoc, scope: HeapId) -> RunResult<Value> {
        match &expr.expr {
            Expr::Literal(literal) => Ok(match literal {
                Literal::Int(v) => Value::Int(*v),
                Literal::LongInt(big) => Value::Ref(self.heap.allocate(HeapData::LongInt(big.clone()))),
                Literal::Float(v) => Value::Float(*v),
                Literal::Str(s) => Value::Ref(self.heap.allocate(HeapData::Str(s.clone()))),
            }),
            Expr::Name(name) => lookup_name(self.heap, scope, name).ok_or_else(|| ExcType::name_error(name)),
            Expr::Tuple(elems) => {
                let values = self.eval_all(elems, scope)?;
                Ok(Value::Ref(self.heap.allocate(HeapData::Tuple(values))))
            }
            Expr::List(elems) => {
                let values = self.eval_all(elems, scope)?;
                Ok(Value::Ref(self.heap.allocate(HeapData::List(values))))
            }
            Expr::Set(elems) => {
                let values = self.eval_all(elems, scope)?;
                let mut set = Set::new();
                for value in values {
                    let key = DictKey::from_value(value, self.heap)?;
                    set.insert(key, value);
                }
                Ok(Value::Ref(self.heap.allocate(HeapData::Set(set))))
            }
            Expr::Dict(pairs) => {
                let mut dict = Dict::new();
                for (key_expr, value_expr) in pairs {
                    let key_value = self.eval(key_expr, scope)?;
                    let value = self.eval(value_expr, scope)?;
                    let key = DictKey::from_value(key_value, self.heap)?;
                    dict.insert(key, key_value, value);
                }
                Ok(Value::Ref(self.heap.allocate(HeapData::Dict(dict))))
            }
            Expr::Op { left, op, right } => {
                let lhs = self.eval(left, scope)?;
                let rhs = self.eval(right, scope)?;
                binary_op(*op, lhs, rhs, self.heap)
            }
            Expr::CmpOp { left, op, right } => {
                let lhs = self.eval(left, scope)?;
                let rhs = self.eval(right, scope)?;
                Ok(Value::Bool(compare_op(*op, lhs, rhs, self.heap)?))
            }
            Expr::ChainCmp { left, comparisons } => {
                // Interior operands evaluate once; the chain short-circuits
                // on the first false link.
                let mut current = self.eval(left, scope)?;
                for (op, rhs_expr) in comparisons {
                    let rhs = self.eval(rhs_expr, scope)?;
                    if !compare_op(*op, current, rhs, self.heap)? {
                        return Ok(Value::Bool(false));
                    }
                    current = rhs;
                }
                Ok(Value::Bool(true))
            }
            Expr::BoolOp { left, op, right } => {
                let lhs = self.eval(left, scope)?;
                let truthy = lhs.py_truthy(self.heap);
                match op {
                    // The determining operand is returned uncoerced.
                    BoolOperator::And if !truthy => Ok(lhs),
                    BoolOperator::Or if truthy => Ok(lhs),
                    _ => self.eval(right, scope),
                }
            }
            Expr::Not(operand) => {
                let value = self.eval(operand, scope)?;
                Ok(Value::Bool(!value.py_truthy(self.heap)))
            }
            Expr::UnaryMinus(operand) => {
                let value = self.eval(operand, scope)?;
                unary_minus(value, self.heap)
            }
            Expr::UnaryPlus(operand) => {
                let value = self.eval(operand, scope)?;
                unary_plus(value, self.heap)
            }
            Expr::UnaryInvert(operand) => {
                let value = self.eval(operand, scope)?;
                unary_invert(value, self.heap)
            }
            Expr::IfElse { test, body, orelse } => {
                let condition = self.eval(test, scope)?;
                if condition.py_truthy(self.heap) {
                    self.eval(body, scope)
                } else {
                    self.eval(orelse, scope)
                }
            }
            Expr::Call { callable, args } => {
                let callee = self.eval(callable, scope)?;
                let mut values: SmallVec<[Value; 4]> = SmallVec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg, scope)?);
                }
                self.call_value(callee, values)
            }
            Expr::AttrGet { object, attr } => {
                let obj = self.eval(object, scope)?;
                self.attr_get(obj, attr)
            }
            Expr::Subscript { object, index } => {
                let obj = self.eval(object, scope)?;
                let idx = self.eval(index, scope)?;
                self.subscript_get(obj, idx)
            }
            Expr::Slice { object, lower, upper } => {
                let obj = self.eval(object, scope)?;
                let lo = match lower {
                    Some(expr) => Some(self.eval(expr, scope)?),
                    None => None,
                };
                let hi = match upper {
                    Some(expr) => Some(self.eval(expr, scope)?),
                    None => None,
                };
                self.slice_get(obj, lo, hi)
            }
        }
    }

    fn eval_all(&mut self, exprs: &[ExprLoc], scope: HeapId) -> RunResult<Vec<Value>> {
        let mut values = Vec::with_capacity(exprs.len());
        for expr in exprs {
            values.push(self.eval(expr, scope)?);
        }
        Ok(values)
    }

    // --- assignment ---

    fn assign_target(&mut self, target: &UnpackTarget, value: Value, scope: HeapId) -> RunResult<()> {
        match target {
            UnpackTarget::Name(name) => {
                assign_name(self.heap, scope, name, value);
                Ok(())
            }
            UnpackTarget::Attr { object, attr } => {
                let obj = self.eval(object, scope)?;
                self.attr_set(obj, attr, value)
            }
            UnpackTarget::Subscript { object, index } => {
                let obj = self.eval(object, scope)?;
                let idx = self.eval(index, scope)?;
                self.subscript_set(obj, idx, value)
            }
            UnpackTarget::Slice { object, lower, upper } => {
                let obj = self.eval(object, scope)?;
                let lo = match lower {
                    Some(expr) => Some(self.eval(expr, scope)?),
                    None => None,
                };
                let hi = match upper {
                    Some(expr) => Some(self.eval(expr, scope)?),
                    None => None,
                };
                self.slice_set(obj, lo, hi, value)
            }
            UnpackTarget::Tuple(targets) => {
                let items = self.iterate(value)?;
                if items.len() != targets.len() {
                    return Err(ExcType::type_error(format!(
                        "cannot unpack {} values into {} targets",
                        items.len(),
                        targets.len()
                    )));
                }
                for (nested, item) in targets.iter().zip(items) {
                    self.assign_target(nested, item, scope)?;
                }
                Ok(())
            }
        }
    }

    // --- iteration ---

    /// Snapshots an iterable into a value list.
    ///
    /// Dicts yield `(key, value)` pair tuples; strings yield one-character
    /// strings. The snapshot means mutating the container inside the loop
    /// does not disturb iteration.
    fn iterate(&mut self, value: Value) -> RunResult<Vec<Value>> {
        enum Source {
            Items(Vec<Value>),
            Chars(Vec<String>),
            Pairs(Vec<(Value, Value)>),
        }
        let Value::Ref(id) = value else {
            return Err(ExcType::type_error(format!(
                "'{}' object is not iterable",
                value.type_name(self.heap)
            )));
        };
        let source = match self.heap.get(id) {
            HeapData::List(items) | HeapData::Tuple(items) => Source::Items(items.clone()),
            HeapData::Set(set) => Source::Items(set.iter().copied().collect()),
            HeapData::Str(s) => Source::Chars(s.chars().map(|c| c.to_string()).collect()),
            HeapData::Dict(dict) => Source::Pairs(dict.iter().map(|(_, entry)| (entry.key, entry.value)).collect()),
            _ => {
                return Err(ExcType::type_error(format!(
                    "'{}' object is not iterable",
                    value.type_name(self.heap)
                )));
            }
        };
        Ok(match source {
            Source::Items(items) => items,
            Source::Chars(chars) => chars
                .into_iter()
                .map(|c| Value::Ref(self.heap.allocate(HeapData::Str(c))))
                .collect(),
            Source::Pairs(pairs) => pairs
                .into_iter()
                .map(|(key, value)| Value::Ref(self.heap.allocate(HeapData::Tuple(vec![key, value]))))
                .collect(),
        })
    }

    // --- calling ---

    fn call_value(&mut self, callee: Value, args: SmallVec<[Value; 4]>) -> RunResult<Value> {
        enum CallKind {
            Func(Function),
            Method(Function, HeapId),
            Instantiate,
        }
        match callee {
            Value::Builtin(builtin) => builtin.call(&args, self.heap, self.print),
            Value::Ref(id) => {
                let kind = match self.heap.get(id) {
                    HeapData::Function(func) => CallKind::Func(func.clone()),
                    HeapData::BoundMethod { func, instance } => match self.heap.get(*func) {
                        HeapData::Function(f) => CallKind::Method(f.clone(), *instance),
                        _ => unreachable!("bound methods always wrap functions"),
                    },
                    HeapData::Class(_) => CallKind::Instantiate,
                    _ => {
                        return Err(ExcType::type_error(format!(
                            "'{}' object is not callable",
                            callee.type_name(self.heap)
                        )));
                    }
                };
                match kind {
                    CallKind::Func(func) => self.call_function(&func, None, args),
                    CallKind::Method(func, instance) => self.call_function(&func, Some(Value::Ref(instance)), args),
                    CallKind::Instantiate => self.instantiate(id, args),
                }
            }
            _ => Err(ExcType::type_error(format!(
                "'{}' object is not callable",
                callee.type_name(self.heap)
            ))),
        }
    }

    /// Instantiation: a fresh instance, then `__init__` bound and called if
    /// the class or an ancestor defines it.
    fn instantiate(&mut self, class_id: HeapId, args: SmallVec<[Value; 4]>) -> RunResult<Value> {
        let instance_id = self.heap.allocate(HeapData::Instance(Instance {
            class: class_id,
            attrs: IndexMap::new(),
        }));
        if let Some(init) = lookup_class_attr(self.heap, class_id, "__init__") {
            let func = match init.ref_id() {
                Some(fid) => match self.heap.get(fid) {
                    HeapData::Function(f) => Some(f.clone()),
                    _ => None,
                },
                None => None,
            };
            if let Some(func) = func {
                self.call_function(&func, Some(Value::Ref(instance_id)), args)?;
            }
        }
        Ok(Value::Ref(instance_id))
    }

    /// Positional binding: arguments left-to-right, remaining parameters take
    /// their defaults, anything else is a `TypeError`.
    fn call_function(
        &mut self,
        func: &Function,
        self_value: Option<Value>,
        mut args: SmallVec<[Value; 4]>,
    ) -> RunResult<Value> {
        if self.depth >= MAX_CALL_DEPTH {
            return Err(SimpleException::new_msg(ExcType::RuntimeError, "maximum recursion depth exceeded").into());
        }
        if let Some(instance) = self_value {
            args.insert(0, instance);
        }
        if args.len() > func.params.len() {
            return Err(ExcType::type_error(format!(
                "{}() takes {} positional arguments but {} were given",
                func.name,
                func.params.len(),
                args.len()
            )));
        }
        let call_scope = self.heap.allocate(HeapData::Scope(Scope::new_child(func.scope)));
        for (i, (name, default)) in func.params.iter().enumerate() {
            let value = match args.get(i) {
                Some(arg) => *arg,
                None => match default {
                    Some(value) => *value,
                    None => {
                        return Err(ExcType::type_error(format!(
                            "{}() missing required positional argument: '{name}'",
                            func.name
                        )));
                    }
                },
            };
            assign_name(self.heap, call_scope, name, value);
        }
        self.depth += 1;
        let result = self.exec_block(&func.body, call_scope);
        self.depth -= 1;
        match result? {
            Signal::Return(value) => Ok(value),
            Signal::Normal => Ok(Value::None),
            Signal::Break => Err(SimpleException::new_msg(ExcType::SyntaxError, "'break' outside loop").into()),
            Signal::Continue => {
                Err(SimpleException::new_msg(ExcType::SyntaxError, "'continue' not properly in loop").into())
            }
        }
    }

    // --- exceptions ---

    /// Tries each handler in order against the raised value; the first match
    /// runs and its outcome stands. No match re-propagates the original.
    fn run_handlers(&mut self, err: RunError, handlers: &[ExceptHandler], scope: HeapId) -> RunResult<Signal> {
        let raised = match &err {
            RunError::Raise(value) => *value,
            RunError::Exc(exc) => Value::Ref(self.heap.allocate(HeapData::Exception(exc.clone()))),
        };
        for handler in handlers {
            let matched = match &handler.test {
                None => true,
                Some(test_expr) => {
                    let test_value = self.eval(test_expr, scope)?;
                    test_value.py_eq(raised, self.heap)
                }
            };
            if matched {
                if let Some(name) = &handler.name {
                    assign_name(self.heap, scope, name, raised);
                }
                let saved = self.active_exception.replace(raised);
                let result = self.exec_block(&handler.body, scope);
                self.active_exception = saved;
                return result;
            }
        }
        Err(err)
    }

    // --- attributes ---

    fn attr_get(&mut self, obj: Value, attr: &str) -> RunResult<Value> {
        let Value::Ref(id) = obj else {
            return Err(ExcType::attribute_error(obj.type_name(self.heap), attr));
        };
        match self.heap.get(id) {
            HeapData::Instance(instance) => {
                if let Some(value) = instance.attrs.get(attr) {
                    return Ok(*value);
                }
                let class_id = instance.class;
                match lookup_class_attr(self.heap, class_id, attr) {
                    Some(value) => {
                        // A function read through an instance becomes bound.
                        if let Some(fid) = value.ref_id()
                            && matches!(self.heap.get(fid), HeapData::Function(_))
                        {
                            return Ok(Value::Ref(
                                self.heap.allocate(HeapData::BoundMethod { func: fid, instance: id }),
                            ));
                        }
                        Ok(value)
                    }
                    None => Err(ExcType::attribute_error(obj.type_name(self.heap), attr)),
                }
            }
            HeapData::Class(class) => {
                if attr == "__superclass__" {
                    return Ok(match class.base {
                        Some(base) => Value::Ref(base),
                        None => Value::None,
                    });
                }
                let class_name = class.name.clone();
                match lookup_class_attr(self.heap, id, attr) {
                    Some(value) => Ok(value),
                    None => Err(ExcType::attribute_error(class_name, attr)),
                }
            }
            _ => Err(ExcType::attribute_error(obj.type_name(self.heap), attr)),
        }
    }

    fn attr_set(&mut self, obj: Value, attr: &str, value: Value) -> RunResult<()> {
        if let Value::Ref(id) = obj {
            match self.heap.get_mut(id) {
                HeapData::Instance(instance) => {
                    instance.attrs.insert(attr.to_owned(), value);
                    return Ok(());
                }
                HeapData::Class(class) => {
                    class.attrs.insert(attr.to_owned(), value);
                    return Ok(());
                }
                _ => {}
            }
        }
        Err(ExcType::attribute_error(obj.type_name(self.heap), attr))
    }

    // --- subscripts and slices ---

    fn subscript_get(&mut self, obj: Value, index: Value) -> RunResult<Value> {
        let Value::Ref(id) = obj else {
            return Err(ExcType::type_error(format!(
                "'{}' object is not subscriptable",
                obj.type_name(self.heap)
            )));
        };
        // Missing dict keys read as None rather than raising.
        if matches!(self.heap.get(id), HeapData::Dict(_)) {
            let key = DictKey::from_value(index, self.heap)?;
            let HeapData::Dict(dict) = self.heap.get(id) else {
                unreachable!()
            };
            return Ok(dict.get(&key).unwrap_or(Value::None));
        }
        if let HeapData::Str(s) = self.heap.get(id) {
            let chars: Vec<char> = s.chars().collect();
            let i = normalize_index("string", index, chars.len(), self.heap)?;
            let text = chars[i].to_string();
            return Ok(Value::Ref(self.heap.allocate(HeapData::Str(text))));
        }
        match self.heap.get(id) {
            HeapData::List(items) => {
                let i = normalize_index("list", index, items.len(), self.heap)?;
                Ok(items[i])
            }
            HeapData::Tuple(items) => {
                let i = normalize_index("tuple", index, items.len(), self.heap)?;
                Ok(items[i])
            }
            _ => Err(ExcType::type_error(format!(
                "'{}' object is not subscriptable",
                obj.type_name(self.heap)
            ))),
        }
    }

    fn subscript_set(&mut self, obj: Value, index: Value, value: Value) -> RunResult<()> {
        let Value::Ref(id) = obj else {
            return Err(ExcType::type_error(format!(
                "'{}' object does not support item assignment",
                obj.type_name(self.heap)
            )));
        };
        if matches!(self.heap.get(id), HeapData::Dict(_)) {
            let key = DictKey::from_value(index, self.heap)?;
            let HeapData::Dict(dict) = self.heap.get_mut(id) else {
                unreachable!()
            };
            dict.insert(key, index, value);
            return Ok(());
        }
        if let HeapData::List(items) = self.heap.get(id) {
            let i = normalize_index("list", index, items.len(), self.heap)?;
            let HeapData::List(items) = self.heap.get_mut(id) else {
                unreachable!()
            };
            items[i] = value;
            return Ok(());
        }
        Err(ExcType::type_error(format!(
            "'{}' object does not support item assignment",
            obj.type_name(self.heap)
        )))
    }

    fn delete_item(&mut self, container: Value, key: Value) -> RunResult<()> {
        let Value::Ref(id) = container else {
            return Err(ExcType::type_error(format!(
                "'{}' object does not support deletion",
                container.type_name(self.heap)
            )));
        };
        if matches!(self.heap.get(id), HeapData::Dict(_)) {
            let dict_key = DictKey::from_value(key, self.heap)?;
            let HeapData::Dict(dict) = self.heap.get_mut(id) else {
                unreachable!()
            };
            // Removing an absent key is a no-op, matching missing-key reads.
            dict.remove(&dict_key);
            return Ok(());
        }
        if let HeapData::List(items) = self.heap.get(id) {
            let i = normalize_index("list", key, items.len(), self.heap)?;
            let HeapData::List(items) = self.heap.get_mut(id) else {
                unreachable!()
            };
            items.remove(i);
            return Ok(());
        }
        let attr = match key.ref_id() {
            Some(kid) => match self.heap.get(kid) {
                HeapData::Str(s) => Some(s.clone()),
                _ => None,
            },
            None => None,
        };
        if let Some(attr) = attr {
            match self.heap.get_mut(id) {
                HeapData::Instance(instance) => {
                    instance.attrs.shift_remove(&attr);
                    return Ok(());
                }
                HeapData::Class(class) => {
                    class.attrs.shift_remove(&attr);
                    return Ok(());
                }
                _ => {}
            }
        }
        Err(ExcType::type_error(format!(
            "'{}' object does not support deletion",
            container.type_name(self.heap)
        )))
    }

    fn slice_get(&mut self, obj: Value, lower: Option<Value>, upper: Option<Value>) -> RunResult<Value> {
        let Value::Ref(id) = obj else {
            return Err(ExcType::type_error(format!(
                "'{}' object is not subscriptable",
                obj.type_name(self.heap)
            )));
        };
        if let HeapData::Str(s) = self.heap.get(id) {
            let chars: Vec<char> = s.chars().collect();
            let (lo, hi) = clip_slice(lower, upper, chars.len(), self.heap)?;
            let text: String = chars[lo..hi].iter().collect();
            return Ok(Value::Ref(self.heap.allocate(HeapData::Str(text))));
        }
        if let HeapData::List(items) = self.heap.get(id) {
            let (lo, hi) = clip_slice(lower, upper, items.len(), self.heap)?;
            let slice = items[lo..hi].to_vec();
            return Ok(Value::Ref(self.heap.allocate(HeapData::List(slice))));
        }
        if let HeapData::Tuple(items) = self.heap.get(id) {
            let (lo, hi) = clip_slice(lower, upper, items.len(), self.heap)?;
            let slice = items[lo..hi].to_vec();
            return Ok(Value::Ref(self.heap.allocate(HeapData::Tuple(slice))));
        }
        Err(ExcType::type_error(format!(
            "'{}' object is not subscriptable",
            obj.type_name(self.heap)
        )))
    }

    /// List slice assignment replaces the clipped range with the elements of
    /// a list or tuple.
    fn slice_set(&mut self, obj: Value, lower: Option<Value>, upper: Option<Value>, value: Value) -> RunResult<()> {
        let replacement: Vec<Value> = match value.ref_id() {
            Some(vid) => match self.heap.get(vid) {
                HeapData::List(items) | HeapData::Tuple(items) => items.clone(),
                _ => {
                    return Err(ExcType::type_error(format!(
                        "can only assign a list or tuple to a slice, not '{}'",
                        value.type_name(self.heap)
                    )));
                }
            },
            None => {
                return Err(ExcType::type_error(format!(
                    "can only assign a list or tuple to a slice, not '{}'",
                    value.type_name(self.heap)
                )));
            }
        };
        let Value::Ref(id) = obj else {
            return Err(ExcType::type_error(format!(
                "'{}' object does not support item assignment",
                obj.type_name(self.heap)
            )));
        };
        if let HeapData::List(items) = self.heap.get(id) {
            let (lo, hi) = clip_slice(lower, upper, items.len(), self.heap)?;
            let HeapData::List(items) = self.heap.get_mut(id) else {
                unreachable!()
            };
            items.splice(lo..hi, replacement);
            return Ok(());
        }
        Err(ExcType::type_error(format!(
            "'{}' object does not support item assignment",
            obj.type_name(self.heap)
        )))
    }
}

/// Converts an index value to a usize offset, adjusting negative indices by
/// the length and raising the uniform `IndexError` when out of range.
fn normalize_index(container: &str, index: Value, len: usize, heap: &Heap) -> RunResult<usize> {
    let raw = match index {
        Value::Int(v) => v,
        Value::Bool(b) => i64::from(b),
        Value::Ref(id) if matches!(heap.get(id), HeapData::LongInt(_)) => {
            // Anything outside the i64 range is out of range for a real
            // container.
            return Err(ExcType::index_error());
        }
        _ => {
            return Err(ExcType::type_error(format!(
                "{container} indices must be integers, not '{}'",
                index.type_name(heap)
            )));
        }
    };
    let len = i64::try_from(len).unwrap_or(i64::MAX);
    let adjusted = if raw < 0 { raw + len } else { raw };
    if adjusted < 0 || adjusted >= len {
        return Err(ExcType::index_error());
    }
    Ok(usize::try_from(adjusted).expect("index is non-negative"))
}

/// Clips optional slice bounds to `[0, len]`, adjusting negatives by the
/// length; an inverted range is empty.
fn clip_slice(lower: Option<Value>, upper: Option<Value>, len: usize, heap: &Heap) -> RunResult<(usize, usize)> {
    let len = i64::try_from(len).unwrap_or(i64::MAX);
    let lo = slice_bound(lower, 0, len, heap)?;
    let hi = slice_bound(upper, len, len, heap)?.max(lo);
    Ok((
        usize::try_from(lo).expect("clipped bound is non-negative"),
        usize::try_from(hi).expect("clipped bound is non-negative"),
    ))
}

fn slice_bound(bound: Option<Value>, default: i64, len: i64, heap: &Heap) -> RunResult<i64> {
    let mut value = match bound {
        None => default,
        Some(Value::Int(v)) => v,
        Some(Value::Bool(b)) => i64::from(b),
        Some(Value::Ref(id)) => match heap.get(id) {
            // Slices clip rather than raise, so a big bound saturates.
            HeapData::LongInt(big) => match big.to_i64() {
                Some(v) => v,
                None if big.is_negative() => 0,
                None => len,
            },
            _ => return Err(ExcType::type_error("slice indices must be integers")),
        },
        Some(_) => return Err(ExcType::type_error("slice indices must be integers")),
    };
    if value < 0 {
        value += len;
    }
    Ok(value.clamp(0, len))
}
