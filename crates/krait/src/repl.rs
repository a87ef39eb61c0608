//! Persistent REPL session support.
//!
//! `ReplSession` keeps interpreter state across `execute()` calls so
//! interactive chunks can share variables, functions, classes, and heap
//! objects.

use crate::{
    builtins::Builtins,
    exceptions::{ExcType, RunError, SimpleException},
    expressions::Node,
    heap::{Heap, HeapData, HeapId},
    io::PrintWriter,
    namespace::Scope,
    parse::parse,
    repl_error::ReplError,
    run::{Interp, Signal},
    value::Value,
};

/// A persistent session that executes chunks against accumulated state.
///
/// The session owns a long-lived heap whose global scope frame holds the
/// builtins and all top-level bindings. Each `execute()` call parses and
/// runs one chunk; a mark-sweep collection from the global scope runs after
/// every chunk, when no evaluation roots exist.
pub struct ReplSession {
    heap: Heap,
    /// The global scope frame: root of all lookups and the sole GC root.
    global: HeapId,
    script_name: String,
}

impl ReplSession {
    /// Creates a session with the root environment (`True`, `False`, `None`,
    /// `len`, `print`) already bound.
    #[must_use]
    pub fn new(script_name: &str) -> Self {
        let mut heap = Heap::new();
        let mut root = Scope::new_root();
        root.vars.insert("True".to_owned(), Value::Bool(true));
        root.vars.insert("False".to_owned(), Value::Bool(false));
        root.vars.insert("None".to_owned(), Value::None);
        root.vars.insert("len".to_owned(), Value::Builtin(Builtins::Len));
        root.vars.insert("print".to_owned(), Value::Builtin(Builtins::Print));
        let global = heap.allocate(HeapData::Scope(root));
        Self {
            heap,
            global,
            script_name: script_name.to_owned(),
        }
    }

    /// Script name used in diagnostics and by the driver.
    #[must_use]
    pub fn script_name(&self) -> &str {
        &self.script_name
    }

    /// Number of live heap objects, for observability and GC tests.
    #[must_use]
    pub fn live_objects(&self) -> usize {
        self.heap.live_objects()
    }

    /// Parses and executes one chunk against the persistent global scope.
    ///
    /// Returns the `repr` of the last top-level expression statement, or
    /// `None` when the chunk ends with a non-expression statement. Parse
    /// errors abort the chunk before evaluation; runtime errors leave any
    /// partial effects on the environment in place.
    pub fn execute(&mut self, source: &str, print: &mut impl PrintWriter) -> Result<Option<String>, ReplError> {
        let nodes = parse(source)?;
        let mut last: Option<Value> = None;
        let mut failure: Option<RunError> = None;
        let mut stray: Option<&'static str> = None;
        {
            let mut interp = Interp::new(&mut self.heap, print);
            for node in &nodes {
                let step = match node {
                    Node::Expr(expr) => match interp.eval(expr, self.global) {
                        Ok(value) => {
                            last = Some(value);
                            Ok(Signal::Normal)
                        }
                        Err(err) => Err(err),
                    },
                    _ => {
                        last = None;
                        interp.exec_node(node, self.global)
                    }
                };
                match step {
                    Ok(Signal::Normal) => {}
                    Ok(Signal::Break) => {
                        stray = Some("'break' outside loop");
                        break;
                    }
                    Ok(Signal::Continue) => {
                        stray = Some("'continue' not properly in loop");
                        break;
                    }
                    Ok(Signal::Return(_)) => {
                        stray = Some("'return' outside function");
                        break;
                    }
                    Err(err) => {
                        failure = Some(err);
                        break;
                    }
                }
            }
        }
        let result = if let Some(message) = stray {
            Err(ReplError::Runtime(SimpleException::new_msg(ExcType::SyntaxError, message)))
        } else if let Some(err) = failure {
            Err(self.render_failure(err))
        } else {
            Ok(last.map(|value| value.py_repr(&self.heap)))
        };
        // REPL idle: the global scope is the only root.
        self.heap.collect([self.global]);
        result
    }

    /// Renders an uncaught error, resolving raised values against the heap
    /// before collection can reclaim them.
    fn render_failure(&self, err: RunError) -> ReplError {
        match err {
            RunError::Exc(exc) => ReplError::Runtime(exc),
            RunError::Raise(value) => {
                if let Some(id) = value.ref_id()
                    && let HeapData::Exception(exc) = self.heap.get(id)
                {
                    return ReplError::Runtime(exc.clone());
                }
                ReplError::Raised(value.py_repr(&self.heap))
            }
        }
    }
}

impl std::fmt::Debug for ReplSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplSession")
            .field("script_name", &self.script_name)
            .field("live_objects", &self.live_objects())
            .finish_non_exhaustive()
    }
}
