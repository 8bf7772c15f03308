//! End-to-end scenarios spanning both runtime crates.

use pretty_assertions::assert_eq;
use rook_scope::{
    resolve_scoped_var, CodeRange, ExecResult, ExecSignal, Func, InitExec, NameSpaceId, NameSpaces,
    ScopeContext, Settings, ThreadState, VarLookup,
};
use rook_var::{ObjectRef, ScriptObject, VarArena, VarSettings};

#[test]
fn scoped_variable_read_and_reassignment() {
    let mut arena = VarArena::new();
    let mut spaces = NameSpaces::new();
    let root = spaces.root();
    let lib = spaces.insert_nested(root, Some("Lib"), false).unwrap();

    // Declare x in Lib and assign the integer 42.
    let settings = VarSettings::default();
    let x = spaces.declare_var(lib, "x", &mut arena).unwrap();
    arena.assign_int64(x, 42, &settings).unwrap();

    // From the root, Lib->x reaches the same cell.
    let ctx = ScopeContext::top_level(root);
    let through_path = resolve_scoped_var(&mut spaces, &ctx, "Lib->x", &mut arena).unwrap();
    assert_eq!(through_path, x);
    assert_eq!(arena.to_int64(through_path, false), 42);
    assert_eq!(arena.text(through_path, &settings), "42");

    // Reassign to a float; both views agree.
    arena.assign_double(through_path, 3.5, &settings).unwrap();
    assert_eq!(arena.to_double(x, false), 3.5);
    assert_eq!(arena.text(x, &settings), "3.500000");
}

/// Records which namespace each executed range belonged to.
struct RecordingExec {
    ran: Vec<(NameSpaceId, CodeRange)>,
    fail_on: Option<NameSpaceId>,
}

impl RecordingExec {
    fn new() -> Self {
        RecordingExec {
            ran: Vec::new(),
            fail_on: None,
        }
    }
}

impl InitExec for RecordingExec {
    fn run(&mut self, namespace: NameSpaceId, range: CodeRange, _vars: &mut VarArena) -> ExecResult {
        if self.fail_on == Some(namespace) {
            return Err(ExecSignal::Fail);
        }
        self.ran.push((namespace, range));
        Ok(())
    }
}

#[test]
fn auto_init_runs_children_before_parent() {
    let mut arena = VarArena::new();
    let mut spaces = NameSpaces::new();
    let root = spaces.root();
    let lib = spaces.insert_nested(root, Some("Lib"), false).unwrap();
    let deep = spaces.insert_nested(lib, Some("Deep"), false).unwrap();

    let range = |n| CodeRange { first: n, last: n };
    spaces.set_auto_init(root, range(0));
    spaces.set_auto_init(lib, range(1));
    spaces.set_auto_init(deep, range(2));

    let mut exec = RecordingExec::new();
    spaces.run_auto_init(root, &mut exec, &mut arena).unwrap();

    let order: Vec<NameSpaceId> = exec.ran.iter().map(|(ns, _)| *ns).collect();
    assert_eq!(order, [deep, lib, root]);
}

#[test]
fn auto_init_short_circuits_on_failure() {
    let mut arena = VarArena::new();
    let mut spaces = NameSpaces::new();
    let root = spaces.root();
    let a = spaces.insert_nested(root, Some("A"), false).unwrap();
    let b = spaces.insert_nested(root, Some("B"), false).unwrap();

    let range = CodeRange { first: 0, last: 0 };
    spaces.set_auto_init(root, range);
    spaces.set_auto_init(a, range);
    spaces.set_auto_init(b, range);

    let mut exec = RecordingExec::new();
    exec.fail_on = Some(a);
    let err = spaces.run_auto_init(root, &mut exec, &mut arena).unwrap_err();
    assert_eq!(err, ExecSignal::Fail);
    // Neither the later sibling nor the parent ran.
    assert!(exec.ran.is_empty());
}

#[test]
fn static_initializers_run_before_own_auto_init() {
    let mut arena = VarArena::new();
    let mut spaces = NameSpaces::new();
    let root = spaces.root();
    spaces.add_static_init(root, CodeRange { first: 10, last: 10 });
    spaces.add_static_init(root, CodeRange { first: 11, last: 11 });
    spaces.set_auto_init(root, CodeRange { first: 20, last: 25 });

    let mut exec = RecordingExec::new();
    spaces.run_auto_init(root, &mut exec, &mut arena).unwrap();
    let firsts: Vec<u32> = exec.ran.iter().map(|(_, r)| r.first).collect();
    assert_eq!(firsts, [10, 11, 20]);

    // Running again is a no-op.
    spaces.run_auto_init(root, &mut exec, &mut arena).unwrap();
    assert_eq!(exec.ran.len(), 3);
}

#[test]
fn teardown_releases_outer_objects_before_nested() {
    struct Tracker {
        label: &'static str,
        log: std::rc::Rc<std::cell::RefCell<Vec<&'static str>>>,
    }
    impl ScriptObject for Tracker {}
    impl Drop for Tracker {
        fn drop(&mut self) {
            self.log.borrow_mut().push(self.label);
        }
    }

    let log = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
    let mut arena = VarArena::new();
    let mut spaces = NameSpaces::new();
    let root = spaces.root();
    let lib = spaces.insert_nested(root, Some("Lib"), false).unwrap();

    let outer_var = spaces.declare_var(root, "outer_obj", &mut arena).unwrap();
    let nested_var = spaces.declare_var(lib, "nested_obj", &mut arena).unwrap();
    arena
        .assign_object(
            outer_var,
            ObjectRef::new(Tracker {
                label: "outer",
                log: log.clone(),
            }),
        )
        .unwrap();
    arena
        .assign_object(
            nested_var,
            ObjectRef::new(Tracker {
                label: "nested",
                log: log.clone(),
            }),
        )
        .unwrap();

    // Function statics are released too, between the two.
    let f = spaces
        .node_mut(root)
        .funcs
        .add(Func::new("holder", false))
        .unwrap();
    let ctx = ScopeContext::in_func(root, f);
    let static_var = spaces
        .find_or_add_var(&ctx, "kept", VarLookup::Local, &mut arena)
        .unwrap();
    arena.mark_static(static_var);
    arena
        .assign_object(
            static_var,
            ObjectRef::new(Tracker {
                label: "func_static",
                log: log.clone(),
            }),
        )
        .unwrap();

    spaces.release_var_objects(root, &mut arena);
    assert_eq!(log.borrow().as_slice(), ["outer", "func_static", "nested"]);
}

#[test]
fn namespace_settings_are_independent() {
    let mut spaces = NameSpaces::new();
    let root = spaces.root();
    let lib = spaces.insert_nested(root, Some("Lib"), false).unwrap();

    spaces.node_mut(lib).settings = Settings {
        launches_critical: true,
        peek_frequency: 9,
        ..Settings::default()
    };

    let root_thread = ThreadState::launched_in(spaces.active_settings(&ScopeContext::top_level(root)));
    let lib_thread = ThreadState::launched_in(spaces.active_settings(&ScopeContext::top_level(lib)));
    assert!(root_thread.allow_interrupt);
    assert!(lib_thread.critical);
    assert_eq!(lib_thread.peek_frequency, 9);
}
