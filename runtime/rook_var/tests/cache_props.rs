//! Property tests: under arbitrary operation sequences, a cell's observable
//! text and numeric reads always agree with a plain-string model, no matter
//! which caches or pending renders are live inside.

use proptest::prelude::*;
use rook_var::{classify, FreeMode, NumKind, VarArena, VarSettings};

#[derive(Clone, Debug)]
enum Op {
    AssignInt(i64),
    AssignFloat(f64),
    AssignStr(String),
    Append(String),
    ReadText,
    ToInt,
    ToDouble,
    BlankKeep,
    BlankIfLarge,
    DisableCache,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<i64>().prop_map(Op::AssignInt),
        (-1.0e12..1.0e12f64).prop_map(Op::AssignFloat),
        "[ a-z0-9.+-]{0,40}".prop_map(Op::AssignStr),
        "[a-z0-9]{0,10}".prop_map(Op::Append),
        Just(Op::ReadText),
        Just(Op::ToInt),
        Just(Op::ToDouble),
        Just(Op::BlankKeep),
        Just(Op::BlankIfLarge),
        Just(Op::DisableCache),
    ]
}

/// What the cell's text must read as, ignoring all caching machinery.
fn model_text(model: &ModelVal, settings: &VarSettings) -> String {
    match model {
        ModelVal::Int(v) => rook_var::render_int(*v, &settings.format),
        ModelVal::Float(v) => rook_var::render_float(*v, &settings.format),
        ModelVal::Text(s) => s.clone(),
    }
}

#[derive(Clone, Debug)]
enum ModelVal {
    Int(i64),
    Float(f64),
    Text(String),
}

proptest! {
    #[test]
    fn reads_always_agree_with_string_model(ops in proptest::collection::vec(op_strategy(), 1..60)) {
        let settings = VarSettings::default();
        let mut arena = VarArena::new();
        let var = arena.alloc("v", false);
        let mut model = ModelVal::Text(String::new());
        let mut cache_disabled = false;

        for op in ops {
            match op {
                Op::AssignInt(v) => {
                    arena.assign_int64(var, v, &settings).unwrap();
                    model = ModelVal::Int(v);
                }
                Op::AssignFloat(v) => {
                    arena.assign_double(var, v, &settings).unwrap();
                    // Without a cache the value is pinned to its text form.
                    model = if cache_disabled {
                        ModelVal::Text(rook_var::render_float(v, &settings.format))
                    } else {
                        ModelVal::Float(v)
                    };
                }
                Op::AssignStr(s) => {
                    arena.assign_str(var, &s, &settings).unwrap();
                    model = ModelVal::Text(s);
                }
                Op::Append(s) => {
                    arena.append(var, &s, &settings).unwrap();
                    let mut t = model_text(&model, &settings);
                    t.push_str(&s);
                    model = ModelVal::Text(t);
                }
                Op::ReadText => {
                    prop_assert_eq!(arena.text(var, &settings), model_text(&model, &settings));
                }
                Op::ToInt => {
                    let expected = match &model {
                        ModelVal::Int(v) => *v,
                        ModelVal::Float(v) => *v as i64,
                        ModelVal::Text(s) => match classify(s) {
                            NumKind::Int(v) => v,
                            NumKind::Float(v) => v as i64,
                            NumKind::NotNumeric => 0,
                        },
                    };
                    prop_assert_eq!(arena.to_int64(var, false), expected);
                }
                Op::ToDouble => {
                    let expected = match &model {
                        ModelVal::Int(v) => *v as f64,
                        ModelVal::Float(v) => *v,
                        ModelVal::Text(s) => match classify(s) {
                            NumKind::Int(v) => v as f64,
                            NumKind::Float(v) => v,
                            NumKind::NotNumeric => 0.0,
                        },
                    };
                    prop_assert_eq!(arena.to_double(var, false), expected);
                }
                Op::BlankKeep => {
                    arena.free(var, FreeMode::Never, false);
                    model = ModelVal::Text(String::new());
                }
                Op::BlankIfLarge => {
                    arena.free(var, FreeMode::IfLarge, false);
                    model = ModelVal::Text(String::new());
                }
                Op::DisableCache => {
                    arena.disable_cache(var, &settings);
                    // From here on, reads reflect the written text exactly;
                    // a float's extra precision is gone for good.
                    model = ModelVal::Text(model_text(&model, &settings));
                    cache_disabled = true;
                }
            }
        }

        prop_assert_eq!(arena.text(var, &settings), model_text(&model, &settings));
    }
}
