use delegateto::core::error::DelegateError;
use delegateto::core::object::{Class, ClassAttr};
use delegateto::core::protocol;
use delegateto::core::value::{Args, Function, Value};
use delegateto::delegation::{Delegator, delegate};

fn foo_with_v(builder_name: &str) -> delegateto::core::object::ClassBuilder {
    Class::builder(builder_name).init(|this, args| {
        this.setattr("v", args.required(0, "v")?.clone())?;
        Ok(Value::None)
    })
}

fn make(class: &Class, v: &str) -> Value {
    class
        .instantiate(Args::positional(vec![Value::str(v)]))
        .expect("instantiate")
}

#[test]
fn installs_one_delegator_per_member() {
    let class = foo_with_v("Foo")
        .decorated_with(delegate("v", &["upper", "lower"]).expect("decorator"))
        .build();
    assert_eq!(class.attr_names(), vec!["__init__", "upper", "lower"]);

    let foo = make(&class, "MiXed");
    assert_eq!(
        foo.call_method("upper", Args::new()).expect("upper"),
        Value::str("MIXED")
    );
    assert_eq!(
        foo.call_method("lower", Args::new()).expect("lower"),
        Value::str("mixed")
    );
}

#[test]
fn installed_delegators_carry_their_member_name() {
    let class = Class::builder("Foo").build();
    delegate("v", &["upper"]).expect("decorator").apply(&class);
    match class.class_attr("upper") {
        Some(ClassAttr::Delegator(d)) => {
            assert_eq!(d.host(), "v");
            assert_eq!(d.member(), Some("upper"));
            assert!(!d.is_resolved());
        }
        other => panic!("expected delegator, got {other:?}"),
    }
}

#[test]
fn apply_mutates_the_class_in_place() {
    let class = foo_with_v("Foo").build();
    let alias = class.clone();
    let returned = delegate("v", &["upper"]).expect("decorator").apply(&class);

    assert!(returned.ptr_eq(&class));
    assert!(alias.has_attr("upper"));
    let foo = make(&alias, "abc");
    assert_eq!(
        foo.call_method("upper", Args::new()).expect("upper"),
        Value::str("ABC")
    );
}

#[test]
fn stacking_unions_distinct_names() {
    let class = foo_with_v("Foo")
        .decorated_with(delegate("v", &["upper"]).expect("inner"))
        .decorated_with(delegate("v", &["lower"]).expect("middle"))
        .decorated_with(delegate("v", &["strip"]).expect("outer"))
        .build();
    let foo = make(&class, "  Hi  ");
    assert_eq!(
        foo.call_method("strip", Args::new()).expect("strip"),
        Value::str("Hi")
    );
    assert_eq!(
        foo.call_method("upper", Args::new()).expect("upper"),
        Value::str("  HI  ")
    );
    assert_eq!(
        foo.call_method("lower", Args::new()).expect("lower"),
        Value::str("  hi  ")
    );
}

#[test]
fn last_applied_decorator_wins_for_duplicate_names() {
    let class = Class::builder("Pair")
        .init(|this, args| {
            this.setattr("a", args.required(0, "a")?.clone())?;
            this.setattr("b", args.required(1, "b")?.clone())?;
            Ok(Value::None)
        })
        .decorated_with(delegate("a", &["upper"]).expect("inner"))
        .decorated_with(delegate("b", &["upper"]).expect("outer"))
        .build();
    let pair = class
        .instantiate(Args::positional(vec![Value::str("first"), Value::str("second")]))
        .expect("instantiate");
    assert_eq!(
        pair.call_method("upper", Args::new()).expect("upper"),
        Value::str("SECOND")
    );
    assert_eq!(class.attr_names(), vec!["__init__", "upper"]);
}

#[test]
fn decorator_overrides_a_direct_declaration() {
    let class = foo_with_v("Foo")
        .delegator("upper", Delegator::new("v", Some("lower")).expect("delegator"))
        .decorated_with(delegate("v", &["upper"]).expect("decorator"))
        .build();
    let foo = make(&class, "Ab");
    assert_eq!(
        foo.call_method("upper", Args::new()).expect("upper"),
        Value::str("AB")
    );
}

#[test]
fn decorator_runs_after_the_body_regardless_of_builder_order() {
    let class = Class::builder("Foo")
        .decorated_with(delegate("v", &["upper"]).expect("decorator"))
        .method("upper", |_, _| Ok(Value::str("from body")))
        .init(|this, args| {
            this.setattr("v", args.required(0, "v")?.clone())?;
            Ok(Value::None)
        })
        .build();
    let foo = make(&class, "x");
    assert_eq!(
        foo.call_method("upper", Args::new()).expect("upper"),
        Value::str("X")
    );
}

#[test]
fn property_delegation_reads_and_writes() {
    let setter = Function::new("param", |this, args| {
        this.setattr("_param", args.required(0, "param")?.clone())?;
        Ok(Value::None)
    });
    let bar = Class::builder("Bar")
        .init(|this, _| {
            this.setattr("_param", Value::Int(0))?;
            Ok(Value::None)
        })
        .property("param", |this, _| this.getattr("_param"), Some(setter))
        .build();
    let foo2 = Class::builder("Foo2")
        .init(move |this, _| {
            this.setattr("v", bar.instantiate(Args::new())?)?;
            Ok(Value::None)
        })
        .decorated_with(delegate("v", &["param"]).expect("decorator"))
        .build();

    let obj = foo2.instantiate(Args::new()).expect("instantiate");
    assert_eq!(obj.getattr("param").expect("read"), Value::Int(0));

    obj.setattr("param", Value::Int(2)).expect("write");
    let inner = obj.getattr("v").expect("v");
    assert_eq!(obj.getattr("param").expect("param"), Value::Int(2));
    assert_eq!(inner.getattr("param").expect("v.param"), Value::Int(2));
    assert_eq!(inner.getattr("_param").expect("v._param"), Value::Int(2));
}

#[test]
fn protocol_names_work_through_the_decorator() {
    let class = Class::builder("Bag")
        .init(|this, args| {
            this.setattr("items", args.required(0, "items")?.clone())?;
            Ok(Value::None)
        })
        .decorated_with(delegate("items", &["__len__", "__iter__"]).expect("decorator"))
        .build();
    let bag = class
        .instantiate(Args::positional(vec![Value::list(vec![
            Value::str("x"),
            Value::str("y"),
        ])]))
        .expect("instantiate");
    assert_eq!(protocol::len(&bag).expect("len"), 2);
    let seen: Vec<Value> = protocol::iter(&bag).expect("iter").collect();
    assert_eq!(seen, vec![Value::str("x"), Value::str("y")]);
}

#[test]
fn failures_surface_only_on_access() {
    let class = foo_with_v("Foo")
        .decorated_with(delegate("not_an_attribute", &["wrong_attribute"]).expect("host"))
        .decorated_with(delegate("v", &["wrong_method"]).expect("member"))
        .build();
    let foo = make(&class, "foo");

    let err = foo.call_method("wrong_method", Args::new()).unwrap_err();
    assert!(matches!(err, DelegateError::MissingMember { .. }));
    assert_eq!(err.to_string(), "'str' object has no attribute 'wrong_method'");

    let err = foo.call_method("wrong_attribute", Args::new()).unwrap_err();
    assert!(matches!(err, DelegateError::MissingHostAttribute { .. }));
    assert_eq!(
        err.to_string(),
        "'Foo' object has no attribute 'not_an_attribute'"
    );
}

#[test]
fn class_access_returns_the_installed_delegator() {
    let class = Class::builder("Foo")
        .decorated_with(delegate("v", &["upper"]).expect("decorator"))
        .build();
    let found = class.getattr("upper").expect("class access");
    assert!(matches!(found, Value::Delegator(_)));
    assert_eq!(found.to_string(), "<delegator to 'v'.upper>");
}

#[test]
fn rejects_invalid_arguments() {
    for (host, members) in [("", vec!["x"]), ("v", vec![]), ("v", vec![""]), ("self", vec!["x"])] {
        assert!(
            matches!(
                delegate(host, &members),
                Err(DelegateError::InvalidDelegator(_))
            ),
            "delegate({host:?}, {members:?}) should be rejected"
        );
    }
}
