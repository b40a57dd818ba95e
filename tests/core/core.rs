use delegateto::core::error::DelegateError;
use delegateto::core::object::{Class, ClassAttr, Instance};
use delegateto::core::protocol;
use delegateto::core::value::{Args, Function, Value};
use std::cell::Cell;
use std::rc::Rc;

fn point_class() -> Class {
    Class::builder("Point")
        .init(|this, args| {
            this.setattr("x", args.required(0, "x")?.clone())?;
            this.setattr("y", args.required(1, "y")?.clone())?;
            Ok(Value::None)
        })
        .method("sum", |this, _| {
            let x = this.getattr("x")?.as_int().unwrap_or_default();
            let y = this.getattr("y")?.as_int().unwrap_or_default();
            Ok(Value::Int(x + y))
        })
        .value("dims", Value::Int(2))
        .build()
}

#[test]
fn instances_store_attributes_and_bind_methods() {
    let point = point_class()
        .instantiate(Args::positional(vec![Value::Int(3), Value::Int(4)]))
        .expect("instantiate");
    assert_eq!(point.getattr("x").expect("x"), Value::Int(3));
    assert_eq!(point.getattr("dims").expect("class value"), Value::Int(2));

    let sum = point.getattr("sum").expect("bound method");
    assert!(matches!(sum, Value::Method(_)));
    assert!(sum.is_callable());
    assert_eq!(sum.call(Args::new()).expect("call"), Value::Int(7));
}

#[test]
fn keyword_arguments_reach_init() {
    let point = point_class()
        .instantiate(
            Args::new()
                .with_keyword("x", Value::Int(1))
                .with_keyword("y", Value::Int(2)),
        )
        .expect("instantiate with keywords");
    assert_eq!(
        point.call_method("sum", Args::new()).expect("sum"),
        Value::Int(3)
    );
}

#[test]
fn instance_dict_shadows_plain_class_values() {
    let point = point_class()
        .instantiate(Args::positional(vec![Value::Int(0), Value::Int(0)]))
        .expect("instantiate");
    point.setattr("dims", Value::Int(3)).expect("shadow");
    assert_eq!(point.getattr("dims").expect("dims"), Value::Int(3));

    let class = point.as_instance().expect("instance").class().clone();
    assert_eq!(class.getattr("dims").expect("class dims"), Value::Int(2));
}

#[test]
fn missing_attribute_names_the_type() {
    let point = point_class()
        .instantiate(Args::positional(vec![Value::Int(0), Value::Int(0)]))
        .expect("instantiate");
    let err = point.getattr("z").unwrap_err();
    assert!(err.is_attribute_error());
    assert_eq!(err.to_string(), "'Point' object has no attribute 'z'");

    let err = Value::str("abc").getattr("nope").unwrap_err();
    assert_eq!(err.to_string(), "'str' object has no attribute 'nope'");
}

#[test]
fn missing_class_attribute_names_the_class() {
    let class = point_class();
    let err = class.getattr("z").unwrap_err();
    assert!(err.is_attribute_error());
    assert_eq!(err.to_string(), "type object 'Point' has no attribute 'z'");

    let err = Value::Class(class).getattr("z").unwrap_err();
    assert!(matches!(err, DelegateError::NoClassAttribute { .. }));
}

#[test]
fn class_level_method_access_is_unbound() {
    let class = point_class();
    let sum = class.getattr("sum").expect("function");
    assert!(matches!(sum, Value::Function(_)));

    let point = class
        .instantiate(Args::positional(vec![Value::Int(5), Value::Int(6)]))
        .expect("instantiate");
    assert_eq!(
        sum.call(Args::positional(vec![point])).expect("explicit receiver"),
        Value::Int(11)
    );
    assert!(matches!(
        sum.call(Args::new()),
        Err(DelegateError::TypeError(_))
    ));
}

#[test]
fn properties_read_and_write_through_setter() {
    let setter_calls = Rc::new(Cell::new(0));
    let calls = Rc::clone(&setter_calls);
    let setter = Function::new("celsius", move |this, args| {
        calls.set(calls.get() + 1);
        this.setattr("_c", args.required(0, "value")?.clone())?;
        Ok(Value::None)
    });
    let class = Class::builder("Thermo")
        .init(|this, _| {
            this.setattr("_c", Value::Int(20))?;
            Ok(Value::None)
        })
        .property("celsius", |this, _| this.getattr("_c"), Some(setter))
        .property("kelvin", |this, _| {
            let c = this.getattr("_c")?.as_int().unwrap_or_default();
            Ok(Value::Int(c + 273))
        }, None)
        .build();

    let thermo = class.instantiate(Args::new()).expect("instantiate");
    assert_eq!(thermo.getattr("celsius").expect("get"), Value::Int(20));
    thermo.setattr("celsius", Value::Int(25)).expect("set");
    assert_eq!(setter_calls.get(), 1);
    assert_eq!(thermo.getattr("kelvin").expect("kelvin"), Value::Int(298));

    let err = thermo.setattr("kelvin", Value::Int(0)).unwrap_err();
    assert!(matches!(err, DelegateError::ReadOnly { .. }));
    assert_eq!(err.to_string(), "'Thermo' object attribute 'kelvin' is read-only");
}

#[test]
fn set_attr_keeps_declaration_order() {
    let class = Class::builder("Ordered")
        .value("a", Value::Int(1))
        .value("b", Value::Int(2))
        .build();
    class.set_attr("a", ClassAttr::Value(Value::Int(10)));
    class.set_attr("c", ClassAttr::Value(Value::Int(3)));
    assert_eq!(class.attr_names(), vec!["a", "b", "c"]);
    assert_eq!(class.getattr("a").expect("a"), Value::Int(10));

    assert!(class.remove_attr("b").is_some());
    assert!(class.remove_attr("b").is_none());
    assert_eq!(class.attr_names(), vec!["a", "c"]);
}

#[test]
fn calling_a_non_callable_is_a_type_error() {
    let err = Value::Int(3).call(Args::new()).unwrap_err();
    assert!(matches!(err, DelegateError::NotCallable { .. }));
    assert_eq!(err.to_string(), "'int' object is not callable");

    let class = Class::builder("Plain").build();
    let plain = class.instantiate(Args::new()).expect("instantiate");
    assert!(!plain.is_callable());
    assert_eq!(
        plain.call(Args::new()).unwrap_err().to_string(),
        "'Plain' object is not callable"
    );
}

#[test]
fn constructor_without_init_rejects_arguments() {
    let class = Class::builder("Plain").build();
    let err = class
        .instantiate(Args::positional(vec![Value::Int(1)]))
        .unwrap_err();
    assert!(matches!(err, DelegateError::TypeError(_)));
}

#[test]
fn builtin_protocols() {
    let list = Value::list(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
    assert_eq!(protocol::len(&list).expect("len"), 3);
    assert_eq!(protocol::len(&Value::str("héllo")).expect("len"), 5);
    assert!(protocol::len(&Value::Int(1)).is_err());

    let items: Vec<Value> = protocol::iter(&list).expect("iter").collect();
    assert_eq!(items, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
    let chars: Vec<Value> = protocol::iter(&Value::str("ab")).expect("iter").collect();
    assert_eq!(chars, vec![Value::str("a"), Value::str("b")]);

    assert!(protocol::contains(&list, &Value::Int(2)).expect("contains"));
    assert!(!protocol::contains(&list, &Value::Int(9)).expect("contains"));
    assert!(protocol::contains(&Value::str("hello"), &Value::str("ell")).expect("substring"));
    assert!(protocol::contains(&Value::str("hello"), &Value::Int(1)).is_err());
}

#[test]
fn protocol_hooks_come_from_the_class_not_the_instance() {
    let class = Class::builder("Sized")
        .method("__len__", |_, _| Ok(Value::Int(4)))
        .build();
    let sized = class.instantiate(Args::new()).expect("instantiate");
    let inst: &Instance = sized.as_instance().expect("instance");
    inst.dict_set("__len__", Value::Int(99));
    assert_eq!(protocol::len(&sized).expect("len"), 4);

    let unsized_value = Class::builder("Unsized")
        .build()
        .instantiate(Args::new())
        .expect("instantiate");
    assert_eq!(
        protocol::len(&unsized_value).unwrap_err().to_string(),
        "object of type 'Unsized' has no len()"
    );
}

#[test]
fn instance_hooks_drive_iteration_membership_and_calls() {
    let class = Class::builder("Bag")
        .method("__iter__", |_, _| {
            Ok(Value::iterator(vec![Value::str("a"), Value::str("b")]))
        })
        .method("__call__", |_, args| Ok(Value::Int(args.len() as i64)))
        .build();
    let bag = class.instantiate(Args::new()).expect("instantiate");

    assert_eq!(protocol::iter(&bag).expect("iter").count(), 2);
    assert!(protocol::contains(&bag, &Value::str("b")).expect("fallback to iteration"));
    assert!(!protocol::contains(&bag, &Value::str("z")).expect("fallback to iteration"));
    assert!(bag.is_callable());
    assert_eq!(
        protocol::call(&bag, Args::positional(vec![Value::None, Value::None])).expect("call"),
        Value::Int(2)
    );
}

#[test]
fn iter_hook_must_return_an_iterator() {
    let class = Class::builder("Broken")
        .method("__iter__", |_, _| Ok(Value::list(vec![])))
        .build();
    let broken = class.instantiate(Args::new()).expect("instantiate");
    let err = protocol::iter(&broken).err().expect("non-iterator rejected");
    assert_eq!(
        err.to_string(),
        "iter() returned non-iterator of type 'list'"
    );
}

#[test]
fn value_repr_and_equality() {
    assert_eq!(Value::str("it's").to_string(), "'it\\'s'");
    assert_eq!(
        Value::list(vec![Value::Int(1), Value::str("a"), Value::None, Value::Bool(true)])
            .to_string(),
        "[1, 'a', None, True]"
    );
    let class = Class::builder("Foo").build();
    assert_eq!(Value::Class(class.clone()).to_string(), "<class 'Foo'>");

    let a = class.instantiate(Args::new()).expect("a");
    let b = class.instantiate(Args::new()).expect("b");
    assert_eq!(a.to_string(), "<Foo object>");
    assert_eq!(a, a.clone());
    assert_ne!(a, b);
    assert_eq!(Value::Bool(true), Value::Int(1));
}

#[test]
fn self_containing_lists_render_and_compare() {
    let a = Value::list(vec![Value::Int(1)]);
    a.call_method("append", Args::positional(vec![a.clone()]))
        .expect("append self");
    assert_eq!(a.to_string(), "[1, [...]]");
    assert_eq!(a, a.clone());

    let b = Value::list(vec![Value::Int(1)]);
    b.call_method("append", Args::positional(vec![b.clone()]))
        .expect("append self");
    assert_eq!(a, b);

    let c = Value::list(vec![Value::Int(2)]);
    c.call_method("append", Args::positional(vec![c.clone()]))
        .expect("append self");
    assert_ne!(a, c);

    let outer = Value::list(vec![a.clone(), a.clone()]);
    assert_eq!(outer.to_string(), "[[1, [...]], [1, [...]]]");
}
