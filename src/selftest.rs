//! Built-in delegation scenarios, runnable from the CLI.
//!
//! Every scenario builds its classes from scratch, performs one access and
//! compares the repr of the outcome (or the error message) against a fixed
//! expectation.

use crate::core::error::DelegateError;
use crate::core::object::{Class, ClassAttr};
use crate::core::protocol;
use crate::core::value::{Args, Function, Value};
use crate::delegation::{Delegator, delegate};
use colored::Colorize;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug)]
enum Expected {
    Repr(&'static str),
    Error(&'static str),
}

impl Expected {
    fn render(self) -> String {
        match self {
            Expected::Repr(repr) => repr.to_string(),
            Expected::Error(msg) => format!("error: {msg}"),
        }
    }
}

pub struct Scenario {
    pub name: &'static str,
    pub summary: &'static str,
    expected: Expected,
    run: fn() -> Result<Value, DelegateError>,
}

pub const SCENARIOS: &[Scenario] = &[
    Scenario {
        name: "decorated_upper",
        summary: "decorator forwards upper() to attribute v",
        expected: Expected::Repr("'FOO'"),
        run: decorated_upper,
    },
    Scenario {
        name: "decorated_lower",
        summary: "stacked decorator forwards lower() to attribute v",
        expected: Expected::Repr("'foo'"),
        run: decorated_lower,
    },
    Scenario {
        name: "missing_member",
        summary: "member absent on the target names the target type",
        expected: Expected::Error("'str' object has no attribute 'wrong_method'"),
        run: missing_member,
    },
    Scenario {
        name: "missing_host_attribute",
        summary: "host attribute absent on the instance names the owner type",
        expected: Expected::Error("'Foo' object has no attribute 'not_an_attribute'"),
        run: missing_host_attribute,
    },
    Scenario {
        name: "property_read",
        summary: "non-callable member is returned as a value",
        expected: Expected::Repr("0"),
        run: property_read,
    },
    Scenario {
        name: "property_write_through",
        summary: "assignment reaches the target's property setter",
        expected: Expected::Repr("[2, 2, 2]"),
        run: property_write_through,
    },
    Scenario {
        name: "alias_discovery",
        summary: "member name discovered from the binding name",
        expected: Expected::Repr("'HELLO WORLD'"),
        run: alias_discovery,
    },
    Scenario {
        name: "len_protocol",
        summary: "__len__ bound to a delegator serves len()",
        expected: Expected::Repr("3"),
        run: len_protocol,
    },
    Scenario {
        name: "iter_protocol",
        summary: "__iter__ bound to a delegator serves iteration",
        expected: Expected::Repr("[2, 4, 6]"),
        run: iter_protocol,
    },
    Scenario {
        name: "explicit_alias",
        summary: "up forwards to upper",
        expected: Expected::Repr("'HELLO'"),
        run: explicit_alias,
    },
    Scenario {
        name: "self_delegation",
        summary: "'self' host forwards to another method of the instance",
        expected: Expected::Repr("'bar'"),
        run: self_delegation,
    },
    Scenario {
        name: "class_level_access",
        summary: "class access returns the delegator itself",
        expected: Expected::Repr("<delegator to 'v'.upper>"),
        run: class_level_access,
    },
    Scenario {
        name: "decorator_last_wins",
        summary: "outer decorator overwrites an inner one for the same name",
        expected: Expected::Repr("'SECOND'"),
        run: decorator_last_wins,
    },
    Scenario {
        name: "cache_survives_rebinding",
        summary: "discovered name stays fixed after the class is mutated",
        expected: Expected::Repr("'LATER'"),
        run: cache_survives_rebinding,
    },
    Scenario {
        name: "self_requires_member",
        summary: "Delegator('self') without a member is rejected",
        expected: Expected::Error("invalid delegator: Delegator('self') needs an explicit member"),
        run: self_requires_member,
    },
];

#[derive(Debug, Serialize)]
pub struct CaseReport {
    pub name: String,
    pub summary: String,
    pub passed: bool,
    pub expected: String,
    pub actual: String,
}

#[derive(Debug, Serialize)]
pub struct SelftestReport {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub cases: Vec<CaseReport>,
}

impl SelftestReport {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Runs every scenario whose name contains `filter` (all when `None`).
pub fn run(filter: Option<&str>) -> SelftestReport {
    let cases: Vec<CaseReport> = SCENARIOS
        .iter()
        .filter(|s| filter.is_none_or(|f| s.name.contains(f)))
        .map(run_one)
        .collect();
    let passed = cases.iter().filter(|c| c.passed).count();
    SelftestReport {
        total: cases.len(),
        passed,
        failed: cases.len() - passed,
        cases,
    }
}

fn run_one(scenario: &Scenario) -> CaseReport {
    let actual = match (scenario.run)() {
        Ok(value) => value.to_string(),
        Err(err) => format!("error: {err}"),
    };
    let expected = scenario.expected.render();
    tracing::debug!(scenario = scenario.name, %actual, "scenario finished");
    CaseReport {
        name: scenario.name.to_string(),
        summary: scenario.summary.to_string(),
        passed: actual == expected,
        expected,
        actual,
    }
}

pub fn render_text(report: &SelftestReport) -> String {
    let mut out = String::new();
    for case in &report.cases {
        if case.passed {
            out.push_str(&format!("{} {}: {}\n", "ok".green(), case.name, case.actual));
        } else {
            out.push_str(&format!(
                "{} {}: expected {}, got {}\n",
                "FAILED".red().bold(),
                case.name,
                case.expected,
                case.actual
            ));
        }
    }
    out.push_str(&format!(
        "{} passed, {} failed, {} total\n",
        report.passed, report.failed, report.total
    ));
    out
}

pub fn render_json(report: &SelftestReport) -> Result<String, DelegateError> {
    Ok(serde_json::to_string_pretty(report)?)
}

fn init_v(this: &Value, args: Args) -> Result<Value, DelegateError> {
    this.setattr("v", args.required(0, "v")?.clone())?;
    Ok(Value::None)
}

/// `Foo` decorated, innermost first, with a broken host, a broken member,
/// `lower` and `upper`.
fn decorated_foo() -> Result<Class, DelegateError> {
    Ok(Class::builder("Foo")
        .init(init_v)
        .decorated_with(delegate("not_an_attribute", &["wrong_attribute"])?)
        .decorated_with(delegate("v", &["wrong_method"])?)
        .decorated_with(delegate("v", &["lower"])?)
        .decorated_with(delegate("v", &["upper"])?)
        .build())
}

fn decorated_upper() -> Result<Value, DelegateError> {
    let foo = decorated_foo()?.instantiate(Args::positional(vec![Value::str("foo")]))?;
    foo.call_method("upper", Args::new())
}

fn decorated_lower() -> Result<Value, DelegateError> {
    let foo = decorated_foo()?.instantiate(Args::positional(vec![Value::str("FOO")]))?;
    foo.call_method("lower", Args::new())
}

fn missing_member() -> Result<Value, DelegateError> {
    let foo = decorated_foo()?.instantiate(Args::positional(vec![Value::str("foo")]))?;
    foo.call_method("wrong_method", Args::new())
}

fn missing_host_attribute() -> Result<Value, DelegateError> {
    let foo = decorated_foo()?.instantiate(Args::positional(vec![Value::str("foo")]))?;
    foo.call_method("wrong_attribute", Args::new())
}

fn bar_class() -> Class {
    let setter = Function::new("param", |this, args| {
        this.setattr("_param", args.required(0, "param")?.clone())?;
        Ok(Value::None)
    });
    Class::builder("Bar")
        .init(|this, _| {
            this.setattr("_param", Value::Int(0))?;
            Ok(Value::None)
        })
        .property("param", |this, _| this.getattr("_param"), Some(setter))
        .build()
}

fn foo2_instance() -> Result<Value, DelegateError> {
    let bar = bar_class();
    Class::builder("Foo2")
        .init(move |this, _| {
            this.setattr("v", bar.instantiate(Args::new())?)?;
            Ok(Value::None)
        })
        .decorated_with(delegate("v", &["param"])?)
        .build()
        .instantiate(Args::new())
}

fn property_read() -> Result<Value, DelegateError> {
    foo2_instance()?.getattr("param")
}

fn property_write_through() -> Result<Value, DelegateError> {
    let foo2 = foo2_instance()?;
    foo2.setattr("param", Value::Int(2))?;
    let bar = foo2.getattr("v")?;
    Ok(Value::list(vec![
        foo2.getattr("param")?,
        bar.getattr("param")?,
        bar.getattr("_param")?,
    ]))
}

/// `upper`, `__len__` and `__iter__` declared without member names.
fn container_foo() -> Result<Value, DelegateError> {
    Class::builder("Foo")
        .delegator("upper", Delegator::new("v", None)?)
        .delegator("__len__", Delegator::new("l", None)?)
        .delegator("__iter__", Delegator::new("l", None)?)
        .init(|this, args| {
            this.setattr("v", args.required(0, "v")?.clone())?;
            this.setattr("l", args.required(1, "l")?.clone())?;
            Ok(Value::None)
        })
        .build()
        .instantiate(Args::positional(vec![
            Value::str("hello world"),
            Value::list(vec![Value::Int(1), Value::Int(2), Value::Int(3)]),
        ]))
}

fn alias_discovery() -> Result<Value, DelegateError> {
    container_foo()?.call_method("upper", Args::new())
}

fn len_protocol() -> Result<Value, DelegateError> {
    let n = protocol::len(&container_foo()?)?;
    Ok(Value::Int(n as i64))
}

fn iter_protocol() -> Result<Value, DelegateError> {
    let doubled = protocol::iter(&container_foo()?)?
        .map(|x| {
            x.as_int().map(|n| Value::Int(n * 2)).ok_or_else(|| {
                DelegateError::TypeError(format!("expected int, got '{}'", x.type_name()))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::list(doubled))
}

fn explicit_alias() -> Result<Value, DelegateError> {
    Class::builder("Foo")
        .delegator("up", Delegator::new("v", Some("upper"))?)
        .init(init_v)
        .build()
        .instantiate(Args::positional(vec![Value::str("hello")]))?
        .call_method("up", Args::new())
}

fn self_delegation() -> Result<Value, DelegateError> {
    Class::builder("Foo")
        .delegator("foo", Delegator::new("self", Some("bar"))?)
        .method("bar", |_, _| Ok(Value::str("bar")))
        .build()
        .instantiate(Args::new())?
        .call_method("foo", Args::new())
}

fn class_level_access() -> Result<Value, DelegateError> {
    decorated_foo()?.getattr("upper")
}

fn decorator_last_wins() -> Result<Value, DelegateError> {
    Class::builder("Pair")
        .init(|this, args| {
            this.setattr("a", args.required(0, "a")?.clone())?;
            this.setattr("b", args.required(1, "b")?.clone())?;
            Ok(Value::None)
        })
        .decorated_with(delegate("a", &["upper"])?)
        .decorated_with(delegate("b", &["upper"])?)
        .build()
        .instantiate(Args::positional(vec![Value::str("first"), Value::str("second")]))?
        .call_method("upper", Args::new())
}

fn cache_survives_rebinding() -> Result<Value, DelegateError> {
    let class = Class::builder("Foo")
        .delegator("upper", Delegator::new("v", None)?)
        .init(init_v)
        .build();
    class
        .instantiate(Args::positional(vec![Value::str("first")]))?
        .call_method("upper", Args::new())?;

    if let Some(ClassAttr::Delegator(delegator)) = class.remove_attr("upper") {
        class.set_attr("shout", ClassAttr::Delegator(delegator));
    }
    class
        .instantiate(Args::positional(vec![Value::str("later")]))?
        .call_method("shout", Args::new())
}

fn self_requires_member() -> Result<Value, DelegateError> {
    Delegator::new("self", None).map(|d| Value::str(d.to_string()))
}
