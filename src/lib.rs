//! delegateto: attribute and method delegation for a dynamic object model.
//!
//! A class can declare that accessing a name on its instances is answered
//! by an attribute the instance holds:
//!
//! - [`delegation::Delegator`]: a class-level attribute that forwards to
//!   `instance.<host>.<member>`. With no member given, the member is named
//!   after the attribute the delegator is bound under (discovered on first
//!   access and cached). The host `"self"` forwards to the instance itself.
//! - [`delegation::delegate`]: a decorator installing one delegator per
//!   member name, applied once the class body is complete.
//!
//! Method-style members come back bound to the target, value-style members
//! come back as values and can be written through. Protocol hooks
//! (`__len__`, `__iter__`, `__contains__`, `__call__`) bound to delegators
//! serve the matching operators in [`core::protocol`].
//!
//! # Examples
//!
//! ```
//! use delegateto::core::value::{Args, Value};
//! use delegateto::core::object::Class;
//! use delegateto::delegation::{Delegator, delegate};
//!
//! let foo = Class::builder("Foo")
//!     .delegator("up", Delegator::new("v", Some("upper")).unwrap())
//!     .init(|this, args| {
//!         this.setattr("v", args.required(0, "v")?.clone())?;
//!         Ok(Value::None)
//!     })
//!     .decorated_with(delegate("v", &["lower"]).unwrap())
//!     .build();
//!
//! let obj = foo.instantiate(Args::positional(vec![Value::str("Hello")])).unwrap();
//! assert_eq!(obj.call_method("up", Args::new()).unwrap(), Value::str("HELLO"));
//! assert_eq!(obj.call_method("lower", Args::new()).unwrap(), Value::str("hello"));
//! ```
//!
//! # Crate Structure
//!
//! - [`core`]: object model (values, classes, instances, built-ins, protocol dispatch)
//! - [`delegation`]: the delegator and the decorator
//! - [`selftest`]: scenario catalogue behind `delegateto selftest`

pub mod core;
pub mod delegation;
pub mod selftest;

use crate::core::{error, logging};
use clap::{Parser, Subcommand};
use selftest::OutputFormat;

#[derive(Parser, Debug)]
#[clap(
    name = "delegateto",
    version = env!("CARGO_PKG_VERSION"),
    about = "Attribute and method delegation for a dynamic object model"
)]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace). DELEGATETO_LOG overrides.
    #[clap(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[clap(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct SelftestCli {
    /// Output format.
    #[clap(long, value_enum, default_value = "text")]
    format: OutputFormat,
    /// Only run scenarios whose name contains this string.
    #[clap(long)]
    filter: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the built-in delegation scenarios
    Selftest(SelftestCli),
    /// List the built-in scenarios
    List,
    /// Print the version
    Version,
}

pub fn run() -> Result<(), error::DelegateError> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Command::Version => {
            println!("v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Command::List => {
            for scenario in selftest::SCENARIOS {
                println!("{:<26} {}", scenario.name, scenario.summary);
            }
            Ok(())
        }
        Command::Selftest(args) => run_selftest(args),
    }
}

fn run_selftest(args: SelftestCli) -> Result<(), error::DelegateError> {
    let report = selftest::run(args.filter.as_deref());
    match args.format {
        OutputFormat::Text => print!("{}", selftest::render_text(&report)),
        OutputFormat::Json => println!("{}", selftest::render_json(&report)?),
    }
    if report.is_success() {
        Ok(())
    } else {
        Err(error::DelegateError::SelftestFailed {
            failed: report.failed,
            total: report.total,
        })
    }
}
