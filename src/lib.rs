//! Declarative, tag-driven validation of structured records.
//!
//! Each field of a record carries a directive string:
//!
//! ```text
//! name=email, type=string, required, minLength=3
//! ```
//!
//! [`validate`] resolves every field's type (from the tag or the field's
//! declared type), checks the value against it, then runs the field's rules.
//! It returns every violation it finds in a [`Report`].
//!
//! ```
//! use vx::Value;
//!
//! vx::record! {
//!     struct Signup {
//!         #[vx = "name=email, required, minLength=5"]
//!         email: String,
//!         #[vx = "type=map[string]string"]
//!         meta: Value,
//!     }
//! }
//!
//! let report = vx::validate(&Signup { email: "a@b".into(), meta: Value::any_map(vec![]) });
//! assert!(report.well_formed());
//! assert_eq!(report.messages(), ["email: minLength: should have a minimum length of 5 but has 3"]);
//! ```
pub mod definition;
pub mod descriptor;
pub mod engine;
pub mod path_de;
pub mod record;
pub mod report;
pub mod rule;
pub mod tag;
pub mod value;

pub use definition::{DefinitionError, Definitions};
pub use descriptor::{Descriptor, PrimitiveKind};
pub use engine::{validate, Validator, ValidatorBuilder};
pub use record::{Field, Record, Reflect};
pub use report::{FieldPath, Phase, Problem, Report, ValidationError};
pub use rule::Rule;
pub use value::Value;
