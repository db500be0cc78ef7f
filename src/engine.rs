//! The validation engine.
//!
//! One call walks four phases in order, never going back:
//!
//! 1. introspect: the input must be a record, otherwise one structural error.
//! 2. resolve: parse every tag, resolve every type, build every rule.
//!    Any schema error ends the call here with `well_formed = false`.
//! 3. type-match: check each present value against its resolved type.
//!    Any mismatch ends the call here (still well formed).
//! 4. rules: run every rule of every field, collecting all violations.
//!
//! A field holding a nested record is validated by calling the engine on
//! it; its errors are qualified with the field name and merged into the
//! phase they belong to, so the all-or-nothing phase rule holds across the
//! whole tree.
use tracing::{debug, debug_span, trace};

use crate::descriptor::{self, conform, Descriptor};
use crate::record::{introspect, FieldDescriptor, Reflect};
use crate::report::{FieldPath, Phase, Problem, Report, ValidationError};
use crate::rule::{Rule, RuleRegistry};
use crate::tag;
use crate::value::Value;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// Holds only immutable configuration, so one instance can serve any
/// number of threads.
#[derive(Clone, Debug, Default)]
pub struct Validator {
    rules: RuleRegistry,
}

#[derive(Debug, Default)]
pub struct ValidatorBuilder {
    rules: RuleRegistry,
}

/// Everything the later phases need to know about one field.
struct Plan<'a> {
    field: FieldDescriptor<'a>,
    ty: Descriptor,
    rules: Vec<Box<dyn Rule>>,
    nested: Option<Report>,
}

// ————————————————————————————————————————————————————————————————————————————
// ENTRY POINTS
// ————————————————————————————————————————————————————————————————————————————

/// Validate one record with the built-in rules.
pub fn validate<R: Reflect + ?Sized>(record: &R) -> Report {
    Validator::default().validate(record)
}

impl ValidatorBuilder {
    /// See [`RuleRegistry::register`].
    pub fn rule<F>(mut self, key: impl Into<String>, factory: F) -> Self
    where
        F: Fn(Option<&str>) -> Result<Box<dyn Rule>, String> + Send + Sync + 'static,
    {
        self.rules.register(key, factory);
        self
    }

    pub fn build(self) -> Validator {
        Validator { rules: self.rules }
    }
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> ValidatorBuilder {
        ValidatorBuilder::default()
    }

    pub fn validate<R: Reflect + ?Sized>(&self, record: &R) -> Report {
        self.validate_value(&record.reflect())
    }

    pub fn validate_value(&self, value: &Value) -> Report {
        // 1) introspect
        let introspection = match introspect(value) {
            Ok(x) => x,
            Err(error) => {
                debug!(kind = value.kind(), "input is not a record");
                return Report::new(false, vec![ValidationError::new(FieldPath::root(), error)]);
            }
        };
        let _span = debug_span!("validate", record = introspection.record).entered();

        // 2) resolve
        let mut errors = Vec::new();
        let plans = introspection
            .fields
            .into_iter()
            .map(|field| self.resolve_field(field, &mut errors))
            .collect::<Vec<_>>();
        for plan in &plans {
            merge_nested(plan, Phase::Schema, &mut errors);
        }
        if !errors.is_empty() {
            debug!(count = errors.len(), "schema errors, skipping type-match and rules");
            return Report::new(false, errors);
        }

        // 3) type-match
        for plan in &plans {
            type_match(plan, &mut errors);
            merge_nested(plan, Phase::TypeMatch, &mut errors);
        }
        if !errors.is_empty() {
            debug!(count = errors.len(), "type-match errors, skipping rules");
            return Report::new(true, errors);
        }

        // 4) rules
        for plan in &plans {
            for rule in &plan.rules {
                if let Some(problem) = rule.evaluate(plan.field.value, &plan.ty) {
                    trace!(field = %plan.field.name, rule = rule.name(), "rule failed");
                    errors.push(ValidationError::new(FieldPath::field(&plan.field.name), problem));
                }
            }
            merge_nested(plan, Phase::Rule, &mut errors);
        }
        debug!(count = errors.len(), "rules evaluated");
        Report::new(true, errors)
    }

    fn resolve_field<'a>(
        &self,
        field: FieldDescriptor<'a>,
        errors: &mut Vec<ValidationError>,
    ) -> Plan<'a> {
        let path = FieldPath::field(&field.name);
        let mut push = |problem: Problem| errors.push(ValidationError::new(path.clone(), problem));

        let parsed = tag::parse_with(field.tag, &|key| self.rules.contains(key));
        for error in parsed.errors {
            push(error.into());
        }

        if let Some(raw) = field.declared.find_unknown() {
            push(Problem::UnknownDeclared(raw.to_string()));
        }

        let ty = match parsed.directives.declared_type.as_deref() {
            None => field.declared.clone(),
            Some(text) => match descriptor::resolve(text) {
                Ok(tagged) => {
                    if let Some(raw) = tagged.find_unsupported() {
                        push(Problem::Unsupported(raw.to_string()));
                    } else if !field.declared.is_any() && tagged != *field.declared {
                        push(Problem::TagMismatch {
                            declared: field.declared.clone(),
                            tagged: tagged.clone(),
                        });
                    }
                    tagged
                }
                Err(error) => {
                    push(error.into());
                    Descriptor::Unknown(text.to_string())
                }
            },
        };

        let mut rules = Vec::with_capacity(parsed.directives.rules.len());
        for spec in &parsed.directives.rules {
            match self.rules.build(spec) {
                Ok(rule) => rules.push(rule),
                Err(problem) => push(problem),
            }
        }

        let nested = field
            .value
            .filter(|value| match (value, &ty) {
                (Value::Record(record), Descriptor::Record(name)) => record.name() == name,
                (Value::Record(_), Descriptor::Any) => true,
                _ => false,
            })
            .map(|value| self.validate_value(value));

        trace!(field = %field.name, ty = %ty, rules = rules.len(), nested = nested.is_some(), "resolved");
        Plan { field, ty, rules, nested }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// PHASE HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn type_match(plan: &Plan<'_>, errors: &mut Vec<ValidationError>) {
    let Some(value) = plan.field.value else { return };
    for mismatch in conform(&plan.ty, value) {
        errors.push(ValidationError::new(
            FieldPath::field(&plan.field.name).join(mismatch.at),
            mismatch.kind,
        ));
    }
}

/// Copy the nested report's errors of one phase, qualified by this field.
fn merge_nested(plan: &Plan<'_>, phase: Phase, errors: &mut Vec<ValidationError>) {
    let Some(nested) = &plan.nested else { return };
    for error in nested.errors() {
        let same_phase = error.phase() == phase
            || (phase == Phase::Schema && error.phase() == Phase::Structural);
        if same_phase {
            let mut error = error.clone();
            error.field.prefix(&plan.field.name);
            errors.push(error);
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
