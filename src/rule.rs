//! Rules: checks run against a field once its value is known to have the
//! right type.
//!
//! Built-ins are [`Required`] and [`MinLength`]. Hosts add their own through
//! a [`RuleRegistry`]; a registered key becomes a valid tag directive.
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::descriptor::Descriptor;
use crate::report::Problem;
use crate::tag::RuleSpec;
use crate::value::Value;

pub trait Rule: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    /// `declared` is the field's resolved type. `None` means no value.
    fn evaluate(&self, value: Option<&Value>, declared: &Descriptor) -> Option<Problem>;
}

// ————————————————————————————————————————————————————————————————————————————
// BUILT-INS
// ————————————————————————————————————————————————————————————————————————————

/// Fails on absent values, null and empty text. `0`, `false` and empty
/// containers are present values.
#[derive(Clone, Copy, Debug, Default)]
pub struct Required;

impl Rule for Required {
    fn name(&self) -> &str {
        "required"
    }

    fn evaluate(&self, value: Option<&Value>, _: &Descriptor) -> Option<Problem> {
        match value {
            None | Some(Value::Null) => Some(Problem::Required),
            Some(Value::String(s)) if s.is_empty() => Some(Problem::Required),
            Some(_) => None,
        }
    }
}

/// Minimum text length, in characters. Only for `string` or `any` fields;
/// anything else is reported rather than skipped.
#[derive(Clone, Copy, Debug)]
pub struct MinLength {
    pub min: usize,
}

impl Rule for MinLength {
    fn name(&self) -> &str {
        "minLength"
    }

    fn evaluate(&self, value: Option<&Value>, declared: &Descriptor) -> Option<Problem> {
        let value = value.filter(|v| !v.is_null())?;
        let not_text = || Problem::MinLengthNotText {
            actual: value
                .runtime_type()
                .map_or_else(|| value.kind().to_string(), |t| t.to_string()),
        };

        if !(declared.is_text() || declared.is_any()) {
            return Some(not_text());
        }
        let Some(text) = value.as_str() else {
            return Some(not_text());
        };
        let len = text.chars().count();
        (len < self.min).then_some(Problem::TooShort { min: self.min, actual: len })
    }
}

/// Adapts a closure into a [`Rule`]; its message becomes a
/// [`Problem::Custom`].
pub struct FnRule<F> {
    name: String,
    check: F,
}

pub fn from_fn<F>(name: impl Into<String>, check: F) -> FnRule<F>
where
    F: Fn(Option<&Value>, &Descriptor) -> Option<String> + Send + Sync,
{
    FnRule { name: name.into(), check }
}

impl<F> fmt::Debug for FnRule<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnRule").field("name", &self.name).finish_non_exhaustive()
    }
}

impl<F> Rule for FnRule<F>
where
    F: Fn(Option<&Value>, &Descriptor) -> Option<String> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, value: Option<&Value>, declared: &Descriptor) -> Option<Problem> {
        (self.check)(value, declared).map(|message| Problem::custom(&self.name, message))
    }
}

// ————————————————————————————————————————————————————————————————————————————
// REGISTRY
// ————————————————————————————————————————————————————————————————————————————

/// Builds a rule from the directive's literal argument (`key=arg`).
pub type RuleFactory = dyn Fn(Option<&str>) -> Result<Box<dyn Rule>, String> + Send + Sync;

#[derive(Clone, Default)]
pub struct RuleRegistry {
    factories: IndexMap<String, Arc<RuleFactory>>,
}

impl RuleRegistry {
    /// Register a host rule under `key`. Built-in directive keys are parsed
    /// before the registry is consulted, so they cannot be shadowed.
    pub fn register<F>(&mut self, key: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(Option<&str>) -> Result<Box<dyn Rule>, String> + Send + Sync + 'static,
    {
        self.factories.insert(key.into(), Arc::new(factory));
        self
    }

    pub fn contains(&self, key: &str) -> bool {
        self.factories.contains_key(key)
    }

    pub fn build(&self, spec: &RuleSpec) -> Result<Box<dyn Rule>, Problem> {
        match spec {
            RuleSpec::Required => Ok(Box::new(Required)),
            RuleSpec::MinLength(min) => Ok(Box::new(MinLength { min: *min })),
            RuleSpec::Custom { key, arg } => {
                let factory = self.factories.get(key).ok_or_else(|| Problem::InvalidRule {
                    rule: key.clone(),
                    reason: "no such rule is registered".to_string(),
                })?;
                factory(arg.as_deref()).map_err(|reason| Problem::InvalidRule {
                    rule: key.clone(),
                    reason,
                })
            }
        }
    }
}

impl fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.factories.keys()).finish()
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_treats_only_missing_null_and_empty_text_as_empty() {
        let any = Descriptor::Any;
        assert_eq!(Required.evaluate(None, &any), Some(Problem::Required));
        assert_eq!(Required.evaluate(Some(&Value::Null), &any), Some(Problem::Required));
        assert_eq!(Required.evaluate(Some(&"".into()), &any), Some(Problem::Required));
        assert_eq!(Required.evaluate(Some(&Value::Int(0)), &any), None);
        assert_eq!(Required.evaluate(Some(&Value::Bool(false)), &any), None);
        assert_eq!(Required.evaluate(Some(&Value::any_sequence(vec![])), &any), None);
        assert_eq!(Required.evaluate(Some(&Value::any_map(vec![])), &any), None);
    }

    #[test]
    fn min_length_counts_characters() {
        let rule = MinLength { min: 5 };
        assert_eq!(
            rule.evaluate(Some(&"yolo".into()), &Descriptor::STRING),
            Some(Problem::TooShort { min: 5, actual: 4 })
        );
        assert_eq!(rule.evaluate(Some(&"happy".into()), &Descriptor::STRING), None);
        assert_eq!(rule.evaluate(Some(&"héllo".into()), &Descriptor::Any), None);
        assert_eq!(rule.evaluate(None, &Descriptor::STRING), None);
    }

    #[test]
    fn min_length_fails_closed_on_non_text() {
        let rule = MinLength { min: 2 };
        assert_eq!(
            rule.evaluate(Some(&Value::Int(10)), &Descriptor::INT),
            Some(Problem::MinLengthNotText { actual: "int".into() })
        );
        assert_eq!(
            rule.evaluate(Some(&Value::any_sequence(vec![])), &Descriptor::Any),
            Some(Problem::MinLengthNotText { actual: "[]any".into() })
        );
    }

    #[test]
    fn registry_builds_custom_rules_and_reports_bad_arguments() {
        let mut registry = RuleRegistry::default();
        registry.register("maxLength", |arg| {
            let max: usize = arg
                .ok_or("maxLength needs an argument")?
                .parse()
                .map_err(|_| "maxLength should be an integer".to_string())?;
            Ok(Box::new(from_fn("maxLength", move |v, _| {
                let len = v?.as_str()?.chars().count();
                (len > max).then(|| format!("should have at most {max} characters but has {len}"))
            })))
        });
        assert!(registry.contains("maxLength"));

        let rule = registry
            .build(&RuleSpec::Custom { key: "maxLength".into(), arg: Some("3".into()) })
            .unwrap();
        assert_eq!(
            rule.evaluate(Some(&"abcd".into()), &Descriptor::STRING).map(|p| p.to_string()),
            Some("maxLength: should have at most 3 characters but has 4".into())
        );

        let err = registry
            .build(&RuleSpec::Custom { key: "maxLength".into(), arg: None })
            .unwrap_err();
        assert_eq!(err.to_string(), "maxLength: maxLength needs an argument");
    }
}
