use anyhow::{anyhow, Context, Result};
use jaq_core::{load, Compiler, Ctx, RcIter};
use jaq_json::Val;
use serde_json::Value;

/// Run a jq filter over one document; every output becomes a document.
pub fn run_jaq(filter_src: &str, input: &Value) -> Result<Vec<Value>> {
    let loader = load::Loader::new(jaq_std::defs().chain(jaq_json::defs()));
    let arena = load::Arena::default();
    let program = load::File { code: filter_src, path: () };

    let modules = loader.load(&arena, program).map_err(|errs| {
        filter_error(filter_src, errs.into_iter().map(|(_, err)| format!("parse error: {err:?}")))
    })?;
    let filter = Compiler::default()
        .with_funs(jaq_std::funs().chain(jaq_json::funs()))
        .compile(modules)
        .map_err(|errs| {
            let undefined = errs
                .into_iter()
                .flat_map(|(_, list)| list)
                .map(|(name, undef)| format!("undefined `{name}`: {undef:?}"));
            filter_error(filter_src, undefined)
        })?;

    let inputs = RcIter::new(core::iter::empty());
    let outputs = filter.run((Ctx::new([], &inputs), Val::from(input.clone())));

    let mut documents = Vec::new();
    for output in outputs {
        let output = output.map_err(|e| anyhow!("jq error: {e:?}"))?;
        // Val only prints as JSON text
        let document = serde_json::from_str::<Value>(&output.to_string())
            .with_context(|| format!("jq output is not JSON: {output}"))?;
        documents.push(document);
    }
    Ok(documents)
}

/// One error naming the filter, one indented line per problem.
fn filter_error(filter_src: &str, problems: impl Iterator<Item = String>) -> anyhow::Error {
    let lines = problems.map(|p| format!("  {p}")).collect::<Vec<_>>();
    anyhow!("invalid jq filter `{filter_src}`:\n{}", lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn each_output_is_a_document() {
        let out = run_jaq(".users[]", &json!({ "users": [{ "name": "a" }, { "name": "b" }] })).unwrap();
        assert_eq!(out, vec![json!({ "name": "a" }), json!({ "name": "b" })]);
    }

    #[test]
    fn bad_filters_name_the_filter() {
        let err = run_jaq(".users[", &json!({})).unwrap_err().to_string();
        assert!(err.starts_with("invalid jq filter `.users[`"), "{err}");

        let err = run_jaq("nope_fn(1)", &json!({})).unwrap_err().to_string();
        assert!(err.contains("undefined `nope_fn`"), "{err}");
    }
}
