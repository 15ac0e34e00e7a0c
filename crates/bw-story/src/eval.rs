use bw_core::{StoryError, StoryValue};
use rhai::{Dynamic, ImmutableString, Scope, FLOAT, INT};

use crate::engine::StoryEngine;

impl StoryEngine {
    pub(crate) fn render_text(&self, template: &str) -> Result<String, StoryError> {
        let mut output = String::new();
        let mut last_index = 0usize;
        for captures in self.template.captures_iter(template) {
            let (Some(full), Some(expr)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            output.push_str(&template[last_index..full.start()]);
            let value = self.eval_expression(expr.as_str())?;
            output.push_str(&value.to_text());
            last_index = full.end();
        }
        output.push_str(&template[last_index..]);
        Ok(output)
    }

    pub(crate) fn eval_boolean(&self, expr: &str) -> Result<bool, StoryError> {
        match self.eval_expression(expr)? {
            StoryValue::Bool(value) => Ok(value),
            other => Err(StoryError::new(
                "ENGINE_BOOLEAN_EXPECTED",
                format!(
                    "Expression \"{}\" must evaluate to boolean, got {}.",
                    expr,
                    other.type_name()
                ),
            )),
        }
    }

    pub(crate) fn eval_expression(&self, expr: &str) -> Result<StoryValue, StoryError> {
        let mut scope = self.build_scope();
        self.rhai
            .eval_with_scope::<Dynamic>(&mut scope, &format!("({})", expr))
            .map_err(|error| {
                StoryError::new(
                    "ENGINE_EVAL_ERROR",
                    format!("Expression eval failed: {}", error),
                )
            })
            .and_then(dynamic_to_value)
    }

    /// Run a code block and write back every story variable it touched.
    pub(crate) fn run_code(&mut self, code: &str) -> Result<(), StoryError> {
        let mut scope = self.build_scope();
        self.rhai
            .run_with_scope(&mut scope, code)
            .map_err(|error| {
                StoryError::new("ENGINE_EVAL_ERROR", format!("Code eval failed: {}", error))
            })?;

        let mut updates = Vec::new();
        for name in self.variables.keys() {
            let Some(after) = scope.get_value::<Dynamic>(name) else {
                continue;
            };
            updates.push((name.clone(), dynamic_to_value(after)?));
        }
        self.variables.extend(updates);
        Ok(())
    }

    fn build_scope(&self) -> Scope<'static> {
        let mut scope = Scope::new();
        for (name, value) in &self.variables {
            scope.push_dynamic(name.clone(), value_to_dynamic(value));
        }
        scope
    }
}

pub(crate) fn value_to_dynamic(value: &StoryValue) -> Dynamic {
    match value {
        StoryValue::Bool(value) => Dynamic::from_bool(*value),
        StoryValue::Number(value) => Dynamic::from_float(*value as FLOAT),
        StoryValue::String(value) => Dynamic::from(value.clone()),
    }
}

pub(crate) fn dynamic_to_value(value: Dynamic) -> Result<StoryValue, StoryError> {
    if value.is::<bool>() {
        return Ok(StoryValue::Bool(value.cast::<bool>()));
    }
    if value.is::<INT>() {
        return Ok(StoryValue::Number(value.cast::<INT>() as f64));
    }
    if value.is::<FLOAT>() {
        let number = value.cast::<FLOAT>();
        // Snapshots store numbers as JSON, which has no NaN or infinity.
        if !number.is_finite() {
            return Err(StoryError::new(
                "ENGINE_VALUE_NONFINITE",
                format!("Numeric value \"{}\" is not finite.", number),
            ));
        }
        return Ok(StoryValue::Number(number));
    }
    if value.is::<ImmutableString>() {
        return Ok(StoryValue::String(
            value.cast::<ImmutableString>().to_string(),
        ));
    }

    Err(StoryError::new(
        "ENGINE_VALUE_UNSUPPORTED",
        format!("Unsupported Rhai value type \"{}\".", value.type_name()),
    ))
}

#[cfg(test)]
mod eval_tests {
    use super::*;

    fn engine_with(variables: &str) -> StoryEngine {
        StoryEngine::from_json(&format!(
            r#"{{"schemaVersion":"story.v1","start":"a","variables":{},"knots":{{"a":[]}}}}"#,
            variables
        ))
        .expect("engine should build")
    }

    #[test]
    fn render_text_interpolates_expressions() {
        let engine = engine_with(r#"{"gold": 3, "name": "Ada"}"#);
        let rendered = engine
            .render_text("${name} has ${gold + 1} coins")
            .expect("render should pass");
        assert_eq!(rendered, "Ada has 4 coins");
    }

    #[test]
    fn eval_boolean_rejects_non_boolean_results() {
        let engine = engine_with(r#"{"gold": 3}"#);
        assert!(engine.eval_boolean("gold > 2").expect("comparison"));
        let error = engine.eval_boolean("gold").expect_err("number is not boolean");
        assert_eq!(error.code, "ENGINE_BOOLEAN_EXPECTED");
    }

    #[test]
    fn run_code_writes_back_known_variables_only() {
        let mut engine = engine_with(r#"{"gold": 1, "armed": false}"#);
        engine
            .run_code("gold = gold * 5; armed = true; let scratch = 9;")
            .expect("code should run");
        assert_eq!(engine.variable("gold"), Some(&StoryValue::Number(5.0)));
        assert_eq!(engine.variable("armed"), Some(&StoryValue::Bool(true)));
        assert_eq!(engine.variable("scratch"), None);
    }

    #[test]
    fn undeclared_variables_fail_under_strict_mode() {
        let mut engine = engine_with("{}");
        let error = engine.run_code("missing = 1;").expect_err("strict variables");
        assert_eq!(error.code, "ENGINE_EVAL_ERROR");
    }

    #[test]
    fn non_finite_numbers_are_rejected() {
        let mut engine = engine_with(r#"{"x": 1}"#);
        let error = engine.run_code("x = 0.0 / 0.0;").expect_err("nan");
        assert_eq!(error.code, "ENGINE_VALUE_NONFINITE");
        assert_eq!(engine.variable("x"), Some(&StoryValue::Number(1.0)));

        let error = dynamic_to_value(Dynamic::from_float(FLOAT::INFINITY)).expect_err("inf");
        assert_eq!(error.code, "ENGINE_VALUE_NONFINITE");
    }

    #[test]
    fn dynamic_to_value_rejects_arrays() {
        let error = dynamic_to_value(Dynamic::from_array(Vec::new())).expect_err("array");
        assert_eq!(error.code, "ENGINE_VALUE_UNSUPPORTED");
    }
}
