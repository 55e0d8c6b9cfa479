use crate::model::Model;
use crate::transpiler::errors::CodegenError;
use crate::transpiler::script::{Evaluator, parse_program};
use std::collections::HashMap;

/// Name under which selectors see the model.
pub const AST_BINDING: &str = "ast";

/// Applies selectors to models before rendering.
///
/// A selector is a statement block run with `ast` bound to the model; the
/// final value of `ast` becomes the new model. Selector text is trusted
/// input from the local operator. It runs in the script language only, so it
/// can reshape the model but has no access to files, processes or network.
#[derive(Debug, Default, Clone, Copy)]
pub struct ModelTransformer;

impl ModelTransformer {
    pub fn new() -> Self {
        Self
    }

    pub fn try_transform(&self, model: &Model, selector: &str) -> Result<Model, CodegenError> {
        if selector.trim().is_empty() {
            return Ok(model.clone());
        }

        let program = parse_program(selector).map_err(CodegenError::SelectorEvaluation)?;

        let bindings = HashMap::from([(AST_BINDING.to_string(), model.to_value())]);
        let mut evaluator = Evaluator::new(bindings);
        evaluator
            .run(&program)
            .map_err(CodegenError::SelectorEvaluation)?;

        let result = evaluator.take_binding(AST_BINDING).unwrap_or_default();
        let type_name = result.type_name();
        Model::from_value(result, model).ok_or(CodegenError::SelectorResultNotObject(type_name))
    }

    /// Runs `selector` over `model`. Any failure is logged and the model is
    /// returned untouched.
    pub fn transform(&self, model: Model, selector: &str) -> Model {
        match self.try_transform(&model, selector) {
            Ok(transformed) => transformed,
            Err(err) => {
                tracing::warn!(error = %err, "selector failed, using the untransformed model");
                model
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Value;

    fn order() -> Model {
        let mut model = Model::new("Order");
        model.set_string("name", "invoice");
        model
    }

    #[test]
    fn test_empty_selector_keeps_model() {
        let transformer = ModelTransformer::new();
        assert_eq!(transformer.try_transform(&order(), "  \n").unwrap(), order());
    }

    #[test]
    fn test_selector_mutates_ast() {
        let transformer = ModelTransformer::new();
        let selector = "ast.name = capitalize(ast.name); ast.kind = 'document';";

        let model = transformer.transform(order(), selector);
        assert_eq!(model.node_type, "Order");
        assert_eq!(model.get_string("name"), Some("Invoice"));
        assert_eq!(model.get_string("kind"), Some("document"));
    }

    #[test]
    fn test_selector_replaces_ast() {
        let transformer = ModelTransformer::new();
        let selector = "ast = { $type: 'Summary', title: ast.name, parts: [1, 2] }";

        let model = transformer.transform(order(), selector);
        assert_eq!(model.node_type, "Summary");
        assert_eq!(model.get_string("title"), Some("invoice"));
        assert_eq!(
            model.get("parts"),
            Some(&Value::List(vec![Value::Number(1.0), Value::Number(2.0)]))
        );
        assert!(model.get("name").is_none());
    }

    #[test]
    fn test_selector_push_appends_to_model_lists() {
        let transformer = ModelTransformer::new();
        let selector = "ast.items = []; ast.items.push('a'); ast.items.push(upper(ast.name));";

        let model = transformer.transform(order(), selector);
        assert_eq!(
            model.get("items"),
            Some(&Value::List(vec![Value::from("a"), Value::from("INVOICE")]))
        );
    }

    #[test]
    fn test_failing_selector_falls_back() {
        let transformer = ModelTransformer::new();

        assert!(matches!(
            transformer.try_transform(&order(), "ast.name = "),
            Err(CodegenError::SelectorEvaluation(_))
        ));
        assert!(matches!(
            transformer.try_transform(&order(), "ast.count = 1 / 0"),
            Err(CodegenError::SelectorEvaluation(_))
        ));
        assert_eq!(transformer.transform(order(), "ast.count = 1 / 0"), order());
    }

    #[test]
    fn test_non_object_result_is_rejected() {
        let transformer = ModelTransformer::new();

        assert_eq!(
            transformer.try_transform(&order(), "ast = 'flat'"),
            Err(CodegenError::SelectorResultNotObject("string"))
        );
        assert_eq!(transformer.transform(order(), "ast = [1]"), order());
    }
}
