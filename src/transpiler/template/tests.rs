#[cfg(test)]
mod tests {
    use crate::model::{Model, Value};
    use crate::transpiler::errors::{CodegenError, ScriptError};
    use crate::transpiler::template::*;
    use std::sync::Arc;

    fn greeting() -> Model {
        let mut model = Model::new("Greeting");
        model.set_string("name", "World");
        model.set(
            "items",
            Value::List(vec![Value::from("a"), Value::from("b"), Value::from("c")]),
        );
        model
    }

    #[test]
    fn test_scan_segments() {
        let segments = scan_segments("Hi <%= name %>!<% if x { %>y<% } %>").unwrap();
        assert_eq!(
            segments,
            vec![
                Segment::Literal("Hi "),
                Segment::Expression("name"),
                Segment::Literal("!"),
                Segment::Code("if x {"),
                Segment::Literal("y"),
                Segment::Code("}"),
            ]
        );
    }

    #[test]
    fn test_unterminated_tag() {
        assert_eq!(
            scan_segments("ok <%= name %> then <% broken"),
            Err(ScriptError::UnterminatedTag(20))
        );

        let engine = TemplateEngine::default();
        let compiled = engine.compile("Hello <%= name");
        assert!(matches!(
            compiled.compile_error(),
            Some(CodegenError::TemplateCompile(ScriptError::UnterminatedTag(6)))
        ));
    }

    #[test]
    fn test_literal_text_passes_through() {
        let engine = TemplateEngine::default();
        let source = "line one\n  \"quoted\" `ticks` \\ backslash\n";
        assert_eq!(engine.render(source, &greeting()), source);
        assert_eq!(engine.render("", &greeting()), "");
    }

    #[test]
    fn test_interpolation() {
        let engine = TemplateEngine::default();
        let model = greeting();

        assert_eq!(engine.render("Hello, <%= name %>!", &model), "Hello, World!");
        assert_eq!(engine.render("<%= model.$type %>", &model), "Greeting");
        assert_eq!(engine.render("<%= upper(model.name) %>", &model), "WORLD");
        assert_eq!(engine.render("[<%= missing_key %>]", &model), "[]");
        assert_eq!(engine.render("<%= items %>", &model), "a,b,c");
    }

    #[test]
    fn test_loops_and_conditionals_across_tags() {
        let engine = TemplateEngine::default();
        let source = "<% for (const item of items) { %>- <%= item %>\n<% } %>\
<% if (items.length > 2) { %>many<% } else { %>few<% } %>";

        assert_eq!(engine.render(source, &greeting()), "- a\n- b\n- c\nmany");
    }

    #[test]
    fn test_code_tags_with_comments_and_locals() {
        let engine = TemplateEngine::default();
        let source = "<% // header\nlet title = capitalize(name) %>Title: <%= title %>";
        assert_eq!(engine.render(source, &greeting()), "Title: World");
    }

    #[test]
    fn test_compile_error_text() {
        let engine = TemplateEngine::default();
        let rendered = engine.render("<% if { %>", &greeting());
        assert!(rendered.starts_with("Error: Could not compile template - "));

        assert!(matches!(
            engine.try_render("<% if { %>", &greeting()),
            Err(CodegenError::TemplateCompile(ScriptError::Syntax { .. }))
        ));
    }

    #[test]
    fn test_render_error_text() {
        let engine = TemplateEngine::default();
        let rendered = engine.render("before <%= 1 / 0 %>", &greeting());
        assert_eq!(
            rendered,
            "Error: Could not render template - division by zero"
        );
    }

    #[test]
    fn test_cache_compiles_each_source_once() {
        let cache = TemplateCache::new();
        let engine = TemplateEngine::new(cache.clone());

        let first = engine.compile("Hello <%= name %>");
        let second = engine.compile("Hello <%= name %>");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.compilations(), 1);
        assert_eq!(cache.len(), 1);

        engine.compile("Bye <%= name %>");
        assert_eq!(cache.compilations(), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_cache_shared_between_engines() {
        let cache = TemplateCache::new();
        let left = TemplateEngine::new(cache.clone());
        let right = left.clone();

        assert_eq!(left.render("<%= name %>", &greeting()), "World");
        assert_eq!(right.render("<%= name %>", &greeting()), "World");
        assert_eq!(cache.compilations(), 1);
    }

    #[test]
    fn test_failed_compiles_are_cached() {
        let cache = TemplateCache::new();
        let engine = TemplateEngine::new(cache.clone());

        let first = engine.render("<% for %>", &greeting());
        let second = engine.render("<% for %>", &greeting());
        assert_eq!(first, second);
        assert!(first.starts_with("Error: Could not compile template - "));
        assert_eq!(cache.compilations(), 1);
    }

    #[test]
    fn test_cache_across_threads() {
        let cache = TemplateCache::new();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let engine = TemplateEngine::new(cache.clone());
                std::thread::spawn(move || engine.render("<%= name %>!", &greeting()))
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), "World!");
        }
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_push_inside_code_tags() {
        let engine = TemplateEngine::default();
        let source = "<% let xs = []; xs.push('x') %><%= xs.length %>";
        assert_eq!(engine.render(source, &greeting()), "1");

        let source = "<% let seen = []; for (const item of items) { seen.push(upper(item)) } %><%= seen.join('|') %>";
        assert_eq!(engine.render(source, &greeting()), "A|B|C");
    }

    #[test]
    fn test_deeply_nested_template_fails_to_compile() {
        let engine = TemplateEngine::default();
        let source = format!("<%= {}1{} %>", "(".repeat(2000), ")".repeat(2000));

        let rendered = engine.render(&source, &greeting());
        assert!(rendered.starts_with("Error: Could not compile template - "));
        assert!(rendered.contains("shallower nesting"));
    }
}
