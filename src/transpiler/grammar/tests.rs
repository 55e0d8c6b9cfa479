#[cfg(test)]
mod tests {
    use crate::transpiler::grammar::*;

    #[test]
    fn test_grammar_name_and_rules() {
        let source = r#"
grammar HelloWorld

entry Model: (persons+=Person | greetings+=Greeting)*;
Person: 'person' name=ID;
Greeting: 'Hello' person=[Person:ID] '!';
"#;
        let grammar = compile_grammar(source);

        assert_eq!(grammar.name, "HelloWorld");
        let names: Vec<&str> = grammar.rules.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Model", "Person", "Greeting"]);
        assert!(grammar.rules.iter().all(|r| r.kind == RuleKind::Rule));
        assert_eq!(
            grammar.rule("Person").unwrap().definition,
            "'person' name=ID"
        );
    }

    #[test]
    fn test_missing_grammar_keyword_uses_sentinel() {
        let grammar = compile_grammar("name: ID;");
        assert_eq!(grammar.name, UNNAMED_GRAMMAR);
        assert_eq!(grammar.rules.len(), 1);
    }

    #[test]
    fn test_empty_source_is_a_valid_empty_grammar() {
        let grammar = compile_grammar("");
        assert_eq!(grammar.name, UNNAMED_GRAMMAR);
        assert!(grammar.is_empty());

        let grammar = compile_grammar("grammar Lonely\n// nothing else here");
        assert_eq!(grammar.name, "Lonely");
        assert!(grammar.is_empty());
    }

    #[test]
    fn test_first_grammar_declaration_wins() {
        let grammar = compile_grammar("grammar First\ngrammar Second\n");
        assert_eq!(grammar.name, "First");
    }

    #[test]
    fn test_duplicate_rule_names_are_kept_in_order() {
        let grammar = compile_grammar("name: ID; title: STRING; name: STRING;");
        let defs: Vec<(&str, &str)> = grammar
            .rules
            .iter()
            .map(|r| (r.name.as_str(), r.definition.as_str()))
            .collect();
        assert_eq!(
            defs,
            vec![("name", "ID"), ("title", "STRING"), ("name", "STRING")]
        );
    }

    #[test]
    fn test_rule_body_spans_lines_and_keeps_raw_text() {
        let grammar = compile_grammar("Entity:\n    'entity' name=ID\n    '{' '}'  ;");
        assert_eq!(grammar.rules.len(), 1);
        assert_eq!(
            grammar.rules[0].definition,
            "'entity' name=ID\n    '{' '}'  "
        );
    }

    #[test]
    fn test_unterminated_rule_is_skipped() {
        let grammar = compile_grammar("Done: 'x'; Pending: 'y'");
        assert_eq!(grammar.rules.len(), 1);
        assert_eq!(grammar.rules[0].name, "Done");
    }
}
