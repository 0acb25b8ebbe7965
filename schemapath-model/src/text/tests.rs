use super::*;
use crate::ContentKind;

fn root_element(machine: &StateMachine) -> &ElementDecl {
    machine
        .node(machine.root())
        .element()
        .expect("root is not an element")
}

#[test]
fn single_element() {
    let machine = parse_grammar("element root").unwrap();
    let decl = root_element(&machine);
    assert_eq!(decl.name, QName::local("root"));
    assert_eq!(decl.content, None);
    assert_eq!(decl.content_kind, ContentKind::Empty);
    assert_eq!(machine.node(machine.root()).occurs, Occurs::ONE);

    let machine = parse_grammar("element root text").unwrap();
    assert_eq!(root_element(&machine).content_kind, ContentKind::Simple);
}

#[test]
fn clark_notation_names() {
    let machine = parse_grammar("element {http://example.com/ns}root").unwrap();
    assert_eq!(
        root_element(&machine).name,
        QName::namespaced("http://example.com/ns", "root")
    );
}

#[test]
fn nested_content_model() {
    let machine = parse_grammar(
        "
        element root {
            sequence {
                choice * { element A text, element B text },
                any(##other) ?
            }
        }
        ",
    )
    .unwrap();
    let root = machine.node(machine.root());
    let sequence = machine.node(root.children()[0]);
    assert!(matches!(sequence.kind, StateKind::Sequence(_)));
    let [choice, wildcard] = sequence.children() else {
        panic!("expected two sequence children");
    };
    assert_eq!(machine.node(*choice).occurs, Occurs::ZERO_OR_MORE);
    assert_eq!(machine.node(*choice).children().len(), 2);
    assert_eq!(machine.node(*wildcard).occurs, Occurs::OPTIONAL);
    assert!(matches!(
        machine.node(*wildcard).kind,
        StateKind::Any(WildcardRule::Other)
    ));
}

#[test]
fn occurs_markers() {
    for (text, expected) in [
        ("element a ?", Occurs::OPTIONAL),
        ("element a *", Occurs::ZERO_OR_MORE),
        ("element a +", Occurs::ONE_OR_MORE),
        ("element a {2..5}", Occurs::new(2, Some(5))),
        ("element a {3..*}", Occurs::new(3, None)),
        ("element a", Occurs::ONE),
    ] {
        let machine = parse_grammar(text).unwrap();
        assert_eq!(machine.node(machine.root()).occurs, expected, "in {text:?}");
    }
}

#[test]
fn occurs_marker_before_body() {
    let machine = parse_grammar("element a {2..3} { element b }").unwrap();
    let root = machine.node(machine.root());
    assert_eq!(root.occurs, Occurs::new(2, Some(3)));
    assert_eq!(root.children().len(), 1);
}

#[test]
fn element_flags() {
    let machine = parse_grammar(r#"element e text nillable default("7")"#).unwrap();
    let decl = root_element(&machine);
    assert_eq!(decl.content_kind, ContentKind::Simple);
    assert!(decl.nillable);
    assert_eq!(decl.default_value.as_deref(), Some("7"));
    assert_eq!(decl.fixed_value, None);

    let machine = parse_grammar(r#"element e empty"#).unwrap();
    assert_eq!(root_element(&machine).content_kind, ContentKind::Empty);

    let machine = parse_grammar("element e mixed { element child text }").unwrap();
    assert_eq!(root_element(&machine).content_kind, ContentKind::Mixed);
}

#[test]
fn element_only_is_inferred_from_a_body() {
    let machine = parse_grammar("element e { element child }").unwrap();
    assert_eq!(root_element(&machine).content_kind, ContentKind::ElementOnly);
}

#[test]
fn wildcard_rules() {
    for (text, expected) in [
        ("any(##any)", WildcardRule::Any),
        ("any(##other)", WildcardRule::Other),
        ("any(##targetNamespace)", WildcardRule::Target),
        ("any(##local)", WildcardRule::Local),
        (
            "any(http://a http://b)",
            WildcardRule::Namespaces(vec!["http://a".into(), "http://b".into()]),
        ),
    ] {
        let machine = parse_grammar(text).unwrap();
        match &machine.node(machine.root()).kind {
            StateKind::Any(rule) => assert_eq!(rule, &expected, "in {text:?}"),
            other => panic!("expected wildcard, got {other:?}"),
        }
    }
}

#[test]
fn definitions_and_references() {
    let machine = parse_grammar(
        "
        def point = element point { sequence { element x text, element y text } }
        element root { use point }
        ",
    )
    .unwrap();
    let root = machine.node(machine.root());
    let point = machine.node(root.children()[0]);
    assert_eq!(point.element().unwrap().name, QName::local("point"));
}

#[test]
fn recursive_definitions() {
    let machine = parse_grammar(
        "
        def item = element item { sequence { element name text, use item ? } }
        element root { use item }
        ",
    )
    .unwrap();
    let root = machine.node(machine.root());
    let item = root.children()[0];
    let sequence = machine.node(item).children()[0];
    // The optional self-reference is wrapped in a single-child choice
    let wrapper = machine.node(machine.node(sequence).children()[1]);
    assert_eq!(wrapper.occurs, Occurs::OPTIONAL);
    assert_eq!(wrapper.children(), &[item]);
}

#[test]
fn comments_are_ignored() {
    parse_grammar(
        "
        # the whole document
        element root {   # content follows
            element a    # a trailing comment
        }
        ",
    )
    .unwrap();
}

#[test]
fn substitution_groups() {
    let machine = parse_grammar("subst { element head, element sub }").unwrap();
    assert!(matches!(
        machine.node(machine.root()).kind,
        StateKind::Substitution(_)
    ));
}

#[test]
fn errors_are_located() {
    let error = parse_grammar(
        "
        def dup = element a
        def dup = element b
        element root
        ",
    )
    .unwrap_err();
    assert_eq!(error.line_number(), 3);
    assert!(error.to_string().contains("dup occurs twice"));
}

#[test]
fn unknown_reference_is_an_error() {
    let error = parse_grammar("element root { use missing }").unwrap_err();
    assert!(error.to_string().contains("no def found"));
}

#[test]
fn conflicting_flags_are_errors() {
    assert!(parse_grammar("element e text empty").is_err());
    assert!(parse_grammar("element e mixed").is_err());
    assert!(parse_grammar("element e text { element child }").is_err());
    assert!(parse_grammar(r#"element e default("a") fixed("b")"#).is_err());
}

#[test]
fn malformed_grammars_are_errors() {
    assert!(parse_grammar("").is_err());
    assert!(parse_grammar("element").is_err());
    assert!(parse_grammar("sequence { }").is_err());
    assert!(parse_grammar("element root { element a } trailing").is_err());
    assert!(parse_grammar("element root { sequence { element a, } }").is_err());
}
