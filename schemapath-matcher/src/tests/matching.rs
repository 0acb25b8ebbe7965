use anyhow::Result;

use crate::ErrorKind;

#[test]
fn single_choice_child() -> Result<()> {
    assert_path_of! {
        grammar:
            "element root { sequence { choice * { element A, element B }, any(##other) ? } }"
        events:
            "
            start root
            start A
            end A
            end root
            "
        yields:
            "child element root #1"
            "child sequence #1"
            "child choice* #1"
            "child element A #1"
            "parent choice* #1"
            "parent sequence #1"
            "parent element root #1"
    }
}

#[test]
fn choice_iterates_by_sibling_steps() -> Result<()> {
    assert_path_of! {
        grammar:
            "element root { sequence { choice * { element A, element B }, any(##other) ? } }"
        events:
            "
            start root
            start A
            end A
            start B
            end B
            start A
            end A
            end root
            "
        yields:
            "child element root #1"
            "child sequence #1"
            "child choice* #1"
            "child element A #1"
            "parent choice* #1"
            "sibling choice* #2"
            "child element B #1"
            "parent choice* #2"
            "sibling choice* #3"
            "child element A #1"
            "parent choice* #3"
            "parent sequence #1"
            "parent element root #1"
    }
}

#[test]
fn choice_children_in_either_order() -> Result<()> {
    assert_path_of! {
        grammar:
            "element root { sequence { choice * { element A, element B }, any(##other) ? } }"
        events:
            "
            start root
            start B
            end B
            start A
            end A
            end root
            "
        yields:
            "child element root #1"
            "child sequence #1"
            "child choice* #1"
            "child element B #1"
            "parent choice* #1"
            "sibling choice* #2"
            "child element A #1"
            "parent choice* #2"
            "parent sequence #1"
            "parent element root #1"
    }
}

#[test]
fn substitution_member_stands_in_for_its_head() -> Result<()> {
    assert_path_of! {
        grammar:
            "element root { subst { element head, element sub } }"
        events:
            "
            start root
            start sub
            end sub
            end root
            "
        yields:
            "child element root #1"
            "child subst #1"
            "child element sub #1"
            "parent subst #1"
            "parent element root #1"
    }
}

#[test]
fn sequence_positions_advance_in_order() -> Result<()> {
    assert_path_of! {
        grammar:
            "element root { sequence { element a, element b, element c } }"
        events:
            "
            start root
            start a
            end a
            start b
            end b
            start c
            end c
            end root
            "
        yields:
            "child element root #1"
            "child sequence #1"
            "child element a #1"
            "parent sequence #1"
            "child element b #1"
            "parent sequence #1"
            "child element c #1"
            "parent sequence #1"
            "parent element root #1"
    }
}

#[test]
fn optional_positions_may_be_skipped() -> Result<()> {
    assert_path_of! {
        grammar:
            "element root { sequence { element a ?, element b, element c ? } }"
        events:
            "
            start root
            start b
            end b
            end root
            "
        yields:
            "child element root #1"
            "child sequence #1"
            "child element b #1"
            "parent sequence #1"
            "parent element root #1"
    }
}

#[test]
fn repeated_element_takes_sibling_steps() -> Result<()> {
    assert_path_of! {
        grammar:
            "element root { element item {1..3} }"
        events:
            "
            start root
            start item
            end item
            start item
            end item
            end root
            "
        yields:
            "child element root #1"
            "child element item{1..3} #1"
            "sibling element item{1..3} #2"
            "parent element root #1"
    }
}

#[test]
fn all_group_accepts_any_order() -> Result<()> {
    assert_path_of! {
        grammar:
            "element root { all { element x, element y } }"
        events:
            "
            start root
            start y
            end y
            start x
            end x
            end root
            "
        yields:
            "child element root #1"
            "child all #1"
            "child element y #1"
            "parent all #1"
            "child element x #1"
            "parent all #1"
            "parent element root #1"
    }
}

#[test]
fn nested_elements_descend_through_content_models() -> Result<()> {
    assert_path_of! {
        grammar:
            "element root { sequence { element outer { element inner text } } }"
        events:
            "
            start root
            start outer
            start inner
            text \"value\"
            end inner
            end outer
            end root
            "
        yields:
            "child element root #1"
            "child sequence #1"
            "child element outer #1"
            "child element inner #1"
            "content element inner #1"
            "parent element outer #1"
            "parent sequence #1"
            "parent element root #1"
    }
}

#[test]
fn recursive_models_nest() -> Result<()> {
    assert_path_of! {
        grammar:
            "
            def item = element item { use item ? }
            element root { use item }
            "
        events:
            "
            start root
            start item
            start item
            end item
            end item
            end root
            "
        yields:
            "child element root #1"
            "child element item #1"
            "child choice? #1"
            "child element item #1"
            "parent choice? #1"
            "parent element item #1"
            "parent element root #1"
    }
}

#[test]
fn rerunning_the_same_stream_is_deterministic() -> Result<()> {
    let machine = schemapath_model::parse_grammar(
        "element root { sequence { element a ?, choice * { element a, element b } } }",
    )
    .map_err(|e| anyhow::anyhow!("{e}"))?;
    let script = schemapath_sax::EventScript::parse(
        "
        start root
        start a
        end a
        start b
        end b
        end root
        ",
    )?;
    let mut first = crate::PathFinder::new(&machine);
    script.drive(&mut first)?;
    let mut second = crate::PathFinder::new(&machine);
    script.drive(&mut second)?;
    assert_eq!(first.render_path(), second.render_path());
    Ok(())
}

#[test]
fn wrong_root_name_is_rejected() -> Result<()> {
    assert_path_of! {
        grammar:
            "element root { element a }"
        events:
            "
            start wrong
            end wrong
            "
        fails:
            ErrorKind::PathNotFound { .. }
    }
}

#[test]
fn unknown_child_is_rejected() -> Result<()> {
    assert_path_of! {
        grammar:
            "element root { element a }"
        events:
            "
            start root
            start mystery
            end mystery
            end root
            "
        fails:
            ErrorKind::PathNotFound { .. }
    }
}

#[test]
fn overflowing_occurrences_are_rejected() -> Result<()> {
    assert_path_of! {
        grammar:
            "element root { element item {1..2} }"
        events:
            "
            start root
            start item
            end item
            start item
            end item
            start item
            end item
            end root
            "
        fails:
            ErrorKind::PathNotFound { .. }
    }
}

#[test]
fn missing_required_position_fails_the_close() -> Result<()> {
    assert_path_of! {
        grammar:
            "element root { sequence { element a, element b } }"
        events:
            "
            start root
            start a
            end a
            end root
            "
        fails:
            ErrorKind::PathNotFound { .. }
    }
}

#[test]
fn mismatched_end_is_fatal() -> Result<()> {
    assert_path_of! {
        grammar:
            "element root { element a }"
        events:
            "
            start root
            start a
            end root
            "
        fails:
            ErrorKind::MismatchedEnd { .. }
    }
}

#[test]
fn error_messages_carry_the_event_trail() -> Result<()> {
    let machine = schemapath_model::parse_grammar("element root { element a }")
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    let mut finder = crate::PathFinder::new(&machine);
    let error = schemapath_sax::EventScript::parse(
        "
        start root
        start mystery
        ",
    )?
    .drive(&mut finder)
    .expect_err("expected rejection")
    .downcast::<crate::MatchError>()?;
    assert_eq!(error.trail(), "[root:start]");
    Ok(())
}
