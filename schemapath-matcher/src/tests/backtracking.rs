use anyhow::Result;

use crate::ErrorKind;

#[test]
fn a_failing_close_retracts_an_earlier_choice() -> Result<()> {
    // Both sequence positions accept <X/>; the optional first position is
    // preferred, and only the close of root reveals that the required second
    // position would then go unfilled
    assert_path_of! {
        grammar:
            "element root { sequence { element X ?, element X } }"
        events:
            "
            start root
            start X
            end X
            end root
            "
        yields:
            "child element root #1"
            "child sequence #1"
            "child element X #1"
            "parent sequence #1"
            "parent element root #1"
    }
}

#[test]
fn a_failing_start_retracts_an_earlier_choice() -> Result<()> {
    // <a/> alone fits the bare element; <a/><b/> only fits the inner sequence
    assert_path_of! {
        grammar:
            "element root { sequence { choice { element a, sequence { element a, element b } } } }"
        events:
            "
            start root
            start a
            end a
            start b
            end b
            end root
            "
        yields:
            "child element root #1"
            "child sequence #1"
            "child choice #1"
            "child sequence #1"
            "child element a #1"
            "parent sequence #1"
            "child element b #1"
            "parent sequence #1"
            "parent choice #1"
            "parent sequence #1"
            "parent element root #1"
    }
}

#[test]
fn character_content_survives_replay() -> Result<()> {
    // The retraction rolls back the received-content flag of the first
    // interpretation and the replay re-establishes it on the second
    assert_path_of! {
        grammar:
            "element root { sequence { element v text ?, element v text, element w ? } }"
        events:
            "
            start root
            start v
            text \"1\"
            end v
            end root
            "
        yields:
            "child element root #1"
            "child sequence #1"
            "child element v #1"
            "content element v #1"
            "parent sequence #1"
            "parent element root #1"
    }
}

#[test]
fn exhausting_every_alternative_is_path_not_found() -> Result<()> {
    assert_path_of! {
        grammar:
            "element root { sequence { element x ?, element x } }"
        events:
            "
            start root
            start x
            end x
            start x
            end x
            start x
            end x
            end root
            "
        fails:
            ErrorKind::PathNotFound { .. }
    }
}

#[test]
fn the_event_log_survives_backtracking() -> Result<()> {
    let machine = schemapath_model::parse_grammar(
        "element root { sequence { element X ?, element X } }",
    )
    .map_err(|e| anyhow::anyhow!("{e}"))?;
    let mut finder = crate::PathFinder::new(&machine);
    let error = schemapath_sax::EventScript::parse(
        "
        start root
        start X
        end X
        start X
        end X
        start X
        end X
        end root
        ",
    )?
    .drive(&mut finder)
    .expect_err("three X's cannot fit")
    .downcast::<crate::MatchError>()?;
    // The trail reflects the full history, never a truncated one
    assert_eq!(
        error.trail(),
        "[root:start | X:start | X:end | X:start | X:end]",
    );
    Ok(())
}

#[test]
fn retraction_restores_document_counts_exactly() -> Result<()> {
    // After backtracking, the surviving interpretation's counts must match a
    // straight-line run with no retraction at all
    let grammar = "element root { sequence { element X ?, element X } }";
    let machine =
        schemapath_model::parse_grammar(grammar).map_err(|e| anyhow::anyhow!("{e}"))?;
    let script = schemapath_sax::EventScript::parse(
        "
        start root
        start X
        end X
        end root
        ",
    )?;
    let mut finder = crate::PathFinder::new(&machine);
    script.drive(&mut finder)?;
    for step in finder.path() {
        let Some(doc) = step.doc else { continue };
        assert!(finder.doc_node(doc).iteration() >= 1, "zeroed occurrence on the committed path");
    }
    Ok(())
}
