/// Runs a grammar against an event script and asserts on the committed path
/// (one rendered step per line) or on the failure kind.
macro_rules! assert_path_of {
    {
        grammar:
            $grammar:literal
        events:
            $events:literal
        yields:
            $($step:literal)+
    } => {{
        let machine = schemapath_model::parse_grammar($grammar)
            .map_err(|e| anyhow::anyhow!("{e}"))?;
        let mut finder = $crate::PathFinder::new(&machine);
        schemapath_sax::EventScript::parse($events)?.drive(&mut finder)?;
        let expected: Vec<&str> = vec![$($step),+];
        assert_eq!(
            finder.render_path(),
            expected.join("\n"),
            "committed path differs",
        );
        Ok(())
    }};
    {
        grammar:
            $grammar:literal
        events:
            $events:literal
        fails:
            $kind:pat
    } => {{
        let machine = schemapath_model::parse_grammar($grammar)
            .map_err(|e| anyhow::anyhow!("{e}"))?;
        let mut finder = $crate::PathFinder::new(&machine);
        let error = schemapath_sax::EventScript::parse($events)?
            .drive(&mut finder)
            .expect_err("expected the document to be rejected");
        let error = error.downcast::<$crate::MatchError>()?;
        assert!(
            matches!(error.kind(), $kind),
            "unexpected failure kind: {:?}",
            error.kind(),
        );
        Ok(())
    }};
}

mod backtracking;
mod matching;
mod wildcards;
