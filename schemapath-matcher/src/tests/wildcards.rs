use anyhow::Result;

use crate::ErrorKind;

#[test]
fn foreign_elements_fall_to_the_wildcard() -> Result<()> {
    assert_path_of! {
        grammar:
            "element root { sequence { choice * { element A, element B }, any(##other) ? } }"
        events:
            "
            start root
            start A
            end A
            start {http://x}foo
            end {http://x}foo
            end root
            "
        yields:
            "child element root #1"
            "child sequence #1"
            "child choice* #1"
            "child element A #1"
            "parent choice* #1"
            "parent sequence #1"
            "child any(##other)? #1"
            "parent sequence #1"
            "parent element root #1"
    }
}

#[test]
fn named_elements_are_preferred_over_wildcards() -> Result<()> {
    // Both positions could absorb <A/>; the concrete element must win
    assert_path_of! {
        grammar:
            "element root { sequence { element A ?, any(##any) ? } }"
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
            "child element A? #1"
            "parent sequence #1"
            "parent element root #1"
    }
}

#[test]
fn unmatched_names_fall_to_the_wildcard() -> Result<()> {
    assert_path_of! {
        grammar:
            "element root { sequence { element A ?, any(##any) ? } }"
        events:
            "
            start root
            start B
            end B
            end root
            "
        yields:
            "child element root #1"
            "child sequence #1"
            "child any(##any)? #1"
            "parent sequence #1"
            "parent element root #1"
    }
}

#[test]
fn wildcard_subtrees_are_opaque() -> Result<()> {
    assert_path_of! {
        grammar:
            "element root { any(##other) }"
        events:
            "
            start root
            start {http://x}w
            start {http://x}inner
            text \"ignored\"
            end {http://x}inner
            start {http://x}inner
            end {http://x}inner
            end {http://x}w
            end root
            "
        yields:
            "child element root #1"
            "child any(##other) #1"
            "parent element root #1"
    }
}

#[test]
fn wildcards_may_iterate() -> Result<()> {
    assert_path_of! {
        grammar:
            "element root { any(##any) {1..2} }"
        events:
            "
            start root
            start one
            end one
            start two
            end two
            end root
            "
        yields:
            "child element root #1"
            "child any(##any){1..2} #1"
            "sibling any(##any){1..2} #2"
            "parent element root #1"
    }
}

#[test]
fn other_excludes_the_open_elements_namespace() -> Result<()> {
    assert_path_of! {
        grammar:
            "element {http://t}root { any(##other) }"
        events:
            "
            start {http://t}root
            start {http://t}child
            end {http://t}child
            end {http://t}root
            "
        fails:
            ErrorKind::PathNotFound { .. }
    }
}

#[test]
fn target_namespace_follows_the_open_element() -> Result<()> {
    assert_path_of! {
        grammar:
            "element {http://t}root { any(##targetNamespace) }"
        events:
            "
            start {http://t}root
            start {http://t}child
            end {http://t}child
            end {http://t}root
            "
        yields:
            "child element {http://t}root #1"
            "child any(##targetNamespace) #1"
            "parent element {http://t}root #1"
    }
}

#[test]
fn namespace_lists_are_closed() -> Result<()> {
    assert_path_of! {
        grammar:
            "element root { any(http://a http://b) ? }"
        events:
            "
            start root
            start {http://c}x
            end {http://c}x
            end root
            "
        fails:
            ErrorKind::PathNotFound { .. }
    }
}

#[test]
fn local_wildcards_reject_qualified_names() -> Result<()> {
    assert_path_of! {
        grammar:
            "element root { any(##local) ? }"
        events:
            "
            start root
            start {http://x}q
            end {http://x}q
            end root
            "
        fails:
            ErrorKind::PathNotFound { .. }
    }
}
