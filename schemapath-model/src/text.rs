use std::collections::HashMap;

use nom::{
    branch::alt,
    bytes::complete::{is_not, tag, take_while1},
    character::complete::{char, digit1, multispace1},
    combinator::{all_consuming, consumed, map, opt, value},
    error::{context, VerboseError, VerboseErrorKind},
    multi::{many0, separated_list1},
    sequence::{delimited, pair, preceded, separated_pair, terminated, tuple},
    IResult,
};

use crate::{
    ContentKind, ElementDecl, Occurs, QName, StateId, StateKind, StateMachine,
    StateMachineBuilder, StateNode, WildcardRule,
};

type Res<T, U> = IResult<T, U, VerboseError<T>>;

mod error;
pub use error::ParseError;

/// Parses the compact content-model notation into a [StateMachine]
///
/// A grammar is any number of `def NAME = PARTICLE` statements followed by the
/// root particle. Particles:
///
/// | Syntax                                  | Description
/// |-----------------------------------------|---------------------------
/// | `element` _qname_ _flags_ `{` _p_ `}`   | A named element containing _p_
/// | `element` _qname_ _flags_               | A named element with no content (`text` opts into simple content)
/// | `any(` _rule_ `)`                       | A wildcard; _rule_ is `##any`, `##other`, `##targetNamespace`, `##local` or a list of URIs
/// | `sequence {` _p_`,` _p_`,` … `}`        | An ordered group
/// | `all {` … `}` / `choice {` … `}`        | Unordered / exclusive groups
/// | `subst {` _head_`,` _sub_`,` … `}`      | A substitution group
/// | `use` _name_                            | Reference to a `def` (recursion allowed)
///
/// Element flags: `text`, `mixed`, `empty`, `nillable`, `default("…")`,
/// `fixed("…")`. An occurrence marker (`?`, `*`, `+`, `{m..n}`, `{m..*}`)
/// follows the header, before any body. Qualified names use Clark notation,
/// `{uri}local`. Comments run from `#` to end of line.
pub fn parse_grammar(text: &str) -> std::result::Result<StateMachine, ParseError> {
    let (_, (defs, root)) = all_consuming(terminated(
        pair(many0(definition), particle),
        whitespace,
    ))(text)
    .map_err(|e| {
        let e = match e {
            nom::Err::Error(e) | nom::Err::Failure(e) => e,
            nom::Err::Incomplete(_) => unreachable!(),
        };
        let mut error = None;
        for (remainder, kind) in e.errors.iter().rev() {
            error = Some(ParseError::new(
                match kind {
                    VerboseErrorKind::Context(what) => format!("Expected {what}"),
                    VerboseErrorKind::Char(c) => format!("Expected {c:?}"),
                    VerboseErrorKind::Nom(p) => format!("Invalid token while looking for: {p:?}"),
                },
                text,
                remainder,
                error.map(Box::new),
            ));
        }
        error.expect("VerboseError with no frames")
    })?;

    let mut lowering = Lowering::new(text);
    for &(span, name, _) in &defs {
        lowering.declare(name, span)?;
    }
    for &(span, name, ref body) in &defs {
        lowering.define(name, span, body)?;
    }
    let root = lowering.lower(&root)?;
    lowering
        .builder
        .build(root)
        .map_err(|e| ParseError::new(e.to_string(), text, text, None))
}

// -- AST ---------------------------------------------------------------------

#[derive(Debug)]
enum Ast<'t> {
    Element {
        span: &'t str,
        name: &'t str,
        flags: Vec<(&'t str, Flag<'t>)>,
        occurs: Occurs,
        content: Option<Box<Ast<'t>>>,
    },
    Any {
        span: &'t str,
        rule: WildcardRule,
        occurs: Occurs,
    },
    Group {
        span: &'t str,
        compositor: Compositor,
        occurs: Occurs,
        children: Vec<Ast<'t>>,
    },
    Use {
        span: &'t str,
        name: &'t str,
        occurs: Occurs,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Compositor {
    Sequence,
    All,
    Choice,
    Substitution,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Flag<'t> {
    Text,
    Mixed,
    Empty,
    Nillable,
    Default(&'t str),
    Fixed(&'t str),
}

// -- Lowering ----------------------------------------------------------------

struct Lowering<'t> {
    text: &'t str,
    builder: StateMachineBuilder,
    definitions: HashMap<&'t str, StateId>,
}

impl<'t> Lowering<'t> {
    fn new(text: &'t str) -> Self {
        Lowering {
            text,
            builder: StateMachineBuilder::new(),
            definitions: HashMap::new(),
        }
    }

    fn fail<T>(&self, message: String, span: &'t str) -> std::result::Result<T, ParseError<'t>> {
        Err(ParseError::new(message, self.text, span, None))
    }

    fn declare(&mut self, name: &'t str, span: &'t str) -> std::result::Result<(), ParseError<'t>> {
        let placeholder = self.builder.placeholder();
        if self.definitions.insert(name, placeholder).is_some() {
            return self.fail(format!("def {name} occurs twice"), span);
        }
        Ok(())
    }

    fn define(
        &mut self,
        name: &'t str,
        span: &'t str,
        body: &Ast<'t>,
    ) -> std::result::Result<(), ParseError<'t>> {
        let node = self.lower_node(body)?;
        let id = self.definitions[name];
        self.builder
            .fill(id, node)
            .map_err(|e| ParseError::new(e.to_string(), self.text, span, None))
    }

    fn lower(&mut self, ast: &Ast<'t>) -> std::result::Result<StateId, ParseError<'t>> {
        // A plain reference resolves to the definition's own node; anything
        // else becomes a node of its own
        if let Ast::Use { span, name, occurs } = *ast {
            if occurs == Occurs::ONE {
                return match self.definitions.get(name) {
                    Some(&id) => Ok(id),
                    None => self.fail(format!("no def found for \"{name}\""), span),
                };
            }
        }
        let node = self.lower_node(ast)?;
        Ok(self.builder.add(node))
    }

    fn lower_node(&mut self, ast: &Ast<'t>) -> std::result::Result<StateNode, ParseError<'t>> {
        Ok(match *ast {
            Ast::Element {
                span,
                name,
                ref flags,
                occurs,
                ref content,
            } => {
                let name = match QName::parse(name) {
                    Ok(name) => name,
                    Err(e) => return self.fail(e.to_string(), span),
                };
                let content = match content {
                    Some(inner) => Some(self.lower(inner)?),
                    None => None,
                };
                let decl = self.element_decl(name, flags, content, span)?;
                StateNode {
                    occurs,
                    kind: StateKind::Element(decl),
                }
            }
            Ast::Any {
                ref rule, occurs, ..
            } => StateNode {
                occurs,
                kind: StateKind::Any(rule.clone()),
            },
            Ast::Group {
                span,
                compositor,
                occurs,
                ref children,
            } => {
                let children = children
                    .iter()
                    .map(|child| self.lower(child))
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                if children.is_empty() {
                    return self.fail("group must have at least one child".into(), span);
                }
                StateNode {
                    occurs,
                    kind: match compositor {
                        Compositor::Sequence => StateKind::Sequence(children),
                        Compositor::All => StateKind::All(children),
                        Compositor::Choice => StateKind::Choice(children),
                        Compositor::Substitution => StateKind::Substitution(children),
                    },
                }
            }
            Ast::Use { span, name, occurs } => {
                // A reference with its own bounds wraps the definition in a
                // single-child choice carrying those bounds
                let Some(&id) = self.definitions.get(name) else {
                    return self.fail(format!("no def found for \"{name}\""), span);
                };
                StateNode {
                    occurs,
                    kind: StateKind::Choice(vec![id]),
                }
            }
        })
    }

    fn element_decl(
        &self,
        name: QName,
        flags: &[(&'t str, Flag<'t>)],
        content: Option<StateId>,
        span: &'t str,
    ) -> std::result::Result<ElementDecl, ParseError<'t>> {
        let mut decl = ElementDecl {
            name,
            content,
            content_kind: match content {
                Some(_) => ContentKind::ElementOnly,
                None => ContentKind::Empty,
            },
            nillable: false,
            default_value: None,
            fixed_value: None,
        };
        let mut kind_flag = None;
        for &(flag_span, flag) in flags {
            match flag {
                Flag::Text | Flag::Mixed | Flag::Empty => {
                    if kind_flag.replace(flag).is_some() {
                        return self.fail("conflicting content flags".into(), flag_span);
                    }
                    match flag {
                        Flag::Text if content.is_some() => {
                            return self.fail(
                                "a text element cannot have a content model".into(),
                                flag_span,
                            )
                        }
                        Flag::Empty if content.is_some() => {
                            return self.fail(
                                "an empty element cannot have a content model".into(),
                                flag_span,
                            )
                        }
                        Flag::Mixed if content.is_none() => {
                            return self.fail(
                                "a mixed element requires a content model".into(),
                                flag_span,
                            )
                        }
                        _ => {}
                    }
                    decl.content_kind = match flag {
                        Flag::Text => ContentKind::Simple,
                        Flag::Mixed => ContentKind::Mixed,
                        _ => ContentKind::Empty,
                    };
                }
                Flag::Nillable => {
                    if decl.nillable {
                        return self.fail("nillable occurs twice".into(), flag_span);
                    }
                    decl.nillable = true;
                }
                Flag::Default(text) => {
                    if decl.default_value.is_some() {
                        return self.fail("default occurs twice".into(), flag_span);
                    }
                    decl.default_value = Some(text.to_owned());
                }
                Flag::Fixed(text) => {
                    if decl.fixed_value.is_some() {
                        return self.fail("fixed occurs twice".into(), flag_span);
                    }
                    decl.fixed_value = Some(text.to_owned());
                }
            }
        }
        if decl.default_value.is_some() && decl.fixed_value.is_some() {
            return self.fail("default and fixed are mutually exclusive".into(), span);
        }
        Ok(decl)
    }
}

// -- Parsers -----------------------------------------------------------------

fn whitespace(s: &str) -> Res<&str, ()> {
    value(
        (),
        many0(alt((
            value((), multispace1),
            value((), pair(char('#'), opt(is_not("\n")))),
        ))),
    )(s)
}

/// A token with any leading whitespace or comments consumed
fn padded<'a, O>(
    inner: impl FnMut(&'a str) -> Res<&'a str, O>,
) -> impl FnMut(&'a str) -> Res<&'a str, O> {
    preceded(whitespace, inner)
}

// Matches `word` as a whole identifier, with no padding of its own so that
// spans captured by `consumed` start at the keyword itself
fn keyword(word: &'static str) -> impl FnMut(&str) -> Res<&str, &str> {
    move |s| {
        let (rest, matched) = identifier(s)?;
        if matched == word {
            Ok((rest, matched))
        } else {
            Err(nom::Err::Error(VerboseError {
                errors: vec![(s, VerboseErrorKind::Context(word))],
            }))
        }
    }
}

fn identifier(s: &str) -> Res<&str, &str> {
    context(
        "identifier",
        take_while1(|c: char| c.is_alphanumeric() || "_-.".contains(c)),
    )(s)
}

fn qname(s: &str) -> Res<&str, &str> {
    context(
        "name",
        nom::combinator::recognize(pair(
            opt(delimited(char('{'), is_not("}"), char('}'))),
            identifier,
        )),
    )(s)
}

fn integer(s: &str) -> Res<&str, u32> {
    let (rest, digits) = digit1(s)?;
    match digits.parse() {
        Ok(number) => Ok((rest, number)),
        Err(_) => Err(nom::Err::Error(VerboseError {
            errors: vec![(s, VerboseErrorKind::Context("bounded number"))],
        })),
    }
}

fn occurs(s: &str) -> Res<&str, Occurs> {
    padded(alt((
        value(Occurs::OPTIONAL, char('?')),
        value(Occurs::ZERO_OR_MORE, char('*')),
        value(Occurs::ONE_OR_MORE, char('+')),
        map(
            delimited(
                pair(char('{'), whitespace),
                separated_pair(
                    integer,
                    padded(tag("..")),
                    padded(alt((map(integer, Some), value(None, char('*'))))),
                ),
                padded(char('}')),
            ),
            |(min, max)| Occurs::new(min, max),
        ),
    )))(s)
}

fn maybe_occurs(s: &str) -> Res<&str, Occurs> {
    map(opt(occurs), |found| found.unwrap_or(Occurs::ONE))(s)
}

fn quoted(s: &str) -> Res<&str, &str> {
    context(
        "quoted string",
        delimited(char('"'), map(opt(is_not("\"")), Option::unwrap_or_default), char('"')),
    )(s)
}

fn flag(s: &str) -> Res<&str, (&str, Flag)> {
    padded(consumed(alt((
        value(Flag::Text, keyword("text")),
        value(Flag::Mixed, keyword("mixed")),
        value(Flag::Empty, keyword("empty")),
        value(Flag::Nillable, keyword("nillable")),
        map(
            preceded(
                keyword("default"),
                delimited(padded(char('(')), padded(quoted), padded(char(')'))),
            ),
            Flag::Default,
        ),
        map(
            preceded(
                keyword("fixed"),
                delimited(padded(char('(')), padded(quoted), padded(char(')'))),
            ),
            Flag::Fixed,
        ),
    ))))(s)
}

fn body(s: &str) -> Res<&str, Ast> {
    delimited(padded(char('{')), particle, padded(char('}')))(s)
}

fn element(s: &str) -> Res<&str, Ast> {
    padded(map(
        consumed(tuple((
            preceded(keyword("element"), padded(qname)),
            many0(flag),
            maybe_occurs,
            opt(body),
        ))),
        |(span, (name, flags, occurs, content))| Ast::Element {
            span,
            name,
            flags,
            occurs,
            content: content.map(Box::new),
        },
    ))(s)
}

fn namespace_rule(s: &str) -> Res<&str, WildcardRule> {
    context(
        "namespace rule",
        alt((
            value(WildcardRule::Any, tag("##any")),
            value(WildcardRule::Other, tag("##other")),
            value(WildcardRule::Target, tag("##targetNamespace")),
            value(WildcardRule::Local, tag("##local")),
            map(
                separated_list1(multispace1, is_not("#) \t\r\n")),
                |uris: Vec<&str>| {
                    WildcardRule::Namespaces(uris.into_iter().map(str::to_owned).collect())
                },
            ),
        )),
    )(s)
}

fn wildcard(s: &str) -> Res<&str, Ast> {
    padded(map(
        consumed(pair(
            preceded(
                keyword("any"),
                delimited(padded(char('(')), padded(namespace_rule), padded(char(')'))),
            ),
            maybe_occurs,
        )),
        |(span, (rule, occurs))| Ast::Any { span, rule, occurs },
    ))(s)
}

fn group(s: &str) -> Res<&str, Ast> {
    padded(map(
        consumed(tuple((
            alt((
                value(Compositor::Sequence, keyword("sequence")),
                value(Compositor::All, keyword("all")),
                value(Compositor::Choice, keyword("choice")),
                value(Compositor::Substitution, keyword("subst")),
            )),
            maybe_occurs,
            delimited(
                padded(char('{')),
                separated_list1(padded(char(',')), particle),
                padded(char('}')),
            ),
        ))),
        |(span, (compositor, occurs, children))| Ast::Group {
            span,
            compositor,
            occurs,
            children,
        },
    ))(s)
}

fn reference(s: &str) -> Res<&str, Ast> {
    padded(map(
        consumed(pair(preceded(keyword("use"), padded(identifier)), maybe_occurs)),
        |(span, (name, occurs))| Ast::Use { span, name, occurs },
    ))(s)
}

fn particle(s: &str) -> Res<&str, Ast> {
    context("particle", alt((element, wildcard, group, reference)))(s)
}

fn definition(s: &str) -> Res<&str, (&str, &str, Ast)> {
    padded(map(
        consumed(pair(
            preceded(keyword("def"), padded(identifier)),
            preceded(padded(char('=')), particle),
        )),
        |(span, (name, body))| (span, name, body),
    ))(s)
}

#[cfg(test)]
mod tests;
